use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::Level;

use catalog_variants::gemini::{API_KEY_ENV, DEFAULT_MODEL};
use catalog_variants::{
    default_output_dir, is_supported_image, save_variants, BackgroundRemover, CatalogConfig,
    CatalogEngine, EncodeOptions, GeminiClient, Passthrough, SourceImage, Variant,
};

#[derive(Parser)]
#[command(
    name = "catalog-variants",
    about = "Turn one product photo into framed catalog image variants",
    version,
    after_help = "Simple usage: catalog-variants <image>  (writes 5 variants to {name}_variants/)\n\n\
                  The product is cut out with Gemini unless --skip-extraction is given, in which\n\
                  case the photo must already show the product on a plain white background."
)]
struct Cli {
    /// Product photo (jpg, png, webp, bmp)
    input: PathBuf,

    /// Output directory (default: {name}_variants)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of variants to generate (1, 3, 5 or 10)
    #[arg(short = 'n', long, default_value_t = 5)]
    count: usize,

    /// Seed for palette shuffling, for reproducible color pairings
    #[arg(long)]
    seed: Option<u64>,

    /// Gemini API key
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini model used for background removal
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Treat the photo as already on white and skip the Gemini call
    #[arg(long)]
    skip_extraction: bool,

    /// Also write the transparent cut-out as PNG
    #[arg(long)]
    save_cutout: Option<PathBuf>,

    /// Size budget per variant in kilobytes
    #[arg(long, default_value_t = catalog_variants::config::MAX_FILE_SIZE_KB)]
    max_kb: u32,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::WARN
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.verbose && cli.quiet {
        eprintln!("Error: Cannot specify both --verbose and --quiet");
        process::exit(1);
    }

    if !cli.input.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input.display());
        process::exit(1);
    }
    if !is_supported_image(&cli.input) {
        eprintln!("Error: Unsupported image type: {}", cli.input.display());
        process::exit(1);
    }

    let config = CatalogConfig {
        encode: EncodeOptions {
            max_kilobytes: cli.max_kb,
            ..EncodeOptions::default()
        },
        ..CatalogConfig::default()
    };

    let outcome = if cli.skip_extraction {
        run(Passthrough, config, &cli).await
    } else {
        let client = match cli.api_key.as_deref().map(GeminiClient::new) {
            Some(Ok(client)) => client.with_model(&cli.model),
            Some(Err(e)) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
            None => {
                eprintln!("Error: No API key given (use --api-key or set {API_KEY_ENV})");
                eprintln!("       Pass --skip-extraction if the photo is already on white.");
                process::exit(1);
            }
        };
        run(client, config, &cli).await
    };

    let filename = display_name(&cli.input);
    match outcome {
        Ok(written) => {
            if !cli.quiet {
                for (path, variant) in &written {
                    print_written(path, variant, cli.verbose);
                }
                eprintln!();
                eprintln!("[OK] {filename}: {} variants", written.len());
            }
        }
        Err(e) => {
            eprintln!("[FAIL] {filename}: {e}");
            process::exit(1);
        }
    }
}

async fn run<R: BackgroundRemover>(
    remover: R,
    config: CatalogConfig,
    cli: &Cli,
) -> catalog_variants::Result<Vec<(PathBuf, Variant)>> {
    let mut engine = CatalogEngine::new(remover, config)?;
    engine.select_source(Some(SourceImage::open(&cli.input)?));

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let variants = engine.generate(cli.count, &mut rng).await?.to_vec();

    if let Some(path) = &cli.save_cutout {
        engine.save_cutout(path)?;
        if !cli.quiet {
            eprintln!("Cut-out written to {}", path.display());
        }
    }

    let dir = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_dir(&cli.input));
    let paths = save_variants(&dir, &variants)?;
    Ok(paths.into_iter().zip(variants).collect())
}

fn print_written(path: &Path, variant: &Variant, verbose: bool) {
    let image = variant.image();
    let kb = image.bytes().len().div_ceil(1024);
    if image.within_budget() {
        eprintln!("  {} ({kb} KB, quality {})", display_name(path), image.quality());
    } else {
        eprintln!(
            "  {} ({kb} KB, quality {}, over budget)",
            display_name(path),
            image.quality()
        );
    }
    if verbose {
        eprintln!(
            "    -> id {}, background {}, border {}",
            variant.id(),
            variant.background(),
            variant.border()
        );
    }
}

fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    )
}
