//! Frame a product that is already on a white background.
//!
//! Usage:
//! ```sh
//! cargo run --example make_variants -- product_on_white.png out_dir 3
//! ```

use std::env;
use std::path::Path;
use std::process;

use catalog_variants::{
    generate_variants, key_white_background, save_variants, CatalogConfig, SourceImage,
};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <input> <output_dir> [count]", args[0]);
        process::exit(1);
    }

    let count = args.get(3).map_or(Ok(3), |n| n.parse()).unwrap_or_else(|_| {
        eprintln!("count must be a number");
        process::exit(1);
    });

    let source = SourceImage::open(Path::new(&args[1])).expect("failed to load input");
    let cutout = key_white_background(source.pixels());
    let config = CatalogConfig::default();

    match generate_variants(&cutout, count, &config, &mut rand::rng()) {
        Ok(variants) => {
            let paths = save_variants(Path::new(&args[2]), &variants).expect("failed to save");
            for (path, variant) in paths.iter().zip(&variants) {
                println!(
                    "{} on {} / {}",
                    path.display(),
                    variant.background(),
                    variant.border()
                );
            }
        }
        Err(e) => {
            eprintln!("Failed: {e}");
            process::exit(1);
        }
    }
}
