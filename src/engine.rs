//! Session state: source, memoized cut-out, and the current variant set.
//!
//! Long-running steps are split into a `begin_*` call that snapshots what the
//! step needs, a job that runs detached from the engine, and a `finish_*` call
//! that applies the result. Every snapshot carries the generation epoch; a
//! result whose epoch no longer matches (because a new source was selected in
//! the meantime) is dropped instead of applied.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{ImageFormat, RgbaImage};
use rand::Rng;

use crate::bounds::find_subject_bounds;
use crate::config::CatalogConfig;
use crate::error::{Error, Result};
use crate::keying::key_white_background;
use crate::remover::BackgroundRemover;
use crate::source::SourceImage;
use crate::variants::{generate_variants, Variant};

/// File name prefix for exported variants.
pub const VARIANT_FILE_PREFIX: &str = "meesho_variant";

/// Snapshot for cutting the product out of the current source.
#[derive(Debug, Clone)]
pub struct ExtractionJob {
    epoch: u64,
    source: Arc<SourceImage>,
}

/// A keyed cut-out waiting to be applied.
#[derive(Debug, Clone)]
pub struct Extracted {
    epoch: u64,
    cutout: RgbaImage,
}

impl Extracted {
    /// The keyed subject.
    #[must_use]
    pub fn cutout(&self) -> &RgbaImage {
        &self.cutout
    }
}

impl ExtractionJob {
    /// Ask `remover` for the subject on white and key the white out.
    ///
    /// # Errors
    ///
    /// Whatever the remover reports, and [`Error::ExtractionFailed`] when the
    /// returned bytes do not decode as an image.
    #[tracing::instrument(skip_all, fields(epoch = self.epoch))]
    pub async fn run<R: BackgroundRemover>(self, remover: &R) -> Result<Extracted> {
        let on_white = remover.remove_background(&self.source).await?;
        let decoded = image::load_from_memory(&on_white).map_err(|e| Error::ExtractionFailed {
            reason: format!("returned image could not be decoded: {e}"),
        })?;
        let cutout = key_white_background(&decoded.to_rgba8());

        match find_subject_bounds(&cutout) {
            Some(b) => tracing::debug!(x = b.x, y = b.y, w = b.width, h = b.height, "subject bounds"),
            None => tracing::warn!("cut-out has no subject pixels"),
        }

        Ok(Extracted {
            epoch: self.epoch,
            cutout,
        })
    }
}

/// Snapshot for one generation run.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    epoch: u64,
    count: usize,
    cutout: Arc<RgbaImage>,
    config: CatalogConfig,
}

/// Variants of a finished run waiting to be applied.
#[derive(Debug, Clone)]
pub struct GeneratedRun {
    epoch: u64,
    variants: Vec<Variant>,
}

impl GeneratedRun {
    /// The variants in generation order.
    #[must_use]
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }
}

impl GenerationJob {
    /// Compose and encode the variants.
    ///
    /// # Errors
    ///
    /// See [`generate_variants`].
    pub fn run<Rn: Rng + ?Sized>(self, rng: &mut Rn) -> Result<GeneratedRun> {
        let variants = generate_variants(&self.cutout, self.count, &self.config, rng)?;
        Ok(GeneratedRun {
            epoch: self.epoch,
            variants,
        })
    }
}

/// Holds one source photo and everything derived from it.
#[derive(Debug)]
pub struct CatalogEngine<R> {
    remover: R,
    config: CatalogConfig,
    epoch: u64,
    source: Option<Arc<SourceImage>>,
    cutout: Option<Arc<RgbaImage>>,
    variants: Vec<Variant>,
}

impl<R: BackgroundRemover> CatalogEngine<R> {
    /// Create an engine around a background remover.
    ///
    /// # Errors
    ///
    /// Returns the first problem [`CatalogConfig::validate`] finds.
    pub fn new(remover: R, config: CatalogConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            remover,
            config,
            epoch: 0,
            source: None,
            cutout: None,
            variants: Vec::new(),
        })
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Counter advanced by every source change.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The current source, if any.
    #[must_use]
    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_deref()
    }

    /// The memoized cut-out, if extraction has run for this source.
    #[must_use]
    pub fn cutout(&self) -> Option<&RgbaImage> {
        self.cutout.as_deref()
    }

    /// Variants of the last successful run for this source.
    #[must_use]
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// Replace the source photo.
    ///
    /// `None` (nothing picked) leaves the engine untouched and returns
    /// `false`. A new source drops the cut-out and all variants and advances
    /// the epoch, so results still in flight for the old source are ignored.
    pub fn select_source(&mut self, upload: Option<SourceImage>) -> bool {
        let Some(source) = upload else {
            return false;
        };
        self.epoch += 1;
        tracing::info!(
            epoch = self.epoch,
            width = source.pixels().width(),
            height = source.pixels().height(),
            "source selected"
        );
        self.source = Some(Arc::new(source));
        self.cutout = None;
        self.variants.clear();
        true
    }

    /// Snapshot for extraction, or `None` when there is no source or the
    /// cut-out already exists.
    #[must_use]
    pub fn begin_extraction(&self) -> Option<ExtractionJob> {
        if self.cutout.is_some() {
            return None;
        }
        self.source.as_ref().map(|source| ExtractionJob {
            epoch: self.epoch,
            source: Arc::clone(source),
        })
    }

    /// Store a cut-out. Returns `false` and drops it if the source changed
    /// since the job was taken.
    pub fn finish_extraction(&mut self, extracted: Extracted) -> bool {
        if extracted.epoch != self.epoch {
            tracing::warn!(
                job_epoch = extracted.epoch,
                epoch = self.epoch,
                "discarding cut-out for a replaced source"
            );
            return false;
        }
        self.cutout = Some(Arc::new(extracted.cutout));
        true
    }

    /// Snapshot for a run of `count` variants.
    ///
    /// # Errors
    ///
    /// [`Error::NoSource`] or [`Error::NoCutout`] when the pipeline has not got
    /// that far, [`Error::UnsupportedVariantCount`] for a disallowed count.
    pub fn begin_run(&self, count: usize) -> Result<GenerationJob> {
        if self.source.is_none() {
            return Err(Error::NoSource);
        }
        let cutout = self.cutout.as_ref().ok_or(Error::NoCutout)?;
        let count = self.config.check_variant_count(count)?;
        Ok(GenerationJob {
            epoch: self.epoch,
            count,
            cutout: Arc::clone(cutout),
            config: self.config.clone(),
        })
    }

    /// Replace the variant set. Returns `false` and drops the run if the
    /// source changed since the job was taken.
    pub fn finish_run(&mut self, run: GeneratedRun) -> bool {
        if run.epoch != self.epoch {
            tracing::warn!(
                job_epoch = run.epoch,
                epoch = self.epoch,
                "discarding variants for a replaced source"
            );
            return false;
        }
        self.variants = run.variants;
        true
    }

    /// Run the whole pipeline for the current source.
    ///
    /// The cut-out is produced on the first call and reused afterwards. On
    /// failure nothing is applied and the previous variant set stays.
    ///
    /// # Errors
    ///
    /// [`Error::NoSource`] without a source, otherwise any extraction,
    /// composition, or encoding error.
    pub async fn generate<Rn: Rng + ?Sized>(
        &mut self,
        count: usize,
        rng: &mut Rn,
    ) -> Result<&[Variant]> {
        if self.source.is_none() {
            return Err(Error::NoSource);
        }
        self.config.check_variant_count(count)?;

        if let Some(job) = self.begin_extraction() {
            let extracted = job.run(&self.remover).await?;
            self.finish_extraction(extracted);
        }

        let run = self.begin_run(count)?.run(rng)?;
        self.finish_run(run);
        Ok(self.variants.as_slice())
    }

    /// Write the cut-out as PNG.
    ///
    /// # Errors
    ///
    /// [`Error::NoCutout`] before extraction, [`Error::Image`] on write failure.
    pub fn save_cutout(&self, path: &Path) -> Result<()> {
        let cutout = self.cutout.as_ref().ok_or(Error::NoCutout)?;
        cutout.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }
}

/// Download name of the variant at zero-based `index`.
///
/// Example: index 0 becomes `"meesho_variant_1.jpg"`.
#[must_use]
pub fn variant_file_name(index: usize, variant: &Variant) -> String {
    format!(
        "{VARIANT_FILE_PREFIX}_{}.{}",
        index + 1,
        variant.image().format().extension()
    )
}

/// Write every variant into `dir`, one file each, creating `dir` if needed.
///
/// Returns the written paths in variant order.
///
/// # Errors
///
/// Returns [`Error::Io`] if the directory or a file cannot be written.
pub fn save_variants(dir: &Path, variants: &[Variant]) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    variants
        .iter()
        .enumerate()
        .map(|(i, variant)| {
            let path = dir.join(variant_file_name(i, variant));
            std::fs::write(&path, variant.image().bytes())?;
            Ok(path)
        })
        .collect()
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

/// Generate a default output directory from an input path.
///
/// Example: `"shoe.jpg"` becomes `"shoe_variants"`.
#[must_use]
pub fn default_output_dir(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_variants"))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use image::Rgba;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::remover::Passthrough;

    fn product_on_white() -> SourceImage {
        let mut image = RgbaImage::from_pixel(40, 30, Rgba([255, 255, 255, 255]));
        for y in 10..20 {
            for x in 8..32 {
                image.put_pixel(x, y, Rgba([180, 40, 60, 255]));
            }
        }
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png).unwrap();
        SourceImage::from_bytes(buf.into_inner()).unwrap()
    }

    fn small_config() -> CatalogConfig {
        CatalogConfig {
            canvas_size: 100,
            ..CatalogConfig::default()
        }
    }

    struct Counting<'a>(&'a AtomicUsize);

    impl BackgroundRemover for Counting<'_> {
        async fn remove_background(&self, source: &SourceImage) -> Result<Vec<u8>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(source.bytes().to_vec())
        }
    }

    struct Refusing;

    impl BackgroundRemover for Refusing {
        async fn remove_background(&self, _source: &SourceImage) -> Result<Vec<u8>> {
            Err(Error::ExtractionFailed {
                reason: "no image part returned".into(),
            })
        }
    }

    #[test]
    fn default_output_dir_appends_variants_suffix() {
        let p = default_output_dir(Path::new("/tmp/shoe.jpg"));
        assert_eq!(p, PathBuf::from("/tmp/shoe_variants"));
    }

    #[test]
    fn is_supported_image_accepts_common_formats() {
        assert!(is_supported_image(Path::new("photo.jpg")));
        assert!(is_supported_image(Path::new("photo.JPEG")));
        assert!(is_supported_image(Path::new("photo.png")));
        assert!(is_supported_image(Path::new("photo.webp")));
        assert!(!is_supported_image(Path::new("photo.gif")));
        assert!(!is_supported_image(Path::new("photo")));
    }

    #[test]
    fn selecting_nothing_is_a_no_op() {
        let mut engine = CatalogEngine::new(Passthrough, small_config()).unwrap();
        assert!(!engine.select_source(None));
        assert_eq!(engine.epoch(), 0);
        assert!(engine.source().is_none());
    }

    #[tokio::test]
    async fn generate_without_source_fails() {
        let mut engine = CatalogEngine::new(Passthrough, small_config()).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            engine.generate(3, &mut rng).await,
            Err(Error::NoSource)
        ));
    }

    #[tokio::test]
    async fn cutout_is_memoized_per_source() {
        let calls = AtomicUsize::new(0);
        let mut engine = CatalogEngine::new(Counting(&calls), small_config()).unwrap();
        let mut rng = StdRng::seed_from_u64(5);

        engine.select_source(Some(product_on_white()));
        assert_eq!(engine.generate(3, &mut rng).await.unwrap().len(), 3);
        assert_eq!(engine.generate(1, &mut rng).await.unwrap().len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let cutout = engine.cutout().unwrap();
        assert_eq!(cutout.get_pixel(0, 0)[3], 0);
        assert_eq!(cutout.get_pixel(20, 15), &Rgba([180, 40, 60, 255]));

        engine.select_source(Some(product_on_white()));
        assert!(engine.cutout().is_none());
        assert!(engine.variants().is_empty());
        engine.generate(1, &mut rng).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stale_results_are_discarded() {
        let mut engine = CatalogEngine::new(Passthrough, small_config()).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        engine.select_source(Some(product_on_white()));

        let job = engine.begin_extraction().unwrap();
        engine.select_source(Some(product_on_white()));
        let extracted = job.run(&Passthrough).await.unwrap();
        assert!(!engine.finish_extraction(extracted));
        assert!(engine.cutout().is_none());

        let extracted = engine
            .begin_extraction()
            .unwrap()
            .run(&Passthrough)
            .await
            .unwrap();
        assert!(engine.finish_extraction(extracted));
        assert!(engine.begin_extraction().is_none());

        let job = engine.begin_run(3).unwrap();
        engine.select_source(Some(product_on_white()));
        let run = job.run(&mut rng).unwrap();
        assert!(!engine.finish_run(run));
        assert!(engine.variants().is_empty());
    }

    #[tokio::test]
    async fn failed_run_keeps_previous_variants() {
        let mut engine = CatalogEngine::new(Passthrough, small_config()).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        engine.select_source(Some(product_on_white()));
        engine.generate(3, &mut rng).await.unwrap();
        let before: Vec<_> = engine.variants().iter().map(Variant::id).collect();

        assert!(engine.generate(4, &mut rng).await.is_err());
        let after: Vec<_> = engine.variants().iter().map(Variant::id).collect();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn extraction_failure_aborts_generation() {
        let mut engine = CatalogEngine::new(Refusing, small_config()).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        engine.select_source(Some(product_on_white()));
        assert!(matches!(
            engine.generate(1, &mut rng).await,
            Err(Error::ExtractionFailed { .. })
        ));
        assert!(engine.cutout().is_none());
        assert!(engine.variants().is_empty());
    }

    #[test]
    fn begin_run_requires_a_cutout() {
        let mut engine = CatalogEngine::new(Passthrough, small_config()).unwrap();
        assert!(matches!(engine.begin_run(1), Err(Error::NoSource)));
        engine.select_source(Some(product_on_white()));
        assert!(matches!(engine.begin_run(1), Err(Error::NoCutout)));
    }
}
