//! Variant orchestration: palette shuffling and the per-variant
//! compose-then-encode loop.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use image::RgbaImage;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::color::ColorSpec;
use crate::compose::compose_frame;
use crate::config::CatalogConfig;
use crate::encode::{encode_within_budget, EncodedImage};
use crate::error::Result;
use crate::surface::Surface;

static RUN_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Identifies one generation run within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId {
    started_ms: u128,
    sequence: u64,
}

impl RunId {
    /// A fresh run id: wall-clock start plus a process-wide counter.
    #[must_use]
    pub fn next() -> Self {
        let started_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis());
        Self {
            started_ms,
            sequence: RUN_SEQUENCE.fetch_add(1, Ordering::Relaxed),
        }
    }
}

/// Identifier of one variant, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariantId {
    run: RunId,
    index: usize,
}

impl VariantId {
    /// Position of the variant in its run, starting at 0.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The run that produced the variant.
    #[must_use]
    pub fn run(&self) -> RunId {
        self.run
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "v-{}-{}-{}",
            self.index, self.run.started_ms, self.run.sequence
        )
    }
}

/// One finished catalog image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    id: VariantId,
    image: EncodedImage,
    background: ColorSpec,
    border: ColorSpec,
}

impl Variant {
    /// Unique identifier.
    #[must_use]
    pub fn id(&self) -> VariantId {
        self.id
    }

    /// Encoded payload.
    #[must_use]
    pub fn image(&self) -> &EncodedImage {
        &self.image
    }

    /// Background fill of the frame.
    #[must_use]
    pub fn background(&self) -> ColorSpec {
        self.background
    }

    /// Border color of the frame.
    #[must_use]
    pub fn border(&self) -> ColorSpec {
        self.border
    }

    /// The payload as an embeddable `data:` URL.
    #[must_use]
    pub fn data_url(&self) -> String {
        self.image.data_url()
    }
}

/// Produce `count` framed variants of `subject`.
///
/// Copies of both palettes are shuffled with `rng`; variant `i` takes
/// background `i % backgrounds` and border `i % borders`, so colors repeat once
/// `count` exceeds a palette. All frames are drawn on one reused surface, one
/// after another, and returned in generation order. The first failure aborts
/// the run.
///
/// # Errors
///
/// Returns [`crate::Error::UnsupportedVariantCount`] for a count outside the
/// allowed set, configuration errors from [`CatalogConfig::validate`], and any
/// composition or encoding error.
#[tracing::instrument(skip_all, fields(count = count, width = subject.width(), height = subject.height()))]
pub fn generate_variants<R: Rng + ?Sized>(
    subject: &RgbaImage,
    count: usize,
    config: &CatalogConfig,
    rng: &mut R,
) -> Result<Vec<Variant>> {
    config.validate()?;
    let count = config.check_variant_count(count)?;

    let mut backgrounds = config.background_palette.clone();
    let mut borders = config.border_palette.clone();
    backgrounds.shuffle(rng);
    borders.shuffle(rng);

    let run = RunId::next();
    tracing::info!(run = run.sequence, "generating variants");
    let mut surface = Surface::acquire(config.canvas_size, config.canvas_size)?;
    let mut variants = Vec::with_capacity(count);

    for index in 0..count {
        let background = backgrounds[index % backgrounds.len()];
        let border = borders[index % borders.len()];

        compose_frame(&mut surface, subject, background, border, config)?;
        let image = encode_within_budget(&surface.to_rgb(), &config.encode)?;
        tracing::debug!(
            index,
            %background,
            %border,
            len = image.bytes().len(),
            quality = image.quality(),
            "variant ready"
        );

        variants.push(Variant {
            id: VariantId { run, index },
            image,
            background,
            border,
        });
    }

    tracing::info!(count = variants.len(), "generated variants");
    Ok(variants)
}
