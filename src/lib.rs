//! Turn one product photo into a set of framed catalog images.
//!
//! The pipeline has three stages:
//!
//! 1. **Extraction.** A [`BackgroundRemover`] returns the product on plain
//!    white, and [`key_white_background`] makes that white transparent.
//! 2. **Composition.** The cut-out is scaled into a square canvas with a
//!    colored background and border ([`compose_frame`]).
//! 3. **Encoding.** Each frame is written as JPEG, lowering quality until it
//!    fits the size budget ([`encode_within_budget`]).
//!
//! [`CatalogEngine`] ties the stages to one source photo, memoizes the
//! cut-out, and drops results that belong to a photo that has since been
//! replaced.
//!
//! # Quick Start
//!
//! ```no_run
//! use catalog_variants::{save_variants, CatalogConfig, CatalogEngine, Passthrough, SourceImage};
//! use rand::SeedableRng;
//! use std::path::Path;
//!
//! # async fn run() -> catalog_variants::Result<()> {
//! let mut engine = CatalogEngine::new(Passthrough, CatalogConfig::default())?;
//! engine.select_source(Some(SourceImage::open(Path::new("shoe.jpg"))?));
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let variants = engine.generate(5, &mut rng).await?;
//! save_variants(Path::new("shoe_variants"), variants)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Without the engine
//!
//! The stages are plain functions and can be driven directly:
//!
//! ```no_run
//! use catalog_variants::{generate_variants, key_white_background, CatalogConfig};
//!
//! let on_white = image::open("product_on_white.png").unwrap().to_rgba8();
//! let cutout = key_white_background(&on_white);
//! let variants =
//!     generate_variants(&cutout, 3, &CatalogConfig::default(), &mut rand::rng()).unwrap();
//! println!("{} variants, first is {} bytes", variants.len(), variants[0].image().bytes().len());
//! ```

#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod bounds;
pub mod color;
pub mod compose;
pub mod config;
pub mod encode;
mod engine;
pub mod error;
#[cfg(feature = "gemini")]
#[cfg_attr(docsrs, doc(cfg(feature = "gemini")))]
pub mod gemini;
pub mod keying;
pub mod remover;
pub mod source;
pub mod surface;
pub mod variants;

pub use bounds::{find_subject_bounds, BoundingBox};
pub use color::ColorSpec;
pub use compose::{compose_frame, FrameLayout};
pub use config::{CatalogConfig, EncodeOptions};
pub use encode::{encode_within_budget, EncodedImage, OutputFormat};
pub use engine::{
    default_output_dir, is_supported_image, save_variants, variant_file_name, CatalogEngine,
    Extracted, ExtractionJob, GeneratedRun, GenerationJob, VARIANT_FILE_PREFIX,
};
pub use error::{Error, Result};
#[cfg(feature = "gemini")]
pub use gemini::GeminiClient;
pub use keying::{is_background, key_white_background};
pub use remover::{BackgroundRemover, Passthrough};
pub use source::SourceImage;
pub use surface::Surface;
pub use variants::{generate_variants, RunId, Variant, VariantId};
