//! This crate provides the core data types and codecs for the `chunkanim-rs` project.
//!
//! # File Formats
//!
//! - **Atlas**: palette plus the reusable raster chunks of an animation
//! - **Command stream**: placement instructions that composite chunks into frames
//! - **Palette**: 256-entry color tables, 6-bit VGA or 8-bit RGB
//!
//! # Algorithms
//!
//! - [`blob`]: connected-region detection and bounding-box merging
//! - [`file::anim::Decoder`]: command stream decoding with a first-frame probe mode
//! - [`file::anim::ChainResolver`]: seeding continuation files from their siblings
//! - [`file::anim::Encoder`]: diffing, decomposition and deduplication of frames
//!
//! # Examples
//!
//! Using the prelude (recommended):
//!
//! ```no_run
//! use chunkanim_types::prelude::*;
//!
//! # fn main() -> Result<(), AnimError> {
//! let animation = Animation::open("INTRO.ATL", "INTRO.CMD", &RleCodec)?;
//! let rendered = animation.render(&CodecConfig::legacy(), None)?;
//! println!("{} frames", rendered.len());
//! # Ok(())
//! # }
//! ```
//!
//! Or use explicit paths:
//!
//! ```no_run
//! use chunkanim_types::file::{Palette, PaletteDepth};
//!
//! let bytes = std::fs::read("GAME.PAL").unwrap();
//! let palette = Palette::from_bytes(&bytes, PaletteDepth::detect(&bytes)).unwrap();
//! ```

pub mod blob;
pub mod file;

/// `use chunkanim_types::prelude::*;` to import commonly used items.
pub mod prelude;
