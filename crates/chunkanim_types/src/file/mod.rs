//! File type support for `chunkanim-rs` project.

mod error;

pub mod anim;
pub mod compression;
pub mod format;
pub mod palette;
pub mod raster;

// Re-export unified error type
pub use error::{AnimError, CompressionError, FileType};

// Re-export main file types
pub use anim::{Animation, Atlas, CodecConfig, CommandStream, Encoder, EncoderOptions};
pub use compression::{ChunkCodec, NoCompression, RleCodec};
pub use format::{Decoded, Format, FormatInfo};
pub use palette::{Color, PALETTE_BYTES, PALETTE_SIZE, Palette, PaletteDepth, TransparencyGuide};
pub use raster::{IndexedImage, RasterSink, RasterSource};
