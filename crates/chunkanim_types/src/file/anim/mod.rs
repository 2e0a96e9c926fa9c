//! Chunked delta-frame animation support.
//!
//! One logical animation is a pair of files:
//!
//! - the **atlas**: an optional palette plus a set of reusable raster chunks,
//!   each with a default placement rectangle
//! - the **command stream**: placement instructions that composite chunks
//!   onto a persistent canvas, one `EndOfFrame` per rendered frame
//!
//! Long animations are split across numbered files. A file whose first frame
//! is incomplete continues the previous file and is rendered on top of its
//! last frame; [`ChainResolver`] finds and decodes those ancestors.
//!
//! # Features
//!
//! - **Decoding**: render every frame, or probe only the first one
//! - **Chain resolution**: seed continuation files from siblings or a still image
//! - **Encoding**: turn full frames back into a deduplicated atlas and stream,
//!   by bounding-box cropping or connected-region decomposition
//!
//! # Examples
//!
//! ## Rendering an animation
//!
//! ```no_run
//! use chunkanim_types::file::{RleCodec, anim::{Animation, CodecConfig}};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let animation = Animation::open("WALK.ATL", "WALK.CMD", &RleCodec)?;
//! let rendered = animation.render(&CodecConfig::default(), None)?;
//!
//! for (i, frame) in rendered.frames().iter().enumerate() {
//!     println!("frame {i}: {} chunks", frame.chunk_count());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Encoding frames
//!
//! ```
//! use chunkanim_types::file::{
//!     IndexedImage, RleCodec,
//!     anim::{CodecConfig, Encoder, EncoderOptions},
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CodecConfig::with_canvas(2, 2);
//! let frames = vec![
//!     IndexedImage::new(2, 2, vec![1, 1, 1, 1])?,
//!     IndexedImage::new(2, 2, vec![1, 1, 2, 1])?,
//! ];
//!
//! let encoded = Encoder::new(config, EncoderOptions::crop()).encode(&frames, None, &RleCodec)?;
//! assert_eq!(encoded.atlas().len(), 2);
//!
//! let rendered = encoded.into_animation().render(&config, None)?;
//! assert_eq!(rendered.frames()[1].pixels(), &[1, 1, 2, 1]);
//! # Ok(())
//! # }
//! ```

mod atlas;
mod canvas;
mod chain;
mod chunk;
mod command;
mod config;
mod decoder;
mod file;

/// Format constants
pub mod constants;

/// Frame sequence encoder
pub mod encoder;

pub use self::atlas::Atlas;
pub use self::canvas::{Canvas, paste};
pub use self::chain::{ChainResolver, ChainStore, ContinuationChain};
pub use self::chunk::{Chunk, ChunkCompression, ChunkKey, Rect, content_key};
pub use self::command::{Command, CommandReader, CommandStream};
pub use self::config::CodecConfig;
pub use self::decoder::{Decoder, FrameProbe, FrameResult, ProbeFailure, Rendered};
pub use self::encoder::{EncodeStats, EncodedAnimation, Encoder, EncoderOptions, Strategy};
pub use self::file::Animation;
