#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! `chunkanim-rs` decodes and re-encodes legacy chunked delta-frame animations.
//!
//! An animation is a chunk atlas plus a command stream that composites the
//! chunks onto a persistent canvas. See [`chunkanim_types`] for the formats,
//! the decoder, the continuation resolver and the encoder.

/// `use chunkanim::prelude::*;` to import commonly used items.
pub mod prelude {
	pub use chunkanim_types::prelude::*;
}

// Re-export chunkanim_types for convenience
pub use chunkanim_types;

// Re-export commonly used types at crate root
pub use chunkanim_types::file::{AnimError, Animation, Atlas, CodecConfig, Encoder, EncoderOptions};
