//! Prelude module for `chunkanim_types`.
//!
//! This module provides a convenient way to import commonly used types, traits, and constants.
//!
//! # Examples
//!
//! ```no_run
//! use chunkanim_types::prelude::*;
//!
//! // Now you can use all common types directly
//! let config = CodecConfig::with_canvas(64, 48);
//! let encoder = Encoder::new(config, EncoderOptions::blob_merged(2));
//! ```

// File module types
#[doc(inline)]
pub use crate::file::{
	// Errors
	AnimError,
	// Animation types
	Animation,
	Atlas,
	// Compression
	ChunkCodec,
	CodecConfig,
	CommandStream,
	// Format dispatch
	Decoded,
	Encoder,
	EncoderOptions,
	FileType,
	Format,
	// Raster exchange
	IndexedImage,
	NoCompression,
	// Palette types
	Palette,
	PaletteDepth,
	RleCodec,
};

// Animation internals
#[doc(inline)]
pub use crate::file::anim::{
	Canvas, ChainResolver, ChainStore, Chunk, Command, FrameResult, ProbeFailure, Rect, Rendered,
	Strategy,
};

// Blob detection
#[doc(inline)]
pub use crate::blob::{Blob, find_blobs, merge_blobs};

// Re-export the file module for advanced usage
#[doc(inline)]
pub use crate::file;
