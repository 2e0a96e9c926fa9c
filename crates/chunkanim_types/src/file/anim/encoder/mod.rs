//! Frame sequence encoder.
//!
//! Turns full frames into a deduplicated atlas and a command stream:
//!
//! 1. Frame 0 becomes one full-canvas keyframe chunk, or is diffed against a
//!    seed frame when encoding a continuation file.
//! 2. Every later frame is diffed against the previous one and the changed
//!    pixels are cut into pieces ([`Strategy::Crop`] or [`Strategy::Blob`]).
//! 3. Pieces with identical raster content share one atlas chunk. Each chunk
//!    is stored at its most frequent placement so that the fewest commands
//!    need a position override.
//! 4. Chunks are compressed when that makes them strictly smaller.

mod dedup;
mod diff;
mod options;

use std::fmt;

use log::{debug, info};
use serde::Serialize;

use crate::file::{
	AnimError, FileType,
	compression::ChunkCodec,
	palette::Palette,
	raster::IndexedImage,
};

use super::{
	atlas::Atlas,
	canvas::Canvas,
	chunk::{Chunk, Rect},
	command::{Command, CommandStream},
	config::CodecConfig,
	constants,
	file::Animation,
};

use dedup::ChunkTable;
use diff::{FrameDiff, Piece};

pub use options::{EncoderOptions, Strategy};

/// Counters describing one encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EncodeStats {
	/// Frames encoded
	pub frames: usize,
	/// Chunk placements across all frames
	pub placements: usize,
	/// Unique chunks in the atlas
	pub unique_chunks: usize,
	/// Placements that needed a position override
	pub overrides: usize,
	/// Chunks stored compressed
	pub compressed_chunks: usize,
}

impl fmt::Display for EncodeStats {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} frames, {} placements, {} unique chunks ({} compressed), {} overrides",
			self.frames, self.placements, self.unique_chunks, self.compressed_chunks, self.overrides
		)
	}
}

/// Result of an encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAnimation {
	atlas: Atlas,
	commands: CommandStream,
	stats: EncodeStats,
}

impl EncodedAnimation {
	/// The generated atlas.
	pub fn atlas(&self) -> &Atlas {
		&self.atlas
	}

	/// The generated command stream.
	pub fn commands(&self) -> &CommandStream {
		&self.commands
	}

	/// Encode counters.
	pub fn stats(&self) -> EncodeStats {
		self.stats
	}

	/// Serializes the atlas and the command stream.
	///
	/// # Errors
	///
	/// Returns an error if the atlas cannot be serialized.
	pub fn to_bytes(&self, codec: &dyn ChunkCodec) -> Result<(Vec<u8>, Vec<u8>), AnimError> {
		Ok((self.atlas.to_bytes(codec)?, self.commands.to_bytes()))
	}

	/// Converts the result into a decodable animation.
	pub fn into_animation(self) -> Animation {
		Animation::from_commands(self.atlas, &self.commands)
	}
}

/// Encodes frame sequences.
#[derive(Debug, Clone, Copy, Default)]
pub struct Encoder {
	config: CodecConfig,
	options: EncoderOptions,
}

impl Encoder {
	/// Creates an encoder.
	pub fn new(config: CodecConfig, options: EncoderOptions) -> Self {
		Self {
			config,
			options,
		}
	}

	/// Encoder options.
	pub fn options(&self) -> &EncoderOptions {
		&self.options
	}

	/// Encodes a self-contained animation.
	///
	/// `palette` is embedded in the atlas; without it the first frame's
	/// palette is used, if it has one.
	///
	/// # Errors
	///
	/// - [`AnimError::DimensionMismatch`] if a frame is not canvas-sized
	/// - [`AnimError::UnsupportedBitDepth`] if a frame is not 8-bit
	/// - [`AnimError::UnsupportedDiff`] if a frame paints the transparent index after frame 0
	/// - [`AnimError::TooManyChunks`] if the chunks do not fit the index space
	pub fn encode(
		&self,
		frames: &[IndexedImage],
		palette: Option<&Palette>,
		codec: &dyn ChunkCodec,
	) -> Result<EncodedAnimation, AnimError> {
		self.run(frames, palette, None, codec)
	}

	/// Encodes a continuation file that starts from `seed`.
	///
	/// Frame 0 is diffed against `seed`, so the output has no usable first
	/// frame of its own unless every pixel changed.
	///
	/// # Errors
	///
	/// As [`Encoder::encode`], plus a dimension mismatch for a wrongly sized seed.
	pub fn encode_continuation(
		&self,
		frames: &[IndexedImage],
		palette: Option<&Palette>,
		seed: &Canvas,
		codec: &dyn ChunkCodec,
	) -> Result<EncodedAnimation, AnimError> {
		self.run(frames, palette, Some(seed), codec)
	}

	fn check_frame(&self, index: usize, frame: &IndexedImage) -> Result<(), AnimError> {
		if frame.bit_depth() != 8 {
			return Err(AnimError::UnsupportedBitDepth {
				frame: index,
				depth: frame.bit_depth(),
			});
		}
		self.check_size(FileType::Frames, frame.width(), frame.height())
	}

	fn check_size(&self, file_type: FileType, width: usize, height: usize) -> Result<(), AnimError> {
		let (expected_width, expected_height) = (self.config.canvas_width, self.config.canvas_height);
		if width != expected_width || height != expected_height {
			return Err(AnimError::DimensionMismatch {
				file_type,
				expected_width,
				expected_height,
				width,
				height,
			});
		}
		Ok(())
	}

	fn run(
		&self,
		frames: &[IndexedImage],
		palette: Option<&Palette>,
		seed: Option<&Canvas>,
		codec: &dyn ChunkCodec,
	) -> Result<EncodedAnimation, AnimError> {
		self.config.validate()?;
		let (width, height) = (self.config.canvas_width, self.config.canvas_height);
		let sentinel = self.config.transparent_index;

		if let Some(seed) = seed {
			self.check_size(FileType::Still, seed.width(), seed.height())?;
		}

		let mut table = ChunkTable::default();
		let mut placements: Vec<Vec<(usize, Rect)>> = Vec::with_capacity(frames.len());
		let mut previous = seed.cloned();

		for (index, frame) in frames.iter().enumerate() {
			self.check_frame(index, frame)?;
			let target = Canvas::from_raw(width, height, frame.pixels().to_vec());

			let mut pieces = match &previous {
				None => vec![Piece {
					rect: Rect::new(0, 0, width, height),
					pixels: target.pixels().to_vec(),
				}],
				Some(previous) => FrameDiff::new(previous, &target, sentinel, index)?.pieces(&target, &self.options),
			};

			// A full-canvas first placement is pasted opaque, so it must carry
			// the real pixels rather than transparent "unchanged" markers.
			if index == 0
				&& let Some(first) = pieces.first_mut()
				&& first.rect.covers_canvas(width, height)
			{
				first.pixels = target.pixels().to_vec();
			}

			let mut frame_placements = Vec::with_capacity(pieces.len());
			for piece in pieces {
				let rect = piece.rect;
				frame_placements.push((table.intern(rect, piece.pixels)?, rect));
			}
			debug!("frame {index}: {} pieces, {} unique chunks so far", frame_placements.len(), table.len());

			placements.push(frame_placements);
			previous = Some(target);
		}

		let promote = self.options.promote_frequent_rects;
		let mut stats = EncodeStats {
			frames: frames.len(),
			unique_chunks: table.len(),
			..EncodeStats::default()
		};

		let mut commands = CommandStream::new();
		for frame in &placements {
			for &(slot, rect) in frame {
				stats.placements += 1;
				// slots are bounded by MAX_CHUNKS, which fits in 15 bits
				let index = slot as u16;
				if rect == table.canonical_rect(slot, promote) {
					commands.push(Command::place(index));
					continue;
				}
				if slot > constants::MAX_OVERRIDE_INDEX {
					return Err(AnimError::TooManyChunks {
						count: slot + 1,
						max: constants::MAX_OVERRIDE_INDEX + 1,
					});
				}
				stats.overrides += 1;
				commands.push(Command::place_at(index, rect.x as u16, rect.y as u16));
			}
			commands.push(Command::EndOfFrame);
		}
		commands.push(Command::EndOfStream);

		let chunks = table.into_chunks(promote).map(|(rect, pixels)| Chunk::new(rect, pixels)).collect();
		let palette = palette.or_else(|| frames.first().and_then(IndexedImage::palette)).cloned();
		let mut atlas = Atlas::from_parts(palette, chunks).with_palette_depth(self.config.palette_depth);
		if self.options.compress {
			stats.compressed_chunks = atlas.select_compression(codec);
		}

		info!("encoded ({} strategy): {stats}", self.options.strategy);

		Ok(EncodedAnimation {
			atlas,
			commands,
			stats,
		})
	}
}
