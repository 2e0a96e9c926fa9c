//! Format detection and dispatch.
//!
//! The container family has three kinds of files this crate understands: a
//! bare palette table, a chunk atlas on its own, and a complete animation
//! (atlas plus command stream). [`Format::detect`] picks the variant from the
//! bytes; every variant is then decoded, described and re-encoded through
//! the same three calls.

use std::fmt;

use serde::Serialize;

use crate::file::{
	AnimError, FileType,
	anim::{Animation, Atlas, Canvas, CodecConfig, Encoder, EncoderOptions, Rendered, constants},
	compression::ChunkCodec,
	palette::{PALETTE_BYTES, Palette, PaletteDepth},
	raster::IndexedImage,
};

/// File formats this crate decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
	/// 256 RGB triples
	Palette,
	/// Chunk atlas without a command stream
	Atlas,
	/// Chunk atlas with its command stream
	Animation,
}

impl fmt::Display for Format {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Palette => write!(f, "palette"),
			Self::Atlas => write!(f, "atlas"),
			Self::Animation => write!(f, "animation"),
		}
	}
}

fn plausible_atlas(data: &[u8]) -> bool {
	if data.len() < constants::ATLAS_HEADER_SIZE {
		return false;
	}
	let count = usize::from(u16::from_be_bytes([data[0], data[1]]));
	let flags = data[2];
	count <= constants::MAX_CHUNKS && flags & !constants::ATLAS_KNOWN_FLAGS == 0 && data[3] == 0
}

impl Format {
	/// Guesses the format of `primary`, with `stream` as the companion
	/// command stream if one exists.
	pub fn detect(primary: &[u8], stream: Option<&[u8]>) -> Option<Self> {
		match stream {
			Some(_) if plausible_atlas(primary) => Some(Self::Animation),
			Some(_) => None,
			None if primary.len() == PALETTE_BYTES => Some(Self::Palette),
			None if plausible_atlas(primary) => Some(Self::Atlas),
			None => None,
		}
	}

	/// Human-readable description.
	pub fn describe(&self) -> &'static str {
		match self {
			Self::Palette => "256-color palette table",
			Self::Atlas => "chunk atlas",
			Self::Animation => "chunked delta-frame animation",
		}
	}

	/// Decodes `primary` (and `stream` for animations) as this format.
	///
	/// # Errors
	///
	/// Returns an error if the data does not decode as this format, or if an
	/// animation is requested without a stream.
	pub fn decode(
		&self,
		primary: &[u8],
		stream: Option<&[u8]>,
		config: &CodecConfig,
		codec: &dyn ChunkCodec,
	) -> Result<Decoded, AnimError> {
		match self {
			Self::Palette => {
				let depth = PaletteDepth::detect(primary);
				Ok(Decoded::Palette {
					palette: Palette::from_bytes(primary, depth)?,
					depth,
				})
			}
			Self::Atlas => Ok(Decoded::Atlas(Atlas::from_bytes(primary, codec)?)),
			Self::Animation => {
				let stream = stream.ok_or_else(|| AnimError::insufficient_data(FileType::Stream, 2, 0))?;
				let animation = Animation::from_bytes(primary, stream, codec)?;
				let rendered = animation.render(config, None)?;
				Ok(Decoded::Animation {
					animation,
					rendered,
				})
			}
		}
	}
}

/// Summary of a decoded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatInfo {
	/// Detected format
	pub format: Format,
	/// Format description
	pub description: &'static str,
	/// Number of atlas chunks
	#[serde(skip_serializing_if = "Option::is_none")]
	pub chunks: Option<usize>,
	/// Number of rendered frames
	#[serde(skip_serializing_if = "Option::is_none")]
	pub frames: Option<usize>,
	/// Whether a palette is present
	pub has_palette: bool,
	/// Whether the animation needs a continuation seed
	#[serde(skip_serializing_if = "Option::is_none")]
	pub no_first_frame: Option<bool>,
}

/// A decoded file of any supported format.
#[derive(Debug, Clone)]
pub enum Decoded {
	/// Palette table
	Palette {
		/// Colors
		palette: Palette,
		/// Channel depth the table was stored with
		depth: PaletteDepth,
	},
	/// Atlas without a stream
	Atlas(Atlas),
	/// Animation with its frames rendered from a blank canvas
	Animation {
		/// Atlas and stream
		animation: Animation,
		/// Rendered frames
		rendered: Rendered,
	},
}

impl Decoded {
	/// Format of this value.
	pub fn format(&self) -> Format {
		match self {
			Self::Palette { .. } => Format::Palette,
			Self::Atlas(_) => Format::Atlas,
			Self::Animation { .. } => Format::Animation,
		}
	}

	/// Summarizes the decoded file.
	pub fn describe(&self) -> FormatInfo {
		let format = self.format();
		let mut info = FormatInfo {
			format,
			description: format.describe(),
			chunks: None,
			frames: None,
			has_palette: false,
			no_first_frame: None,
		};
		match self {
			Self::Palette { .. } => info.has_palette = true,
			Self::Atlas(atlas) => {
				info.chunks = Some(atlas.len());
				info.has_palette = atlas.palette().is_some();
			}
			Self::Animation {
				animation,
				rendered,
			} => {
				info.chunks = Some(animation.atlas().len());
				info.frames = Some(rendered.len());
				info.has_palette = animation.palette().is_some();
				info.no_first_frame = Some(rendered.no_first_frame());
			}
		}
		info
	}

	/// Re-encodes the value into its file bytes.
	///
	/// Palettes and atlases are written as they are. Animations are encoded
	/// again from their rendered frames with `options`, which yields the
	/// atlas followed by the command stream. An animation without a first
	/// frame of its own was rendered on a blank canvas; it is encoded as a
	/// continuation of that blank canvas, so it still needs its chain.
	///
	/// # Errors
	///
	/// Returns an error if serialization or encoding fails.
	pub fn to_bytes(
		&self,
		config: &CodecConfig,
		options: EncoderOptions,
		codec: &dyn ChunkCodec,
	) -> Result<Vec<Vec<u8>>, AnimError> {
		match self {
			Self::Palette {
				palette,
				depth,
			} => Ok(vec![palette.to_bytes(*depth).to_vec()]),
			Self::Atlas(atlas) => Ok(vec![atlas.to_bytes(codec)?]),
			Self::Animation {
				animation,
				rendered,
			} => {
				let frames: Vec<IndexedImage> = rendered
					.frames()
					.iter()
					.map(|frame| IndexedImage::from_canvas(frame.canvas().clone(), None))
					.collect();
				let encoder = Encoder::new(*config, options);
				let encoded = if rendered.no_first_frame() {
					let blank = Canvas::new(config.canvas_width, config.canvas_height);
					encoder.encode_continuation(&frames, animation.palette(), &blank, codec)?
				} else {
					encoder.encode(&frames, animation.palette(), codec)?
				};
				let (atlas, stream) = encoded.to_bytes(codec)?;
				Ok(vec![atlas, stream])
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::file::{
		RleCodec,
		anim::{Chunk, Rect},
	};

	#[test]
	fn test_detect() {
		assert_eq!(Format::detect(&[0u8; PALETTE_BYTES], None), Some(Format::Palette));
		assert_eq!(Format::detect(&[0, 0, 0, 0], None), Some(Format::Atlas));
		assert_eq!(Format::detect(&[0, 0, 0, 0], Some(&[0xFF, 0xFE])), Some(Format::Animation));
		assert_eq!(Format::detect(&[0, 0, 0x80, 0], None), None);
		assert_eq!(Format::detect(&[0xFF, 0xFF, 0, 0], None), None);
	}

	#[test]
	fn test_animation_reencodes_to_same_frames() {
		let config = CodecConfig::with_canvas(2, 1);
		let atlas = Atlas::from_parts(
			None,
			vec![Chunk::new(Rect::new(0, 0, 2, 1), vec![1, 2]), Chunk::new(Rect::new(1, 0, 1, 1), vec![7])],
		);
		let atlas_bytes = atlas.to_bytes(&RleCodec).unwrap();
		let stream = [0x00, 0x00, 0xFF, 0xFF, 0x00, 0x01, 0xFF, 0xFF, 0xFF, 0xFE];

		let format = Format::detect(&atlas_bytes, Some(&stream)).unwrap();
		let decoded = format.decode(&atlas_bytes, Some(&stream), &config, &RleCodec).unwrap();
		let info = decoded.describe();
		assert_eq!(info.frames, Some(2));
		assert_eq!(info.no_first_frame, Some(false));

		let files = decoded.to_bytes(&config, EncoderOptions::crop(), &RleCodec).unwrap();
		let again = Format::Animation.decode(&files[0], Some(&files[1]), &config, &RleCodec).unwrap();
		let Decoded::Animation {
			rendered,
			..
		} = again
		else {
			panic!("expected an animation");
		};
		assert_eq!(rendered.frames()[1].pixels(), &[1, 7]);
	}

	#[test]
	fn test_continuation_stays_a_continuation() {
		let config = CodecConfig::with_canvas(2, 1);
		let atlas = Atlas::from_parts(None, vec![Chunk::new(Rect::new(1, 0, 1, 1), vec![4])]);
		let atlas_bytes = atlas.to_bytes(&RleCodec).unwrap();
		let stream = [0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFE];

		let decoded = Format::Animation.decode(&atlas_bytes, Some(&stream), &config, &RleCodec).unwrap();
		assert_eq!(decoded.describe().no_first_frame, Some(true));

		let files = decoded.to_bytes(&config, EncoderOptions::crop(), &RleCodec).unwrap();
		let again = Format::Animation.decode(&files[0], Some(&files[1]), &config, &RleCodec).unwrap();
		assert_eq!(again.describe().no_first_frame, Some(true));

		let Decoded::Animation {
			animation,
			..
		} = again
		else {
			panic!("expected an animation");
		};
		let seed = Canvas::from_pixels(2, 1, vec![7, 7]).unwrap();
		assert_eq!(animation.render(&config, Some(&seed)).unwrap().frames()[0].pixels(), &[7, 4]);
	}

	#[test]
	fn test_palette_round_trip() {
		let mut bytes = [0u8; PALETTE_BYTES];
		bytes[3] = 0x3F;
		let decoded = Format::Palette.decode(&bytes, None, &CodecConfig::default(), &RleCodec).unwrap();
		assert!(decoded.describe().has_palette);
		assert_eq!(
			decoded.to_bytes(&CodecConfig::default(), EncoderOptions::crop(), &RleCodec).unwrap()[0],
			bytes.to_vec()
		);
	}
}
