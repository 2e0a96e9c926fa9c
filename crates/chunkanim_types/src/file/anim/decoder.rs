//! Command stream decoder.
//!
//! The decoder reads commands one at a time and composites the referenced
//! chunks onto a canvas that lives for the whole decode:
//!
//! - `PlaceChunk` pastes the chunk at its atlas rectangle or the override position
//! - `EndOfFrame` snapshots the canvas as the next [`FrameResult`]
//! - `EndOfStream` snapshots a frame that still has pending placements, then stops
//!
//! The first placement of a self-contained file covers the whole canvas at
//! (0, 0) and is pasted opaque. A file whose first frame has no placements,
//! or starts with a partial placement, has no usable first frame: it only
//! renders correctly on top of the last frame of the file it continues.

use log::{debug, trace};

use crate::file::{AnimError, FileType, palette::TransparencyGuide};

use super::{
	atlas::Atlas,
	canvas::{Canvas, paste},
	command::{Command, CommandReader},
	config::CodecConfig,
};

/// One rendered frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameResult {
	canvas: Canvas,
	chunk_count: usize,
	incomplete_first_frame: bool,
}

impl FrameResult {
	/// Snapshot of the composited canvas.
	pub fn canvas(&self) -> &Canvas {
		&self.canvas
	}

	/// Composited pixels.
	pub fn pixels(&self) -> &[u8] {
		self.canvas.pixels()
	}

	/// Number of chunk placements that contributed to this frame.
	pub fn chunk_count(&self) -> usize {
		self.chunk_count
	}

	/// Returns `true` for a first frame that cannot stand alone.
	pub fn is_incomplete_first_frame(&self) -> bool {
		self.incomplete_first_frame
	}

	/// Consumes the frame and returns its canvas.
	pub fn into_canvas(self) -> Canvas {
		self.canvas
	}
}

/// Every frame of a decoded command stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rendered {
	frames: Vec<FrameResult>,
	no_first_frame: bool,
	seeded: bool,
	best_effort: bool,
}

impl Rendered {
	/// Rendered frames in stream order.
	pub fn frames(&self) -> &[FrameResult] {
		&self.frames
	}

	/// Number of frames.
	pub fn len(&self) -> usize {
		self.frames.len()
	}

	/// Returns `true` when the stream produced no frames.
	pub fn is_empty(&self) -> bool {
		self.frames.is_empty()
	}

	/// Last rendered frame, the seed for a file that continues this one.
	pub fn last_frame(&self) -> Option<&FrameResult> {
		self.frames.last()
	}

	/// Returns `true` if the stream has no usable first frame.
	pub fn no_first_frame(&self) -> bool {
		self.no_first_frame
	}

	/// Returns `true` if decoding started from a supplied initial canvas.
	pub fn is_seeded(&self) -> bool {
		self.seeded
	}

	/// Returns `true` if the frames were rendered on a blank canvas because
	/// the missing first frame could not be recovered.
	pub fn is_best_effort(&self) -> bool {
		self.best_effort
	}

	/// Marks the result as rendered without its real seed.
	pub fn mark_best_effort(&mut self) {
		self.best_effort = true;
	}

	/// Consumes the result and returns the frames.
	pub fn into_frames(self) -> Vec<FrameResult> {
		self.frames
	}
}

/// First frame of a self-sufficient stream, produced by probe mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameProbe {
	/// Rendered width
	pub width: usize,
	/// Rendered height
	pub height: usize,
	/// Placements in the first frame
	pub chunk_count: usize,
	/// The first frame itself
	pub first_frame: Canvas,
}

/// Why probe mode did not produce a first frame.
#[derive(Debug)]
pub enum ProbeFailure {
	/// The stream has no usable first frame and needs a continuation seed
	NeedsContinuation,
	/// The file could not be decoded
	Rejected(AnimError),
}

impl From<AnimError> for ProbeFailure {
	fn from(err: AnimError) -> Self {
		Self::Rejected(err)
	}
}

impl std::fmt::Display for ProbeFailure {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::NeedsContinuation => write!(f, "no usable first frame"),
			Self::Rejected(err) => write!(f, "rejected: {err}"),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeMode {
	Full,
	Probe,
}

enum Outcome {
	Rendered(Rendered),
	FirstFrame(FrameProbe),
	NeedsContinuation,
}

/// Drives the compositor from a command stream.
#[derive(Debug)]
pub struct Decoder<'a> {
	atlas: &'a Atlas,
	config: &'a CodecConfig,
	guide: TransparencyGuide,
}

impl<'a> Decoder<'a> {
	/// Creates a decoder over an atlas.
	pub fn new(atlas: &'a Atlas, config: &'a CodecConfig) -> Self {
		let guide = match atlas.palette() {
			Some(palette) => palette.transparency_guide(config.transparent_index),
			None => TransparencyGuide::single(config.transparent_index),
		};
		Self {
			atlas,
			config,
			guide,
		}
	}

	/// Decodes every frame of `stream`.
	///
	/// `seed` becomes the initial canvas; without it the canvas starts zeroed.
	///
	/// # Errors
	///
	/// Returns an error for malformed streams, chunk references beyond the
	/// atlas, or a seed whose size differs from the configured canvas.
	pub fn render(&self, stream: &[u8], seed: Option<&Canvas>) -> Result<Rendered, AnimError> {
		match self.run(stream, seed, DecodeMode::Full)? {
			Outcome::Rendered(rendered) => Ok(rendered),
			Outcome::FirstFrame(_) | Outcome::NeedsContinuation => Err(AnimError::malformed(
				FileType::Stream,
				"decoding stopped before the end of the stream",
			)),
		}
	}

	/// Decodes only the first frame of `stream`.
	///
	/// Stops as soon as the first frame is known to be incomplete, without
	/// materializing any further frames.
	///
	/// # Errors
	///
	/// [`ProbeFailure::NeedsContinuation`] when the first frame cannot stand
	/// alone, [`ProbeFailure::Rejected`] when the stream cannot be decoded.
	pub fn probe(&self, stream: &[u8]) -> Result<FrameProbe, ProbeFailure> {
		match self.run(stream, None, DecodeMode::Probe)? {
			Outcome::FirstFrame(probe) => Ok(probe),
			Outcome::NeedsContinuation => Err(ProbeFailure::NeedsContinuation),
			Outcome::Rendered(_) => Err(ProbeFailure::Rejected(AnimError::malformed(
				FileType::Stream,
				"stream contains no frames",
			))),
		}
	}

	fn run(
		&self,
		stream: &[u8],
		seed: Option<&Canvas>,
		mode: DecodeMode,
	) -> Result<Outcome, AnimError> {
		let (width, height) = (self.config.canvas_width, self.config.canvas_height);
		self.config.validate()?;

		let mut canvas = match seed {
			Some(seed) if !seed.has_size(width, height) => {
				return Err(AnimError::DimensionMismatch {
					file_type: FileType::Still,
					expected_width: width,
					expected_height: height,
					width: seed.width(),
					height: seed.height(),
				});
			}
			Some(seed) => seed.clone(),
			None => Canvas::new(width, height),
		};

		let mut reader = CommandReader::new(stream, self.atlas.len());
		let mut frames = Vec::new();
		let mut pending = 0usize;
		let mut placements = 0usize;
		let mut no_first_frame = false;

		while let Some(command) = reader.next_command()? {
			trace!("{:#06X}: {command}", reader.position());
			let end_of_frame = match command {
				Command::PlaceChunk {
					index,
					offset,
				} => {
					let chunk = &self.atlas.chunks()[usize::from(index)];
					let rect = match offset {
						Some((x, y)) => chunk.rect().at(usize::from(x), usize::from(y)),
						None => chunk.rect(),
					};

					if placements == 0 && frames.is_empty() {
						if rect.covers_canvas(width, height) {
							paste(&mut canvas, chunk.pixels(), rect, &TransparencyGuide::opaque(), None);
						} else {
							debug!("first placement {rect} does not cover the canvas");
							no_first_frame = true;
							if mode == DecodeMode::Probe {
								return Ok(Outcome::NeedsContinuation);
							}
							paste(&mut canvas, chunk.pixels(), rect, &self.guide, None);
						}
					} else {
						paste(&mut canvas, chunk.pixels(), rect, &self.guide, None);
					}

					pending += 1;
					placements += 1;
					false
				}
				Command::EndOfFrame => true,
				Command::EndOfStream => pending > 0,
			};

			if !end_of_frame {
				continue;
			}

			let first = frames.is_empty();
			if first && placements == 0 {
				debug!("first frame has no placements");
				no_first_frame = true;
				if mode == DecodeMode::Probe {
					return Ok(Outcome::NeedsContinuation);
				}
			}

			if first && mode == DecodeMode::Probe {
				return Ok(Outcome::FirstFrame(FrameProbe {
					width,
					height,
					chunk_count: pending,
					first_frame: canvas,
				}));
			}

			frames.push(FrameResult {
				canvas: canvas.clone(),
				chunk_count: pending,
				incomplete_first_frame: first && no_first_frame,
			});
			pending = 0;
		}

		if frames.is_empty() && mode == DecodeMode::Probe {
			return Ok(Outcome::Rendered(Rendered::default()));
		}

		debug!(
			"decoded {} frames from {} placements{}",
			frames.len(),
			placements,
			if no_first_frame {
				" (no first frame)"
			} else {
				""
			}
		);

		Ok(Outcome::Rendered(Rendered {
			frames,
			no_first_frame,
			seeded: seed.is_some(),
			best_effort: false,
		}))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::file::anim::chunk::{Chunk, Rect};

	fn one_pixel_atlas(value: u8) -> Atlas {
		Atlas::from_parts(None, vec![Chunk::new(Rect::new(0, 0, 1, 1), vec![value])])
	}

	#[test]
	fn test_single_chunk_stream() {
		let atlas = one_pixel_atlas(5);
		let config = CodecConfig::with_canvas(1, 1);
		let rendered = Decoder::new(&atlas, &config).render(&[0x00, 0x00, 0xFF, 0xFE], None).unwrap();

		assert_eq!(rendered.len(), 1);
		assert_eq!(rendered.frames()[0].pixels(), &[5]);
		assert_eq!(rendered.frames()[0].chunk_count(), 1);
		assert!(!rendered.no_first_frame());
	}

	#[test]
	fn test_keyframe_paste_is_opaque() {
		// The keyframe writes index 0 even though 0 is transparent
		let atlas = Atlas::from_parts(None, vec![Chunk::new(Rect::new(0, 0, 2, 1), vec![0, 3])]);
		let config = CodecConfig::with_canvas(2, 1);
		let seed = Canvas::from_pixels(2, 1, vec![9, 9]).unwrap();
		let rendered =
			Decoder::new(&atlas, &config).render(&[0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFE], Some(&seed)).unwrap();
		assert_eq!(rendered.frames()[0].pixels(), &[0, 3]);
		assert!(rendered.is_seeded());
	}

	#[test]
	fn test_empty_first_frame_is_incomplete() {
		let atlas = one_pixel_atlas(5);
		let config = CodecConfig::with_canvas(2, 1);
		let stream = [0xFF, 0xFF, 0x80, 0x00, 0x00, 0x01, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFE];
		let decoder = Decoder::new(&atlas, &config);

		let rendered = decoder.render(&stream, None).unwrap();
		assert!(rendered.no_first_frame());
		assert_eq!(rendered.len(), 2);
		assert!(rendered.frames()[0].is_incomplete_first_frame());
		assert!(!rendered.frames()[1].is_incomplete_first_frame());
		assert_eq!(rendered.frames()[1].pixels(), &[0, 5]);

		assert!(matches!(decoder.probe(&stream), Err(ProbeFailure::NeedsContinuation)));

		let seed = Canvas::from_pixels(2, 1, vec![7, 7]).unwrap();
		let seeded = decoder.render(&stream, Some(&seed)).unwrap();
		assert_eq!(seeded.frames()[0].pixels(), &[7, 7]);
		assert_eq!(seeded.frames()[1].pixels(), &[7, 5]);
	}

	#[test]
	fn test_partial_first_placement_is_incomplete() {
		let atlas = one_pixel_atlas(5);
		let config = CodecConfig::with_canvas(2, 2);
		let decoder = Decoder::new(&atlas, &config);
		let stream = [0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFE];

		assert!(decoder.render(&stream, None).unwrap().no_first_frame());
		assert!(matches!(decoder.probe(&stream), Err(ProbeFailure::NeedsContinuation)));
	}

	#[test]
	fn test_probe_returns_first_frame() {
		let atlas = Atlas::from_parts(
			None,
			vec![Chunk::new(Rect::new(0, 0, 2, 1), vec![1, 2]), Chunk::new(Rect::new(1, 0, 1, 1), vec![8])],
		);
		let config = CodecConfig::with_canvas(2, 1);
		// Frame 1 references a chunk the probe never reaches
		let stream = [0x00, 0x00, 0xFF, 0xFF, 0x00, 0x01, 0xFF, 0xFF, 0xFF, 0xFE];
		let probe = Decoder::new(&atlas, &config).probe(&stream).unwrap();
		assert_eq!(probe.first_frame.pixels(), &[1, 2]);
		assert_eq!(probe.chunk_count, 1);
		assert_eq!((probe.width, probe.height), (2, 1));
	}

	#[test]
	fn test_out_of_range_chunk_is_fatal() {
		let atlas = one_pixel_atlas(5);
		let config = CodecConfig::with_canvas(1, 1);
		let err = Decoder::new(&atlas, &config).render(&[0x00, 0x01, 0xFF, 0xFE], None).unwrap_err();
		assert!(matches!(
			err,
			AnimError::OutOfRangeReference {
				index: 1,
				limit: 1,
				..
			}
		));
	}

	#[test]
	fn test_seed_size_is_checked() {
		let atlas = one_pixel_atlas(5);
		let config = CodecConfig::with_canvas(2, 2);
		let seed = Canvas::new(3, 3);
		assert!(matches!(
			Decoder::new(&atlas, &config).render(&[0xFF, 0xFE], Some(&seed)),
			Err(AnimError::DimensionMismatch { .. })
		));
	}

	#[test]
	fn test_frame_snapshots_do_not_alias() {
		let atlas = Atlas::from_parts(
			None,
			vec![Chunk::new(Rect::new(0, 0, 1, 1), vec![1]), Chunk::new(Rect::new(0, 0, 1, 1), vec![2])],
		);
		let config = CodecConfig::with_canvas(1, 1);
		let stream = [0x00, 0x00, 0xFF, 0xFF, 0x00, 0x01, 0xFF, 0xFF, 0xFF, 0xFE];
		let rendered = Decoder::new(&atlas, &config).render(&stream, None).unwrap();
		assert_eq!(rendered.frames()[0].pixels(), &[1]);
		assert_eq!(rendered.frames()[1].pixels(), &[2]);
	}
}
