//! Chunk types for the animation atlas.
//!
//! A chunk is one reusable raster sub-image plus the rectangle it is placed
//! at by default. Chunk identity is its raster content only: two chunks with
//! the same width, height and pixels are the same chunk wherever they sit.

use std::fmt;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::file::{AnimError, FileType};

use super::constants;

/// Placement rectangle in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
	/// Left edge
	pub x: usize,
	/// Top edge
	pub y: usize,
	/// Width in pixels
	pub width: usize,
	/// Height in pixels
	pub height: usize,
}

impl Rect {
	/// Creates a new rectangle.
	pub const fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
		Self {
			x,
			y,
			width,
			height,
		}
	}

	/// Exclusive right edge.
	#[inline]
	pub fn right(&self) -> usize {
		self.x + self.width
	}

	/// Exclusive bottom edge.
	#[inline]
	pub fn bottom(&self) -> usize {
		self.y + self.height
	}

	/// Number of pixels covered.
	#[inline]
	pub fn area(&self) -> usize {
		self.width * self.height
	}

	/// Returns `true` when the rectangle covers nothing.
	#[inline]
	pub fn is_empty(&self) -> bool {
		self.width == 0 || self.height == 0
	}

	/// Returns `true` when both rectangles share at least one pixel.
	pub fn intersects(&self, other: &Rect) -> bool {
		!self.is_empty()
			&& !other.is_empty()
			&& self.x < other.right()
			&& other.x < self.right()
			&& self.y < other.bottom()
			&& other.y < self.bottom()
	}

	/// Smallest rectangle containing both.
	pub fn union(&self, other: &Rect) -> Rect {
		if self.is_empty() {
			return *other;
		}
		if other.is_empty() {
			return *self;
		}
		let x = self.x.min(other.x);
		let y = self.y.min(other.y);
		Rect::new(x, y, self.right().max(other.right()) - x, self.bottom().max(other.bottom()) - y)
	}

	/// Grows every side by `pad` pixels, clamped to a `width`×`height` canvas.
	pub fn inflate(&self, pad: usize, width: usize, height: usize) -> Rect {
		let x = self.x.saturating_sub(pad);
		let y = self.y.saturating_sub(pad);
		let right = (self.right() + pad).min(width);
		let bottom = (self.bottom() + pad).min(height);
		Rect::new(x, y, right.saturating_sub(x), bottom.saturating_sub(y))
	}

	/// Returns the same-sized rectangle moved to (`x`, `y`).
	pub fn at(&self, x: usize, y: usize) -> Rect {
		Rect::new(x, y, self.width, self.height)
	}

	/// Returns `true` if this rectangle is exactly the `width`×`height` canvas at the origin.
	pub fn covers_canvas(&self, width: usize, height: usize) -> bool {
		self.x == 0 && self.y == 0 && self.width == width && self.height == height
	}
}

impl fmt::Display for Rect {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}x{}@({}, {})", self.width, self.height, self.x, self.y)
	}
}

/// Storage format of a chunk payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum ChunkCompression {
	/// Raw pixels
	#[default]
	Raw = constants::CHUNK_RAW,

	/// Run-length compressed pixels
	Compressed = constants::CHUNK_COMPRESSED,
}

impl ChunkCompression {
	/// Parses a compression tag.
	///
	/// # Errors
	///
	/// Returns [`AnimError::MalformedHeader`] for unknown tags.
	pub fn from_u8(value: u8) -> Result<Self, AnimError> {
		match value {
			constants::CHUNK_RAW => Ok(Self::Raw),
			constants::CHUNK_COMPRESSED => Ok(Self::Compressed),
			_ => Err(AnimError::malformed(
				FileType::Atlas,
				format!("unknown chunk compression tag {value:#04X}"),
			)),
		}
	}
}

impl fmt::Display for ChunkCompression {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Raw => write!(f, "raw"),
			Self::Compressed => write!(f, "compressed"),
		}
	}
}

/// Content key used to find duplicate chunks.
///
/// MD5 over width, height and pixels. Equal keys are confirmed by comparing
/// the pixels before two chunks are treated as the same.
pub type ChunkKey = [u8; 16];

/// One raster sub-image of the atlas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
	/// Default placement rectangle (width and height are the raster size)
	rect: Rect,
	/// Storage format used when the chunk was read or will be written
	compression: ChunkCompression,
	/// Indexed pixels, `rect.width × rect.height` bytes
	pixels: Vec<u8>,
}

impl Chunk {
	/// Creates a raw chunk.
	///
	/// # Panics
	///
	/// Panics if `pixels.len()` does not match the rectangle area.
	pub fn new(rect: Rect, pixels: Vec<u8>) -> Self {
		assert_eq!(pixels.len(), rect.area(), "chunk pixels must cover its rectangle");
		Self {
			rect,
			compression: ChunkCompression::Raw,
			pixels,
		}
	}

	/// Creates a chunk tagged with a compression format.
	pub fn with_compression(mut self, compression: ChunkCompression) -> Self {
		self.compression = compression;
		self
	}

	/// Default placement rectangle.
	#[inline]
	pub fn rect(&self) -> Rect {
		self.rect
	}

	/// Moves the default placement.
	pub fn set_position(&mut self, x: usize, y: usize) {
		self.rect = self.rect.at(x, y);
	}

	/// Raster width.
	#[inline]
	pub fn width(&self) -> usize {
		self.rect.width
	}

	/// Raster height.
	#[inline]
	pub fn height(&self) -> usize {
		self.rect.height
	}

	/// Storage format.
	#[inline]
	pub fn compression(&self) -> ChunkCompression {
		self.compression
	}

	/// Indexed pixels in row-major order.
	#[inline]
	pub fn pixels(&self) -> &[u8] {
		&self.pixels
	}

	/// Content key over width, height and pixels.
	pub fn content_key(&self) -> ChunkKey {
		content_key(self.width(), self.height(), &self.pixels)
	}

	/// Returns `true` when both chunks have the same raster content.
	///
	/// The placement rectangle is not part of chunk identity.
	pub fn same_content(&self, other: &Chunk) -> bool {
		self.width() == other.width() && self.height() == other.height() && self.pixels == other.pixels
	}
}

/// Computes the content key of a raster.
pub fn content_key(width: usize, height: usize, pixels: &[u8]) -> ChunkKey {
	let mut hasher = Md5::new();
	hasher.update((width as u32).to_be_bytes());
	hasher.update((height as u32).to_be_bytes());
	hasher.update(pixels);
	hasher.finalize().into()
}

impl fmt::Display for Chunk {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Chunk {} ({}, key {})", self.rect, self.compression, hex::encode(&self.content_key()[..4]))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_rect_intersection_is_pixel_based() {
		let a = Rect::new(0, 0, 2, 2);
		assert!(a.intersects(&Rect::new(1, 1, 2, 2)));
		// Touching edges share no pixel
		assert!(!a.intersects(&Rect::new(2, 0, 2, 2)));
		assert!(!a.intersects(&Rect::new(0, 0, 0, 5)));
	}

	#[test]
	fn test_rect_inflate_clamps() {
		let r = Rect::new(1, 1, 2, 2).inflate(3, 5, 4);
		assert_eq!(r, Rect::new(0, 0, 5, 4));
		assert_eq!(Rect::new(2, 2, 1, 1).inflate(0, 10, 10), Rect::new(2, 2, 1, 1));
	}

	#[test]
	fn test_rect_union() {
		let u = Rect::new(0, 0, 1, 1).union(&Rect::new(3, 2, 2, 2));
		assert_eq!(u, Rect::new(0, 0, 5, 4));
		assert_eq!(Rect::default().union(&u), u);
	}

	#[test]
	fn test_chunk_identity_ignores_position() {
		let a = Chunk::new(Rect::new(0, 0, 2, 1), vec![1, 2]);
		let b = Chunk::new(Rect::new(9, 9, 2, 1), vec![1, 2]);
		let c = Chunk::new(Rect::new(0, 0, 1, 2), vec![1, 2]);
		assert!(a.same_content(&b));
		assert_eq!(a.content_key(), b.content_key());
		assert!(!a.same_content(&c));
		assert_ne!(a.content_key(), c.content_key());
	}

	#[test]
	fn test_compression_tags() {
		assert_eq!(ChunkCompression::from_u8(0x00).unwrap(), ChunkCompression::Raw);
		assert_eq!(ChunkCompression::from_u8(0x02).unwrap(), ChunkCompression::Compressed);
		assert!(ChunkCompression::from_u8(0x01).is_err());
	}
}
