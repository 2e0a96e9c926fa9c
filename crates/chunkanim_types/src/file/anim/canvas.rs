//! Indexed-color canvas and the paste compositor.

use std::fmt;

use crate::file::{AnimError, FileType, palette::TransparencyGuide};

use super::chunk::Rect;

/// Fixed-size indexed-color pixel buffer.
///
/// The stride always equals the width.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Canvas {
	width: usize,
	height: usize,
	pixels: Vec<u8>,
}

impl Canvas {
	/// Creates a zero-filled canvas.
	pub fn new(width: usize, height: usize) -> Self {
		Self {
			width,
			height,
			pixels: vec![0; width * height],
		}
	}

	/// Wraps existing pixels.
	///
	/// # Errors
	///
	/// Returns [`AnimError::SizeMismatch`] if the buffer length is not `width × height`.
	pub fn from_pixels(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self, AnimError> {
		if pixels.len() != width * height {
			return Err(AnimError::size_mismatch(FileType::Frames, width * height, pixels.len()));
		}
		Ok(Self {
			width,
			height,
			pixels,
		})
	}

	pub(crate) fn from_raw(width: usize, height: usize, pixels: Vec<u8>) -> Self {
		debug_assert_eq!(pixels.len(), width * height);
		Self {
			width,
			height,
			pixels,
		}
	}

	/// Canvas width.
	#[inline]
	pub fn width(&self) -> usize {
		self.width
	}

	/// Canvas height.
	#[inline]
	pub fn height(&self) -> usize {
		self.height
	}

	/// Row stride in bytes.
	#[inline]
	pub fn stride(&self) -> usize {
		self.width
	}

	/// Pixels in row-major order.
	#[inline]
	pub fn pixels(&self) -> &[u8] {
		&self.pixels
	}

	/// Consumes the canvas and returns its pixels.
	pub fn into_pixels(self) -> Vec<u8> {
		self.pixels
	}

	/// Pixel at (`x`, `y`), or `None` outside the canvas.
	#[inline]
	pub fn get(&self, x: usize, y: usize) -> Option<u8> {
		(x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
	}

	/// Returns `true` if the canvas has the given dimensions.
	pub fn has_size(&self, width: usize, height: usize) -> bool {
		self.width == width && self.height == height
	}

	/// Copies the pixels under `rect`, clipped to the canvas.
	pub fn crop(&self, rect: Rect) -> Vec<u8> {
		let right = rect.right().min(self.width);
		let bottom = rect.bottom().min(self.height);
		let mut out = Vec::with_capacity(rect.area());
		for y in rect.y..bottom {
			let row = y * self.width;
			out.extend_from_slice(&self.pixels[row + rect.x.min(right)..row + right]);
		}
		out
	}

	/// Pastes `source` at `rect`, see [`paste`].
	pub fn paste(&mut self, source: &[u8], rect: Rect, guide: &TransparencyGuide) {
		paste(self, source, rect, guide, None);
	}
}

impl fmt::Display for Canvas {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Canvas {}x{}", self.width, self.height)
	}
}

/// Copies `source` into `canvas` at `rect`.
///
/// `source` holds `rect.width × rect.height` pixels in row-major order.
/// Pixels whose index is transparent in `guide` are skipped, as are pixels
/// whose entry in the optional per-pixel `mask` is `false`. The paste is
/// clipped to the canvas; parts outside it are silently dropped.
pub fn paste(
	canvas: &mut Canvas,
	source: &[u8],
	rect: Rect,
	guide: &TransparencyGuide,
	mask: Option<&[bool]>,
) {
	if rect.x >= canvas.width || rect.y >= canvas.height {
		return;
	}
	let visible_width = rect.width.min(canvas.width - rect.x);
	let visible_height = rect.height.min(canvas.height - rect.y);
	let opaque = guide.is_opaque() && mask.is_none();

	for row in 0..visible_height {
		let src_start = row * rect.width;
		let Some(src_row) = source.get(src_start..src_start + visible_width) else {
			return;
		};
		let dst_start = (rect.y + row) * canvas.width + rect.x;
		let dst_row = &mut canvas.pixels[dst_start..dst_start + visible_width];

		if opaque {
			dst_row.copy_from_slice(src_row);
			continue;
		}

		for (col, (dst, &src)) in dst_row.iter_mut().zip(src_row).enumerate() {
			if guide.is_transparent(src) {
				continue;
			}
			if let Some(mask) = mask
				&& !mask.get(src_start + col).copied().unwrap_or(false)
			{
				continue;
			}
			*dst = src;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_paste_skips_transparent_pixels() {
		let mut canvas = Canvas::from_pixels(2, 2, vec![1, 1, 1, 1]).unwrap();
		paste(&mut canvas, &[0, 7], Rect::new(0, 1, 2, 1), &TransparencyGuide::single(0), None);
		assert_eq!(canvas.pixels(), &[1, 1, 1, 7]);
	}

	#[test]
	fn test_paste_clips_to_canvas() {
		let mut canvas = Canvas::new(3, 3);
		let source = [1, 2, 3, 4];
		paste(&mut canvas, &source, Rect::new(2, 2, 2, 2), &TransparencyGuide::opaque(), None);
		assert_eq!(canvas.pixels(), &[0, 0, 0, 0, 0, 0, 0, 0, 1]);

		// Entirely outside
		paste(&mut canvas, &source, Rect::new(5, 0, 2, 2), &TransparencyGuide::opaque(), None);
		assert_eq!(canvas.get(2, 2), Some(1));
	}

	#[test]
	fn test_paste_honors_mask() {
		let mut canvas = Canvas::new(2, 1);
		let mask = [true, false];
		paste(&mut canvas, &[4, 5], Rect::new(0, 0, 2, 1), &TransparencyGuide::opaque(), Some(&mask));
		assert_eq!(canvas.pixels(), &[4, 0]);
	}

	#[test]
	fn test_crop() {
		let canvas = Canvas::from_pixels(3, 2, vec![1, 2, 3, 4, 5, 6]).unwrap();
		assert_eq!(canvas.crop(Rect::new(1, 0, 2, 2)), vec![2, 3, 5, 6]);
		assert_eq!(canvas.crop(Rect::new(2, 1, 5, 5)), vec![6]);
	}

	#[test]
	fn test_from_pixels_checks_length() {
		assert!(Canvas::from_pixels(2, 2, vec![0; 3]).is_err());
	}
}
