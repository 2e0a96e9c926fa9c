//! Indexed raster images exchanged with image readers and writers.
//!
//! The codec never parses image files itself. Frame sources and still-image
//! overrides arrive as [`IndexedImage`] values through a [`RasterSource`];
//! decoded frames leave through a [`RasterSink`].

use std::path::Path;

use crate::file::{AnimError, FileType, anim::Canvas, palette::Palette};

/// An indexed-color image with its reported bit depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedImage {
	width: usize,
	height: usize,
	bit_depth: u8,
	pixels: Vec<u8>,
	palette: Option<Palette>,
}

impl IndexedImage {
	/// Creates an 8-bit image.
	///
	/// # Errors
	///
	/// Returns [`AnimError::SizeMismatch`] if the buffer is not `width × height` bytes.
	pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self, AnimError> {
		if pixels.len() != width * height {
			return Err(AnimError::size_mismatch(FileType::Frames, width * height, pixels.len()));
		}
		Ok(Self {
			width,
			height,
			bit_depth: 8,
			pixels,
			palette: None,
		})
	}

	/// Wraps a rendered canvas.
	pub fn from_canvas(canvas: Canvas, palette: Option<Palette>) -> Self {
		Self {
			width: canvas.width(),
			height: canvas.height(),
			bit_depth: 8,
			pixels: canvas.into_pixels(),
			palette,
		}
	}

	/// Attaches a palette.
	pub fn with_palette(mut self, palette: Palette) -> Self {
		self.palette = Some(palette);
		self
	}

	/// Overrides the reported bit depth.
	pub fn with_bit_depth(mut self, bit_depth: u8) -> Self {
		self.bit_depth = bit_depth;
		self
	}

	/// Image width.
	pub fn width(&self) -> usize {
		self.width
	}

	/// Image height.
	pub fn height(&self) -> usize {
		self.height
	}

	/// Reported bit depth.
	pub fn bit_depth(&self) -> u8 {
		self.bit_depth
	}

	/// Indexed pixels, row-major.
	pub fn pixels(&self) -> &[u8] {
		&self.pixels
	}

	/// Attached palette, if any.
	pub fn palette(&self) -> Option<&Palette> {
		self.palette.as_ref()
	}

	/// Converts the image into a canvas, dropping the palette.
	pub fn into_canvas(self) -> Canvas {
		Canvas::from_raw(self.width, self.height, self.pixels)
	}
}

/// Reads indexed images.
pub trait RasterSource {
	/// Reads the raster at `path`.
	///
	/// # Errors
	///
	/// Implementations report unreadable or non-indexed images.
	fn read_raster(&self, path: &Path) -> Result<IndexedImage, AnimError>;
}

/// Writes indexed images.
pub trait RasterSink {
	/// Writes `image` to `path`.
	///
	/// # Errors
	///
	/// Implementations report write failures.
	fn write_raster(&self, image: &IndexedImage, path: &Path) -> Result<(), AnimError>;
}
