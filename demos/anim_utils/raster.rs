//! PNG import and export through the `image` crate.

use std::path::Path;

use chunkanim_rs::chunkanim_types::file::{
	AnimError, Color, IndexedImage, Palette, RasterSink, RasterSource,
};
use image::{ImageBuffer, RgbImage};

/// Maps PNG colors onto a palette and back.
pub struct PngRaster {
	palette: Palette,
	transparent_index: u8,
}

impl PngRaster {
	pub fn new(palette: Palette, transparent_index: u8) -> Self {
		Self {
			palette,
			transparent_index,
		}
	}

	/// Closest palette index for `color`.
	///
	/// Exact matches win; otherwise the transparent index is never chosen,
	/// since later frames cannot paint it.
	fn index_of(&self, color: Color) -> u8 {
		self.palette
			.find_exact(color, None)
			.unwrap_or_else(|| self.palette.find_nearest(color, Some(self.transparent_index)))
	}
}

fn image_error(path: &Path, err: image::ImageError) -> AnimError {
	AnimError::IOError(std::io::Error::other(format!("{}: {err}", path.display())))
}

impl RasterSource for PngRaster {
	fn read_raster(&self, path: &Path) -> Result<IndexedImage, AnimError> {
		let img = image::open(path).map_err(|err| image_error(path, err))?.to_rgb8();
		let (width, height) = (img.width() as usize, img.height() as usize);

		let pixels = img.pixels().map(|p| self.index_of(Color::rgb(p[0], p[1], p[2]))).collect();

		Ok(IndexedImage::new(width, height, pixels)?.with_palette(self.palette.clone()))
	}
}

impl RasterSink for PngRaster {
	fn write_raster(&self, image: &IndexedImage, path: &Path) -> Result<(), AnimError> {
		let palette = image.palette().unwrap_or(&self.palette);
		let rgb = palette.apply_rgb(image.pixels());
		let img: RgbImage = ImageBuffer::from_raw(image.width() as u32, image.height() as u32, rgb)
			.ok_or_else(|| AnimError::IOError(std::io::Error::other("pixel buffer does not match image size")))?;
		img.save(path).map_err(|err| image_error(path, err))
	}
}
