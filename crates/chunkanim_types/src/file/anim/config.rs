//! Codec configuration shared by the decoder, resolver and encoder.

use serde::{Deserialize, Serialize};

use crate::file::{AnimError, palette::PaletteDepth};

use super::constants;

/// Configuration for decoding and encoding animations.
///
/// The legacy container always renders onto a 320×200 canvas; the canvas
/// size is still a configuration value so that tools and tests can work on
/// smaller canvases. The y coordinate of a chunk is stored in one byte, so
/// the canvas height can never exceed 256.
///
/// # Presets
///
/// - `default()` / `legacy()`: 320×200, transparent index 0, tolerance 8, 6-bit palette
/// - `with_canvas(w, h)`: legacy settings on a custom canvas
///
/// # Examples
///
/// ```
/// use chunkanim_types::file::anim::CodecConfig;
///
/// let config = CodecConfig::default();
/// assert_eq!(config.canvas_width, 320);
///
/// let small = CodecConfig::with_canvas(2, 2);
/// assert!(small.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
	/// Canvas width in pixels
	pub canvas_width: usize,
	/// Canvas height in pixels
	pub canvas_height: usize,
	/// Palette index treated as "no paint"
	pub transparent_index: u8,
	/// Maximum number of palette entries a chained file may change
	pub palette_mismatch_tolerance: usize,
	/// Channel depth used when writing embedded palettes
	pub palette_depth: PaletteDepth,
}

impl Default for CodecConfig {
	fn default() -> Self {
		Self {
			canvas_width: constants::LEGACY_CANVAS_WIDTH,
			canvas_height: constants::LEGACY_CANVAS_HEIGHT,
			transparent_index: 0,
			palette_mismatch_tolerance: constants::DEFAULT_PALETTE_MISMATCH_TOLERANCE,
			palette_depth: PaletteDepth::Vga6,
		}
	}
}

impl CodecConfig {
	/// The legacy 320×200 configuration.
	pub fn legacy() -> Self {
		Self::default()
	}

	/// Legacy settings on a custom canvas.
	pub fn with_canvas(canvas_width: usize, canvas_height: usize) -> Self {
		Self {
			canvas_width,
			canvas_height,
			..Self::default()
		}
	}

	/// Number of pixels on the canvas.
	pub fn canvas_len(&self) -> usize {
		self.canvas_width * self.canvas_height
	}

	/// Checks that the canvas fits the on-disk coordinate fields.
	///
	/// # Errors
	///
	/// Returns [`AnimError::InvalidConfig`] for empty canvases, widths beyond
	/// the u16 x field, or heights beyond the one-byte y field.
	pub fn validate(&self) -> Result<(), AnimError> {
		if self.canvas_width == 0 || self.canvas_height == 0 {
			return Err(AnimError::InvalidConfig(format!(
				"canvas {}x{} is empty",
				self.canvas_width, self.canvas_height
			)));
		}
		if self.canvas_width > usize::from(u16::MAX) + 1 {
			return Err(AnimError::InvalidConfig(format!(
				"canvas width {} does not fit the 16-bit x field",
				self.canvas_width
			)));
		}
		if self.canvas_height > usize::from(u8::MAX) + 1 {
			return Err(AnimError::InvalidConfig(format!(
				"canvas height {} does not fit the 8-bit y field",
				self.canvas_height
			)));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_legacy_defaults() {
		let config = CodecConfig::legacy();
		assert_eq!((config.canvas_width, config.canvas_height), (320, 200));
		assert_eq!(config.transparent_index, 0);
		assert_eq!(config.palette_mismatch_tolerance, 8);
		assert_eq!(config.canvas_len(), 64_000);
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_validate_rejects_tall_canvas() {
		let err = CodecConfig::with_canvas(320, 300).validate().unwrap_err();
		assert!(matches!(err, AnimError::InvalidConfig(msg) if msg.contains("8-bit y")));
		assert!(CodecConfig::with_canvas(0, 10).validate().is_err());
		assert!(CodecConfig::with_canvas(16, 256).validate().is_ok());
	}
}
