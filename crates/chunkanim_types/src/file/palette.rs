//! 256-color palette support.
//!
//! Atlases store their palette as 256 RGB triples, either with 6-bit VGA
//! channels (0-63) or full 8-bit channels. A [`Palette`] is an immutable value:
//! it is decoded once per atlas and passed explicitly to every stage that
//! needs it. Comparing two palettes is an explicit [`Palette::diff`] between two
//! owned snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::file::{AnimError, FileType};

/// Number of entries in a palette.
pub const PALETTE_SIZE: usize = 256;

/// Size of a serialized palette (256 × RGB).
pub const PALETTE_BYTES: usize = PALETTE_SIZE * 3;

/// RGB color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
	/// Red component (0-255)
	pub r: u8,
	/// Green component (0-255)
	pub g: u8,
	/// Blue component (0-255)
	pub b: u8,
}

impl Color {
	/// Creates a new color.
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self {
			r,
			g,
			b,
		}
	}

	/// Creates a new grayscale color.
	pub const fn gray(value: u8) -> Self {
		Self::rgb(value, value, value)
	}

	/// Returns the squared euclidean distance to another color.
	pub fn distance_sq(&self, other: &Color) -> u32 {
		let dr = (i32::from(self.r) - i32::from(other.r)).unsigned_abs();
		let dg = (i32::from(self.g) - i32::from(other.g)).unsigned_abs();
		let db = (i32::from(self.b) - i32::from(other.b)).unsigned_abs();
		dr * dr + dg * dg + db * db
	}
}

impl fmt::Display for Color {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
	}
}

/// Channel depth of a serialized palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaletteDepth {
	/// 6 bits per channel (VGA DAC values 0-63)
	#[default]
	Vga6,
	/// 8 bits per channel
	Rgb8,
}

impl PaletteDepth {
	/// Guesses the depth of a serialized palette.
	///
	/// Any channel above 63 can only come from an 8-bit palette.
	pub fn detect(data: &[u8]) -> Self {
		if data.iter().take(PALETTE_BYTES).any(|&b| b > 0x3F) {
			Self::Rgb8
		} else {
			Self::Vga6
		}
	}

	#[inline]
	fn expand(self, value: u8) -> u8 {
		match self {
			Self::Vga6 => (value << 2) | (value >> 4),
			Self::Rgb8 => value,
		}
	}

	#[inline]
	fn reduce(self, value: u8) -> u8 {
		match self {
			Self::Vga6 => value >> 2,
			Self::Rgb8 => value,
		}
	}
}

impl fmt::Display for PaletteDepth {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Vga6 => write!(f, "6-bit VGA"),
			Self::Rgb8 => write!(f, "8-bit RGB"),
		}
	}
}

/// Per-index transparency flags derived from a palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransparencyGuide {
	flags: [bool; PALETTE_SIZE],
}

impl TransparencyGuide {
	/// A guide with no transparent index; every pixel is painted.
	pub fn opaque() -> Self {
		Self {
			flags: [false; PALETTE_SIZE],
		}
	}

	/// A guide with exactly one transparent index.
	pub fn single(index: u8) -> Self {
		let mut guide = Self::opaque();
		guide.flags[index as usize] = true;
		guide
	}

	/// Returns a copy with `index` additionally marked transparent.
	pub fn with(mut self, index: u8) -> Self {
		self.flags[index as usize] = true;
		self
	}

	/// Returns `true` if pixels of this index are skipped when compositing.
	#[inline]
	pub fn is_transparent(&self, index: u8) -> bool {
		self.flags[index as usize]
	}

	/// Returns `true` if no index is transparent.
	pub fn is_opaque(&self) -> bool {
		!self.flags.iter().any(|&f| f)
	}
}

/// Differences between two palettes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaletteDiff {
	/// Indices whose colors differ
	pub changed: Vec<u8>,
}

impl PaletteDiff {
	/// Returns `true` when the palettes are identical.
	pub fn is_empty(&self) -> bool {
		self.changed.is_empty()
	}

	/// Number of differing entries.
	pub fn len(&self) -> usize {
		self.changed.len()
	}
}

/// 256-entry RGB palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
	colors: [Color; PALETTE_SIZE],
}

impl Palette {
	/// Creates an all-black palette.
	pub fn new() -> Self {
		Self {
			colors: [Color::default(); PALETTE_SIZE],
		}
	}

	/// Creates a grayscale palette where each index maps to its own value.
	pub fn grayscale() -> Self {
		let mut colors = [Color::default(); PALETTE_SIZE];
		for (i, color) in colors.iter_mut().enumerate() {
			*color = Color::gray(i as u8);
		}
		Self {
			colors,
		}
	}

	/// Builds a palette from a color table.
	pub fn from_colors(colors: [Color; PALETTE_SIZE]) -> Self {
		Self {
			colors,
		}
	}

	/// Parses a palette of the given depth.
	///
	/// # Errors
	///
	/// Returns an error if fewer than 768 bytes are supplied, or if a 6-bit
	/// palette holds channel values above 63.
	pub fn from_bytes(data: &[u8], depth: PaletteDepth) -> Result<Self, AnimError> {
		if data.len() < PALETTE_BYTES {
			return Err(AnimError::insufficient_data(FileType::Palette, PALETTE_BYTES, data.len()));
		}

		let mut colors = [Color::default(); PALETTE_SIZE];
		for (i, (color, rgb)) in colors.iter_mut().zip(data.chunks_exact(3)).enumerate() {
			if depth == PaletteDepth::Vga6
				&& let Some(&bad) = rgb.iter().find(|&&v| v > 0x3F)
			{
				return Err(AnimError::malformed(
					FileType::Palette,
					format!("entry {i} has channel value {bad:#04X}, 6-bit palettes stop at 0x3F"),
				));
			}
			*color = Color::rgb(depth.expand(rgb[0]), depth.expand(rgb[1]), depth.expand(rgb[2]));
		}

		Ok(Self {
			colors,
		})
	}

	/// Serializes the palette at the given depth.
	pub fn to_bytes(&self, depth: PaletteDepth) -> [u8; PALETTE_BYTES] {
		let mut bytes = [0u8; PALETTE_BYTES];
		for (color, rgb) in self.colors.iter().zip(bytes.chunks_exact_mut(3)) {
			rgb[0] = depth.reduce(color.r);
			rgb[1] = depth.reduce(color.g);
			rgb[2] = depth.reduce(color.b);
		}
		bytes
	}

	/// Gets a color by index.
	#[inline]
	pub fn get(&self, index: u8) -> Color {
		self.colors[index as usize]
	}

	/// Returns a copy of the palette with one entry replaced.
	pub fn with_color(mut self, index: u8, color: Color) -> Self {
		self.colors[index as usize] = color;
		self
	}

	/// Returns a reference to the color array.
	#[inline]
	pub fn colors(&self) -> &[Color; PALETTE_SIZE] {
		&self.colors
	}

	/// Derives the transparency guide for a transparent sentinel index.
	pub fn transparency_guide(&self, sentinel: u8) -> TransparencyGuide {
		TransparencyGuide::single(sentinel)
	}

	/// Lists every index whose color differs from `other`.
	pub fn diff(&self, other: &Palette) -> PaletteDiff {
		PaletteDiff {
			changed: self
				.colors
				.iter()
				.zip(other.colors.iter())
				.enumerate()
				.filter(|(_, (a, b))| a != b)
				.map(|(i, _)| i as u8)
				.collect(),
		}
	}

	/// Number of entries that differ from `other`.
	pub fn mismatch_count(&self, other: &Palette) -> usize {
		self.colors.iter().zip(other.colors.iter()).filter(|(a, b)| a != b).count()
	}

	/// Finds the index of an exact color match, skipping `skip` if given.
	pub fn find_exact(&self, color: Color, skip: Option<u8>) -> Option<u8> {
		self.colors
			.iter()
			.enumerate()
			.find(|&(i, c)| *c == color && Some(i as u8) != skip)
			.map(|(i, _)| i as u8)
	}

	/// Finds the index of the closest color, skipping `skip` if given.
	pub fn find_nearest(&self, color: Color, skip: Option<u8>) -> u8 {
		let mut best_index = 0u8;
		let mut best_distance = u32::MAX;
		for (i, candidate) in self.colors.iter().enumerate() {
			if Some(i as u8) == skip {
				continue;
			}
			let distance = candidate.distance_sq(&color);
			if distance < best_distance {
				best_distance = distance;
				best_index = i as u8;
			}
		}
		best_index
	}

	/// Expands indexed pixels to packed RGB bytes.
	pub fn apply_rgb(&self, pixels: &[u8]) -> Vec<u8> {
		let mut rgb = Vec::with_capacity(pixels.len() * 3);
		for &index in pixels {
			let color = self.colors[index as usize];
			rgb.extend_from_slice(&[color.r, color.g, color.b]);
		}
		rgb
	}
}

impl Default for Palette {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for Palette {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let distinct = self.colors.iter().collect::<std::collections::HashSet<_>>().len();
		write!(f, "Palette: {PALETTE_SIZE} entries, {distinct} distinct colors")
	}
}

impl std::ops::Index<u8> for Palette {
	type Output = Color;

	fn index(&self, index: u8) -> &Self::Output {
		&self.colors[index as usize]
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_vga6_expansion_roundtrip() {
		let mut data = [0u8; PALETTE_BYTES];
		data[0] = 0x3F;
		data[4] = 0x20;
		data[767] = 0x01;

		let palette = Palette::from_bytes(&data, PaletteDepth::Vga6).unwrap();
		assert_eq!(palette.get(0), Color::rgb(0xFF, 0, 0));
		assert_eq!(palette.get(1).g, 0x82);

		let bytes = palette.to_bytes(PaletteDepth::Vga6);
		assert_eq!(bytes, data);
	}

	#[test]
	fn test_vga6_rejects_high_values() {
		let mut data = [0u8; PALETTE_BYTES];
		data[30] = 0x40;
		let err = Palette::from_bytes(&data, PaletteDepth::Vga6).unwrap_err();
		assert!(matches!(err, AnimError::MalformedHeader { .. }));
	}

	#[test]
	fn test_depth_detection() {
		let mut data = [0u8; PALETTE_BYTES];
		assert_eq!(PaletteDepth::detect(&data), PaletteDepth::Vga6);
		data[100] = 0x80;
		assert_eq!(PaletteDepth::detect(&data), PaletteDepth::Rgb8);
	}

	#[test]
	fn test_insufficient_data() {
		let err = Palette::from_bytes(&[0u8; 10], PaletteDepth::Rgb8).unwrap_err();
		assert!(matches!(
			err,
			AnimError::InsufficientData {
				expected: PALETTE_BYTES,
				actual: 10,
				..
			}
		));
	}

	#[test]
	fn test_diff_lists_changed_indices() {
		let base = Palette::grayscale();
		let other = base.clone().with_color(3, Color::rgb(1, 2, 3)).with_color(200, Color::gray(0));

		let diff = base.diff(&other);
		assert_eq!(diff.changed, vec![3, 200]);
		assert_eq!(base.mismatch_count(&other), 2);
		assert!(base.diff(&base).is_empty());
	}

	#[test]
	fn test_find_exact_and_nearest() {
		let palette = Palette::grayscale();
		assert_eq!(palette.find_exact(Color::gray(42), None), Some(42));
		assert_eq!(palette.find_exact(Color::rgb(1, 2, 3), None), None);
		assert_eq!(palette.find_nearest(Color::rgb(10, 10, 12), None), 11);
		assert_eq!(palette.find_nearest(Color::gray(0), Some(0)), 1);
	}

	#[test]
	fn test_transparency_guide() {
		let guide = Palette::grayscale().transparency_guide(0);
		assert!(guide.is_transparent(0));
		assert!(!guide.is_transparent(1));
		assert!(TransparencyGuide::opaque().is_opaque());
		assert!(guide.with(9).is_transparent(9));
	}
}
