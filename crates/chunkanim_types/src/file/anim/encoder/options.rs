//! Encoder options.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a frame difference is cut into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
	/// One chunk per frame, the bounding box of every changed pixel
	#[default]
	Crop,
	/// One chunk per connected region of changed pixels
	Blob,
}

impl fmt::Display for Strategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Crop => write!(f, "crop"),
			Self::Blob => write!(f, "blob"),
		}
	}
}

/// Options for [`super::Encoder`].
///
/// # Presets
///
/// - `crop()`: bounding-box cropping, RLE compression
/// - `blob()`: 4-connected regions, no merging
/// - `blob_merged(t)`: 8-connected regions merged when their boxes come within `t` pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderOptions {
	/// Chunk decomposition strategy
	pub strategy: Strategy,
	/// Corner-touching pixels belong to the same region (blob strategy)
	pub diagonal: bool,
	/// Padding used when merging regions; `-1` disables merging (blob strategy)
	pub merge_threshold: i32,
	/// Keep every pixel of a region's bounding box instead of only its members (blob strategy)
	pub merge_as_rectangle: bool,
	/// Store each chunk at its most frequent placement instead of its first
	pub promote_frequent_rects: bool,
	/// Compress chunks when it makes them strictly smaller
	pub compress: bool,
}

impl Default for EncoderOptions {
	fn default() -> Self {
		Self::crop()
	}
}

impl EncoderOptions {
	/// Bounding-box cropping.
	pub fn crop() -> Self {
		Self {
			strategy: Strategy::Crop,
			diagonal: false,
			merge_threshold: -1,
			merge_as_rectangle: false,
			promote_frequent_rects: true,
			compress: true,
		}
	}

	/// Connected regions without merging.
	pub fn blob() -> Self {
		Self {
			strategy: Strategy::Blob,
			..Self::crop()
		}
	}

	/// Diagonal regions merged within `threshold` pixels.
	pub fn blob_merged(threshold: i32) -> Self {
		Self {
			strategy: Strategy::Blob,
			diagonal: true,
			merge_threshold: threshold,
			..Self::crop()
		}
	}

	/// Sets whether chunks are compressed.
	pub fn with_compression(mut self, compress: bool) -> Self {
		self.compress = compress;
		self
	}

	/// Sets whether merged regions keep their whole bounding box.
	pub fn with_merge_as_rectangle(mut self, merge_as_rectangle: bool) -> Self {
		self.merge_as_rectangle = merge_as_rectangle;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_presets() {
		assert_eq!(EncoderOptions::default(), EncoderOptions::crop());
		assert_eq!(EncoderOptions::blob().merge_threshold, -1);
		let merged = EncoderOptions::blob_merged(2);
		assert_eq!(merged.strategy, Strategy::Blob);
		assert!(merged.diagonal);
		assert_eq!(merged.merge_threshold, 2);
	}

	#[test]
	fn test_deserialize_partial() {
		let options: EncoderOptions = serde_json::from_str(r#"{"strategy":"blob","merge_threshold":3}"#).unwrap();
		assert_eq!(options.strategy, Strategy::Blob);
		assert_eq!(options.merge_threshold, 3);
		assert!(options.compress);
	}
}
