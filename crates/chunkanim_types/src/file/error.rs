//! Error types for animation file parsing and encoding.

use std::fmt::Display;

use thiserror::Error;

/// The file a failure was detected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
	/// Chunk atlas (palette + raster chunks)
	Atlas,
	/// Command stream (placement instructions)
	Stream,
	/// Standalone palette table
	Palette,
	/// Still image used as a continuation seed
	Still,
	/// A sequence of source frames handed to the encoder
	Frames,
}

impl Display for FileType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Atlas => write!(f, "atlas"),
			Self::Stream => write!(f, "command stream"),
			Self::Palette => write!(f, "palette"),
			Self::Still => write!(f, "still image"),
			Self::Frames => write!(f, "frame sequence"),
		}
	}
}

/// Errors raised by the chunk entropy coder.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompressionError {
	/// Compressed input ended before the expected output was produced
	#[error("Compressed data truncated at byte {offset}: produced {produced} of {expected} bytes")]
	Truncated {
		/// Input offset where data ran out
		offset: usize,
		/// Bytes produced so far
		produced: usize,
		/// Bytes expected
		expected: usize,
	},

	/// A run would write past the expected output length
	#[error("Compressed run overflows output: {produced} + {run} > {expected}")]
	Overflow {
		/// Bytes produced before the run
		produced: usize,
		/// Length of the offending run
		run: usize,
		/// Bytes expected
		expected: usize,
	},

	/// Input bytes left over after the expected output was produced
	#[error("{0} trailing bytes after compressed data")]
	TrailingData(usize),
}

/// Unified error type for the animation container.
#[derive(Debug, Error)]
pub enum AnimError {
	/// Not enough data to parse a structure
	#[error("{file_type}: insufficient data, expected {expected} bytes, got {actual} bytes")]
	InsufficientData {
		/// File the structure belongs to
		file_type: FileType,
		/// Expected number of bytes
		expected: usize,
		/// Actual number of bytes
		actual: usize,
	},

	/// Header fields that cannot be valid
	#[error("{file_type}: malformed header: {message}")]
	MalformedHeader {
		/// File the header belongs to
		file_type: FileType,
		/// Description of the problem
		message: String,
	},

	/// Chunk index or stream offset beyond bounds
	#[error("{file_type}: {what} {index} out of range (limit {limit}) at offset {offset:#06X}")]
	OutOfRangeReference {
		/// File the reference was found in
		file_type: FileType,
		/// What kind of reference this is
		what: &'static str,
		/// Offending value
		index: usize,
		/// Exclusive upper bound
		limit: usize,
		/// Byte offset of the reference
		offset: usize,
	},

	/// Declared and actual lengths disagree
	#[error("{file_type}: size mismatch, declared {declared} bytes, actual {actual} bytes")]
	SizeMismatch {
		/// File with the mismatch
		file_type: FileType,
		/// Declared or accumulated length
		declared: usize,
		/// Actual length
		actual: usize,
	},

	/// No self-sufficient ancestor was found for a continuation file
	#[error("Continuation chain could not be resolved: {message}")]
	ChainResolutionFailure {
		/// Description of the failed search
		message: String,
	},

	/// A frame paints the transparent sentinel over a changed pixel
	#[error(
		"Frame {frame} paints transparent index {sentinel} at ({x}, {y}); the format cannot express this"
	)]
	UnsupportedDiff {
		/// Frame number
		frame: usize,
		/// Pixel column
		x: usize,
		/// Pixel row
		y: usize,
		/// Transparent sentinel index
		sentinel: u8,
	},

	/// Frame or image dimensions disagree
	#[error("{file_type}: dimension mismatch, expected {expected_width}x{expected_height}, got {width}x{height}")]
	DimensionMismatch {
		/// Source of the mismatching image
		file_type: FileType,
		/// Expected width
		expected_width: usize,
		/// Expected height
		expected_height: usize,
		/// Actual width
		width: usize,
		/// Actual height
		height: usize,
	},

	/// Only 8-bit indexed frames are supported
	#[error("Frame {frame} has bit depth {depth}, only 8-bit indexed frames are supported")]
	UnsupportedBitDepth {
		/// Frame number
		frame: usize,
		/// Reported bit depth
		depth: u8,
	},

	/// Unique chunk count exceeds the 15-bit index space
	#[error("Too many unique chunks: {count} (max {max})")]
	TooManyChunks {
		/// Chunk count that was reached
		count: usize,
		/// Maximum addressable chunk count
		max: usize,
	},

	/// Chunk payload failed to decompress
	#[error("Chunk {index}: {source}")]
	Compression {
		/// Chunk index
		index: usize,
		/// Underlying codec error
		#[source]
		source: CompressionError,
	},

	/// Configuration values that cannot describe this container
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),

	/// IO error
	#[error(transparent)]
	IOError(#[from] std::io::Error),
}

impl AnimError {
	/// Creates an [`AnimError::InsufficientData`].
	pub fn insufficient_data(file_type: FileType, expected: usize, actual: usize) -> Self {
		Self::InsufficientData {
			file_type,
			expected,
			actual,
		}
	}

	/// Creates an [`AnimError::MalformedHeader`].
	pub fn malformed(file_type: FileType, message: impl Into<String>) -> Self {
		Self::MalformedHeader {
			file_type,
			message: message.into(),
		}
	}

	/// Creates an [`AnimError::OutOfRangeReference`].
	pub fn out_of_range(
		file_type: FileType,
		what: &'static str,
		index: usize,
		limit: usize,
		offset: usize,
	) -> Self {
		Self::OutOfRangeReference {
			file_type,
			what,
			index,
			limit,
			offset,
		}
	}

	/// Creates an [`AnimError::SizeMismatch`].
	pub fn size_mismatch(file_type: FileType, declared: usize, actual: usize) -> Self {
		Self::SizeMismatch {
			file_type,
			declared,
			actual,
		}
	}

	/// Returns `true` for errors the caller may recover from.
	///
	/// Only chain resolution failures are recoverable: the caller falls back
	/// to a blank seed and marks the result as best-effort.
	pub fn is_recoverable(&self) -> bool {
		matches!(self, Self::ChainResolutionFailure { .. })
	}
}
