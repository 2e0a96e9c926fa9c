//! Chunk atlas file structure and I/O operations.
//!
//! ```text
//! Offset  Size  Field         Description
//! ------  ----  ------------  ------------------------------------------
//! 0x00    2     chunk_count   Number of chunks (u16, big-endian, <= 0x7FFF)
//! 0x02    1     flags         bit 0: palette present, bit 1: 8-bit palette
//! 0x03    1     reserved      Always zero
//! 0x04    768   palette       256 RGB triples (only when bit 0 is set)
//! ....          chunks        chunk_count × (header + payload)
//! ```
//!
//! Chunk header (8 bytes, big-endian):
//!
//! ```text
//! +0x00   2     width - 1
//! +0x02   2     height - 1
//! +0x04   1     compression   0x00 raw, 0x02 compressed
//! +0x05   2     x
//! +0x07   1     y             one byte only
//! ```
//!
//! A raw payload is `width × height` bytes. A compressed payload starts with
//! its length (u16, big-endian) followed by the compressed bytes. The sum of
//! all parts must equal the file length exactly.

use std::io::Read;

use bytes::{BufMut, BytesMut};
use log::{debug, trace};

use crate::file::{
	AnimError, FileType,
	compression::ChunkCodec,
	palette::{PALETTE_BYTES, Palette, PaletteDepth},
};

use super::{
	chunk::{Chunk, ChunkCompression, Rect},
	constants,
};

#[inline]
fn be_u16(data: &[u8], offset: usize) -> u16 {
	u16::from_be_bytes([data[offset], data[offset + 1]])
}

/// Palette plus the set of reusable raster chunks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Atlas {
	palette: Option<Palette>,
	palette_depth: PaletteDepth,
	chunks: Vec<Chunk>,
}

impl Atlas {
	/// Creates an empty atlas without a palette.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates an atlas from chunks and an optional palette.
	pub fn from_parts(palette: Option<Palette>, chunks: Vec<Chunk>) -> Self {
		Self {
			palette,
			palette_depth: PaletteDepth::Vga6,
			chunks,
		}
	}

	/// Sets the channel depth used when the palette is written.
	pub fn with_palette_depth(mut self, depth: PaletteDepth) -> Self {
		self.palette_depth = depth;
		self
	}

	/// Opens an atlas from the specified path.
	///
	/// # Errors
	///
	/// Returns an error if the file cannot be read or is malformed.
	pub fn open(
		path: impl AsRef<std::path::Path>,
		codec: &dyn ChunkCodec,
	) -> Result<Self, AnimError> {
		let data = std::fs::read(path)?;
		Self::from_bytes(&data, codec)
	}

	/// Parses an atlas from a reader.
	///
	/// # Errors
	///
	/// Returns an error if reading fails or the data is malformed.
	pub fn from_reader<R: Read>(mut reader: R, codec: &dyn ChunkCodec) -> Result<Self, AnimError> {
		let mut data = Vec::new();
		reader.read_to_end(&mut data)?;
		Self::from_bytes(&data, codec)
	}

	/// Parses an atlas from bytes.
	///
	/// # Errors
	///
	/// - [`AnimError::InsufficientData`] if the header or palette is cut short
	/// - [`AnimError::MalformedHeader`] for impossible header fields
	/// - [`AnimError::SizeMismatch`] if the chunks do not add up to the file length
	/// - [`AnimError::Compression`] if a compressed payload is corrupt
	pub fn from_bytes(data: &[u8], codec: &dyn ChunkCodec) -> Result<Self, AnimError> {
		if data.len() < constants::ATLAS_HEADER_SIZE {
			return Err(AnimError::insufficient_data(
				FileType::Atlas,
				constants::ATLAS_HEADER_SIZE,
				data.len(),
			));
		}

		let chunk_count = be_u16(data, 0) as usize;
		let flags = data[2];
		let reserved = data[3];

		if chunk_count > constants::MAX_CHUNKS {
			return Err(AnimError::malformed(
				FileType::Atlas,
				format!("chunk count {chunk_count} exceeds {}", constants::MAX_CHUNKS),
			));
		}
		if flags & !constants::ATLAS_KNOWN_FLAGS != 0 {
			return Err(AnimError::malformed(
				FileType::Atlas,
				format!("unknown flag bits {flags:#04X}"),
			));
		}
		if reserved != 0 {
			return Err(AnimError::malformed(
				FileType::Atlas,
				format!("reserved byte must be zero, found {reserved:#04X}"),
			));
		}

		let mut offset = constants::ATLAS_HEADER_SIZE;
		let palette_depth = if flags & constants::ATLAS_FLAG_PALETTE_8BIT != 0 {
			PaletteDepth::Rgb8
		} else {
			PaletteDepth::Vga6
		};

		let palette = if flags & constants::ATLAS_FLAG_PALETTE != 0 {
			let end = offset + PALETTE_BYTES;
			if data.len() < end {
				return Err(AnimError::insufficient_data(FileType::Atlas, end, data.len()));
			}
			let palette = Palette::from_bytes(&data[offset..end], palette_depth)?;
			offset = end;
			Some(palette)
		} else {
			None
		};

		let mut chunks = Vec::with_capacity(chunk_count);
		for index in 0..chunk_count {
			let header_end = offset + constants::CHUNK_HEADER_SIZE;
			if data.len() < header_end {
				return Err(AnimError::size_mismatch(FileType::Atlas, header_end, data.len()));
			}

			let header = &data[offset..header_end];
			let width = be_u16(header, 0) as usize + 1;
			let height = be_u16(header, 2) as usize + 1;
			let compression = ChunkCompression::from_u8(header[4])?;
			let x = be_u16(header, 5) as usize;
			let y = header[7] as usize;
			offset = header_end;

			let raw_len = width * height;
			let pixels = match compression {
				ChunkCompression::Raw => {
					let end = offset + raw_len;
					if data.len() < end {
						return Err(AnimError::size_mismatch(FileType::Atlas, end, data.len()));
					}
					let pixels = data[offset..end].to_vec();
					offset = end;
					pixels
				}
				ChunkCompression::Compressed => {
					let len_end = offset + constants::COMPRESSED_LENGTH_SIZE;
					if data.len() < len_end {
						return Err(AnimError::size_mismatch(FileType::Atlas, len_end, data.len()));
					}
					let packed_len = be_u16(data, offset) as usize;
					let end = len_end + packed_len;
					if data.len() < end {
						return Err(AnimError::size_mismatch(FileType::Atlas, end, data.len()));
					}
					let pixels = codec.decompress(&data[len_end..end], raw_len).map_err(|source| {
						AnimError::Compression {
							index,
							source,
						}
					})?;
					offset = end;
					pixels
				}
			};

			trace!("atlas chunk {index}: {width}x{height} at ({x}, {y}), {compression}");
			chunks.push(Chunk::new(Rect::new(x, y, width, height), pixels).with_compression(compression));
		}

		if offset != data.len() {
			return Err(AnimError::size_mismatch(FileType::Atlas, offset, data.len()));
		}

		debug!(
			"parsed atlas: {} chunks, palette {}",
			chunks.len(),
			if palette.is_some() {
				"embedded"
			} else {
				"absent"
			}
		);

		Ok(Self {
			palette,
			palette_depth,
			chunks,
		})
	}

	/// Serializes the atlas.
	///
	/// Chunks tagged [`ChunkCompression::Compressed`] are compressed with
	/// `codec`; if the codec declines or the result does not fit the 16-bit
	/// length field, the chunk is written raw.
	///
	/// # Errors
	///
	/// Returns an error if the chunk count or a chunk geometry cannot be
	/// represented in the header fields.
	pub fn to_bytes(&self, codec: &dyn ChunkCodec) -> Result<Vec<u8>, AnimError> {
		if self.chunks.len() > constants::MAX_CHUNKS {
			return Err(AnimError::TooManyChunks {
				count: self.chunks.len(),
				max: constants::MAX_CHUNKS,
			});
		}

		let mut buf = BytesMut::with_capacity(
			constants::ATLAS_HEADER_SIZE
				+ PALETTE_BYTES
				+ self.chunks.iter().map(|c| constants::CHUNK_HEADER_SIZE + c.rect().area()).sum::<usize>(),
		);

		let mut flags = 0u8;
		if self.palette.is_some() {
			flags |= constants::ATLAS_FLAG_PALETTE;
			if self.palette_depth == PaletteDepth::Rgb8 {
				flags |= constants::ATLAS_FLAG_PALETTE_8BIT;
			}
		}

		buf.put_u16(self.chunks.len() as u16);
		buf.put_u8(flags);
		buf.put_u8(0);

		if let Some(palette) = &self.palette {
			buf.put_slice(&palette.to_bytes(self.palette_depth));
		}

		for (index, chunk) in self.chunks.iter().enumerate() {
			let rect = chunk.rect();
			if rect.is_empty()
				|| rect.width > usize::from(u16::MAX) + 1
				|| rect.height > usize::from(u16::MAX) + 1
				|| rect.x > usize::from(u16::MAX)
				|| rect.y > usize::from(u8::MAX)
			{
				return Err(AnimError::malformed(
					FileType::Atlas,
					format!("chunk {index} geometry {rect} does not fit the chunk header"),
				));
			}

			let packed = match chunk.compression() {
				ChunkCompression::Compressed => codec
					.compress(chunk.pixels())
					.filter(|packed| packed.len() <= usize::from(u16::MAX)),
				ChunkCompression::Raw => None,
			};

			buf.put_u16((rect.width - 1) as u16);
			buf.put_u16((rect.height - 1) as u16);
			match &packed {
				Some(packed) => {
					buf.put_u8(constants::CHUNK_COMPRESSED);
					buf.put_u16(rect.x as u16);
					buf.put_u8(rect.y as u8);
					buf.put_u16(packed.len() as u16);
					buf.put_slice(packed);
				}
				None => {
					buf.put_u8(constants::CHUNK_RAW);
					buf.put_u16(rect.x as u16);
					buf.put_u8(rect.y as u8);
					buf.put_slice(chunk.pixels());
				}
			}
		}

		Ok(buf.to_vec())
	}

	/// Saves the atlas to the specified path.
	///
	/// # Errors
	///
	/// Returns an error if serialization or writing fails.
	pub fn save(
		&self,
		path: impl AsRef<std::path::Path>,
		codec: &dyn ChunkCodec,
	) -> Result<(), AnimError> {
		std::fs::write(path, self.to_bytes(codec)?)?;
		Ok(())
	}

	/// Tags each chunk compressed when `codec` makes it strictly smaller.
	///
	/// Returns the number of chunks tagged compressed.
	pub fn select_compression(&mut self, codec: &dyn ChunkCodec) -> usize {
		let mut compressed = 0;
		for chunk in &mut self.chunks {
			let raw_len = chunk.pixels().len();
			let smaller = codec
				.compress(chunk.pixels())
				.is_some_and(|packed| packed.len() < raw_len && packed.len() <= usize::from(u16::MAX));
			let tag = if smaller {
				compressed += 1;
				ChunkCompression::Compressed
			} else {
				ChunkCompression::Raw
			};
			*chunk = chunk.clone().with_compression(tag);
		}
		compressed
	}

	/// Embedded palette, if any.
	pub fn palette(&self) -> Option<&Palette> {
		self.palette.as_ref()
	}

	/// Channel depth of the embedded palette.
	pub fn palette_depth(&self) -> PaletteDepth {
		self.palette_depth
	}

	/// All chunks in index order.
	pub fn chunks(&self) -> &[Chunk] {
		&self.chunks
	}

	/// Gets a chunk by index.
	pub fn chunk(&self, index: usize) -> Option<&Chunk> {
		self.chunks.get(index)
	}

	/// Number of chunks.
	pub fn len(&self) -> usize {
		self.chunks.len()
	}

	/// Returns `true` when the atlas holds no chunks.
	pub fn is_empty(&self) -> bool {
		self.chunks.is_empty()
	}
}

impl std::fmt::Display for Atlas {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"Atlas ({} chunks, {})",
			self.chunks.len(),
			match self.palette {
				Some(_) => "embedded palette",
				None => "no palette",
			}
		)
	}
}
