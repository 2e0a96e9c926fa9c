//! Chunk payload compression.
//!
//! Atlas chunks may be stored raw or run-length compressed. The container
//! only knows the compressed payload through the [`ChunkCodec`] contract, so
//! any byte-level coder can be plugged in. [`RleCodec`] is the default.
//!
//! ## RLE stream
//!
//! The stream is a sequence of packets, each introduced by a control byte `n`:
//!
//! | Control      | Meaning                                         |
//! |--------------|-------------------------------------------------|
//! | `0x00..=0x7F`| copy the next `n + 1` bytes literally           |
//! | `0x80`       | no-op                                           |
//! | `0x81..=0xFF`| repeat the next byte `257 - n` times (2..=128)  |

use crate::file::CompressionError;

/// Byte-level coder used for chunk payloads.
pub trait ChunkCodec {
	/// Compresses `data`, or returns `None` when this codec cannot represent it.
	fn compress(&self, data: &[u8]) -> Option<Vec<u8>>;

	/// Decompresses `data`, which must expand to exactly `expected_len` bytes.
	///
	/// # Errors
	///
	/// Returns an error when the input is truncated, overflows the expected
	/// length, or carries trailing bytes.
	fn decompress(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>, CompressionError>;
}

/// Codec that never compresses. Decompression is the identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompression;

impl ChunkCodec for NoCompression {
	fn compress(&self, _data: &[u8]) -> Option<Vec<u8>> {
		None
	}

	fn decompress(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>, CompressionError> {
		if data.len() < expected_len {
			return Err(CompressionError::Truncated {
				offset: data.len(),
				produced: data.len(),
				expected: expected_len,
			});
		}
		if data.len() > expected_len {
			return Err(CompressionError::TrailingData(data.len() - expected_len));
		}
		Ok(data.to_vec())
	}
}

/// PackBits-style run-length codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct RleCodec;

impl RleCodec {
	/// Longest run or literal a single packet can describe.
	const MAX_PACKET: usize = 128;

	/// Shortest repeat worth a run packet.
	const MIN_RUN: usize = 2;

	fn run_length(data: &[u8], start: usize) -> usize {
		let value = data[start];
		data[start..].iter().take(Self::MAX_PACKET).take_while(|&&b| b == value).count()
	}
}

impl ChunkCodec for RleCodec {
	fn compress(&self, data: &[u8]) -> Option<Vec<u8>> {
		let mut out = Vec::with_capacity(data.len() / 2 + 2);
		let mut pos = 0;
		let mut literal_start = pos;

		let flush_literals = |out: &mut Vec<u8>, from: usize, to: usize| {
			for piece in data[from..to].chunks(Self::MAX_PACKET) {
				out.push((piece.len() - 1) as u8);
				out.extend_from_slice(piece);
			}
		};

		while pos < data.len() {
			let run = Self::run_length(data, pos);
			if run >= Self::MIN_RUN {
				flush_literals(&mut out, literal_start, pos);
				out.push((257 - run) as u8);
				out.push(data[pos]);
				pos += run;
				literal_start = pos;
			} else {
				pos += 1;
			}
		}
		flush_literals(&mut out, literal_start, pos);

		Some(out)
	}

	fn decompress(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>, CompressionError> {
		// a header can claim any length; no input expands past MAX_PACKET per byte
		let mut out = Vec::with_capacity(expected_len.min(data.len().saturating_mul(Self::MAX_PACKET)));
		let mut pos = 0;

		while out.len() < expected_len {
			let Some(&control) = data.get(pos) else {
				return Err(CompressionError::Truncated {
					offset: pos,
					produced: out.len(),
					expected: expected_len,
				});
			};
			pos += 1;

			match control {
				0x00..=0x7F => {
					let count = control as usize + 1;
					if out.len() + count > expected_len {
						return Err(CompressionError::Overflow {
							produced: out.len(),
							run: count,
							expected: expected_len,
						});
					}
					let Some(literal) = data.get(pos..pos + count) else {
						return Err(CompressionError::Truncated {
							offset: data.len(),
							produced: out.len(),
							expected: expected_len,
						});
					};
					out.extend_from_slice(literal);
					pos += count;
				}
				0x80 => {}
				_ => {
					let count = 257 - control as usize;
					if out.len() + count > expected_len {
						return Err(CompressionError::Overflow {
							produced: out.len(),
							run: count,
							expected: expected_len,
						});
					}
					let Some(&value) = data.get(pos) else {
						return Err(CompressionError::Truncated {
							offset: pos,
							produced: out.len(),
							expected: expected_len,
						});
					};
					out.resize(out.len() + count, value);
					pos += 1;
				}
			}
		}

		if pos != data.len() {
			return Err(CompressionError::TrailingData(data.len() - pos));
		}

		Ok(out)
	}
}
