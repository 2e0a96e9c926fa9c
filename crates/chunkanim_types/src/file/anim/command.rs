//! Command stream types.
//!
//! The command stream is a headerless sequence of big-endian 16-bit words:
//!
//! ```text
//! Word            Meaning
//! --------------  -----------------------------------------------------
//! 0x0000-0x7FFF   PlaceChunk(index) at the chunk's atlas rectangle
//! 0x8000-0xFFFD   PlaceChunk(index & 0x7FFF), followed by x and y words
//! 0xFFFF          EndOfFrame
//! 0xFFFE          EndOfStream (always the final word)
//! ```
//!
//! [`CommandReader`] walks the words as a small state machine
//! (`AwaitingCommand -> Done`) and reports every problem with the byte
//! offset it was found at.

use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::file::{AnimError, FileType};

use super::constants;

/// A single placement instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
	/// Paste a chunk, optionally at a position other than its atlas rectangle
	PlaceChunk {
		/// Chunk index into the atlas
		index: u16,
		/// Position override
		offset: Option<(u16, u16)>,
	},

	/// The current canvas is the next frame
	EndOfFrame,

	/// No further commands
	EndOfStream,
}

impl Command {
	/// Places a chunk at its atlas rectangle.
	pub fn place(index: u16) -> Self {
		Self::PlaceChunk {
			index,
			offset: None,
		}
	}

	/// Places a chunk at an explicit position.
	pub fn place_at(index: u16, x: u16, y: u16) -> Self {
		Self::PlaceChunk {
			index,
			offset: Some((x, y)),
		}
	}

	/// Number of bytes this command occupies in the stream.
	pub fn byte_size(&self) -> usize {
		match self {
			Self::PlaceChunk {
				offset: Some(_),
				..
			} => constants::WORD_SIZE * 3,
			_ => constants::WORD_SIZE,
		}
	}

	/// Returns `true` for chunk placements.
	pub fn is_placement(&self) -> bool {
		matches!(self, Self::PlaceChunk { .. })
	}

	fn write(&self, buf: &mut BytesMut) {
		match *self {
			Self::PlaceChunk {
				index,
				offset: None,
			} => buf.put_u16(index & constants::CHUNK_INDEX_MASK),
			Self::PlaceChunk {
				index,
				offset: Some((x, y)),
			} => {
				buf.put_u16((index & constants::CHUNK_INDEX_MASK) | constants::OVERRIDE_FLAG);
				buf.put_u16(x);
				buf.put_u16(y);
			}
			Self::EndOfFrame => buf.put_u16(constants::END_OF_FRAME),
			Self::EndOfStream => buf.put_u16(constants::END_OF_STREAM),
		}
	}
}

impl fmt::Display for Command {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::PlaceChunk {
				index,
				offset: None,
			} => write!(f, "Place({index})"),
			Self::PlaceChunk {
				index,
				offset: Some((x, y)),
			} => write!(f, "Place({index} @ {x},{y})"),
			Self::EndOfFrame => write!(f, "EndOfFrame"),
			Self::EndOfStream => write!(f, "EndOfStream"),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
	AwaitingCommand,
	Done,
}

/// Incremental reader over command stream bytes.
///
/// Chunk indices are checked against `chunk_limit`. Once `EndOfStream` has
/// been returned the reader is done and yields nothing further.
#[derive(Debug, Clone)]
pub struct CommandReader<'a> {
	data: &'a [u8],
	position: usize,
	chunk_limit: usize,
	state: ReaderState,
}

impl<'a> CommandReader<'a> {
	/// Creates a reader validating chunk indices against `chunk_limit`.
	pub fn new(data: &'a [u8], chunk_limit: usize) -> Self {
		Self {
			data,
			position: 0,
			chunk_limit,
			state: ReaderState::AwaitingCommand,
		}
	}

	/// Byte offset of the next word.
	pub fn position(&self) -> usize {
		self.position
	}

	/// Returns `true` once `EndOfStream` has been read.
	pub fn is_done(&self) -> bool {
		self.state == ReaderState::Done
	}

	fn read_word(&mut self) -> Result<u16, AnimError> {
		let end = self.position + constants::WORD_SIZE;
		if end > self.data.len() {
			return Err(AnimError::out_of_range(
				FileType::Stream,
				"stream offset",
				end,
				self.data.len(),
				self.position,
			));
		}
		let word = u16::from_be_bytes([self.data[self.position], self.data[self.position + 1]]);
		self.position = end;
		Ok(word)
	}

	/// Reads the next command, or `None` once the stream is done.
	///
	/// # Errors
	///
	/// - [`AnimError::OutOfRangeReference`] when a word would be read past
	///   the end of the stream, or a chunk index is not below `chunk_limit`
	/// - [`AnimError::SizeMismatch`] when bytes follow `EndOfStream`
	pub fn next_command(&mut self) -> Result<Option<Command>, AnimError> {
		if self.state == ReaderState::Done {
			return Ok(None);
		}

		let start = self.position;
		let code = self.read_word()?;

		let command = match code {
			constants::END_OF_STREAM => {
				self.state = ReaderState::Done;
				if self.position != self.data.len() {
					return Err(AnimError::size_mismatch(
						FileType::Stream,
						self.position,
						self.data.len(),
					));
				}
				Command::EndOfStream
			}
			constants::END_OF_FRAME => Command::EndOfFrame,
			_ => {
				let index = code & constants::CHUNK_INDEX_MASK;
				if usize::from(index) >= self.chunk_limit {
					return Err(AnimError::out_of_range(
						FileType::Stream,
						"chunk index",
						usize::from(index),
						self.chunk_limit,
						start,
					));
				}
				let offset = if code & constants::OVERRIDE_FLAG != 0 {
					let x = self.read_word()?;
					let y = self.read_word()?;
					Some((x, y))
				} else {
					None
				};
				Command::PlaceChunk {
					index,
					offset,
				}
			}
		};

		Ok(Some(command))
	}
}

/// A fully parsed command stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandStream {
	commands: Vec<Command>,
}

impl CommandStream {
	/// Creates an empty stream.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a stream from commands.
	pub fn from_commands(commands: Vec<Command>) -> Self {
		Self {
			commands,
		}
	}

	/// Parses every command, validating chunk indices against `chunk_limit`.
	///
	/// # Errors
	///
	/// Fails like [`CommandReader::next_command`], and with
	/// [`AnimError::OutOfRangeReference`] if the stream ends without an
	/// `EndOfStream` word.
	pub fn from_bytes(data: &[u8], chunk_limit: usize) -> Result<Self, AnimError> {
		if data.len() % constants::WORD_SIZE != 0 {
			return Err(AnimError::size_mismatch(
				FileType::Stream,
				data.len() - data.len() % constants::WORD_SIZE,
				data.len(),
			));
		}

		let mut reader = CommandReader::new(data, chunk_limit);
		let mut commands = Vec::new();
		while let Some(command) = reader.next_command()? {
			commands.push(command);
		}

		Ok(Self {
			commands,
		})
	}

	/// Serializes the stream, appending `EndOfStream` if it is missing.
	pub fn to_bytes(&self) -> Vec<u8> {
		let mut buf = BytesMut::with_capacity(self.byte_size() + constants::WORD_SIZE);
		for command in &self.commands {
			command.write(&mut buf);
		}
		if self.commands.last() != Some(&Command::EndOfStream) {
			Command::EndOfStream.write(&mut buf);
		}
		buf.to_vec()
	}

	/// Appends a command.
	pub fn push(&mut self, command: Command) {
		self.commands.push(command);
	}

	/// All commands in stream order.
	pub fn commands(&self) -> &[Command] {
		&self.commands
	}

	/// Number of `EndOfFrame` markers.
	pub fn frame_count(&self) -> usize {
		self.commands.iter().filter(|c| **c == Command::EndOfFrame).count()
	}

	/// Number of placements that carry a position override.
	pub fn override_count(&self) -> usize {
		self.commands
			.iter()
			.filter(|c| {
				matches!(
					c,
					Command::PlaceChunk {
						offset: Some(_),
						..
					}
				)
			})
			.count()
	}

	/// Serialized size in bytes.
	pub fn byte_size(&self) -> usize {
		self.commands.iter().map(Command::byte_size).sum()
	}
}

impl fmt::Display for CommandStream {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Command stream ({} commands, {} frames)", self.commands.len(), self.frame_count())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_basic_stream() {
		let stream = CommandStream::from_bytes(&[0x00, 0x00, 0xFF, 0xFE], 1).unwrap();
		assert_eq!(stream.commands(), &[Command::place(0), Command::EndOfStream]);
	}

	#[test]
	fn test_override_consumes_two_words() {
		let data = [0x80, 0x02, 0x00, 0x10, 0x00, 0x20, 0xFF, 0xFF, 0xFF, 0xFE];
		let stream = CommandStream::from_bytes(&data, 3).unwrap();
		assert_eq!(
			stream.commands(),
			&[Command::place_at(2, 0x10, 0x20), Command::EndOfFrame, Command::EndOfStream]
		);
		assert_eq!(stream.override_count(), 1);
		assert_eq!(stream.to_bytes(), data);
	}

	#[test]
	fn test_rejects_index_beyond_atlas() {
		let err = CommandStream::from_bytes(&[0xFF, 0xFF, 0x00, 0x05, 0xFF, 0xFE], 5).unwrap_err();
		assert!(matches!(
			err,
			AnimError::OutOfRangeReference {
				index: 5,
				limit: 5,
				offset: 2,
				..
			}
		));
	}

	#[test]
	fn test_rejects_truncated_override() {
		let err = CommandStream::from_bytes(&[0x80, 0x00, 0x00, 0x01], 1).unwrap_err();
		assert!(matches!(err, AnimError::OutOfRangeReference { offset: 4, .. }));
	}

	#[test]
	fn test_rejects_missing_end_of_stream() {
		let err = CommandStream::from_bytes(&[0x00, 0x00, 0xFF, 0xFF], 1).unwrap_err();
		assert!(matches!(err, AnimError::OutOfRangeReference { .. }));
	}

	#[test]
	fn test_rejects_data_after_end_of_stream() {
		let err = CommandStream::from_bytes(&[0xFF, 0xFE, 0x00, 0x00], 1).unwrap_err();
		assert!(matches!(
			err,
			AnimError::SizeMismatch {
				declared: 2,
				actual: 4,
				..
			}
		));
		assert!(matches!(
			CommandStream::from_bytes(&[0xFF, 0xFE, 0x00], 1),
			Err(AnimError::SizeMismatch { .. })
		));
	}

	#[test]
	fn test_to_bytes_appends_end_of_stream() {
		let mut stream = CommandStream::new();
		stream.push(Command::place(1));
		stream.push(Command::EndOfFrame);
		assert_eq!(stream.to_bytes(), vec![0x00, 0x01, 0xFF, 0xFF, 0xFF, 0xFE]);
		assert_eq!(stream.frame_count(), 1);
	}
}
