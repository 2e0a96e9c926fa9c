//! Atlas and command stream pair.

use std::{fmt, path::Path};

use log::debug;

use crate::file::{AnimError, compression::ChunkCodec, palette::Palette};

use super::{
	atlas::Atlas,
	canvas::Canvas,
	command::CommandStream,
	config::CodecConfig,
	decoder::{Decoder, FrameProbe, ProbeFailure, Rendered},
};

/// A complete animation: the chunk atlas and the command stream that
/// places its chunks.
///
/// The command stream is kept as bytes; it is validated while it is decoded,
/// so probing a long file stops after its first frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Animation {
	atlas: Atlas,
	stream: Vec<u8>,
}

impl Animation {
	/// Creates an animation from a parsed atlas and raw stream bytes.
	pub fn new(atlas: Atlas, stream: Vec<u8>) -> Self {
		Self {
			atlas,
			stream,
		}
	}

	/// Creates an animation from a parsed atlas and command stream.
	pub fn from_commands(atlas: Atlas, commands: &CommandStream) -> Self {
		Self::new(atlas, commands.to_bytes())
	}

	/// Opens the atlas and stream files.
	///
	/// # Errors
	///
	/// Returns an error if either file cannot be read or the atlas is malformed.
	pub fn open(
		atlas_path: impl AsRef<Path>,
		stream_path: impl AsRef<Path>,
		codec: &dyn ChunkCodec,
	) -> Result<Self, AnimError> {
		let atlas = Atlas::open(atlas_path.as_ref(), codec)?;
		let stream = std::fs::read(stream_path.as_ref())?;
		debug!(
			"opened {} ({} chunks) with {} ({} bytes)",
			atlas_path.as_ref().display(),
			atlas.len(),
			stream_path.as_ref().display(),
			stream.len()
		);
		Ok(Self::new(atlas, stream))
	}

	/// Parses an animation from atlas and stream bytes.
	///
	/// # Errors
	///
	/// Returns an error if the atlas is malformed.
	pub fn from_bytes(atlas: &[u8], stream: &[u8], codec: &dyn ChunkCodec) -> Result<Self, AnimError> {
		Ok(Self::new(Atlas::from_bytes(atlas, codec)?, stream.to_vec()))
	}

	/// Serializes both files.
	///
	/// # Errors
	///
	/// Returns an error if the atlas cannot be serialized.
	pub fn to_bytes(&self, codec: &dyn ChunkCodec) -> Result<(Vec<u8>, Vec<u8>), AnimError> {
		Ok((self.atlas.to_bytes(codec)?, self.stream.clone()))
	}

	/// Writes both files.
	///
	/// # Errors
	///
	/// Returns an error if serialization or writing fails.
	pub fn save(
		&self,
		atlas_path: impl AsRef<Path>,
		stream_path: impl AsRef<Path>,
		codec: &dyn ChunkCodec,
	) -> Result<(), AnimError> {
		self.atlas.save(atlas_path, codec)?;
		std::fs::write(stream_path, &self.stream)?;
		Ok(())
	}

	/// The chunk atlas.
	pub fn atlas(&self) -> &Atlas {
		&self.atlas
	}

	/// Embedded palette, if any.
	pub fn palette(&self) -> Option<&Palette> {
		self.atlas.palette()
	}

	/// Raw command stream bytes.
	pub fn stream(&self) -> &[u8] {
		&self.stream
	}

	/// Parses the whole command stream.
	///
	/// # Errors
	///
	/// Returns an error if the stream is malformed or references missing chunks.
	pub fn commands(&self) -> Result<CommandStream, AnimError> {
		CommandStream::from_bytes(&self.stream, self.atlas.len())
	}

	/// Renders every frame, starting from `seed` when given.
	///
	/// # Errors
	///
	/// See [`Decoder::render`].
	pub fn render(&self, config: &CodecConfig, seed: Option<&Canvas>) -> Result<Rendered, AnimError> {
		Decoder::new(&self.atlas, config).render(&self.stream, seed)
	}

	/// Renders only the first frame.
	///
	/// # Errors
	///
	/// See [`Decoder::probe`].
	pub fn probe(&self, config: &CodecConfig) -> Result<FrameProbe, ProbeFailure> {
		Decoder::new(&self.atlas, config).probe(&self.stream)
	}

	/// Splits the animation into its parts.
	pub fn into_parts(self) -> (Atlas, Vec<u8>) {
		(self.atlas, self.stream)
	}
}

impl fmt::Display for Animation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Animation ({} chunks, {} stream bytes)", self.atlas.len(), self.stream.len())
	}
}
