//! Animation container constants.
//!
//! This module contains the fixed values of the chunk atlas and command
//! stream layouts, including header sizes, flag bits and stream markers.

/// Canvas width of the legacy container
pub const LEGACY_CANVAS_WIDTH: usize = 320;

/// Canvas height of the legacy container
pub const LEGACY_CANVAS_HEIGHT: usize = 200;

/// Size of the atlas file header (4 bytes)
pub const ATLAS_HEADER_SIZE: usize = 4;

/// Atlas flag: a palette follows the header
pub const ATLAS_FLAG_PALETTE: u8 = 0x01;

/// Atlas flag: the embedded palette uses 8-bit channels
pub const ATLAS_FLAG_PALETTE_8BIT: u8 = 0x02;

/// Every atlas flag bit this implementation understands
pub const ATLAS_KNOWN_FLAGS: u8 = ATLAS_FLAG_PALETTE | ATLAS_FLAG_PALETTE_8BIT;

/// Size of each chunk header in bytes (8 bytes)
pub const CHUNK_HEADER_SIZE: usize = 8;

/// Size of the compressed-length prefix of a compressed chunk payload
pub const COMPRESSED_LENGTH_SIZE: usize = 2;

/// Chunk compression tag: raw pixels
pub const CHUNK_RAW: u8 = 0x00;

/// Chunk compression tag: run-length compressed pixels
pub const CHUNK_COMPRESSED: u8 = 0x02;

/// Size of a command stream word in bytes
pub const WORD_SIZE: usize = 2;

/// End of frame marker (0xFFFF)
pub const END_OF_FRAME: u16 = 0xFFFF;

/// End of stream marker (0xFFFE) - always the final word
pub const END_OF_STREAM: u16 = 0xFFFE;

/// Bit 15 of a chunk reference: an (x, y) override follows
pub const OVERRIDE_FLAG: u16 = 0x8000;

/// Bits 0-14 of a chunk reference: the chunk index
pub const CHUNK_INDEX_MASK: u16 = 0x7FFF;

/// Number of chunks the 15-bit index can address
pub const MAX_CHUNKS: usize = 0x7FFF;

/// Default number of palette entries allowed to differ between chained files
pub const DEFAULT_PALETTE_MISMATCH_TOLERANCE: usize = 8;

/// Highest chunk index that can carry a position override; above it the
/// flagged word collides with the stream markers
pub const MAX_OVERRIDE_INDEX: usize = 0x7FFD;
