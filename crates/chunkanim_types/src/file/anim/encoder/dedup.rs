//! Content-addressed chunk table.

use std::collections::HashMap;

use crate::file::{
	AnimError,
	anim::{
		chunk::{ChunkKey, Rect, content_key},
		constants,
	},
};

#[derive(Debug)]
struct Entry {
	width: usize,
	height: usize,
	pixels: Vec<u8>,
	/// Placements in first-seen order with their counts
	placements: Vec<(Rect, usize)>,
}

impl Entry {
	fn record(&mut self, rect: Rect) {
		match self.placements.iter_mut().find(|(r, _)| *r == rect) {
			Some((_, count)) => *count += 1,
			None => self.placements.push((rect, 1)),
		}
	}

	fn canonical_rect(&self, promote_frequent: bool) -> Rect {
		let first = self.placements[0];
		if !promote_frequent {
			return first.0;
		}
		// strictly greater keeps the first seen on ties
		self.placements
			.iter()
			.skip(1)
			.fold(first, |best, &candidate| {
				if candidate.1 > best.1 {
					candidate
				} else {
					best
				}
			})
			.0
	}
}

/// Unique chunks with every placement recorded against them.
#[derive(Debug, Default)]
pub(super) struct ChunkTable {
	entries: Vec<Entry>,
	by_key: HashMap<ChunkKey, Vec<usize>>,
}

impl ChunkTable {
	/// Records one placement of `pixels` at `rect` and returns its slot.
	///
	/// # Errors
	///
	/// [`AnimError::TooManyChunks`] if a new slot would exceed the 15-bit index space.
	pub fn intern(&mut self, rect: Rect, pixels: Vec<u8>) -> Result<usize, AnimError> {
		let key = content_key(rect.width, rect.height, &pixels);
		let slots = self.by_key.entry(key).or_default();

		for &slot in slots.iter() {
			let entry = &mut self.entries[slot];
			if entry.width == rect.width && entry.height == rect.height && entry.pixels == pixels {
				entry.record(rect);
				return Ok(slot);
			}
		}

		if self.entries.len() >= constants::MAX_CHUNKS {
			return Err(AnimError::TooManyChunks {
				count: self.entries.len() + 1,
				max: constants::MAX_CHUNKS,
			});
		}

		let slot = self.entries.len();
		slots.push(slot);
		self.entries.push(Entry {
			width: rect.width,
			height: rect.height,
			pixels,
			placements: vec![(rect, 1)],
		});
		Ok(slot)
	}

	/// Number of unique chunks.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Stored rectangle of `slot`.
	pub fn canonical_rect(&self, slot: usize, promote_frequent: bool) -> Rect {
		self.entries[slot].canonical_rect(promote_frequent)
	}

	/// Consumes the table, yielding each unique chunk's canonical rectangle and pixels in slot order.
	pub fn into_chunks(self, promote_frequent: bool) -> impl Iterator<Item = (Rect, Vec<u8>)> {
		self.entries.into_iter().map(move |entry| (entry.canonical_rect(promote_frequent), entry.pixels))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_same_content_shares_a_slot() {
		let mut table = ChunkTable::default();
		let a = table.intern(Rect::new(0, 0, 2, 1), vec![1, 2]).unwrap();
		let b = table.intern(Rect::new(5, 5, 2, 1), vec![1, 2]).unwrap();
		let c = table.intern(Rect::new(0, 0, 1, 2), vec![1, 2]).unwrap();
		assert_eq!(a, b);
		assert_ne!(a, c);
		assert_eq!(table.len(), 2);
	}

	#[test]
	fn test_most_frequent_rect_wins() {
		let r1 = Rect::new(1, 1, 1, 1);
		let r2 = Rect::new(0, 0, 1, 1);
		let mut table = ChunkTable::default();
		for rect in [r2, r1, r1, r1] {
			table.intern(rect, vec![9]).unwrap();
		}
		assert_eq!(table.canonical_rect(0, true), r1);
		assert_eq!(table.canonical_rect(0, false), r2);
	}

	#[test]
	fn test_ties_keep_first_seen() {
		let r1 = Rect::new(1, 1, 1, 1);
		let r2 = Rect::new(0, 0, 1, 1);
		let mut table = ChunkTable::default();
		for rect in [r1, r2, r2, r1] {
			table.intern(rect, vec![9]).unwrap();
		}
		assert_eq!(table.canonical_rect(0, true), r1);
	}
}
