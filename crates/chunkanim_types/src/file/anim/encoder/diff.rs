//! Frame differencing and chunk decomposition.

use crate::{
	blob::{find_blobs, merge_blobs},
	file::{
		AnimError,
		anim::{canvas::Canvas, chunk::Rect},
	},
};

use super::options::{EncoderOptions, Strategy};

/// A rectangle of pixels to place, before deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Piece {
	pub rect: Rect,
	pub pixels: Vec<u8>,
}

/// Difference between two frames: changed pixels carry their new value,
/// unchanged pixels carry the transparent sentinel.
#[derive(Debug)]
pub(super) struct FrameDiff {
	diff: Canvas,
	sentinel: u8,
}

impl FrameDiff {
	/// Diffs `next` against `previous`.
	///
	/// # Errors
	///
	/// [`AnimError::UnsupportedDiff`] if a changed pixel takes the sentinel
	/// value, which the decoder would read as "unchanged".
	pub fn new(previous: &Canvas, next: &Canvas, sentinel: u8, frame: usize) -> Result<Self, AnimError> {
		let width = next.width();
		let mut pixels = Vec::with_capacity(next.pixels().len());
		for (i, (&old, &new)) in previous.pixels().iter().zip(next.pixels()).enumerate() {
			if old == new {
				pixels.push(sentinel);
			} else if new == sentinel {
				return Err(AnimError::UnsupportedDiff {
					frame,
					x: i % width,
					y: i / width,
					sentinel,
				});
			} else {
				pixels.push(new);
			}
		}

		Ok(Self {
			diff: Canvas::from_raw(width, next.height(), pixels),
			sentinel,
		})
	}

	fn changed(&self, x: usize, y: usize) -> bool {
		self.diff.get(x, y).is_some_and(|v| v != self.sentinel)
	}

	/// Bounding box of every changed pixel, if any changed.
	pub fn bounds(&self) -> Option<Rect> {
		let width = self.diff.width();
		let rows = self.diff.pixels().chunks(width.max(1));
		let changed_rows: Vec<usize> = rows
			.enumerate()
			.filter(|(_, row)| row.iter().any(|&v| v != self.sentinel))
			.map(|(y, _)| y)
			.collect();
		let (&top, &bottom) = (changed_rows.first()?, changed_rows.last()?);

		let column_changed = |x: usize| (top..=bottom).any(|y| self.changed(x, y));
		let left = (0..width).find(|&x| column_changed(x))?;
		let right = (0..width).rev().find(|&x| column_changed(x))?;

		Some(Rect::new(left, top, right - left + 1, bottom - top + 1))
	}

	/// Cuts the difference into pieces according to `options`.
	///
	/// `target` is the frame being encoded; it supplies the pixels of
	/// rectangle-mode blob pieces.
	pub fn pieces(&self, target: &Canvas, options: &EncoderOptions) -> Vec<Piece> {
		match options.strategy {
			Strategy::Crop => self
				.bounds()
				.map(|rect| Piece {
					rect,
					pixels: self.diff.crop(rect),
				})
				.into_iter()
				.collect(),
			Strategy::Blob => self.blob_pieces(target, options),
		}
	}

	fn blob_pieces(&self, target: &Canvas, options: &EncoderOptions) -> Vec<Piece> {
		let (width, height) = (self.diff.width(), self.diff.height());
		let blobs = find_blobs(|x, y| self.changed(x, y), width, height, options.diagonal, false);
		let blobs = merge_blobs(blobs, width, height, options.merge_threshold);

		blobs
			.iter()
			.map(|blob| {
				let rect = blob.bounds();
				let pixels = if options.merge_as_rectangle {
					target.crop(rect)
				} else {
					self.diff
						.crop(rect)
						.into_iter()
						.zip(blob.mask())
						.map(|(pixel, member)| {
							if *member {
								pixel
							} else {
								self.sentinel
							}
						})
						.collect()
				};
				Piece {
					rect,
					pixels,
				}
			})
			.collect()
	}
}
