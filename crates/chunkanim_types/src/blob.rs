//! Connected-region detection over a predicate grid.
//!
//! [`find_blobs`] partitions every grid position that satisfies a predicate
//! into connected regions, using 4- or 8-adjacency. [`merge_blobs`] then
//! joins regions whose padded bounding boxes overlap until no two boxes do.
//!
//! Membership is tracked in a flat, bounds-checked [`Grid`] rather than by
//! mutating the caller's data, so the predicate stays a pure function of
//! position.

use std::collections::VecDeque;
use std::fmt;

use crate::file::anim::Rect;

const ORTHOGONAL: [(isize, isize); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];

const DIAGONAL: [(isize, isize); 8] =
	[(-1, -1), (0, -1), (1, -1), (-1, 0), (1, 0), (-1, 1), (0, 1), (1, 1)];

/// Grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
	/// Column
	pub x: usize,
	/// Row
	pub y: usize,
}

impl Point {
	/// Creates a point.
	pub const fn new(x: usize, y: usize) -> Self {
		Self {
			x,
			y,
		}
	}
}

/// Flat boolean grid with bounds-checked access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
	width: usize,
	height: usize,
	cells: Vec<bool>,
}

impl Grid {
	/// Creates a grid with every cell cleared.
	pub fn new(width: usize, height: usize) -> Self {
		Self {
			width,
			height,
			cells: vec![false; width * height],
		}
	}

	/// Cell value; positions outside the grid read as `false`.
	#[inline]
	pub fn get(&self, x: usize, y: usize) -> bool {
		x < self.width && y < self.height && self.cells[y * self.width + x]
	}

	/// Sets a cell. Positions outside the grid are ignored.
	#[inline]
	pub fn set(&mut self, x: usize, y: usize) {
		if x < self.width && y < self.height {
			self.cells[y * self.width + x] = true;
		}
	}

	/// Number of set cells.
	pub fn count(&self) -> usize {
		self.cells.iter().filter(|c| **c).count()
	}
}

/// One connected region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
	points: Vec<Point>,
	bounds: Rect,
	size: usize,
	mask: Vec<bool>,
}

impl Blob {
	/// Builds a blob from its recorded `points` and every one of its `members`.
	fn from_members(points: Vec<Point>, members: &[Point]) -> Self {
		let bounds = members.iter().fold(Rect::default(), |acc, p| acc.union(&Rect::new(p.x, p.y, 1, 1)));
		let mut mask = vec![false; bounds.area()];
		for p in members {
			mask[(p.y - bounds.y) * bounds.width + (p.x - bounds.x)] = true;
		}
		Self {
			points,
			bounds,
			size: members.len(),
			mask,
		}
	}

	/// Points recorded for this blob.
	///
	/// Every member when detected with `edges_only == false`, otherwise only
	/// the members on the region's boundary.
	pub fn points(&self) -> &[Point] {
		&self.points
	}

	/// Bounding box of the region.
	pub fn bounds(&self) -> Rect {
		self.bounds
	}

	/// Number of grid positions in the region, boundary or not.
	pub fn size(&self) -> usize {
		self.size
	}

	/// Per-pixel membership over [`Blob::bounds`], row-major.
	///
	/// Covers interior members too, whether or not the blob was detected
	/// with `edges_only`.
	pub fn mask(&self) -> &[bool] {
		&self.mask
	}

	/// Absorbs another blob into this one.
	pub fn absorb(&mut self, other: Blob) {
		let bounds = self.bounds.union(&other.bounds);
		let mut mask = vec![false; bounds.area()];
		for part in [&*self, &other] {
			let Rect {
				x,
				y,
				width,
				..
			} = part.bounds;
			for (i, _) in part.mask.iter().enumerate().filter(|(_, member)| **member) {
				let (px, py) = (x + i % width, y + i / width);
				mask[(py - bounds.y) * bounds.width + (px - bounds.x)] = true;
			}
		}
		self.bounds = bounds;
		self.mask = mask;
		self.size += other.size;
		self.points.extend(other.points);
	}
}

impl fmt::Display for Blob {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Blob {} ({} members)", self.bounds, self.size)
	}
}

fn neighbor(x: usize, y: usize, dx: isize, dy: isize, width: usize, height: usize) -> Option<Point> {
	let nx = x.checked_add_signed(dx)?;
	let ny = y.checked_add_signed(dy)?;
	(nx < width && ny < height).then_some(Point::new(nx, ny))
}

/// Finds the connected regions of positions satisfying `predicate`.
///
/// Regions are reported in row-major order of their first member. With
/// `diagonal` set, corner-touching positions are connected. With
/// `edges_only` set, each blob records only boundary members (members on
/// the grid border or next to a non-member); the partition and sizes are the
/// same either way.
pub fn find_blobs<F>(predicate: F, width: usize, height: usize, diagonal: bool, edges_only: bool) -> Vec<Blob>
where
	F: Fn(usize, usize) -> bool,
{
	let offsets: &[(isize, isize)] = if diagonal {
		&DIAGONAL
	} else {
		&ORTHOGONAL
	};

	let is_boundary = |p: Point| {
		p.x == 0
			|| p.y == 0
			|| p.x + 1 == width
			|| p.y + 1 == height
			|| offsets.iter().any(|&(dx, dy)| {
				neighbor(p.x, p.y, dx, dy, width, height).is_some_and(|n| !predicate(n.x, n.y))
			})
	};

	let mut claimed = Grid::new(width, height);
	let mut blobs = Vec::new();
	let mut queue = VecDeque::new();

	for y in 0..height {
		for x in 0..width {
			if claimed.get(x, y) || !predicate(x, y) {
				continue;
			}

			claimed.set(x, y);
			queue.push_back(Point::new(x, y));
			let mut points = Vec::new();
			let mut members = Vec::new();

			while let Some(p) = queue.pop_front() {
				members.push(p);
				if !edges_only || is_boundary(p) {
					points.push(p);
				}
				for &(dx, dy) in offsets {
					if let Some(n) = neighbor(p.x, p.y, dx, dy, width, height)
						&& !claimed.get(n.x, n.y)
						&& predicate(n.x, n.y)
					{
						claimed.set(n.x, n.y);
						queue.push_back(n);
					}
				}
			}

			blobs.push(Blob::from_members(points, &members));
		}
	}

	blobs
}

/// Merges blobs whose bounding boxes, grown by `threshold` pixels and
/// clamped to the grid, overlap.
///
/// Merging repeats until no two padded boxes intersect. A negative
/// threshold disables merging.
pub fn merge_blobs(mut blobs: Vec<Blob>, width: usize, height: usize, threshold: i32) -> Vec<Blob> {
	let Ok(pad) = usize::try_from(threshold) else {
		return blobs;
	};

	loop {
		let mut merged = false;
		let mut i = 0;
		while i < blobs.len() {
			let mut j = i + 1;
			while j < blobs.len() {
				let a = blobs[i].bounds.inflate(pad, width, height);
				let b = blobs[j].bounds.inflate(pad, width, height);
				if a.intersects(&b) {
					let other = blobs.remove(j);
					blobs[i].absorb(other);
					merged = true;
					// bounds grew, recheck everything after i
					j = i + 1;
				} else {
					j += 1;
				}
			}
			i += 1;
		}
		if !merged {
			return blobs;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn grid(rows: &[&str]) -> (Vec<bool>, usize, usize) {
		let width = rows[0].len();
		let cells = rows.iter().flat_map(|r| r.bytes().map(|b| b == b'#')).collect();
		(cells, width, rows.len())
	}

	#[test]
	fn test_partition_covers_every_match_once() {
		let (cells, w, h) = grid(&["##..#", "#...#", "..#..", "....."]);
		let blobs = find_blobs(|x, y| cells[y * w + x], w, h, false, false);

		assert_eq!(blobs.len(), 3);
		let mut seen = Grid::new(w, h);
		for blob in &blobs {
			for p in blob.points() {
				assert!(!seen.get(p.x, p.y), "point {p:?} in two blobs");
				seen.set(p.x, p.y);
			}
		}
		assert_eq!(seen.count(), cells.iter().filter(|c| **c).count());
		assert_eq!(blobs[0].bounds(), Rect::new(0, 0, 2, 2));
		assert_eq!(blobs[1].bounds(), Rect::new(4, 0, 1, 2));
	}

	#[test]
	fn test_diagonal_adjacency() {
		let (cells, w, h) = grid(&["#..", ".#.", "..#"]);
		assert_eq!(find_blobs(|x, y| cells[y * w + x], w, h, false, false).len(), 3);
		let joined = find_blobs(|x, y| cells[y * w + x], w, h, true, false);
		assert_eq!(joined.len(), 1);
		assert_eq!(joined[0].size(), 3);
	}

	#[test]
	fn test_edges_only_keeps_partition() {
		let (cells, w, h) = grid(&[".....", ".###.", ".###.", ".###.", "....."]);
		let full = find_blobs(|x, y| cells[y * w + x], w, h, false, false);
		let edges = find_blobs(|x, y| cells[y * w + x], w, h, false, true);

		assert_eq!(full.len(), edges.len());
		assert_eq!(full[0].size(), edges[0].size());
		assert_eq!(full[0].bounds(), edges[0].bounds());
		assert_eq!(edges[0].points().len(), 8);
		assert!(!edges[0].points().contains(&Point::new(2, 2)));
	}

	#[test]
	fn test_mask_marks_members() {
		let (cells, w, h) = grid(&["#.", "##"]);
		let blobs = find_blobs(|x, y| cells[y * w + x], w, h, false, false);
		assert_eq!(blobs[0].mask(), &[true, false, true, true]);
	}

	#[test]
	fn test_mask_ignores_edges_only() {
		let (cells, w, h) = grid(&[".....", ".###.", ".###.", ".###.", "....."]);
		let full = find_blobs(|x, y| cells[y * w + x], w, h, false, false);
		let edges = find_blobs(|x, y| cells[y * w + x], w, h, false, true);

		assert_eq!(edges[0].mask(), &[true; 9]);
		assert_eq!(full[0].mask(), edges[0].mask());
	}

	#[test]
	fn test_merged_mask_keeps_gaps() {
		let (cells, w, h) = grid(&["#.#", "...", "..."]);
		let blobs = find_blobs(|x, y| cells[y * w + x], w, h, false, true);
		let merged = merge_blobs(blobs, w, h, 1);

		assert_eq!(merged.len(), 1);
		assert_eq!(merged[0].bounds(), Rect::new(0, 0, 3, 1));
		assert_eq!(merged[0].mask(), &[true, false, true]);
	}

	#[test]
	fn test_merge_reaches_fixed_point() {
		let (cells, w, h) = grid(&["#.#...#", ".......", "......#"]);
		let blobs = find_blobs(|x, y| cells[y * w + x], w, h, false, false);
		assert_eq!(blobs.len(), 4);

		let merged = merge_blobs(blobs.clone(), w, h, 1);
		for (i, a) in merged.iter().enumerate() {
			for b in &merged[i + 1..] {
				assert!(!a.bounds().inflate(1, w, h).intersects(&b.bounds().inflate(1, w, h)));
			}
		}
		assert_eq!(merged.iter().map(Blob::size).sum::<usize>(), 4);
		assert_eq!(merged.len(), 2);

		assert_eq!(merge_blobs(blobs.clone(), w, h, -1), blobs);
	}

	#[test]
	fn test_merge_zero_threshold_only_joins_overlaps() {
		let (cells, w, h) = grid(&["#.#", "...", "#.."]);
		let blobs = find_blobs(|x, y| cells[y * w + x], w, h, false, false);
		assert_eq!(merge_blobs(blobs, w, h, 0).len(), 3);
	}
}
