//! Benchmark helper utilities for chunkanim-rs
//!
//! Generates synthetic frame sequences that look like the legacy cutscenes:
//! a full keyframe followed by frames that repaint a handful of sprites.

use chunkanim_types::file::IndexedImage;
use rand::{Rng, SeedableRng, rngs::SmallRng};

/// Generates `count` frames of `width`×`height` where each frame repaints
/// `sprites` random rectangles of at most `max_sprite` pixels per side.
///
/// Palette index 0 is never painted, so the frames always encode.
pub fn generate_frames(
	width: usize,
	height: usize,
	count: usize,
	sprites: usize,
	max_sprite: usize,
	seed: u64,
) -> Vec<IndexedImage> {
	let mut rng = SmallRng::seed_from_u64(seed);
	let mut pixels: Vec<u8> = (0..width * height).map(|i| 1 + (i % 31) as u8).collect();
	let mut frames = Vec::with_capacity(count);

	for index in 0..count {
		if index > 0 {
			for _ in 0..sprites {
				let w = rng.random_range(1..=max_sprite.min(width));
				let h = rng.random_range(1..=max_sprite.min(height));
				let x = rng.random_range(0..=width - w);
				let y = rng.random_range(0..=height - h);
				let color = rng.random_range(1..=255u8);
				for row in y..y + h {
					pixels[row * width + x..row * width + x + w].fill(color);
				}
			}
		}
		frames.push(IndexedImage::new(width, height, pixels.clone()).expect("frame size matches"));
	}
	frames
}

/// Common benchmark canvases
pub mod sizes {
	/// Tiny canvas: 64x40
	pub const TINY: (usize, usize) = (64, 40);
	/// Legacy canvas: 320x200
	pub const LEGACY: (usize, usize) = (320, 200);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_generate_frames() {
		let frames = generate_frames(16, 8, 4, 2, 4, 1);
		assert_eq!(frames.len(), 4);
		assert!(frames.iter().all(|f| f.width() == 16 && f.height() == 8));
		assert!(frames.iter().all(|f| !f.pixels().contains(&0)));
	}

	#[test]
	fn test_generate_frames_is_deterministic() {
		let a = generate_frames(16, 8, 3, 2, 4, 7);
		let b = generate_frames(16, 8, 3, 2, 4, 7);
		assert_eq!(a, b);
	}
}
