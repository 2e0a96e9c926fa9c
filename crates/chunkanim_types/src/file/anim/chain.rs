//! Continuation chain resolution.
//!
//! A file without a usable first frame continues an earlier file: its
//! canvas must start from that file's last frame. [`ChainResolver`] finds
//! the earlier files through a [`ChainStore`], which knows how siblings are
//! named and where they live.
//!
//! Resolution order:
//!
//! 1. A still-image override with the canvas dimensions is used as the seed directly.
//! 2. Otherwise candidates are probed from the nearest previous sibling
//!    backwards. Candidates that fail to decode, have the wrong size, or
//!    whose palette drifts too far from the requester's are skipped.
//!    Candidates that themselves need a seed are collected, and the walk
//!    stops at the first self-sufficient one.
//!
//! The resolved chain is decoded oldest first, each file seeded with the
//! last frame of the one before it.

use std::fmt;

use log::{debug, warn};

use crate::file::AnimError;

use super::{
	canvas::Canvas,
	chunk::{Chunk, Rect},
	config::CodecConfig,
	decoder::{ProbeFailure, Rendered},
	file::Animation,
};

/// Access to sibling files of a continuation chain.
pub trait ChainStore {
	/// Identifier of one animation, usually a path.
	type Id: Clone + fmt::Debug + fmt::Display;

	/// Sibling files `id` may continue, nearest previous first.
	fn candidates(&self, id: &Self::Id) -> Vec<Self::Id>;

	/// Still image that replaces the chain walk for `id`, if one exists.
	fn override_still(&self, id: &Self::Id) -> Option<Canvas>;

	/// Loads an animation.
	///
	/// # Errors
	///
	/// Any error makes the candidate ineligible.
	fn load(&self, id: &Self::Id) -> Result<Animation, AnimError>;
}

/// Files that seed a continuation file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationChain<Id> {
	/// Ancestors oldest first, excluding the requesting file
	pub files: Vec<Id>,
	/// Still image used instead of a file chain
	pub still: Option<Canvas>,
}

impl<Id> ContinuationChain<Id> {
	/// Returns `true` if the seed comes from a still image.
	pub fn is_still(&self) -> bool {
		self.still.is_some()
	}
}

/// Resolves and decodes continuation chains.
#[derive(Debug)]
pub struct ChainResolver<'a, S: ChainStore> {
	store: &'a S,
	config: CodecConfig,
}

impl<'a, S: ChainStore> ChainResolver<'a, S> {
	/// Creates a resolver over `store`.
	pub fn new(store: &'a S, config: CodecConfig) -> Self {
		Self {
			store,
			config,
		}
	}

	/// Finds the files that seed `id`.
	///
	/// `requester` is the already loaded animation for `id`; its palette is
	/// the reference for the palette drift check.
	///
	/// # Errors
	///
	/// Returns [`AnimError::ChainResolutionFailure`] if no self-sufficient
	/// ancestor exists.
	pub fn resolve(&self, id: &S::Id, requester: &Animation) -> Result<ContinuationChain<S::Id>, AnimError> {
		let (width, height) = (self.config.canvas_width, self.config.canvas_height);

		if let Some(still) = self.store.override_still(id) {
			if still.has_size(width, height) {
				debug!("{id}: seeded by still image override");
				return Ok(ContinuationChain {
					files: Vec::new(),
					still: Some(still),
				});
			}
			debug!("{id}: ignoring still image override of size {}x{}", still.width(), still.height());
		}

		let mut files = Vec::new();
		let mut probed = 0usize;
		for candidate in self.store.candidates(id) {
			probed += 1;
			let animation = match self.store.load(&candidate) {
				Ok(animation) => animation,
				Err(err) => {
					debug!("{id}: rejecting {candidate}: {err}");
					continue;
				}
			};

			if let (Some(expected), Some(actual)) = (requester.palette(), animation.palette()) {
				let mismatched = expected.mismatch_count(actual);
				if mismatched > self.config.palette_mismatch_tolerance {
					debug!(
						"{id}: rejecting {candidate}: {mismatched} palette entries differ (tolerance {})",
						self.config.palette_mismatch_tolerance
					);
					continue;
				}
			}

			if let Some(rect) = oversized_chunk(&animation, width, height) {
				debug!("{id}: rejecting {candidate}: chunk {rect} exceeds the {width}x{height} canvas");
				continue;
			}

			match animation.probe(&self.config) {
				Ok(_) => {
					debug!("{id}: {candidate} is self-sufficient");
					files.push(candidate);
					files.reverse();
					return Ok(ContinuationChain {
						files,
						still: None,
					});
				}
				Err(ProbeFailure::NeedsContinuation) => {
					debug!("{id}: {candidate} continues an earlier file");
					files.push(candidate);
				}
				Err(ProbeFailure::Rejected(err)) => {
					debug!("{id}: rejecting {candidate}: {err}");
				}
			}
		}

		Err(AnimError::ChainResolutionFailure {
			message: format!("{id}: no self-sufficient ancestor among {probed} candidates"),
		})
	}

	/// Decodes a resolved chain and returns the seed for the requesting file.
	///
	/// # Errors
	///
	/// Returns an error if a chain file fails to load or decode.
	pub fn seed(&self, chain: &ContinuationChain<S::Id>) -> Result<Canvas, AnimError> {
		if let Some(still) = &chain.still {
			return Ok(still.clone());
		}

		let mut seed: Option<Canvas> = None;
		for id in &chain.files {
			let rendered = self.store.load(id)?.render(&self.config, seed.as_ref())?;
			match rendered.into_frames().pop() {
				Some(last) => seed = Some(last.into_canvas()),
				None => debug!("{id}: no frames, seed unchanged"),
			}
		}

		seed.ok_or_else(|| AnimError::ChainResolutionFailure {
			message: "continuation chain produced no frames".to_string(),
		})
	}

	/// Loads and renders `id`, resolving its continuation chain if needed.
	///
	/// When no chain can be resolved the file is rendered on a blank canvas
	/// and the result is marked best-effort.
	///
	/// # Errors
	///
	/// Returns fatal decode errors of `id` or of the files in its chain.
	pub fn render(&self, id: &S::Id) -> Result<Rendered, AnimError> {
		let animation = self.store.load(id)?;
		match animation.probe(&self.config) {
			Ok(_) => return animation.render(&self.config, None),
			Err(ProbeFailure::Rejected(err)) => return Err(err),
			Err(ProbeFailure::NeedsContinuation) => {}
		}

		let seed = self.resolve(id, &animation).and_then(|chain| self.seed(&chain));
		match seed {
			Ok(seed) => animation.render(&self.config, Some(&seed)),
			Err(err) if err.is_recoverable() => {
				warn!("{err}; rendering {id} on a blank canvas");
				let mut rendered = animation.render(&self.config, None)?;
				rendered.mark_best_effort();
				Ok(rendered)
			}
			Err(err) => Err(err),
		}
	}
}

/// First atlas chunk whose rectangle reaches past the canvas, which marks a
/// file authored for another canvas size.
fn oversized_chunk(animation: &Animation, width: usize, height: usize) -> Option<Rect> {
	animation
		.atlas()
		.chunks()
		.iter()
		.map(Chunk::rect)
		.find(|rect| rect.x + rect.width > width || rect.y + rect.height > height)
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;
	use crate::file::{
		anim::{
			atlas::Atlas,
			chunk::{Chunk, Rect},
		},
		palette::{Color, Palette},
	};

	const W: usize = 2;
	const H: usize = 1;

	#[derive(Default)]
	struct MemoryStore {
		files: HashMap<u32, Animation>,
		stills: HashMap<u32, Canvas>,
	}

	impl ChainStore for MemoryStore {
		type Id = u32;

		fn candidates(&self, id: &u32) -> Vec<u32> {
			(0..*id).rev().filter(|i| self.files.contains_key(i)).collect()
		}

		fn override_still(&self, id: &u32) -> Option<Canvas> {
			self.stills.get(id).cloned()
		}

		fn load(&self, id: &u32) -> Result<Animation, AnimError> {
			self.files.get(id).cloned().ok_or_else(|| AnimError::ChainResolutionFailure {
				message: format!("missing {id}"),
			})
		}
	}

	/// Full keyframe of `value`.
	fn keyframe(value: u8) -> Animation {
		let atlas = Atlas::from_parts(None, vec![Chunk::new(Rect::new(0, 0, W, H), vec![value; W * H])]);
		Animation::new(atlas, vec![0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFE])
	}

	/// Paints `value` at x = 1 on top of whatever came before.
	fn continuation(value: u8) -> Animation {
		let atlas = Atlas::from_parts(None, vec![Chunk::new(Rect::new(1, 0, 1, 1), vec![value])]);
		Animation::new(atlas, vec![0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFE])
	}

	fn config() -> CodecConfig {
		CodecConfig::with_canvas(W, H)
	}

	#[test]
	fn test_resolve_walks_back_to_self_sufficient_file() {
		let mut store = MemoryStore::default();
		store.files.insert(1, keyframe(3));
		store.files.insert(2, continuation(4));
		store.files.insert(3, continuation(5));

		let resolver = ChainResolver::new(&store, config());
		let requester = store.load(&3).unwrap();
		let chain = resolver.resolve(&3, &requester).unwrap();
		assert_eq!(chain.files, vec![1, 2]);
		assert!(!chain.is_still());

		let seed = resolver.seed(&chain).unwrap();
		assert_eq!(seed.pixels(), &[3, 4]);

		let rendered = resolver.render(&3).unwrap();
		assert_eq!(rendered.frames()[0].pixels(), &[3, 5]);
		assert!(rendered.is_seeded());
		assert!(!rendered.is_best_effort());
	}

	#[test]
	fn test_resolve_fails_without_self_sufficient_ancestor() {
		let mut store = MemoryStore::default();
		store.files.insert(1, continuation(4));
		store.files.insert(2, continuation(5));

		let resolver = ChainResolver::new(&store, config());
		let requester = store.load(&2).unwrap();
		let err = resolver.resolve(&2, &requester).unwrap_err();
		assert!(err.is_recoverable());

		let rendered = resolver.render(&2).unwrap();
		assert!(rendered.is_best_effort());
		assert_eq!(rendered.frames()[0].pixels(), &[0, 5]);
	}

	#[test]
	fn test_still_override_short_circuits() {
		let mut store = MemoryStore::default();
		store.files.insert(1, keyframe(3));
		store.files.insert(2, continuation(5));
		store.stills.insert(2, Canvas::from_pixels(W, H, vec![8, 8]).unwrap());

		let resolver = ChainResolver::new(&store, config());
		let chain = resolver.resolve(&2, &store.load(&2).unwrap()).unwrap();
		assert!(chain.is_still());
		assert!(chain.files.is_empty());
		assert_eq!(resolver.render(&2).unwrap().frames()[0].pixels(), &[8, 5]);
	}

	#[test]
	fn test_still_override_of_wrong_size_is_ignored() {
		let mut store = MemoryStore::default();
		store.files.insert(1, keyframe(3));
		store.files.insert(2, continuation(5));
		store.stills.insert(2, Canvas::new(4, 4));

		let resolver = ChainResolver::new(&store, config());
		let chain = resolver.resolve(&2, &store.load(&2).unwrap()).unwrap();
		assert_eq!(chain.files, vec![1]);
	}

	#[test]
	fn test_palette_drift_beyond_tolerance_rejects_candidate() {
		let base = Palette::grayscale();
		let drifted = (0..9u8).fold(base.clone(), |p, i| p.with_color(i, Color::rgb(63, 0, 0)));
		let slightly = (0..8u8).fold(base.clone(), |p, i| p.with_color(i, Color::rgb(63, 0, 0)));

		let with_palette = |anim: Animation, palette: &Palette| {
			let (atlas, stream) = anim.into_parts();
			Animation::new(Atlas::from_parts(Some(palette.clone()), atlas.chunks().to_vec()), stream)
		};

		let mut store = MemoryStore::default();
		store.files.insert(1, with_palette(keyframe(3), &slightly));
		store.files.insert(2, with_palette(keyframe(6), &drifted));
		store.files.insert(3, with_palette(continuation(5), &base));

		let resolver = ChainResolver::new(&store, config());
		let chain = resolver.resolve(&3, &store.load(&3).unwrap()).unwrap();
		// 2 differs in nine entries, 1 in eight
		assert_eq!(chain.files, vec![1]);
	}

	#[test]
	fn test_candidate_for_another_canvas_is_rejected() {
		let wide = Atlas::from_parts(None, vec![Chunk::new(Rect::new(0, 0, W + 1, H), vec![3; (W + 1) * H])]);

		let mut store = MemoryStore::default();
		store.files.insert(1, keyframe(3));
		store.files.insert(2, Animation::new(wide, vec![0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFE]));
		store.files.insert(3, continuation(5));

		let resolver = ChainResolver::new(&store, config());
		let chain = resolver.resolve(&3, &store.load(&3).unwrap()).unwrap();
		assert_eq!(chain.files, vec![1]);
	}

	#[test]
	fn test_broken_candidate_is_skipped() {
		let mut store = MemoryStore::default();
		store.files.insert(1, keyframe(3));
		// references a chunk that does not exist
		store.files.insert(2, Animation::new(Atlas::new(), vec![0x00, 0x04, 0xFF, 0xFE]));
		store.files.insert(3, continuation(5));

		let resolver = ChainResolver::new(&store, config());
		let chain = resolver.resolve(&3, &store.load(&3).unwrap()).unwrap();
		assert_eq!(chain.files, vec![1]);
	}
}
