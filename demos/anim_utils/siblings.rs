//! Filesystem naming conventions for animation pairs and their chains.
//!
//! An animation is `NAME.ATL` (atlas) next to `NAME.CMD` (command stream).
//! Long animations are numbered (`OPEN01`, `OPEN02`, ...); a continuation
//! file is seeded by the nearest lower-numbered sibling found in the same
//! directory listing. A still image `NAME.seed.png` overrides the sibling
//! walk.

use std::{
	fmt, fs,
	path::{Path, PathBuf},
	sync::LazyLock,
};

use chunkanim_rs::chunkanim_types::file::{
	AnimError, Animation, ChunkCodec, FileType, Palette, RasterSource,
	anim::{Canvas, ChainStore},
};
use log::debug;
use regex::Regex;

use crate::raster::PngRaster;

pub const ATLAS_EXTENSIONS: [&str; 2] = ["atl", "ATL"];
pub const STREAM_EXTENSIONS: [&str; 2] = ["cmd", "CMD"];

static NUMBERED_STEM: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^(?P<prefix>.*?)(?P<number>\d+)$").expect("valid sibling pattern"));

/// Path of an atlas, identifying one animation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnimPath(pub PathBuf);

impl fmt::Display for AnimPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0.display())
	}
}

/// Returns `true` if `path` has the atlas extension.
pub fn is_atlas(path: &Path) -> bool {
	path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case(ATLAS_EXTENSIONS[0]))
}

/// Finds the command stream belonging to an atlas, in either letter case.
pub fn stream_for(atlas: &Path) -> Option<PathBuf> {
	STREAM_EXTENSIONS.iter().map(|ext| atlas.with_extension(ext)).find(|p| p.is_file())
}

/// Number of a sibling atlas sharing `prefix` and a number of `width` digits.
fn sibling_number(path: &Path, prefix: &str, width: usize) -> Option<u64> {
	let stem = path.file_stem()?.to_str()?;
	let captures = NUMBERED_STEM.captures(stem)?;
	let digits = &captures["number"];
	if &captures["prefix"] != prefix || digits.len() != width {
		return None;
	}
	digits.parse().ok()
}

/// Loads animations from disk and walks numbered siblings.
pub struct FsChainStore<'a> {
	codec: &'a dyn ChunkCodec,
	transparent_index: u8,
}

impl<'a> FsChainStore<'a> {
	pub fn new(codec: &'a dyn ChunkCodec, transparent_index: u8) -> Self {
		Self {
			codec,
			transparent_index,
		}
	}
}

impl ChainStore for FsChainStore<'_> {
	type Id = AnimPath;

	fn candidates(&self, id: &AnimPath) -> Vec<AnimPath> {
		let Some(stem) = id.0.file_stem().and_then(|s| s.to_str()) else {
			return Vec::new();
		};
		let Some(captures) = NUMBERED_STEM.captures(stem) else {
			debug!("{id}: not numbered, no siblings");
			return Vec::new();
		};
		let prefix = &captures["prefix"];
		let digits = &captures["number"];
		let Ok(number) = digits.parse::<u64>() else {
			return Vec::new();
		};
		let dir = match id.0.parent() {
			Some(parent) if !parent.as_os_str().is_empty() => parent,
			_ => Path::new("."),
		};

		let entries = match fs::read_dir(dir) {
			Ok(entries) => entries,
			Err(err) => {
				debug!("{id}: cannot list {}: {err}", dir.display());
				return Vec::new();
			}
		};

		let mut siblings: Vec<(u64, PathBuf)> = entries
			.filter_map(|entry| entry.ok().map(|e| e.path()))
			.filter(|path| is_atlas(path))
			.filter_map(|path| {
				let n = sibling_number(&path, prefix, digits.len())?;
				(n < number).then_some((n, path))
			})
			.collect();
		// nearest first; one file per number when both letter cases exist
		siblings.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
		siblings.dedup_by_key(|(n, _)| *n);

		siblings.into_iter().map(|(_, path)| AnimPath(path)).collect()
	}

	fn override_still(&self, id: &AnimPath) -> Option<Canvas> {
		let still = id.0.with_extension("seed.png");
		if !still.is_file() {
			return None;
		}
		let palette = self
			.load(id)
			.ok()
			.and_then(|anim| anim.palette().cloned())
			.unwrap_or_else(Palette::grayscale);
		match PngRaster::new(palette, self.transparent_index).read_raster(&still) {
			Ok(image) => Some(image.into_canvas()),
			Err(err) => {
				debug!("{id}: unreadable still override {}: {err}", still.display());
				None
			}
		}
	}

	fn load(&self, id: &AnimPath) -> Result<Animation, AnimError> {
		let stream = stream_for(&id.0).ok_or_else(|| {
			AnimError::malformed(FileType::Stream, format!("no command stream next to {id}"))
		})?;
		Animation::open(&id.0, stream, self.codec)
	}
}

#[cfg(test)]
mod tests {
	use std::path::Path;

	use chunkanim_rs::chunkanim_types::file::RleCodec;

	use super::*;

	fn scratch_dir(name: &str, files: &[&str]) -> PathBuf {
		let dir = std::env::temp_dir().join(format!("anim_utils_{name}_{}", std::process::id()));
		let _ = fs::remove_dir_all(&dir);
		fs::create_dir_all(&dir).unwrap();
		for file in files {
			fs::write(dir.join(file), []).unwrap();
		}
		dir
	}

	fn names(candidates: &[AnimPath]) -> Vec<String> {
		candidates
			.iter()
			.map(|c| c.0.file_name().unwrap().to_string_lossy().into_owned())
			.collect()
	}

	#[test]
	fn test_candidates_nearest_lower_first() {
		let dir = scratch_dir(
			"nearest",
			&["OPEN01.atl", "OPEN02.ATL", "OPEN003.atl", "OPEN05.atl", "OTHER01.atl", "OPEN01.cmd"],
		);
		let store = FsChainStore::new(&RleCodec, 0);

		let candidates = store.candidates(&AnimPath(dir.join("OPEN04.atl")));
		assert_eq!(names(&candidates), vec!["OPEN02.ATL", "OPEN01.atl"]);

		fs::remove_dir_all(&dir).unwrap();
	}

	#[test]
	fn test_candidates_for_large_numbers_come_from_the_listing() {
		let dir = scratch_dir("large", &["CUT20231231.atl", "CUT20240101.atl"]);
		let store = FsChainStore::new(&RleCodec, 0);

		let candidates = store.candidates(&AnimPath(dir.join("CUT20240101.atl")));
		assert_eq!(names(&candidates), vec!["CUT20231231.atl"]);
		assert!(store.candidates(&AnimPath(Path::new("INTRO.atl").to_path_buf())).is_empty());

		fs::remove_dir_all(&dir).unwrap();
	}
}
