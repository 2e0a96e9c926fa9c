//! Animation utility.
//!
//! Provides four subcommands:
//! - `info`: describe a palette, atlas or animation
//! - `decode`: render an animation to PNG frames plus `metadata.json`,
//!   resolving continuation chains through numbered siblings
//! - `encode`: turn a directory of PNG frames into an atlas and command stream
//! - `scan`: probe every animation under a directory and report chain status
//!
//! Codec and encoder settings come from built-in defaults, then an optional
//! TOML file (`--config`), then `CHUNKANIM_*` environment variables, for
//! example `CHUNKANIM_CODEC__CANVAS_WIDTH=64`.

mod raster;
mod siblings;

use std::{
	fs,
	path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use chunkanim_rs::chunkanim_types::file::{
	CodecConfig, EncoderOptions, Format, IndexedImage, Palette, PaletteDepth, RasterSink,
	RasterSource, RleCodec,
	anim::{ChainResolver, ChainStore, Encoder, ProbeFailure, Strategy},
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::{
	raster::PngRaster,
	siblings::{AnimPath, FsChainStore, is_atlas, stream_for},
};

fn main() -> Result<()> {
	env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

	let cli = Cli::parse();
	let settings = Settings::load(cli.config.as_deref())?;
	match cli.command {
		Command::Info(args) => run_info(args, &settings),
		Command::Decode(args) => run_decode(args, &settings),
		Command::Encode(args) => run_encode(args, settings),
		Command::Scan(args) => run_scan(args, &settings),
	}
}

#[derive(Parser)]
#[command(name = "anim_utils")]
#[command(author = "chunkanim-rs project")]
#[command(version)]
#[command(about = "Inspect, decode and encode chunked delta-frame animations", long_about = None)]
struct Cli {
	/// TOML file with `[codec]` and `[encoder]` settings
	#[arg(short, long, global = true, value_name = "FILE")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Describe a palette, atlas or animation
	Info(InfoArgs),
	/// Render every frame of an animation to PNG files
	Decode(DecodeArgs),
	/// Encode a directory of PNG frames
	Encode(EncodeArgs),
	/// Probe every animation under a directory
	Scan(ScanArgs),
}

#[derive(Args)]
struct InfoArgs {
	/// Palette, atlas or animation atlas file
	#[arg(value_name = "FILE")]
	file: PathBuf,

	/// Command stream (defaults to the `.cmd` file next to an atlas)
	#[arg(short, long, value_name = "STREAM")]
	stream: Option<PathBuf>,

	/// Print JSON instead of text
	#[arg(long, default_value_t = false)]
	json: bool,
}

#[derive(Args)]
struct DecodeArgs {
	/// Atlas file
	#[arg(value_name = "ATLAS")]
	atlas: PathBuf,

	/// Output directory (defaults to `<atlas>_frames/`)
	#[arg(short, long, value_name = "OUTPUT_DIR")]
	output: Option<PathBuf>,

	/// Render on a blank canvas instead of resolving continuation chains
	#[arg(long, default_value_t = false)]
	no_chain: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
	Crop,
	Blob,
}

impl From<StrategyArg> for Strategy {
	fn from(value: StrategyArg) -> Self {
		match value {
			StrategyArg::Crop => Self::Crop,
			StrategyArg::Blob => Self::Blob,
		}
	}
}

#[derive(Args)]
struct EncodeArgs {
	/// Directory of PNG frames, encoded in file name order
	#[arg(value_name = "INPUT_DIR")]
	input: PathBuf,

	/// Output atlas; the command stream is written next to it
	#[arg(value_name = "OUTPUT_ATLAS")]
	output: PathBuf,

	/// Palette table (768 bytes, 6- or 8-bit); defaults to grayscale
	#[arg(short, long, value_name = "PALETTE")]
	palette: Option<PathBuf>,

	/// Still image the first frame continues from
	#[arg(long, value_name = "PNG")]
	seed: Option<PathBuf>,

	/// Chunk decomposition strategy
	#[arg(long, value_enum)]
	strategy: Option<StrategyArg>,

	/// Merge regions whose boxes come within this many pixels (-1 disables)
	#[arg(long, value_name = "PIXELS", allow_hyphen_values = true)]
	merge: Option<i32>,

	/// Treat corner-touching pixels as connected
	#[arg(long, default_value_t = false)]
	diagonal: bool,

	/// Keep whole bounding boxes of merged regions
	#[arg(long, default_value_t = false)]
	rect: bool,

	/// Store every chunk raw
	#[arg(long, default_value_t = false)]
	no_compress: bool,
}

#[derive(Args)]
struct ScanArgs {
	/// Directory to scan
	#[arg(value_name = "DIR")]
	root: PathBuf,

	/// Recurse into sub-directories
	#[arg(short, long, default_value_t = false)]
	recursive: bool,
}

/// Layered settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct Settings {
	codec: CodecConfig,
	encoder: EncoderOptions,
}

impl Settings {
	fn load(path: Option<&Path>) -> Result<Self> {
		let mut builder =
			config::Config::builder().add_source(config::Config::try_from(&Settings::default())?);
		if let Some(path) = path {
			builder = builder.add_source(config::File::from(path));
		}
		builder = builder.add_source(
			config::Environment::with_prefix("CHUNKANIM")
				.prefix_separator("_")
				.separator("__")
				.try_parsing(true),
		);

		let settings: Settings = builder
			.build()
			.context("Failed to load settings")?
			.try_deserialize()
			.context("Invalid settings")?;
		settings.codec.validate()?;
		Ok(settings)
	}
}

/// Frame metadata for JSON serialization
#[derive(Debug, Clone, Serialize)]
struct FrameMetadata {
	/// Frame index
	index: usize,
	/// Chunk placements in this frame
	chunk_count: usize,
	/// First frame that cannot stand alone
	incomplete_first_frame: bool,
	/// PNG filename
	filename: String,
}

/// Decode metadata structure
#[derive(Debug, Clone, Serialize)]
struct DecodeMetadata {
	atlas: String,
	frame_count: usize,
	no_first_frame: bool,
	seeded: bool,
	best_effort: bool,
	frames: Vec<FrameMetadata>,
}

fn run_info(args: InfoArgs, settings: &Settings) -> Result<()> {
	let primary = fs::read(&args.file).with_context(|| format!("Failed to read {}", args.file.display()))?;
	let stream_path = args.stream.or_else(|| stream_for(&args.file));
	let stream = stream_path
		.as_ref()
		.map(fs::read)
		.transpose()
		.context("Failed to read command stream")?;

	let Some(format) = Format::detect(&primary, stream.as_deref()) else {
		bail!("{} is not a recognized file", args.file.display());
	};
	let decoded = format.decode(&primary, stream.as_deref(), &settings.codec, &RleCodec)?;
	let summary = decoded.describe();

	if args.json {
		println!("{}", serde_json::to_string_pretty(&summary)?);
		return Ok(());
	}

	println!("File:        {}", args.file.display());
	println!("Format:      {} ({})", summary.format, summary.description);
	println!("Palette:     {}", if summary.has_palette { "yes" } else { "no" });
	if let Some(chunks) = summary.chunks {
		println!("Chunks:      {chunks}");
	}
	if let Some(frames) = summary.frames {
		println!("Frames:      {frames}");
	}
	if summary.no_first_frame == Some(true) {
		println!("First frame: incomplete, continues an earlier file");
	}
	Ok(())
}

fn run_decode(args: DecodeArgs, settings: &Settings) -> Result<()> {
	let output_dir = args.output.unwrap_or_else(|| {
		let stem = args.atlas.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
		args.atlas.with_file_name(format!("{stem}_frames"))
	});
	fs::create_dir_all(&output_dir)
		.with_context(|| format!("Failed to create {}", output_dir.display()))?;

	let store = FsChainStore::new(&RleCodec, settings.codec.transparent_index);
	let id = AnimPath(args.atlas.clone());
	let animation = store.load(&id)?;
	let rendered = if args.no_chain {
		animation.render(&settings.codec, None)?
	} else {
		ChainResolver::new(&store, settings.codec).render(&id)?
	};
	if rendered.is_best_effort() {
		warn!("{id}: continuation chain not found, frames rendered on a blank canvas");
	}

	let palette = animation.palette().cloned().unwrap_or_else(Palette::grayscale);
	let sink = PngRaster::new(palette.clone(), settings.codec.transparent_index);
	let mut metadata = DecodeMetadata {
		atlas: id.to_string(),
		frame_count: rendered.len(),
		no_first_frame: rendered.no_first_frame(),
		seeded: rendered.is_seeded(),
		best_effort: rendered.is_best_effort(),
		frames: Vec::with_capacity(rendered.len()),
	};

	for (index, frame) in rendered.frames().iter().enumerate() {
		let filename = format!("frame_{index:04}.png");
		let image = IndexedImage::from_canvas(frame.canvas().clone(), Some(palette.clone()));
		sink.write_raster(&image, &output_dir.join(&filename))?;
		metadata.frames.push(FrameMetadata {
			index,
			chunk_count: frame.chunk_count(),
			incomplete_first_frame: frame.is_incomplete_first_frame(),
			filename,
		});
	}

	let metadata_path = output_dir.join("metadata.json");
	fs::write(&metadata_path, serde_json::to_string_pretty(&metadata)?)
		.with_context(|| format!("Failed to write {}", metadata_path.display()))?;

	println!("✓ {} frames written to {}", rendered.len(), output_dir.display());
	Ok(())
}

fn load_palette(path: Option<&Path>) -> Result<Palette> {
	let Some(path) = path else {
		return Ok(Palette::grayscale());
	};
	let bytes = fs::read(path).with_context(|| format!("Failed to read palette {}", path.display()))?;
	Ok(Palette::from_bytes(&bytes, PaletteDepth::detect(&bytes))?)
}

fn collect_pngs(dir: &Path) -> Result<Vec<PathBuf>> {
	let mut files: Vec<PathBuf> = fs::read_dir(dir)
		.with_context(|| format!("Failed to read {}", dir.display()))?
		.filter_map(|entry| entry.ok().map(|e| e.path()))
		.filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("png")))
		.collect();
	files.sort();
	Ok(files)
}

fn run_encode(args: EncodeArgs, settings: Settings) -> Result<()> {
	let mut options = settings.encoder;
	if let Some(strategy) = args.strategy {
		options.strategy = strategy.into();
	}
	if let Some(merge) = args.merge {
		options.merge_threshold = merge;
	}
	options.diagonal |= args.diagonal;
	options.merge_as_rectangle |= args.rect;
	options.compress &= !args.no_compress;

	let palette = load_palette(args.palette.as_deref())?;
	let source = PngRaster::new(palette.clone(), settings.codec.transparent_index);

	let paths = collect_pngs(&args.input)?;
	if paths.is_empty() {
		bail!("No PNG frames found in {}", args.input.display());
	}
	let frames = paths
		.iter()
		.map(|path| source.read_raster(path).with_context(|| format!("Failed to load {}", path.display())))
		.collect::<Result<Vec<_>>>()?;
	info!("loaded {} frames from {}", frames.len(), args.input.display());

	let encoder = Encoder::new(settings.codec, options);
	let encoded = match &args.seed {
		Some(seed) => {
			let seed = source.read_raster(seed)?.into_canvas();
			encoder.encode_continuation(&frames, Some(&palette), &seed, &RleCodec)?
		}
		None => encoder.encode(&frames, Some(&palette), &RleCodec)?,
	};

	let stats = encoded.stats();
	let stream_path = args.output.with_extension(siblings::STREAM_EXTENSIONS[0]);
	encoded.into_animation().save(&args.output, &stream_path, &RleCodec)?;

	println!("✓ {stats}");
	println!("  Atlas:  {}", args.output.display());
	println!("  Stream: {}", stream_path.display());
	Ok(())
}

fn run_scan(args: ScanArgs, settings: &Settings) -> Result<()> {
	if !args.root.is_dir() {
		bail!("{} is not a directory", args.root.display());
	}

	let walker = WalkDir::new(&args.root).max_depth(if args.recursive { usize::MAX } else { 1 });
	let mut atlases: Vec<PathBuf> = walker
		.into_iter()
		.filter_map(|entry| entry.ok())
		.filter(|entry| entry.file_type().is_file() && is_atlas(entry.path()))
		.map(|entry| entry.into_path())
		.collect();
	atlases.sort();

	let store = FsChainStore::new(&RleCodec, settings.codec.transparent_index);
	let resolver = ChainResolver::new(&store, settings.codec);
	let (mut standalone, mut chained, mut broken) = (0usize, 0usize, 0usize);

	for path in atlases {
		let id = AnimPath(path);
		let animation = match store.load(&id) {
			Ok(animation) => animation,
			Err(err) => {
				println!("✗ {id}: {err}");
				broken += 1;
				continue;
			}
		};
		match animation.probe(&settings.codec) {
			Ok(probe) => {
				println!("✓ {id}: self-sufficient ({} chunks in first frame)", probe.chunk_count);
				standalone += 1;
			}
			Err(ProbeFailure::NeedsContinuation) => match resolver.resolve(&id, &animation) {
				Ok(chain) if chain.is_still() => {
					println!("↪ {id}: seeded by still image");
					chained += 1;
				}
				Ok(chain) => {
					let names: Vec<String> = chain.files.iter().map(ToString::to_string).collect();
					println!("↪ {id}: continues {}", names.join(" -> "));
					chained += 1;
				}
				Err(err) => {
					println!("⚠ {id}: {err}");
					broken += 1;
				}
			},
			Err(ProbeFailure::Rejected(err)) => {
				println!("✗ {id}: {err}");
				broken += 1;
			}
		}
	}

	println!();
	println!("Self-sufficient: {standalone}, chained: {chained}, unresolved or broken: {broken}");
	Ok(())
}
