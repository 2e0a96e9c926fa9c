//! Benchmark suite for animation encoding and decoding
//!
//! Run with: cargo bench --manifest-path benches/Cargo.toml

use std::hint::black_box;

use chunkanim_benches::{generate_frames, sizes};
use chunkanim_types::file::{
	Animation, ChunkCodec, CodecConfig, Encoder, EncoderOptions, RleCodec,
};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

const FRAMES: usize = 24;

fn encoded_bytes(config: CodecConfig, options: EncoderOptions) -> (Vec<u8>, Vec<u8>) {
	let frames = generate_frames(config.canvas_width, config.canvas_height, FRAMES, 4, 48, 0xC0DE);
	Encoder::new(config, options)
		.encode(&frames, None, &RleCodec)
		.and_then(|encoded| encoded.to_bytes(&RleCodec))
		.expect("synthetic frames encode")
}

/// Full render of a command stream
fn bench_decode(c: &mut Criterion) {
	let mut group = c.benchmark_group("anim_decode");

	for (name, (width, height)) in [("tiny", sizes::TINY), ("legacy", sizes::LEGACY)] {
		let config = CodecConfig::with_canvas(width, height);
		let (atlas, stream) = encoded_bytes(config, EncoderOptions::crop());
		let animation = Animation::from_bytes(&atlas, &stream, &RleCodec).expect("atlas parses");

		group.throughput(Throughput::Elements((width * height * FRAMES) as u64));
		group.bench_with_input(BenchmarkId::new("render", name), &animation, |b, animation| {
			b.iter(|| black_box(animation.render(&config, None)));
		});
		group.bench_with_input(BenchmarkId::new("parse_and_render", name), &(atlas, stream), |b, (atlas, stream)| {
			b.iter(|| {
				let animation = Animation::from_bytes(black_box(atlas), black_box(stream), &RleCodec);
				black_box(animation.and_then(|a| a.render(&config, None)))
			});
		});
	}

	group.finish();
}

/// Encoding with each decomposition strategy
fn bench_encode(c: &mut Criterion) {
	let mut group = c.benchmark_group("anim_encode");
	let config = CodecConfig::with_canvas(sizes::LEGACY.0, sizes::LEGACY.1);
	let frames = generate_frames(config.canvas_width, config.canvas_height, FRAMES, 4, 48, 0xC0DE);

	let strategies = [
		("crop", EncoderOptions::crop()),
		("blob", EncoderOptions::blob()),
		("blob_merged_8", EncoderOptions::blob_merged(8)),
	];
	group.throughput(Throughput::Elements(FRAMES as u64));
	for (name, options) in strategies {
		group.bench_with_input(BenchmarkId::new("encode", name), &frames, |b, frames| {
			b.iter(|| black_box(Encoder::new(config, options).encode(frames, None, &RleCodec)));
		});
	}

	group.finish();
}

/// Chunk payload compression
fn bench_rle(c: &mut Criterion) {
	let mut group = c.benchmark_group("anim_rle");
	let frames = generate_frames(sizes::LEGACY.0, sizes::LEGACY.1, 2, 8, 64, 3);
	let data = frames[1].pixels().to_vec();
	let packed = RleCodec.compress(&data).unwrap_or_else(|| data.clone());

	group.throughput(Throughput::Bytes(data.len() as u64));
	group.bench_function("compress", |b| b.iter(|| black_box(RleCodec.compress(black_box(&data)))));
	group.bench_function("decompress", |b| {
		b.iter(|| black_box(RleCodec.decompress(black_box(&packed), data.len())));
	});

	group.finish();
}

criterion_group!(benches, bench_decode, bench_encode, bench_rle);
criterion_main!(benches);
