use criterion::{black_box, criterion_group, criterion_main, Criterion};
use unityfs::codec::{self, CompressionType};
use unityfs::reader::{Endian, EndianReader};
use unityfs::VersionKey;

fn bench_block_decompression(c: &mut Criterion) {
    let data: Vec<u8> = (0..1024 * 1024u32).map(|i| (i % 251) as u8).collect();
    let lz4 = lz4_flex::block::compress(&data);

    c.bench_function("lz4_block_1mb", |b| {
        b.iter(|| codec::decompress(CompressionType::Lz4, black_box(&lz4), data.len()))
    });
    c.bench_function("stored_block_1mb", |b| {
        b.iter(|| codec::decompress(CompressionType::None, black_box(&data), data.len()))
    });
}

fn bench_reader(c: &mut Criterion) {
    let mut data = Vec::with_capacity(64 * 1024);
    for i in 0..4096u32 {
        data.extend_from_slice(&i.to_le_bytes());
        data.extend_from_slice(&(i as f32).to_le_bytes());
        data.extend_from_slice(&5i32.to_le_bytes());
        data.extend_from_slice(b"name\0\0\0\0");
    }

    c.bench_function("read_records_4k", |b| {
        b.iter(|| {
            let mut r = EndianReader::new(black_box(&data), Endian::Little);
            let mut sum = 0u64;
            while r.remaining() > 0 {
                sum += r.read_u32().unwrap() as u64;
                sum += r.read_f32().unwrap() as u64;
                sum += r.read_aligned_string().unwrap().len() as u64;
            }
            sum
        })
    });
}

fn bench_version_parse(c: &mut Criterion) {
    c.bench_function("version_parse", |b| b.iter(|| VersionKey::parse(black_box("2019.4.3f1"))));
}

criterion_group!(benches, bench_block_decompression, bench_reader, bench_version_parse);
criterion_main!(benches);
