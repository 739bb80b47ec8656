// SPDX-FileCopyrightText: Copyright © 2025 spc-tag developers
//
// SPDX-License-Identifier: MPL-2.0

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use id666::{encode, Metadata, BODY_SIZE, SPC_MAGIC};

fn tagged_image() -> Vec<u8> {
    let mut image = vec![0u8; BODY_SIZE];
    image[..SPC_MAGIC.len()].copy_from_slice(SPC_MAGIC);

    let mut updates = Metadata::new();
    for (key, value) in [
        ("songTitle", "Dummy Song"),
        ("gameTitle", "Dummy Game"),
        ("artist", "Composer"),
        ("ost", "Dummy Soundtrack"),
        ("ostTrack", "11C"),
        ("publisherName", "Nintendo"),
        ("introLength", "128000"),
        ("fadeLength", "32000"),
        ("amplification", "65536"),
    ] {
        updates.parse_entry(key, value).unwrap();
    }

    encode(&image, &updates).unwrap()
}

fn criterion_benchmark(c: &mut Criterion) {
    let image = tagged_image();

    c.bench_function("decode", |b| b.iter(|| id666::decode(black_box(&image)).unwrap()));
    c.bench_function("encode merge", |b| {
        b.iter(|| {
            let mut updates = Metadata::new();
            updates.parse_entry("loopCount", "2").unwrap();
            id666::encode(black_box(&image), &updates).unwrap()
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
