use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use promsa_core::{
    AlignerParams, Alphabet, MsaConfig, MultipleSequenceAligner, Profile, ProfileAligner, Sequence, SimilarityMatrix,
};

/// Deterministic pseudo-random DNA with point mutations every `period` bases
fn generate_test_sequence(length: usize, seed: u64, period: usize) -> Vec<u8> {
    const BASES: &[u8] = b"ACGT";
    let mut state = 0x9e37_79b9_7f4a_7c15u64;
    let mut sequence = Vec::with_capacity(length);
    for i in 0..length {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let mut base = BASES[(state >> 62) as usize];
        if period > 0 && i % period == (seed as usize % period) {
            base = BASES[((state >> 60) as usize + 1) % 4];
        }
        sequence.push(base);
    }
    sequence
}

fn bench_profile_alignment(c: &mut Criterion) {
    let matrix = SimilarityMatrix::default_for(Alphabet::Dna);
    let a = Profile::from_sequence(&generate_test_sequence(2000, 1, 17), Alphabet::Dna, 1.0).unwrap();
    let b = Profile::from_sequence(&generate_test_sequence(1900, 2, 13), Alphabet::Dna, 1.0).unwrap();

    let mut group = c.benchmark_group("profile_alignment_2kb");
    for partitions in [1usize, 2, 4, 8] {
        let aligner = ProfileAligner::new(
            &matrix,
            AlignerParams {
                partitions,
                ..AlignerParams::default()
            },
        )
        .unwrap();
        group.bench_with_input(BenchmarkId::new("partitions", partitions), &partitions, |bench, _| {
            bench.iter(|| black_box(aligner.align_profiles(black_box(&a), black_box(&b)).unwrap()))
        });
    }
    group.finish();
}

fn bench_full_msa(c: &mut Criterion) {
    let inputs: Vec<Sequence> = (0..16u64)
        .map(|i| Sequence::new(format!("s{i}"), generate_test_sequence(300, i, 11 + i as usize)))
        .collect();

    let mut group = c.benchmark_group("msa_16x300");
    group.sample_size(10);
    for (label, faster) in [("draft", true), ("refined", false)] {
        let aligner = MultipleSequenceAligner::new(MsaConfig {
            faster,
            ..MsaConfig::default()
        })
        .unwrap();
        group.bench_function(label, |bench| bench.iter(|| black_box(aligner.align(black_box(&inputs)).unwrap())));
    }
    group.finish();
}

criterion_group!(benches, bench_profile_alignment, bench_full_msa);
criterion_main!(benches);
