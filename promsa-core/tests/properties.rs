use proptest::prelude::*;

use promsa_core::{
    AlignerParams, Alphabet, EditScript, GapModel, MsaConfig, MultipleSequenceAligner, Profile, ProfileAligner,
    Sequence, SimilarityMatrix,
};

const MATCH: f32 = 2.0;
const MISMATCH: f32 = -1.0;

fn dna_strategy(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(b"ACGT".to_vec()), 0..max_len)
}

fn gapped_row_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(b"ACGT-".to_vec()), 0..40)
}

/// Plain Needleman-Wunsch with a linear gap penalty, half price for gaps
/// before the first or after the last residue of the other sequence.
fn reference_score(a: &[u8], b: &[u8], gap: f32) -> f32 {
    let (n, m) = (a.len(), b.len());
    let score = |x: u8, y: u8| if x == y { MATCH } else { MISMATCH };
    // gap in B while at row j of B
    let gap_in_b = |j: usize| if j == 0 || j == m { gap / 2.0 } else { gap };
    // gap in A while at column i of A
    let gap_in_a = |i: usize| if i == 0 || i == n { gap / 2.0 } else { gap };

    let mut table = vec![vec![0.0f32; m + 1]; n + 1];
    for i in 1..=n {
        table[i][0] = table[i - 1][0] + gap_in_b(0);
    }
    for j in 1..=m {
        table[0][j] = table[0][j - 1] + gap_in_a(0);
    }
    for i in 1..=n {
        for j in 1..=m {
            let diagonal = table[i - 1][j - 1] + score(a[i - 1], b[j - 1]);
            let up = table[i][j - 1] + gap_in_a(i);
            let left = table[i - 1][j] + gap_in_b(j);
            table[i][j] = diagonal.max(up).max(left);
        }
    }
    table[n][m]
}

fn profile(data: &[u8]) -> Profile {
    Profile::from_sequence(data, Alphabet::Dna, 1.0).unwrap()
}

proptest! {
    #[test]
    fn edit_script_reproduces_gapped_row(row in gapped_row_strategy()) {
        let script = EditScript::from_gapped_row(&row);
        let source: Vec<u8> = row.iter().copied().filter(|&s| s != b'-').collect();
        prop_assert_eq!(script.source_len(), source.len());
        prop_assert_eq!(script.apply(&source).unwrap(), row);
    }

    #[test]
    fn simple_model_matches_reference(a in dna_strategy(14), b in dna_strategy(14), gap in 1u8..6) {
        let gap = -(gap as f32);
        let matrix = SimilarityMatrix::diagonal(Alphabet::Dna, MATCH, MISMATCH);
        let params = AlignerParams { gap_model: GapModel::Simple, gap_open: gap, gap_extend: gap, ..AlignerParams::default() };
        let aligner = ProfileAligner::new(&matrix, params).unwrap();
        let result = aligner.align_profiles(&profile(&a), &profile(&b)).unwrap();
        prop_assert!((result.score - reference_score(&a, &b, gap)).abs() < 1e-3);
    }

    #[test]
    fn affine_with_equal_penalties_matches_simple(a in dna_strategy(14), b in dna_strategy(14), gap in 1u8..6) {
        let gap = -(gap as f32);
        let matrix = SimilarityMatrix::diagonal(Alphabet::Dna, MATCH, MISMATCH);
        let simple = ProfileAligner::new(&matrix, AlignerParams {
            gap_model: GapModel::Simple, gap_open: gap, gap_extend: gap, ..AlignerParams::default()
        }).unwrap();
        let affine = ProfileAligner::new(&matrix, AlignerParams {
            gap_model: GapModel::Affine, gap_open: gap, gap_extend: gap, ..AlignerParams::default()
        }).unwrap();
        let (pa, pb) = (profile(&a), profile(&b));
        let s = simple.align_profiles(&pa, &pb).unwrap();
        let f = affine.align_profiles(&pa, &pb).unwrap();
        prop_assert!((s.score - f.score).abs() < 1e-3);
    }

    #[test]
    fn aligned_rows_keep_their_residues(a in dna_strategy(20), b in dna_strategy(20)) {
        let matrix = SimilarityMatrix::diagonal(Alphabet::Dna, MATCH, MISMATCH);
        let aligner = ProfileAligner::new(&matrix, AlignerParams::default()).unwrap();
        let result = aligner.align_profiles(&profile(&a), &profile(&b)).unwrap();
        let row_a = result.edit_a.apply(&a).unwrap();
        let row_b = result.edit_b.apply(&b).unwrap();
        prop_assert_eq!(row_a.len(), row_b.len());
        prop_assert_eq!(row_a.len(), result.profile.len());
        // no column is a gap in both rows
        prop_assert!(row_a.iter().zip(&row_b).all(|(&x, &y)| x != b'-' || y != b'-'));
    }
}

#[test]
fn textbook_affine_alignment() {
    let matrix = SimilarityMatrix::nucleotide(Alphabet::Dna).unwrap();
    let aligner = ProfileAligner::new(&matrix, AlignerParams::default()).unwrap();
    let result = aligner.align_profiles(&profile(b"ACGT"), &profile(b"AGT")).unwrap();
    assert_eq!(result.edit_a.apply(b"ACGT").unwrap(), b"ACGT".to_vec());
    assert_eq!(result.edit_b.apply(b"AGT").unwrap(), b"A-GT".to_vec());
    // three matches at +5, one internal gap opened at -4
    assert_eq!(result.score, 11.0);
}

#[test]
fn two_identical_residues() {
    let aligner = MultipleSequenceAligner::new(MsaConfig {
        similarity_matrix: Some("diagonal:2:-1".to_string()),
        gap_open: -2.0,
        gap_extend: -2.0,
        ..MsaConfig::deterministic()
    })
    .unwrap();
    let inputs = vec![
        Sequence::new("a".to_string(), b"A".to_vec()),
        Sequence::new("b".to_string(), b"A".to_vec()),
    ];
    let alignment = aligner.align(&inputs).unwrap();
    assert_eq!(alignment.sequences[0].data, b"A".to_vec());
    assert_eq!(alignment.sequences[1].data, b"A".to_vec());
    assert_eq!(alignment.score, 2.0);
}
