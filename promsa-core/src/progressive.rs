//! Progressive alignment along a guide tree
//!
//! Nodes are visited in the tree's bottom-up arena order. Every cluster keeps
//! one [`EditScript`] per member that maps the member's unaligned residues onto
//! the cluster's columns; merging two clusters composes each member script
//! with the side's script from the profile alignment. Rows are materialised
//! once, at the root.

use rayon::prelude::*;

use crate::align::{EditScript, ProfileAligner};
use crate::alphabet::Alphabet;
use crate::error::{MsaError, MsaResult};
use crate::profile::{Profile, SubAlignment};
use crate::tree::GuideTree;
use crate::types::Sequence;

/// Members of a subtree aligned against each other
struct Cluster {
    members: Vec<usize>,
    scripts: Vec<EditScript>,
    profile: Profile,
}

#[derive(Debug, Clone)]
pub struct ProgressiveAlignment {
    /// Aligned rows in input order
    pub sequences: Vec<Sequence>,
    /// DP score of the root merge (0 for a single sequence)
    pub score: f32,
    /// Profile alignments computed
    pub merges: usize,
    /// Subtrees taken over from a previous alignment
    pub reused: usize,
}

pub struct ProgressiveAligner<'a> {
    aligner: &'a ProfileAligner<'a>,
    alphabet: Alphabet,
    weights: Vec<f32>,
}

impl<'a> ProgressiveAligner<'a> {
    pub fn new(aligner: &'a ProfileAligner<'a>, alphabet: Alphabet) -> Self {
        Self {
            aligner,
            alphabet,
            weights: Vec::new(),
        }
    }

    /// Per-sequence profile weights; sequences without an entry weigh 1.
    pub fn with_weights(mut self, weights: Vec<f32>) -> Self {
        self.weights = weights;
        self
    }

    fn weight(&self, sequence: usize) -> f32 {
        self.weights.get(sequence).copied().unwrap_or(1.0)
    }

    /// Align `sequences` from scratch along `tree`.
    pub fn align(&self, sequences: &[Sequence], tree: &GuideTree) -> MsaResult<ProgressiveAlignment> {
        self.run(sequences, tree, None)
    }

    /// Align along a tree marked by [`crate::tree::compare_trees`], taking
    /// every unmarked subtree from `previous` instead of aligning it again.
    pub fn realign(
        &self,
        sequences: &[Sequence],
        tree: &GuideTree,
        previous: &[Sequence],
    ) -> MsaResult<ProgressiveAlignment> {
        if previous.len() != sequences.len() {
            return Err(MsaError::DimensionMismatch {
                expected: sequences.len(),
                found: previous.len(),
            });
        }
        self.run(sequences, tree, Some(previous))
    }

    fn run(&self, sequences: &[Sequence], tree: &GuideTree, previous: Option<&[Sequence]>) -> MsaResult<ProgressiveAlignment> {
        if sequences.is_empty() {
            return Err(MsaError::EmptyInput("no sequences to align".to_string()));
        }
        if tree.number_of_leaves() != sequences.len() {
            return Err(MsaError::DimensionMismatch {
                expected: sequences.len(),
                found: tree.number_of_leaves(),
            });
        }

        let sources: Vec<Vec<u8>> = sequences.iter().map(|s| s.ungapped().data).collect();
        let mut clusters: Vec<Option<Cluster>> = (0..tree.number_of_nodes()).map(|_| None).collect();
        let mut score = 0.0f32;
        let (mut merges, mut reused) = (0usize, 0usize);

        for index in 0..tree.number_of_nodes() {
            let node = tree.node(index);
            let cluster = match (previous, node.children()) {
                (_, None) => self.leaf(node.sequence_id, &sources)?,
                (Some(previous), Some(_)) if !node.needs_realignment => {
                    let parent_marked = node.parent.map_or(true, |p| tree.node(p).needs_realignment);
                    if !parent_marked {
                        // covered by an unmarked ancestor
                        continue;
                    }
                    reused += 1;
                    self.reuse(previous, &tree.leaves_under(index))?
                }
                (_, Some((left, right))) => {
                    let (left, right) = (take(&mut clusters, left)?, take(&mut clusters, right)?);
                    let (cluster, merge_score) = self.merge(left, right)?;
                    log::debug!(
                        "Merged node {} ({} sequences, {} columns, score {:.3})",
                        index,
                        cluster.members.len(),
                        cluster.profile.len(),
                        merge_score
                    );
                    score = merge_score;
                    merges += 1;
                    cluster
                }
            };
            clusters[index] = Some(cluster);
        }

        let root = take(&mut clusters, tree.root())?;
        let rows: Vec<(usize, Vec<u8>)> = root
            .members
            .par_iter()
            .zip(root.scripts.par_iter())
            .map(|(&member, script)| Ok((member, script.apply(&sources[member])?)))
            .collect::<MsaResult<_>>()?;

        let mut aligned: Vec<Option<Sequence>> = vec![None; sequences.len()];
        for (member, row) in rows {
            aligned[member] = Some(sequences[member].with_data(row));
        }
        let sequences = aligned
            .into_iter()
            .enumerate()
            .map(|(i, s)| s.ok_or_else(|| MsaError::MalformedTree(format!("sequence {i} is not a leaf of the tree"))))
            .collect::<MsaResult<Vec<_>>>()?;

        Ok(ProgressiveAlignment {
            sequences,
            score,
            merges,
            reused,
        })
    }

    fn leaf(&self, sequence: usize, sources: &[Vec<u8>]) -> MsaResult<Cluster> {
        let data = sources.get(sequence).ok_or_else(|| MsaError::IndexOutOfRange {
            row: sequence,
            col: 0,
            dimension: sources.len(),
        })?;
        Ok(Cluster {
            members: vec![sequence],
            scripts: vec![EditScript::identity(data.len())],
            profile: Profile::from_sequence(data, self.alphabet, self.weight(sequence))?,
        })
    }

    fn reuse(&self, previous: &[Sequence], members: &[usize]) -> MsaResult<Cluster> {
        let sub = SubAlignment::extract(previous, members, &self.weights, self.alphabet)?;
        Ok(Cluster {
            scripts: sub.rows.iter().map(|row| EditScript::from_gapped_row(row)).collect(),
            members: sub.members,
            profile: sub.profile,
        })
    }

    fn merge(&self, left: Cluster, right: Cluster) -> MsaResult<(Cluster, f32)> {
        let result = self.aligner.align_profiles(&left.profile, &right.profile)?;
        let mut members = left.members;
        members.extend(right.members);
        let mut scripts = Vec::with_capacity(members.len());
        for script in &left.scripts {
            scripts.push(script.then(&result.edit_a)?);
        }
        for script in &right.scripts {
            scripts.push(script.then(&result.edit_b)?);
        }
        Ok((
            Cluster {
                members,
                scripts,
                profile: result.profile,
            },
            result.score,
        ))
    }
}

fn take(clusters: &mut [Option<Cluster>], index: usize) -> MsaResult<Cluster> {
    clusters
        .get_mut(index)
        .and_then(Option::take)
        .ok_or_else(|| MsaError::MalformedTree(format!("node {index} has no alignment to merge")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::AlignerParams;
    use crate::cluster::{ClusterEdge, ClusterNode, HierarchicalClustering};
    use crate::similarity::SimilarityMatrix;
    use crate::tree::compare_trees;

    fn seq(id: &str, data: &[u8]) -> Sequence {
        Sequence::new(id.to_string(), data.to_vec())
    }

    /// ((0,1),(2,3)) or ((0,2),(1,3))
    fn four_leaf_tree(pairs: [(usize, usize); 2]) -> GuideTree {
        let mut nodes: Vec<ClusterNode> = (0..4)
            .map(|i| ClusterNode {
                id: i,
                sequence_id: i,
                left: None,
                right: None,
            })
            .collect();
        let mut edges = Vec::new();
        for (k, (l, r)) in pairs.iter().enumerate() {
            nodes.push(ClusterNode {
                id: 4 + k,
                sequence_id: *l,
                left: Some(*l),
                right: Some(*r),
            });
            edges.push(ClusterEdge { parent: 4 + k, child: *l, length: 1.0 });
            edges.push(ClusterEdge { parent: 4 + k, child: *r, length: 1.0 });
        }
        nodes.push(ClusterNode {
            id: 6,
            sequence_id: 0,
            left: Some(4),
            right: Some(5),
        });
        edges.push(ClusterEdge { parent: 6, child: 4, length: 2.0 });
        edges.push(ClusterEdge { parent: 6, child: 5, length: 2.0 });
        GuideTree::from_clustering(&HierarchicalClustering {
            nodes,
            edges,
            number_of_leaves: 4,
        })
        .unwrap()
    }

    fn inputs() -> Vec<Sequence> {
        vec![
            seq("a", b"ACGTACGT"),
            seq("b", b"ACGACGT"),
            seq("c", b"TTACGTACGT"),
            seq("d", b"TACGTAGT"),
        ]
    }

    #[test]
    fn test_alignment_preserves_residues() {
        let matrix = SimilarityMatrix::diagonal(Alphabet::Dna, 2.0, -1.0);
        let aligner = ProfileAligner::new(&matrix, AlignerParams::default()).unwrap();
        let progressive = ProgressiveAligner::new(&aligner, Alphabet::Dna);
        let sequences = inputs();
        let result = progressive.align(&sequences, &four_leaf_tree([(0, 1), (2, 3)])).unwrap();

        assert_eq!(result.merges, 3);
        let width = result.sequences[0].len();
        for (aligned, original) in result.sequences.iter().zip(&sequences) {
            assert_eq!(aligned.id, original.id);
            assert_eq!(aligned.len(), width);
            assert_eq!(aligned.ungapped().data, original.data);
        }
        // no column is all gaps
        for column in 0..width {
            assert!(result.sequences.iter().any(|s| !s.is_gap(column)));
        }
    }

    #[test]
    fn test_realign_identical_tree_reuses_everything() {
        let matrix = SimilarityMatrix::diagonal(Alphabet::Dna, 2.0, -1.0);
        let aligner = ProfileAligner::new(&matrix, AlignerParams::default()).unwrap();
        let progressive = ProgressiveAligner::new(&aligner, Alphabet::Dna);
        let sequences = inputs();
        let tree = four_leaf_tree([(0, 1), (2, 3)]);
        let first = progressive.align(&sequences, &tree).unwrap();

        let mut same = tree.clone();
        assert_eq!(compare_trees(&mut same, &tree).unwrap(), 0);
        let again = progressive.realign(&sequences, &same, &first.sequences).unwrap();
        assert_eq!(again.merges, 0);
        assert_eq!(again.reused, 1);
        assert_eq!(again.sequences, first.sequences);
    }

    #[test]
    fn test_realign_only_changed_nodes() {
        let matrix = SimilarityMatrix::diagonal(Alphabet::Dna, 2.0, -1.0);
        let aligner = ProfileAligner::new(&matrix, AlignerParams::default()).unwrap();
        let progressive = ProgressiveAligner::new(&aligner, Alphabet::Dna);
        let sequences = inputs();
        let old = four_leaf_tree([(0, 1), (2, 3)]);
        let first = progressive.align(&sequences, &old).unwrap();

        let mut new = four_leaf_tree([(0, 2), (1, 3)]);
        assert_eq!(compare_trees(&mut new, &old).unwrap(), 3);
        let again = progressive.realign(&sequences, &new, &first.sequences).unwrap();
        assert_eq!(again.merges, 3);
        for (aligned, original) in again.sequences.iter().zip(&sequences) {
            assert_eq!(aligned.ungapped().data, original.data);
        }
    }

    #[test]
    fn test_single_sequence() {
        let matrix = SimilarityMatrix::diagonal(Alphabet::Dna, 2.0, -1.0);
        let aligner = ProfileAligner::new(&matrix, AlignerParams::default()).unwrap();
        let progressive = ProgressiveAligner::new(&aligner, Alphabet::Dna);
        let tree = GuideTree::from_clustering(&HierarchicalClustering {
            nodes: vec![ClusterNode {
                id: 0,
                sequence_id: 0,
                left: None,
                right: None,
            }],
            edges: Vec::new(),
            number_of_leaves: 1,
        })
        .unwrap();
        let result = progressive.align(&[seq("x", b"AC-GT")], &tree).unwrap();
        assert_eq!(result.sequences[0].data, b"ACGT".to_vec());
        assert_eq!(result.merges, 0);
    }

    #[test]
    fn test_leaf_count_mismatch() {
        let matrix = SimilarityMatrix::diagonal(Alphabet::Dna, 2.0, -1.0);
        let aligner = ProfileAligner::new(&matrix, AlignerParams::default()).unwrap();
        let progressive = ProgressiveAligner::new(&aligner, Alphabet::Dna);
        let tree = four_leaf_tree([(0, 1), (2, 3)]);
        assert!(matches!(
            progressive.align(&inputs()[..3], &tree),
            Err(MsaError::DimensionMismatch { .. })
        ));
    }
}
