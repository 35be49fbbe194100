//! Agglomerative hierarchical clustering over a [`DistanceMatrix`]
//!
//! Clusters are named by their representative sequence (the smallest sequence
//! index they contain). Merging `a` and `b` writes the merged distances into the
//! representative's row and column and retires the other cluster, so the
//! matrix's nearest-neighbour caches always describe the active clusters.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::distance::DistanceMatrix;
use crate::error::{MsaError, MsaResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateDistanceMethod {
    #[default]
    Average,
    Single,
    Complete,
    WeightedMafft,
}

type UpdateFn = fn(f32, f32) -> f32;

fn update_average(a: f32, b: f32) -> f32 {
    (a + b) / 2.0
}

fn update_single(a: f32, b: f32) -> f32 {
    a.min(b)
}

fn update_complete(a: f32, b: f32) -> f32 {
    a.max(b)
}

/// Mixture of single and average linkage with weight 0.1 on the average
fn update_weighted_mafft(a: f32, b: f32) -> f32 {
    0.9 * a.min(b) + 0.1 * (a + b) / 2.0
}

impl UpdateDistanceMethod {
    pub const ALL: [UpdateDistanceMethod; 4] = [
        UpdateDistanceMethod::Average,
        UpdateDistanceMethod::Single,
        UpdateDistanceMethod::Complete,
        UpdateDistanceMethod::WeightedMafft,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            UpdateDistanceMethod::Average => "average",
            UpdateDistanceMethod::Single => "single",
            UpdateDistanceMethod::Complete => "complete",
            UpdateDistanceMethod::WeightedMafft => "weighted-mafft",
        }
    }

    fn function(&self) -> UpdateFn {
        match self {
            UpdateDistanceMethod::Average => update_average,
            UpdateDistanceMethod::Single => update_single,
            UpdateDistanceMethod::Complete => update_complete,
            UpdateDistanceMethod::WeightedMafft => update_weighted_mafft,
        }
    }

    /// Distance of the merged cluster to a third cluster
    pub fn combine(&self, dist_a: f32, dist_b: f32) -> f32 {
        (self.function())(dist_a, dist_b)
    }
}

impl fmt::Display for UpdateDistanceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for UpdateDistanceMethod {
    type Err = MsaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| MsaError::InvalidConfig(format!("unknown distance update method '{s}'")))
    }
}

/// One node of the clustering output; ids are indices into `nodes`
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterNode {
    pub id: usize,
    /// Representative sequence (smallest sequence index below this node)
    pub sequence_id: usize,
    pub left: Option<usize>,
    pub right: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterEdge {
    pub parent: usize,
    pub child: usize,
    pub length: f32,
}

/// Node and edge lists of a finished clustering.
///
/// Leaves come first (`0..n`), internal nodes follow in merge order and the
/// root is last. Merge `k` creates node `n + k` and edges `2k` (left) and
/// `2k + 1` (right).
#[derive(Debug, Clone)]
pub struct HierarchicalClustering {
    pub nodes: Vec<ClusterNode>,
    pub edges: Vec<ClusterEdge>,
    pub number_of_leaves: usize,
}

impl HierarchicalClustering {
    pub fn number_of_merges(&self) -> usize {
        self.nodes.len() - self.number_of_leaves
    }
}

#[derive(Debug, Clone, Default)]
pub struct HierarchicalClusterer {
    method: UpdateDistanceMethod,
}

impl HierarchicalClusterer {
    pub fn new(method: UpdateDistanceMethod) -> Self {
        Self { method }
    }

    pub fn method(&self) -> UpdateDistanceMethod {
        self.method
    }

    /// Merge clusters until one remains, consuming the matrix's distances.
    pub fn cluster(&self, matrix: &mut dyn DistanceMatrix) -> MsaResult<HierarchicalClustering> {
        let n = matrix.dimension();
        if n == 0 {
            return Err(MsaError::EmptyInput("cannot cluster an empty distance matrix".to_string()));
        }

        let mut nodes: Vec<ClusterNode> = (0..n)
            .map(|i| ClusterNode {
                id: i,
                sequence_id: i,
                left: None,
                right: None,
            })
            .collect();
        let mut edges = Vec::with_capacity(2 * n.saturating_sub(1));
        // current tree node of each active representative
        let mut node_of: Vec<usize> = (0..n).collect();
        let update = self.method.function();
        let symmetric = matrix.is_symmetric();

        for merge in 0..n.saturating_sub(1) {
            let (col, distance) = closest_column(&*matrix)
                .ok_or_else(|| MsaError::MalformedTree("no active cluster pair left to merge".to_string()))?;
            let row = matrix.nearest_neighbors()[col];
            let (rep, dead) = if col < row { (col, row) } else { (row, col) };

            let id = n + merge;
            let (left, right) = (node_of[rep], node_of[dead]);
            nodes.push(ClusterNode {
                id,
                sequence_id: rep,
                left: Some(left),
                right: Some(right),
            });
            edges.push(ClusterEdge { parent: id, child: left, length: distance });
            edges.push(ClusterEdge { parent: id, child: right, length: distance });
            node_of[rep] = id;

            let others: Vec<usize> = (0..n)
                .filter(|&o| o != rep && o != dead && matrix.is_active(o))
                .collect();
            let view: &dyn DistanceMatrix = &*matrix;
            let merged: Vec<(f32, f32)> = others
                .par_iter()
                .map(|&o| {
                    let outgoing = update(view.value(rep, o), view.value(dead, o));
                    let incoming = if symmetric {
                        outgoing
                    } else {
                        update(view.value(o, rep), view.value(o, dead))
                    };
                    (outgoing, incoming)
                })
                .collect();

            for (&o, &(outgoing, incoming)) in others.iter().zip(&merged) {
                matrix.set(rep, o, outgoing)?;
                if !symmetric {
                    matrix.set(o, rep, incoming)?;
                }
            }
            matrix.retire(dead)?;
            log::trace!("Merged clusters {} and {} at distance {:.4} into node {}", rep, dead, distance, id);
        }

        log::debug!(
            "Clustered {} sequences with {} linkage into {} nodes",
            n,
            self.method,
            nodes.len()
        );
        Ok(HierarchicalClustering {
            nodes,
            edges,
            number_of_leaves: n,
        })
    }
}

/// Active column with the smallest cached nearest distance, ties to the smaller index
fn closest_column(matrix: &dyn DistanceMatrix) -> Option<(usize, f32)> {
    let distances = matrix.nearest_distances();
    (0..matrix.dimension())
        .into_par_iter()
        .filter(|&c| matrix.is_active(c))
        .map(|c| (c, distances[c]))
        .reduce_with(|a, b| if b.1 < a.1 || (b.1 == a.1 && b.0 < a.0) { b } else { a })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{AsymmetricDistanceMatrix, SymmetricDistanceMatrix};

    fn matrix_from(values: &[&[f32]]) -> SymmetricDistanceMatrix {
        let mut m = SymmetricDistanceMatrix::new(values.len()).unwrap();
        for (i, row) in values.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                if j > i {
                    m.set(i, j, v).unwrap();
                }
            }
        }
        m
    }

    #[test]
    fn test_update_methods() {
        assert_eq!(UpdateDistanceMethod::Average.combine(1.0, 3.0), 2.0);
        assert_eq!(UpdateDistanceMethod::Single.combine(1.0, 3.0), 1.0);
        assert_eq!(UpdateDistanceMethod::Complete.combine(1.0, 3.0), 3.0);
        assert!((UpdateDistanceMethod::WeightedMafft.combine(1.0, 3.0) - 1.1).abs() < 1e-6);
        for method in UpdateDistanceMethod::ALL {
            assert_eq!(method.to_string().parse::<UpdateDistanceMethod>().unwrap(), method);
        }
    }

    #[test]
    fn test_merge_order_and_shape() {
        let mut m = matrix_from(&[
            &[0.0, 1.0, 5.0, 6.0],
            &[1.0, 0.0, 5.5, 6.5],
            &[5.0, 5.5, 0.0, 2.0],
            &[6.0, 6.5, 2.0, 0.0],
        ]);
        let clustering = HierarchicalClusterer::new(UpdateDistanceMethod::Average).cluster(&mut m).unwrap();
        assert_eq!(clustering.nodes.len(), 7);
        assert_eq!(clustering.edges.len(), 6);
        assert_eq!(clustering.number_of_merges(), 3);

        assert_eq!(clustering.nodes[4].left, Some(0));
        assert_eq!(clustering.nodes[4].right, Some(1));
        assert_eq!(clustering.edges[0].length, 1.0);
        assert_eq!(clustering.nodes[5].left, Some(2));
        assert_eq!(clustering.nodes[5].right, Some(3));
        assert_eq!(clustering.nodes[5].sequence_id, 2);
        assert_eq!(clustering.nodes[6].left, Some(4));
        assert_eq!(clustering.nodes[6].right, Some(5));
        // average of 5.0, 6.0, 5.5, 6.5 through two merges
        assert!((clustering.edges[4].length - 5.75).abs() < 1e-6);
    }

    #[test]
    fn test_always_n_minus_one_merges() {
        for n in 1..12 {
            let mut m = SymmetricDistanceMatrix::new(n).unwrap();
            for i in 0..n {
                for j in i + 1..n {
                    m.set(i, j, ((i * 7 + j * 3) % 5) as f32 + 0.5).unwrap();
                }
            }
            for method in UpdateDistanceMethod::ALL {
                let mut copy = m.clone();
                let clustering = HierarchicalClusterer::new(method).cluster(&mut copy).unwrap();
                assert_eq!(clustering.number_of_merges(), n - 1);
                assert_eq!(clustering.nodes.len(), 2 * n - 1);
                assert_eq!(clustering.number_of_leaves, n);
            }
        }
    }

    #[test]
    fn test_asymmetric_matrix() {
        let mut m = AsymmetricDistanceMatrix::new(3).unwrap();
        for (r, c, v) in [(0, 1, 3.0), (1, 0, 3.0), (0, 2, 1.0), (2, 0, 1.5), (1, 2, 4.0), (2, 1, 4.0)] {
            m.set(r, c, v).unwrap();
        }
        let clustering = HierarchicalClusterer::default().cluster(&mut m).unwrap();
        assert_eq!(clustering.nodes[3].left, Some(0));
        assert_eq!(clustering.nodes[3].right, Some(2));
        assert_eq!(clustering.nodes.len(), 5);
    }

    #[test]
    fn test_empty_matrix_rejected() {
        let mut m = SymmetricDistanceMatrix::new(0).unwrap();
        assert!(matches!(
            HierarchicalClusterer::default().cluster(&mut m),
            Err(MsaError::EmptyInput(_))
        ));
    }
}
