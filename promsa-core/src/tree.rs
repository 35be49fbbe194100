//! Binary guide trees stored as index arenas
//!
//! Nodes and edges live in vectors owned by the [`GuideTree`]; parent and child
//! links are arena indices. The arena is kept in bottom-up order: every child
//! has a smaller index than its parent, leaves come first and the root is last.
//! Cutting a tree produces two new trees, each with its own compacted arena.

use fnv::FnvHashMap;

use crate::cluster::HierarchicalClustering;
use crate::error::{MsaError, MsaResult};

#[derive(Debug, Clone, PartialEq)]
pub struct GuideTreeNode {
    /// Numeric id; leaves `0..n`, internal nodes from `n` upwards.
    /// Tree comparison may replace it with the id of the matching node in another tree.
    pub id: usize,
    /// Representative sequence: the smallest sequence index below this node
    pub sequence_id: usize,
    pub left: Option<usize>,
    pub right: Option<usize>,
    pub parent: Option<usize>,
    pub parent_edge: Option<usize>,
    pub needs_realignment: bool,
}

impl GuideTreeNode {
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    pub fn children(&self) -> Option<(usize, usize)> {
        match (self.left, self.right) {
            (Some(l), Some(r)) => Some((l, r)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuideTreeEdge {
    pub parent: usize,
    pub child: usize,
    pub length: f32,
}

#[derive(Debug, Clone)]
pub struct GuideTree {
    nodes: Vec<GuideTreeNode>,
    edges: Vec<GuideTreeEdge>,
    number_of_leaves: usize,
    height: usize,
}

impl GuideTree {
    pub fn from_clustering(clustering: &HierarchicalClustering) -> MsaResult<Self> {
        let nodes = clustering
            .nodes
            .iter()
            .map(|n| GuideTreeNode {
                id: n.id,
                sequence_id: n.sequence_id,
                left: n.left,
                right: n.right,
                parent: None,
                parent_edge: None,
                needs_realignment: false,
            })
            .collect();
        let edges = clustering
            .edges
            .iter()
            .map(|e| GuideTreeEdge {
                parent: e.parent,
                child: e.child,
                length: e.length,
            })
            .collect();
        Self::assemble(nodes, edges)
    }

    /// Link parents, validate the arena and compute cached metrics.
    fn assemble(mut nodes: Vec<GuideTreeNode>, edges: Vec<GuideTreeEdge>) -> MsaResult<Self> {
        if nodes.is_empty() {
            return Err(MsaError::MalformedTree("tree has no nodes".to_string()));
        }
        for (index, edge) in edges.iter().enumerate() {
            if edge.child >= edge.parent || edge.parent >= nodes.len() {
                return Err(MsaError::MalformedTree(format!(
                    "edge {index} links {} to {} against bottom-up order",
                    edge.parent, edge.child
                )));
            }
            if nodes[edge.child].parent.is_some() {
                return Err(MsaError::MalformedTree(format!("node {} has two parents", edge.child)));
            }
            nodes[edge.child].parent = Some(edge.parent);
            nodes[edge.child].parent_edge = Some(index);
        }

        let mut roots = 0;
        for (index, node) in nodes.iter().enumerate() {
            if node.left.is_some() != node.right.is_some() {
                return Err(MsaError::MalformedTree(format!("node {index} has exactly one child")));
            }
            if let Some((l, r)) = node.children() {
                if nodes[l].parent != Some(index) || nodes[r].parent != Some(index) {
                    return Err(MsaError::MalformedTree(format!("children of node {index} are not linked by edges")));
                }
            }
            if node.parent.is_none() {
                roots += 1;
            }
        }
        if roots != 1 {
            return Err(MsaError::MalformedTree(format!("expected one root, found {roots}")));
        }

        let number_of_leaves = nodes.iter().filter(|n| n.is_leaf()).count();
        let mut tree = Self {
            nodes,
            edges,
            number_of_leaves,
            height: 0,
        };
        tree.height = tree.depth_below(tree.root());
        Ok(tree)
    }

    pub fn nodes(&self) -> &[GuideTreeNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> &GuideTreeNode {
        &self.nodes[index]
    }

    pub fn edges(&self) -> &[GuideTreeEdge] {
        &self.edges
    }

    pub fn root(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn number_of_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn number_of_leaves(&self) -> usize {
        self.number_of_leaves
    }

    pub fn number_of_edges(&self) -> usize {
        self.edges.len()
    }

    /// Edge count of the longest root-to-leaf path
    pub fn height(&self) -> usize {
        self.height
    }

    fn depth_below(&self, root: usize) -> usize {
        let mut depth = vec![0usize; root + 1];
        for index in self.extract_subtree_nodes(root) {
            if let Some((l, r)) = self.nodes[index].children() {
                depth[index] = 1 + depth[l].max(depth[r]);
            }
        }
        depth[root]
    }

    /// `root` and all of its descendants in bottom-up arena order
    pub fn extract_subtree_nodes(&self, root: usize) -> Vec<usize> {
        let mut members = Vec::new();
        let mut stack = vec![root];
        while let Some(index) = stack.pop() {
            members.push(index);
            if let Some((l, r)) = self.nodes[index].children() {
                stack.push(r);
                stack.push(l);
            }
        }
        members.sort_unstable();
        members
    }

    /// Sequence indices of the leaves below `node`, ascending
    pub fn leaves_under(&self, node: usize) -> Vec<usize> {
        let mut leaves: Vec<usize> = self
            .extract_subtree_nodes(node)
            .into_iter()
            .filter(|&i| self.nodes[i].is_leaf())
            .map(|i| self.nodes[i].sequence_id)
            .collect();
        leaves.sort_unstable();
        leaves
    }

    /// Leaf sequence indices below every node, indexed by arena position
    pub fn leaf_sets(&self) -> Vec<Vec<usize>> {
        let mut sets: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        for index in 0..self.nodes.len() {
            match self.nodes[index].children() {
                Some((l, r)) => {
                    let mut merged = Vec::with_capacity(sets[l].len() + sets[r].len());
                    merged.extend_from_slice(&sets[l]);
                    merged.extend_from_slice(&sets[r]);
                    merged.sort_unstable();
                    sets[index] = merged;
                }
                None => sets[index] = vec![self.nodes[index].sequence_id],
            }
        }
        sets
    }

    fn check_edge(&self, edge_index: usize) -> MsaResult<&GuideTreeEdge> {
        let edge = self.edges.get(edge_index).ok_or_else(|| MsaError::InvalidEdge {
            index: edge_index,
            reason: format!("tree has {} edges", self.edges.len()),
        })?;
        if self.nodes[edge.child].parent != Some(edge.parent) {
            return Err(MsaError::InvalidEdge {
                index: edge_index,
                reason: "edge has no attached child".to_string(),
            });
        }
        Ok(edge)
    }

    /// Cut an edge into the tree keeping the original root and the tree rooted
    /// at the edge's child.
    ///
    /// On the root side the child's parent is left with a single child; it is
    /// spliced out and its other child takes its place, with the two branch
    /// lengths added together.
    pub fn cut_edge(&self, edge_index: usize) -> MsaResult<(GuideTree, GuideTree)> {
        let child = self.check_edge(edge_index)?.child;
        let kept = self.rebuild(self.root(), Some(child))?;
        let detached = self.rebuild(child, None)?;
        Ok((kept, detached))
    }

    /// Leaf sequence indices on the root side and on the child side of an edge
    pub fn separate_leaves_by_cutting_edge(&self, edge_index: usize) -> MsaResult<(Vec<usize>, Vec<usize>)> {
        let child = self.check_edge(edge_index)?.child;
        let below = self.leaves_under(child);
        let above: Vec<usize> = self
            .leaves_under(self.root())
            .into_iter()
            .filter(|leaf| below.binary_search(leaf).is_err())
            .collect();
        Ok((above, below))
    }

    /// Follow `index` through a splice: a node with `skip` as a child is replaced
    /// by its other child. Returns the surviving node and the branch length the
    /// splice adds on top of its parent edge.
    fn resolve(&self, index: usize, skip: Option<usize>) -> (usize, f32) {
        if let (Some(skip), Some((l, r))) = (skip, self.nodes[index].children()) {
            let other = if l == skip {
                Some(r)
            } else if r == skip {
                Some(l)
            } else {
                None
            };
            if let Some(other) = other {
                let extra = self.nodes[other]
                    .parent_edge
                    .map(|e| self.edges[e].length)
                    .unwrap_or(0.0);
                let (resolved, more) = self.resolve(other, Some(skip));
                return (resolved, extra + more);
            }
        }
        (index, 0.0)
    }

    fn rebuild(&self, root: usize, skip: Option<usize>) -> MsaResult<GuideTree> {
        let (new_root, _) = self.resolve(root, skip);

        // kept original indices and their resolved children
        let mut kept: Vec<(usize, Option<[(usize, f32); 2]>)> = Vec::new();
        let mut stack = vec![new_root];
        while let Some(index) = stack.pop() {
            let children = self.nodes[index].children().map(|(l, r)| {
                let resolve_child = |c: usize| {
                    let (resolved, extra) = self.resolve(c, skip);
                    let own = self.nodes[c].parent_edge.map(|e| self.edges[e].length).unwrap_or(0.0);
                    (resolved, own + extra)
                };
                [resolve_child(l), resolve_child(r)]
            });
            if let Some([(l, _), (r, _)]) = children {
                stack.push(l);
                stack.push(r);
            }
            kept.push((index, children));
        }
        kept.sort_unstable_by_key(|&(index, _)| index);

        let remap: FnvHashMap<usize, usize> = kept
            .iter()
            .enumerate()
            .map(|(new, &(old, _))| (old, new))
            .collect();

        let mut nodes: Vec<GuideTreeNode> = Vec::with_capacity(kept.len());
        let mut edges = Vec::with_capacity(kept.len().saturating_sub(1));
        for &(old, children) in &kept {
            let source = &self.nodes[old];
            let new_index = nodes.len();
            let (left, right) = match children {
                Some([(l, l_len), (r, r_len)]) => {
                    let (l, r) = (remap[&l], remap[&r]);
                    edges.push(GuideTreeEdge { parent: new_index, child: l, length: l_len });
                    edges.push(GuideTreeEdge { parent: new_index, child: r, length: r_len });
                    (Some(l), Some(r))
                }
                None => (None, None),
            };
            let sequence_id = match (left, right) {
                (Some(l), Some(r)) => nodes[l].sequence_id.min(nodes[r].sequence_id),
                _ => source.sequence_id,
            };
            nodes.push(GuideTreeNode {
                id: source.id,
                sequence_id,
                left,
                right,
                parent: None,
                parent_edge: None,
                needs_realignment: false,
            });
        }
        Self::assemble(nodes, edges)
    }

    /// Tree-based sequence weights, indexed by sequence id and scaled to mean 1.
    ///
    /// Each edge shares its length evenly among the leaves below it; a leaf's
    /// weight is the sum of its shares along the path to the root. All weights
    /// are 1 when every branch length is zero.
    pub fn sequence_weights(&self) -> Vec<f32> {
        let size = self
            .nodes
            .iter()
            .filter(|n| n.is_leaf())
            .map(|n| n.sequence_id + 1)
            .max()
            .unwrap_or(0);
        let mut weights = vec![0.0f32; size];
        let leaf_counts: Vec<usize> = self.leaf_sets().iter().map(Vec::len).collect();

        // accumulate top-down: shares of every ancestor edge
        let mut share = vec![0.0f64; self.nodes.len()];
        for index in (0..self.nodes.len()).rev() {
            let node = &self.nodes[index];
            if let (Some(parent), Some(edge)) = (node.parent, node.parent_edge) {
                share[index] = share[parent] + self.edges[edge].length as f64 / leaf_counts[index] as f64;
            }
        }

        let total: f64 = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_leaf())
            .map(|(i, _)| share[i])
            .sum();
        for (index, node) in self.nodes.iter().enumerate().filter(|(_, n)| n.is_leaf()) {
            weights[node.sequence_id] = if total > 0.0 {
                (share[index] * self.number_of_leaves as f64 / total) as f32
            } else {
                1.0
            };
        }
        weights
    }

    /// Newick rendering with three-decimal branch lengths.
    ///
    /// Leaves are labelled with `names[sequence_id]`, or the sequence index when
    /// no name is available.
    pub fn to_newick(&self, names: &[String]) -> String {
        let mut rendered: Vec<String> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let text = match node.children() {
                Some((l, r)) => {
                    let l_len = self.nodes[l].parent_edge.map(|e| self.edges[e].length).unwrap_or(0.0);
                    let r_len = self.nodes[r].parent_edge.map(|e| self.edges[e].length).unwrap_or(0.0);
                    format!(
                        "({}:{:.3},{}:{:.3})",
                        std::mem::take(&mut rendered[l]),
                        l_len,
                        std::mem::take(&mut rendered[r]),
                        r_len
                    )
                }
                None => names
                    .get(node.sequence_id)
                    .cloned()
                    .unwrap_or_else(|| node.sequence_id.to_string()),
            };
            rendered.push(text);
        }
        let mut newick = rendered.pop().unwrap_or_default();
        newick.push(';');
        newick
    }

    pub fn clear_marks(&mut self) {
        for node in &mut self.nodes {
            node.needs_realignment = false;
        }
    }

    pub fn marked_nodes(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&i| self.nodes[i].needs_realignment)
            .collect()
    }
}

/// Mark the internal nodes of `tree_a` whose subtree differs from `tree_b`.
///
/// Internal nodes are visited bottom-up. A node is marked when either child is
/// marked or when its two children are not siblings under one parent in
/// `tree_b`. An unmarked node takes over the id of the matching node in
/// `tree_b`, so ancestors compare by `tree_b` ids. Returns the number of marked
/// nodes.
pub fn compare_trees(tree_a: &mut GuideTree, tree_b: &GuideTree) -> MsaResult<usize> {
    Ok(compare_and_locate(tree_a, tree_b)?.len_marked)
}

struct Comparison {
    len_marked: usize,
    /// Marked nodes whose children are both unmarked
    origins: Vec<usize>,
}

fn compare_and_locate(tree_a: &mut GuideTree, tree_b: &GuideTree) -> MsaResult<Comparison> {
    if tree_a.number_of_nodes() != tree_b.number_of_nodes() || tree_a.number_of_leaves() != tree_b.number_of_leaves() {
        return Err(MsaError::IncompatibleTrees(format!(
            "{} nodes / {} leaves versus {} nodes / {} leaves",
            tree_a.number_of_nodes(),
            tree_a.number_of_leaves(),
            tree_b.number_of_nodes(),
            tree_b.number_of_leaves()
        )));
    }

    let index_of: FnvHashMap<usize, usize> = tree_b
        .nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.id, index))
        .collect();

    tree_a.clear_marks();
    let mut comparison = Comparison {
        len_marked: 0,
        origins: Vec::new(),
    };
    for index in 0..tree_a.nodes.len() {
        let Some((l, r)) = tree_a.nodes[index].children() else {
            continue;
        };
        if tree_a.nodes[l].needs_realignment || tree_a.nodes[r].needs_realignment {
            tree_a.nodes[index].needs_realignment = true;
            comparison.len_marked += 1;
            continue;
        }

        let (left_id, right_id) = (tree_a.nodes[l].id, tree_a.nodes[r].id);
        let matching_parent = index_of
            .get(&left_id)
            .and_then(|&b_index| tree_b.nodes[b_index].parent)
            .filter(|&parent| match tree_b.nodes[parent].children() {
                Some((bl, br)) => {
                    let ids = (tree_b.nodes[bl].id, tree_b.nodes[br].id);
                    ids == (left_id, right_id) || ids == (right_id, left_id)
                }
                None => false,
            });

        match matching_parent {
            Some(parent) => tree_a.nodes[index].id = tree_b.nodes[parent].id,
            None => {
                tree_a.nodes[index].needs_realignment = true;
                comparison.len_marked += 1;
                comparison.origins.push(index);
            }
        }
    }
    Ok(comparison)
}

/// Smallest subtree of `tree_a` containing every structural difference to
/// `tree_b`, as an arena index of `tree_a`. `None` when the trees are identical.
///
/// Starting from the lowest common ancestor of all mismatching nodes, the
/// answer climbs until its leaf set is also a clade of `tree_b`, so both trees
/// agree everywhere outside the returned subtree.
pub fn find_smallest_tree_difference(tree_a: &GuideTree, tree_b: &GuideTree) -> MsaResult<Option<usize>> {
    let mut scratch = tree_a.clone();
    let comparison = compare_and_locate(&mut scratch, tree_b)?;
    let mut origins = comparison.origins.into_iter();
    let Some(first) = origins.next() else {
        return Ok(None);
    };

    let ancestors = |mut index: usize| {
        let mut path = vec![index];
        while let Some(parent) = tree_a.nodes[index].parent {
            path.push(parent);
            index = parent;
        }
        path
    };
    let mut common = ancestors(first);
    for origin in origins {
        let path = ancestors(origin);
        common.retain(|node| path.contains(node));
    }

    let clades: std::collections::HashSet<Vec<usize>> = tree_b.leaf_sets().into_iter().collect();
    let sets_a = tree_a.leaf_sets();
    Ok(common.into_iter().find(|&node| clades.contains(&sets_a[node])))
}
