//! Multiple sequence alignment pipeline
//!
//! Stage A builds a draft: k-mer distances, hierarchical clustering, guide
//! tree, progressive alignment. Stage B (optional) re-estimates distances from
//! the draft with the Kimura correction, rebuilds the tree and re-aligns only
//! the subtrees that changed. Stage C cuts each guide-tree edge in turn,
//! re-aligns the two halves as profiles and keeps the result when the
//! sum-of-pairs score improves.

use rayon::prelude::*;
use serde::Serialize;

use crate::align::{EditScript, ProfileAligner};
use crate::alphabet::Alphabet;
use crate::cluster::HierarchicalClusterer;
use crate::config::MsaConfig;
use crate::distance::{KimuraDistanceMatrixGenerator, KmerDistanceMatrixGenerator};
use crate::error::{MsaError, MsaResult};
use crate::profile::SubAlignment;
use crate::progressive::ProgressiveAligner;
use crate::scoring::multiple_alignment_score;
use crate::similarity::SimilarityMatrix;
use crate::tree::{compare_trees, GuideTree};
use crate::types::Sequence;

/// Aligned rows and their sum-of-pairs score after one stage
#[derive(Debug, Clone, Serialize)]
pub struct StageResult {
    pub sequences: Vec<Sequence>,
    pub score: f32,
}

/// Output of a full run
#[derive(Debug, Clone)]
pub struct MsaAlignment {
    pub alphabet: Alphabet,
    /// Name of the similarity matrix used
    pub matrix: String,
    /// Best alignment over all stages, rows in input order
    pub sequences: Vec<Sequence>,
    pub score: f32,
    /// Guide tree of the best alignment; `None` for a single sequence
    pub guide_tree: Option<GuideTree>,
    pub draft: StageResult,
    pub distance_refined: Option<StageResult>,
    pub tree_refined: Option<StageResult>,
    /// Edge passes run by the tree refinement
    pub refinement_iterations: usize,
}

/// Result of refining an existing alignment
#[derive(Debug, Clone)]
pub struct Refinement {
    pub sequences: Vec<Sequence>,
    pub score: f32,
    pub tree: GuideTree,
    /// Edge passes run
    pub iterations: usize,
    /// The last pass found no improving edge
    pub converged: bool,
}

/// Alignment with its guide tree
struct Candidate {
    sequences: Vec<Sequence>,
    score: f32,
    tree: GuideTree,
}

/// Everything one run shares across stages
struct Context<'m> {
    config: &'m MsaConfig,
    alphabet: Alphabet,
    matrix: &'m SimilarityMatrix,
    aligner: ProfileAligner<'m>,
    gap_open: f32,
    gap_extend: f32,
}

#[derive(Debug, Clone, Default)]
pub struct MultipleSequenceAligner {
    config: MsaConfig,
}

impl MultipleSequenceAligner {
    pub fn new(config: MsaConfig) -> MsaResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MsaConfig {
        &self.config
    }

    /// Align unaligned sequences. Gaps in the input are ignored.
    pub fn align(&self, sequences: &[Sequence]) -> MsaResult<MsaAlignment> {
        if sequences.is_empty() {
            return Err(MsaError::EmptyInput("no sequences to align".to_string()));
        }
        let pool = self.thread_pool()?;
        pool.install(|| self.run(sequences))
    }

    /// Run the tree refinement alone on an existing alignment, starting from
    /// a guide tree estimated from it.
    pub fn refine(&self, aligned: &[Sequence]) -> MsaResult<Refinement> {
        if aligned.is_empty() {
            return Err(MsaError::EmptyInput("no sequences to refine".to_string()));
        }
        let pool = self.thread_pool()?;
        pool.install(|| {
            let sequences: Vec<Sequence> = aligned.iter().map(Sequence::normalized).collect();
            let alphabet = detect_alphabet(&sequences)?;
            let matrix = self.matrix_for(alphabet)?;
            let context = self.context(alphabet, &matrix)?;
            let score = multiple_alignment_score(&sequences, &matrix, context.gap_open, context.gap_extend)?;
            let tree = context.tree_from_alignment(&sequences)?;
            context.refine(Candidate { sequences, score, tree })
        })
    }

    fn thread_pool(&self) -> MsaResult<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.degree_of_parallelism)
            .build()
            .map_err(|e| MsaError::ThreadPool(e.to_string()))
    }

    fn matrix_for(&self, alphabet: Alphabet) -> MsaResult<SimilarityMatrix> {
        match &self.config.similarity_matrix {
            Some(name) => SimilarityMatrix::by_name(name, alphabet),
            None => Ok(SimilarityMatrix::default_for(alphabet)),
        }
    }

    fn context<'m>(&'m self, alphabet: Alphabet, matrix: &'m SimilarityMatrix) -> MsaResult<Context<'m>> {
        let params = self.config.aligner_params();
        let (gap_open, gap_extend) = (params.gap_open, params.gap_extend);
        Ok(Context {
            config: &self.config,
            alphabet,
            matrix,
            aligner: ProfileAligner::new(matrix, params)?,
            gap_open,
            gap_extend,
        })
    }

    fn run(&self, sequences: &[Sequence]) -> MsaResult<MsaAlignment> {
        let inputs: Vec<Sequence> = sequences.iter().map(|s| s.normalized().ungapped()).collect();
        let alphabet = detect_alphabet(&inputs)?;
        let matrix = self.matrix_for(alphabet)?;
        let context = self.context(alphabet, &matrix)?;
        log::info!(
            "Aligning {} {} sequences with {} ({} gaps, {})",
            inputs.len(),
            alphabet,
            matrix.name(),
            self.config.gap_model,
            self.config.score_function
        );

        if inputs.len() == 1 {
            let draft = StageResult {
                sequences: inputs.clone(),
                score: 0.0,
            };
            return Ok(MsaAlignment {
                alphabet,
                matrix: matrix.name().to_string(),
                sequences: inputs,
                score: 0.0,
                guide_tree: None,
                draft,
                distance_refined: None,
                tree_refined: None,
                refinement_iterations: 0,
            });
        }

        log::info!("Stage A: k-mer distances, clustering and progressive alignment");
        let mut distances = KmerDistanceMatrixGenerator::new(self.config.kmer_length, self.config.kmer_distance)?
            .generate(&inputs)?;
        let clustering = HierarchicalClusterer::new(self.config.update_method).cluster(&mut distances)?;
        let tree = GuideTree::from_clustering(&clustering)?;
        let draft = context.progressive(&tree).align(&inputs, &tree)?;
        let draft_score = context.score(&draft.sequences)?;
        log::info!("Stage A score: {:.6}", draft_score);

        let draft_result = StageResult {
            sequences: draft.sequences.clone(),
            score: draft_score,
        };
        let mut best = Candidate {
            sequences: draft.sequences,
            score: draft_score,
            tree,
        };
        let mut distance_refined = None;
        let mut tree_refined = None;
        let mut refinement_iterations = 0;

        if inputs.len() > 2 && !self.config.faster {
            if self.config.use_stage_b {
                log::info!("Stage B: Kimura distances and incremental re-alignment");
                let (candidate, marked) = context.realign_with_kimura_tree(&inputs, &best)?;
                log::info!(
                    "Stage B score: {:.6} ({} guide-tree nodes re-aligned)",
                    candidate.score,
                    marked
                );
                distance_refined = Some(StageResult {
                    sequences: candidate.sequences.clone(),
                    score: candidate.score,
                });
                if candidate.score > best.score {
                    best = candidate;
                }
            }

            log::info!("Stage C: tree-cut refinement");
            let refinement = context.refine(best)?;
            log::info!(
                "Stage C score: {:.6} after {} pass(es)",
                refinement.score,
                refinement.iterations
            );
            refinement_iterations = refinement.iterations;
            tree_refined = Some(StageResult {
                sequences: refinement.sequences.clone(),
                score: refinement.score,
            });
            best = Candidate {
                sequences: refinement.sequences,
                score: refinement.score,
                tree: refinement.tree,
            };
        }

        Ok(MsaAlignment {
            alphabet,
            matrix: matrix.name().to_string(),
            sequences: best.sequences,
            score: best.score,
            guide_tree: Some(best.tree),
            draft: draft_result,
            distance_refined,
            tree_refined,
            refinement_iterations,
        })
    }
}

fn detect_alphabet(sequences: &[Sequence]) -> MsaResult<Alphabet> {
    let alphabet = Alphabet::detect(sequences.iter().map(|s| s.data.as_slice()))?;
    for sequence in sequences {
        alphabet.validate(&sequence.data)?;
    }
    Ok(alphabet)
}

impl Context<'_> {
    fn score(&self, sequences: &[Sequence]) -> MsaResult<f32> {
        multiple_alignment_score(sequences, self.matrix, self.gap_open, self.gap_extend)
    }

    fn progressive<'p>(&'p self, tree: &GuideTree) -> ProgressiveAligner<'p> {
        let progressive = ProgressiveAligner::new(&self.aligner, self.alphabet);
        if self.config.use_weights {
            progressive.with_weights(tree.sequence_weights())
        } else {
            progressive
        }
    }

    fn weights(&self, tree: &GuideTree) -> Vec<f32> {
        if self.config.use_weights {
            tree.sequence_weights()
        } else {
            Vec::new()
        }
    }

    fn tree_from_alignment(&self, sequences: &[Sequence]) -> MsaResult<GuideTree> {
        let mut distances = KimuraDistanceMatrixGenerator::new().generate(sequences)?;
        let clustering = HierarchicalClusterer::new(self.config.update_method).cluster(&mut distances)?;
        GuideTree::from_clustering(&clustering)
    }

    /// Stage B: new tree from the current alignment, re-aligning only the
    /// nodes that differ from the current tree.
    fn realign_with_kimura_tree(&self, inputs: &[Sequence], current: &Candidate) -> MsaResult<(Candidate, usize)> {
        let mut tree = self.tree_from_alignment(&current.sequences)?;
        let marked = compare_trees(&mut tree, &current.tree)?;
        let alignment = self.progressive(&tree).realign(inputs, &tree, &current.sequences)?;
        tree.clear_marks();
        let score = self.score(&alignment.sequences)?;
        Ok((
            Candidate {
                sequences: alignment.sequences,
                score,
                tree,
            },
            marked,
        ))
    }

    /// Stage C. Each pass tries the edges in index order and commits the first
    /// strictly improving cut; the tree is then rebuilt from the new alignment
    /// and the next pass starts. A pass without improvement ends the loop.
    fn refine(&self, start: Candidate) -> MsaResult<Refinement> {
        let mut current = start;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.config.max_refinement_iterations {
            iterations += 1;
            let mut improved = false;
            let weights = self.weights(&current.tree);

            for edge in 0..current.tree.number_of_edges() {
                let (root_side, child_side) = current.tree.separate_leaves_by_cutting_edge(edge)?;
                if root_side.is_empty() || child_side.is_empty() {
                    continue;
                }
                let candidate = self.realign_partition(&current.sequences, &root_side, &child_side, &weights)?;
                let score = self.score(&candidate)?;
                if score > current.score {
                    log::debug!(
                        "Edge {} improved the score from {:.6} to {:.6}",
                        edge,
                        current.score,
                        score
                    );
                    let tree = self.tree_from_alignment(&candidate)?;
                    current = Candidate {
                        sequences: candidate,
                        score,
                        tree,
                    };
                    improved = true;
                    break;
                }
                log::trace!("Edge {} kept score {:.6} (candidate {:.6})", edge, current.score, score);
            }

            if !improved {
                converged = true;
                break;
            }
        }

        Ok(Refinement {
            sequences: current.sequences,
            score: current.score,
            tree: current.tree,
            iterations,
            converged,
        })
    }

    /// Re-align the two halves of a cut as profiles; the smaller half is profile A.
    fn realign_partition(
        &self,
        aligned: &[Sequence],
        side_a: &[usize],
        side_b: &[usize],
        weights: &[f32],
    ) -> MsaResult<Vec<Sequence>> {
        let (small, large) = if side_a.len() <= side_b.len() {
            (side_a, side_b)
        } else {
            (side_b, side_a)
        };
        let a = SubAlignment::extract(aligned, small, weights, self.alphabet)?;
        let b = SubAlignment::extract(aligned, large, weights, self.alphabet)?;
        let result = self.aligner.align_profiles(&a.profile, &b.profile)?;

        let jobs: Vec<(usize, &[u8], &EditScript)> = a
            .members
            .iter()
            .zip(&a.rows)
            .map(|(&m, row)| (m, row.as_slice(), &result.edit_a))
            .chain(
                b.members
                    .iter()
                    .zip(&b.rows)
                    .map(|(&m, row)| (m, row.as_slice(), &result.edit_b)),
            )
            .collect();
        let rows: Vec<(usize, Vec<u8>)> = jobs
            .par_iter()
            .map(|&(member, row, edit)| -> MsaResult<(usize, Vec<u8>)> { Ok((member, edit.apply(row)?)) })
            .collect::<MsaResult<_>>()?;

        let mut sequences = aligned.to_vec();
        for (member, row) in rows {
            sequences[member] = aligned[member].with_data(row);
        }
        Ok(sequences)
    }
}
