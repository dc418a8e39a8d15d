//! Beam-search decoding over a [`Seq2SeqModel`].

use crate::{Error, Result, config::GenerationConfig, model::Seq2SeqModel};
use candle_core::{D, DType, Tensor};
use std::cmp::Ordering;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Score given to beams that must not be expanded on the first step.
const INACTIVE_BEAM_SCORE: f32 = -1e9;

#[derive(Debug, Clone, PartialEq)]
pub struct BeamSearchParams {
    pub num_beams: usize,
    /// Maximum decoder length, counting the decoder start token.
    pub max_length: usize,
    pub early_stopping: bool,
    pub length_penalty: f32,
}

impl From<&GenerationConfig> for BeamSearchParams {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            num_beams: config.num_beams,
            max_length: config.max_output_tokens,
            early_stopping: config.early_stopping,
            length_penalty: config.length_penalty,
        }
    }
}

#[derive(Debug, Clone)]
struct Beam {
    tokens: Vec<u32>,
    score: f32,
}

#[derive(Debug, Clone)]
struct Hypothesis {
    tokens: Vec<u32>,
    score: f32,
}

/// Finished sequences, keeping only the best `capacity` by normalised score.
struct Hypotheses {
    capacity: usize,
    length_penalty: f32,
    early_stopping: bool,
    entries: Vec<Hypothesis>,
}

impl Hypotheses {
    fn new(params: &BeamSearchParams) -> Self {
        Self {
            capacity: params.num_beams,
            length_penalty: params.length_penalty,
            early_stopping: params.early_stopping,
            entries: Vec::with_capacity(params.num_beams + 1),
        }
    }

    /// `generated` counts tokens after the decoder start token.
    fn normalise(&self, sum_logprobs: f32, generated: usize) -> f32 {
        sum_logprobs / (generated.max(1) as f32).powf(self.length_penalty)
    }

    fn add(&mut self, tokens: Vec<u32>, sum_logprobs: f32) {
        let score = self.normalise(sum_logprobs, tokens.len() - 1);
        if self.entries.len() >= self.capacity && score <= self.worst_score() {
            return;
        }
        self.entries.push(Hypothesis { tokens, score });
        self.entries
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        self.entries.truncate(self.capacity);
    }

    fn worst_score(&self) -> f32 {
        self.entries
            .last()
            .map(|h| h.score)
            .unwrap_or(f32::NEG_INFINITY)
    }

    /// With early stopping, done as soon as enough hypotheses are finished.
    /// Otherwise done once the best live beam can no longer beat the worst
    /// finished hypothesis.
    fn is_done(&self, best_live_score: f32, generated: usize) -> bool {
        if self.entries.len() < self.capacity {
            return false;
        }
        if self.early_stopping {
            return true;
        }
        self.worst_score() >= self.normalise(best_live_score, generated)
    }

    fn best(self) -> Option<Hypothesis> {
        self.entries.into_iter().next()
    }
}

/// Generates an output sequence for a single input with beam search.
///
/// `input_ids` and `attention_mask` have shape `(1, seq_len)` and the mask is
/// a right-padded prefix of ones. Padding is dropped before encoding: with
/// relative position biases, encoding only the real tokens gives the same
/// encoder states as masking the padded positions out of self-attention and
/// cross-attention.
///
/// Returns the best sequence, starting with the decoder start token and
/// ending with end-of-sequence unless the length limit was reached.
pub fn beam_search(
    model: &mut dyn Seq2SeqModel,
    input_ids: &Tensor,
    attention_mask: &Tensor,
    params: &BeamSearchParams,
    cancel: &CancellationToken,
) -> Result<Vec<u32>> {
    if params.num_beams == 0 {
        return Err(Error::config("num_beams must be at least 1"));
    }

    let real_len = attention_mask
        .to_dtype(DType::F32)?
        .sum_all()?
        .to_scalar::<f32>()? as usize;
    if real_len == 0 {
        return Err(Error::internal("attention mask has no real tokens"));
    }
    let input_ids = input_ids.narrow(1, 0, real_len)?;

    let encoder_output = model.encode(&input_ids)?;
    let encoder_output = encoder_output.repeat((params.num_beams, 1, 1))?;

    let start = model.decoder_start_token_id();
    let eos = model.eos_token_id();
    let device = model.device().clone();

    let mut beams: Vec<Beam> = (0..params.num_beams)
        .map(|i| Beam {
            tokens: vec![start],
            score: if i == 0 { 0.0 } else { INACTIVE_BEAM_SCORE },
        })
        .collect();
    let mut hypotheses = Hypotheses::new(params);
    let mut cur_len = 1;
    let mut done = false;

    while cur_len < params.max_length {
        if cancel.is_cancelled() {
            debug!("Beam search cancelled at length {}", cur_len);
            return Err(Error::Cancelled);
        }

        let flat: Vec<u32> = beams.iter().flat_map(|b| b.tokens.iter().copied()).collect();
        let decoder_input_ids = Tensor::from_vec(flat, (beams.len(), cur_len), &device)?;
        let logits = if beams.len() == params.num_beams {
            model.decode(&decoder_input_ids, &encoder_output)?
        } else {
            model.decode(&decoder_input_ids, &encoder_output.narrow(0, 0, beams.len())?)?
        };
        let log_probs = candle_nn::ops::log_softmax(&logits.to_dtype(DType::F32)?, D::Minus1)?
            .to_vec2::<f32>()?;

        let candidates = top_candidates(&beams, &log_probs, 2 * params.num_beams);

        let mut next_beams = Vec::with_capacity(params.num_beams);
        for (rank, candidate) in candidates.into_iter().enumerate() {
            let mut tokens = beams[candidate.beam].tokens.clone();
            tokens.push(candidate.token);
            if candidate.token == eos {
                // Only candidates ranked within the beam width may finish.
                if rank < params.num_beams {
                    hypotheses.add(tokens, candidate.score);
                }
            } else {
                next_beams.push(Beam {
                    tokens,
                    score: candidate.score,
                });
                if next_beams.len() == params.num_beams {
                    break;
                }
            }
        }

        cur_len += 1;
        beams = next_beams;
        trace!(
            "Beam search step {}: {} live beams, {} finished",
            cur_len,
            beams.len(),
            hypotheses.entries.len()
        );

        let best_live = beams
            .iter()
            .map(|b| b.score)
            .fold(f32::NEG_INFINITY, f32::max);
        if beams.is_empty() || hypotheses.is_done(best_live, cur_len - 1) {
            done = true;
            break;
        }
    }

    if !done {
        debug!("Beam search reached max length {}", params.max_length);
        for beam in beams {
            hypotheses.add(beam.tokens, beam.score);
        }
    }

    hypotheses
        .best()
        .map(|h| h.tokens)
        .ok_or_else(|| Error::internal("beam search produced no sequence"))
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    beam: usize,
    token: u32,
    score: f32,
}

/// Returns the `k` best (beam, token) continuations by cumulative score.
/// Ties go to the lower beam index, then the lower token id.
fn top_candidates(beams: &[Beam], log_probs: &[Vec<f32>], k: usize) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = beams
        .iter()
        .zip(log_probs)
        .enumerate()
        .flat_map(|(beam, (b, row))| {
            row.iter().enumerate().map(move |(token, lp)| Candidate {
                beam,
                token: token as u32,
                score: b.score + lp,
            })
        })
        .collect();

    let by_rank = |a: &Candidate, b: &Candidate| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then(a.beam.cmp(&b.beam))
            .then(a.token.cmp(&b.token))
    };

    let k = k.min(candidates.len());
    if k < candidates.len() {
        candidates.select_nth_unstable_by(k, by_rank);
        candidates.truncate(k);
    }
    candidates.sort_by(by_rank);
    candidates
}
