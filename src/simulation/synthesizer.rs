//! Seeded generator of counterbalanced Stroop sequences.
//!
//! Every sequence crosses color × word × response transition once. The first
//! trial has no transition, so a sequence has nine trials. The correct
//! response is `f` for red ink and `j` for green ink; a transition is a
//! `repeat` when the correct response matches the previous trial's.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::collaborators::DesignSynthesizer;
use crate::error::{LoopError, Result};
use crate::types::{CandidatePool, Condition, SynthesisMode, Trial, TrialSequence};

const COLORS: [&str; 2] = ["red", "green"];
const WORDS: [&str; 2] = ["red", "green"];

/// Correct key for an ink color.
pub fn correct_response(color: &str) -> &'static str {
    if color == "red" {
        "f"
    } else {
        "j"
    }
}

/// Trial with its derived factors (`congruency`, `correct_response`) attached.
pub fn stroop_trial(word: &str, color: &str, transition: Option<&str>) -> Trial {
    let congruency = if word == color { "con" } else { "inc" };
    Trial::new(Condition::new(word, color, transition))
        .with_extra("congruency", congruency)
        .with_extra("correct_response", correct_response(color))
}

/// [`DesignSynthesizer`] producing counterbalanced sequences.
///
/// `Initial` pools are regenerated from the same seed on every call and are
/// therefore identical. `Update` pools draw from a generator that advances
/// across calls.
#[derive(Debug, Clone)]
pub struct CounterbalancedSynthesizer {
    initial_seed: u64,
    update_rng: Xoshiro256PlusPlus,
    pool_size: usize,
    max_run: usize,
    max_attempts: usize,
}

impl CounterbalancedSynthesizer {
    /// Five sequences per pool, at most seven equal transitions in a row.
    pub fn new(seed: u64) -> Self {
        Self {
            initial_seed: seed,
            update_rng: Xoshiro256PlusPlus::seed_from_u64(seed.wrapping_add(1)),
            pool_size: 5,
            max_run: 7,
            max_attempts: 10_000,
        }
    }

    /// Set the number of sequences per pool.
    pub fn pool_size(mut self, n: usize) -> Self {
        self.pool_size = n;
        self
    }

    /// Set the longest allowed run of identical transitions.
    pub fn max_run(mut self, k: usize) -> Self {
        assert!(k > 0, "max_run must be positive");
        self.max_run = k;
        self
    }

    fn pool(rng: &mut Xoshiro256PlusPlus, n: usize, max_run: usize, max_attempts: usize) -> Result<Vec<TrialSequence>> {
        (0..n)
            .map(|_| Self::sequence(rng, max_run, max_attempts))
            .collect()
    }

    /// Draw ink colors until the transitions split evenly per color, then
    /// deal the words within each (color, transition) cell.
    fn sequence(rng: &mut Xoshiro256PlusPlus, max_run: usize, max_attempts: usize) -> Result<TrialSequence> {
        for _ in 0..max_attempts {
            let mut colors = vec!["red"; 4];
            colors.extend(["green"; 4]);
            colors.shuffle(rng);
            colors.insert(0, COLORS[rng.random_range(0..2)]);

            let transitions: Vec<&str> = colors
                .windows(2)
                .map(|w| if w[0] == w[1] { "repeat" } else { "switch" })
                .collect();

            let balanced = COLORS.iter().all(|&c| {
                ["repeat", "switch"].iter().all(|&t| {
                    colors[1..]
                        .iter()
                        .zip(&transitions)
                        .filter(|(col, tr)| **col == c && **tr == t)
                        .count()
                        == WORDS.len()
                })
            });
            if !balanced || longest_run(&transitions) > max_run {
                continue;
            }

            let mut trials = Vec::with_capacity(colors.len());
            trials.push(stroop_trial(WORDS[rng.random_range(0..2)], colors[0], None));

            // Two slots per (color, transition) cell, one per word
            let mut words: Vec<(&str, &str, Vec<&str>)> = Vec::new();
            for &c in &COLORS {
                for t in ["repeat", "switch"] {
                    let mut w = WORDS.to_vec();
                    w.shuffle(rng);
                    words.push((c, t, w));
                }
            }
            for (i, &color) in colors[1..].iter().enumerate() {
                let transition = transitions[i];
                let word = words
                    .iter_mut()
                    .find(|(c, t, _)| *c == color && *t == transition)
                    .and_then(|(_, _, w)| w.pop())
                    .ok_or_else(|| LoopError::Collaborator("word slots exhausted".into()))?;
                trials.push(stroop_trial(word, color, Some(transition)));
            }
            return Ok(TrialSequence::new(trials));
        }

        Err(LoopError::Collaborator(format!(
            "no counterbalanced sequence found in {} attempts",
            max_attempts
        )))
    }
}

impl DesignSynthesizer for CounterbalancedSynthesizer {
    fn synthesize(&mut self, mode: SynthesisMode) -> Result<CandidatePool> {
        let sequences = match mode {
            SynthesisMode::Initial => {
                let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.initial_seed);
                Self::pool(&mut rng, self.pool_size, self.max_run, self.max_attempts)?
            }
            SynthesisMode::Update => {
                Self::pool(&mut self.update_rng, self.pool_size, self.max_run, self.max_attempts)?
            }
        };
        Ok(CandidatePool::new(mode, sequences))
    }
}

fn longest_run(values: &[&str]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for (i, v) in values.iter().enumerate() {
        current = if i > 0 && values[i - 1] == *v { current + 1 } else { 1 };
        longest = longest.max(current);
    }
    longest
}
