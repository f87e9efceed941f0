//! JSON serialization of round reports.

use serde::{Deserialize, Serialize};

use crate::adaptive::{RoundPhase, RoundReport};
use crate::analysis::PosteriorSummary;
use crate::types::{Condition, TrialSequence};

/// Serializable form of a [`RoundReport`], without the raw posterior draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Zero-based round index.
    pub round: usize,
    /// Phase the round ran.
    pub phase: RoundPhase,
    /// Position of the administered sequence in its pool.
    pub pool_index: usize,
    /// Explore target, absent outside explore rounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetRecord>,
    /// Administered sequence with outcomes.
    pub sequence: TrialSequence,
    /// Per-coefficient posterior summary.
    pub posterior: PosteriorSummary,
    /// KL divergence from the previous posterior.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kl_divergence: Option<f64>,
    /// Sampler seed.
    pub seed: u64,
}

/// Explore target with its credible band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    /// Most uncertain condition.
    pub condition: Condition,
    /// Its position among the scored candidates.
    pub candidate_index: usize,
    /// 2.5th percentile of the squashed prediction.
    pub lower: f64,
    /// 97.5th percentile of the squashed prediction.
    pub upper: f64,
    /// `upper - lower`.
    pub width: f64,
}

impl From<&RoundReport> for RoundRecord {
    fn from(report: &RoundReport) -> Self {
        Self {
            round: report.round,
            phase: report.phase,
            pool_index: report.pool_index,
            target: report.target.as_ref().map(|t| TargetRecord {
                condition: t.condition.clone(),
                candidate_index: t.candidate_index,
                lower: t.score.lower,
                upper: t.score.upper,
                width: t.score.width(),
            }),
            sequence: report.sequence.clone(),
            posterior: report.posterior.summary(),
            kl_divergence: report.kl_divergence,
            seed: report.seed,
        }
    }
}

/// Serialize reports to compact JSON.
pub fn to_json(reports: &[RoundReport]) -> Result<String, serde_json::Error> {
    let records: Vec<RoundRecord> = reports.iter().map(RoundRecord::from).collect();
    serde_json::to_string(&records)
}

/// Serialize reports to pretty-printed JSON.
pub fn to_json_pretty(reports: &[RoundReport]) -> Result<String, serde_json::Error> {
    let records: Vec<RoundRecord> = reports.iter().map(RoundRecord::from).collect();
    serde_json::to_string_pretty(&records)
}
