use serde::{Deserialize, Serialize};

use super::config::{AggregationWeights, RiskThresholds};

/// Overall misclassification risk band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskTier {
    pub const ALL: [RiskTier; 4] = [
        RiskTier::Low,
        RiskTier::Medium,
        RiskTier::High,
        RiskTier::Critical,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
            RiskTier::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateScore {
    pub overall_score: f64,
    pub overall_risk: RiskTier,
}

/// Weighted blend of the three test scores, rounded to two decimals and clamped to 0..=100.
pub fn aggregate(
    irs: f64,
    dol: f64,
    abc: f64,
    weights: &AggregationWeights,
    thresholds: &RiskThresholds,
) -> AggregateScore {
    let blended = irs * weights.irs + dol * weights.dol + abc * weights.abc;
    let overall_score = clamp_score(round2(blended));

    AggregateScore {
        overall_score,
        overall_risk: tier_for(overall_score, thresholds),
    }
}

/// Maps a score onto its tier. Out-of-range scores land in the nearest boundary tier.
pub fn tier_for(score: f64, thresholds: &RiskThresholds) -> RiskTier {
    let score = clamp_score(score);
    if score < thresholds.medium {
        RiskTier::Low
    } else if score < thresholds.high {
        RiskTier::Medium
    } else if score < thresholds.critical {
        RiskTier::High
    } else {
        RiskTier::Critical
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
