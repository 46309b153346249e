use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ClassificationAssessment, OrganizationId, WorkerId};
use super::scoring::RiskTier;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

impl TierCounts {
    fn record(&mut self, tier: RiskTier) {
        match tier {
            RiskTier::Low => self.low += 1,
            RiskTier::Medium => self.medium += 1,
            RiskTier::High => self.high += 1,
            RiskTier::Critical => self.critical += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.low + self.medium + self.high + self.critical
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRankEntry {
    pub worker_id: WorkerId,
    pub overall_score: f64,
    pub overall_risk: RiskTier,
    pub assessed_at: DateTime<Utc>,
}

/// Dashboard view for one organization built from each worker's current assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub organization_id: OrganizationId,
    pub counts_by_tier: TierCounts,
    pub top_risk_workers: Vec<RiskRankEntry>,
}

impl DashboardSummary {
    pub fn empty(organization_id: OrganizationId) -> Self {
        Self {
            organization_id,
            counts_by_tier: TierCounts::default(),
            top_risk_workers: Vec::new(),
        }
    }
}

/// Reduces an organization's assessment history to per-tier counts and the `top_n`
/// highest-scoring workers. Only each worker's most recent assessment counts.
pub fn summarize<'a>(
    organization_id: OrganizationId,
    assessments: impl IntoIterator<Item = &'a ClassificationAssessment>,
    top_n: usize,
) -> DashboardSummary {
    let mut current: BTreeMap<&WorkerId, &ClassificationAssessment> = BTreeMap::new();
    for assessment in assessments {
        if assessment.organization_id != organization_id {
            continue;
        }
        current
            .entry(&assessment.worker_id)
            .and_modify(|existing| {
                if assessment.assessed_at >= existing.assessed_at {
                    *existing = assessment;
                }
            })
            .or_insert(assessment);
    }

    let mut counts_by_tier = TierCounts::default();
    let mut ranked: Vec<RiskRankEntry> = current
        .values()
        .map(|assessment| {
            counts_by_tier.record(assessment.overall_risk);
            RiskRankEntry {
                worker_id: assessment.worker_id.clone(),
                overall_score: assessment.overall_score,
                overall_risk: assessment.overall_risk,
                assessed_at: assessment.assessed_at,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.overall_score
            .total_cmp(&a.overall_score)
            .then_with(|| a.worker_id.cmp(&b.worker_id))
    });
    ranked.truncate(top_n);

    DashboardSummary {
        organization_id,
        counts_by_tier,
        top_risk_workers: ranked,
    }
}
