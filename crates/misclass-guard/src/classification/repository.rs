use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{
    ClassificationAssessment, ClassificationFactor, ComputedFactors, OrganizationId, WorkerId,
};
use super::summary::DashboardSummary;

/// Read access to the time-entry, engagement, and roster modules.
pub trait WorkforceDirectory: Send + Sync {
    /// Trailing 90-day hours aggregate plus the number of currently active engagements.
    fn computed_factors(&self, worker_id: &WorkerId) -> Result<ComputedFactors, RepositoryError>;
    fn active_worker_ids(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<WorkerId>, RepositoryError>;
    fn all_organization_ids(&self) -> Result<Vec<OrganizationId>, RepositoryError>;
}

/// Storage abstraction for factors, assessments, and the derived dashboard view.
pub trait ClassificationStore: Send + Sync {
    fn factors_for_worker(
        &self,
        worker_id: &WorkerId,
    ) -> Result<Vec<ClassificationFactor>, RepositoryError>;
    fn insert_factor(
        &self,
        factor: ClassificationFactor,
    ) -> Result<ClassificationFactor, RepositoryError>;
    fn latest_assessment(
        &self,
        worker_id: &WorkerId,
    ) -> Result<Option<ClassificationAssessment>, RepositoryError>;
    /// Most recent first, at most `limit` entries.
    fn assessment_history(
        &self,
        worker_id: &WorkerId,
        limit: usize,
    ) -> Result<Vec<ClassificationAssessment>, RepositoryError>;
    fn insert_assessment(
        &self,
        assessment: ClassificationAssessment,
    ) -> Result<ClassificationAssessment, RepositoryError>;
    /// Recomputes the per-organization dashboard view. Safe to call repeatedly.
    fn refresh_summary_view(&self) -> Result<(), RepositoryError>;
    fn dashboard_summary(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<DashboardSummary, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook for admin-facing notifications.
///
/// Implementations are expected to hand the alert off (queue, channel) rather than
/// deliver it inline; the caller never waits on delivery.
pub trait RiskAlertPublisher: Send + Sync {
    fn publish(&self, alert: RiskAlert) -> Result<(), AlertError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    ClassificationRiskChanged,
}

/// Notification payload addressed to an organization's administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAlert {
    pub organization_id: OrganizationId,
    pub worker_id: WorkerId,
    pub kind: AlertKind,
    pub title: String,
    pub body: String,
    pub details: BTreeMap<String, String>,
}

/// Alert dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("alert transport unavailable: {0}")]
    Transport(String),
}
