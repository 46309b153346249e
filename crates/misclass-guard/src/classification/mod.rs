//! Worker misclassification risk assessment.
//!
//! Computed time and engagement signals are merged with recorded factor overrides, scored
//! under the IRS common-law, DOL economic-realities, and California ABC tests, blended into
//! one overall tier, and persisted as an append-only assessment history per worker.

pub mod batch;
pub mod domain;
pub mod merge;
pub mod orchestrator;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod summary;

#[cfg(test)]
mod tests;

pub use batch::{BatchError, BatchReport, ReassessmentBatchDriver, WorkerFailure};
pub use domain::{
    AssessmentId, ClassificationAssessment, ClassificationFactor, ClassificationInputData, Clock,
    ComputedFactors, FactorCategory, FactorId, FactorSource, FactorValue, FactorValueKind, Level,
    ManualFactorSubmission, OrganizationId, SystemClock, WorkerId,
};
pub use orchestrator::{AssessmentError, AssessmentOrchestrator};
pub use repository::{
    AlertError, AlertKind, ClassificationStore, RepositoryError, RiskAlert, RiskAlertPublisher,
    WorkforceDirectory,
};
pub use router::classification_router;
pub use scoring::{PolicyError, RiskTier, ScoringConfig, ScoringEngine};
pub use service::{ClassificationService, ClassificationServiceError, FactorSubmissionError};
pub use summary::{summarize, DashboardSummary, RiskRankEntry, TierCounts};
