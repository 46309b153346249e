use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

use super::batch::{BatchError, BatchReport, ReassessmentBatchDriver};
use super::domain::{
    timestamped_id, ClassificationAssessment, ClassificationFactor, Clock, FactorCategory, FactorId,
    FactorSource, FactorValue, FactorValueKind, Level, ManualFactorSubmission, OrganizationId,
    SystemClock, WorkerId,
};
use super::orchestrator::{AssessmentError, AssessmentOrchestrator};
use super::repository::{
    ClassificationStore, RepositoryError, RiskAlertPublisher, WorkforceDirectory,
};
use super::scoring::{PolicyError, ScoringConfig, ScoringEngine};
use super::summary::DashboardSummary;

pub const DEFAULT_HISTORY_LIMIT: usize = 20;
pub const MAX_HISTORY_LIMIT: usize = 100;

static FACTOR_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_factor_id(created_at: DateTime<Utc>) -> FactorId {
    FactorId(timestamped_id("fct", created_at, &FACTOR_SEQUENCE))
}

/// Facade composing the scoring engine, orchestrator, and batch driver over the stores.
pub struct ClassificationService<S, D, A> {
    store: Arc<S>,
    orchestrator: AssessmentOrchestrator<S, D, A>,
    clock: Arc<dyn Clock>,
}

impl<S, D, A> ClassificationService<S, D, A>
where
    S: ClassificationStore + 'static,
    D: WorkforceDirectory + 'static,
    A: RiskAlertPublisher + 'static,
{
    pub fn new(
        store: Arc<S>,
        directory: Arc<D>,
        alerts: Arc<A>,
        config: ScoringConfig,
    ) -> Result<Self, PolicyError> {
        Self::with_clock(store, directory, alerts, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<S>,
        directory: Arc<D>,
        alerts: Arc<A>,
        config: ScoringConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PolicyError> {
        let engine = Arc::new(ScoringEngine::new(config)?);
        let orchestrator =
            AssessmentOrchestrator::new(store.clone(), directory, alerts, engine, clock.clone());

        Ok(Self {
            store,
            orchestrator,
            clock,
        })
    }

    /// Score a worker on demand and persist the result.
    pub fn run_assessment(
        &self,
        worker_id: &WorkerId,
        organization_id: &OrganizationId,
    ) -> Result<ClassificationAssessment, ClassificationServiceError> {
        Ok(self.orchestrator.run(worker_id, organization_id)?)
    }

    /// Current assessment, or `NotFound` when the worker has never been assessed.
    pub fn latest_assessment(
        &self,
        worker_id: &WorkerId,
    ) -> Result<ClassificationAssessment, ClassificationServiceError> {
        let assessment = self
            .store
            .latest_assessment(worker_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(assessment)
    }

    /// Most recent first. `limit` defaults to 20 and is capped at 100.
    pub fn assessment_history(
        &self,
        worker_id: &WorkerId,
        limit: Option<usize>,
    ) -> Result<Vec<ClassificationAssessment>, ClassificationServiceError> {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        Ok(self.store.assessment_history(worker_id, limit)?)
    }

    /// Record a reviewer override. It takes effect on the next assessment run.
    pub fn submit_manual_factor(
        &self,
        worker_id: &WorkerId,
        submission: ManualFactorSubmission,
    ) -> Result<ClassificationFactor, ClassificationServiceError> {
        let value = validate_submission(&submission)?;

        let created_at = self.clock.now();
        let factor = ClassificationFactor {
            id: next_factor_id(created_at),
            worker_id: worker_id.clone(),
            category: submission.category,
            value,
            period_start: submission.period_start,
            period_end: submission.period_end,
            source: FactorSource::Manual,
            created_at,
        };

        let stored = self.store.insert_factor(factor)?;
        info!(
            worker_id = %stored.worker_id,
            category = ?stored.category,
            "manual classification factor recorded"
        );
        Ok(stored)
    }

    pub fn dashboard_summary(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<DashboardSummary, ClassificationServiceError> {
        Ok(self.store.dashboard_summary(organization_id)?)
    }

    /// Scheduler entry point.
    pub fn run_reassessment_batch(&self) -> Result<BatchReport, ClassificationServiceError> {
        Ok(ReassessmentBatchDriver::new(&self.orchestrator).run_all()?)
    }

    pub fn run_reassessment_batch_until(
        &self,
        cancel: &AtomicBool,
    ) -> Result<BatchReport, ClassificationServiceError> {
        Ok(ReassessmentBatchDriver::new(&self.orchestrator).run_all_until(cancel)?)
    }
}

/// Checks a submission against its category and returns the value to store.
/// Level text is normalised to its lowercase label.
fn validate_submission(
    submission: &ManualFactorSubmission,
) -> Result<FactorValue, FactorSubmissionError> {
    let category = submission.category;
    let expected = category.value_kind();
    let found = submission.value.kind();
    if expected != found {
        return Err(FactorSubmissionError::ValueKindMismatch {
            category,
            expected,
            found,
        });
    }

    if let (Some(start), Some(end)) = (submission.period_start, submission.period_end) {
        if start > end {
            return Err(FactorSubmissionError::InvalidPeriod { start, end });
        }
    }

    match &submission.value {
        FactorValue::Numeric(number) if !number.is_finite() || *number < 0.0 => {
            Err(FactorSubmissionError::InvalidNumber {
                category,
                value: *number,
            })
        }
        FactorValue::Text(raw) => raw
            .parse::<Level>()
            .map(|level| FactorValue::Text(level.label().to_string()))
            .map_err(FactorSubmissionError::InvalidLevel),
        other => Ok(other.clone()),
    }
}

/// Validation errors raised for manual factor submissions.
#[derive(Debug, thiserror::Error)]
pub enum FactorSubmissionError {
    #[error("{category:?} expects a {expected:?} value, got {found:?}")]
    ValueKindMismatch {
        category: FactorCategory,
        expected: FactorValueKind,
        found: FactorValueKind,
    },
    #[error("{category:?} must be a finite, non-negative number (got {value})")]
    InvalidNumber { category: FactorCategory, value: f64 },
    #[error("invalid level: {0}")]
    InvalidLevel(String),
    #[error("period start {start} is after period end {end}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },
}

/// Error raised by the classification service.
#[derive(Debug, thiserror::Error)]
pub enum ClassificationServiceError {
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    InvalidFactor(#[from] FactorSubmissionError),
    #[error(transparent)]
    Batch(#[from] BatchError),
}
