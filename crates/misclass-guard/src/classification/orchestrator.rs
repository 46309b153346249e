use std::collections::BTreeMap;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::domain::{
    timestamped_id, AssessmentId, ClassificationAssessment, Clock, OrganizationId, WorkerId,
};
use super::merge;
use super::repository::{
    AlertKind, ClassificationStore, RepositoryError, RiskAlert, RiskAlertPublisher,
    WorkforceDirectory,
};
use super::scoring::ScoringEngine;

static ASSESSMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_assessment_id(assessed_at: DateTime<Utc>) -> AssessmentId {
    AssessmentId(timestamped_id("asm", assessed_at, &ASSESSMENT_SEQUENCE))
}

/// Runs the full scoring pipeline for one worker and records the result.
pub struct AssessmentOrchestrator<S, D, A> {
    store: Arc<S>,
    directory: Arc<D>,
    alerts: Arc<A>,
    engine: Arc<ScoringEngine>,
    clock: Arc<dyn Clock>,
}

impl<S, D, A> AssessmentOrchestrator<S, D, A>
where
    S: ClassificationStore + 'static,
    D: WorkforceDirectory + 'static,
    A: RiskAlertPublisher + 'static,
{
    pub fn new(
        store: Arc<S>,
        directory: Arc<D>,
        alerts: Arc<A>,
        engine: Arc<ScoringEngine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            directory,
            alerts,
            engine,
            clock,
        }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Scores `worker_id` and appends a new assessment to its history.
    ///
    /// The assessment is written once, after every read and all scoring has succeeded.
    /// A risk-change alert is sent only when a previous assessment exists with a different
    /// tier, and a failed alert never fails the run.
    pub fn run(
        &self,
        worker_id: &WorkerId,
        organization_id: &OrganizationId,
    ) -> Result<ClassificationAssessment, AssessmentError> {
        let computed = self
            .directory
            .computed_factors(worker_id)
            .map_err(|source| AssessmentError::ComputedFactors {
                worker_id: worker_id.clone(),
                source,
            })?;
        let factors = self.store.factors_for_worker(worker_id).map_err(|source| {
            AssessmentError::Factors {
                worker_id: worker_id.clone(),
                source,
            }
        })?;

        let input = merge::merge_factors(merge::baseline_input(&computed), &factors);
        let scores = self.engine.score(&input);

        let previous = self.store.latest_assessment(worker_id).map_err(|source| {
            AssessmentError::PreviousAssessment {
                worker_id: worker_id.clone(),
                source,
            }
        })?;

        let assessed_at = self.clock.now();
        let assessment = ClassificationAssessment {
            id: next_assessment_id(assessed_at),
            worker_id: worker_id.clone(),
            organization_id: organization_id.clone(),
            assessed_at,
            overall_risk: scores.aggregate.overall_risk,
            overall_score: scores.aggregate.overall_score,
            irs: scores.irs,
            dol: scores.dol,
            abc: scores.abc,
            input_data: input,
        };

        let stored = self
            .store
            .insert_assessment(assessment)
            .map_err(|source| AssessmentError::Persist {
                worker_id: worker_id.clone(),
                source,
            })?;

        info!(
            worker_id = %stored.worker_id,
            organization_id = %stored.organization_id,
            overall_score = stored.overall_score,
            overall_risk = stored.overall_risk.label(),
            "classification assessment recorded"
        );

        if let Some(previous) = previous {
            if previous.overall_risk != stored.overall_risk {
                self.dispatch_risk_change(&previous, &stored);
            }
        }

        Ok(stored)
    }

    fn dispatch_risk_change(
        &self,
        previous: &ClassificationAssessment,
        current: &ClassificationAssessment,
    ) {
        let direction = if current.overall_risk > previous.overall_risk {
            "escalated"
        } else {
            "reduced"
        };

        let mut details = BTreeMap::new();
        details.insert("assessment_id".to_string(), current.id.0.clone());
        details.insert(
            "previous_risk".to_string(),
            previous.overall_risk.label().to_string(),
        );
        details.insert(
            "new_risk".to_string(),
            current.overall_risk.label().to_string(),
        );
        details.insert(
            "overall_score".to_string(),
            format!("{:.2}", current.overall_score),
        );
        details.insert("direction".to_string(), direction.to_string());

        let alert = RiskAlert {
            organization_id: current.organization_id.clone(),
            worker_id: current.worker_id.clone(),
            kind: AlertKind::ClassificationRiskChanged,
            title: format!(
                "Classification risk {direction} for worker {}",
                current.worker_id
            ),
            body: format!(
                "Misclassification risk moved from {} to {} (overall score {:.2}).",
                previous.overall_risk.label(),
                current.overall_risk.label(),
                current.overall_score
            ),
            details,
        };

        info!(
            worker_id = %current.worker_id,
            previous_risk = previous.overall_risk.label(),
            new_risk = current.overall_risk.label(),
            "classification risk tier changed"
        );

        if let Err(err) = self.alerts.publish(alert) {
            warn!(
                worker_id = %current.worker_id,
                organization_id = %current.organization_id,
                error = %err,
                "failed to dispatch risk change alert"
            );
        }
    }
}

/// Failure raised while running one worker's assessment.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentError {
    #[error("failed to load computed factors for worker {worker_id}: {source}")]
    ComputedFactors {
        worker_id: WorkerId,
        source: RepositoryError,
    },
    #[error("failed to load classification factors for worker {worker_id}: {source}")]
    Factors {
        worker_id: WorkerId,
        source: RepositoryError,
    },
    #[error("failed to load previous assessment for worker {worker_id}: {source}")]
    PreviousAssessment {
        worker_id: WorkerId,
        source: RepositoryError,
    },
    #[error("failed to persist assessment for worker {worker_id}: {source}")]
    Persist {
        worker_id: WorkerId,
        source: RepositoryError,
    },
}

impl AssessmentError {
    pub fn worker_id(&self) -> &WorkerId {
        match self {
            AssessmentError::ComputedFactors { worker_id, .. }
            | AssessmentError::Factors { worker_id, .. }
            | AssessmentError::PreviousAssessment { worker_id, .. }
            | AssessmentError::Persist { worker_id, .. } => worker_id,
        }
    }
}
