use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{info, warn};

use super::domain::{OrganizationId, WorkerId};
use super::orchestrator::AssessmentOrchestrator;
use super::repository::{
    ClassificationStore, RepositoryError, RiskAlertPublisher, WorkforceDirectory,
};

/// Re-runs the assessment pipeline for every active worker of every organization.
///
/// Workers are processed one at a time. A worker that fails is logged and skipped; it
/// is picked up again on the next run. The dashboard view is refreshed once at the end.
pub struct ReassessmentBatchDriver<'a, S, D, A> {
    orchestrator: &'a AssessmentOrchestrator<S, D, A>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerFailure {
    pub organization_id: OrganizationId,
    pub worker_id: WorkerId,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationFailure {
    pub organization_id: OrganizationId,
    pub error: String,
}

/// Outcome counters for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub organizations: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub worker_failures: Vec<WorkerFailure>,
    pub organization_failures: Vec<OrganizationFailure>,
    pub cancelled: bool,
    pub summary_refreshed: bool,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.worker_failures.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("failed to list organizations: {0}")]
    Organizations(#[source] RepositoryError),
}

impl<'a, S, D, A> ReassessmentBatchDriver<'a, S, D, A>
where
    S: ClassificationStore + 'static,
    D: WorkforceDirectory + 'static,
    A: RiskAlertPublisher + 'static,
{
    pub fn new(orchestrator: &'a AssessmentOrchestrator<S, D, A>) -> Self {
        Self { orchestrator }
    }

    pub fn run_all(&self) -> Result<BatchReport, BatchError> {
        self.run_all_until(&AtomicBool::new(false))
    }

    /// Same as [`Self::run_all`], stopping before the next worker once `cancel` is set.
    pub fn run_all_until(&self, cancel: &AtomicBool) -> Result<BatchReport, BatchError> {
        let organizations = self
            .orchestrator
            .directory()
            .all_organization_ids()
            .map_err(BatchError::Organizations)?;

        let mut report = BatchReport {
            organizations: organizations.len(),
            ..BatchReport::default()
        };

        'organizations: for organization_id in &organizations {
            let workers = match self
                .orchestrator
                .directory()
                .active_worker_ids(organization_id)
            {
                Ok(workers) => workers,
                Err(err) => {
                    warn!(
                        organization_id = %organization_id,
                        error = %err,
                        "skipping organization: failed to list active workers"
                    );
                    report.organization_failures.push(OrganizationFailure {
                        organization_id: organization_id.clone(),
                        error: err.to_string(),
                    });
                    continue;
                }
            };

            for worker_id in &workers {
                if cancel.load(Ordering::Acquire) {
                    report.cancelled = true;
                    break 'organizations;
                }

                report.attempted += 1;
                match self.orchestrator.run(worker_id, organization_id) {
                    Ok(_) => report.succeeded += 1,
                    Err(err) => {
                        warn!(
                            worker_id = %worker_id,
                            organization_id = %organization_id,
                            error = %err,
                            "reassessment failed for worker"
                        );
                        report.worker_failures.push(WorkerFailure {
                            organization_id: organization_id.clone(),
                            worker_id: worker_id.clone(),
                            error: err.to_string(),
                        });
                    }
                }
            }
        }

        match self.orchestrator.store().refresh_summary_view() {
            Ok(()) => report.summary_refreshed = true,
            Err(err) => warn!(error = %err, "failed to refresh classification summary view"),
        }

        info!(
            organizations = report.organizations,
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed(),
            cancelled = report.cancelled,
            "reassessment batch finished"
        );

        Ok(report)
    }
}
