use metrics_exporter_prometheus::PrometheusHandle;
use misclass_guard::classification::{
    summarize, AlertError, ClassificationAssessment, ClassificationFactor, ClassificationStore,
    ComputedFactors, DashboardSummary, OrganizationId, RepositoryError, RiskAlert,
    RiskAlertPublisher, WorkerId, WorkforceDirectory,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local store backing the service until a database adapter is wired in.
#[derive(Clone)]
pub(crate) struct InMemoryClassificationStore {
    factors: Arc<Mutex<Vec<ClassificationFactor>>>,
    assessments: Arc<Mutex<Vec<ClassificationAssessment>>>,
    summaries: Arc<RwLock<HashMap<OrganizationId, DashboardSummary>>>,
    top_n: usize,
}

impl InMemoryClassificationStore {
    pub(crate) fn new(top_n: usize) -> Self {
        Self {
            factors: Arc::default(),
            assessments: Arc::default(),
            summaries: Arc::default(),
            top_n,
        }
    }
}

impl ClassificationStore for InMemoryClassificationStore {
    fn factors_for_worker(
        &self,
        worker_id: &WorkerId,
    ) -> Result<Vec<ClassificationFactor>, RepositoryError> {
        let guard = self.factors.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .filter(|factor| &factor.worker_id == worker_id)
            .cloned()
            .collect())
    }

    fn insert_factor(
        &self,
        factor: ClassificationFactor,
    ) -> Result<ClassificationFactor, RepositoryError> {
        let mut guard = self.factors.lock().map_err(poisoned)?;
        if guard.iter().any(|existing| existing.id == factor.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(factor.clone());
        Ok(factor)
    }

    fn latest_assessment(
        &self,
        worker_id: &WorkerId,
    ) -> Result<Option<ClassificationAssessment>, RepositoryError> {
        Ok(self.assessment_history(worker_id, 1)?.into_iter().next())
    }

    fn assessment_history(
        &self,
        worker_id: &WorkerId,
        limit: usize,
    ) -> Result<Vec<ClassificationAssessment>, RepositoryError> {
        let guard = self.assessments.lock().map_err(poisoned)?;
        // Insertion order breaks ties between identical timestamps.
        let mut history: Vec<_> = guard
            .iter()
            .rev()
            .filter(|assessment| &assessment.worker_id == worker_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.assessed_at.cmp(&a.assessed_at));
        history.truncate(limit);
        Ok(history)
    }

    fn insert_assessment(
        &self,
        assessment: ClassificationAssessment,
    ) -> Result<ClassificationAssessment, RepositoryError> {
        let mut guard = self.assessments.lock().map_err(poisoned)?;
        if guard.iter().any(|existing| existing.id == assessment.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(assessment.clone());
        Ok(assessment)
    }

    fn refresh_summary_view(&self) -> Result<(), RepositoryError> {
        let assessments = self.assessments.lock().map_err(poisoned)?;
        let mut by_org: BTreeMap<&OrganizationId, Vec<&ClassificationAssessment>> =
            BTreeMap::new();
        for assessment in assessments.iter() {
            by_org
                .entry(&assessment.organization_id)
                .or_default()
                .push(assessment);
        }

        let rebuilt: HashMap<_, _> = by_org
            .into_iter()
            .map(|(organization_id, scoped)| {
                let summary = summarize(organization_id.clone(), scoped, self.top_n);
                (organization_id.clone(), summary)
            })
            .collect();

        let mut view = self.summaries.write().map_err(poisoned)?;
        *view = rebuilt;
        Ok(())
    }

    fn dashboard_summary(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<DashboardSummary, RepositoryError> {
        let view = self.summaries.read().map_err(poisoned)?;
        Ok(view
            .get(organization_id)
            .cloned()
            .unwrap_or_else(|| DashboardSummary::empty(organization_id.clone())))
    }
}

/// Roster and time aggregates keyed by organization.
#[derive(Default, Clone)]
pub(crate) struct InMemoryWorkforceDirectory {
    roster: Arc<RwLock<BTreeMap<OrganizationId, BTreeMap<WorkerId, ComputedFactors>>>>,
}

impl InMemoryWorkforceDirectory {
    pub(crate) fn enroll(
        &self,
        organization_id: &str,
        worker_id: &str,
        computed: ComputedFactors,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.roster.write().map_err(poisoned)?;
        guard
            .entry(OrganizationId(organization_id.to_string()))
            .or_default()
            .insert(WorkerId(worker_id.to_string()), computed);
        Ok(())
    }
}

impl WorkforceDirectory for InMemoryWorkforceDirectory {
    fn computed_factors(&self, worker_id: &WorkerId) -> Result<ComputedFactors, RepositoryError> {
        let guard = self.roster.read().map_err(poisoned)?;
        guard
            .values()
            .find_map(|workers| workers.get(worker_id).copied())
            .ok_or(RepositoryError::NotFound)
    }

    fn active_worker_ids(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<WorkerId>, RepositoryError> {
        let guard = self.roster.read().map_err(poisoned)?;
        Ok(guard
            .get(organization_id)
            .map(|workers| workers.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn all_organization_ids(&self) -> Result<Vec<OrganizationId>, RepositoryError> {
        let guard = self.roster.read().map_err(poisoned)?;
        Ok(guard.keys().cloned().collect())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> RepositoryError {
    RepositoryError::Unavailable("in-memory lock poisoned".to_string())
}

/// Queues alerts onto a channel drained by a background task.
#[derive(Clone)]
pub(crate) struct ChannelAlertPublisher {
    sender: mpsc::UnboundedSender<RiskAlert>,
}

impl ChannelAlertPublisher {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<RiskAlert>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl RiskAlertPublisher for ChannelAlertPublisher {
    fn publish(&self, alert: RiskAlert) -> Result<(), AlertError> {
        self.sender
            .send(alert)
            .map_err(|_| AlertError::Transport("alert channel closed".to_string()))
    }
}

/// Delivers queued alerts to the admin feed. Currently the structured log.
pub(crate) fn spawn_alert_drain(mut receiver: mpsc::UnboundedReceiver<RiskAlert>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(alert) = receiver.recv().await {
            info!(
                organization_id = %alert.organization_id,
                worker_id = %alert.worker_id,
                kind = ?alert.kind,
                title = %alert.title,
                "risk alert delivered to organization admins"
            );
        }
        warn!("alert channel closed; drain task exiting");
    })
}

/// Sample roster used by `serve --seed-demo` and the `demo` command.
pub(crate) fn seed_demo_roster(directory: &InMemoryWorkforceDirectory) -> Result<(), RepositoryError> {
    let roster = [
        ("northwind", "nw-contractor-ada", 42.0, 26, 1),
        ("northwind", "nw-contractor-lin", 18.0, 10, 3),
        ("northwind", "nw-contractor-oyelaran", 8.0, 4, 5),
        ("bluefin", "bf-contractor-marek", 38.0, 13, 1),
        ("bluefin", "bf-contractor-suzuki", 25.0, 13, 2),
    ];
    for (organization_id, worker_id, avg_weekly_hours, total_weeks, active_engagement_count) in
        roster
    {
        directory.enroll(
            organization_id,
            worker_id,
            ComputedFactors {
                avg_weekly_hours,
                total_weeks,
                active_engagement_count,
            },
        )?;
    }
    Ok(())
}
