use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::classification::domain::{
    ClassificationAssessment, ClassificationFactor, Clock, ComputedFactors, FactorCategory,
    FactorValue, ManualFactorSubmission, OrganizationId, WorkerId,
};
use crate::classification::repository::{
    AlertError, ClassificationStore, RepositoryError, RiskAlert, RiskAlertPublisher,
    WorkforceDirectory,
};
use crate::classification::scoring::ScoringConfig;
use crate::classification::service::ClassificationService;
use crate::classification::summary::{summarize, DashboardSummary};

pub(super) const TOP_N: usize = 5;

pub(super) fn worker(id: &str) -> WorkerId {
    WorkerId(id.to_string())
}

pub(super) fn org(id: &str) -> OrganizationId {
    OrganizationId(id.to_string())
}

/// Clock that advances one minute on every read.
pub(super) struct SteppingClock {
    start: DateTime<Utc>,
    ticks: AtomicI64,
}

impl Default for SteppingClock {
    fn default() -> Self {
        Self {
            start: Utc
                .with_ymd_and_hms(2025, 7, 1, 6, 0, 0)
                .single()
                .expect("valid start"),
            ticks: AtomicI64::new(0),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.start + Duration::minutes(tick)
    }
}

#[derive(Default)]
pub(super) struct MemoryStore {
    factors: Mutex<Vec<ClassificationFactor>>,
    assessments: Mutex<Vec<ClassificationAssessment>>,
    summaries: Mutex<HashMap<OrganizationId, DashboardSummary>>,
    refreshes: AtomicUsize,
    pub(super) fail_inserts: AtomicBool,
    pub(super) fail_refresh: AtomicBool,
}

impl MemoryStore {
    pub(super) fn assessments_for(&self, worker_id: &WorkerId) -> Vec<ClassificationAssessment> {
        self.assessments
            .lock()
            .expect("store mutex poisoned")
            .iter()
            .filter(|assessment| &assessment.worker_id == worker_id)
            .cloned()
            .collect()
    }

    pub(super) fn assessment_count(&self) -> usize {
        self.assessments.lock().expect("store mutex poisoned").len()
    }

    pub(super) fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl ClassificationStore for MemoryStore {
    fn factors_for_worker(
        &self,
        worker_id: &WorkerId,
    ) -> Result<Vec<ClassificationFactor>, RepositoryError> {
        let guard = self.factors.lock().expect("store mutex poisoned");
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
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("database offline".to_string()));
        }
        self.factors
            .lock()
            .expect("store mutex poisoned")
            .push(factor.clone());
        Ok(factor)
    }

    fn latest_assessment(
        &self,
        worker_id: &WorkerId,
    ) -> Result<Option<ClassificationAssessment>, RepositoryError> {
        let guard = self.assessments.lock().expect("store mutex poisoned");
        Ok(guard
            .iter()
            .filter(|assessment| &assessment.worker_id == worker_id)
            .max_by_key(|assessment| assessment.assessed_at)
            .cloned())
    }

    fn assessment_history(
        &self,
        worker_id: &WorkerId,
        limit: usize,
    ) -> Result<Vec<ClassificationAssessment>, RepositoryError> {
        let mut history = self.assessments_for(worker_id);
        history.reverse();
        history.sort_by(|a, b| b.assessed_at.cmp(&a.assessed_at));
        history.truncate(limit);
        Ok(history)
    }

    fn insert_assessment(
        &self,
        assessment: ClassificationAssessment,
    ) -> Result<ClassificationAssessment, RepositoryError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("database offline".to_string()));
        }
        self.assessments
            .lock()
            .expect("store mutex poisoned")
            .push(assessment.clone());
        Ok(assessment)
    }

    fn refresh_summary_view(&self) -> Result<(), RepositoryError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("view locked".to_string()));
        }

        let assessments = self.assessments.lock().expect("store mutex poisoned");
        let organizations: HashSet<&OrganizationId> = assessments
            .iter()
            .map(|assessment| &assessment.organization_id)
            .collect();
        let mut summaries = self.summaries.lock().expect("store mutex poisoned");
        summaries.clear();
        for organization_id in organizations {
            summaries.insert(
                organization_id.clone(),
                summarize(organization_id.clone(), assessments.iter(), TOP_N),
            );
        }
        Ok(())
    }

    fn dashboard_summary(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<DashboardSummary, RepositoryError> {
        let summaries = self.summaries.lock().expect("store mutex poisoned");
        Ok(summaries
            .get(organization_id)
            .cloned()
            .unwrap_or_else(|| DashboardSummary::empty(organization_id.clone())))
    }
}

#[derive(Default)]
pub(super) struct MemoryDirectory {
    organizations: Mutex<BTreeMap<OrganizationId, Vec<WorkerId>>>,
    computed: Mutex<HashMap<WorkerId, ComputedFactors>>,
    failing_workers: Mutex<HashSet<WorkerId>>,
    failing_organizations: Mutex<HashSet<OrganizationId>>,
}

impl MemoryDirectory {
    pub(super) fn add_worker(&self, organization: &str, id: &str, computed: ComputedFactors) {
        self.organizations
            .lock()
            .expect("directory mutex poisoned")
            .entry(org(organization))
            .or_default()
            .push(worker(id));
        self.computed
            .lock()
            .expect("directory mutex poisoned")
            .insert(worker(id), computed);
    }

    pub(super) fn fail_worker(&self, id: &str) {
        self.failing_workers
            .lock()
            .expect("directory mutex poisoned")
            .insert(worker(id));
    }

    pub(super) fn fail_organization(&self, id: &str) {
        self.failing_organizations
            .lock()
            .expect("directory mutex poisoned")
            .insert(org(id));
    }
}

impl WorkforceDirectory for MemoryDirectory {
    fn computed_factors(&self, worker_id: &WorkerId) -> Result<ComputedFactors, RepositoryError> {
        if self
            .failing_workers
            .lock()
            .expect("directory mutex poisoned")
            .contains(worker_id)
        {
            return Err(RepositoryError::Unavailable(
                "time entry service timed out".to_string(),
            ));
        }
        self.computed
            .lock()
            .expect("directory mutex poisoned")
            .get(worker_id)
            .copied()
            .ok_or(RepositoryError::NotFound)
    }

    fn active_worker_ids(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<WorkerId>, RepositoryError> {
        if self
            .failing_organizations
            .lock()
            .expect("directory mutex poisoned")
            .contains(organization_id)
        {
            return Err(RepositoryError::Unavailable("roster offline".to_string()));
        }
        Ok(self
            .organizations
            .lock()
            .expect("directory mutex poisoned")
            .get(organization_id)
            .cloned()
            .unwrap_or_default())
    }

    fn all_organization_ids(&self) -> Result<Vec<OrganizationId>, RepositoryError> {
        Ok(self
            .organizations
            .lock()
            .expect("directory mutex poisoned")
            .keys()
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryAlerts {
    events: Arc<Mutex<Vec<RiskAlert>>>,
}

impl MemoryAlerts {
    pub(super) fn events(&self) -> Vec<RiskAlert> {
        self.events.lock().expect("alert mutex poisoned").clone()
    }
}

impl RiskAlertPublisher for MemoryAlerts {
    fn publish(&self, alert: RiskAlert) -> Result<(), AlertError> {
        self.events
            .lock()
            .expect("alert mutex poisoned")
            .push(alert);
        Ok(())
    }
}

pub(super) struct OfflineAlerts;

impl RiskAlertPublisher for OfflineAlerts {
    fn publish(&self, _alert: RiskAlert) -> Result<(), AlertError> {
        Err(AlertError::Transport("smtp relay offline".to_string()))
    }
}

/// Full-time, single-client, 13 weeks of logged time.
pub(super) fn full_time_signals() -> ComputedFactors {
    ComputedFactors {
        avg_weekly_hours: 40.0,
        total_weeks: 13,
        active_engagement_count: 1,
    }
}

/// Part-time, three concurrent clients, four weeks of logged time.
pub(super) fn part_time_signals() -> ComputedFactors {
    ComputedFactors {
        avg_weekly_hours: 10.0,
        total_weeks: 4,
        active_engagement_count: 3,
    }
}

pub(super) fn manual(category: FactorCategory, value: FactorValue) -> ManualFactorSubmission {
    ManualFactorSubmission {
        category,
        value,
        period_start: None,
        period_end: None,
    }
}

/// Overrides that make a worker look like an employee on every test.
pub(super) fn employee_like_overrides() -> Vec<ManualFactorSubmission> {
    vec![
        manual(FactorCategory::SetSchedule, FactorValue::Boolean(true)),
        manual(FactorCategory::ToolsProvided, FactorValue::Boolean(true)),
        manual(FactorCategory::TrainingProvided, FactorValue::Boolean(true)),
        manual(
            FactorCategory::SupervisionLevel,
            FactorValue::Text("high".to_string()),
        ),
        manual(
            FactorCategory::IntegrationLevel,
            FactorValue::Text("high".to_string()),
        ),
        manual(
            FactorCategory::SignificantInvestment,
            FactorValue::Boolean(false),
        ),
        manual(
            FactorCategory::ProfitLossOpportunity,
            FactorValue::Boolean(false),
        ),
    ]
}

/// Overrides that satisfy every ABC prong when paired with multiple clients.
pub(super) fn independent_overrides() -> Vec<ManualFactorSubmission> {
    vec![
        manual(FactorCategory::SetSchedule, FactorValue::Boolean(false)),
        manual(FactorCategory::ToolsProvided, FactorValue::Boolean(false)),
        manual(
            FactorCategory::SupervisionLevel,
            FactorValue::Text("low".to_string()),
        ),
        manual(
            FactorCategory::IntegrationLevel,
            FactorValue::Text("low".to_string()),
        ),
        manual(
            FactorCategory::SignificantInvestment,
            FactorValue::Boolean(true),
        ),
        manual(
            FactorCategory::ProfitLossOpportunity,
            FactorValue::Boolean(true),
        ),
    ]
}

pub(super) type TestService = ClassificationService<MemoryStore, MemoryDirectory, MemoryAlerts>;

pub(super) struct Harness {
    pub(super) service: TestService,
    pub(super) store: Arc<MemoryStore>,
    pub(super) directory: Arc<MemoryDirectory>,
    pub(super) alerts: Arc<MemoryAlerts>,
}

/// Two organizations: `org-a` with `w-a1` (full time) and `w-a2` (part time), `org-b`
/// with `w-b1` (full time).
pub(super) fn harness() -> Harness {
    let directory = Arc::new(MemoryDirectory::default());
    directory.add_worker("org-a", "w-a1", full_time_signals());
    directory.add_worker("org-a", "w-a2", part_time_signals());
    directory.add_worker("org-b", "w-b1", full_time_signals());
    harness_with(directory)
}

pub(super) fn harness_with(directory: Arc<MemoryDirectory>) -> Harness {
    let store = Arc::new(MemoryStore::default());
    let alerts = Arc::new(MemoryAlerts::default());
    let service = ClassificationService::with_clock(
        store.clone(),
        directory.clone(),
        alerts.clone(),
        ScoringConfig::default(),
        Arc::new(SteppingClock::default()),
    )
    .expect("default policy is valid");

    Harness {
        service,
        store,
        directory,
        alerts,
    }
}

pub(super) fn submit_all(
    service: &TestService,
    worker_id: &WorkerId,
    submissions: Vec<ManualFactorSubmission>,
) {
    for submission in submissions {
        service
            .submit_manual_factor(worker_id, submission)
            .expect("valid submission");
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
