use super::common::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::classification::domain::{FactorCategory, FactorValue, Level};
use crate::classification::orchestrator::{AssessmentError, AssessmentOrchestrator};
use crate::classification::repository::{AlertKind, RepositoryError};
use crate::classification::scoring::{RiskTier, ScoringEngine};
use crate::classification::service::{ClassificationService, ClassificationServiceError};
use crate::classification::ScoringConfig;

#[test]
fn first_assessment_is_persisted_without_alert() {
    let Harness {
        service,
        store,
        alerts,
        ..
    } = harness();

    let assessment = service
        .run_assessment(&worker("w-a1"), &org("org-a"))
        .expect("assessment runs");

    // 40h/week over 13 weeks with one client: IRS 14, DOL 14, ABC 100.
    assert_eq!(assessment.irs.score, 14);
    assert_eq!(assessment.dol.score, 14);
    assert_eq!(assessment.abc.score, 100);
    assert_eq!(assessment.overall_score, 39.8);
    assert_eq!(assessment.overall_risk, RiskTier::Medium);
    assert_eq!(assessment.input_data.hours_per_week, Some(40.0));
    assert_eq!(assessment.input_data.multiple_clients, Some(false));
    assert_eq!(store.assessments_for(&worker("w-a1")).len(), 1);
    assert!(alerts.events().is_empty());
}

#[test]
fn unchanged_tier_does_not_alert() {
    let Harness {
        service, alerts, ..
    } = harness();

    let first = service
        .run_assessment(&worker("w-a1"), &org("org-a"))
        .expect("first run");
    let second = service
        .run_assessment(&worker("w-a1"), &org("org-a"))
        .expect("second run");

    assert_ne!(first.id, second.id);
    assert!(second.assessed_at > first.assessed_at);
    assert!(second
        .id
        .0
        .starts_with(&format!("asm-{}-", second.assessed_at.timestamp_micros())));
    assert_eq!(first.overall_score, second.overall_score);
    assert!(alerts.events().is_empty());
}

#[test]
fn tier_change_dispatches_admin_alert() {
    let Harness {
        service, alerts, ..
    } = harness();
    let worker_id = worker("w-a1");

    service
        .run_assessment(&worker_id, &org("org-a"))
        .expect("baseline run");
    submit_all(&service, &worker_id, employee_like_overrides());
    let escalated = service
        .run_assessment(&worker_id, &org("org-a"))
        .expect("escalated run");

    assert_eq!(escalated.irs.score, 94);
    assert_eq!(escalated.dol.score, 89);
    assert_eq!(escalated.overall_score, 94.3);
    assert_eq!(escalated.overall_risk, RiskTier::Critical);

    let events = alerts.events();
    assert_eq!(events.len(), 1);
    let alert = &events[0];
    assert_eq!(alert.kind, AlertKind::ClassificationRiskChanged);
    assert_eq!(alert.organization_id, org("org-a"));
    assert_eq!(alert.worker_id, worker_id);
    assert_eq!(alert.details.get("previous_risk").map(String::as_str), Some("medium"));
    assert_eq!(alert.details.get("new_risk").map(String::as_str), Some("critical"));
    assert_eq!(alert.details.get("direction").map(String::as_str), Some("escalated"));
    assert_eq!(
        alert.details.get("assessment_id"),
        Some(&escalated.id.0)
    );
}

#[test]
fn alert_failure_does_not_fail_the_assessment() {
    let directory = Arc::new(MemoryDirectory::default());
    directory.add_worker("org-a", "w-a1", full_time_signals());
    let store = Arc::new(MemoryStore::default());
    let service = ClassificationService::with_clock(
        store.clone(),
        directory,
        Arc::new(OfflineAlerts),
        ScoringConfig::default(),
        Arc::new(SteppingClock::default()),
    )
    .expect("valid policy");
    let worker_id = worker("w-a1");

    service
        .run_assessment(&worker_id, &org("org-a"))
        .expect("baseline run");
    for submission in employee_like_overrides() {
        service
            .submit_manual_factor(&worker_id, submission)
            .expect("factor stored");
    }
    let escalated = service
        .run_assessment(&worker_id, &org("org-a"))
        .expect("alert failure is swallowed");

    assert_eq!(escalated.overall_risk, RiskTier::Critical);
    assert_eq!(store.assessments_for(&worker_id).len(), 2);
}

#[test]
fn manual_overrides_flow_into_the_input_snapshot() {
    let Harness { service, .. } = harness();
    let worker_id = worker("w-a2");

    submit_all(&service, &worker_id, independent_overrides());
    let assessment = service
        .run_assessment(&worker_id, &org("org-a"))
        .expect("assessment runs");

    assert_eq!(assessment.input_data.supervision_level, Some(Level::Low));
    assert_eq!(assessment.input_data.multiple_clients, Some(true));
    assert_eq!(assessment.input_data.hours_per_week, Some(10.0));
    assert!(assessment.abc.all_prongs_pass);
    assert_eq!(assessment.overall_score, 0.0);
    assert_eq!(assessment.overall_risk, RiskTier::Low);
}

#[test]
fn newest_override_per_category_wins() {
    let Harness { service, .. } = harness();
    let worker_id = worker("w-a2");

    submit_all(
        &service,
        &worker_id,
        vec![
            manual(FactorCategory::SetSchedule, FactorValue::Boolean(true)),
            manual(FactorCategory::SetSchedule, FactorValue::Boolean(false)),
        ],
    );
    let assessment = service
        .run_assessment(&worker_id, &org("org-a"))
        .expect("assessment runs");

    assert_eq!(assessment.input_data.set_schedule, Some(false));
}

#[test]
fn computed_factor_failure_persists_nothing() {
    let Harness {
        service,
        store,
        directory,
        ..
    } = harness();
    directory.fail_worker("w-a1");

    match service.run_assessment(&worker("w-a1"), &org("org-a")) {
        Err(ClassificationServiceError::Assessment(AssessmentError::ComputedFactors {
            worker_id,
            source: RepositoryError::Unavailable(_),
        })) => assert_eq!(worker_id, worker("w-a1")),
        other => panic!("expected computed factor failure, got {other:?}"),
    }
    assert_eq!(store.assessment_count(), 0);
}

#[test]
fn persistence_failure_propagates() {
    let Harness { service, store, .. } = harness();
    store.fail_inserts.store(true, Ordering::SeqCst);

    match service.run_assessment(&worker("w-a1"), &org("org-a")) {
        Err(ClassificationServiceError::Assessment(err @ AssessmentError::Persist { .. })) => {
            assert_eq!(err.worker_id(), &worker("w-a1"));
        }
        other => panic!("expected persist failure, got {other:?}"),
    }
}

#[test]
fn orchestrator_is_usable_without_the_service() {
    let directory = Arc::new(MemoryDirectory::default());
    directory.add_worker("org-a", "w-a2", part_time_signals());
    let store = Arc::new(MemoryStore::default());
    let orchestrator = AssessmentOrchestrator::new(
        store.clone(),
        directory,
        Arc::new(MemoryAlerts::default()),
        Arc::new(ScoringEngine::default()),
        Arc::new(SteppingClock::default()),
    );

    let assessment = orchestrator
        .run(&worker("w-a2"), &org("org-a"))
        .expect("assessment runs");

    assert_eq!(assessment.irs.score, 0);
    assert_eq!(assessment.dol.score, 0);
    assert_eq!(assessment.overall_risk, RiskTier::Medium);
    assert_eq!(store.assessment_count(), 1);
}
