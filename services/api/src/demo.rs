use crate::infra::{
    seed_demo_roster, ChannelAlertPublisher, InMemoryClassificationStore,
    InMemoryWorkforceDirectory,
};
use clap::Args;
use misclass_guard::classification::merge::baseline_input;
use misclass_guard::classification::scoring::{AbcBreakdown, TestScores};
use misclass_guard::classification::{
    ClassificationService, ClassificationServiceError, ClassificationStore, ComputedFactors,
    DashboardSummary, FactorCategory, FactorValue, Level, ManualFactorSubmission,
    OrganizationId, RiskAlertPublisher, ScoringConfig, ScoringEngine, WorkerId,
    WorkforceDirectory,
};
use misclass_guard::error::AppError;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct AssessArgs {
    /// Average weekly hours over the trailing 90 days
    #[arg(long, default_value_t = 40.0)]
    pub(crate) hours: f64,
    /// Distinct weeks with logged time in the trailing 90 days
    #[arg(long, default_value_t = 13)]
    pub(crate) weeks: u32,
    /// Currently active engagements
    #[arg(long, default_value_t = 1)]
    pub(crate) engagements: u32,
    /// Supervision level override (low, medium, high)
    #[arg(long, value_parser = parse_level)]
    pub(crate) supervision: Option<Level>,
    /// Integration level override (low, medium, high)
    #[arg(long, value_parser = parse_level)]
    pub(crate) integration: Option<Level>,
    /// Whether the hiring entity sets the schedule
    #[arg(long)]
    pub(crate) set_schedule: Option<bool>,
    /// Whether the hiring entity provides tools
    #[arg(long)]
    pub(crate) tools_provided: Option<bool>,
    /// Optional JSON scoring policy replacing the default weights
    #[arg(long)]
    pub(crate) policy: Option<PathBuf>,
    /// Emit the full breakdown as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of top-risk workers listed per organization
    #[arg(long, default_value_t = 5)]
    pub(crate) top_n: usize,
    /// Skip the reviewer override step between the two cycles
    #[arg(long)]
    pub(crate) skip_overrides: bool,
}

fn parse_level(raw: &str) -> Result<Level, String> {
    raw.parse()
}

pub(crate) fn run_assess(args: AssessArgs) -> Result<(), AppError> {
    let config = match &args.policy {
        Some(path) => ScoringConfig::from_json_file(path)?,
        None => ScoringConfig::default(),
    };
    let engine = ScoringEngine::new(config)?;

    let mut input = baseline_input(&ComputedFactors {
        avg_weekly_hours: args.hours,
        total_weeks: args.weeks,
        active_engagement_count: args.engagements,
    });
    let overrides = [
        (
            FactorCategory::SupervisionLevel,
            args.supervision.map(|level| FactorValue::Text(level.label().to_string())),
        ),
        (
            FactorCategory::IntegrationLevel,
            args.integration.map(|level| FactorValue::Text(level.label().to_string())),
        ),
        (
            FactorCategory::SetSchedule,
            args.set_schedule.map(FactorValue::Boolean),
        ),
        (
            FactorCategory::ToolsProvided,
            args.tools_provided.map(FactorValue::Boolean),
        ),
    ];
    for (category, value) in overrides {
        if let Some(value) = value {
            category.apply(&value, &mut input);
        }
    }

    let scores = engine.score(&input);
    if args.json {
        let rendered = serde_json::json!({
            "input_data": input,
            "irs": scores.irs,
            "dol": scores.dol,
            "abc": scores.abc,
            "overall_score": scores.aggregate.overall_score,
            "overall_risk": scores.aggregate.overall_risk,
        });
        println!("{rendered:#}");
    } else {
        render_scores(&scores);
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let directory = Arc::new(InMemoryWorkforceDirectory::default());
    seed_demo_roster(&directory).map_err(|err| AppError::Classification(err.into()))?;
    let (alerts, mut alert_feed) = ChannelAlertPublisher::new();
    let service = ClassificationService::new(
        Arc::new(InMemoryClassificationStore::new(args.top_n)),
        directory.clone(),
        Arc::new(alerts),
        ScoringConfig::default(),
    )?;

    println!("Misclassification risk demo");
    println!("\nCycle 1: computed signals only");
    let report = service.run_reassessment_batch()?;
    println!(
        "- {} organizations | {} workers assessed | {} failures",
        report.organizations,
        report.succeeded,
        report.failed()
    );
    render_dashboards(&service, directory.as_ref())?;

    if args.skip_overrides {
        return Ok(());
    }

    let flagged = WorkerId("nw-contractor-ada".to_string());
    println!("\nReviewer records on-site findings for {flagged}");
    for submission in reviewer_findings() {
        let factor = service.submit_manual_factor(&flagged, submission)?;
        println!("- {:?} = {:?}", factor.category, factor.value);
    }

    println!("\nCycle 2: computed signals plus reviewer findings");
    let report = service.run_reassessment_batch()?;
    println!(
        "- {} workers assessed | summary refreshed: {}",
        report.succeeded, report.summary_refreshed
    );
    render_dashboards(&service, directory.as_ref())?;

    println!("\nAdmin alerts");
    let mut delivered = 0;
    while let Ok(alert) = alert_feed.try_recv() {
        delivered += 1;
        println!("- [{}] {}", alert.organization_id, alert.title);
        println!("  {}", alert.body);
    }
    if delivered == 0 {
        println!("- none");
    }

    let latest = service.latest_assessment(&flagged)?;
    println!("\nLatest assessment for {flagged}");
    render_abc_explanations(&latest.abc);
    Ok(())
}

fn reviewer_findings() -> Vec<ManualFactorSubmission> {
    let finding = |category, value| ManualFactorSubmission {
        category,
        value,
        period_start: None,
        period_end: None,
    };
    vec![
        finding(FactorCategory::SetSchedule, FactorValue::Boolean(true)),
        finding(FactorCategory::ToolsProvided, FactorValue::Boolean(true)),
        finding(FactorCategory::TrainingProvided, FactorValue::Boolean(true)),
        finding(
            FactorCategory::SupervisionLevel,
            FactorValue::Text("high".to_string()),
        ),
        finding(
            FactorCategory::IntegrationLevel,
            FactorValue::Text("high".to_string()),
        ),
        finding(
            FactorCategory::SignificantInvestment,
            FactorValue::Boolean(false),
        ),
    ]
}

fn render_dashboards<S, D, A>(
    service: &ClassificationService<S, D, A>,
    directory: &InMemoryWorkforceDirectory,
) -> Result<(), AppError>
where
    S: ClassificationStore + 'static,
    D: WorkforceDirectory + 'static,
    A: RiskAlertPublisher + 'static,
{
    let organizations = directory
        .all_organization_ids()
        .map_err(ClassificationServiceError::from)?;
    for organization_id in organizations {
        let summary = service.dashboard_summary(&organization_id)?;
        render_dashboard(&organization_id, &summary);
    }
    Ok(())
}

fn render_dashboard(organization_id: &OrganizationId, summary: &DashboardSummary) {
    let counts = summary.counts_by_tier;
    println!(
        "  {organization_id}: low {} | medium {} | high {} | critical {}",
        counts.low, counts.medium, counts.high, counts.critical
    );
    for entry in &summary.top_risk_workers {
        println!(
            "    - {} {:.1} ({})",
            entry.worker_id,
            entry.overall_score,
            entry.overall_risk.label()
        );
    }
}

fn render_scores(scores: &TestScores) {
    println!(
        "Overall {:.1} ({})",
        scores.aggregate.overall_score,
        scores.aggregate.overall_risk.label()
    );
    println!(
        "- IRS {} (behavioral {} | financial {} | relationship {})",
        scores.irs.score,
        scores.irs.behavioral_control.score,
        scores.irs.financial_control.score,
        scores.irs.relationship_type.score
    );
    println!(
        "- DOL {} (employer control {}/{} indicators | skill {}/{} indicators)",
        scores.dol.score,
        scores.dol.employer_control.indicators_met,
        scores.dol.employer_control.indicators_total,
        scores.dol.skill_initiative.indicators_met,
        scores.dol.skill_initiative.indicators_total
    );
    println!("- ABC {}", scores.abc.score);
    render_abc_explanations(&scores.abc);
}

fn render_abc_explanations(abc: &AbcBreakdown) {
    for (label, prong) in [
        ("A", &abc.prong_a_free_from_control),
        ("B", &abc.prong_b_outside_usual_business),
        ("C", &abc.prong_c_independent_trade),
    ] {
        let verdict = if prong.passed { "pass" } else { "fail" };
        println!("  prong {label} {verdict}: {}", prong.explanation);
    }
}
