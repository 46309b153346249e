use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::scoring::{AbcBreakdown, DolBreakdown, IrsBreakdown, RiskTier};

/// Identifier wrapper for a contracted worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(pub String);

/// Identifier wrapper for the hiring organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrganizationId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssessmentId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactorId(pub String);

/// Record id of the form `{prefix}-{unix micros}-{sequence}`.
///
/// The timestamp keeps ids from a restarted process clear of ones already stored; the
/// sequence separates records created within the same microsecond.
pub(crate) fn timestamped_id(prefix: &str, at: DateTime<Utc>, sequence: &AtomicU64) -> String {
    let seq = sequence.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{seq:06}", at.timestamp_micros())
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Three-step ordinal used for supervision and integration signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    pub fn label(&self) -> &'static str {
        match self {
            Level::Low => "low",
            Level::Medium => "medium",
            Level::High => "high",
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Level::Low),
            "medium" => Ok(Level::Medium),
            "high" => Ok(Level::High),
            other => Err(format!("'{other}' is not one of low, medium, high")),
        }
    }
}

/// Sparse set of signals fed to the three scorers.
///
/// Every field is optional and an absent value is meaningful: each scorer documents the
/// branch an unknown signal falls into.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationInputData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours_per_week: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement_duration_weeks: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusivity_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_schedule: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools_provided: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training_provided: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supervision_level: Option<Level>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration_level: Option<Level>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_clients: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_loss_opportunity: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub significant_investment: Option<bool>,
}

/// Kind of value a factor category expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorValueKind {
    Numeric,
    Boolean,
    Text,
}

/// One category per [`ClassificationInputData`] field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorCategory {
    HoursPerWeek,
    EngagementDurationWeeks,
    ExclusivityRatio,
    SetSchedule,
    ToolsProvided,
    TrainingProvided,
    SupervisionLevel,
    IntegrationLevel,
    MultipleClients,
    ProfitLossOpportunity,
    SignificantInvestment,
}

impl FactorCategory {
    pub const ALL: [FactorCategory; 11] = [
        FactorCategory::HoursPerWeek,
        FactorCategory::EngagementDurationWeeks,
        FactorCategory::ExclusivityRatio,
        FactorCategory::SetSchedule,
        FactorCategory::ToolsProvided,
        FactorCategory::TrainingProvided,
        FactorCategory::SupervisionLevel,
        FactorCategory::IntegrationLevel,
        FactorCategory::MultipleClients,
        FactorCategory::ProfitLossOpportunity,
        FactorCategory::SignificantInvestment,
    ];

    pub fn value_kind(&self) -> FactorValueKind {
        match self {
            FactorCategory::HoursPerWeek
            | FactorCategory::EngagementDurationWeeks
            | FactorCategory::ExclusivityRatio => FactorValueKind::Numeric,
            FactorCategory::SupervisionLevel | FactorCategory::IntegrationLevel => {
                FactorValueKind::Text
            }
            FactorCategory::SetSchedule
            | FactorCategory::ToolsProvided
            | FactorCategory::TrainingProvided
            | FactorCategory::MultipleClients
            | FactorCategory::ProfitLossOpportunity
            | FactorCategory::SignificantInvestment => FactorValueKind::Boolean,
        }
    }

    /// Writes `value` into the field this category owns.
    ///
    /// Returns `false` and leaves `input` untouched when the value has the wrong shape
    /// for the category (or a text value is not a recognised level).
    pub fn apply(&self, value: &FactorValue, input: &mut ClassificationInputData) -> bool {
        match self {
            FactorCategory::HoursPerWeek => set_numeric(&mut input.hours_per_week, value),
            FactorCategory::EngagementDurationWeeks => {
                set_numeric(&mut input.engagement_duration_weeks, value)
            }
            FactorCategory::ExclusivityRatio => set_numeric(&mut input.exclusivity_ratio, value),
            FactorCategory::SetSchedule => set_boolean(&mut input.set_schedule, value),
            FactorCategory::ToolsProvided => set_boolean(&mut input.tools_provided, value),
            FactorCategory::TrainingProvided => set_boolean(&mut input.training_provided, value),
            FactorCategory::SupervisionLevel => set_level(&mut input.supervision_level, value),
            FactorCategory::IntegrationLevel => set_level(&mut input.integration_level, value),
            FactorCategory::MultipleClients => set_boolean(&mut input.multiple_clients, value),
            FactorCategory::ProfitLossOpportunity => {
                set_boolean(&mut input.profit_loss_opportunity, value)
            }
            FactorCategory::SignificantInvestment => {
                set_boolean(&mut input.significant_investment, value)
            }
        }
    }
}

fn set_numeric(field: &mut Option<f64>, value: &FactorValue) -> bool {
    match value {
        FactorValue::Numeric(number) if number.is_finite() => {
            *field = Some(*number);
            true
        }
        _ => false,
    }
}

fn set_boolean(field: &mut Option<bool>, value: &FactorValue) -> bool {
    match value {
        FactorValue::Boolean(flag) => {
            *field = Some(*flag);
            true
        }
        _ => false,
    }
}

fn set_level(field: &mut Option<Level>, value: &FactorValue) -> bool {
    match value {
        FactorValue::Text(raw) => match raw.parse::<Level>() {
            Ok(level) => {
                *field = Some(level);
                true
            }
            Err(_) => false,
        },
        _ => false,
    }
}

/// Value carried by a factor record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorValue {
    Numeric(f64),
    Boolean(bool),
    Text(String),
}

impl FactorValue {
    pub fn kind(&self) -> FactorValueKind {
        match self {
            FactorValue::Numeric(_) => FactorValueKind::Numeric,
            FactorValue::Boolean(_) => FactorValueKind::Boolean,
            FactorValue::Text(_) => FactorValueKind::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorSource {
    Computed,
    Manual,
}

/// Immutable fact about one worker. Corrections are new records, never edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationFactor {
    pub id: FactorId,
    pub worker_id: WorkerId,
    pub category: FactorCategory,
    pub value: FactorValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_end: Option<NaiveDate>,
    pub source: FactorSource,
    pub created_at: DateTime<Utc>,
}

/// Payload accepted when a reviewer records an override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualFactorSubmission {
    pub category: FactorCategory,
    pub value: FactorValue,
    #[serde(default)]
    pub period_start: Option<NaiveDate>,
    #[serde(default)]
    pub period_end: Option<NaiveDate>,
}

/// Trailing-window aggregates supplied by the time and engagement modules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComputedFactors {
    pub avg_weekly_hours: f64,
    pub total_weeks: u32,
    pub active_engagement_count: u32,
}

/// Append-only snapshot of one scoring run for one worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationAssessment {
    pub id: AssessmentId,
    pub worker_id: WorkerId,
    pub organization_id: OrganizationId,
    pub assessed_at: DateTime<Utc>,
    pub overall_risk: RiskTier,
    pub overall_score: f64,
    pub irs: IrsBreakdown,
    pub dol: DolBreakdown,
    pub abc: AbcBreakdown,
    pub input_data: ClassificationInputData,
}

/// Source of "now" for the pipeline so runs stay reproducible under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
