use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classification::domain::Level;

const WEIGHT_TOTAL: u64 = 100;
const AGGREGATION_TOLERANCE: f64 = 1e-9;

/// Complete scoring rubric: per-test factor weights, aggregation weights, and tier bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScoringConfig {
    pub irs: IrsWeights,
    pub dol: DolWeights,
    pub abc: AbcWeights,
    pub aggregation: AggregationWeights,
    pub thresholds: RiskThresholds,
}

impl ScoringConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| PolicyError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: ScoringConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the structural invariants the scorers rely on.
    pub fn validate(&self) -> Result<(), PolicyError> {
        check_total("irs", self.irs.max_total())?;
        check_total("dol", self.dol.max_total())?;
        check_total("abc", self.abc.max_total())?;

        let sum = self.aggregation.irs + self.aggregation.dol + self.aggregation.abc;
        let weights = [self.aggregation.irs, self.aggregation.dol, self.aggregation.abc];
        if weights.iter().any(|weight| !weight.is_finite() || *weight < 0.0)
            || (sum - 1.0).abs() > AGGREGATION_TOLERANCE
        {
            return Err(PolicyError::AggregationWeights(sum));
        }

        let RiskThresholds {
            medium,
            high,
            critical,
        } = self.thresholds;
        if !(0.0 < medium && medium < high && high < critical && critical <= 100.0) {
            return Err(PolicyError::Thresholds {
                medium,
                high,
                critical,
            });
        }

        Ok(())
    }
}

fn check_total(test: &'static str, total: u64) -> Result<(), PolicyError> {
    if total == WEIGHT_TOTAL {
        Ok(())
    } else {
        Err(PolicyError::FactorWeights { test, total })
    }
}

/// Points awarded by engagement length; the highest threshold the duration exceeds wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationScale {
    pub steps: Vec<DurationStep>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationStep {
    pub above_weeks: f64,
    pub points: u32,
}

impl DurationScale {
    pub fn new(steps: &[(f64, u32)]) -> Self {
        Self {
            steps: steps
                .iter()
                .map(|&(above_weeks, points)| DurationStep {
                    above_weeks,
                    points,
                })
                .collect(),
        }
    }

    pub fn points_for(&self, weeks: Option<f64>) -> u32 {
        let Some(weeks) = weeks else {
            return 0;
        };
        self.steps
            .iter()
            .filter(|step| weeks > step.above_weeks)
            .max_by(|a, b| a.above_weeks.total_cmp(&b.above_weeks))
            .map(|step| step.points)
            .unwrap_or(0)
    }

    pub fn max_points(&self) -> u32 {
        self.steps.iter().map(|step| step.points).max().unwrap_or(0)
    }
}

/// Points per level for ordinal signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelScale {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
}

impl LevelScale {
    pub fn points_for(&self, level: Option<Level>) -> u32 {
        match level {
            Some(Level::High) => self.high,
            Some(Level::Medium) => self.medium,
            Some(Level::Low) => self.low,
            None => 0,
        }
    }

    pub fn max_points(&self) -> u32 {
        self.low.max(self.medium).max(self.high)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrsWeights {
    pub instructions_given: u32,
    pub training_provided: u32,
    pub set_work_hours: u32,
    /// Weekly hours above which the schedule is treated as set by the hiring entity.
    pub full_time_hours: f64,
    pub tools_provided: u32,
    pub significant_investment: u32,
    pub unreimbursed_expenses: u32,
    pub opportunity_profit_loss: u32,
    pub written_contract_type: u32,
    pub benefits_provided: u32,
    pub permanency: DurationScale,
}

impl IrsWeights {
    /// Summed in `u64` so oversized weights are rejected rather than wrapped.
    pub fn max_total(&self) -> u64 {
        [
            self.instructions_given,
            self.training_provided,
            self.set_work_hours,
            self.tools_provided,
            self.significant_investment,
            self.unreimbursed_expenses,
            self.opportunity_profit_loss,
            self.written_contract_type,
            self.benefits_provided,
            self.permanency.max_points(),
        ]
        .into_iter()
        .map(u64::from)
        .sum()
    }
}

impl Default for IrsWeights {
    fn default() -> Self {
        Self {
            instructions_given: 10,
            training_provided: 10,
            set_work_hours: 10,
            full_time_hours: 35.0,
            tools_provided: 10,
            significant_investment: 10,
            unreimbursed_expenses: 10,
            opportunity_profit_loss: 10,
            written_contract_type: 10,
            benefits_provided: 10,
            permanency: DurationScale::new(&[(52.0, 10), (26.0, 7), (12.0, 4)]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DolWeights {
    pub opportunity_profit_loss: u32,
    pub investment: u32,
    pub permanence: DurationScale,
    pub employer_control: u32,
    pub integral_to_business: LevelScale,
    pub skill_initiative: u32,
}

impl DolWeights {
    pub fn max_total(&self) -> u64 {
        [
            self.opportunity_profit_loss,
            self.investment,
            self.permanence.max_points(),
            self.employer_control,
            self.integral_to_business.max_points(),
            self.skill_initiative,
        ]
        .into_iter()
        .map(u64::from)
        .sum()
    }
}

impl Default for DolWeights {
    fn default() -> Self {
        Self {
            opportunity_profit_loss: 17,
            investment: 17,
            permanence: DurationScale::new(&[(52.0, 17), (26.0, 12), (12.0, 6)]),
            employer_control: 17,
            integral_to_business: LevelScale {
                low: 0,
                medium: 8,
                high: 16,
            },
            skill_initiative: 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbcWeights {
    pub prong_a: u32,
    pub prong_b: u32,
    pub prong_c: u32,
}

impl AbcWeights {
    pub fn max_total(&self) -> u64 {
        u64::from(self.prong_a) + u64::from(self.prong_b) + u64::from(self.prong_c)
    }
}

impl Default for AbcWeights {
    fn default() -> Self {
        Self {
            prong_a: 34,
            prong_b: 33,
            prong_c: 33,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregationWeights {
    pub irs: f64,
    pub dol: f64,
    pub abc: f64,
}

impl Default for AggregationWeights {
    fn default() -> Self {
        Self {
            irs: 0.4,
            dol: 0.3,
            abc: 0.3,
        }
    }
}

/// Lower bounds (inclusive) of the medium, high, and critical tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            medium: 25.0,
            high: 50.0,
            critical: 75.0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("{test} factor weights must total 100 (found {total})")]
    FactorWeights { test: &'static str, total: u64 },
    #[error("aggregation weights must be non-negative and total 1.0 (found {0})")]
    AggregationWeights(f64),
    #[error("risk thresholds must satisfy 0 < medium < high < critical <= 100 (found {medium}/{high}/{critical})")]
    Thresholds { medium: f64, high: f64, critical: f64 },
    #[error("failed to read scoring policy {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid scoring policy JSON: {0}")]
    Json(#[from] serde_json::Error),
}
