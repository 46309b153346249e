pub mod abc;
pub mod aggregate;
mod config;
pub mod dol;
pub mod irs;

pub use abc::{AbcBreakdown, ProngResult};
pub use aggregate::{AggregateScore, RiskTier};
pub use config::{
    AbcWeights, AggregationWeights, DolWeights, DurationScale, DurationStep, IrsWeights,
    LevelScale, PolicyError, RiskThresholds, ScoringConfig,
};
pub use dol::{CompositeFactor, DolBreakdown};
pub use irs::{BehavioralControl, FinancialControl, IrsBreakdown, RelationshipType};

use serde::{Deserialize, Serialize};

use super::domain::ClassificationInputData;

/// Points awarded to a single sub-factor alongside the most it could have earned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorScore {
    pub score: u32,
    pub weight: u32,
}

impl FactorScore {
    pub(crate) fn when(indicated: bool, weight: u32) -> Self {
        Self {
            score: if indicated { weight } else { 0 },
            weight,
        }
    }
}

/// Stateless engine binding a scoring policy to the three tests and the aggregator.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

/// Output of one pass over the three tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestScores {
    pub irs: IrsBreakdown,
    pub dol: DolBreakdown,
    pub abc: AbcBreakdown,
    pub aggregate: AggregateScore,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Result<Self, PolicyError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn score(&self, input: &ClassificationInputData) -> TestScores {
        let irs = irs::score(input, &self.config.irs);
        let dol = dol::score(input, &self.config.dol);
        let abc = abc::score(input, &self.config.abc);
        let aggregate = self.aggregate(
            f64::from(irs.score),
            f64::from(dol.score),
            f64::from(abc.score),
        );

        TestScores {
            irs,
            dol,
            abc,
            aggregate,
        }
    }

    pub fn aggregate(&self, irs: f64, dol: f64, abc: f64) -> AggregateScore {
        aggregate::aggregate(
            irs,
            dol,
            abc,
            &self.config.aggregation,
            &self.config.thresholds,
        )
    }

    pub fn tier_for(&self, score: f64) -> RiskTier {
        aggregate::tier_for(score, &self.config.thresholds)
    }
}
