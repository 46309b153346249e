//! DOL economic-realities test: six independently weighted factors.

use serde::{Deserialize, Serialize};

use super::config::DolWeights;
use super::FactorScore;
use crate::classification::domain::{ClassificationInputData, Level};

/// Factor scored from the share of its indicators that point toward dependence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeFactor {
    pub score: u32,
    pub weight: u32,
    pub indicators_met: u32,
    pub indicators_total: u32,
}

impl CompositeFactor {
    fn from_indicators(indicators: &[bool], weight: u32) -> Self {
        let indicators_total = indicators.len() as u32;
        let indicators_met = indicators.iter().filter(|met| **met).count() as u32;
        let score = if indicators_total == 0 {
            0
        } else {
            (f64::from(indicators_met) / f64::from(indicators_total) * f64::from(weight)).round()
                as u32
        };

        Self {
            score,
            weight,
            indicators_met,
            indicators_total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DolBreakdown {
    pub score: u32,
    pub opportunity_profit_loss: FactorScore,
    pub investment: FactorScore,
    pub permanence: FactorScore,
    pub employer_control: CompositeFactor,
    pub integral_to_business: FactorScore,
    pub skill_initiative: CompositeFactor,
}

pub fn score(input: &ClassificationInputData, weights: &DolWeights) -> DolBreakdown {
    let opportunity_profit_loss = FactorScore::when(
        input.profit_loss_opportunity == Some(false),
        weights.opportunity_profit_loss,
    );
    let investment = FactorScore::when(
        input.significant_investment == Some(false),
        weights.investment,
    );
    let permanence = FactorScore {
        score: weights
            .permanence
            .points_for(input.engagement_duration_weeks),
        weight: weights.permanence.max_points(),
    };
    let employer_control = CompositeFactor::from_indicators(
        &[
            input.set_schedule == Some(true),
            input.tools_provided == Some(true),
            input.supervision_level == Some(Level::High),
        ],
        weights.employer_control,
    );
    let integral_to_business = FactorScore {
        score: weights
            .integral_to_business
            .points_for(input.integration_level),
        weight: weights.integral_to_business.max_points(),
    };
    let skill_initiative = CompositeFactor::from_indicators(
        &[
            input.multiple_clients == Some(false),
            input.significant_investment == Some(false),
        ],
        weights.skill_initiative,
    );

    DolBreakdown {
        score: opportunity_profit_loss.score
            + investment.score
            + permanence.score
            + employer_control.score
            + integral_to_business.score
            + skill_initiative.score,
        opportunity_profit_loss,
        investment,
        permanence,
        employer_control,
        integral_to_business,
        skill_initiative,
    }
}
