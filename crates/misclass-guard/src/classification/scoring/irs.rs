//! IRS common-law control test.
//!
//! Three groups are summed independently. Behavioral and relationship indicators score when
//! present; the financial group is inverted so that an explicit lack of independence signals
//! scores as employee-like. Absent signals take the non-scoring branch.

use serde::{Deserialize, Serialize};

use super::config::IrsWeights;
use super::FactorScore;
use crate::classification::domain::{ClassificationInputData, Level};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehavioralControl {
    pub score: u32,
    pub instructions_given: FactorScore,
    pub training_provided: FactorScore,
    pub set_work_hours: FactorScore,
    pub tools_provided: FactorScore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialControl {
    pub score: u32,
    pub significant_investment: FactorScore,
    pub unreimbursed_expenses: FactorScore,
    pub opportunity_profit_loss: FactorScore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipType {
    pub score: u32,
    pub written_contract_type: FactorScore,
    pub benefits_provided: FactorScore,
    pub permanency: FactorScore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrsBreakdown {
    pub score: u32,
    pub behavioral_control: BehavioralControl,
    pub financial_control: FinancialControl,
    pub relationship_type: RelationshipType,
}

pub fn score(input: &ClassificationInputData, weights: &IrsWeights) -> IrsBreakdown {
    let behavioral_control = behavioral(input, weights);
    let financial_control = financial(input, weights);
    let relationship_type = relationship(input, weights);

    IrsBreakdown {
        score: behavioral_control.score + financial_control.score + relationship_type.score,
        behavioral_control,
        financial_control,
        relationship_type,
    }
}

fn behavioral(input: &ClassificationInputData, weights: &IrsWeights) -> BehavioralControl {
    let trained = input.training_provided == Some(true);
    let closely_supervised = input.supervision_level == Some(Level::High);
    let full_time = input
        .hours_per_week
        .map(|hours| hours > weights.full_time_hours)
        .unwrap_or(false);

    let instructions_given =
        FactorScore::when(trained || closely_supervised, weights.instructions_given);
    let training_provided = FactorScore::when(trained, weights.training_provided);
    let set_work_hours = FactorScore::when(
        full_time || input.set_schedule == Some(true),
        weights.set_work_hours,
    );
    let tools_provided =
        FactorScore::when(input.tools_provided == Some(true), weights.tools_provided);

    BehavioralControl {
        score: instructions_given.score
            + training_provided.score
            + set_work_hours.score
            + tools_provided.score,
        instructions_given,
        training_provided,
        set_work_hours,
        tools_provided,
    }
}

fn financial(input: &ClassificationInputData, weights: &IrsWeights) -> FinancialControl {
    let significant_investment = FactorScore::when(
        input.significant_investment == Some(false),
        weights.significant_investment,
    );
    // Provided tooling means the worker carries no unreimbursed expense exposure.
    let unreimbursed_expenses = FactorScore::when(
        input.tools_provided == Some(true),
        weights.unreimbursed_expenses,
    );
    let opportunity_profit_loss = FactorScore::when(
        input.profit_loss_opportunity == Some(false),
        weights.opportunity_profit_loss,
    );

    FinancialControl {
        score: significant_investment.score
            + unreimbursed_expenses.score
            + opportunity_profit_loss.score,
        significant_investment,
        unreimbursed_expenses,
        opportunity_profit_loss,
    }
}

fn relationship(input: &ClassificationInputData, weights: &IrsWeights) -> RelationshipType {
    let integrated = input.integration_level == Some(Level::High);

    let written_contract_type = FactorScore::when(integrated, weights.written_contract_type);
    let benefits_provided = FactorScore::when(integrated, weights.benefits_provided);
    let permanency = FactorScore {
        score: weights
            .permanency
            .points_for(input.engagement_duration_weeks),
        weight: weights.permanency.max_points(),
    };

    RelationshipType {
        score: written_contract_type.score + benefits_provided.score + permanency.score,
        written_contract_type,
        benefits_provided,
        permanency,
    }
}
