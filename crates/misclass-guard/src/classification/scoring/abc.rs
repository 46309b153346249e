//! California ABC test.
//!
//! Each prong is pass/fail and a failed prong contributes its full weight. An unknown
//! signal never satisfies a prong: the hiring entity carries the burden of proving
//! independence, so this test is deliberately stricter than the IRS and DOL defaults.

use serde::{Deserialize, Serialize};

use super::config::AbcWeights;
use crate::classification::domain::{ClassificationInputData, Level};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProngResult {
    pub passed: bool,
    pub weight: u32,
    pub score: u32,
    pub explanation: String,
    pub unmet_conditions: Vec<String>,
}

impl ProngResult {
    fn evaluate(weight: u32, passed_summary: &str, failed_prefix: &str, unmet: Vec<String>) -> Self {
        let passed = unmet.is_empty();
        let explanation = if passed {
            passed_summary.to_string()
        } else {
            format!("{failed_prefix}: {}", unmet.join("; "))
        };

        Self {
            passed,
            weight,
            score: if passed { 0 } else { weight },
            explanation,
            unmet_conditions: unmet,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbcBreakdown {
    pub score: u32,
    pub all_prongs_pass: bool,
    pub prong_a_free_from_control: ProngResult,
    pub prong_b_outside_usual_business: ProngResult,
    pub prong_c_independent_trade: ProngResult,
}

pub fn score(input: &ClassificationInputData, weights: &AbcWeights) -> AbcBreakdown {
    let prong_a = prong_a(input, weights.prong_a);
    let prong_b = prong_b(input, weights.prong_b);
    let prong_c = prong_c(input, weights.prong_c);

    AbcBreakdown {
        score: prong_a.score + prong_b.score + prong_c.score,
        all_prongs_pass: prong_a.passed && prong_b.passed && prong_c.passed,
        prong_a_free_from_control: prong_a,
        prong_b_outside_usual_business: prong_b,
        prong_c_independent_trade: prong_c,
    }
}

fn prong_a(input: &ClassificationInputData, weight: u32) -> ProngResult {
    let mut unmet = Vec::new();

    match input.set_schedule {
        Some(false) => {}
        Some(true) => unmet.push("hiring entity sets the work schedule".to_string()),
        None => unmet.push("control over the schedule is not established".to_string()),
    }
    match input.tools_provided {
        Some(false) => {}
        Some(true) => unmet.push("hiring entity provides tools".to_string()),
        None => unmet.push("ownership of tools is not established".to_string()),
    }
    match input.supervision_level {
        Some(Level::High) => unmet.push("worker is closely supervised".to_string()),
        Some(_) => {}
        None => unmet.push("supervision level is not established".to_string()),
    }

    ProngResult::evaluate(
        weight,
        "free from control: worker sets own schedule, uses own tools, and is not closely supervised",
        "not free from control",
        unmet,
    )
}

fn prong_b(input: &ClassificationInputData, weight: u32) -> ProngResult {
    let unmet = match input.integration_level {
        Some(Level::Low) => Vec::new(),
        Some(level) => vec![format!(
            "integration with the hiring entity's business is {}",
            level.label()
        )],
        None => vec!["integration with the hiring entity's business is not established".to_string()],
    };

    ProngResult::evaluate(
        weight,
        "work is outside the usual course of the hiring entity's business",
        "within the usual course of business",
        unmet,
    )
}

fn prong_c(input: &ClassificationInputData, weight: u32) -> ProngResult {
    let mut unmet = Vec::new();

    match input.multiple_clients {
        Some(true) => {}
        Some(false) => unmet.push("worker serves no other clients".to_string()),
        None => unmet.push("other clients are not established".to_string()),
    }
    match input.significant_investment {
        Some(true) => {}
        Some(false) => unmet.push("worker has no significant business investment".to_string()),
        None => unmet.push("business investment is not established".to_string()),
    }

    ProngResult::evaluate(
        weight,
        "worker is customarily engaged in an independently established trade",
        "no independently established trade",
        unmet,
    )
}
