use serde_json::Value;

use crate::models::{FieldDefinition, Metric, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotNumeric,
    MissingTarget,
    MissingValue,
    InvalidTarget,
    InvalidValue,
}

impl SkipReason {
    pub fn label(self) -> &'static str {
        match self {
            SkipReason::NotNumeric => "field type is not numeric",
            SkipReason::MissingTarget => "no target set",
            SkipReason::MissingValue => "no submitted value",
            SkipReason::InvalidTarget => "target is not a finite number",
            SkipReason::InvalidValue => "submitted value is not a finite number",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Scored(Metric),
    Skipped(SkipReason),
}

pub fn evaluate_field(field: &FieldDefinition, value: Option<&Value>) -> Evaluation {
    if !field.is_numeric() {
        return Evaluation::Skipped(SkipReason::NotNumeric);
    }
    let Some(target) = field.target.as_ref().filter(|target| !target.is_null()) else {
        return Evaluation::Skipped(SkipReason::MissingTarget);
    };
    let Some(actual) = value.filter(|value| !value.is_null()) else {
        return Evaluation::Skipped(SkipReason::MissingValue);
    };
    let Some(target) = parse_number(target) else {
        return Evaluation::Skipped(SkipReason::InvalidTarget);
    };
    let Some(actual) = parse_number(actual) else {
        return Evaluation::Skipped(SkipReason::InvalidValue);
    };

    let achievement = achievement(actual, target);
    Evaluation::Scored(Metric {
        field: field.display_label().to_string(),
        target,
        actual,
        unit: field.unit.clone().unwrap_or_default(),
        achievement,
        variance: variance(actual, target),
        status: status_for(achievement),
    })
}

/// Accepts JSON numbers and numeric strings; anything else, or a non-finite
/// result, is not a number.
pub fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

pub fn achievement(actual: f64, target: f64) -> f64 {
    if target == 0.0 {
        return if actual == 0.0 { 100.0 } else { 0.0 };
    }
    round2(actual / target * 100.0)
}

pub fn variance(actual: f64, target: f64) -> f64 {
    round2(actual - target)
}

pub fn status_for(achievement: f64) -> Status {
    if achievement >= 100.0 {
        Status::Excellent
    } else if achievement >= 80.0 {
        Status::Good
    } else if achievement >= 60.0 {
        Status::Fair
    } else {
        Status::NeedsImprovement
    }
}

/// Rounds the exact binary value to two decimals, ties to even.
pub fn round2(value: f64) -> f64 {
    format!("{value:.2}").parse().unwrap_or(value)
}
