use std::fmt::Write;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::metrics::{self, Evaluation};
use crate::models::{FieldDefinition, Metric, Report, Statistics, Status, SubmissionValues};

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub metrics: Vec<Metric>,
    pub overall_score: f64,
    pub summary: &'static str,
    pub statistics: Statistics,
}

pub fn aggregate(fields: &[FieldDefinition], values: &SubmissionValues) -> Aggregate {
    let mut metrics = Vec::new();

    for field in fields {
        let value = field.id.as_deref().and_then(|id| values.get(id));
        match metrics::evaluate_field(field, value) {
            Evaluation::Scored(metric) => metrics.push(metric),
            Evaluation::Skipped(reason) => {
                debug!(field = field.display_label(), reason = reason.label(), "skipping field");
            }
        }
    }

    let overall_score = overall_score(&metrics);
    Aggregate {
        statistics: tally(&metrics),
        summary: summary_for(overall_score),
        overall_score,
        metrics,
    }
}

pub fn overall_score(metrics: &[Metric]) -> f64 {
    if metrics.is_empty() {
        return 0.0;
    }
    let total: f64 = metrics.iter().map(|metric| metric.achievement).sum();
    metrics::round2(total / metrics.len() as f64)
}

pub fn summary_for(score: f64) -> &'static str {
    if score >= 90.0 {
        "Outstanding performance! Keep up the excellent work."
    } else if score >= 75.0 {
        "Great progress! You're on the right track."
    } else if score >= 60.0 {
        "Good effort. Focus on areas that need improvement."
    } else {
        "More effort needed. Let's work together to improve your results."
    }
}

fn tally(metrics: &[Metric]) -> Statistics {
    let mut statistics = Statistics {
        total_metrics: metrics.len(),
        ..Statistics::default()
    };

    for metric in metrics {
        match metric.status {
            Status::Excellent => statistics.excellent += 1,
            Status::Good => statistics.good += 1,
            Status::Fair => statistics.fair += 1,
            Status::NeedsImprovement => statistics.needs_improvement += 1,
        }
    }

    statistics
}

pub fn build_report(
    fields: &[FieldDefinition],
    values: &SubmissionValues,
    period: &str,
    generated_at: DateTime<Utc>,
) -> Report {
    let aggregate = aggregate(fields, values);

    Report {
        period: period.to_string(),
        generated_at,
        overall_score: aggregate.overall_score,
        summary: aggregate.summary.to_string(),
        metrics: aggregate.metrics,
        statistics: aggregate.statistics,
    }
}

pub fn render_markdown(report: &Report) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Progress Report");
    let _ = writeln!(
        output,
        "Period: {} (generated {})",
        report.period,
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "Overall score: {:.2}%", report.overall_score);
    let _ = writeln!(output, "{}", report.summary);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Metrics");

    if report.metrics.is_empty() {
        let _ = writeln!(output, "No scorable fields in this submission.");
    } else {
        for metric in report.metrics.iter() {
            let unit = if metric.unit.is_empty() {
                String::new()
            } else {
                format!(" {}", metric.unit)
            };
            let _ = writeln!(
                output,
                "- {}: {}{unit} of {}{unit} ({:.2}%, variance {:+.2}) {} [{}]",
                metric.field,
                metric.actual,
                metric.target,
                metric.achievement,
                metric.variance,
                metric.status.label(),
                metric.status_color()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Status Mix");
    for status in Status::ALL {
        let _ = writeln!(
            output,
            "- {}: {}",
            status.label(),
            report.statistics.count(status)
        );
    }
    let _ = writeln!(output, "- Total: {}", report.statistics.total_metrics);

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::{json, Map, Value};

    fn field(id: &str, target: Value) -> FieldDefinition {
        FieldDefinition {
            id: Some(id.to_string()),
            label: None,
            field_type: "number".to_string(),
            target: Some(target),
            unit: None,
        }
    }

    fn values(value: Value) -> SubmissionValues {
        SubmissionValues::from_value(&value).expect("object payload")
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap()
    }

    #[test]
    fn no_scorable_fields_yields_zero_score() {
        let fields = vec![field("weight", json!(70))];
        let result = aggregate(&fields, &values(json!({ "weight": "not-a-number" })));

        assert!(result.metrics.is_empty());
        assert_eq!(result.overall_score, 0.0);
        assert_eq!(result.statistics, Statistics::default());
        assert_eq!(
            result.summary,
            "More effort needed. Let's work together to improve your results."
        );
    }

    #[test]
    fn overall_score_is_mean_of_achievements() {
        let fields = vec![field("squats", json!(100)), field("lunges", json!(100))];
        let result = aggregate(&fields, &values(json!({ "squats": 90, "lunges": 70 })));

        assert_eq!(result.overall_score, 80.0);
        assert_eq!(result.summary, "Great progress! You're on the right track.");
        assert_eq!(result.statistics.good, 1);
        assert_eq!(result.statistics.fair, 1);
    }

    #[test]
    fn overall_score_is_rounded() {
        let fields = vec![
            field("a", json!(3)),
            field("b", json!(3)),
            field("c", json!(3)),
        ];
        let result = aggregate(&fields, &values(json!({ "a": 1, "b": 1, "c": 2 })));
        // 33.33 + 33.33 + 66.67 = 133.33 / 3
        assert_eq!(result.overall_score, 44.44);
    }

    #[test]
    fn summary_boundaries_are_inclusive() {
        assert_eq!(
            summary_for(90.0),
            "Outstanding performance! Keep up the excellent work."
        );
        assert_eq!(summary_for(89.99), "Great progress! You're on the right track.");
        assert_eq!(summary_for(75.0), "Great progress! You're on the right track.");
        assert_eq!(
            summary_for(60.0),
            "Good effort. Focus on areas that need improvement."
        );
        assert_eq!(
            summary_for(59.99),
            "More effort needed. Let's work together to improve your results."
        );
    }

    #[test]
    fn metrics_follow_form_order() {
        let fields = vec![
            field("c_plank", json!(60)),
            field("a_pushups", json!(50)),
            field("b_squats", json!(40)),
        ];
        let mut map = Map::new();
        map.insert("a_pushups".to_string(), json!(50));
        map.insert("b_squats".to_string(), json!(20));
        map.insert("c_plank".to_string(), json!(45));

        let result = aggregate(&fields, &SubmissionValues::from(map));
        let order: Vec<&str> = result.metrics.iter().map(|m| m.field.as_str()).collect();
        assert_eq!(order, vec!["c_plank", "a_pushups", "b_squats"]);
    }

    #[test]
    fn statistics_always_match_metrics() {
        let mut text = field("notes", json!(1));
        text.field_type = "textarea".to_string();
        let fields = vec![
            field("run", json!(5)),
            field("swim", json!(0)),
            field("bike", json!(0)),
            field("row", json!(10)),
            field("walk", json!(10)),
            text,
            field("missing", json!(10)),
        ];
        let result = aggregate(
            &fields,
            &values(json!({
                "run": 6,
                "swim": 0,
                "bike": 4,
                "row": "6.5",
                "walk": 8,
                "notes": 1
            })),
        );

        let stats = &result.statistics;
        assert_eq!(stats.total_metrics, 5);
        assert_eq!(stats.total_metrics, result.metrics.len());
        assert_eq!(
            stats.excellent + stats.good + stats.fair + stats.needs_improvement,
            stats.total_metrics
        );
        assert_eq!(stats.excellent, 2);
        assert_eq!(stats.good, 1);
        assert_eq!(stats.fair, 1);
        assert_eq!(stats.needs_improvement, 1);
    }

    #[test]
    fn malformed_field_does_not_drop_its_neighbours() {
        let schema = crate::models::FormSchema::from_value(&json!({
            "fields": [
                { "id": "pushups", "type": "number", "target": 50 },
                { "id": "plank", "type": "number", "target": 60, "unit": 5 },
                { "id": "rows", "type": 7, "target": 20 }
            ]
        }))
        .expect("structurally valid form");

        let result = aggregate(
            &schema.fields,
            &values(json!({ "pushups": 55, "plank": 45, "rows": 20 })),
        );

        assert_eq!(result.statistics.total_metrics, 2);
        assert_eq!(result.metrics[0].field, "pushups");
        assert_eq!(result.metrics[0].achievement, 110.0);
        assert_eq!(result.metrics[1].unit, "5");
        assert_eq!(result.metrics[1].achievement, 75.0);
    }

    #[test]
    fn build_report_stamps_period_and_time() {
        let fields = vec![field("pushups", json!(50))];
        let report = build_report(
            &fields,
            &values(json!({ "pushups": 55 })),
            "fortnightly",
            fixed_time(),
        );

        assert_eq!(report.period, "fortnightly");
        assert_eq!(report.generated_at, fixed_time());
        assert_eq!(report.overall_score, 110.0);
        assert_eq!(report.statistics.total_metrics, 1);
    }

    #[test]
    fn identical_inputs_produce_identical_reports() {
        let fields = vec![field("pushups", json!(50)), field("plank", json!("60"))];
        let payload = values(json!({ "pushups": 42, "plank": 75 }));

        let first = build_report(&fields, &payload, "weekly", fixed_time());
        let second = build_report(&fields, &payload, "weekly", fixed_time());
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).expect("serializes"),
            serde_json::to_vec(&second).expect("serializes")
        );
    }

    #[test]
    fn markdown_lists_metrics_and_status_mix() {
        let mut pushups = field("pushups", json!(50));
        pushups.label = Some("Push-ups".to_string());
        pushups.unit = Some("reps".to_string());
        let report = build_report(
            &[pushups],
            &values(json!({ "pushups": 55 })),
            "weekly",
            fixed_time(),
        );

        let markdown = render_markdown(&report);
        assert!(markdown.contains("Period: weekly (generated 2026-03-02 09:30 UTC)"));
        assert!(markdown.contains("Overall score: 110.00%"));
        assert!(markdown.contains("- Push-ups: 55 reps of 50 reps (110.00%, variance +5.00) Excellent [green]"));
        assert!(markdown.contains("- Excellent: 1"));
        assert!(markdown.contains("- Total: 1"));
    }
}
