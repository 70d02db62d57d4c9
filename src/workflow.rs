use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::error::WorkflowError;
use crate::models::{FormSchema, StoredReport, SubmissionRecord, SubmissionValues};
use crate::report;

pub fn ensure_client(submission: &SubmissionRecord, client_id: i32) -> Result<(), WorkflowError> {
    if submission.client_id != client_id {
        return Err(WorkflowError::ClientMismatch {
            requested: client_id,
            actual: submission.client_id,
        });
    }
    Ok(())
}

/// Scores a stored submission against its form and persists the result.
pub async fn generate_for_submission(
    pool: &PgPool,
    client_id: i32,
    submission_id: Uuid,
    period: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<StoredReport> {
    let submission = db::fetch_submission(pool, submission_id)
        .await?
        .ok_or(WorkflowError::SubmissionNotFound)?;
    ensure_client(&submission, client_id)?;

    let form = db::fetch_form(pool, submission.form_id)
        .await?
        .ok_or(WorkflowError::FormNotFound)?;

    let schema = FormSchema::from_value(&form.data).map_err(WorkflowError::from)?;
    let values = SubmissionValues::from_value(&submission.data).map_err(WorkflowError::from)?;
    let generated = report::build_report(&schema.fields, &values, period, now);

    info!(
        form_id = %form.id,
        form = %form.title,
        submitted_at = %submission.submitted_at,
        answers = values.answer_count(),
        fields = schema.fields.len(),
        scored = generated.statistics.total_metrics,
        overall_score = generated.overall_score,
        "report generated"
    );

    db::insert_report(pool, client_id, submission.id, &generated).await
}
