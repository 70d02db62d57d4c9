use anyhow::Context;
use serde_json::{json, Map, Number, Value};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::models::{FormRecord, Report, StoredReport, SubmissionRecord};

pub const SEED_FORM_ID: &str = "6b1f3c52-8d0e-4c1a-9a57-2f4e5d7c9b10";
pub const SEED_SUBMISSION_ID: &str = "a4e2d9f1-3b6c-4f8e-b0d7-91c5e8a2f346";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<i32> {
    let client_id: i32 = sqlx::query(
        r#"
        INSERT INTO coaching_reports.clients (name, email)
        VALUES ($1, $2)
        ON CONFLICT (email) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind("Maya Torres")
    .bind("maya.torres@example.com")
    .fetch_one(pool)
    .await?
    .get("id");

    let form_id = Uuid::parse_str(SEED_FORM_ID)?;
    let form = json!({
        "fields": [
            { "id": "pushups", "label": "Push-ups", "type": "integer", "target": 50, "unit": "reps" },
            { "id": "plank", "label": "Plank hold", "type": "number", "target": 90, "unit": "sec" },
            { "id": "water", "label": "Water intake", "type": "number", "target": "2.5", "unit": "L" },
            { "id": "sleep", "label": "Sleep", "type": "number", "target": 8, "unit": "h" },
            { "id": "mood", "label": "How did the week feel?", "type": "textarea" }
        ]
    });

    sqlx::query(
        r#"
        INSERT INTO coaching_reports.forms (id, client_id, title, data, status)
        VALUES ($1, $2, $3, $4, 'published')
        ON CONFLICT (id) DO UPDATE
        SET data = EXCLUDED.data, title = EXCLUDED.title, updated_at = NOW()
        "#,
    )
    .bind(form_id)
    .bind(client_id)
    .bind("Weekly check-in")
    .bind(form)
    .execute(pool)
    .await?;

    let submission = json!({
        "pushups": 55,
        "plank": "72",
        "water": 2.0,
        "sleep": 6.5,
        "mood": "Tired but consistent"
    });

    sqlx::query(
        r#"
        INSERT INTO coaching_reports.submissions (id, client_id, form_id, data)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(Uuid::parse_str(SEED_SUBMISSION_ID)?)
    .bind(client_id)
    .bind(form_id)
    .bind(submission)
    .execute(pool)
    .await?;

    Ok(client_id)
}

pub async fn fetch_form(pool: &PgPool, form_id: Uuid) -> anyhow::Result<Option<FormRecord>> {
    let row = sqlx::query(
        "SELECT id, title, data FROM coaching_reports.forms WHERE id = $1",
    )
    .bind(form_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| FormRecord {
        id: row.get("id"),
        title: row.get("title"),
        data: row.get("data"),
    }))
}

pub async fn fetch_submission(
    pool: &PgPool,
    submission_id: Uuid,
) -> anyhow::Result<Option<SubmissionRecord>> {
    let row = sqlx::query(
        "SELECT id, client_id, form_id, data, submitted_at \
         FROM coaching_reports.submissions WHERE id = $1",
    )
    .bind(submission_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| SubmissionRecord {
        id: row.get("id"),
        client_id: row.get("client_id"),
        form_id: row.get("form_id"),
        data: row.get("data"),
        submitted_at: row.get("submitted_at"),
    }))
}

/// Loads `field_id,value` rows as one new submission.
pub async fn import_submission_csv(
    pool: &PgPool,
    client_id: i32,
    form_id: Uuid,
    csv_path: &std::path::Path,
) -> anyhow::Result<(Uuid, usize)> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        field_id: String,
        value: String,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut answers = Map::new();

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        if let Some(value) = csv_value(&row.value) {
            answers.insert(row.field_id.trim().to_string(), value);
        }
    }

    let submission_id = Uuid::new_v4();
    let imported = answers.len();

    sqlx::query(
        r#"
        INSERT INTO coaching_reports.submissions (id, client_id, form_id, data)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(submission_id)
    .bind(client_id)
    .bind(form_id)
    .bind(Value::Object(answers))
    .execute(pool)
    .await
    .context("failed to store submission")?;

    info!(%submission_id, imported, "submission imported");
    Ok((submission_id, imported))
}

fn csv_value(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(integer) = trimmed.parse::<i64>() {
        return Some(Value::from(integer));
    }
    let number = trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number);
    Some(number.unwrap_or_else(|| Value::String(trimmed.to_string())))
}

pub async fn insert_report(
    pool: &PgPool,
    client_id: i32,
    submission_id: Uuid,
    report: &Report,
) -> anyhow::Result<StoredReport> {
    let row = sqlx::query(
        r#"
        INSERT INTO coaching_reports.reports
        (id, client_id, submission_id, generated_report_data, period)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, client_id, submission_id, generated_report_data, period, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(client_id)
    .bind(submission_id)
    .bind(Json(report))
    .bind(&report.period)
    .fetch_one(pool)
    .await?;

    stored_report(&row)
}

pub async fn fetch_client_reports(
    pool: &PgPool,
    client_id: i32,
) -> anyhow::Result<Vec<StoredReport>> {
    let rows = sqlx::query(
        "SELECT id, client_id, submission_id, generated_report_data, period, created_at \
         FROM coaching_reports.reports \
         WHERE client_id = $1 \
         ORDER BY created_at DESC",
    )
    .bind(client_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(stored_report).collect()
}

pub async fn fetch_report(pool: &PgPool, report_id: Uuid) -> anyhow::Result<Option<StoredReport>> {
    let row = sqlx::query(
        "SELECT id, client_id, submission_id, generated_report_data, period, created_at \
         FROM coaching_reports.reports WHERE id = $1",
    )
    .bind(report_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(stored_report).transpose()
}

pub async fn delete_report(pool: &PgPool, report_id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM coaching_reports.reports WHERE id = $1")
        .bind(report_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn stored_report(row: &PgRow) -> anyhow::Result<StoredReport> {
    let id: Uuid = row.get("id");
    let Json(report) = row
        .try_get::<Json<Report>, _>("generated_report_data")
        .with_context(|| format!("report {id} holds malformed data"))?;

    Ok(StoredReport {
        id,
        client_id: row.get("client_id"),
        submission_id: row.get("submission_id"),
        period: row.get("period"),
        report,
        created_at: row.get("created_at"),
    })
}
