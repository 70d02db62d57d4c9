use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use crate::config::Settings;
use crate::error::WorkflowError;
use crate::models::{FormSchema, Report, SubmissionValues};

mod config;
mod db;
mod error;
mod metrics;
mod models;
mod report;
mod telemetry;
mod workflow;

#[derive(Parser)]
#[command(name = "coaching-report")]
#[command(about = "Progress reports for coaching check-in forms", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo client, form and submission
    Seed,
    /// Import a submission from a `field_id,value` CSV file
    Import {
        #[arg(long)]
        client_id: i32,
        #[arg(long)]
        form_id: Uuid,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Generate and store a report for a submission
    Generate {
        #[arg(long)]
        client_id: i32,
        #[arg(long)]
        submission_id: Uuid,
        #[arg(long, value_enum, default_value_t = Period::Weekly)]
        period: Period,
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
    },
    /// Score a form and submission read from JSON files, without storing anything
    Preview {
        #[arg(long)]
        form: PathBuf,
        #[arg(long)]
        submission: PathBuf,
        #[arg(long, value_enum, default_value_t = Period::Weekly)]
        period: Period,
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
    },
    /// List stored reports for a client, newest first
    List {
        #[arg(long)]
        client_id: i32,
    },
    /// Print a stored report
    Show {
        report_id: Uuid,
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// Delete a stored report
    Delete { report_id: Uuid },
}

#[derive(Clone, Copy, ValueEnum)]
enum Period {
    Weekly,
    Monthly,
}

impl Period {
    fn as_str(self) -> &'static str {
        match self {
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Markdown,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    telemetry::init(&settings)?;

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&settings).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(&settings).await?;
            let client_id = db::seed(&pool).await?;
            println!(
                "Seed data inserted for client {client_id} (submission {}).",
                db::SEED_SUBMISSION_ID
            );
        }
        Commands::Import {
            client_id,
            form_id,
            csv,
        } => {
            let pool = connect(&settings).await?;
            db::fetch_form(&pool, form_id)
                .await?
                .ok_or(WorkflowError::FormNotFound)?;
            let (submission_id, imported) =
                db::import_submission_csv(&pool, client_id, form_id, &csv).await?;
            println!(
                "Stored submission {submission_id} with {imported} answers from {}.",
                csv.display()
            );
        }
        Commands::Generate {
            client_id,
            submission_id,
            period,
            format,
        } => {
            let pool = connect(&settings).await?;
            let stored = workflow::generate_for_submission(
                &pool,
                client_id,
                submission_id,
                period.as_str(),
                Utc::now(),
            )
            .await?;
            println!("Report {} stored.", stored.id);
            print_report(&stored.report, format)?;
        }
        Commands::Preview {
            form,
            submission,
            period,
            format,
        } => {
            let schema = FormSchema::from_value(&read_json(&form)?)
                .with_context(|| format!("invalid form in {}", form.display()))?;
            let values = SubmissionValues::from_value(&read_json(&submission)?)
                .with_context(|| format!("invalid submission in {}", submission.display()))?;
            let report = report::build_report(&schema.fields, &values, period.as_str(), Utc::now());
            print_report(&report, format)?;
        }
        Commands::List { client_id } => {
            let pool = connect(&settings).await?;
            let reports = db::fetch_client_reports(&pool, client_id).await?;

            if reports.is_empty() {
                println!("No reports stored for client {client_id}.");
                return Ok(());
            }

            println!("Reports for client {client_id}:");
            for stored in reports.iter() {
                println!(
                    "- {} ({}, {}) score {:.2} across {} metrics, submission {}",
                    stored.id,
                    stored.period,
                    stored.created_at.format("%Y-%m-%d %H:%M"),
                    stored.report.overall_score,
                    stored.report.statistics.total_metrics,
                    stored.submission_id
                );
            }
        }
        Commands::Show { report_id, format } => {
            let pool = connect(&settings).await?;
            let stored = db::fetch_report(&pool, report_id)
                .await?
                .ok_or(WorkflowError::ReportNotFound)?;
            println!("Report {} for client {}", stored.id, stored.client_id);
            print_report(&stored.report, format)?;
        }
        Commands::Delete { report_id } => {
            let pool = connect(&settings).await?;
            if !db::delete_report(&pool, report_id).await? {
                return Err(WorkflowError::ReportNotFound.into());
            }
            println!("Report deleted successfully.");
        }
    }

    Ok(())
}

async fn connect(settings: &Settings) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(settings.database_url()?)
        .await
        .context("failed to connect to Postgres")
}

fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn print_report(report: &Report, format: Format) -> anyhow::Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(report)?),
        Format::Markdown => print!("{}", report::render_markdown(report)),
    }
    Ok(())
}
