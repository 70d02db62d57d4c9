use thiserror::Error;

/// Structurally invalid engine input. Malformed values inside a valid
/// structure are skipped instead.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("form document must be a JSON object")]
    FormNotObject,
    #[error("form document has no `fields` array")]
    MissingFields,
    #[error("form field #{index} is not an object")]
    FieldNotObject { index: usize },
    #[error("submission payload must be a JSON object")]
    SubmissionNotObject,
}

/// Failures of the report generation workflow that callers map to a response.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Submission not found")]
    SubmissionNotFound,
    #[error("Form not found")]
    FormNotFound,
    #[error("Client ID mismatch: submission belongs to client {actual}, not {requested}")]
    ClientMismatch { requested: i32, actual: i32 },
    #[error("Report not found")]
    ReportNotFound,
    #[error(transparent)]
    Contract(#[from] ContractError),
}
