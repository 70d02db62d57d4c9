use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ContractError;

/// One entry of a form's `fields` array.
#[derive(Debug, Clone, Default)]
pub struct FieldDefinition {
    pub id: Option<String>,
    pub label: Option<String>,
    pub field_type: String,
    /// Number or numeric string; parsed when the field is evaluated.
    pub target: Option<Value>,
    pub unit: Option<String>,
}

impl FieldDefinition {
    /// Reads the attributes the engine uses. Attributes of an unexpected type
    /// never fail the form: a non-string `id` or `type` leaves the field
    /// unscorable, numeric labels and units are kept as text.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            id: object.get("id").and_then(Value::as_str).map(str::to_string),
            label: object.get("label").and_then(scalar_text),
            field_type: match object.get("type") {
                None => "text".to_string(),
                Some(Value::String(kind)) => kind.clone(),
                Some(other) => other.to_string(),
            },
            target: object.get("target").cloned(),
            unit: object.get("unit").and_then(scalar_text),
        }
    }

    pub fn display_label(&self) -> &str {
        self.label
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or_default()
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.field_type.as_str(), "number" | "integer")
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct FormSchema {
    pub fields: Vec<FieldDefinition>,
}

impl FormSchema {
    /// Reads the `fields` array out of a stored form document.
    pub fn from_value(value: &Value) -> Result<Self, ContractError> {
        let object = value.as_object().ok_or(ContractError::FormNotObject)?;
        let entries = object
            .get("fields")
            .and_then(Value::as_array)
            .ok_or(ContractError::MissingFields)?;

        let mut fields = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let field = entry
                .as_object()
                .ok_or(ContractError::FieldNotObject { index })?;
            fields.push(FieldDefinition::from_object(field));
        }

        Ok(Self { fields })
    }
}

/// Submitted answers keyed by field id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionValues(Map<String, Value>);

impl SubmissionValues {
    pub fn from_value(value: &Value) -> Result<Self, ContractError> {
        value
            .as_object()
            .cloned()
            .map(Self)
            .ok_or(ContractError::SubmissionNotObject)
    }

    pub fn get(&self, field_id: &str) -> Option<&Value> {
        self.0.get(field_id)
    }

    pub fn answer_count(&self) -> usize {
        self.0.len()
    }
}

impl From<Map<String, Value>> for SubmissionValues {
    fn from(values: Map<String, Value>) -> Self {
        Self(values)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Excellent,
    Good,
    Fair,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Excellent,
        Status::Good,
        Status::Fair,
        Status::NeedsImprovement,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Status::Excellent => "Excellent",
            Status::Good => "Good",
            Status::Fair => "Fair",
            Status::NeedsImprovement => "Needs Improvement",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Status::Excellent => "green",
            Status::Good => "blue",
            Status::Fair => "yellow",
            Status::NeedsImprovement => "red",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Metric {
    pub field: String,
    pub target: f64,
    pub actual: f64,
    pub unit: String,
    pub achievement: f64,
    pub variance: f64,
    pub status: Status,
}

impl Metric {
    pub fn status_color(&self) -> &'static str {
        self.status.color()
    }
}

// `status_color` is written out next to `status` but always derived from it.
impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Metric", 8)?;
        state.serialize_field("field", &self.field)?;
        state.serialize_field("target", &self.target)?;
        state.serialize_field("actual", &self.actual)?;
        state.serialize_field("unit", &self.unit)?;
        state.serialize_field("achievement", &self.achievement)?;
        state.serialize_field("variance", &self.variance)?;
        state.serialize_field("status", &self.status)?;
        state.serialize_field("status_color", self.status_color())?;
        state.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_metrics: usize,
    pub excellent: usize,
    pub good: usize,
    pub fair: usize,
    pub needs_improvement: usize,
}

impl Statistics {
    pub fn count(&self, status: Status) -> usize {
        match status {
            Status::Excellent => self.excellent,
            Status::Good => self.good,
            Status::Fair => self.fair,
            Status::NeedsImprovement => self.needs_improvement,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub period: String,
    pub generated_at: DateTime<Utc>,
    pub overall_score: f64,
    pub summary: String,
    pub metrics: Vec<Metric>,
    pub statistics: Statistics,
}

#[derive(Debug, Clone)]
pub struct FormRecord {
    pub id: Uuid,
    pub title: String,
    pub data: Value,
}

#[derive(Debug, Clone)]
pub struct SubmissionRecord {
    pub id: Uuid,
    pub client_id: i32,
    pub form_id: Uuid,
    pub data: Value,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StoredReport {
    pub id: Uuid,
    pub client_id: i32,
    pub submission_id: Uuid,
    pub period: String,
    pub report: Report,
    pub created_at: DateTime<Utc>,
}
