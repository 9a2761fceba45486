use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Form webhook payload - the form vendor posts a list of labeled fields,
/// while manual and test callers post a flat object.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum WebhookPayload {
    Fields(Vec<FormField>),
    Flat(Map<String, Value>),
}

/// One labeled field from the form vendor's payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FormField {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, rename = "type")]
    pub field_type: Option<String>,
}

/// Normalized form submission, the input to the lead workflow.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FormSubmission {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub street2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    /// Combined single-field address, used only when the individual fields
    /// are absent.
    pub address: Option<String>,
    pub customer_type: Option<String>,
    pub preferred_contact: Option<String>,
    pub sms_consent: Option<bool>,
    pub service_needed: Option<String>,
    pub service_details: Vec<String>,
    pub service_request_details: Option<String>,
    pub file_attachments: Vec<String>,
}

impl WebhookPayload {
    /// Map the payload to a normalized submission. Field labels are matched
    /// with a flat heuristic lookup; unrecognized labels are ignored.
    pub fn into_submission(self) -> FormSubmission {
        let mut submission = match self {
            WebhookPayload::Fields(fields) => from_labeled_fields(fields),
            WebhookPayload::Flat(map) => from_flat_map(map),
        };

        // Synthesize a full name when only parts were supplied.
        if submission.name.as_deref().map_or(true, str::is_empty) {
            let first = submission.first_name.as_deref().unwrap_or("").trim();
            let last = submission.last_name.as_deref().unwrap_or("").trim();
            let combined = format!("{} {}", first, last).trim().to_string();
            if !combined.is_empty() {
                submission.name = Some(combined);
            }
        }

        submission
    }
}

fn from_labeled_fields(fields: Vec<FormField>) -> FormSubmission {
    let mut submission = FormSubmission::default();

    for field in fields {
        let label = field.name.to_lowercase();
        let label = label.trim();
        let is_file = field.field_type.as_deref() == Some("file");

        if label.contains("first name") || label == "first_name" {
            submission.first_name = value_as_string(&field.value);
        } else if label.contains("last name") || label == "last_name" {
            submission.last_name = value_as_string(&field.value);
        } else if label.contains("email") {
            submission.email = value_as_string(&field.value);
        } else if label.contains("phone") {
            submission.phone = value_as_string(&field.value);
        } else if label.contains("street address line 2") {
            submission.street2 = value_as_string(&field.value);
        } else if label.contains("street address") {
            submission.street = value_as_string(&field.value);
        } else if label.contains("city") {
            submission.city = value_as_string(&field.value);
        } else if label.contains("state") && !label.contains("service") {
            submission.state = value_as_string(&field.value);
        } else if label.contains("postal") || label.contains("zip") {
            submission.zip = value_as_string(&field.value);
        } else if label.contains("new or existing") || label.contains("are you") {
            submission.customer_type = value_as_string(&field.value);
        } else if label.contains("preferred method") || label.contains("contact method") {
            submission.preferred_contact = value_as_string(&field.value);
        } else if label.contains("sms") && label.contains("consent") {
            submission.sms_consent = Some(value_as_consent(&field.value));
        } else if label.contains("service needed") {
            submission.service_needed = value_as_string(&field.value);
        } else if label.contains("service details") {
            submission.service_details = value_as_list(&field.value);
        } else if label.contains("service request details") || label.contains("request details") {
            submission.service_request_details = value_as_string(&field.value);
        } else if label.contains("images") || label.contains("plans") || label.contains("specs") || is_file
        {
            submission.file_attachments = value_as_list(&field.value);
        } else if label.contains("address") {
            // Single combined address field
            submission.address = value_as_string(&field.value);
        } else if label.contains("name") {
            submission.name = value_as_string(&field.value);
        }
    }

    submission
}

fn from_flat_map(map: Map<String, Value>) -> FormSubmission {
    let get = |key: &str| map.get(key).and_then(value_as_string);

    FormSubmission {
        first_name: get("first_name"),
        last_name: get("last_name"),
        name: get("name"),
        email: get("email"),
        phone: get("phone"),
        street: get("street"),
        street2: get("street2").or_else(|| get("street_line_2")),
        city: get("city"),
        state: get("state"),
        zip: get("zip"),
        address: get("address"),
        customer_type: get("customer_type"),
        preferred_contact: get("preferred_contact"),
        sms_consent: map.get("sms_consent").map(value_as_consent),
        service_needed: get("service_needed"),
        service_details: map
            .get("service_details")
            .map(value_as_list)
            .unwrap_or_default(),
        service_request_details: get("service_request_details"),
        file_attachments: map
            .get("file_attachments")
            .map(value_as_list)
            .unwrap_or_default(),
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Consent checkboxes arrive as booleans or yes/true strings.
fn value_as_consent(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.trim(), "true" | "True" | "yes" | "Yes"),
        _ => false,
    }
}

/// Multi-select fields arrive as an array or a comma-separated string.
fn value_as_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(value_as_string).collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
