use serde::{Deserialize, Serialize};

// ============ Address values ============

/// Structured postal address extracted from free text or individual form
/// fields. Absence of a field is distinct from an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAddress {
    pub street: Option<String>,
    pub street2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
}

impl ParsedAddress {
    /// True when no field carries a non-empty value.
    pub fn is_empty(&self) -> bool {
        [
            &self.street,
            &self.street2,
            &self.city,
            &self.state,
            &self.zip,
            &self.country,
        ]
        .iter()
        .all(|f| f.as_deref().map_or(true, |v| v.trim().is_empty()))
    }
}

// ============ Directory records (read side) ============

/// An address as stored in the directory, carrying the directory's id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerAddress {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub street_line_2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl CustomerAddress {
    /// View of the directory address in the comparator's shape.
    pub fn to_parsed(&self) -> ParsedAddress {
        ParsedAddress {
            street: self.street.clone(),
            street2: self.street_line_2.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            zip: self.zip.clone(),
            country: self.country.clone(),
        }
    }
}

/// A customer as returned by the directory. Read-only to the matching core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile_number: Option<String>,
    #[serde(default)]
    pub home_number: Option<String>,
    #[serde(default)]
    pub addresses: Vec<CustomerAddress>,
}

impl CustomerRecord {
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }

    /// The stored phone to match against: mobile first, home as fallback.
    pub fn stored_phone(&self) -> Option<&str> {
        self.mobile_number
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .or_else(|| {
                self.home_number
                    .as_deref()
                    .filter(|p| !p.trim().is_empty())
            })
    }
}

// ============ Match decision ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Partial,
    None,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Partial => "partial",
            MatchType::None => "none",
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of identity resolution. Each variant carries only the fields that
/// are meaningful for it, so the invariants hold by construction: an exact
/// match always reuses the customer at full confidence, and no-match always
/// creates a new record.
#[derive(Debug, Clone)]
pub enum MatchDecision {
    /// Both phone and email resolved to the same directory record.
    Exact { customer: CustomerRecord },
    /// One signal resolved. The candidate is adopted only when the submitter
    /// claimed to be an existing customer; otherwise it is attached for
    /// review and a new record is created.
    Partial {
        confidence: f64,
        candidate: CustomerRecord,
        adopt_existing: bool,
        warnings: Vec<String>,
    },
    /// No directory record resolved from any signal.
    NoMatch,
}

impl MatchDecision {
    pub fn match_type(&self) -> MatchType {
        match self {
            MatchDecision::Exact { .. } => MatchType::Exact,
            MatchDecision::Partial { .. } => MatchType::Partial,
            MatchDecision::NoMatch => MatchType::None,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            MatchDecision::Exact { .. } => 1.0,
            MatchDecision::Partial { confidence, .. } => *confidence,
            MatchDecision::NoMatch => 0.0,
        }
    }

    pub fn should_create_new(&self) -> bool {
        match self {
            MatchDecision::Exact { .. } => false,
            MatchDecision::Partial { adopt_existing, .. } => !adopt_existing,
            MatchDecision::NoMatch => true,
        }
    }

    /// Id of the customer the lead should attach to, when one was adopted.
    pub fn customer_id(&self) -> Option<&str> {
        match self {
            MatchDecision::Exact { customer } => Some(customer.id.as_str()),
            MatchDecision::Partial {
                candidate,
                adopt_existing: true,
                ..
            } => Some(candidate.id.as_str()),
            _ => None,
        }
    }

    /// The resolved or candidate record, for address reconciliation and
    /// reviewer reference.
    pub fn matched_customer(&self) -> Option<&CustomerRecord> {
        match self {
            MatchDecision::Exact { customer } => Some(customer),
            MatchDecision::Partial { candidate, .. } => Some(candidate),
            MatchDecision::NoMatch => None,
        }
    }

    pub fn warnings(&self) -> &[String] {
        match self {
            MatchDecision::Partial { warnings, .. } => warnings,
            _ => &[],
        }
    }
}

// ============ Directory payloads (write side) ============

/// Address fields as the directory's write endpoints expect them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AddressPayload {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_line_2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    pub country: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: String,
    pub notifications_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_source: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<AddressPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewLead {
    pub customer_id: String,
    pub job_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_employee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<AddressPayload>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_source: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<LineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

// ============ Workflow result ============

/// Final outcome of the submission-to-lead workflow, serialized as the webhook
/// response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadCreationResult {
    pub success: bool,
    pub customer_id: Option<String>,
    pub lead_id: Option<String>,
    pub message: String,
    pub warnings: Vec<String>,
    pub error: Option<String>,
}

impl LeadCreationResult {
    pub fn created(
        customer_id: String,
        lead_id: String,
        message: String,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            success: true,
            customer_id: Some(customer_id),
            lead_id: Some(lead_id),
            message,
            warnings,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            customer_id: None,
            lead_id: None,
            message: String::new(),
            warnings: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// Failure after a customer record was already created or resolved; the
    /// id is preserved so the caller can follow up.
    pub fn failed_with_customer(customer_id: String, error: impl Into<String>) -> Self {
        Self {
            customer_id: Some(customer_id),
            ..Self::failed(error)
        }
    }
}
