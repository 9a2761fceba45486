use crate::config::Config;
use crate::directory_client::DirectoryClient;
use crate::errors::AppError;
use crate::matching::{
    find_matching_address, needs_new_address, CustomerMatchEngine, MatchQuery,
};
use crate::models::{
    AddressPayload, CustomerAddress, LeadCreationResult, LineItem, MatchDecision, MatchType,
    NewCustomer, NewLead, ParsedAddress,
};
use crate::phone::normalize_phone;
use crate::webhook_models::FormSubmission;
use std::collections::HashMap;

/// Drives one submission through matching, customer/address reconciliation,
/// and lead creation against the directory.
pub struct LeadOrchestrator {
    directory: DirectoryClient,
    matcher: CustomerMatchEngine,
    config: Config,
}

impl LeadOrchestrator {
    pub fn new(directory: DirectoryClient, config: Config) -> Self {
        let matcher = CustomerMatchEngine::new(directory.clone(), &config);
        Self {
            directory,
            matcher,
            config,
        }
    }

    /// Entry point. Any fault that escapes the workflow is converted into a
    /// generic failure result; internal details stay in the logs.
    pub async fn process(&self, submission: &FormSubmission) -> LeadCreationResult {
        match self.run(submission).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Error creating lead: {}", e);
                LeadCreationResult::failed("Internal error while processing submission")
            }
        }
    }

    async fn run(&self, submission: &FormSubmission) -> Result<LeadCreationResult, AppError> {
        // Normalize identity signals.
        let email = submission
            .email
            .as_deref()
            .map(|e| clean(e).to_lowercase())
            .filter(|e| !e.is_empty());
        let (first_name, last_name, full_name) = derive_names(submission);

        let raw_phone = submission.phone.as_deref().unwrap_or("");
        let phone = normalize_phone(raw_phone, &self.config.default_area_code);
        if phone.is_none() && !raw_phone.trim().is_empty() {
            tracing::warn!("Could not normalize phone: {}", raw_phone);
        }

        let parsed_address = resolve_address(submission, &self.config.default_region);

        let customer_type = submission
            .customer_type
            .as_deref()
            .map(|t| clean(t).to_lowercase())
            .unwrap_or_default();
        let is_existing_customer =
            customer_type.contains("existing") || customer_type.contains("returning");

        tracing::info!(
            "Processing lead: {} ({:?}, {:?}), Existing: {}",
            full_name,
            email,
            phone,
            is_existing_customer
        );

        let decision = self
            .matcher
            .resolve(&MatchQuery {
                phone: phone.as_deref(),
                email: email.as_deref(),
                name: Some(full_name.as_str()).filter(|n| !n.is_empty()),
                address: Some(&parsed_address),
                is_existing_customer,
            })
            .await;

        tracing::info!(
            "Match result: {}, confidence: {:.0}%",
            decision.match_type(),
            decision.confidence() * 100.0
        );

        // Resolve the customer id, creating a record when the decision calls
        // for one. A newly added address id is tracked for the lead.
        let mut new_address_id: Option<String> = None;
        let customer_id = if decision.should_create_new() {
            tracing::info!("Creating new customer");
            let payload = self.build_new_customer(
                &first_name,
                &last_name,
                email.as_deref(),
                phone.as_deref(),
                &parsed_address,
                submission.sms_consent.unwrap_or(false),
            );
            let created = match self.directory.create_customer(&payload).await {
                Ok(created) => created,
                Err(e) => {
                    tracing::warn!("Customer creation degraded to absent result: {}", e);
                    None
                }
            };
            match created.filter(|c| !c.id.is_empty()) {
                Some(customer) => customer.id,
                None => return Ok(LeadCreationResult::failed("Failed to create customer")),
            }
        } else {
            let id = decision
                .customer_id()
                .map(str::to_string)
                .ok_or_else(|| AppError::Internal("match decision without customer id".into()))?;
            tracing::info!("Using existing customer: {}", id);

            if let Some(matched) = decision.matched_customer() {
                if needs_new_address(
                    &matched.addresses,
                    &parsed_address,
                    self.config.address_match_threshold,
                ) {
                    new_address_id = self.add_address(&id, &parsed_address).await;
                    if let Some(ref address_id) = new_address_id {
                        tracing::info!("Created new address with ID: {}", address_id);
                    }
                }
            }

            id
        };

        let line_items = build_line_items(
            &submission.service_details,
            submission.service_request_details.as_deref(),
            &self.config.service_detail_mapping,
        );

        let note = format_lead_note(submission, &decision);

        // Address payload for the lead: new customers get the parsed address
        // inline; existing customers get an id reference plus the directory's
        // resolved address.
        let mut address_id: Option<String> = None;
        let mut address_for_lead: Option<AddressPayload> = None;
        if decision.should_create_new() {
            address_for_lead =
                build_address_payload(&parsed_address, &self.config.default_region, None);
        } else {
            if let Some(created_id) = new_address_id {
                address_id = Some(created_id);
            } else if !parsed_address.is_empty() {
                let known = match self.directory.get_customer_addresses(&customer_id).await {
                    Ok(known) => known,
                    Err(e) => {
                        tracing::warn!("Address listing failed, no address reference: {}", e);
                        Vec::new()
                    }
                };
                address_id = find_matching_address(
                    &known,
                    &parsed_address,
                    self.config.address_match_threshold,
                )
                .map(|a| a.id.clone());
                if let Some(ref id) = address_id {
                    tracing::info!("Using existing address_id: {}", id);
                }
            }

            if let Some(ref id) = address_id {
                address_for_lead = match self.directory.get_address_by_id(&customer_id, id).await {
                    Ok(Some(full)) => Some(address_payload_from_record(&full)),
                    Ok(None) => None,
                    Err(e) => {
                        tracing::warn!("Address fetch failed, lead carries no address: {}", e);
                        None
                    }
                };
            }
        }

        // Map the service-needed choice to a directory job type.
        let service_needed = submission.service_needed.as_deref().unwrap_or("");
        let job_type = match self.config.job_type_mapping.get(service_needed) {
            Some(mapped) => mapped.clone(),
            None => {
                tracing::warn!("No job_type mapping for: {}", service_needed);
                self.config.fallback_job_type.clone()
            }
        };

        let lead = NewLead {
            customer_id: customer_id.clone(),
            job_type,
            assigned_employee_id: self.config.assigned_employee_id.clone(),
            address_id,
            address: address_for_lead,
            tags: self.config.tags(),
            lead_source: self.config.lead_source.clone(),
            line_items,
            note: Some(note),
        };

        let lead_id = match self.directory.create_lead(&lead).await {
            Ok(lead_id) => lead_id,
            Err(e) => {
                tracing::warn!("Lead creation degraded to absent result: {}", e);
                None
            }
        };

        match lead_id {
            Some(lead_id) => Ok(LeadCreationResult::created(
                customer_id,
                lead_id,
                format!(
                    "Lead created successfully (match type: {})",
                    decision.match_type()
                ),
                decision.warnings().to_vec(),
            )),
            None => Ok(LeadCreationResult::failed_with_customer(
                customer_id,
                "Failed to create lead",
            )),
        }
    }

    fn build_new_customer(
        &self,
        first_name: &str,
        last_name: &str,
        email: Option<&str>,
        phone: Option<&str>,
        address: &ParsedAddress,
        sms_consent: bool,
    ) -> NewCustomer {
        let mut customer = NewCustomer {
            first_name: if first_name.is_empty() {
                "Unknown".to_string()
            } else {
                first_name.to_string()
            },
            last_name: last_name.to_string(),
            notifications_enabled: sms_consent,
            email: email.map(str::to_string),
            mobile_number: phone.map(str::to_string),
            lead_source: self.config.lead_source.clone(),
            tags: self.config.tags(),
            addresses: Vec::new(),
        };

        if let Some(payload) =
            build_address_payload(address, &self.config.default_region, None)
        {
            customer.addresses.push(payload);
        }

        customer
    }

    async fn add_address(&self, customer_id: &str, address: &ParsedAddress) -> Option<String> {
        if address.is_empty() {
            return None;
        }
        let payload =
            build_address_payload(address, &self.config.default_region, Some("service"))?;

        match self.directory.add_customer_address(customer_id, &payload).await {
            Ok(created) => created.map(|a| a.id).filter(|id| !id.is_empty()),
            Err(e) => {
                tracing::warn!("Address creation degraded to absent result: {}", e);
                None
            }
        }
    }
}

/// First/last/full name for a submission: explicit parts win; a full name is
/// split so that every token but the last becomes the first name.
pub fn derive_names(submission: &FormSubmission) -> (String, String, String) {
    let first = clean(submission.first_name.as_deref().unwrap_or(""));
    let last = clean(submission.last_name.as_deref().unwrap_or(""));
    let mut name = clean(submission.name.as_deref().unwrap_or(""));

    if name.is_empty() && (!first.is_empty() || !last.is_empty()) {
        name = format!("{} {}", first, last).trim().to_string();
    }
    if first.is_empty() && !name.is_empty() {
        let (first, last) = split_full_name(&name);
        return (first, last, name);
    }

    (first, last, name)
}

/// All tokens but the last become the first name; a single token is a first
/// name with an empty last name.
pub fn split_full_name(full_name: &str) -> (String, String) {
    let parts: Vec<&str> = full_name.split_whitespace().collect();
    match parts.as_slice() {
        [] => (String::new(), String::new()),
        [only] => ((*only).to_string(), String::new()),
        [init @ .., tail] => (init.join(" "), (*tail).to_string()),
    }
}

/// Individually supplied fields win over the combined string; a missing state
/// falls back to the configured region.
pub fn resolve_address(submission: &FormSubmission, default_region: &str) -> ParsedAddress {
    let has_individual = [&submission.street, &submission.city, &submission.zip]
        .iter()
        .any(|f| f.as_deref().map_or(false, |v| !v.trim().is_empty()));

    if has_individual {
        ParsedAddress {
            street: submission.street.clone(),
            street2: submission.street2.clone(),
            city: submission.city.clone(),
            state: submission
                .state
                .clone()
                .filter(|s| !s.trim().is_empty())
                .or_else(|| Some(default_region.to_string())),
            zip: submission.zip.clone(),
            country: None,
        }
    } else {
        crate::address::parse_address(submission.address.as_deref().unwrap_or(""))
    }
}

/// Line items for the selected service details. Unmapped tokens pass through
/// with a warning; the free-text request details attach to the first item
/// only.
pub fn build_line_items(
    service_details: &[String],
    service_request_details: Option<&str>,
    mapping: &HashMap<String, String>,
) -> Vec<LineItem> {
    service_details
        .iter()
        .enumerate()
        .map(|(idx, token)| {
            let name = match mapping.get(token) {
                Some(mapped) => mapped.clone(),
                None => {
                    tracing::warn!("No mapping found for service: {}", token);
                    token.clone()
                }
            };
            LineItem {
                name,
                kind: "labor".to_string(),
                description: if idx == 0 {
                    service_request_details
                        .map(str::trim)
                        .filter(|d| !d.is_empty())
                        .map(str::to_string)
                } else {
                    None
                },
            }
        })
        .collect()
}

/// Audit note summarizing the submission and the match outcome.
pub fn format_lead_note(submission: &FormSubmission, decision: &MatchDecision) -> String {
    let mut lines = vec!["=== Website Form Submission ===".to_string(), String::new()];

    if let Some(ref customer_type) = submission.customer_type {
        lines.push(format!("Customer Type: {}", customer_type));
    }
    if let Some(ref preferred) = submission.preferred_contact {
        lines.push(format!("Preferred Contact: {}", preferred));
    }
    if let Some(consent) = submission.sms_consent {
        lines.push(format!(
            "SMS Consent: {}",
            if consent { "Yes" } else { "No" }
        ));
    }

    if let Some(ref service_needed) = submission.service_needed {
        lines.push(String::new());
        lines.push(format!("Service Needed: {}", service_needed));
    }

    if !submission.service_details.is_empty() {
        lines.push(String::new());
        lines.push("Service Details:".to_string());
        for service in &submission.service_details {
            lines.push(format!("  - {}", service));
        }
    }

    if let Some(ref details) = submission.service_request_details {
        if !details.trim().is_empty() {
            lines.push(String::new());
            lines.push("Request Details:".to_string());
            lines.push(details.clone());
        }
    }

    if !submission.file_attachments.is_empty() {
        lines.push(String::new());
        lines.push("Attachments:".to_string());
        for attachment in &submission.file_attachments {
            lines.push(format!("  - {}", attachment));
        }
    }

    lines.push(String::new());
    lines.push("=== Customer Match Info ===".to_string());
    match decision.match_type() {
        MatchType::Exact => lines.push("Exact match found (phone and email)".to_string()),
        MatchType::Partial => lines.push("Partial match found".to_string()),
        MatchType::None => {
            lines.push("New customer (no existing record found)".to_string())
        }
    }
    if decision.confidence() > 0.0 {
        lines.push(format!("Confidence: {:.0}%", decision.confidence() * 100.0));
    }
    if !decision.warnings().is_empty() {
        lines.push(String::new());
        for warning in decision.warnings() {
            lines.push(format!("WARNING: {}", warning));
        }
    }

    lines.join("\n")
}

/// Address payload from form input; drops to `None` when nothing usable was
/// supplied. The state always resolves (configured region as fallback) and
/// the country defaults to US.
pub fn build_address_payload(
    address: &ParsedAddress,
    default_region: &str,
    kind: Option<&str>,
) -> Option<AddressPayload> {
    if address.is_empty() {
        return None;
    }

    Some(AddressPayload {
        kind: kind.map(str::to_string),
        street: address.street.clone().filter(|v| !v.trim().is_empty()),
        street_line_2: address.street2.clone().filter(|v| !v.trim().is_empty()),
        city: address.city.clone().filter(|v| !v.trim().is_empty()),
        state: Some(
            address
                .state
                .clone()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default_region.to_string()),
        ),
        zip: address.zip.clone().filter(|v| !v.trim().is_empty()),
        country: address
            .country
            .clone()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "US".to_string()),
    })
}

/// Address payload from a directory record, used when a lead references an
/// existing address.
pub fn address_payload_from_record(address: &CustomerAddress) -> AddressPayload {
    AddressPayload {
        kind: None,
        street: address.street.clone(),
        street_line_2: address.street_line_2.clone(),
        city: address.city.clone(),
        state: address.state.clone(),
        zip: address.zip.clone(),
        country: address
            .country
            .clone()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "US".to_string()),
    }
}

/// Collapse runs of whitespace and trim.
fn clean(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
