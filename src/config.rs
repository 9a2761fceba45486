use std::collections::HashMap;
use url::Url;

/// Application configuration, loaded once from the environment and passed
/// explicitly into the components that need it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the directory (field-service CRM) API.
    pub directory_base_url: String,
    /// Bearer token for the directory API.
    pub directory_api_key: String,
    pub port: u16,
    /// Area code prepended to 7-digit phone numbers.
    pub default_area_code: String,
    /// Region (state) code used when a submission omits one.
    pub default_region: String,
    /// Lead source label; must already exist in the directory.
    pub lead_source: Option<String>,
    pub lead_tag: Option<String>,
    pub website_tag: Option<String>,
    /// Employee the created leads are assigned to, if configured.
    pub assigned_employee_id: Option<String>,
    /// Similarity above which a proposed address reuses an existing one.
    pub address_match_threshold: f64,
    /// Loaded for operational parity with the previous deployment; no
    /// matching branch consults it.
    pub match_confidence_threshold: f64,
    /// Shared secret for the webhook endpoints; unset disables the check.
    pub webhook_token: Option<String>,
    /// Form service-detail selections to directory service names.
    pub service_detail_mapping: HashMap<String, String>,
    /// Form "service needed" choices to directory job types.
    pub job_type_mapping: HashMap<String, String>,
    /// Job type used when the "service needed" choice has no mapping.
    pub fallback_job_type: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            directory_base_url: std::env::var("DIRECTORY_BASE_URL")
                .map_err(|_| anyhow::anyhow!("DIRECTORY_BASE_URL environment variable required"))
                .and_then(|raw| {
                    let url = Url::parse(raw.trim_end_matches('/'))
                        .map_err(|e| anyhow::anyhow!("DIRECTORY_BASE_URL is not a URL: {}", e))?;
                    if url.scheme() != "http" && url.scheme() != "https" {
                        anyhow::bail!("DIRECTORY_BASE_URL must start with http:// or https://");
                    }
                    Ok(raw.trim_end_matches('/').to_string())
                })?,
            directory_api_key: std::env::var("DIRECTORY_API_KEY")
                .map_err(|_| anyhow::anyhow!("DIRECTORY_API_KEY environment variable required"))
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("DIRECTORY_API_KEY cannot be empty");
                    }
                    Ok(key)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            default_area_code: std::env::var("DEFAULT_AREA_CODE")
                .unwrap_or_else(|_| "415".to_string()),
            default_region: std::env::var("DEFAULT_REGION").unwrap_or_else(|_| "CA".to_string()),
            // Unset falls back to "Website"; explicitly empty disables it
            lead_source: match std::env::var("LEAD_SOURCE") {
                Ok(value) => non_empty(Some(value)),
                Err(_) => Some("Website".to_string()),
            },
            lead_tag: non_empty(std::env::var("LEAD_TAG").ok()),
            website_tag: non_empty(std::env::var("WEBSITE_TAG").ok()),
            assigned_employee_id: non_empty(std::env::var("ASSIGNED_EMPLOYEE_ID").ok()),
            address_match_threshold: parse_threshold("ADDRESS_MATCH_THRESHOLD", 0.8)?,
            match_confidence_threshold: parse_threshold("MATCH_CONFIDENCE_THRESHOLD", 0.8)?,
            webhook_token: non_empty(std::env::var("WEBHOOK_TOKEN").ok()),
            service_detail_mapping: default_service_detail_mapping(),
            job_type_mapping: default_job_type_mapping(),
            fallback_job_type: std::env::var("FALLBACK_JOB_TYPE")
                .unwrap_or_else(|_| "Plumbing Demand Maintenance".to_string()),
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Directory base URL: {}", config.directory_base_url);
        tracing::debug!("Server port: {}", config.port);
        tracing::debug!(
            "Defaults: area code {}, region {}",
            config.default_area_code,
            config.default_region
        );
        if config.webhook_token.is_none() {
            tracing::warn!("WEBHOOK_TOKEN not set; webhook endpoints accept unsigned requests");
        }

        Ok(config)
    }

    /// Configured tags that are actually set, in a stable order.
    pub fn tags(&self) -> Vec<String> {
        [&self.lead_tag, &self.website_tag]
            .into_iter()
            .filter_map(|t| t.clone())
            .collect()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn parse_threshold(var: &str, default: f64) -> anyhow::Result<f64> {
    let value = match std::env::var(var) {
        Ok(raw) => raw
            .parse::<f64>()
            .map_err(|_| anyhow::anyhow!("{} must be a number", var))?,
        Err(_) => default,
    };
    if !(0.0..=1.0).contains(&value) {
        anyhow::bail!("{} must be between 0.0 and 1.0", var);
    }
    Ok(value)
}

fn default_service_detail_mapping() -> HashMap<String, String> {
    [
        ("Toilets or Bidets", "Toilet Repair & Replacement"),
        ("Garbage Disposal", "Garbage Disposal Service"),
        ("Plumbing Fixtures", "Faucet & Fixture Service"),
        ("Water Heater", "Water Heater Service"),
        ("Boilers / Combi-Boilers", "Boiler & Hydronics Service"),
        ("Steam / Sauna", "Steam & Sauna Service"),
        ("Other Plumbing", "Other Plumbing Service"),
        ("Other Heating & HVAC", "Other Heating Service"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_job_type_mapping() -> HashMap<String, String> {
    [
        ("New Installation", "Plumbing Installation"),
        ("Service or Repair", "Plumbing Demand Maintenance"),
        ("Renovation or Remodel", "Plumbing Estimate"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
