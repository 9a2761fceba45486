use crate::errors::AppError;
use crate::models::{AddressPayload, CustomerAddress, CustomerRecord, LineItem, NewCustomer, NewLead};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

/// Client for the directory (field-service CRM) HTTP API.
///
/// One attempt per call, 30 second timeout; retry and backoff are the
/// transport's concern, and callers degrade every failure to an empty or
/// absent value.
#[derive(Clone)]
pub struct DirectoryClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct CustomersEnvelope {
    #[serde(default)]
    customers: Vec<CustomerRecord>,
}

#[derive(Debug, Deserialize)]
struct AddressesEnvelope {
    #[serde(default)]
    addresses: Vec<CustomerAddress>,
}

#[derive(Debug, Deserialize)]
struct AddressEnvelope {
    #[serde(default)]
    address: Option<CustomerAddress>,
}

#[derive(Debug, Deserialize)]
struct LineItemsEnvelope {
    #[serde(default)]
    line_items: Vec<LineItem>,
}

#[derive(Debug, Deserialize)]
struct CreatedLead {
    #[serde(default)]
    id: String,
}

impl DirectoryClient {
    pub fn new(base_url: String, api_key: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApi(format!("Failed to create directory client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Free-text customer search (phone, email, or name token).
    pub async fn search_customers(&self, query: &str) -> Result<Vec<CustomerRecord>, AppError> {
        let url = Url::parse_with_params(
            &format!("{}/customers", self.base_url),
            &[("q", query)],
        )
        .map_err(|e| AppError::ExternalApi(format!("Failed to build URL: {}", e)))?;

        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Customer search failed: {}", e)))?;

        let response = Self::expect_success(response, "customer search").await?;
        let envelope: CustomersEnvelope = response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse customer search response: {}", e))
        })?;

        tracing::info!(
            "Found {} customers matching '{}'",
            envelope.customers.len(),
            query
        );
        Ok(envelope.customers)
    }

    /// Creates a customer. `None` when the directory accepted the request but
    /// returned no id.
    pub async fn create_customer(
        &self,
        customer: &NewCustomer,
    ) -> Result<Option<CustomerRecord>, AppError> {
        let url = format!("{}/customers", self.base_url);
        tracing::info!(
            "Creating customer in directory: {} {}",
            customer.first_name,
            customer.last_name
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(customer)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Customer creation failed: {}", e)))?;

        let response = Self::expect_success(response, "customer creation").await?;
        let created: CustomerRecord = response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse customer creation response: {}", e))
        })?;

        if created.id.is_empty() {
            tracing::warn!("Customer creation response carried no id");
            return Ok(None);
        }

        tracing::info!("Created customer: {}", created.id);
        Ok(Some(created))
    }

    /// Adds an address to an existing customer, returning the created address
    /// (with its directory id) when one comes back.
    pub async fn add_customer_address(
        &self,
        customer_id: &str,
        address: &AddressPayload,
    ) -> Result<Option<CustomerAddress>, AppError> {
        let url = format!("{}/customers/{}/addresses", self.base_url, customer_id);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(address)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Address creation failed: {}", e)))?;

        let response = Self::expect_success(response, "address creation").await?;
        let envelope: AddressEnvelope = response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse address creation response: {}", e))
        })?;

        if envelope.address.is_some() {
            tracing::info!("Added address to customer {}", customer_id);
        }
        Ok(envelope.address)
    }

    /// All known addresses of a customer, with their directory ids.
    pub async fn get_customer_addresses(
        &self,
        customer_id: &str,
    ) -> Result<Vec<CustomerAddress>, AppError> {
        let url = format!("{}/customers/{}/addresses", self.base_url, customer_id);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Address listing failed: {}", e)))?;

        let response = Self::expect_success(response, "address listing").await?;
        let envelope: AddressesEnvelope = response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse address listing response: {}", e))
        })?;

        tracing::info!(
            "Found {} addresses for customer {}",
            envelope.addresses.len(),
            customer_id
        );
        Ok(envelope.addresses)
    }

    /// Full address details by id.
    pub async fn get_address_by_id(
        &self,
        customer_id: &str,
        address_id: &str,
    ) -> Result<Option<CustomerAddress>, AppError> {
        let url = format!(
            "{}/customers/{}/addresses/{}",
            self.base_url, customer_id, address_id
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Address fetch failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::expect_success(response, "address fetch").await?;
        let address: CustomerAddress = response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse address response: {}", e))
        })?;

        Ok(Some(address))
    }

    /// Creates a lead. `None` when the directory accepted the request but
    /// returned no id.
    pub async fn create_lead(&self, lead: &NewLead) -> Result<Option<String>, AppError> {
        let url = format!("{}/leads", self.base_url);
        tracing::info!(
            "Creating lead for customer {} (job type: {})",
            lead.customer_id,
            lead.job_type
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(lead)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Lead creation failed: {}", e)))?;

        let response = Self::expect_success(response, "lead creation").await?;
        let created: CreatedLead = response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse lead creation response: {}", e))
        })?;

        if created.id.is_empty() {
            tracing::warn!("Lead creation response carried no id");
            return Ok(None);
        }

        tracing::info!("Created lead: {}", created.id);
        Ok(Some(created.id))
    }

    /// Adds line items to an existing lead.
    pub async fn add_lead_line_items(
        &self,
        lead_id: &str,
        line_items: &[LineItem],
    ) -> Result<Vec<LineItem>, AppError> {
        let url = format!("{}/leads/{}/line_items", self.base_url, lead_id);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({ "line_items": line_items }))
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Line item creation failed: {}", e)))?;

        let response = Self::expect_success(response, "line item creation").await?;
        let envelope: LineItemsEnvelope = response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse line item response: {}", e))
        })?;

        if !envelope.line_items.is_empty() {
            tracing::info!(
                "Added {} line items to lead {}",
                envelope.line_items.len(),
                lead_id
            );
        }
        Ok(envelope.line_items)
    }

    /// Adds a note to an existing lead.
    pub async fn add_lead_note(
        &self,
        lead_id: &str,
        note: &str,
        is_private: bool,
    ) -> Result<Option<Value>, AppError> {
        let url = format!("{}/leads/{}/notes", self.base_url, lead_id);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({ "note": note, "private": is_private }))
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Note creation failed: {}", e)))?;

        let response = Self::expect_success(response, "note creation").await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Failed to parse note response: {}", e)))?;

        let note_data = body.get("note").cloned().filter(|n| !n.is_null());
        if note_data.is_some() {
            tracing::info!("Added note to lead {}", lead_id);
        }
        Ok(note_data)
    }

    async fn expect_success(
        response: reqwest::Response,
        operation: &str,
    ) -> Result<reqwest::Response, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApi(format!(
                "Directory {} returned {}: {}",
                operation, status, error_text
            )));
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = DirectoryClient::new(
            "https://directory.example.com/".to_string(),
            "token".to_string(),
        );
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url, "https://directory.example.com");
    }
}
