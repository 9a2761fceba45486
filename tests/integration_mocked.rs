/// Integration tests with a mocked directory API.
/// Exercises identity resolution and the complete lead workflow without
/// hitting a real external service.
use rust_lead_intake::config::Config;
use rust_lead_intake::directory_client::DirectoryClient;
use rust_lead_intake::matching::{CustomerMatchEngine, MatchQuery};
use rust_lead_intake::models::MatchType;
use rust_lead_intake::orchestrator::LeadOrchestrator;
use rust_lead_intake::webhook_models::FormSubmission;
use serde_json::json;
use std::collections::HashMap;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper function to create test config pointing at the mock server
fn create_test_config(directory_base_url: String) -> Config {
    Config {
        directory_base_url,
        directory_api_key: "test_key".to_string(),
        port: 8080,
        default_area_code: "415".to_string(),
        default_region: "CA".to_string(),
        lead_source: Some("Website".to_string()),
        lead_tag: None,
        website_tag: None,
        assigned_employee_id: None,
        address_match_threshold: 0.8,
        match_confidence_threshold: 0.8,
        webhook_token: None,
        service_detail_mapping: HashMap::from([(
            "Water Heater".to_string(),
            "Water Heater Service".to_string(),
        )]),
        job_type_mapping: HashMap::from([(
            "Service or Repair".to_string(),
            "Plumbing Demand Maintenance".to_string(),
        )]),
        fallback_job_type: "Plumbing Demand Maintenance".to_string(),
    }
}

fn engine_for(config: &Config) -> CustomerMatchEngine {
    let directory = DirectoryClient::new(
        config.directory_base_url.clone(),
        config.directory_api_key.clone(),
    )
    .expect("client");
    CustomerMatchEngine::new(directory, config)
}

fn orchestrator_for(config: &Config) -> LeadOrchestrator {
    let directory = DirectoryClient::new(
        config.directory_base_url.clone(),
        config.directory_api_key.clone(),
    )
    .expect("client");
    LeadOrchestrator::new(directory, config.clone())
}

fn customer_c1() -> serde_json::Value {
    json!({
        "id": "cus_1",
        "first_name": "John",
        "last_name": "Smith",
        "email": "john@example.com",
        "mobile_number": "+14155551234",
        "addresses": []
    })
}

#[tokio::test]
async fn test_exact_match_when_phone_and_email_agree() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customers"))
        .and(query_param("q", "+14155551234"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "customers": [customer_c1()] })),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/customers"))
        .and(query_param("q", "john@example.com"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "customers": [customer_c1()] })),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let engine = engine_for(&config);

    let decision = engine
        .resolve(&MatchQuery {
            phone: Some("+14155551234"),
            email: Some("john@example.com"),
            name: Some("John Smith"),
            address: None,
            is_existing_customer: false,
        })
        .await;

    assert_eq!(decision.match_type(), MatchType::Exact);
    assert_eq!(decision.confidence(), 1.0);
    assert_eq!(decision.customer_id(), Some("cus_1"));
    assert!(!decision.should_create_new());
}

#[tokio::test]
async fn test_partial_match_new_customer_flags_duplicate() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customers"))
        .and(query_param("q", "+14155551234"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "customers": [customer_c1()] })),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/customers"))
        .and(query_param("q", "other@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "customers": [] })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let engine = engine_for(&config);

    let decision = engine
        .resolve(&MatchQuery {
            phone: Some("+14155551234"),
            email: Some("other@example.com"),
            name: Some("John Smith"),
            address: None,
            is_existing_customer: false,
        })
        .await;

    assert_eq!(decision.match_type(), MatchType::Partial);
    assert!(decision.should_create_new());
    assert_eq!(decision.customer_id(), None);
    assert!(decision.matched_customer().is_some());
    assert!((0.0..=1.0).contains(&decision.confidence()));
    // Phone matched (0.4) + identical name (0.2); email was supplied but differs
    assert!((decision.confidence() - 0.6).abs() < 1e-9);
    assert!(decision
        .warnings()
        .iter()
        .any(|w| w.contains("potential duplicate")));
}

#[tokio::test]
async fn test_partial_match_existing_customer_is_adopted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customers"))
        .and(query_param("q", "+14155551234"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "customers": [customer_c1()] })),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let engine = engine_for(&config);

    let decision = engine
        .resolve(&MatchQuery {
            phone: Some("+14155551234"),
            email: None,
            name: None,
            address: None,
            is_existing_customer: true,
        })
        .await;

    assert_eq!(decision.match_type(), MatchType::Partial);
    assert!(!decision.should_create_new());
    assert_eq!(decision.customer_id(), Some("cus_1"));
    assert!(decision.warnings().iter().any(|w| w.contains("verify")));
}

#[tokio::test]
async fn test_lookup_failure_degrades_to_no_match() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let engine = engine_for(&config);

    let decision = engine
        .resolve(&MatchQuery {
            phone: Some("+14155551234"),
            email: Some("john@example.com"),
            name: Some("John Smith"),
            address: None,
            is_existing_customer: false,
        })
        .await;

    assert_eq!(decision.match_type(), MatchType::None);
    assert_eq!(decision.confidence(), 0.0);
    assert!(decision.should_create_new());
    assert_eq!(decision.customer_id(), None);
}

fn new_customer_submission() -> FormSubmission {
    FormSubmission {
        name: Some("Jane Doe".to_string()),
        email: Some("jane@example.com".to_string()),
        phone: Some("415-555-9876".to_string()),
        street: Some("500 Pine St".to_string()),
        city: Some("San Francisco".to_string()),
        zip: Some("94108".to_string()),
        customer_type: Some("New Customer".to_string()),
        service_needed: Some("Service or Repair".to_string()),
        service_details: vec!["Water Heater".to_string()],
        service_request_details: Some("No hot water".to_string()),
        sms_consent: Some(true),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_full_workflow_creates_customer_and_lead() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "customers": [] })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/customers"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "id": "cus_9", "first_name": "Jane" })),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/leads"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "lead_9" })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let orchestrator = orchestrator_for(&config);

    let result = orchestrator.process(&new_customer_submission()).await;

    assert!(result.success, "workflow failed: {:?}", result.error);
    assert_eq!(result.customer_id.as_deref(), Some("cus_9"));
    assert_eq!(result.lead_id.as_deref(), Some("lead_9"));
    assert!(result.message.contains("none"));
    assert_eq!(result.error, None);
}

#[tokio::test]
async fn test_repeated_submission_is_idempotent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "customers": [] })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "cus_9" })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/leads"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "lead_9" })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let orchestrator = orchestrator_for(&config);
    let submission = new_customer_submission();

    let first = orchestrator.process(&submission).await;
    let second = orchestrator.process(&submission).await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_customer_creation_failure_aborts_before_lead() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "customers": [] })))
        .mount(&mock_server)
        .await;
    // Creation succeeds at the HTTP level but returns no id
    Mock::given(method("POST"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "status": "accepted" })))
        .mount(&mock_server)
        .await;
    // The lead endpoint must never be reached
    Mock::given(method("POST"))
        .and(path("/leads"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "lead_9" })))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let orchestrator = orchestrator_for(&config);

    let result = orchestrator.process(&new_customer_submission()).await;

    assert!(!result.success);
    assert_eq!(result.customer_id, None);
    assert_eq!(result.lead_id, None);
    assert_eq!(result.error.as_deref(), Some("Failed to create customer"));
}

#[tokio::test]
async fn test_lead_creation_failure_preserves_customer_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "customers": [] })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "cus_9" })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/leads"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let orchestrator = orchestrator_for(&config);

    let result = orchestrator.process(&new_customer_submission()).await;

    assert!(!result.success);
    assert_eq!(result.customer_id.as_deref(), Some("cus_9"));
    assert_eq!(result.lead_id, None);
    assert_eq!(result.error.as_deref(), Some("Failed to create lead"));
}

#[tokio::test]
async fn test_existing_customer_reuses_matching_address() {
    let mock_server = MockServer::start().await;

    let existing = json!({
        "id": "cus_1",
        "first_name": "Jane",
        "last_name": "Doe",
        "email": "jane@example.com",
        "mobile_number": "+14155559876",
        "addresses": [{
            "id": "adr_1",
            "street": "500 Pine St",
            "city": "San Francisco",
            "state": "CA",
            "zip": "94108"
        }]
    });

    Mock::given(method("GET"))
        .and(path("/customers"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "customers": [existing] })),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/customers/cus_1/addresses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "addresses": [{
                "id": "adr_1",
                "street": "500 Pine St",
                "city": "San Francisco",
                "state": "CA",
                "zip": "94108"
            }]
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/customers/cus_1/addresses/adr_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "adr_1",
            "street": "500 Pine St",
            "city": "San Francisco",
            "state": "CA",
            "zip": "94108",
            "country": "US"
        })))
        .mount(&mock_server)
        .await;
    // No new address may be created for an address the customer already has
    Mock::given(method("POST"))
        .and(path("/customers/cus_1/addresses"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "address": null })))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/leads"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "lead_7" })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let orchestrator = orchestrator_for(&config);

    let mut submission = new_customer_submission();
    submission.phone = Some("415-555-9876".to_string());
    submission.customer_type = Some("Existing Customer".to_string());

    let result = orchestrator.process(&submission).await;

    assert!(result.success, "workflow failed: {:?}", result.error);
    assert_eq!(result.customer_id.as_deref(), Some("cus_1"));
    assert_eq!(result.lead_id.as_deref(), Some("lead_7"));
    assert!(result.message.contains("exact"));
}

#[tokio::test]
async fn test_directory_client_line_items_and_note() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/leads/lead_1/line_items"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "line_items": [{ "name": "Water Heater Service", "kind": "labor" }]
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/leads/lead_1/notes"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "note": { "id": "note_1", "note": "follow up" }
        })))
        .mount(&mock_server)
        .await;

    let client = DirectoryClient::new(mock_server.uri(), "test_key".to_string()).expect("client");

    let items = client
        .add_lead_line_items(
            "lead_1",
            &[rust_lead_intake::models::LineItem {
                name: "Water Heater Service".to_string(),
                kind: "labor".to_string(),
                description: None,
            }],
        )
        .await
        .expect("line items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Water Heater Service");

    let note = client
        .add_lead_note("lead_1", "follow up", true)
        .await
        .expect("note");
    assert!(note.is_some());
}

#[tokio::test]
async fn test_directory_client_address_endpoints() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/customers/cus_1/addresses"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "address": { "id": "adr_9", "street": "500 Pine St" }
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/customers/cus_1/addresses/adr_404"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&mock_server)
        .await;

    let client = DirectoryClient::new(mock_server.uri(), "test_key".to_string()).expect("client");

    let created = client
        .add_customer_address(
            "cus_1",
            &rust_lead_intake::orchestrator::build_address_payload(
                &rust_lead_intake::models::ParsedAddress {
                    street: Some("500 Pine St".to_string()),
                    ..Default::default()
                },
                "CA",
                Some("service"),
            )
            .expect("payload"),
        )
        .await
        .expect("address");
    assert_eq!(created.map(|a| a.id), Some("adr_9".to_string()));

    let missing = client
        .get_address_by_id("cus_1", "adr_404")
        .await
        .expect("fetch");
    assert!(missing.is_none());
}
