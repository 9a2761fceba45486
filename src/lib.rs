//! Web-form lead intake service.
//!
//! Receives form submissions over a webhook, resolves the submitter against
//! an external field-service CRM ("the directory"), and files a sales lead
//! with the right customer and address attached.
//!
//! # Modules
//!
//! - `address`: free-text address parsing and fuzzy address comparison.
//! - `config`: configuration management.
//! - `directory_client`: directory API client.
//! - `errors`: error handling types.
//! - `handlers`: shared state and health handler.
//! - `matching`: customer identity resolution and address reconciliation.
//! - `models`: core data models.
//! - `orchestrator`: the submission-to-lead workflow.
//! - `phone`: phone number canonicalization.
//! - `similarity`: sequence similarity ratio.
//! - `webhook_handler`: form webhook handlers.
//! - `webhook_models`: webhook payload models.

pub mod address;
pub mod config;
pub mod directory_client;
pub mod errors;
pub mod handlers;
pub mod matching;
pub mod models;
pub mod orchestrator;
pub mod phone;
pub mod similarity;
pub mod webhook_handler;
pub mod webhook_models;
