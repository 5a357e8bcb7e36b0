//! Freight Agents Library
//!
//! Three simulated freight-brokerage agents running on a shared scheduler:
//! customer acquisition (prospects, qualification, campaigns), global ghost
//! loads, and driver wellness monitoring.
//!
//! # Modules
//!
//! - `api`: HTTP-facing components.
//! - `core`: Engines, models and errors.
//! - `integrations`: External service clients.
//! - `acquisition`: Prospect discovery, qualification, nurture and campaigns.
//! - `agents`: Runtime wiring and lifecycle.
//! - `cache_validator`: Checksummed cache entries.
//! - `circuit_breaker`: Circuit breaker for the completion API.
//! - `completion_client`: Chat completions client and reply parsing.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `ghost_loads`: Ghost-load discovery and status progression.
//! - `handlers`: Operational HTTP handlers.
//! - `models`: Core data models.
//! - `registry`: In-memory keyed stores.
//! - `scheduler`: Cancellable periodic tasks.
//! - `simulation`: Seeded random source.
//! - `validation`: Contact validation.
//! - `wellness`: Driver wellness profiles and interventions.

pub mod api;
pub mod core;
pub mod integrations;

pub mod acquisition;
pub mod agents;
pub mod cache_validator;
pub mod circuit_breaker;
pub mod completion_client;
pub mod config;
pub mod errors;
pub mod ghost_loads;
pub mod handlers;
pub mod models;
pub mod registry;
pub mod scheduler;
pub mod simulation;
pub mod validation;
pub mod wellness;
