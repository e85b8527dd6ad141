//! InfraFlow Azure control plane
//!
//! Talks to Azure Resource Manager over its REST API: service principal
//! authentication, throttling retries and long-running operation polling.
//!
//! # Environment variables
//!
//! - `AZURE_TENANT_ID`: Directory (tenant) of the service principal
//! - `AZURE_CLIENT_ID`: Application (client) ID
//! - `AZURE_CLIENT_SECRET`: Client secret
//! - `AZURE_SUBSCRIPTION_ID`: Subscription to provision into
//! - `AZURE_AUTHORITY_HOST`: Optional identity endpoint override
//! - `AZURE_RESOURCE_MANAGER_ENDPOINT`: Optional Resource Manager override

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod provider;
pub mod wire;

pub use config::AzureConfig;
pub use error::{AzureError, Result};
pub use provider::AzureControlPlane;
