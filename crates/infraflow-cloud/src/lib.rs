//! InfraFlow Cloud
//!
//! Provisions a fixed topology on a cloud control plane: a resource group, a
//! virtual network inside it, and virtual machines (each with its own network
//! interface) attached to that network.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   infraflowd                    │
//! │                  (HTTP routes)                  │
//! └─────────────────┬───────────────────────────────┘
//!                   │ Outcome<T>
//! ┌─────────────────▼───────────────────────────────┐
//! │                infraflow-cloud                  │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  Provisioner (workflows)                 │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐             │
//! │  │  resources   │  │   outcome    │             │
//! │  └──────────────┘  └──────────────┘             │
//! │  trait ControlPlane { ... }                     │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼───────┐
//! │     azure     │
//! │ control plane │
//! └───────────────┘
//! ```

pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod model;
pub mod orchestrator;
pub mod outcome;
pub mod provider;
pub mod resources;

// Re-exports
pub use error::{CloudError, Result};
pub use model::{
    AdminAccess, ImageReference, NetworkInterface, NetworkInterfaceSpec, OsDiskSpec,
    ResourceGroup, ResourceGroupSpec, ResourceId, ResourceKind, SecuritySpec, Subnet, SubnetSpec,
    VirtualMachine, VirtualMachineSpec, VirtualNetwork, VirtualNetworkSpec, WaitUntil,
};
pub use orchestrator::Provisioner;
pub use outcome::Outcome;
pub use provider::{ControlPlane, PollConfig, RetryConfig};
pub use tokio_util::sync::CancellationToken;
