//! Resource group primitives

use crate::error::Result;
use crate::model::{ResourceGroup, ResourceGroupSpec, WaitUntil};
use crate::provider::ControlPlane;
use tokio_util::sync::CancellationToken;

pub async fn lookup(
    client: &dyn ControlPlane,
    name: &str,
    cancel: &CancellationToken,
) -> Result<Option<ResourceGroup>> {
    tracing::debug!(resource_group = %name, "Looking up resource group");
    client.get_resource_group(name, cancel).await
}

pub async fn create(
    client: &dyn ControlPlane,
    name: &str,
    location: &str,
    wait: WaitUntil,
    cancel: &CancellationToken,
) -> Result<ResourceGroup> {
    let spec = ResourceGroupSpec {
        location: location.to_string(),
    };
    tracing::debug!(resource_group = %name, location = %location, %wait, "Creating resource group");
    client.create_resource_group(name, &spec, wait, cancel).await
}

/// Remove a resolved group. Its contents are removed by the control plane.
pub async fn delete(
    client: &dyn ControlPlane,
    group: &ResourceGroup,
    wait: WaitUntil,
    cancel: &CancellationToken,
) -> Result<()> {
    tracing::debug!(resource_group = %group.name, %wait, "Deleting resource group");
    client.delete_resource_group(&group.name, wait, cancel).await
}
