//! In-memory control plane for tests
//!
//! Keeps resources in process, records every call in order, and can be told
//! to fail a given operation with a provider status code.

use crate::error::{CloudError, Result};
use crate::model::{
    NetworkInterface, NetworkInterfaceSpec, ResourceGroup, ResourceGroupSpec, ResourceId, Subnet,
    VirtualMachine, VirtualMachineSpec, VirtualNetwork, VirtualNetworkSpec, WaitUntil,
};
use crate::provider::ControlPlane;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

pub const MOCK_SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetResourceGroup,
    CreateResourceGroup,
    DeleteResourceGroup,
    GetVirtualNetwork,
    CreateVirtualNetwork,
    GetNetworkInterface,
    CreateNetworkInterface,
    DeleteNetworkInterface,
    GetVirtualMachine,
    CreateVirtualMachine,
}

impl Operation {
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Operation::GetResourceGroup
                | Operation::GetVirtualNetwork
                | Operation::GetNetworkInterface
                | Operation::GetVirtualMachine
        )
    }
}

/// A recorded call: the operation, the target name and the wait policy used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub operation: Operation,
    pub name: String,
    pub wait: Option<WaitUntil>,
}

#[derive(Default)]
struct MockState {
    groups: HashMap<String, ResourceGroup>,
    vnets: HashMap<(String, String), VirtualNetwork>,
    nics: HashMap<(String, String), NetworkInterface>,
    vms: HashMap<(String, String), VirtualMachine>,
    calls: Vec<Call>,
    failures: HashMap<Operation, (u16, String)>,
}

#[derive(Default)]
pub struct MockControlPlane {
    state: Mutex<MockState>,
}

impl MockControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed an existing resource group
    pub fn with_resource_group(self, name: &str, location: &str) -> Self {
        self.state().groups.insert(
            name.to_string(),
            ResourceGroup {
                id: ResourceId::resource_group(MOCK_SUBSCRIPTION, name),
                name: name.to_string(),
                location: location.to_string(),
                provisioning_state: Some("Succeeded".to_string()),
            },
        );
        self
    }

    /// Seed an existing virtual network with the given subnets
    pub fn with_virtual_network(self, resource_group: &str, name: &str, subnets: &[&str]) -> Self {
        let location = self
            .state()
            .groups
            .get(resource_group)
            .map(|g| g.location.clone());
        let vnet = VirtualNetwork {
            id: ResourceId::virtual_network(MOCK_SUBSCRIPTION, resource_group, name),
            name: name.to_string(),
            location,
            address_prefixes: vec![crate::model::VNET_ADDRESS_PREFIX.to_string()],
            subnets: subnets
                .iter()
                .map(|s| Subnet {
                    id: ResourceId::subnet(MOCK_SUBSCRIPTION, resource_group, name, s),
                    name: s.to_string(),
                    address_prefix: None,
                })
                .collect(),
        };
        self.state()
            .vnets
            .insert((resource_group.to_string(), name.to_string()), vnet);
        self
    }

    /// Seed a machine the control plane knows by name but has no data for
    pub fn with_unrealized_virtual_machine(self, resource_group: &str, name: &str) -> Self {
        let vm = VirtualMachine {
            id: ResourceId::virtual_machine(MOCK_SUBSCRIPTION, resource_group, name),
            name: name.to_string(),
            location: None,
            provisioning_state: None,
        };
        self.state()
            .vms
            .insert((resource_group.to_string(), name.to_string()), vm);
        self
    }

    /// Make every future `operation` fail with `status` and `message`
    pub fn fail(&self, operation: Operation, status: u16, message: &str) {
        self.state()
            .failures
            .insert(operation, (status, message.to_string()));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.state().calls.iter().map(|c| c.operation).collect()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.operation.is_mutation())
            .cloned()
            .collect()
    }

    pub fn has_network_interface(&self, resource_group: &str, name: &str) -> bool {
        self.state()
            .nics
            .contains_key(&(resource_group.to_string(), name.to_string()))
    }

    pub fn has_virtual_machine(&self, resource_group: &str, name: &str) -> bool {
        self.state()
            .vms
            .contains_key(&(resource_group.to_string(), name.to_string()))
    }

    /// Record the call, then honor cancellation and injected failures
    fn enter(
        &self,
        operation: Operation,
        name: &str,
        wait: Option<WaitUntil>,
        cancel: &CancellationToken,
    ) -> Result<MutexGuard<'_, MockState>> {
        let mut state = self.state();
        state.calls.push(Call {
            operation,
            name: name.to_string(),
            wait,
        });
        if cancel.is_cancelled() {
            return Err(CloudError::Cancelled);
        }
        if let Some((status, message)) = state.failures.get(&operation) {
            return Err(CloudError::remote(*status, message.clone()));
        }
        Ok(state)
    }
}

fn terminal_state(wait: WaitUntil) -> String {
    match wait {
        WaitUntil::Completed => "Succeeded".to_string(),
        WaitUntil::Started => "Accepted".to_string(),
    }
}

fn group_not_found(name: &str) -> CloudError {
    CloudError::Remote {
        status: 404,
        code: Some("ResourceGroupNotFound".to_string()),
        message: format!("Resource group '{name}' could not be found."),
    }
}

#[async_trait]
impl ControlPlane for MockControlPlane {
    fn name(&self) -> &str {
        "mock"
    }

    async fn get_resource_group(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<ResourceGroup>> {
        let state = self.enter(Operation::GetResourceGroup, name, None, cancel)?;
        Ok(state.groups.get(name).cloned())
    }

    async fn create_resource_group(
        &self,
        name: &str,
        spec: &ResourceGroupSpec,
        wait: WaitUntil,
        cancel: &CancellationToken,
    ) -> Result<ResourceGroup> {
        let mut state = self.enter(Operation::CreateResourceGroup, name, Some(wait), cancel)?;
        let group = ResourceGroup {
            id: ResourceId::resource_group(MOCK_SUBSCRIPTION, name),
            name: name.to_string(),
            location: spec.location.clone(),
            provisioning_state: Some(terminal_state(wait)),
        };
        state.groups.insert(name.to_string(), group.clone());
        Ok(group)
    }

    async fn delete_resource_group(
        &self,
        name: &str,
        wait: WaitUntil,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut state = self.enter(Operation::DeleteResourceGroup, name, Some(wait), cancel)?;
        if state.groups.remove(name).is_none() {
            return Err(group_not_found(name));
        }
        state.vnets.retain(|(rg, _), _| rg != name);
        state.nics.retain(|(rg, _), _| rg != name);
        state.vms.retain(|(rg, _), _| rg != name);
        Ok(())
    }

    async fn get_virtual_network(
        &self,
        resource_group: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<VirtualNetwork>> {
        let state = self.enter(Operation::GetVirtualNetwork, name, None, cancel)?;
        Ok(state
            .vnets
            .get(&(resource_group.to_string(), name.to_string()))
            .cloned())
    }

    async fn create_virtual_network(
        &self,
        resource_group: &str,
        name: &str,
        spec: &VirtualNetworkSpec,
        wait: WaitUntil,
        cancel: &CancellationToken,
    ) -> Result<VirtualNetwork> {
        let mut state = self.enter(Operation::CreateVirtualNetwork, name, Some(wait), cancel)?;
        if !state.groups.contains_key(resource_group) {
            return Err(group_not_found(resource_group));
        }
        let vnet = VirtualNetwork {
            id: ResourceId::virtual_network(MOCK_SUBSCRIPTION, resource_group, name),
            name: name.to_string(),
            location: Some(spec.location.clone()),
            address_prefixes: spec.address_prefixes.clone(),
            subnets: spec
                .subnets
                .iter()
                .map(|s| Subnet {
                    id: ResourceId::subnet(MOCK_SUBSCRIPTION, resource_group, name, &s.name),
                    name: s.name.clone(),
                    address_prefix: Some(s.address_prefix.clone()),
                })
                .collect(),
        };
        state
            .vnets
            .insert((resource_group.to_string(), name.to_string()), vnet.clone());
        Ok(vnet)
    }

    async fn get_network_interface(
        &self,
        resource_group: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<NetworkInterface>> {
        let state = self.enter(Operation::GetNetworkInterface, name, None, cancel)?;
        Ok(state
            .nics
            .get(&(resource_group.to_string(), name.to_string()))
            .cloned())
    }

    async fn create_network_interface(
        &self,
        resource_group: &str,
        name: &str,
        spec: &NetworkInterfaceSpec,
        wait: WaitUntil,
        cancel: &CancellationToken,
    ) -> Result<NetworkInterface> {
        let mut state = self.enter(Operation::CreateNetworkInterface, name, Some(wait), cancel)?;
        if !state.groups.contains_key(resource_group) {
            return Err(group_not_found(resource_group));
        }
        let nic = NetworkInterface {
            id: ResourceId::network_interface(MOCK_SUBSCRIPTION, resource_group, name),
            name: name.to_string(),
            location: Some(spec.location.clone()),
            subnet_id: Some(spec.subnet_id.clone()),
        };
        state
            .nics
            .insert((resource_group.to_string(), name.to_string()), nic.clone());
        Ok(nic)
    }

    async fn delete_network_interface(
        &self,
        resource_group: &str,
        name: &str,
        wait: WaitUntil,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut state = self.enter(Operation::DeleteNetworkInterface, name, Some(wait), cancel)?;
        state
            .nics
            .remove(&(resource_group.to_string(), name.to_string()));
        Ok(())
    }

    async fn get_virtual_machine(
        &self,
        resource_group: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<VirtualMachine>> {
        let state = self.enter(Operation::GetVirtualMachine, name, None, cancel)?;
        Ok(state
            .vms
            .get(&(resource_group.to_string(), name.to_string()))
            .cloned())
    }

    async fn create_virtual_machine(
        &self,
        resource_group: &str,
        name: &str,
        spec: &VirtualMachineSpec,
        wait: WaitUntil,
        cancel: &CancellationToken,
    ) -> Result<VirtualMachine> {
        let mut state = self.enter(Operation::CreateVirtualMachine, name, Some(wait), cancel)?;
        if !state.groups.contains_key(resource_group) {
            return Err(group_not_found(resource_group));
        }
        let nic_exists = state
            .nics
            .values()
            .any(|nic| nic.id == spec.network_interface_id);
        if !nic_exists {
            return Err(CloudError::Remote {
                status: 400,
                code: Some("InvalidResourceReference".to_string()),
                message: format!(
                    "Resource {} referenced by resource {name} was not found.",
                    spec.network_interface_id
                ),
            });
        }
        let vm = VirtualMachine {
            id: ResourceId::virtual_machine(MOCK_SUBSCRIPTION, resource_group, name),
            name: name.to_string(),
            location: Some(spec.location.clone()),
            provisioning_state: Some(terminal_state(wait)),
        };
        state
            .vms
            .insert((resource_group.to_string(), name.to_string()), vm.clone());
        Ok(vm)
    }
}
