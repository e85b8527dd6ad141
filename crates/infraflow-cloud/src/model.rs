//! Resource model for the supported topology
//!
//! One resource group owns one virtual network and any number of virtual
//! machines. Each virtual machine owns exactly one network interface bound to
//! the network's single subnet.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Address space assigned to every virtual network
pub const VNET_ADDRESS_PREFIX: &str = "10.0.0.0/16";
/// Name of the single subnet carved out of the address space
pub const SUBNET_NAME: &str = "Default";
pub const SUBNET_ADDRESS_PREFIX: &str = "10.0.0.0/24";

pub const VM_SIZE: &str = "Standard_B1s";
pub const OS_DISK_STORAGE_TYPE: &str = "Standard_LRS";

/// How long a create or delete call blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitUntil {
    /// Block until the remote operation reaches a terminal state
    Completed,
    /// Return as soon as the control plane has accepted the request
    Started,
}

impl fmt::Display for WaitUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitUntil::Completed => write!(f, "completed"),
            WaitUntil::Started => write!(f, "started"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    ResourceGroup,
    VirtualNetwork,
    NetworkInterface,
    VirtualMachine,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::ResourceGroup => write!(f, "resource group"),
            ResourceKind::VirtualNetwork => write!(f, "virtual network"),
            ResourceKind::NetworkInterface => write!(f, "network interface"),
            ResourceKind::VirtualMachine => write!(f, "virtual machine"),
        }
    }
}

/// Fully-qualified path of a resource on the control plane
///
/// This is the only handle that crosses the API boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn resource_group(subscription: &str, name: &str) -> Self {
        Self(format!("/subscriptions/{subscription}/resourceGroups/{name}"))
    }

    pub fn virtual_network(subscription: &str, resource_group: &str, name: &str) -> Self {
        Self::provider_resource(
            subscription,
            resource_group,
            "Microsoft.Network/virtualNetworks",
            name,
        )
    }

    pub fn subnet(subscription: &str, resource_group: &str, vnet: &str, name: &str) -> Self {
        let vnet = Self::virtual_network(subscription, resource_group, vnet);
        Self(format!("{vnet}/subnets/{name}"))
    }

    pub fn network_interface(subscription: &str, resource_group: &str, name: &str) -> Self {
        Self::provider_resource(
            subscription,
            resource_group,
            "Microsoft.Network/networkInterfaces",
            name,
        )
    }

    pub fn virtual_machine(subscription: &str, resource_group: &str, name: &str) -> Self {
        Self::provider_resource(
            subscription,
            resource_group,
            "Microsoft.Compute/virtualMachines",
            name,
        )
    }

    fn provider_resource(
        subscription: &str,
        resource_group: &str,
        resource_type: &str,
        name: &str,
    ) -> Self {
        Self(format!(
            "/subscriptions/{subscription}/resourceGroups/{resource_group}/providers/{resource_type}/{name}"
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, i.e. the resource's own name
    pub fn name(&self) -> &str {
        self.0
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }

    /// Name of the owning resource group, if the path contains one
    pub fn resource_group_name(&self) -> Option<&str> {
        let mut segments = self.0.split('/');
        while let Some(segment) = segments.next() {
            if segment.eq_ignore_ascii_case("resourceGroups") {
                return segments.next().filter(|s| !s.is_empty());
            }
        }
        None
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroup {
    pub id: ResourceId,
    pub name: String,
    pub location: String,
    /// Opaque provider status, e.g. "Succeeded" or "Deleting"
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    pub id: ResourceId,
    pub name: String,
    pub address_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualNetwork {
    pub id: ResourceId,
    pub name: String,
    pub location: Option<String>,
    pub address_prefixes: Vec<String>,
    pub subnets: Vec<Subnet>,
}

impl VirtualNetwork {
    /// The subnet network interfaces are bound to
    pub fn primary_subnet(&self) -> Option<&Subnet> {
        self.subnets.first()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub id: ResourceId,
    pub name: String,
    pub location: Option<String>,
    pub subnet_id: Option<ResourceId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachine {
    pub id: ResourceId,
    pub name: String,
    pub location: Option<String>,
    pub provisioning_state: Option<String>,
}

impl VirtualMachine {
    /// Whether the control plane returned realized data for this machine
    pub fn has_data(&self) -> bool {
        self.location.as_deref().is_some_and(|l| !l.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroupSpec {
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetSpec {
    pub name: String,
    pub address_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualNetworkSpec {
    pub location: String,
    pub address_prefixes: Vec<String>,
    pub subnets: Vec<SubnetSpec>,
}

/// A network interface with one dynamically addressed IP configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterfaceSpec {
    pub location: String,
    pub ip_configuration_name: String,
    pub subnet_id: ResourceId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    pub publisher: String,
    pub offer: String,
    pub sku: String,
    pub version: String,
}

impl ImageReference {
    /// Ubuntu Server 24.04 LTS, latest build
    pub fn ubuntu_2404() -> Self {
        Self {
            publisher: "canonical".to_string(),
            offer: "ubuntu-24_04-lts".to_string(),
            sku: "server".to_string(),
            version: "latest".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsDiskSpec {
    pub storage_account_type: String,
    pub delete_with_vm: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecuritySpec {
    pub trusted_launch: bool,
    pub secure_boot: bool,
    pub virtual_tpm: bool,
    pub hibernation: bool,
}

/// Administrator login for provisioned machines
///
/// Only key-based access is supported; password authentication is disabled
/// on every machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminAccess {
    pub username: String,
    pub ssh_public_key: String,
}

impl AdminAccess {
    pub fn new(username: impl Into<String>, ssh_public_key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ssh_public_key: ssh_public_key.into().trim().to_string(),
        }
    }

    /// Where the public key is installed on the guest
    pub fn authorized_keys_path(&self) -> String {
        format!("/home/{}/.ssh/authorized_keys", self.username)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachineSpec {
    pub location: String,
    pub size: String,
    pub computer_name: String,
    pub image: ImageReference,
    pub os_disk: OsDiskSpec,
    pub security: SecuritySpec,
    pub admin: AdminAccess,
    pub network_interface_id: ResourceId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_id_name() {
        let id = ResourceId::virtual_machine("sub-1", "rg1", "vm1");
        assert_eq!(
            id.as_str(),
            "/subscriptions/sub-1/resourceGroups/rg1/providers/Microsoft.Compute/virtualMachines/vm1"
        );
        assert_eq!(id.name(), "vm1");
        assert_eq!(id.resource_group_name(), Some("rg1"));
    }

    #[test]
    fn test_resource_group_id() {
        let id = ResourceId::resource_group("sub-1", "rg1");
        assert_eq!(id.name(), "rg1");
        assert_eq!(id.resource_group_name(), Some("rg1"));
    }

    #[test]
    fn test_subnet_id_nests_under_vnet() {
        let id = ResourceId::subnet("sub-1", "rg1", "vnet1", SUBNET_NAME);
        assert!(id.as_str().starts_with(
            ResourceId::virtual_network("sub-1", "rg1", "vnet1").as_str()
        ));
        assert_eq!(id.name(), "Default");
    }

    #[test]
    fn test_resource_group_name_is_case_insensitive() {
        let id = ResourceId::new("/subscriptions/s/resourcegroups/RG-A/providers/x/y/z");
        assert_eq!(id.resource_group_name(), Some("RG-A"));
        assert_eq!(ResourceId::new("/subscriptions/s").resource_group_name(), None);
    }

    #[test]
    fn test_vm_without_location_has_no_data() {
        let mut vm = VirtualMachine {
            id: ResourceId::virtual_machine("s", "rg", "vm"),
            name: "vm".to_string(),
            location: None,
            provisioning_state: None,
        };
        assert!(!vm.has_data());
        vm.location = Some("westus".to_string());
        assert!(vm.has_data());
    }

    #[test]
    fn test_admin_access_trims_key() {
        let admin = AdminAccess::new("azureuser", "ssh-ed25519 AAAA test\n");
        assert_eq!(admin.ssh_public_key, "ssh-ed25519 AAAA test");
        assert_eq!(
            admin.authorized_keys_path(),
            "/home/azureuser/.ssh/authorized_keys"
        );
    }
}
