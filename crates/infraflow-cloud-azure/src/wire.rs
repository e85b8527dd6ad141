//! Resource Manager JSON payloads
//!
//! Request bodies are built with `json!`; responses are decoded into the
//! minimal typed shapes below and converted into the provider-neutral model.

use infraflow_cloud::{
    NetworkInterface, NetworkInterfaceSpec, ResourceGroup, ResourceGroupSpec, ResourceId, Subnet,
    VirtualMachine, VirtualMachineSpec, VirtualNetwork, VirtualNetworkSpec,
};
use serde::Deserialize;
use serde_json::{Value, json};

pub fn resource_group_body(spec: &ResourceGroupSpec) -> Value {
    json!({ "location": spec.location })
}

pub fn virtual_network_body(spec: &VirtualNetworkSpec) -> Value {
    let subnets: Vec<Value> = spec
        .subnets
        .iter()
        .map(|s| {
            json!({
                "name": s.name,
                "properties": { "addressPrefix": s.address_prefix }
            })
        })
        .collect();

    json!({
        "location": spec.location,
        "properties": {
            "addressSpace": { "addressPrefixes": spec.address_prefixes },
            "subnets": subnets
        }
    })
}

pub fn network_interface_body(spec: &NetworkInterfaceSpec) -> Value {
    json!({
        "location": spec.location,
        "properties": {
            "ipConfigurations": [{
                "name": spec.ip_configuration_name,
                "properties": {
                    "subnet": { "id": spec.subnet_id },
                    "privateIPAllocationMethod": "Dynamic"
                }
            }]
        }
    })
}

fn delete_option(delete_with_vm: bool) -> &'static str {
    if delete_with_vm { "Delete" } else { "Detach" }
}

pub fn virtual_machine_body(spec: &VirtualMachineSpec) -> Value {
    let security_type = if spec.security.trusted_launch {
        "TrustedLaunch"
    } else {
        "Standard"
    };

    json!({
        "location": spec.location,
        "properties": {
            "hardwareProfile": { "vmSize": spec.size },
            "storageProfile": {
                "imageReference": {
                    "publisher": spec.image.publisher,
                    "offer": spec.image.offer,
                    "sku": spec.image.sku,
                    "version": spec.image.version
                },
                "osDisk": {
                    "createOption": "FromImage",
                    "managedDisk": { "storageAccountType": spec.os_disk.storage_account_type },
                    "deleteOption": delete_option(spec.os_disk.delete_with_vm)
                }
            },
            "securityProfile": {
                "securityType": security_type,
                "uefiSettings": {
                    "secureBootEnabled": spec.security.secure_boot,
                    "vTpmEnabled": spec.security.virtual_tpm
                }
            },
            "additionalCapabilities": { "hibernationEnabled": spec.security.hibernation },
            "osProfile": {
                "computerName": spec.computer_name,
                "adminUsername": spec.admin.username,
                "linuxConfiguration": {
                    "disablePasswordAuthentication": true,
                    "ssh": {
                        "publicKeys": [{
                            "path": spec.admin.authorized_keys_path(),
                            "keyData": spec.admin.ssh_public_key
                        }]
                    },
                    "patchSettings": {
                        "patchMode": "ImageDefault",
                        "assessmentMode": "ImageDefault"
                    }
                }
            },
            "networkProfile": {
                "networkInterfaces": [{
                    "id": spec.network_interface_id,
                    "properties": { "deleteOption": "Delete" }
                }]
            }
        }
    })
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmResource<P> {
    id: String,
    name: String,
    location: Option<String>,
    properties: Option<P>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProvisioningProperties {
    #[serde(default)]
    provisioning_state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VirtualNetworkProperties {
    #[serde(default)]
    address_space: Option<AddressSpace>,
    #[serde(default)]
    subnets: Vec<ArmResource<SubnetProperties>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddressSpace {
    #[serde(default)]
    address_prefixes: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubnetProperties {
    #[serde(default)]
    address_prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetworkInterfaceProperties {
    #[serde(default)]
    ip_configurations: Vec<IpConfiguration>,
}

#[derive(Debug, Deserialize)]
struct IpConfiguration {
    #[serde(default)]
    properties: Option<IpConfigurationProperties>,
}

#[derive(Debug, Deserialize)]
struct IpConfigurationProperties {
    #[serde(default)]
    subnet: Option<SubResource>,
}

#[derive(Debug, Deserialize)]
struct SubResource {
    id: String,
}

pub fn parse_resource_group(body: Value) -> serde_json::Result<ResourceGroup> {
    let r: ArmResource<ProvisioningProperties> = serde_json::from_value(body)?;
    Ok(ResourceGroup {
        id: ResourceId::new(r.id),
        name: r.name,
        location: r.location.unwrap_or_default(),
        provisioning_state: r.properties.and_then(|p| p.provisioning_state),
    })
}

pub fn parse_virtual_network(body: Value) -> serde_json::Result<VirtualNetwork> {
    let r: ArmResource<VirtualNetworkProperties> = serde_json::from_value(body)?;
    let properties = r.properties.unwrap_or_default();
    Ok(VirtualNetwork {
        id: ResourceId::new(r.id),
        name: r.name,
        location: r.location,
        address_prefixes: properties
            .address_space
            .map(|a| a.address_prefixes)
            .unwrap_or_default(),
        subnets: properties
            .subnets
            .into_iter()
            .map(|s| Subnet {
                id: ResourceId::new(s.id),
                name: s.name,
                address_prefix: s.properties.and_then(|p| p.address_prefix),
            })
            .collect(),
    })
}

pub fn parse_network_interface(body: Value) -> serde_json::Result<NetworkInterface> {
    let r: ArmResource<NetworkInterfaceProperties> = serde_json::from_value(body)?;
    let subnet_id = r
        .properties
        .unwrap_or_default()
        .ip_configurations
        .into_iter()
        .find_map(|c| c.properties.and_then(|p| p.subnet))
        .map(|s| ResourceId::new(s.id));
    Ok(NetworkInterface {
        id: ResourceId::new(r.id),
        name: r.name,
        location: r.location,
        subnet_id,
    })
}

pub fn parse_virtual_machine(body: Value) -> serde_json::Result<VirtualMachine> {
    let r: ArmResource<ProvisioningProperties> = serde_json::from_value(body)?;
    Ok(VirtualMachine {
        id: ResourceId::new(r.id),
        name: r.name,
        location: r.location,
        provisioning_state: r.properties.and_then(|p| p.provisioning_state),
    })
}
