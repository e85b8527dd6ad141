//! Lookup and create primitives, one module per resource kind
//!
//! These are stateless: every function takes the control-plane client and the
//! already-resolved parent handles as explicit arguments.

pub mod network_interface;
pub mod resource_group;
pub mod virtual_machine;
pub mod virtual_network;
