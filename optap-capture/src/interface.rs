//! Network interface lookup

use optap_core::{Error, Result};
use pnet_datalink::{self, NetworkInterface};
use std::net::IpAddr;

/// Information about a network interface
#[derive(Debug, Clone)]
pub struct InterfaceInfo {
    /// Interface name (e.g., "lo", "lo0")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Addresses assigned to this interface
    pub ips: Vec<IpAddr>,
    /// Whether the interface is up
    pub is_up: bool,
    /// Whether the interface is a loopback
    pub is_loopback: bool,
    /// Interface index
    pub index: u32,
}

impl From<&NetworkInterface> for InterfaceInfo {
    fn from(iface: &NetworkInterface) -> Self {
        InterfaceInfo {
            name: iface.name.clone(),
            description: iface.description.clone(),
            ips: iface.ips.iter().map(|network| network.ip()).collect(),
            is_up: iface.is_up(),
            is_loopback: iface.is_loopback(),
            index: iface.index,
        }
    }
}

/// List all available network interfaces
pub fn list_interfaces() -> Vec<InterfaceInfo> {
    pnet_datalink::interfaces()
        .iter()
        .map(InterfaceInfo::from)
        .collect()
}

/// Get information about a specific interface by name
pub fn get_interface(name: &str) -> Result<InterfaceInfo> {
    pnet_datalink::interfaces()
        .iter()
        .find(|iface| iface.name == name)
        .map(InterfaceInfo::from)
        .ok_or_else(|| Error::InterfaceNotFound(name.to_string()))
}

/// Find the loopback interface, whatever the platform calls it
pub fn loopback_interface() -> Result<InterfaceInfo> {
    list_interfaces()
        .into_iter()
        .find(|iface| iface.is_loopback)
        .ok_or_else(|| Error::InterfaceNotFound("loopback".to_string()))
}
