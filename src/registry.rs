// AIN Monitor - Analog input monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Route and device registration
//!
//! At init the monitor announces the route it answers on and the device it
//! represents. The host decides what to do with both.

use std::collections::HashMap;

/// Route served by the analog input channel
pub const AIN_ROUTE: &str = "/ain";

/// Origin of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Built into the node
    Native,
}

/// One registered device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    /// Origin
    pub kind: DeviceKind,
    /// Index among devices of the same kind
    pub index: u32,
    /// Full device name
    pub name: String,
    /// Route the device answers on
    pub route: String,
}

/// Registration facility provided by the host
pub trait Registry {
    /// Register a request route
    fn register_route(&mut self, route: &str);

    /// Register a device
    fn register_device(&mut self, device: DeviceEntry);
}

/// In-memory directory of routes and devices
#[derive(Debug, Clone, Default)]
pub struct DeviceDirectory {
    routes: Vec<String>,
    devices: HashMap<String, DeviceEntry>,
}

impl DeviceDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered routes
    pub fn routes(&self) -> &[String] {
        &self.routes
    }

    /// Find a device by name
    pub fn lookup(&self, name: &str) -> Option<&DeviceEntry> {
        self.devices.get(name)
    }

    /// All devices, sorted by name
    pub fn devices(&self) -> Vec<&DeviceEntry> {
        let mut devices: Vec<_> = self.devices.values().collect();
        devices.sort_by(|a, b| a.name.cmp(&b.name));
        devices
    }
}

impl Registry for DeviceDirectory {
    fn register_route(&mut self, route: &str) {
        if !self.routes.iter().any(|r| r == route) {
            self.routes.push(route.to_string());
        }
    }

    fn register_device(&mut self, device: DeviceEntry) {
        self.devices.insert(device.name.clone(), device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> DeviceEntry {
        DeviceEntry {
            kind: DeviceKind::Native,
            index: 0,
            name: name.to_string(),
            route: AIN_ROUTE.to_string(),
        }
    }

    #[test]
    fn test_register_route_once() {
        let mut directory = DeviceDirectory::new();
        directory.register_route(AIN_ROUTE);
        directory.register_route(AIN_ROUTE);
        assert_eq!(directory.routes(), &[AIN_ROUTE.to_string()]);
    }

    #[test]
    fn test_register_and_lookup() {
        let mut directory = DeviceDirectory::new();
        directory.register_device(entry("b-AIN"));
        directory.register_device(entry("a-AIN"));
        assert_eq!(directory.lookup("a-AIN"), Some(&entry("a-AIN")));
        assert!(directory.lookup("c-AIN").is_none());
        let names: Vec<_> = directory.devices().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a-AIN", "b-AIN"]);
    }
}
