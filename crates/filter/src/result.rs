// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use blockdev::Device;
use serde::Serialize;

/// Filtered devices plus their paths and names, all in lsblk order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterResult {
    /// Full lsblk records of the matching devices
    pub devices: Vec<Device>,
    /// `/dev/<name>` for each matching device
    pub by_path: Vec<String>,
    /// Bare name of each matching device
    pub by_name: Vec<String>,
}

impl FilterResult {
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl From<Vec<Device>> for FilterResult {
    fn from(devices: Vec<Device>) -> Self {
        let by_path = devices.iter().map(|d| d.path().display().to_string()).collect();
        let by_name = devices.iter().map(|d| d.name.clone()).collect();
        Self {
            devices,
            by_path,
            by_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_devices() {
        let result = FilterResult::from(vec![Device::new("sdb", "disk"), Device::new("loop0", "loop")]);
        assert_eq!(result.by_path, ["/dev/sdb", "/dev/loop0"]);
        assert_eq!(result.by_name, ["sdb", "loop0"]);
        assert_eq!(result.devices.len(), 2);
    }

    #[test]
    fn test_empty() {
        let result = FilterResult::from(Vec::new());
        assert!(result.is_empty());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({"devices": [], "by_path": [], "by_name": []}));
    }
}
