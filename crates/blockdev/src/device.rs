// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::DEVFS_DIR;

/// The `type` reported by lsblk for optical drives
pub const ROM_TYPE: &str = "rom";

/// A block device as reported by `lsblk --json -O`.
///
/// Only the fields needed for filtering are typed. Everything else lsblk
/// reports is kept in [`Device::attributes`] and written back out untouched.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Device {
    /// Kernel device name (e.g. sda, sda1, sr0)
    pub name: String,

    /// Partitions, device-mapper targets, RAID members and so on
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Device>,

    /// Where the device is mounted, if anywhere
    #[serde(default)]
    pub mountpoint: Option<String>,

    /// Device category: disk, part, rom, loop, lvm, crypt, ...
    #[serde(rename = "type")]
    pub kind: String,

    /// Remaining lsblk columns
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Device {
    /// Creates a device with no children, no mountpoint and no extra attributes.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            mountpoint: None,
            kind: kind.into(),
            attributes: Map::new(),
        }
    }

    /// Sets the mountpoint.
    pub fn with_mountpoint(self, mountpoint: impl Into<String>) -> Self {
        Self {
            mountpoint: Some(mountpoint.into()),
            ..self
        }
    }

    /// Appends a child device.
    pub fn with_child(mut self, child: Device) -> Self {
        self.children.push(child);
        self
    }

    /// Path to the device node under /dev
    pub fn path(&self) -> PathBuf {
        Path::new(DEVFS_DIR).join(&self.name)
    }

    /// Returns the mountpoint, treating an empty string as unmounted.
    pub fn mountpoint(&self) -> Option<&str> {
        self.mountpoint.as_deref().filter(|m| !m.is_empty())
    }

    /// Returns true if lsblk categorises this device as an optical drive.
    pub fn is_rom(&self) -> bool {
        self.kind == ROM_TYPE
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)?;
        if let Some(mountpoint) = self.mountpoint() {
            write!(f, " on {mountpoint}")?;
        }
        Ok(())
    }
}

/// Top-level document printed by `lsblk --json`
#[derive(Debug, Deserialize)]
pub(crate) struct Listing {
    pub blockdevices: Vec<Device>,
}

/// Prefixes `name` with `/dev/` unless it already is a /dev path.
pub fn normalize_device_name(name: &str) -> String {
    if name.starts_with("/dev/") {
        name.to_owned()
    } else {
        format!("{DEVFS_DIR}/{name}")
    }
}
