// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Device predicates
//!
//! `is_used` and `is_rom` only look at the lsblk record. `is_blank` and
//! `is_open` each run an external tool against the device node.

use blockdev::{Device, Error, Inspector};

use crate::Predicate;

/// Predicate evaluation function
pub(crate) type PredicateFn = fn(&Inspector<'_>, &Device) -> Result<bool, Error>;

/// Predicates in evaluation order: lsblk-only checks before the ones that
/// spawn a process, so devices already rejected never reach wipefs or lsof.
pub(crate) static PREDICATES: [(Predicate, PredicateFn); 4] = [
    (Predicate::Rom, check_rom),
    (Predicate::Used, check_used),
    (Predicate::Blank, is_blank),
    (Predicate::Open, is_open),
];

fn check_rom(_: &Inspector<'_>, device: &Device) -> Result<bool, Error> {
    Ok(is_rom(device))
}

fn check_used(_: &Inspector<'_>, device: &Device) -> Result<bool, Error> {
    Ok(is_used(device))
}

/// A device is used if it has children (partitions, holders) or is mounted.
pub fn is_used(device: &Device) -> bool {
    !device.children.is_empty() || device.mountpoint().is_some()
}

/// A device is a rom if lsblk says its type is `rom`.
pub fn is_rom(device: &Device) -> bool {
    device.is_rom()
}

/// A device is blank if wipefs recognises nothing on it.
pub fn is_blank(inspector: &Inspector<'_>, device: &Device) -> Result<bool, Error> {
    Ok(!inspector.has_signatures(device)?)
}

/// A device is open if lsof says so.
pub fn is_open(inspector: &Inspector<'_>, device: &Device) -> Result<bool, Error> {
    inspector.is_open(device)
}
