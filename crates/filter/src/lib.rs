// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Block device filtering
//!
//! A [`FilterRequest`] constrains up to four predicates. A device passes when
//! every constrained predicate evaluates to the requested value; unconstrained
//! predicates are skipped entirely, along with whatever tool they would run.

use blockdev::{Device, Error, Inspector};
use log::{debug, info, trace};

mod predicates;
mod request;
mod result;

pub use predicates::{is_blank, is_open, is_rom, is_used};
pub use request::{FilterRequest, Predicate};
pub use result::FilterResult;

use predicates::PREDICATES;

/// Applies a [`FilterRequest`] to lists of devices
pub struct Filter<'a> {
    inspector: &'a Inspector<'a>,
    request: FilterRequest,
}

impl<'a> Filter<'a> {
    /// Create a new filter for `request`, probing through `inspector`
    pub fn new(inspector: &'a Inspector<'a>, request: FilterRequest) -> Self {
        Self { inspector, request }
    }

    /// Returns true if `device` satisfies every constrained predicate.
    ///
    /// Evaluation stops at the first mismatch.
    pub fn matches(&self, device: &Device) -> Result<bool, Error> {
        for (predicate, func) in PREDICATES.iter() {
            let Some(wanted) = self.request.get(*predicate) else {
                continue;
            };
            let actual = func(self.inspector, device)?;
            trace!("{}: {predicate}={actual} (wanted {wanted})", device.name);
            if actual != wanted {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Keeps the devices that match, preserving their order.
    ///
    /// The first predicate failure aborts the whole run; no partial list is
    /// returned.
    pub fn apply(&self, devices: Vec<Device>) -> Result<Vec<Device>, Error> {
        if self.request.is_empty() {
            debug!("No constraints requested, keeping all {} devices", devices.len());
            return Ok(devices);
        }

        let total = devices.len();
        let mut kept = Vec::with_capacity(total);
        for device in devices {
            if self.matches(&device)? {
                kept.push(device);
            }
        }

        info!("{} of {total} devices match {}", kept.len(), self.request);
        Ok(kept)
    }
}

/// Lists devices (optionally restricted to `names`), filters them and
/// formats the result.
pub fn run<S: AsRef<str>>(
    inspector: &Inspector<'_>,
    names: &[S],
    request: FilterRequest,
) -> Result<FilterResult, Error> {
    let devices = inspector.list_devices(names)?;
    let filtered = Filter::new(inspector, request).apply(devices)?;
    Ok(FilterResult::from(filtered))
}
