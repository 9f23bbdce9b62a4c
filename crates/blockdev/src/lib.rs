// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Block device enumeration and inspection
//!
//! Devices are listed with `lsblk`, scanned for signatures with `wipefs`
//! (never with `-a`) and checked for open handles with `lsof`. All three are
//! run through an [`Executor`] so callers can substitute a fake.

use std::io;

use log::{debug, info, warn};
use thiserror::Error;

mod command;
mod device;
pub mod mock;

pub use command::{Executor, Output, SystemExecutor, Tools};
pub use device::{normalize_device_name, Device, ROM_TYPE};

use device::Listing;

const DEVFS_DIR: &str = "/dev";

/// Errors raised while talking to the external tools
#[derive(Debug, Error)]
pub enum Error {
    /// The tool could not be started at all
    #[error("unable to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The tool ran but reported failure
    #[error("{command} failed ({}): {stderr}", describe_exit(.code))]
    Execution {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// lsblk printed something that is not the expected JSON document
    #[error("unable to parse lsblk output. Output: {output}, error: {source}")]
    Parse {
        output: String,
        #[source]
        source: serde_json::Error,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("rc={code}"),
        None => "killed by signal".to_owned(),
    }
}

impl Error {
    fn execution(argv: &[String], output: Output) -> Self {
        Self::Execution {
            command: argv.join(" "),
            code: output.code,
            stderr: output.stderr.trim_end().to_owned(),
        }
    }
}

/// Runs the inspection tools against the host's block devices.
pub struct Inspector<'a> {
    executor: &'a dyn Executor,
    tools: Tools,
}

impl<'a> Inspector<'a> {
    /// Creates an inspector running `tools` through `executor`.
    pub fn new(executor: &'a dyn Executor, tools: Tools) -> Self {
        Self { executor, tools }
    }

    /// Lists block devices, restricted to `names` if any are given.
    ///
    /// Names without a `/dev/` prefix get one. The listing is never cached;
    /// every call runs lsblk again.
    pub fn list_devices<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Device>, Error> {
        let mut argv = vec![self.tools.lsblk.clone(), "-O".to_owned(), "--json".to_owned()];
        argv.extend(names.iter().map(|n| normalize_device_name(n.as_ref())));

        let output = self.executor.execute(&argv)?;
        if !output.success() {
            return Err(Error::execution(&argv, output));
        }
        if !output.stderr.is_empty() {
            warn!("{}: {}", self.tools.lsblk, output.stderr.trim_end());
        }

        let listing: Listing = serde_json::from_str(&output.stdout).map_err(|source| Error::Parse {
            output: output.stdout.clone(),
            source,
        })?;

        info!("lsblk reported {} block devices", listing.blockdevices.len());
        Ok(listing.blockdevices)
    }

    /// Returns true if wipefs recognises any signature on the device.
    ///
    /// wipefs is run without `-a`, so the device is only read.
    pub fn has_signatures(&self, device: &Device) -> Result<bool, Error> {
        let argv = vec![self.tools.wipefs.clone(), device.path().display().to_string()];
        let output = self.executor.execute(&argv)?;
        if !output.success() {
            return Err(Error::execution(&argv, output));
        }

        let found = !output.stdout.is_empty();
        debug!("{}: signatures found: {found}", device.name);
        Ok(found)
    }

    /// Returns true if the device counts as open according to lsof.
    ///
    /// Anything lsof prints on stderr is treated as a failure, whatever the
    /// exit code. Otherwise the device is open only on a zero exit with
    /// empty stdout.
    pub fn is_open(&self, device: &Device) -> Result<bool, Error> {
        let argv = vec![self.tools.lsof.clone(), device.path().display().to_string()];
        let output = self.executor.execute(&argv)?;
        if !output.stderr.is_empty() {
            return Err(Error::execution(&argv, output));
        }

        let open = output.success() && output.stdout.is_empty();
        debug!("{}: open: {open}", device.name);
        Ok(open)
    }
}
