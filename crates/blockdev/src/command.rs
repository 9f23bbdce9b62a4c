// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! External command execution
//!
//! Every interaction with the host goes through the [`Executor`] trait so that
//! enumeration and probing can be exercised against a fake in tests.

use std::{io, process};

use log::{debug, trace};

use crate::Error;

/// Captured result of running an external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    /// Exit code, or `None` if the process was killed by a signal
    pub code: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl Output {
    /// Creates a new output from its raw parts.
    pub fn new(code: Option<i32>, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// A zero exit with the given stdout and nothing on stderr.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self::new(Some(0), stdout, "")
    }

    /// A non-zero exit with the given stderr and nothing on stdout.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self::new(Some(code), "", stderr)
    }

    /// Returns true if the command exited with status zero.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<process::Output> for Output {
    fn from(output: process::Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Capability to run a command line and capture its result.
pub trait Executor {
    /// Runs `argv[0]` with the remaining elements as arguments.
    ///
    /// A non-zero exit is *not* an error at this level; callers interpret
    /// the [`Output`] themselves. Only failing to start the process is.
    fn execute(&self, argv: &[String]) -> Result<Output, Error>;
}

/// Runs commands on the local host with [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn execute(&self, argv: &[String]) -> Result<Output, Error> {
        let (program, args) = argv.split_first().ok_or_else(|| Error::Spawn {
            program: String::new(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "empty command line"),
        })?;

        debug!("Running {}", argv.join(" "));
        let output: Output = process::Command::new(program)
            .args(args)
            .stdin(process::Stdio::null())
            .output()
            .map_err(|source| Error::Spawn {
                program: program.clone(),
                source,
            })?
            .into();
        trace!(
            "{program} exited with {:?} ({} bytes stdout, {} bytes stderr)",
            output.code,
            output.stdout.len(),
            output.stderr.len()
        );

        Ok(output)
    }
}

/// Names (or paths) of the external tools used for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
    /// Block device enumeration tool
    pub lsblk: String,
    /// Signature scanner, always run read-only
    pub wipefs: String,
    /// Open file checker
    pub lsof: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            lsblk: "lsblk".to_owned(),
            wipefs: "wipefs".to_owned(),
            lsof: "lsof".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_argv() {
        let err = SystemExecutor.execute(&[]).unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }

    #[test]
    fn test_missing_program() {
        let argv = vec!["/nonexistent/blk-filter-tool".to_owned()];
        match SystemExecutor.execute(&argv) {
            Err(Error::Spawn { program, source }) => {
                assert_eq!(program, "/nonexistent/blk-filter-tool");
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_output_success() {
        assert!(Output::ok("").success());
        assert!(!Output::failed(1, "boom").success());
        assert!(!Output::new(None, "", "").success());
    }
}
