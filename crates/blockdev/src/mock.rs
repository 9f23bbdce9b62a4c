// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Mock executor for testing.
//!
//! This module provides an [`Executor`] that answers from a table of canned
//! outputs, so enumeration and filtering can be tested without touching the
//! host's devices.

use std::{cell::RefCell, collections::HashMap, io};

use crate::{Error, Executor, Output};

/// Answers commands from a fixed table and records every command line it sees.
#[derive(Debug, Default)]
pub struct MockExecutor {
    responses: HashMap<Vec<String>, Output>,
    calls: RefCell<Vec<Vec<String>>>,
}

impl MockExecutor {
    /// Creates a mock with no responses
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the output returned for an exact command line
    pub fn with_response(mut self, argv: &[&str], output: Output) -> Self {
        let argv = argv.iter().map(|a| (*a).to_owned()).collect();
        self.responses.insert(argv, output);
        self
    }

    /// Every command line executed so far, in call order
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }

    /// Number of executed commands whose program is `program`
    pub fn count(&self, program: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|argv| argv.first().is_some_and(|p| p == program))
            .count()
    }
}

impl Executor for MockExecutor {
    fn execute(&self, argv: &[String]) -> Result<Output, Error> {
        self.calls.borrow_mut().push(argv.to_vec());
        self.responses.get(argv).cloned().ok_or_else(|| Error::Spawn {
            program: argv.first().cloned().unwrap_or_default(),
            source: io::Error::new(io::ErrorKind::NotFound, "no mocked response"),
        })
    }
}
