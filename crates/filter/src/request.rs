// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::fmt;

/// One of the four device predicates a request can constrain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    /// Device type is rom
    Rom,
    /// Device has children or a mountpoint
    Used,
    /// wipefs finds nothing on the device
    Blank,
    /// lsof considers the device open
    Open,
}

impl Predicate {
    /// All predicates, in declaration order
    pub const ALL: [Predicate; 4] = [Predicate::Rom, Predicate::Used, Predicate::Blank, Predicate::Open];

    /// The request key controlling this predicate
    pub fn key(&self) -> &'static str {
        match self {
            Predicate::Rom => "is_rom",
            Predicate::Used => "is_used",
            Predicate::Blank => "is_blank",
            Predicate::Open => "is_open",
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Which predicates to check and the value each must have.
///
/// `None` leaves a predicate unconstrained and it is never evaluated.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FilterRequest {
    pub is_used: Option<bool>,
    pub is_open: Option<bool>,
    pub is_blank: Option<bool>,
    pub is_rom: Option<bool>,
}

impl FilterRequest {
    /// Returns the requested value for `predicate`.
    pub fn get(&self, predicate: Predicate) -> Option<bool> {
        match predicate {
            Predicate::Rom => self.is_rom,
            Predicate::Used => self.is_used,
            Predicate::Blank => self.is_blank,
            Predicate::Open => self.is_open,
        }
    }

    /// Sets the requested value for `predicate`.
    pub fn set(&mut self, predicate: Predicate, value: Option<bool>) {
        let slot = match predicate {
            Predicate::Rom => &mut self.is_rom,
            Predicate::Used => &mut self.is_used,
            Predicate::Blank => &mut self.is_blank,
            Predicate::Open => &mut self.is_open,
        };
        *slot = value;
    }

    /// Builder form of [`FilterRequest::set`].
    pub fn with(mut self, predicate: Predicate, value: bool) -> Self {
        self.set(predicate, Some(value));
        self
    }

    /// True if no predicate is constrained.
    pub fn is_empty(&self) -> bool {
        Predicate::ALL.iter().all(|p| self.get(*p).is_none())
    }

    /// Layers `overrides` on top of this request; any flag set there wins.
    pub fn merge(self, overrides: FilterRequest) -> Self {
        Self {
            is_used: overrides.is_used.or(self.is_used),
            is_open: overrides.is_open.or(self.is_open),
            is_blank: overrides.is_blank.or(self.is_blank),
            is_rom: overrides.is_rom.or(self.is_rom),
        }
    }
}

impl fmt::Display for FilterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for predicate in Predicate::ALL {
            if let Some(value) = self.get(predicate) {
                if !first {
                    f.write_str(", ")?;
                }
                write!(f, "{predicate}={value}")?;
                first = false;
            }
        }
        if first {
            f.write_str("<no constraints>")?;
        }
        Ok(())
    }
}
