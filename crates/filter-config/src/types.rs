// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::fmt;

use kdl::KdlValue;

/// The type of a KDL value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdlType {
    /// A boolean value
    Boolean,
    /// A string value
    String,
    /// A null value
    Null,
    /// An integer value
    Integer,
    /// A floating point value
    Float,
}

impl KdlType {
    // Determine the kdl value type
    pub fn for_value(value: &KdlValue) -> Self {
        if value.is_bool() {
            Self::Boolean
        } else if value.is_string() {
            Self::String
        } else if value.is_null() {
            Self::Null
        } else if value.is_integer() {
            Self::Integer
        } else {
            Self::Float
        }
    }
}

impl fmt::Display for KdlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KdlType::Boolean => f.write_str("boolean"),
            KdlType::String => f.write_str("string"),
            KdlType::Null => f.write_str("null"),
            KdlType::Integer => f.write_str("int"),
            KdlType::Float => f.write_str("float"),
        }
    }
}
