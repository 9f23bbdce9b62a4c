// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use kdl::{KdlEntry, KdlNode};

use crate::{Error, InvalidArguments, InvalidType, KdlType};

// Positional (unnamed) entries of a node
pub(crate) fn arguments(node: &KdlNode) -> impl Iterator<Item = &KdlEntry> {
    node.entries().iter().filter(|e| e.name().is_none())
}

// Get the string value of an entry
pub(crate) fn entry_str(entry: &KdlEntry) -> Result<String, Error> {
    let value = entry.value();
    let value = value.as_string().ok_or_else(|| InvalidType {
        at: entry.span(),
        expected_type: KdlType::String,
        found_type: KdlType::for_value(value),
        advice: Some("try using a quoted string".to_owned()),
    })?;
    Ok(value.to_owned())
}

// Get the single string argument of a node such as `lsblk "/usr/bin/lsblk"`
pub(crate) fn single_string_argument(node: &KdlNode) -> Result<String, Error> {
    let mut args = arguments(node);
    match (args.next(), args.next()) {
        (Some(entry), None) if node.entries().len() == 1 => entry_str(entry),
        _ => Err(InvalidArguments {
            at: node.span(),
            advice: Some(format!(
                "{} <path> - exactly one positional argument is supported",
                node.name().value()
            )),
        }
        .into()),
    }
}
