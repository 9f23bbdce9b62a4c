// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Configuration for blk-filter
//!
//! The configuration is a KDL document:
//!
//! ```kdl
//! tools {
//!     lsblk "/usr/bin/lsblk"
//!     wipefs "/usr/sbin/wipefs"
//!     lsof "/usr/bin/lsof"
//! }
//! devices "sda" "/dev/sdb"
//! filter is-used=#false is-rom=#false
//! ```
//!
//! Every problem in a document is collected and reported together.

use std::{fs, path::Path, sync::Arc};

use blockdev::Tools;
use filter::{FilterRequest, Predicate};
use itertools::{Either, Itertools};
use kdl::{KdlDocument, KdlEntry, KdlNode};
use log::debug;
use miette::NamedSource;

mod errors;
pub use errors::*;

mod helpers;
use helpers::*;

mod types;
pub use types::*;

/// Accepted spellings for the filter flags
static PREDICATE_KEYS: phf::Map<&'static str, Predicate> = phf::phf_map! {
    "is-used" => Predicate::Used,
    "is_used" => Predicate::Used,
    "is-open" => Predicate::Open,
    "is_open" => Predicate::Open,
    "is-blank" => Predicate::Blank,
    "is_blank" => Predicate::Blank,
    "is-rom" => Predicate::Rom,
    "is_rom" => Predicate::Rom,
};

/// Loaded configuration
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Config {
    /// External tools to run
    pub tools: Tools,

    /// Devices to restrict the listing to; empty means all
    pub devices: Vec<String>,

    /// Default filter, overridable from the command line
    pub filter: FilterRequest,
}

impl Config {
    /// Load a configuration from a file path
    pub fn new_for_path<P>(file: P) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let file = file.as_ref();
        let name = file.to_string_lossy();
        let txt = fs::read_to_string(file)?;
        Self::new(name.to_string(), txt)
    }

    /// Load a configuration from a string
    pub fn new(name: String, contents: String) -> Result<Self, Error> {
        let source = Arc::new(contents);
        let ns = NamedSource::new(&name, Arc::clone(&source)).with_language("KDL");
        let d = KdlDocument::parse_v2(source.as_str())?;

        let mut config = Config::default();
        let mut errors = vec![];

        for node in d.nodes() {
            let result = match node.name().value() {
                "tools" => parse_tools(node, &mut config.tools),
                "devices" => parse_devices(node, &mut config.devices),
                "filter" => parse_filter(node, &mut config.filter),
                what => Err(vec![UnsupportedNode {
                    at: node.span(),
                    name: what.to_owned(),
                    advice: Some("only 'tools', 'devices' and 'filter' nodes are supported".to_owned()),
                }
                .into()]),
            };
            if let Err(e) = result {
                errors.extend(e);
            }
        }

        if !errors.is_empty() {
            return Err(ParseError {
                name,
                src: ns,
                diagnostics: errors,
            }
            .into());
        }

        debug!("Loaded configuration from {name}: {config:?}");
        Ok(config)
    }
}

// Parse the `tools` node and its children
fn parse_tools(node: &KdlNode, tools: &mut Tools) -> Result<(), Vec<Error>> {
    if !node.entries().is_empty() {
        return Err(vec![InvalidArguments {
            at: node.span(),
            advice: Some("tools { lsblk \"<path>\" } - tools are configured as child nodes".to_owned()),
        }
        .into()]);
    }

    let mut errors = vec![];
    for child in node.children().map(|c| c.nodes()).unwrap_or_default() {
        let slot = match child.name().value() {
            "lsblk" => &mut tools.lsblk,
            "wipefs" => &mut tools.wipefs,
            "lsof" => &mut tools.lsof,
            what => {
                errors.push(
                    UnsupportedNode {
                        at: child.span(),
                        name: what.to_owned(),
                        advice: Some("known tools are 'lsblk', 'wipefs' and 'lsof'".to_owned()),
                    }
                    .into(),
                );
                continue;
            }
        };
        match single_string_argument(child) {
            Ok(program) => *slot = program,
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// Parse the positional device names of a `devices` node
fn parse_devices(node: &KdlNode, devices: &mut Vec<String>) -> Result<(), Vec<Error>> {
    let (names, errors): (Vec<_>, Vec<_>) = node.entries().iter().partition_map(|entry| {
        if entry.name().is_some() {
            return Either::Right(
                InvalidArguments {
                    at: entry.span(),
                    advice: Some("devices \"sda\" \"/dev/sdb\" - device names are positional".to_owned()),
                }
                .into(),
            );
        }
        match entry_str(entry) {
            Ok(name) => Either::Left(name),
            Err(e) => Either::Right(e),
        }
    });

    if errors.is_empty() {
        devices.extend(names);
        Ok(())
    } else {
        Err(errors)
    }
}

// Parse the flags of a `filter` node
fn parse_filter(node: &KdlNode, request: &mut FilterRequest) -> Result<(), Vec<Error>> {
    let (flags, errors): (Vec<_>, Vec<_>) = node.entries().iter().partition_map(|entry| match parse_flag(entry) {
        Ok(flag) => Either::Left(flag),
        Err(e) => Either::Right(e),
    });

    if !errors.is_empty() {
        return Err(errors);
    }

    for (predicate, value) in flags {
        request.set(predicate, value);
    }
    Ok(())
}

// Parse a single `is-used=#false` style flag. `#null` leaves it unconstrained.
fn parse_flag(entry: &KdlEntry) -> Result<(Predicate, Option<bool>), Error> {
    let Some(key) = entry.name() else {
        return Err(InvalidArguments {
            at: entry.span(),
            advice: Some("filter is-used=#false - flags are named properties".to_owned()),
        }
        .into());
    };

    let predicate = *PREDICATE_KEYS.get(key.value()).ok_or_else(|| UnsupportedProperty {
        at: entry.span(),
        name: key.value().to_owned(),
        advice: Some("known flags are 'is-used', 'is-open', 'is-blank' and 'is-rom'".to_owned()),
    })?;

    let value = entry.value();
    if value.is_null() {
        return Ok((predicate, None));
    }
    let value = value.as_bool().ok_or_else(|| InvalidType {
        at: entry.span(),
        expected_type: KdlType::Boolean,
        found_type: KdlType::for_value(value),
        advice: Some(format!("{}=#true or {}=#false", key.value(), key.value())),
    })?;

    Ok((predicate, Some(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(contents: &str) -> Result<Config, Error> {
        Config::new("test.kdl".to_owned(), contents.to_owned())
    }

    fn diagnostics(contents: &str) -> Vec<Error> {
        match parse(contents) {
            Err(Error::Parse(e)) => e.diagnostics,
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test_log::test]
    fn test_full() {
        let config = parse(
            r#"
            tools {
                lsblk "/usr/bin/lsblk"
                wipefs "/usr/sbin/wipefs"
            }
            devices "sda" "/dev/sdb"
            devices sdc
            filter is-used=#false is_rom=#false is-blank=#true
            "#,
        )
        .unwrap();

        assert_eq!(config.tools.lsblk, "/usr/bin/lsblk");
        assert_eq!(config.tools.wipefs, "/usr/sbin/wipefs");
        assert_eq!(config.tools.lsof, "lsof");
        assert_eq!(config.devices, ["sda", "/dev/sdb", "sdc"]);
        assert_eq!(
            config.filter,
            FilterRequest {
                is_used: Some(false),
                is_open: None,
                is_blank: Some(true),
                is_rom: Some(false),
            }
        );
    }

    #[test]
    fn test_empty() {
        assert_eq!(parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_null_flag() {
        let config = parse("filter is-open=#true\nfilter is-open=#null is-used=#true").unwrap();
        assert_eq!(config.filter.is_open, None);
        assert_eq!(config.filter.is_used, Some(true));
    }

    #[test]
    fn test_unknown_node() {
        let errors = diagnostics("filters is-used=#true");
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], Error::UnsupportedNode(n) if n.name == "filters"));
    }

    #[test]
    fn test_unknown_flag() {
        let errors = diagnostics("filter is-mounted=#true");
        assert!(matches!(&errors[0], Error::UnsupportedProperty(p) if p.name == "is-mounted"));
    }

    #[test]
    fn test_wrong_type() {
        let errors = diagnostics(r#"filter is-used="yes""#);
        match &errors[0] {
            Error::InvalidType(e) => {
                assert_eq!(e.expected_type, KdlType::Boolean);
                assert_eq!(e.found_type, KdlType::String);
            }
            other => panic!("unexpected diagnostic: {other:?}"),
        }
    }

    #[test]
    fn test_positional_flag() {
        let errors = diagnostics("filter #true");
        assert!(matches!(&errors[0], Error::InvalidArguments(_)));
    }

    #[test]
    fn test_bad_tools() {
        let errors = diagnostics(
            r#"
            tools {
                blkid "/sbin/blkid"
                lsof
                wipefs 12
            }
            "#,
        );
        assert_eq!(errors.len(), 3);
        assert!(matches!(&errors[0], Error::UnsupportedNode(n) if n.name == "blkid"));
        assert!(matches!(&errors[1], Error::InvalidArguments(_)));
        assert!(matches!(&errors[2], Error::InvalidType(e) if e.found_type == KdlType::Integer));
    }

    #[test]
    fn test_errors_collected() {
        let errors = diagnostics("filter is-used=1 bogus=#true\nmounts \"/\"\ndevices 3");
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_syntax_error() {
        assert!(matches!(parse("filter is-used=#false {"), Err(Error::Kdl(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Config::new_for_path("/nonexistent/blk-filter.kdl"),
            Err(Error::IO(_))
        ));
    }

    #[test]
    fn test_report_renders() {
        let err = parse("filter is-rom=\"no\"").unwrap_err();
        let report = format!("{:?}", miette::Report::new(err));
        assert!(report.contains("expected boolean"));
    }
}
