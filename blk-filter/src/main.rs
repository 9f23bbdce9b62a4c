// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::{path::PathBuf, process::ExitCode};

use blockdev::{Executor, Inspector, SystemExecutor};
use clap::{builder::BoolishValueParser, error::ErrorKind, ArgAction, Parser};
use filter::{FilterRequest, FilterResult};
use filter_config::Config;
use log::{debug, error, info, LevelFilter};
use serde::Serialize;
use thiserror::Error;

/// Filter block devices by usage, signatures, open handles and type.
///
/// Prints a JSON object with the matching `devices` (full lsblk records),
/// `by_path` and `by_name`. On failure prints `{"failed": true, "msg": ...}`
/// and exits non-zero.
#[derive(Debug, Parser)]
#[command(name = "blk-filter", version)]
struct Cli {
    /// Devices to inspect (default: everything lsblk reports)
    #[arg(
        long = "name",
        visible_aliases = ["device", "devices"],
        value_name = "DEVICE",
        value_delimiter = ','
    )]
    names: Vec<String>,

    /// Keep only devices with (true) or without (false) children or a mountpoint
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new())]
    is_used: Option<bool>,

    /// Keep only devices that lsof reports open (true) or not (false)
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new())]
    is_open: Option<bool>,

    /// Keep only devices where wipefs finds nothing (true) or something (false)
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new())]
    is_blank: Option<bool>,

    /// Keep only rom devices (true) or reject them (false)
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new())]
    is_rom: Option<bool>,

    /// KDL configuration file with tool paths, devices and default flags
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Accepted for compatibility; filtering never modifies anything
    #[arg(long)]
    check: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Flags given on the command line
    fn request(&self) -> FilterRequest {
        FilterRequest {
            is_used: self.is_used,
            is_open: self.is_open,
            is_blank: self.is_blank,
            is_rom: self.is_rom,
        }
    }
}

#[derive(Debug, Error)]
enum Error {
    #[error(transparent)]
    Config(#[from] filter_config::Error),

    #[error(transparent)]
    Device(#[from] blockdev::Error),

    #[error("unable to encode result: {0}")]
    Json(#[from] serde_json::Error),
}

/// Successful run, shaped like an Ansible module result
#[derive(Debug, Serialize)]
struct Success {
    changed: bool,
    #[serde(flatten)]
    result: FilterResult,
}

fn execute(cli: &Cli, executor: &dyn Executor) -> Result<String, Error> {
    let config = match &cli.config {
        Some(path) => Config::new_for_path(path)?,
        None => Config::default(),
    };
    if cli.check {
        debug!("Check mode requested; nothing is ever modified");
    }

    let request = config.filter.merge(cli.request());
    let mut names = config.devices.clone();
    names.extend(cli.names.iter().cloned());

    info!("Filtering with {request}");
    let inspector = Inspector::new(executor, config.tools);
    let result = filter::run(&inspector, &names, request)?;
    let output = Success { changed: false, result };

    let json = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    Ok(json)
}

/// Human readable message for the failure object
fn failure_message(err: &Error) -> String {
    match err {
        Error::Config(filter_config::Error::Parse(parse)) => {
            let details = parse.diagnostics.iter().map(ToString::to_string).collect::<Vec<_>>();
            format!("{parse}: {}", details.join("; "))
        }
        _ => err.to_string(),
    }
}

/// Message for the failure object when the command line itself is invalid.
///
/// Returns `None` for help and version requests, which are not failures.
fn usage_failure(err: &clap::Error) -> Option<String> {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            None
        }
        _ => {
            let rendered = err.to_string();
            let first = rendered.lines().next().unwrap_or_default();
            Some(first.trim_start_matches("error: ").to_owned())
        }
    }
}

fn failure_json(msg: &str) -> String {
    serde_json::json!({ "failed": true, "msg": msg }).to_string()
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match usage_failure(&err) {
            Some(msg) => {
                println!("{}", failure_json(&msg));
                return ExitCode::FAILURE;
            }
            None => err.exit(),
        },
    };

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    pretty_env_logger::formatted_timed_builder()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .init();

    match execute(&cli, &SystemExecutor) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            let msg = failure_message(&err);
            error!("{msg}");
            if let Error::Config(config) = err {
                eprintln!("{:?}", miette::Report::new(config));
            }
            println!("{}", failure_json(&msg));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use blockdev::{mock::MockExecutor, Output};
    use clap::CommandFactory;

    use super::*;

    const TWO_DEVICES: &str = r#"{"blockdevices": [
        {"name": "sda", "type": "disk", "mountpoint": null},
        {"name": "sr0", "type": "rom", "mountpoint": null}
    ]}"#;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("blk-filter").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_command() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_arguments() {
        let cli = cli(&["--is-used", "no", "--devices", "sda,/dev/sdb", "--name", "sdc", "--is-rom=false"]);
        assert_eq!(cli.names, ["sda", "/dev/sdb", "sdc"]);
        assert_eq!(
            cli.request(),
            FilterRequest {
                is_used: Some(false),
                is_open: None,
                is_blank: None,
                is_rom: Some(false),
            }
        );
    }

    #[test]
    fn test_rejects_unknown_values() {
        assert!(Cli::try_parse_from(["blk-filter", "--is-used", "maybe"]).is_err());
        assert!(Cli::try_parse_from(["blk-filter", "--is-mounted", "true"]).is_err());
    }

    #[test]
    fn test_usage_failure() {
        let err = Cli::try_parse_from(["blk-filter", "--is-used", "maybe"]).unwrap_err();
        let msg = usage_failure(&err).unwrap();
        assert!(msg.contains("'maybe'"));
        assert!(msg.contains("--is-used"));
        assert!(!msg.starts_with("error:"));

        let value: serde_json::Value = serde_json::from_str(&failure_json(&msg)).unwrap();
        assert_eq!(value["failed"], true);
        assert_eq!(value["msg"], msg.as_str());
    }

    #[test]
    fn test_help_is_not_a_failure() {
        let err = Cli::try_parse_from(["blk-filter", "--help"]).unwrap_err();
        assert_eq!(usage_failure(&err), None);
        let err = Cli::try_parse_from(["blk-filter", "--version"]).unwrap_err();
        assert_eq!(usage_failure(&err), None);
    }

    #[test]
    fn test_execute() {
        let exec = MockExecutor::new().with_response(&["lsblk", "-O", "--json"], Output::ok(TWO_DEVICES));
        let json = execute(&cli(&["--is-rom", "false", "--check"]), &exec).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["changed"], false);
        assert_eq!(value["by_name"], serde_json::json!(["sda"]));
        assert_eq!(value["by_path"], serde_json::json!(["/dev/sda"]));
        assert_eq!(value["devices"][0]["type"], "disk");
    }

    #[test]
    fn test_execute_failure() {
        let exec = MockExecutor::new()
            .with_response(
                &["lsblk", "-O", "--json", "/dev/sdc"],
                Output::ok(r#"{"blockdevices": [{"name": "sdc", "type": "disk"}]}"#),
            )
            .with_response(&["wipefs", "/dev/sdc"], Output::failed(1, "no such device"));
        let err = execute(&cli(&["--name", "sdc", "--is-blank", "true"]), &exec).unwrap_err();
        let msg = failure_message(&err);
        assert!(msg.contains("no such device"));

        let value: serde_json::Value = serde_json::from_str(&failure_json(&msg)).unwrap();
        assert_eq!(value["failed"], true);
        assert_eq!(value["msg"], msg.as_str());
    }

    #[test]
    fn test_missing_config() {
        let exec = MockExecutor::new();
        let err = execute(&cli(&["--config", "/nonexistent/blk-filter.kdl"]), &exec).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(exec.calls().is_empty());
    }
}
