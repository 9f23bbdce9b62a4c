// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::{io, sync::Arc};

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::KdlType;

/// Error type for the configuration crate
#[derive(Diagnostic, Debug, Error)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] io::Error),

    #[diagnostic(transparent)]
    #[error(transparent)]
    Kdl(#[from] kdl::KdlError),

    #[diagnostic(transparent)]
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[diagnostic(transparent)]
    #[error(transparent)]
    InvalidArguments(#[from] InvalidArguments),

    #[diagnostic(transparent)]
    #[error(transparent)]
    InvalidType(#[from] InvalidType),

    #[diagnostic(transparent)]
    #[error(transparent)]
    UnsupportedNode(#[from] UnsupportedNode),

    #[diagnostic(transparent)]
    #[error(transparent)]
    UnsupportedProperty(#[from] UnsupportedProperty),
}

/// Merged error for every problem found in one document
#[derive(Debug, Diagnostic, Error)]
#[error("invalid configuration in {name}")]
#[diagnostic(severity(error))]
pub struct ParseError {
    pub name: String,
    #[source_code]
    pub src: NamedSource<Arc<String>>,
    #[related]
    pub diagnostics: Vec<Error>,
}

/// Error for values of the wrong type
#[derive(Debug, Diagnostic, Error)]
#[error("invalid type, expected {expected_type}, found {found_type}")]
#[diagnostic(severity(error))]
pub struct InvalidType {
    #[label]
    pub at: SourceSpan,

    pub expected_type: KdlType,
    pub found_type: KdlType,

    #[help]
    pub advice: Option<String>,
}

/// Error for nodes given the wrong number or kind of arguments
#[derive(Debug, Diagnostic, Error)]
#[error("invalid arguments")]
#[diagnostic(severity(error))]
pub struct InvalidArguments {
    #[label]
    pub at: SourceSpan,

    #[help]
    pub advice: Option<String>,
}

/// Error for unsupported node names
#[derive(Debug, Diagnostic, Error)]
#[error("unsupported node: {name}")]
#[diagnostic(severity(error))]
pub struct UnsupportedNode {
    #[label]
    pub at: SourceSpan,

    pub name: String,

    #[help]
    pub advice: Option<String>,
}

/// Error for unsupported property names
#[derive(Debug, Diagnostic, Error)]
#[error("unsupported property: {name}")]
#[diagnostic(severity(error))]
pub struct UnsupportedProperty {
    #[label]
    pub at: SourceSpan,

    pub name: String,

    #[help]
    pub advice: Option<String>,
}
