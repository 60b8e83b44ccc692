// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Error types for theta sketch operations

use std::fmt;

/// ErrorKind is all kinds of Error surfaced by this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// `lgK` out of range, or `p` outside `(0, 1]`.
    ConfigError,
    /// A set operation or binary decode saw a foreign seed hash.
    SeedMismatch,
    /// The encoded buffer is too short, has an unknown serial version, or the
    /// wrong sketch type.
    FormatError,
    /// A hashed update was rejected by screening (zero hash, or hash ≥ theta).
    ScreeningReject,
    /// `Update` saw a hash that is already present in the table.
    DuplicateKey,
    /// `update_string("")` was called.
    EmptyStringReject,
    /// Internal lookup signal (hash absent; table full with no empty slot).
    Lookup,
    /// A caller violated an operator's invariant (e.g. `Intersection::result`
    /// before any `update`, or `BoundsBridge` called with `thetaA < thetaB`).
    InvariantViolation,
    /// The argument provided is invalid.
    InvalidArgument,
    /// The sketch data being deserialized is malformed.
    MalformedDeserializeData,
}

impl ErrorKind {
    /// Convert this error kind instance into static str.
    pub const fn into_static(self) -> &'static str {
        match self {
            ErrorKind::ConfigError => "ConfigError",
            ErrorKind::SeedMismatch => "SeedMismatch",
            ErrorKind::FormatError => "FormatError",
            ErrorKind::ScreeningReject => "ScreeningReject",
            ErrorKind::DuplicateKey => "DuplicateKey",
            ErrorKind::EmptyStringReject => "EmptyStringReject",
            ErrorKind::Lookup => "Lookup",
            ErrorKind::InvariantViolation => "InvariantViolation",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::MalformedDeserializeData => "MalformedDeserializeData",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.into_static())
    }
}

/// Error is the error struct returned by all theta sketch operations.
pub struct Error {
    kind: ErrorKind,
    message: String,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Error {
    /// Create a new Error with error kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Vec::default(),
            source: None,
        }
    }

    /// Add more context in error.
    pub fn with_context(mut self, key: &'static str, value: impl ToString) -> Self {
        self.context.push((key, value.to_string()));
        self
    }

    /// Set source for error.
    ///
    /// # Panics
    ///
    /// Panics if the source has been set.
    pub fn set_source(mut self, src: impl Into<anyhow::Error>) -> Self {
        assert!(self.source.is_none(), "the source error has been set");
        self.source = Some(src.into());
        self
    }

    /// Return error's kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Return error's message.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

// Convenience constructors.
impl Error {
    pub(crate) fn deserial(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedDeserializeData, msg)
    }

    pub(crate) fn insufficient_data(msg: impl fmt::Display) -> Self {
        Self::new(ErrorKind::FormatError, format!("insufficient data: {msg}"))
    }

    pub(crate) fn invalid_family(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::FormatError, msg)
    }

    pub(crate) fn unsupported_serial_version(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::FormatError, msg)
    }

    pub(crate) fn invalid_sketch_type(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::FormatError, msg)
    }

    pub(crate) fn invalid_preamble_longs(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::FormatError, msg)
    }

    pub(crate) fn seed_mismatch(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::SeedMismatch, msg)
    }

    pub(crate) fn config_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigError, msg)
    }

    pub(crate) fn screening_reject(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::ScreeningReject, msg)
    }

    pub(crate) fn duplicate_key(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateKey, msg)
    }

    pub(crate) fn empty_string_reject(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::EmptyStringReject, msg)
    }

    pub(crate) fn lookup(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Lookup, msg)
    }

    pub(crate) fn invariant_violation(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvariantViolation, msg)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            let mut de = f.debug_struct("Error");
            de.field("kind", &self.kind);
            de.field("message", &self.message);
            de.field("context", &self.context);
            de.field("source", &self.source);
            return de.finish();
        }

        write!(f, "{}", self.kind)?;
        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }
        writeln!(f)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            writeln!(f, "Context:")?;
            for (k, v) in self.context.iter() {
                writeln!(f, "   {k}: {v}")?;
            }
        }

        if let Some(source) = &self.source {
            writeln!(f)?;
            writeln!(f, "Source:")?;
            writeln!(f, "   {source:#}")?;
        }

        Ok(())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if !self.context.is_empty() {
            write!(f, ", context: {{ ")?;
            write!(
                f,
                "{}",
                self.context
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            )?;
            write!(f, " }}")?;
        }

        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }

        if let Some(source) = &self.source {
            write!(f, ", source: {source}")?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|v| v.as_ref())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::insufficient_data(err)
    }
}
