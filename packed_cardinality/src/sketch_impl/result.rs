// This file is part of packed_cardinality. Copyright © 2026 packed_cardinality contributors.
// packed_cardinality is licensed under the GNU GPL v3.0 or any later version. See LICENSE file for full text.

use std::error::Error as StdError;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
enum Message {
    Dynamic(String),
    Static(&'static str),
}

/// Contains the cause of an [`Error`]
#[derive(Debug)]
pub enum Cause {
    /// Two sketches disagree on shape: register count, offset width, rank
    /// width, or compression flags
    ShapeMismatch,
    /// A construction parameter was rejected
    InvalidParameter,
}

/// Errors returned by packed_cardinality
#[derive(Debug)]
pub struct Error {
    message: Message,
    cause: Cause,
}

impl Error {
    pub(crate) fn shape_mismatch(message: &'static str) -> Self {
        Self {
            message: Message::Static(message),
            cause: Cause::ShapeMismatch,
        }
    }

    pub(crate) fn invalid_parameter(message: String) -> Self {
        Self {
            message: Message::Dynamic(message),
            cause: Cause::InvalidParameter,
        }
    }

    pub(crate) fn invalid_parameter_static(message: &'static str) -> Self {
        Self {
            message: Message::Static(message),
            cause: Cause::InvalidParameter,
        }
    }

    pub fn get_cause(&self) -> &Cause {
        &self.cause
    }
}

impl StdError for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Message::Dynamic(string) => write!(f, "{}", string),
            Message::Static(str) => write!(f, "{}", str),
        }
    }
}
