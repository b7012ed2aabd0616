//! Error types for SeisCube.
//!
//! Every fallible operation in the crate returns a [`CubeError`]. Each variant
//! carries a structured payload (operation, attribute, axis, index) rather than
//! a free-text message, and maps onto exactly one [`ErrorKind`].

use std::fmt;

use thiserror::Error;

use crate::geometry::Axis;

/// Fieldless classification of a [`CubeError`], for callers that branch on
/// the failure category rather than its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    SingularGeometry,
    OutOfRange,
    AttributeExists,
    InvalidAttributeName,
    DataIntegrity,
    Storage,
    Serialization,
    Io,
}

/// Why an attribute name was refused by `create_attribute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistsReason {
    /// A table with this name is already present in the store.
    Duplicate,
    /// The name belongs to the schema itself (`position`).
    Reserved,
}

impl fmt::Display for ExistsReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExistsReason::Duplicate => f.write_str("already exists"),
            ExistsReason::Reserved => f.write_str("is reserved"),
        }
    }
}

/// Errors raised by geometry, storage, and export operations.
#[derive(Debug, Error)]
pub enum CubeError {
    /// Geometry or control-point input is missing or malformed.
    #[error("configuration error in `{field}`: {reason}")]
    Configuration {
        /// The configuration field at fault (`inline`, `Coordinate`, ...).
        field: String,
        reason: String,
    },

    /// The calibration matrix cannot be inverted.
    #[error("singular geometry during {operation}: determinant is {determinant}")]
    SingularGeometry {
        operation: &'static str,
        determinant: f64,
    },

    /// A requested axis index lies outside the survey bounds.
    #[error("{operation}: {axis} {index} outside [{start}, {end}]")]
    OutOfRange {
        operation: &'static str,
        axis: Axis,
        index: f64,
        start: f64,
        end: f64,
    },

    /// An attribute table cannot be created under this name.
    #[error("attribute `{name}` {reason}")]
    AttributeExists { name: String, reason: ExistsReason },

    /// The name fails identifier validation and never reaches the store.
    #[error("invalid attribute name `{name}`: {reason}")]
    InvalidAttributeName { name: String, reason: &'static str },

    /// Stored data disagrees with the extent declared by the geometry.
    #[error("data integrity error in {operation} on `{attribute}`: expected {expected} values, found {found}")]
    DataIntegrity {
        operation: &'static str,
        attribute: String,
        expected: usize,
        found: usize,
    },

    /// The embedded store failed.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// A stored row could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Writing an export failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl CubeError {
    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CubeError::Configuration { .. } => ErrorKind::Configuration,
            CubeError::SingularGeometry { .. } => ErrorKind::SingularGeometry,
            CubeError::OutOfRange { .. } => ErrorKind::OutOfRange,
            CubeError::AttributeExists { .. } => ErrorKind::AttributeExists,
            CubeError::InvalidAttributeName { .. } => ErrorKind::InvalidAttributeName,
            CubeError::DataIntegrity { .. } => ErrorKind::DataIntegrity,
            CubeError::Storage(_) => ErrorKind::Storage,
            CubeError::Serialization(_) => ErrorKind::Serialization,
            CubeError::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CubeError::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<bincode::Error> for CubeError {
    fn from(e: bincode::Error) -> Self {
        CubeError::Serialization(e.to_string())
    }
}

pub type CubeResult<T> = Result<T, CubeError>;
