//! Core error types.

use thiserror::Error;

/// Errors raised by enumeration caches, binders and scope generation.
#[derive(Debug, Error)]
pub enum Error {
    /// A non-empty value matched no row of the enumeration.
    ///
    /// This is what the `Raise` lookup-failure policy surfaces, and what scope
    /// building fails with when one of its terms does not resolve.
    #[error("invalid value {value} for {target}{}", attribute_suffix(.attribute))]
    Resolution {
        /// Target enumeration type name.
        target: String,
        /// Attribute being assigned, when known.
        attribute: Option<String>,
        /// Display form of the offending raw value.
        value: String,
    },

    /// Invalid attribute declaration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A stored foreign key is missing from a freshly rebuilt cache.
    #[error("consistency fault: {0}")]
    ConsistencyFault(ConsistencyFault),

    /// The row source could not be read and no snapshot is available.
    #[error("row source unavailable for {table}: {reason}")]
    SourceUnavailable {
        /// Table whose rows were requested.
        table: String,
        /// Underlying failure.
        reason: String,
    },

    /// The delegate policy names a handler the host does not provide.
    #[error("no lookup failure handler named {0}")]
    UnknownHandler(String),

    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid data format.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

fn attribute_suffix(attribute: &Option<String>) -> String {
    match attribute {
        Some(name) => format!(" (attribute {name})"),
        None => String::new(),
    }
}

impl Error {
    /// Check if this error is a resolution failure.
    pub fn is_resolution(&self) -> bool {
        matches!(self, Error::Resolution { .. })
    }

    /// Check if this error means the row source could not be reached.
    pub fn is_source_unavailable(&self) -> bool {
        matches!(self, Error::SourceUnavailable { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<ConsistencyFault> for Error {
    fn from(fault: ConsistencyFault) -> Self {
        Error::ConsistencyFault(fault)
    }
}

/// A host row whose stored foreign key no longer exists in its lookup table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyFault {
    /// Host type the record belongs to.
    pub host_type: String,
    /// Enumerated attribute name.
    pub attribute: String,
    /// Foreign key column.
    pub foreign_key: String,
    /// Target enumeration type name.
    pub target: String,
    /// The dangling id.
    pub id: i64,
}

impl std::fmt::Display for ConsistencyFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{} = {} has no matching {} row",
            self.host_type, self.foreign_key, self.id, self.target
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_message() {
        let err = Error::Resolution {
            target: "BookingStatus".into(),
            attribute: Some("status".into()),
            value: ":foo".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value :foo for BookingStatus (attribute status)"
        );
        assert!(err.is_resolution());

        let err = Error::Resolution {
            target: "State".into(),
            attribute: None,
            value: "\"XX\"".into(),
        };
        assert_eq!(err.to_string(), "invalid value \"XX\" for State");
    }

    #[test]
    fn test_fault_display() {
        let fault = ConsistencyFault {
            host_type: "Booking".into(),
            attribute: "status".into(),
            foreign_key: "status_id".into(),
            target: "BookingStatus".into(),
            id: 9,
        };
        assert_eq!(
            fault.to_string(),
            "Booking.status_id = 9 has no matching BookingStatus row"
        );
        assert_eq!(
            Error::from(fault).to_string(),
            "consistency fault: Booking.status_id = 9 has no matching BookingStatus row"
        );
    }
}
