//! Error types for Docket.

use crate::id::DocId;
use alloc::string::String;
use core::fmt;

/// Result type alias for Docket operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for Docket operations.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// A selector could not be compiled.
    SelectorCompile {
        message: String,
    },
    /// A sort specification could not be compiled.
    SortCompile {
        message: String,
    },
    /// A modifier could not be applied to a document.
    ModifierApply {
        message: String,
    },
    /// A document with this id already exists.
    DuplicateId {
        id: DocId,
    },
    /// The live result set was already stopped.
    ObserverStopped,
    /// Observe was called while the collection was dispatching callbacks.
    RecursiveObserve {
        collection: String,
    },
    /// A document is malformed (for example an `_id` of the wrong type).
    InvalidDocument {
        message: String,
    },
    /// Invalid operation.
    InvalidOperation {
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SelectorCompile { message } => {
                write!(f, "Invalid selector: {}", message)
            }
            Error::SortCompile { message } => {
                write!(f, "Invalid sort specification: {}", message)
            }
            Error::ModifierApply { message } => {
                write!(f, "Cannot apply modifier: {}", message)
            }
            Error::DuplicateId { id } => {
                write!(f, "Duplicate _id '{}'", id)
            }
            Error::ObserverStopped => {
                write!(f, "Observe handle joined a stopped live result set")
            }
            Error::RecursiveObserve { collection } => {
                write!(
                    f,
                    "Cannot observe collection {} from inside one of its callbacks",
                    collection
                )
            }
            Error::InvalidDocument { message } => {
                write!(f, "Invalid document: {}", message)
            }
            Error::InvalidOperation { message } => {
                write!(f, "Invalid operation: {}", message)
            }
        }
    }
}

impl Error {
    /// Creates a selector compile error.
    pub fn selector(message: impl Into<String>) -> Self {
        Error::SelectorCompile {
            message: message.into(),
        }
    }

    /// Creates a sort compile error.
    pub fn sort(message: impl Into<String>) -> Self {
        Error::SortCompile {
            message: message.into(),
        }
    }

    /// Creates a modifier error.
    pub fn modifier(message: impl Into<String>) -> Self {
        Error::ModifierApply {
            message: message.into(),
        }
    }

    /// Creates a duplicate id error.
    pub fn duplicate_id(id: DocId) -> Self {
        Error::DuplicateId { id }
    }

    /// Creates a recursive observe error.
    pub fn recursive_observe(collection: impl Into<String>) -> Self {
        Error::RecursiveObserve {
            collection: collection.into(),
        }
    }

    /// Creates an invalid document error.
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Error::InvalidDocument {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_error_display() {
        let err = Error::selector("Inconsistent selector");
        assert!(err.to_string().contains("Inconsistent selector"));

        let err = Error::duplicate_id(DocId::from("abc"));
        assert!(err.to_string().contains("abc"));

        let err = Error::recursive_observe("users");
        assert!(err.to_string().contains("users"));
    }

    #[test]
    fn test_error_constructors() {
        match Error::modifier("$inc on a string") {
            Error::ModifierApply { message } => assert_eq!(message, "$inc on a string"),
            _ => panic!("Wrong error type"),
        }
        assert_eq!(Error::ObserverStopped, Error::ObserverStopped);
    }
}
