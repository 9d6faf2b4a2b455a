use crate::Error;

/// Tagged failure raised by the persistence layer itself.
///
/// It travels inside [`crate::Error`] so that `?` keeps working everywhere, callers
/// recover the tag through [`ErrorKind::of`].
#[derive(thiserror::Error, Debug)]
pub enum PersistenceError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Mapping error: {0}")]
    Mapping(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Cleanup error: {0}")]
    Cleanup(String),
}

impl PersistenceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PersistenceError::Configuration(..) => ErrorKind::Configuration,
            PersistenceError::Mapping(..) => ErrorKind::Mapping,
            PersistenceError::Execution(..) => ErrorKind::Execution,
            PersistenceError::Cleanup(..) => ErrorKind::Cleanup,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Error {
        Error::new(PersistenceError::Configuration(message.into()))
    }

    pub fn mapping(message: impl Into<String>) -> Error {
        Error::new(PersistenceError::Mapping(message.into()))
    }

    pub fn execution(message: impl Into<String>) -> Error {
        Error::new(PersistenceError::Execution(message.into()))
    }

    pub fn cleanup(message: impl Into<String>) -> Error {
        Error::new(PersistenceError::Cleanup(message.into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or invalid setup, unmapped entity, mutation of a view.
    Configuration,
    /// Entity layout that the dialect cannot render.
    Mapping,
    /// Anything the database or the driver reported while running a statement.
    Execution,
    /// Failure while releasing resources.
    Cleanup,
}

impl ErrorKind {
    /// Classify an error. Errors without a [`PersistenceError`] in their chain
    /// come from drivers and are execution errors.
    pub fn of(error: &Error) -> ErrorKind {
        error
            .downcast_ref::<PersistenceError>()
            .or_else(|| {
                error
                    .chain()
                    .find_map(|e| e.downcast_ref::<PersistenceError>())
            })
            .map(PersistenceError::kind)
            .unwrap_or(ErrorKind::Execution)
    }

    /// Only execution errors may succeed when attempted again.
    pub fn is_retryable(&self) -> bool {
        *self == ErrorKind::Execution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn kind_survives_context() {
        let error = Err::<(), _>(PersistenceError::mapping("'x' isn't table field."))
            .context("While building the insert statement")
            .unwrap_err();
        assert_eq!(ErrorKind::of(&error), ErrorKind::Mapping);
        assert!(!ErrorKind::of(&error).is_retryable());
    }

    #[test]
    fn untagged_is_execution() {
        let error = Error::msg("UNIQUE constraint failed: user.email");
        assert_eq!(ErrorKind::of(&error), ErrorKind::Execution);
        assert!(ErrorKind::of(&error).is_retryable());
    }
}
