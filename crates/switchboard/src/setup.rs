//! Error types for setup operations.

use switchboard_dispatch::{RegistryError, SchemaError, TransformError, TreeError};

/// Error type for setup operations.
#[derive(Debug)]
pub enum SetupError {
    /// One or more command or component declarations are invalid.
    Schema(Vec<SchemaError>),
    /// The command names do not form a valid command tree.
    Tree(TreeError),
    /// Two handlers share a name and invocation kind.
    Registry(RegistryError),
    /// Two result transform rules overlap.
    Transform(TransformError),
    /// A component custom-id pattern does not compile.
    Component(String),
    /// Configuration error.
    Config(String),
    /// I/O error while loading configuration.
    Io(std::io::Error),
}

impl std::fmt::Display for SetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupError::Schema(errors) => {
                write!(f, "{} invalid declaration(s)", errors.len())?;
                for err in errors {
                    write!(f, "\n  - {}", err)?;
                }
                Ok(())
            }
            SetupError::Tree(err) => write!(f, "command tree error: {}", err),
            SetupError::Registry(err) => write!(f, "registry error: {}", err),
            SetupError::Transform(err) => write!(f, "transform error: {}", err),
            SetupError::Component(msg) => write!(f, "component error: {}", msg),
            SetupError::Config(msg) => write!(f, "configuration error: {}", msg),
            SetupError::Io(err) => write!(f, "setup I/O error: {}", err),
        }
    }
}

impl std::error::Error for SetupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SetupError::Tree(err) => Some(err),
            SetupError::Registry(err) => Some(err),
            SetupError::Transform(err) => Some(err),
            SetupError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SetupError {
    fn from(e: std::io::Error) -> Self {
        SetupError::Io(e)
    }
}

impl From<TreeError> for SetupError {
    fn from(e: TreeError) -> Self {
        SetupError::Tree(e)
    }
}

impl From<RegistryError> for SetupError {
    fn from(e: RegistryError) -> Self {
        SetupError::Registry(e)
    }
}

impl From<TransformError> for SetupError {
    fn from(e: TransformError) -> Self {
        SetupError::Transform(e)
    }
}

impl From<toml::de::Error> for SetupError {
    fn from(e: toml::de::Error) -> Self {
        SetupError::Config(e.to_string())
    }
}
