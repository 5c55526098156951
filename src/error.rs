use shapegen_model::Protocol;
use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("shape {0} has an unsupported type: {1}")]
    UnsupportedShapeType(String, String),

    #[error("{0}")]
    UnsupportedShapeKind(String),

    #[error("shape {0} is missing wire metadata: {1}")]
    MissingWireMetadata(String, String),

    #[error("shape {0} contains itself; recursive shapes cannot be marshalled")]
    RecursiveShape(String),

    #[error("no serializer or parser for protocol {0}")]
    UnsupportedProtocol(Protocol),

    #[error("operation {operation} ({protocol}): {source}")]
    Operation {
        operation: String,
        protocol: Protocol,
        source: Box<Error>,
    },

    #[error(transparent)]
    Model(#[from] shapegen_model::Error),

    #[error("codegen config: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Attach the operation and protocol a generation failure happened in
    pub(crate) fn in_operation(self, operation: &str, protocol: Protocol) -> Error {
        match self {
            Error::Operation { .. } => self,
            other => Error::Operation {
                operation: operation.to_string(),
                protocol,
                source: Box::new(other),
            },
        }
    }

    /// The failure underneath any operation context
    pub fn root(&self) -> &Error {
        match self {
            Error::Operation { source, .. } => source.root(),
            other => other,
        }
    }
}
