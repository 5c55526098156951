use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid service definition json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("shape {0} is not defined in the model")]
    ShapeNotFound(String),

    #[error("structure {0} has no member named {1}")]
    MemberNotFound(String, String),

    #[error("operation {0} is not defined in the model")]
    OperationNotFound(String),

    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error("no type name for shape {0} ({1:?})")]
    MissingNamingResolution(String, crate::Role),
}
