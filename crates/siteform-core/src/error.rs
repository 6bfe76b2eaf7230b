use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{operation} failed: {message}")]
    UpstreamCall { operation: String, message: String },

    #[error("unresolved {category} reference: {native_id}")]
    UnresolvedReference { category: String, native_id: String },

    #[error("logical id collision: {name}")]
    NamingCollision { name: String },

    #[error("asset hierarchy cycle at {native_id}")]
    CyclicHierarchy { native_id: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ExportError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UpstreamCall { .. } => "UPSTREAM_CALL_FAILED",
            Self::UnresolvedReference { .. } => "UNRESOLVED_REFERENCE",
            Self::NamingCollision { .. } => "NAMING_COLLISION",
            Self::CyclicHierarchy { .. } => "CYCLIC_HIERARCHY",
            Self::MalformedResponse(_) => "MALFORMED_RESPONSE",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Http(_) => "HTTP_ERROR",
        }
    }

    pub(crate) fn upstream(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamCall {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }
}
