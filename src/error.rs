use std::fmt;

/// Failure of a single upstream call.
#[derive(Debug)]
pub enum FetchError {
    Http(reqwest::Error),
    Status { status: u16, body: String },
    Malformed(String),
    NotFound(String),
    /// The upstream rejected the extension token or client id.
    Unauthorized,
}

impl FetchError {
    /// Short machine-readable tag, used as a log field.
    pub fn code(&self) -> &'static str {
        match self {
            FetchError::Http(_) => "http_error",
            FetchError::Status { .. } => "bad_status",
            FetchError::Malformed(_) => "malformed_response",
            FetchError::NotFound(_) => "not_found",
            FetchError::Unauthorized => "unauthorized",
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Http(e) => write!(f, "HTTP error: {e}"),
            FetchError::Status { status, body } => {
                write!(f, "unhandled status code {status}: {body}")
            }
            FetchError::Malformed(msg) => write!(f, "malformed response: {msg}"),
            FetchError::NotFound(what) => write!(f, "{what} not found"),
            FetchError::Unauthorized => write!(f, "credentials rejected by upstream"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::Malformed(e.to_string())
        } else {
            FetchError::Http(e)
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Malformed(e.to_string())
    }
}
