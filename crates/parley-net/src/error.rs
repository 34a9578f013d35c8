use thiserror::Error;

/// Failure of a REST call.  Nothing is mutated client-side when one of these
/// is returned.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not authorized")]
    Unauthorized,

    /// The server refused because the two users are not friends (403).
    #[error("Not friends: {0}")]
    NotFriends(String),

    /// The resource already exists, e.g. a pending friend request (409).
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Map a non-success status and its body to an error.
    pub fn from_status(status: u16, body: String) -> Self {
        let message = server_message(&body);
        match status {
            401 => ApiError::Unauthorized,
            403 => ApiError::NotFriends(message),
            404 => ApiError::NotFound(message),
            409 => ApiError::Conflict(message),
            _ => ApiError::Status { status, body },
        }
    }
}

/// The server reports errors as `{"message": "..."}`; fall back to the raw
/// body otherwise.
fn server_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("No credential supplied")]
    MissingCredential,

    #[error("Invalid socket URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_variants() {
        assert!(matches!(ApiError::from_status(401, String::new()), ApiError::Unauthorized));
        assert!(matches!(
            ApiError::from_status(403, r#"{"message":"You can only chat with friends"}"#.into()),
            ApiError::NotFriends(m) if m == "You can only chat with friends"
        ));
        assert!(matches!(ApiError::from_status(409, "dup".into()), ApiError::Conflict(m) if m == "dup"));
        assert!(matches!(ApiError::from_status(404, String::new()), ApiError::NotFound(_)));
        assert!(matches!(
            ApiError::from_status(500, "boom".into()),
            ApiError::Status { status: 500, .. }
        ));
    }
}
