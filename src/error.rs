//! Error types for API calls.
//!
//! Two error types live here. [`Error`] covers everything that can go wrong while
//! configuring a client or building request options. [`ApiError`] is the single,
//! normalized shape every request-time failure is reported in, whatever the
//! transport or the backend actually produced.

use http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Message used when the backend gives no usable `message` or `detail`.
pub const FALLBACK_MESSAGE: &str = "An unexpected error occurred.";

const TIMEOUT_MESSAGE: &str = "Request timed out";

/// Field-level validation messages keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Configuration and construction errors.
///
/// These are returned by [`ClientBuilder`](crate::ClientBuilder),
/// [`ClientConfig`](crate::ClientConfig) and the request option builders. They never
/// come back from a request; a request reports failures as an [`ApiError`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid configuration was provided.
    ///
    /// This indicates a problem with how the client or request was configured,
    /// such as an invalid header value or an unparsable environment setting.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Failed to serialize a request body.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// A specialized `Result` type for client configuration.
pub type Result<T> = std::result::Result<T, Error>;

/// The kind of failure an [`ApiError`] represents, derived from its status code.
///
/// Status codes are mutually exclusive, so every error has exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 401. The session was rejected and has been cleared.
    Unauthorized,
    /// 403. The caller is authenticated but not allowed to do this.
    Forbidden,
    /// 422. The request body failed validation; see [`ApiError::errors`].
    ValidationFailed,
    /// Any 5xx status.
    ServerError,
    /// Any other status, or no status at all (network failure, timeout, bad request setup).
    GenericFailure,
}

impl ErrorKind {
    /// Classifies an optional HTTP status code.
    ///
    /// # Examples
    ///
    /// ```
    /// use apifetch::ErrorKind;
    ///
    /// assert_eq!(ErrorKind::from_status(Some(401)), ErrorKind::Unauthorized);
    /// assert_eq!(ErrorKind::from_status(Some(503)), ErrorKind::ServerError);
    /// assert_eq!(ErrorKind::from_status(Some(404)), ErrorKind::GenericFailure);
    /// assert_eq!(ErrorKind::from_status(None), ErrorKind::GenericFailure);
    /// ```
    pub fn from_status(status: Option<u16>) -> Self {
        match status {
            Some(401) => ErrorKind::Unauthorized,
            Some(403) => ErrorKind::Forbidden,
            Some(422) => ErrorKind::ValidationFailed,
            Some(code) if code >= 500 => ErrorKind::ServerError,
            _ => ErrorKind::GenericFailure,
        }
    }
}

/// A normalized API failure.
///
/// Every failed request, whether it never reached the server, came back with a
/// non-2xx status, or came back with a body that could not be parsed, is reported
/// as an `ApiError`. The message is never empty.
///
/// # Examples
///
/// ```no_run
/// use apifetch::{Client, ErrorKind, RequestOptions};
///
/// # async fn example() -> Result<(), apifetch::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com/v1")?
///     .build()?;
///
/// let body = serde_json::json!({ "email": "" });
/// let options = RequestOptions::post().json(&body)?;
///
/// if let Err(error) = client.request::<serde_json::Value>("/users", &options).await {
///     match error.kind() {
///         ErrorKind::ValidationFailed => {
///             for message in error.field_errors("email").unwrap_or_default() {
///                 eprintln!("email: {}", message);
///             }
///         }
///         _ => eprintln!("{}", error),
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ApiError {
    message: String,
    status_code: Option<u16>,
    data: Option<Value>,
    errors: Option<FieldErrors>,
}

/// The error body shape the backend is expected to send.
#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    detail: Option<Value>,
    #[serde(default)]
    errors: Option<Value>,
}

/// One entry of a FastAPI-style validation `detail` list.
#[derive(Debug, Deserialize)]
struct ValidationDetail {
    loc: Vec<Value>,
    msg: String,
}

impl ApiError {
    /// Normalizes a non-2xx response.
    ///
    /// The message is taken from `message`, then `detail`, then [`FALLBACK_MESSAGE`].
    /// A body that is not JSON still yields an error; its text is kept in `data`.
    pub(crate) fn from_response(status: StatusCode, raw: &[u8]) -> Self {
        let data = parse_body(raw);
        let envelope = data
            .as_ref()
            .and_then(|value| ErrorEnvelope::deserialize(value).ok())
            .unwrap_or_default();

        let message = non_empty_str(envelope.message.as_ref())
            .or_else(|| non_empty_str(envelope.detail.as_ref()))
            .unwrap_or(FALLBACK_MESSAGE)
            .to_string();

        let errors = envelope
            .errors
            .as_ref()
            .and_then(field_errors_from_map)
            .or_else(|| envelope.detail.as_ref().and_then(field_errors_from_detail));

        Self {
            message,
            status_code: Some(status.as_u16()),
            data,
            errors,
        }
    }

    /// Normalizes a 2xx response whose body could not be parsed as the expected type.
    pub(crate) fn malformed_body(status: StatusCode, raw: &[u8]) -> Self {
        Self {
            message: FALLBACK_MESSAGE.to_string(),
            status_code: Some(status.as_u16()),
            data: parse_body(raw),
            errors: None,
        }
    }

    /// Normalizes a transport failure (connection refused, DNS, timeout, broken body).
    ///
    /// `status` is the response status when the failure happened after headers arrived.
    pub(crate) fn from_transport(error: &reqwest::Error, status: Option<StatusCode>) -> Self {
        let message = if error.is_timeout() {
            TIMEOUT_MESSAGE.to_string()
        } else {
            error.to_string()
        };
        let status = status.or_else(|| error.status());
        Self::generic(message, status.map(|status| status.as_u16()))
    }

    fn generic(message: String, status_code: Option<u16>) -> Self {
        let message = if message.trim().is_empty() {
            FALLBACK_MESSAGE.to_string()
        } else {
            message
        };
        Self {
            message,
            status_code,
            data: None,
            errors: None,
        }
    }

    /// Returns the human-readable message. Never empty.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status code, if the request got as far as a response.
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Returns the HTTP status code as a typed [`StatusCode`].
    pub fn status(&self) -> Option<StatusCode> {
        self.status_code.and_then(|code| StatusCode::from_u16(code).ok())
    }

    /// Returns the parsed error body.
    ///
    /// This is the JSON body when the backend sent JSON, or the raw text as a JSON
    /// string when it did not. `None` for empty bodies and for failures without a response.
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Returns the field-level validation messages, if the backend sent any.
    pub fn errors(&self) -> Option<&FieldErrors> {
        self.errors.as_ref()
    }

    /// Returns the validation messages for one field.
    pub fn field_errors(&self, field: &str) -> Option<&[String]> {
        self.errors.as_ref()?.get(field).map(Vec::as_slice)
    }

    /// Returns the kind of failure.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::from_status(self.status_code)
    }

    /// Returns `true` for 401 responses.
    pub fn is_unauthorized(&self) -> bool {
        self.kind() == ErrorKind::Unauthorized
    }

    /// Returns `true` for 422 responses.
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::ValidationFailed
    }

    /// Returns `true` for 5xx responses.
    pub fn is_server_error(&self) -> bool {
        self.kind() == ErrorKind::ServerError
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        ApiError::generic(error.to_string(), None)
    }
}

fn parse_body(raw: &[u8]) -> Option<Value> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    match serde_json::from_slice(raw) {
        Ok(value) => Some(value),
        Err(_) => Some(Value::String(String::from_utf8_lossy(raw).into_owned())),
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
}

fn field_errors_from_map(value: &Value) -> Option<FieldErrors> {
    let object = value.as_object()?;
    let mut errors = FieldErrors::new();
    for (field, messages) in object {
        let messages = match messages {
            Value::String(message) => vec![message.clone()],
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect(),
            _ => continue,
        };
        errors.insert(field.clone(), messages);
    }
    Some(errors)
}

fn field_errors_from_detail(value: &Value) -> Option<FieldErrors> {
    let details = Vec::<ValidationDetail>::deserialize(value).ok()?;
    let mut errors = FieldErrors::new();
    for detail in details {
        // ["body", "user", "email"] -> "email"
        let Some(field) = detail.loc.iter().rev().find_map(Value::as_str) else {
            continue;
        };
        errors.entry(field.to_string()).or_default().push(detail.msg);
    }
    if errors.is_empty() {
        None
    } else {
        Some(errors)
    }
}
