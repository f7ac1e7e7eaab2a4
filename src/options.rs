//! Per-request options and body payloads.

use crate::Error;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use serde_json::Value;

/// Caller-supplied configuration for a single request.
///
/// Anything set here wins over the client's defaults: caller headers replace
/// base headers with the same (case-insensitive) name.
///
/// # Examples
///
/// ```
/// use apifetch::RequestOptions;
///
/// # fn example() -> Result<(), apifetch::Error> {
/// let options = RequestOptions::post()
///     .json(&serde_json::json!({ "title": "New Post" }))?
///     .with_header("X-Request-Source", "dashboard")?
///     .immediate(false);
///
/// assert!(!options.is_immediate());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// The HTTP method (GET, POST, etc.).
    pub method: Method,

    /// Headers merged over the base set.
    pub headers: HeaderMap,

    /// The request body, if any.
    pub body: Option<RequestBody>,

    /// Query parameters appended to the URL, in insertion order.
    pub query_params: Vec<(String, String)>,

    /// Whether a [`Fetch`](crate::Fetch) handle runs the request as soon as it is created.
    pub immediate: bool,
}

impl RequestOptions {
    /// Creates options for the given method with no headers and no body.
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            body: None,
            query_params: Vec::new(),
            immediate: true,
        }
    }

    /// Options for a GET request.
    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    /// Options for a POST request.
    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    /// Options for a PUT request.
    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    /// Options for a PATCH request.
    pub fn patch() -> Self {
        Self::new(Method::PATCH)
    }

    /// Options for a DELETE request.
    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, Error> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Adds a query parameter to the request.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    /// Sets the request body.
    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a structured body that will be sent as JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented as JSON.
    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, Error> {
        Ok(self.body(RequestBody::json(body)?))
    }

    /// Sets a multipart form body.
    pub fn multipart(self, form: MultipartForm) -> Self {
        self.body(RequestBody::Multipart(form))
    }

    /// Sets whether a [`Fetch`](crate::Fetch) handle runs immediately.
    ///
    /// With `immediate(false)` the handle stays idle until
    /// [`Fetch::execute`](crate::Fetch::execute) is called.
    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    /// Returns `true` if the request runs as soon as its handle is created.
    pub fn is_immediate(&self) -> bool {
        self.immediate
    }

    /// Returns `true` if the body is a multipart form.
    pub fn is_multipart(&self) -> bool {
        matches!(self.body, Some(RequestBody::Multipart(_)))
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

/// A request body.
///
/// Text, bytes and multipart forms are sent as they are. Structured values are
/// serialized to JSON text as soon as they are captured, keeping field order.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// A body that is already text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// A structured value, already serialized to JSON text.
    Json(String),
    /// A multipart form; the transport supplies the `Content-Type` boundary.
    Multipart(MultipartForm),
}

impl RequestBody {
    /// Captures any serializable value as a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be written as JSON
    /// (for example a map with non-string keys).
    pub fn json<B: Serialize + ?Sized>(body: &B) -> Result<Self, Error> {
        serde_json::to_string(body)
            .map(RequestBody::Json)
            .map_err(|e| Error::SerializationFailed(e.to_string()))
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_string())
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        RequestBody::Bytes(bytes)
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        RequestBody::Json(value.to_string())
    }
}

impl From<MultipartForm> for RequestBody {
    fn from(form: MultipartForm) -> Self {
        RequestBody::Multipart(form)
    }
}

/// A multipart form payload.
///
/// Unlike `reqwest::multipart::Form` this can be cloned, so the same request
/// can be sent again on refresh.
///
/// # Examples
///
/// ```
/// use apifetch::MultipartForm;
///
/// let form = MultipartForm::new()
///     .text("description", "My amazing file")
///     .file("file", "avatar.png", b"\x89PNG".to_vec())
///     .with_mime("image/png");
///
/// assert_eq!(form.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartForm {
    parts: Vec<(String, FormPart)>,
}

/// One field of a [`MultipartForm`].
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    /// A plain text field.
    Text(String),
    /// A file upload.
    File {
        /// The file name sent in the part's `Content-Disposition`.
        file_name: String,
        /// The file contents.
        bytes: Vec<u8>,
        /// The part's MIME type, if known.
        mime: Option<String>,
    },
}

impl MultipartForm {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push((name.into(), FormPart::Text(value.into())));
        self
    }

    /// Appends a file field.
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push((
            name.into(),
            FormPart::File {
                file_name: file_name.into(),
                bytes,
                mime: None,
            },
        ));
        self
    }

    /// Sets the MIME type of the most recently appended file field.
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        if let Some((_, FormPart::File { mime: slot, .. })) = self.parts.last_mut() {
            *slot = Some(mime.into());
        }
        self
    }

    /// Returns the fields in insertion order.
    pub fn parts(&self) -> &[(String, FormPart)] {
        &self.parts
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns `true` if the form has no fields.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Builds a `reqwest` form for one send.
    pub(crate) fn to_reqwest(&self) -> Result<reqwest::multipart::Form, Error> {
        let mut form = reqwest::multipart::Form::new();
        for (name, part) in &self.parts {
            form = match part {
                FormPart::Text(value) => form.text(name.clone(), value.clone()),
                FormPart::File {
                    file_name,
                    bytes,
                    mime,
                } => {
                    let mut file = reqwest::multipart::Part::bytes(bytes.clone())
                        .file_name(file_name.clone());
                    if let Some(mime) = mime {
                        file = file.mime_str(mime).map_err(|e| {
                            Error::ConfigurationError(format!("Invalid MIME type {}: {}", mime, e))
                        })?;
                    }
                    form.part(name.clone(), file)
                }
            };
        }
        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let options = RequestOptions::default();
        assert_eq!(options.method, Method::GET);
        assert!(options.headers.is_empty());
        assert!(options.body.is_none());
        assert!(options.is_immediate());
    }

    #[test]
    fn test_header_names_are_case_insensitive() {
        let options = RequestOptions::get()
            .with_header("X-Trace", "one")
            .unwrap()
            .with_header("x-trace", "two")
            .unwrap();
        assert_eq!(options.headers.len(), 1);
        assert_eq!(options.headers.get("X-TRACE").unwrap(), "two");
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let result = RequestOptions::get().with_header("X-Bad", "line\nbreak");
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_json_body_is_captured() {
        #[derive(Serialize)]
        struct NewItem {
            name: &'static str,
        }

        let options = RequestOptions::post()
            .json(&NewItem { name: "New Item" })
            .unwrap();
        assert_eq!(
            options.body,
            Some(RequestBody::Json(r#"{"name":"New Item"}"#.to_string()))
        );
        assert!(!options.is_multipart());
    }

    #[test]
    fn test_json_body_keeps_field_order() {
        #[derive(Serialize)]
        struct Signed {
            nonce: u32,
            amount: u32,
        }

        let body = RequestBody::json(&Signed {
            nonce: 1,
            amount: 2,
        })
        .unwrap();
        assert_eq!(body, RequestBody::Json(r#"{"nonce":1,"amount":2}"#.to_string()));
    }

    #[test]
    fn test_json_body_accepts_wide_integers() {
        let body = RequestBody::json(&u128::MAX).unwrap();
        assert_eq!(body, RequestBody::Json(u128::MAX.to_string()));
    }

    #[test]
    fn test_json_value_converts_to_text() {
        let body = RequestBody::from(json!({ "name": "New Item" }));
        assert_eq!(body, RequestBody::Json(r#"{"name":"New Item"}"#.to_string()));
    }

    #[test]
    fn test_json_body_rejects_non_string_keys() {
        let mut map = std::collections::HashMap::new();
        map.insert(vec![1u8], "value");
        let result = RequestOptions::post().json(&map);
        assert!(matches!(result, Err(Error::SerializationFailed(_))));
    }

    #[test]
    fn test_multipart_form_builds() {
        let form = MultipartForm::new()
            .text("description", "upload")
            .file("file", "notes.txt", b"hello".to_vec())
            .with_mime("text/plain");

        let options = RequestOptions::post().multipart(form.clone());
        assert!(options.is_multipart());
        assert_eq!(form.len(), 2);
        assert!(matches!(
            &form.parts()[1].1,
            FormPart::File { mime: Some(mime), .. } if mime == "text/plain"
        ));
        assert!(form.to_reqwest().is_ok());
    }

    #[test]
    fn test_multipart_rejects_bad_mime() {
        let form = MultipartForm::new()
            .file("file", "notes.txt", Vec::new())
            .with_mime("not a mime");
        assert!(form.to_reqwest().is_err());
    }
}
