//! The request client: header merging, auth injection, loading side effects,
//! and error normalization.
//!
//! The [`Client`] type is the main entry point for making requests.
//! Use [`ClientBuilder`] to configure and create clients.

use crate::{
    config::ClientConfig,
    error::ErrorKind,
    options::{RequestBody, RequestOptions},
    outcome::{Fetch, RequestOutcome},
    prepared::{PreparedBody, PreparedRequest},
    stores::{AuthStore, LoadingGuard, MemoryAuthStore, MemoryUiStore, Navigator, UiStore},
    ApiError, Error, Response, Result,
};
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

const APPLICATION_JSON: &str = "application/json";

/// An API client that authenticates requests, reports loading state, and
/// normalizes every failure into an [`ApiError`].
///
/// The client is cheap to clone and is meant to be shared. Every request:
///
/// 1. merges headers (`Accept`, `Content-Type`, client defaults, the bearer
///    token, then the caller's own headers) and serializes the body;
/// 2. turns the global loading flag on, sends, and turns it off again once the
///    request settles;
/// 3. on failure, builds an [`ApiError`] and runs the status-specific reaction
///    (a 401 logs the session out and redirects to the login route).
///
/// # Examples
///
/// ```no_run
/// use apifetch::{Client, MemoryAuthStore, RequestOptions};
/// use serde::{Deserialize, Serialize};
/// use std::sync::Arc;
///
/// #[derive(Serialize)]
/// struct NewPost {
///     title: String,
/// }
///
/// #[derive(Deserialize)]
/// struct Post {
///     id: u64,
///     title: String,
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let auth = Arc::new(MemoryAuthStore::new("token-from-login"));
///
/// let client = Client::builder()
///     .base_url("https://api.example.com/v1")?
///     .auth_store(auth.clone())
///     .build()?;
///
/// let post = NewPost { title: "New Post".to_string() };
/// let created = client.post::<_, Post>("/posts", &post).await?;
/// println!("Created post {}", created.data.id);
///
/// let outcome = client
///     .execute::<Vec<Post>>("/posts", &RequestOptions::get().with_query_param("page", "2"))
///     .await;
/// match outcome.error() {
///     Some(error) => eprintln!("{}", error),
///     None => println!("{} posts", outcome.data().map_or(0, Vec::len)),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: Url,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
    login_route: String,
    auth_store: Arc<dyn AuthStore>,
    ui_store: Arc<dyn UiStore>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client configured from the process environment.
    ///
    /// The client uses in-memory stores and no navigator; use
    /// [`ClientBuilder::from_config`] to inject your own.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment holds an invalid setting.
    pub fn from_env() -> Result<Client> {
        ClientBuilder::from_config(&ClientConfig::from_env()?)?.build()
    }

    /// Returns the base URL relative paths are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Returns the route visited after a 401.
    pub fn login_route(&self) -> &str {
        &self.inner.login_route
    }

    /// Returns the auth store this client reads tokens from.
    pub fn auth_store(&self) -> &Arc<dyn AuthStore> {
        &self.inner.auth_store
    }

    /// Returns the UI store this client reports loading state to.
    pub fn ui_store(&self) -> &Arc<dyn UiStore> {
        &self.inner.ui_store
    }

    /// Merges the options with the client's defaults without sending anything.
    ///
    /// The access token is read now, so a token cleared by an earlier 401 is
    /// never sent again.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be built or the token is not a valid
    /// header value.
    ///
    /// # Examples
    ///
    /// ```
    /// use apifetch::{Client, MultipartForm, RequestOptions};
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = Client::builder()
    ///     .base_url("https://api.example.com/v1")?
    ///     .build()?;
    ///
    /// let upload = RequestOptions::post()
    ///     .multipart(MultipartForm::new().text("description", "My amazing file"));
    /// let prepared = client.prepare("/upload", &upload)?;
    ///
    /// assert_eq!(prepared.url.as_str(), "https://api.example.com/v1/upload");
    /// assert!(prepared.header("content-type").is_none());
    /// # Ok(())
    /// # }
    /// ```
    pub fn prepare(
        &self,
        path: &str,
        options: &RequestOptions,
    ) -> std::result::Result<PreparedRequest, ApiError> {
        let url = self.resolve_url(path, &options.query_params)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        merge_headers(&mut headers, &self.inner.default_headers);

        if let Some(token) = self.inner.auth_store.access_token() {
            let mut value = HeaderValue::try_from(format!("Bearer {}", token)).map_err(|e| {
                Error::ConfigurationError(format!("Invalid access token header: {}", e))
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        merge_headers(&mut headers, &options.headers);

        // The transport writes the multipart boundary into Content-Type itself.
        if options.is_multipart() {
            headers.remove(CONTENT_TYPE);
        }

        let body = match &options.body {
            None => PreparedBody::Empty,
            Some(RequestBody::Text(text)) => PreparedBody::Text(text.clone()),
            Some(RequestBody::Bytes(bytes)) => PreparedBody::Bytes(bytes.clone()),
            Some(RequestBody::Multipart(form)) => PreparedBody::Multipart(form.clone()),
            Some(RequestBody::Json(text)) => PreparedBody::Text(text.clone()),
        };

        Ok(PreparedRequest {
            method: options.method.clone(),
            url,
            headers,
            body,
        })
    }

    /// Makes a typed request.
    ///
    /// This is the main method for making requests. On a 2xx response the body
    /// is parsed as `T` (an empty body parses as JSON `null`). Everything else,
    /// including network failures and unparsable bodies, comes back as an
    /// [`ApiError`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use apifetch::{Client, RequestOptions};
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct SearchResults { results: Vec<String> }
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = Client::builder()
    ///     .base_url("https://api.example.com/v1")?
    ///     .build()?;
    ///
    /// let options = RequestOptions::post().json(&serde_json::json!({ "query": "rust" }))?;
    /// let response = client.request::<SearchResults>("/search", &options).await?;
    /// println!("Found {} results", response.data.results.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn request<T>(
        &self,
        path: &str,
        options: &RequestOptions,
    ) -> std::result::Result<Response<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        let prepared = match self.prepare(path, options) {
            Ok(prepared) => prepared,
            Err(error) => {
                tracing::error!(error = %error, path = %path, "Failed to prepare request");
                return Err(error);
            }
        };
        self.send(prepared).await
    }

    /// Sends an already prepared request.
    ///
    /// The global loading flag is on for exactly the time the transport call is
    /// in flight, and is turned off even if this future is dropped before it
    /// completes.
    pub async fn send<T>(
        &self,
        prepared: PreparedRequest,
    ) -> std::result::Result<Response<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        let method = prepared.method.clone();
        let url = prepared.url.clone();
        let request = self.build_request(prepared)?;

        tracing::debug!(method = %method, url = %url, "Executing HTTP request");

        let start_time = Instant::now();
        let loading = LoadingGuard::start(self.inner.ui_store.as_ref());
        let settled = match request.send().await {
            Ok(response) => {
                let status = response.status();
                let headers = response.headers().clone();
                let body = response.bytes().await;
                Ok((status, headers, body))
            }
            Err(e) => Err(e),
        };
        drop(loading);
        let latency = start_time.elapsed();

        let (status, headers, body) = match settled {
            Ok(parts) => parts,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    method = %method,
                    url = %url,
                    "Request failed"
                );
                let error = ApiError::from_transport(&e, None);
                self.on_response_error(&error);
                return Err(error);
            }
        };

        let body = match body {
            Ok(bytes) => bytes.to_vec(),
            Err(e) if status.is_success() => {
                tracing::error!(
                    error = %e,
                    status = status.as_u16(),
                    "Failed to read response body"
                );
                let error = ApiError::from_transport(&e, Some(status));
                self.on_response_error(&error);
                return Err(error);
            }
            Err(e) => {
                tracing::warn!(error = %e, status = status.as_u16(), "Failed to read error body");
                Vec::new()
            }
        };

        self.on_response(status, headers, body, latency)
    }

    /// Makes a request and returns its settled outcome.
    ///
    /// This always runs the request, whatever [`RequestOptions::immediate`] says.
    pub async fn execute<T>(&self, path: &str, options: &RequestOptions) -> RequestOutcome<T>
    where
        T: DeserializeOwned,
    {
        RequestOutcome::settled(self.request(path, options).await)
    }

    /// Creates a re-runnable handle for a request.
    ///
    /// If the options are immediate (the default) the request runs before this
    /// returns; otherwise the handle stays idle until [`Fetch::execute`] is called.
    pub async fn fetch<T>(&self, path: impl Into<String>, options: RequestOptions) -> Fetch<T>
    where
        T: DeserializeOwned,
    {
        let mut fetch = Fetch::new(self.clone(), path.into(), options);
        if fetch.options().is_immediate() {
            fetch.execute().await;
        }
        fetch
    }

    /// Makes a GET request to the specified path.
    pub async fn get<T>(&self, path: &str) -> std::result::Result<Response<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        self.request(path, &RequestOptions::get()).await
    }

    /// Makes a POST request to the specified path with a JSON body.
    pub async fn post<B, T>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<Response<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(path, &RequestOptions::post().json(body)?).await
    }

    /// Makes a PUT request to the specified path with a JSON body.
    pub async fn put<B, T>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<Response<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(path, &RequestOptions::put().json(body)?).await
    }

    /// Makes a PATCH request to the specified path with a JSON body.
    pub async fn patch<B, T>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<Response<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(path, &RequestOptions::patch().json(body)?).await
    }

    /// Makes a DELETE request to the specified path.
    pub async fn delete<T>(&self, path: &str) -> std::result::Result<Response<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        self.request(path, &RequestOptions::delete()).await
    }

    fn resolve_url(&self, path: &str, query_params: &[(String, String)]) -> Result<Url> {
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path, None),
        };

        let mut url = if path.starts_with("http://") || path.starts_with("https://") {
            Url::parse(path)?
        } else {
            let mut url = self.inner.base_url.clone();
            let relative = path.trim_start_matches('/');
            if !relative.is_empty() {
                let joined = format!("{}/{}", url.path().trim_end_matches('/'), relative);
                url.set_path(&joined);
            }
            url
        };

        if let Some(query) = query.filter(|query| !query.is_empty()) {
            let combined = match url.query() {
                Some(existing) if !existing.is_empty() => format!("{}&{}", existing, query),
                _ => query.to_string(),
            };
            url.set_query(Some(&combined));
        }
        if !query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query_params {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    fn build_request(
        &self,
        prepared: PreparedRequest,
    ) -> std::result::Result<reqwest::RequestBuilder, ApiError> {
        let mut request = self
            .inner
            .http_client
            .request(prepared.method, prepared.url)
            .headers(prepared.headers);

        if let Some(timeout) = self.inner.timeout {
            request = request.timeout(timeout);
        }

        request = match prepared.body {
            PreparedBody::Empty => request,
            PreparedBody::Text(text) => request.body(text),
            PreparedBody::Bytes(bytes) => request.body(bytes),
            PreparedBody::Multipart(form) => request.multipart(form.to_reqwest()?),
        };

        Ok(request)
    }

    /// Classifies a settled response.
    fn on_response<T>(
        &self,
        status: StatusCode,
        headers: HeaderMap,
        body: Vec<u8>,
        latency: Duration,
    ) -> std::result::Result<Response<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        tracing::info!(
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            "Received HTTP response"
        );

        if !status.is_success() {
            let raw_response = String::from_utf8_lossy(&body);
            if status.is_server_error() {
                tracing::warn!(
                    status = status.as_u16(),
                    response = %raw_response,
                    "Server error (5xx)"
                );
            } else {
                tracing::error!(
                    status = status.as_u16(),
                    response = %raw_response,
                    "Client error (4xx)"
                );
            }

            let error = ApiError::from_response(status, &body);
            self.on_response_error(&error);
            return Err(error);
        }

        let raw_body = String::from_utf8_lossy(&body).into_owned();
        let parsed = if raw_body.trim().is_empty() {
            serde_json::from_str::<T>("null")
        } else {
            serde_json::from_str::<T>(&raw_body)
        };

        match parsed {
            Ok(data) => Ok(Response::new(data, raw_body, status, headers, latency)),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    raw_response = %raw_body,
                    "Failed to deserialize response"
                );
                let error = ApiError::malformed_body(status, &body);
                self.on_response_error(&error);
                Err(error)
            }
        }
    }

    /// Runs the global reaction for a failed request.
    fn on_response_error(&self, error: &ApiError) {
        match error.kind() {
            ErrorKind::Unauthorized => {
                tracing::warn!(status = 401, "Session rejected, logging out");
                self.inner.auth_store.logout();
                self.redirect_to_login();
            }
            ErrorKind::Forbidden => {
                tracing::warn!(status = 403, message = %error, "Forbidden");
            }
            ErrorKind::ValidationFailed => {
                let fields: Vec<&str> = error
                    .errors()
                    .map(|errors| errors.keys().map(String::as_str).collect())
                    .unwrap_or_default();
                tracing::debug!(status = 422, fields = ?fields, "Validation failed");
            }
            ErrorKind::ServerError => {
                tracing::debug!(status = ?error.status_code(), message = %error, "Server failure");
            }
            ErrorKind::GenericFailure => {
                tracing::debug!(status = ?error.status_code(), message = %error, "Request failure");
            }
        }
    }

    fn redirect_to_login(&self) {
        if self.inner.auth_store.logout_navigates() {
            tracing::debug!("Auth store handles the login redirect");
            return;
        }
        match &self.inner.navigator {
            Some(navigator) if navigator.is_interactive() => {
                tracing::info!(route = %self.inner.login_route, "Redirecting to login");
                navigator.navigate_to(&self.inner.login_route);
            }
            _ => tracing::debug!("No interactive navigator, skipping login redirect"),
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url.as_str())
            .field("timeout", &self.inner.timeout)
            .field("login_route", &self.inner.login_route)
            .field("navigator", &self.inner.navigator.is_some())
            .finish_non_exhaustive()
    }
}

/// Replaces every header named in `overrides`, keeping all of its values.
fn merge_headers(headers: &mut HeaderMap, overrides: &HeaderMap) {
    for name in overrides.keys() {
        headers.remove(name);
        for value in overrides.get_all(name) {
            headers.append(name.clone(), value.clone());
        }
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use apifetch::{ClientBuilder, MemoryAuthStore, MemoryUiStore};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), apifetch::Error> {
/// let ui = Arc::new(MemoryUiStore::new());
///
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com/v1")?
///     .timeout(Duration::from_secs(30))
///     .default_header("User-Agent", "my-app/1.0")?
///     .auth_store(Arc::new(MemoryAuthStore::default()))
///     .ui_store(ui.clone())
///     .login_route("/auth/login")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: Option<Url>,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
    login_route: String,
    auth_store: Option<Arc<dyn AuthStore>>,
    ui_store: Option<Arc<dyn UiStore>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            default_headers: HeaderMap::new(),
            timeout: None,
            login_route: crate::config::DEFAULT_LOGIN_ROUTE.to_string(),
            auth_store: None,
            ui_store: None,
            navigator: None,
        }
    }

    /// Creates a builder seeded from a [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configured base URL is invalid.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = Self::new()
            .base_url(&config.base_url)?
            .login_route(config.login_route.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder)
    }

    /// Sets the base URL for all relative paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or cannot carry a path.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        let url = Url::parse(url.as_ref())?;
        if url.cannot_be_a_base() {
            return Err(Error::ConfigurationError(format!(
                "Base URL cannot carry a path: {}",
                url
            )));
        }
        self.base_url = Some(url);
        Ok(self)
    }

    /// Adds a default header sent with every request.
    ///
    /// Default headers override `Accept`/`Content-Type` and are themselves
    /// overridden by per-request headers.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the route visited after a 401. Defaults to `/auth/login`.
    pub fn login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }

    /// Sets the store the access token is read from.
    ///
    /// Defaults to an empty [`MemoryAuthStore`].
    pub fn auth_store(mut self, store: Arc<dyn AuthStore>) -> Self {
        self.auth_store = Some(store);
        self
    }

    /// Sets the store the global loading flag is reported to.
    ///
    /// Defaults to a [`MemoryUiStore`].
    pub fn ui_store(mut self, store: Arc<dyn UiStore>) -> Self {
        self.ui_store = Some(store);
        self
    }

    /// Sets the navigator used for the login redirect.
    ///
    /// Without one, a 401 still logs out but does not redirect.
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL was provided or if the HTTP client
    /// cannot be created.
    pub fn build(self) -> Result<Client> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::ConfigurationError("Base URL is required".to_string()))?;

        let http_client = reqwest::Client::builder().build().map_err(|e| {
            Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Client {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                default_headers: self.default_headers,
                timeout: self.timeout,
                login_route: self.login_route,
                auth_store: self
                    .auth_store
                    .unwrap_or_else(|| Arc::new(MemoryAuthStore::default())),
                ui_store: self
                    .ui_store
                    .unwrap_or_else(|| Arc::new(MemoryUiStore::default())),
                navigator: self.navigator,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::MultipartForm;
    use http::Method;
    use serde_json::json;

    fn client_with_token(token: Option<&str>) -> Client {
        let auth = match token {
            Some(token) => MemoryAuthStore::new(token),
            None => MemoryAuthStore::default(),
        };
        Client::builder()
            .base_url("http://localhost:8000/api/v1")
            .unwrap()
            .auth_store(Arc::new(auth))
            .build()
            .unwrap()
    }

    #[test]
    fn test_base_headers() {
        let client = client_with_token(None);
        let prepared = client.prepare("/users/me", &RequestOptions::get()).unwrap();

        assert_eq!(prepared.method, Method::GET);
        assert_eq!(prepared.url.as_str(), "http://localhost:8000/api/v1/users/me");
        assert_eq!(prepared.header("accept"), Some("application/json"));
        assert_eq!(prepared.header("content-type"), Some("application/json"));
        assert!(prepared.header("authorization").is_none());
        assert_eq!(prepared.body, PreparedBody::Empty);
    }

    #[test]
    fn test_bearer_token_is_injected() {
        let client = client_with_token(Some("abc123"));
        let prepared = client.prepare("/users/me", &RequestOptions::get()).unwrap();
        assert_eq!(prepared.header("authorization"), Some("Bearer abc123"));
        assert!(prepared.headers[AUTHORIZATION].is_sensitive());
    }

    #[test]
    fn test_token_is_read_at_prepare_time() {
        let auth = Arc::new(MemoryAuthStore::new("first"));
        let client = Client::builder()
            .base_url("http://localhost:8000")
            .unwrap()
            .auth_store(auth.clone())
            .build()
            .unwrap();

        auth.set_token("second");
        let prepared = client.prepare("/", &RequestOptions::get()).unwrap();
        assert_eq!(prepared.header("authorization"), Some("Bearer second"));

        auth.logout();
        let prepared = client.prepare("/", &RequestOptions::get()).unwrap();
        assert!(prepared.header("authorization").is_none());
    }

    #[test]
    fn test_caller_headers_win() {
        let client = client_with_token(Some("abc123"));
        let options = RequestOptions::post()
            .with_header("content-type", "application/xml")
            .unwrap()
            .with_header("Authorization", "Basic dXNlcjpwYXNz")
            .unwrap()
            .body("<item/>");

        let prepared = client.prepare("/items", &options).unwrap();
        assert_eq!(prepared.header("Content-Type"), Some("application/xml"));
        assert_eq!(prepared.header("authorization"), Some("Basic dXNlcjpwYXNz"));
        assert_eq!(prepared.body.as_text(), Some("<item/>"));
    }

    #[test]
    fn test_default_headers_sit_between_base_and_caller() {
        let client = Client::builder()
            .base_url("http://localhost:8000")
            .unwrap()
            .default_header("Accept", "application/vnd.api+json")
            .unwrap()
            .default_header("X-Client", "web")
            .unwrap()
            .build()
            .unwrap();

        let prepared = client.prepare("/", &RequestOptions::get()).unwrap();
        assert_eq!(prepared.header("accept"), Some("application/vnd.api+json"));

        let options = RequestOptions::get().with_header("x-client", "cli").unwrap();
        let prepared = client.prepare("/", &options).unwrap();
        assert_eq!(prepared.header("x-client"), Some("cli"));
        assert_eq!(prepared.headers.get_all("x-client").iter().count(), 1);
    }

    #[test]
    fn test_json_body_is_serialized_to_text() {
        let client = client_with_token(None);
        let options = RequestOptions::post()
            .json(&json!({ "title": "New Post", "content": "Hello world" }))
            .unwrap();

        let prepared = client.prepare("/posts", &options).unwrap();
        let text = prepared.body.as_text().unwrap();
        let round_trip: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(round_trip, json!({ "title": "New Post", "content": "Hello world" }));
        assert_eq!(prepared.header("content-type"), Some("application/json"));
    }

    #[test]
    fn test_json_body_keeps_field_order() {
        #[derive(Serialize)]
        struct Signed {
            nonce: u64,
            amount: u64,
        }

        let client = client_with_token(None);
        let options = RequestOptions::post()
            .json(&Signed {
                nonce: 1,
                amount: 2,
            })
            .unwrap();

        let prepared = client.prepare("/transfers", &options).unwrap();
        assert_eq!(prepared.body.as_text(), Some(r#"{"nonce":1,"amount":2}"#));
    }

    #[test]
    fn test_text_and_bytes_pass_through() {
        let client = client_with_token(None);

        let prepared = client
            .prepare("/raw", &RequestOptions::post().body("{\"already\":\"json\"}"))
            .unwrap();
        assert_eq!(
            prepared.body,
            PreparedBody::Text("{\"already\":\"json\"}".to_string())
        );

        let prepared = client
            .prepare("/raw", &RequestOptions::post().body(vec![0u8, 159, 146, 150]))
            .unwrap();
        assert_eq!(prepared.body, PreparedBody::Bytes(vec![0u8, 159, 146, 150]));
    }

    #[test]
    fn test_multipart_drops_content_type() {
        let client = client_with_token(Some("abc123"));
        let form = MultipartForm::new()
            .text("description", "My amazing file")
            .file("file", "photo.jpg", vec![1, 2, 3]);
        let options = RequestOptions::post()
            .with_header("Content-Type", "multipart/form-data")
            .unwrap()
            .multipart(form.clone());

        let prepared = client.prepare("/upload", &options).unwrap();
        assert!(!prepared.headers.contains_key(CONTENT_TYPE));
        assert_eq!(prepared.header("authorization"), Some("Bearer abc123"));
        assert_eq!(prepared.body, PreparedBody::Multipart(form));
    }

    #[test]
    fn test_invalid_token_becomes_api_error() {
        let client = client_with_token(Some("bad\ntoken"));
        let error = client.prepare("/", &RequestOptions::get()).unwrap_err();
        assert_eq!(error.status_code(), None);
        assert_eq!(error.kind(), ErrorKind::GenericFailure);
        assert!(!error.message().is_empty());
    }

    #[test]
    fn test_url_resolution() {
        let client = client_with_token(None);
        let resolve = |path: &str, params: &[(String, String)]| {
            client.resolve_url(path, params).unwrap().to_string()
        };

        assert_eq!(resolve("users", &[]), "http://localhost:8000/api/v1/users");
        assert_eq!(resolve("/users/", &[]), "http://localhost:8000/api/v1/users/");
        assert_eq!(resolve("", &[]), "http://localhost:8000/api/v1");
        assert_eq!(
            resolve("/bounties?sort=new", &[("page".to_string(), "2".to_string())]),
            "http://localhost:8000/api/v1/bounties?sort=new&page=2"
        );
        assert_eq!(
            resolve("https://cdn.example.com/asset.json", &[]),
            "https://cdn.example.com/asset.json"
        );
    }

    #[test]
    fn test_path_query_extends_base_query() {
        let client = Client::builder()
            .base_url("http://localhost:8000/api?key=k")
            .unwrap()
            .build()
            .unwrap();

        let url = client
            .resolve_url("/items?page=2", &[("limit".to_string(), "10".to_string())])
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/items?key=k&page=2&limit=10");

        let url = client.resolve_url("/items", &[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/items?key=k");
    }

    #[test]
    fn test_base_url_with_trailing_slash() {
        let client = Client::builder()
            .base_url("http://localhost:8000/api/v1/")
            .unwrap()
            .build()
            .unwrap();
        let prepared = client.prepare("/users", &RequestOptions::get()).unwrap();
        assert_eq!(prepared.url.as_str(), "http://localhost:8000/api/v1/users");
    }

    #[test]
    fn test_builder_requires_base_url() {
        assert!(matches!(
            Client::builder().build(),
            Err(Error::ConfigurationError(_))
        ));
        assert!(matches!(
            Client::builder().base_url("not a url"),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(
            Client::builder().base_url("mailto:dev@example.com"),
            Err(Error::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_builder_from_config() {
        let config = ClientConfig {
            base_url: "https://api.example.com/v2".to_string(),
            timeout: Some(Duration::from_secs(5)),
            login_route: "/signin".to_string(),
        };
        let client = ClientBuilder::from_config(&config).unwrap().build().unwrap();
        assert_eq!(client.base_url().as_str(), "https://api.example.com/v2");
        assert_eq!(client.login_route(), "/signin");
    }

    #[test]
    fn test_builder_defaults_to_memory_stores() {
        let client = client_with_token(None);
        assert!(client.auth_store().access_token().is_none());

        client.ui_store().set_global_loading(true);
        client.ui_store().set_global_loading(false);
        let prepared = client.prepare("/", &RequestOptions::get()).unwrap();
        assert!(prepared.header("authorization").is_none());
    }
}
