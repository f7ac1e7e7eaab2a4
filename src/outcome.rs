//! Request outcomes and re-runnable fetch handles.

use crate::{ApiError, Client, RequestOptions, Response};
use serde::de::DeserializeOwned;

/// Where a request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// Deferred with `immediate(false)` and not yet executed.
    Idle,
    /// Issued and not yet settled.
    Pending,
    /// Settled with data.
    Success,
    /// Settled with an [`ApiError`].
    Error,
}

#[derive(Debug, Clone)]
enum State<T> {
    Idle,
    Pending,
    Success(Response<T>),
    Failure(ApiError),
}

/// The state of one request: pending, or settled with exactly one of data or error.
///
/// Once [`is_pending`](RequestOutcome::is_pending) is `false`, exactly one of
/// [`data`](RequestOutcome::data) and [`error`](RequestOutcome::error) is `Some`.
///
/// # Examples
///
/// ```no_run
/// use apifetch::{Client, RequestOptions};
///
/// # async fn example() -> Result<(), apifetch::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com/v1")?
///     .build()?;
///
/// let outcome = client
///     .execute::<serde_json::Value>("/bounties", &RequestOptions::get())
///     .await;
///
/// if let Some(error) = outcome.error() {
///     eprintln!("Failed to fetch bounties: {}", error);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RequestOutcome<T> {
    state: State<T>,
}

impl<T> RequestOutcome<T> {
    /// Creates an outcome for a request that is about to be issued.
    pub fn pending() -> Self {
        Self {
            state: State::Pending,
        }
    }

    /// Creates an outcome for a deferred request.
    pub fn idle() -> Self {
        Self { state: State::Idle }
    }

    /// Creates a settled outcome from a request result.
    pub fn settled(result: Result<Response<T>, ApiError>) -> Self {
        let mut outcome = Self::pending();
        outcome.settle(result);
        outcome
    }

    pub(crate) fn begin(&mut self) {
        self.state = State::Pending;
    }

    pub(crate) fn settle(&mut self, result: Result<Response<T>, ApiError>) {
        self.state = match result {
            Ok(response) => State::Success(response),
            Err(error) => State::Failure(error),
        };
    }

    /// Returns the lifecycle status.
    pub fn status(&self) -> FetchStatus {
        match self.state {
            State::Idle => FetchStatus::Idle,
            State::Pending => FetchStatus::Pending,
            State::Success(_) => FetchStatus::Success,
            State::Failure(_) => FetchStatus::Error,
        }
    }

    /// Returns `true` until the request settles. A deferred request that has
    /// not run yet counts as pending.
    pub fn is_pending(&self) -> bool {
        matches!(self.state, State::Idle | State::Pending)
    }

    /// Returns the parsed data, if the request succeeded.
    pub fn data(&self) -> Option<&T> {
        self.response().map(|response| &response.data)
    }

    /// Returns the full response, if the request succeeded.
    pub fn response(&self) -> Option<&Response<T>> {
        match &self.state {
            State::Success(response) => Some(response),
            _ => None,
        }
    }

    /// Returns the error, if the request failed.
    pub fn error(&self) -> Option<&ApiError> {
        match &self.state {
            State::Failure(error) => Some(error),
            _ => None,
        }
    }

    /// Converts a settled outcome into a `Result`. Returns `None` while pending.
    pub fn into_result(self) -> Option<Result<Response<T>, ApiError>> {
        match self.state {
            State::Idle | State::Pending => None,
            State::Success(response) => Some(Ok(response)),
            State::Failure(error) => Some(Err(error)),
        }
    }
}

/// A request bound to its path and options that can be run again.
///
/// Created by [`Client::fetch`]. Each handle owns its outcome, so handles
/// running at the same time never see each other's results.
///
/// # Examples
///
/// ```no_run
/// use apifetch::{Client, RequestOptions};
///
/// # async fn example() -> Result<(), apifetch::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com/v1")?
///     .build()?;
///
/// let options = RequestOptions::post()
///     .json(&serde_json::json!({ "name": "New Item" }))?
///     .immediate(false);
///
/// let mut create = client.fetch::<serde_json::Value>("/items", options).await;
/// assert!(create.outcome().is_pending());
///
/// create.execute().await;
/// if create.error().is_none() {
///     println!("created: {:?}", create.data());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Fetch<T> {
    client: Client,
    path: String,
    options: RequestOptions,
    outcome: RequestOutcome<T>,
}

impl<T> Fetch<T>
where
    T: DeserializeOwned,
{
    pub(crate) fn new(client: Client, path: String, options: RequestOptions) -> Self {
        Self {
            client,
            path,
            options,
            outcome: RequestOutcome::idle(),
        }
    }

    /// Runs the request and waits for it to settle.
    ///
    /// The outcome goes back to pending first, then the whole pipeline runs
    /// again: headers are rebuilt with the current token, the body is
    /// re-serialized, and the result is classified afresh.
    pub async fn execute(&mut self) -> &RequestOutcome<T> {
        self.outcome.begin();
        let result = self.client.request(&self.path, &self.options).await;
        self.outcome.settle(result);
        &self.outcome
    }

    /// Repeats the request with the same options. Same as [`execute`](Fetch::execute).
    pub async fn refresh(&mut self) -> &RequestOutcome<T> {
        self.execute().await
    }
}

impl<T> Fetch<T> {
    /// Returns the current outcome.
    pub fn outcome(&self) -> &RequestOutcome<T> {
        &self.outcome
    }

    /// Returns the parsed data from the last successful run.
    pub fn data(&self) -> Option<&T> {
        self.outcome.data()
    }

    /// Returns the error from the last failed run.
    pub fn error(&self) -> Option<&ApiError> {
        self.outcome.error()
    }

    /// Returns `true` until the current run settles.
    pub fn is_pending(&self) -> bool {
        self.outcome.is_pending()
    }

    /// Returns the path this handle requests.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the options this handle sends.
    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    /// Consumes the handle and returns its outcome.
    pub fn into_outcome(self) -> RequestOutcome<T> {
        self.outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, StatusCode};
    use std::time::Duration;

    fn ok_response(value: u32) -> Response<u32> {
        Response::new(value, value.to_string(), StatusCode::OK, HeaderMap::new(), Duration::ZERO)
    }

    fn failure() -> ApiError {
        ApiError::from_response(StatusCode::INTERNAL_SERVER_ERROR, b"{}")
    }

    #[test]
    fn test_pending_has_neither_data_nor_error() {
        let outcome = RequestOutcome::<u32>::pending();
        assert!(outcome.is_pending());
        assert_eq!(outcome.status(), FetchStatus::Pending);
        assert!(outcome.data().is_none());
        assert!(outcome.error().is_none());
        assert!(outcome.into_result().is_none());
    }

    #[test]
    fn test_idle_counts_as_pending() {
        let outcome = RequestOutcome::<u32>::idle();
        assert!(outcome.is_pending());
        assert_eq!(outcome.status(), FetchStatus::Idle);
    }

    #[test]
    fn test_success_holds_only_data() {
        let outcome = RequestOutcome::settled(Ok(ok_response(7)));
        assert!(!outcome.is_pending());
        assert_eq!(outcome.status(), FetchStatus::Success);
        assert_eq!(outcome.data(), Some(&7));
        assert!(outcome.error().is_none());
    }

    #[test]
    fn test_failure_holds_only_error() {
        let outcome = RequestOutcome::<u32>::settled(Err(failure()));
        assert!(!outcome.is_pending());
        assert_eq!(outcome.status(), FetchStatus::Error);
        assert!(outcome.data().is_none());
        assert_eq!(outcome.error().and_then(ApiError::status_code), Some(500));
    }

    #[test]
    fn test_begin_clears_previous_settlement() {
        let mut outcome = RequestOutcome::settled(Ok(ok_response(1)));
        outcome.begin();
        assert!(outcome.is_pending());
        assert!(outcome.data().is_none());

        outcome.settle(Err(failure()));
        assert!(outcome.data().is_none());
        assert!(outcome.error().is_some());
    }
}
