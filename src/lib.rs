//! # apifetch - A typed API client with one error model
//!
//! apifetch wraps `reqwest` with the plumbing every front end ends up writing
//! around its API calls: it attaches the bearer token, reports a global loading
//! flag, reacts to expired sessions, and turns every failure, whatever its
//! shape, into a single [`ApiError`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use apifetch::{Client, MemoryAuthStore, MemoryUiStore};
//! use serde::Deserialize;
//! use std::sync::Arc;
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let auth = Arc::new(MemoryAuthStore::new("token-from-login"));
//!     let ui = Arc::new(MemoryUiStore::new());
//!
//!     // Base URL comes from API_BASE_URL, or the builder.
//!     let client = Client::builder()
//!         .base_url("http://localhost:8000/api/v1")?
//!         .auth_store(auth.clone())
//!         .ui_store(ui.clone())
//!         .build()?;
//!
//!     match client.get::<User>("/users/me").await {
//!         Ok(user) => println!("Hello, {}", user.data.name),
//!         Err(error) if error.is_unauthorized() => {
//!             // The token has already been cleared.
//!             assert!(!auth.is_authenticated());
//!         }
//!         Err(error) => eprintln!("{} ({:?})", error, error.status_code()),
//!     }
//!
//!     assert!(!ui.is_global_loading());
//!     Ok(())
//! }
//! ```
//!
//! ## Request pipeline
//!
//! - **Headers** - `Accept: application/json` and `Content-Type: application/json`
//!   (dropped for multipart bodies), client default headers, `Authorization: Bearer <token>`
//!   when the [`AuthStore`] holds one, then the caller's headers. Later layers win.
//! - **Body** - text, bytes and multipart forms pass through; structured values are
//!   sent as JSON text.
//! - **Loading** - [`UiStore::set_global_loading`] is called with `true` right before the
//!   request is sent and with `false` exactly once when it settles, fails, or is dropped.
//! - **Errors** - the message comes from the body's `message`, then `detail`, then a fixed
//!   fallback; `errors` carries field-level validation messages.
//! - **401** - the session is logged out and the [`Navigator`] is sent to the login route.
//!
//! ## Deferred and repeated requests
//!
//! ```no_run
//! use apifetch::{Client, RequestOptions};
//!
//! # async fn example(client: Client) -> Result<(), apifetch::Error> {
//! let options = RequestOptions::post()
//!     .json(&serde_json::json!({ "name": "New Item" }))?
//!     .immediate(false);
//!
//! let mut create = client.fetch::<serde_json::Value>("/items", options).await;
//! create.execute().await;
//!
//! if let Some(error) = create.error() {
//!     if let Some(messages) = error.field_errors("name") {
//!         eprintln!("name: {}", messages.join(", "));
//!     }
//! }
//!
//! let mut items = client.fetch::<Vec<serde_json::Value>>("/items", RequestOptions::get()).await;
//! items.refresh().await;
//! # Ok(())
//! # }
//! ```

mod client;
pub mod config;
mod error;
mod options;
mod outcome;
mod prepared;
mod response;
mod stores;

pub use client::{Client, ClientBuilder};
pub use config::ClientConfig;
pub use error::{ApiError, Error, ErrorKind, FieldErrors, Result, FALLBACK_MESSAGE};
pub use options::{FormPart, MultipartForm, RequestBody, RequestOptions};
pub use outcome::{Fetch, FetchStatus, RequestOutcome};
pub use prepared::{PreparedBody, PreparedRequest};
pub use response::Response;
pub use stores::{AuthStore, MemoryAuthStore, MemoryUiStore, Navigator, UiStore};
