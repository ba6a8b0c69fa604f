#![deny(warnings)]

//! Upstream data access for the planner.
//!
//! Two upstream schemas are supported behind the [`UpstreamSource`] trait:
//! a structured per-character JSON API ([`JsonSource`]) and a legacy feed of
//! script files assigning data literals to variables ([`LegacyScriptSource`]).
//! Both normalize into the canonical shapes of `planner-core`.
//!
//! [`DataCache`] memoizes catalog/profile lookups per session and coalesces
//! concurrent requests for the same key; [`ImageCache`] does the same for
//! icon downloads backed by a local directory.

pub mod cache;
pub mod coalesce;
pub mod config;
pub mod images;
pub mod json_source;
pub mod legacy;
pub mod script;
pub mod source;
pub mod transport;
pub mod vocab;

use planner_calc::CalcError;
use planner_core::ValidationError;
use thiserror::Error;

pub use cache::DataCache;
pub use config::{Language, PlannerConfig, SourceKind};
pub use images::{ImageCache, ImageCacheStats};
pub use json_source::JsonSource;
pub use legacy::LegacyScriptSource;
pub use source::{ConfiguredSource, UpstreamSource};
pub use transport::{HttpTransport, Transport};

/// Errors produced while fetching or decoding upstream data.
///
/// Cloneable so a single failed fetch can be reported to every caller
/// waiting on it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataError {
    /// Network or backend failure, including non-success HTTP statuses.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    /// Payload could not be decoded into the expected schema.
    #[error("could not decode {context}: {message}")]
    Decode { context: String, message: String },
    /// A legacy script did not assign the expected variable.
    #[error("script does not define variable `{0}`")]
    ScriptVariable(String),
    /// Decoded data violates a canonical invariant.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Calculation over fetched data failed.
    #[error(transparent)]
    Calc(#[from] CalcError),
    #[error("io error: {0}")]
    Io(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The fetch this request was waiting on was dropped before finishing.
    #[error("fetch was cancelled before completing")]
    Cancelled,
}

impl From<std::io::Error> for DataError {
    fn from(e: std::io::Error) -> Self {
        DataError::Io(e.to_string())
    }
}

/// Decode a JSON payload, tagging failures with `context`.
pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(
    context: &str,
    text: &str,
) -> Result<T, DataError> {
    serde_json::from_str(text).map_err(|e| DataError::Decode {
        context: context.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory transport used by the unit tests.

    use super::{DataError, Transport};
    use std::collections::HashMap;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone, Default)]
    pub struct MockTransport {
        pub routes: Arc<Mutex<HashMap<String, Vec<u8>>>>,
        pub calls: Arc<AtomicUsize>,
        pub delay: Duration,
    }

    impl MockTransport {
        pub fn with_delay(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::default()
            }
        }

        pub fn route(&self, url: &str, body: impl Into<Vec<u8>>) {
            self.routes
                .lock()
                .unwrap()
                .insert(url.to_string(), body.into());
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn respond(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, DataError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let body = self.routes.lock().unwrap().get(url).cloned();
            let url = url.to_string();
            let delay = self.delay;
            async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                body.ok_or(DataError::Transport {
                    url,
                    message: "HTTP status 404".into(),
                })
            }
        }
    }

    impl Transport for MockTransport {
        fn get_text(&self, url: &str) -> impl Future<Output = Result<String, DataError>> + Send {
            let fut = self.respond(url);
            async move {
                let bytes = fut.await?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
        }

        fn get_bytes(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, DataError>> + Send {
            self.respond(url)
        }
    }
}
