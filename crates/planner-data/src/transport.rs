//! HTTP transport.

use crate::DataError;
use std::future::Future;
use std::io::Read;
use std::time::Duration;
use tracing::debug;

/// Fetches raw payloads from upstream. Failures are reported, never retried.
pub trait Transport: Send + Sync + 'static {
    fn get_text(&self, url: &str) -> impl Future<Output = Result<String, DataError>> + Send;
    fn get_bytes(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, DataError>> + Send;
}

/// Blocking `ureq` agent driven from tokio's blocking pool.
#[derive(Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(user_agent)
            .build();
        Self { agent }
    }

    async fn get<T, F>(&self, url: &str, read: F) -> Result<T, DataError>
    where
        T: Send + 'static,
        F: FnOnce(ureq::Response) -> std::io::Result<T> + Send + 'static,
    {
        let agent = self.agent.clone();
        let owned = url.to_string();
        let joined = tokio::task::spawn_blocking(move || {
            debug!(url = %owned, "GET");
            let resp = agent.get(&owned).call().map_err(|e| request_error(&owned, e))?;
            read(resp).map_err(|e| DataError::Transport {
                url: owned.clone(),
                message: e.to_string(),
            })
        })
        .await;
        joined.map_err(|e| DataError::Transport {
            url: url.to_string(),
            message: format!("join error: {e}"),
        })?
    }
}

fn request_error(url: &str, e: ureq::Error) -> DataError {
    let message = match e {
        ureq::Error::Status(code, _) => format!("HTTP status {code}"),
        ureq::Error::Transport(t) => t.to_string(),
    };
    DataError::Transport {
        url: url.to_string(),
        message,
    }
}

impl Transport for HttpTransport {
    fn get_text(&self, url: &str) -> impl Future<Output = Result<String, DataError>> + Send {
        self.get(url, |resp| resp.into_string())
    }

    fn get_bytes(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, DataError>> + Send {
        self.get(url, |resp| {
            let mut buf = Vec::new();
            resp.into_reader().read_to_end(&mut buf)?;
            Ok(buf)
        })
    }
}
