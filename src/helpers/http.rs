//! Blocking HTTP client for mirror access
//!
//! All network I/O goes through [`HttpClient`], which carries the timeout
//! and the retry policy. Connection errors and 5xx responses are retried
//! with exponential backoff; 4xx responses fail immediately.

use crate::core::error::InstallError;
use crate::core::output;
use crate::helpers::progress::Transfer;
use anyhow::{Context, Result};
use std::io::{Read, Write};
use std::thread;
use std::time::Duration;

/// Delay before the first retry; doubles on each further attempt
const INITIAL_BACKOFF_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    retries: u32,
    backoff: Duration,
}

impl HttpClient {
    pub fn new(timeout: Duration, retries: u32) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("portlibs/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            retries,
            backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }

    /// Override the initial retry delay
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Issue a GET, retrying transient failures.
    fn get(&self, url: &str) -> Result<ureq::Response, InstallError> {
        let mut delay = self.backoff;
        let mut attempt = 0;

        loop {
            let err = match self.agent.get(url).call() {
                Ok(response) => return Ok(response),
                Err(ureq::Error::Status(status, _)) => InstallError::HttpStatus {
                    url: url.to_string(),
                    status,
                },
                Err(ureq::Error::Transport(t)) => InstallError::Transport {
                    url: url.to_string(),
                    message: t.to_string(),
                },
            };

            if attempt >= self.retries || !err.is_retryable() {
                return Err(err);
            }
            attempt += 1;
            output::warning(&format!(
                "{} (retry {}/{} in {:?})",
                err, attempt, self.retries, delay
            ));
            thread::sleep(delay);
            delay *= 2;
        }
    }

    /// Fetch a URL as text
    pub fn get_string(&self, url: &str) -> Result<String> {
        let response = self.get(url)?;
        let body = response.into_string().map_err(|e| InstallError::Transport {
            url: url.to_string(),
            message: format!("failed to read response: {}", e),
        })?;
        Ok(body)
    }

    /// Stream a URL into `writer`, showing progress labelled `label`.
    ///
    /// Returns the number of bytes written.
    pub fn download_to(&self, url: &str, writer: &mut impl Write, label: &str) -> Result<u64> {
        let response = self.get(url)?;
        let length = response
            .header("content-length")
            .and_then(|s| s.parse().ok());
        let transfer = Transfer::start(label, length);

        let mut reader = response.into_reader();
        let mut buffer = [0u8; 8192];
        let mut total_bytes = 0u64;

        loop {
            let n = reader.read(&mut buffer).map_err(|e| InstallError::Transport {
                url: url.to_string(),
                message: format!("read error: {}", e),
            })?;
            if n == 0 {
                break;
            }
            writer
                .write_all(&buffer[..n])
                .with_context(|| format!("write error while downloading {}", label))?;
            total_bytes += n as u64;
            transfer.advance(n as u64);
        }

        Ok(total_bytes)
    }
}
