//! Blocking HTTP calls made by the terminal client.
//!
//! Error statuses are not failures here: the panel server puts structured
//! errors in 4xx/5xx bodies, so every answered request yields its status and
//! text. Bodies are read up to a caller-supplied limit.

use std::{io::Read, sync::OnceLock, time::Duration};

use serde::Serialize;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Longer than the server's compare deadline so a slow comparison still
/// returns its structured error instead of a client-side timeout.
const READ_TIMEOUT: Duration = Duration::from_secs(660);
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("HTTP error: {0}")]
    Transport(String),
    #[error("Response exceeded {limit} bytes")]
    TooLarge { limit: usize },
    #[error("Failed to read response: {0}")]
    Read(#[from] std::io::Error),
    #[error("Response is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// An answered request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextResponse {
    pub status: u16,
    pub body: String,
}

impl TextResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .timeout_write(WRITE_TIMEOUT)
            .build()
    })
}

/// `GET url?query`, reading at most `limit` body bytes.
pub fn get(url: &str, query: &[(&str, &str)], limit: usize) -> Result<TextResponse, HttpError> {
    let request = query
        .iter()
        .fold(agent().get(url), |request, (key, value)| request.query(key, value));
    finish(request.call(), limit)
}

/// `POST url` with a JSON body, reading at most `limit` body bytes.
pub fn post_json<T: Serialize>(
    url: &str,
    body: &T,
    limit: usize,
) -> Result<TextResponse, HttpError> {
    let request = agent().post(url).set("Accept", "application/json");
    finish(request.send_json(body), limit)
}

fn finish(
    result: Result<ureq::Response, ureq::Error>,
    limit: usize,
) -> Result<TextResponse, HttpError> {
    let response = match result {
        Ok(response) | Err(ureq::Error::Status(_, response)) => response,
        Err(ureq::Error::Transport(err)) => return Err(HttpError::Transport(err.to_string())),
    };
    let status = response.status();
    let declared = response
        .header("Content-Length")
        .and_then(|length| length.parse::<u64>().ok());
    if declared.is_some_and(|length| length > limit as u64) {
        return Err(HttpError::TooLarge { limit });
    }
    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(limit as u64 + 1)
        .read_to_end(&mut bytes)?;
    if bytes.len() > limit {
        return Err(HttpError::TooLarge { limit });
    }
    Ok(TextResponse {
        status,
        body: String::from_utf8(bytes)?,
    })
}
