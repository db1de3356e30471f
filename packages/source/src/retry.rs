//! Bounded retry with exponential backoff around any [`DataSource`].
//!
//! Every fetch the pipeline performs goes through [`fetch_with_retry`]:
//!
//! ```ignore
//! use ev_map_source::{decode_json_records, retry};
//!
//! let fetched = retry::fetch_with_retry(source.as_ref(), &policy, decode_json_records).await?;
//! let records = fetched.value;
//! ```
//!
//! Network errors, non-success statuses, I/O errors and payloads that fail
//! to decode are all treated as transient. After failed attempt `n` the
//! caller sleeps `backoff_base ^ n` seconds; once `max_attempts` attempts
//! have failed the last error is wrapped in [`SourceError::Unavailable`].

use ev_map_source_models::RetryPolicy;

use crate::{DataSource, SourceError};

/// A decoded payload together with the raw bytes it came from.
#[derive(Debug)]
pub struct Fetched<T> {
    /// The decoded value.
    pub value: T,
    /// The raw payload of the successful attempt.
    pub payload: Vec<u8>,
    /// Number of attempts it took (1 = first try).
    pub attempts: u32,
}

/// Fetches from `source` and decodes the payload, retrying per `policy`.
///
/// `decode` runs on every successfully fetched payload; a decode failure
/// consumes an attempt exactly like a network failure.
///
/// # Errors
///
/// Returns [`SourceError::Unavailable`] carrying the last underlying error
/// once `policy.max_attempts` attempts have failed. A policy with
/// `max_attempts == 0` still makes one attempt.
pub async fn fetch_with_retry<T, F>(
    source: &dyn DataSource,
    policy: &RetryPolicy,
    decode: F,
) -> Result<Fetched<T>, SourceError>
where
    F: Fn(&[u8]) -> Result<T, SourceError>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1u32;

    loop {
        let result = match source.fetch().await {
            Ok(payload) => decode(&payload).map(|value| (value, payload)),
            Err(e) => Err(e),
        };

        match result {
            Ok((value, payload)) => {
                if attempt > 1 {
                    log::info!(
                        "{}: succeeded on attempt {attempt}/{max_attempts}",
                        source.id()
                    );
                }
                return Ok(Fetched {
                    value,
                    payload,
                    attempts: attempt,
                });
            }
            Err(e) if attempt >= max_attempts => {
                log::error!(
                    "{}: giving up after {attempt} attempt(s): {e}",
                    source.id()
                );
                return Err(SourceError::Unavailable {
                    source_id: source.id().to_string(),
                    attempts: attempt,
                    cause: Box::new(e),
                });
            }
            Err(e) => {
                let delay = policy.backoff(attempt);
                log::warn!(
                    "{}: attempt {attempt}/{max_attempts} failed: {e}; retrying in {delay:?}...",
                    source.id()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// [`fetch_with_retry`] without decoding.
///
/// # Errors
///
/// Returns [`SourceError::Unavailable`] once the policy is exhausted.
pub async fn fetch_bytes_with_retry(
    source: &dyn DataSource,
    policy: &RetryPolicy,
) -> Result<Vec<u8>, SourceError> {
    fetch_with_retry(source, policy, |_| Ok(()))
        .await
        .map(|fetched| fetched.payload)
}
