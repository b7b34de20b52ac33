//! Bounded request-body ingestion.
//!
//! The body is streamed through a [`BoundedReader`] in fixed-size chunks with
//! an incremental byte count; the moment the running total crosses the
//! route's limit the stream is abandoned, so an understated or absent
//! Content-Length can never grow memory past the limit. Only after a
//! complete, in-budget read are the bytes parsed as JSON.

use serde_json::Value;
use std::collections::HashMap;
use std::io::{self, Read};
use tracing::debug;

/// Read chunk size for body streaming.
const CHUNK_SIZE: usize = 8 * 1024;

/// Failure modes of body ingestion, each mapped to one wire response by the
/// pipeline (406, 413, 400) except transport errors, which bubble to the
/// outer 500 handler.
#[derive(Debug)]
pub enum BodyError {
    /// Declared Content-Type is present and is not `application/json`.
    UnsupportedMediaType,
    /// Declared or observed size exceeds the route's limit.
    TooLarge,
    /// The complete body is not valid JSON.
    Malformed,
    /// Stream-level transport failure.
    Io(io::Error),
}

impl std::fmt::Display for BodyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BodyError::UnsupportedMediaType => write!(f, "content type is not application/json"),
            BodyError::TooLarge => write!(f, "body exceeds the size limit"),
            BodyError::Malformed => write!(f, "body is not valid JSON"),
            BodyError::Io(err) => write!(f, "body stream failed: {err}"),
        }
    }
}

impl std::error::Error for BodyError {}

/// Marker payload carried by the I/O error a [`BoundedReader`] raises when
/// the running total crosses its limit.
#[derive(Debug)]
struct LimitExceeded;

impl std::fmt::Display for LimitExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "size limit exceeded")
    }
}

impl std::error::Error for LimitExceeded {}

/// Stream decorator that raises a size-exceeded condition as soon as the
/// bytes read so far cross the limit.
pub struct BoundedReader<R> {
    inner: R,
    limit: usize,
    total: usize,
}

impl<R: Read> BoundedReader<R> {
    /// Wrap `inner`, allowing at most `limit` bytes through.
    pub fn new(inner: R, limit: usize) -> Self {
        Self {
            inner,
            limit,
            total: 0,
        }
    }

    /// Bytes passed through so far.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }
}

impl<R: Read> Read for BoundedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.total += n;
        if self.total > self.limit {
            return Err(io::Error::new(io::ErrorKind::InvalidData, LimitExceeded));
        }
        Ok(n)
    }
}

fn is_limit_exceeded(err: &io::Error) -> bool {
    err.get_ref().is_some_and(|inner| inner.is::<LimitExceeded>())
}

/// Whether a declared Content-Type names `application/json`, tolerating
/// parameters and surrounding whitespace. An absent header is acceptable.
fn content_type_is_json(headers: &HashMap<String, String>) -> bool {
    match headers.get("content-type") {
        Some(value) => value
            .split(';')
            .next()
            .map(str::trim)
            .is_some_and(|essence| essence.eq_ignore_ascii_case("application/json")),
        None => true,
    }
}

/// Ingest and parse the request body under the route's size limit.
///
/// Policy, in order: reject a non-JSON Content-Type (406), reject a declared
/// Content-Length over the limit before reading anything (413), stream with
/// incremental accounting and abort the moment the limit is crossed (413),
/// then parse the whole body as JSON (400 on failure). An empty body yields
/// `Ok(None)` without a parse attempt.
///
/// # Errors
///
/// Returns the corresponding [`BodyError`]; `Io` carries stream-level
/// transport failures for the outer handler.
pub fn ingest_json_body<R: Read>(
    reader: R,
    headers: &HashMap<String, String>,
    limit: usize,
) -> Result<Option<Value>, BodyError> {
    if !content_type_is_json(headers) {
        return Err(BodyError::UnsupportedMediaType);
    }

    // Upfront rejection on the declared size; an unparseable declaration is
    // ignored and the streamed bound still applies.
    if let Some(declared) = headers
        .get("content-length")
        .and_then(|v| v.trim().parse::<usize>().ok())
    {
        if declared > limit {
            debug!(declared, limit, "Declared body length over limit");
            return Err(BodyError::TooLarge);
        }
    }

    let mut bounded = BoundedReader::new(reader, limit);
    let mut bytes = Vec::new();
    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        match bounded.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => bytes.extend_from_slice(&chunk[..n]),
            Err(err) if is_limit_exceeded(&err) => {
                debug!(read = bounded.total(), limit, "Body stream aborted over limit");
                return Err(BodyError::TooLarge);
            }
            Err(err) => return Err(BodyError::Io(err)),
        }
    }

    if bytes.is_empty() {
        return Ok(None);
    }
    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            debug!(error = %err, size = bytes.len(), "Body failed to parse as JSON");
            Err(BodyError::Malformed)
        }
    }
}
