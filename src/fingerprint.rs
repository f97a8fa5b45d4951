//! Content fingerprints and conditional request evaluation.
//!
//! A fingerprint pairs an `ETag` derived from the resource bytes with the
//! instant the resource was last modified. Conditional headers are checked
//! against it in a fixed order: `If-None-Match` first, and only when it is
//! absent, `If-Modified-Since`.

use md5::{Digest, Md5};
use std::io::{self, Read};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::response::HeaderMap;

pub const IF_NONE_MATCH: &str = "If-None-Match";
pub const IF_MODIFIED_SINCE: &str = "If-Modified-Since";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// Quoted upper-case hex MD5 of the uncompressed content.
    pub etag: String,
    /// Whole-second modification instant.
    pub last_modified: SystemTime,
}

impl Fingerprint {
    /// Hashes `content` to the end of the stream.
    pub fn compute(content: &mut dyn Read, last_modified: SystemTime) -> io::Result<Self> {
        let mut hasher = Md5::new();
        io::copy(content, &mut hasher)?;
        Ok(Self {
            etag: format!("\"{}\"", hex::encode_upper(hasher.finalize())),
            last_modified: truncate_to_seconds(last_modified),
        })
    }

    /// `Last-Modified` header value in IMF-fixdate form.
    pub fn last_modified_header(&self) -> String {
        httpdate::fmt_http_date(self.last_modified)
    }
}

// HTTP dates carry no sub-second part, so a stored instant with nanoseconds
// would always look newer than the date a client echoes back.
fn truncate_to_seconds(time: SystemTime) -> SystemTime {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    UNIX_EPOCH + Duration::from_secs(secs)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// Send the full content.
    Modified,
    /// The client copy is current.
    NotModified,
}

/// Decides whether the client's cached copy is still current.
pub fn evaluate(headers: &HeaderMap, fingerprint: &Fingerprint) -> CacheDecision {
    let if_none_match = headers.get_all(IF_NONE_MATCH);
    if !if_none_match.is_empty() {
        let matched = if_none_match
            .iter()
            .flat_map(|value| value.split(','))
            .any(|candidate| candidate.trim() == fingerprint.etag);
        log::debug!(
            "If-None-Match {:?} against {}: {}",
            if_none_match,
            fingerprint.etag,
            if matched { "match" } else { "mismatch" }
        );
        return if matched {
            CacheDecision::NotModified
        } else {
            CacheDecision::Modified
        };
    }

    if let Some(value) = headers.get(IF_MODIFIED_SINCE) {
        match httpdate::parse_http_date(value) {
            Ok(since) if fingerprint.last_modified <= since => {
                log::debug!("Not modified since {}", value);
                return CacheDecision::NotModified;
            }
            Ok(_) => log::debug!("Modified since {}", value),
            Err(e) => log::debug!("Ignoring unparsable If-Modified-Since '{}': {}", value, e),
        }
    }

    CacheDecision::Modified
}
