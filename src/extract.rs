//! Response extraction
//!
//! Turns a raw HTTP response into a [`RawResponse`]: the body text, the
//! status code and the three index headers. The response is consumed by
//! value, so its body is read and released exactly once whichever way the
//! extraction ends.

use std::fmt;

use http::HeaderMap;
use http_body_util::BodyExt;
use hyper::body::Body;
use hyper::{Response, StatusCode};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Applied-state index of the keyspace
pub const ETCD_INDEX_HEADER: &str = "X-Etcd-Index";
/// Raft log index
pub const RAFT_INDEX_HEADER: &str = "X-Raft-Index";
/// Raft term
pub const RAFT_TERM_HEADER: &str = "X-Raft-Term";

/// Body text, status and index headers of one response
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawResponse {
    pub body: Option<String>,
    pub status: u16,
    pub etcd_index: Option<u64>,
    pub raft_index: Option<u64>,
    pub raft_term: Option<u64>,
}

/// Read and release the response, then check its status against `accepted`.
///
/// A `400 Bad Request` that carries a body is let through even when not
/// accepted: etcd describes the failure in the JSON body.
pub(crate) async fn extract<B>(response: Response<B>, accepted: &[u16]) -> Result<RawResponse>
where
    B: Body,
    B::Error: fmt::Display,
{
    let (parts, body) = response.into_parts();
    let status = parts.status;
    let body = read_body(body).await?;

    debug!("Response status {} ({} body)", status, if body.is_some() { "with" } else { "no" });

    if !accepted.contains(&status.as_u16()) {
        let detailed = status == StatusCode::BAD_REQUEST && body.is_some();
        if !detailed {
            warn!("Unexpected response status {} (accepted {:?})", status, accepted);
            return Err(Error::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }
    }

    Ok(RawResponse {
        body,
        status: status.as_u16(),
        etcd_index: index_header(&parts.headers, ETCD_INDEX_HEADER)?,
        raft_index: index_header(&parts.headers, RAFT_INDEX_HEADER)?,
        raft_term: index_header(&parts.headers, RAFT_TERM_HEADER)?,
    })
}

/// Drain the body to text. `None` when the response has no body at all.
/// Invalid UTF-8 is replaced rather than rejected.
async fn read_body<B>(body: B) -> Result<Option<String>>
where
    B: Body,
    B::Error: fmt::Display,
{
    if body.is_end_stream() {
        return Ok(None);
    }

    let bytes = body
        .collect()
        .await
        .map_err(|e| Error::Read(e.to_string()))?
        .to_bytes();

    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

fn index_header(headers: &HeaderMap, name: &'static str) -> Result<Option<u64>> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };
    let text = String::from_utf8_lossy(value.as_bytes());
    text.parse::<u64>()
        .map(Some)
        .map_err(|source| Error::Header {
            name,
            value: text.into_owned(),
            source,
        })
}
