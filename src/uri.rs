//! Request URI construction
//!
//! Keys are slash-delimited paths. Each segment is percent-encoded on its
//! own and the encoded segments are joined back with `/`, so characters
//! such as `?`, `#`, `%` or spaces inside a segment never change the shape
//! of the request path.

use hyper::Uri;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::error::{Error, Result};

/// Path prefix of the keyspace API
pub const KEYS_PREFIX: &str = "v2/keys";

/// Path of the version endpoint
pub const VERSION_PATH: &str = "version";

/// Characters left unencoded in a key segment: the RFC 3986 unreserved set.
const KEY_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode a key into a URI path fragment.
///
/// Returns `""` for an empty key (or a lone `/`), otherwise one
/// `/`-prefixed encoded segment per key segment. A single leading slash is
/// stripped; every other segment is kept, including empty ones.
pub fn encode_key_path(key: &str) -> String {
    let key = key.strip_prefix('/').unwrap_or(key);
    if key.is_empty() {
        return String::new();
    }

    let mut path = String::with_capacity(key.len() + 8);
    for segment in key.split('/') {
        path.push('/');
        path.extend(utf8_percent_encode(segment, KEY_SEGMENT));
    }
    path
}

/// A validated base endpoint, always ending with `/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: String,
}

impl Endpoint {
    /// Validate and normalize an endpoint such as `http://127.0.0.1:4001`
    pub fn parse(endpoint: &str) -> Result<Self> {
        let mut url = Url::parse(endpoint)
            .map_err(|e| Error::InvalidUrl(format!("Invalid endpoint URL {:?}: {}", endpoint, e)))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(Error::InvalidUrl(format!(
                    "Unsupported endpoint scheme {:?}, expected http or https",
                    other
                )))
            }
        }
        if url.host_str().is_none() {
            return Err(Error::InvalidUrl(format!("Endpoint {:?} has no host", endpoint)));
        }

        url.set_query(None);
        url.set_fragment(None);
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(Self { base: url.into() })
    }

    /// The normalized base URI
    pub fn as_str(&self) -> &str {
        &self.base
    }

    /// Build the URI for `key` under `prefix`, followed by a literal
    /// `suffix` (which may carry a query string)
    pub fn key_uri(&self, prefix: &str, key: &str, suffix: &str) -> Result<Uri> {
        let relative = format!("{}{}{}", prefix, encode_key_path(key), suffix);
        self.resolve(&relative)
    }

    /// Resolve a path relative to the base endpoint
    pub fn resolve(&self, relative: &str) -> Result<Uri> {
        let url = format!("{}{}", self.base, relative);
        url.parse()
            .map_err(|e| Error::InvalidUrl(format!("Invalid request URL {:?}: {}", url, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Endpoint {
        Endpoint::parse("http://127.0.0.1:4001").unwrap()
    }

    #[test]
    fn test_endpoint_gets_trailing_slash() {
        assert_eq!(endpoint().as_str(), "http://127.0.0.1:4001/");
        let ep = Endpoint::parse("http://etcd.local:2379/base").unwrap();
        assert_eq!(ep.as_str(), "http://etcd.local:2379/base/");
        let ep = Endpoint::parse("https://etcd.local/already/").unwrap();
        assert_eq!(ep.as_str(), "https://etcd.local/already/");
    }

    #[test]
    fn test_endpoint_rejects_bad_input() {
        assert!(matches!(Endpoint::parse("not a url"), Err(Error::InvalidUrl(_))));
        assert!(matches!(Endpoint::parse("ftp://host/"), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_leading_slash_is_optional() {
        let ep = endpoint();
        let with = ep.key_uri(KEYS_PREFIX, "/a/b", "").unwrap();
        let without = ep.key_uri(KEYS_PREFIX, "a/b", "").unwrap();
        assert_eq!(with, without);
        assert_eq!(with.to_string(), "http://127.0.0.1:4001/v2/keys/a/b");
    }

    #[test]
    fn test_space_is_encoded_inside_segment() {
        let uri = endpoint().key_uri(KEYS_PREFIX, "a b", "").unwrap();
        assert_eq!(uri.path(), "/v2/keys/a%20b");
    }

    #[test]
    fn test_reserved_characters_are_escaped() {
        assert_eq!(encode_key_path("q?x#y%z"), "/q%3Fx%23y%25z");
        assert_eq!(encode_key_path("a+b=c&d"), "/a%2Bb%3Dc%26d");
        assert_eq!(encode_key_path("safe-._~"), "/safe-._~");
    }

    #[test]
    fn test_non_ascii_is_utf8_encoded() {
        assert_eq!(encode_key_path("/ключ"), "/%D0%BA%D0%BB%D1%8E%D1%87");
    }

    #[test]
    fn test_empty_key_yields_prefix_only() {
        let ep = endpoint();
        assert_eq!(encode_key_path(""), "");
        assert_eq!(encode_key_path("/"), "");
        assert_eq!(
            ep.key_uri(KEYS_PREFIX, "", "").unwrap().to_string(),
            "http://127.0.0.1:4001/v2/keys"
        );
    }

    #[test]
    fn test_inner_empty_segments_are_kept() {
        assert_eq!(encode_key_path("a//b"), "/a//b");
        assert_eq!(encode_key_path("/dir/"), "/dir/");
    }

    #[test]
    fn test_suffix_is_appended_verbatim() {
        let uri = endpoint()
            .key_uri(KEYS_PREFIX, "/jobs", "?wait=true&waitIndex=7&recursive=true")
            .unwrap();
        assert_eq!(uri.path(), "/v2/keys/jobs");
        assert_eq!(uri.query(), Some("wait=true&waitIndex=7&recursive=true"));

        let uri = endpoint().key_uri(KEYS_PREFIX, "jobs", "/").unwrap();
        assert_eq!(uri.path(), "/v2/keys/jobs/");
    }

    #[test]
    fn test_base_path_is_preserved() {
        let ep = Endpoint::parse("http://proxy:8080/etcd").unwrap();
        let uri = ep.key_uri(KEYS_PREFIX, "a", "").unwrap();
        assert_eq!(uri.to_string(), "http://proxy:8080/etcd/v2/keys/a");
        let uri = ep.resolve(VERSION_PATH).unwrap();
        assert_eq!(uri.to_string(), "http://proxy:8080/etcd/version");
    }
}
