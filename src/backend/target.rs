//! Where backend requests go.
//!
//! Object keys are put in canonical S3 form before they reach the URL: the
//! path is decoded, then each segment is re-encoded with only RFC 3986
//! unreserved bytes left bare. The signed path then matches the one the
//! backend reconstructs, whatever escaping the client used.

use percent_encoding::{percent_decode_str, percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::BackendConfig;

/// Bytes S3 leaves unescaped in a key segment.
const KEY_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Fixed part of every backend URL: endpoint, bucket and key prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    base_url: String,
    bucket: String,
    prefix: String,
}

impl BackendTarget {
    pub fn new(base_url: impl Into<String>, bucket: impl Into<String>, prefix: Option<&str>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            bucket: bucket.into(),
            prefix: normalize_prefix(prefix),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        let base_url = match &config.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => storage_base_url(&config.region),
        };
        Self::new(base_url, config.bucket.clone(), config.prefix.as_deref())
    }

    /// URL for an inbound request path (which starts with `/`).
    pub fn object_url(&self, path: &str) -> String {
        let key = encode_key_path(&format!("{}{}", self.prefix, path));
        format!("{}/{}{}", self.base_url, self.bucket, key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Regional S3 endpoint.
pub fn storage_base_url(region: &str) -> String {
    format!("http://s3.{region}.amazonaws.com")
}

/// Canonical S3 spelling of a key path: `/ep(1).mp4` and `/ep%281%29.mp4`
/// both become `/ep%281%29.mp4`.
pub fn encode_key_path(path: &str) -> String {
    let decoded: Vec<u8> = percent_decode_str(path).collect();
    decoded
        .split(|b| *b == b'/')
        .map(|segment| percent_encode(segment, KEY_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// `"vod/"` → `"/vod"`, `""` → `""`.
fn normalize_prefix(prefix: Option<&str>) -> String {
    let trimmed = prefix.unwrap_or_default().trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
