//! Request configuration types.
//!
//! A request is described in two layers:
//!
//! - [`RequestOptions`]: what the caller supplies per call. Every field is
//!   optional.
//! - [`RequestConfig`]: the effective request handed to a transport, built by
//!   [`RequestConfig::resolve`] from a set of defaults and the per-call
//!   options. Per-call values win for any key present in both.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::RxHttpError;

/// Name of the content type header (stored lowercase).
pub const CONTENT_TYPE: &str = "content-type";

/// The only content type rxhttp speaks.
pub const APPLICATION_JSON: &str = "application/json";

/// Methods that are normalized to uppercase, matching what browsers do.
const NORMALIZED_METHODS: [&str; 6] = ["DELETE", "GET", "HEAD", "OPTIONS", "POST", "PUT"];

// =============================================================================
// Headers
// =============================================================================

/// A case-insensitive header map.
///
/// Header names are stored lowercase, so `Content-Type` and `content-type`
/// address the same entry. Iteration order is the lexical order of the
/// lowercased names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct Headers {
    entries: BTreeMap<String, String>,
}

impl Headers {
    /// Create an empty header map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, returning the previous value for that name.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        self.entries
            .insert(name.as_ref().to_ascii_lowercase(), value.into())
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Look up a header value by name, ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Check whether a header is present, ignoring case.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Remove a header, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(&name.to_ascii_lowercase())
    }

    /// Number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs. Names are lowercase.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Shallow-merge `other` into `self`; values from `other` override.
    pub fn merge(&mut self, other: &Headers) {
        for (name, value) in &other.entries {
            self.entries.insert(name.clone(), value.clone());
        }
    }
}

impl From<BTreeMap<String, String>> for Headers {
    fn from(map: BTreeMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<Headers> for BTreeMap<String, String> {
    fn from(headers: Headers) -> Self {
        headers.entries
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        headers.extend(iter);
        headers
    }
}

impl<K: AsRef<str>, V: Into<String>> Extend<(K, V)> for Headers {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

// =============================================================================
// Delivery mode
// =============================================================================

/// How the result of a dispatched call is delivered to the observer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryMode {
    /// Parse the body as one JSON value, emit it, then complete.
    #[default]
    Simple,
    /// Emit `{ payload, headers }` once and stay open for polling.
    SimpleWithHeaders,
    /// Decode the body as a continuous sequence of JSON values.
    Stream,
}

impl DeliveryMode {
    /// Whether the observer completes right after the single value.
    #[must_use]
    pub const fn completes_after_value(self) -> bool {
        matches!(self, Self::Simple)
    }

    /// Whether this mode decodes a continuous stream.
    #[must_use]
    pub const fn is_stream(self) -> bool {
        matches!(self, Self::Stream)
    }

    /// The wire name of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::SimpleWithHeaders => "simpleWithHeaders",
            Self::Stream => "stream",
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryMode {
    type Err = RxHttpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(Self::Simple),
            "simpleWithHeaders" => Ok(Self::SimpleWithHeaders),
            "stream" => Ok(Self::Stream),
            other => Err(RxHttpError::invalid_request(format!(
                "unknown delivery mode '{other}'"
            ))),
        }
    }
}

// =============================================================================
// Options
// =============================================================================

/// Per-call request options. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// HTTP method.
    pub method: Option<String>,
    /// Headers to send.
    pub headers: Headers,
    /// Request body.
    pub body: Option<Bytes>,
    /// Credentials mode, passed through to the transport untouched.
    pub credentials: Option<String>,
    /// Referrer, passed through to the transport.
    pub referrer: Option<String>,
    /// Referrer policy, passed through to the transport untouched.
    pub referrer_policy: Option<String>,
}

impl RequestOptions {
    /// Create empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The defaults every request starts from: `Content-Type: application/json`.
    #[must_use]
    pub fn defaults() -> Self {
        Self::new().with_header(CONTENT_TYPE, APPLICATION_JSON)
    }

    /// Set the HTTP method.
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replace all headers.
    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Set a raw body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body.
    pub fn with_json_body<B: Serialize>(mut self, value: &B) -> Result<Self, RxHttpError> {
        let body = serde_json::to_vec(value).map_err(|e| {
            RxHttpError::invalid_request(format!("failed to serialize request body: {e}"))
        })?;
        self.body = Some(Bytes::from(body));
        Ok(self)
    }

    /// Set the credentials mode.
    #[must_use]
    pub fn with_credentials(mut self, credentials: impl Into<String>) -> Self {
        self.credentials = Some(credentials.into());
        self
    }

    /// Set the referrer.
    #[must_use]
    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    /// Set the referrer policy.
    #[must_use]
    pub fn with_referrer_policy(mut self, policy: impl Into<String>) -> Self {
        self.referrer_policy = Some(policy.into());
        self
    }

    /// Layer `self` over `defaults`: any field set here wins, headers are
    /// merged key by key.
    #[must_use]
    pub fn over(&self, defaults: &RequestOptions) -> RequestOptions {
        let mut headers = defaults.headers.clone();
        headers.merge(&self.headers);
        RequestOptions {
            method: self.method.clone().or_else(|| defaults.method.clone()),
            headers,
            body: self.body.clone().or_else(|| defaults.body.clone()),
            credentials: self
                .credentials
                .clone()
                .or_else(|| defaults.credentials.clone()),
            referrer: self.referrer.clone().or_else(|| defaults.referrer.clone()),
            referrer_policy: self
                .referrer_policy
                .clone()
                .or_else(|| defaults.referrer_policy.clone()),
        }
    }
}

// =============================================================================
// Effective request
// =============================================================================

/// The effective request handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestConfig {
    /// Target URL (validated).
    pub url: String,
    /// HTTP method, `GET` unless overridden.
    pub method: String,
    /// Headers after merging defaults and per-call values.
    pub headers: Headers,
    /// Request body.
    pub body: Option<Bytes>,
    /// Credentials mode passthrough.
    pub credentials: Option<String>,
    /// Referrer passthrough.
    pub referrer: Option<String>,
    /// Referrer policy passthrough.
    pub referrer_policy: Option<String>,
}

impl RequestConfig {
    /// Build the effective request from `defaults` and per-call `options`.
    ///
    /// The URL must be absolute. The method defaults to `GET`; the common
    /// methods are normalized to uppercase.
    pub fn resolve(
        url: &str,
        defaults: &RequestOptions,
        options: &RequestOptions,
    ) -> Result<Self, RxHttpError> {
        let parsed = url::Url::parse(url)
            .map_err(|e| RxHttpError::invalid_request(format!("invalid URL '{url}': {e}")))?;

        let merged = options.over(defaults);
        let method = normalize_method(merged.method.as_deref().unwrap_or("GET"))?;

        Ok(Self {
            url: parsed.into(),
            method,
            headers: merged.headers,
            body: merged.body,
            credentials: merged.credentials,
            referrer: merged.referrer,
            referrer_policy: merged.referrer_policy,
        })
    }
}

fn normalize_method(method: &str) -> Result<String, RxHttpError> {
    let trimmed = method.trim();
    if trimmed.is_empty() {
        return Err(RxHttpError::invalid_request("empty HTTP method"));
    }
    let upper = trimmed.to_ascii_uppercase();
    if NORMALIZED_METHODS.contains(&upper.as_str()) {
        Ok(upper)
    } else {
        Ok(trimmed.to_string())
    }
}

// =============================================================================
// Responses
// =============================================================================

/// A payload paired with the response headers it arrived with.
///
/// Emitted by [`DeliveryMode::SimpleWithHeaders`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseWithHeaders<P> {
    /// The decoded body.
    pub payload: P,
    /// Response headers.
    pub headers: Headers,
}
