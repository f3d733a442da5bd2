//! Intercepted requests and the responses produced for them.
//!
//! A response body is a single-consumption stream. Anything that needs to
//! both hand a response to the page and keep a copy for the cache has to
//! go through [`GateResponse::duplicate`], which buffers the stream once and
//! yields two independent bodies.

use std::fmt;
use std::pin::Pin;
use std::str::FromStr;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// Accept value a browser sends for a top-level page load.
pub const NAVIGATION_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Purpose of an intercepted request, as declared by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level page navigation.
    Navigate,
    SameOrigin,
    #[default]
    NoCors,
    Cors,
}

impl RequestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMode::Navigate => "navigate",
            RequestMode::SameOrigin => "same-origin",
            RequestMode::NoCors => "no-cors",
            RequestMode::Cors => "cors",
        }
    }
}

impl FromStr for RequestMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "navigate" => Ok(RequestMode::Navigate),
            "same-origin" => Ok(RequestMode::SameOrigin),
            "no-cors" => Ok(RequestMode::NoCors),
            "cors" => Ok(RequestMode::Cors),
            other => Err(Error::InvalidInput(format!("unknown request mode: {other}"))),
        }
    }
}

/// One outgoing page request awaiting a routing decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedRequest {
    /// Upper-cased HTTP method.
    pub method: String,
    pub url: Url,
    /// Value of the `Accept` header, if the page sent one.
    pub accept: Option<String>,
    pub mode: RequestMode,
}

impl InterceptedRequest {
    /// A plain sub-resource GET with no declared content preference.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url, accept: None, mode: RequestMode::NoCors }
    }

    /// A top-level page load, carrying the accept header a browser would send.
    pub fn navigate(url: Url) -> Self {
        Self { method: "GET".into(), url, accept: Some(NAVIGATION_ACCEPT.into()), mode: RequestMode::Navigate }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.trim().to_ascii_uppercase();
        self
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// True when the page asked for HTML or is loading a whole page.
    pub fn is_navigational(&self) -> bool {
        let wants_html = self.accept.as_deref().is_some_and(|accept| accept.contains("text/html"));
        wants_html || self.mode == RequestMode::Navigate
    }

    /// Request header lookup. Only `accept` is exposed by the interception layer.
    pub fn header(&self, name: &str) -> Option<&str> {
        if name.eq_ignore_ascii_case("accept") { self.accept.as_deref() } else { None }
    }
}

/// Where a response handed to the page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
}

type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, Error>> + Send>>;

enum BodyInner {
    Full(Bytes),
    Stream(BodyStream),
}

/// A response body that can be read exactly once.
pub struct Body(BodyInner);

impl Body {
    pub fn empty() -> Self {
        Body(BodyInner::Full(Bytes::new()))
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Body(BodyInner::Full(bytes.into()))
    }

    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, Error>> + Send + 'static,
    {
        Body(BodyInner::Stream(Box::pin(stream)))
    }

    /// Consume the body, reading it to the end.
    pub async fn bytes(self) -> Result<Bytes, Error> {
        match self.0 {
            BodyInner::Full(bytes) => Ok(bytes),
            BodyInner::Stream(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
        }
    }

    /// Read the body once and produce two independently consumable copies.
    ///
    /// Both copies share the one buffer the stream was read into.
    pub async fn tee(self) -> Result<(Body, Body), Error> {
        let buffered = self.bytes().await?;
        Ok((Body::from_bytes(buffered.clone()), Body::from_bytes(buffered)))
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            BodyInner::Full(bytes) => f.debug_tuple("Body::Full").field(&bytes.len()).finish(),
            BodyInner::Stream(_) => f.write_str("Body::Stream"),
        }
    }
}

/// A response about to be handed to the page.
#[derive(Debug)]
pub struct GateResponse {
    /// URL the response was produced for.
    pub url: Url,
    pub status: u16,
    /// Header pairs with lower-cased names, in arrival order.
    pub headers: Vec<(String, String)>,
    pub body: Body,
    pub source: ResponseSource,
}

impl GateResponse {
    pub fn new(url: Url, status: u16, headers: Vec<(String, String)>, body: Body, source: ResponseSource) -> Self {
        let headers = headers.into_iter().map(|(k, v)| (k.to_ascii_lowercase(), v)).collect();
        Self { url, status, headers, body, source }
    }

    /// First value of the named header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// 2xx status.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Split into two responses with identical metadata and independent bodies.
    pub async fn duplicate(self) -> Result<(GateResponse, GateResponse), Error> {
        let (first, second) = self.body.tee().await?;
        let copy = GateResponse {
            url: self.url.clone(),
            status: self.status,
            headers: self.headers.clone(),
            body: second,
            source: self.source,
        };
        let original = GateResponse {
            url: self.url,
            status: self.status,
            headers: self.headers,
            body: first,
            source: self.source,
        };
        Ok((original, copy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_navigational_by_accept() {
        let req = InterceptedRequest::get(url("https://example.com/dashboard")).with_accept("text/html");
        assert!(req.is_navigational());
    }

    #[test]
    fn test_navigational_by_mode() {
        let req = InterceptedRequest::get(url("https://example.com/")).with_mode(RequestMode::Navigate);
        assert!(req.is_navigational());
        assert!(InterceptedRequest::navigate(url("https://example.com/")).is_navigational());
    }

    #[test]
    fn test_asset_not_navigational() {
        let req = InterceptedRequest::get(url("https://example.com/static/js/main.js")).with_accept("*/*");
        assert!(!req.is_navigational());
        assert!(!InterceptedRequest::get(url("https://example.com/static/img/logo.png")).is_navigational());
    }

    #[test]
    fn test_method_normalized() {
        let req = InterceptedRequest::get(url("https://example.com/api/items")).with_method("post");
        assert_eq!(req.method, "POST");
        assert!(!req.is_get());
    }

    #[test]
    fn test_request_mode_parse() {
        assert_eq!("navigate".parse::<RequestMode>().unwrap(), RequestMode::Navigate);
        assert_eq!("Same-Origin".parse::<RequestMode>().unwrap(), RequestMode::SameOrigin);
        assert!("websocket".parse::<RequestMode>().is_err());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let response = GateResponse::new(
            url("https://example.com/"),
            200,
            vec![("Content-Type".into(), "text/css".into())],
            Body::empty(),
            ResponseSource::Network,
        );
        assert_eq!(response.content_type(), Some("text/css"));
        assert_eq!(response.header("CONTENT-TYPE"), Some("text/css"));
        assert!(response.is_ok());
    }

    #[tokio::test]
    async fn test_streamed_body_reads_all_chunks() {
        let chunks = vec![Ok(Bytes::from_static(b"body {")), Ok(Bytes::from_static(b" color: red }"))];
        let body = Body::from_stream(stream::iter(chunks));
        assert_eq!(body.bytes().await.unwrap(), Bytes::from_static(b"body { color: red }"));
    }

    #[tokio::test]
    async fn test_duplicate_yields_independent_bodies() {
        let chunks = vec![Ok(Bytes::from_static(b"console.")), Ok(Bytes::from_static(b"log(1)"))];
        let response = GateResponse::new(
            url("https://example.com/static/js/main.js"),
            200,
            vec![("content-type".into(), "application/javascript".into())],
            Body::from_stream(stream::iter(chunks)),
            ResponseSource::Network,
        );

        let (caller, cached) = response.duplicate().await.unwrap();
        assert_eq!(caller.status, cached.status);
        assert_eq!(caller.headers, cached.headers);
        assert_eq!(cached.body.bytes().await.unwrap(), Bytes::from_static(b"console.log(1)"));
        assert_eq!(caller.body.bytes().await.unwrap(), Bytes::from_static(b"console.log(1)"));
    }

    #[tokio::test]
    async fn test_tee_shares_one_buffer() {
        let chunks = vec![Ok(Bytes::from_static(b"\x89PNG")), Ok(Bytes::from_static(b"\r\n\x1a\n"))];
        let (first, second) = Body::from_stream(stream::iter(chunks)).tee().await.unwrap();

        let first = first.bytes().await.unwrap();
        let second = second.bytes().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_ptr(), second.as_ptr());
    }

    #[tokio::test]
    async fn test_duplicate_propagates_stream_error() {
        let chunks = vec![Ok(Bytes::from_static(b"partial")), Err(Error::Network("connection reset".into()))];
        let response = GateResponse::new(
            url("https://example.com/static/css/styles.css"),
            200,
            Vec::new(),
            Body::from_stream(stream::iter(chunks)),
            ResponseSource::Network,
        );
        assert!(matches!(response.duplicate().await, Err(Error::Network(_))));
    }
}
