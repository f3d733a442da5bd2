//! Test fixtures shared by the tool tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use ghoststock_client::Gatekeeper;
use ghoststock_core::{
    Body, CacheStorage, Error, GateConfig, GateResponse, InterceptedRequest, Network, ResponseSource,
};
use rmcp::model::CallToolResult;

/// Network serving fixed bodies by path; unknown paths answer 404.
#[derive(Default)]
pub(crate) struct StaticNetwork {
    pages: HashMap<String, (u16, &'static str, Bytes)>,
    offline: AtomicBool,
}

impl StaticNetwork {
    pub(crate) fn with(mut self, path: &str, status: u16, content_type: &'static str, body: &'static [u8]) -> Self {
        self.pages.insert(path.to_string(), (status, content_type, Bytes::from_static(body)));
        self
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl Network for StaticNetwork {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<GateResponse, Error> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {}", request.url)));
        }
        let (status, content_type, body) = self
            .pages
            .get(request.url.path())
            .cloned()
            .unwrap_or((404, "text/plain", Bytes::new()));
        Ok(GateResponse::new(
            request.url.clone(),
            status,
            vec![("content-type".into(), content_type.into())],
            Body::from_bytes(body),
            ResponseSource::Network,
        ))
    }
}

pub(crate) fn site() -> StaticNetwork {
    StaticNetwork::default()
        .with("/static/css/styles.css", 200, "text/css", b"body{}")
        .with("/static/js/main.js", 200, "application/javascript", b"main()")
        .with("/static/img/logo.png", 200, "image/png", b"\x89PNG\r\n\x1a\n")
        .with("/dashboard", 200, "text/html", b"<html>dashboard</html>")
}

pub(crate) async fn gatekeeper(network: StaticNetwork) -> Gatekeeper<StaticNetwork> {
    let storage = CacheStorage::open_in_memory().await.unwrap();
    Gatekeeper::new(storage, Arc::new(network), &GateConfig::default()).unwrap()
}

/// Decode the JSON text content of a tool result.
pub(crate) fn output<T: serde::de::DeserializeOwned>(result: &CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
