//! Scripted network for gatekeeper tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ghoststock_core::{
    Body, Error, GateResponse, InterceptedRequest, Network, PRECACHE_ASSETS, ResponseSource,
};
use url::Url;

pub(crate) const ORIGIN: &str = "http://127.0.0.1:5000";

pub(crate) fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub(crate) fn manifest() -> Vec<InterceptedRequest> {
    PRECACHE_ASSETS.iter().map(|path| InterceptedRequest::get(url(path))).collect()
}

#[derive(Clone)]
enum Scripted {
    Respond { status: u16, headers: Vec<(String, String)>, body: Vec<u8> },
    Fail,
}

/// In-memory network keyed by path. Unknown paths answer 404.
#[derive(Default)]
pub(crate) struct FakeNetwork {
    routes: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<(String, String)>>,
    offline: AtomicBool,
    delay_ms: AtomicU64,
}

impl FakeNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn serving_manifest() -> Self {
        let network = Self::new();
        network.respond("/static/css/styles.css", 200, "body { background: #111; }");
        network.respond("/static/js/main.js", 200, "console.log('ghoststock');");
        network.respond("/static/img/logo.png", 200, "\u{89}PNG");
        network
    }

    pub(crate) fn respond(&self, path: &str, status: u16, body: &str) {
        self.respond_with_headers(path, status, Vec::new(), body);
    }

    pub(crate) fn respond_with_headers(&self, path: &str, status: u16, headers: Vec<(&str, &str)>, body: &str) {
        let headers = headers.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        self.routes.lock().unwrap().insert(
            path.to_string(),
            Scripted::Respond { status, headers, body: body.as_bytes().to_vec() },
        );
    }

    pub(crate) fn fail(&self, path: &str) {
        self.routes.lock().unwrap().insert(path.to_string(), Scripted::Fail);
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Latency added to every request from now on.
    pub(crate) fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Total requests seen, including failed ones.
    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(_, p)| p == path).count()
    }

    pub(crate) fn methods_to(&self, path: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, p)| p == path)
            .map(|(m, _)| m.clone())
            .collect()
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<GateResponse, Error> {
        let path = request.url.path().to_string();
        self.calls.lock().unwrap().push((request.method.clone(), path.clone()));

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {}", request.url)));
        }

        let scripted = self.routes.lock().unwrap().get(&path).cloned();
        match scripted {
            Some(Scripted::Respond { status, headers, body }) => Ok(GateResponse::new(
                request.url.clone(),
                status,
                headers,
                Body::from_bytes(body),
                ResponseSource::Network,
            )),
            Some(Scripted::Fail) => Err(Error::Network(format!("connection reset: {}", request.url))),
            None => Ok(GateResponse::new(request.url.clone(), 404, Vec::new(), Body::empty(), ResponseSource::Network)),
        }
    }
}
