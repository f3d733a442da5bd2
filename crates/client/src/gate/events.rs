//! Event dispatch and event lifetimes.
//!
//! Lifecycle and fetch events are handled through one entry point. Work that
//! must outlive the event that started it (cache writes after the response
//! has been handed back) is registered with [`EventLifetimes`] so the host can
//! wait for it before shutting down.

use std::future::Future;
use std::sync::Arc;

use ghoststock_core::{Error, InterceptedRequest, Network};
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;

use super::activate::ActivateReport;
use super::install::InstallReport;
use super::worker::{FetchOutcome, Gatekeeper};

/// An event delivered to the gatekeeper by its host.
#[derive(Debug, Clone)]
pub enum GateEvent {
    Install,
    Activate,
    Fetch(InterceptedRequest),
}

/// Result of handling a [`GateEvent`].
#[derive(Debug)]
pub enum EventOutcome {
    Installed(InstallReport),
    Activated(ActivateReport),
    Fetched(FetchOutcome),
}

/// Keeps detached event work alive until it settles.
#[derive(Debug, Clone, Default)]
pub struct EventLifetimes {
    tracker: TaskTracker,
    /// Serializes `settle` so one caller cannot reopen the tracker while
    /// another is still waiting on it.
    settling: Arc<Mutex<()>>,
}

impl EventLifetimes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` to completion independently of the caller.
    pub fn wait_until<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(work);
    }

    /// Number of detached tasks still running.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for every task registered so far. Safe to call concurrently.
    pub async fn settle(&self) {
        let _guard = self.settling.lock().await;
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

impl<N: Network> Gatekeeper<N> {
    /// Handle one event from the host.
    pub async fn dispatch(&self, event: GateEvent) -> Result<EventOutcome, Error> {
        match event {
            GateEvent::Install => self.install().await.map(EventOutcome::Installed),
            GateEvent::Activate => self.activate().await.map(EventOutcome::Activated),
            GateEvent::Fetch(request) => self.handle_fetch(&request).await.map(EventOutcome::Fetched),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::WorkerState;
    use crate::gate::testing::{FakeNetwork, url};
    use ghoststock_core::{CacheStorage, GateConfig};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_settle_waits_for_detached_work() {
        let lifetimes = EventLifetimes::new();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let done = done.clone();
            lifetimes.wait_until(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }

        lifetimes.settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(lifetimes.pending(), 0);

        lifetimes.wait_until(async {});
        lifetimes.settle().await;
        assert_eq!(lifetimes.pending(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_settle_callers_both_return() {
        let lifetimes = EventLifetimes::new();
        for delay in [10, 40] {
            lifetimes.wait_until(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            });
        }

        let first = {
            let lifetimes = lifetimes.clone();
            tokio::spawn(async move { lifetimes.settle().await })
        };
        let second = {
            let lifetimes = lifetimes.clone();
            tokio::spawn(async move { lifetimes.settle().await })
        };

        let both = async {
            first.await.unwrap();
            second.await.unwrap();
        };
        tokio::time::timeout(Duration::from_secs(2), both).await.unwrap();
        assert_eq!(lifetimes.pending(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_lifecycle_then_fetch() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let gate = Gatekeeper::new(storage, Arc::new(FakeNetwork::serving_manifest()), &GateConfig::default()).unwrap();

        let outcome = gate.dispatch(GateEvent::Install).await.unwrap();
        assert!(matches!(outcome, EventOutcome::Installed(ref report) if report.stored.len() == 3));
        assert_eq!(gate.state(), WorkerState::Installed);

        let outcome = gate.dispatch(GateEvent::Activate).await.unwrap();
        assert!(matches!(outcome, EventOutcome::Activated(_)));
        assert_eq!(gate.state(), WorkerState::Active);

        let request = ghoststock_core::InterceptedRequest::get(url("/static/css/styles.css"));
        let outcome = gate.dispatch(GateEvent::Fetch(request)).await.unwrap();
        assert!(matches!(outcome, EventOutcome::Fetched(FetchOutcome::Respond(_))));
    }

    #[tokio::test]
    async fn test_dispatch_activate_before_install_rejected() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let gate = Gatekeeper::new(storage, Arc::new(FakeNetwork::new()), &GateConfig::default()).unwrap();

        let result = gate.dispatch(GateEvent::Activate).await;
        assert!(matches!(result, Err(Error::InvalidState(_))));
        assert_eq!(gate.state(), WorkerState::Uninstalled);
    }

    #[tokio::test]
    async fn test_concurrent_asset_requests_all_cached() {
        let network = FakeNetwork::serving_manifest();
        for i in 0..8 {
            network.respond(&format!("/static/js/module{i}.js"), 200, "export {};");
        }
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let gate = Arc::new(Gatekeeper::new(storage, Arc::new(network), &GateConfig::default()).unwrap());
        gate.register().await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let gate = gate.clone();
            handles.push(tokio::spawn(async move {
                let request = ghoststock_core::InterceptedRequest::get(url(&format!("/static/js/module{i}.js")));
                gate.handle_fetch(&request).await.map(|_| ())
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        gate.settle().await;
        let cache = gate.storage().open_cache("ghoststock-cache-v4").await.unwrap();
        assert_eq!(cache.len().await.unwrap(), 11);
    }
}
