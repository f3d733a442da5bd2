//! The gatekeeper: one worker version bound to one cache generation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ghoststock_core::{
    CacheStorage, CachedResponse, Error, GateConfig, GateResponse, InterceptedRequest, Network,
};
use tokio::sync::watch;

use super::activate::{self, ActivateReport};
use super::events::EventLifetimes;
use super::install::{self, InstallReport};
use super::lifecycle::WorkerState;
use super::route::{self, Route, Scope};
use crate::fetch::resolve;

/// Result of routing one fetch event.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Not intercepted: the host performs the request as it normally would.
    Passthrough,
    /// The gatekeeper's response, from the network or the cache.
    Respond(GateResponse),
}

/// Offline cache gatekeeper.
///
/// Holds no per-request state: everything that outlives an event lives in the
/// cache storage. Cache writes on the cache-first path are detached from the
/// response and tracked by [`EventLifetimes`].
pub struct Gatekeeper<N: Network> {
    storage: CacheStorage,
    network: Arc<N>,
    cache_name: String,
    manifest: Vec<InterceptedRequest>,
    scope: Scope,
    skip_waiting: bool,
    claim_clients: bool,
    state: watch::Sender<WorkerState>,
    /// Set once the first activation completes. Later lifecycle steps do not
    /// clear it, so pages stay served while a re-install runs.
    activated: AtomicBool,
    controlling: AtomicBool,
    lifetimes: EventLifetimes,
}

impl<N: Network> Gatekeeper<N> {
    /// Build a gatekeeper from configuration.
    ///
    /// Manifest paths are resolved against the configured origin.
    pub fn new(storage: CacheStorage, network: Arc<N>, config: &GateConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let manifest = config
            .precache
            .iter()
            .map(|path| {
                resolve(&origin, path)
                    .map(InterceptedRequest::get)
                    .map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let (state, _) = watch::channel(WorkerState::Uninstalled);

        Ok(Self {
            storage,
            network,
            cache_name: config.cache_name.clone(),
            manifest,
            scope: Scope::new(origin, config.scope.clone()),
            skip_waiting: config.skip_waiting,
            claim_clients: config.claim_clients,
            state,
            activated: AtomicBool::new(false),
            controlling: AtomicBool::new(false),
            lifetimes: EventLifetimes::new(),
        })
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn manifest(&self) -> &[InterceptedRequest] {
        &self.manifest
    }

    pub fn lifetimes(&self) -> &EventLifetimes {
        &self.lifetimes
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Receiver notified on every lifecycle transition.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Whether fetch events are currently intercepted.
    ///
    /// Stays true through a re-install or re-activation of an active worker.
    pub fn is_controlling(&self) -> bool {
        self.activated.load(Ordering::SeqCst) && self.controlling.load(Ordering::SeqCst)
    }

    /// Move `from -> to` if `guard(from)` holds, returning the prior state.
    fn transition(&self, guard: impl FnOnce(WorkerState) -> bool, to: WorkerState) -> Option<WorkerState> {
        let mut prior = None;
        self.state.send_if_modified(|state| {
            if guard(*state) {
                prior = Some(*state);
                *state = to;
                true
            } else {
                false
            }
        });
        prior
    }

    /// Populate the current generation from the manifest.
    ///
    /// On failure the worker ends in `InstallFailed`, unless it was already
    /// active, in which case it stays active on its existing generation.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let prior = self
            .transition(WorkerState::can_install, WorkerState::Installing)
            .ok_or_else(|| Error::InvalidState(format!("cannot install while {}", self.state())))?;

        tracing::info!(cache_name = %self.cache_name, assets = self.manifest.len(), "installing");
        let result = install::precache(&self.storage, self.network.as_ref(), &self.cache_name, &self.manifest).await;

        let next = prior.after_install(result.is_ok());
        self.state.send_replace(next);

        match &result {
            Ok(report) => tracing::info!(cache_name = %report.cache_name, stored = report.stored.len(), "installed"),
            Err(e) => tracing::warn!(cache_name = %self.cache_name, error = %e, state = %next, "install failed"),
        }
        result
    }

    /// Make this version active and delete every other generation.
    ///
    /// Cleanup failures are logged and reported; the worker activates anyway.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.transition(WorkerState::can_activate, WorkerState::Activating)
            .ok_or_else(|| Error::InvalidState(format!("cannot activate while {}", self.state())))?;

        tracing::info!(cache_name = %self.cache_name, "activating");
        let (deleted, failed) = match activate::prune_generations(&self.storage, &self.cache_name).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, "could not enumerate cache generations");
                (Vec::new(), Vec::new())
            }
        };

        self.state.send_replace(WorkerState::Active);
        self.activated.store(true, Ordering::SeqCst);
        if self.claim_clients {
            self.claim();
        }

        tracing::info!(cache_name = %self.cache_name, deleted = deleted.len(), "active");
        Ok(ActivateReport { cache_name: self.cache_name.clone(), deleted, failed, claimed: self.is_controlling() })
    }

    /// Install, then activate immediately when `skip_waiting` is set.
    ///
    /// Returns `None` for activation when the worker is left waiting.
    pub async fn register(&self) -> Result<(InstallReport, Option<ActivateReport>), Error> {
        let installed = self.install().await?;
        let activated = if self.skip_waiting { Some(self.activate().await?) } else { None };
        Ok((installed, activated))
    }

    /// Start controlling open pages without waiting for them to reload.
    pub fn claim(&self) {
        if self.activated.load(Ordering::SeqCst) && !self.controlling.swap(true, Ordering::SeqCst) {
            tracing::debug!(cache_name = %self.cache_name, "claimed clients");
        }
    }

    /// Route one intercepted request.
    ///
    /// `Err` means neither the network nor the cache could answer; the host
    /// reports it to the page as a failed request.
    pub async fn handle_fetch(&self, request: &InterceptedRequest) -> Result<FetchOutcome, Error> {
        let route = if self.is_controlling() { route::classify(request, &self.scope) } else { Route::Passthrough };
        tracing::debug!(method = %request.method, url = %request.url, route = ?route, "fetch event");

        match route {
            Route::Passthrough => Ok(FetchOutcome::Passthrough),
            Route::NetworkFirst => self.network_first(request).await.map(FetchOutcome::Respond),
            Route::CacheFirst => self.cache_first(request).await.map(FetchOutcome::Respond),
        }
    }

    /// Route a request and perform passthroughs on the network, the way a
    /// host without its own network stack would.
    pub async fn respond(&self, request: &InterceptedRequest) -> Result<(GateResponse, bool), Error> {
        match self.handle_fetch(request).await? {
            FetchOutcome::Respond(response) => Ok((response, true)),
            FetchOutcome::Passthrough => Ok((self.network.fetch(request).await?, false)),
        }
    }

    async fn network_first(&self, request: &InterceptedRequest) -> Result<GateResponse, Error> {
        match self.network.fetch(request).await {
            Ok(response) => Ok(response),
            Err(network_err) => {
                tracing::debug!(url = %request.url, error = %network_err, "network failed, trying cache");
                self.lookup(request)
                    .await
                    .ok_or_else(|| Error::Offline(format!("{}: {}", request.url, network_err)))
            }
        }
    }

    async fn cache_first(&self, request: &InterceptedRequest) -> Result<GateResponse, Error> {
        if let Some(cached) = self.lookup(request).await {
            tracing::debug!(url = %request.url, "cache hit");
            return Ok(cached);
        }

        let response = self
            .network
            .fetch(request)
            .await
            .map_err(|e| Error::Offline(format!("{}: {}", request.url, e)))?;

        if response.status == 206 {
            return Ok(response);
        }

        let (for_page, for_cache) = response.duplicate().await?;
        let storage = self.storage.clone();
        let cache_name = self.cache_name.clone();
        let request = request.clone();
        self.lifetimes.wait_until(async move {
            if let Err(e) = populate(&storage, &cache_name, &request, for_cache).await {
                tracing::warn!(url = %request.url, error = %e, "cache write failed");
            }
        });

        Ok(for_page)
    }

    /// Any stored response for this request. Storage failures count as a miss.
    async fn lookup(&self, request: &InterceptedRequest) -> Option<GateResponse> {
        let cached = match self.storage.match_request(request).await {
            Ok(cached) => cached?,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache read failed");
                return None;
            }
        };
        match cached.into_response() {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "discarding unreadable cache entry");
                None
            }
        }
    }

    /// Wait for every detached cache write to finish.
    pub async fn settle(&self) {
        self.lifetimes.settle().await;
    }
}

async fn populate(
    storage: &CacheStorage, cache_name: &str, request: &InterceptedRequest, response: GateResponse,
) -> Result<(), Error> {
    let cached = CachedResponse::from_response(response).await?;
    storage.open_cache(cache_name).await?.put(request, &cached).await?;
    tracing::debug!(url = %request.url, cache_name, "cached response");
    Ok(())
}
