//! The offline cache gatekeeper.
//!
//! Sits between the page and the network. Lifecycle events populate and prune
//! cache generations; fetch events are routed per request:
//!
//! - non-GET requests, and navigations outside the scope, pass through untouched
//! - navigational HTML goes network-first, falling back to any cached copy
//! - everything else goes cache-first, populating the current generation on
//!   a miss without holding up the response

pub mod activate;
pub mod events;
pub mod install;
pub mod lifecycle;
pub mod route;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use activate::ActivateReport;
pub use events::{EventLifetimes, EventOutcome, GateEvent};
pub use install::InstallReport;
pub use lifecycle::WorkerState;
pub use route::{Route, Scope};
pub use worker::{FetchOutcome, Gatekeeper};
