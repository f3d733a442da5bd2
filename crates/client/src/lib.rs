//! Client code for the ghoststock gatekeeper.
//!
//! This crate provides the live network used by the gatekeeper and the
//! gatekeeper itself: lifecycle, request routing and cache population.

pub mod fetch;
pub mod gate;

pub use fetch::{FetchConfig, HttpNetwork};
pub use gate::{
    ActivateReport, EventLifetimes, EventOutcome, FetchOutcome, GateEvent, Gatekeeper, InstallReport, Route, Scope,
    WorkerState,
};
