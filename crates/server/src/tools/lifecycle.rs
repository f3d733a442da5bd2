//! Lifecycle tools: gate_install, gate_activate and gate_status.

use ghoststock_client::{ActivateReport, EventOutcome, GateEvent, Gatekeeper, InstallReport};
use ghoststock_core::{Network, cache::GenerationInfo};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the gate_install tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct GateInstallParams {
    /// Activate right after a successful install (default: true).
    #[serde(default = "default_true")]
    pub activate: bool,
}

fn default_true() -> bool {
    true
}

/// Parameters for the gate_activate tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct GateActivateParams {}

/// Parameters for the gate_status tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct GateStatusParams {}

/// Output from the gate_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GateInstallOutput {
    pub cache_name: String,
    pub stored: Vec<String>,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation: Option<GateActivateOutput>,
}

/// Output from the gate_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GateActivateOutput {
    pub cache_name: String,
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
    pub claimed: bool,
}

impl From<ActivateReport> for GateActivateOutput {
    fn from(report: ActivateReport) -> Self {
        Self { cache_name: report.cache_name, deleted: report.deleted, failed: report.failed, claimed: report.claimed }
    }
}

/// Output from the gate_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GateStatusOutput {
    pub state: String,
    pub controlling: bool,
    pub cache_name: String,
    pub origin: String,
    pub manifest: Vec<String>,
    pub generations: Vec<GenerationInfo>,
    pub pending_writes: usize,
}

/// Implementation of the gate_install tool.
pub async fn install_impl<N: Network>(
    gate: &Gatekeeper<N>, params: GateInstallParams,
) -> Result<CallToolResult, McpError> {
    let InstallReport { cache_name, stored } = match gate.dispatch(GateEvent::Install).await? {
        EventOutcome::Installed(report) => report,
        other => return Err(unexpected(other)),
    };
    let activation = if params.activate { Some(activate(gate).await?) } else { None };

    json_result(&GateInstallOutput { cache_name, stored, state: gate.state().to_string(), activation })
}

/// Implementation of the gate_activate tool.
pub async fn activate_impl<N: Network>(
    gate: &Gatekeeper<N>, _params: GateActivateParams,
) -> Result<CallToolResult, McpError> {
    json_result(&activate(gate).await?)
}

async fn activate<N: Network>(gate: &Gatekeeper<N>) -> Result<GateActivateOutput, McpError> {
    match gate.dispatch(GateEvent::Activate).await? {
        EventOutcome::Activated(report) => Ok(report.into()),
        other => Err(unexpected(other)),
    }
}

fn unexpected(outcome: EventOutcome) -> McpError {
    ToolError::Output(format!("unexpected event outcome: {outcome:?}")).into()
}

/// Implementation of the gate_status tool.
pub async fn status_impl<N: Network>(
    gate: &Gatekeeper<N>, _params: GateStatusParams,
) -> Result<CallToolResult, McpError> {
    let generations = gate.storage().generations().await?;

    json_result(&GateStatusOutput {
        state: gate.state().to_string(),
        controlling: gate.is_controlling(),
        cache_name: gate.cache_name().to_string(),
        origin: gate.scope().origin().to_string(),
        manifest: gate.manifest().iter().map(|r| r.url.to_string()).collect(),
        generations,
        pending_writes: gate.lifetimes().pending(),
    })
}
