//! Human-facing reporting: structured log events, verification commands and the
//! end-of-run summary table.

use std::collections::BTreeMap;

use alloy_core::primitives::Address;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};

use crate::{
    component::{Component, DeploymentMode},
    error::OrchestrationError,
    manifest::DEFAULT_VERIFY_COMMAND,
    resource::ArgValue,
    traits::{CallReceipt, ReportingSink},
};

/// Sink that logs every event through `tracing` and collects verification commands.
#[derive(Debug, Clone)]
pub struct TracingSink {
    network: String,
    verify_command: String,
    verify_commands: Vec<String>,
}

impl TracingSink {
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            verify_command: DEFAULT_VERIFY_COMMAND.to_string(),
            verify_commands: Vec::new(),
        }
    }

    /// Prefix used for verification commands (network, address and args are appended).
    pub fn with_verify_command(mut self, verify_command: impl Into<String>) -> Self {
        self.verify_command = verify_command.into();
        self
    }

    /// Verification commands for every deployed component and child, in run order.
    pub fn verify_commands(&self) -> &[String] {
        &self.verify_commands
    }
}

impl ReportingSink for TracingSink {
    fn on_component_resolved(&mut self, component: &Component) {
        if component.mode != DeploymentMode::Deployed {
            return;
        }

        let command = verify_command(&self.verify_command, &self.network, component);
        tracing::info!(component = %component.name, command = %command, "Verify with");
        self.verify_commands.push(command);
    }

    fn on_link_executed(&mut self, component: &str, call: &str, receipt: &CallReceipt) {
        tracing::info!(
            component,
            call,
            tx_hash = ?receipt.tx_hash,
            block = ?receipt.block_number,
            "Link call executed"
        );
    }

    fn on_child_resolved(&mut self, component: &str, child: &str, address: Address) {
        tracing::info!(component, child, %address, "Child address recorded");

        let command = verify_line(&self.verify_command, &self.network, address, &[]);
        tracing::info!(component = child, command = %command, "Verify with");
        self.verify_commands.push(command);
    }

    fn on_run_completed(&mut self, components: &[Component]) {
        let deployed = components
            .iter()
            .filter(|c| c.mode == DeploymentMode::Deployed)
            .count();
        tracing::info!(
            network = %self.network,
            deployed,
            attached = components.len() - deployed,
            "Deployment finished"
        );
    }

    fn on_run_failed(&mut self, error: &OrchestrationError) {
        tracing::error!(
            network = %self.network,
            component = error.component().unwrap_or("-"),
            validation = error.is_validation(),
            error = %error.chain(),
            "Deployment failed"
        );
    }
}

/// `<prefix> <network> <address> <args...>`, with text and encoded-call arguments quoted.
pub fn verify_command(prefix: &str, network: &str, component: &Component) -> String {
    verify_line(prefix, network, component.address, &component.args)
}

fn verify_line(prefix: &str, network: &str, address: Address, args: &[ArgValue]) -> String {
    let mut parts = vec![prefix.to_string(), network.to_string(), address.to_string()];
    parts.extend(args.iter().map(|arg| match arg {
        ArgValue::Text(_) | ArgValue::Call(_) => {
            format!("\"{}\"", arg.to_string().replace('"', "\\\""))
        }
        other => other.to_string(),
    }));
    parts.join(" ")
}

/// Table of resolved components followed by child addresses.
pub fn summary_table(components: &[Component], children: &BTreeMap<String, Address>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Component", "Contract", "Mode", "Address"]);

    for component in components {
        table.add_row(vec![
            component.name.clone(),
            component.contract.clone(),
            component.mode.to_string(),
            component.address.to_string(),
        ]);
    }
    for (name, address) in children {
        table.add_row(vec![
            name.clone(),
            String::new(),
            "child".to_string(),
            address.to_string(),
        ]);
    }

    table
}
