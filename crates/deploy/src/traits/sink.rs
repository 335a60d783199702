//! Observer for orchestration events.

use alloy_core::primitives::Address;

use super::CallReceipt;
use crate::{component::Component, error::OrchestrationError};

/// Receives structured events from a run. Purely observational: nothing returned here
/// influences the run.
pub trait ReportingSink {
    fn on_component_resolved(&mut self, component: &Component);

    fn on_link_executed(&mut self, component: &str, call: &str, receipt: &CallReceipt);

    fn on_child_resolved(&mut self, _component: &str, _child: &str, _address: Address) {}

    fn on_run_completed(&mut self, _components: &[Component]) {}

    fn on_run_failed(&mut self, error: &OrchestrationError);
}

impl<S: ReportingSink + ?Sized> ReportingSink for &mut S {
    fn on_component_resolved(&mut self, component: &Component) {
        (**self).on_component_resolved(component)
    }

    fn on_link_executed(&mut self, component: &str, call: &str, receipt: &CallReceipt) {
        (**self).on_link_executed(component, call, receipt)
    }

    fn on_child_resolved(&mut self, component: &str, child: &str, address: Address) {
        (**self).on_child_resolved(component, child, address)
    }

    fn on_run_completed(&mut self, components: &[Component]) {
        (**self).on_run_completed(components)
    }

    fn on_run_failed(&mut self, error: &OrchestrationError) {
        (**self).on_run_failed(error)
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ReportingSink for NullSink {
    fn on_component_resolved(&mut self, _component: &Component) {}

    fn on_link_executed(&mut self, _component: &str, _call: &str, _receipt: &CallReceipt) {}

    fn on_run_failed(&mut self, _error: &OrchestrationError) {}
}
