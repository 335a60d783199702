//! Seams between the orchestration core and its collaborators.
//!
//! The core never talks to a chain or a terminal directly. Deployments, attachments,
//! link calls and read-only queries go through a [`ChainBackend`]; every observable
//! event is pushed to a [`ReportingSink`].

mod backend;
mod sink;

pub use backend::{CallReceipt, ChainBackend};
pub use sink::{NullSink, ReportingSink};
