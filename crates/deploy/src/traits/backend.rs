//! Chain interaction trait.

use std::future::Future;

use alloy_core::primitives::{Address, B256};
use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::resource::ArgValue;

/// Outcome of a state-changing call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallReceipt {
    /// Transaction hash, if the backend sent one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<B256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

/// External chain-interaction layer used by the resolver and the orchestrator.
///
/// Every method is a suspension point awaiting the chain. The orchestrator never has
/// two of these futures in flight at once.
///
/// # Type Parameters
/// - `Handle`: a bound contract instance, produced by [`ChainBackend::attach`] and
///   consumed by [`ChainBackend::invoke`] and [`ChainBackend::query_address`].
pub trait ChainBackend: Send + Sync {
    type Handle: Clone + Send + Sync + 'static;

    /// The name of this backend for logging.
    const BACKEND_NAME: &'static str;

    /// Account every transaction is sent from.
    fn sender(&self) -> Address;

    /// Send one deployment transaction for `contract` and return the new address.
    fn deploy_new(
        &self,
        contract: &str,
        args: &[ArgValue],
    ) -> impl Future<Output = Result<Address>> + Send;

    /// Bind to an existing instance without sending a transaction.
    fn attach(
        &self,
        contract: &str,
        address: Address,
    ) -> impl Future<Output = Result<Self::Handle>> + Send;

    /// Send a state-changing call and wait for it to be mined.
    fn invoke(
        &self,
        handle: &Self::Handle,
        method: &str,
        args: &[ArgValue],
    ) -> impl Future<Output = Result<CallReceipt>> + Send;

    /// Read-only call whose first return value is an address.
    fn query_address(
        &self,
        handle: &Self::Handle,
        method: &str,
        args: &[ArgValue],
    ) -> impl Future<Output = Result<Address>> + Send;

    /// Read-only call whose first return value is an unsigned integer (an array length).
    fn query_uint(
        &self,
        handle: &Self::Handle,
        method: &str,
        args: &[ArgValue],
    ) -> impl Future<Output = Result<u64>> + Send;
}
