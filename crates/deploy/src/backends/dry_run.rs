//! Backend that sends nothing.
//!
//! Deployment addresses are predicted from the sender and a local nonce the same way
//! `CREATE` derives them, so a dry run against a fresh account prints the addresses a
//! real run would produce. Child queries return a stable address derived from the
//! target, the method and its arguments; length getters report a single element.

use std::sync::atomic::{AtomicU64, Ordering};

use alloy_core::primitives::{Address, keccak256};
use anyhow::Result;

use crate::{
    resource::ArgValue,
    traits::{CallReceipt, ChainBackend},
};

/// Sender used when none is configured (the first default anvil/hardhat account).
pub const DEFAULT_DRY_RUN_SENDER: Address =
    alloy_core::primitives::address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

#[derive(Debug)]
pub struct DryRunBackend {
    sender: Address,
    nonce: AtomicU64,
}

impl DryRunBackend {
    pub fn new(sender: Address, starting_nonce: u64) -> Self {
        Self {
            sender,
            nonce: AtomicU64::new(starting_nonce),
        }
    }

    /// Next nonce the simulated sender would use.
    pub fn nonce(&self) -> u64 {
        self.nonce.load(Ordering::SeqCst)
    }

    fn next_nonce(&self) -> u64 {
        self.nonce.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for DryRunBackend {
    fn default() -> Self {
        Self::new(DEFAULT_DRY_RUN_SENDER, 0)
    }
}

impl ChainBackend for DryRunBackend {
    type Handle = Address;

    const BACKEND_NAME: &'static str = "dry-run";

    fn sender(&self) -> Address {
        self.sender
    }

    async fn deploy_new(&self, contract: &str, args: &[ArgValue]) -> Result<Address> {
        let nonce = self.next_nonce();
        let address = self.sender.create(nonce);
        tracing::debug!(contract, nonce, %address, args = args.len(), "Simulated deployment");
        Ok(address)
    }

    async fn attach(&self, _contract: &str, address: Address) -> Result<Address> {
        Ok(address)
    }

    async fn invoke(&self, handle: &Address, method: &str, args: &[ArgValue]) -> Result<CallReceipt> {
        let nonce = self.next_nonce();
        tracing::debug!(target_address = %handle, method, nonce, args = args.len(), "Simulated call");
        Ok(CallReceipt::default())
    }

    async fn query_address(&self, handle: &Address, method: &str, args: &[ArgValue]) -> Result<Address> {
        let mut preimage = handle.to_vec();
        preimage.extend_from_slice(method.as_bytes());
        for arg in args {
            preimage.extend_from_slice(arg.to_string().as_bytes());
        }
        Ok(Address::from_word(keccak256(preimage)))
    }

    async fn query_uint(&self, _handle: &Address, _method: &str, _args: &[ArgValue]) -> Result<u64> {
        Ok(1)
    }
}
