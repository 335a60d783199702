//! [`ChainBackend`] over a node's JSON-RPC endpoint.
//!
//! Transactions are sent with `eth_sendTransaction` from an account the node holds
//! unlocked (anvil, hardhat node, or a signing proxy). Calldata is encoded from the
//! artifact ABI; arguments are coerced from their textual form into the parameter type
//! the ABI declares. Encoded-call arguments become `bytes` using their own artifact's ABI.

use std::{sync::Arc, time::Duration};

use alloy_core::{
    dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier},
    json_abi::{Function, JsonAbi, Param},
    primitives::{Address, B256, Bytes, U64},
};
use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

use super::artifacts::ArtifactStore;
use crate::{
    resource::{ArgValue, EncodedCall},
    rpc,
    traits::{CallReceipt, ChainBackend},
};

/// Interval between `eth_getTransactionReceipt` polls.
pub const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How long a transaction may stay unmined before the step fails.
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

/// A contract bound to an address, with the ABI used to encode calls to it.
#[derive(Debug, Clone)]
pub struct BoundContract {
    pub contract: String,
    pub address: Address,
    abi: Arc<JsonAbi>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionReceipt {
    transaction_hash: B256,
    #[serde(default)]
    block_number: Option<U64>,
    #[serde(default)]
    status: Option<U64>,
    #[serde(default)]
    contract_address: Option<Address>,
}

impl TransactionReceipt {
    fn call_receipt(&self) -> CallReceipt {
        CallReceipt {
            tx_hash: Some(self.transaction_hash),
            block_number: self.block_number.map(|n| n.saturating_to::<u64>()),
        }
    }
}

/// Backend that talks to a live node.
#[derive(Debug, Clone)]
pub struct RpcBackend {
    client: reqwest::Client,
    url: Url,
    from: Address,
    artifacts: ArtifactStore,
    receipt_poll_interval: Duration,
    receipt_timeout: Duration,
}

impl RpcBackend {
    /// Connect to `url`. Without an explicit sender the node's first account is used.
    pub async fn connect(url: Url, from: Option<Address>, artifacts: ArtifactStore) -> Result<Self> {
        let client = rpc::create_client()?;

        let chain_id: U64 = rpc::json_rpc_call(&client, url.as_str(), "eth_chainId", vec![])
            .await
            .with_context(|| format!("Failed to reach node at {}", url))?;

        let from = match from {
            Some(from) => from,
            None => {
                let accounts: Vec<Address> =
                    rpc::json_rpc_call(&client, url.as_str(), "eth_accounts", vec![])
                        .await
                        .context("Failed to list node accounts")?;
                accounts
                    .first()
                    .copied()
                    .context("Node exposes no unlocked accounts; set `from` for this network")?
            }
        };

        tracing::info!(
            url = %url,
            chain_id = chain_id.saturating_to::<u64>(),
            from = %from,
            artifacts = artifacts.len(),
            "Connected to node"
        );

        Ok(Self {
            client,
            url,
            from,
            artifacts,
            receipt_poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        })
    }

    /// Override receipt polling.
    pub fn with_receipt_timing(mut self, interval: Duration, timeout: Duration) -> Self {
        self.receipt_poll_interval = interval;
        self.receipt_timeout = timeout;
        self
    }

    async fn send_transaction(&self, to: Option<Address>, data: Bytes) -> Result<TransactionReceipt> {
        let mut tx = serde_json::json!({
            "from": self.from,
            "data": data,
        });
        if let Some(to) = to {
            tx["to"] = serde_json::json!(to);
        }

        let tx_hash: B256 =
            rpc::json_rpc_call(&self.client, self.url.as_str(), "eth_sendTransaction", vec![tx])
                .await
                .context("Failed to send transaction")?;

        tracing::debug!(tx_hash = %tx_hash, "Transaction sent");

        let receipt = rpc::poll_until_some(
            "transaction receipt",
            self.receipt_poll_interval,
            self.receipt_timeout,
            || self.receipt(tx_hash),
        )
        .await?;

        if receipt.status == Some(U64::ZERO) {
            anyhow::bail!("Transaction {} reverted", tx_hash);
        }

        Ok(receipt)
    }

    /// `eth_call` against the latest block, decoded with the function's outputs.
    async fn call_view(
        &self,
        handle: &BoundContract,
        method: &str,
        args: &[ArgValue],
    ) -> Result<Vec<DynSolValue>> {
        let function = select_function(&handle.abi, &handle.contract, method, args.len())?;
        let values = coerce_args(&function.inputs, args, &self.artifacts)?;
        let calldata: Bytes = function.abi_encode_input(&values)?.into();

        let output: Bytes = rpc::json_rpc_call(
            &self.client,
            self.url.as_str(),
            "eth_call",
            vec![
                serde_json::json!({
                    "from": self.from,
                    "to": handle.address,
                    "data": calldata,
                }),
                serde_json::json!("latest"),
            ],
        )
        .await?;

        function
            .abi_decode_output(&output, true)
            .with_context(|| format!("Failed to decode {}.{} output", handle.contract, method))
    }

    async fn receipt(&self, tx_hash: B256) -> Result<Option<TransactionReceipt>> {
        rpc::json_rpc_call(
            &self.client,
            self.url.as_str(),
            "eth_getTransactionReceipt",
            vec![serde_json::json!(tx_hash)],
        )
        .await
    }
}

impl ChainBackend for RpcBackend {
    type Handle = BoundContract;

    const BACKEND_NAME: &'static str = "rpc";

    fn sender(&self) -> Address {
        self.from
    }

    async fn deploy_new(&self, contract: &str, args: &[ArgValue]) -> Result<Address> {
        let artifact = self.artifacts.load(contract)?;
        if artifact.bytecode.is_empty() {
            anyhow::bail!("Artifact '{}' has no creation bytecode (abstract or interface?)", contract);
        }

        let encoded_args = match artifact.abi.constructor() {
            Some(constructor) => {
                let values = coerce_args(&constructor.inputs, args, &self.artifacts)
                    .with_context(|| format!("Invalid constructor arguments for {}", contract))?;
                constructor
                    .abi_encode_input(&values)
                    .with_context(|| format!("Failed to encode constructor of {}", contract))?
            }
            None if args.is_empty() => Vec::new(),
            None => anyhow::bail!(
                "{} has no constructor but {} arguments were given",
                contract,
                args.len()
            ),
        };

        let mut data = artifact.bytecode.to_vec();
        data.extend_from_slice(&encoded_args);

        let receipt = self.send_transaction(None, data.into()).await?;
        receipt
            .contract_address
            .with_context(|| format!("Receipt {} has no contract address", receipt.transaction_hash))
    }

    async fn attach(&self, contract: &str, address: Address) -> Result<BoundContract> {
        let code: Bytes = rpc::json_rpc_call(
            &self.client,
            self.url.as_str(),
            "eth_getCode",
            vec![serde_json::json!(address), serde_json::json!("latest")],
        )
        .await?;
        if code.is_empty() {
            anyhow::bail!("No contract code at {}", address);
        }

        let artifact = self.artifacts.load(contract)?;
        Ok(BoundContract {
            contract: contract.to_string(),
            address,
            abi: artifact.abi,
        })
    }

    async fn invoke(&self, handle: &BoundContract, method: &str, args: &[ArgValue]) -> Result<CallReceipt> {
        let function = select_function(&handle.abi, &handle.contract, method, args.len())?;
        let values = coerce_args(&function.inputs, args, &self.artifacts)?;
        let calldata = function
            .abi_encode_input(&values)
            .with_context(|| format!("Failed to encode {}.{}", handle.contract, method))?;

        let receipt = self
            .send_transaction(Some(handle.address), calldata.into())
            .await?;
        Ok(receipt.call_receipt())
    }

    async fn query_address(
        &self,
        handle: &BoundContract,
        method: &str,
        args: &[ArgValue],
    ) -> Result<Address> {
        self.call_view(handle, method, args)
            .await?
            .first()
            .and_then(DynSolValue::as_address)
            .with_context(|| format!("{}.{} did not return an address", handle.contract, method))
    }

    async fn query_uint(&self, handle: &BoundContract, method: &str, args: &[ArgValue]) -> Result<u64> {
        self.call_view(handle, method, args)
            .await?
            .first()
            .and_then(DynSolValue::as_uint)
            .map(|(value, _)| value.saturating_to::<u64>())
            .with_context(|| format!("{}.{} did not return an integer", handle.contract, method))
    }
}

/// Pick the overload of `method` taking `arity` arguments.
fn select_function<'a>(
    abi: &'a JsonAbi,
    contract: &str,
    method: &str,
    arity: usize,
) -> Result<&'a Function> {
    let overloads = abi
        .function(method)
        .with_context(|| format!("{} has no function '{}'", contract, method))?;

    overloads
        .iter()
        .find(|f| f.inputs.len() == arity)
        .with_context(|| {
            format!(
                "{}.{} has no overload taking {} arguments",
                contract, method, arity
            )
        })
}

/// Coerce argument values into the ABI types of `params`.
fn coerce_args(params: &[Param], args: &[ArgValue], artifacts: &ArtifactStore) -> Result<Vec<DynSolValue>> {
    if params.len() != args.len() {
        anyhow::bail!("Expected {} arguments, got {}", params.len(), args.len());
    }

    params
        .iter()
        .zip(args)
        .map(|(param, arg)| coerce_arg(param, arg, artifacts))
        .collect()
}

fn coerce_arg(param: &Param, arg: &ArgValue, artifacts: &ArtifactStore) -> Result<DynSolValue> {
    let ty = param
        .resolve()
        .with_context(|| format!("Unsupported parameter type {}", param.ty))?;

    match arg {
        ArgValue::Call(call) => {
            if ty != DynSolType::Bytes {
                anyhow::bail!("Cannot pass encoded call {} as {} ({})", call, param.ty, param.name);
            }
            Ok(DynSolValue::Bytes(encode_call(call, artifacts)?.to_vec()))
        }
        _ => ty
            .coerce_str(&arg.to_string())
            .with_context(|| format!("Cannot pass {} as {} ({})", arg, param.ty, param.name)),
    }
}

/// Selector and arguments of `call`, encoded with its contract's ABI.
fn encode_call(call: &EncodedCall, artifacts: &ArtifactStore) -> Result<Bytes> {
    let artifact = artifacts.load(&call.contract)?;
    let function = select_function(&artifact.abi, &call.contract, &call.method, call.args.len())?;
    let values = coerce_args(&function.inputs, &call.args, artifacts)?;
    let data = function
        .abi_encode_input(&values)
        .with_context(|| format!("Failed to encode {}", call))?;
    Ok(data.into())
}
