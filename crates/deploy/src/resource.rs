//! Declarative description of deployable components.
//!
//! A [`ResourceSpec`] names one component, the arguments its constructor takes and the
//! link calls to run once it is resolved. Arguments are [`ArgDescriptor`]s: either a
//! literal value, a reference to another component's address, or a named per-network
//! parameter that the manifest substitutes before the plan is handed to the orchestrator.

use std::fmt;

use alloy_core::primitives::Address;
use derive_more::{Deref, From};
use serde::{Deserialize, Serialize};

/// A concrete argument value, either written in the manifest or produced by resolving
/// a reference.
///
/// Integers that do not fit an `i64` (token supplies in wei, for example) are written as
/// decimal strings and coerced to the parameter type when the call is encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Bool(bool),
    Number(i64),
    Address(Address),
    Call(EncodedCall),
    Text(String),
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Bool(b) => write!(f, "{b}"),
            ArgValue::Number(n) => write!(f, "{n}"),
            ArgValue::Address(a) => write!(f, "{a}"),
            ArgValue::Call(call) => write!(f, "{call}"),
            ArgValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<Address> for ArgValue {
    fn from(value: Address) -> Self {
        Self::Address(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<EncodedCall> for ArgValue {
    fn from(value: EncodedCall) -> Self {
        Self::Call(value)
    }
}

/// A function call passed as `bytes`, e.g. the initializer handed to a proxy
/// constructor. The backend encodes it with `contract`'s ABI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncodedCall {
    pub contract: String,
    pub method: String,
    #[serde(default)]
    pub args: Vec<ArgValue>,
}

impl fmt::Display for EncodedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = self
            .args
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}.{}({})", self.contract, self.method, args)
    }
}

/// Which attribute of a referenced component is passed. Only the address exists today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentField {
    #[default]
    Address,
}

/// Values supplied by the run itself rather than the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RunContext {
    /// The account the backend sends transactions from.
    Sender,
}

/// One constructor or call argument.
///
/// In TOML a reference is written `{ ref = "Config" }`, a parameter `{ param = "maxPayout" }`,
/// the sending account `{ context = "sender" }` and an encoded call
/// `{ encode = "initialize", contract = "StakingPoolFactory", args = [...] }`. Anything
/// else is a literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgDescriptor {
    Reference {
        #[serde(rename = "ref")]
        component: String,
        #[serde(default)]
        field: ComponentField,
    },
    Param {
        param: String,
    },
    Context {
        context: RunContext,
    },
    Encoded {
        #[serde(rename = "encode")]
        method: String,
        contract: String,
        #[serde(default)]
        args: Vec<ArgDescriptor>,
    },
    Literal(ArgValue),
}

impl ArgDescriptor {
    /// Reference to another component's address.
    pub fn reference(component: impl Into<String>) -> Self {
        Self::Reference {
            component: component.into(),
            field: ComponentField::Address,
        }
    }

    pub fn literal(value: impl Into<ArgValue>) -> Self {
        Self::Literal(value.into())
    }

    pub fn param(name: impl Into<String>) -> Self {
        Self::Param { param: name.into() }
    }

    /// The account sending the run's transactions.
    pub fn sender() -> Self {
        Self::Context {
            context: RunContext::Sender,
        }
    }

    /// `contract.method(args)` encoded as calldata.
    pub fn encoded(
        contract: impl Into<String>,
        method: impl Into<String>,
        args: Vec<ArgDescriptor>,
    ) -> Self {
        Self::Encoded {
            method: method.into(),
            contract: contract.into(),
            args,
        }
    }
}

/// A read-only query issued against a link target after the link call succeeded.
///
/// The returned address is recorded in the registry under `name`. This is how a factory
/// call that creates sub-components (`createPair`) is followed by `getAmm`/`getMargin`.
///
/// Factories that only expose an array of what they created (`createPool` followed by
/// `allPools(allPoolsLength() - 1)`) are read with `last_index_of`: the named length
/// getter is called first and the index of the last element is appended to `args`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChildQuery {
    /// Derived registry name, e.g. `Amm:WETH:USDC`.
    pub name: String,
    pub method: String,
    #[serde(default)]
    pub args: Vec<ArgDescriptor>,
    /// Artifact to attach with when the child is later used as a link target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
    /// Length getter whose result minus one is passed as the last argument.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_index_of: Option<String>,
}

impl ChildQuery {
    pub fn new(name: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: method.into(),
            args: Vec::new(),
            contract: None,
            last_index_of: None,
        }
    }

    pub fn arg(mut self, arg: ArgDescriptor) -> Self {
        self.args.push(arg);
        self
    }

    /// Index into the array whose length `length_getter` returns, at its last element.
    pub fn last_index_of(mut self, length_getter: impl Into<String>) -> Self {
        self.last_index_of = Some(length_getter.into());
        self
    }

    pub fn contract(mut self, contract: impl Into<String>) -> Self {
        self.contract = Some(contract.into());
        self
    }

    /// Artifact name, defaulting to the prefix before the first `:` of the derived name.
    pub fn contract_name(&self) -> &str {
        self.contract
            .as_deref()
            .unwrap_or_else(|| self.name.split(':').next().unwrap_or(&self.name))
    }
}

/// A post-deployment call, e.g. `Config.registerRouter(Router)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkCall {
    /// Component the call is sent to. Defaults to the owning spec.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub method: String,
    #[serde(default)]
    pub args: Vec<ArgDescriptor>,
    #[serde(default, rename = "query", skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<ChildQuery>,
}

impl LinkCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            target: None,
            method: method.into(),
            args: Vec::new(),
            queries: Vec::new(),
        }
    }

    /// Send the call to `target` instead of the owning component.
    pub fn on(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn arg(mut self, arg: ArgDescriptor) -> Self {
        self.args.push(arg);
        self
    }

    pub fn query(mut self, query: ChildQuery) -> Self {
        self.queries.push(query);
        self
    }

    /// Name of the component receiving the call.
    pub fn target_name<'a>(&'a self, owner: &'a str) -> &'a str {
        self.target.as_deref().unwrap_or(owner)
    }

    /// Human readable `Target.method` label used in logs and errors.
    pub fn describe(&self, owner: &str) -> String {
        format!("{}.{}", self.target_name(owner), self.method)
    }
}

/// Declarative description of one deployable component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Unique component name within a plan.
    pub name: String,
    /// Artifact (contract) name. Defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
    /// Artifact whose ABI is used to call the instance, when it differs from the one it
    /// is deployed from (a proxy fronting an implementation).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    #[serde(default)]
    pub args: Vec<ArgDescriptor>,
    /// Fixed address. When set the component is attached instead of deployed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, rename = "link", skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkCall>,
}

impl ResourceSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contract: None,
            interface: None,
            args: Vec::new(),
            address: None,
            links: Vec::new(),
        }
    }

    pub fn contract(mut self, contract: impl Into<String>) -> Self {
        self.contract = Some(contract.into());
        self
    }

    pub fn interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    pub fn arg(mut self, arg: ArgDescriptor) -> Self {
        self.args.push(arg);
        self
    }

    pub fn fixed_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    pub fn link(mut self, link: LinkCall) -> Self {
        self.links.push(link);
        self
    }

    pub fn contract_name(&self) -> &str {
        self.contract.as_deref().unwrap_or(&self.name)
    }

    /// Artifact used to bind the instance for calls.
    pub fn interface_name(&self) -> &str {
        self.interface.as_deref().unwrap_or(self.contract_name())
    }

    /// Whether this spec binds to an existing instance.
    pub fn is_attach(&self) -> bool {
        self.address.is_some()
    }
}

/// Ordered list of specs for one run. The order is the deployment order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentPlan(Vec<ResourceSpec>);

impl DeploymentPlan {
    pub fn new(specs: Vec<ResourceSpec>) -> Self {
        Self(specs)
    }

    pub fn into_inner(self) -> Vec<ResourceSpec> {
        self.0
    }
}

impl FromIterator<ResourceSpec> for DeploymentPlan {
    fn from_iter<T: IntoIterator<Item = ResourceSpec>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
