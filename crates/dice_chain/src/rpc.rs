//! Toolkit gateway client -- JSON-RPC 2.0 over HTTP.
//!
//! The gateway holds the signing keys, the giver and the compiled contracts.
//! This client only names what to do; every method resolves once the gateway
//! has seen the resulting transaction processed. Wallet addresses are also
//! computed by the gateway, from the wallet's real initial state.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::address::Address;
use crate::keystore::PublicKey;
use crate::error::DeployError;
use crate::network::{
    AddressDeriver, ChainReader, Confirmation, ContractCall, ContractDeployer, ContractInvoker, DeployedContract,
    DeploymentSpec, FundingService, SendOptions,
};
use crate::rpc_config::RpcConfig;
use crate::templates::{OWNER_GETTER, get_contract_abi};

// ---------------------------------------------------------------------------
// Wire types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<R> {
    result: Option<R>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    data: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WalletAddressParams {
    public_key: String,
    workchain: i8,
}

#[derive(Debug, Deserialize)]
struct AddressResult {
    address: Address,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GiverSendParams<'a> {
    address: &'a Address,
    amount: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeployParams<'a> {
    contract: &'a str,
    public_key: String,
    init_params: &'a BTreeMap<String, serde_json::Value>,
    constructor_params: &'a BTreeMap<String, serde_json::Value>,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeployResult {
    address: Address,
    tx_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageParams<'a> {
    from: Address,
    to: Address,
    abi: &'a serde_json::Value,
    method: &'a str,
    params: &'a serde_json::Value,
    amount: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxResult {
    tx_id: String,
}

#[derive(Debug, Serialize)]
struct AccountParams<'a> {
    address: &'a Address,
}

#[derive(Debug, Deserialize)]
struct AccountStateResult {
    status: String,
}

#[derive(Debug, Serialize)]
struct RunGetterParams<'a> {
    address: &'a Address,
    abi: &'a serde_json::Value,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GetterResult {
    output: serde_json::Value,
}

/// Failure talking to the gateway, before it is classified per operation.
#[derive(Debug, thiserror::Error)]
enum RpcFailure {
    #[error("gateway unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gateway returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("toolkit error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("malformed gateway response: {0}")]
    Malformed(String),
}

fn into_result<R>(envelope: RpcResponse<R>) -> Result<R, RpcFailure> {
    if let Some(err) = envelope.error {
        let message = match err.data {
            Some(data) => format!("{} ({data})", err.message),
            None => err.message,
        };
        return Err(RpcFailure::Remote {
            code: err.code,
            message,
        });
    }
    envelope
        .result
        .ok_or_else(|| RpcFailure::Malformed("response has neither result nor error".into()))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Network collaborator backed by the deployment toolkit's gateway.
pub struct ToolkitClient {
    config: RpcConfig,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl ToolkitClient {
    pub fn new(config: RpcConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            config,
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    fn request<'a, P>(&self, method: &'a str, params: P) -> RpcRequest<'a, P> {
        RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        }
    }

    async fn call<P, R>(&self, method: &str, params: P) -> Result<R, RpcFailure>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let body = self.request(method, params);
        debug!(method, id = body.id, url = %self.config.url, "toolkit rpc call");

        let response = self.client.post(&self.config.url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(method, status = status.as_u16(), "toolkit rpc call rejected");
            return Err(RpcFailure::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: RpcResponse<R> = response
            .json()
            .await
            .map_err(|e| RpcFailure::Malformed(e.to_string()))?;
        into_result(envelope)
    }
}

#[async_trait]
impl AddressDeriver for ToolkitClient {
    async fn wallet_address(
        &self,
        public_key: &PublicKey,
        workchain: i8,
    ) -> Result<Address, DeployError> {
        let params = WalletAddressParams {
            public_key: public_key.to_hex(),
            workchain,
        };
        let result: AddressResult = self
            .call("getWalletAddress", params)
            .await
            .map_err(|e| DeployError::Query(e.to_string()))?;
        if result.address.workchain() != workchain {
            return Err(DeployError::Query(format!(
                "gateway returned {} for workchain {workchain}",
                result.address
            )));
        }
        Ok(result.address)
    }
}

#[async_trait]
impl FundingService for ToolkitClient {
    async fn send_to(
        &self,
        address: &Address,
        amount_nano: u64,
    ) -> Result<Confirmation, DeployError> {
        let params = GiverSendParams {
            address,
            amount: amount_nano.to_string(),
        };
        let tx: TxResult = self
            .call("giver_sendTo", params)
            .await
            .map_err(|e| DeployError::Funding(e.to_string()))?;
        Ok(Confirmation { tx_id: tx.tx_id })
    }
}

#[async_trait]
impl ContractDeployer for ToolkitClient {
    async fn deploy(&self, spec: DeploymentSpec) -> Result<DeployedContract, DeployError> {
        let params = DeployParams {
            contract: &spec.contract_template,
            public_key: spec.deployer_key.public_key.to_hex(),
            init_params: &spec.init_params,
            constructor_params: &spec.constructor_params,
            value: spec.funding_amount.to_string(),
        };
        let result: DeployResult = self
            .call("deployContract", params)
            .await
            .map_err(|e| DeployError::Deployment(e.to_string()))?;
        Ok(DeployedContract {
            address: result.address,
            template: spec.contract_template,
            tx_id: result.tx_id,
        })
    }
}

#[async_trait]
impl ContractInvoker for ToolkitClient {
    async fn send(
        &self,
        call: ContractCall,
        options: SendOptions,
    ) -> Result<Confirmation, DeployError> {
        let abi = get_contract_abi(&call.template).ok_or_else(|| {
            DeployError::Invocation(format!("no ABI known for template `{}`", call.template))
        })?;
        if !abi.has_function(&call.method) {
            return Err(DeployError::Invocation(format!(
                "`{}` has no function `{}`",
                abi.name, call.method
            )));
        }

        let params = SendMessageParams {
            from: options.from,
            to: call.address,
            abi: &abi.abi,
            method: &call.method,
            params: &call.params,
            amount: options.amount_nano.to_string(),
        };
        let tx: TxResult = self
            .call("sendMessage", params)
            .await
            .map_err(|e| DeployError::Invocation(e.to_string()))?;
        Ok(Confirmation { tx_id: tx.tx_id })
    }
}

#[async_trait]
impl ChainReader for ToolkitClient {
    async fn is_deployed(&self, address: &Address) -> Result<bool, DeployError> {
        let state: AccountStateResult = self
            .call("getAccountState", AccountParams { address })
            .await
            .map_err(|e| DeployError::Query(e.to_string()))?;
        Ok(state.status == "active")
    }

    async fn owner_of(
        &self,
        resource: &Address,
        template: &str,
    ) -> Result<Option<Address>, DeployError> {
        let abi = get_contract_abi(template).ok_or_else(|| {
            DeployError::Query(format!("no ABI known for template `{template}`"))
        })?;
        let params = RunGetterParams {
            address: resource,
            abi: &abi.abi,
            method: OWNER_GETTER,
            params: serde_json::json!({ "answerId": 0 }),
        };
        let result: GetterResult = self
            .call("runGetter", params)
            .await
            .map_err(|e| DeployError::Query(e.to_string()))?;

        match &result.output["value0"] {
            serde_json::Value::Null => Ok(None),
            serde_json::Value::String(raw) => raw.parse().map(Some),
            other => Err(DeployError::Query(format!(
                "unexpected owner value: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ToolkitClient {
        ToolkitClient::new(RpcConfig::default()).unwrap()
    }

    fn addr(byte: u8) -> Address {
        Address::new(0, [byte; 32])
    }

    #[test]
    fn request_envelope_is_json_rpc_2() {
        let client = client();
        let params = GiverSendParams {
            address: &addr(1),
            amount: "10000000000".into(),
        };
        let body = serde_json::to_value(client.request("giver_sendTo", params)).unwrap();

        assert_eq!(body["jsonrpc"], "2.0");
        assert_eq!(body["method"], "giver_sendTo");
        assert_eq!(body["params"]["address"], addr(1).to_string());
        assert_eq!(body["params"]["amount"], "10000000000");
    }

    #[test]
    fn request_ids_increase() {
        let client = client();
        let first = client.request("a", ()).id;
        let second = client.request("b", ()).id;
        assert!(second > first);
    }

    #[test]
    fn deploy_params_use_camel_case() {
        let mut init_params = BTreeMap::new();
        init_params.insert("tokenRoot_".to_string(), serde_json::json!(addr(1)));
        let constructor_params = BTreeMap::new();
        let params = DeployParams {
            contract: "AnyOwner",
            public_key: "ab".repeat(32),
            init_params: &init_params,
            constructor_params: &constructor_params,
            value: "2000000000".into(),
        };
        let json = serde_json::to_value(&params).unwrap();

        assert_eq!(json["contract"], "AnyOwner");
        assert_eq!(json["initParams"]["tokenRoot_"], addr(1).to_string());
        assert_eq!(json["constructorParams"], serde_json::json!({}));
        assert!(json.get("publicKey").is_some());
    }

    #[test]
    fn result_envelope_is_unwrapped() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"result":{"txId":"abc"}}"#;
        let envelope: RpcResponse<TxResult> = serde_json::from_str(raw).unwrap();
        assert_eq!(into_result(envelope).unwrap().tx_id, "abc");
    }

    #[test]
    fn error_envelope_keeps_diagnostic() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"compute phase failed","data":{"exitCode":1000}}}"#;
        let envelope: RpcResponse<TxResult> = serde_json::from_str(raw).unwrap();
        let err = into_result(envelope).unwrap_err();
        let msg = err.to_string();

        assert!(msg.contains("-32000"));
        assert!(msg.contains("compute phase failed"));
        assert!(msg.contains("1000"));
    }

    #[test]
    fn empty_envelope_is_malformed() {
        let raw = r#"{"jsonrpc":"2.0","id":1}"#;
        let envelope: RpcResponse<TxResult> = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            into_result(envelope),
            Err(RpcFailure::Malformed(_))
        ));
    }

    #[test]
    fn deploy_result_parses_address() {
        let raw = r#"{"address":"0:0101010101010101010101010101010101010101010101010101010101010101","txId":"t1"}"#;
        let result: DeployResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.address, addr(1));
    }

    #[tokio::test]
    async fn send_with_unknown_template_fails_before_network() {
        let client = client();
        let call = ContractCall {
            address: addr(1),
            template: "Mystery".into(),
            method: "transferOwnership".into(),
            params: serde_json::json!({}),
        };
        let options = SendOptions {
            from: addr(2),
            amount_nano: 1,
        };

        let err = client.send(call, options).await.unwrap_err();
        assert!(err.to_string().contains("no ABI known"));
    }

    #[tokio::test]
    async fn send_with_unknown_method_fails_before_network() {
        let client = client();
        let call = ContractCall {
            address: addr(1),
            template: "TokenRootUpgradeable".into(),
            method: "burnEverything".into(),
            params: serde_json::json!({}),
        };
        let options = SendOptions {
            from: addr(2),
            amount_nano: 1,
        };

        let err = client.send(call, options).await.unwrap_err();
        assert!(matches!(err, DeployError::Invocation(_)));
        assert!(err.to_string().contains("burnEverything"));
    }

    #[test]
    fn wallet_address_params_carry_key_and_workchain() {
        let params = WalletAddressParams {
            public_key: "ab".repeat(32),
            workchain: -1,
        };
        let json = serde_json::to_value(&params).unwrap();

        assert_eq!(json["publicKey"], "ab".repeat(32));
        assert_eq!(json["workchain"], -1);
    }

    #[tokio::test]
    async fn unreachable_gateway_wallet_lookup_is_query_error() {
        let config = RpcConfig::new("http://127.0.0.1:9/rpc", 2).unwrap();
        let client = ToolkitClient::new(config).unwrap();
        let key: PublicKey = "ab".repeat(32).parse().unwrap();

        let err = client.wallet_address(&key, 0).await.unwrap_err();
        assert!(matches!(err, DeployError::Query(_)));
        assert!(err.to_string().contains("gateway unreachable"));
    }

    #[tokio::test]
    async fn unreachable_giver_is_funding_error() {
        let config = RpcConfig::new("http://127.0.0.1:9/rpc", 2).unwrap();
        let client = ToolkitClient::new(config).unwrap();

        let err = client.send_to(&addr(1), 10).await.unwrap_err();
        assert!(matches!(err, DeployError::Funding(_)));
        assert!(err.to_string().contains("gateway unreachable"));
    }
}
