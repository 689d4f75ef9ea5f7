use std::cell::OnceCell;
use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::blocking::Client;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::abi;
use crate::config::{Config, ConfigError, parse_chain_id};
use crate::dto::{Call, MintReceipt, SendCallsPayload, StoredRecord};
use crate::utils::truncate;

//EIP-1193 provider error codes
pub const USER_REJECTED: i64 = 4001;
pub const UNAUTHORIZED: i64 = 4100;

const SEND_CALLS_VERSION: &str = "2.0.0";
const MESSAGE_LIMIT: usize = 120;

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("provider error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("provider transport failed: {0}")]
    Transport(String),
}

/// The request surface of an injected-style wallet provider.
pub trait WalletProvider {
    fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;
}

/// Wallet provider reached over JSON-RPC on HTTP.
pub struct HttpProvider {
    http: Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpProvider {
    pub fn new(config: &Config) -> Result<Self, ProviderError> {
        let timeout = config.http_timeout().map_err(|e| ProviderError::Transport(e.to_string()))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            url: config.wallet_rpc_url.clone(),
            next_id: AtomicU64::new(1),
        })
    }
}

impl WalletProvider for HttpProvider {
    fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        debug!(method, id, "wallet request");

        let transport = |e: reqwest::Error| ProviderError::Transport(e.to_string());
        let response = self.http.post(&self.url).json(&body).send().map_err(transport)?;
        let status = response.status();
        let text = response.text().map_err(transport)?;

        //Some nodes send JSON-RPC errors with a non-2xx status, so the body gets a look first
        let http_error = || {
            ProviderError::Transport(format!("HTTP {status}: {}", truncate(text.trim(), MESSAGE_LIMIT)))
        };
        let reply: Value = match serde_json::from_str::<Value>(&text) {
            Ok(reply) if status.is_success() || reply.get("error").is_some_and(|e| !e.is_null()) => reply,
            Ok(_) => return Err(http_error()),
            Err(_) if !status.is_success() => return Err(http_error()),
            Err(e) => return Err(ProviderError::Transport(format!("invalid JSON-RPC reply: {e}"))),
        };

        if let Some(err) = reply.get("error").filter(|e| !e.is_null()) {
            return Err(ProviderError::Rpc {
                code: err["code"].as_i64().unwrap_or(-32603),
                message: err["message"].as_str().unwrap_or("unknown provider error").to_string(),
            });
        }
        Ok(reply.get("result").cloned().unwrap_or(Value::Null))
    }
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("wallet returned no accounts")]
    NoAccounts,
    #[error("wallet returned an invalid account: {0}")]
    InvalidAccount(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[derive(Debug, Error)]
pub enum MintError {
    #[error("wallet is not connected")]
    NotConnected,
    #[error("active signer {actual:?} does not match sub-account {expected}")]
    SignerMismatch { expected: String, actual: Option<String> },
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("request rejected by user")]
    UserRejected,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("provider error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("provider transport failed: {0}")]
    Transport(String),
}

impl MintError {
    /// Maps a provider failure onto the fixed set of mint failures. Codes win over text.
    pub fn classify(err: ProviderError, expected_signer: &str) -> Self {
        let (code, message) = match err {
            ProviderError::Transport(m) => return MintError::Transport(m),
            ProviderError::Rpc { code, message } => (code, message),
        };
        let lower = message.to_lowercase();

        if code == USER_REJECTED || lower.contains("user rejected") || lower.contains("user denied") {
            MintError::UserRejected
        } else if code == UNAUTHORIZED || lower.contains("signer") {
            MintError::SignerMismatch { expected: expected_signer.to_string(), actual: None }
        } else if lower.contains("insufficient funds") || lower.contains("insufficient balance") {
            MintError::InsufficientFunds(message)
        } else {
            MintError::Rpc { code, message }
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            MintError::NotConnected => "Connect your wallet first.".to_string(),
            MintError::SignerMismatch { expected, .. } => format!(
                "The active wallet account is not the connected sub-account {expected}. Reconnect and try again."
            ),
            MintError::InsufficientFunds(_) => {
                "Insufficient funds to pay for this mint on the test network.".to_string()
            }
            MintError::UserRejected => "The mint was rejected in the wallet.".to_string(),
            MintError::Config(e) => e.to_string(),
            MintError::Rpc { message, .. } => format!("Mint failed: {}", truncate(message, MESSAGE_LIMIT)),
            MintError::Transport(m) => {
                format!("Could not reach the wallet provider: {}", truncate(m, MESSAGE_LIMIT))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accounts {
    /// Delegated signer the mint must come from.
    pub sub: String,
    pub primary: String,
}

/// Connects to a wallet and mints stored records. The provider is built on first use.
pub struct WalletBridge<P, F> {
    make_provider: F,
    provider: OnceCell<P>,
    accounts: Option<Accounts>,
    contract: Option<String>,
    chain_id: String,
    mint_function: String,
}

impl<P, F> WalletBridge<P, F>
where
    P: WalletProvider,
    F: Fn() -> Result<P, ProviderError>,
{
    pub fn new(config: &Config, make_provider: F) -> Self {
        Self {
            make_provider,
            provider: OnceCell::new(),
            accounts: None,
            contract: config.contract.clone(),
            chain_id: config.chain_id.clone(),
            mint_function: config.mint_function.clone(),
        }
    }

    fn provider(&self) -> Result<&P, ProviderError> {
        if let Some(provider) = self.provider.get() {
            return Ok(provider);
        }
        let provider = (self.make_provider)()?;
        Ok(self.provider.get_or_init(|| provider))
    }

    pub fn accounts(&self) -> Option<&Accounts> {
        self.accounts.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.accounts.is_some()
    }

    pub fn connect(&mut self) -> Result<&Accounts, ConnectError> {
        let result = self.provider()?.request("eth_requestAccounts", json!([]))?;
        let listed: Vec<String> = result
            .as_array()
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();

        if let Some(bad) = listed.iter().find(|a| !abi::is_address(a)) {
            return Err(ConnectError::InvalidAccount(bad.clone()));
        }
        let sub = listed.first().cloned().ok_or(ConnectError::NoAccounts)?;
        let primary = match listed.get(1) {
            Some(p) => p.clone(),
            None => {
                warn!(%sub, "wallet exposed a single account, using it as primary too");
                sub.clone()
            }
        };

        info!(%sub, %primary, "wallet connected");
        Ok(&*self.accounts.insert(Accounts { sub, primary }))
    }

    pub fn disconnect(&mut self) {
        self.accounts = None;
    }

    pub fn mint(&self, record: &StoredRecord) -> Result<MintReceipt, MintError> {
        let accounts = self.accounts.as_ref().ok_or(MintError::NotConnected)?;
        let contract = self.contract.as_deref().ok_or(ConfigError::MissingContract)?;
        let chain_id = parse_chain_id(&self.chain_id)?;
        let classify = |e| MintError::classify(e, &accounts.sub);

        let provider = self.provider().map_err(classify)?;
        let active = provider.request("eth_accounts", json!([])).map_err(classify)?;
        let active = active.get(0).and_then(Value::as_str).map(str::to_string);
        if !active.as_deref().is_some_and(|a| abi::same_address(a, &accounts.sub)) {
            return Err(MintError::SignerMismatch { expected: accounts.sub.clone(), actual: active });
        }

        let data = abi::encode_string_call(&self.mint_function, &record.content_ref);
        let payload = SendCallsPayload {
            version: SEND_CALLS_VERSION.to_string(),
            chain_id: abi::quantity(chain_id),
            from: accounts.sub.clone(),
            atomic_required: true,
            calls: vec![Call {
                to: contract.to_string(),
                data: abi::to_hex(&data),
                value: abi::quantity(0),
            }],
        };

        info!(record = %record.id, content_ref = %record.content_ref, "submitting mint");
        let result = provider
            .request("wallet_sendCalls", json!([payload]))
            .map_err(classify)?;

        let call_id = match &result {
            Value::String(id) => id.clone(),
            other => other
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| MintError::Rpc {
                    code: -32603,
                    message: format!("unexpected wallet_sendCalls result: {other}"),
                })?,
        };

        info!(%call_id, "mint submitted");
        Ok(MintReceipt {
            record_id: record.id.clone(),
            content_ref: record.content_ref.clone(),
            call_id,
            from: accounts.sub.clone(),
        })
    }
}
