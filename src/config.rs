use std::time::Duration;

use thiserror::Error;

pub const PINATA_ENDPOINT: &str = "https://api.pinata.cloud/pinning/pinFileToIPFS";
pub const IPFS_GATEWAY: &str = "https://gateway.pinata.cloud";
pub const WALLET_RPC_URL: &str = "http://127.0.0.1:8545";
pub const CHAIN_ID: &str = "84532"; //Base Sepolia
pub const MINT_FUNCTION: &str = "mintNFT";
pub const DEFAULT_SESSION: &str = "default";
pub const HTTP_TIMEOUT_SECS: &str = "60";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("pinning credential is not configured (set PINATA_JWT)")]
    MissingCredential,
    #[error("NFT contract address is not configured (set NFT_CONTRACT)")]
    MissingContract,
    #[error("invalid {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub pinata_jwt: Option<String>,
    pub pinata_endpoint: String,
    pub gateway: String,
    pub wallet_rpc_url: String,
    pub contract: Option<String>,
    //Kept raw, only the commands that need them parse these
    pub chain_id: String,
    pub mint_function: String,
    pub session: String,
    pub timeout_secs: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pinata_jwt: None,
            pinata_endpoint: PINATA_ENDPOINT.to_string(),
            gateway: IPFS_GATEWAY.to_string(),
            wallet_rpc_url: WALLET_RPC_URL.to_string(),
            contract: None,
            chain_id: CHAIN_ID.to_string(),
            mint_function: MINT_FUNCTION.to_string(),
            session: DEFAULT_SESSION.to_string(),
            timeout_secs: HTTP_TIMEOUT_SECS.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    //Blank values count as unset. Nothing here can fail, bad values surface where they are used
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        config.pinata_jwt = get("PINATA_JWT");
        config.contract = get("NFT_CONTRACT");
        if let Some(v) = get("PINATA_ENDPOINT") {
            config.pinata_endpoint = v;
        }
        if let Some(v) = get("IPFS_GATEWAY") {
            config.gateway = v;
        }
        if let Some(v) = get("WALLET_RPC_URL") {
            config.wallet_rpc_url = v;
        }
        if let Some(v) = get("MINT_FUNCTION") {
            config.mint_function = v;
        }
        if let Some(v) = get("PINMINT_SESSION") {
            config.session = v;
        }
        if let Some(v) = get("CHAIN_ID") {
            config.chain_id = v;
        }
        if let Some(v) = get("HTTP_TIMEOUT_SECS") {
            config.timeout_secs = v;
        }

        config
    }

    pub fn credential(&self) -> Result<&str, ConfigError> {
        self.pinata_jwt.as_deref().ok_or(ConfigError::MissingCredential)
    }

    pub fn contract(&self) -> Result<&str, ConfigError> {
        self.contract.as_deref().ok_or(ConfigError::MissingContract)
    }

    pub fn parsed_chain_id(&self) -> Result<u64, ConfigError> {
        parse_chain_id(&self.chain_id)
    }

    /// Whole seconds, must be at least one.
    pub fn http_timeout(&self) -> Result<Duration, ConfigError> {
        match self.timeout_secs.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(ConfigError::Invalid { name: "HTTP_TIMEOUT_SECS", value: self.timeout_secs.clone() }),
        }
    }
}

/// Accepts decimal (`84532`) or hex (`0x14a34`).
pub fn parse_chain_id(value: &str) -> Result<u64, ConfigError> {
    let value = value.trim();
    let parsed = match value.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|_| ConfigError::Invalid { name: "CHAIN_ID", value: value.to_string() })
}
