//! Action dispatcher
//!
//! User commands, their validation, and the single API call each one maps
//! to. The surrounding protocol (intent line, busy marker, result logging,
//! dependent refresh) is driven by `Console::dispatch`.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::api::client::{ConsoleApi, Probe};
use crate::api::types::{EngineStatus, StrategyMode};
use crate::core::risk::RiskProfile;
use crate::error::Result;

pub const MODES: [&str; 3] = ["paper", "live", "auto"];
pub const CHAINS: [&str; 2] = ["eth", "polygon"];
pub const BALANCE_SOURCES: [&str; 3] = ["auto", "rpc", "moralis"];

/// Contract list input errors. Nothing is sent when one is raised.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("malformed contract address: {0:?} (expected 0x followed by 40 hex digits)")]
    MalformedAddress(String),

    #[error("contracts JSON must be an array of address strings, got {0}")]
    NotAnAddressList(&'static str),
}

fn address_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("static regex"))
}

pub fn is_address(value: &str) -> bool {
    address_regex().is_match(value)
}

/// Parse the contract editor input.
///
/// Accepts a JSON array of strings or a whitespace/comma separated list of
/// addresses. Entries are trimmed and deduplicated case-insensitively, the
/// first spelling is kept. Empty input yields an empty list.
pub fn parse_contracts(input: &str) -> std::result::Result<Vec<String>, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let candidates: Vec<String> = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(ValidationError::NotAnAddressList(json_kind(&other))),
            })
            .collect::<std::result::Result<_, _>>()?,
        Ok(other) => return Err(ValidationError::NotAnAddressList(json_kind(&other))),
        Err(_) => trimmed
            .split(|c: char| c.is_whitespace() || c == ',')
            .map(str::to_string)
            .collect(),
    };

    let mut seen = HashSet::new();
    let mut contracts = Vec::new();
    for candidate in candidates {
        let address = candidate.trim();
        if address.is_empty() {
            continue;
        }
        if !is_address(address) {
            return Err(ValidationError::MalformedAddress(address.to_string()));
        }
        if seen.insert(address.to_lowercase()) {
            contracts.push(address.to_string());
        }
    }
    Ok(contracts)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Next entry of a fixed option cycle; unknown current values start over
pub fn next_option(options: &[&'static str], current: &str) -> &'static str {
    let position = options
        .iter()
        .position(|o| o.eq_ignore_ascii_case(current.trim()));
    match position {
        Some(i) => options[(i + 1) % options.len()],
        None => options[0],
    }
}

// =============================================================================
// Commands
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    RpcCheck,
    SelfTest,
    SetMode(String),
    Start,
    Stop,
    /// Empty key clears it
    SetOpenSeaKey(String),
    SetChain(String),
    SetBalanceSource(String),
    /// Raw editor text, parsed before anything is sent
    PatchContracts(String),
    SetRiskProfile(RiskProfile),
    SetStrategy {
        mode: StrategyMode,
        strategy: Option<String>,
    },
    ReloadSettings,
}

/// Identity of the control a command comes from, used for the busy set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Rpc,
    Test,
    Mode,
    Start,
    Stop,
    OpenSea,
    Chain,
    BalanceSource,
    Contracts,
    Risk,
    Strategy,
    Settings,
}

/// What to re-fetch after a successful command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    None,
    Settings,
    /// Apply the returned status, or poll it when the reply had none
    Status,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::RpcCheck => CommandKind::Rpc,
            Command::SelfTest => CommandKind::Test,
            Command::SetMode(_) => CommandKind::Mode,
            Command::Start => CommandKind::Start,
            Command::Stop => CommandKind::Stop,
            Command::SetOpenSeaKey(_) => CommandKind::OpenSea,
            Command::SetChain(_) => CommandKind::Chain,
            Command::SetBalanceSource(_) => CommandKind::BalanceSource,
            Command::PatchContracts(_) => CommandKind::Contracts,
            Command::SetRiskProfile(_) => CommandKind::Risk,
            Command::SetStrategy { .. } => CommandKind::Strategy,
            Command::ReloadSettings => CommandKind::Settings,
        }
    }

    /// Label of the error line, `[<NAME>][ERR]`
    pub fn name(&self) -> &'static str {
        match self.kind() {
            CommandKind::Rpc => "RPC",
            CommandKind::Test => "TEST",
            CommandKind::Mode => "MODE",
            CommandKind::Start => "START",
            CommandKind::Stop => "STOP",
            CommandKind::OpenSea => "OPENSEA",
            CommandKind::Chain => "CHAIN",
            CommandKind::BalanceSource => "BALANCE",
            CommandKind::Contracts => "PATCH",
            CommandKind::Risk => "RISK",
            CommandKind::Strategy => "STRATEGY",
            CommandKind::Settings => "SETTINGS",
        }
    }

    /// Line logged before the call
    pub fn intent(&self) -> String {
        match self {
            Command::RpcCheck => "[UI] rpc".to_string(),
            Command::SelfTest => "[UI] test".to_string(),
            Command::SetMode(mode) => format!("[UI] mode -> {}", mode),
            Command::Start => "[UI] start".to_string(),
            Command::Stop => "[UI] stop".to_string(),
            Command::SetOpenSeaKey(key) if key.trim().is_empty() => "[UI] opensea key cleared".to_string(),
            Command::SetOpenSeaKey(_) => "[UI] opensea key set".to_string(),
            Command::SetChain(chain) => format!("[UI] chain -> {}", chain),
            Command::SetBalanceSource(source) => format!("[UI] balance source -> {}", source),
            Command::PatchContracts(_) => "[UI] patch contracts".to_string(),
            Command::SetRiskProfile(profile) => format!("[UI] risk profile -> {}", profile),
            Command::SetStrategy { mode, strategy: Some(name) } => {
                format!("[UI] strategy -> {}/{}", mode, name)
            }
            Command::SetStrategy { mode, strategy: None } => format!("[UI] strategy -> {}", mode),
            Command::ReloadSettings => "[UI] reload settings".to_string(),
        }
    }

    pub fn refresh(&self) -> Refresh {
        match self {
            Command::Start | Command::Stop => Refresh::Status,
            Command::SetMode(_)
            | Command::SetOpenSeaKey(_)
            | Command::SetChain(_)
            | Command::SetBalanceSource(_)
            | Command::PatchContracts(_)
            | Command::SetRiskProfile(_)
            | Command::SetStrategy { .. } => Refresh::Settings,
            Command::RpcCheck | Command::SelfTest | Command::ReloadSettings => Refresh::None,
        }
    }
}

/// Result of one command call
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Echoed to the log panel; `None` for settings reload
    pub body: Option<Value>,
    /// Engine status carried by start/stop replies
    pub status: Option<EngineStatus>,
    /// Fresh settings, for the reload command
    pub settings: Option<crate::api::types::Settings>,
}

impl CommandOutput {
    fn body(body: Value) -> Self {
        Self {
            body: Some(body),
            status: None,
            settings: None,
        }
    }
}

/// Validate and perform the API call for `command`
pub async fn execute(api: &dyn ConsoleApi, command: &Command) -> Result<CommandOutput> {
    let output = match command {
        Command::RpcCheck => CommandOutput::body(api.rpc_check().await?),
        Command::SelfTest => CommandOutput::body(api.probe(Probe::Test).await?),
        Command::SetMode(mode) => CommandOutput::body(api.set_mode(mode).await?),
        Command::Start => {
            let reply = api.start().await?;
            CommandOutput {
                body: Some(reply.body),
                status: reply.status,
                settings: None,
            }
        }
        Command::Stop => {
            let reply = api.stop().await?;
            CommandOutput {
                body: Some(reply.body),
                status: reply.status,
                settings: None,
            }
        }
        Command::SetOpenSeaKey(key) => CommandOutput::body(api.set_opensea_key(key.trim()).await?),
        Command::SetChain(chain) => CommandOutput::body(api.set_chain(chain).await?),
        Command::SetBalanceSource(source) => {
            CommandOutput::body(api.set_balance_source(source).await?)
        }
        Command::PatchContracts(raw) => {
            let contracts = parse_contracts(raw)?;
            CommandOutput::body(api.patch_contracts(&contracts).await?)
        }
        Command::SetRiskProfile(profile) => {
            CommandOutput::body(api.set_risk_profile(profile.as_str()).await?)
        }
        Command::SetStrategy { mode, strategy } => {
            let mode = mode.to_string();
            CommandOutput::body(api.set_strategy(&mode, strategy.as_deref()).await?)
        }
        Command::ReloadSettings => CommandOutput {
            body: None,
            status: None,
            settings: Some(api.settings().await?),
        },
    };
    Ok(output)
}
