use crate::config::defaults::builtin_configurations;
use crate::core::store::ConfigurationStore;
use crate::domain::model::{TransactionConfig, TransactionConfigPatch, TransactionType};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{BridgeError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var regex is valid"));

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 疊加在內建預設值上的部分設定
    #[serde(default)]
    pub transactions: BTreeMap<TransactionType, TransactionConfigPatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// 開啟後格式錯誤的 XML 直接以 400 拒絕，不進入轉換
    #[serde(default)]
    pub reject_malformed: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            reject_malformed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamMode {
    Http,
    /// 直接回傳交易的範例 JSON 回應
    #[default]
    Mock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub mode: UpstreamMode,
    /// 可含 `{transaction}`，呼叫時代入交易名稱
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    pub bearer_token: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            mode: UpstreamMode::default(),
            endpoint: None,
            timeout_seconds: default_timeout_seconds(),
            bearer_token: None,
            headers: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl BridgeConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed)?)
    }

    /// 替換環境變數 (例如 ${PARTNER_TOKEN})，未設定的保留原文
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_REGEX
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("server.host", &self.server.host)?;
        validation::validate_range("server.port", self.server.port, 1, u16::MAX)?;

        if self.upstream.mode == UpstreamMode::Http {
            let endpoint = validation::validate_required_field("upstream.endpoint", &self.upstream.endpoint)?;
            validation::validate_url("upstream.endpoint", endpoint)?;
        }
        validation::validate_range("upstream.timeout_seconds", self.upstream.timeout_seconds, 1, 300)?;

        validation::validate_one_of(
            "logging.level",
            &self.logging.level.to_ascii_lowercase(),
            &["trace", "debug", "info", "warn", "error"],
        )?;

        for (transaction, patch) in &self.transactions {
            if transaction.as_str().is_empty() {
                return Err(BridgeError::ConfigValidationError {
                    field: "transactions".to_string(),
                    message: "transaction type name cannot be empty".to_string(),
                });
            }
            if let Some(template) = &patch.json_response_template {
                validation::validate_json_template(
                    &format!("transactions.{}.json_response_template", transaction),
                    template,
                )?;
            }
        }

        Ok(())
    }

    /// 內建預設值疊加檔案中的 `[transactions.*]`
    pub fn transaction_configurations(&self) -> BTreeMap<TransactionType, TransactionConfig> {
        let mut configurations = builtin_configurations();
        for (transaction, patch) in &self.transactions {
            let base = configurations.remove(transaction).unwrap_or_default();
            configurations.insert(transaction.clone(), patch.clone().apply_to(&base));
        }
        configurations
    }

    pub fn build_store(&self) -> ConfigurationStore {
        ConfigurationStore::new(self.transaction_configurations())
    }
}

impl ConfigProvider for BridgeConfig {
    fn upstream_endpoint(&self) -> &str {
        self.upstream.endpoint.as_deref().unwrap_or_default()
    }

    fn listen_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn request_timeout_seconds(&self) -> u64 {
        self.upstream.timeout_seconds
    }
}

impl Validate for BridgeConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
