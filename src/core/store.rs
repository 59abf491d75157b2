//! 執行期可變的交易設定。
//!
//! 讀取者取得目前快照的 `Arc`，寫入者在單一寫鎖下建立新快照後整個替換，
//! 因此轉換過程看到的永遠是某一個完整版本，不會讀到寫到一半的 MappingSet。

use crate::domain::model::{
    Direction, MappingRule, TransactionConfig, TransactionConfigPatch, TransactionType,
};
use crate::utils::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigSnapshot {
    pub version: u64,
    pub configurations: BTreeMap<TransactionType, TransactionConfig>,
}

impl ConfigSnapshot {
    pub fn get(&self, transaction: &TransactionType) -> Option<&TransactionConfig> {
        self.configurations.get(transaction)
    }

    pub fn require(&self, transaction: &TransactionType) -> Result<&TransactionConfig> {
        self.get(transaction)
            .ok_or_else(|| BridgeError::UnknownTransactionType(transaction.to_string()))
    }

    pub fn transaction_types(&self) -> impl Iterator<Item = &TransactionType> {
        self.configurations.keys()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    /// 逐交易類型合併，未提供的欄位保留原值
    #[default]
    Merge,
    /// 整體取代，未列出的交易類型會被移除
    Replace,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigUpdate {
    #[serde(default)]
    pub mode: UpdateMode,
    #[serde(default)]
    pub configurations: BTreeMap<TransactionType, TransactionConfigPatch>,
}

#[derive(Debug, Default)]
pub struct ConfigurationStore {
    current: RwLock<Arc<ConfigSnapshot>>,
}

impl ConfigurationStore {
    pub fn new(configurations: BTreeMap<TransactionType, TransactionConfig>) -> Self {
        Self {
            current: RwLock::new(Arc::new(ConfigSnapshot {
                version: 1,
                configurations,
            })),
        }
    }

    /// 內建 query / payment / reversal 預設值
    pub fn with_defaults() -> Self {
        Self::new(crate::config::defaults::builtin_configurations())
    }

    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        // 鎖中毒時資料仍是完整的舊快照，直接沿用
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, transaction: &TransactionType) -> Option<TransactionConfig> {
        self.snapshot().get(transaction).cloned()
    }

    pub fn version(&self) -> u64 {
        self.snapshot().version
    }

    /// 套用部分或完整更新，回傳新版本號
    pub fn replace_config(&self, update: ConfigUpdate) -> u64 {
        let mode = update.mode;
        let touched = update.configurations.len();

        let version = self.swap(|current| {
            let mut configurations = match mode {
                UpdateMode::Merge => current.configurations.clone(),
                UpdateMode::Replace => BTreeMap::new(),
            };

            for (transaction, patch) in update.configurations {
                let base = configurations.remove(&transaction).unwrap_or_default();
                configurations.insert(transaction, patch.apply_to(&base));
            }

            Ok(configurations)
        });

        let version = version.unwrap_or_default();
        tracing::info!(
            "🔧 Configuration updated ({:?}, {} transaction types) -> version {}",
            mode,
            touched,
            version
        );
        version
    }

    /// 註冊或整個取代單一交易類型的設定
    pub fn register(&self, transaction: TransactionType, config: TransactionConfig) -> u64 {
        let name = transaction.to_string();
        let version = self
            .swap(|current| {
                let mut configurations = current.configurations.clone();
                configurations.insert(transaction, config);
                Ok(configurations)
            })
            .unwrap_or_default();
        tracing::info!("🔧 Registered transaction type '{}' -> version {}", name, version);
        version
    }

    /// 新增規則，回傳實際使用的 id（與既有規則衝突時會重新配發）
    pub fn add_rule(&self, transaction: &TransactionType, direction: Direction, rule: MappingRule) -> Result<u64> {
        let mut id = rule.id;
        self.edit(transaction, |config| {
            id = config.mappings_mut(direction).push(rule);
            Ok(())
        })?;
        Ok(id)
    }

    pub fn update_rule(&self, transaction: &TransactionType, direction: Direction, rule: MappingRule) -> Result<()> {
        let id = rule.id;
        self.edit(transaction, |config| {
            if config.mappings_mut(direction).replace(rule) {
                Ok(())
            } else {
                Err(BridgeError::RuleNotFound {
                    transaction: transaction.to_string(),
                    id,
                })
            }
        })
    }

    pub fn remove_rule(&self, transaction: &TransactionType, direction: Direction, id: u64) -> Result<MappingRule> {
        let mut removed = None;
        self.edit(transaction, |config| {
            removed = config.mappings_mut(direction).remove(id);
            if removed.is_some() {
                Ok(())
            } else {
                Err(BridgeError::RuleNotFound {
                    transaction: transaction.to_string(),
                    id,
                })
            }
        })?;
        removed.ok_or_else(|| BridgeError::RuleNotFound {
            transaction: transaction.to_string(),
            id,
        })
    }

    pub fn clear_rules(&self, transaction: &TransactionType, direction: Direction) -> Result<()> {
        self.edit(transaction, |config| {
            *config.mappings_mut(direction) = Default::default();
            Ok(())
        })
    }

    fn edit<F>(&self, transaction: &TransactionType, apply: F) -> Result<()>
    where
        F: FnOnce(&mut TransactionConfig) -> Result<()>,
    {
        self.swap(|current| {
            let mut configurations = current.configurations.clone();
            let config = configurations
                .get_mut(transaction)
                .ok_or_else(|| BridgeError::UnknownTransactionType(transaction.to_string()))?;
            apply(config)?;
            Ok(configurations)
        })?;
        tracing::debug!("🔧 Edited mappings of '{}'", transaction);
        Ok(())
    }

    /// 在寫鎖內由目前快照建出新快照並替換；建構失敗時保留舊快照
    fn swap<F>(&self, build: F) -> Result<u64>
    where
        F: FnOnce(&ConfigSnapshot) -> Result<BTreeMap<TransactionType, TransactionConfig>>,
    {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let configurations = build(&guard)?;
        let version = guard.version + 1;
        *guard = Arc::new(ConfigSnapshot {
            version,
            configurations,
        });
        Ok(version)
    }
}
