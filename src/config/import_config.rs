// ==========================================
// 库存 CSV 导入 - 导入配置
// ==========================================
// 职责: CSVImportConfig 全部配置项 + 默认值 + 文件/环境变量加载
// 覆写顺序: 默认值 → JSON 配置文件 → 环境变量
// ==========================================

use crate::config::field_rules::default_field_rules;
use crate::domain::field::{FieldMappingRule, InventoryField};
use crate::importer::error::{ImportError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

// ==========================================
// 环境变量键
// ==========================================
pub mod config_keys {
    pub const BATCH_SIZE: &str = "INVENTORY_IMPORT_BATCH_SIZE";
    pub const MAX_FILE_SIZE: &str = "INVENTORY_IMPORT_MAX_FILE_SIZE";
    pub const CHUNK_SIZE: &str = "INVENTORY_IMPORT_CHUNK_SIZE";
    pub const BATCH_DELAY_MS: &str = "INVENTORY_IMPORT_BATCH_DELAY_MS";
    pub const TIMEOUT_MS: &str = "INVENTORY_IMPORT_TIMEOUT_MS";
}

// ==========================================
// CsvImportConfig
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvImportConfig {
    // ===== 文件校验 =====
    pub max_file_size: u64,              // 文件大小上限（字节）
    pub allowed_extensions: Vec<String>, // 扩展名白名单（不含点）

    // ===== 解析 =====
    pub allowed_delimiters: Vec<char>,
    pub allowed_encodings: Vec<String>,
    pub auto_detect_delimiter: bool,
    pub auto_detect_encoding: bool,
    pub skip_empty_rows: bool,
    pub trim_whitespace: bool,
    pub sample_size: usize,          // 每列保留的样本数
    pub header_min_avg_length: f64,  // 表头平均长度阈值

    // ===== 映射与校验 =====
    pub case_sensitive_mapping: bool,
    pub default_values: BTreeMap<String, String>, // 字段键名 → 原始默认值
    pub field_mapping_rules: Vec<FieldMappingRule>,

    // ===== 导入 =====
    pub batch_size: usize,
    pub chunk_size: usize,           // 批内并发分组大小
    pub inter_batch_delay_ms: u64,   // 批间背压延时
    pub request_timeout_ms: u64,     // 单次外部调用超时
}

impl Default for CsvImportConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            allowed_extensions: vec!["csv".to_string(), "tsv".to_string(), "txt".to_string()],
            allowed_delimiters: vec![',', ';', '\t', '|'],
            allowed_encodings: vec![
                "UTF-8".to_string(),
                "ISO-8859-1".to_string(),
                "Windows-1252".to_string(),
            ],
            auto_detect_delimiter: true,
            auto_detect_encoding: true,
            skip_empty_rows: true,
            trim_whitespace: true,
            sample_size: 5,
            header_min_avg_length: 5.0,
            case_sensitive_mapping: false,
            default_values: BTreeMap::new(),
            field_mapping_rules: default_field_rules(),
            batch_size: 50,
            chunk_size: 5,
            inter_batch_delay_ms: 100,
            request_timeout_ms: 30_000,
        }
    }
}

impl CsvImportConfig {
    /// 从 JSON 文件加载（缺省键取默认值）
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ImportError::ConfigReadError {
            source_name: path.display().to_string(),
            message: e.to_string(),
        })?;

        let config: CsvImportConfig =
            serde_json::from_str(&raw).map_err(|e| ImportError::ConfigReadError {
                source_name: path.display().to_string(),
                message: e.to_string(),
            })?;

        debug!(path = %path.display(), "导入配置已从文件加载");
        config.validate()?;
        Ok(config)
    }

    /// 应用环境变量覆写
    pub fn with_env_overrides(self) -> PipelineResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// 应用覆写（lookup 返回键对应的原始值）
    pub fn with_overrides<F>(mut self, lookup: F) -> PipelineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(config_keys::BATCH_SIZE) {
            self.batch_size = parse_value(config_keys::BATCH_SIZE, &v)?;
        }
        if let Some(v) = lookup(config_keys::MAX_FILE_SIZE) {
            self.max_file_size = parse_value(config_keys::MAX_FILE_SIZE, &v)?;
        }
        if let Some(v) = lookup(config_keys::CHUNK_SIZE) {
            self.chunk_size = parse_value(config_keys::CHUNK_SIZE, &v)?;
        }
        if let Some(v) = lookup(config_keys::BATCH_DELAY_MS) {
            self.inter_batch_delay_ms = parse_value(config_keys::BATCH_DELAY_MS, &v)?;
        }
        if let Some(v) = lookup(config_keys::TIMEOUT_MS) {
            self.request_timeout_ms = parse_value(config_keys::TIMEOUT_MS, &v)?;
        }

        self.validate()?;
        Ok(self)
    }

    /// 配置合法性校验
    pub fn validate(&self) -> PipelineResult<()> {
        if self.batch_size == 0 {
            return Err(value_error("batch_size", "0", "批大小必须大于 0"));
        }
        if self.chunk_size == 0 {
            return Err(value_error("chunk_size", "0", "并发分组大小必须大于 0"));
        }
        if self.request_timeout_ms == 0 {
            return Err(value_error("request_timeout_ms", "0", "请求超时必须大于 0"));
        }
        if self.allowed_delimiters.is_empty() {
            return Err(value_error("allowed_delimiters", "[]", "分隔符列表不能为空"));
        }
        if self.field_mapping_rules.is_empty() {
            return Err(value_error("field_mapping_rules", "[]", "字段映射规则不能为空"));
        }

        let mut seen = HashSet::new();
        for rule in &self.field_mapping_rules {
            if !seen.insert(rule.field) {
                return Err(value_error(
                    "field_mapping_rules",
                    rule.field.key(),
                    "同一目标字段存在多条规则",
                ));
            }
        }

        for key in self.default_values.keys() {
            if key.parse::<InventoryField>().is_err() {
                warn!(key = %key, "默认值键不是已知库存字段，将被忽略");
            }
        }

        Ok(())
    }

    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> PipelineResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| value_error(key, value, &e.to_string()))
}

fn value_error(key: &str, value: &str, message: &str) -> ImportError {
    ImportError::ConfigValueError {
        key: key.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = CsvImportConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.chunk_size, 5);
        assert_eq!(config.inter_batch_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_overrides_applied() {
        let env: HashMap<&str, &str> = [
            (config_keys::BATCH_SIZE, "20"),
            (config_keys::BATCH_DELAY_MS, "0"),
        ]
        .into_iter()
        .collect();

        let config = CsvImportConfig::default()
            .with_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.batch_size, 20);
        assert_eq!(config.inter_batch_delay_ms, 0);
        assert_eq!(config.chunk_size, 5);
    }

    #[test]
    fn test_override_rejects_garbage() {
        let result = CsvImportConfig::default().with_overrides(|k| {
            (k == config_keys::CHUNK_SIZE).then(|| "many".to_string())
        });
        assert!(matches!(result, Err(ImportError::ConfigValueError { .. })));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let config = CsvImportConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_request_timeout_rejected() {
        let config = CsvImportConfig {
            request_timeout_ms: 0,
            ..Default::default()
        };
        match config.validate() {
            Err(ImportError::ConfigValueError { key, .. }) => assert_eq!(key, "request_timeout_ms"),
            other => panic!("expected ConfigValueError, got {:?}", other),
        }
    }

    #[test]
    fn test_from_json_file_partial() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, r#"{{ "batch_size": 7, "trim_whitespace": false }}"#).unwrap();

        let config = CsvImportConfig::from_json_file(temp_file.path()).unwrap();

        assert_eq!(config.batch_size, 7);
        assert!(!config.trim_whitespace);
        assert_eq!(config.field_mapping_rules.len(), 15);
    }

    #[test]
    fn test_duplicate_rule_rejected() {
        let mut config = CsvImportConfig::default();
        let dup = config.field_mapping_rules[0].clone();
        config.field_mapping_rules.push(dup);
        assert!(config.validate().is_err());
    }
}
