// ==========================================
// 库存 CSV 导入 - 配置层
// ==========================================
// 职责: 导入配置项与默认库存字段规则
// ==========================================

pub mod field_rules;
pub mod import_config;

// 重导出核心配置
pub use field_rules::default_field_rules;
pub use import_config::{config_keys, CsvImportConfig};
