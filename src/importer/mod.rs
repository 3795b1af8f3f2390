// ==========================================
// 库存 CSV 导入 - 导入层
// ==========================================
// 职责: CSV 文本 → 原始表 → 列映射 → 校验预览 → 批量写入外部服务
// 阶段: FileParser → ColumnMapper → DataValidator → ImportEngine
// 编排: CsvImportService（会话状态机）
// ==========================================

// 模块声明
pub mod column_mapper;
pub mod csv_importer_trait;
pub mod data_cleaner;
pub mod data_validator;
pub mod error;
pub mod file_parser;
pub mod import_engine;
pub mod import_service;
pub mod type_inference;
pub mod value_rules;

// 重导出核心类型
pub use column_mapper::HeuristicColumnMapper;
pub use data_cleaner::DataCleaner;
pub use data_validator::InventoryDataValidator;
pub use error::{ImportError, PipelineResult};
pub use file_parser::CsvTextParser;
pub use import_engine::{CancelFlag, ImportEngine, ProgressCallback, CANCELLED_REASON};
pub use import_service::{CsvImportService, ExportReport, ExportSessionInfo, ExportSummary};

// 重导出 Trait 接口
pub use csv_importer_trait::{ColumnMapper, DataValidator, FileParser};
