// ==========================================
// 库存 CSV 导入 - 领域模型层
// ==========================================
// 职责: 定义导入管道的实体、类型、字段规则
// 红线: 不含 I/O,不含管道逻辑
// ==========================================

pub mod field;
pub mod import;
pub mod types;

// 重导出核心类型
pub use field::{
    FieldCheck, FieldMappingRule, FieldTransform, FieldValidator, FieldValue, InventoryField,
};
pub use import::{
    ColumnInfo, ColumnMapping, FailedItem, FieldCandidate, ImportPreview, ImportProgress,
    ImportResult, ImportSession, InventoryItemDraft, MappingStatistics, MappingSuggestion,
    MappingValidation, PreviewStatistics, RawTable, RowIssue, SessionStatistics,
    ValidatedRecord,
};
pub use types::{DataType, ExportFormat, ImportStatus, IssueSeverity, ItemStatus};
