// ==========================================
// 库存 CSV 导入管道 - 核心库
// ==========================================
// 流程: 解析 → 列映射 → 校验预览 → 批量导入
// 外部协作: 库存 REST 服务（分类 / 库位 / 物料）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 配置层 - 导入配置与字段规则
pub mod config;

// 导入层 - 管道各阶段与编排
pub mod importer;

// 网关层 - 外部库存服务
pub mod gateway;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{DataType, ExportFormat, ImportStatus, IssueSeverity, ItemStatus};

// 领域实体
pub use domain::{
    ColumnInfo, ColumnMapping, FailedItem, ImportPreview, ImportProgress, ImportResult,
    ImportSession, InventoryField, RawTable, RowIssue, ValidatedRecord,
};

// 配置
pub use config::CsvImportConfig;

// 导入层
pub use importer::{CancelFlag, CsvImportService, ImportError, PipelineResult};

// 网关
pub use gateway::{GatewayError, HttpInventoryGateway, InventoryGateway};

// ==========================================
// 版本信息
// ==========================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "库存 CSV 导入管道";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
