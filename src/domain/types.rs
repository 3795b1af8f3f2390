// ==========================================
// 库存 CSV 导入 - 领域类型定义
// ==========================================
// 职责: 列数据类型 / 会话状态 / 问题级别 / 导出格式 / 库存状态
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 列数据类型 (Data Type)
// ==========================================
// 由解析器按列推断,映射器用于类型兼容度评分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Text,    // 文本
    Numeric, // 数值（含货币）
    Boolean, // 布尔（中英西多语）
    Date,    // 日期
    Unknown, // 无样本
}

impl DataType {
    /// 可区分度排序键（越小越先参与映射）
    ///
    /// text > numeric/date > boolean > unknown
    pub fn distinctness_rank(&self) -> u8 {
        match self {
            DataType::Text => 0,
            DataType::Numeric | DataType::Date => 1,
            DataType::Boolean => 2,
            DataType::Unknown => 3,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Text => write!(f, "text"),
            DataType::Numeric => write!(f, "numeric"),
            DataType::Boolean => write!(f, "boolean"),
            DataType::Date => write!(f, "date"),
            DataType::Unknown => write!(f, "unknown"),
        }
    }
}

// ==========================================
// 导入会话状态 (Import Status)
// ==========================================
// 状态机: uploading → parsing → mapping → preview → importing → completed|error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Uploading,
    Parsing,
    Mapping,
    Preview,
    Importing,
    Completed,
    Error,
}

impl ImportStatus {
    /// 是否终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportStatus::Completed | ImportStatus::Error)
    }

    /// 判断状态转换是否合法
    ///
    /// # 规则
    /// - 任意非终态都可以进入 Error
    /// - mapping ↔ preview 允许往返（预览后重新调整映射）
    pub fn can_transition_to(&self, next: ImportStatus) -> bool {
        use ImportStatus as S;

        if next == S::Error {
            return !self.is_terminal();
        }

        matches!(
            (self, next),
            (S::Uploading, S::Parsing)
                | (S::Parsing, S::Mapping)
                | (S::Mapping, S::Mapping)
                | (S::Mapping, S::Preview)
                | (S::Preview, S::Mapping)
                | (S::Preview, S::Preview)
                | (S::Preview, S::Importing)
                | (S::Importing, S::Completed)
        )
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportStatus::Uploading => write!(f, "uploading"),
            ImportStatus::Parsing => write!(f, "parsing"),
            ImportStatus::Mapping => write!(f, "mapping"),
            ImportStatus::Preview => write!(f, "preview"),
            ImportStatus::Importing => write!(f, "importing"),
            ImportStatus::Completed => write!(f, "completed"),
            ImportStatus::Error => write!(f, "error"),
        }
    }
}

// ==========================================
// 行级问题级别 (Issue Severity)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Error,   // 错误（阻断该行导入）
    Warning, // 警告（允许导入）
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueSeverity::Error => write!(f, "error"),
            IssueSeverity::Warning => write!(f, "warning"),
        }
    }
}

// ==========================================
// 导出格式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

// ==========================================
// 库存物料状态 (Item Status)
// ==========================================
// 源文件允许英/西双语写法,统一为英文规范值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Active,
    Inactive,
    Discontinued,
}

impl ItemStatus {
    /// 解析双语状态值（大小写不敏感）
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "active" | "activo" | "activa" => Some(ItemStatus::Active),
            "inactive" | "inactivo" | "inactiva" => Some(ItemStatus::Inactive),
            "discontinued" | "descontinuado" | "descontinuada" => Some(ItemStatus::Discontinued),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Active => "active",
            ItemStatus::Inactive => "inactive",
            ItemStatus::Discontinued => "discontinued",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
