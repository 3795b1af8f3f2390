// ==========================================
// 库存 CSV 导入 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 行级问题不走此类型（收集进 ImportPreview / ImportResult）
// ==========================================

use crate::domain::types::ImportStatus;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件校验未通过: {}", .0.join("; "))]
    FileRejected(Vec<String>),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("不支持的字符编码: {0}")]
    UnsupportedEncoding(String),

    // ===== 解析错误 =====
    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("文件不包含任何数据行")]
    EmptyFile,

    // ===== 映射错误 =====
    #[error("列映射无效: {}", .0.join("; "))]
    InvalidMappings(Vec<String>),

    // ===== 会话时序错误 =====
    #[error("当前没有活动的导入会话")]
    NoActiveSession,

    #[error("会话状态不允许此操作: 期望 {expected}, 实际 {actual}")]
    InvalidSessionState {
        expected: String,
        actual: ImportStatus,
    },

    #[error("会话缺少前置产物: {0}")]
    MissingArtifact(&'static str),

    // ===== 配置错误 =====
    #[error("配置读取失败 (source: {source_name}): {message}")]
    ConfigReadError {
        source_name: String,
        message: String,
    },

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },

    // ===== 导出错误 =====
    #[error("结果导出失败: {0}")]
    ExportError(String),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::ExportError(err.to_string())
    }
}

/// Result 类型别名
pub type PipelineResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_rejected_lists_all_reasons() {
        let err = ImportError::FileRejected(vec!["too large".to_string(), "bad ext".to_string()]);
        let msg = err.to_string();
        assert!(msg.contains("too large"));
        assert!(msg.contains("bad ext"));
    }

    #[test]
    fn test_session_state_message() {
        let err = ImportError::InvalidSessionState {
            expected: "preview".to_string(),
            actual: ImportStatus::Mapping,
        };
        assert!(err.to_string().contains("mapping"));
    }
}
