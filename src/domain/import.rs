// ==========================================
// 库存 CSV 导入 - 导入领域模型
// ==========================================
// 职责: 原始表 / 列映射 / 校验记录 / 预览 / 导入结果 / 导入会话
// 生命周期: 仅在一次导入会话内
// ==========================================

use crate::domain::field::{FieldTransform, FieldValue, InventoryField};
use crate::domain::types::{DataType, ImportStatus, IssueSeverity, ItemStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ColumnInfo - 列描述
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub index: usize,               // 列序号（0 起）
    pub header: String,             // 列名（表头或合成的 "Column N"）
    pub sample_values: Vec<String>, // 前 N 个不同的非空样本
    pub data_type: DataType,        // 推断类型
    pub confidence: f64,            // 推断置信度 [0,1]
    pub null_count: usize,          // 空值数
    pub unique_count: usize,        // 不同非空值数
}

// ==========================================
// RawTable - 解析结果
// ==========================================
// 红线: 解析后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Vec<String>>, // 数据行（已按列数补齐）
    pub has_headers: bool,
    pub delimiter: char,
    pub encoding: String,
    pub total_rows: usize,
}

impl RawTable {
    /// 取单元格（越界返回空串）
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }
}

// ==========================================
// ColumnMapping - 列 → 目标字段
// ==========================================
// 未映射列: target_field = None, is_mapped = false, confidence = 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub column_index: usize,
    pub column_name: String,
    pub target_field: Option<InventoryField>,
    pub is_required: bool,
    pub is_mapped: bool,
    pub confidence: f64,
    pub transform: Option<FieldTransform>,
}

impl ColumnMapping {
    pub fn unmapped(column_index: usize, column_name: impl Into<String>) -> Self {
        Self {
            column_index,
            column_name: column_name.into(),
            target_field: None,
            is_required: false,
            is_mapped: false,
            confidence: 0.0,
            transform: None,
        }
    }

    /// 生效的目标字段（仅当 is_mapped）
    pub fn active_field(&self) -> Option<InventoryField> {
        if self.is_mapped {
            self.target_field
        } else {
            None
        }
    }
}

// ==========================================
// 映射建议 / 映射校验 / 映射统计
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCandidate {
    pub field: InventoryField,
    pub confidence: f64,
    pub reason: String, // 主要得分来源的可读说明
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingSuggestion {
    pub column_index: usize,
    pub column_name: String,
    pub candidates: Vec<FieldCandidate>, // 按置信度降序
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,   // 阻断
    pub warnings: Vec<String>, // 不阻断
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingStatistics {
    pub total_columns: usize,
    pub mapped_columns: usize,
    pub unmapped_columns: usize,
    pub required_mapped: usize,
    pub required_total: usize,
    pub average_confidence: f64, // 仅统计已映射列
}

// ==========================================
// InventoryItemDraft - 目标 schema 的部分实例
// ==========================================
// 仅包含已映射且校验通过的字段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryItemDraft {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub price: Option<f64>,
    pub cost: Option<f64>,
    pub quantity: Option<i64>,
    pub min_stock: Option<i64>,
    pub max_stock: Option<i64>,
    pub status: Option<ItemStatus>,
    pub barcode: Option<String>,
    pub supplier: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
}

impl InventoryItemDraft {
    /// 写入单字段值
    ///
    /// # 返回
    /// - Err: 值类型与字段不匹配（规则配置错误）
    pub fn apply(&mut self, field: InventoryField, value: FieldValue) -> Result<(), String> {
        use InventoryField as F;

        match (field, value) {
            (F::Sku, FieldValue::Text(v)) => self.sku = Some(v),
            (F::Name, FieldValue::Text(v)) => self.name = Some(v),
            (F::Description, FieldValue::Text(v)) => self.description = Some(v),
            (F::Category, FieldValue::Text(v)) => self.category = Some(v),
            (F::Location, FieldValue::Text(v)) => self.location = Some(v),
            (F::Barcode, FieldValue::Text(v)) => self.barcode = Some(v),
            (F::Supplier, FieldValue::Text(v)) => self.supplier = Some(v),
            (F::Notes, FieldValue::Text(v)) => self.notes = Some(v),
            (F::Price, FieldValue::Number(v)) => self.price = Some(v),
            (F::Cost, FieldValue::Number(v)) => self.cost = Some(v),
            (F::Quantity, FieldValue::Integer(v)) => self.quantity = Some(v),
            (F::MinStock, FieldValue::Integer(v)) => self.min_stock = Some(v),
            (F::MaxStock, FieldValue::Integer(v)) => self.max_stock = Some(v),
            (F::Status, FieldValue::Status(v)) => self.status = Some(v),
            (F::Tags, FieldValue::Tags(v)) => self.tags = v,
            (field, value) => {
                return Err(format!(
                    "value {:?} cannot be assigned to field {}",
                    value, field
                ))
            }
        }
        Ok(())
    }

    /// 必填字段（SKU + 名称）均非空
    pub fn has_required_fields(&self) -> bool {
        let present = |v: &Option<String>| {
            v.as_deref()
                .map(|s| !s.trim().is_empty())
                .unwrap_or(false)
        };
        present(&self.sku) && present(&self.name)
    }
}

// ==========================================
// ValidatedRecord - 通过校验的记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedRecord {
    pub row_number: usize, // 数据行号（1 起）
    pub item: InventoryItemDraft,
}

// ==========================================
// RowIssue - 行级错误 / 警告
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowIssue {
    pub row: usize,                 // 数据行号（1 起）
    pub field: String,              // 目标字段键名
    pub value: String,              // 原始单元格值
    pub message: String,            // 描述
    pub severity: IssueSeverity,    // error 阻断该行, warning 不阻断
    pub suggestion: Option<String>, // 修正建议
}

impl RowIssue {
    pub fn error(
        row: usize,
        field: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            row,
            field: field.into(),
            value: value.into(),
            message: message.into(),
            severity: IssueSeverity::Error,
            suggestion: None,
        }
    }

    pub fn warning(
        row: usize,
        field: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            row,
            field: field.into(),
            value: value.into(),
            message: message.into(),
            severity: IssueSeverity::Warning,
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

// ==========================================
// PreviewStatistics - 预览统计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviewStatistics {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub error_rows: usize,   // 至少一条错误的行
    pub warning_rows: usize, // 至少一条警告的行
    pub mapped_fields: usize,
    pub unmapped_fields: usize,
    pub estimated_seconds: u64, // ceil(total_rows / 100)
}

// ==========================================
// ImportPreview - 校验输出
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportPreview {
    pub mapped_data: Vec<ValidatedRecord>,
    pub errors: Vec<RowIssue>,
    pub warnings: Vec<RowIssue>,
    pub statistics: PreviewStatistics,
}

impl ImportPreview {
    /// 含错误的行号（升序去重）
    pub fn error_rows(&self) -> Vec<usize> {
        let mut rows: Vec<usize> = self.errors.iter().map(|e| e.row).collect();
        rows.sort_unstable();
        rows.dedup();
        rows
    }
}

// ==========================================
// ImportProgress - 导入进度
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportProgress {
    pub current: usize,
    pub total: usize,
    pub percentage: f64,
    pub current_operation: String,
    pub is_complete: bool,
    pub is_error: bool,
}

impl ImportProgress {
    pub fn stage(operation: impl Into<String>, percentage: f64) -> Self {
        Self {
            current: 0,
            total: 0,
            percentage,
            current_operation: operation.into(),
            is_complete: false,
            is_error: false,
        }
    }
}

// ==========================================
// FailedItem - 导入失败行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedItem {
    pub row_number: usize,
    pub sku: Option<String>,
    pub reason: String,
}

// ==========================================
// ImportResult - 导入结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub success: bool,
    pub imported_count: usize,
    pub error_count: usize, // 失败行数
    pub warning_count: usize,
    pub errors: Vec<RowIssue>,
    pub warnings: Vec<RowIssue>,
    pub duration_ms: u64,
    pub imported_items: Vec<ValidatedRecord>,
    pub failed_items: Vec<FailedItem>,
}

// ==========================================
// ImportSession - 导入会话
// ==========================================
// 红线: 仅由编排器修改；调用方负责不并发调用同一会话
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSession {
    pub id: String,
    pub file_name: String,
    pub file_size: u64,
    pub status: ImportStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub raw_table: Option<RawTable>,
    pub mappings: Vec<ColumnMapping>,
    pub preview: Option<ImportPreview>,
    pub result: Option<ImportResult>,
    pub progress: ImportProgress,
    pub error_message: Option<String>,
}

// ==========================================
// SessionStatistics - 会话统计（对外报表）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatistics {
    pub session_id: String,
    pub file_name: String,
    pub status: ImportStatus,
    pub total_rows: usize,
    pub total_columns: usize,
    pub mapped_columns: usize,
    pub valid_rows: usize,
    pub error_rows: usize,
    pub warning_rows: usize,
    pub imported_count: usize,
    pub failed_count: usize,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_rejects_mismatched_value() {
        let mut item = InventoryItemDraft::default();
        assert!(item
            .apply(InventoryField::Price, FieldValue::Text("abc".to_string()))
            .is_err());
        assert!(item.apply(InventoryField::Price, FieldValue::Number(2.5)).is_ok());
        assert_eq!(item.price, Some(2.5));
    }

    #[test]
    fn test_has_required_fields() {
        let mut item = InventoryItemDraft::default();
        item.sku = Some("A-1".to_string());
        assert!(!item.has_required_fields());
        item.name = Some("   ".to_string());
        assert!(!item.has_required_fields());
        item.name = Some("Widget".to_string());
        assert!(item.has_required_fields());
    }

    #[test]
    fn test_preview_error_rows_dedup() {
        let preview = ImportPreview {
            errors: vec![
                RowIssue::error(3, "sku", "", "missing"),
                RowIssue::error(1, "name", "", "missing"),
                RowIssue::error(3, "price", "x", "bad"),
            ],
            ..Default::default()
        };
        assert_eq!(preview.error_rows(), vec![1, 3]);
    }
}
