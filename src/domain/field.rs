// ==========================================
// 库存 CSV 导入 - 目标字段与映射规则
// ==========================================
// 职责: 目标库存字段 / 字段级校验器 / 字段级转换器 / 映射规则
// 红线: 仅定义数据,校验与转换实现位于 importer::value_rules
// ==========================================

use crate::domain::types::{DataType, ItemStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// InventoryField - 目标库存字段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InventoryField {
    Sku,
    Name,
    Description,
    Category,
    Location,
    Price,
    Cost,
    Quantity,
    MinStock,
    MaxStock,
    Status,
    Barcode,
    Supplier,
    Tags,
    Notes,
}

impl InventoryField {
    pub const ALL: [InventoryField; 15] = [
        InventoryField::Sku,
        InventoryField::Name,
        InventoryField::Description,
        InventoryField::Category,
        InventoryField::Location,
        InventoryField::Price,
        InventoryField::Cost,
        InventoryField::Quantity,
        InventoryField::MinStock,
        InventoryField::MaxStock,
        InventoryField::Status,
        InventoryField::Barcode,
        InventoryField::Supplier,
        InventoryField::Tags,
        InventoryField::Notes,
    ];

    /// 字段键名（与序列化名一致）
    pub fn key(&self) -> &'static str {
        match self {
            InventoryField::Sku => "sku",
            InventoryField::Name => "name",
            InventoryField::Description => "description",
            InventoryField::Category => "category",
            InventoryField::Location => "location",
            InventoryField::Price => "price",
            InventoryField::Cost => "cost",
            InventoryField::Quantity => "quantity",
            InventoryField::MinStock => "minStock",
            InventoryField::MaxStock => "maxStock",
            InventoryField::Status => "status",
            InventoryField::Barcode => "barcode",
            InventoryField::Supplier => "supplier",
            InventoryField::Tags => "tags",
            InventoryField::Notes => "notes",
        }
    }
}

impl fmt::Display for InventoryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for InventoryField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        InventoryField::ALL
            .iter()
            .copied()
            .find(|f| f.key().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown inventory field: {}", s))
    }
}

// ==========================================
// FieldValue - 校验通过后的强类型值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Integer(i64),
    Status(ItemStatus),
    Tags(Vec<String>),
}

// ==========================================
// FieldCheck - 单值校验结果
// ==========================================
// 校验失败以 Err(String) 返回；通过时可附带一条非阻断警告
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCheck {
    pub value: FieldValue,
    pub warning: Option<String>,
}

impl FieldCheck {
    pub fn ok(value: FieldValue) -> Self {
        Self {
            value,
            warning: None,
        }
    }

    pub fn with_warning(value: FieldValue, warning: impl Into<String>) -> Self {
        Self {
            value,
            warning: Some(warning.into()),
        }
    }
}

// ==========================================
// FieldValidator - 字段级校验策略
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldValidator {
    /// 字母数字 + `-` / `_`,长度上限
    Code { max_len: usize },
    /// 名称: 长度上限,过短给警告
    Name { max_len: usize, warn_below: usize },
    /// 非负金额,超过阈值给警告
    Money { warn_above: Option<f64> },
    /// 非负整数,超过阈值给警告
    Count { warn_above: Option<i64> },
    /// 双语状态枚举
    Status,
    /// 纯数字条码,长度区间外给警告
    Barcode { min_len: usize, max_len: usize },
    /// 自由文本,可选长度上限
    Text { max_len: Option<usize> },
    /// 逗号/分号分隔标签
    TagList,
}

// ==========================================
// FieldTransform - 字段级转换策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldTransform {
    /// 去除首尾空白
    Trim,
    /// 去除空白并转大写
    UpperCase,
    /// 去除货币符号与千分位 → 十进制字符串
    Money,
    /// 去除千分位 → 整数字符串
    Integer,
    /// 双语状态 → 规范英文值
    Status,
    /// 去除空格与连字符
    Barcode,
}

// ==========================================
// FieldMappingRule - 静态字段映射规则
// ==========================================
// 来源: CsvImportConfig.field_mapping_rules（可整体替换以支持其他 schema）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMappingRule {
    pub field: InventoryField,       // 目标字段
    pub patterns: Vec<String>,       // 列名匹配模式（英/西）
    pub weight: f64,                 // 相关性权重（最终分值乘数）
    pub data_type: DataType,         // 期望数据类型
    pub required: bool,              // 是否必填
    pub validator: FieldValidator,   // 值级校验
    pub transform: Option<FieldTransform>, // 值级转换
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_key_roundtrip() {
        for field in InventoryField::ALL {
            let parsed: InventoryField = field.key().parse().unwrap();
            assert_eq!(parsed, field);
        }
        assert_eq!("MINSTOCK".parse::<InventoryField>().unwrap(), InventoryField::MinStock);
        assert!("weight".parse::<InventoryField>().is_err());
    }

    #[test]
    fn test_field_serde_name_matches_key() {
        let json = serde_json::to_string(&InventoryField::MaxStock).unwrap();
        assert_eq!(json, "\"maxStock\"");
    }
}
