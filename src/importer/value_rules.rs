// ==========================================
// 库存 CSV 导入 - 字段级转换与校验实现
// ==========================================
// 职责: FieldTransform::apply / FieldValidator::validate
// 说明: 每个字段规则 = 一个转换策略 + 一个校验策略
// ==========================================

use crate::domain::field::{
    FieldCheck, FieldMappingRule, FieldTransform, FieldValidator, FieldValue,
};
use crate::domain::types::ItemStatus;
use crate::importer::data_cleaner::DataCleaner;

const CLEANER: DataCleaner = DataCleaner;

impl FieldTransform {
    /// 执行转换
    ///
    /// # 返回
    /// - Ok(String): 规范化后的单元格文本
    /// - Err(String): 转换失败原因（按字段错误处理）
    pub fn apply(&self, raw: &str) -> Result<String, String> {
        match self {
            FieldTransform::Trim => Ok(CLEANER.clean_text(raw, false)),
            FieldTransform::UpperCase => Ok(CLEANER.clean_text(raw, true)),
            FieldTransform::Money => CLEANER
                .parse_number(raw)
                .map(|v| v.to_string())
                .ok_or_else(|| format!("Invalid number format: '{}'", raw.trim())),
            FieldTransform::Integer => CLEANER
                .parse_integer(raw)
                .map(|v| v.to_string())
                .ok_or_else(|| format!("Invalid whole number: '{}'", raw.trim())),
            FieldTransform::Status => ItemStatus::parse(raw)
                .map(|s| s.as_str().to_string())
                .ok_or_else(|| format!("Unknown status: '{}'", raw.trim())),
            FieldTransform::Barcode => Ok(CLEANER.clean_barcode(raw.trim())),
        }
    }
}

impl FieldValidator {
    /// 校验单元格值并产出强类型值
    pub fn validate(&self, raw: &str) -> Result<FieldCheck, String> {
        let value = raw.trim();
        let len = value.chars().count();

        match self {
            FieldValidator::Code { max_len } => {
                if len > *max_len {
                    return Err(format!("Must be at most {} characters", max_len));
                }
                if !value
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
                {
                    return Err(
                        "Only letters, numbers, hyphens and underscores are allowed".to_string()
                    );
                }
                Ok(FieldCheck::ok(FieldValue::Text(value.to_string())))
            }
            FieldValidator::Name {
                max_len,
                warn_below,
            } => {
                if len > *max_len {
                    return Err(format!("Must be at most {} characters", max_len));
                }
                let text = FieldValue::Text(value.to_string());
                if len < *warn_below {
                    Ok(FieldCheck::with_warning(
                        text,
                        format!("Very short value (less than {} characters)", warn_below),
                    ))
                } else {
                    Ok(FieldCheck::ok(text))
                }
            }
            FieldValidator::Money { warn_above } => {
                let number = CLEANER
                    .parse_number(value)
                    .ok_or_else(|| "Must be a valid number".to_string())?;
                if number < 0.0 {
                    return Err("Cannot be negative".to_string());
                }
                match warn_above {
                    Some(limit) if number > *limit => Ok(FieldCheck::with_warning(
                        FieldValue::Number(number),
                        format!("Unusually high value (greater than {})", limit),
                    )),
                    _ => Ok(FieldCheck::ok(FieldValue::Number(number))),
                }
            }
            FieldValidator::Count { warn_above } => {
                let number = CLEANER
                    .parse_integer(value)
                    .ok_or_else(|| "Must be a whole number".to_string())?;
                if number < 0 {
                    return Err("Cannot be negative".to_string());
                }
                match warn_above {
                    Some(limit) if number > *limit => Ok(FieldCheck::with_warning(
                        FieldValue::Integer(number),
                        format!("Unusually high value (greater than {})", limit),
                    )),
                    _ => Ok(FieldCheck::ok(FieldValue::Integer(number))),
                }
            }
            FieldValidator::Status => ItemStatus::parse(value)
                .map(|s| FieldCheck::ok(FieldValue::Status(s)))
                .ok_or_else(|| {
                    "Must be one of: active/activo, inactive/inactivo, discontinued/descontinuado"
                        .to_string()
                }),
            FieldValidator::Barcode { min_len, max_len } => {
                if !value.chars().all(|c| c.is_ascii_digit()) {
                    return Err("Barcode must contain digits only".to_string());
                }
                let text = FieldValue::Text(value.to_string());
                if len < *min_len || len > *max_len {
                    Ok(FieldCheck::with_warning(
                        text,
                        format!(
                            "Unusual barcode length {} (expected {}-{} digits)",
                            len, min_len, max_len
                        ),
                    ))
                } else {
                    Ok(FieldCheck::ok(text))
                }
            }
            FieldValidator::Text { max_len } => match max_len {
                Some(limit) if len > *limit => {
                    Err(format!("Must be at most {} characters", limit))
                }
                _ => Ok(FieldCheck::ok(FieldValue::Text(value.to_string()))),
            },
            FieldValidator::TagList => Ok(FieldCheck::ok(FieldValue::Tags(
                CLEANER.split_tags(value),
            ))),
        }
    }

    /// 校验失败时给用户的修正建议
    pub fn suggestion(&self) -> Option<String> {
        match self {
            FieldValidator::Code { max_len } => Some(format!(
                "Use up to {} letters, digits, '-' or '_'",
                max_len
            )),
            FieldValidator::Money { .. } => {
                Some("Use a non-negative number such as 19.99".to_string())
            }
            FieldValidator::Count { .. } => {
                Some("Use a non-negative whole number such as 10".to_string())
            }
            FieldValidator::Status => {
                Some("Use active, inactive or discontinued".to_string())
            }
            FieldValidator::Barcode { .. } => Some("Remove letters and symbols".to_string()),
            FieldValidator::Name { max_len, .. } => {
                Some(format!("Shorten to {} characters", max_len))
            }
            FieldValidator::Text {
                max_len: Some(limit),
            } => Some(format!("Shorten to {} characters", limit)),
            FieldValidator::Text { max_len: None } | FieldValidator::TagList => None,
        }
    }
}

impl FieldMappingRule {
    /// 转换 + 校验
    pub fn check_value(&self, raw: &str) -> Result<FieldCheck, String> {
        let transformed = match &self.transform {
            Some(transform) => transform.apply(raw)?,
            None => raw.to_string(),
        };
        self.validator.validate(&transformed)
    }

    /// 样本值通过率（映射评分用）
    pub fn sample_pass_rate(&self, samples: &[String]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let passed = samples
            .iter()
            .filter(|s| self.check_value(s).is_ok())
            .count();
        passed as f64 / samples.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_field_rules;
    use crate::domain::field::InventoryField;

    fn rule(field: InventoryField) -> FieldMappingRule {
        default_field_rules()
            .into_iter()
            .find(|r| r.field == field)
            .unwrap()
    }

    #[test]
    fn test_money_transform_strips_symbols() {
        assert_eq!(FieldTransform::Money.apply("$1,234.56").unwrap(), "1234.56");
        assert!(FieldTransform::Money.apply("twelve").is_err());
    }

    #[test]
    fn test_status_transform_normalizes() {
        assert_eq!(FieldTransform::Status.apply("Activo").unwrap(), "active");
        assert!(FieldTransform::Status.apply("archived").is_err());
    }

    #[test]
    fn test_sku_validation() {
        let sku = rule(InventoryField::Sku);
        assert!(sku.check_value("ABC-1_x").is_ok());
        assert!(sku.check_value("ABC 1").is_err());
        assert!(sku.check_value(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_name_short_warning() {
        let check = rule(InventoryField::Name).check_value("X").unwrap();
        assert!(check.warning.is_some());
    }

    #[test]
    fn test_price_rules() {
        let price = rule(InventoryField::Price);
        let check = price.check_value("$1,234.56").unwrap();
        assert_eq!(check.value, FieldValue::Number(1234.56));
        assert!(check.warning.is_none());

        assert!(price.check_value("-5").is_err());
        assert!(price.check_value("2000000").unwrap().warning.is_some());
    }

    #[test]
    fn test_quantity_rules() {
        let qty = rule(InventoryField::Quantity);
        assert_eq!(
            qty.check_value("1,500").unwrap().value,
            FieldValue::Integer(1500)
        );
        assert!(qty.check_value("2.5").is_err());
        assert!(qty.check_value("150000").unwrap().warning.is_some());
    }

    #[test]
    fn test_barcode_rules() {
        let barcode = rule(InventoryField::Barcode);
        assert!(barcode.check_value("7501234567890").unwrap().warning.is_none());
        assert!(barcode.check_value("12345").unwrap().warning.is_some());
        assert!(barcode.check_value("75AB").is_err());
    }

    #[test]
    fn test_category_length_limit() {
        let category = rule(InventoryField::Category);
        assert!(category.check_value("Herramientas").is_ok());
        assert!(category.check_value(&"c".repeat(101)).is_err());
    }

    #[test]
    fn test_sample_pass_rate() {
        let price = rule(InventoryField::Price);
        let samples = vec!["1.00".to_string(), "abc".to_string()];
        assert!((price.sample_pass_rate(&samples) - 0.5).abs() < 1e-9);
        assert_eq!(price.sample_pass_rate(&[]), 0.0);
    }
}
