// ==========================================
// 库存 CSV 导入 - 数据校验器实现
// ==========================================
// 职责: 逐行 默认值 → 转换 → 字段校验 → 跨字段校验 → 预览统计
// 规则:
//   - 转换失败等同字段校验错误,该字段留空
//   - minStock > maxStock 为阻断错误；cost > price、quantity < minStock 为警告
//   - 同一文件内 SKU 重复为警告
//   - 仅无错误且 SKU + 名称齐全的行进入 mapped_data
// ==========================================

use crate::domain::field::{FieldMappingRule, FieldValue, InventoryField};
use crate::domain::import::{
    ColumnMapping, ImportPreview, InventoryItemDraft, PreviewStatistics, RawTable, RowIssue,
    ValidatedRecord,
};
use crate::importer::csv_importer_trait::DataValidator;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// 预估速度（行/秒）
const ROWS_PER_SECOND: usize = 100;

pub struct InventoryDataValidator {
    rules: Vec<FieldMappingRule>,
}

impl InventoryDataValidator {
    pub fn new(rules: Vec<FieldMappingRule>) -> Self {
        Self { rules }
    }

    fn rule_for(&self, field: InventoryField) -> Option<&FieldMappingRule> {
        self.rules.iter().find(|r| r.field == field)
    }

    /// 预先校验默认值（非法默认值记录日志后忽略）
    fn resolve_defaults(
        &self,
        default_values: &BTreeMap<String, String>,
    ) -> Vec<(InventoryField, FieldValue)> {
        let mut resolved = Vec::new();
        for (key, raw) in default_values {
            let Ok(field) = key.parse::<InventoryField>() else {
                warn!(key = %key, "默认值键不是已知库存字段，已忽略");
                continue;
            };
            let Some(rule) = self.rule_for(field) else {
                continue;
            };
            match rule.check_value(raw) {
                Ok(check) => resolved.push((field, check.value)),
                Err(message) => {
                    warn!(field = %field, value = %raw, message = %message, "默认值未通过校验，已忽略")
                }
            }
        }
        resolved
    }

    /// 单行校验
    fn validate_row(
        &self,
        table: &RawTable,
        row_index: usize,
        active: &[(&ColumnMapping, &FieldMappingRule)],
        defaults: &[(InventoryField, FieldValue)],
    ) -> (InventoryItemDraft, Vec<RowIssue>, Vec<RowIssue>) {
        let row = row_index + 1;
        let mut item = InventoryItemDraft::default();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for (field, value) in defaults {
            // 默认值已通过规则校验
            let _ = item.apply(*field, value.clone());
        }

        for (mapping, rule) in active {
            let field = rule.field;
            let raw = table.cell(row_index, mapping.column_index);

            if raw.trim().is_empty() {
                let has_default = defaults.iter().any(|(f, _)| *f == field);
                if (rule.required || mapping.is_required) && !has_default {
                    errors.push(
                        RowIssue::error(row, field.key(), raw, "Required field is empty")
                            .with_suggestion(format!("Provide a value for {}", field)),
                    );
                }
                continue;
            }

            let transformed = match &mapping.transform {
                Some(transform) => match transform.apply(raw) {
                    Ok(value) => value,
                    Err(message) => {
                        let issue = RowIssue::error(row, field.key(), raw, message);
                        errors.push(match rule.validator.suggestion() {
                            Some(s) => issue.with_suggestion(s),
                            None => issue,
                        });
                        continue;
                    }
                },
                None => raw.to_string(),
            };

            match rule.validator.validate(&transformed) {
                Ok(check) => {
                    if let Some(message) = check.warning {
                        warnings.push(RowIssue::warning(row, field.key(), raw, message));
                    }
                    if let Err(message) = item.apply(field, check.value) {
                        errors.push(RowIssue::error(row, field.key(), raw, message));
                    }
                }
                Err(message) => {
                    let issue = RowIssue::error(row, field.key(), raw, message);
                    errors.push(match rule.validator.suggestion() {
                        Some(s) => issue.with_suggestion(s),
                        None => issue,
                    });
                }
            }
        }

        self.cross_field_checks(row, &item, &mut errors, &mut warnings);

        if errors.is_empty() && !item.has_required_fields() {
            let missing: Vec<&str> = [
                (InventoryField::Sku, &item.sku),
                (InventoryField::Name, &item.name),
            ]
            .into_iter()
            .filter(|(_, v)| v.as_deref().map_or(true, |s| s.trim().is_empty()))
            .map(|(f, _)| f.key())
            .collect();
            errors.push(RowIssue::error(
                row,
                missing.first().copied().unwrap_or("sku"),
                "",
                format!("Missing required fields: {}", missing.join(", ")),
            ));
        }

        (item, errors, warnings)
    }

    /// 跨字段校验
    fn cross_field_checks(
        &self,
        row: usize,
        item: &InventoryItemDraft,
        errors: &mut Vec<RowIssue>,
        warnings: &mut Vec<RowIssue>,
    ) {
        if let (Some(cost), Some(price)) = (item.cost, item.price) {
            if cost > price {
                warnings.push(
                    RowIssue::warning(
                        row,
                        InventoryField::Cost.key(),
                        cost.to_string(),
                        format!("Cost ({}) is greater than price ({})", cost, price),
                    )
                    .with_suggestion("Check the price and cost values"),
                );
            }
        }

        if let (Some(min), Some(max)) = (item.min_stock, item.max_stock) {
            if min > max {
                errors.push(
                    RowIssue::error(
                        row,
                        InventoryField::MinStock.key(),
                        min.to_string(),
                        format!(
                            "Minimum stock ({}) is greater than maximum stock ({})",
                            min, max
                        ),
                    )
                    .with_suggestion("Minimum stock must not exceed maximum stock"),
                );
            }
        }

        if let (Some(quantity), Some(min)) = (item.quantity, item.min_stock) {
            if quantity < min {
                warnings.push(RowIssue::warning(
                    row,
                    InventoryField::Quantity.key(),
                    quantity.to_string(),
                    format!("Quantity ({}) is below minimum stock ({})", quantity, min),
                ));
            }
        }
    }
}

impl DataValidator for InventoryDataValidator {
    fn validate_data(
        &self,
        table: &RawTable,
        mappings: &[ColumnMapping],
        default_values: &BTreeMap<String, String>,
    ) -> ImportPreview {
        let active: Vec<(&ColumnMapping, &FieldMappingRule)> = mappings
            .iter()
            .filter_map(|m| {
                let field = m.active_field()?;
                self.rule_for(field).map(|rule| (m, rule))
            })
            .collect();
        let defaults = self.resolve_defaults(default_values);

        let mut mapped_data = Vec::new();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut error_rows = 0usize;
        let mut warning_rows = 0usize;
        let mut first_seen_sku: HashMap<String, usize> = HashMap::new();

        for row_index in 0..table.rows.len() {
            let (item, row_errors, mut row_warnings) =
                self.validate_row(table, row_index, &active, &defaults);
            let row_number = row_index + 1;

            if let Some(sku) = item.sku.as_deref() {
                match first_seen_sku.get(sku) {
                    Some(first) => row_warnings.push(RowIssue::warning(
                        row_number,
                        InventoryField::Sku.key(),
                        sku,
                        format!("Duplicate SKU, first seen at row {}", first),
                    )),
                    None => {
                        first_seen_sku.insert(sku.to_string(), row_number);
                    }
                }
            }

            if !row_errors.is_empty() {
                error_rows += 1;
            }
            if !row_warnings.is_empty() {
                warning_rows += 1;
            }

            if row_errors.is_empty() && item.has_required_fields() {
                mapped_data.push(ValidatedRecord { row_number, item });
            }

            errors.extend(row_errors);
            warnings.extend(row_warnings);
        }

        let total_rows = table.rows.len();
        let statistics = PreviewStatistics {
            total_rows,
            valid_rows: mapped_data.len(),
            error_rows,
            warning_rows,
            mapped_fields: active.len(),
            unmapped_fields: mappings.len() - active.len(),
            estimated_seconds: total_rows.div_ceil(ROWS_PER_SECOND) as u64,
        };

        debug!(
            total_rows,
            valid_rows = statistics.valid_rows,
            error_rows,
            warning_rows,
            "数据校验完成"
        );

        ImportPreview {
            mapped_data,
            errors,
            warnings,
            statistics,
        }
    }
}
