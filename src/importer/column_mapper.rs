// ==========================================
// 库存 CSV 导入 - 列映射器实现
// ==========================================
// 职责: 列 → 库存字段的启发式匹配 / 候选建议 / 映射集校验与统计
// 评分: (0.6 × 表头相似度 + 0.3 × 类型兼容度 + 0.1 × 样本通过率) × 规则权重
// 红线: 同一字段只能被一列占用；平分时取规则表中先出现者
// ==========================================

use crate::domain::field::{FieldMappingRule, InventoryField};
use crate::domain::import::{
    ColumnInfo, ColumnMapping, FieldCandidate, MappingStatistics, MappingSuggestion,
    MappingValidation,
};
use crate::domain::types::DataType;
use crate::importer::csv_importer_trait::ColumnMapper;
use rapidfuzz::distance::levenshtein;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// 最低匹配分（严格大于才算命中）
pub const MATCH_THRESHOLD: f64 = 0.3;

const HEADER_WEIGHT: f64 = 0.6;
const TYPE_WEIGHT: f64 = 0.3;
const SAMPLE_WEIGHT: f64 = 0.1;

/// 每列最多返回的候选数
const MAX_SUGGESTIONS: usize = 3;

/// 候选建议的最低分
const SUGGESTION_FLOOR: f64 = 0.1;

/// 低置信度提示阈值
const LOW_CONFIDENCE: f64 = 0.5;

// ==========================================
// MatchScore - 单个 (列, 规则) 的评分明细
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchScore {
    pub header: f64,
    pub type_compat: f64,
    pub samples: f64,
    pub total: f64,
}

// ==========================================
// HeuristicColumnMapper
// ==========================================
pub struct HeuristicColumnMapper {
    rules: Vec<FieldMappingRule>,
    case_sensitive: bool,
}

impl HeuristicColumnMapper {
    pub fn new(rules: Vec<FieldMappingRule>, case_sensitive: bool) -> Self {
        Self {
            rules,
            case_sensitive,
        }
    }

    pub fn rules(&self) -> &[FieldMappingRule] {
        &self.rules
    }

    /// 列名规范化: 大小写 / 分隔符 / 连续空白
    fn normalize(&self, value: &str) -> String {
        let replaced: String = value
            .trim()
            .chars()
            .map(|c| if matches!(c, '_' | '-' | '.') { ' ' } else { c })
            .collect();
        let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
        if self.case_sensitive {
            collapsed
        } else {
            collapsed.to_lowercase()
        }
    }

    /// 表头相似度（取所有模式中的最大值）
    ///
    /// - 完全相同 = 1.0
    /// - 互相包含 = 0.8
    /// - 其余为归一化 Levenshtein 相似度
    pub fn header_similarity(&self, header: &str, rule: &FieldMappingRule) -> f64 {
        let header = self.normalize(header);
        if header.is_empty() {
            return 0.0;
        }

        rule.patterns
            .iter()
            .map(|pattern| {
                let pattern = self.normalize(pattern);
                if pattern.is_empty() {
                    0.0
                } else if header == pattern {
                    1.0
                } else if header.contains(&pattern) || pattern.contains(&header) {
                    0.8
                } else {
                    levenshtein::normalized_similarity(header.chars(), pattern.chars())
                }
            })
            .fold(0.0, f64::max)
    }

    /// 类型兼容度
    pub fn type_compatibility(column_type: DataType, rule_type: DataType) -> f64 {
        if column_type == rule_type {
            return 1.0;
        }
        match (rule_type, column_type) {
            (DataType::Text, DataType::Numeric | DataType::Boolean | DataType::Date) => 0.7,
            _ => 0.2,
        }
    }

    /// 计算单个 (列, 规则) 的评分
    pub fn score(&self, column: &ColumnInfo, rule: &FieldMappingRule) -> MatchScore {
        let header = self.header_similarity(&column.header, rule);
        let type_compat = Self::type_compatibility(column.data_type, rule.data_type);
        let samples = rule.sample_pass_rate(&column.sample_values);

        let raw = HEADER_WEIGHT * header + TYPE_WEIGHT * type_compat + SAMPLE_WEIGHT * samples;
        MatchScore {
            header,
            type_compat,
            samples,
            total: (raw * rule.weight).clamp(0.0, 1.0),
        }
    }

    /// 列处理顺序: 置信度降序 → 类型可区分度 → 列序号
    fn processing_order<'a>(&self, columns: &'a [ColumnInfo]) -> Vec<&'a ColumnInfo> {
        let mut ordered: Vec<&ColumnInfo> = columns.iter().collect();
        ordered.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    a.data_type
                        .distinctness_rank()
                        .cmp(&b.data_type.distinctness_rank())
                })
                .then_with(|| a.index.cmp(&b.index))
        });
        ordered
    }

    fn mapped_for(
        &self,
        column: &ColumnInfo,
        rule: &FieldMappingRule,
        confidence: f64,
    ) -> ColumnMapping {
        ColumnMapping {
            column_index: column.index,
            column_name: column.header.clone(),
            target_field: Some(rule.field),
            is_required: rule.required,
            is_mapped: true,
            confidence,
            transform: rule.transform,
        }
    }

    /// 候选原因说明（取贡献最大的评分项）
    fn describe_reason(score: &MatchScore) -> String {
        if score.header >= 1.0 {
            "Exact column name match".to_string()
        } else if score.header >= 0.8 {
            "Column name contains a known name for this field".to_string()
        } else if score.header >= 0.5 {
            format!("Similar column name ({:.0}% similar)", score.header * 100.0)
        } else if score.type_compat >= 1.0 && score.samples >= 0.8 {
            "Data type and sample values fit this field".to_string()
        } else if score.type_compat >= 1.0 {
            "Data type matches this field".to_string()
        } else if score.samples >= 0.8 {
            "Sample values fit this field".to_string()
        } else {
            "Weak match".to_string()
        }
    }
}

impl ColumnMapper for HeuristicColumnMapper {
    fn auto_map(&self, columns: &[ColumnInfo]) -> Vec<ColumnMapping> {
        let mut claimed: HashSet<InventoryField> = HashSet::new();
        let mut by_index: BTreeMap<usize, ColumnMapping> = BTreeMap::new();

        for column in self.processing_order(columns) {
            let mut best: Option<(&FieldMappingRule, f64)> = None;

            for rule in self.rules.iter().filter(|r| !claimed.contains(&r.field)) {
                let score = self.score(column, rule).total;
                if score <= MATCH_THRESHOLD {
                    continue;
                }
                // 严格大于才替换 → 平分时保留规则表中先出现者
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((rule, score));
                }
            }

            let mapping = match best {
                Some((rule, confidence)) => {
                    claimed.insert(rule.field);
                    debug!(
                        column = %column.header,
                        field = %rule.field,
                        confidence,
                        "列已自动映射"
                    );
                    self.mapped_for(column, rule, confidence)
                }
                None => {
                    debug!(column = %column.header, "列未找到匹配字段");
                    ColumnMapping::unmapped(column.index, column.header.clone())
                }
            };
            by_index.insert(column.index, mapping);
        }

        by_index.into_values().collect()
    }

    fn suggest_mappings(
        &self,
        columns: &[ColumnInfo],
        current: &[ColumnMapping],
    ) -> Vec<MappingSuggestion> {
        let claimed: HashSet<InventoryField> =
            current.iter().filter_map(ColumnMapping::active_field).collect();
        let mapped_columns: HashSet<usize> = current
            .iter()
            .filter(|m| m.is_mapped)
            .map(|m| m.column_index)
            .collect();

        columns
            .iter()
            .filter(|c| !mapped_columns.contains(&c.index))
            .map(|column| {
                let mut candidates: Vec<FieldCandidate> = self
                    .rules
                    .iter()
                    .filter(|r| !claimed.contains(&r.field))
                    .map(|rule| (rule, self.score(column, rule)))
                    .filter(|(_, score)| score.total > SUGGESTION_FLOOR)
                    .map(|(rule, score)| FieldCandidate {
                        field: rule.field,
                        confidence: score.total,
                        reason: Self::describe_reason(&score),
                    })
                    .collect();

                // 稳定排序: 同分保持规则表顺序
                candidates.sort_by(|a, b| {
                    b.confidence
                        .partial_cmp(&a.confidence)
                        .unwrap_or(Ordering::Equal)
                });
                candidates.truncate(MAX_SUGGESTIONS);

                MappingSuggestion {
                    column_index: column.index,
                    column_name: column.header.clone(),
                    candidates,
                }
            })
            .collect()
    }

    fn validate_mappings(&self, mappings: &[ColumnMapping]) -> MappingValidation {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let mut claims: BTreeMap<InventoryField, Vec<&str>> = BTreeMap::new();
        for mapping in mappings {
            if let Some(field) = mapping.active_field() {
                claims
                    .entry(field)
                    .or_default()
                    .push(mapping.column_name.as_str());
            }
        }

        for rule in self.rules.iter().filter(|r| r.required) {
            if !claims.contains_key(&rule.field) {
                errors.push(format!("Required field '{}' is not mapped", rule.field));
            }
        }

        for (field, columns) in &claims {
            if columns.len() > 1 {
                errors.push(format!(
                    "Field '{}' is mapped to multiple columns: {}",
                    field,
                    columns.join(", ")
                ));
            }
        }

        let unmapped = mappings.iter().filter(|m| !m.is_mapped).count();
        if unmapped > 0 {
            warnings.push(format!(
                "{} column(s) are not mapped and will be ignored",
                unmapped
            ));
        }

        for mapping in mappings
            .iter()
            .filter(|m| m.is_mapped && m.confidence < LOW_CONFIDENCE)
        {
            warnings.push(format!(
                "Low confidence mapping for column '{}' ({:.0}%)",
                mapping.column_name,
                mapping.confidence * 100.0
            ));
        }

        MappingValidation {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    fn mapping_statistics(&self, mappings: &[ColumnMapping]) -> MappingStatistics {
        let mapped: Vec<&ColumnMapping> = mappings.iter().filter(|m| m.is_mapped).collect();
        let mapped_fields: HashSet<InventoryField> =
            mapped.iter().filter_map(|m| m.target_field).collect();

        let required_total = self.rules.iter().filter(|r| r.required).count();
        let required_mapped = self
            .rules
            .iter()
            .filter(|r| r.required && mapped_fields.contains(&r.field))
            .count();

        let average_confidence = if mapped.is_empty() {
            0.0
        } else {
            mapped.iter().map(|m| m.confidence).sum::<f64>() / mapped.len() as f64
        };

        MappingStatistics {
            total_columns: mappings.len(),
            mapped_columns: mapped.len(),
            unmapped_columns: mappings.len() - mapped.len(),
            required_mapped,
            required_total,
            average_confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_field_rules;

    fn mapper() -> HeuristicColumnMapper {
        HeuristicColumnMapper::new(default_field_rules(), false)
    }

    fn column(index: usize, header: &str, data_type: DataType, samples: &[&str]) -> ColumnInfo {
        ColumnInfo {
            index,
            header: header.to_string(),
            sample_values: samples.iter().map(|s| s.to_string()).collect(),
            data_type,
            confidence: 1.0,
            null_count: 0,
            unique_count: samples.len(),
        }
    }

    #[test]
    fn test_header_similarity_tiers() {
        let m = mapper();
        let rules = default_field_rules();
        let sku = &rules[0];
        assert_eq!(m.header_similarity("SKU", sku), 1.0);
        assert_eq!(m.header_similarity("product_code", sku), 1.0);
        assert_eq!(m.header_similarity("SKU Interno", sku), 0.8);
        let fuzzy = m.header_similarity("Codgo", sku);
        assert!(fuzzy > 0.5 && fuzzy < 1.0);
    }

    #[test]
    fn test_type_compatibility() {
        use DataType::*;
        assert_eq!(HeuristicColumnMapper::type_compatibility(Numeric, Numeric), 1.0);
        assert_eq!(HeuristicColumnMapper::type_compatibility(Numeric, Text), 0.7);
        assert_eq!(HeuristicColumnMapper::type_compatibility(Text, Numeric), 0.2);
    }

    #[test]
    fn test_auto_map_spanish_headers() {
        let columns = vec![
            column(0, "SKU", DataType::Text, &["ABC-1"]),
            column(1, "Nombre", DataType::Text, &["Widget"]),
            column(2, "Precio", DataType::Numeric, &["19.99"]),
            column(3, "Cantidad", DataType::Numeric, &["10"]),
        ];
        let mappings = mapper().auto_map(&columns);

        let fields: Vec<_> = mappings.iter().map(|m| m.target_field).collect();
        assert_eq!(
            fields,
            vec![
                Some(InventoryField::Sku),
                Some(InventoryField::Name),
                Some(InventoryField::Price),
                Some(InventoryField::Quantity),
            ]
        );
        assert!(mappings.iter().all(|m| m.is_mapped && m.confidence >= 0.3));
        assert!(mappings[0].is_required);
    }

    #[test]
    fn test_auto_map_deterministic() {
        let columns = vec![
            column(0, "Stock", DataType::Numeric, &["5"]),
            column(1, "Existencias", DataType::Numeric, &["7"]),
        ];
        let m = mapper();
        assert_eq!(m.auto_map(&columns), m.auto_map(&columns));
    }

    #[test]
    fn test_field_claimed_once() {
        let columns = vec![
            column(0, "Cantidad", DataType::Numeric, &["5"]),
            column(1, "Qty", DataType::Numeric, &["7"]),
        ];
        let mappings = mapper().auto_map(&columns);
        let quantity_count = mappings
            .iter()
            .filter(|m| m.active_field() == Some(InventoryField::Quantity))
            .count();
        assert_eq!(quantity_count, 1);
    }

    #[test]
    fn test_unmatched_column_is_unmapped() {
        let columns = vec![column(0, "zzzz", DataType::Unknown, &[])];
        let mappings = mapper().auto_map(&columns);
        assert!(!mappings[0].is_mapped);
        assert_eq!(mappings[0].target_field, None);
        assert_eq!(mappings[0].confidence, 0.0);
    }

    #[test]
    fn test_validate_mappings_duplicate_and_required() {
        let mut a = ColumnMapping::unmapped(0, "A");
        a.target_field = Some(InventoryField::Sku);
        a.is_mapped = true;
        a.confidence = 0.9;
        let mut b = a.clone();
        b.column_index = 1;
        b.column_name = "B".to_string();

        let result = mapper().validate_mappings(&[a, b, ColumnMapping::unmapped(2, "C")]);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("multiple columns")));
        assert!(result.errors.iter().any(|e| e.contains("'name'")));
        assert!(result.warnings.iter().any(|w| w.contains("1 column(s)")));
    }

    #[test]
    fn test_suggestions_for_unmapped_only() {
        let columns = vec![
            column(0, "SKU", DataType::Text, &["A-1"]),
            column(1, "Proveedr", DataType::Text, &["ACME"]),
        ];
        let m = mapper();
        let mut current = m.auto_map(&columns);
        current[1] = ColumnMapping::unmapped(1, "Proveedr");

        let suggestions = m.suggest_mappings(&columns, &current);
        assert_eq!(suggestions.len(), 1);
        let candidates = &suggestions[0].candidates;
        assert!(!candidates.is_empty() && candidates.len() <= 3);
        assert_eq!(candidates[0].field, InventoryField::Supplier);
        assert!(candidates.iter().all(|c| c.field != InventoryField::Sku));
        assert!(candidates
            .windows(2)
            .all(|w| w[0].confidence >= w[1].confidence));
    }

    #[test]
    fn test_mapping_statistics() {
        let columns = vec![
            column(0, "SKU", DataType::Text, &["A-1"]),
            column(1, "zzzz", DataType::Unknown, &[]),
        ];
        let m = mapper();
        let stats = m.mapping_statistics(&m.auto_map(&columns));
        assert_eq!(stats.total_columns, 2);
        assert_eq!(stats.mapped_columns, 1);
        assert_eq!(stats.unmapped_columns, 1);
        assert_eq!(stats.required_total, 2);
        assert_eq!(stats.required_mapped, 1);
        assert!(stats.average_confidence > 0.9);
    }
}
