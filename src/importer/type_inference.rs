// ==========================================
// 库存 CSV 导入 - 列类型推断
// ==========================================
// 职责: 数值/布尔/日期识别 + 列级多数投票 + 样本/空值/去重统计
// 规则:
//   - 三类识别互不排斥（"1" 同时计入数值与布尔）
//   - 平票优先级: numeric > date > boolean
//   - 不属于任何类型的值多于获胜类型 → text
//   - confidence = 获胜类型命中数 / 非空值数
// ==========================================

use crate::domain::import::ColumnInfo;
use crate::domain::types::DataType;
use crate::importer::data_cleaner::DataCleaner;
use chrono::NaiveDate;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// 日期格式中年/月/日的位置
#[derive(Debug, Clone, Copy)]
enum DateOrder {
    YearMonthDay,
    MonthDayYear,
    MonthDayShortYear,
}

fn date_shapes() -> &'static [(Regex, DateOrder)] {
    static SHAPES: OnceLock<Vec<(Regex, DateOrder)>> = OnceLock::new();
    SHAPES.get_or_init(|| {
        [
            (r"^(\d{4})-(\d{1,2})-(\d{1,2})$", DateOrder::YearMonthDay),
            (r"^(\d{1,2})/(\d{1,2})/(\d{4})$", DateOrder::MonthDayYear),
            (r"^(\d{1,2})-(\d{1,2})-(\d{4})$", DateOrder::MonthDayYear),
            (r"^(\d{4})/(\d{1,2})/(\d{1,2})$", DateOrder::YearMonthDay),
            (r"^(\d{1,2})/(\d{1,2})/(\d{2})$", DateOrder::MonthDayShortYear),
        ]
        .into_iter()
        .filter_map(|(pattern, order)| Regex::new(pattern).ok().map(|re| (re, order)))
        .collect()
    })
}

/// 是否为合法日期（五种固定格式 + 日历校验）
pub fn is_date_value(value: &str) -> bool {
    let value = value.trim();
    date_shapes().iter().any(|(re, order)| {
        let Some(caps) = re.captures(value) else {
            return false;
        };
        let part = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
        let (Some(a), Some(b), Some(c)) = (part(1), part(2), part(3)) else {
            return false;
        };
        let (year, month, day) = match order {
            DateOrder::YearMonthDay => (a as i32, b, c),
            DateOrder::MonthDayYear => (c as i32, a, b),
            DateOrder::MonthDayShortYear => (2000 + c as i32, a, b),
        };
        NaiveDate::from_ymd_opt(year, month, day).is_some()
    })
}

/// 是否为数值（允许货币符号与千分位）
pub fn is_numeric_value(value: &str) -> bool {
    DataCleaner.parse_number(value).is_some()
}

/// 是否为多语布尔值
pub fn is_boolean_value(value: &str) -> bool {
    DataCleaner.parse_boolean(value).is_some()
}

/// 对一组非空值投票得出类型与置信度
pub fn classify_values(values: &[&str]) -> (DataType, f64) {
    if values.is_empty() {
        return (DataType::Unknown, 0.0);
    }

    let mut numeric = 0usize;
    let mut date = 0usize;
    let mut boolean = 0usize;
    let mut untyped = 0usize;

    for value in values {
        let is_num = is_numeric_value(value);
        let is_date = is_date_value(value);
        let is_bool = is_boolean_value(value);
        if is_num {
            numeric += 1;
        }
        if is_date {
            date += 1;
        }
        if is_bool {
            boolean += 1;
        }
        if !is_num && !is_date && !is_bool {
            untyped += 1;
        }
    }

    // 按优先级排列,严格大于才替换 → 平票保留先出现者
    let mut winner = (DataType::Numeric, numeric);
    for candidate in [(DataType::Date, date), (DataType::Boolean, boolean)] {
        if candidate.1 > winner.1 {
            winner = candidate;
        }
    }

    let total = values.len() as f64;
    if winner.1 == 0 || untyped > winner.1 {
        return (DataType::Text, untyped as f64 / total);
    }
    (winner.0, winner.1 as f64 / total)
}

/// 构建列描述
///
/// # 参数
/// - cells: 该列在所有数据行中的原始值（已按配置 trim）
/// - sample_size: 保留的不同非空样本数
pub fn describe_column(
    index: usize,
    header: String,
    cells: &[&str],
    sample_size: usize,
) -> ColumnInfo {
    let non_empty: Vec<&str> = cells
        .iter()
        .copied()
        .filter(|v| !v.trim().is_empty())
        .collect();

    let mut seen = HashSet::new();
    let mut sample_values = Vec::new();
    for value in &non_empty {
        if seen.insert(*value) && sample_values.len() < sample_size {
            sample_values.push(value.to_string());
        }
    }

    let (data_type, confidence) = classify_values(&non_empty);

    ColumnInfo {
        index,
        header,
        sample_values,
        data_type,
        confidence,
        null_count: cells.len() - non_empty.len(),
        unique_count: seen.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_shapes() {
        assert!(is_date_value("2024-01-31"));
        assert!(is_date_value("1/31/2024"));
        assert!(is_date_value("01-31-2024"));
        assert!(is_date_value("2024/1/5"));
        assert!(is_date_value("12/25/24"));
        assert!(!is_date_value("2024-02-30"));
        assert!(!is_date_value("31/12/2024"));
        assert!(!is_date_value("2024.01.01"));
    }

    #[test]
    fn test_currency_is_numeric() {
        let (ty, conf) = classify_values(&["$1,234.56", "19.99", "€5"]);
        assert_eq!(ty, DataType::Numeric);
        assert!((conf - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_one_prefers_numeric() {
        let (ty, _) = classify_values(&["1", "0", "1"]);
        assert_eq!(ty, DataType::Numeric);
    }

    #[test]
    fn test_bilingual_boolean() {
        let (ty, conf) = classify_values(&["sí", "no", "verdadero", "falso"]);
        assert_eq!(ty, DataType::Boolean);
        assert!((conf - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_mostly_text_wins() {
        let (ty, conf) = classify_values(&["Widget", "Gadget", "12"]);
        assert_eq!(ty, DataType::Text);
        assert!((conf - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_plurality_numeric_with_noise() {
        let (ty, conf) = classify_values(&["10", "20", "n/a"]);
        assert_eq!(ty, DataType::Numeric);
        assert!((conf - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_column_unknown() {
        let info = describe_column(2, "Notes".to_string(), &["", "  ", ""], 5);
        assert_eq!(info.data_type, DataType::Unknown);
        assert_eq!(info.confidence, 0.0);
        assert_eq!(info.null_count, 3);
        assert_eq!(info.unique_count, 0);
    }

    #[test]
    fn test_samples_are_first_distinct() {
        let cells = ["a", "b", "a", "", "c", "d"];
        let info = describe_column(0, "Letters".to_string(), &cells, 2);
        assert_eq!(info.sample_values, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(info.unique_count, 4);
        assert_eq!(info.null_count, 1);
    }
}
