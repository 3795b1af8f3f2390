// ==========================================
// 库存 CSV 导入 - 数据清洗器
// ==========================================
// 职责: TRIM / 货币与整数解析 / 多语布尔 / 标签拆分
// 说明: 解析器、映射器、校验器共用的值级原语
// ==========================================

/// 货币符号（解析数值前剥离）
const CURRENCY_SYMBOLS: [char; 5] = ['$', '€', '£', '¥', '₡'];

/// 多语布尔值（真）
const TRUE_VALUES: [&str; 9] = [
    "true", "yes", "y", "1", "verdadero", "sí", "si", "activo", "on",
];

/// 多语布尔值（假）
const FALSE_VALUES: [&str; 7] = ["false", "no", "n", "0", "falso", "inactivo", "off"];

#[derive(Debug, Clone, Copy, Default)]
pub struct DataCleaner;

impl DataCleaner {
    /// 清洗文本字段（TRIM + 可选 UPPER）
    pub fn clean_text(&self, value: &str, uppercase: bool) -> String {
        let trimmed = value.trim();
        if uppercase {
            trimmed.to_uppercase()
        } else {
            trimmed.to_string()
        }
    }

    /// 剥离货币符号、空白与千分位逗号
    pub fn strip_numeric_noise(&self, value: &str) -> String {
        value
            .trim()
            .chars()
            .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != ',' && !c.is_whitespace())
            .collect()
    }

    /// 解析金额/数值（"$1,234.56" → 1234.56）
    pub fn parse_number(&self, value: &str) -> Option<f64> {
        let stripped = self.strip_numeric_noise(value);
        if stripped.is_empty() || !stripped.chars().any(|c| c.is_ascii_digit()) {
            return None;
        }
        stripped.parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// 解析整数（允许千分位与 ".0" 结尾）
    pub fn parse_integer(&self, value: &str) -> Option<i64> {
        let stripped = self.strip_numeric_noise(value);
        if let Ok(v) = stripped.parse::<i64>() {
            return Some(v);
        }
        stripped
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64)
            .map(|v| v as i64)
    }

    /// 解析多语布尔值
    pub fn parse_boolean(&self, value: &str) -> Option<bool> {
        let lower = value.trim().to_lowercase();
        if TRUE_VALUES.contains(&lower.as_str()) {
            Some(true)
        } else if FALSE_VALUES.contains(&lower.as_str()) {
            Some(false)
        } else {
            None
        }
    }

    /// 拆分标签（逗号/分号/竖线分隔,去重保序）
    pub fn split_tags(&self, value: &str) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for tag in value.split(&[',', ';', '|'][..]) {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                tags.push(tag.to_string());
            }
        }
        tags
    }

    /// 条码清洗（去除空格与连字符）
    pub fn clean_barcode(&self, value: &str) -> String {
        value
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_basic() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.clean_text("  hello  ", false), "hello");
        assert_eq!(cleaner.clean_text("  hello  ", true), "HELLO");
    }

    #[test]
    fn test_parse_number_currency() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.parse_number("$1,234.56"), Some(1234.56));
        assert_eq!(cleaner.parse_number("€ 19.99"), Some(19.99));
        assert_eq!(cleaner.parse_number("-3"), Some(-3.0));
        assert_eq!(cleaner.parse_number("$"), None);
        assert_eq!(cleaner.parse_number("abc"), None);
        assert_eq!(cleaner.parse_number("inf"), None);
    }

    #[test]
    fn test_parse_integer() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.parse_integer("1,000"), Some(1000));
        assert_eq!(cleaner.parse_integer("10.0"), Some(10));
        assert_eq!(cleaner.parse_integer("10.5"), None);
        assert_eq!(cleaner.parse_integer("ten"), None);
    }

    #[test]
    fn test_parse_boolean_bilingual() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.parse_boolean("Sí"), Some(true));
        assert_eq!(cleaner.parse_boolean("VERDADERO"), Some(true));
        assert_eq!(cleaner.parse_boolean("inactivo"), Some(false));
        assert_eq!(cleaner.parse_boolean("0"), Some(false));
        assert_eq!(cleaner.parse_boolean("maybe"), None);
    }

    #[test]
    fn test_split_tags() {
        let cleaner = DataCleaner;
        assert_eq!(
            cleaner.split_tags("red; blue , Red|green,,"),
            vec!["red".to_string(), "blue".to_string(), "green".to_string()]
        );
    }

    #[test]
    fn test_clean_barcode() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.clean_barcode("750 1234-567890"), "7501234567890");
    }
}
