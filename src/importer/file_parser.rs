// ==========================================
// 库存 CSV 导入 - 文件解析器实现
// ==========================================
// 职责: 文件校验 / 编码解码 / 分隔符检测 / 表头检测 / 列类型推断
// 支持: CSV / TSV / 任意单字符分隔文本
// ==========================================

use crate::config::CsvImportConfig;
use crate::domain::import::RawTable;
use crate::importer::csv_importer_trait::FileParser;
use crate::importer::error::{ImportError, PipelineResult};
use crate::importer::type_inference::{describe_column, is_date_value, is_numeric_value};
use csv::ReaderBuilder;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use tracing::{debug, warn};

/// 分隔符检测采样长度（字符）
const DELIMITER_SAMPLE_CHARS: usize = 1000;

const DEFAULT_ENCODING: &str = "UTF-8";

// ==========================================
// CsvTextParser
// ==========================================
pub struct CsvTextParser {
    config: CsvImportConfig,
}

impl CsvTextParser {
    pub fn new(config: CsvImportConfig) -> Self {
        Self { config }
    }

    /// 分隔符检测
    ///
    /// # 规则
    /// - 统计前 1000 个字符中各候选分隔符出现次数
    /// - 取次数最多者,平票或全零时保留默认（逗号）
    /// - 关闭自动检测时固定使用白名单第一个分隔符
    pub fn detect_delimiter(&self, text: &str) -> char {
        let allowed = &self.config.allowed_delimiters;
        let fallback = if allowed.contains(&',') || allowed.is_empty() {
            ','
        } else {
            allowed[0]
        };

        if !self.config.auto_detect_delimiter {
            return fallback;
        }

        let sample: String = text.chars().take(DELIMITER_SAMPLE_CHARS).collect();
        let mut best = (fallback, sample.matches(fallback).count());
        for &candidate in allowed {
            let count = sample.matches(candidate).count();
            if count > best.1 {
                best = (candidate, count);
            }
        }
        best.0
    }

    /// 编码检测（仅依据文件名提示,尽力而为）
    pub fn detect_encoding(&self, file_name: &str) -> String {
        if !self.config.auto_detect_encoding {
            return DEFAULT_ENCODING.to_string();
        }

        let lower = file_name.to_lowercase();
        if lower.contains("utf8") || lower.contains("utf-8") {
            DEFAULT_ENCODING.to_string()
        } else if lower.contains("iso") || lower.contains("latin") {
            "ISO-8859-1".to_string()
        } else {
            DEFAULT_ENCODING.to_string()
        }
    }

    /// 表头检测: 全部单元格非数值、非日期,且平均长度超过阈值
    pub fn looks_like_header(&self, row: &[String]) -> bool {
        if row.is_empty() {
            return false;
        }

        let all_labels = row
            .iter()
            .all(|cell| !is_numeric_value(cell) && !is_date_value(cell));
        let total_len: usize = row.iter().map(|cell| cell.trim().chars().count()).sum();
        let avg_len = total_len as f64 / row.len() as f64;

        all_labels && avg_len > self.config.header_min_avg_length
    }

    /// 读取全部记录（按配置 trim / 跳过空行）
    fn read_records(&self, text: &str, delimiter: char) -> PipelineResult<Vec<Vec<String>>> {
        if !delimiter.is_ascii() {
            return Err(ImportError::CsvParseError(format!(
                "分隔符必须为 ASCII 字符: {:?}",
                delimiter
            )));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .delimiter(delimiter as u8)
            .from_reader(text.as_bytes());

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let row: Vec<String> = record
                .iter()
                .map(|value| {
                    if self.config.trim_whitespace {
                        value.trim().to_string()
                    } else {
                        value.to_string()
                    }
                })
                .collect();

            // 跳过完全空白的行
            if self.config.skip_empty_rows && row.iter().all(|v| v.trim().is_empty()) {
                continue;
            }

            rows.push(row);
        }

        Ok(rows)
    }

    /// 解析已解码文本（编码由调用方给定）
    fn parse_decoded(&self, text: &str, encoding: String) -> PipelineResult<RawTable> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let delimiter = self.detect_delimiter(text);
        let mut rows = self.read_records(text, delimiter)?;

        if rows.is_empty() {
            return Err(ImportError::EmptyFile);
        }

        let has_headers = self.looks_like_header(&rows[0]);
        let header_row = if has_headers {
            Some(rows.remove(0))
        } else {
            None
        };

        if rows.is_empty() {
            return Err(ImportError::EmptyFile);
        }

        let width = rows
            .iter()
            .map(Vec::len)
            .chain(header_row.iter().map(Vec::len))
            .max()
            .unwrap_or(0);

        for row in rows.iter_mut() {
            row.resize(width, String::new());
        }

        let headers: Vec<String> = (0..width)
            .map(|i| {
                header_row
                    .as_ref()
                    .and_then(|h| h.get(i))
                    .map(|h| h.trim())
                    .filter(|h| !h.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Column {}", i + 1))
            })
            .collect();

        let columns = headers
            .into_iter()
            .enumerate()
            .map(|(index, header)| {
                let cells: Vec<&str> = rows.iter().map(|r| r[index].as_str()).collect();
                describe_column(index, header, &cells, self.config.sample_size)
            })
            .collect::<Vec<_>>();

        debug!(
            delimiter = ?delimiter,
            has_headers,
            columns = columns.len(),
            rows = rows.len(),
            encoding = %encoding,
            "CSV 解析完成"
        );

        Ok(RawTable {
            columns,
            total_rows: rows.len(),
            rows,
            has_headers,
            delimiter,
            encoding,
        })
    }
}

impl FileParser for CsvTextParser {
    fn validate_file(&self, file_name: &str, file_size: u64) -> Vec<String> {
        let mut reasons = Vec::new();

        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        let allowed = self
            .config
            .allowed_extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&extension));
        if !allowed {
            reasons.push(format!(
                "File type not allowed. Allowed extensions: {}",
                self.config.allowed_extensions.join(", ")
            ));
        }

        if file_size > self.config.max_file_size {
            reasons.push(format!(
                "File is too large ({} bytes). Maximum size is {} bytes",
                file_size, self.config.max_file_size
            ));
        }

        if file_size == 0 {
            reasons.push("File is empty".to_string());
        }

        reasons
    }

    fn parse_text(&self, text: &str, file_name: &str) -> PipelineResult<RawTable> {
        let encoding = self.detect_encoding(file_name);
        self.parse_decoded(text, encoding)
    }

    fn parse_bytes(&self, bytes: &[u8], file_name: &str) -> PipelineResult<RawTable> {
        let label = self.detect_encoding(file_name);
        let allowed = self
            .config
            .allowed_encodings
            .iter()
            .any(|e| e.eq_ignore_ascii_case(&label));
        if !allowed {
            return Err(ImportError::UnsupportedEncoding(label));
        }

        let encoding = Encoding::for_label(label.as_bytes())
            .ok_or_else(|| ImportError::UnsupportedEncoding(label.clone()))?;

        if encoding == UTF_8 {
            let (decoded, had_errors) = UTF_8.decode_with_bom_removal(bytes);
            if !had_errors {
                return self.parse_decoded(&decoded, label);
            }

            warn!(file_name = %file_name, "UTF-8 解码出现非法字节,回退到 Windows-1252");
            let (decoded, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            return self.parse_decoded(&decoded, WINDOWS_1252.name().to_string());
        }

        let (decoded, _, had_errors) = encoding.decode(bytes);
        if had_errors {
            warn!(file_name = %file_name, encoding = %label, "解码出现非法字节,已替换");
        }
        self.parse_decoded(&decoded, label)
    }
}
