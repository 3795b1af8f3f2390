// ==========================================
// 库存 CSV 导入 - 管道阶段 Trait
// ==========================================
// 职责: 定义解析 / 映射 / 校验三个阶段的接口（不包含实现）
// 说明: 编排器以 Box<dyn Trait> 持有各阶段,配置变更时整体重建
// ==========================================

use crate::domain::import::{
    ColumnInfo, ColumnMapping, ImportPreview, MappingStatistics, MappingSuggestion,
    MappingValidation, RawTable,
};
use crate::importer::error::{ImportError, PipelineResult};
use std::collections::BTreeMap;
use std::path::Path;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件校验与解析（阶段 1）
// 实现者: CsvTextParser
pub trait FileParser: Send + Sync {
    /// 文件级校验（扩展名 / 大小 / 空文件）
    ///
    /// # 返回
    /// - 不通过原因列表（空列表 = 通过）,不抛错
    fn validate_file(&self, file_name: &str, file_size: u64) -> Vec<String>;

    /// 解析已解码文本
    ///
    /// # 参数
    /// - text: 文件全文
    /// - file_name: 文件名（用于编码提示）
    ///
    /// # 返回
    /// - Ok(RawTable): 至少一行数据
    /// - Err(EmptyFile): 去掉表头后无数据行
    fn parse_text(&self, text: &str, file_name: &str) -> PipelineResult<RawTable>;

    /// 解析原始字节（按检测出的编码解码）
    fn parse_bytes(&self, bytes: &[u8], file_name: &str) -> PipelineResult<RawTable>;

    /// 从磁盘读取并解析
    ///
    /// # 流程
    /// 1. validate_file（不通过 → FileRejected）
    /// 2. 读取字节
    /// 3. parse_bytes
    fn parse_file(&self, path: &Path) -> PipelineResult<RawTable> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let file_size = std::fs::metadata(path)?.len();

        let reasons = self.validate_file(&file_name, file_size);
        if !reasons.is_empty() {
            return Err(ImportError::FileRejected(reasons));
        }

        let bytes = std::fs::read(path)?;
        self.parse_bytes(&bytes, &file_name)
    }
}

// ==========================================
// ColumnMapper Trait
// ==========================================
// 用途: 列 → 目标字段映射（阶段 2）
// 实现者: HeuristicColumnMapper
pub trait ColumnMapper: Send + Sync {
    /// 自动映射（输入相同则输出相同）
    ///
    /// # 返回
    /// - 每列一条映射（按列序号排列）,未命中的列为未映射
    fn auto_map(&self, columns: &[ColumnInfo]) -> Vec<ColumnMapping>;

    /// 为仍未映射的列给出候选字段
    fn suggest_mappings(
        &self,
        columns: &[ColumnInfo],
        current: &[ColumnMapping],
    ) -> Vec<MappingSuggestion>;

    /// 映射集结构校验（必填字段恰好一次 / 字段不重复）
    fn validate_mappings(&self, mappings: &[ColumnMapping]) -> MappingValidation;

    /// 映射集统计（无副作用）
    fn mapping_statistics(&self, mappings: &[ColumnMapping]) -> MappingStatistics;
}

// ==========================================
// DataValidator Trait
// ==========================================
// 用途: 逐行校验与转换（阶段 3）
// 实现者: InventoryDataValidator
pub trait DataValidator: Send + Sync {
    /// 校验全部数据行,产出预览
    ///
    /// # 参数
    /// - table: 解析结果
    /// - mappings: 列映射
    /// - default_values: 字段键名 → 默认原始值（先于单元格写入）
    ///
    /// # 说明
    /// - 纯函数,无 I/O
    /// - 行级问题收集进 ImportPreview,不返回 Err
    fn validate_data(
        &self,
        table: &RawTable,
        mappings: &[ColumnMapping],
        default_values: &BTreeMap<String, String>,
    ) -> ImportPreview;
}
