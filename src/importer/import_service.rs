// ==========================================
// 库存 CSV 导入 - 导入编排器
// ==========================================
// 职责: 单个导入会话的生命周期 + 各阶段串联 + 进度 / 统计 / 导出
// 状态机: uploading → parsing → mapping ⇄ preview → importing → completed | error
// 红线:
//   - 调用顺序错误立即返回 InvalidSessionState / MissingArtifact,不静默忽略
//   - 会话只由本编排器修改；同一会话不得并发调用（调用方负责）
// ==========================================

use crate::config::CsvImportConfig;
use crate::domain::import::{
    ColumnMapping, FailedItem, ImportPreview, ImportProgress, ImportResult, ImportSession,
    MappingStatistics, MappingSuggestion, MappingValidation, RawTable, RowIssue,
    SessionStatistics,
};
use crate::domain::types::{ExportFormat, ImportStatus};
use crate::gateway::InventoryGateway;
use crate::importer::column_mapper::HeuristicColumnMapper;
use crate::importer::csv_importer_trait::{ColumnMapper, DataValidator, FileParser};
use crate::importer::data_validator::InventoryDataValidator;
use crate::importer::error::{ImportError, PipelineResult};
use crate::importer::file_parser::CsvTextParser;
use crate::importer::import_engine::{CancelFlag, ImportEngine, ProgressCallback};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// ExportReport - JSON 导出结构
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSessionInfo {
    pub id: String,
    pub file_name: String,
    pub file_size: u64,
    pub status: ImportStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub success: bool,
    pub total_rows: usize,
    pub imported_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportReport {
    pub session: ExportSessionInfo,
    pub summary: ExportSummary,
    pub errors: Vec<RowIssue>,
    pub warnings: Vec<RowIssue>,
    pub failed_items: Vec<FailedItem>,
}

// ==========================================
// CsvImportService
// ==========================================
pub struct CsvImportService {
    config: CsvImportConfig,
    gateway: Arc<dyn InventoryGateway>,
    parser: Box<dyn FileParser>,
    mapper: Box<dyn ColumnMapper>,
    validator: Box<dyn DataValidator>,
    engine: ImportEngine,
    cancel: CancelFlag,
    progress: Option<ProgressCallback>,
    session: Option<ImportSession>,
}

impl CsvImportService {
    /// 创建编排器
    ///
    /// # 返回
    /// - Err(ConfigValueError): 配置不合法
    pub fn new(
        config: CsvImportConfig,
        gateway: Arc<dyn InventoryGateway>,
    ) -> PipelineResult<Self> {
        config.validate()?;
        let cancel = CancelFlag::new();

        Ok(Self {
            parser: Box::new(CsvTextParser::new(config.clone())),
            mapper: Box::new(HeuristicColumnMapper::new(
                config.field_mapping_rules.clone(),
                config.case_sensitive_mapping,
            )),
            validator: Box::new(InventoryDataValidator::new(
                config.field_mapping_rules.clone(),
            )),
            engine: ImportEngine::new(gateway.clone(), &config, cancel.clone()),
            config,
            gateway,
            cancel,
            progress: None,
            session: None,
        })
    }

    /// 注册进度回调（阶段切换与每批结束时调用）
    pub fn on_progress(&mut self, callback: ProgressCallback) {
        self.engine.set_progress(Some(callback.clone()));
        self.progress = Some(callback);
    }

    pub fn config(&self) -> &CsvImportConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&ImportSession> {
        self.session.as_ref()
    }

    /// 取消句柄（可在导入进行中从其他任务调用）
    pub fn cancel_handle(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// 请求取消当前导入
    pub fn cancel_import(&self) {
        info!("收到取消导入请求");
        self.cancel.cancel();
    }

    /// 丢弃当前会话
    pub fn reset_session(&mut self) {
        if let Some(session) = self.session.take() {
            info!(session_id = %session.id, "会话已重置");
        }
        self.cancel.reset();
    }

    /// 运行时替换配置（重建解析/映射/校验/导入各阶段,保留当前会话）
    pub fn update_config(&mut self, config: CsvImportConfig) -> PipelineResult<()> {
        config.validate()?;

        self.parser = Box::new(CsvTextParser::new(config.clone()));
        self.mapper = Box::new(HeuristicColumnMapper::new(
            config.field_mapping_rules.clone(),
            config.case_sensitive_mapping,
        ));
        self.validator = Box::new(InventoryDataValidator::new(
            config.field_mapping_rules.clone(),
        ));
        let mut engine = ImportEngine::new(self.gateway.clone(), &config, self.cancel.clone());
        engine.set_progress(self.progress.clone());
        self.engine = engine;
        self.config = config;

        info!("导入配置已更新");
        Ok(())
    }

    // ==========================================
    // 阶段 1 + 2: 解析 + 自动映射
    // ==========================================

    /// 从磁盘文件开始新会话
    #[instrument(skip(self, path))]
    pub fn process_file(&mut self, path: &Path) -> PipelineResult<&ImportSession> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let file_size = std::fs::metadata(path)?.len();

        self.start_session(&file_name, file_size)?;
        let parsed = std::fs::read(path)
            .map_err(ImportError::from)
            .and_then(|bytes| self.parser.parse_bytes(&bytes, &file_name));
        self.finish_parsing(parsed)
    }

    /// 从已解码文本开始新会话
    #[instrument(skip(self, text))]
    pub fn process_text(&mut self, text: &str, file_name: &str) -> PipelineResult<&ImportSession> {
        self.start_session(file_name, text.len() as u64)?;
        let parsed = self.parser.parse_text(text, file_name);
        self.finish_parsing(parsed)
    }

    /// 创建会话并做文件级校验
    fn start_session(&mut self, file_name: &str, file_size: u64) -> PipelineResult<()> {
        let now = Utc::now();
        let session = ImportSession {
            id: Uuid::new_v4().to_string(),
            file_name: file_name.to_string(),
            file_size,
            status: ImportStatus::Uploading,
            created_at: now,
            updated_at: now,
            raw_table: None,
            mappings: Vec::new(),
            preview: None,
            result: None,
            progress: ImportProgress::stage("Uploading file", 0.0),
            error_message: None,
        };
        info!(session_id = %session.id, file_name = %file_name, file_size, "创建导入会话");
        self.session = Some(session);
        self.cancel.reset();

        let reasons = self.parser.validate_file(file_name, file_size);
        if !reasons.is_empty() {
            return Err(self.fail(ImportError::FileRejected(reasons)));
        }

        self.transition(ImportStatus::Parsing, "Parsing file", 10.0)
    }

    fn finish_parsing(
        &mut self,
        parsed: PipelineResult<RawTable>,
    ) -> PipelineResult<&ImportSession> {
        let table = parsed.map_err(|e| self.fail(e))?;
        let mappings = self.mapper.auto_map(&table.columns);

        info!(
            rows = table.total_rows,
            columns = table.columns.len(),
            mapped = mappings.iter().filter(|m| m.is_mapped).count(),
            "解析与自动映射完成"
        );

        let session = self.session_mut()?;
        session.raw_table = Some(table);
        session.mappings = mappings;
        self.transition(ImportStatus::Mapping, "Mapping columns", 30.0)?;
        self.session_ref()
    }

    // ==========================================
    // 映射调整
    // ==========================================

    /// 手动替换映射（回到 mapping 状态,清空旧预览）
    pub fn update_mappings(
        &mut self,
        mappings: Vec<ColumnMapping>,
    ) -> PipelineResult<MappingValidation> {
        self.require_status(&[ImportStatus::Mapping, ImportStatus::Preview])?;

        let column_count = self
            .session_ref()?
            .raw_table
            .as_ref()
            .map(|t| t.columns.len())
            .ok_or(ImportError::MissingArtifact("raw table"))?;

        let out_of_range: Vec<String> = mappings
            .iter()
            .filter(|m| m.column_index >= column_count)
            .map(|m| format!("Column index {} does not exist", m.column_index))
            .collect();
        if !out_of_range.is_empty() {
            return Err(ImportError::InvalidMappings(out_of_range));
        }

        let validation = self.mapper.validate_mappings(&mappings);
        let session = self.session_mut()?;
        session.mappings = mappings;
        session.preview = None;
        self.transition(ImportStatus::Mapping, "Mapping columns", 30.0)?;
        Ok(validation)
    }

    pub fn suggest_mappings(&self) -> PipelineResult<Vec<MappingSuggestion>> {
        let session = self.session_ref()?;
        let table = session
            .raw_table
            .as_ref()
            .ok_or(ImportError::MissingArtifact("raw table"))?;
        Ok(self.mapper.suggest_mappings(&table.columns, &session.mappings))
    }

    pub fn validate_mappings(&self) -> PipelineResult<MappingValidation> {
        Ok(self.mapper.validate_mappings(&self.session_ref()?.mappings))
    }

    pub fn mapping_statistics(&self) -> PipelineResult<MappingStatistics> {
        Ok(self.mapper.mapping_statistics(&self.session_ref()?.mappings))
    }

    // ==========================================
    // 阶段 3: 校验预览
    // ==========================================

    /// 生成预览
    ///
    /// # 返回
    /// - Err(InvalidMappings): 映射集结构校验不通过（会话保持 mapping 状态）
    #[instrument(skip(self))]
    pub fn generate_preview(&mut self) -> PipelineResult<&ImportPreview> {
        self.require_status(&[ImportStatus::Mapping, ImportStatus::Preview])?;

        let session = self.session_ref()?;
        let table = session
            .raw_table
            .as_ref()
            .ok_or(ImportError::MissingArtifact("raw table"))?;

        let validation = self.mapper.validate_mappings(&session.mappings);
        if !validation.is_valid {
            warn!(errors = ?validation.errors, "映射校验未通过");
            return Err(ImportError::InvalidMappings(validation.errors));
        }

        self.emit(ImportProgress::stage("Validating data", 50.0));
        let preview =
            self.validator
                .validate_data(table, &session.mappings, &self.config.default_values);

        info!(
            valid_rows = preview.statistics.valid_rows,
            error_rows = preview.statistics.error_rows,
            warning_rows = preview.statistics.warning_rows,
            "预览生成完成"
        );

        self.session_mut()?.preview = Some(preview);
        self.transition(ImportStatus::Preview, "Preview ready", 60.0)?;
        self.session_ref()?
            .preview
            .as_ref()
            .ok_or(ImportError::MissingArtifact("preview"))
    }

    // ==========================================
    // 阶段 4: 导入
    // ==========================================

    /// 执行导入
    #[instrument(skip(self))]
    pub async fn execute_import(&mut self) -> PipelineResult<&ImportResult> {
        self.require_status(&[ImportStatus::Preview])?;
        let preview = self
            .session_ref()?
            .preview
            .clone()
            .ok_or(ImportError::MissingArtifact("preview"))?;

        self.transition(ImportStatus::Importing, "Importing items", 70.0)?;

        let outcome = self
            .engine
            .import_data(&preview, self.config.batch_size)
            .await;
        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "导入过程出现异常");
                return Err(self.fail(e));
            }
        };

        let session = self.session_mut()?;
        session.progress = ImportProgress {
            current: result.imported_count + result.error_count,
            total: result.imported_count + result.error_count,
            percentage: 100.0,
            current_operation: "Import completed".to_string(),
            is_complete: true,
            is_error: !result.success,
        };
        session.status = ImportStatus::Completed;
        session.updated_at = Utc::now();
        session.result = Some(result);
        info!(session_id = %session.id, "导入会话完成");

        self.session_ref()?
            .result
            .as_ref()
            .ok_or(ImportError::MissingArtifact("import result"))
    }

    // ==========================================
    // 统计与导出
    // ==========================================

    pub fn session_statistics(&self) -> PipelineResult<SessionStatistics> {
        let session = self.session_ref()?;
        let table = session.raw_table.as_ref();
        let preview_stats = session.preview.as_ref().map(|p| &p.statistics);
        let result = session.result.as_ref();

        Ok(SessionStatistics {
            session_id: session.id.clone(),
            file_name: session.file_name.clone(),
            status: session.status,
            total_rows: table.map_or(0, |t| t.total_rows),
            total_columns: table.map_or(0, |t| t.columns.len()),
            mapped_columns: session.mappings.iter().filter(|m| m.is_mapped).count(),
            valid_rows: preview_stats.map_or(0, |s| s.valid_rows),
            error_rows: preview_stats.map_or(0, |s| s.error_rows),
            warning_rows: preview_stats.map_or(0, |s| s.warning_rows),
            imported_count: result.map_or(0, |r| r.imported_count),
            failed_count: result.map_or(0, |r| r.error_count),
            duration_ms: result.map_or(0, |r| r.duration_ms),
        })
    }

    /// 导出结果
    ///
    /// # 格式
    /// - Json: 会话元数据 + 汇总 + 全部错误/警告/失败行
    /// - Csv: 仅错误与警告（type,row,field,value,message,suggestion）
    pub fn export_results(&self, format: ExportFormat) -> PipelineResult<String> {
        let session = self.session_ref()?;
        let result = session
            .result
            .as_ref()
            .ok_or(ImportError::MissingArtifact("import result"))?;

        match format {
            ExportFormat::Json => {
                let report = ExportReport {
                    session: ExportSessionInfo {
                        id: session.id.clone(),
                        file_name: session.file_name.clone(),
                        file_size: session.file_size,
                        status: session.status,
                        created_at: session.created_at,
                        updated_at: session.updated_at,
                    },
                    summary: ExportSummary {
                        success: result.success,
                        total_rows: session.raw_table.as_ref().map_or(0, |t| t.total_rows),
                        imported_count: result.imported_count,
                        error_count: result.error_count,
                        warning_count: result.warning_count,
                        duration_ms: result.duration_ms,
                    },
                    errors: result.errors.clone(),
                    warnings: result.warnings.clone(),
                    failed_items: result.failed_items.clone(),
                };
                Ok(serde_json::to_string_pretty(&report)?)
            }
            ExportFormat::Csv => {
                let mut writer = csv::Writer::from_writer(Vec::new());
                writer.write_record(["type", "row", "field", "value", "message", "suggestion"])?;
                for issue in result.errors.iter().chain(result.warnings.iter()) {
                    writer.write_record([
                        issue.severity.to_string(),
                        issue.row.to_string(),
                        issue.field.clone(),
                        issue.value.clone(),
                        issue.message.clone(),
                        issue.suggestion.clone().unwrap_or_default(),
                    ])?;
                }
                let bytes = writer
                    .into_inner()
                    .map_err(|e| ImportError::ExportError(e.to_string()))?;
                String::from_utf8(bytes).map_err(|e| ImportError::ExportError(e.to_string()))
            }
        }
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn session_ref(&self) -> PipelineResult<&ImportSession> {
        self.session.as_ref().ok_or(ImportError::NoActiveSession)
    }

    fn session_mut(&mut self) -> PipelineResult<&mut ImportSession> {
        self.session.as_mut().ok_or(ImportError::NoActiveSession)
    }

    fn require_status(&self, allowed: &[ImportStatus]) -> PipelineResult<()> {
        let actual = self.session_ref()?.status;
        if allowed.contains(&actual) {
            return Ok(());
        }
        Err(ImportError::InvalidSessionState {
            expected: allowed
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" | "),
            actual,
        })
    }

    /// 状态切换 + 进度更新
    fn transition(
        &mut self,
        next: ImportStatus,
        operation: &str,
        percentage: f64,
    ) -> PipelineResult<()> {
        let session = self.session_mut()?;
        if !session.status.can_transition_to(next) {
            return Err(ImportError::InvalidSessionState {
                expected: format!("a state that can move to {}", next),
                actual: session.status,
            });
        }

        session.status = next;
        session.updated_at = Utc::now();
        session.progress = ImportProgress::stage(operation, percentage);
        let progress = session.progress.clone();
        self.emit(progress);
        Ok(())
    }

    /// 会话进入 error 状态,原错误原样返回
    fn fail(&mut self, err: ImportError) -> ImportError {
        if let Some(session) = self.session.as_mut() {
            error!(session_id = %session.id, error = %err, "导入会话失败");
            if session.status.can_transition_to(ImportStatus::Error) {
                session.status = ImportStatus::Error;
            }
            session.updated_at = Utc::now();
            session.error_message = Some(err.to_string());
            session.progress = ImportProgress {
                is_error: true,
                ..ImportProgress::stage(err.to_string(), session.progress.percentage)
            };
        }
        err
    }

    fn emit(&self, progress: ImportProgress) {
        if let Some(callback) = &self.progress {
            callback(&progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{
        CreatedItem, GatewayError, NewInventoryItem, ReferenceKind, ReferenceRecord,
    };
    use async_trait::async_trait;

    struct OkGateway;

    #[async_trait]
    impl InventoryGateway for OkGateway {
        async fn search_references(
            &self,
            _kind: ReferenceKind,
            _name: &str,
        ) -> Result<Vec<ReferenceRecord>, GatewayError> {
            Ok(vec![])
        }

        async fn create_reference(
            &self,
            _kind: ReferenceKind,
            name: &str,
            _color: Option<&str>,
        ) -> Result<ReferenceRecord, GatewayError> {
            Ok(ReferenceRecord {
                id: name.to_string(),
                name: name.to_string(),
            })
        }

        async fn list_references(
            &self,
            _kind: ReferenceKind,
        ) -> Result<Vec<ReferenceRecord>, GatewayError> {
            Ok(vec![])
        }

        async fn create_item(&self, item: &NewInventoryItem) -> Result<CreatedItem, GatewayError> {
            Ok(CreatedItem {
                id: item.sku.clone(),
            })
        }
    }

    fn service() -> CsvImportService {
        let config = CsvImportConfig {
            inter_batch_delay_ms: 0,
            ..Default::default()
        };
        CsvImportService::new(config, Arc::new(OkGateway)).unwrap()
    }

    #[test]
    fn test_calls_without_session_fail() {
        let mut s = service();
        assert!(matches!(s.generate_preview(), Err(ImportError::NoActiveSession)));
        assert!(matches!(s.suggest_mappings(), Err(ImportError::NoActiveSession)));
        assert!(matches!(
            s.export_results(ExportFormat::Json),
            Err(ImportError::NoActiveSession)
        ));
    }

    #[tokio::test]
    async fn test_import_before_preview_rejected() {
        let mut s = service();
        s.process_text("Codigo,Nombre\nA-1,Widget\n", "stock.csv").unwrap();
        let err = s.execute_import().await.unwrap_err();
        assert!(matches!(
            err,
            ImportError::InvalidSessionState {
                actual: ImportStatus::Mapping,
                ..
            }
        ));
    }

    #[test]
    fn test_rejected_file_marks_session_error() {
        let mut s = service();
        let err = s.process_text("a,b\n1,2\n", "stock.xlsx").unwrap_err();
        assert!(matches!(err, ImportError::FileRejected(_)));
        let session = s.session().unwrap();
        assert_eq!(session.status, ImportStatus::Error);
        assert!(session.error_message.is_some());
    }

    #[test]
    fn test_export_requires_result() {
        let mut s = service();
        s.process_text("Codigo,Nombre\nA-1,Widget\n", "stock.csv").unwrap();
        assert!(matches!(
            s.export_results(ExportFormat::Csv),
            Err(ImportError::MissingArtifact(_))
        ));
    }

    #[test]
    fn test_update_mappings_rejects_unknown_column() {
        let mut s = service();
        s.process_text("Codigo,Nombre\nA-1,Widget\n", "stock.csv").unwrap();
        let result = s.update_mappings(vec![ColumnMapping::unmapped(9, "ghost")]);
        assert!(matches!(result, Err(ImportError::InvalidMappings(_))));
    }

    #[test]
    fn test_update_config_keeps_session() {
        let mut s = service();
        s.process_text("Codigo,Nombre\nA-1,Widget\n", "stock.csv").unwrap();
        let config = CsvImportConfig {
            batch_size: 10,
            ..Default::default()
        };
        s.update_config(config).unwrap();
        assert_eq!(s.config().batch_size, 10);
        assert!(s.session().is_some());

        let bad = CsvImportConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(s.update_config(bad).is_err());
        assert_eq!(s.config().batch_size, 10);
    }
}
