// ==========================================
// 库存 CSV 导入 - 导入引擎
// ==========================================
// 职责: 剔除错误行 → 分批 → 批内分组并发创建 → 汇总结果
// 并发模型:
//   - 批与批严格串行,批间插入背压延时
//   - 批内按 chunk_size 分组,组内 join_all 并发
//   - 单行失败只记录到 failed_items,不影响同组/后续批次
// 进度: 每批结束发一次事件；最后一次为 100% 完成事件
// ==========================================

use crate::config::CsvImportConfig;
use crate::domain::import::{
    FailedItem, ImportPreview, ImportProgress, ImportResult, RowIssue, ValidatedRecord,
};
use crate::gateway::resolver::with_timeout;
use crate::gateway::{InventoryGateway, NewInventoryItem, ReferenceKind, ReferenceResolver};
use crate::importer::error::{ImportError, PipelineResult};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// 进度回调
pub type ProgressCallback = Arc<dyn Fn(&ImportProgress) + Send + Sync>;

/// 取消原因（未开始的行）
pub const CANCELLED_REASON: &str = "Import cancelled";

// ==========================================
// CancelFlag - 协作式取消信号
// ==========================================
// 在每批开始前检查；已发出的请求不会被中断
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ==========================================
// ImportEngine
// ==========================================
pub struct ImportEngine {
    gateway: Arc<dyn InventoryGateway>,
    chunk_size: usize,
    inter_batch_delay: Duration,
    request_timeout: Duration,
    cancel: CancelFlag,
    progress: Option<ProgressCallback>,
}

impl ImportEngine {
    pub fn new(
        gateway: Arc<dyn InventoryGateway>,
        config: &CsvImportConfig,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            gateway,
            chunk_size: config.chunk_size.max(1),
            inter_batch_delay: config.inter_batch_delay(),
            request_timeout: config.request_timeout(),
            cancel,
            progress: None,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn set_progress(&mut self, callback: Option<ProgressCallback>) {
        self.progress = callback;
    }

    fn emit(&self, progress: &ImportProgress) {
        if let Some(callback) = &self.progress {
            callback(progress);
        }
    }

    /// 导入预览中的有效行
    ///
    /// # 参数
    /// - preview: 校验输出
    /// - batch_size: 每批行数
    ///
    /// # 返回
    /// - Ok(ImportResult): 行级失败都收集在结果中
    /// - Err: 仅参数非法
    ///
    /// # 导入流程
    /// 1. 含错误的行直接记入 failed_items（不发请求）
    /// 2. 其余行按 batch_size 分批,批内按 chunk_size 并发
    /// 3. 批间延时,每批结束上报进度
    #[instrument(skip(self, preview), fields(rows = preview.mapped_data.len()))]
    pub async fn import_data(
        &self,
        preview: &ImportPreview,
        batch_size: usize,
    ) -> PipelineResult<ImportResult> {
        if batch_size == 0 {
            return Err(ImportError::ConfigValueError {
                key: "batch_size".to_string(),
                value: "0".to_string(),
                message: "批大小必须大于 0".to_string(),
            });
        }

        let start_time = Instant::now();
        self.cancel.reset();
        let resolver = ReferenceResolver::new(self.gateway.clone(), self.request_timeout);

        // === 步骤 1: 剔除含错误的行 ===
        let error_rows = preview.error_rows();
        let mut failed_items = Self::validation_failures(preview);

        let candidates: Vec<&ValidatedRecord> = preview
            .mapped_data
            .iter()
            .filter(|r| error_rows.binary_search(&r.row_number).is_err())
            .collect();

        let total = candidates.len();
        let batch_count = total.div_ceil(batch_size);
        info!(
            total,
            excluded = failed_items.len(),
            batches = batch_count,
            "开始导入"
        );

        // === 步骤 2: 分批导入 ===
        let mut imported_items = Vec::new();
        let mut import_errors = Vec::new();
        let mut processed = 0usize;
        let mut cancelled = false;

        for (batch_index, batch) in candidates.chunks(batch_size).enumerate() {
            if self.cancel.is_cancelled() {
                warn!(batch = batch_index + 1, "导入已取消，剩余行记为失败");
                for record in &candidates[processed..] {
                    failed_items.push(FailedItem {
                        row_number: record.row_number,
                        sku: record.item.sku.clone(),
                        reason: CANCELLED_REASON.to_string(),
                    });
                }
                cancelled = true;
                break;
            }

            // === 步骤 3: 批间背压 ===
            if batch_index > 0 && !self.inter_batch_delay.is_zero() {
                tokio::time::sleep(self.inter_batch_delay).await;
            }

            for chunk in batch.chunks(self.chunk_size) {
                let outcomes =
                    join_all(chunk.iter().map(|record| self.import_item(&resolver, record))).await;

                for (record, outcome) in chunk.iter().zip(outcomes) {
                    match outcome {
                        Ok(()) => imported_items.push((*record).clone()),
                        Err(reason) => {
                            warn!(row = record.row_number, reason = %reason, "行导入失败");
                            let sku = record.item.sku.clone();
                            import_errors.push(RowIssue::error(
                                record.row_number,
                                "sku",
                                sku.clone().unwrap_or_default(),
                                reason.clone(),
                            ));
                            failed_items.push(FailedItem {
                                row_number: record.row_number,
                                sku,
                                reason,
                            });
                        }
                    }
                }
            }

            processed += batch.len();
            debug!(
                batch = batch_index + 1,
                processed,
                total,
                "批次完成"
            );

            if processed < total {
                self.emit(&ImportProgress {
                    current: processed,
                    total,
                    percentage: processed as f64 / total as f64 * 100.0,
                    current_operation: format!(
                        "Imported batch {} of {}",
                        batch_index + 1,
                        batch_count
                    ),
                    is_complete: false,
                    is_error: false,
                });
            }
        }

        // === 步骤 4: 完成事件 + 汇总 ===
        failed_items.sort_by_key(|f| f.row_number);
        let final_event = if cancelled {
            ImportProgress {
                current: processed,
                total,
                percentage: processed as f64 / total as f64 * 100.0,
                current_operation: CANCELLED_REASON.to_string(),
                is_complete: true,
                is_error: true,
            }
        } else {
            ImportProgress {
                current: total,
                total,
                percentage: 100.0,
                current_operation: "Import completed".to_string(),
                is_complete: true,
                is_error: !failed_items.is_empty(),
            }
        };
        self.emit(&final_event);

        let mut errors = preview.errors.clone();
        errors.extend(import_errors);

        let result = ImportResult {
            success: failed_items.is_empty(),
            imported_count: imported_items.len(),
            error_count: failed_items.len(),
            warning_count: preview.warnings.len(),
            errors,
            warnings: preview.warnings.clone(),
            duration_ms: start_time.elapsed().as_millis() as u64,
            imported_items,
            failed_items,
        };

        info!(
            imported = result.imported_count,
            failed = result.error_count,
            elapsed_ms = result.duration_ms,
            "导入完成"
        );

        Ok(result)
    }

    /// 校验失败行 → FailedItem（原因合并该行全部错误）
    fn validation_failures(preview: &ImportPreview) -> Vec<FailedItem> {
        let mut by_row: BTreeMap<usize, Vec<&RowIssue>> = BTreeMap::new();
        for issue in &preview.errors {
            by_row.entry(issue.row).or_default().push(issue);
        }

        by_row
            .into_iter()
            .map(|(row_number, issues)| FailedItem {
                row_number,
                sku: issues
                    .iter()
                    .find(|i| i.field == "sku" && !i.value.is_empty())
                    .map(|i| i.value.clone()),
                reason: issues
                    .iter()
                    .map(|i| format!("{}: {}", i.field, i.message))
                    .collect::<Vec<_>>()
                    .join("; "),
            })
            .collect()
    }

    /// 单行导入: 解析分类/库位 → 创建物料
    async fn import_item(
        &self,
        resolver: &ReferenceResolver,
        record: &ValidatedRecord,
    ) -> Result<(), String> {
        let item = &record.item;
        let category_id = resolver
            .resolve(ReferenceKind::Category, item.category.as_deref().unwrap_or(""))
            .await;
        let location_id = resolver
            .resolve(ReferenceKind::Location, item.location.as_deref().unwrap_or(""))
            .await;

        let payload = NewInventoryItem::from_draft(item, category_id, location_id)
            .ok_or_else(|| "Missing required fields (sku, name)".to_string())?;

        with_timeout(self.request_timeout, self.gateway.create_item(&payload))
            .await
            .map(|created| {
                debug!(row = record.row_number, id = %created.id, "物料已创建");
            })
            .map_err(|e| format!("Failed to create item: {}", e))
    }
}
