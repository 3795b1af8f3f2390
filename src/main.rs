// ==========================================
// 库存 CSV 导入管道 - 命令行入口
// ==========================================
// 用法:
//   inventory-csv-import <csv_path> <api_base_url> [config.json]
// 环境变量覆写见 config::config_keys
// 输出: JSON 导入报告（stdout）
// ==========================================

use anyhow::{bail, Context};
use inventory_csv_import::config::CsvImportConfig;
use inventory_csv_import::gateway::HttpInventoryGateway;
use inventory_csv_import::importer::CsvImportService;
use inventory_csv_import::{logging, ExportFormat, ImportProgress};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let (Some(csv_path), Some(base_url)) = (args.next(), args.next()) else {
        bail!("usage: inventory-csv-import <csv_path> <api_base_url> [config.json]");
    };
    let csv_path = PathBuf::from(csv_path);

    let config = match args.next() {
        Some(path) => CsvImportConfig::from_json_file(&path)
            .with_context(|| format!("无法加载配置文件 {}", path))?,
        None => CsvImportConfig::default(),
    }
    .with_env_overrides()?;

    tracing::info!("==================================================");
    tracing::info!("{}", inventory_csv_import::APP_NAME);
    tracing::info!("系统版本: {}", inventory_csv_import::VERSION);
    tracing::info!("==================================================");

    let gateway = HttpInventoryGateway::new(&base_url, config.request_timeout())?;
    let mut service = CsvImportService::new(config, Arc::new(gateway))?;
    service.on_progress(Arc::new(|progress: &ImportProgress| {
        tracing::info!(
            percentage = progress.percentage,
            current = progress.current,
            total = progress.total,
            "{}",
            progress.current_operation
        );
    }));

    // === 步骤 1: 解析 + 自动映射 ===
    service
        .process_file(&csv_path)
        .with_context(|| format!("无法处理文件 {}", csv_path.display()))?;

    let validation = service.validate_mappings()?;
    for warning in &validation.warnings {
        tracing::warn!("{}", warning);
    }

    // === 步骤 2: 校验预览 ===
    let preview = service.generate_preview()?;
    tracing::info!(
        valid_rows = preview.statistics.valid_rows,
        error_rows = preview.statistics.error_rows,
        estimated_seconds = preview.statistics.estimated_seconds,
        "预览就绪"
    );

    // === 步骤 3: 导入 ===
    let result = service.execute_import().await?;
    tracing::info!(
        imported = result.imported_count,
        failed = result.error_count,
        duration_ms = result.duration_ms,
        "导入结束"
    );

    // === 步骤 4: 输出报告 ===
    println!("{}", service.export_results(ExportFormat::Json)?);
    Ok(())
}
