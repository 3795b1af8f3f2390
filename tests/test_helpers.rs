// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 内存库存网关 Mock + CSV 测试数据构造
// ==========================================

#![allow(dead_code)]

use async_trait::async_trait;
use inventory_csv_import::config::CsvImportConfig;
use inventory_csv_import::gateway::{
    CreatedItem, GatewayError, InventoryGateway, NewInventoryItem, ReferenceKind, ReferenceRecord,
};
use inventory_csv_import::importer::CsvImportService;
use std::collections::HashSet;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;

/// create_item 调用日志
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemCall {
    Started(String),
    Finished(String),
}

// ==========================================
// MockGateway - 内存库存服务
// ==========================================
#[derive(Default)]
pub struct MockGateway {
    pub categories: Mutex<Vec<ReferenceRecord>>,
    pub locations: Mutex<Vec<ReferenceRecord>>,
    pub items: Mutex<Vec<NewInventoryItem>>,
    pub fail_skus: HashSet<String>,
    pub fail_reference_creation: bool,
    pub reference_creates: AtomicUsize,
    pub item_calls: AtomicUsize,
    pub item_delay: Duration,
    pub slow_skus: HashSet<String>,
    pub slow_delay: Duration,
    pub in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
    pub call_log: Mutex<Vec<ItemCall>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定 SKU 创建时返回 500
    pub fn failing_on(skus: &[&str]) -> Self {
        Self {
            fail_skus: skus.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    /// 引用创建全部失败,且预置兜底记录
    pub fn with_fallbacks(categories: &[(&str, &str)], locations: &[(&str, &str)]) -> Self {
        let to_records = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(id, name)| ReferenceRecord {
                    id: id.to_string(),
                    name: name.to_string(),
                })
                .collect::<Vec<_>>()
        };
        Self {
            categories: Mutex::new(to_records(categories)),
            locations: Mutex::new(to_records(locations)),
            fail_reference_creation: true,
            ..Self::default()
        }
    }

    /// 每次 create_item 先等待 delay
    pub fn with_item_delay(delay: Duration) -> Self {
        Self {
            item_delay: delay,
            ..Self::default()
        }
    }

    /// 指定 SKU 的 create_item 挂起 delay（用于触发超时）
    pub fn stalling_on(skus: &[&str], delay: Duration) -> Self {
        Self {
            slow_skus: skus.iter().map(|s| s.to_string()).collect(),
            slow_delay: delay,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<ItemCall> {
        self.call_log.lock().unwrap().clone()
    }

    pub fn created_skus(&self) -> Vec<String> {
        let mut skus: Vec<String> = self
            .items
            .lock()
            .unwrap()
            .iter()
            .map(|i| i.sku.clone())
            .collect();
        skus.sort();
        skus
    }

    pub fn item(&self, sku: &str) -> Option<NewInventoryItem> {
        self.items
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.sku == sku)
            .cloned()
    }

    fn store(&self, kind: ReferenceKind) -> &Mutex<Vec<ReferenceRecord>> {
        match kind {
            ReferenceKind::Category => &self.categories,
            ReferenceKind::Location => &self.locations,
        }
    }
}

#[async_trait]
impl InventoryGateway for MockGateway {
    async fn search_references(
        &self,
        kind: ReferenceKind,
        name: &str,
    ) -> Result<Vec<ReferenceRecord>, GatewayError> {
        let needle = name.to_lowercase();
        Ok(self
            .store(kind)
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn create_reference(
        &self,
        kind: ReferenceKind,
        name: &str,
        _color: Option<&str>,
    ) -> Result<ReferenceRecord, GatewayError> {
        if self.fail_reference_creation {
            return Err(GatewayError::Status {
                status: 403,
                body: "reference creation disabled".to_string(),
            });
        }
        let n = self.reference_creates.fetch_add(1, Ordering::SeqCst);
        let record = ReferenceRecord {
            id: format!("{}-{}", kind, n),
            name: name.to_string(),
        };
        self.store(kind).lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn list_references(
        &self,
        kind: ReferenceKind,
    ) -> Result<Vec<ReferenceRecord>, GatewayError> {
        Ok(self.store(kind).lock().unwrap().clone())
    }

    async fn create_item(&self, item: &NewInventoryItem) -> Result<CreatedItem, GatewayError> {
        self.item_calls.fetch_add(1, Ordering::SeqCst);
        self.call_log
            .lock()
            .unwrap()
            .push(ItemCall::Started(item.sku.clone()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = if self.slow_skus.contains(&item.sku) {
            self.slow_delay
        } else {
            self.item_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.call_log
            .lock()
            .unwrap()
            .push(ItemCall::Finished(item.sku.clone()));

        if self.fail_skus.contains(&item.sku) {
            return Err(GatewayError::Status {
                status: 500,
                body: "internal error".to_string(),
            });
        }
        self.items.lock().unwrap().push(item.clone());
        Ok(CreatedItem {
            id: format!("item-{}", item.sku),
        })
    }
}

// ==========================================
// 配置与编排器
// ==========================================

/// 无批间延时的测试配置
pub fn fast_config() -> CsvImportConfig {
    CsvImportConfig {
        inter_batch_delay_ms: 0,
        request_timeout_ms: 2_000,
        ..Default::default()
    }
}

pub fn create_service(gateway: Arc<MockGateway>) -> CsvImportService {
    create_service_with(gateway, fast_config())
}

pub fn create_service_with(gateway: Arc<MockGateway>, config: CsvImportConfig) -> CsvImportService {
    CsvImportService::new(config, gateway).expect("Failed to create CsvImportService")
}

// ==========================================
// CSV 测试数据
// ==========================================

/// 生成 n 行有效库存数据（带表头）
pub fn inventory_csv(rows: usize) -> String {
    let mut csv = String::from("SKU,Nombre,Precio,Cantidad\n");
    for i in 1..=rows {
        csv.push_str(&format!("SKU-{},Producto {},{}.50,{}\n", i, i, i, i * 10));
    }
    csv
}

/// 写入带 .csv 后缀的临时文件（需要保持存活）
pub fn write_csv(contents: &[u8]) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(contents).expect("Failed to write temp file");
    file.flush().expect("Failed to flush temp file");
    file
}
