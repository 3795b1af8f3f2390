// ==========================================
// 库存 CSV 导入 - 分类/库位名称解析器
// ==========================================
// 职责: 名称 → ID（先查后建）+ 兜底默认记录 + 单次导入内缓存
// 兜底链: 搜索命中 → 新建 → 名称含 general/sin categoría/sin ubicación → 第一条记录 → 空串
// 红线: 永不返回错误；失败只降级
// ==========================================

use crate::gateway::{GatewayError, InventoryGateway, ReferenceKind, ReferenceRecord};
use rand::Rng;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

/// 单次外部调用加超时
pub(crate) async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| GatewayError::Timeout(limit.as_millis() as u64))?
}

/// 新分类的随机显示颜色（#rrggbb）
pub fn random_color() -> String {
    let value: u32 = rand::thread_rng().gen_range(0..=0x00FF_FFFF);
    format!("#{:06x}", value)
}

// ==========================================
// ReferenceResolver
// ==========================================
// 生命周期: 一次 import_data 调用
pub struct ReferenceResolver {
    gateway: Arc<dyn InventoryGateway>,
    timeout: Duration,
    // 按 (类型, 小写名称) 单独初始化: 同名只解析一次,不同名称互不阻塞
    cache: Mutex<HashMap<(ReferenceKind, String), Arc<OnceCell<String>>>>,
}

impl ReferenceResolver {
    pub fn new(gateway: Arc<dyn InventoryGateway>, timeout: Duration) -> Self {
        Self {
            gateway,
            timeout,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// 解析名称为 ID（空名称直接走兜底链）
    pub async fn resolve(&self, kind: ReferenceKind, name: &str) -> String {
        let name = name.trim();
        let key = (kind, name.to_lowercase());

        let cell = self.cache.lock().await.entry(key).or_default().clone();

        cell.get_or_init(|| async move {
            let id = if name.is_empty() {
                self.resolve_default(kind).await
            } else {
                match self.find_or_create(kind, name).await {
                    Some(id) => id,
                    None => self.resolve_default(kind).await,
                }
            };
            debug!(kind = %kind, name = %name, id = %id, "引用已解析");
            id
        })
        .await
        .clone()
    }

    /// 先查后建；搜索失败不新建,避免重复记录
    async fn find_or_create(&self, kind: ReferenceKind, name: &str) -> Option<String> {
        let wanted = name.to_lowercase();
        match with_timeout(self.timeout, self.gateway.search_references(kind, name)).await {
            Ok(records) => {
                if let Some(found) = records
                    .into_iter()
                    .find(|r| r.name.trim().to_lowercase() == wanted)
                {
                    return Some(found.id);
                }
            }
            Err(e) => {
                warn!(kind = %kind, name = %name, error = %e, "引用搜索失败，回退到默认记录");
                return None;
            }
        }

        let color = match kind {
            ReferenceKind::Category => Some(random_color()),
            ReferenceKind::Location => None,
        };

        match with_timeout(
            self.timeout,
            self.gateway.create_reference(kind, name, color.as_deref()),
        )
        .await
        {
            Ok(created) => Some(created.id),
            Err(e) => {
                warn!(kind = %kind, name = %name, error = %e, "引用创建失败，回退到默认记录");
                None
            }
        }
    }

    /// 兜底: 默认名称记录 → 第一条记录 → 空串
    async fn resolve_default(&self, kind: ReferenceKind) -> String {
        let records: Vec<ReferenceRecord> =
            match with_timeout(self.timeout, self.gateway.list_references(kind)).await {
                Ok(records) => records,
                Err(e) => {
                    warn!(kind = %kind, error = %e, "引用列表获取失败，使用空 ID");
                    return String::new();
                }
            };

        let fallback = kind.fallback_names();
        records
            .iter()
            .find(|r| {
                let lower = r.name.to_lowercase();
                fallback.iter().any(|f| lower.contains(f))
            })
            .or_else(|| records.first())
            .map(|r| r.id.clone())
            .unwrap_or_default()
    }
}
