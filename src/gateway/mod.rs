// ==========================================
// 库存 CSV 导入 - 外部协作接口
// ==========================================
// 职责: 分类/库位 查询·创建·列举 + 库存物料创建
// 实现者: HttpInventoryGateway（reqwest）；测试中为内存 Mock
// 说明: 网关错误只在行级被捕获,不会中断整次导入
// ==========================================

pub mod http;
pub mod resolver;

use crate::domain::import::InventoryItemDraft;
use crate::domain::types::ItemStatus;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use http::HttpInventoryGateway;
pub use resolver::ReferenceResolver;

// ==========================================
// ReferenceKind - 可解析的引用类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Category,
    Location,
}

impl ReferenceKind {
    /// 兜底引用名称（名称包含任一即视为默认记录）
    pub fn fallback_names(&self) -> &'static [&'static str] {
        match self {
            ReferenceKind::Category => &["general", "sin categoría", "sin categoria"],
            ReferenceKind::Location => &["general", "sin ubicación", "sin ubicacion"],
        }
    }

    /// REST 资源路径
    pub fn resource(&self) -> &'static str {
        match self {
            ReferenceKind::Category => "categories",
            ReferenceKind::Location => "locations",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Category => write!(f, "category"),
            ReferenceKind::Location => write!(f, "location"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedItem {
    pub id: String,
}

// ==========================================
// NewInventoryItem - 物料创建请求体
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInventoryItem {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: String,
    pub location_id: String,
    pub unit_price: f64,
    pub cost: Option<f64>,
    pub quantity: i64,
    pub min_stock: Option<i64>,
    pub max_stock: Option<i64>,
    pub status: ItemStatus,
    pub barcode: Option<String>,
    pub tags: Vec<String>,
    pub supplier: Option<String>,
    pub notes: Option<String>,
}

impl NewInventoryItem {
    /// 由校验记录 + 已解析引用 ID 组装请求体
    ///
    /// # 返回
    /// - None: 缺少 SKU 或名称
    pub fn from_draft(
        item: &InventoryItemDraft,
        category_id: String,
        location_id: String,
    ) -> Option<Self> {
        Some(Self {
            sku: item.sku.clone()?,
            name: item.name.clone()?,
            description: item.description.clone(),
            category_id,
            location_id,
            unit_price: item.price.unwrap_or(0.0),
            cost: item.cost,
            quantity: item.quantity.unwrap_or(0),
            min_stock: item.min_stock,
            max_stock: item.max_stock,
            status: item.status.unwrap_or(ItemStatus::Active),
            barcode: item.barcode.clone(),
            tags: item.tags.clone(),
            supplier: item.supplier.clone(),
            notes: item.notes.clone(),
        })
    }
}

// ==========================================
// GatewayError - 协作方调用错误
// ==========================================
// 文案会进入行级失败原因,面向最终用户
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out after {0} ms")]
    Timeout(u64),

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Rejected(String),
}

// ==========================================
// InventoryGateway Trait
// ==========================================
#[async_trait]
pub trait InventoryGateway: Send + Sync {
    /// 按名称搜索引用记录
    async fn search_references(
        &self,
        kind: ReferenceKind,
        name: &str,
    ) -> Result<Vec<ReferenceRecord>, GatewayError>;

    /// 创建引用记录（分类带显示颜色）
    async fn create_reference(
        &self,
        kind: ReferenceKind,
        name: &str,
        color: Option<&str>,
    ) -> Result<ReferenceRecord, GatewayError>;

    /// 列出全部引用记录（兜底解析用）
    async fn list_references(&self, kind: ReferenceKind)
        -> Result<Vec<ReferenceRecord>, GatewayError>;

    /// 创建库存物料
    async fn create_item(&self, item: &NewInventoryItem) -> Result<CreatedItem, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_from_draft_defaults() {
        let draft = InventoryItemDraft {
            sku: Some("ABC-1".to_string()),
            name: Some("Widget".to_string()),
            price: Some(19.99),
            ..Default::default()
        };
        let payload =
            NewInventoryItem::from_draft(&draft, "c1".to_string(), "l1".to_string()).unwrap();
        assert_eq!(payload.unit_price, 19.99);
        assert_eq!(payload.quantity, 0);
        assert_eq!(payload.status, ItemStatus::Active);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["categoryId"], "c1");
        assert_eq!(json["unitPrice"], 19.99);
    }

    #[test]
    fn test_payload_requires_sku_and_name() {
        let draft = InventoryItemDraft {
            sku: Some("ABC-1".to_string()),
            ..Default::default()
        };
        assert!(NewInventoryItem::from_draft(&draft, String::new(), String::new()).is_none());
    }

    #[test]
    fn test_fallback_names() {
        assert!(ReferenceKind::Category
            .fallback_names()
            .contains(&"sin categoría"));
        assert_eq!(ReferenceKind::Location.resource(), "locations");
    }
}
