// ==========================================
// 库存 CSV 导入 - HTTP 网关实现
// ==========================================
// 职责: 基于 reqwest 的 InventoryGateway 实现
// 接口:
//   GET  {base}/categories?search=名称   POST {base}/categories
//   GET  {base}/locations?search=名称    POST {base}/locations
//   POST {base}/inventory-items
// ==========================================

use crate::gateway::{
    CreatedItem, GatewayError, InventoryGateway, NewInventoryItem, ReferenceKind, ReferenceRecord,
};
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("inventory-csv-import/", env!("CARGO_PKG_VERSION"));

/// 列表响应（兼容裸数组与 { "data": [...] } 包装）
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListResponse<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> ListResponse<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ListResponse::Bare(items) => items,
            ListResponse::Wrapped { data } => data,
        }
    }
}

/// 单记录响应（兼容裸对象与 { "data": {...} } 包装）
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordResponse<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> RecordResponse<T> {
    fn into_inner(self) -> T {
        match self {
            RecordResponse::Wrapped { data } => data,
            RecordResponse::Bare(item) => item,
        }
    }
}

#[derive(Debug, Serialize)]
struct NewReference<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<&'a str>,
}

// ==========================================
// HttpInventoryGateway
// ==========================================
pub struct HttpInventoryGateway {
    client: Client,
    base_url: Url,
    timeout_ms: u64,
}

impl HttpInventoryGateway {
    /// 创建网关
    ///
    /// # 参数
    /// - base_url: REST 根地址（末尾斜杠可省略）
    /// - timeout: 客户端级请求超时
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| GatewayError::Transport(format!("invalid base URL: {}", e)))?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            timeout_ms: timeout.as_millis() as u64,
        })
    }

    fn url(&self, path: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(path)
            .map_err(|e| GatewayError::Transport(format!("invalid URL for {}: {}", path, e)))
    }

    /// 非 2xx → GatewayError（附响应体）
    async fn check(response: Response) -> Result<Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        warn!(status = %status, body = %body, "接口返回错误状态");

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(body));
        }
        Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    fn transport(&self, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout(self.timeout_ms)
        } else {
            GatewayError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl InventoryGateway for HttpInventoryGateway {
    async fn search_references(
        &self,
        kind: ReferenceKind,
        name: &str,
    ) -> Result<Vec<ReferenceRecord>, GatewayError> {
        let url = self.url(kind.resource())?;
        debug!(kind = %kind, name = %name, "搜索引用记录");

        let response = self
            .client
            .get(url)
            .query(&[("search", name)])
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        let response = Self::check(response).await?;
        Ok(Self::decode::<ListResponse<ReferenceRecord>>(response)
            .await?
            .into_vec())
    }

    async fn create_reference(
        &self,
        kind: ReferenceKind,
        name: &str,
        color: Option<&str>,
    ) -> Result<ReferenceRecord, GatewayError> {
        let url = self.url(kind.resource())?;
        debug!(kind = %kind, name = %name, "创建引用记录");

        let response = self
            .client
            .post(url)
            .json(&NewReference { name, color })
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        let response = Self::check(response).await?;
        Ok(Self::decode::<RecordResponse<ReferenceRecord>>(response)
            .await?
            .into_inner())
    }

    async fn list_references(
        &self,
        kind: ReferenceKind,
    ) -> Result<Vec<ReferenceRecord>, GatewayError> {
        let url = self.url(kind.resource())?;

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        let response = Self::check(response).await?;
        Ok(Self::decode::<ListResponse<ReferenceRecord>>(response)
            .await?
            .into_vec())
    }

    async fn create_item(&self, item: &NewInventoryItem) -> Result<CreatedItem, GatewayError> {
        let url = self.url("inventory-items")?;

        let response = self
            .client
            .post(url)
            .json(item)
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        let response = Self::check(response).await?;
        Ok(Self::decode::<RecordResponse<CreatedItem>>(response)
            .await?
            .into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalized() {
        let gw = HttpInventoryGateway::new("http://localhost:8080/api", Duration::from_secs(1))
            .unwrap();
        assert_eq!(
            gw.url("categories").unwrap().as_str(),
            "http://localhost:8080/api/categories"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(HttpInventoryGateway::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_list_response_shapes() {
        let bare: ListResponse<ReferenceRecord> =
            serde_json::from_str(r#"[{"id":"1","name":"General"}]"#).unwrap();
        assert_eq!(bare.into_vec().len(), 1);

        let wrapped: ListResponse<ReferenceRecord> =
            serde_json::from_str(r#"{"data":[{"id":"1","name":"General"}]}"#).unwrap();
        assert_eq!(wrapped.into_vec()[0].name, "General");
    }

    #[test]
    fn test_record_response_shapes() {
        let wrapped: RecordResponse<CreatedItem> =
            serde_json::from_str(r#"{"data":{"id":"9"}}"#).unwrap();
        assert_eq!(wrapped.into_inner().id, "9");

        let bare: RecordResponse<CreatedItem> = serde_json::from_str(r#"{"id":"7"}"#).unwrap();
        assert_eq!(bare.into_inner().id, "7");
    }
}
