//! HTTP 网关：基于 reqwest 调用 MEGA AI 游戏 API
//!
//! 响应统一为 `{ "error_code": "OK", "data": ... }`；304 表示条件请求命中（未修改），
//! 响应头 etag 作为下一次请求的 if-none-match。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, ETAG, IF_NONE_MATCH, REFERER};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::config::ApiSection;
use crate::core::GatewayError;
use crate::gateway::GameGateway;
use crate::model::{Category, EnergyReading, Fetch, Item, Mission, RoomId};

const OK_CODE: &str = "OK";

/// 服务端统一响应外壳
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    error_code: Option<String>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn is_ok(&self) -> bool {
        self.error_code.as_deref() == Some(OK_CODE)
    }

    /// error_code 为 OK 时取出 data，否则视为业务拒绝
    fn into_data(self) -> Result<T, GatewayError> {
        if !self.is_ok() {
            return Err(GatewayError::rejected(
                self.error_code.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }
        self.data
            .ok_or_else(|| GatewayError::Protocol("OK response without data".to_string()))
    }
}

/// items 接口多包一层分页结构
#[derive(Debug, Deserialize)]
struct ItemPage {
    data: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    id: u64,
    name: String,
}

/// HTTP 网关：持有共享 Client 与 base_url
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(api: &ApiSection, token: &str) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let referer = HeaderValue::from_str(&api.referer)
            .map_err(|e| GatewayError::Protocol(format!("Invalid referer header: {}", e)))?;
        headers.insert(REFERER, referer);
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| GatewayError::Protocol(format!("Invalid token header: {}", e)))?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(Duration::from_secs(api.request_timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayError::Transport(format!("Build client: {}", e)))?;

        Ok(Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, GatewayError> {
        req.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() || e.is_request() {
                GatewayError::Transport(e.to_string())
            } else {
                GatewayError::Protocol(e.to_string())
            }
        })
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<Envelope<T>, GatewayError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(GatewayError::Protocol(format!("HTTP {}", status)));
        }
        resp.json::<Envelope<T>>()
            .await
            .map_err(|e| GatewayError::Protocol(format!("Decode body: {}", e)))
    }

    /// 条件 GET：带上令牌，304 映射为 NotModified，否则解析外壳并记录新 etag
    async fn conditional_get<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        token: Option<&str>,
    ) -> Result<Fetch<T>, GatewayError> {
        let req = match token {
            Some(t) if !t.is_empty() => req.header(IF_NONE_MATCH, t),
            _ => req,
        };
        let resp = self.send(req).await?;
        if resp.status() == StatusCode::NOT_MODIFIED {
            return Ok(Fetch::NotModified);
        }
        let etag = resp
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let value = Self::decode::<T>(resp).await?.into_data()?;
        Ok(Fetch::fresh(value, etag))
    }
}

#[async_trait]
impl GameGateway for HttpGateway {
    async fn get_energy(&self, token: Option<&str>) -> Result<Fetch<EnergyReading>, GatewayError> {
        let req = self.client.get(self.url("/game/get-energy"));
        self.conditional_get(req, token).await
    }

    async fn list_items(&self, category: Category) -> Result<Vec<Item>, GatewayError> {
        let req = self
            .client
            .get(self.url("/game/items"))
            .query(&[("type", category.type_code())]);
        let resp = self.send(req).await?;
        let page: ItemPage = Self::decode(resp).await?.into_data()?;
        Ok(page
            .data
            .into_iter()
            .map(|raw| Item {
                id: raw.id,
                name: raw.name,
                category,
            })
            .collect())
    }

    async fn collect_item(&self, item_id: u64, room_id: RoomId) -> Result<(), GatewayError> {
        let req = self
            .client
            .post(self.url("/game/collect-item"))
            .json(&json!({ "item_id": item_id, "room_id": room_id }));
        let resp = self.send(req).await?;
        let envelope: Envelope<serde_json::Value> = Self::decode(resp).await?;
        if envelope.is_ok() && envelope.data.as_ref().and_then(|v| v.as_bool()) == Some(true) {
            return Ok(());
        }
        Err(GatewayError::rejected(
            envelope.error_code.unwrap_or_else(|| "Unknown error".to_string()),
        ))
    }

    async fn mission_progress(
        &self,
        mission_id: u64,
        token: Option<&str>,
    ) -> Result<Fetch<Mission>, GatewayError> {
        let req = self
            .client
            .get(self.url("/game/mission/show-progress"))
            .query(&[("mission_id", mission_id)]);
        self.conditional_get(req, token).await
    }

    async fn complete_mission(&self, mission_id: u64) -> Result<(), GatewayError> {
        let req = self
            .client
            .post(self.url("/game/mission/complete"))
            .json(&json!({ "mission_id": mission_id }));
        let resp = self.send(req).await?;
        let envelope: Envelope<serde_json::Value> = Self::decode(resp).await?;
        if envelope.is_ok() {
            Ok(())
        } else {
            Err(GatewayError::rejected(
                envelope.error_code.unwrap_or_else(|| "Unknown error".to_string()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_ok_yields_data() {
        let env: Envelope<EnergyReading> =
            serde_json::from_str(r#"{"error_code":"OK","data":{"energy":30,"max_energy":1500}}"#)
                .unwrap();
        let reading = env.into_data().unwrap();
        assert_eq!(reading.energy, 30);
        assert_eq!(reading.max_energy, 1500);
    }

    #[test]
    fn test_envelope_non_ok_is_rejection() {
        let env: Envelope<serde_json::Value> =
            serde_json::from_str(r#"{"error_code":"ITEM_NOT_FOUND","data":null}"#).unwrap();
        assert_eq!(
            env.into_data().unwrap_err(),
            GatewayError::rejected("ITEM_NOT_FOUND")
        );
    }

    #[test]
    fn test_item_page_shape() {
        let env: Envelope<ItemPage> = serde_json::from_str(
            r#"{"error_code":"OK","data":{"data":[{"id":1,"name":"Wood"},{"id":2,"name":"Stone"}]}}"#,
        )
        .unwrap();
        let page = env.into_data().unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[1].name, "Stone");
    }

    #[test]
    fn test_new_strips_trailing_slash() {
        let api = ApiSection {
            base_url: "http://localhost:9/".to_string(),
            ..ApiSection::default()
        };
        let gw = HttpGateway::new(&api, "t").unwrap();
        assert_eq!(gw.url("/game/items"), "http://localhost:9/game/items");
    }
}
