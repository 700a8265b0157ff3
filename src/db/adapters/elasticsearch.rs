use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::EsConfig;
use crate::db::adapter::DbAdapter;

/// Elasticsearch 访问入口，走 REST 接口
#[derive(Clone)]
pub struct SearchIndex {
    client: Client,
    base_url: Url,
    username: Option<String>,
    password: Option<String>,
}

impl SearchIndex {
    pub fn connect(config: &EsConfig) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: config.get_node()?,
            username: config.user.clone(),
            password: config.password.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("无效的 Elasticsearch 地址: {}", self.base_url))?
            .clear()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let req = self.client.request(method, url);
        match &self.username {
            Some(u) => req.basic_auth(u, self.password.as_deref()),
            None => req,
        }
    }

    async fn send(&self, method: Method, segments: &[&str], body: Option<&Value>) -> Result<Value> {
        let url = self.endpoint(segments)?;
        debug!("elasticsearch request: {} {}", method, url);
        let mut req = self.request(method, url);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(anyhow!("Elasticsearch 错误 ({}): {}", status, text));
        }
        if text.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// 创建索引，`body` 可带 settings/mappings
    pub async fn create_index(&self, index: &str, body: Option<Value>) -> Result<Value> {
        self.send(Method::PUT, &[index], body.as_ref()).await
    }

    pub async fn delete_index(&self, index: &str) -> Result<Value> {
        self.send(Method::DELETE, &[index], None).await
    }

    /// 添加文档，由 Elasticsearch 生成 `_id`
    pub async fn add_document<T: Serialize>(&self, index: &str, doc: &T) -> Result<Value> {
        let body = serde_json::to_value(doc)?;
        self.send(Method::POST, &[index, "_doc"], Some(&body)).await
    }

    pub async fn search(&self, index: &str, query: &Value) -> Result<Value> {
        self.send(Method::POST, &[index, "_search"], Some(query)).await
    }

    /// 让刚写入的文档立即可查
    pub async fn refresh(&self, index: &str) -> Result<Value> {
        self.send(Method::POST, &[index, "_refresh"], None).await
    }
}

/// 取出搜索结果里每条命中的 `_source`
pub fn hits(response: &Value) -> Vec<Value> {
    response
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .map(|hits| hits.iter().filter_map(|h| h.get("_source").cloned()).collect())
        .unwrap_or_default()
}

/// 命中总数，兼容 6.x 的数字格式和 7.x 以后的对象格式
pub fn total_hits(response: &Value) -> u64 {
    match response.pointer("/hits/total") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(obj) => obj.get("value").and_then(Value::as_u64).unwrap_or(0),
        None => 0,
    }
}

#[async_trait]
impl DbAdapter for SearchIndex {
    fn driver_name(&self) -> &'static str { "Elasticsearch" }

    async fn ping(&self) -> Result<()> {
        self.send(Method::GET, &[], None).await?;
        Ok(())
    }

    async fn get_version(&self) -> Result<String> {
        let v = self.send(Method::GET, &[], None).await?;
        Ok(v.pointer("/version/number").and_then(Value::as_str).unwrap_or("").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoints_are_built_from_segments() {
        let es = SearchIndex::connect(&EsConfig::new("search.local").port(9201)).unwrap();
        assert_eq!(es.endpoint(&["goods", "_search"]).unwrap().as_str(), "http://search.local:9201/goods/_search");
        assert_eq!(es.endpoint(&[]).unwrap().as_str(), "http://search.local:9201/");
        // 索引名里的特殊字符会被转义
        assert_eq!(es.endpoint(&["a b"]).unwrap().as_str(), "http://search.local:9201/a%20b");
    }

    #[test]
    fn hits_extracts_sources() {
        let resp = json!({
            "hits": {
                "total": { "value": 2, "relation": "eq" },
                "hits": [
                    { "_id": "1", "_source": { "title": "a" } },
                    { "_id": "2", "_source": { "title": "b" } }
                ]
            }
        });
        assert_eq!(hits(&resp), vec![json!({"title": "a"}), json!({"title": "b"})]);
        assert_eq!(total_hits(&resp), 2);
        assert_eq!(total_hits(&json!({"hits": {"total": 5, "hits": []}})), 5);
        assert!(hits(&json!({})).is_empty());
    }
}
