use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::options::FindOptions;
use mongodb::{Client, Collection, Database};
use serde::Serialize;
use tracing::info;

use crate::config::MongoConfig;
use crate::db::adapter::DbAdapter;
use crate::db::schema::Schema;
use crate::models::UpdateSummary;
use crate::utils::{collection_name, first_to_upper};

/// 声明模型时的选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaOptions {
    /// 自动维护创建/更新时间，默认关闭
    pub auto_time: bool,
    pub create_time: String,
    pub update_time: String,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self { auto_time: false, create_time: "create_time".into(), update_time: "update_time".into() }
    }
}

impl SchemaOptions {
    pub fn auto_time() -> Self {
        Self { auto_time: true, ..Self::default() }
    }
}

/// MongoDB 连接，按模型名产出 [`DocModel`]
#[derive(Clone)]
pub struct DocStore {
    client: Client,
    db: Database,
    config: MongoConfig,
}

impl DocStore {
    pub async fn connect(config: &MongoConfig) -> Result<Self> {
        let client = Client::with_uri_str(config.get_uri()?)
            .await
            .with_context(|| format!("无法连接 MongoDB {}:{}", config.host, config.port))?;
        let db = client.database(&config.database);
        info!(host = %config.host, port = config.port, database = %config.database, "Connected to MongoDB");
        Ok(Self { client, db, config: config.clone() })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn config(&self) -> &MongoConfig {
        &self.config
    }

    /// 模型在调用 [`DocModel::schema`] 之后才能使用
    pub fn model(&self, name: &str) -> DocModel {
        let name = first_to_upper(name);
        let collection = self.db.collection::<Document>(&collection_name(&name));
        DocModel { name, collection, schema: None, options: SchemaOptions::default() }
    }
}

#[async_trait]
impl DbAdapter for DocStore {
    fn driver_name(&self) -> &'static str { "MongoDB" }

    async fn ping(&self) -> Result<()> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    async fn get_version(&self) -> Result<String> {
        let info = self.db.run_command(doc! { "buildInfo": 1 }, None).await?;
        Ok(info.get_str("version").unwrap_or_default().to_string())
    }
}

/// 一个文档模型：模型名、集合以及调用时声明的结构
#[derive(Clone)]
pub struct DocModel {
    name: String,
    collection: Collection<Document>,
    schema: Option<Arc<Schema>>,
    options: SchemaOptions,
}

impl DocModel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }

    /// 声明模型结构
    pub fn schema(mut self, schema: Schema, options: SchemaOptions) -> Self {
        let schema = if options.auto_time {
            schema.timestamps(&options.create_time, &options.update_time)
        } else {
            schema
        };
        self.schema = Some(Arc::new(schema));
        self.options = options;
        self
    }

    fn declared(&self) -> Result<&Schema> {
        self.schema
            .as_deref()
            .ok_or_else(|| anyhow!("模型 {} 尚未声明结构", self.name))
    }

    /// 新增文档，返回 `_id`
    pub async fn insert<T: Serialize>(&self, doc: &T) -> Result<Bson> {
        let doc = self.declared()?.cast(bson::to_document(doc)?)?;
        let res = self.collection.insert_one(doc, None).await?;
        Ok(res.inserted_id)
    }

    /// 查询，`page` 为 `(current, size)`，`current` 从 1 开始
    pub async fn select(&self, filter: Document, page: Option<(u64, u64)>) -> Result<Vec<Document>> {
        self.declared()?;
        let mut options = FindOptions::default();
        if let Some((current, size)) = page {
            options.skip = Some(current.max(1).saturating_sub(1).saturating_mul(size));
            options.limit = Some(i64::try_from(size).unwrap_or(i64::MAX));
        }
        let cursor = self.collection.find(filter, options).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.declared()?;
        Ok(self.collection.count_documents(filter, None).await?)
    }

    /// 更新一条。不含 `$` 操作符的文档会包进 `$set`
    pub async fn update(&self, filter: Document, update: Document) -> Result<UpdateSummary> {
        self.declared()?;
        let update_time = self.options.auto_time.then_some(self.options.update_time.as_str());
        let update = prepare_update(update, update_time);
        let res = self.collection.update_one(filter, update, None).await?;
        Ok(UpdateSummary { matched: res.matched_count, modified: res.modified_count })
    }

    /// 删除一条，返回删除数
    pub async fn delete(&self, filter: Document) -> Result<u64> {
        self.declared()?;
        let res = self.collection.delete_one(filter, None).await?;
        Ok(res.deleted_count)
    }
}

fn prepare_update(update: Document, update_time: Option<&str>) -> Document {
    let has_operator = update.keys().any(|k| k.starts_with('$'));
    let mut update = if has_operator { update } else { doc! { "$set": update } };
    if let Some(field) = update_time {
        let now = Bson::DateTime(bson::DateTime::now());
        match update.get_document_mut("$set") {
            Ok(set) => {
                set.insert(field, now);
            }
            Err(_) => {
                let mut set = Document::new();
                set.insert(field, now);
                update.insert("$set", set);
            }
        }
    }
    update
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_updates_are_wrapped_in_set() {
        let out = prepare_update(doc! { "name": "bob" }, None);
        assert_eq!(out, doc! { "$set": { "name": "bob" } });

        let out = prepare_update(doc! { "$inc": { "age": 1 } }, None);
        assert_eq!(out, doc! { "$inc": { "age": 1 } });
    }

    #[test]
    fn auto_time_touches_update_column() {
        let out = prepare_update(doc! { "name": "bob" }, Some("update_time"));
        let set = out.get_document("$set").unwrap();
        assert_eq!(set.get_str("name").unwrap(), "bob");
        assert!(set.get_datetime("update_time").is_ok());

        let out = prepare_update(doc! { "$inc": { "age": 1 } }, Some("mtime"));
        assert!(out.get_document("$set").unwrap().get_datetime("mtime").is_ok());
        assert!(out.get_document("$inc").is_ok());
    }

    #[test]
    fn schema_options_default_columns() {
        let opts = SchemaOptions::auto_time();
        assert!(opts.auto_time);
        assert_eq!(opts.create_time, "create_time");
        assert_eq!(opts.update_time, "update_time");
    }
}
