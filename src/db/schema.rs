//! 文档模型的结构声明。
//!
//! 插入前按声明转换文档：补默认值、校验必填项和类型；严格模式下丢弃未声明的字段。

use anyhow::{bail, Result};
use bson::{Bson, Document};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    /// 任意数值：Int32、Int64、Double
    Number,
    Int,
    Bool,
    Date,
    ObjectId,
    Array,
    Object,
    /// 不做类型检查
    Mixed,
}

impl FieldKind {
    fn accepts(&self, value: &Bson) -> bool {
        match (self, value) {
            (FieldKind::Mixed, _) => true,
            (FieldKind::String, Bson::String(_)) => true,
            (FieldKind::Number, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_)) => true,
            (FieldKind::Int, Bson::Int32(_) | Bson::Int64(_)) => true,
            (FieldKind::Bool, Bson::Boolean(_)) => true,
            (FieldKind::Date, Bson::DateTime(_)) => true,
            (FieldKind::ObjectId, Bson::ObjectId(_)) => true,
            (FieldKind::Array, Bson::Array(_)) => true,
            (FieldKind::Object, Bson::Document(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefault {
    Value(Bson),
    /// 写入时的当前时间
    Now,
}

impl FieldDefault {
    fn produce(&self) -> Bson {
        match self {
            FieldDefault::Value(v) => v.clone(),
            FieldDefault::Now => Bson::DateTime(bson::DateTime::now()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<FieldDefault>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    fields: Vec<(String, FieldDef)>,
    strict: bool,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl Schema {
    pub fn new() -> Self {
        Self { fields: Vec::new(), strict: true }
    }

    fn push(mut self, name: &str, def: FieldDef) -> Self {
        self.fields.retain(|(n, _)| n != name);
        self.fields.push((name.to_string(), def));
        self
    }

    pub fn field(self, name: &str, kind: FieldKind) -> Self {
        self.push(name, FieldDef { kind, required: false, default: None })
    }

    pub fn required(self, name: &str, kind: FieldKind) -> Self {
        self.push(name, FieldDef { kind, required: true, default: None })
    }

    pub fn with_default(self, name: &str, kind: FieldKind, default: impl Into<Bson>) -> Self {
        self.push(name, FieldDef { kind, required: false, default: Some(FieldDefault::Value(default.into())) })
    }

    /// 创建/更新时间字段，默认值为写入时间
    pub fn timestamps(self, create_time: &str, update_time: &str) -> Self {
        let def = FieldDef { kind: FieldKind::Date, required: false, default: Some(FieldDefault::Now) };
        self.push(create_time, def.clone()).push(update_time, def)
    }

    /// 关闭严格模式后保留未声明的字段
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn cast(&self, mut doc: Document) -> Result<Document> {
        let mut out = Document::new();
        if let Some(id) = doc.remove("_id") {
            out.insert("_id", id);
        }
        for (name, def) in &self.fields {
            match doc.remove(name) {
                Some(Bson::Null) if !def.required => {
                    out.insert(name.as_str(), Bson::Null);
                }
                Some(value) => {
                    if !def.kind.accepts(&value) {
                        bail!("字段 {} 的类型应为 {:?}，实际为 {:?}", name, def.kind, value.element_type());
                    }
                    out.insert(name.as_str(), value);
                }
                None => match &def.default {
                    Some(default) => {
                        out.insert(name.as_str(), default.produce());
                    }
                    None if def.required => bail!("缺少必填字段: {}", name),
                    None => {}
                },
            }
        }
        if self.strict {
            if !doc.is_empty() {
                debug!(fields = ?doc.keys().collect::<Vec<_>>(), "dropping undeclared fields");
            }
        } else {
            for (k, v) in doc {
                out.insert(k, v);
            }
        }
        Ok(out)
    }
}
