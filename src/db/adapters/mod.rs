pub mod elasticsearch;
pub mod mongodb;
pub mod mysql;
pub mod redis;

pub use self::elasticsearch::SearchIndex;
pub use self::mongodb::{DocModel, DocStore, SchemaOptions};
pub use self::mysql::MySqlDb;
pub use self::redis::{ExpiryWatch, KvStore, KvValue};
