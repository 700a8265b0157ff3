//! MySQL 链式查询构造器。
//!
//! ```no_run
//! # async fn demo(db: unidb::MySqlDb) -> anyhow::Result<()> {
//! use unidb::query::{Cmp, Sort};
//!
//! let users = db.table("user");
//! let rows = users
//!     .query()
//!     .where_("age", Cmp::Ge, 18)
//!     .order("id", Sort::Desc)
//!     .page(2, 10)
//!     .select()
//!     .await?;
//! # let _ = rows;
//! # Ok(())
//! # }
//! ```

mod builder;
mod clause;
mod executor;
mod row;
mod statement;
mod table;
mod transaction;

pub use builder::{DeleteOptions, InsertOptions, QueryBuilder, UpdateOptions};
pub use clause::{Cmp, JoinKind, Lock, Sort};
pub use statement::Statement;
pub use table::SqlTable;
pub use transaction::{run as run_transaction, TxControl, TxScope};

pub(crate) use table::pooled;
pub(crate) use transaction::begin as begin_transaction;
