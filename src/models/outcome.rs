use serde::{Deserialize, Serialize};

/// 写操作的执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub last_insert_id: u64,
}

impl ExecResult {
    pub fn with_details(rows_affected: u64, last_insert_id: u64) -> Self {
        Self { rows_affected, last_insert_id }
    }
}

/// 事务的最终结果：提交，或者带着原因回滚
#[derive(Debug)]
pub enum TxOutcome<T> {
    Committed(T),
    RolledBack(anyhow::Error),
}

impl<T> TxOutcome<T> {
    pub fn is_committed(&self) -> bool {
        matches!(self, TxOutcome::Committed(_))
    }

    /// 转回普通的 `Result`，回滚原因作为错误返回
    pub fn into_result(self) -> anyhow::Result<T> {
        match self {
            TxOutcome::Committed(v) => Ok(v),
            TxOutcome::RolledBack(e) => Err(e.context("事务已回滚")),
        }
    }
}

/// MongoDB 更新结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateSummary {
    pub matched: u64,
    pub modified: u64,
}
