pub mod value;
pub mod outcome;

pub use value::SqlValue;
pub use outcome::{ExecResult, TxOutcome, UpdateSummary};
