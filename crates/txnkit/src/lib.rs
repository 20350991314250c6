//! Sequential transactions with compensating rollback.
//!
//! A [`Transaction`] runs an ordered list of steps against one piece of
//! state. Each step pairs a forward action with a rollback. When a forward
//! action fails, the failed step and every step before it are rolled back in
//! reverse order, and the run returns the resulting state together with an
//! inspectable [`TxnError`] listing every captured failure.

mod audit;
mod error;
mod policy;
mod step;
mod transaction;

pub use audit::{CompensationStatus, StepRecord, StepStatus, TxnAuditLog};
pub use error::{Failure, FailureKind, RolledBack, TxnError};
pub use policy::TxnPolicy;
pub use step::{FnStep, Outcome, TxnStep, identity};
pub use transaction::Transaction;
