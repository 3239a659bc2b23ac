//! Query execution: descriptors, statistics, results, the query engine and
//! the transaction engine.

pub mod config;
pub mod result;
pub mod runner;
pub mod stats;
pub mod transaction;

pub use config::{QueryConfig, QueryParam};
pub use result::{QueryResult, Row};
pub use runner::QueryRunner;
pub use stats::{QueryStats, TransactionStats, UNMEASURED_MS};
pub use transaction::TransactionRunner;
