pub mod collections;
pub mod config;
pub mod engine;
pub mod index;
pub mod ledger;
pub mod limits;
pub mod model;
pub mod observability;
pub mod ranking;
pub mod wal;
