pub mod config;
pub mod crawler;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod metrics;
pub mod notify;
pub mod proxy;
pub mod reconcile;
pub mod worker_pool;
