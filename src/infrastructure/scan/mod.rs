//! Scan infrastructure: rice leaf scan persistence and the scan service.

pub mod repository;
pub mod service;
pub mod sql_repository;

pub use repository::InMemoryScanRepository;
pub use service::ScanService;
pub use sql_repository::SqlScanRepository;
