//! Infrastructure layer - external service implementations

pub mod db;
pub mod email;
pub mod logging;
pub mod object_store;
pub mod scan;
pub mod user;
pub mod verification;
