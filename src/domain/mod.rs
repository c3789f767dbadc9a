//! Domain layer - Core business entities and contracts

pub mod error;
pub mod scan;
pub mod user;

pub use error::DomainError;
pub use scan::{DiseaseInfo, NewScan, ScanRecord, ScanRepository};
pub use user::{
    Credentials, NewUser, Profile, ProfileUpdate, UserRepository, UserSummary, DEFAULT_ROLE_ID,
};
