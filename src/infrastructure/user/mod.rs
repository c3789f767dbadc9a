//! Account infrastructure: password hashing, user repositories, and the
//! account workflow service.

pub mod password;
pub mod repository;
pub mod service;
pub mod sql_repository;

pub use password::{Argon2Hasher, PasswordHasher};
pub use repository::InMemoryUserRepository;
pub use service::{AccountService, SignupRequest};
pub use sql_repository::SqlUserRepository;
