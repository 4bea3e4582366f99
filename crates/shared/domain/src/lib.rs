//! Domain layer - Core business entities and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies:
//! the user entity and roles, password hashing and the password strength
//! policy, and the constants that define session lifetimes.

pub mod constants;
pub mod error;
pub mod password;
pub mod policy;
pub mod user;

pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use password::Password;
pub use policy::PasswordPolicy;
pub use user::{NewUser, User, UserResponse, UserRole};
