//! `storefront-auth`: authentication and authorization boundary for the back office.
//!
//! This crate is decoupled from HTTP and storage: it validates claims, signs and
//! verifies tokens, checks permissions and decides admin login attempts.

pub mod account;
pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod rbac;

pub use account::{AdminAccount, LockoutPolicy, LoginError, normalize_email};
pub use authorize::{AuthzError, CommandAuthorization, Principal, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtIssuer, Hs256JwtValidator, JwtError, JwtValidator};
pub use password::{PasswordError, hash_password, hash_password_with_cost, verify_password};
pub use rbac::{Permission, Role};
