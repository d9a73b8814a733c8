//! Back-office account storage and the admin login flow.

pub mod login;
pub mod store;

pub use login::{LoginFailure, LoginService, LoginSuccess};
pub use store::{AccountStore, InMemoryAccountStore};
