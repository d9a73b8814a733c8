use storefront_auth::Role;
use storefront_core::AccountId;

/// Principal context for a request (authenticated identity + roles).
///
/// Inserted by the auth middleware; present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    account_id: AccountId,
    email: String,
    roles: Vec<Role>,
}

impl PrincipalContext {
    pub fn new(account_id: AccountId, email: String, roles: Vec<Role>) -> Self {
        Self {
            account_id,
            email,
            roles,
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }
}
