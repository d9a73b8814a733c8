//! API-side authorization guard for commands.
//!
//! Enforced at the command boundary (before a service is invoked), keeping
//! the stock domain and storage auth-agnostic.

use storefront_auth::{
    AuthzError, CommandAuthorization, Permission, Principal, Role, authorize,
};

use crate::context::PrincipalContext;

pub const READ_RECORDS: &str = "inventory.records.read";
pub const CREATE_RECORDS: &str = "inventory.records.create";
pub const ADJUST_STOCK: &str = "inventory.records.adjust";
pub const CONFIGURE_RECORDS: &str = "inventory.records.configure";

/// Check authorization for a command in the current request context.
pub fn authorize_command<C: CommandAuthorization>(
    principal: &PrincipalContext,
    command: &C,
) -> Result<(), AuthzError> {
    let principal = Principal {
        account_id: principal.account_id(),
        permissions: permissions_from_roles(principal.roles()),
    };

    for perm in command.required_permissions() {
        authorize(&principal, perm)?;
    }

    Ok(())
}

/// Static role→permission mapping.
///
/// `admin` grants everything; `staff` may look up records and move stock.
pub fn permissions_from_roles(roles: &[Role]) -> Vec<Permission> {
    if roles.iter().any(|r| *r == Role::ADMIN) {
        return vec![Permission::WILDCARD];
    }

    let mut perms = Vec::new();
    if roles.iter().any(|r| *r == Role::STAFF) {
        perms.push(Permission::new(READ_RECORDS));
        perms.push(Permission::new(ADJUST_STOCK));
    }
    perms
}

#[cfg(test)]
mod tests {
    use storefront_core::AccountId;

    use super::*;
    use crate::app::routes::common::CmdAuth;

    fn ctx(roles: Vec<Role>) -> PrincipalContext {
        PrincipalContext::new(AccountId::new(), "someone@shop.test".to_string(), roles)
    }

    fn needs(perm: &'static str) -> CmdAuth<()> {
        CmdAuth {
            inner: (),
            required: vec![Permission::new(perm)],
        }
    }

    #[test]
    fn admin_may_do_anything() {
        let admin = ctx(vec![Role::ADMIN]);
        for perm in [READ_RECORDS, CREATE_RECORDS, ADJUST_STOCK, CONFIGURE_RECORDS] {
            assert!(authorize_command(&admin, &needs(perm)).is_ok());
        }
    }

    #[test]
    fn staff_may_read_and_adjust_only() {
        let staff = ctx(vec![Role::STAFF]);
        assert!(authorize_command(&staff, &needs(READ_RECORDS)).is_ok());
        assert!(authorize_command(&staff, &needs(ADJUST_STOCK)).is_ok());
        assert_eq!(
            authorize_command(&staff, &needs(CREATE_RECORDS)),
            Err(AuthzError::Forbidden(CREATE_RECORDS.to_string()))
        );
        assert!(authorize_command(&staff, &needs(CONFIGURE_RECORDS)).is_err());
    }

    #[test]
    fn unknown_roles_get_nothing() {
        let guest = ctx(vec![Role::new("guest")]);
        assert!(authorize_command(&guest, &needs(READ_RECORDS)).is_err());
    }
}
