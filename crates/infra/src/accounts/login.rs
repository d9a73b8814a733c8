use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;

use storefront_auth::{
    Hs256JwtIssuer, JwtClaims, JwtError, LockoutPolicy, LoginError, normalize_email,
};

use super::store::AccountStore;
use crate::stock_store::StoreError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoginFailure {
    #[error(transparent)]
    Rejected(#[from] LoginError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] JwtError),

    /// The password check could not run to completion.
    #[error("login attempt aborted: {0}")]
    Aborted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSuccess {
    pub token: String,
    pub claims: JwtClaims,
}

/// Admin login: lockout bookkeeping plus token issuance.
pub struct LoginService<A> {
    accounts: A,
    policy: LockoutPolicy,
    issuer: Hs256JwtIssuer,
    // One lock per known account; serializes that account's attempt counter.
    attempts: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<A> LoginService<A> {
    pub fn new(accounts: A, policy: LockoutPolicy, issuer: Hs256JwtIssuer) -> Self {
        Self {
            accounts,
            policy,
            issuer,
            attempts: StdMutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    fn account_lock(&self, email: &str) -> Result<Arc<Mutex<()>>, LoginFailure> {
        let mut locks = self
            .attempts
            .lock()
            .map_err(|_| LoginFailure::Aborted("attempt lock poisoned".to_string()))?;
        Ok(locks.entry(email.to_string()).or_default().clone())
    }
}

impl<A> LoginService<A>
where
    A: AccountStore,
{
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<LoginSuccess, LoginFailure> {
        let email = normalize_email(email);

        // Unknown emails never get a lock entry.
        if self.accounts.find_by_email(&email).await?.is_none() {
            tracing::info!("login attempt for unknown account");
            return Err(LoginError::InvalidCredentials.into());
        }

        let lock = self.account_lock(&email)?;
        let _guard = lock.lock().await;

        let Some(account) = self.accounts.find_by_email(&email).await? else {
            return Err(LoginError::InvalidCredentials.into());
        };
        let before = (account.failed_attempts, account.locked_until);

        // bcrypt is CPU-bound; keep it off the async workers.
        let policy = self.policy;
        let password = password.to_string();
        let (account, outcome) = tokio::task::spawn_blocking(move || {
            let mut account = account;
            let outcome = account.attempt_login(&password, now, &policy);
            (account, outcome)
        })
        .await
        .map_err(|e| LoginFailure::Aborted(e.to_string()))?;

        if (account.failed_attempts, account.locked_until) != before {
            self.accounts.save(&account).await?;
        }

        match outcome {
            Ok(()) => {
                let (token, claims) =
                    self.issuer
                        .issue(account.id, &account.email, account.roles.clone(), now)?;
                tracing::info!(account = %account.id, "admin login succeeded");
                Ok(LoginSuccess { token, claims })
            }
            Err(e) => {
                tracing::info!(
                    account = %account.id,
                    failed_attempts = account.failed_attempts,
                    "admin login rejected: {e}"
                );
                Err(e.into())
            }
        }
    }
}
