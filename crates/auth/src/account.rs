//! Back-office admin account with a failed-login lockout.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use storefront_core::AccountId;

use crate::{Role, verify_password};

/// How many bad passwords are tolerated and for how long the account locks afterwards.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_attempts: u32,
    pub lockout: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout: Duration::minutes(15),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoginError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("account locked until {until}")]
    Locked { until: DateTime<Utc> },
}

/// Admin account as persisted by the account store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminAccount {
    pub id: AccountId,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub failed_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

impl AdminAccount {
    pub fn new(email: &str, password_hash: String, roles: Vec<Role>) -> Self {
        Self {
            id: AccountId::new(),
            email: normalize_email(email),
            password_hash,
            roles,
            failed_attempts: 0,
            locked_until: None,
        }
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    /// Decide one login attempt and update the lockout counters in place.
    ///
    /// A locked account is refused without checking the password. The attempt
    /// that reaches `max_attempts` starts the lock and resets the counter.
    pub fn attempt_login(
        &mut self,
        password: &str,
        now: DateTime<Utc>,
        policy: &LockoutPolicy,
    ) -> Result<(), LoginError> {
        if let Some(until) = self.locked_until {
            if until > now {
                return Err(LoginError::Locked { until });
            }
            self.locked_until = None;
        }

        if verify_password(password, &self.password_hash) {
            self.failed_attempts = 0;
            return Ok(());
        }

        self.failed_attempts += 1;
        if self.failed_attempts >= policy.max_attempts {
            let until = now + policy.lockout;
            self.failed_attempts = 0;
            self.locked_until = Some(until);
            tracing::warn!(email = %self.email, %until, "admin account locked after repeated failures");
            return Err(LoginError::Locked { until });
        }

        Err(LoginError::InvalidCredentials)
    }
}

/// Case-insensitive, whitespace-insensitive email key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
