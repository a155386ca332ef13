// src/services/authorization.rs

use std::collections::HashSet;

use crate::common::error::AppError;

/// A única fonte de verdade sobre quem é administrador.
pub trait AuthorizationPolicy: Send + Sync {
    fn is_admin(&self, phone_number: &str) -> bool;

    fn require_admin(&self, phone_number: &str) -> Result<(), AppError> {
        if self.is_admin(phone_number) {
            Ok(())
        } else {
            Err(AppError::Permission(
                "Only administrators can perform this action.".to_string(),
            ))
        }
    }
}

// Lista fixa de telefones (+<ddi><número>), comparação exata
#[derive(Debug, Clone, Default)]
pub struct AllowListPolicy {
    admins: HashSet<String>,
}

impl AllowListPolicy {
    pub fn new<I, S>(phone_numbers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            admins: phone_numbers.into_iter().map(Into::into).collect(),
        }
    }

    /// Lê "+91...,+91..." (formato da variável ADMIN_PHONE_NUMBERS).
    pub fn from_csv(raw: &str) -> Self {
        Self::new(
            raw.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        )
    }
}

impl AuthorizationPolicy for AllowListPolicy {
    fn is_admin(&self, phone_number: &str) -> bool {
        self.admins.contains(phone_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_check_is_exact_string_equality() {
        let policy = AllowListPolicy::from_csv(" +918790720978, +919052288377 ,");
        assert!(policy.is_admin("+918790720978"));
        assert!(policy.is_admin("+919052288377"));
        assert!(!policy.is_admin("8790720978"));
        assert!(!policy.is_admin(""));
    }

    #[test]
    fn non_admins_get_a_permission_error() {
        let policy = AllowListPolicy::new(["+918790720978"]);
        assert!(policy.require_admin("+918790720978").is_ok());
        assert!(matches!(
            policy.require_admin("+910000000000"),
            Err(AppError::Permission(_))
        ));
    }
}
