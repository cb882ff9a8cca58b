//! Admin login with an append-only attempt log.

use crate::config::CoreConfig;
use crate::login::{LoginAttempt, LoginOutcome};
use crate::store::{ClinicBackend, LoginAuditLog};
use crate::{ClinicError, ClinicResult};
use chrono::Utc;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn ClinicBackend>,
}

impl AuthService {
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn ClinicBackend>) -> Self {
        Self { cfg, store }
    }

    /// Checks credentials without recording anything.
    pub fn check_credentials(&self, username: &str, password: &str) -> bool {
        self.cfg.admin().matches(username, password)
    }

    /// Checks credentials and records the attempt.
    ///
    /// # Errors
    ///
    /// - [`ClinicError::InvalidCredentials`] on mismatch. An audit write failure is only
    ///   logged in this case.
    /// - The audit store's error if the credentials matched but the attempt could not be
    ///   recorded.
    pub fn login(&self, username: &str, password: &str) -> ClinicResult<()> {
        let accepted = self.check_credentials(username, password);
        let outcome = if accepted {
            LoginOutcome::Success
        } else {
            LoginOutcome::Failed
        };
        let attempt = LoginAttempt::record(username, outcome, Utc::now());
        let audit = self.store.append_login_attempt(&attempt);

        if !accepted {
            if let Err(e) = audit {
                tracing::warn!(username = %attempt.username, error = %e, "failed to record rejected login");
            }
            tracing::info!(username = %attempt.username, "admin login rejected");
            return Err(ClinicError::InvalidCredentials);
        }

        audit?;
        tracing::info!(username = %attempt.username, "admin logged in");
        Ok(())
    }

    pub fn attempts(&self) -> ClinicResult<Vec<LoginAttempt>> {
        self.store.list_login_attempts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdminCredentials;
    use crate::services::testing::{both_backends, config, FaultyBackend};
    use std::sync::atomic::Ordering;

    #[test]
    fn test_every_attempt_is_recorded() {
        for store in both_backends() {
            let service = AuthService::new(config(), store);

            service.login("admin", "admin").unwrap();
            assert!(matches!(
                service.login("admin", "wrong"),
                Err(ClinicError::InvalidCredentials)
            ));
            assert!(service.login("", "").is_err());

            let attempts = service.attempts().unwrap();
            let outcomes: Vec<(String, LoginOutcome)> = attempts
                .into_iter()
                .map(|a| (a.username, a.outcome))
                .collect();
            assert_eq!(
                outcomes,
                vec![
                    ("admin".to_string(), LoginOutcome::Success),
                    ("admin".to_string(), LoginOutcome::Failed),
                    ("unknown".to_string(), LoginOutcome::Failed),
                ]
            );
        }
    }

    #[test]
    fn test_configured_credentials_replace_default() {
        let cfg = Arc::new(CoreConfig::default().with_admin_credentials(AdminCredentials {
            username: "dokter".into(),
            password: "rahasia".into(),
        }));
        let service = AuthService::new(cfg, both_backends().remove(0));
        assert!(service.login("admin", "admin").is_err());
        assert!(service.login("dokter", "rahasia").is_ok());
    }

    #[test]
    fn test_audit_failure_surfaces_only_on_success() {
        let store = Arc::new(FaultyBackend::new());
        store.fail_login_appends.store(true, Ordering::SeqCst);
        let service = AuthService::new(config(), store);

        let err = service.login("admin", "admin").unwrap_err();
        assert!(!matches!(err, ClinicError::InvalidCredentials));

        assert!(matches!(
            service.login("admin", "nope"),
            Err(ClinicError::InvalidCredentials)
        ));
    }
}
