use log::{info, warn};

use crate::live::config_reader::LiveConfig;

/// Tells whether the caller may change the results.
pub trait AuthorizationProvider: Send + Sync {
    fn is_authorized(&self) -> bool;
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Authorization {
    Authenticated,
    Anonymous,
}

impl AuthorizationProvider for Authorization {
    fn is_authorized(&self) -> bool {
        *self == Authorization::Authenticated
    }
}

/// Operator credentials, as configured.
///
/// Only the SHA-256 digest of the password is known.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CredentialCheck {
    user: String,
    password_sha256: String,
}

impl CredentialCheck {
    pub fn new(user: &str, password_sha256: &str) -> CredentialCheck {
        CredentialCheck {
            user: user.to_string(),
            password_sha256: password_sha256.trim().to_lowercase(),
        }
    }

    pub fn from_config(config: &LiveConfig) -> Option<CredentialCheck> {
        match (&config.admin_user, &config.admin_password_sha256) {
            (Some(user), Some(digest)) if !user.is_empty() && !digest.is_empty() => {
                Some(CredentialCheck::new(user, digest))
            }
            _ => None,
        }
    }

    pub fn login(&self, user: &str, password: &str) -> Authorization {
        if user == self.user && sha256::digest(password) == self.password_sha256 {
            info!("login: {} authenticated", user);
            Authorization::Authenticated
        } else {
            warn!("login: wrong credentials for {:?}", user);
            Authorization::Anonymous
        }
    }
}
