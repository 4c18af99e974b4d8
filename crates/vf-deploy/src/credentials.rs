//! Org credentials handed to the deployment tool.
//!
//! The password the tool receives is the account password with the
//! security token appended. It is assembled once, here.

use std::fmt;

use crate::config::DeploymentConfig;
use crate::error::{CredentialField, Error, ErrorKind, Result};

/// Environment variable the build file reads the username from under `useEnv`.
pub const ENV_USERNAME: &str = "SF_USERNAME";

/// Environment variable the build file reads the password from under `useEnv`.
pub const ENV_PASSWORD: &str = "SF_PASSWORD";

/// Validated username and effective password.
#[derive(Clone, PartialEq, Eq)]
pub struct DeployCredentials {
    username: String,
    password: String,
}

impl fmt::Debug for DeployCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl DeployCredentials {
    /// Assemble credentials from raw parts.
    ///
    /// Fails naming the first empty field; the token is optional.
    pub fn assemble(user: &str, pass: &str, token: Option<&str>) -> Result<Self> {
        if user.trim().is_empty() {
            return Err(Error::new(ErrorKind::MissingCredential(
                CredentialField::Username,
            )));
        }

        let mut password = pass.to_string();
        if let Some(token) = token {
            password.push_str(token);
        }

        if password.is_empty() {
            return Err(Error::new(ErrorKind::MissingCredential(
                CredentialField::Password,
            )));
        }

        Ok(Self {
            username: user.to_string(),
            password,
        })
    }

    /// Assemble credentials from a resolved configuration.
    pub fn from_config(config: &DeploymentConfig) -> Result<Self> {
        Self::assemble(&config.user, &config.pass, config.token.as_deref())
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Password with the security token appended.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Variables passed to the tool when the build file reads credentials
    /// from the environment.
    pub fn env_vars(&self) -> Vec<(String, String)> {
        vec![
            (ENV_USERNAME.to_string(), self.username.clone()),
            (ENV_PASSWORD.to_string(), self.password.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_appended() {
        let creds = DeployCredentials::assemble("u@example.com", "p", Some("t")).unwrap();
        assert_eq!(creds.password(), "pt");
        assert_eq!(creds.username(), "u@example.com");
    }

    #[test]
    fn test_token_is_optional() {
        let creds = DeployCredentials::assemble("u@example.com", "p", None).unwrap();
        assert_eq!(creds.password(), "p");
    }

    #[test]
    fn test_token_alone_is_a_password() {
        let creds = DeployCredentials::assemble("u@example.com", "", Some("t")).unwrap();
        assert_eq!(creds.password(), "t");
    }

    #[test]
    fn test_empty_user_names_username() {
        let err = DeployCredentials::assemble("", "p", Some("t")).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::MissingCredential(CredentialField::Username)
        ));
        assert!(err.to_string().contains("username"));
    }

    #[test]
    fn test_empty_password_names_password() {
        let err = DeployCredentials::assemble("u@example.com", "", None).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::MissingCredential(CredentialField::Password)
        ));
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = DeployCredentials::assemble("u@example.com", "hunter", Some("2")).unwrap();
        let debug = format!("{creds:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_env_vars() {
        let creds = DeployCredentials::assemble("u", "p", Some("t")).unwrap();
        let vars = creds.env_vars();
        assert_eq!(vars[0], ("SF_USERNAME".to_string(), "u".to_string()));
        assert_eq!(vars[1], ("SF_PASSWORD".to_string(), "pt".to_string()));
    }
}
