// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::ddp::Credentials;

/// Where to connect and as whom
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TargetConfig {
    /// App URL or explicit websocket URL
    #[validate(length(min = 1))]
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Resume token from an existing session
    #[serde(default)]
    pub token: Option<String>,

    /// `host:port` or `http://host:port`
    #[validate(length(min = 3))]
    #[serde(default)]
    pub proxy: Option<String>,
}

impl TargetConfig {
    /// Login material, if any was configured.
    /// Username, email and token are mutually exclusive; a password needs
    /// exactly one of username/email and vice versa.
    pub fn credentials(&self) -> Result<Option<Credentials>> {
        let identities = [
            self.username.is_some(),
            self.email.is_some(),
            self.token.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();
        if identities > 1 {
            return Err(anyhow!(
                "username, email and token are mutually exclusive"
            ));
        }

        match (&self.username, &self.email, &self.token, &self.password) {
            (Some(username), None, None, Some(password)) => Ok(Some(Credentials::Username {
                username: username.clone(),
                password: password.clone(),
            })),
            (None, Some(email), None, Some(password)) => Ok(Some(Credentials::Email {
                email: email.clone(),
                password: password.clone(),
            })),
            (None, None, Some(token), None) => Ok(Some(Credentials::Token {
                token: token.clone(),
            })),
            (None, None, Some(_), Some(_)) => {
                Err(anyhow!("a resume token cannot be combined with a password"))
            }
            (Some(_), None, None, None) | (None, Some(_), None, None) => {
                Err(anyhow!("a password is required with a username or email"))
            }
            (None, None, None, Some(_)) => {
                Err(anyhow!("a password needs a username or email"))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> TargetConfig {
        TargetConfig {
            url: Some("https://app.example.com".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_credentials() {
        assert_eq!(target().credentials().unwrap(), None);
    }

    #[test]
    fn test_username_and_email_forms() {
        let config = TargetConfig {
            username: Some("admin".into()),
            password: Some("pw".into()),
            ..target()
        };
        assert!(matches!(
            config.credentials().unwrap(),
            Some(Credentials::Username { .. })
        ));

        let config = TargetConfig {
            email: Some("a@b.c".into()),
            password: Some("pw".into()),
            ..target()
        };
        assert!(matches!(
            config.credentials().unwrap(),
            Some(Credentials::Email { .. })
        ));
    }

    #[test]
    fn test_token_only() {
        let config = TargetConfig {
            token: Some("tok".into()),
            ..target()
        };
        assert_eq!(
            config.credentials().unwrap(),
            Some(Credentials::Token { token: "tok".into() })
        );
    }

    #[test]
    fn test_rejected_combinations() {
        let both = TargetConfig {
            username: Some("a".into()),
            email: Some("a@b.c".into()),
            password: Some("pw".into()),
            ..target()
        };
        assert!(both.credentials().is_err());

        let token_and_password = TargetConfig {
            token: Some("t".into()),
            password: Some("pw".into()),
            ..target()
        };
        assert!(token_and_password.credentials().is_err());

        let half = TargetConfig {
            username: Some("a".into()),
            ..target()
        };
        assert!(half.credentials().is_err());

        let orphan = TargetConfig {
            password: Some("pw".into()),
            ..target()
        };
        assert!(orphan.credentials().is_err());
    }
}
