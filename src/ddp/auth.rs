// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use super::message::Message;

/// Login material for the accounts-password / resume login handlers.
/// The variants are mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Credentials {
    Username { username: String, password: String },
    Email { email: String, password: String },
    Token { token: String },
}

/// Password as the client-side accounts package sends it: never in clear text.
pub fn password_parameter(password: &str) -> Value {
    let digest = hex::encode(Sha256::digest(password.as_bytes()));
    json!({"digest": digest, "algorithm": "sha-256"})
}

/// Build the `login` method call for the given credentials.
pub fn login_message(credentials: &Credentials) -> Message {
    let param = match credentials {
        Credentials::Username { username, password } => json!({
            "user": {"username": username},
            "password": password_parameter(password)
        }),
        Credentials::Email { email, password } => json!({
            "user": {"email": email},
            "password": password_parameter(password)
        }),
        Credentials::Token { token } => json!({"resume": token}),
    };
    Message::method("login", vec![param])
}

impl Credentials {
    /// Identity shown in logs; secrets are never included
    pub fn principal(&self) -> &str {
        match self {
            Credentials::Username { username, .. } => username,
            Credentials::Email { email, .. } => email,
            Credentials::Token { .. } => "<resume token>",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_digest() {
        let param = password_parameter("password");
        assert_eq!(
            param["digest"],
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
        assert_eq!(param["algorithm"], "sha-256");
    }

    #[test]
    fn test_username_login_message() {
        let msg = login_message(&Credentials::Username {
            username: "admin".into(),
            password: "hunter2".into(),
        });
        assert_eq!(msg.operation_name(), Some("login"));
        let params = msg.params().unwrap();
        assert_eq!(params[0]["user"]["username"], "admin");
        assert!(params[0]["password"]["digest"].is_string());
        assert!(!serde_json::to_string(&msg).unwrap().contains("hunter2"));
    }

    #[test]
    fn test_email_and_token_login_messages() {
        let email = login_message(&Credentials::Email {
            email: "a@b.c".into(),
            password: "x".into(),
        });
        assert_eq!(email.params().unwrap()[0]["user"]["email"], "a@b.c");

        let token = login_message(&Credentials::Token {
            token: "abc123".into(),
        });
        assert_eq!(token.params().unwrap()[0], json!({"resume": "abc123"}));
    }

    #[test]
    fn test_principal_hides_secrets() {
        let user = Credentials::Username {
            username: "admin".into(),
            password: "hunter2".into(),
        };
        assert_eq!(user.principal(), "admin");
        let token = Credentials::Token {
            token: "abc123".into(),
        };
        assert_eq!(token.principal(), "<resume token>");
    }
}
