//! Request/response bodies for sign-up and sign-in
//!
//! Bodies are parsed and validated here, at the boundary, so the account
//! handlers behind the connection cache only ever see well-formed input.

use serde::{Deserialize, Serialize};

use crate::types::{Result, VestibuleError};

/// Message shown for any failed credential check
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Fallback message when sign-up fails without a specific reason
pub const SIGNUP_FAILED: &str = "Signup failed";

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// A sign-up request that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub name: String,
    /// Trimmed and lowercased
    pub email: String,
    pub password: String,
}

impl SignupRequest {
    /// Parse a JSON body
    pub fn from_json(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Check required fields and normalize
    pub fn validate(self) -> Result<NewAccount> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(VestibuleError::BadRequest("Missing required field: name".into()));
        }

        let email = normalize_email(&self.email)?;

        if self.password.is_empty() {
            return Err(VestibuleError::BadRequest(
                "Missing required field: password".into(),
            ));
        }

        Ok(NewAccount {
            name: name.to_string(),
            email,
            password: self.password,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn from_json(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Normalize the email; any failure reads as bad credentials
    pub fn validate(self) -> Result<LoginRequest> {
        let email = normalize_email(&self.email)
            .map_err(|_| VestibuleError::Unauthorized(INVALID_CREDENTIALS.into()))?;

        if self.password.is_empty() {
            return Err(VestibuleError::Unauthorized(INVALID_CREDENTIALS.into()));
        }

        Ok(LoginRequest {
            email,
            password: self.password,
        })
    }
}

fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(VestibuleError::BadRequest("Missing required field: email".into()));
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if valid {
        Ok(email)
    } else {
        Err(VestibuleError::BadRequest(format!("Invalid email address: {}", raw.trim())))
    }
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignupResponse {
    Created { success: bool },
    Failed { error: String },
}

impl SignupResponse {
    pub fn created() -> Self {
        Self::Created { success: true }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            Self::Failed {
                error: SIGNUP_FAILED.to_string(),
            }
        } else {
            Self::Failed { error: message }
        }
    }

    /// Map an account-creation outcome onto the response body.
    ///
    /// Connection and internal failures are not echoed to the client.
    pub fn from_result(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self::created(),
            Err(VestibuleError::BadRequest(msg))
            | Err(VestibuleError::Conflict(msg))
            | Err(VestibuleError::Unauthorized(msg)) => Self::failed(msg),
            Err(_) => Self::failed(SIGNUP_FAILED),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Created { success: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(name: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_signup_normalizes() {
        let account = signup("  Jane Doe ", " Jane@Example.COM ", "hunter22")
            .validate()
            .unwrap();
        assert_eq!(account.name, "Jane Doe");
        assert_eq!(account.email, "jane@example.com");
        assert_eq!(account.password, "hunter22");
    }

    #[test]
    fn test_signup_missing_fields() {
        let err = signup("", "jane@example.com", "pw").validate().unwrap_err();
        assert_eq!(err, VestibuleError::BadRequest("Missing required field: name".into()));

        let err = signup("Jane", "  ", "pw").validate().unwrap_err();
        assert_eq!(err, VestibuleError::BadRequest("Missing required field: email".into()));

        let err = signup("Jane", "jane@example.com", "").validate().unwrap_err();
        assert_eq!(
            err,
            VestibuleError::BadRequest("Missing required field: password".into())
        );
    }

    #[test]
    fn test_signup_rejects_malformed_email() {
        for email in ["jane", "@example.com", "jane@localhost", "jane@.com", "a@b@c.com"] {
            let result = signup("Jane", email, "pw").validate();
            assert!(
                matches!(result, Err(VestibuleError::BadRequest(_))),
                "accepted {email}"
            );
        }
    }

    #[test]
    fn test_signup_from_json() {
        let body = br#"{"name":"Jane","email":"jane@example.com","password":"pw"}"#;
        let request = SignupRequest::from_json(body).unwrap();
        assert_eq!(request.name, "Jane");

        let missing = br#"{"name":"Jane","email":"jane@example.com"}"#;
        assert!(matches!(
            SignupRequest::from_json(missing),
            Err(VestibuleError::BadRequest(_))
        ));
    }

    #[test]
    fn test_login_from_json() {
        let body = br#"{"email":" Jane@Example.com ","password":"pw"}"#;
        let request = LoginRequest::from_json(body).unwrap().validate().unwrap();
        assert_eq!(request.email, "jane@example.com");
        assert_eq!(request.password, "pw");

        assert!(matches!(
            LoginRequest::from_json(b"not json"),
            Err(VestibuleError::BadRequest(_))
        ));
    }

    #[test]
    fn test_login_failures_read_as_invalid_credentials() {
        let bad_email = LoginRequest {
            email: "nope".into(),
            password: "pw".into(),
        };
        assert_eq!(
            bad_email.validate().unwrap_err(),
            VestibuleError::Unauthorized(INVALID_CREDENTIALS.into())
        );

        let no_password = LoginRequest {
            email: "jane@example.com".into(),
            password: String::new(),
        };
        assert!(matches!(
            no_password.validate(),
            Err(VestibuleError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_signup_response_shapes() {
        let ok = serde_json::to_value(SignupResponse::created()).unwrap();
        assert_eq!(ok, serde_json::json!({ "success": true }));

        let failed = serde_json::to_value(SignupResponse::failed("Email already registered")).unwrap();
        assert_eq!(failed, serde_json::json!({ "error": "Email already registered" }));

        let parsed: SignupResponse = serde_json::from_str(r#"{"error":""}"#).unwrap();
        assert!(!parsed.is_success());
    }

    #[test]
    fn test_signup_response_hides_internal_failures() {
        let response =
            SignupResponse::from_result(Err(VestibuleError::Connection("refused".into())));
        assert_eq!(response, SignupResponse::failed(SIGNUP_FAILED));

        let response =
            SignupResponse::from_result(Err(VestibuleError::Conflict("Email already registered".into())));
        assert_eq!(response, SignupResponse::failed("Email already registered"));

        assert!(SignupResponse::from_result(Ok(())).is_success());
        assert_eq!(SignupResponse::failed(" "), SignupResponse::failed(SIGNUP_FAILED));
    }
}
