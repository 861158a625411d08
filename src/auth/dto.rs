use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

/// Request body for login. Fields are optional so that a missing one turns
/// into a field error instead of a body rejection.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(
        required(message = "The email field is required."),
        email(message = "The email must be a valid email address.")
    )]
    pub email: Option<String>,
    #[validate(required(message = "The password field is required."))]
    pub password: Option<String>,
}

impl LoginRequest {
    /// Reads the fields out of any JSON value. Scalars are taken as text so a
    /// number in `email` fails the email rule; anything else counts as absent.
    pub fn from_json(value: &Value) -> Self {
        let field = |name: &str| match value.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        };
        Self {
            email: field("email"),
            password: field("password"),
        }
    }

    /// Trims and lowercases the email; blank values count as absent.
    pub fn normalized(self) -> Self {
        Self {
            email: self
                .email
                .map(|e| e.trim().to_lowercase())
                .filter(|e| !e.is_empty()),
            password: self.password.filter(|p| !p.is_empty()),
        }
    }
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in_minutes: i64,
}
