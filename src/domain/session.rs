use crate::error::{CheckoutError, Result};

/// Authenticated buyer identity, passed explicitly to every checkout call.
///
/// Authentication itself happens in the wallet SDK; holding a `Session` is
/// the only precondition the checkout flow checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    uid: String,
    username: String,
    email: Option<String>,
}

impl Session {
    pub fn new(uid: impl Into<String>, username: impl Into<String>) -> Result<Self> {
        let uid = uid.into();
        if uid.trim().is_empty() {
            return Err(CheckoutError::ValidationError(
                "Session requires a user id".to_string(),
            ));
        }
        Ok(Self {
            uid,
            username: username.into(),
            email: None,
        })
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_requires_uid() {
        assert!(Session::new("  ", "anon").is_err());

        let session = Session::new("uid-1", "pioneer")
            .unwrap()
            .with_email("p@example.com");
        assert_eq!(session.uid(), "uid-1");
        assert_eq!(session.email(), Some("p@example.com"));
    }
}
