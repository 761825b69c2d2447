use serde::Deserialize;
use std::borrow::Cow;
use validator::{Validate, ValidationError};

use super::FormErrors;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

impl LoginForm {
    pub fn clean(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        if self.username.trim().is_empty() {
            errors.add("username", super::REQUIRED);
        }
        if self.password.is_empty() {
            errors.add("password", super::REQUIRED);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SignupForm {
    #[serde(default)]
    #[validate(
        length(min = 1, max = 150, message = "Enter a username of at most 150 characters."),
        custom(function = "validate_username")
    )]
    pub username: String,

    #[serde(default)]
    #[validate(length(min = 8, message = "This password is too short. It must contain at least 8 characters."))]
    pub password1: String,

    #[serde(default)]
    #[validate(must_match(other = "password1", message = "The two password fields didn't match."))]
    pub password2: String,
}

impl SignupForm {
    /// Validates field rules. Username uniqueness is checked by the handler.
    pub fn clean(&self) -> Result<String, FormErrors> {
        let trimmed = SignupForm {
            username: self.username.trim().to_string(),
            password1: self.password1.clone(),
            password2: self.password2.clone(),
        };
        trimmed.validate()?;
        Ok(trimmed.username)
    }
}

/// Letters, digits and `@ . + - _` only.
fn validate_username(username: &str) -> Result<(), ValidationError> {
    let valid = username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));

    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_username").with_message(Cow::Borrowed(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(username: &str, p1: &str, p2: &str) -> SignupForm {
        SignupForm {
            username: username.to_string(),
            password1: p1.to_string(),
            password2: p2.to_string(),
        }
    }

    #[test]
    fn test_valid_signup() {
        assert_eq!(signup(" leo ", "longenough", "longenough").clean().unwrap(), "leo");
    }

    #[test]
    fn test_username_characters() {
        let errors = signup("bad name!", "longenough", "longenough").clean().unwrap_err();
        assert!(errors.has("username"));
    }

    #[test]
    fn test_password_rules() {
        let errors = signup("leo", "short", "short").clean().unwrap_err();
        assert!(errors.has("password1"));

        let errors = signup("leo", "longenough", "different1").clean().unwrap_err();
        assert!(errors.has("password2"));
    }

    #[test]
    fn test_login_requires_both_fields() {
        let errors = LoginForm::default().clean().unwrap_err();
        assert!(errors.has("username"));
        assert!(errors.has("password"));
    }
}
