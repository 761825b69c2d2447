//! Form payloads, validation and re-render state

pub mod auth_forms;
pub mod comment_form;
pub mod post_form;

use serde::Serialize;
use std::collections::BTreeMap;
use validator::ValidationErrors;

pub use auth_forms::{LoginForm, SignupForm};
pub use comment_form::CommentForm;
pub use post_form::{group_choices, CleanedPost, GroupChoice, PostFormData, PostFormState, Upload};

pub const REQUIRED: &str = "This field is required.";

/// Field errors keyed by field name, plus errors about the form as a whole.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct FormErrors {
    pub fields: BTreeMap<String, Vec<String>>,
    pub non_field: Vec<String>,
}

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut form_errors = FormErrors::default();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                form_errors.add(&field, message);
            }
        }
        form_errors
    }
}

/// Surrounding whitespace never counts as content.
pub fn clean_text(raw: &str) -> String {
    raw.trim().to_string()
}
