use serde::Deserialize;
use validator::Validate;

use super::{clean_text, FormErrors};

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CommentForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub text: String,
}

impl CommentForm {
    /// Returns the cleaned comment text.
    pub fn clean(self) -> Result<String, FormErrors> {
        let cleaned = CommentForm {
            text: clean_text(&self.text),
        };
        cleaned.validate()?;
        Ok(cleaned.text)
    }
}
