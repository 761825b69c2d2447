use axum::extract::Multipart;
use serde::Serialize;
use validator::Validate;

use super::{clean_text, FormErrors};
use crate::database::{Group, PostView};
use crate::services::media_storage::is_image;
use crate::utils::AppError;

pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Longest accepted upload name, counted in characters of the base name.
const MAX_IMAGE_NAME_CHARS: usize = 100;

fn image_name_too_long(length: usize) -> String {
    format!(
        "Ensure this filename has at most {} characters (it has {}).",
        MAX_IMAGE_NAME_CHARS, length
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Raw post form submission (multipart: `text`, `group`, `image`, `image-clear`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostFormData {
    pub text: String,
    pub group: String,
    pub image: Option<Upload>,
    pub clear_image: bool,
}

/// Post form fields after validation, before the group id is checked
/// against the database.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedPost {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<Upload>,
    pub clear_image: bool,
}

#[derive(Debug, Validate)]
struct PostFields {
    #[validate(length(min = 1, message = "This field is required."))]
    text: String,
}

impl PostFormData {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = PostFormData::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read field: {}", e)))?
        {
            let field_name = field.name().unwrap_or("").to_string();

            match field_name.as_str() {
                "text" => {
                    form.text = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Invalid text: {}", e)))?;
                }
                "group" => {
                    form.group = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Invalid group: {}", e)))?;
                }
                "image" => {
                    let file_name = field.file_name().unwrap_or("").to_string();
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Failed to read file: {}", e)))?;

                    // Browsers send an empty part when no file was picked
                    if !file_name.is_empty() && !data.is_empty() {
                        form.image = Some(Upload {
                            file_name,
                            data: data.to_vec(),
                        });
                    }
                }
                "image-clear" => {
                    let value = field.text().await.unwrap_or_default();
                    form.clear_image = matches!(value.as_str(), "on" | "true" | "1");
                }
                _ => {}
            }
        }

        Ok(form)
    }

    /// Field-level validation. Group existence is checked by the caller.
    pub fn clean(&self) -> Result<CleanedPost, FormErrors> {
        let fields = PostFields {
            text: clean_text(&self.text),
        };
        let mut errors = match fields.validate() {
            Ok(()) => FormErrors::default(),
            Err(e) => FormErrors::from(e),
        };

        let group = self.group.trim();
        let group_id = if group.is_empty() {
            None
        } else {
            match group.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.add("group", INVALID_CHOICE);
                    None
                }
            }
        };

        if let Some(upload) = &self.image {
            let base_name = upload
                .file_name
                .rsplit(['/', '\\'])
                .next()
                .unwrap_or_default();
            let length = base_name.chars().count();
            if length > MAX_IMAGE_NAME_CHARS {
                errors.add("image", image_name_too_long(length));
            } else if !is_image(&upload.data) {
                errors.add("image", INVALID_IMAGE);
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(CleanedPost {
            text: fields.text,
            group_id,
            image: self.image.clone(),
            clear_image: self.clear_image,
        })
    }
}

/// What the create/edit template needs to (re-)render the form.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostFormState {
    pub text: String,
    pub group: Option<i64>,
    pub image: Option<String>,
    pub errors: FormErrors,
}

impl PostFormState {
    pub fn initial(post: &PostView) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group_id,
            image: post.image.clone(),
            errors: FormErrors::default(),
        }
    }

    pub fn rejected(data: &PostFormData, current_image: Option<String>, errors: FormErrors) -> Self {
        Self {
            text: data.text.clone(),
            group: data.group.trim().parse().ok(),
            image: current_image,
            errors,
        }
    }
}

/// A `<select>` option for the group field.
#[derive(Debug, Clone, Serialize)]
pub struct GroupChoice {
    pub id: i64,
    pub title: String,
    pub selected: bool,
}

pub fn group_choices(groups: &[Group], selected: Option<i64>) -> Vec<GroupChoice> {
    groups
        .iter()
        .map(|g| GroupChoice {
            id: g.id,
            title: g.title.clone(),
            selected: Some(g.id) == selected,
        })
        .collect()
}
