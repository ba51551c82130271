use serde::Serialize;
use std::fmt;

use crate::models::PostType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every failed check of a form, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn check_length(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) {
    let len = value.trim().chars().count();
    if len < min {
        if min == 1 {
            errors.add(field, "This field is required");
        } else {
            errors.add(field, format!("Must be at least {min} characters"));
        }
    } else if len > max {
        errors.add(field, format!("Must be {max} characters or less"));
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if !looks_like_email(self.email.trim()) {
            errors.add("email", "Enter a valid email address");
        }
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let username = self.username.trim();
        check_length(&mut errors, "username", username, 3, 30);
        if !username.is_empty()
            && !username
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            errors.add(
                "username",
                "Only letters, numbers, underscores and hyphens are allowed",
            );
        }

        if !looks_like_email(self.email.trim()) {
            errors.add("email", "Enter a valid email address");
        }
        if self.password.chars().count() < 8 {
            errors.add("password", "Password must be at least 8 characters");
        }
        if self.password != self.password_confirm {
            errors.add("password_confirm", "Passwords do not match");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommunityForm {
    pub name: String,
    pub description: String,
}

impl CommunityForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_length(&mut errors, "name", &self.name, 3, 100);
        if self.description.chars().count() > 1000 {
            errors.add("description", "Must be 1000 characters or less");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub post_type: PostType,
}

impl PostForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_length(&mut errors, "title", &self.title, 1, 300);
        if self.content.chars().count() > 10_000 {
            errors.add("content", "Must be 10000 characters or less");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectForm {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community: Option<String>,
}

impl ProjectForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_length(&mut errors, "title", &self.title, 3, 200);
        check_length(&mut errors, "description", &self.description, 1, 5000);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentForm {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl CommentForm {
    pub fn new(content: &str, parent_id: Option<&str>) -> Self {
        Self {
            content: content.trim().to_string(),
            parent_id: parent_id.map(str::to_string),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_length(&mut errors, "content", &self.content, 1, 2000);
        errors.into_result()
    }
}
