//! Input forms and their field-level validation.
//!
//! A form that fails validation is never persisted; every failing field is
//! reported at once so the client can redisplay the form with all messages.

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

const MAX_TITLE_LEN: usize = 256;
const MAX_NAME_LEN: usize = 150;
const MIN_PASSWORD_LEN: usize = 8;

/// Collected validation messages, formatted as `field: message`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl fmt::Display) {
        self.0.push(format!("{field}: {message}"));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn into_messages(self) -> Vec<String> {
        self.0
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("; "))
    }
}

fn require(errors: &mut ValidationErrors, field: &str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.add(field, "This field is required.");
        return false;
    }
    true
}

fn max_len(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(field, format_args!("Ensure this value has at most {max} characters."));
    }
}

fn check_username(errors: &mut ValidationErrors, username: &str) {
    if !require(errors, "username", username) {
        return;
    }
    max_len(errors, "username", username, MAX_NAME_LEN);
    let valid = username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    if !valid {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
}

fn check_email(errors: &mut ValidationErrors, email: &str) {
    if !require(errors, "email", email) {
        return;
    }
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !well_formed {
        errors.add("email", "Enter a valid email address.");
    }
}

/// Fields of a post as submitted by its author.
#[derive(Debug, Clone)]
pub struct PostForm {
    pub title: String,
    pub text: String,
    pub image: Option<String>,
    /// Defaults to the moment of submission when absent.
    pub pub_date: Option<DateTime<Utc>>,
    pub is_published: bool,
    pub category_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
}

impl PostForm {
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if require(&mut errors, "title", &self.title) {
            max_len(&mut errors, "title", &self.title, MAX_TITLE_LEN);
        }
        require(&mut errors, "text", &self.text);
        if let Some(image) = &self.image {
            if image.trim().is_empty() {
                errors.add("image", "The submitted file is empty.");
            }
        }
        errors
    }
}

#[derive(Debug, Clone)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        require(&mut errors, "text", &self.text);
        errors
    }
}

/// Display fields a user may change on their own profile.
#[derive(Debug, Clone)]
pub struct ProfileForm {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl ProfileForm {
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        check_username(&mut errors, &self.username);
        check_email(&mut errors, &self.email);
        max_len(&mut errors, "first_name", &self.first_name, MAX_NAME_LEN);
        max_len(&mut errors, "last_name", &self.last_name, MAX_NAME_LEN);
        errors
    }
}

#[derive(Debug, Clone)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        check_username(&mut errors, &self.username);
        check_email(&mut errors, &self.email);
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.add(
                "password",
                format_args!("Password must be at least {MIN_PASSWORD_LEN} characters."),
            );
        }
        errors
    }
}

#[derive(Debug, Clone)]
pub struct CategoryForm {
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
}

impl CategoryForm {
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if require(&mut errors, "title", &self.title) {
            max_len(&mut errors, "title", &self.title, MAX_TITLE_LEN);
        }
        if require(&mut errors, "slug", &self.slug) {
            let valid = self
                .slug
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            if !valid {
                errors.add(
                    "slug",
                    "Enter a valid slug consisting of Latin letters, numbers, underscores or hyphens.",
                );
            }
        }
        errors
    }
}

#[derive(Debug, Clone)]
pub struct LocationForm {
    pub name: String,
}

impl LocationForm {
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if require(&mut errors, "name", &self.name) {
            max_len(&mut errors, "name", &self.name, MAX_TITLE_LEN);
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_form() -> PostForm {
        PostForm {
            title: "Trip".into(),
            text: "We went hiking.".into(),
            image: None,
            pub_date: None,
            is_published: true,
            category_id: None,
            location_id: None,
        }
    }

    #[test]
    fn blank_comment_is_rejected() {
        let errors = CommentForm { text: "   ".into() }.validate();
        assert_eq!(errors.messages(), ["text: This field is required."]);
    }

    #[test]
    fn post_form_collects_every_error() {
        let form = PostForm {
            title: "x".repeat(300),
            text: String::new(),
            ..post_form()
        };
        let errors = form.validate();
        assert_eq!(errors.messages().len(), 2);
        assert!(errors.messages()[0].starts_with("title:"));
        assert!(errors.messages()[1].starts_with("text:"));
    }

    #[test]
    fn valid_post_form_passes() {
        assert!(post_form().validate().into_result().is_ok());
    }

    #[test]
    fn username_rejects_spaces() {
        let form = ProfileForm {
            username: "john doe".into(),
            email: "john@example.com".into(),
            first_name: String::new(),
            last_name: String::new(),
        };
        let errors = form.validate();
        assert_eq!(errors.messages().len(), 1);
        assert!(errors.messages()[0].starts_with("username:"));
    }

    #[test]
    fn registration_requires_long_password_and_email() {
        let form = RegistrationForm {
            username: "jane".into(),
            email: "not-an-email".into(),
            password: "short".into(),
        };
        let errors = form.validate();
        assert_eq!(errors.messages().len(), 2);
    }

    #[test]
    fn category_slug_must_be_ascii() {
        let form = CategoryForm {
            title: "Путешествия".into(),
            description: String::new(),
            slug: "путешествия".into(),
            is_published: true,
        };
        assert_eq!(form.validate().messages().len(), 1);
    }
}
