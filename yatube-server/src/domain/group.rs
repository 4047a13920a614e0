use serde::{Deserialize, Serialize};

use super::error::DomainError;

const SLUG_MAX_LEN: usize = 50;
const TITLE_MAX_LEN: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Group {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) slug: String,
    pub(crate) description: String,
}

#[derive(Debug, Clone)]
pub(crate) struct NewGroupRequest {
    pub(crate) title: String,
    pub(crate) slug: String,
    pub(crate) description: String,
}

impl NewGroupRequest {
    pub(crate) fn validate(self) -> Result<Self, DomainError> {
        let title = self.title.trim();
        if title.is_empty() || title.chars().count() > TITLE_MAX_LEN {
            return Err(DomainError::Validation {
                field: "title",
                message: "must be 1..200 chars",
            });
        }

        Ok(Self {
            title: title.to_string(),
            slug: normalize_slug(&self.slug)?,
            description: self.description.trim().to_string(),
        })
    }
}

/// Slugs follow the URL converter rules: ASCII letters, digits, '-' and '_'.
pub(crate) fn normalize_slug(slug: &str) -> Result<String, DomainError> {
    let slug = slug.trim();
    let valid_chars = slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if slug.is_empty() || slug.len() > SLUG_MAX_LEN || !valid_chars {
        return Err(DomainError::Validation {
            field: "slug",
            message: "must be 1..50 chars of [A-Za-z0-9_-]",
        });
    }
    Ok(slug.to_string())
}
