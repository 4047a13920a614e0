use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::DomainError;

const TITLE_CHARS: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Author {
    pub(crate) id: i64,
    pub(crate) username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct GroupRef {
    pub(crate) id: i64,
    pub(crate) slug: String,
    pub(crate) title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Post {
    pub(crate) id: i64,
    pub(crate) text: String,
    pub(crate) author: Author,
    pub(crate) group: Option<GroupRef>,
    pub(crate) created_at: DateTime<Utc>,
}

impl Post {
    pub(crate) fn new(
        id: i64,
        text: impl Into<String>,
        author: Author,
        group: Option<GroupRef>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        validate_positive_i64("id", id)?;
        validate_positive_i64("author_id", author.id)?;
        if let Some(group) = &group {
            validate_positive_i64("group_id", group.id)?;
        }
        let text = normalize_text(&text.into())?;

        Ok(Self {
            id,
            text,
            author,
            group,
            created_at,
        })
    }

    /// Heading used by the detail page.
    pub(crate) fn title(&self) -> String {
        self.text.chars().take(TITLE_CHARS).collect()
    }

    pub(crate) fn group_id(&self) -> Option<i64> {
        self.group.as_ref().map(|group| group.id)
    }
}

/// Raw values submitted through the create/edit form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct PostForm {
    pub(crate) text: String,
    pub(crate) group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ValidPost {
    pub(crate) text: String,
    pub(crate) group_id: Option<i64>,
}

impl PostForm {
    pub(crate) fn from_post(post: &Post) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group_id().map(|id| id.to_string()),
        }
    }

    pub(crate) fn validate(&self) -> Result<ValidPost, DomainError> {
        let text = normalize_text(&self.text)?;
        let group_id = parse_group_choice(self.group.as_deref())?;
        Ok(ValidPost { text, group_id })
    }
}

fn validate_positive_i64(field: &'static str, value: i64) -> Result<(), DomainError> {
    if value <= 0 {
        return Err(DomainError::Validation {
            field,
            message: "must be > 0",
        });
    }
    Ok(())
}

fn normalize_text(text: &str) -> Result<String, DomainError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DomainError::Validation {
            field: "text",
            message: "this field is required",
        });
    }
    Ok(text.to_string())
}

fn parse_group_choice(raw: Option<&str>) -> Result<Option<i64>, DomainError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };

    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(Some(id)),
        _ => Err(DomainError::Validation {
            field: "group",
            message: "select a valid choice",
        }),
    }
}
