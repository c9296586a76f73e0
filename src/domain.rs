//! Task and user entities.
//!
//! Validation happens at construction: an entity you can hold is an entity
//! that passed its checks. Violations come back as `400` validation errors
//! with the offending field named in the message.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;

const MAX_TITLE_LEN: usize = 120;
const MAX_NAME_LEN: usize = 60;

/// A task. `done` starts false; timestamps are set on construction and
/// maintained by [`touch`](Task::touch).
#[derive(Clone, Debug, Serialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub done: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(title: impl Into<String>, description: Option<String>) -> Result<Self, AppError> {
        let title = valid_title(title.into())?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            title,
            description,
            done: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies an update. Only provided fields change; `updated_at` always
    /// does.
    pub fn apply(
        mut self,
        title: Option<String>,
        description: Option<String>,
        done: Option<bool>,
    ) -> Result<Self, AppError> {
        if let Some(title) = title {
            self.title = valid_title(title)?;
        }
        if let Some(description) = description {
            self.description = Some(description);
        }
        if let Some(done) = done {
            self.done = done;
        }
        self.updated_at = Utc::now();
        Ok(self)
    }
}

fn valid_title(title: String) -> Result<String, AppError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("title must not be empty"));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::validation(format!(
            "title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(trimmed.to_owned())
}

/// A registered user. Registration is the only operation; credentials are
/// the pre-shared-key table's concern, not this entity's.
#[derive(Clone, Debug, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: impl Into<String>) -> Result<Self, AppError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AppError::validation("name must not be empty"));
        }
        if trimmed.chars().count() > MAX_NAME_LEN {
            return Err(AppError::validation(format!(
                "name must be at most {MAX_NAME_LEN} characters"
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name: trimmed.to_owned(),
            created_at: Utc::now(),
        })
    }
}
