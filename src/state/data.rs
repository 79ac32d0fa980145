/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the database layer and the UI layer.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Represents a single crime in the notebook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crime {
    /// Unique identifier, assigned once at creation
    pub id: Uuid,
    /// Short description (may be empty)
    pub title: String,
    /// When the crime happened
    pub date: DateTime<Utc>,
    /// Whether the crime has been solved
    pub is_solved: bool,
    /// Name of the suspect (may be empty)
    pub suspect: String,
    /// Serious crimes get their own row style with a "contact police" action
    pub requires_police: bool,
}

impl Crime {
    /// Create a new crime with a fresh id and default values
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    /// Create a crime with default values and the given id
    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            title: String::new(),
            date: Utc::now(),
            is_solved: false,
            suspect: String::new(),
            requires_police: false,
        }
    }

    /// File name of the crime scene photo (e.g., "IMG_<id>.jpg")
    pub fn photo_file_name(&self) -> String {
        format!("IMG_{}.jpg", self.id)
    }
}

impl Default for Crime {
    fn default() -> Self {
        Self::new()
    }
}
