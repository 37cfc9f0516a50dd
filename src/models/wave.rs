// Wave database model and API DTOs
// A wave covers an inclusive waitlist-rank range and cycles inactive -> active -> inactive

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::schema::waves;

/// Access wave as stored in the database
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = waves)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Wave {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub start_position: i32,
    pub end_position: i32,
    pub is_active: bool,
    pub activated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wave {
    /// Whether a waitlist rank falls inside this wave's inclusive range
    pub fn covers(&self, position: i32) -> bool {
        position >= self.start_position && position <= self.end_position
    }
}

/// New wave for insertion, always created inactive
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = waves)]
pub struct NewWave {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub start_position: i32,
    pub end_position: i32,
    pub is_active: bool,
    pub activated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewWave {
    pub fn inactive(
        name: String,
        description: Option<String>,
        start_position: i32,
        end_position: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            start_position,
            end_position,
            is_active: false,
            activated_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Field changes for an inactive wave
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = waves)]
pub struct WaveChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub start_position: Option<i32>,
    pub end_position: Option<i32>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Request to create a wave
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateWaveRequest {
    #[validate(length(min = 1, max = 100, message = "Wave name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(max = 1000, message = "Description must be less than 1000 characters"))]
    pub description: Option<String>,

    #[validate(range(min = 1, message = "Start position must be at least 1"))]
    pub start_position: i32,

    #[validate(range(min = 1, message = "End position must be at least 1"))]
    pub end_position: i32,
}

/// Request to update an inactive wave
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateWaveRequest {
    #[validate(length(min = 1, max = 100, message = "Wave name must be 1-100 characters"))]
    pub name: Option<String>,

    pub description: Option<Option<String>>,

    #[validate(range(min = 1, message = "Start position must be at least 1"))]
    pub start_position: Option<i32>,

    #[validate(range(min = 1, message = "End position must be at least 1"))]
    pub end_position: Option<i32>,
}
