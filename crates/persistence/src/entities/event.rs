//! Event catalog entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use domain::models::EventInfo;

/// Database row mapping for the events table.
#[derive(Debug, Clone, FromRow)]
pub struct EventEntity {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub day: String,
    pub time: String,
    pub location: String,
    pub min_team_size: i32,
    pub max_team_size: i32,
    pub entry_fee: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EventEntity> for EventInfo {
    fn from(entity: EventEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            code: entity.code,
            day: entity.day,
            time: entity.time,
            location: entity.location,
            min_team_size: entity.min_team_size,
            max_team_size: entity.max_team_size,
            entry_fee: entity.entry_fee,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
