//! Event catalog model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A fest event open for registration.
///
/// The `[min_team_size, max_team_size]` range bounds how many participants a
/// registration for this event may carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInfo {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub day: String,
    pub time: String,
    pub location: String,
    pub min_team_size: i32,
    pub max_team_size: i32,
    /// Entry fee in rupees.
    pub entry_fee: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventInfo {
    /// Checks whether a roster of `count` participants fits this event.
    pub fn accepts_team_of(&self, count: usize) -> bool {
        let count = count as i64;
        count >= self.min_team_size as i64 && count <= self.max_team_size as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn talsutra() -> EventInfo {
        EventInfo {
            id: 1,
            name: "Talsutra".to_string(),
            code: "TALSUTRA".to_string(),
            day: "Day 1".to_string(),
            time: "10:00 AM".to_string(),
            location: "Main Auditorium".to_string(),
            min_team_size: 1,
            max_team_size: 4,
            entry_fee: 200.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_accepts_team_within_bounds() {
        let event = talsutra();
        assert!(event.accepts_team_of(1));
        assert!(event.accepts_team_of(3));
        assert!(event.accepts_team_of(4));
    }

    #[test]
    fn test_rejects_team_outside_bounds() {
        let event = talsutra();
        assert!(!event.accepts_team_of(0));
        assert!(!event.accepts_team_of(5));
    }
}
