//! Tournament data models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Tournament ID type
pub type TournamentId = String;

/// Listed tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    /// Diamonds shared among winners
    pub prize_pool: i64,
    /// PKR charged from deposit funds
    pub entry_fee: i64,
    pub format: String,
    pub starts_on: NaiveDate,
}

/// Set of tournaments open for registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentCatalog {
    tournaments: Vec<Tournament>,
}

impl TournamentCatalog {
    /// Create a catalog from a list of tournaments
    pub fn new(tournaments: Vec<Tournament>) -> Self {
        Self { tournaments }
    }

    /// Parse a catalog from a JSON array of tournaments
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Look up a tournament by ID
    pub fn get(&self, id: &str) -> Option<&Tournament> {
        self.tournaments.iter().find(|t| t.id == id)
    }

    /// All tournaments in listing order
    pub fn list(&self) -> &[Tournament] {
        &self.tournaments
    }
}

impl Default for TournamentCatalog {
    /// The launch line-up of battle royale events
    fn default() -> Self {
        Self::new(vec![
            Tournament {
                id: "vf-clash-1".to_string(),
                name: "Battle Royale (Solo)".to_string(),
                prize_pool: 10_000,
                entry_fee: 500,
                format: "4v4 Squad Battle".to_string(),
                starts_on: date(2024, 7, 30),
            },
            Tournament {
                id: "lone-wolf-2".to_string(),
                name: "Battle Royale (Duo/Team)".to_string(),
                prize_pool: 5_000,
                entry_fee: 250,
                format: "1v1 Solo Duel".to_string(),
                starts_on: date(2024, 8, 5),
            },
            Tournament {
                id: "squad-wars-3".to_string(),
                name: "Battle Royale (Squad/Team)".to_string(),
                prize_pool: 25_000,
                entry_fee: 1_000,
                format: "4v4 Squad Battle".to_string(),
                starts_on: date(2024, 8, 15),
            },
        ])
    }
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let catalog = TournamentCatalog::default();
        assert_eq!(catalog.list().len(), 3);

        let squad = catalog.get("squad-wars-3").unwrap();
        assert_eq!(squad.entry_fee, 1_000);
        assert_eq!(squad.starts_on, NaiveDate::from_ymd_opt(2024, 8, 15).unwrap());
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            {
                "id": "weekly-1",
                "name": "Weekly Cup",
                "prize_pool": 2000,
                "entry_fee": 100,
                "format": "Solo",
                "starts_on": "2026-11-01"
            }
        ]"#;
        let catalog = TournamentCatalog::from_json(json).unwrap();
        assert_eq!(catalog.get("weekly-1").unwrap().entry_fee, 100);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(TournamentCatalog::from_json("{not json").is_err());
    }
}
