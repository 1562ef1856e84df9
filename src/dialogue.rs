//! Per-person conversation state.
//!
//! Each multi-step flow is a handful of named states; the state plus
//! whatever ids the flow carries across turns is one tagged-union
//! value, serialized to JSON and keyed by Telegram user id in SQLite.
//! It is read at the start of handling an event and written on every
//! transition, so flows survive process restarts.

use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::store::StoreError;

/// One variant per conversation state, each carrying only the fields
/// that state actually needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DialogueState {
    // First-contact registration.
    RegisterAge,
    RegisterCountry,
    RegisterCity,
    RegisterBio,
    // Profile re-edit; same shape, different entry and exit.
    EditAge,
    EditCountry,
    EditCity,
    EditBio,
    // Trip flows.
    TripTitle,
    TripDescription { trip_id: i64 },
    StopLocation { trip_id: i64 },
    StopStartDate { stop_id: i64 },
    StopEndDate { stop_id: i64 },
    GrantForward { trip_id: i64 },
    NoteUpload { trip_id: i64 },
    NoteVisibility { note_id: i64 },
}

impl DialogueState {
    /// Registration states are the only ones reachable before a user
    /// row exists.
    pub fn is_registration(&self) -> bool {
        matches!(
            self,
            DialogueState::RegisterAge
                | DialogueState::RegisterCountry
                | DialogueState::RegisterCity
                | DialogueState::RegisterBio
        )
    }
}

#[derive(Clone)]
pub struct DialogueStore {
    pool: SqlitePool,
}

impl DialogueStore {
    pub async fn new(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS dialogue_states (
                user_id INTEGER PRIMARY KEY,
                state TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }

    pub async fn get(&self, user_id: i64) -> Result<Option<DialogueState>, StoreError> {
        let row = sqlx::query("SELECT state FROM dialogue_states WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else { return Ok(None) };
        let raw: String = row.get("state");
        // A state written by an older build that no longer parses is
        // treated as idle rather than wedging the user.
        match serde_json::from_str(&raw) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                debug!(user_id, error = %e, "discarding unparseable dialogue state");
                self.clear(user_id).await?;
                Ok(None)
            }
        }
    }

    pub async fn set(&self, user_id: i64, state: &DialogueState) -> Result<(), StoreError> {
        let raw = serde_json::to_string(state).expect("dialogue state serializes");
        sqlx::query(
            "INSERT INTO dialogue_states (user_id, state, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET state = ?2, updated_at = ?3",
        )
        .bind(user_id)
        .bind(raw)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn clear(&self, user_id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM dialogue_states WHERE user_id = ?1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_round_trip_through_json() {
        let all = [
            DialogueState::RegisterAge,
            DialogueState::RegisterCountry,
            DialogueState::RegisterCity,
            DialogueState::RegisterBio,
            DialogueState::EditAge,
            DialogueState::EditCountry,
            DialogueState::EditCity,
            DialogueState::EditBio,
            DialogueState::TripTitle,
            DialogueState::TripDescription { trip_id: 5 },
            DialogueState::StopLocation { trip_id: 5 },
            DialogueState::StopStartDate { stop_id: 12 },
            DialogueState::StopEndDate { stop_id: 12 },
            DialogueState::GrantForward { trip_id: 5 },
            DialogueState::NoteUpload { trip_id: 5 },
            DialogueState::NoteVisibility { note_id: 3 },
        ];
        for state in all {
            let raw = serde_json::to_string(&state).unwrap();
            let back: DialogueState = serde_json::from_str(&raw).unwrap();
            assert_eq!(back, state);
        }
    }

    #[test]
    fn registration_states_are_flagged() {
        assert!(DialogueState::RegisterAge.is_registration());
        assert!(DialogueState::RegisterBio.is_registration());
        assert!(!DialogueState::EditAge.is_registration());
        assert!(!DialogueState::TripTitle.is_registration());
    }

    async fn mem_store() -> DialogueStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        DialogueStore::new(pool).await.unwrap()
    }

    #[tokio::test]
    async fn set_get_clear() {
        let store = mem_store().await;
        assert_eq!(store.get(1).await.unwrap(), None);

        store.set(1, &DialogueState::TripTitle).await.unwrap();
        assert_eq!(store.get(1).await.unwrap(), Some(DialogueState::TripTitle));

        // Overwrite moves the same user to a new state.
        store
            .set(1, &DialogueState::StopStartDate { stop_id: 9 })
            .await
            .unwrap();
        assert_eq!(
            store.get(1).await.unwrap(),
            Some(DialogueState::StopStartDate { stop_id: 9 })
        );

        store.clear(1).await.unwrap();
        assert_eq!(store.get(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn states_are_isolated_per_user() {
        let store = mem_store().await;
        store.set(1, &DialogueState::RegisterAge).await.unwrap();
        store
            .set(2, &DialogueState::GrantForward { trip_id: 4 })
            .await
            .unwrap();
        assert_eq!(store.get(1).await.unwrap(), Some(DialogueState::RegisterAge));
        assert_eq!(
            store.get(2).await.unwrap(),
            Some(DialogueState::GrantForward { trip_id: 4 })
        );
    }
}
