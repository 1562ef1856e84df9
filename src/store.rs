//! SQLite-backed directory service for the domain model.
//!
//! All consistency comes from the schema: unique constraints reject
//! duplicate trip titles, duplicate grants, and duplicate note files
//! (surfaced as [`StoreError::Conflict`]), and `ON DELETE CASCADE`
//! makes a trip deletion atomically remove its stops, notes, and
//! grants. Handlers never pre-check-then-insert.

use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::access::TripAccess;
use crate::domain::{Person, Trip, TripNote, TripStop, TripSummary};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An insert hit a uniqueness constraint.
    #[error("row violates a uniqueness constraint")]
    Conflict,
    /// The referenced row does not exist (or no longer exists).
    #[error("no such row")]
    NotFound,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

fn insert_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db) = e {
        if db.is_unique_violation() {
            return StoreError::Conflict;
        }
    }
    StoreError::Db(e)
}

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn connect(db_path: &str) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;
        let store = Self { pool };
        store.create_tables().await?;
        Ok(store)
    }

    /// In-memory database for tests.
    #[cfg(test)]
    pub async fn connect_memory() -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;
        let store = Self { pool };
        store.create_tables().await?;
        Ok(store)
    }

    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    async fn create_tables(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                age INTEGER,
                country TEXT,
                city TEXT,
                bio TEXT
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS travels (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT,
                owner_id INTEGER NOT NULL REFERENCES users(id),
                UNIQUE(title, owner_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS travel_locations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                city TEXT NOT NULL,
                start_date TEXT,
                end_date TEXT,
                latitude TEXT NOT NULL,
                longitude TEXT NOT NULL,
                travel_id INTEGER NOT NULL
                    REFERENCES travels(id) ON DELETE CASCADE
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS travel_notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                file_id TEXT NOT NULL,
                file_name TEXT NOT NULL,
                is_public INTEGER NOT NULL DEFAULT 0,
                travel_id INTEGER NOT NULL
                    REFERENCES travels(id) ON DELETE CASCADE,
                UNIQUE(file_id, travel_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS travel_access (
                user_id INTEGER NOT NULL REFERENCES users(id),
                travel_id INTEGER NOT NULL
                    REFERENCES travels(id) ON DELETE CASCADE,
                UNIQUE(travel_id, user_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // --- users ---

    pub async fn user(&self, id: i64) -> Result<Option<Person>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, age, country, city, bio FROM users WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| person_from_row(&r)))
    }

    /// Registration step one: create the row if it is missing, update
    /// name and age if it is not.
    pub async fn upsert_user_age(
        &self,
        id: i64,
        name: &str,
        age: i64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO users (id, name, age) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET name = ?2, age = ?3",
        )
        .bind(id)
        .bind(name)
        .bind(age)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_user_country(&self, id: i64, country: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET country = ?2 WHERE id = ?1")
            .bind(id)
            .bind(country)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_user_city(&self, id: i64, city: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET city = ?2 WHERE id = ?1")
            .bind(id)
            .bind(city)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_user_home(
        &self,
        id: i64,
        country: &str,
        city: &str,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET country = ?2, city = ?3 WHERE id = ?1")
            .bind(id)
            .bind(country)
            .bind(city)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_user_bio(&self, id: i64, bio: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET bio = ?2 WHERE id = ?1")
            .bind(id)
            .bind(bio)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // --- trips ---

    pub async fn create_trip(&self, title: &str, owner_id: i64) -> Result<Trip, StoreError> {
        let row = sqlx::query(
            "INSERT INTO travels (title, owner_id) VALUES (?1, ?2) RETURNING id",
        )
        .bind(title)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(insert_error)?;
        Ok(Trip {
            id: row.get("id"),
            title: title.to_string(),
            description: None,
            owner_id,
        })
    }

    pub async fn trip(&self, id: i64) -> Result<Trip, StoreError> {
        let row = sqlx::query(
            "SELECT id, title, description, owner_id FROM travels WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;
        Ok(Trip {
            id: row.get("id"),
            title: row.get("title"),
            description: row.get("description"),
            owner_id: row.get("owner_id"),
        })
    }

    pub async fn set_trip_description(
        &self,
        id: i64,
        description: &str,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE travels SET description = ?2 WHERE id = ?1")
            .bind(id)
            .bind(description)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Cascades to the trip's stops, notes, and grants.
    pub async fn delete_trip(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM travels WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Trips the person can see: their own plus those granted to them,
    /// most recently created first.
    pub async fn trips_for_user(&self, user_id: i64) -> Result<Vec<TripSummary>, StoreError> {
        let rows = sqlx::query(
            "SELECT t.id, t.title, u.name AS owner_name
             FROM travels t JOIN users u ON u.id = t.owner_id
             WHERE t.owner_id = ?1
                OR t.id IN (SELECT travel_id FROM travel_access WHERE user_id = ?1)
             ORDER BY t.id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|r| TripSummary {
                id: r.get("id"),
                title: r.get("title"),
                owner_name: r.get("owner_name"),
            })
            .collect())
    }

    // --- access grants ---

    pub async fn trip_access(&self, trip_id: i64) -> Result<TripAccess, StoreError> {
        let trip = self.trip(trip_id).await?;
        let rows = sqlx::query("SELECT user_id FROM travel_access WHERE travel_id = ?1")
            .bind(trip_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(TripAccess {
            owner_id: trip.owner_id,
            grantee_ids: rows.iter().map(|r| r.get("user_id")).collect(),
        })
    }

    pub async fn add_grant(&self, trip_id: i64, user_id: i64) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO travel_access (user_id, travel_id) VALUES (?1, ?2)")
            .bind(user_id)
            .bind(trip_id)
            .execute(&self.pool)
            .await
            .map_err(insert_error)?;
        Ok(())
    }

    /// Everyone the trip is shared with, for mention links and the
    /// grant notification fan-out.
    pub async fn grantees(&self, trip_id: i64) -> Result<Vec<Person>, StoreError> {
        let rows = sqlx::query(
            "SELECT u.id, u.name, u.age, u.country, u.city, u.bio
             FROM users u JOIN travel_access a ON a.user_id = u.id
             WHERE a.travel_id = ?1
             ORDER BY u.id",
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(person_from_row).collect())
    }

    // --- stops ---

    /// Provisional insert: city and coordinates only. The date steps
    /// of the creation flow complete the row.
    pub async fn create_stop(
        &self,
        travel_id: i64,
        city: &str,
        latitude: &str,
        longitude: &str,
    ) -> Result<TripStop, StoreError> {
        let row = sqlx::query(
            "INSERT INTO travel_locations (city, latitude, longitude, travel_id)
             VALUES (?1, ?2, ?3, ?4) RETURNING id",
        )
        .bind(city)
        .bind(latitude)
        .bind(longitude)
        .bind(travel_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(TripStop {
            id: row.get("id"),
            city: city.to_string(),
            start_date: None,
            end_date: None,
            latitude: latitude.to_string(),
            longitude: longitude.to_string(),
            travel_id,
        })
    }

    pub async fn stop(&self, id: i64) -> Result<TripStop, StoreError> {
        let row = sqlx::query(
            "SELECT id, city, start_date, end_date, latitude, longitude, travel_id
             FROM travel_locations WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;
        Ok(stop_from_row(&row))
    }

    pub async fn set_stop_start_date(&self, id: i64, date: NaiveDate) -> Result<(), StoreError> {
        sqlx::query("UPDATE travel_locations SET start_date = ?2 WHERE id = ?1")
            .bind(id)
            .bind(date)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_stop_end_date(&self, id: i64, date: NaiveDate) -> Result<(), StoreError> {
        sqlx::query("UPDATE travel_locations SET end_date = ?2 WHERE id = ?1")
            .bind(id)
            .bind(date)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_stop(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM travel_locations WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Stops in itinerary order; incomplete stops (no start date yet)
    /// sort first.
    pub async fn stops(&self, travel_id: i64) -> Result<Vec<TripStop>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, city, start_date, end_date, latitude, longitude, travel_id
             FROM travel_locations WHERE travel_id = ?1
             ORDER BY start_date ASC, id ASC",
        )
        .bind(travel_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(stop_from_row).collect())
    }

    // --- notes ---

    /// Notes start private until the visibility step flips them.
    pub async fn create_note(
        &self,
        travel_id: i64,
        file_id: &str,
        file_name: &str,
    ) -> Result<TripNote, StoreError> {
        let row = sqlx::query(
            "INSERT INTO travel_notes (file_id, file_name, travel_id)
             VALUES (?1, ?2, ?3) RETURNING id",
        )
        .bind(file_id)
        .bind(file_name)
        .bind(travel_id)
        .fetch_one(&self.pool)
        .await
        .map_err(insert_error)?;
        Ok(TripNote {
            id: row.get("id"),
            file_id: file_id.to_string(),
            file_name: file_name.to_string(),
            is_public: false,
            travel_id,
        })
    }

    pub async fn note(&self, id: i64) -> Result<TripNote, StoreError> {
        let row = sqlx::query(
            "SELECT id, file_id, file_name, is_public, travel_id
             FROM travel_notes WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;
        Ok(note_from_row(&row))
    }

    pub async fn set_note_visibility(&self, id: i64, public: bool) -> Result<(), StoreError> {
        sqlx::query("UPDATE travel_notes SET is_public = ?2 WHERE id = ?1")
            .bind(id)
            .bind(public)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_note(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM travel_notes WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Newest first. Non-owners only ever see public notes, filtered
    /// here before pagination.
    pub async fn notes(
        &self,
        travel_id: i64,
        public_only: bool,
    ) -> Result<Vec<TripNote>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, file_id, file_name, is_public, travel_id
             FROM travel_notes
             WHERE travel_id = ?1 AND (?2 = 0 OR is_public = 1)
             ORDER BY id DESC",
        )
        .bind(travel_id)
        .bind(public_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(note_from_row).collect())
    }
}

fn person_from_row(row: &sqlx::sqlite::SqliteRow) -> Person {
    Person {
        id: row.get("id"),
        name: row.get("name"),
        age: row.get("age"),
        country: row.get("country"),
        city: row.get("city"),
        bio: row.get("bio"),
    }
}

fn stop_from_row(row: &sqlx::sqlite::SqliteRow) -> TripStop {
    TripStop {
        id: row.get("id"),
        city: row.get("city"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        travel_id: row.get("travel_id"),
    }
}

fn note_from_row(row: &sqlx::sqlite::SqliteRow) -> TripNote {
    TripNote {
        id: row.get("id"),
        file_id: row.get("file_id"),
        file_name: row.get("file_name"),
        is_public: row.get("is_public"),
        travel_id: row.get("travel_id"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_users() -> Store {
        let store = Store::connect_memory().await.unwrap();
        store.upsert_user_age(1, "Alice", 30).await.unwrap();
        store.upsert_user_age(2, "Bob", 25).await.unwrap();
        store
    }

    #[tokio::test]
    async fn upsert_user_is_idempotent_on_id() {
        let store = Store::connect_memory().await.unwrap();
        store.upsert_user_age(1, "Alice", 30).await.unwrap();
        store.upsert_user_age(1, "Alice B.", 31).await.unwrap();
        let user = store.user(1).await.unwrap().unwrap();
        assert_eq!(user.name, "Alice B.");
        assert_eq!(user.age, Some(31));
    }

    #[tokio::test]
    async fn duplicate_title_conflicts_per_owner_only() {
        let store = store_with_users().await;
        store.create_trip("Italy", 1).await.unwrap();
        let err = store.create_trip("Italy", 1).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict));
        // Same title for a different owner is fine.
        store.create_trip("Italy", 2).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_note_file_conflicts() {
        let store = store_with_users().await;
        let trip = store.create_trip("Italy", 1).await.unwrap();
        store.create_note(trip.id, "file-1", "notes.pdf").await.unwrap();
        let err = store
            .create_note(trip.id, "file-1", "notes.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict));
        // The same file on another trip is fine.
        let other = store.create_trip("France", 1).await.unwrap();
        store.create_note(other.id, "file-1", "notes.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_grant_conflicts() {
        let store = store_with_users().await;
        let trip = store.create_trip("Italy", 1).await.unwrap();
        store.add_grant(trip.id, 2).await.unwrap();
        let err = store.add_grant(trip.id, 2).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict));
    }

    #[tokio::test]
    async fn trip_list_unions_owned_and_granted_newest_first() {
        let store = store_with_users().await;
        let owned = store.create_trip("Italy", 1).await.unwrap();
        let shared = store.create_trip("Norway", 2).await.unwrap();
        store.add_grant(shared.id, 1).await.unwrap();

        let trips = store.trips_for_user(1).await.unwrap();
        let ids: Vec<i64> = trips.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![shared.id, owned.id]);
        assert_eq!(trips[0].owner_name, "Bob");
    }

    #[tokio::test]
    async fn stops_order_by_start_date_incomplete_first() {
        let store = store_with_users().await;
        let trip = store.create_trip("Italy", 1).await.unwrap();
        let rome = store
            .create_stop(trip.id, "Rome", "41.9", "12.5")
            .await
            .unwrap();
        let milan = store
            .create_stop(trip.id, "Milan", "45.5", "9.2")
            .await
            .unwrap();
        let naples = store
            .create_stop(trip.id, "Naples", "40.8", "14.3")
            .await
            .unwrap();
        store
            .set_stop_start_date(rome.id, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap())
            .await
            .unwrap();
        store
            .set_stop_start_date(milan.id, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .await
            .unwrap();

        let stops = store.stops(trip.id).await.unwrap();
        let ids: Vec<i64> = stops.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![naples.id, milan.id, rome.id]);
    }

    #[tokio::test]
    async fn notes_filter_public_only_for_non_owners() {
        let store = store_with_users().await;
        let trip = store.create_trip("Italy", 1).await.unwrap();
        let secret = store.create_note(trip.id, "f1", "secret.pdf").await.unwrap();
        let open = store.create_note(trip.id, "f2", "open.pdf").await.unwrap();
        store.set_note_visibility(open.id, true).await.unwrap();

        let all = store.notes(trip.id, false).await.unwrap();
        assert_eq!(all.len(), 2);
        // Newest first.
        assert_eq!(all[0].id, open.id);
        assert_eq!(all[1].id, secret.id);

        let public = store.notes(trip.id, true).await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].id, open.id);
    }

    #[tokio::test]
    async fn deleting_trip_cascades_to_dependents() {
        let store = store_with_users().await;
        let trip = store.create_trip("Italy", 1).await.unwrap();
        let stop = store
            .create_stop(trip.id, "Rome", "41.9", "12.5")
            .await
            .unwrap();
        let note = store.create_note(trip.id, "f1", "a.pdf").await.unwrap();
        store.add_grant(trip.id, 2).await.unwrap();

        store.delete_trip(trip.id).await.unwrap();

        assert!(matches!(store.trip(trip.id).await, Err(StoreError::NotFound)));
        assert!(matches!(store.stop(stop.id).await, Err(StoreError::NotFound)));
        assert!(matches!(store.note(note.id).await, Err(StoreError::NotFound)));
        assert!(store.trips_for_user(2).await.unwrap().is_empty());
    }

    /// The shared-trip scenario: the owner creates a trip and a stop,
    /// grants access, the grantee can read but not write, and deleting
    /// the trip makes the stop unresolvable.
    #[tokio::test]
    async fn shared_trip_lifecycle() {
        let store = store_with_users().await;
        let trip = store.create_trip("Italy", 1).await.unwrap();
        let stop = store
            .create_stop(trip.id, "Rome", "41.9", "12.5")
            .await
            .unwrap();
        store
            .set_stop_start_date(stop.id, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .await
            .unwrap();
        store
            .set_stop_end_date(stop.id, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap())
            .await
            .unwrap();
        store.add_grant(trip.id, 2).await.unwrap();

        let access = store.trip_access(trip.id).await.unwrap();
        assert!(access.can_read(2));
        assert!(!access.can_write(2));
        assert!(access.can_write(1));

        store.delete_trip(trip.id).await.unwrap();
        assert!(matches!(store.stop(stop.id).await, Err(StoreError::NotFound)));
    }
}
