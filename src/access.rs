//! Access-control policy for shared trips.
//!
//! Three predicates cover every disclosure and mutation in the bot.
//! A trip's accessible set is the owner plus its grantees; only the
//! owner may mutate anything, and private notes stay owner-only no
//! matter who has been granted access.

/// The access-relevant slice of a trip: its owner and the people it
/// has been shared with. Owner access is implicit — no grant row
/// exists for the owner.
#[derive(Debug, Clone)]
pub struct TripAccess {
    pub owner_id: i64,
    pub grantee_ids: Vec<i64>,
}

impl TripAccess {
    pub fn can_read(&self, person_id: i64) -> bool {
        person_id == self.owner_id || self.grantee_ids.contains(&person_id)
    }

    pub fn can_write(&self, person_id: i64) -> bool {
        person_id == self.owner_id
    }

    pub fn can_read_note(&self, person_id: i64, note_is_public: bool) -> bool {
        self.can_read(person_id) && (person_id == self.owner_id || note_is_public)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared() -> TripAccess {
        TripAccess {
            owner_id: 1,
            grantee_ids: vec![2, 3],
        }
    }

    #[test]
    fn owner_and_grantees_can_read() {
        let access = shared();
        assert!(access.can_read(1));
        assert!(access.can_read(2));
        assert!(access.can_read(3));
        assert!(!access.can_read(4));
    }

    #[test]
    fn only_owner_can_write() {
        let access = shared();
        assert!(access.can_write(1));
        assert!(!access.can_write(2));
        assert!(!access.can_write(4));
    }

    #[test]
    fn private_notes_are_owner_only() {
        let access = shared();
        assert!(access.can_read_note(1, false));
        assert!(!access.can_read_note(2, false));
        assert!(!access.can_read_note(4, false));
    }

    #[test]
    fn public_notes_follow_trip_access() {
        let access = shared();
        assert!(access.can_read_note(1, true));
        assert!(access.can_read_note(2, true));
        assert!(!access.can_read_note(4, true));
    }
}
