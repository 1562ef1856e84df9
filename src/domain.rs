use chrono::NaiveDate;

/// A registered bot user. The id is the Telegram user id and is never
/// generated by us; everything else is filled in by the registration
/// and profile-edit flows.
#[derive(Debug, Clone)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub age: Option<i64>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub bio: Option<String>,
}

/// A travel plan owned by exactly one person. `(title, owner_id)` is
/// unique per the `travels` table constraint.
#[derive(Debug, Clone)]
pub struct Trip {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: i64,
}

/// A row of the trip list view: enough to label a button.
#[derive(Debug, Clone)]
pub struct TripSummary {
    pub id: i64,
    pub title: String,
    pub owner_name: String,
}

/// A city visited during a trip. Created provisionally with city and
/// coordinates only; the date steps of the stop-creation flow fill in
/// `start_date` and `end_date` afterwards. Coordinates are kept as
/// text so they round-trip exactly.
#[derive(Debug, Clone)]
pub struct TripStop {
    pub id: i64,
    pub city: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub latitude: String,
    pub longitude: String,
    pub travel_id: i64,
}

impl TripStop {
    pub fn coords(&self) -> Option<(f64, f64)> {
        let lat = self.latitude.parse().ok()?;
        let lon = self.longitude.parse().ok()?;
        Some((lat, lon))
    }
}

/// A file attached to a trip. `(file_id, travel_id)` is unique: the
/// same uploaded file cannot be attached twice to the same trip.
#[derive(Debug, Clone)]
pub struct TripNote {
    pub id: i64,
    pub file_id: String,
    pub file_name: String,
    pub is_public: bool,
    pub travel_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_coords_round_trip() {
        let stop = TripStop {
            id: 1,
            city: "Rome".into(),
            start_date: None,
            end_date: None,
            latitude: "41.9028".into(),
            longitude: "12.4964".into(),
            travel_id: 1,
        };
        assert_eq!(stop.coords(), Some((41.9028, 12.4964)));
    }

    #[test]
    fn stop_coords_reject_garbage() {
        let stop = TripStop {
            id: 1,
            city: "Rome".into(),
            start_date: None,
            end_date: None,
            latitude: "not-a-number".into(),
            longitude: "12.4964".into(),
            travel_id: 1,
        };
        assert_eq!(stop.coords(), None);
    }
}
