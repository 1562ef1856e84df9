//! Trips, stops, notes, and access grants.
//!
//! Every callback handler re-checks access against the store before
//! acting: button presses can arrive from stale keyboards long after
//! the trip changed hands or disappeared. A missing row is a "Not
//! found" toast, a read/write violation is "Access denied"; neither is
//! an error.

use chrono::NaiveDate;
use teloxide::prelude::*;
use teloxide::types::{InputFile, Message, MessageOrigin, ParseMode};
use tracing::warn;

use super::{location_keyboard, remove_keyboard};
use crate::bot::WayfarerBot;
use crate::dialogue::DialogueState;
use crate::domain::{Trip, TripNote, TripStop};
use crate::enrich::places::pick_top;
use crate::enrich::{DaySummary, PlaceKind, Poi};
use crate::store::StoreError;
use crate::{texts, views};

/// Dates are entered as DD.MM.YYYY throughout.
pub(crate) fn parse_travel_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%d.%m.%Y").ok()
}

fn weather_block(days: &[DaySummary]) -> String {
    if days.is_empty() {
        return texts::WEATHER_UNAVAILABLE.to_string();
    }
    let mut out = String::from("Weather:");
    for day in days {
        out.push_str(&format!(
            "\n{}: {}, {:.1} °C",
            day.date.format("%d.%m.%Y"),
            day.condition,
            day.avg_temp_c,
        ));
    }
    out
}

fn poi_block(heading: &str, entries: &[String], empty_text: &str) -> String {
    if entries.is_empty() {
        return empty_text.to_string();
    }
    let mut out = format!("{}:", heading);
    for entry in entries {
        out.push_str(&format!("\n• {}", entry));
    }
    out
}

impl WayfarerBot {
    // --- lookups that distinguish "gone" from "broken" ---

    async fn trip_or_missing(&self, id: i64) -> anyhow::Result<Option<Trip>> {
        match self.store.trip(id).await {
            Ok(trip) => Ok(Some(trip)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn stop_or_missing(&self, id: i64) -> anyhow::Result<Option<TripStop>> {
        match self.store.stop(id).await {
            Ok(stop) => Ok(Some(stop)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn note_or_missing(&self, id: i64) -> anyhow::Result<Option<TripNote>> {
        match self.store.note(id).await {
            Ok(note) => Ok(Some(note)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // --- message flows ---

    pub(crate) async fn enter_trip_title(
        &self,
        msg: &Message,
        user_id: i64,
    ) -> anyhow::Result<()> {
        let Some(title) = msg.text() else {
            self.bot
                .send_message(msg.chat.id, texts::ENTER_TRAVEL_TITLE)
                .await?;
            return Ok(());
        };
        match self.store.create_trip(title, user_id).await {
            Ok(trip) => {
                self.dialogues.clear(user_id).await?;
                self.show_trip(msg.chat.id, user_id, &trip).await
            }
            // Same state: the next message is another title attempt.
            Err(StoreError::Conflict) => {
                self.bot
                    .send_message(msg.chat.id, texts::TRAVEL_TITLE_CONFLICT)
                    .await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) async fn enter_trip_description(
        &self,
        msg: &Message,
        user_id: i64,
        trip_id: i64,
    ) -> anyhow::Result<()> {
        let Some(text) = msg.text() else {
            self.bot
                .send_message(msg.chat.id, texts::ENTER_TRAVEL_DESCRIPTION)
                .await?;
            return Ok(());
        };
        let Some(trip) = self.trip_or_missing(trip_id).await? else {
            self.dialogues.clear(user_id).await?;
            self.bot.send_message(msg.chat.id, texts::NOT_FOUND).await?;
            return Ok(());
        };
        self.store.set_trip_description(trip_id, text).await?;
        self.dialogues.clear(user_id).await?;
        let trip = Trip {
            description: Some(text.to_string()),
            ..trip
        };
        self.show_trip(msg.chat.id, user_id, &trip).await
    }

    /// Stop creation, step one: resolve a city from text or a shared
    /// location, insert the provisional row, move on to the dates.
    pub(crate) async fn enter_stop_location(
        &self,
        msg: &Message,
        user_id: i64,
        trip_id: i64,
    ) -> anyhow::Result<()> {
        if self.trip_or_missing(trip_id).await?.is_none() {
            self.dialogues.clear(user_id).await?;
            self.bot.send_message(msg.chat.id, texts::NOT_FOUND).await?;
            return Ok(());
        }

        let place = if let Some(location) = msg.location() {
            let resolved = match self
                .geocoder
                .reverse(location.latitude, location.longitude)
                .await
            {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!(user_id, error = %e, "reverse geocoding failed");
                    None
                }
            };
            match resolved.and_then(|r| r.city) {
                Some(city) => Some((city, location.latitude, location.longitude)),
                None => {
                    self.bot
                        .send_message(msg.chat.id, texts::LOCATION_NOT_RECOGNIZED)
                        .await?;
                    return Ok(());
                }
            }
        } else if let Some(text) = msg.text() {
            let found = match self.geocoder.find_city(text, None).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(user_id, error = %e, "city lookup failed");
                    None
                }
            };
            match found {
                Some(place) => Some((place.name, place.lat, place.lon)),
                None => {
                    self.bot
                        .send_message(msg.chat.id, texts::INCORRECT_CITY)
                        .await?;
                    return Ok(());
                }
            }
        } else {
            None
        };
        let Some((city, lat, lon)) = place else {
            self.bot
                .send_message(msg.chat.id, texts::ENTER_STOP_LOCATION)
                .await?;
            return Ok(());
        };

        let stop = self
            .store
            .create_stop(trip_id, &city, &lat.to_string(), &lon.to_string())
            .await?;
        self.dialogues
            .set(user_id, &DialogueState::StopStartDate { stop_id: stop.id })
            .await?;
        self.bot
            .send_message(msg.chat.id, texts::ENTER_START_DATE)
            .reply_markup(remove_keyboard())
            .await?;
        Ok(())
    }

    pub(crate) async fn enter_stop_start_date(
        &self,
        msg: &Message,
        user_id: i64,
        stop_id: i64,
    ) -> anyhow::Result<()> {
        let Some(date) = msg.text().and_then(parse_travel_date) else {
            self.bot
                .send_message(msg.chat.id, texts::WRONG_DATE_FORMAT)
                .await?;
            return Ok(());
        };
        if self.stop_or_missing(stop_id).await?.is_none() {
            self.dialogues.clear(user_id).await?;
            self.bot.send_message(msg.chat.id, texts::NOT_FOUND).await?;
            return Ok(());
        }
        self.store.set_stop_start_date(stop_id, date).await?;
        self.dialogues
            .set(user_id, &DialogueState::StopEndDate { stop_id })
            .await?;
        self.bot.send_message(msg.chat.id, texts::ENTER_END_DATE).await?;
        Ok(())
    }

    pub(crate) async fn enter_stop_end_date(
        &self,
        msg: &Message,
        user_id: i64,
        stop_id: i64,
    ) -> anyhow::Result<()> {
        let Some(date) = msg.text().and_then(parse_travel_date) else {
            self.bot
                .send_message(msg.chat.id, texts::WRONG_DATE_FORMAT)
                .await?;
            return Ok(());
        };
        let Some(stop) = self.stop_or_missing(stop_id).await? else {
            self.dialogues.clear(user_id).await?;
            self.bot.send_message(msg.chat.id, texts::NOT_FOUND).await?;
            return Ok(());
        };
        self.store.set_stop_end_date(stop_id, date).await?;
        self.dialogues.clear(user_id).await?;
        let stop = TripStop {
            end_date: Some(date),
            ..stop
        };
        self.show_stop(msg.chat.id, user_id, &stop).await
    }

    /// Grant access by forwarding any message from the invitee.
    pub(crate) async fn enter_grant_forward(
        &self,
        msg: &Message,
        user_id: i64,
        trip_id: i64,
    ) -> anyhow::Result<()> {
        let Some(trip) = self.trip_or_missing(trip_id).await? else {
            self.dialogues.clear(user_id).await?;
            self.bot.send_message(msg.chat.id, texts::NOT_FOUND).await?;
            return Ok(());
        };

        // Privacy-protected forwards carry no user id and cannot be
        // used to invite.
        let target_id = match msg.forward_origin() {
            Some(MessageOrigin::User { sender_user, .. }) => sender_user.id.0 as i64,
            _ => {
                self.bot
                    .send_message(msg.chat.id, texts::USER_NOT_FORWARDED)
                    .await?;
                return Ok(());
            }
        };
        let target = self.store.user(target_id).await?;
        let Some(target) = target.filter(|t| t.id != trip.owner_id) else {
            self.bot
                .send_message(msg.chat.id, texts::USER_NOT_FORWARDED)
                .await?;
            return Ok(());
        };

        match self.store.add_grant(trip_id, target.id).await {
            Ok(()) => {
                // Everyone on the trip hears about the newcomer,
                // newcomer included.
                let notification =
                    texts::grant_notification(target.id, &target.name, &trip.title);
                for grantee in self.store.grantees(trip_id).await? {
                    let sent = self
                        .bot
                        .send_message(ChatId(grantee.id), &notification)
                        .parse_mode(ParseMode::Html)
                        .await;
                    if let Err(e) = sent {
                        warn!(user_id = grantee.id, error = %e, "grant notification failed");
                    }
                }
            }
            Err(StoreError::Conflict) => {
                self.bot
                    .send_message(msg.chat.id, texts::USER_ALREADY_ADDED)
                    .await?;
            }
            Err(e) => return Err(e.into()),
        }
        self.dialogues.clear(user_id).await?;
        self.show_trip(msg.chat.id, user_id, &trip).await
    }

    pub(crate) async fn enter_note_upload(
        &self,
        msg: &Message,
        user_id: i64,
        trip_id: i64,
    ) -> anyhow::Result<()> {
        if self.trip_or_missing(trip_id).await?.is_none() {
            self.dialogues.clear(user_id).await?;
            self.bot.send_message(msg.chat.id, texts::NOT_FOUND).await?;
            return Ok(());
        }
        let Some(doc) = msg.document() else {
            self.bot
                .send_message(msg.chat.id, texts::UPLOAD_NOTE_FILE)
                .await?;
            return Ok(());
        };
        let file_name = doc.file_name.clone().unwrap_or_else(|| "document".to_string());
        match self.store.create_note(trip_id, &doc.file.id, &file_name).await {
            Ok(note) => {
                self.dialogues
                    .set(user_id, &DialogueState::NoteVisibility { note_id: note.id })
                    .await?;
                self.bot
                    .send_message(msg.chat.id, texts::CHOOSE_NOTE_VISIBILITY)
                    .reply_markup(views::visibility_keyboard(note.id))
                    .await?;
            }
            // Same state: the next upload is another attempt.
            Err(StoreError::Conflict) => {
                self.bot
                    .send_message(msg.chat.id, texts::NOTE_ALREADY_ATTACHED)
                    .await?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    // --- trip callbacks ---

    pub(crate) async fn cb_trip_list(
        &self,
        m: &Message,
        viewer_id: i64,
        offset: usize,
    ) -> anyhow::Result<Option<String>> {
        let trips = self.store.trips_for_user(viewer_id).await?;
        let (text, keyboard) = views::trip_list_page(&trips, offset);
        self.bot
            .edit_message_text(m.chat.id, m.id, text)
            .reply_markup(keyboard)
            .await?;
        Ok(None)
    }

    /// The trip view may carry a map photo, so it is always sent fresh
    /// and the pressed message is retired.
    pub(crate) async fn cb_trip_open(
        &self,
        m: &Message,
        viewer_id: i64,
        trip_id: i64,
    ) -> anyhow::Result<Option<String>> {
        let Some(trip) = self.trip_or_missing(trip_id).await? else {
            return Ok(Some(texts::NOT_FOUND.to_string()));
        };
        let access = self.store.trip_access(trip_id).await?;
        if !access.can_read(viewer_id) {
            return Ok(Some(texts::ACCESS_DENIED.to_string()));
        }
        self.bot.delete_message(m.chat.id, m.id).await?;
        self.show_trip(m.chat.id, viewer_id, &trip).await?;
        Ok(None)
    }

    pub(crate) async fn cb_trip_invite(
        &self,
        m: &Message,
        viewer_id: i64,
        trip_id: i64,
    ) -> anyhow::Result<Option<String>> {
        let access = match self.store.trip_access(trip_id).await {
            Ok(access) => access,
            Err(StoreError::NotFound) => return Ok(Some(texts::NOT_FOUND.to_string())),
            Err(e) => return Err(e.into()),
        };
        if !access.can_write(viewer_id) {
            return Ok(Some(texts::ACCESS_DENIED.to_string()));
        }
        self.dialogues
            .set(viewer_id, &DialogueState::GrantForward { trip_id })
            .await?;
        self.bot
            .edit_message_text(m.chat.id, m.id, texts::SEND_USER_FORWARD)
            .await?;
        Ok(None)
    }

    pub(crate) async fn cb_trip_edit(
        &self,
        m: &Message,
        viewer_id: i64,
        trip_id: i64,
    ) -> anyhow::Result<Option<String>> {
        let access = match self.store.trip_access(trip_id).await {
            Ok(access) => access,
            Err(StoreError::NotFound) => return Ok(Some(texts::NOT_FOUND.to_string())),
            Err(e) => return Err(e.into()),
        };
        if !access.can_write(viewer_id) {
            return Ok(Some(texts::ACCESS_DENIED.to_string()));
        }
        self.dialogues
            .set(viewer_id, &DialogueState::TripDescription { trip_id })
            .await?;
        self.bot
            .edit_message_text(m.chat.id, m.id, texts::ENTER_TRAVEL_DESCRIPTION)
            .await?;
        Ok(None)
    }

    pub(crate) async fn cb_trip_delete(
        &self,
        m: &Message,
        viewer_id: i64,
        trip_id: i64,
    ) -> anyhow::Result<Option<String>> {
        let access = match self.store.trip_access(trip_id).await {
            Ok(access) => access,
            Err(StoreError::NotFound) => return Ok(Some(texts::NOT_FOUND.to_string())),
            Err(e) => return Err(e.into()),
        };
        if !access.can_write(viewer_id) {
            return Ok(Some(texts::ACCESS_DENIED.to_string()));
        }
        self.store.delete_trip(trip_id).await?;
        self.bot
            .edit_message_text(m.chat.id, m.id, texts::TRAVEL_TEXT)
            .reply_markup(views::travels_keyboard())
            .await?;
        Ok(Some(texts::TRAVEL_DELETED.to_string()))
    }

    /// Route from the viewer's home city to the trip's first stop.
    pub(crate) async fn cb_trip_route(
        &self,
        m: &Message,
        viewer_id: i64,
        trip_id: i64,
    ) -> anyhow::Result<Option<String>> {
        let Some(trip) = self.trip_or_missing(trip_id).await? else {
            return Ok(Some(texts::NOT_FOUND.to_string()));
        };
        let access = self.store.trip_access(trip_id).await?;
        if !access.can_read(viewer_id) {
            return Ok(Some(texts::ACCESS_DENIED.to_string()));
        }

        let stops = self.store.stops(trip_id).await?;
        let Some(to) = stops.iter().find_map(|s| s.coords()) else {
            return Ok(Some(texts::ROUTE_UNAVAILABLE.to_string()));
        };
        let home = self
            .store
            .user(viewer_id)
            .await?
            .and_then(|p| Some((p.city?, p.country)));
        let Some((city, country)) = home else {
            return Ok(Some(texts::ROUTE_UNAVAILABLE.to_string()));
        };
        let origin = match self.geocoder.find_city(&city, country.as_deref()).await {
            Ok(Some(place)) => (place.lat, place.lon),
            Ok(None) => return Ok(Some(texts::ROUTE_UNAVAILABLE.to_string())),
            Err(e) => {
                warn!(viewer_id, error = %e, "home geocoding failed");
                return Ok(Some(texts::ROUTE_UNAVAILABLE.to_string()));
            }
        };

        match self.routes.route_map(origin, to).await {
            Ok(Some(png)) => {
                self.bot
                    .send_photo(m.chat.id, InputFile::memory(png).file_name("route.png"))
                    .await?;
                self.bot.delete_message(m.chat.id, m.id).await?;
                self.show_trip(m.chat.id, viewer_id, &trip).await?;
                Ok(None)
            }
            Ok(None) => Ok(Some(texts::NO_ROUTE.to_string())),
            Err(e) => {
                warn!(trip_id, error = %e, "route rendering failed");
                Ok(Some(texts::ROUTE_UNAVAILABLE.to_string()))
            }
        }
    }

    // --- stop callbacks ---

    pub(crate) async fn cb_stop_list(
        &self,
        m: &Message,
        viewer_id: i64,
        trip_id: i64,
        offset: usize,
    ) -> anyhow::Result<Option<String>> {
        let access = match self.store.trip_access(trip_id).await {
            Ok(access) => access,
            Err(StoreError::NotFound) => return Ok(Some(texts::NOT_FOUND.to_string())),
            Err(e) => return Err(e.into()),
        };
        if !access.can_read(viewer_id) {
            return Ok(Some(texts::ACCESS_DENIED.to_string()));
        }
        let stops = self.store.stops(trip_id).await?;
        let (text, keyboard) =
            views::stop_list_page(trip_id, &stops, offset, access.can_write(viewer_id));
        self.bot
            .edit_message_text(m.chat.id, m.id, text)
            .reply_markup(keyboard)
            .await?;
        Ok(None)
    }

    /// Location prompts use a reply keyboard, which an edit cannot
    /// carry, so the pressed message is replaced.
    pub(crate) async fn cb_stop_create(
        &self,
        m: &Message,
        viewer_id: i64,
        trip_id: i64,
    ) -> anyhow::Result<Option<String>> {
        let access = match self.store.trip_access(trip_id).await {
            Ok(access) => access,
            Err(StoreError::NotFound) => return Ok(Some(texts::NOT_FOUND.to_string())),
            Err(e) => return Err(e.into()),
        };
        if !access.can_write(viewer_id) {
            return Ok(Some(texts::ACCESS_DENIED.to_string()));
        }
        self.dialogues
            .set(viewer_id, &DialogueState::StopLocation { trip_id })
            .await?;
        self.bot.delete_message(m.chat.id, m.id).await?;
        self.bot
            .send_message(m.chat.id, texts::ENTER_STOP_LOCATION)
            .reply_markup(location_keyboard())
            .await?;
        Ok(None)
    }

    pub(crate) async fn cb_stop_show(
        &self,
        m: &Message,
        viewer_id: i64,
        stop_id: i64,
    ) -> anyhow::Result<Option<String>> {
        let Some(stop) = self.stop_or_missing(stop_id).await? else {
            return Ok(Some(texts::NOT_FOUND.to_string()));
        };
        let access = self.store.trip_access(stop.travel_id).await?;
        if !access.can_read(viewer_id) {
            return Ok(Some(texts::ACCESS_DENIED.to_string()));
        }
        let (weather, sights, food) = self.stop_blocks(&stop).await;
        self.bot
            .edit_message_text(
                m.chat.id,
                m.id,
                views::stop_text(&stop, &weather, &sights, &food),
            )
            .reply_markup(views::stop_keyboard(&stop, access.can_write(viewer_id)))
            .await?;
        Ok(None)
    }

    pub(crate) async fn cb_stop_delete(
        &self,
        m: &Message,
        viewer_id: i64,
        stop_id: i64,
    ) -> anyhow::Result<Option<String>> {
        let Some(stop) = self.stop_or_missing(stop_id).await? else {
            return Ok(Some(texts::NOT_FOUND.to_string()));
        };
        let access = self.store.trip_access(stop.travel_id).await?;
        if !access.can_write(viewer_id) {
            return Ok(Some(texts::ACCESS_DENIED.to_string()));
        }
        self.store.delete_stop(stop_id).await?;
        let stops = self.store.stops(stop.travel_id).await?;
        let (text, keyboard) = views::stop_list_page(stop.travel_id, &stops, 0, true);
        self.bot
            .edit_message_text(m.chat.id, m.id, text)
            .reply_markup(keyboard)
            .await?;
        Ok(None)
    }

    // --- note callbacks ---

    pub(crate) async fn cb_note_list(
        &self,
        m: &Message,
        viewer_id: i64,
        trip_id: i64,
        offset: usize,
    ) -> anyhow::Result<Option<String>> {
        let access = match self.store.trip_access(trip_id).await {
            Ok(access) => access,
            Err(StoreError::NotFound) => return Ok(Some(texts::NOT_FOUND.to_string())),
            Err(e) => return Err(e.into()),
        };
        if !access.can_read(viewer_id) {
            return Ok(Some(texts::ACCESS_DENIED.to_string()));
        }
        let is_owner = access.can_write(viewer_id);
        let notes = self.store.notes(trip_id, !is_owner).await?;
        let (text, keyboard) = views::note_list_page(trip_id, &notes, offset, is_owner);
        self.bot
            .edit_message_text(m.chat.id, m.id, text)
            .reply_markup(keyboard)
            .await?;
        Ok(None)
    }

    pub(crate) async fn cb_note_create(
        &self,
        m: &Message,
        viewer_id: i64,
        trip_id: i64,
    ) -> anyhow::Result<Option<String>> {
        let access = match self.store.trip_access(trip_id).await {
            Ok(access) => access,
            Err(StoreError::NotFound) => return Ok(Some(texts::NOT_FOUND.to_string())),
            Err(e) => return Err(e.into()),
        };
        if !access.can_write(viewer_id) {
            return Ok(Some(texts::ACCESS_DENIED.to_string()));
        }
        self.dialogues
            .set(viewer_id, &DialogueState::NoteUpload { trip_id })
            .await?;
        self.bot
            .edit_message_text(m.chat.id, m.id, texts::UPLOAD_NOTE_FILE)
            .await?;
        Ok(None)
    }

    /// Sends the stored file itself, so the view is a fresh document
    /// message rather than an edit.
    pub(crate) async fn cb_note_show(
        &self,
        m: &Message,
        viewer_id: i64,
        note_id: i64,
    ) -> anyhow::Result<Option<String>> {
        let Some(note) = self.note_or_missing(note_id).await? else {
            return Ok(Some(texts::NOT_FOUND.to_string()));
        };
        let access = self.store.trip_access(note.travel_id).await?;
        if !access.can_read_note(viewer_id, note.is_public) {
            return Ok(Some(texts::ACCESS_DENIED.to_string()));
        }
        self.bot.delete_message(m.chat.id, m.id).await?;
        self.bot
            .send_document(m.chat.id, InputFile::file_id(note.file_id.clone()))
            .reply_markup(views::note_keyboard(&note, access.can_write(viewer_id)))
            .await?;
        Ok(None)
    }

    pub(crate) async fn cb_note_delete(
        &self,
        m: &Message,
        viewer_id: i64,
        note_id: i64,
    ) -> anyhow::Result<Option<String>> {
        let Some(note) = self.note_or_missing(note_id).await? else {
            return Ok(Some(texts::NOT_FOUND.to_string()));
        };
        let access = self.store.trip_access(note.travel_id).await?;
        if !access.can_write(viewer_id) {
            return Ok(Some(texts::ACCESS_DENIED.to_string()));
        }
        self.store.delete_note(note_id).await?;
        let notes = self.store.notes(note.travel_id, false).await?;
        let (text, keyboard) = views::note_list_page(note.travel_id, &notes, 0, true);
        self.bot
            .edit_message_text(m.chat.id, m.id, text)
            .reply_markup(keyboard)
            .await?;
        Ok(None)
    }

    /// Terminal step of the upload flow. Only valid while the uploader
    /// is actually in it; a press on a stale keyboard is refused.
    pub(crate) async fn cb_note_visibility(
        &self,
        m: &Message,
        viewer_id: i64,
        note_id: i64,
        public: bool,
    ) -> anyhow::Result<Option<String>> {
        let state = self.dialogues.get(viewer_id).await?;
        if state != Some(DialogueState::NoteVisibility { note_id }) {
            return Ok(Some(texts::NOT_FOUND.to_string()));
        }
        let Some(note) = self.note_or_missing(note_id).await? else {
            self.dialogues.clear(viewer_id).await?;
            return Ok(Some(texts::NOT_FOUND.to_string()));
        };
        let access = self.store.trip_access(note.travel_id).await?;
        if !access.can_write(viewer_id) {
            return Ok(Some(texts::ACCESS_DENIED.to_string()));
        }
        self.store.set_note_visibility(note_id, public).await?;
        self.dialogues.clear(viewer_id).await?;
        let note = TripNote {
            is_public: public,
            ..note
        };
        self.bot.delete_message(m.chat.id, m.id).await?;
        self.bot
            .send_document(m.chat.id, InputFile::file_id(note.file_id.clone()))
            .reply_markup(views::note_keyboard(&note, true))
            .await?;
        Ok(None)
    }

    // --- shared views ---

    /// The trip view: an overview map when at least two stops have
    /// coordinates, then the text card with its action keyboard.
    pub(crate) async fn show_trip(
        &self,
        chat: ChatId,
        viewer_id: i64,
        trip: &Trip,
    ) -> anyhow::Result<()> {
        let grantees = self.store.grantees(trip.id).await?;
        let stops = self.store.stops(trip.id).await?;
        let coords: Vec<(f64, f64)> = stops.iter().filter_map(|s| s.coords()).collect();
        if coords.len() >= 2 {
            match self.routes.trip_map(&coords).await {
                Ok(png) => {
                    self.bot
                        .send_photo(chat, InputFile::memory(png).file_name("trip.png"))
                        .await?;
                }
                Err(e) => {
                    warn!(trip_id = trip.id, error = %e, "trip map rendering failed");
                }
            }
        }
        self.bot
            .send_message(chat, views::trip_text(trip, &grantees))
            .parse_mode(ParseMode::Html)
            .reply_markup(views::trip_keyboard(
                trip.id,
                !stops.is_empty(),
                trip.owner_id == viewer_id,
            ))
            .await?;
        Ok(())
    }

    async fn show_stop(&self, chat: ChatId, viewer_id: i64, stop: &TripStop) -> anyhow::Result<()> {
        let access = self.store.trip_access(stop.travel_id).await?;
        let (weather, sights, food) = self.stop_blocks(stop).await;
        self.bot
            .send_message(chat, views::stop_text(stop, &weather, &sights, &food))
            .reply_markup(views::stop_keyboard(stop, access.can_write(viewer_id)))
            .await?;
        Ok(())
    }

    /// Enrichment for the stop card. Each block degrades to its
    /// "unavailable" line on failure; one flaky upstream never blanks
    /// the others.
    async fn stop_blocks(&self, stop: &TripStop) -> (String, String, String) {
        let Some((lat, lon)) = stop.coords() else {
            return (
                texts::WEATHER_UNAVAILABLE.to_string(),
                texts::SIGHTS_UNAVAILABLE.to_string(),
                texts::FOOD_UNAVAILABLE.to_string(),
            );
        };

        let weather = match (stop.start_date, stop.end_date) {
            (Some(start), Some(end)) => {
                match self.weather.daily_summaries(start, end, lat, lon).await {
                    Ok(days) => weather_block(&days),
                    Err(e) => {
                        warn!(stop_id = stop.id, error = %e, "weather lookup failed");
                        texts::WEATHER_UNAVAILABLE.to_string()
                    }
                }
            }
            _ => texts::WEATHER_UNAVAILABLE.to_string(),
        };

        let sights = self
            .poi_entries(lat, lon, PlaceKind::Sights)
            .await
            .map(|entries| poi_block("Sights", &entries, texts::SIGHTS_UNAVAILABLE))
            .unwrap_or_else(|| texts::SIGHTS_UNAVAILABLE.to_string());
        let food = self
            .poi_entries(lat, lon, PlaceKind::Food)
            .await
            .map(|entries| poi_block("Food", &entries, texts::FOOD_UNAVAILABLE))
            .unwrap_or_else(|| texts::FOOD_UNAVAILABLE.to_string());

        (weather, sights, food)
    }

    /// Top-rated nearby places with their addresses when reverse
    /// geocoding cooperates, bare names when it does not.
    async fn poi_entries(&self, lat: f64, lon: f64, kind: PlaceKind) -> Option<Vec<String>> {
        let pois = match self.places.places_nearby(lat, lon, kind).await {
            Ok(pois) => pois,
            Err(e) => {
                warn!(error = %e, "places lookup failed");
                return None;
            }
        };
        let mut entries = Vec::new();
        for poi in pick_top(pois, self.poi_seed) {
            entries.push(self.poi_entry(&poi).await);
        }
        Some(entries)
    }

    async fn poi_entry(&self, poi: &Poi) -> String {
        match self.geocoder.reverse(poi.lat, poi.lon).await {
            Ok(Some(resolved)) => format!("{} — {}", poi.name, resolved.display_name),
            Ok(None) => poi.name.clone(),
            Err(e) => {
                warn!(error = %e, "place address lookup failed");
                poi.name.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_parse_in_dotted_format_only() {
        assert_eq!(
            parse_travel_date("01.06.2024"),
            NaiveDate::from_ymd_opt(2024, 6, 1)
        );
        assert_eq!(
            parse_travel_date("  31.12.2023 "),
            NaiveDate::from_ymd_opt(2023, 12, 31)
        );
        assert_eq!(parse_travel_date("2024-06-01"), None);
        assert_eq!(parse_travel_date("32.01.2024"), None);
        assert_eq!(parse_travel_date("june 1"), None);
    }

    #[test]
    fn weather_block_lists_days() {
        let days = vec![
            DaySummary {
                date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                condition: "Sunny".into(),
                avg_temp_c: 24.25,
            },
            DaySummary {
                date: NaiveDate::from_ymd_opt(2024, 6, 2).unwrap(),
                condition: "Rain".into(),
                avg_temp_c: 17.0,
            },
        ];
        let block = weather_block(&days);
        assert!(block.starts_with("Weather:"));
        assert!(block.contains("01.06.2024: Sunny, 24.2 °C"));
        assert!(block.contains("02.06.2024: Rain, 17.0 °C"));
    }

    #[test]
    fn empty_weather_degrades() {
        assert_eq!(weather_block(&[]), texts::WEATHER_UNAVAILABLE);
    }

    #[test]
    fn poi_block_bullets_entries() {
        let block = poi_block(
            "Sights",
            &["Colosseum — Rome".to_string(), "Pantheon".to_string()],
            texts::SIGHTS_UNAVAILABLE,
        );
        assert_eq!(block, "Sights:\n• Colosseum — Rome\n• Pantheon");
    }

    #[test]
    fn empty_poi_block_degrades() {
        assert_eq!(
            poi_block("Food", &[], texts::FOOD_UNAVAILABLE),
            texts::FOOD_UNAVAILABLE
        );
    }
}
