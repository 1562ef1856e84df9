//! The Telegram front-end: one struct owning the store, the dialogue
//! store, and the enrichment clients, dispatching every update to the
//! handler modules.
//!
//! Messages and button presses are mutually exclusive event kinds.
//! Messages drive the per-person conversation state machine; button
//! presses go through the callback router. Errors from a handler are
//! logged and scoped to that one update.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{MaybeInaccessibleMessage, Message, MessageId, User};
use tracing::{info, warn};

use crate::callbacks::{Callback, MenuAction, NoteAction, StopAction, TravelMenuAction, TripAction};
use crate::dialogue::{DialogueState, DialogueStore};
use crate::enrich::{Geocoder, PlacesProvider, RouteRenderer, WeatherProvider};
use crate::handlers::profile::ProfileFlow;
use crate::store::Store;
use crate::{texts, views};

pub struct WayfarerBot {
    pub(crate) bot: Bot,
    pub(crate) store: Store,
    pub(crate) dialogues: DialogueStore,
    pub(crate) geocoder: Arc<dyn Geocoder>,
    pub(crate) weather: Arc<dyn WeatherProvider>,
    pub(crate) places: Arc<dyn PlacesProvider>,
    pub(crate) routes: Arc<dyn RouteRenderer>,
    pub(crate) poi_seed: u64,
}

/// The transient "Loading…" message posted while a callback handler
/// runs. Posted before the handler and cleared after it returns, so
/// every exit path (including early returns and errors) retracts it.
pub(crate) struct LoadingNotice {
    chat: ChatId,
    id: MessageId,
}

impl WayfarerBot {
    pub async fn run(self: Arc<Self>) {
        info!("starting wayfarer bot");

        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint({
                let app = Arc::clone(&self);
                move |msg: Message| {
                    let app = Arc::clone(&app);
                    async move {
                        if let Err(e) = app.handle_message(&msg).await {
                            warn!(chat_id = msg.chat.id.0, error = %e, "message handler failed");
                        }
                        respond(())
                    }
                }
            }))
            .branch(Update::filter_callback_query().endpoint({
                let app = Arc::clone(&self);
                move |q: CallbackQuery| {
                    let app = Arc::clone(&app);
                    async move {
                        app.handle_callback(q).await;
                        respond(())
                    }
                }
            }));

        Dispatcher::builder(self.bot.clone(), handler)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }

    /// Conversation-state dispatch for plain messages (text, shared
    /// locations, documents, forwards).
    async fn handle_message(&self, msg: &Message) -> anyhow::Result<()> {
        let Some(from) = msg.from.clone() else {
            return Ok(());
        };
        let user_id = from.id.0 as i64;
        let person = self.store.user(user_id).await?;
        let state = self.dialogues.get(user_id).await?;

        // Registration outranks everything: until a user row exists,
        // any message lands in (or is redirected into) the flow.
        if person.is_none() {
            if let Some(state) = state.filter(|s| s.is_registration()) {
                return self.profile_step(msg, &from, state).await;
            }
            self.dialogues.set(user_id, &DialogueState::RegisterAge).await?;
            self.bot.send_message(msg.chat.id, texts::ENTER_AGE).await?;
            return Ok(());
        }

        match state {
            Some(DialogueState::RegisterAge) => {
                self.step_age(msg, &from, ProfileFlow::Register).await
            }
            Some(DialogueState::EditAge) => self.step_age(msg, &from, ProfileFlow::Edit).await,
            Some(DialogueState::RegisterCountry) => {
                self.step_country(msg, &from, ProfileFlow::Register).await
            }
            Some(DialogueState::EditCountry) => {
                self.step_country(msg, &from, ProfileFlow::Edit).await
            }
            Some(DialogueState::RegisterCity) => {
                self.step_city(msg, &from, ProfileFlow::Register).await
            }
            Some(DialogueState::EditCity) => self.step_city(msg, &from, ProfileFlow::Edit).await,
            Some(DialogueState::RegisterBio) => {
                self.step_bio(msg, &from, ProfileFlow::Register).await
            }
            Some(DialogueState::EditBio) => self.step_bio(msg, &from, ProfileFlow::Edit).await,
            Some(DialogueState::TripTitle) => self.enter_trip_title(msg, user_id).await,
            Some(DialogueState::TripDescription { trip_id }) => {
                self.enter_trip_description(msg, user_id, trip_id).await
            }
            Some(DialogueState::StopLocation { trip_id }) => {
                self.enter_stop_location(msg, user_id, trip_id).await
            }
            Some(DialogueState::StopStartDate { stop_id }) => {
                self.enter_stop_start_date(msg, user_id, stop_id).await
            }
            Some(DialogueState::StopEndDate { stop_id }) => {
                self.enter_stop_end_date(msg, user_id, stop_id).await
            }
            Some(DialogueState::GrantForward { trip_id }) => {
                self.enter_grant_forward(msg, user_id, trip_id).await
            }
            Some(DialogueState::NoteUpload { trip_id }) => {
                self.enter_note_upload(msg, user_id, trip_id).await
            }
            Some(DialogueState::NoteVisibility { note_id }) => {
                // Visibility is chosen with a button, not text.
                self.bot
                    .send_message(msg.chat.id, texts::CHOOSE_NOTE_VISIBILITY)
                    .reply_markup(views::visibility_keyboard(note_id))
                    .await?;
                Ok(())
            }
            // Idle: /start and the catch-all both land on the menu.
            None => self.send_menu(msg.chat.id).await,
        }
    }

    /// Button-press dispatch. The loading notice wraps the whole
    /// dispatch so it is retracted on every path; the returned toast
    /// (if any) goes into the callback acknowledgement.
    async fn handle_callback(&self, q: CallbackQuery) {
        let Some(data) = q.data.clone() else {
            return;
        };
        let Some(cb) = Callback::parse(&data) else {
            warn!(data = %data, "unroutable callback data");
            let _ = self.bot.answer_callback_query(q.id.clone()).await;
            return;
        };
        let Some(MaybeInaccessibleMessage::Regular(m)) = q.message.clone() else {
            let _ = self.bot.answer_callback_query(q.id.clone()).await;
            return;
        };

        let loading = self.post_loading(m.chat.id).await;
        let result = self.dispatch_callback(&q.from, &m, cb).await;
        self.clear_loading(loading).await;

        let toast = match result {
            Ok(toast) => toast,
            Err(e) => {
                warn!(data = %data, error = %e, "callback handler failed");
                None
            }
        };
        let answer = self.bot.answer_callback_query(q.id.clone());
        let _ = match toast {
            Some(toast) => answer.text(toast).await,
            None => answer.await,
        };
    }

    async fn dispatch_callback(
        &self,
        from: &User,
        m: &Message,
        cb: Callback,
    ) -> anyhow::Result<Option<String>> {
        let viewer_id = from.id.0 as i64;
        match cb {
            Callback::Menu(MenuAction::Main) => {
                self.bot
                    .edit_message_text(m.chat.id, m.id, texts::MENU_TEXT)
                    .reply_markup(views::menu_keyboard())
                    .await?;
                Ok(None)
            }
            Callback::Menu(MenuAction::Profile) => self.cb_show_profile(m, viewer_id).await,
            Callback::Menu(MenuAction::Travels) => {
                self.bot
                    .edit_message_text(m.chat.id, m.id, texts::TRAVEL_TEXT)
                    .reply_markup(views::travels_keyboard())
                    .await?;
                Ok(None)
            }
            Callback::ProfileEdit => self.cb_profile_edit(m, viewer_id).await,
            Callback::TravelMenu(TravelMenuAction::Create) => {
                self.dialogues.set(viewer_id, &DialogueState::TripTitle).await?;
                self.bot
                    .edit_message_text(m.chat.id, m.id, texts::ENTER_TRAVEL_TITLE)
                    .await?;
                Ok(None)
            }
            Callback::TravelMenu(TravelMenuAction::List) => {
                self.cb_trip_list(m, viewer_id, 0).await
            }
            Callback::TripListPage { offset } => self.cb_trip_list(m, viewer_id, offset).await,
            Callback::TripOpen { trip_id } => self.cb_trip_open(m, viewer_id, trip_id).await,
            Callback::Trip { action, trip_id } => match action {
                TripAction::Stops => self.cb_stop_list(m, viewer_id, trip_id, 0).await,
                TripAction::Notes => self.cb_note_list(m, viewer_id, trip_id, 0).await,
                TripAction::Route => self.cb_trip_route(m, viewer_id, trip_id).await,
                TripAction::Invite => self.cb_trip_invite(m, viewer_id, trip_id).await,
                TripAction::Edit => self.cb_trip_edit(m, viewer_id, trip_id).await,
                TripAction::Delete => self.cb_trip_delete(m, viewer_id, trip_id).await,
            },
            Callback::StopsPage { trip_id, offset } => {
                self.cb_stop_list(m, viewer_id, trip_id, offset).await
            }
            Callback::StopCreate { trip_id } => {
                self.cb_stop_create(m, viewer_id, trip_id).await
            }
            Callback::Stop { action, stop_id } => match action {
                StopAction::Show => self.cb_stop_show(m, viewer_id, stop_id).await,
                StopAction::Delete => self.cb_stop_delete(m, viewer_id, stop_id).await,
            },
            Callback::NotesPage { trip_id, offset } => {
                self.cb_note_list(m, viewer_id, trip_id, offset).await
            }
            Callback::NoteCreate { trip_id } => {
                self.cb_note_create(m, viewer_id, trip_id).await
            }
            Callback::Note { action, note_id } => match action {
                NoteAction::Show => self.cb_note_show(m, viewer_id, note_id).await,
                NoteAction::Delete => self.cb_note_delete(m, viewer_id, note_id).await,
            },
            Callback::NoteVisibility { note_id, public } => {
                self.cb_note_visibility(m, viewer_id, note_id, public).await
            }
        }
    }

    async fn post_loading(&self, chat: ChatId) -> Option<LoadingNotice> {
        match self.bot.send_message(chat, texts::LOADING).await {
            Ok(m) => Some(LoadingNotice { chat, id: m.id }),
            Err(e) => {
                warn!(chat_id = chat.0, error = %e, "failed to post loading notice");
                None
            }
        }
    }

    async fn clear_loading(&self, notice: Option<LoadingNotice>) {
        if let Some(notice) = notice {
            if let Err(e) = self.bot.delete_message(notice.chat, notice.id).await {
                warn!(chat_id = notice.chat.0, error = %e, "failed to clear loading notice");
            }
        }
    }

    pub(crate) async fn send_menu(&self, chat: ChatId) -> anyhow::Result<()> {
        self.bot
            .send_message(chat, texts::MENU_TEXT)
            .reply_markup(views::menu_keyboard())
            .await?;
        Ok(())
    }
}
