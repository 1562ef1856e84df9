//! Registration and profile editing.
//!
//! Both flows walk the same four steps (age, country, city, bio) and
//! share the step handlers; they differ only in where they land at the
//! end. The country step accepts either a typed name or a shared
//! location; a recognized location fills country and city in one go
//! and skips straight to the bio step.

use teloxide::prelude::*;
use teloxide::types::{Message, User};
use tracing::warn;

use super::{location_keyboard, remove_keyboard};
use crate::bot::WayfarerBot;
use crate::dialogue::DialogueState;
use crate::{texts, views};

/// Which flow a step belongs to. Registration finishes on the main
/// menu; editing finishes back on the profile view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileFlow {
    Register,
    Edit,
}

impl ProfileFlow {
    fn country_state(self) -> DialogueState {
        match self {
            ProfileFlow::Register => DialogueState::RegisterCountry,
            ProfileFlow::Edit => DialogueState::EditCountry,
        }
    }

    fn city_state(self) -> DialogueState {
        match self {
            ProfileFlow::Register => DialogueState::RegisterCity,
            ProfileFlow::Edit => DialogueState::EditCity,
        }
    }

    fn bio_state(self) -> DialogueState {
        match self {
            ProfileFlow::Register => DialogueState::RegisterBio,
            ProfileFlow::Edit => DialogueState::EditBio,
        }
    }
}

/// Age must be a plain decimal number.
pub(crate) fn parse_age(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

impl WayfarerBot {
    /// Registration dispatch for people without a user row yet.
    pub(crate) async fn profile_step(
        &self,
        msg: &Message,
        from: &User,
        state: DialogueState,
    ) -> anyhow::Result<()> {
        match state {
            DialogueState::RegisterAge => self.step_age(msg, from, ProfileFlow::Register).await,
            DialogueState::RegisterCountry => {
                self.step_country(msg, from, ProfileFlow::Register).await
            }
            DialogueState::RegisterCity => self.step_city(msg, from, ProfileFlow::Register).await,
            DialogueState::RegisterBio => self.step_bio(msg, from, ProfileFlow::Register).await,
            _ => Ok(()),
        }
    }

    pub(crate) async fn step_age(
        &self,
        msg: &Message,
        from: &User,
        flow: ProfileFlow,
    ) -> anyhow::Result<()> {
        let Some(age) = msg.text().and_then(parse_age) else {
            self.bot.send_message(msg.chat.id, texts::WRONG_AGE).await?;
            return Ok(());
        };
        let user_id = from.id.0 as i64;
        self.store
            .upsert_user_age(user_id, &from.full_name(), age)
            .await?;
        self.dialogues.set(user_id, &flow.country_state()).await?;
        self.bot
            .send_message(msg.chat.id, texts::ENTER_COUNTRY_OR_GEO)
            .reply_markup(location_keyboard())
            .await?;
        Ok(())
    }

    /// A shared location resolves country and city together and skips
    /// the city step; a typed name resolves the country only.
    pub(crate) async fn step_country(
        &self,
        msg: &Message,
        from: &User,
        flow: ProfileFlow,
    ) -> anyhow::Result<()> {
        let user_id = from.id.0 as i64;

        if let Some(location) = msg.location() {
            let resolved = match self.geocoder.reverse(location.latitude, location.longitude).await
            {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!(user_id, error = %e, "reverse geocoding failed");
                    None
                }
            };
            let Some((country, city)) = resolved.and_then(|r| Some((r.country, r.city?))) else {
                self.bot
                    .send_message(msg.chat.id, texts::LOCATION_NOT_RECOGNIZED)
                    .await?;
                return Ok(());
            };
            self.store.set_user_home(user_id, &country, &city).await?;
            self.dialogues.set(user_id, &flow.bio_state()).await?;
            self.bot
                .send_message(msg.chat.id, texts::home_saved(&city, &country))
                .reply_markup(remove_keyboard())
                .await?;
            self.bot.send_message(msg.chat.id, texts::ENTER_BIO).await?;
            return Ok(());
        }

        let Some(text) = msg.text() else {
            self.bot
                .send_message(msg.chat.id, texts::ENTER_COUNTRY_OR_GEO)
                .await?;
            return Ok(());
        };
        let country = match self.geocoder.find_country(text).await {
            Ok(country) => country,
            Err(e) => {
                warn!(user_id, error = %e, "country lookup failed");
                None
            }
        };
        let Some(country) = country else {
            self.bot
                .send_message(msg.chat.id, texts::INCORRECT_COUNTRY)
                .await?;
            return Ok(());
        };
        self.store.set_user_country(user_id, &country).await?;
        self.dialogues.set(user_id, &flow.city_state()).await?;
        self.bot
            .send_message(msg.chat.id, texts::ENTER_CITY)
            .reply_markup(remove_keyboard())
            .await?;
        Ok(())
    }

    /// The city lookup is constrained to the country picked one step
    /// earlier.
    pub(crate) async fn step_city(
        &self,
        msg: &Message,
        from: &User,
        flow: ProfileFlow,
    ) -> anyhow::Result<()> {
        let user_id = from.id.0 as i64;
        let Some(text) = msg.text() else {
            self.bot.send_message(msg.chat.id, texts::ENTER_CITY).await?;
            return Ok(());
        };
        let country = self
            .store
            .user(user_id)
            .await?
            .and_then(|p| p.country);
        let place = match self.geocoder.find_city(text, country.as_deref()).await {
            Ok(place) => place,
            Err(e) => {
                warn!(user_id, error = %e, "city lookup failed");
                None
            }
        };
        let Some(place) = place else {
            self.bot
                .send_message(msg.chat.id, texts::INCORRECT_CITY)
                .await?;
            return Ok(());
        };
        self.store.set_user_city(user_id, &place.name).await?;
        self.dialogues.set(user_id, &flow.bio_state()).await?;
        self.bot.send_message(msg.chat.id, texts::ENTER_BIO).await?;
        Ok(())
    }

    pub(crate) async fn step_bio(
        &self,
        msg: &Message,
        from: &User,
        flow: ProfileFlow,
    ) -> anyhow::Result<()> {
        let user_id = from.id.0 as i64;
        let Some(text) = msg.text() else {
            self.bot.send_message(msg.chat.id, texts::ENTER_BIO).await?;
            return Ok(());
        };
        self.store.set_user_bio(user_id, text).await?;
        self.dialogues.clear(user_id).await?;
        match flow {
            ProfileFlow::Register => self.send_menu(msg.chat.id).await,
            ProfileFlow::Edit => {
                if let Some(person) = self.store.user(user_id).await? {
                    self.bot
                        .send_message(msg.chat.id, views::profile_text(&person))
                        .reply_markup(views::profile_keyboard())
                        .await?;
                }
                Ok(())
            }
        }
    }

    pub(crate) async fn cb_show_profile(
        &self,
        m: &Message,
        viewer_id: i64,
    ) -> anyhow::Result<Option<String>> {
        let Some(person) = self.store.user(viewer_id).await? else {
            return Ok(Some(texts::NOT_FOUND.to_string()));
        };
        self.bot
            .edit_message_text(m.chat.id, m.id, views::profile_text(&person))
            .reply_markup(views::profile_keyboard())
            .await?;
        Ok(None)
    }

    pub(crate) async fn cb_profile_edit(
        &self,
        m: &Message,
        viewer_id: i64,
    ) -> anyhow::Result<Option<String>> {
        self.dialogues.set(viewer_id, &DialogueState::EditAge).await?;
        self.bot
            .edit_message_text(m.chat.id, m.id, texts::ENTER_AGE)
            .await?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_accepts_plain_numbers() {
        assert_eq!(parse_age("29"), Some(29));
        assert_eq!(parse_age("  7 "), Some(7));
    }

    #[test]
    fn age_rejects_everything_else() {
        assert_eq!(parse_age("abc"), None);
        assert_eq!(parse_age("-5"), None);
        assert_eq!(parse_age("29 years"), None);
        assert_eq!(parse_age(""), None);
        assert_eq!(parse_age("2.5"), None);
    }

    #[test]
    fn flows_share_steps_but_not_exits() {
        assert_eq!(
            ProfileFlow::Register.country_state(),
            DialogueState::RegisterCountry
        );
        assert_eq!(ProfileFlow::Edit.country_state(), DialogueState::EditCountry);
        assert_eq!(ProfileFlow::Edit.bio_state(), DialogueState::EditBio);
    }
}
