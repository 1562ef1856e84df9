//! User-facing strings, kept in one place so handlers and tests can
//! refer to the same copy.

pub const ENTER_AGE: &str = "How old are you?";
pub const WRONG_AGE: &str = "That doesn't look like an age. Send a number, e.g. 29.";
pub const ENTER_COUNTRY_OR_GEO: &str =
    "Which country do you live in? Type its name, or share your location with the button below.";
pub const SEND_LOCATION: &str = "Share location";
pub const INCORRECT_COUNTRY: &str = "I couldn't find that country. Try again.";
pub const ENTER_CITY: &str = "And which city?";
pub const INCORRECT_CITY: &str = "I couldn't find that city. Try again.";
pub const LOCATION_NOT_RECOGNIZED: &str =
    "I couldn't work out where that is. Try typing the name instead.";
pub const ENTER_BIO: &str = "Tell me a little about yourself.";

pub fn home_saved(city: &str, country: &str) -> String {
    format!("Saved: {}, {}.", city, country)
}

pub const MENU_TEXT: &str = "What would you like to do?";
pub const TRAVEL_TEXT: &str = "Your travels.";
pub const LOADING: &str = "Loading…";
pub const NOT_FOUND: &str = "Not found.";
pub const ACCESS_DENIED: &str = "Access denied.";

pub const ENTER_TRAVEL_TITLE: &str = "What should the trip be called?";
pub const TRAVEL_TITLE_CONFLICT: &str =
    "You already have a trip with that title. Pick another one.";
pub const TRAVEL_DELETED: &str = "Trip deleted.";
pub const ENTER_TRAVEL_DESCRIPTION: &str = "Send the new description.";

pub const ENTER_STOP_LOCATION: &str =
    "Which city is this stop in? Type its name or share a location.";
pub const ENTER_START_DATE: &str = "When does this stop start? Format: DD.MM.YYYY";
pub const ENTER_END_DATE: &str = "And when does it end? Format: DD.MM.YYYY";
pub const WRONG_DATE_FORMAT: &str = "I need a date like 01.06.2024. Try again.";

pub const SEND_USER_FORWARD: &str =
    "Forward me any message from the person you want to invite.";
pub const USER_NOT_FORWARDED: &str =
    "That didn't work. Forward a message from a registered user who isn't you.";
pub const USER_ALREADY_ADDED: &str = "That person already has access to this trip.";

/// HTML, sent to every grantee when someone new joins a trip.
pub fn grant_notification(user_id: i64, user_name: &str, trip_title: &str) -> String {
    format!(
        "<a href=\"tg://user?id={}\">{}</a> now has access to the trip \"{}\".",
        user_id,
        crate::views::html_escape(user_name),
        crate::views::html_escape(trip_title),
    )
}

pub const UPLOAD_NOTE_FILE: &str = "Send me the file for this note.";
pub const NOTE_ALREADY_ATTACHED: &str = "That file is already attached to this trip.";
pub const CHOOSE_NOTE_VISIBILITY: &str = "Who should see this note?";

pub const NO_ROUTE: &str = "No route: you're already at the first stop.";
pub const ROUTE_UNAVAILABLE: &str = "Couldn't build the route right now.";
pub const MAP_UNAVAILABLE: &str = "Couldn't render the map right now.";
pub const WEATHER_UNAVAILABLE: &str = "Weather: unavailable";
pub const SIGHTS_UNAVAILABLE: &str = "Sights: nothing found nearby";
pub const FOOD_UNAVAILABLE: &str = "Food: nothing found nearby";
