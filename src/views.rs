//! Message bodies and inline keyboards for every view the bot renders.
//!
//! Keyboards carry [`Callback`] data only; no free-text matching
//! happens anywhere. List views share the pagination engine and a
//! common prev/next arrow row.

use chrono::NaiveDate;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::callbacks::{
    Callback, MenuAction, NoteAction, StopAction, TravelMenuAction, TripAction,
};
use crate::domain::{Person, Trip, TripNote, TripStop, TripSummary};
use crate::pagination::paginate;

fn btn(label: &str, cb: Callback) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, cb.encode())
}

/// Minimal escaping for the HTML parse mode.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn fmt_date(date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => d.format("%d.%m.%Y").to_string(),
        None => "—".to_string(),
    }
}

fn page_header(page: usize, pages: usize) -> String {
    format!("Page {} of {}", page, pages)
}

/// Prev/next arrows for a paginated list; empty when the list fits on
/// one page.
fn pager_row(
    prev: Option<usize>,
    next: Option<usize>,
    make: impl Fn(usize) -> Callback,
) -> Vec<InlineKeyboardButton> {
    let mut row = Vec::new();
    if let Some(offset) = prev {
        row.push(btn("⬅️", make(offset)));
    }
    if let Some(offset) = next {
        row.push(btn("➡️", make(offset)));
    }
    row
}

// --- menu & profile ---

pub fn menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![btn("Profile", Callback::Menu(MenuAction::Profile))],
        vec![btn("Travels", Callback::Menu(MenuAction::Travels))],
    ])
}

pub fn profile_text(person: &Person) -> String {
    format!(
        "Profile:\n\nName: {}\nAge: {}\nCountry and city: {}, {}\nAbout: {}",
        person.name,
        person.age.map(|a| a.to_string()).unwrap_or_else(|| "—".into()),
        person.country.as_deref().unwrap_or("—"),
        person.city.as_deref().unwrap_or("—"),
        person.bio.as_deref().unwrap_or("—"),
    )
}

pub fn profile_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![btn("Edit", Callback::ProfileEdit)],
        vec![btn("Menu", Callback::Menu(MenuAction::Main))],
    ])
}

pub fn travels_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![btn("Create", Callback::TravelMenu(TravelMenuAction::Create))],
        vec![btn("List", Callback::TravelMenu(TravelMenuAction::List))],
        vec![btn("Menu", Callback::Menu(MenuAction::Main))],
    ])
}

// --- trip list & detail ---

pub fn trip_list_page(
    trips: &[TripSummary],
    offset: usize,
) -> (String, InlineKeyboardMarkup) {
    let page = paginate(trips, offset);
    let mut rows: Vec<Vec<InlineKeyboardButton>> = page
        .items
        .iter()
        .map(|t| {
            vec![btn(
                &format!("{} | {}", t.title, t.owner_name),
                Callback::TripOpen { trip_id: t.id },
            )]
        })
        .collect();
    let pager = pager_row(page.prev, page.next, |offset| Callback::TripListPage { offset });
    if !pager.is_empty() {
        rows.push(pager);
    }
    rows.push(vec![btn("Travel menu", Callback::Menu(MenuAction::Travels))]);
    (page_header(page.page, page.pages), InlineKeyboardMarkup::new(rows))
}

/// HTML: grantees are rendered as user-mention links. The description
/// line appears only when a description is set, the shared-with line
/// only when there are grantees.
pub fn trip_text(trip: &Trip, grantees: &[Person]) -> String {
    let mut text = format!("Trip: {}", html_escape(&trip.title));
    if let Some(description) = &trip.description {
        text.push_str(&format!("\n\n{}", html_escape(description)));
    }
    if !grantees.is_empty() {
        let mentions: Vec<String> = grantees
            .iter()
            .map(|p| format!("<a href=\"tg://user?id={}\">{}</a>", p.id, html_escape(&p.name)))
            .collect();
        text.push_str(&format!("\n\nShared with: {}", mentions.join(", ")));
    }
    text
}

pub fn trip_keyboard(trip_id: i64, has_stops: bool, is_owner: bool) -> InlineKeyboardMarkup {
    let mut rows = vec![vec![btn(
        "Stops",
        Callback::Trip { action: TripAction::Stops, trip_id },
    )]];
    if has_stops {
        rows.push(vec![btn(
            "Route to first stop",
            Callback::Trip { action: TripAction::Route, trip_id },
        )]);
    }
    rows.push(vec![btn(
        "Notes",
        Callback::Trip { action: TripAction::Notes, trip_id },
    )]);
    if is_owner {
        rows.push(vec![btn(
            "Invite someone",
            Callback::Trip { action: TripAction::Invite, trip_id },
        )]);
        rows.push(vec![btn(
            "Edit",
            Callback::Trip { action: TripAction::Edit, trip_id },
        )]);
        rows.push(vec![btn(
            "Delete",
            Callback::Trip { action: TripAction::Delete, trip_id },
        )]);
    }
    rows.push(vec![btn("Menu", Callback::Menu(MenuAction::Travels))]);
    InlineKeyboardMarkup::new(rows)
}

// --- stops ---

pub fn stop_list_page(
    trip_id: i64,
    stops: &[TripStop],
    offset: usize,
    is_owner: bool,
) -> (String, InlineKeyboardMarkup) {
    let page = paginate(stops, offset);
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    if is_owner {
        rows.push(vec![btn("Create", Callback::StopCreate { trip_id })]);
    }
    for stop in page.items {
        rows.push(vec![btn(
            &format!(
                "{} | {} – {}",
                stop.city,
                fmt_date(stop.start_date),
                fmt_date(stop.end_date)
            ),
            Callback::Stop { action: StopAction::Show, stop_id: stop.id },
        )]);
    }
    let pager = pager_row(page.prev, page.next, |offset| Callback::StopsPage {
        trip_id,
        offset,
    });
    if !pager.is_empty() {
        rows.push(pager);
    }
    rows.push(vec![btn("Trip", Callback::TripOpen { trip_id })]);
    (page_header(page.page, page.pages), InlineKeyboardMarkup::new(rows))
}

pub fn stop_text(stop: &TripStop, weather: &str, sights: &str, food: &str) -> String {
    format!(
        "{}\n{} – {}\n\n{}\n\n{}\n\n{}",
        stop.city,
        fmt_date(stop.start_date),
        fmt_date(stop.end_date),
        weather,
        sights,
        food,
    )
}

pub fn stop_keyboard(stop: &TripStop, is_owner: bool) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if is_owner {
        rows.push(vec![btn(
            "Delete",
            Callback::Stop { action: StopAction::Delete, stop_id: stop.id },
        )]);
    }
    rows.push(vec![btn("Trip", Callback::TripOpen { trip_id: stop.travel_id })]);
    InlineKeyboardMarkup::new(rows)
}

// --- notes ---

pub fn note_list_page(
    trip_id: i64,
    notes: &[TripNote],
    offset: usize,
    is_owner: bool,
) -> (String, InlineKeyboardMarkup) {
    let page = paginate(notes, offset);
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    if is_owner {
        rows.push(vec![btn("Create", Callback::NoteCreate { trip_id })]);
    }
    for note in page.items {
        rows.push(vec![btn(
            &note.file_name,
            Callback::Note { action: NoteAction::Show, note_id: note.id },
        )]);
    }
    let pager = pager_row(page.prev, page.next, |offset| Callback::NotesPage {
        trip_id,
        offset,
    });
    if !pager.is_empty() {
        rows.push(pager);
    }
    rows.push(vec![btn("Trip", Callback::TripOpen { trip_id })]);
    (page_header(page.page, page.pages), InlineKeyboardMarkup::new(rows))
}

pub fn note_keyboard(note: &TripNote, is_owner: bool) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if is_owner {
        rows.push(vec![btn(
            "Delete",
            Callback::Note { action: NoteAction::Delete, note_id: note.id },
        )]);
    }
    rows.push(vec![btn("Trip", Callback::TripOpen { trip_id: note.travel_id })]);
    InlineKeyboardMarkup::new(rows)
}

pub fn visibility_keyboard(note_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![btn("Private", Callback::NoteVisibility { note_id, public: false })],
        vec![btn("Public", Callback::NoteVisibility { note_id, public: true })],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summaries(n: usize) -> Vec<TripSummary> {
        (0..n)
            .map(|i| TripSummary {
                id: i as i64,
                title: format!("Trip {}", i),
                owner_name: "Alice".into(),
            })
            .collect()
    }

    #[test]
    fn trip_list_single_page_has_no_arrows() {
        let (header, markup) = trip_list_page(&summaries(3), 0);
        assert_eq!(header, "Page 1 of 1");
        // 3 trip rows + menu row, no pager row.
        assert_eq!(markup.inline_keyboard.len(), 4);
    }

    #[test]
    fn trip_list_middle_page_has_both_arrows() {
        let (header, markup) = trip_list_page(&summaries(12), 5);
        assert_eq!(header, "Page 2 of 3");
        // 5 trip rows + pager + menu.
        assert_eq!(markup.inline_keyboard.len(), 7);
        let pager = &markup.inline_keyboard[5];
        assert_eq!(pager.len(), 2);
    }

    #[test]
    fn trip_text_hides_empty_sections() {
        let trip = Trip {
            id: 1,
            title: "Italy".into(),
            description: None,
            owner_id: 1,
        };
        let text = trip_text(&trip, &[]);
        assert_eq!(text, "Trip: Italy");
    }

    #[test]
    fn trip_text_mentions_grantees() {
        let trip = Trip {
            id: 1,
            title: "Italy".into(),
            description: Some("Two weeks".into()),
            owner_id: 1,
        };
        let grantees = vec![Person {
            id: 42,
            name: "Bob <3".into(),
            age: None,
            country: None,
            city: None,
            bio: None,
        }];
        let text = trip_text(&trip, &grantees);
        assert!(text.contains("Two weeks"));
        assert!(text.contains("tg://user?id=42"));
        assert!(text.contains("Bob &lt;3"));
    }

    #[test]
    fn owner_only_buttons() {
        let markup = trip_keyboard(1, true, true);
        assert_eq!(markup.inline_keyboard.len(), 7);
        let markup = trip_keyboard(1, true, false);
        assert_eq!(markup.inline_keyboard.len(), 4);
        // No stops yet: route button is hidden.
        let markup = trip_keyboard(1, false, false);
        assert_eq!(markup.inline_keyboard.len(), 3);
    }
}
