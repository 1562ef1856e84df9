//! Inline-keyboard callback data.
//!
//! Callback data is a compact `namespace:action[:id[:offset]]` string,
//! parsed into a closed enum so the dispatcher matches exhaustively.
//! Unknown or malformed data parses to `None` and is ignored.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Main,
    Profile,
    Travels,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelMenuAction {
    Create,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripAction {
    Stops,
    Route,
    Notes,
    Invite,
    Edit,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopAction {
    Show,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteAction {
    Show,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    Menu(MenuAction),
    ProfileEdit,
    TravelMenu(TravelMenuAction),
    TripListPage { offset: usize },
    TripOpen { trip_id: i64 },
    Trip { action: TripAction, trip_id: i64 },
    StopsPage { trip_id: i64, offset: usize },
    StopCreate { trip_id: i64 },
    Stop { action: StopAction, stop_id: i64 },
    NotesPage { trip_id: i64, offset: usize },
    NoteCreate { trip_id: i64 },
    Note { action: NoteAction, note_id: i64 },
    NoteVisibility { note_id: i64, public: bool },
}

impl Callback {
    pub fn encode(&self) -> String {
        match self {
            Callback::Menu(MenuAction::Main) => "menu:main".into(),
            Callback::Menu(MenuAction::Profile) => "menu:profile".into(),
            Callback::Menu(MenuAction::Travels) => "menu:travels".into(),
            Callback::ProfileEdit => "profile:edit".into(),
            Callback::TravelMenu(TravelMenuAction::Create) => "travels:create".into(),
            Callback::TravelMenu(TravelMenuAction::List) => "travels:list".into(),
            Callback::TripListPage { offset } => format!("trip_list:page:{}", offset),
            Callback::TripOpen { trip_id } => format!("trip_list:open:{}", trip_id),
            Callback::Trip { action, trip_id } => {
                let action = match action {
                    TripAction::Stops => "stops",
                    TripAction::Route => "route",
                    TripAction::Notes => "notes",
                    TripAction::Invite => "invite",
                    TripAction::Edit => "edit",
                    TripAction::Delete => "delete",
                };
                format!("trip:{}:{}", action, trip_id)
            }
            Callback::StopsPage { trip_id, offset } => {
                format!("stops:page:{}:{}", trip_id, offset)
            }
            Callback::StopCreate { trip_id } => format!("stops:new:{}", trip_id),
            Callback::Stop { action, stop_id } => {
                let action = match action {
                    StopAction::Show => "show",
                    StopAction::Delete => "delete",
                };
                format!("stop:{}:{}", action, stop_id)
            }
            Callback::NotesPage { trip_id, offset } => {
                format!("notes:page:{}:{}", trip_id, offset)
            }
            Callback::NoteCreate { trip_id } => format!("notes:new:{}", trip_id),
            Callback::Note { action, note_id } => {
                let action = match action {
                    NoteAction::Show => "show",
                    NoteAction::Delete => "delete",
                };
                format!("note:{}:{}", action, note_id)
            }
            Callback::NoteVisibility { note_id, public } => {
                let action = if *public { "public" } else { "private" };
                format!("note_vis:{}:{}", action, note_id)
            }
        }
    }

    pub fn parse(data: &str) -> Option<Callback> {
        let parts: Vec<&str> = data.split(':').collect();
        let cb = match parts.as_slice() {
            ["menu", "main"] => Callback::Menu(MenuAction::Main),
            ["menu", "profile"] => Callback::Menu(MenuAction::Profile),
            ["menu", "travels"] => Callback::Menu(MenuAction::Travels),
            ["profile", "edit"] => Callback::ProfileEdit,
            ["travels", "create"] => Callback::TravelMenu(TravelMenuAction::Create),
            ["travels", "list"] => Callback::TravelMenu(TravelMenuAction::List),
            ["trip_list", "page", offset] => Callback::TripListPage {
                offset: parse_offset(offset)?,
            },
            ["trip_list", "open", id] => Callback::TripOpen {
                trip_id: id.parse().ok()?,
            },
            ["trip", action, id] => {
                let action = match *action {
                    "stops" => TripAction::Stops,
                    "route" => TripAction::Route,
                    "notes" => TripAction::Notes,
                    "invite" => TripAction::Invite,
                    "edit" => TripAction::Edit,
                    "delete" => TripAction::Delete,
                    _ => return None,
                };
                Callback::Trip {
                    action,
                    trip_id: id.parse().ok()?,
                }
            }
            ["stops", "page", id, offset] => Callback::StopsPage {
                trip_id: id.parse().ok()?,
                offset: parse_offset(offset)?,
            },
            ["stops", "new", id] => Callback::StopCreate {
                trip_id: id.parse().ok()?,
            },
            ["stop", action, id] => {
                let action = match *action {
                    "show" => StopAction::Show,
                    "delete" => StopAction::Delete,
                    _ => return None,
                };
                Callback::Stop {
                    action,
                    stop_id: id.parse().ok()?,
                }
            }
            ["notes", "page", id, offset] => Callback::NotesPage {
                trip_id: id.parse().ok()?,
                offset: parse_offset(offset)?,
            },
            ["notes", "new", id] => Callback::NoteCreate {
                trip_id: id.parse().ok()?,
            },
            ["note", action, id] => {
                let action = match *action {
                    "show" => NoteAction::Show,
                    "delete" => NoteAction::Delete,
                    _ => return None,
                };
                Callback::Note {
                    action,
                    note_id: id.parse().ok()?,
                }
            }
            ["note_vis", action, id] => {
                let public = match *action {
                    "public" => true,
                    "private" => false,
                    _ => return None,
                };
                Callback::NoteVisibility {
                    note_id: id.parse().ok()?,
                    public,
                }
            }
            _ => return None,
        };
        Some(cb)
    }
}

/// Offsets arrive as signed text; anything negative clamps to zero.
fn parse_offset(raw: &str) -> Option<usize> {
    let value: i64 = raw.parse().ok()?;
    Some(value.max(0) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_round_trips() {
        let all = [
            Callback::Menu(MenuAction::Main),
            Callback::Menu(MenuAction::Profile),
            Callback::Menu(MenuAction::Travels),
            Callback::ProfileEdit,
            Callback::TravelMenu(TravelMenuAction::Create),
            Callback::TravelMenu(TravelMenuAction::List),
            Callback::TripListPage { offset: 10 },
            Callback::TripOpen { trip_id: 42 },
            Callback::Trip {
                action: TripAction::Stops,
                trip_id: 7,
            },
            Callback::Trip {
                action: TripAction::Route,
                trip_id: 7,
            },
            Callback::Trip {
                action: TripAction::Notes,
                trip_id: 7,
            },
            Callback::Trip {
                action: TripAction::Invite,
                trip_id: 7,
            },
            Callback::Trip {
                action: TripAction::Edit,
                trip_id: 7,
            },
            Callback::Trip {
                action: TripAction::Delete,
                trip_id: 7,
            },
            Callback::StopsPage {
                trip_id: 7,
                offset: 5,
            },
            Callback::StopCreate { trip_id: 7 },
            Callback::Stop {
                action: StopAction::Show,
                stop_id: 3,
            },
            Callback::Stop {
                action: StopAction::Delete,
                stop_id: 3,
            },
            Callback::NotesPage {
                trip_id: 7,
                offset: 0,
            },
            Callback::NoteCreate { trip_id: 7 },
            Callback::Note {
                action: NoteAction::Show,
                note_id: 9,
            },
            Callback::Note {
                action: NoteAction::Delete,
                note_id: 9,
            },
            Callback::NoteVisibility {
                note_id: 9,
                public: true,
            },
            Callback::NoteVisibility {
                note_id: 9,
                public: false,
            },
        ];
        for cb in all {
            assert_eq!(Callback::parse(&cb.encode()), Some(cb));
        }
    }

    #[test]
    fn negative_offset_clamps_to_zero() {
        assert_eq!(
            Callback::parse("trip_list:page:-5"),
            Some(Callback::TripListPage { offset: 0 })
        );
    }

    #[test]
    fn garbage_is_rejected() {
        for data in ["", "menu", "menu:nope", "trip:stops:abc", "stops:page:1", "x:y:z"] {
            assert_eq!(Callback::parse(data), None, "data={:?}", data);
        }
    }
}
