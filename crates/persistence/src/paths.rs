//! Collection names and subcollection paths. These strings are the wire
//! contract shared with every other client of the store.

pub const EVENTS: &str = "events";
pub const RESERVATIONS: &str = "reservations";
pub const USERS: &str = "users";

pub fn messages(event_id: &str) -> String {
    format!("events/{event_id}/messages")
}

pub fn reviews(event_id: &str) -> String {
    format!("events/{event_id}/reviews")
}

pub fn expulsions(event_id: &str) -> String {
    format!("events/{event_id}/expulsions")
}
