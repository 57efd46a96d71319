//! Reservation aggregation.
//!
//! Attendance is always computed by summing over reservation documents,
//! never by incrementing a cached counter, so concurrent RSVPs cannot race a
//! read-modify-write. A user holding several active reservations for the
//! same event contributes each of them to the sum; uniqueness of
//! (user, event) among active reservations is not enforced anywhere.

use crate::models::Reservation;

/// Sum of `attendee_count` over reservations with status `reserved`.
pub fn active_attendee_total(reservations: &[Reservation]) -> u32 {
    reservations
        .iter()
        .filter(|r| r.status.is_active())
        .map(|r| r.attendee_count)
        .sum()
}

/// Whether `user_id` holds at least one active reservation in the slice.
pub fn is_user_going(reservations: &[Reservation], user_id: &str) -> bool {
    reservations
        .iter()
        .any(|r| r.status.is_active() && r.user_id == user_id)
}
