//! Domain services.
//!
//! Pure aggregation logic (attendance, rating, feed derivation) plus ports
//! for external collaborators (notifications, image storage).

pub mod attendance;
pub mod feed;
pub mod images;
pub mod notification;
pub mod rating;
