//! Entity models mapped from raw store documents.

pub mod chat;
pub mod event;
pub mod reservation;
pub mod review;
pub mod user;

pub use chat::{ChatMessage, MessageType};
pub use event::{Event, EventDraft, Recurrence};
pub use reservation::{PaymentInfo, Reservation, ReservationStatus};
pub use review::{Review, ReviewStatus};
pub use user::UserProfile;
