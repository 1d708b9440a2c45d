pub mod event;
pub mod link;
pub mod user;

pub use event::{AnalyticsEvent, EventType, NewAnalyticsEvent};
pub use link::{CreateLinkRequest, Link, ReorderRequest, RotationType, UpdateLinkRequest};
pub use user::User;
