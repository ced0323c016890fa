pub mod eventsub;
pub mod notification;
