pub mod user;
pub mod alert;
pub mod notification;

pub use user::CurrentUser;
pub use alert::{Alert, AlertCondition, AlertDraft};
pub use notification::{NewNotification, Notification};
