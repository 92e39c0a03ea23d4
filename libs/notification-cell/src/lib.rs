// Outbound notifications: transactional email and Telegram messages.
// Every send is best effort from the caller's point of view; callers log
// failures and never roll back the state change that triggered them.

pub mod models;
pub mod services;

pub use models::{AppointmentNotice, EmailMessage, NotificationError};
pub use services::dispatcher::NotificationDispatcher;
pub use services::email::EmailClient;
pub use services::telegram::TelegramClient;
