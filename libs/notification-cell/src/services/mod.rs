pub mod dispatcher;
pub mod email;
pub mod telegram;
pub mod templates;
