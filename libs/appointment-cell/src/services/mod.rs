pub mod appointments;
pub mod availability;
pub mod blocked_time;
pub mod booking;
pub mod lifecycle;
pub mod realtime;
pub mod recipient;
pub mod reminder;
pub mod slots;
