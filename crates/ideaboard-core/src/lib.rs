pub mod app;
pub mod board;
pub mod calendar;
pub mod config;
pub mod crypto;
pub mod db;
pub mod envelope;
pub mod ideas;
pub mod kdf;
pub mod notifications;
pub mod reminders;
pub mod session;
