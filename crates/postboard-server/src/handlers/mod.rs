pub mod auth;
pub mod health;
pub mod listing;
pub mod posts;
