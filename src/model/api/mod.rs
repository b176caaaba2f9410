pub mod admin;
pub mod analytics;
pub mod auth;
pub mod ballot;
pub mod candidate;
pub mod email;
pub mod position;
pub mod settings;
pub mod token;
pub mod user;
