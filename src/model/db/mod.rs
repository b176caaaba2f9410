pub mod admin;
pub mod ballot;
pub mod candidate;
pub mod position;
pub mod settings;
pub mod voter;
