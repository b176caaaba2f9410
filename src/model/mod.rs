pub mod api;
pub mod db;
pub mod eligibility;
pub mod mongodb;
pub mod otp;
pub mod pagination;
