mod bson;
mod collection;

pub use bson::{serde_option_chrono_datetime, Id};
pub use collection::{ensure_indexes_exist, is_duplicate_key, Coll, MongoCollection};
