pub use crate::types::SubscoutError;

pub type Result<T> = std::result::Result<T, SubscoutError>;
