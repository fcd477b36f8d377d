//! Bag — упорядоченный append-only лог записей `(timestamp, topic, payload)`.
//!
//! Формат на диске — JSON Lines:
//! ```text
//! {"format":"vive-bag","version":1}
//! {"topic":"/vive_input/raw_string","ts_ns":1718000000000000000,"data":"..."}
//! ```
//! Первая строка — заголовок, каждая следующая — одна запись.

pub mod error;
mod record;
mod store;

pub use error::BagError;
pub use record::{Record, Stamp};
pub use store::{LogStore, Messages, OpenMode};
