//! Protocol Module
//!
//! Typed requests and responses exchanged with the database, plus the text
//! command parser used by the CLI and REPL.
//!
//! ### Requests
//! - INSERT / UPDATE / DELETE: mutations, logged before they are applied
//! - FIND / COUNT / SORT: queries, served under the store's read lock
//! - LIST_COLLECTIONS: collection names
//! - SAVE: snapshot + WAL truncation (compaction)
//!
//! Unknown collections are not an error: queries return empty results.

mod command;
mod parser;
mod response;

pub(crate) use command::{reject_id_field, validate_collection};
pub use command::{Request, RequestType};
pub use parser::{parse_command, parse_object};
pub use response::Response;
