//! Request handle, HTTP transport and small helpers shared by the engine and
//! the command line tool.

pub mod date_handling;
pub mod http;
pub mod redact;

pub use date_handling::{is_date_like, parse_date_like};
pub use redact::{redact_headers, redact_sensitive};
