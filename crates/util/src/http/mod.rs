pub mod client;
pub mod error;
pub mod http_path_resolution;
pub mod observe;
pub mod parser;
pub mod transport;

pub use client::*;
pub use error::*;
pub use http_path_resolution::*;
pub use observe::*;
pub use parser::*;
pub use transport::*;
