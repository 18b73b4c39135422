pub mod error;
pub mod names;

pub use error::{Result, RouteError};
pub use names::{normalize_name, unquote_identifier};
