pub mod candidates;
pub mod connections;
pub mod db;
pub mod dismissals;
pub mod models;
pub mod organizations;
pub mod schema;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
