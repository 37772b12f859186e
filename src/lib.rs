pub mod config;
pub mod fetch;
pub mod process;

pub use config::Config;
pub use fetch::FetchError;
pub use process::{ReshapeError, RunSummary};
