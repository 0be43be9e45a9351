pub mod config;
pub mod error;
pub mod types;
pub mod util;

pub use config::Config;
pub use error::{Result, SyncError};
pub use types::*;
pub use util::{clamp_to_i32, clamp_opt};
