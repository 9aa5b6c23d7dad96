pub mod error;
pub mod load;
pub mod preferences;
pub mod save;
pub mod settings;

pub use error::ConfigError;
pub use load::{load_preferences, load_settings};
pub use preferences::Preferences;
pub use save::{save_preferences, save_settings};
pub use settings::{
    Settings, BACKEND_URL_ENV, DEFAULT_BACKEND_URL, DEFAULT_MAX_UPLOAD_BYTES,
    DEFAULT_PROCESS_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
};
