pub mod configuration;
pub mod format;
pub mod navigation;
pub mod processing;
pub mod results;
pub mod roster;
pub mod state;
pub mod upload;

pub use navigation::{
    parse_scripted_wizard_keys, wizard_action_from_key, WizardAction, WizardCommand, WizardError,
    WizardTransition, SCRIPT_KEYS_ENV,
};
pub use roster::{Roster, RosterStatus, DEFAULT_REQUIRED_FILES};
pub use state::{
    ApiConfig, FileRef, ProcessingResult, WizardOptions, WizardState, WizardStep, ALL_WIZARD_STEPS,
};

use crate::config::Settings;

impl WizardOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            roster: Roster::from_names(settings.required_files.iter().cloned()),
            auto_advance_min_files: settings.auto_advance_min_files,
        }
    }
}
