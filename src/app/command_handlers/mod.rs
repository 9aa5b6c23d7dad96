use crate::app::cli::{help_text, parse_cli_verb, CliVerb};

pub mod configuration;
pub mod files;
pub mod health;
pub mod process;
pub mod wizard;

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    if args.is_empty() {
        return Ok(help_text());
    }

    match parse_cli_verb(args[0].as_str()) {
        CliVerb::Wizard => wizard::cmd_wizard(&args[1..]),
        CliVerb::Roster => files::cmd_roster(&args[1..]),
        CliVerb::Upload => files::cmd_upload(&args[1..]),
        CliVerb::Process => process::cmd_process(&args[1..]),
        CliVerb::Files => files::cmd_files(),
        CliVerb::Download => files::cmd_download(&args[1..]),
        CliVerb::Config => configuration::cmd_config(&args[1..]),
        CliVerb::Model => configuration::cmd_model(&args[1..]),
        CliVerb::Health => health::cmd_health(),
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(format!("unknown command `{}`", args[0])),
    }
}
