#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Wizard,
    Roster,
    Upload,
    Process,
    Files,
    Download,
    Config,
    Model,
    Health,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "wizard" => CliVerb::Wizard,
        "roster" => CliVerb::Roster,
        "upload" => CliVerb::Upload,
        "process" => CliVerb::Process,
        "files" => CliVerb::Files,
        "download" => CliVerb::Download,
        "config" => CliVerb::Config,
        "model" => CliVerb::Model,
        "health" => CliVerb::Health,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  wizard [<answers>...]                Open the interactive VR/VA wizard".to_string(),
        "  roster <files>...                    Check local file names against the roster"
            .to_string(),
        "  upload <files>...                    Validate and upload workbooks".to_string(),
        "  process <files>...                   Upload, process and print the results"
            .to_string(),
        "  files                                List files generated by the backend".to_string(),
        "  download <name> [--out <dir>]        Download one generated file".to_string(),
        "  config show|test|test-default        Show or test the Groq configuration".to_string(),
        "  model [<model>]                      Show/set the preferred model".to_string(),
        "  health                               Check the backend".to_string(),
    ]
}

pub fn environment_help_lines() -> Vec<String> {
    vec![
        "  FINACREW_BACKEND_URL                 Override the backend URL".to_string(),
        "  GROQ_API_KEY                         API key for headless commands".to_string(),
        "  FINACREW_WIZARD_SCRIPT_KEYS          Comma separated keys for a scripted wizard"
            .to_string(),
    ]
}

pub(crate) fn help_text() -> String {
    let mut lines = cli_help_lines();
    lines.push(String::new());
    lines.push("Environment:".to_string());
    lines.extend(environment_help_lines());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_lists_every_verb() {
        let help = help_text();
        for verb in [
            "wizard", "roster", "upload", "process", "files", "download", "config", "model",
            "health",
        ] {
            assert!(help.contains(&format!("  {verb}")), "missing {verb}");
            assert_ne!(parse_cli_verb(verb), CliVerb::Unknown);
        }
        assert_eq!(parse_cli_verb("-h"), CliVerb::Help);
        assert_eq!(parse_cli_verb("daemon"), CliVerb::Unknown);
    }
}
