use crate::app::command_support::{headless_api_config, load_context, take_flag, CommandContext};
use crate::backend::WizardBackend;
use crate::wizard::navigation::WizardCommand;
use crate::wizard::results::{download_to, DownloadTracker};
use crate::wizard::state::{ApiConfig, WizardOptions, WizardState};
use crate::wizard::upload::{load_candidates, upload_batch, UploadOutcome};
use crate::wizard::Roster;
use std::path::{Path, PathBuf};

pub fn cmd_roster(args: &[String]) -> Result<String, String> {
    let context = load_context()?;
    let roster = Roster::from_names(context.settings.required_files.iter().cloned());
    let names: Vec<String> = args
        .iter()
        .map(|arg| {
            Path::new(arg)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| arg.clone())
        })
        .collect();
    Ok(render_roster(&roster, &names))
}

pub(crate) fn render_roster(roster: &Roster, names: &[String]) -> String {
    let mut lines = Vec::new();
    for status in roster.compute_status(names) {
        lines.push(format!(
            "required={} present={} matched_by={}",
            status.required,
            status.present,
            status.matched_by.unwrap_or_else(|| "none".to_string())
        ));
    }
    lines.push(format!("can_proceed={}", roster.can_proceed(names)));
    lines.join("\n")
}

/// Opens a session already past configuration, the state a headless
/// upload needs.
pub(crate) fn configured_state(
    context: &CommandContext,
    config: ApiConfig,
) -> Result<WizardState, String> {
    let mut state = WizardState::new(WizardOptions::from_settings(&context.settings));
    state
        .dispatch(WizardCommand::SetConfig(config))
        .map_err(|e| e.to_string())?;
    Ok(state)
}

pub(crate) fn upload_paths(
    context: &CommandContext,
    backend: &dyn WizardBackend,
    state: &mut WizardState,
    args: &[String],
) -> Result<UploadOutcome, String> {
    if args.is_empty() {
        return Err("usage: upload <files>...".to_string());
    }
    let paths: Vec<PathBuf> = args.iter().map(PathBuf::from).collect();
    let max_bytes = context.settings.max_upload_bytes;
    let candidates = load_candidates(&paths, max_bytes).map_err(|e| e.to_string())?;
    upload_batch(backend, state, candidates, max_bytes, &context.log).map_err(|e| e.to_string())
}

pub fn cmd_upload(args: &[String]) -> Result<String, String> {
    let context = load_context()?;
    let config = headless_api_config(&context)?;
    let backend = context.backend();
    let mut state = configured_state(&context, config)?;
    let outcome = upload_paths(&context, &backend, &mut state, args)?;

    let names: Vec<String> = state.files().iter().map(|f| f.name.clone()).collect();
    Ok(format!(
        "uploaded={}\nskipped={}\nbackend_files={}\n{}",
        outcome.added.len(),
        outcome.skipped.len(),
        outcome.uploaded.len(),
        render_roster(state.roster(), &names)
    ))
}

pub fn cmd_files() -> Result<String, String> {
    let context = load_context()?;
    let files = context.backend().list_files().map_err(|e| e.to_string())?;
    if files.is_empty() {
        return Ok("files=0".to_string());
    }
    let mut lines = vec![format!("files={}", files.len())];
    for file in files {
        lines.push(format!(
            "file={} size={}",
            file.name,
            file.size
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        ));
    }
    Ok(lines.join("\n"))
}

pub fn cmd_download(args: &[String]) -> Result<String, String> {
    let (positional, out) = take_flag(args, "--out")?;
    let [name] = positional.as_slice() else {
        return Err("usage: download <name> [--out <dir>]".to_string());
    };
    let context = load_context()?;
    let dest = out
        .map(PathBuf::from)
        .unwrap_or_else(|| context.downloads_dir());
    let tracker = DownloadTracker::new();
    let path = download_to(&context.backend(), &tracker, name, &dest, &context.log)
        .map_err(|e| e.to_string())?;
    Ok(format!("downloaded={name}\npath={}", path.display()))
}
