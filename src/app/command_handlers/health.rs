use crate::app::command_support::load_context;
use crate::backend::WizardBackend;

pub fn cmd_health() -> Result<String, String> {
    let context = load_context()?;
    let backend = context.backend();
    let health = backend.health().map_err(|e| e.to_string())?;
    Ok(format!(
        "backend_url={}\nstatus={}\nmessage={}\nversion={}",
        backend.base_url(),
        health.status,
        health.message.unwrap_or_else(|| "none".to_string()),
        health.version.unwrap_or_else(|| "unknown".to_string())
    ))
}
