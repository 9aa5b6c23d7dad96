use crate::app::command_support::load_context;
use crate::backend::WizardBackend;
use crate::tui::session::WizardSession;
use crate::tui::wizard::{
    is_interactive_terminal, load_scripted_wizard_keys, run_wizard_scripted, run_wizard_tui,
};
use crate::wizard::navigation::SCRIPT_KEYS_ENV;
use std::sync::Arc;

/// Opens the wizard. Without a terminal the keys come from
/// `FINACREW_WIZARD_SCRIPT_KEYS` and `args` answer the prompts in order.
pub fn cmd_wizard(args: &[String]) -> Result<String, String> {
    let context = load_context()?;
    let backend: Arc<dyn WizardBackend> = Arc::new(context.backend());
    let session = WizardSession::new(
        backend,
        context.settings.clone(),
        Some(context.paths.clone()),
        context.downloads_dir(),
        context.log.clone(),
    )
    .with_draft(context.draft());
    context.log.info("wizard.opened", &context.settings.effective_backend_url());

    if let Some(keys) = load_scripted_wizard_keys()? {
        let mut session = session.blocking();
        run_wizard_scripted(&mut session, keys, args.to_vec())?;
        return Ok(wizard_summary(&session));
    }
    if !is_interactive_terminal() {
        return Err(format!(
            "wizard needs an interactive terminal; set {SCRIPT_KEYS_ENV} or use `finacrew process`"
        ));
    }
    let mut session = session;
    run_wizard_tui(&mut session)?;
    Ok(wizard_summary(&session))
}

pub fn wizard_summary(session: &WizardSession) -> String {
    let state = session.state();
    let mut lines = vec![
        format!("step={}", state.current_step()),
        format!("files={}", state.files().len()),
        format!("processing={}", state.is_processing()),
    ];
    if let Some(config) = state.config() {
        lines.push(format!("model={}", config.model));
    }
    if let Some(result) = state.result() {
        lines.push(format!("eligible={}", result.funcionarios_elegiveis));
        lines.push(format!("generated={}", result.arquivos_gerados.len()));
    }
    if let Some(error) = state.error() {
        lines.push(format!("error={error}"));
    }
    lines.push(format!("status={}", session.status()));
    lines.join("\n")
}
