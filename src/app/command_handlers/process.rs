use super::files::{configured_state, render_roster, upload_paths};
use crate::app::command_support::{headless_api_config, load_context};
use crate::wizard::navigation::WizardCommand;
use crate::wizard::processing::{run_processing, ProcessingOutcome, ProcessingView};
use crate::wizard::results::summary_rows;
use crate::wizard::state::{file_names, WizardStep};

/// Headless run of the whole wizard: upload, gate check, process, results.
pub fn cmd_process(args: &[String]) -> Result<String, String> {
    let context = load_context()?;
    let config = headless_api_config(&context)?;
    let backend = context.backend();
    let mut state = configured_state(&context, config)?;
    let uploaded = upload_paths(&context, &backend, &mut state, args)?;

    let names: Vec<String> = file_names(state.files())
        .into_iter()
        .map(str::to_string)
        .collect();
    let advance = if state.current_step() == WizardStep::Upload {
        state.dispatch(WizardCommand::Advance).map(|_| ())
    } else {
        Ok(())
    };
    if let Err(err) = advance {
        return Err(format!("{err}\n{}", render_roster(state.roster(), &names)));
    }

    // The batch was sent moments ago; a re-sync only helps for files this
    // command did not upload itself.
    let sync =
        context.settings.sync_before_process && uploaded.added.len() < state.files().len();
    let mut view = ProcessingView::new(context.settings.process_timeout());
    let outcome = run_processing(&backend, &mut state, &mut view, &context.log, sync)
    .map_err(|e| e.to_string())?;

    match outcome {
        ProcessingOutcome::Completed(result) => {
            let mut lines = vec![
                "status=success".to_string(),
                format!("eligible={}", result.funcionarios_elegiveis),
                format!("valor_total_vr={:.2}", result.valor_total_vr),
                format!("valor_empresa={:.2}", result.valor_empresa),
                format!("valor_funcionario={:.2}", result.valor_funcionario),
            ];
            for row in summary_rows(&result) {
                lines.push(format!("summary={}: {}", row.label, row.value));
            }
            for file in &result.arquivos_gerados {
                lines.push(format!("generated={file}"));
            }
            Ok(lines.join("\n"))
        }
        ProcessingOutcome::Failed(message) => Err(format!("processing failed: {message}")),
        ProcessingOutcome::Discarded => Err("processing was stopped".to_string()),
    }
}
