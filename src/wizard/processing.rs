use crate::backend::{BackendError, WizardBackend};
use crate::runtime::RuntimeLog;
use crate::shared::time::local_clock_label;
use crate::wizard::configuration::{friendly_error, status_hint};
use crate::wizard::navigation::{WizardCommand, WizardError};
use crate::wizard::state::{ApiConfig, FileRef, ProcessingResult, WizardState, WizardStep};
use std::time::{Duration, Instant};

/// Display labels walked while the backend works. They do not reflect
/// backend progress.
pub const PROCESSING_STAGES: [&str; 5] = [
    "Listagem de Arquivos",
    "Consolidação das Bases",
    "Validação de Qualidade",
    "Cálculo Automatizado",
    "Geração da Planilha",
];

const STAGE_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessingError {
    #[error("processing is only available on the processing step (current: {0})")]
    WrongStep(WizardStep),
    #[error("configure the API key and model first")]
    MissingConfig,
    #[error("upload the required files first")]
    NoFiles,
    #[error("processing is already running")]
    AlreadyRunning,
    #[error(transparent)]
    Wizard(#[from] WizardError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub clock: String,
    pub message: String,
}

/// One processing run. A ticket whose generation no longer matches the
/// view is stale and its outcome is discarded.
#[derive(Debug, Clone)]
pub struct ProcessingTicket {
    generation: u64,
    pub config: ApiConfig,
    pub files: Vec<FileRef>,
}

impl ProcessingTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingOutcome {
    Completed(ProcessingResult),
    Failed(String),
    Discarded,
}

#[derive(Debug)]
pub struct ProcessingView {
    generation: u64,
    active: Option<u64>,
    started_at: Option<Instant>,
    timeout: Duration,
    logs: Vec<LogEntry>,
    error: Option<String>,
}

impl ProcessingView {
    pub fn new(timeout: Duration) -> Self {
        Self {
            generation: 0,
            active: None,
            started_at: None,
            timeout,
            logs: Vec::new(),
            error: None,
        }
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }

    /// Index and label of the stage to show right now.
    pub fn current_stage(&self) -> Option<(usize, &'static str)> {
        self.active.map(|_| cosmetic_stage(self.elapsed()))
    }

    /// Opens a run. The caller dispatches `BeginProcessing` next and then
    /// makes exactly one process call with the ticket's config.
    pub fn start(&mut self, state: &WizardState) -> Result<ProcessingTicket, ProcessingError> {
        if state.current_step() != WizardStep::Processing {
            return Err(ProcessingError::WrongStep(state.current_step()));
        }
        if self.active.is_some() || state.is_processing() {
            return Err(ProcessingError::AlreadyRunning);
        }
        let config = state.config().cloned().ok_or(ProcessingError::MissingConfig)?;
        if state.files().is_empty() {
            return Err(ProcessingError::NoFiles);
        }

        self.generation += 1;
        self.active = Some(self.generation);
        self.started_at = Some(Instant::now());
        self.logs.clear();
        self.error = None;
        self.push_log("Iniciando processamento".to_string());
        self.push_log(format!(
            "Modelo {} com {} arquivo(s)",
            config.model,
            state.files().len()
        ));
        Ok(ProcessingTicket {
            generation: self.generation,
            config,
            files: state.files().to_vec(),
        })
    }

    /// Turns a backend outcome into the command to dispatch. Stale tickets
    /// yield `None`.
    pub fn finish(
        &mut self,
        ticket: &ProcessingTicket,
        outcome: Result<ProcessingResult, BackendError>,
    ) -> Option<WizardCommand> {
        if self.active != Some(ticket.generation) {
            return None;
        }
        self.active = None;
        let command = match outcome {
            Ok(result) if result.status.as_deref().is_some_and(|s| s != "success") => {
                let message = format!(
                    "Processing failed with status `{}`",
                    result.status.as_deref().unwrap_or_default()
                );
                WizardCommand::FailProcessing(message)
            }
            Ok(result) => {
                self.push_log(format!(
                    "Processamento concluído: {} funcionários elegíveis",
                    result.funcionarios_elegiveis
                ));
                return Some(WizardCommand::CompleteProcessing(result));
            }
            Err(err) => WizardCommand::FailProcessing(user_message(&err)),
        };
        if let WizardCommand::FailProcessing(message) = &command {
            self.error = Some(message.clone());
            self.push_log(format!("Erro: {message}"));
        }
        Some(command)
    }

    /// Abandons the current run. The in-flight request is not cancelled;
    /// its outcome will be discarded when it arrives.
    pub fn stop(&mut self) -> WizardCommand {
        if self.active.take().is_some() {
            self.generation += 1;
            self.push_log("Processamento interrompido pelo usuário".to_string());
        }
        WizardCommand::StopProcessing
    }

    /// Forgets the log and error of earlier runs. The generation keeps
    /// counting, so tickets handed out before the clear stay stale.
    pub fn clear(&mut self) {
        if self.active.take().is_some() {
            self.generation += 1;
        }
        self.started_at = None;
        self.logs.clear();
        self.error = None;
    }

    fn push_log(&mut self, message: String) {
        self.logs.push(LogEntry {
            clock: local_clock_label(),
            message,
        });
    }
}

pub fn cosmetic_stage(elapsed: Duration) -> (usize, &'static str) {
    let idx = (elapsed.as_secs() / STAGE_INTERVAL.as_secs()) as usize;
    let idx = idx.min(PROCESSING_STAGES.len() - 1);
    (idx, PROCESSING_STAGES[idx])
}

/// What to show the user for a failed run.
pub fn user_message(err: &BackendError) -> String {
    match err {
        BackendError::Timeout { seconds, .. } => format!(
            "Processing timed out after {seconds}s. The backend may still finish; check the generated files later."
        ),
        BackendError::Connection { url, .. } => {
            format!("Could not connect to the backend at {url}. Is it running?")
        }
        BackendError::Status { status, message } => {
            let detail = status_hint(*status)
                .map(str::to_string)
                .unwrap_or_else(|| friendly_error(message));
            format!("Server error {status} - {detail}")
        }
        BackendError::Application(message) => friendly_error(message),
        BackendError::Malformed { .. } => {
            "The backend answered in an unexpected format.".to_string()
        }
        other => other.to_string(),
    }
}

/// The network half of a run: optional re-upload, then one process call.
pub fn execute_ticket(
    backend: &dyn WizardBackend,
    ticket: &ProcessingTicket,
    sync_files: bool,
) -> Result<ProcessingResult, BackendError> {
    if sync_files {
        backend.upload(&ticket.files, Some(&ticket.config))?;
    }
    backend.process(&ticket.config)
}

/// Runs a whole processing round on the calling thread.
pub fn run_processing(
    backend: &dyn WizardBackend,
    state: &mut WizardState,
    view: &mut ProcessingView,
    log: &RuntimeLog,
    sync_files: bool,
) -> Result<ProcessingOutcome, ProcessingError> {
    let ticket = view.start(state)?;
    if let Err(err) = state.dispatch(WizardCommand::BeginProcessing) {
        view.stop();
        return Err(err.into());
    }
    log.info(
        "wizard.processing_started",
        &format!("model={} files={}", ticket.config.model, ticket.files.len()),
    );

    let outcome = execute_ticket(backend, &ticket, sync_files);
    if let Err(err) = &outcome {
        log.error("backend.process_failed", &err.to_string());
    }
    let Some(command) = view.finish(&ticket, outcome) else {
        return Ok(ProcessingOutcome::Discarded);
    };
    let reported = match &command {
        WizardCommand::CompleteProcessing(result) => ProcessingOutcome::Completed(result.clone()),
        WizardCommand::FailProcessing(message) => ProcessingOutcome::Failed(message.clone()),
        _ => ProcessingOutcome::Discarded,
    };
    state.dispatch(command)?;
    if let ProcessingOutcome::Completed(result) = &reported {
        log.info(
            "wizard.processing_completed",
            &format!(
                "eligible={} files={}",
                result.funcionarios_elegiveis,
                result.arquivos_gerados.len()
            ),
        );
    }
    Ok(reported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosmetic_stage_walks_and_saturates() {
        assert_eq!(cosmetic_stage(Duration::ZERO).0, 0);
        assert_eq!(cosmetic_stage(Duration::from_secs(7)).0, 2);
        assert_eq!(
            cosmetic_stage(Duration::from_secs(3600)),
            (4, "Geração da Planilha")
        );
    }

    #[test]
    fn timeout_message_is_distinct() {
        let timeout = user_message(&BackendError::Timeout {
            url: "http://x/api/process".to_string(),
            seconds: 600,
        });
        let connection = user_message(&BackendError::Connection {
            url: "http://x".to_string(),
            message: "refused".to_string(),
        });
        assert!(timeout.contains("timed out after 600s"));
        assert_ne!(timeout, connection);
    }

    #[test]
    fn status_errors_are_prefixed_and_friendly() {
        let message = user_message(&BackendError::Status {
            status: 500,
            message: "Error code: 429 rate limit".to_string(),
        });
        assert!(message.starts_with("Server error 500 - "));
        assert!(message.contains("Rate limit"));
    }

    #[test]
    fn status_errors_keep_backend_wording_when_unrecognised() {
        let message = user_message(&BackendError::Status {
            status: 500,
            message: "Erro no processamento: coluna MATRICULA ausente na linha 4013".to_string(),
        });
        assert_eq!(
            message,
            "Server error 500 - Erro no processamento: coluna MATRICULA ausente na linha 4013"
        );
    }

    #[test]
    fn status_code_alone_selects_the_hint() {
        let message = user_message(&BackendError::Status {
            status: 429,
            message: "Too Many Requests".to_string(),
        });
        assert_eq!(
            message,
            "Server error 429 - Rate limit reached. Wait a moment and try again."
        );
    }
}
