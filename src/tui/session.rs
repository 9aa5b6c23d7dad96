use crate::backend::{BackendError, GeneratedFile, UploadedFile, WizardBackend};
use crate::config::{save_preferences, Settings};
use crate::runtime::{RuntimeLog, StatePaths};
use crate::wizard::configuration::{
    mask_api_key, test_default_connection, ConfigDraft, ConfigurationError, TuningField,
};
use crate::wizard::navigation::{WizardAction, WizardCommand, WizardTransition};
use crate::wizard::processing::{execute_ticket, ProcessingTicket, ProcessingView};
use crate::wizard::results::{fetch_into, DownloadTracker, NoticeKind, ResultsView};
use crate::wizard::state::{ProcessingResult, WizardOptions, WizardState, WizardStep};
use crate::wizard::upload::{
    commit_batch, load_candidates, prepare_batch, remove_file, BatchPlan, UploadError,
};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

/// Line input for actions that need text. The terminal implementation
/// draws a popup; scripted runs answer from a queue.
pub trait Prompter {
    fn prompt_line(
        &mut self,
        title: &str,
        prompt: &str,
        initial: &str,
        masked: bool,
    ) -> Result<Option<String>, String>;
}

#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = String>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt_line(
        &mut self,
        _title: &str,
        _prompt: &str,
        _initial: &str,
        _masked: bool,
    ) -> Result<Option<String>, String> {
        Ok(self.answers.pop_front())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    Continue,
    Quit,
}

/// A finished backend call. `epoch` is the session epoch at spawn time;
/// events from before a reset are dropped.
#[derive(Debug)]
pub enum WorkerEvent {
    Processed {
        ticket: ProcessingTicket,
        outcome: Result<ProcessingResult, BackendError>,
    },
    Uploaded {
        epoch: u64,
        plan: BatchPlan,
        outcome: Result<Vec<UploadedFile>, BackendError>,
    },
    ConnectionTested {
        epoch: u64,
        model: String,
        outcome: Result<String, ConfigurationError>,
    },
    FilesListed {
        epoch: u64,
        outcome: Result<Vec<GeneratedFile>, BackendError>,
    },
    Downloaded {
        epoch: u64,
        name: String,
        outcome: Result<PathBuf, String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigRow {
    ApiKey,
    Model,
    Tuning(TuningField),
    UseDefault,
    Continue,
}

pub const CONFIG_ROWS: [ConfigRow; 7] = [
    ConfigRow::ApiKey,
    ConfigRow::Model,
    ConfigRow::Tuning(TuningField::RequestDelay),
    ConfigRow::Tuning(TuningField::RequestTimeout),
    ConfigRow::Tuning(TuningField::MaxRetries),
    ConfigRow::UseDefault,
    ConfigRow::Continue,
];

impl ConfigRow {
    pub fn label(self) -> &'static str {
        match self {
            Self::ApiKey => "Groq API key",
            Self::Model => "Model",
            Self::Tuning(field) => field.label(),
            Self::UseDefault => "Use built-in configuration",
            Self::Continue => "Continue",
        }
    }

    pub fn value(self, draft: &ConfigDraft) -> String {
        match self {
            Self::ApiKey => mask_api_key(&draft.api_key),
            Self::Model => draft.model.clone(),
            Self::Tuning(field) => draft.tuning(field).to_string(),
            Self::UseDefault => {
                if draft.use_default() {
                    "yes".to_string()
                } else {
                    "no".to_string()
                }
            }
            Self::Continue => String::new(),
        }
    }
}

/// Everything one wizard run owns. Only the loop thread touches it; worker
/// threads report back through the event channel.
pub struct WizardSession {
    state: WizardState,
    draft: ConfigDraft,
    processing: ProcessingView,
    results: ResultsView,
    downloads: DownloadTracker,
    generated: Vec<String>,
    backend: Arc<dyn WizardBackend>,
    settings: Settings,
    paths: Option<StatePaths>,
    downloads_dir: PathBuf,
    log: RuntimeLog,
    selected: usize,
    status: String,
    blocking: bool,
    epoch: u64,
    uploading: bool,
    events_tx: Sender<WorkerEvent>,
    events_rx: Receiver<WorkerEvent>,
}

impl WizardSession {
    pub fn new(
        backend: Arc<dyn WizardBackend>,
        settings: Settings,
        paths: Option<StatePaths>,
        downloads_dir: PathBuf,
        log: RuntimeLog,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            state: WizardState::new(WizardOptions::from_settings(&settings)),
            draft: ConfigDraft::default(),
            processing: ProcessingView::new(settings.process_timeout()),
            results: ResultsView::default(),
            downloads: DownloadTracker::new(),
            generated: Vec::new(),
            backend,
            settings,
            paths,
            downloads_dir,
            log,
            selected: 0,
            status: "Enter the Groq API key to begin.".to_string(),
            blocking: false,
            epoch: 0,
            uploading: false,
            events_tx,
            events_rx,
        }
    }

    /// Runs backend calls on the calling thread instead of workers.
    pub fn blocking(mut self) -> Self {
        self.blocking = true;
        self
    }

    pub fn with_draft(mut self, draft: ConfigDraft) -> Self {
        self.draft = draft;
        self
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn draft(&self) -> &ConfigDraft {
        &self.draft
    }

    pub fn processing(&self) -> &ProcessingView {
        &self.processing
    }

    pub fn results(&self) -> &ResultsView {
        &self.results
    }

    pub fn generated(&self) -> &[String] {
        &self.generated
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    pub fn is_downloading(&self, name: &str) -> bool {
        self.downloads.is_downloading(name)
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn backend_url(&self) -> String {
        self.settings.effective_backend_url()
    }

    pub fn downloads_dir(&self) -> &PathBuf {
        &self.downloads_dir
    }

    fn item_count(&self) -> usize {
        match self.state.current_step() {
            WizardStep::Configuration => CONFIG_ROWS.len(),
            WizardStep::Upload => self.state.files().len(),
            WizardStep::Processing => 0,
            WizardStep::Results => self.generated.len(),
        }
    }

    pub fn handle(
        &mut self,
        action: WizardAction,
        prompter: &mut dyn Prompter,
    ) -> Result<SessionSignal, String> {
        match action {
            WizardAction::Quit => {
                if self.state.is_processing() {
                    self.stop_processing();
                }
                self.log.info("wizard.quit", self.state.current_step().as_str());
                return Ok(SessionSignal::Quit);
            }
            WizardAction::Reset => self.reset(),
            WizardAction::Retreat => {
                self.apply(WizardCommand::Retreat);
            }
            WizardAction::Advance => {
                if self.state.current_step() == WizardStep::Configuration {
                    self.submit_config();
                } else {
                    self.apply(WizardCommand::Advance);
                }
            }
            WizardAction::MovePrev => self.move_selection(-1),
            WizardAction::MoveNext => self.move_selection(1),
            WizardAction::Primary => match self.state.current_step() {
                WizardStep::Configuration => self.activate_config_row(prompter)?,
                WizardStep::Upload => self.add_files(prompter)?,
                WizardStep::Processing => self.start_or_stop(),
                WizardStep::Results => self.download_selected(),
            },
            WizardAction::TestConnection => self.test_connection(),
            WizardAction::ToggleDefault => self.toggle_default(),
            WizardAction::AddFile => self.add_files(prompter)?,
            WizardAction::RemoveFile => self.remove_selected(),
            WizardAction::StartStop => self.start_or_stop(),
            WizardAction::Dismiss => self.results.dismiss(),
        }
        Ok(SessionSignal::Continue)
    }

    /// Applies finished worker results. Returns true when anything changed.
    pub fn poll_events(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events_rx.try_recv() {
            changed = true;
            self.apply_event(event);
        }
        changed
    }

    /// Blocks until one worker event arrives or every sender is gone.
    pub fn wait_for_event(&mut self, timeout: std::time::Duration) -> bool {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => {
                self.apply_event(event);
                true
            }
            Err(_) => false,
        }
    }

    fn apply_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Processed { ticket, outcome } => {
                self.apply_processing_outcome(&ticket, outcome)
            }
            WorkerEvent::Uploaded {
                epoch,
                plan,
                outcome,
            } if epoch == self.epoch => self.apply_upload(plan, outcome),
            WorkerEvent::ConnectionTested {
                epoch,
                model,
                outcome,
            } if epoch == self.epoch => self.apply_connection_test(&model, outcome),
            WorkerEvent::FilesListed { epoch, outcome } if epoch == self.epoch => {
                self.apply_file_listing(outcome)
            }
            WorkerEvent::Downloaded {
                epoch,
                name,
                outcome,
            } if epoch == self.epoch => self.apply_download(&name, outcome),
            _ => self.log.info("wizard.event_discarded", "event predates reset"),
        }
    }

    /// Runs a backend call on a worker thread, or inline in blocking mode.
    /// The resulting event is applied on the loop thread either way.
    fn run_job<F>(&mut self, job: F)
    where
        F: FnOnce(&dyn WizardBackend) -> WorkerEvent + Send + 'static,
    {
        if self.blocking {
            let event = job(self.backend.as_ref());
            self.apply_event(event);
            return;
        }
        let backend = Arc::clone(&self.backend);
        let events = self.events_tx.clone();
        thread::spawn(move || {
            let _ = events.send(job(backend.as_ref()));
        });
    }

    fn apply(&mut self, command: WizardCommand) -> Option<WizardTransition> {
        let name = command.as_str();
        match self.state.dispatch(command) {
            Ok(transition) => {
                if transition.moved() {
                    self.selected = 0;
                    self.log.info(
                        "wizard.step_changed",
                        &format!("{} -> {}", transition.from, transition.to),
                    );
                    if transition.to == WizardStep::Results {
                        self.enter_results();
                    }
                    self.status = step_status(transition.to).to_string();
                }
                if let Some(feedback) = &transition.feedback {
                    self.status = feedback.clone();
                }
                Some(transition)
            }
            Err(err) => {
                self.log.warn("wizard.command_rejected", &format!("{name}: {err}"));
                self.status = err.to_string();
                None
            }
        }
    }

    fn reset(&mut self) {
        if self.state.is_processing() {
            self.stop_processing();
        }
        self.apply(WizardCommand::Reset);
        self.epoch += 1;
        self.uploading = false;
        let mut draft = ConfigDraft::default();
        draft.apply_preferences(&self.draft.to_preferences());
        self.draft = draft;
        self.processing.clear();
        self.results = ResultsView::default();
        self.generated.clear();
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.item_count();
        if len == 0 {
            self.selected = 0;
            return;
        }
        let next = (self.selected as isize + delta).rem_euclid(len as isize);
        self.selected = next as usize;
        if self.state.current_step() == WizardStep::Results {
            self.results.selected = self.selected;
        }
    }

    fn activate_config_row(&mut self, prompter: &mut dyn Prompter) -> Result<(), String> {
        let Some(row) = CONFIG_ROWS.get(self.selected).copied() else {
            return Ok(());
        };
        let outcome = match row {
            ConfigRow::ApiKey => {
                let Some(value) =
                    prompter.prompt_line("Groq API key", "Paste the API key (gsk_...)", "", true)?
                else {
                    return Ok(());
                };
                self.draft.set_api_key(&value).map(|_| "API key updated.".to_string())
            }
            ConfigRow::Model => self
                .draft
                .cycle_model()
                .map(|model| format!("Model set to {model}.")),
            ConfigRow::Tuning(field) => {
                let current = self.draft.tuning(field).to_string();
                let Some(raw) = prompter.prompt_line(field.label(), "Enter a number", &current, false)?
                else {
                    return Ok(());
                };
                match raw.trim().parse::<u32>() {
                    Ok(value) => self
                        .draft
                        .edit_tuning(field, value)
                        .map(|applied| format!("{} set to {applied}.", field.label())),
                    Err(_) => {
                        self.status = format!("`{}` is not a number", raw.trim());
                        return Ok(());
                    }
                }
            }
            ConfigRow::UseDefault => {
                self.toggle_default();
                return Ok(());
            }
            ConfigRow::Continue => {
                self.submit_config();
                return Ok(());
            }
        };
        self.status = match outcome {
            Ok(message) => message,
            Err(err) => err.to_string(),
        };
        Ok(())
    }

    fn toggle_default(&mut self) {
        let enable = !self.draft.use_default();
        self.status = match self.draft.set_use_default(enable) {
            Ok(()) if enable => "Built-in configuration active; edits are locked.".to_string(),
            Ok(()) => "Built-in configuration off.".to_string(),
            Err(err) => err.to_string(),
        };
    }

    fn test_connection(&mut self) {
        let draft = self.draft.clone();
        let epoch = self.epoch;
        self.status = "Testing connection...".to_string();
        self.run_job(move |backend| {
            let outcome = if draft.use_default() {
                test_default_connection(backend)
            } else {
                draft.test_connection(backend)
            };
            WorkerEvent::ConnectionTested {
                epoch,
                model: draft.model,
                outcome,
            }
        });
    }

    fn apply_connection_test(&mut self, model: &str, outcome: Result<String, ConfigurationError>) {
        self.status = match outcome {
            Ok(message) => {
                self.log.info("backend.config_tested", &format!("model={model}"));
                message
            }
            Err(err) => {
                self.log
                    .warn("backend.config_test_failed", &format!("model={model}"));
                err.to_string()
            }
        };
    }

    fn submit_config(&mut self) {
        let command = match self.draft.submit() {
            Ok(command) => command,
            Err(err) => {
                self.status = err.to_string();
                return;
            }
        };
        if self.apply(command).is_none() {
            return;
        }
        self.log
            .info("wizard.config_set", &format!("model={}", self.draft.model));
        if let Some(paths) = &self.paths {
            if let Err(err) = save_preferences(paths, &self.draft.to_preferences()) {
                self.log.warn("wizard.preferences_not_saved", &err.to_string());
            }
        }
    }

    fn add_files(&mut self, prompter: &mut dyn Prompter) -> Result<(), String> {
        if self.state.current_step() != WizardStep::Upload {
            return Ok(());
        }
        if self.uploading {
            self.status = "An upload is already in progress.".to_string();
            return Ok(());
        }
        let Some(raw) = prompter.prompt_line(
            "Add files",
            "Paths to .xlsx/.xls/.csv files, comma separated",
            "",
            false,
        )?
        else {
            return Ok(());
        };
        let paths: Vec<PathBuf> = raw
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect();
        if paths.is_empty() {
            self.status = "No paths given.".to_string();
            return Ok(());
        }
        let max_bytes = self.settings.max_upload_bytes;
        let plan = match load_candidates(&paths, max_bytes)
            .and_then(|candidates| prepare_batch(self.state.files(), candidates, max_bytes))
        {
            Ok(plan) => plan,
            Err(err) => {
                self.status = err.to_string();
                return Ok(());
            }
        };
        if plan.is_empty() {
            self.status = "Every file is already in the list.".to_string();
            return Ok(());
        }
        self.uploading = true;
        self.status = format!("Uploading {} file(s)...", plan.to_send.len());
        let config = self.state.config().cloned();
        let epoch = self.epoch;
        self.run_job(move |backend| {
            let outcome = backend.upload(&plan.to_send, config.as_ref());
            WorkerEvent::Uploaded {
                epoch,
                plan,
                outcome,
            }
        });
        Ok(())
    }

    fn apply_upload(&mut self, plan: BatchPlan, outcome: Result<Vec<UploadedFile>, BackendError>) {
        self.uploading = false;
        let uploaded = match outcome {
            Ok(uploaded) => uploaded,
            Err(err) => {
                self.log.error("backend.upload_failed", &err.to_string());
                self.status = UploadError::from(err).to_string();
                return;
            }
        };
        let skipped = plan.skipped.len();
        let added = match commit_batch(&mut self.state, plan.to_send) {
            Ok(added) => added,
            Err(err) => {
                self.log.warn("wizard.command_rejected", &format!("set_files: {err}"));
                self.status = err.to_string();
                return;
            }
        };
        self.log.info(
            "wizard.files_uploaded",
            &format!(
                "added={} skipped={skipped} backend_files={}",
                added.join(","),
                uploaded.len()
            ),
        );
        if added.is_empty() {
            self.status = "Every file is already in the list.".to_string();
            return;
        }
        let mut message = format!("Uploaded {}.", added.join(", "));
        if skipped > 0 {
            message.push_str(&format!(" Skipped {skipped} duplicate(s)."));
        }
        if self.state.current_step() == WizardStep::Processing {
            self.selected = 0;
            message.push_str(" Every required file is present.");
        }
        self.status = message;
    }

    fn remove_selected(&mut self) {
        let Some(name) = self
            .state
            .files()
            .get(self.selected)
            .map(|file| file.name.clone())
        else {
            self.status = "No file selected.".to_string();
            return;
        };
        if let Some(command) = remove_file(self.state.files(), &name) {
            if self.apply(command).is_some() {
                self.status = format!("Removed {name}.");
                self.log.info("wizard.file_removed", &name);
                self.selected = self.selected.min(self.state.files().len().saturating_sub(1));
            }
        }
    }

    fn start_or_stop(&mut self) {
        if self.state.is_processing() {
            self.stop_processing();
        } else {
            self.start_processing();
        }
    }

    fn start_processing(&mut self) {
        let ticket = match self.processing.start(&self.state) {
            Ok(ticket) => ticket,
            Err(err) => {
                self.status = err.to_string();
                return;
            }
        };
        if self.apply(WizardCommand::BeginProcessing).is_none() {
            self.processing.stop();
            return;
        }
        self.log.info(
            "wizard.processing_started",
            &format!("model={} files={}", ticket.config.model, ticket.files.len()),
        );
        let sync = self.settings.sync_before_process;
        self.run_job(move |backend| {
            let outcome = execute_ticket(backend, &ticket, sync);
            WorkerEvent::Processed { ticket, outcome }
        });
    }

    fn stop_processing(&mut self) {
        let command = self.processing.stop();
        self.apply(command);
        self.log.info("wizard.processing_stopped", "stopped by user");
    }

    fn apply_processing_outcome(
        &mut self,
        ticket: &ProcessingTicket,
        outcome: Result<ProcessingResult, BackendError>,
    ) {
        if let Err(err) = &outcome {
            self.log.error("backend.process_failed", &err.to_string());
        }
        let Some(command) = self.processing.finish(ticket, outcome) else {
            self.log.info(
                "wizard.processing_discarded",
                &format!("generation={}", ticket.generation()),
            );
            return;
        };
        self.apply(command);
    }

    fn enter_results(&mut self) {
        self.results = ResultsView::default();
        self.generated = self
            .state
            .result()
            .map(|result| result.arquivos_gerados.clone())
            .unwrap_or_default();
        if !self.generated.is_empty() {
            return;
        }
        let epoch = self.epoch;
        self.run_job(move |backend| WorkerEvent::FilesListed {
            epoch,
            outcome: backend.list_files(),
        });
    }

    fn apply_file_listing(&mut self, outcome: Result<Vec<GeneratedFile>, BackendError>) {
        if self.state.current_step() != WizardStep::Results {
            return;
        }
        match outcome {
            Ok(files) => self.generated = files.into_iter().map(|file| file.name).collect(),
            Err(err) => self
                .results
                .notify(NoticeKind::Error, format!("Could not list files: {err}")),
        }
    }

    fn download_selected(&mut self) {
        let Some(name) = self.generated.get(self.selected).cloned() else {
            self.status = "No generated file selected.".to_string();
            return;
        };
        let ticket = match self.downloads.begin(&name) {
            Ok(ticket) => ticket,
            Err(err) => {
                self.results.notify(NoticeKind::Info, err.to_string());
                return;
            }
        };
        self.status = format!("Downloading {name}...");
        let dest = self.downloads_dir.clone();
        let log = self.log.clone();
        let epoch = self.epoch;
        self.run_job(move |backend| {
            let outcome = fetch_into(backend, &ticket, &dest, &log).map_err(|err| err.to_string());
            drop(ticket);
            WorkerEvent::Downloaded {
                epoch,
                name,
                outcome,
            }
        });
    }

    fn apply_download(&mut self, name: &str, outcome: Result<PathBuf, String>) {
        match outcome {
            Ok(path) => {
                self.status = format!("Saved {name}.");
                self.results
                    .notify(NoticeKind::Info, format!("Saved {}", path.display()));
            }
            Err(err) => {
                self.status = format!("Download of {name} failed.");
                self.results.notify(NoticeKind::Error, err);
            }
        }
    }
}

pub fn step_status(step: WizardStep) -> &'static str {
    match step {
        WizardStep::Configuration => "Enter the Groq API key to begin.",
        WizardStep::Upload => "Add every required workbook, then continue.",
        WizardStep::Processing => "Press s to start processing.",
        WizardStep::Results => "Select a file and press Enter to download it.",
    }
}
