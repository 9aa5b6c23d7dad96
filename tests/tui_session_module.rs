use finacrew::backend::{
    BackendError, ConnectionCheck, DefaultCheck, GeneratedFile, HealthStatus, UploadedFile,
    WizardBackend,
};
use finacrew::config::Settings;
use finacrew::runtime::RuntimeLog;
use finacrew::tui::screens::project_wizard_view_model;
use finacrew::tui::session::{ScriptedPrompter, SessionSignal, WizardSession};
use finacrew::tui::wizard::run_wizard_scripted;
use finacrew::wizard::{
    parse_scripted_wizard_keys, ApiConfig, FileRef, ProcessingResult, WizardAction, WizardStep,
};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Process call `n` waits for the `n`th gate, when one was given.
struct ScriptedBackend {
    gates: Mutex<VecDeque<Receiver<()>>>,
    process_calls: AtomicUsize,
    downloads: AtomicUsize,
}

impl ScriptedBackend {
    fn immediate() -> Self {
        Self::gated(Vec::new())
    }

    fn gated(gates: Vec<Receiver<()>>) -> Self {
        Self {
            gates: Mutex::new(gates.into()),
            process_calls: AtomicUsize::new(0),
            downloads: AtomicUsize::new(0),
        }
    }

    fn wait_for_process_calls(&self, expected: usize) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while self.process_calls.load(Ordering::SeqCst) < expected {
            assert!(Instant::now() < deadline, "process call never arrived");
            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl WizardBackend for ScriptedBackend {
    fn test_config(&self, config: &ApiConfig) -> Result<ConnectionCheck, BackendError> {
        Ok(ConnectionCheck {
            status: Some("success".to_string()),
            model_used: Some(config.model.clone()),
            message: Some("Connection OK".to_string()),
            test_response: None,
        })
    }

    fn test_default(&self) -> Result<DefaultCheck, BackendError> {
        Ok(DefaultCheck {
            groq_working: true,
            message: Some("default key works".to_string()),
        })
    }

    fn upload(
        &self,
        files: &[FileRef],
        _config: Option<&ApiConfig>,
    ) -> Result<Vec<UploadedFile>, BackendError> {
        Ok(files
            .iter()
            .map(|f| UploadedFile {
                name: f.name.clone(),
                size: Some(f.size_bytes),
            })
            .collect())
    }

    fn process(&self, _config: &ApiConfig) -> Result<ProcessingResult, BackendError> {
        let gate = self.gates.lock().expect("gates lock").pop_front();
        self.process_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = gate {
            let _ = gate.recv_timeout(Duration::from_secs(10));
        }
        Ok(ProcessingResult {
            funcionarios_elegiveis: 42,
            valor_total_vr: 33_000.0,
            valor_empresa: 26_400.0,
            valor_funcionario: 6_600.0,
            tempo_processamento: "1s".to_string(),
            arquivos_gerados: vec!["VR_MENSAL_05.2025.xlsx".to_string()],
            status: Some("success".to_string()),
            sistema_usado: None,
            metodo_calculo: None,
            fonte_dados: None,
        })
    }

    fn list_files(&self) -> Result<Vec<GeneratedFile>, BackendError> {
        Ok(Vec::new())
    }

    fn download(&self, name: &str) -> Result<Vec<u8>, BackendError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(format!("conteudo {name}").into_bytes())
    }

    fn health(&self) -> Result<HealthStatus, BackendError> {
        Ok(HealthStatus {
            status: "healthy".to_string(),
            message: None,
            version: None,
        })
    }
}

fn wait(session: &mut WizardSession) {
    assert!(
        session.wait_for_event(Duration::from_secs(10)),
        "worker event never arrived"
    );
}

/// Configures, uploads the workbook and starts a run on a threaded session.
fn start_run(session: &mut WizardSession, workbook: &Path) {
    let mut prompter = ScriptedPrompter::new([
        "gsk_scripted_0000000000".to_string(),
        workbook.display().to_string(),
    ]);
    session
        .handle(WizardAction::Primary, &mut prompter)
        .expect("key");
    session
        .handle(WizardAction::Advance, &mut prompter)
        .expect("submit");
    session
        .handle(WizardAction::AddFile, &mut prompter)
        .expect("add");
    assert!(session.is_uploading());
    wait(session);
    assert_eq!(session.state().files().len(), 1);
    session
        .handle(WizardAction::Advance, &mut prompter)
        .expect("advance");
    session
        .handle(WizardAction::StartStop, &mut prompter)
        .expect("start");
    assert!(session.state().is_processing());
}

fn single_file_settings() -> Settings {
    Settings {
        required_files: vec!["ATIVOS.xlsx".to_string()],
        ..Settings::default()
    }
}

fn session(backend: Arc<ScriptedBackend>, downloads: &Path) -> WizardSession {
    WizardSession::new(
        backend,
        single_file_settings(),
        None,
        downloads.to_path_buf(),
        RuntimeLog::disabled(),
    )
}

#[test]
fn tui_session_module_scripted_run_reaches_results_and_downloads() {
    let temp = tempfile::tempdir().expect("tempdir");
    let workbook = temp.path().join("base_ATIVOS.xlsx");
    fs::write(&workbook, b"planilha").expect("write workbook");
    let downloads = temp.path().join("downloads");
    let backend = Arc::new(ScriptedBackend::immediate());
    let mut session = session(Arc::clone(&backend), &downloads).blocking();

    let keys = parse_scripted_wizard_keys("enter,right,a,right,s,enter,q").expect("keys");
    let answers = vec![
        "gsk_scripted_0000000000".to_string(),
        workbook.display().to_string(),
    ];
    let signal = run_wizard_scripted(&mut session, keys, answers).expect("run");

    assert_eq!(signal, SessionSignal::Quit);
    assert_eq!(session.state().current_step(), WizardStep::Results);
    assert_eq!(backend.process_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.downloads.load(Ordering::SeqCst), 1);
    assert_eq!(session.generated(), ["VR_MENSAL_05.2025.xlsx".to_string()]);
    let saved = downloads.join("VR_MENSAL_05.2025.xlsx");
    assert_eq!(
        fs::read_to_string(saved).expect("downloaded file"),
        "conteudo VR_MENSAL_05.2025.xlsx"
    );

    let view = project_wizard_view_model(&session);
    assert!(view.details.iter().any(|line| line.contains("R$ 33.000,00")));
}

#[test]
fn tui_session_module_gate_keeps_upload_until_roster_is_met() {
    let temp = tempfile::tempdir().expect("tempdir");
    let other = temp.path().join("FÉRIAS.xlsx");
    fs::write(&other, b"x").expect("write");
    let backend = Arc::new(ScriptedBackend::immediate());
    let mut session = session(backend, temp.path()).blocking();
    let mut prompter = ScriptedPrompter::new([
        "gsk_scripted_0000000000".to_string(),
        other.display().to_string(),
    ]);

    session
        .handle(WizardAction::Primary, &mut prompter)
        .expect("key");
    session
        .handle(WizardAction::Advance, &mut prompter)
        .expect("submit");
    session
        .handle(WizardAction::AddFile, &mut prompter)
        .expect("add");
    session
        .handle(WizardAction::Advance, &mut prompter)
        .expect("advance");

    assert_eq!(session.state().current_step(), WizardStep::Upload);
    assert!(session.status().contains("ATIVOS.xlsx"));
}

#[test]
fn tui_session_module_stopped_run_ignores_late_result() {
    let temp = tempfile::tempdir().expect("tempdir");
    let workbook = temp.path().join("ATIVOS.xlsx");
    fs::write(&workbook, b"x").expect("write");
    let (release_tx, release_rx) = mpsc::channel();
    let backend = Arc::new(ScriptedBackend::gated(vec![release_rx]));
    let mut session = session(Arc::clone(&backend), temp.path());
    start_run(&mut session, &workbook);

    session
        .handle(WizardAction::StartStop, &mut ScriptedPrompter::default())
        .expect("stop");
    assert!(!session.state().is_processing());

    release_tx.send(()).expect("release worker");
    wait(&mut session);

    assert_eq!(session.state().current_step(), WizardStep::Processing);
    assert!(session.state().result().is_none());
    assert_eq!(backend.process_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn tui_session_module_run_abandoned_by_reset_cannot_complete_the_next_run() {
    let temp = tempfile::tempdir().expect("tempdir");
    let workbook = temp.path().join("ATIVOS.xlsx");
    fs::write(&workbook, b"x").expect("write");
    let (first_tx, first_rx) = mpsc::channel();
    let (second_tx, second_rx) = mpsc::channel();
    let backend = Arc::new(ScriptedBackend::gated(vec![first_rx, second_rx]));
    let mut session = session(Arc::clone(&backend), temp.path());

    start_run(&mut session, &workbook);
    backend.wait_for_process_calls(1);
    session
        .handle(WizardAction::Reset, &mut ScriptedPrompter::default())
        .expect("reset");
    assert_eq!(session.state().current_step(), WizardStep::Configuration);

    start_run(&mut session, &workbook);
    backend.wait_for_process_calls(2);

    first_tx.send(()).expect("release abandoned run");
    wait(&mut session);
    assert_eq!(session.state().current_step(), WizardStep::Processing);
    assert!(session.state().is_processing());
    assert!(session.state().result().is_none());

    second_tx.send(()).expect("release current run");
    wait(&mut session);
    assert_eq!(session.state().current_step(), WizardStep::Results);
    assert!(session.state().result().is_some());
}

#[test]
fn tui_session_module_connection_test_reports_back_through_the_worker() {
    let temp = tempfile::tempdir().expect("tempdir");
    let backend = Arc::new(ScriptedBackend::immediate());
    let mut session = session(backend, temp.path());
    let mut prompter = ScriptedPrompter::new(["gsk_scripted_0000000000".to_string()]);

    session
        .handle(WizardAction::Primary, &mut prompter)
        .expect("key");
    session
        .handle(WizardAction::TestConnection, &mut prompter)
        .expect("test");
    assert_eq!(session.status(), "Testing connection...");

    wait(&mut session);
    assert!(session.status().contains("Connection OK"), "{}", session.status());
}
