use finacrew::backend::{
    BackendError, ConnectionCheck, DefaultCheck, GeneratedFile, HealthStatus, UploadedFile,
    WizardBackend,
};
use finacrew::runtime::RuntimeLog;
use finacrew::wizard::results::{download_to, summary_rows, DownloadTracker, ResultsError};
use finacrew::wizard::upload::{load_candidates, upload_batch, RejectionReason, UploadError};
use finacrew::wizard::{
    ApiConfig, FileRef, ProcessingResult, Roster, WizardCommand, WizardOptions, WizardState,
    WizardStep,
};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct RecordingBackend {
    uploads: Mutex<Vec<Vec<String>>>,
    downloads: AtomicUsize,
}

impl WizardBackend for RecordingBackend {
    fn test_config(&self, _config: &ApiConfig) -> Result<ConnectionCheck, BackendError> {
        Err(BackendError::Application("not scripted".to_string()))
    }

    fn test_default(&self) -> Result<DefaultCheck, BackendError> {
        Err(BackendError::Application("not scripted".to_string()))
    }

    fn upload(
        &self,
        files: &[FileRef],
        _config: Option<&ApiConfig>,
    ) -> Result<Vec<UploadedFile>, BackendError> {
        self.uploads
            .lock()
            .expect("uploads lock")
            .push(files.iter().map(|f| f.name.clone()).collect());
        Ok(Vec::new())
    }

    fn process(&self, _config: &ApiConfig) -> Result<ProcessingResult, BackendError> {
        Err(BackendError::Application("not scripted".to_string()))
    }

    fn list_files(&self) -> Result<Vec<GeneratedFile>, BackendError> {
        Ok(Vec::new())
    }

    fn download(&self, name: &str) -> Result<Vec<u8>, BackendError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(format!("planilha {name}").into_bytes())
    }

    fn health(&self) -> Result<HealthStatus, BackendError> {
        Err(BackendError::Application("not scripted".to_string()))
    }
}

fn upload_state() -> WizardState {
    let options = WizardOptions {
        roster: Roster::from_names(["ATIVOS.xlsx".to_string(), "FÉRIAS.xlsx".to_string()]),
        auto_advance_min_files: None,
    };
    let mut state = WizardState::new(options);
    state
        .dispatch(WizardCommand::SetConfig(ApiConfig::new("gsk_key", "qwen/qwen3-32b")))
        .expect("configure");
    state
}

#[test]
fn wizard_upload_module_sends_batch_once_and_skips_duplicates() {
    let temp = tempfile::tempdir().expect("tempdir");
    let ativos = temp.path().join("ATIVOS.xlsx");
    let ferias = temp.path().join("FÉRIAS.xlsx");
    fs::write(&ativos, b"ativos").expect("write");
    fs::write(&ferias, b"ferias").expect("write");
    let backend = RecordingBackend::default();
    let mut state = upload_state();

    let first = load_candidates(&[ativos.clone()], 1024).expect("load");
    upload_batch(&backend, &mut state, first, 1024, &RuntimeLog::disabled()).expect("first");

    let second = load_candidates(&[ativos, ferias], 1024).expect("load");
    let outcome =
        upload_batch(&backend, &mut state, second, 1024, &RuntimeLog::disabled()).expect("second");

    assert_eq!(outcome.added, vec!["FÉRIAS.xlsx".to_string()]);
    assert_eq!(outcome.skipped, vec!["ATIVOS.xlsx".to_string()]);
    let uploads = backend.uploads.lock().expect("uploads lock");
    assert_eq!(uploads.len(), 2);
    assert_eq!(uploads[1], vec!["FÉRIAS.xlsx".to_string()]);
    assert_eq!(state.files().len(), 2);
    assert_eq!(state.current_step(), WizardStep::Upload);
    assert!(state.exit_gate().is_ok());
}

#[test]
fn wizard_upload_module_rejects_whole_batch_when_any_file_is_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    let good = temp.path().join("ATIVOS.xlsx");
    let bad = temp.path().join("notas.pdf");
    let big = temp.path().join("DESLIGADOS.csv");
    fs::write(&good, b"ok").expect("write");
    fs::write(&bad, b"pdf").expect("write");
    fs::write(&big, vec![b'x'; 64]).expect("write");
    let paths: Vec<PathBuf> = vec![good, bad, big];

    let err = load_candidates(&paths, 32).expect_err("batch rejected");

    let UploadError::Rejected(rejections) = err else {
        panic!("expected rejection");
    };
    assert_eq!(rejections.len(), 2);
    assert_eq!(rejections[0].name, "notas.pdf");
    assert_eq!(rejections[0].reason, RejectionReason::UnsupportedExtension);
    assert_eq!(
        rejections[1].reason,
        RejectionReason::TooLarge {
            size_bytes: 64,
            max_bytes: 32
        }
    );
}

#[test]
fn wizard_results_module_refuses_duplicate_download_without_a_request() {
    let temp = tempfile::tempdir().expect("tempdir");
    let backend = RecordingBackend::default();
    let tracker = DownloadTracker::new();
    let log = RuntimeLog::disabled();

    let held = tracker.begin("VR_MENSAL.xlsx").expect("begin");
    let err = download_to(&backend, &tracker, "VR_MENSAL.xlsx", temp.path(), &log)
        .expect_err("duplicate");
    assert!(matches!(err, ResultsError::AlreadyInProgress(_)));
    assert_eq!(backend.downloads.load(Ordering::SeqCst), 0);

    drop(held);
    let path = download_to(&backend, &tracker, "VR_MENSAL.xlsx", temp.path(), &log)
        .expect("download");
    assert_eq!(backend.downloads.load(Ordering::SeqCst), 1);
    assert_eq!(
        fs::read_to_string(&path).expect("read"),
        "planilha VR_MENSAL.xlsx"
    );
    assert!(!tracker.is_downloading("VR_MENSAL.xlsx"));
}

#[test]
fn wizard_results_module_keeps_downloads_inside_destination() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dest = temp.path().join("downloads");
    let backend = RecordingBackend::default();

    let path = download_to(
        &backend,
        &DownloadTracker::new(),
        "../escape.xlsx",
        &dest,
        &RuntimeLog::disabled(),
    )
    .expect("download");

    assert_eq!(path, dest.join("escape.xlsx"));
    assert!(path.is_file());
}

#[test]
fn wizard_results_module_formats_summary_in_brazilian_notation() {
    let result = ProcessingResult {
        funcionarios_elegiveis: 1234567,
        valor_total_vr: 1004751.456,
        valor_empresa: 803801.16,
        valor_funcionario: 200950.29,
        tempo_processamento: "12s".to_string(),
        arquivos_gerados: Vec::new(),
        status: None,
        sistema_usado: Some("CrewAI".to_string()),
        metodo_calculo: None,
        fonte_dados: Some("planilhas".to_string()),
    };

    let rows = summary_rows(&result);

    assert_eq!(rows[0].value, "1.234.567");
    assert_eq!(rows[1].value, "R$ 1.004.751,46");
    assert_eq!(rows.len(), 7);
    assert_eq!(rows[5].value, "CrewAI");
    assert_eq!(rows[6].label, "Fonte dos dados");
}

#[test]
fn wizard_results_module_renders_single_file_result_in_brl() {
    let result: ProcessingResult = serde_json::from_str(
        r#"{"funcionarios_elegiveis":1791,"valor_total_vr":500000.00,"valor_empresa":400000.00,
            "valor_funcionario":100000.00,"tempo_processamento":"3m12s",
            "arquivos_gerados":["VR MENSAL 05.2025.xlsx"]}"#,
    )
    .expect("decode result");

    let values: Vec<String> = summary_rows(&result).into_iter().map(|r| r.value).collect();

    assert_eq!(
        values,
        vec![
            "1.791".to_string(),
            "R$ 500.000,00".to_string(),
            "R$ 400.000,00".to_string(),
            "R$ 100.000,00".to_string(),
            "3m12s".to_string(),
        ]
    );
    assert_eq!(result.arquivos_gerados, vec!["VR MENSAL 05.2025.xlsx"]);
}
