use crate::backend::{BackendError, WizardBackend};
use crate::runtime::RuntimeLog;
use crate::shared::fs_atomic::atomic_write_file;
use crate::wizard::format::{format_brl, format_number_pt_br};
use crate::wizard::state::ProcessingResult;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, thiserror::Error)]
pub enum ResultsError {
    #[error("download of `{0}` is already in progress")]
    AlreadyInProgress(String),
    #[error("`{0}` is not a valid file name")]
    InvalidName(String),
    #[error("download failed: {0}")]
    Backend(#[from] BackendError),
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub label: &'static str,
    pub value: String,
}

pub fn summary_rows(result: &ProcessingResult) -> Vec<SummaryRow> {
    let mut rows = vec![
        SummaryRow {
            label: "Funcionários elegíveis",
            value: format_number_pt_br(result.funcionarios_elegiveis),
        },
        SummaryRow {
            label: "Valor total VR",
            value: format_brl(result.valor_total_vr),
        },
        SummaryRow {
            label: "Custo empresa (80%)",
            value: format_brl(result.valor_empresa),
        },
        SummaryRow {
            label: "Desconto funcionário (20%)",
            value: format_brl(result.valor_funcionario),
        },
        SummaryRow {
            label: "Tempo de processamento",
            value: result.tempo_processamento.clone(),
        },
    ];
    if let Some(system) = result.sistema_usado.as_deref() {
        rows.push(SummaryRow {
            label: "Sistema",
            value: system.to_string(),
        });
    }
    if let Some(method) = result.metodo_calculo.as_deref() {
        rows.push(SummaryRow {
            label: "Método de cálculo",
            value: method.to_string(),
        });
    }
    if let Some(source) = result.fonte_dados.as_deref() {
        rows.push(SummaryRow {
            label: "Fonte dos dados",
            value: source.to_string(),
        });
    }
    rows
}

/// Names with a download in flight. Shared between the UI thread and
/// download workers.
#[derive(Debug, Clone, Default)]
pub struct DownloadTracker {
    in_flight: Arc<Mutex<BTreeSet<String>>>,
}

impl DownloadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn begin(&self, name: &str) -> Result<DownloadTicket, ResultsError> {
        if !self.lock().insert(name.to_string()) {
            return Err(ResultsError::AlreadyInProgress(name.to_string()));
        }
        Ok(DownloadTicket {
            tracker: self.clone(),
            name: name.to_string(),
        })
    }

    pub fn is_downloading(&self, name: &str) -> bool {
        self.lock().contains(name)
    }
}

/// Holds a name in the tracker until dropped.
#[derive(Debug)]
pub struct DownloadTicket {
    tracker: DownloadTracker,
    name: String,
}

impl DownloadTicket {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for DownloadTicket {
    fn drop(&mut self) {
        self.tracker.lock().remove(&self.name);
    }
}

/// The last path component of `name`, refusing anything that would leave
/// the downloads directory.
pub fn safe_file_name(name: &str) -> Result<String, ResultsError> {
    let candidate = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if candidate.is_empty() || candidate == "." || candidate == ".." {
        return Err(ResultsError::InvalidName(name.to_string()));
    }
    Ok(candidate.to_string())
}

/// Fetches one generated file into `dest_dir`. A second call for a name
/// already downloading fails without a request.
pub fn download_to(
    backend: &dyn WizardBackend,
    tracker: &DownloadTracker,
    name: &str,
    dest_dir: &Path,
    log: &RuntimeLog,
) -> Result<PathBuf, ResultsError> {
    let ticket = tracker.begin(name)?;
    fetch_into(backend, &ticket, dest_dir, log)
}

/// Downloads the file a ticket holds. Callers that hand the fetch to a
/// worker take the ticket first so a repeat request is refused at once.
pub fn fetch_into(
    backend: &dyn WizardBackend,
    ticket: &DownloadTicket,
    dest_dir: &Path,
    log: &RuntimeLog,
) -> Result<PathBuf, ResultsError> {
    let name = ticket.name();
    let local_name = safe_file_name(name)?;
    log.info("download.started", name);
    let bytes = match backend.download(name) {
        Ok(bytes) => bytes,
        Err(err) => {
            log.error("download.failed", &format!("{name}: {err}"));
            return Err(err.into());
        }
    };
    let path = dest_dir.join(&local_name);
    atomic_write_file(&path, &bytes).map_err(|source| ResultsError::Write {
        path: path.display().to_string(),
        source,
    })?;
    log.info(
        "download.completed",
        &format!("{name} bytes={} path={}", bytes.len(), path.display()),
    );
    Ok(path)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

/// Results screen state: selection plus a dismissable notice.
#[derive(Debug, Clone, Default)]
pub struct ResultsView {
    pub selected: usize,
    notice: Option<Notice>,
}

impl ResultsView {
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn notify(&mut self, kind: NoticeKind, text: impl Into<String>) {
        self.notice = Some(Notice {
            kind,
            text: text.into(),
        });
    }

    pub fn dismiss(&mut self) {
        self.notice = None;
    }

    pub fn select_next(&mut self, len: usize) {
        if len > 0 {
            self.selected = (self.selected + 1) % len;
        }
    }

    pub fn select_prev(&mut self, len: usize) {
        if len > 0 {
            self.selected = (self.selected + len - 1) % len;
        }
    }
}
