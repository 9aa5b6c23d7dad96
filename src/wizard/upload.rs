use crate::backend::{BackendError, UploadedFile, WizardBackend};
use crate::runtime::RuntimeLog;
use crate::wizard::navigation::{WizardCommand, WizardError};
use crate::wizard::state::{FileRef, WizardState};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "csv"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    UnsupportedExtension,
    TooLarge { size_bytes: u64, max_bytes: u64 },
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedExtension => write!(
                f,
                "unsupported extension (allowed: .{})",
                ALLOWED_EXTENSIONS.join(", .")
            ),
            Self::TooLarge {
                size_bytes,
                max_bytes,
            } => write!(f, "{size_bytes} bytes exceeds the {max_bytes} byte limit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub name: String,
    pub reason: RejectionReason,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("upload rejected: {}", describe_rejections(.0))]
    Rejected(Vec<Rejection>),
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("upload failed: {0}")]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Wizard(#[from] WizardError),
}

fn describe_rejections(rejections: &[Rejection]) -> String {
    rejections
        .iter()
        .map(|r| format!("{} ({})", r.name, r.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn has_allowed_extension(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

pub fn validate_candidate(name: &str, size_bytes: u64, max_bytes: u64) -> Result<(), Rejection> {
    let reason = if !has_allowed_extension(name) {
        RejectionReason::UnsupportedExtension
    } else if size_bytes > max_bytes {
        RejectionReason::TooLarge {
            size_bytes,
            max_bytes,
        }
    } else {
        return Ok(());
    };
    Err(Rejection {
        name: name.to_string(),
        reason,
    })
}

/// Validates a whole batch; any offender rejects all of it.
pub fn validate_batch(candidates: &[FileRef], max_bytes: u64) -> Result<(), UploadError> {
    let rejections: Vec<Rejection> = candidates
        .iter()
        .filter_map(|file| validate_candidate(&file.name, file.size_bytes, max_bytes).err())
        .collect();
    if rejections.is_empty() {
        Ok(())
    } else {
        Err(UploadError::Rejected(rejections))
    }
}

/// Reads a local workbook. The size is checked against metadata so large
/// files are refused without being read.
pub fn load_file_ref(path: &Path, max_bytes: u64) -> Result<FileRef, UploadError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let metadata = fs::metadata(path).map_err(|source| UploadError::Read {
        path: path.display().to_string(),
        source,
    })?;
    validate_candidate(&name, metadata.len(), max_bytes)
        .map_err(|rejection| UploadError::Rejected(vec![rejection]))?;
    let content = fs::read(path).map_err(|source| UploadError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(FileRef::new(name, content))
}

/// Loads every path, collecting all rejections before failing.
pub fn load_candidates(paths: &[PathBuf], max_bytes: u64) -> Result<Vec<FileRef>, UploadError> {
    let mut files = Vec::with_capacity(paths.len());
    let mut rejections = Vec::new();
    for path in paths {
        match load_file_ref(path, max_bytes) {
            Ok(file) => files.push(file),
            Err(UploadError::Rejected(mut found)) => rejections.append(&mut found),
            Err(other) => return Err(other),
        }
    }
    if rejections.is_empty() {
        Ok(files)
    } else {
        Err(UploadError::Rejected(rejections))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchPlan {
    pub to_send: Vec<FileRef>,
    pub skipped: Vec<String>,
}

impl BatchPlan {
    pub fn is_empty(&self) -> bool {
        self.to_send.is_empty()
    }
}

/// Drops candidates whose name is already uploaded or repeats earlier in
/// the same batch.
pub fn plan_batch(existing: &[FileRef], candidates: Vec<FileRef>) -> BatchPlan {
    let mut seen: BTreeSet<String> = existing.iter().map(|f| f.name.clone()).collect();
    let mut plan = BatchPlan::default();
    for file in candidates {
        if seen.insert(file.name.clone()) {
            plan.to_send.push(file);
        } else {
            plan.skipped.push(file.name);
        }
    }
    plan
}

#[derive(Debug)]
pub struct UploadOutcome {
    pub added: Vec<String>,
    pub skipped: Vec<String>,
    pub uploaded: Vec<UploadedFile>,
}

/// Validation and dedupe half of an upload. No request is made.
pub fn prepare_batch(
    existing: &[FileRef],
    candidates: Vec<FileRef>,
    max_bytes: u64,
) -> Result<BatchPlan, UploadError> {
    validate_batch(&candidates, max_bytes)?;
    Ok(plan_batch(existing, candidates))
}

/// Merges files the backend accepted into the collection through
/// `SetFiles`. Names already present by now are left alone. Returns the
/// names actually added.
pub fn commit_batch(state: &mut WizardState, sent: Vec<FileRef>) -> Result<Vec<String>, WizardError> {
    let mut merged = state.files().to_vec();
    let mut added = Vec::new();
    for file in sent {
        if !merged.iter().any(|existing| existing.name == file.name) {
            added.push(file.name.clone());
            merged.push(file);
        }
    }
    state.dispatch(WizardCommand::SetFiles(merged))?;
    Ok(added)
}

/// Validates, dedupes and sends a batch in one request, then commits the
/// merged collection. Nothing changes on failure.
pub fn upload_batch(
    backend: &dyn WizardBackend,
    state: &mut WizardState,
    candidates: Vec<FileRef>,
    max_bytes: u64,
    log: &RuntimeLog,
) -> Result<UploadOutcome, UploadError> {
    let plan = prepare_batch(state.files(), candidates, max_bytes)?;
    if plan.is_empty() {
        return Ok(UploadOutcome {
            added: Vec::new(),
            skipped: plan.skipped,
            uploaded: Vec::new(),
        });
    }
    let uploaded = match backend.upload(&plan.to_send, state.config()) {
        Ok(uploaded) => uploaded,
        Err(err) => {
            log.error("backend.upload_failed", &err.to_string());
            return Err(err.into());
        }
    };
    let added = commit_batch(state, plan.to_send)?;
    log.info(
        "wizard.files_uploaded",
        &format!("added={} skipped={}", added.join(","), plan.skipped.len()),
    );
    Ok(UploadOutcome {
        added,
        skipped: plan.skipped,
        uploaded,
    })
}

/// The collection without `name`, or `None` when nothing matched.
pub fn remove_file(files: &[FileRef], name: &str) -> Option<WizardCommand> {
    if !files.iter().any(|f| f.name == name) {
        return None;
    }
    let remaining = files.iter().filter(|f| f.name != name).cloned().collect();
    Some(WizardCommand::SetFiles(remaining))
}
