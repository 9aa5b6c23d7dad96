use super::BackendError;
use crate::wizard::state::FileRef;

pub const UPLOAD_FIELD_NAME: &str = "files";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    pub boundary: String,
    pub body: Vec<u8>,
}

impl MultipartBody {
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }
}

pub fn content_type_for(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "xlsx" => {
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        }
        Some(ext) if ext == "xls" => "application/vnd.ms-excel",
        Some(ext) if ext == "csv" => "text/csv",
        _ => "application/octet-stream",
    }
}

fn random_boundary() -> Result<String, BackendError> {
    let mut bytes = [0u8; 16];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| BackendError::Encode(format!("failed to generate boundary: {e}")))?;
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    Ok(format!("----finacrew{hex}"))
}

fn quoted_filename(name: &str) -> String {
    name.replace('"', "%22").replace(['\r', '\n'], " ")
}

/// Encodes every file under the same form field, one part per file.
pub fn encode_files(files: &[FileRef]) -> Result<MultipartBody, BackendError> {
    let boundary = random_boundary()?;
    encode_files_with_boundary(files, boundary)
}

pub(crate) fn encode_files_with_boundary(
    files: &[FileRef],
    boundary: String,
) -> Result<MultipartBody, BackendError> {
    if files.is_empty() {
        return Err(BackendError::Encode(
            "multipart upload needs at least one file".to_string(),
        ));
    }
    let mut body = Vec::with_capacity(files.iter().map(|f| f.content.len() + 256).sum());
    for file in files {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{UPLOAD_FIELD_NAME}\"; filename=\"{}\"\r\n",
                quoted_filename(&file.name)
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!("Content-Type: {}\r\n\r\n", content_type_for(&file.name)).as_bytes(),
        );
        body.extend_from_slice(&file.content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    Ok(MultipartBody { boundary, body })
}
