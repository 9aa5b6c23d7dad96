/// Workbooks the backend needs before it can run: active employees,
/// vacations, terminations, admissions and union rates.
pub const DEFAULT_REQUIRED_FILES: [&str; 5] = [
    "ATIVOS.xlsx",
    "FÉRIAS.xlsx",
    "DESLIGADOS.xlsx",
    "ADMISSÃO ABRIL.xlsx",
    "Base sindicato x valor.xlsx",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    entries: Vec<String>,
}

impl Default for Roster {
    fn default() -> Self {
        Self::from_names(DEFAULT_REQUIRED_FILES.iter().map(|name| (*name).to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterStatus {
    pub required: String,
    pub present: bool,
    pub matched_by: Option<String>,
}

impl Roster {
    pub fn from_names(names: impl IntoIterator<Item = String>) -> Self {
        Self {
            entries: names.into_iter().collect(),
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One status per roster entry, in roster order. An entry is present when
    /// its base name occurs, ignoring case, anywhere in an uploaded name.
    pub fn compute_status<S: AsRef<str>>(&self, file_names: &[S]) -> Vec<RosterStatus> {
        let lowered: Vec<String> = file_names
            .iter()
            .map(|name| name.as_ref().to_lowercase())
            .collect();
        self.entries
            .iter()
            .map(|required| {
                let needle = roster_base_name(required).to_lowercase();
                let matched_by = lowered
                    .iter()
                    .position(|candidate| candidate.contains(&needle))
                    .map(|idx| file_names[idx].as_ref().to_string());
                RosterStatus {
                    required: required.clone(),
                    present: matched_by.is_some(),
                    matched_by,
                }
            })
            .collect()
    }

    pub fn can_proceed<S: AsRef<str>>(&self, file_names: &[S]) -> bool {
        self.compute_status(file_names)
            .iter()
            .all(|status| status.present)
    }

    pub fn missing_required_files<S: AsRef<str>>(&self, file_names: &[S]) -> Vec<String> {
        self.compute_status(file_names)
            .into_iter()
            .filter(|status| !status.present)
            .map(|status| status.required)
            .collect()
    }

    /// True when `file_name` satisfies at least one roster entry.
    pub fn is_required(&self, file_name: &str) -> bool {
        let lowered = file_name.to_lowercase();
        self.entries
            .iter()
            .any(|required| lowered.contains(&roster_base_name(required).to_lowercase()))
    }
}

/// Name with its last extension removed. Names without a stem keep the dot.
pub fn roster_base_name(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_strips_only_the_last_extension() {
        assert_eq!(roster_base_name("ATIVOS.xlsx"), "ATIVOS");
        assert_eq!(roster_base_name("VR.05.2025.xlsx"), "VR.05.2025");
        assert_eq!(roster_base_name("README"), "README");
        assert_eq!(roster_base_name(".hidden"), ".hidden");
    }

    #[test]
    fn unicode_names_match_case_insensitively() {
        let roster = Roster::default();
        let status = roster.compute_status(&["férias_maio.xlsx"]);
        assert!(status[1].present);
        assert_eq!(status[1].matched_by.as_deref(), Some("férias_maio.xlsx"));
    }

    #[test]
    fn matched_by_reports_first_uploaded_match() {
        let roster = Roster::from_names(["ATIVOS.xlsx".to_string()]);
        let status = roster.compute_status(&["ativos_v1.xlsx", "ATIVOS_v2.xlsx"]);
        assert_eq!(status[0].matched_by.as_deref(), Some("ativos_v1.xlsx"));
    }
}
