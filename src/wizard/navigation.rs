use crate::wizard::state::{ApiConfig, FileRef, ProcessingResult, WizardState, WizardStep};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::collections::BTreeSet;

pub const SCRIPT_KEYS_ENV: &str = "FINACREW_WIZARD_SCRIPT_KEYS";

/// Every mutation of [`WizardState`] is one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum WizardCommand {
    Advance,
    Retreat,
    Reset,
    SetConfig(ApiConfig),
    SetFiles(Vec<FileRef>),
    BeginProcessing,
    CompleteProcessing(ProcessingResult),
    FailProcessing(String),
    StopProcessing,
}

impl WizardCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Advance => "advance",
            Self::Retreat => "retreat",
            Self::Reset => "reset",
            Self::SetConfig(_) => "set_config",
            Self::SetFiles(_) => "set_files",
            Self::BeginProcessing => "begin_processing",
            Self::CompleteProcessing(_) => "complete_processing",
            Self::FailProcessing(_) => "fail_processing",
            Self::StopProcessing => "stop_processing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardTransition {
    pub from: WizardStep,
    pub to: WizardStep,
    pub feedback: Option<String>,
}

impl WizardTransition {
    fn stay(step: WizardStep, feedback: Option<String>) -> Self {
        Self {
            from: step,
            to: step,
            feedback,
        }
    }

    pub fn moved(&self) -> bool {
        self.from != self.to
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("cannot leave {step}: {reason}")]
    GateBlocked { step: WizardStep, reason: String },
    #[error("`{command}` is not available on the {step} step")]
    InvalidCommand {
        step: WizardStep,
        command: &'static str,
    },
    #[error("file `{0}` is already in the upload list")]
    DuplicateFile(String),
    #[error("processing is still running; stop it first")]
    ProcessingInFlight,
    #[error("no processing run is active")]
    NotProcessing,
}

impl WizardState {
    /// Applies one command. On error the state is left untouched.
    pub fn dispatch(&mut self, command: WizardCommand) -> Result<WizardTransition, WizardError> {
        let from = self.current_step;
        match command {
            WizardCommand::Advance => self.advance(),
            WizardCommand::Retreat => {
                if self.processing {
                    return Err(WizardError::ProcessingInFlight);
                }
                match from.prev() {
                    Some(prev) => {
                        self.current_step = prev;
                        Ok(WizardTransition {
                            from,
                            to: prev,
                            feedback: None,
                        })
                    }
                    None => Ok(WizardTransition::stay(from, None)),
                }
            }
            WizardCommand::Reset => {
                *self = WizardState::new(self.options.clone());
                Ok(WizardTransition {
                    from,
                    to: WizardStep::Configuration,
                    feedback: Some("Started a new session.".to_string()),
                })
            }
            WizardCommand::SetConfig(config) => {
                self.require_step(WizardStep::Configuration, "set_config")?;
                if config.api_key.trim().is_empty() {
                    return Err(gate(from, "API key is required"));
                }
                if config.model.trim().is_empty() {
                    return Err(gate(from, "model is required"));
                }
                self.config = Some(config);
                self.advance()
            }
            WizardCommand::SetFiles(files) => {
                self.require_step(WizardStep::Upload, "set_files")?;
                let mut seen = BTreeSet::new();
                if let Some(dup) = files.iter().find(|file| !seen.insert(file.name.as_str())) {
                    return Err(WizardError::DuplicateFile(dup.name.clone()));
                }
                self.files = files;
                let auto_advance = self
                    .options
                    .auto_advance_min_files
                    .is_some_and(|min| self.files.len() >= min);
                if auto_advance && self.exit_gate().is_ok() {
                    return self.advance();
                }
                Ok(WizardTransition::stay(from, None))
            }
            WizardCommand::BeginProcessing => {
                self.require_step(WizardStep::Processing, "begin_processing")?;
                if self.processing {
                    return Err(WizardError::ProcessingInFlight);
                }
                if self.config.is_none() {
                    return Err(gate(from, "API configuration is missing"));
                }
                if self.files.is_empty() {
                    return Err(gate(from, "no files were uploaded"));
                }
                self.processing = true;
                self.result = None;
                self.error = None;
                Ok(WizardTransition::stay(
                    from,
                    Some("Processing started.".to_string()),
                ))
            }
            WizardCommand::CompleteProcessing(result) => {
                self.require_step(WizardStep::Processing, "complete_processing")?;
                if !self.processing {
                    return Err(WizardError::NotProcessing);
                }
                self.processing = false;
                self.result = Some(result);
                self.advance()
            }
            WizardCommand::FailProcessing(message) => {
                if !self.processing {
                    return Err(WizardError::NotProcessing);
                }
                self.processing = false;
                self.error = Some(message.clone());
                Ok(WizardTransition::stay(from, Some(message)))
            }
            WizardCommand::StopProcessing => {
                if !self.processing {
                    return Ok(WizardTransition::stay(from, None));
                }
                self.processing = false;
                Ok(WizardTransition::stay(
                    from,
                    Some("Processing stopped by user.".to_string()),
                ))
            }
        }
    }

    /// The exit condition of the current step.
    pub fn exit_gate(&self) -> Result<(), WizardError> {
        let step = self.current_step;
        match step {
            WizardStep::Configuration => match &self.config {
                Some(config) if config.is_complete() => Ok(()),
                _ => Err(gate(step, "API key and model are required")),
            },
            WizardStep::Upload => {
                if self.config.is_none() {
                    return Err(gate(step, "API configuration is missing"));
                }
                let names = crate::wizard::state::file_names(&self.files);
                let missing = self.options.roster.missing_required_files(&names);
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(gate(
                        step,
                        &format!("missing required files: {}", missing.join(", ")),
                    ))
                }
            }
            WizardStep::Processing => {
                if self.result.is_some() {
                    Ok(())
                } else {
                    Err(gate(step, "processing has not completed"))
                }
            }
            WizardStep::Results => Ok(()),
        }
    }

    fn advance(&mut self) -> Result<WizardTransition, WizardError> {
        let from = self.current_step;
        let Some(next) = from.next() else {
            return Ok(WizardTransition::stay(from, None));
        };
        self.exit_gate()?;
        self.current_step = next;
        Ok(WizardTransition {
            from,
            to: next,
            feedback: None,
        })
    }

    fn require_step(&self, step: WizardStep, command: &'static str) -> Result<(), WizardError> {
        if self.current_step == step {
            Ok(())
        } else {
            Err(WizardError::InvalidCommand {
                step: self.current_step,
                command,
            })
        }
    }
}

fn gate(step: WizardStep, reason: &str) -> WizardError {
    WizardError::GateBlocked {
        step,
        reason: reason.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardAction {
    Advance,
    Retreat,
    Reset,
    Quit,
    MovePrev,
    MoveNext,
    Primary,
    TestConnection,
    ToggleDefault,
    AddFile,
    RemoveFile,
    StartStop,
    Dismiss,
}

pub fn wizard_action_from_key(step: WizardStep, key: KeyEvent) -> Option<WizardAction> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(WizardAction::Quit);
    }
    match key.code {
        KeyCode::Up => Some(WizardAction::MovePrev),
        KeyCode::Down => Some(WizardAction::MoveNext),
        KeyCode::Right | KeyCode::PageDown => Some(WizardAction::Advance),
        KeyCode::Left | KeyCode::PageUp => Some(WizardAction::Retreat),
        KeyCode::Esc => Some(if step == WizardStep::Configuration {
            WizardAction::Quit
        } else {
            WizardAction::Retreat
        }),
        KeyCode::Enter | KeyCode::Char('\n') | KeyCode::Char('\r') => Some(WizardAction::Primary),
        KeyCode::Char('q') => Some(WizardAction::Quit),
        KeyCode::Char('r') => Some(WizardAction::Reset),
        KeyCode::Char('t') if step == WizardStep::Configuration => {
            Some(WizardAction::TestConnection)
        }
        KeyCode::Char('d') if step == WizardStep::Configuration => {
            Some(WizardAction::ToggleDefault)
        }
        KeyCode::Char('a') if step == WizardStep::Upload => Some(WizardAction::AddFile),
        KeyCode::Char('x') | KeyCode::Delete if step == WizardStep::Upload => {
            Some(WizardAction::RemoveFile)
        }
        KeyCode::Char('s') if step == WizardStep::Processing => Some(WizardAction::StartStop),
        KeyCode::Char('c') if step == WizardStep::Results => Some(WizardAction::Dismiss),
        _ => None,
    }
}

pub fn parse_scripted_wizard_keys(raw: &str) -> Result<Vec<KeyEvent>, String> {
    let mut keys = Vec::new();
    for token in raw.split(',') {
        let normalized = token.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            continue;
        }
        let code = match normalized.as_str() {
            "up" => KeyCode::Up,
            "down" => KeyCode::Down,
            "left" => KeyCode::Left,
            "right" => KeyCode::Right,
            "enter" => KeyCode::Enter,
            "esc" => KeyCode::Esc,
            "ctrl-c" => {
                keys.push(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
                continue;
            }
            single if single.chars().count() == 1 && "acdqrstx".contains(single) => {
                KeyCode::Char(single.chars().next().unwrap_or('q'))
            }
            other => {
                return Err(format!(
                    "invalid {SCRIPT_KEYS_ENV} token `{other}`; valid tokens: up,down,left,right,enter,esc,ctrl-c,a,c,d,q,r,s,t,x"
                ));
            }
        };
        keys.push(KeyEvent::new(code, KeyModifiers::NONE));
    }
    Ok(keys)
}
