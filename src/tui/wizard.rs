use super::screens::{centered_rect, draw_wizard_ui, project_wizard_view_model, tail_for_display};
use super::session::{Prompter, ScriptedPrompter, SessionSignal, WizardSession};
use crate::wizard::navigation::{parse_scripted_wizard_keys, wizard_action_from_key, SCRIPT_KEYS_ENV};
use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph};
use ratatui::Terminal;
use std::io::{self, IsTerminal};
use std::time::Duration;

type WizardTerminal = Terminal<CrosstermBackend<io::Stdout>>;

const SCRIPTED_WORKER_WAIT: Duration = Duration::from_millis(100);

pub fn is_interactive_terminal() -> bool {
    io::stdin().is_terminal() && io::stdout().is_terminal()
}

pub fn load_scripted_wizard_keys() -> Result<Option<Vec<KeyEvent>>, String> {
    let Ok(raw) = std::env::var(SCRIPT_KEYS_ENV) else {
        return Ok(None);
    };
    parse_scripted_wizard_keys(&raw).map(Some)
}

/// Drives the session from a key list. Prompts are answered from
/// `answers` in order. Returns once a key quits or the list runs out.
pub fn run_wizard_scripted(
    session: &mut WizardSession,
    keys: Vec<KeyEvent>,
    answers: Vec<String>,
) -> Result<SessionSignal, String> {
    let mut prompter = ScriptedPrompter::new(answers);
    for key in keys {
        session.poll_events();
        let Some(action) = wizard_action_from_key(session.state().current_step(), key) else {
            continue;
        };
        if session.handle(action, &mut prompter)? == SessionSignal::Quit {
            return Ok(SessionSignal::Quit);
        }
        while session.wait_for_event(SCRIPTED_WORKER_WAIT) {}
    }
    Ok(SessionSignal::Continue)
}

pub fn run_wizard_tui(session: &mut WizardSession) -> Result<(), String> {
    let mut stdout = io::stdout();
    enable_raw_mode().map_err(|e| format!("failed to enable raw mode: {e}"))?;
    execute!(stdout, EnterAlternateScreen, Hide)
        .map_err(|e| format!("failed to enter wizard screen: {e}"))?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal =
        Terminal::new(backend).map_err(|e| format!("failed to create wizard terminal: {e}"))?;
    let result = run_wizard_tui_loop(session, &mut terminal);
    disable_raw_mode().map_err(|e| format!("failed to disable raw mode: {e}"))?;
    execute!(terminal.backend_mut(), Show, LeaveAlternateScreen)
        .map_err(|e| format!("failed to leave wizard screen: {e}"))?;
    result
}

fn run_wizard_tui_loop(
    session: &mut WizardSession,
    terminal: &mut WizardTerminal,
) -> Result<(), String> {
    loop {
        session.poll_events();
        let view_model = project_wizard_view_model(session);
        terminal
            .draw(|frame| draw_wizard_ui(frame, &view_model))
            .map_err(|e| format!("failed to render wizard: {e}"))?;
        if !event::poll(Duration::from_millis(250))
            .map_err(|e| format!("failed to poll wizard input: {e}"))?
        {
            continue;
        }
        let ev = event::read().map_err(|e| format!("failed to read wizard input: {e}"))?;
        let Event::Key(key) = ev else {
            continue;
        };
        let Some(action) = wizard_action_from_key(session.state().current_step(), key) else {
            continue;
        };
        let mut prompter = TerminalPrompter {
            terminal: &mut *terminal,
        };
        if session.handle(action, &mut prompter)? == SessionSignal::Quit {
            return Ok(());
        }
    }
}

struct TerminalPrompter<'a> {
    terminal: &'a mut WizardTerminal,
}

impl Prompter for TerminalPrompter<'_> {
    fn prompt_line(
        &mut self,
        title: &str,
        prompt: &str,
        initial: &str,
        masked: bool,
    ) -> Result<Option<String>, String> {
        prompt_line_tui(self.terminal, title, prompt, initial, masked)
    }
}

fn prompt_line_tui(
    terminal: &mut WizardTerminal,
    title: &str,
    prompt: &str,
    initial: &str,
    masked: bool,
) -> Result<Option<String>, String> {
    let mut value = initial.to_string();
    loop {
        terminal
            .draw(|frame| {
                let area = centered_rect(70, 30, frame.area());
                let block = Block::default()
                    .borders(Borders::ALL)
                    .padding(Padding::new(2, 2, 1, 1));
                frame.render_widget(Clear, area);
                frame.render_widget(block.clone(), area);
                let inner = block.inner(area);
                let rows = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Length(1),
                        Constraint::Length(1),
                        Constraint::Length(1),
                        Constraint::Length(1),
                        Constraint::Length(1),
                        Constraint::Min(1),
                    ])
                    .split(inner);
                let shown = if masked {
                    "*".repeat(value.chars().count())
                } else {
                    value.clone()
                };
                let max_input_width = rows[3].width.saturating_sub(2) as usize;
                let display_value = tail_for_display(&shown, max_input_width);

                frame.render_widget(
                    Paragraph::new(Line::from(Span::styled(
                        title,
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ))),
                    rows[0],
                );
                frame.render_widget(Paragraph::new(prompt), rows[2]);
                frame.render_widget(
                    Paragraph::new(Line::from(format!("> {display_value}"))),
                    rows[3],
                );
                frame.render_widget(Paragraph::new("Enter apply, Esc cancel"), rows[4]);
                frame.set_cursor_position((
                    rows[3].x + 2 + display_value.chars().count() as u16,
                    rows[3].y,
                ));
            })
            .map_err(|e| format!("failed to render prompt: {e}"))?;
        let ev = event::read().map_err(|e| format!("failed to read prompt input: {e}"))?;
        let Event::Key(key) = ev else {
            continue;
        };
        if key.kind == KeyEventKind::Release {
            continue;
        }
        match key.code {
            KeyCode::Esc => return Ok(None),
            KeyCode::Enter | KeyCode::Char('\n') | KeyCode::Char('\r') => return Ok(Some(value)),
            KeyCode::Backspace => {
                value.pop();
            }
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => value.push(ch),
            _ => {}
        }
    }
}
