use super::session::{WizardSession, CONFIG_ROWS};
use crate::wizard::processing::PROCESSING_STAGES;
use crate::wizard::results::{summary_rows, NoticeKind};
use crate::wizard::state::{file_names, WizardStep, ALL_WIZARD_STEPS};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, Padding, Paragraph, Wrap};
use ratatui::Frame;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardViewModel {
    pub title: String,
    pub step_line: String,
    pub progress: u16,
    pub details: Vec<String>,
    pub items: Vec<String>,
    pub selected: Option<usize>,
    pub status_text: String,
    pub hint_text: String,
    pub notice: Option<(bool, String)>,
}

pub fn step_hint(step: WizardStep) -> &'static str {
    match step {
        WizardStep::Configuration => {
            "Up/Down move | Enter edit | t test | d built-in | Right continue | Esc quit"
        }
        WizardStep::Upload => "a add | x remove | Up/Down move | Left back | Right continue | r reset",
        WizardStep::Processing => "s start/stop | Left back | Right results | r reset | q quit",
        WizardStep::Results => "Up/Down move | Enter download | c dismiss | r new session | q quit",
    }
}

fn step_line(current: WizardStep) -> String {
    ALL_WIZARD_STEPS
        .iter()
        .map(|step| {
            if *step == current {
                format!("[{}. {}]", step.index() + 1, step.label())
            } else {
                format!(" {}. {} ", step.index() + 1, step.label())
            }
        })
        .collect::<Vec<_>>()
        .join(" > ")
}

pub fn project_wizard_view_model(session: &WizardSession) -> WizardViewModel {
    let state = session.state();
    let step = state.current_step();
    let mut details = Vec::new();
    let mut items = Vec::new();
    let mut selected = None;
    let mut notice = None;

    match step {
        WizardStep::Configuration => {
            let draft = session.draft();
            details.push(format!("Backend: {}", session.backend_url()));
            if draft.use_default() {
                details.push("Built-in configuration is active.".to_string());
            }
            items = CONFIG_ROWS
                .iter()
                .map(|row| {
                    let value = row.value(draft);
                    if value.is_empty() {
                        row.label().to_string()
                    } else {
                        format!("{:28} {value}", row.label())
                    }
                })
                .collect();
            selected = Some(session.selected());
        }
        WizardStep::Upload => {
            let names = file_names(state.files());
            let statuses = state.roster().compute_status(&names);
            let present = statuses.iter().filter(|s| s.present).count();
            details.push(format!(
                "Required files: {present}/{} present",
                statuses.len()
            ));
            for status in &statuses {
                let mark = if status.present { "[x]" } else { "[ ]" };
                let matched = status
                    .matched_by
                    .as_deref()
                    .map(|name| format!("  <- {name}"))
                    .unwrap_or_default();
                details.push(format!("{mark} {}{matched}", status.required));
            }
            if session.is_uploading() {
                details.push("Uploading...".to_string());
            }
            items = state
                .files()
                .iter()
                .map(|file| {
                    let tag = if state.roster().is_required(&file.name) {
                        ""
                    } else {
                        "  (extra)"
                    };
                    format!("{}  {} bytes{tag}", file.name, file.size_bytes)
                })
                .collect();
            if !items.is_empty() {
                selected = Some(session.selected());
            }
        }
        WizardStep::Processing => {
            let view = session.processing();
            if let Some(config) = state.config() {
                details.push(format!(
                    "Model: {}  Files: {}",
                    config.model,
                    state.files().len()
                ));
            }
            if let Some((idx, label)) = view.current_stage() {
                details.push(format!(
                    "Stage {}/{}: {label}  ({}s elapsed, limit {}s)",
                    idx + 1,
                    PROCESSING_STAGES.len(),
                    view.elapsed().as_secs(),
                    view.timeout().as_secs()
                ));
            } else if state.result().is_some() {
                details.push("Processing complete.".to_string());
            } else {
                details.push("Idle.".to_string());
            }
            if let Some(error) = state.error() {
                notice = Some((true, error.to_string()));
            }
            items = view
                .logs()
                .iter()
                .map(|entry| format!("{}  {}", entry.clock, entry.message))
                .collect();
        }
        WizardStep::Results => {
            if let Some(result) = state.result() {
                for row in summary_rows(result) {
                    details.push(format!("{:28} {}", row.label, row.value));
                }
            }
            details.push(format!("Downloads go to {}", session.downloads_dir().display()));
            items = session
                .generated()
                .iter()
                .map(|name| {
                    if session.is_downloading(name) {
                        format!("{name}  (downloading...)")
                    } else {
                        name.clone()
                    }
                })
                .collect();
            if !items.is_empty() {
                selected = Some(session.selected());
            }
            notice = session
                .results()
                .notice()
                .map(|n| (n.kind == NoticeKind::Error, n.text.clone()));
        }
    }

    WizardViewModel {
        title: format!("FinaCrew VR/VA  -  {}", step.label()),
        step_line: step_line(step),
        progress: state.progress_percent(),
        details,
        items,
        selected,
        status_text: session.status().to_string(),
        hint_text: step_hint(step).to_string(),
        notice,
    }
}

pub fn draw_wizard_ui(frame: &mut Frame<'_>, view_model: &WizardViewModel) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(view_model.details.len() as u16 + 2),
            Constraint::Min(6),
            Constraint::Length(5),
        ])
        .split(frame.area());

    let header_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Length(2)])
        .split(chunks[0]);
    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            view_model.title.clone(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(view_model.step_line.clone()),
    ]);
    frame.render_widget(header, header_rows[0]);
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Green))
        .percent(view_model.progress.min(100));
    frame.render_widget(gauge, header_rows[1]);

    let details = Paragraph::new(
        view_model
            .details
            .iter()
            .map(|line| Line::from(line.clone()))
            .collect::<Vec<_>>(),
    )
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(details, chunks[1]);

    let mut list_items = Vec::with_capacity(view_model.items.len());
    for (idx, line) in view_model.items.iter().enumerate() {
        let mut item = ListItem::new(Line::from(Span::raw(line.clone())));
        if view_model.selected == Some(idx) {
            item = item.style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            );
        }
        list_items.push(item);
    }
    frame.render_widget(List::new(list_items).block(main_panel_block()), chunks[2]);

    let mut footer_lines = vec![
        Line::from(view_model.hint_text.clone()),
        Line::from(format!("Status: {}", view_model.status_text)),
    ];
    if let Some((is_error, text)) = &view_model.notice {
        let color = if *is_error { Color::Red } else { Color::Green };
        footer_lines.push(Line::from(Span::styled(
            text.clone(),
            Style::default().fg(color),
        )));
    }
    let footer = Paragraph::new(footer_lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, chunks[3]);
}

pub(crate) fn tail_for_display(value: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= max_chars {
        return value.to_string();
    }
    chars[chars.len() - max_chars..].iter().collect()
}

pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn main_panel_block() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .padding(Padding::new(2, 2, 1, 1))
}
