use crossterm::event::KeyCode;
use ratatui::layout::{Constraint, Layout};
use ratatui::prelude::{Frame, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use tui_dispatch::EventKind;
use tui_dispatch_components::{
    StatusBar, StatusBarHint, StatusBarProps, StatusBarSection, StatusBarStyle,
};

use super::narrative_log::{NarrativeLog, NarrativeLogProps};
use super::unit_panel::{panel_height, UnitPanel, UnitPanelProps};
use super::{Component, ACCENT, ACCENT_GREEN, ACCENT_RED, TEXT_DIM, TEXT_MAIN};
use crate::action::Action;
use crate::state::{AppState, NotificationLevel, ViewerPhase};

const SCROLL_PAGE: i16 = 10;
const MAX_PANEL_HEIGHT: u16 = 10;

/// Props for BattleViewer - read-only view of state
pub struct BattleViewerProps<'a> {
    pub state: &'a AppState,
    pub is_focused: bool,
}

/// Battle log viewer: party and enemy panels over the narrative
#[derive(Default)]
pub struct BattleViewer;

impl BattleViewer {
    fn open_keys(code: KeyCode) -> Option<Action> {
        match code {
            KeyCode::Esc | KeyCode::Char('c') => Some(Action::ViewerClose),
            KeyCode::Char(' ') | KeyCode::Char('p') => Some(Action::PlaybackToggle),
            KeyCode::Right | KeyCode::Char('l') => Some(Action::PlaybackStepForward),
            KeyCode::Left | KeyCode::Char('h') => Some(Action::PlaybackStepBack),
            KeyCode::Char('r') => Some(Action::PlaybackRestart),
            KeyCode::End | KeyCode::Char('e') => Some(Action::PlaybackSettle),
            KeyCode::Up | KeyCode::Char('k') => Some(Action::LogScroll(1)),
            KeyCode::Down | KeyCode::Char('j') => Some(Action::LogScroll(-1)),
            KeyCode::PageUp => Some(Action::LogScroll(SCROLL_PAGE)),
            KeyCode::PageDown => Some(Action::LogScroll(-SCROLL_PAGE)),
            KeyCode::Char('x') => Some(Action::DungeonComplete),
            KeyCode::Char('d') => Some(Action::UiDismissNotification),
            KeyCode::Char('q') => Some(Action::Quit),
            _ => None,
        }
    }

    fn closed_keys(code: KeyCode) -> Option<Action> {
        match code {
            KeyCode::Char('o') | KeyCode::Enter => Some(Action::ViewerOpen),
            KeyCode::Char('x') => Some(Action::DungeonComplete),
            KeyCode::Char('d') => Some(Action::UiDismissNotification),
            KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
            _ => None,
        }
    }
}

fn header_line(state: &AppState) -> Line<'static> {
    let replay = &state.replay;
    let run = state.run_id.clone().unwrap_or_else(|| "recorded log".to_string());

    let (phase, color) = match replay.victory {
        Some(true) if state.at_end() => ("Victory", ACCENT_GREEN),
        Some(false) if state.at_end() => ("Defeat", ACCENT_RED),
        _ if state.playing => ("Playing", ACCENT),
        _ if state.viewer == ViewerPhase::Settled => ("Settled", TEXT_MAIN),
        _ => ("Paused", TEXT_DIM),
    };

    let mut spans = vec![
        Span::styled(
            format!(" {run} "),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            "│ Stage {}/{} │ Round {} │ ",
            replay.current_stage, replay.total_stages, replay.current_round
        )),
        Span::styled(phase, Style::default().fg(color).add_modifier(Modifier::BOLD)),
    ];

    if state.completion.is_loading() {
        spans.push(Span::styled(" │ completing…", Style::default().fg(TEXT_DIM)));
    } else if state.completion.is_loaded() {
        spans.push(Span::styled(" │ completed", Style::default().fg(ACCENT_GREEN)));
    }
    Line::from(spans)
}

fn notification_line(state: &AppState) -> Line<'static> {
    match &state.notification {
        Some(note) => {
            let color = match note.level {
                NotificationLevel::Info => TEXT_MAIN,
                NotificationLevel::Success => ACCENT_GREEN,
                NotificationLevel::Error => ACCENT_RED,
            };
            Line::styled(format!(" {}", note.text), Style::default().fg(color))
        }
        None => Line::default(),
    }
}

fn render_status_bar(frame: &mut Frame, area: Rect, hints: &[StatusBarHint]) {
    let mut status_bar = StatusBar::new();
    <StatusBar as Component<Action>>::render(
        &mut status_bar,
        frame,
        area,
        StatusBarProps {
            left: StatusBarSection::empty(),
            center: StatusBarSection::hints(hints),
            right: StatusBarSection::empty(),
            style: StatusBarStyle::default(),
            is_focused: false,
        },
    );
}

impl Component<Action> for BattleViewer {
    type Props<'a> = BattleViewerProps<'a>;

    fn handle_event(
        &mut self,
        event: &EventKind,
        props: Self::Props<'_>,
    ) -> impl IntoIterator<Item = Action> {
        if !props.is_focused {
            return None;
        }

        match event {
            EventKind::Key(key) if props.state.viewer.is_open() => Self::open_keys(key.code),
            EventKind::Key(key) => Self::closed_keys(key.code),
            _ => None,
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, props: BattleViewerProps<'_>) {
        let state = props.state;

        if !state.viewer.is_open() {
            let chunks = Layout::vertical([
                Constraint::Min(1),
                Constraint::Length(1), // Notification
                Constraint::Length(1), // Help bar
            ])
            .split(area);

            let text = if state.log.is_loading() {
                "Loading battle log…"
            } else {
                "Battle viewer closed. Press o to open it."
            };
            let message = Paragraph::new(text)
                .style(Style::default().fg(TEXT_DIM))
                .centered();
            let middle = Layout::vertical([
                Constraint::Fill(1),
                Constraint::Length(1),
                Constraint::Fill(1),
            ])
            .split(chunks[0]);
            frame.render_widget(message, middle[1]);
            frame.render_widget(Paragraph::new(notification_line(state)), chunks[1]);
            render_status_bar(
                frame,
                chunks[2],
                &[
                    StatusBarHint::new("o", "open"),
                    StatusBarHint::new("x", "complete"),
                    StatusBarHint::new("q", "quit"),
                ],
            );
            return;
        }

        let replay = &state.replay;
        let panels = panel_height(replay.allies.len().max(replay.enemies.len()))
            .min(MAX_PANEL_HEIGHT);

        let chunks = Layout::vertical([
            Constraint::Length(1),      // Header
            Constraint::Length(panels), // Units
            Constraint::Min(3),         // Narrative
            Constraint::Length(1),      // Notification
            Constraint::Length(1),      // Help bar
        ])
        .split(area);

        frame.render_widget(Paragraph::new(header_line(state)), chunks[0]);

        let columns = Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);
        let mut panel = UnitPanel;
        panel.render(
            frame,
            columns[0],
            UnitPanelProps {
                title: "Party",
                units: &replay.allies,
            },
        );
        panel.render(
            frame,
            columns[1],
            UnitPanelProps {
                title: "Enemies",
                units: &replay.enemies,
            },
        );

        let mut log = NarrativeLog;
        log.render(
            frame,
            chunks[2],
            NarrativeLogProps {
                lines: &replay.narrative,
                scroll: state.log_scroll,
                title: format!(" Battle log · event {}/{} ", state.cursor, state.events().len()),
            },
        );

        frame.render_widget(Paragraph::new(notification_line(state)), chunks[3]);

        let toggle = if state.playing { "pause" } else { "play" };
        render_status_bar(
            frame,
            chunks[4],
            &[
                StatusBarHint::new("space", toggle),
                StatusBarHint::new("←/→", "step"),
                StatusBarHint::new("r", "restart"),
                StatusBarHint::new("e", "end"),
                StatusBarHint::new("↑/↓", "scroll"),
                StatusBarHint::new("x", "complete"),
                StatusBarHint::new("c", "close"),
                StatusBarHint::new("q", "quit"),
            ],
        );
    }
}
