use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::{Component, ACCENT_GOLD, ACCENT_GREEN, ACCENT_RED, BG_PANEL, TEXT_DIM, TEXT_MAIN};
use crate::action::Action;
use crate::battle::BattleUnit;

const BAR_WIDTH: usize = 10;
const NAME_WIDTH: usize = 14;

pub struct UnitPanel;

pub struct UnitPanelProps<'a> {
    pub title: &'a str,
    pub units: &'a [BattleUnit],
}

/// Rows a panel needs for `count` units, borders included.
pub fn panel_height(count: usize) -> u16 {
    u16::try_from(count.max(1))
        .unwrap_or(u16::MAX)
        .saturating_add(2)
}

fn hp_color(ratio: f64) -> ratatui::style::Color {
    if ratio > 0.5 {
        ACCENT_GREEN
    } else if ratio > 0.2 {
        ACCENT_GOLD
    } else {
        ACCENT_RED
    }
}

/// `████░░░░░░`
pub fn hp_bar(unit: &BattleUnit) -> String {
    let filled = (unit.hp_ratio() * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

fn unit_line(unit: &BattleUnit) -> Line<'static> {
    let name: String = unit.name.chars().take(NAME_WIDTH).collect();
    if !unit.is_alive() {
        return Line::from(vec![
            Span::styled(
                format!("{name:<width$} ", width = NAME_WIDTH),
                Style::default().fg(TEXT_DIM).add_modifier(Modifier::CROSSED_OUT),
            ),
            Span::styled(
                format!("{} 0/{} down", hp_bar(unit), unit.max_hp),
                Style::default().fg(TEXT_DIM),
            ),
        ]);
    }

    let mut spans = vec![
        Span::styled(
            format!("{name:<width$} ", width = NAME_WIDTH),
            Style::default().fg(TEXT_MAIN),
        ),
        Span::styled(hp_bar(unit), Style::default().fg(hp_color(unit.hp_ratio()))),
        Span::raw(format!(" {}/{}", unit.display_hp(), unit.max_hp)),
    ];
    for effect in &unit.status_effects {
        spans.push(Span::styled(
            format!(" [{} {}]", effect.name, effect.duration),
            Style::default().fg(ACCENT_GOLD),
        ));
    }
    Line::from(spans)
}

impl Component<Action> for UnitPanel {
    type Props<'a> = UnitPanelProps<'a>;

    fn render(&mut self, frame: &mut Frame, area: Rect, props: Self::Props<'_>) {
        let lines: Vec<Line> = if props.units.is_empty() {
            vec![Line::styled("(none)", Style::default().fg(TEXT_DIM))]
        } else {
            props.units.iter().map(unit_line).collect()
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", props.title))
            .style(Style::default().bg(BG_PANEL).fg(TEXT_MAIN));
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}
