use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::{Component, ACCENT, ACCENT_GOLD, ACCENT_GREEN, ACCENT_RED, BG_PANEL, TEXT_DIM, TEXT_MAIN};
use crate::action::Action;
use crate::replay::{LineKind, NarrativeLine};

pub struct NarrativeLog;

pub struct NarrativeLogProps<'a> {
    pub lines: &'a [NarrativeLine],
    /// Lines scrolled back from the newest one
    pub scroll: usize,
    pub title: String,
}

fn line_style(kind: LineKind) -> Style {
    match kind {
        LineKind::Info => Style::default().fg(TEXT_DIM),
        LineKind::RoundStart => Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        LineKind::Attack => Style::default().fg(TEXT_MAIN),
        LineKind::Critical => Style::default()
            .fg(ACCENT_RED)
            .add_modifier(Modifier::BOLD),
        LineKind::Heal => Style::default().fg(ACCENT_GREEN),
        LineKind::RoundSummary => Style::default().fg(TEXT_DIM).add_modifier(Modifier::ITALIC),
        LineKind::StageBanner => Style::default()
            .fg(ACCENT_GOLD)
            .add_modifier(Modifier::BOLD),
        LineKind::System => Style::default().fg(ACCENT),
        LineKind::Victory => Style::default()
            .fg(ACCENT_GREEN)
            .add_modifier(Modifier::BOLD),
        LineKind::Defeat => Style::default()
            .fg(ACCENT_RED)
            .add_modifier(Modifier::BOLD),
    }
}

/// Index range of the lines shown in a pane `height` rows tall.
pub fn visible_range(total: usize, scroll: usize, height: usize) -> std::ops::Range<usize> {
    let end = total.saturating_sub(scroll);
    let start = end.saturating_sub(height);
    start..end
}

impl Component<Action> for NarrativeLog {
    type Props<'a> = NarrativeLogProps<'a>;

    fn render(&mut self, frame: &mut Frame, area: Rect, props: Self::Props<'_>) {
        let inner_height = area.height.saturating_sub(2) as usize;
        let range = visible_range(props.lines.len(), props.scroll, inner_height);
        let lines: Vec<Line> = props.lines[range]
            .iter()
            .map(|line| Line::styled(line.text.clone(), line_style(line.kind)))
            .collect();

        let block = Block::default()
            .borders(Borders::ALL)
            .title(props.title)
            .style(Style::default().bg(BG_PANEL).fg(TEXT_MAIN));
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_range_follows_tail() {
        assert_eq!(visible_range(10, 0, 4), 6..10);
        assert_eq!(visible_range(10, 3, 4), 3..7);
        assert_eq!(visible_range(2, 0, 4), 0..2);
        assert_eq!(visible_range(3, 9, 4), 0..0);
    }
}
