use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::{
    session::Summary,
    settings::SettingsStore,
    trainer::{Phase, Trainer},
};

const READY_LABEL: &str = "[ Ready ]";

impl<S: SettingsStore> Widget for &Trainer<S> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);

        let (cols, rows) = self.screen_size().cells();
        let stage = centered(area, cols.max(24), rows.max(7));

        let block = Block::default()
            .borders(Borders::ALL)
            .title(" flashnum ")
            .border_style(dim_style);
        let inner = block.inner(stage);
        block.render(stage, buf);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),    // phase content
                Constraint::Length(1), // status line
            ])
            .split(inner);

        let session = self.session();
        let status = Paragraph::new(Span::styled(
            format!(
                "{} · step {}/{} · {} ms · (esc)ape",
                session.mode(),
                (session.step() + 1).min(session.max_steps()),
                session.max_steps(),
                session.interval_ms()
            ),
            italic_style,
        ))
        .alignment(Alignment::Center);
        status.render(chunks[1], buf);

        let lines = match self.phase() {
            Phase::AwaitingReady => vec![
                Line::from(Span::styled(
                    READY_LABEL,
                    bold_style.fg(Color::Cyan),
                )),
                Line::from(""),
                Line::from(Span::styled("press enter when ready", dim_style)),
            ],
            Phase::Displaying { target, .. } => vec![Line::from(Span::styled(
                target.to_string(),
                bold_style.fg(Color::Yellow),
            ))],
            Phase::AwaitingAnswer { input, warning, .. } => {
                let mut lines = vec![
                    Line::from(Span::styled("Enter number:", bold_style)),
                    Line::from(vec![
                        Span::styled(input.clone(), bold_style.fg(Color::Green)),
                        Span::styled(
                            "_",
                            dim_style.add_modifier(Modifier::SLOW_BLINK),
                        ),
                    ]),
                ];
                if let Some(warning) = warning {
                    lines.push(Line::from(""));
                    lines.push(Line::from(Span::styled(
                        warning.clone(),
                        bold_style.fg(Color::Red),
                    )));
                }
                lines
            }
            Phase::Terminated => summary_lines(&self.summary(), bold_style),
        };

        let height = (lines.len() as u16).min(chunks[0].height);
        let content = centered(chunks[0], chunks[0].width, height);
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .render(content, buf);
    }
}

fn summary_lines(summary: &Summary, style: Style) -> Vec<Line<'static>> {
    vec![
        Line::from(Span::styled("Session complete", style)),
        Line::from(format!(
            "{}/{} correct, {} mistakes",
            summary.correct, summary.total, summary.mistakes
        )),
        Line::from(format!("{:.2}%", summary.percentage)),
    ]
}

/// A `width` x `height` rect in the middle of `area`, clamped to it
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
