//! ratatui rendering: header, transcript, and either the text input or the
//! call panel depending on the active mode.

use chatterm::app::state::{AppState, Mode, RecordingState};
use chatterm::history::{Message, Role};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Wrap};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

pub fn draw(frame: &mut Frame, state: &AppState, meter_level: f32) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(frame.size());

    draw_header(frame, chunks[0], state);

    if !state.session.is_authenticated() && !state.session_expired {
        draw_sign_in(frame, chunks[1]);
    } else {
        draw_transcript(frame, chunks[1], state);
    }

    match state.mode {
        Mode::Chat => draw_input(frame, chunks[2], state),
        Mode::Call => draw_call_panel(frame, chunks[2], state, meter_level),
    }

    draw_footer(frame, chunks[3], state);
}

fn draw_header(frame: &mut Frame, area: Rect, state: &AppState) {
    let mode = match state.mode {
        Mode::Chat => "chat",
        Mode::Call => "call",
    };
    let who = state
        .session
        .current_user()
        .map(|user| user.display_name().to_string())
        .unwrap_or_else(|| "not signed in".to_string());
    let mut spans = vec![
        Span::styled("chatterm", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!("  [{mode}]  {who}")),
    ];
    if state.session_expired {
        spans.push(Span::styled(
            "  session expired, press Ctrl+G to sign in again",
            Style::default().fg(Color::Red),
        ));
    } else if state.loading {
        spans.push(Span::styled(
            "  thinking...",
            Style::default().fg(Color::Yellow),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_sign_in(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from("Welcome to chatterm."),
        Line::from(""),
        Line::from("Press 'g' to sign in with Google, or Ctrl+Q to quit."),
    ];
    let block = Block::default().borders(Borders::ALL).title(" sign in ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_transcript(frame: &mut Frame, area: Rect, state: &AppState) {
    let mut lines: Vec<Line> = Vec::new();
    for message in state.history.messages() {
        lines.extend(message_lines(message));
    }

    // Keep the newest entries visible when the transcript outgrows the area.
    let inner_height = area.height.saturating_sub(2) as usize;
    let scroll = lines.len().saturating_sub(inner_height) as u16;

    let block = Block::default().borders(Borders::ALL).title(" conversation ");
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0)),
        area,
    );
}

fn message_lines(message: &Message) -> Vec<Line<'_>> {
    let (label, style) = match message.role {
        Role::User => ("you", Style::default().fg(Color::Cyan)),
        Role::Assistant => ("assistant", Style::default().fg(Color::Green)),
    };
    let mut lines = vec![Line::from(vec![
        Span::styled(format!("{label}: "), style.add_modifier(Modifier::BOLD)),
        Span::raw(message.content.as_str()),
    ])];
    if let Some(link) = &message.event_link {
        lines.push(Line::from(Span::styled(
            format!("  event: {link}"),
            Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
        )));
    }
    lines
}

fn draw_input(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().borders(Borders::ALL).title(" message ");
    frame.render_widget(Paragraph::new(state.input.as_str()).block(block), area);

    // Cursor sits just past the typed text, clamped to the box.
    let width = state.input.as_str().width() as u16;
    let x = (area.x + 1 + width).min(area.x + area.width.saturating_sub(2));
    frame.set_cursor(x, area.y + 1);
}

fn draw_call_panel(frame: &mut Frame, area: Rect, state: &AppState, meter_level: f32) {
    let (label, color) = match state.recording_state {
        RecordingState::Idle => ("press Space to talk", Color::Gray),
        RecordingState::Recording => ("listening... (Space to stop)", Color::Red),
        RecordingState::Playing => ("playing reply...", Color::Green),
    };

    // The meter reads normalized RMS; speech peaks well below 1.0, so scale
    // it up for a useful visual range.
    let ratio = f64::from((meter_level * 8.0).clamp(0.0, 1.0));
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" call "))
        .gauge_style(Style::default().fg(color))
        .label(label)
        .ratio(ratio);
    frame.render_widget(gauge, area);
}

fn draw_footer(frame: &mut Frame, area: Rect, state: &AppState) {
    let hints = if state.session.is_authenticated() {
        "Tab mode | Enter send | Ctrl+L clear | Ctrl+G google | Ctrl+O logout | Ctrl+Q quit"
    } else {
        "g sign in | Ctrl+Q quit"
    };
    frame.render_widget(
        Paragraph::new(Span::styled(hints, Style::default().fg(Color::DarkGray))),
        area,
    );
}
