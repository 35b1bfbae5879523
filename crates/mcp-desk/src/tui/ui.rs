//! Console rendering using ratatui.

use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::app::{App, Surface};

const CHAT_PLACEHOLDER: &str = "Agent and user chat will appear here...";
const TOOLS_PLACEHOLDER: &str = "Tool calls and step details will appear here...";

/// Draw the console.
pub fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Length(1), // Status bar
            Constraint::Length(3), // Input
            Constraint::Min(5),    // Chat
            Constraint::Min(5),    // Tool Calls
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    draw_header(frame, chunks[0]);
    draw_status(frame, app, chunks[1]);
    draw_input(frame, app, chunks[2]);
    draw_surface(frame, app, Surface::Chat, chunks[3]);
    draw_surface(frame, app, Surface::Tools, chunks[4]);
    draw_footer(frame, chunks[5]);
}

fn draw_header(frame: &mut Frame, area: Rect) {
    let header = Paragraph::new(" mcp-desk - Playwright MCP Desktop UI Automation ")
        .style(Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD));
    frame.render_widget(header, area);
}

fn draw_status(frame: &mut Frame, app: &mut App, area: Rect) {
    let server = match app.supervisor.pid() {
        Some(pid) => format!("server pid {}", pid),
        None => "server stopped".to_string(),
    };
    let text = format!(
        " Status: {} | {} | agents running: {} ",
        app.status,
        server,
        app.running_sessions()
    );

    let style = if app.status.contains("failed") {
        Style::default().bg(Color::Red).fg(Color::White)
    } else if app.running_sessions() > 0 {
        Style::default().bg(Color::Yellow).fg(Color::Black)
    } else {
        Style::default().bg(Color::DarkGray).fg(Color::White)
    };
    frame.render_widget(Paragraph::new(text).style(style), area);
}

fn draw_input(frame: &mut Frame, app: &App, area: Rect) {
    let prompt = "prompt> ";
    let input = Paragraph::new(format!("{}{}", prompt, app.input))
        .block(Block::default().borders(Borders::ALL).title(" Prompt "));
    frame.render_widget(input, area);

    frame.set_cursor_position(cursor_position(area, prompt.chars().count() + app.cursor_pos));
}

/// Cursor cell for `column` characters into the input box, clamped inside it.
fn cursor_position(area: Rect, column: usize) -> Position {
    let column = u16::try_from(column).unwrap_or(u16::MAX);
    let x = area.x.saturating_add(1).saturating_add(column);
    let max_x = area.x.saturating_add(area.width.saturating_sub(2));
    Position::new(x.min(max_x), area.y.saturating_add(1))
}

fn draw_surface(frame: &mut Frame, app: &App, surface: Surface, area: Rect) {
    let (name, entries, offset, placeholder) = match surface {
        Surface::Chat => ("Chat", &app.chat, app.chat_scroll, CHAT_PLACEHOLDER),
        Surface::Tools => ("Tool Calls", &app.tools, app.tools_scroll, TOOLS_PLACEHOLDER),
    };

    let title = if offset > 0 {
        format!(" {} [scroll: {}] ", name, offset)
    } else {
        format!(" {} ", name)
    };
    let border = if app.focus == surface {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let block = Block::default().borders(Borders::ALL).border_style(border).title(title);

    if entries.is_empty() {
        let empty = Paragraph::new(placeholder)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let lines: Vec<Line> = entries
        .iter()
        .map(|entry| Line::from(Span::styled(entry.as_str(), entry_style(surface, entry))))
        .collect();

    // Estimate wrapped height so the newest line sits at the bottom.
    let inner_height = area.height.saturating_sub(2) as usize;
    let inner_width = area.width.saturating_sub(2) as usize;
    let total: usize = entries
        .iter()
        .map(|e| {
            let len = e.chars().count();
            if inner_width > 0 {
                len.div_ceil(inner_width).max(1)
            } else {
                1
            }
        })
        .sum();
    let scroll = if total > inner_height {
        (total - inner_height).saturating_sub(offset)
    } else {
        0
    };

    let output = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll as u16, 0));
    frame.render_widget(output, area);
}

fn entry_style(surface: Surface, entry: &str) -> Style {
    if surface == Surface::Tools {
        return Style::default().fg(Color::Magenta);
    }
    if entry.starts_with("[Agent Error]") || entry.starts_with("[Agent Exception]") {
        Style::default().fg(Color::Red)
    } else if entry.starts_with("[MCP]") {
        Style::default().fg(Color::Yellow)
    } else if entry.starts_with("[Prompt]") {
        Style::default().fg(Color::Cyan)
    } else if entry.starts_with("[Agent]") {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Green)
    }
}

fn draw_footer(frame: &mut Frame, area: Rect) {
    let footer = Paragraph::new(
        " F1 start server | F2 stop server | Enter run | Tab switch pane | Ctrl+L clear | /help | Ctrl+C quit ",
    )
    .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_stays_inside_input_box() {
        let area = Rect::new(2, 5, 40, 3);
        assert_eq!(cursor_position(area, 0), Position::new(3, 6));
        assert_eq!(cursor_position(area, 10), Position::new(13, 6));
        assert_eq!(cursor_position(area, 100_000), Position::new(40, 6));
        assert_eq!(cursor_position(area, usize::MAX), Position::new(40, 6));

        let edge = Rect::new(u16::MAX - 4, u16::MAX, 4, 3);
        assert_eq!(cursor_position(edge, 70_000).y, u16::MAX);
    }

    #[test]
    fn test_entry_styles() {
        assert_eq!(
            entry_style(Surface::Chat, "[Agent Error] boom").fg,
            Some(Color::Red)
        );
        assert_eq!(
            entry_style(Surface::Chat, "[MCP] MCP Server started.").fg,
            Some(Color::Yellow)
        );
        assert_eq!(entry_style(Surface::Tools, "[MCP] x").fg, Some(Color::Magenta));
        assert_eq!(entry_style(Surface::Chat, "plain").fg, Some(Color::Green));
    }
}
