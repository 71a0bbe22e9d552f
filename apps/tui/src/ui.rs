//! UI rendering module.
//!
//! Contains all the widget rendering logic (View).

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Gauge, List, ListItem, Padding, Paragraph, Tabs, Wrap},
};

use crate::app::{App, Focus, LineInfo, LogEntry, Tab};
use cubot_core::cube::{CubeState, FACELETS_PER_FACE, Face};
use cubot_core::events::{LineDirection, LogLevel};
use cubot_core::state::SessionState;

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Create main layout
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header/tabs
            Constraint::Min(10),   // Main content
            Constraint::Length(3), // Footer/status bar
        ])
        .split(area);

    draw_header(frame, chunks[0], app);

    match app.current_tab {
        Tab::Main => draw_main_view(frame, chunks[1], app),
        Tab::Logs => draw_logs_view(frame, chunks[1], app),
        Tab::Protocol => draw_protocol_view(frame, chunks[1], app),
        Tab::Help => draw_help_view(frame, chunks[1]),
    }

    draw_footer(frame, chunks[2], app);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let titles = vec!["Main", "Logs (F2)", "Protocol (F3)", "Help (F1)"];
    let selected = match app.current_tab {
        Tab::Main => 0,
        Tab::Logs => 1,
        Tab::Protocol => 2,
        Tab::Help => 3,
    };

    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Cubot TUI ")
                .title_style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
        )
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .divider(symbols::DOT);

    frame.render_widget(tabs, area);
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &App) {
    let status = if app.state.is_connected() {
        Span::styled(
            format!(" ● {} ", app.address().unwrap_or("?")),
            Style::default().fg(Color::Green),
        )
    } else {
        Span::styled(" ○ Disconnected ", Style::default().fg(Color::Red))
    };

    let state = Span::styled(format!(" {} ", app.state), Style::default().fg(Color::Cyan));

    let help = Span::styled(
        " Ctrl+Q: Quit | Ctrl+O: Connect | Enter: Send | Ctrl+X: Stop | F4: Scan ",
        Style::default().fg(Color::DarkGray),
    );

    let line = Line::from(vec![status, state, help]);

    let footer = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );

    frame.render_widget(footer, area);
}

fn draw_main_view(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40), // Program input
            Constraint::Percentage(60), // Cube & Progress
        ])
        .split(area);

    draw_program_panel(frame, chunks[0], app);
    draw_status_panel(frame, chunks[1], app);
}

fn draw_program_panel(frame: &mut Frame, area: Rect, app: &App) {
    let is_focused = app.focus == Focus::Program;
    let border_color = if is_focused {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Program ")
        .title_style(Style::default().fg(if is_focused {
            Color::Yellow
        } else {
            Color::White
        }))
        .padding(Padding::horizontal(1));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let fields = [
        ("Moves:   ", &app.instructions),
        ("Cube:    ", &app.definition),
    ];

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(2), // Mode
            Constraint::Min(1),    // Send button
        ])
        .split(inner);

    for (i, (label, value)) in fields.iter().enumerate() {
        let is_active = is_focused && app.input_focus == i;
        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::White)
        };

        let width = (layout[i].width as usize).saturating_sub(label.len() + 2);
        let display_value = if value.len() > width && width > 3 {
            format!("...{}", &value[value.len() - (width - 3)..])
        } else {
            value.to_string()
        };
        let display_value = if value.is_empty() && i == 1 {
            "solved".to_string()
        } else {
            display_value
        };

        let cursor = if is_active { "▏" } else { "" };

        let input = Paragraph::new(Line::from(vec![
            Span::styled(*label, Style::default().fg(Color::Cyan)),
            Span::styled(display_value, style),
            Span::styled(cursor, Style::default().fg(Color::Yellow)),
        ]))
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(if is_active {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default().fg(Color::DarkGray)
                }),
        );

        frame.render_widget(input, layout[i]);
    }

    let mode = if app.scramble { "scramble" } else { "solve" };
    let mode = Paragraph::new(Line::from(vec![
        Span::styled("Mode:    ", Style::default().fg(Color::Cyan)),
        Span::styled(mode, Style::default().fg(Color::White)),
        Span::styled("  (Ctrl+R)", Style::default().fg(Color::DarkGray)),
    ]));
    frame.render_widget(mode, layout[2]);

    let busy = app.state.is_busy();
    let button_style = if busy || app.state != SessionState::ConnectedIdle {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Green)
    };
    let button_text = if busy { "⟳ Running..." } else { "▶ Send" };
    let button = Paragraph::new(button_text)
        .style(button_style)
        .alignment(ratatui::layout::Alignment::Center);
    frame.render_widget(button, layout[3]);
}

fn draw_status_panel(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),  // Progress
            Constraint::Length(11), // Cube net
            Constraint::Min(5),     // Recent logs
        ])
        .split(area);

    draw_progress(frame, chunks[0], app);
    draw_cube(frame, chunks[1], &app.cube);
    draw_recent_logs(frame, chunks[2], app);
}

fn face_color(face: Face) -> Color {
    match face {
        Face::U => Color::White,
        Face::R => Color::Red,
        Face::F => Color::Green,
        Face::D => Color::Yellow,
        Face::L => Color::Rgb(255, 140, 0),
        Face::B => Color::Blue,
    }
}

/// One row of a face as three coloured cells.
fn face_row(cube: &CubeState, face: Face, row: usize) -> Vec<Span<'static>> {
    let start = row * 3;
    cube.face(face)[start..start + 3]
        .iter()
        .map(|f| Span::styled("██", Style::default().fg(face_color(*f))))
        .collect()
}

fn draw_cube(frame: &mut Frame, area: Rect, cube: &CubeState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(if cube.is_solved() {
            " Cube (solved) "
        } else {
            " Cube "
        });
    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Unfolded net:   U
    //               L F R B
    //                 D
    let pad = || Span::raw(" ".repeat(7));
    let mut lines = Vec::with_capacity(FACELETS_PER_FACE);
    for row in 0..3 {
        let mut spans = vec![pad()];
        spans.extend(face_row(cube, Face::U, row));
        lines.push(Line::from(spans));
    }
    for row in 0..3 {
        let mut spans = Vec::new();
        for side in [Face::L, Face::F, Face::R, Face::B] {
            spans.extend(face_row(cube, side, row));
            spans.push(Span::raw(" "));
        }
        lines.push(Line::from(spans));
    }
    for row in 0..3 {
        let mut spans = vec![pad()];
        spans.extend(face_row(cube, Face::D, row));
        lines.push(Line::from(spans));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_progress(frame: &mut Frame, area: Rect, app: &App) {
    let color = match app.state {
        SessionState::Error => Color::Red,
        SessionState::Working => Color::Cyan,
        _ if app.progress == 100 => Color::Green,
        _ => Color::DarkGray,
    };

    let label = match app.remaining {
        Some(remaining) => format!(
            "{}% ({} of {} moves left)",
            app.progress, remaining, app.total_moves
        ),
        None => format!("{}%", app.progress),
    };

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" Progress "),
        )
        .gauge_style(Style::default().fg(color).bg(Color::Black))
        .percent(app.progress.min(100) as u16)
        .label(label);

    frame.render_widget(gauge, area);
}

fn draw_recent_logs(frame: &mut Frame, area: Rect, app: &App) {
    let is_focused = app.focus == Focus::Logs;
    let border_color = if is_focused {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let items: Vec<ListItem> = app
        .logs
        .iter()
        .rev()
        .take(area.height.saturating_sub(2) as usize)
        .map(|entry| log_to_list_item(entry, area.width))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(" Recent Logs "),
        )
        .style(Style::default().fg(Color::White));

    frame.render_widget(list, area);
}

fn draw_logs_view(frame: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem> = app
        .logs
        .iter()
        .skip(app.log_scroll)
        .take(area.height.saturating_sub(2) as usize)
        .map(|entry| log_to_list_item(entry, area.width))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(format!(
                    " Logs ({}/{}) ",
                    app.log_scroll + 1,
                    app.logs.len().max(1)
                )),
        )
        .style(Style::default().fg(Color::White));

    frame.render_widget(list, area);
}

fn draw_protocol_view(frame: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem> = app
        .lines
        .iter()
        .skip(app.line_scroll.saturating_sub(area.height.saturating_sub(3) as usize))
        .take(area.height.saturating_sub(2) as usize)
        .map(line_to_list_item)
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(format!(" Protocol ({} lines) ", app.lines.len())),
    );

    frame.render_widget(list, area);
}

fn line_to_list_item(line: &LineInfo) -> ListItem<'static> {
    let color = match line.direction {
        LineDirection::Tx => Color::Magenta,
        LineDirection::Rx => Color::Green,
    };
    ListItem::new(Line::from(vec![
        Span::styled(
            format!("{} ", line.timestamp),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(format!("{} ", line.direction), Style::default().fg(color)),
        Span::styled(line.text.clone(), Style::default().fg(Color::White)),
    ]))
}

fn draw_help_view(frame: &mut Frame, area: Rect) {
    let help_text = vec![
        "",
        "  Cubot TUI - cube solving robot controller",
        "",
        "  KEYBOARD SHORTCUTS:",
        "",
        "  Ctrl+Q, Ctrl+C, Esc    Quit application",
        "  F1                     Show this help",
        "  F2                     View full logs",
        "  F3                     View protocol lines",
        "  F4                     Scan the subnet for controllers",
        "  Ctrl+O / Ctrl+D        Connect / disconnect",
        "  Ctrl+X                 Stop the robot",
        "  Ctrl+R                 Toggle solve / scramble",
        "  Ctrl+G                 Ask the robot for its servo settings",
        "  Tab                    Switch focus between panels",
        "  Up/Down                Select the moves or cube field",
        "  Enter                  Send the program",
        "",
        "  IN LOGS AND PROTOCOL VIEWS:",
        "",
        "  j/k, Up/Down           Scroll",
        "  Page Up/Down           Scroll by page",
        "  Home/End               Go to start/end",
        "",
        "  USAGE:",
        "",
        "  1. Scan (F4) or set `address` in cubot.toml, then Ctrl+O",
        "  2. Type robot moves such as F1R1S3, optionally the starting cube",
        "  3. Press Enter and follow the cube and the progress",
        "",
        "  Press any key to return...",
    ];

    let text: Vec<Line> = help_text.iter().map(|s| Line::from(*s)).collect();

    let help = Paragraph::new(Text::from(text))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Help "),
        )
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: false });

    frame.render_widget(help, area);
}

fn log_to_list_item(entry: &LogEntry, width: u16) -> ListItem<'static> {
    let (icon, color) = match entry.level {
        LogLevel::Error => ("✗", Color::Red),
        LogLevel::Warn => ("⚠", Color::Yellow),
        LogLevel::Info => ("●", Color::Green),
        LogLevel::Debug => ("○", Color::Blue),
        LogLevel::Trace => ("·", Color::DarkGray),
    };

    let time_len = entry.timestamp.len() + 1; // +1 for space
    let icon_len = 2; // 1 char + 1 space

    let msg_width = (width.saturating_sub((time_len + icon_len + 4) as u16) as usize).max(1);

    let chars: Vec<char> = entry.message.chars().collect();
    let mut chunks = chars.chunks(msg_width).map(|c| c.iter().collect::<String>());
    let first = chunks.next().unwrap_or_default();

    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!("{} ", entry.timestamp),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(format!("{} ", icon), Style::default().fg(color)),
        Span::styled(first, Style::default().fg(Color::White)),
    ])];
    for rest in chunks {
        lines.push(Line::from(vec![
            Span::raw(" ".repeat(time_len + icon_len)), // Indent
            Span::styled(rest, Style::default().fg(Color::White)),
        ]));
    }
    ListItem::new(Text::from(lines))
}
