use ratatui::{prelude::*, widgets::*};

use super::app::{App, FieldValue, Overlay, View};
use crate::core::Controller;

pub fn render_ui(f: &mut Frame, app: &App, controller: &Controller) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([
            Constraint::Length(1), // Menu bar
            Constraint::Min(0),
            Constraint::Length(1), // Status and hints
        ])
        .split(f.area());

    let open_menu = match &app.overlay {
        Some(Overlay::Menu { index, .. }) => Some(*index),
        _ => None,
    };
    render_menu_bar(f, chunks[0], app, open_menu);

    match app.view {
        View::Devices => render_devices(f, chunks[1], controller),
        View::Log => render_log(f, chunks[1], app, controller),
    }
    render_bottom(f, chunks[2], app, controller);

    match &app.overlay {
        Some(Overlay::Menu { index, item }) => render_menu_dropdown(f, chunks[0], app, *index, *item),
        Some(Overlay::Form(form)) => {
            let area = centered(f.area(), 60, form.fields.len() as u16 + 4);
            let lines: Vec<Line> = form
                .fields
                .iter()
                .enumerate()
                .map(|(idx, field)| {
                    let value = match &field.value {
                        FieldValue::Text(text) if idx == form.focus => format!("{text}_"),
                        FieldValue::Text(text) => text.clone(),
                        FieldValue::Toggle(true) => "[x]".to_string(),
                        FieldValue::Toggle(false) => "[ ]".to_string(),
                    };
                    let style = if idx == form.focus {
                        Style::default().fg(Color::Black).bg(Color::Cyan)
                    } else {
                        Style::default()
                    };
                    Line::from(vec![
                        Span::raw(format!("{:>20}: ", field.label)),
                        Span::styled(value, style),
                    ])
                })
                .collect();
            render_dialog(f, area, form.title, lines);
        }
        Some(Overlay::Picker(picker)) => {
            let area = centered(f.area(), 50, picker.entries.len().min(12) as u16 + 2);
            let items: Vec<ListItem> = picker
                .entries
                .iter()
                .map(|(_, label)| ListItem::new(label.as_str()))
                .collect();
            let list = List::new(items)
                .block(Block::default().borders(Borders::ALL).title(picker.title.as_str()))
                .highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan));
            let mut state = ListState::default().with_selected(Some(picker.selected));
            f.render_widget(Clear, area);
            f.render_stateful_widget(list, area, &mut state);
        }
        Some(Overlay::Confirm(confirm)) => {
            let area = centered(f.area(), 56, 5);
            let button = |label: &'static str, active: bool| {
                if active {
                    Span::styled(label, Style::default().fg(Color::Black).bg(Color::Cyan))
                } else {
                    Span::raw(label)
                }
            };
            render_dialog(
                f,
                area,
                confirm.title,
                vec![
                    Line::from(confirm.message),
                    Line::from(vec![
                        button(" Yes ", confirm.yes_selected),
                        Span::raw("   "),
                        button(" No ", !confirm.yes_selected),
                    ])
                    .alignment(Alignment::Center),
                ],
            );
        }
        None => {}
    }

    if let Some(notice) = app.notices.front() {
        let body_lines = notice.body().lines().count().max(1) as u16;
        let area = centered(f.area(), 70, body_lines + 4);
        let border = if notice.is_error() {
            Color::Red
        } else {
            Color::Green
        };
        let paragraph = Paragraph::new(format!("{}\n\n[Enter] OK", notice.body()))
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(border))
                    .title(notice.title()),
            );
        f.render_widget(Clear, area);
        f.render_widget(paragraph, area);
    }
}

fn render_menu_bar(f: &mut Frame, area: Rect, app: &App, open: Option<usize>) {
    let mut spans = Vec::new();
    for (idx, menu) in app.menus.iter().enumerate() {
        let style = if open == Some(idx) {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default().fg(Color::Black)
        };
        spans.push(Span::styled(format!(" {} ", menu.title), style));
    }
    let bar = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Gray));
    f.render_widget(bar, area);
}

fn render_menu_dropdown(f: &mut Frame, bar: Rect, app: &App, index: usize, item: usize) {
    let Some(menu) = app.menus.get(index) else {
        return;
    };
    let x = app.menus[..index]
        .iter()
        .map(|menu| menu.title.len() as u16 + 2)
        .sum::<u16>();
    let width = menu
        .items
        .iter()
        .map(|(label, _)| label.len() as u16)
        .max()
        .unwrap_or(0)
        + 4;
    let area = Rect {
        x: bar.x + x,
        y: bar.y + 1,
        width,
        height: menu.items.len() as u16 + 2,
    }
    .intersection(f.area());

    let items: Vec<ListItem> = menu
        .items
        .iter()
        .map(|(label, _)| ListItem::new(label.as_str()))
        .collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    let mut state = ListState::default().with_selected(Some(item));
    f.render_widget(Clear, area);
    f.render_stateful_widget(list, area, &mut state);
}

fn render_devices(f: &mut Frame, area: Rect, controller: &Controller) {
    let header = Row::new(["Address", "Name", "CRC", "Secure", "Link"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = controller
        .registry()
        .list()
        .into_iter()
        .map(|device| {
            let link = match (controller.session(), controller.link_status(device.address)) {
                (None, _) => "-".to_string(),
                (Some(_), Some(status)) => status.to_string(),
                (Some(_), None) => "Waiting".to_string(),
            };
            Row::new([
                device.address.to_string(),
                device.name.clone(),
                yes_no(device.use_crc).to_string(),
                yes_no(device.use_secure_channel).to_string(),
                link,
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Min(16),
            Constraint::Length(5),
            Constraint::Length(7),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title("Devices"));
    f.render_widget(table, area);
}

fn render_log(f: &mut Frame, area: Rect, app: &App, controller: &Controller) {
    let lines: Vec<Line> = controller
        .logs()
        .snapshot()
        .into_iter()
        .map(Line::from)
        .collect();
    let paragraph = Paragraph::new(lines)
        .scroll((app.log_scroll, 0))
        .block(Block::default().borders(Borders::ALL).title("Log (newest first)"));
    f.render_widget(paragraph, area);
}

fn render_bottom(f: &mut Frame, area: Rect, app: &App, controller: &Controller) {
    let session = match controller.session() {
        Some(session) => format!("Connected {session}"),
        None => "Not connected".to_string(),
    };
    let text = format!(
        "{session}   {}   [s/d/c/i] Menus  [l] Log  [v] Devices  [q] Quit",
        app.status_line
    );
    let help = Paragraph::new(text)
        .alignment(Alignment::Left)
        .style(Style::default().bg(Color::Gray).fg(Color::Black));
    f.render_widget(help, area);
}

fn render_dialog(f: &mut Frame, area: Rect, title: &str, lines: Vec<Line>) {
    let paragraph = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// A `width` x `height` rectangle centered in `area`, clipped to fit.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
