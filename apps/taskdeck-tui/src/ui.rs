use crate::app::{AppScreen, AppState, AuthField, FormField, InputMode};
use chrono::{DateTime, Local, Utc};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use taskdeck_core::{Control, LoadState, StatusFilter, Task, TaskDraft};

pub fn draw(frame: &mut Frame, app: &AppState) {
    match &app.screen {
        AppScreen::Login => draw_auth_screen(frame, app, " Login ", Color::Cyan),
        AppScreen::Register => draw_auth_screen(frame, app, " Create New Account ", Color::Green),
        AppScreen::Tasks => draw_tasks_screen(frame, app),
        AppScreen::Detail(_) => draw_detail_screen(frame, app),
    }

    if let InputMode::ConfirmDelete(_) = app.mode {
        draw_confirm_popup(frame, "Are you sure you want to delete this task?");
    }

    if let Some(notice) = &app.notice {
        draw_error_popup(frame, notice);
    }
}

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn key_span(label: &str, color: Color) -> Span<'_> {
    Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )
}

fn field_style(focused: bool) -> Style {
    if focused {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    }
}

fn draw_auth_screen(frame: &mut Frame, app: &AppState, title: &str, color: Color) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(50),
            Constraint::Percentage(25),
        ])
        .split(frame.area());

    let auth_block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .style(Style::default().fg(color));

    frame.render_widget(auth_block.clone(), chunks[1]);

    let inner_area = auth_block.inner(chunks[1]);
    let auth_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2), // Email field
            Constraint::Length(1), // Spacing
            Constraint::Length(2), // Password field
            Constraint::Length(2), // Inline error / progress
            Constraint::Min(0),    // Instructions
        ])
        .split(inner_area);

    let email_field = Paragraph::new(format!("Email:    {}", app.auth_email_input))
        .style(field_style(app.auth_field_focus == AuthField::Email));
    frame.render_widget(email_field, auth_chunks[0]);
    draw_underline(frame, auth_chunks[0]);

    let password_display = "*".repeat(app.auth_password_input.chars().count());
    let password_field = Paragraph::new(format!("Password: {}", password_display))
        .style(field_style(app.auth_field_focus == AuthField::Password));
    frame.render_widget(password_field, auth_chunks[2]);
    draw_underline(frame, auth_chunks[2]);

    let status = if app.pending.is_pending(&Control::AuthForm) {
        let label = if app.screen == AppScreen::Register {
            "Creating account..."
        } else {
            "Signing in..."
        };
        Paragraph::new(label).style(Style::default().fg(Color::DarkGray))
    } else if let Some(error) = &app.auth_error {
        Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red))
    } else {
        Paragraph::new("")
    };
    frame.render_widget(status.wrap(Wrap { trim: true }), auth_chunks[3]);

    let (submit, switch_key, switch_label, esc_label) = if app.screen == AppScreen::Register {
        (" to register", "Esc", " to go back to login", "")
    } else {
        (" to login", "Ctrl+R", " to create a new account", " | Esc to quit")
    };
    let instructions = Paragraph::new(vec![
        Line::from(""),
        Line::from(vec![
            Span::raw("Press "),
            key_span("Tab", Color::Cyan),
            Span::raw(" to switch fields | "),
            key_span("Enter", Color::Green),
            Span::raw(submit),
        ]),
        Line::from(vec![
            Span::raw("Press "),
            key_span(switch_key, Color::Magenta),
            Span::raw(switch_label),
            Span::raw(esc_label),
        ]),
    ])
    .style(Style::default().fg(Color::Gray))
    .alignment(Alignment::Center);
    frame.render_widget(instructions, auth_chunks[4]);

    let (area, len) = match app.auth_field_focus {
        AuthField::Email => (auth_chunks[0], app.auth_email_input.chars().count()),
        AuthField::Password => (auth_chunks[2], app.auth_password_input.chars().count()),
    };
    frame.set_cursor_position((area.x + 10 + len as u16, area.y));
}

fn draw_underline(frame: &mut Frame, field: Rect) {
    let underline = Paragraph::new("─".repeat(field.width as usize))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(
        underline,
        Rect {
            x: field.x,
            y: field.y + 1,
            width: field.width,
            height: 1,
        },
    );
}

fn draw_tasks_screen(frame: &mut Frame, app: &AppState) {
    let form_height = match app.mode {
        InputMode::Create(_) | InputMode::Edit { .. } => 7,
        _ => 0,
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(form_height),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0]);
    draw_filter_bar(frame, app, chunks[1]);
    draw_task_list(frame, app, chunks[2]);

    match &app.mode {
        InputMode::Create(field) => draw_task_form(
            frame,
            chunks[3],
            " New Task ",
            &app.create_draft,
            *field,
            app.create_error.as_deref(),
            app.pending.is_pending(&Control::CreateForm),
        ),
        InputMode::Edit { task_id, field } => draw_task_form(
            frame,
            chunks[3],
            " Edit Task ",
            &app.edit_draft,
            *field,
            app.task_errors.get(task_id).map(String::as_str),
            app.pending.is_task_pending(task_id),
        ),
        _ => {}
    }

    let help = match app.mode {
        InputMode::Search => "Type to search | Enter to keep | Esc to clear",
        InputMode::Create(_) | InputMode::Edit { .. } => {
            "Tab to switch fields | Enter to save | Esc to cancel"
        }
        _ => {
            "n new | Enter open | Space toggle | e edit | d delete | / search | Tab filter | r reload | L logout | q quit"
        }
    };
    let instructions = Paragraph::new(help)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(instructions, chunks[4]);
}

fn draw_header(frame: &mut Frame, app: &AppState, area: Rect) {
    let stats = app.board.stats();
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(" {} ", app.user_email.as_deref().unwrap_or("My Tasks")),
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::raw(format!("Total {}", stats.total)),
        Span::raw("  "),
        Span::styled(
            format!("Active {}", stats.active),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw("  "),
        Span::styled(
            format!("Completed {}", stats.completed),
            Style::default().fg(Color::Magenta),
        ),
    ]))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Thick),
    );
    frame.render_widget(header, area);
}

fn draw_filter_bar(frame: &mut Frame, app: &AppState, area: Rect) {
    let stats = app.board.stats();
    let mut spans = Vec::new();
    for filter in StatusFilter::ALL {
        let label = format!(" {} ({}) ", filter.label(), stats.count(filter));
        let style = if filter == app.query.status {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(label, style));
        spans.push(Span::raw(" "));
    }

    spans.push(Span::raw("  Search: "));
    let search_style = field_style(app.mode == InputMode::Search);
    if app.query.search.is_empty() && app.mode != InputMode::Search {
        spans.push(Span::styled("(press /)", Style::default().fg(Color::DarkGray)));
    } else {
        spans.push(Span::styled(app.query.search.as_str(), search_style));
    }

    let bar = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    frame.render_widget(bar, area);
}

fn draw_task_list(frame: &mut Frame, app: &AppState, area: Rect) {
    let block = Block::default()
        .title(format!(" {} Tasks ", app.query.status.label()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded);

    let visible = app.visible_tasks();

    let placeholder = match app.board.state() {
        LoadState::Loading if app.board.is_empty() => Some(Line::from("Loading tasks...")),
        LoadState::Failed(message) => Some(Line::from(vec![
            Span::styled(message.as_str(), Style::default().fg(Color::Red)),
            Span::raw(" (press r to retry)"),
        ])),
        _ if visible.is_empty() && app.board.is_empty() => {
            Some(Line::from("No tasks yet. Press n to create one."))
        }
        _ if visible.is_empty() => Some(Line::from("No tasks match the current filter.")),
        _ => None,
    };

    if let Some(line) = placeholder {
        let paragraph = Paragraph::new(vec![Line::from(""), line])
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = visible.iter().map(|task| task_item(app, task)).collect();

    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    let mut state = ListState::default().with_selected(Some(app.selected));
    frame.render_stateful_widget(list, area, &mut state);
}

fn task_item<'a>(app: &'a AppState, task: &'a Task) -> ListItem<'a> {
    let (marker, title_style) = if task.is_completed {
        (
            "[x] ",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::CROSSED_OUT),
        )
    } else {
        ("[ ] ", Style::default().fg(Color::White))
    };

    let mut title = vec![
        Span::styled(marker, Style::default().fg(Color::Cyan)),
        Span::styled(task.title.as_str(), title_style),
    ];
    if app.pending.is_task_pending(&task.id) {
        title.push(Span::styled(" ...", Style::default().fg(Color::DarkGray)));
    }

    let mut lines = vec![Line::from(title)];
    if let Some(description) = task.description_text() {
        lines.push(Line::from(Span::styled(
            format!("    {}", description),
            Style::default().fg(Color::Gray),
        )));
    }
    if let Some(error) = app.task_errors.get(&task.id) {
        lines.push(Line::from(Span::styled(
            format!("    {}", error),
            Style::default().fg(Color::Red),
        )));
    }

    ListItem::new(lines)
}

fn draw_task_form(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    draft: &TaskDraft,
    focus: FormField,
    error: Option<&str>,
    busy: bool,
) {
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .style(Style::default().fg(Color::Cyan));
    frame.render_widget(block.clone(), area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(block.inner(area));

    frame.render_widget(
        Paragraph::new(format!("Title:       {}", draft.title))
            .style(field_style(focus == FormField::Title)),
        rows[0],
    );
    frame.render_widget(
        Paragraph::new(format!("Description: {}", draft.description))
            .style(field_style(focus == FormField::Description)),
        rows[1],
    );

    let status = if busy {
        Paragraph::new("Saving...").style(Style::default().fg(Color::DarkGray))
    } else if let Some(error) = error {
        Paragraph::new(error).style(Style::default().fg(Color::Red))
    } else {
        Paragraph::new("")
    };
    frame.render_widget(status, rows[2]);

    let (row, len) = match focus {
        FormField::Title => (rows[0], draft.title.chars().count()),
        FormField::Description => (rows[1], draft.description.chars().count()),
    };
    frame.set_cursor_position((row.x + 13 + len as u16, row.y));
}

fn draw_detail_screen(frame: &mut Frame, app: &AppState) {
    let form_height = match app.mode {
        InputMode::Edit { .. } => 7,
        _ => 0,
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(form_height),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(" Task Details ")
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Thick),
        );
    frame.render_widget(header, chunks[0]);

    let body_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded);

    let lines = match app.detail_task() {
        Some(task) => detail_lines(app, task),
        None => match app.detail.message() {
            Some(message) => vec![
                Line::from(""),
                Line::from(Span::styled(message, Style::default().fg(Color::Red))),
            ],
            None => vec![Line::from(""), Line::from("Loading task...")],
        },
    };

    let body = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(body_block);
    frame.render_widget(body, chunks[1]);

    let help = match &app.mode {
        InputMode::Edit { task_id, field } => {
            draw_task_form(
                frame,
                chunks[2],
                " Edit Task ",
                &app.edit_draft,
                *field,
                app.task_errors.get(task_id).map(String::as_str),
                app.pending.is_task_pending(task_id),
            );
            "Tab to switch fields | Enter to save | Esc to cancel"
        }
        _ => "Space toggle | e edit | d delete | r reload | Esc back | q quit",
    };
    let help = Paragraph::new(help)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help, chunks[3]);
}

fn detail_lines<'a>(app: &'a AppState, task: &'a Task) -> Vec<Line<'a>> {
    let label = Style::default().fg(Color::Gray);
    let (status, status_style) = if task.is_completed {
        ("Completed", Style::default().fg(Color::Magenta))
    } else {
        ("Active", Style::default().fg(Color::Yellow))
    };

    let mut lines = vec![
        Line::from(Span::styled(
            task.title.as_str(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Status:  ", label),
            Span::styled(status, status_style),
        ]),
        Line::from(vec![
            Span::styled("Created: ", label),
            Span::raw(format_timestamp(&task.created_at)),
        ]),
    ];
    if task.was_edited() {
        lines.push(Line::from(vec![
            Span::styled("Updated: ", label),
            Span::raw(format_timestamp(&task.updated_at)),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Description", label)));
    lines.push(Line::from(
        task.description_text().unwrap_or("No description"),
    ));

    if app.pending.is_task_pending(&task.id) {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Saving...",
            Style::default().fg(Color::DarkGray),
        )));
    } else if let Some(error) = app.task_errors.get(&task.id) {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            error.as_str(),
            Style::default().fg(Color::Red),
        )));
    }

    lines
}

fn draw_confirm_popup(frame: &mut Frame, question: &str) {
    let area = centered_rect(50, 20, frame.area());

    let popup_block = Block::default()
        .title(" Confirm ")
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .style(Style::default().fg(Color::Yellow));

    let text = Paragraph::new(vec![
        Line::from(question),
        Line::from(""),
        Line::from(vec![
            key_span("y", Color::Green),
            Span::raw(" yes | "),
            key_span("n", Color::Red),
            Span::raw(" no"),
        ]),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(popup_block);

    frame.render_widget(Clear, area);
    frame.render_widget(text, area);
}

fn draw_error_popup(frame: &mut Frame, error: &str) {
    let area = centered_rect(60, 20, frame.area());

    let popup_block = Block::default()
        .title(" Error ")
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .style(Style::default().fg(Color::Red));

    let error_text = Paragraph::new(error)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::White))
        .block(popup_block);

    frame.render_widget(Clear, area);
    frame.render_widget(error_text, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
