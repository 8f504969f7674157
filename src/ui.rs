use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Tabs, Wrap},
    Frame,
};

use crate::app::{App, Overlay, AI_TONES};
use crate::routes::Route;

pub fn ui(f: &mut Frame, app: &App) {
    // Create the layout
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(0),    // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(f.size());

    render_title_bar(f, app, chunks[0]);
    render_main_content(f, app, chunks[1]);
    render_status_bar(f, app, chunks[2]);

    render_overlay(f, app, chunks[1]);
}

fn render_title_bar(f: &mut Frame, app: &App, area: Rect) {
    let route = app.router.current();

    if matches!(route, Route::Login | Route::Register | Route::Home) {
        let title = Paragraph::new("mailcaster - email campaigns from your terminal")
            .block(Block::default().borders(Borders::BOTTOM));
        f.render_widget(title, area);
        return;
    }

    let titles = vec![
        "Dashboard",
        "Recipients",
        "Campaigns",
        "Marketing",
        "Transactional",
        "AI Draft",
        "Logs",
    ];
    let selected = match route {
        Route::Dashboard => 0,
        Route::Recipients => 1,
        Route::Campaigns => 2,
        Route::MarketingEmail => 3,
        Route::TransactionalEmail => 4,
        Route::AiGenerator => 5,
        Route::EmailLogs => 6,
        _ => 0,
    };

    let tabs = Tabs::new(titles.iter().cloned().map(Line::from).collect())
        .block(Block::default().borders(Borders::BOTTOM))
        .highlight_style(Style::default().fg(Color::Yellow))
        .select(selected);
    f.render_widget(tabs, area);
}

fn render_main_content(f: &mut Frame, app: &App, area: Rect) {
    match app.router.current() {
        Route::Home => {}
        Route::Login => render_login(f, app, area),
        Route::Register => render_register(f, app, area),
        Route::Dashboard => render_dashboard(f, app, area),
        Route::Recipients => render_recipients(f, app, area),
        Route::Campaigns => render_campaigns(f, app, area),
        Route::MarketingEmail => render_marketing(f, app, area),
        Route::TransactionalEmail => render_transactional(f, app, area),
        Route::AiGenerator => render_ai_generator(f, app, area),
        Route::EmailLogs => render_logs(f, app, area),
        Route::Error => render_error(f, app, area),
    }
}

fn field_label(label: &str, active: bool) -> Span<'_> {
    if active {
        Span::styled(
            format!("> {}: ", label),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(format!("  {}: ", label), Style::default().fg(Color::Gray))
    }
}

fn masked(len: usize) -> String {
    "*".repeat(len)
}

fn render_login(f: &mut Frame, app: &App, area: Rect) {
    let form = &app.login_form;
    let text = vec![
        Line::from(""),
        Line::from(vec![
            field_label("Email", form.field == 0),
            Span::raw(form.email.as_str()),
        ]),
        Line::from(vec![
            field_label("Password", form.field == 1),
            Span::raw(masked(form.password.chars().count())),
        ]),
        Line::from(""),
        Line::from("Enter - sign in | Tab - next field | F2 - register | Ctrl+q - quit"),
    ];

    let login = Paragraph::new(text)
        .block(Block::default().title("Sign in").borders(Borders::ALL));
    f.render_widget(login, centered_rect(60, 50, area));
}

fn render_register(f: &mut Frame, app: &App, area: Rect) {
    let form = &app.register_form;
    let text = vec![
        Line::from(""),
        Line::from(vec![
            field_label("Email", form.field == 0),
            Span::raw(form.email.as_str()),
        ]),
        Line::from(vec![
            field_label("Password", form.field == 1),
            Span::raw(masked(form.password.chars().count())),
        ]),
        Line::from(vec![
            field_label("Confirm", form.field == 2),
            Span::raw(masked(form.confirm.chars().count())),
        ]),
        Line::from(""),
        Line::from("Enter - create account | Tab - next field | Esc - back to sign in"),
    ];

    let register = Paragraph::new(text)
        .block(Block::default().title("Register").borders(Borders::ALL));
    f.render_widget(register, centered_rect(60, 60, area));
}

fn render_dashboard(f: &mut Frame, app: &App, area: Rect) {
    let user = app.session.user_email().unwrap_or_else(|| "unknown".to_string());
    let sent_total: usize = app.logs.iter().map(|l| l.sent_to.len()).sum();

    let text = vec![
        Line::from(vec![
            Span::styled("Signed in as: ", Style::default().fg(Color::Gray)),
            Span::raw(user),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Recipients: ", Style::default().fg(Color::Gray)),
            Span::raw(app.contacts.len().to_string()),
        ]),
        Line::from(vec![
            Span::styled("Campaigns: ", Style::default().fg(Color::Gray)),
            Span::raw(app.groups.len().to_string()),
        ]),
        Line::from(vec![
            Span::styled("Emails sent: ", Style::default().fg(Color::Gray)),
            Span::raw(format!("{} ({} deliveries)", app.logs.len(), sent_total)),
        ]),
        Line::from(""),
        Line::from("r - recipients | g - campaigns | m - marketing email"),
        Line::from("t - transactional email | a - AI draft | l - logs"),
        Line::from("o - sign out | q - quit | F1 - help"),
    ];

    let dashboard = Paragraph::new(text)
        .block(Block::default().title("Dashboard").borders(Borders::ALL));
    f.render_widget(dashboard, area);
}

fn render_recipients(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .contacts
        .iter()
        .enumerate()
        .map(|(i, contact)| {
            let style = if Some(i) == app.selected_contact_idx {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };

            let created = contact.created_at.as_deref().unwrap_or("");
            let content = format!("{:<24} {:<32} {}", contact.name, contact.email, created);
            ListItem::new(content).style(style)
        })
        .collect();

    let title = format!("Recipients ({})", app.contacts.len());
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD));
    f.render_widget(list, area);
}

fn render_campaigns(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .groups
        .iter()
        .enumerate()
        .map(|(i, group)| {
            let style = if Some(i) == app.selected_group_idx {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };

            let content = format!(
                "{:<32} {:>4} recipients",
                group.group_name,
                group.contact_ids.len()
            );
            ListItem::new(content).style(style)
        })
        .collect();

    let title = format!("Campaigns ({})", app.groups.len());
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD));
    f.render_widget(list, area);
}

fn render_marketing(f: &mut Frame, app: &App, area: Rect) {
    let form = &app.compose_form;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Header fields
            Constraint::Min(0),    // Body
        ])
        .split(area);

    let recipients = if form.use_group {
        let name = app
            .groups
            .get(form.group_idx)
            .map_or("(no campaigns)", |g| g.group_name.as_str());
        format!("campaign: {} (Left/Right to change, g for manual)", name)
    } else {
        format!("{} (g to pick a campaign)", form.to_text)
    };

    let header_text = vec![
        Line::from(vec![
            field_label("Subject", form.field == 0),
            Span::raw(form.subject.as_str()),
        ]),
        Line::from(vec![
            field_label("To", form.field == 1),
            Span::raw(recipients),
        ]),
    ];

    let header = Paragraph::new(header_text)
        .block(Block::default().title("Marketing Email").borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    let body_title = if form.field == 2 {
        "Body (editing) - Ctrl+s to send"
    } else {
        "Body - Tab to focus, Ctrl+s to send"
    };
    let body = Paragraph::new(form.body.as_str())
        .block(Block::default().title(body_title).borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    f.render_widget(body, chunks[1]);
}

fn render_transactional(f: &mut Frame, app: &App, area: Rect) {
    let form = &app.transactional_form;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Header fields
            Constraint::Min(0),    // Body
        ])
        .split(area);

    let audience = if form.send_to_all {
        "all subscribers (g to pick a campaign)".to_string()
    } else {
        let name = app
            .groups
            .get(form.group_idx)
            .map_or("(no campaigns)", |g| g.group_name.as_str());
        format!("campaign: {} (Left/Right to change, g for everyone)", name)
    };

    let attachments = form.attachments_text.replace('\n', "; ");

    let header_text = vec![
        Line::from(vec![
            field_label("Subject", form.field == 0),
            Span::raw(form.subject.as_str()),
        ]),
        Line::from(vec![
            field_label("Audience", form.field == 1),
            Span::raw(audience),
        ]),
        Line::from(vec![
            field_label("Attachments", form.field == 2),
            Span::raw(attachments),
        ]),
    ];

    let header = Paragraph::new(header_text).block(
        Block::default()
            .title("Transactional Email")
            .borders(Borders::ALL),
    );
    f.render_widget(header, chunks[0]);

    let body_title = if form.field == 3 {
        "Body (editing) - Ctrl+s to send"
    } else {
        "Body - Tab to focus, Ctrl+s to send"
    };
    let body = Paragraph::new(form.body.as_str())
        .block(Block::default().title(body_title).borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    f.render_widget(body, chunks[1]);
}

fn render_ai_generator(f: &mut Frame, app: &App, area: Rect) {
    let form = &app.ai_form;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Request form
            Constraint::Min(0),    // Generated draft
        ])
        .split(area);

    let key_points = form.key_points_text.replace('\n', "; ");

    let form_text = vec![
        Line::from(vec![
            field_label("Subject hint", form.field == 0),
            Span::raw(form.subject_hint.as_str()),
        ]),
        Line::from(vec![
            field_label("Tone", form.field == 1),
            Span::raw(format!("{} (Left/Right to change)", AI_TONES[form.tone_idx])),
        ]),
        Line::from(vec![
            field_label("Audience", form.field == 2),
            Span::raw(form.audience.as_str()),
        ]),
        Line::from(vec![
            field_label("Key points", form.field == 3),
            Span::raw(key_points),
        ]),
        Line::from(""),
        Line::from("Ctrl+s - generate | Enter - use draft | Esc - back"),
    ];

    let request = Paragraph::new(form_text)
        .block(Block::default().title("AI Draft Request").borders(Borders::ALL));
    f.render_widget(request, chunks[0]);

    let draft_text = match &app.ai_draft {
        Some(draft) => format!("Subject: {}\n\n{}", draft.subject, draft.body),
        None if app.loading => "Generating...".to_string(),
        None => "No draft yet. Fill in the form and press Ctrl+s.".to_string(),
    };

    let draft = Paragraph::new(draft_text)
        .block(Block::default().title("Generated Draft").borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    f.render_widget(draft, chunks[1]);
}

fn render_logs(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .logs
        .iter()
        .enumerate()
        .map(|(i, log)| {
            let style = if Some(i) == app.selected_log_idx {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };

            let date = log
                .created_at
                .as_deref()
                .map(format_log_date)
                .unwrap_or_default();
            let status = log.status.as_deref().unwrap_or("unknown");
            let content = format!(
                "{:<17} {:<36} {:>4} recipients  {}",
                date,
                log.subject,
                log.sent_to.len(),
                status
            );
            ListItem::new(content).style(style)
        })
        .collect();

    let title = format!("Email Logs ({})", app.logs.len());
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD));
    f.render_widget(list, area);
}

fn render_error(f: &mut Frame, app: &App, area: Rect) {
    let detail = app
        .error_message
        .clone()
        .unwrap_or_else(|| "Something went wrong.".to_string());

    let text = vec![
        Line::from("The last action could not be completed."),
        Line::from(""),
        Line::from(detail),
        Line::from(""),
        Line::from("Enter - go home | q - quit"),
    ];

    let error = Paragraph::new(text)
        .style(Style::default().fg(Color::Red))
        .block(Block::default().title("Error").borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    f.render_widget(error, centered_rect(60, 50, area));
}

fn render_overlay(f: &mut Frame, app: &App, area: Rect) {
    match app.overlay {
        Overlay::None => {}
        Overlay::ContactForm => render_contact_form(f, app, area),
        Overlay::ConfirmDeleteContact => {
            render_confirm(f, "Delete this recipient? (y/n)", area);
        }
        Overlay::ImportPath => render_import_path(f, app, area),
        Overlay::ImportPreview => render_import_preview(f, app, area),
        Overlay::GroupForm => render_group_form(f, app, area),
        Overlay::ConfirmDeleteGroup => {
            render_confirm(f, "Delete this campaign? (y/n)", area);
        }
        Overlay::Help => render_help(f, area),
    }
}

fn popup(f: &mut Frame, area: Rect) -> Rect {
    let popup_area = centered_rect(60, 60, area);
    f.render_widget(Clear, popup_area);
    popup_area
}

fn render_contact_form(f: &mut Frame, app: &App, area: Rect) {
    let form = &app.contact_form;
    let title = if form.editing_id.is_some() {
        "Edit Recipient"
    } else {
        "New Recipient"
    };

    let text = vec![
        Line::from(""),
        Line::from(vec![
            field_label("Name", form.field == 0),
            Span::raw(form.name.as_str()),
        ]),
        Line::from(vec![
            field_label("Email", form.field == 1),
            Span::raw(form.email.as_str()),
        ]),
        Line::from(""),
        Line::from("Enter - save | Tab - next field | Esc - cancel"),
    ];

    let area = popup(f, area);
    let widget = Paragraph::new(text).block(Block::default().title(title).borders(Borders::ALL));
    f.render_widget(widget, area);
}

fn render_import_path(f: &mut Frame, app: &App, area: Rect) {
    let text = vec![
        Line::from(""),
        Line::from(vec![
            field_label("File", true),
            Span::raw(app.import_path.as_str()),
        ]),
        Line::from(""),
        Line::from("CSV (name,email) or TXT (one address per line)"),
        Line::from("Enter - upload for preview | Esc - cancel"),
    ];

    let area = popup(f, area);
    let widget = Paragraph::new(text)
        .block(Block::default().title("Import Recipients").borders(Borders::ALL));
    f.render_widget(widget, area);
}

fn render_import_preview(f: &mut Frame, app: &App, area: Rect) {
    let area = popup(f, area);

    let Some(preview) = &app.import_preview else {
        return;
    };

    let mut items: Vec<ListItem> = preview
        .contacts
        .iter()
        .take(20)
        .map(|c| ListItem::new(format!("{:<24} {}", c.name, c.email)))
        .collect();
    if preview.contacts.len() > items.len() {
        items.push(ListItem::new(format!(
            "... and {} more",
            preview.contacts.len() - 20
        )));
    }
    items.push(ListItem::new(""));
    items.push(ListItem::new("y - import all | n - cancel"));

    let title = format!("Import Preview ({} recipients)", preview.count);
    let list = List::new(items).block(Block::default().title(title).borders(Borders::ALL));
    f.render_widget(list, area);
}

fn render_group_form(f: &mut Frame, app: &App, area: Rect) {
    let form = &app.group_form;
    let title = if form.editing_id.is_some() {
        "Edit Campaign"
    } else {
        "New Campaign"
    };

    let mut items: Vec<ListItem> = vec![
        ListItem::new(Line::from(vec![
            field_label("Name", form.field == 0),
            Span::raw(form.name.as_str()),
        ])),
        ListItem::new("Members (Tab to focus, Space to toggle):"),
    ];

    for (i, contact) in app.contacts.iter().enumerate() {
        let mark = if form.members.contains(&contact.id) {
            "[x]"
        } else {
            "[ ]"
        };
        let style = if form.field == 1 && i == form.cursor {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        items.push(
            ListItem::new(format!("  {} {:<24} {}", mark, contact.name, contact.email))
                .style(style),
        );
    }

    items.push(ListItem::new(""));
    items.push(ListItem::new("Enter - save | Esc - cancel"));

    let area = popup(f, area);
    let list = List::new(items).block(Block::default().title(title).borders(Borders::ALL));
    f.render_widget(list, area);
}

fn render_confirm(f: &mut Frame, message: &str, area: Rect) {
    let popup_area = centered_rect(40, 20, area);
    f.render_widget(Clear, popup_area);

    let widget = Paragraph::new(message)
        .block(Block::default().title("Confirm").borders(Borders::ALL));
    f.render_widget(widget, popup_area);
}

fn render_help(f: &mut Frame, area: Rect) {
    let help_text = vec![
        Line::from("mailcaster Help"),
        Line::from(""),
        Line::from("Global:"),
        Line::from("  Ctrl+q - quit"),
        Line::from("  Ctrl+d/r/g/m/t/a/l - jump to screen"),
        Line::from("  Ctrl+o - sign out"),
        Line::from("  F1 - show/hide help"),
        Line::from(""),
        Line::from("Lists:"),
        Line::from("  Up/Down - move | n - new | e - edit | d - delete | r - refresh"),
        Line::from("  i - import recipients from file (Recipients screen)"),
        Line::from(""),
        Line::from("Compose screens:"),
        Line::from("  Tab - next field | Ctrl+s - send/generate | Esc - back"),
    ];

    let area = popup(f, area);
    let help = Paragraph::new(help_text)
        .block(Block::default().title("Help").borders(Borders::ALL));
    f.render_widget(help, area);
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let mut text = format!("Screen: {}", app.router.current().title());

    if let Some(email) = app.session.user_email() {
        text.push_str(&format!(" | {}", email));
    }

    if let Some(refresh) = app.last_refresh {
        text.push_str(&format!(" | refreshed {}", refresh.format("%H:%M:%S")));
    }

    if app.loading {
        text.push_str(" | working...");
    }

    // Show error or info message if present
    if let Some(error) = &app.error_message {
        text = format!("ERROR: {}", error);
    } else if let Some(info) = &app.info_message {
        text = format!("INFO: {}", info);
    }

    let status = Paragraph::new(text)
        .style(Style::default().bg(Color::Blue).fg(Color::White));
    f.render_widget(status, area);
}

// Helper function to create a centered rect
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

fn format_log_date(raw: &str) -> String {
    // Backend timestamps are ISO8601; only the second precision matters here.
    let head = raw.get(..19).unwrap_or(raw);
    match chrono::NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S") {
        Ok(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => raw.to_string(),
    }
}
