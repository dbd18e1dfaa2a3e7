use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use nutrition_core::{Message, ProviderKind, Role};
use crate::app::App;
use crate::markdown::{render_markdown, render_plain};

const ACCENT: Color = Color::Rgb(155, 28, 28);
const GREETING: &str = "Hello! I'm your nutrition assistant. How can I help you today?";
const PLACEHOLDER: &str = "Type your nutrition question here...";

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.show_provider_picker {
        render_provider_picker(app, frame, area);
    }
}

fn render_header(frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Nutrition Assistant ", Style::default().fg(Color::White).bg(ACCENT).bold()),
        Span::raw(" "),
        Span::styled("Ask me about nutrition", Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(title), area);
}

fn bot_label() -> Line<'static> {
    Line::from(Span::styled(
        "Assistant:",
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    ))
}

/// All chat lines, in conversation order, before wrapping.
fn chat_lines(messages: &[Message], pending: bool, animation_frame: u8) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in messages {
        match msg.role {
            Role::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                lines.extend(render_plain(&msg.content));
            }
            Role::Bot => {
                lines.push(bot_label());
                let rendered = render_markdown(&msg.content);
                if msg.is_error() {
                    // Span colors (code, headings) still win over the line's red
                    lines.extend(rendered.into_iter().map(|mut line| {
                        line.style = line.style.fg(Color::Red);
                        line
                    }));
                } else {
                    lines.extend(rendered);
                }
            }
        }
        lines.push(Line::default());
    }

    if pending {
        lines.push(bot_label());
        // Animated dots: cycles through ".", "..", "..."
        let dots = ".".repeat(animation_frame as usize + 1);
        lines.push(Line::from(Span::styled(
            format!("Typing{dots}"),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" {} ", app.session.provider_name()));

    let conversation = app.session.conversation();
    let pending = app.session.is_pending();

    if conversation.is_empty() && !pending {
        let inner_height = area.height.saturating_sub(2);
        let mut lines = vec![Line::default(); usize::from(inner_height / 2).saturating_sub(1)];
        lines.push(Line::styled("◉", Style::default().fg(ACCENT).bold()));
        lines.push(Line::styled(GREETING, Style::default().fg(Color::Gray)));

        let greeting = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(chat_block);
        frame.render_widget(greeting, area);
        app.chat_total_lines = 0;
        app.chat_scroll = 0;
        return;
    }

    let text = Text::from(chat_lines(conversation.messages(), pending, app.animation_frame));
    let chat = Paragraph::new(text).wrap(Wrap { trim: false });

    // Store scroll bounds (inner size minus borders)
    let inner_width = area.width.saturating_sub(2);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_total_lines = u16::try_from(chat.line_count(inner_width)).unwrap_or(u16::MAX);

    let max_scroll = app.chat_total_lines.saturating_sub(app.chat_height);
    if app.follow_latest {
        app.chat_scroll = max_scroll;
    } else {
        app.chat_scroll = app.chat_scroll.min(max_scroll);
    }

    frame.render_widget(chat.block(chat_block).scroll((app.chat_scroll, 0)), area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let pending = app.session.is_pending();
    let border_color = if app.can_submit() { ACCENT } else { Color::DarkGray };
    let title = if pending {
        " Waiting for reply... "
    } else {
        " Ask (Enter to send) "
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scrolling keeps the cursor visible. Inner width excludes borders.
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input = if app.input.is_empty() {
        Paragraph::new(PLACEHOLDER).style(Style::default().fg(Color::DarkGray))
    } else {
        let visible_text: String = app.input
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    };

    frame.render_widget(input.block(input_block), area);

    if !app.show_provider_picker {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let hints = if app.show_provider_picker {
        " ↑/↓ choose  Enter select  Esc cancel "
    } else {
        " Enter send  ↑/↓ PgUp/PgDn scroll  Ctrl+P provider  Esc quit "
    };

    let footer = Line::from(vec![
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{} messages", app.session.conversation().len()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(footer), area);
}

fn render_provider_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let providers = ProviderKind::all();

    // Calculate popup size and position (centered)
    let popup_width = 45.min(area.width.saturating_sub(4));
    let popup_height = (providers.len() as u16 + 2).min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Provider ");

    let items: Vec<ListItem> = providers
        .iter()
        .map(|provider| {
            let key_source = app.config.key_source_with(*provider, app.env_lookup);
            let is_current = *provider == app.current_provider;

            let status = match key_source {
                Some("env") => "(env var)",
                Some("config") => "(configured)",
                Some("local") => "(local)",
                _ => "(needs key)",
            };
            let prefix = if is_current { "* " } else { "  " };

            let style = if is_current {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else if key_source.is_some() {
                Style::default()
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(format!("{}{} {}", prefix, provider.display_name(), status)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.provider_picker_state);
}
