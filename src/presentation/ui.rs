use super::palette::{severity_style, status_style};
use crate::application::{App, AppMode, BoardRow};
use crate::domain::{format_due_date, StatusValue};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

pub fn render_ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    render_board(f, app, chunks[1]);
    render_status_bar(f, app, chunks[2]);

    match app.mode {
        AppMode::Help => render_help_popup(f, app.help_scroll),
        AppMode::ConfirmDelete => render_confirm_popup(f, app),
        _ => {}
    }
}

/// Rows the board table can show inside `area` (borders and header excluded).
pub fn board_viewport_rows(area: Rect) -> usize {
    area.height.saturating_sub(3).max(1) as usize
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let task_count = app.tasks().len();
    let activity = if app.board.is_loading() { " | loading..." } else { "" };
    let header = Paragraph::new(format!("bizdesk - Task Board | {task_count} tasks{activity}"))
        .style(Style::default().fg(Color::Cyan));
    f.render_widget(header, area);
}

fn render_board(f: &mut Frame, app: &App, area: Rect) {
    let visible_rows = board_viewport_rows(area);
    let selected_row = app.selected_row_index();

    let header = Row::new(vec![
        Cell::from("Task"),
        Cell::from("Status"),
        Cell::from("Hours"),
        Cell::from("Due date"),
    ])
    .style(Style::default().fg(Color::Yellow))
    .height(1);

    let rows: Vec<Row> = app
        .rows()
        .into_iter()
        .enumerate()
        .skip(app.scroll)
        .take(visible_rows)
        .map(|(index, row)| match row {
            BoardRow::Project { name, total_hours } => Row::new(vec![
                Cell::from(name),
                Cell::from(""),
                Cell::from(format!("{total_hours}")),
                Cell::from(""),
            ])
            .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            BoardRow::Task(task) => {
                let updating = if app.board.is_updating(&task.id) { " …" } else { "" };
                let chip = Line::from(vec![
                    Span::styled(format!(" {} ", task.status.label()), status_style(task.status)),
                    Span::raw(updating),
                ]);
                let row = Row::new(vec![
                    Cell::from(format!("  {}", task.title)),
                    Cell::from(chip),
                    Cell::from(format!("{}", task.worked_hours.unwrap_or(0.0))),
                    Cell::from(format_due_date(task.end_date.as_deref())),
                ]);
                if Some(index) == selected_row {
                    row.style(Style::default().bg(Color::Blue).fg(Color::White))
                } else {
                    row
                }
            }
        })
        .collect();

    let title = match app.board.load_error() {
        Some(error) if !app.board.is_loading() => format!("Tasks (last load failed: {})", error.user_message()),
        _ => "Tasks".to_string(),
    };
    let widths = [
        Constraint::Min(20),
        Constraint::Length(18),
        Constraint::Length(7),
        Constraint::Length(12),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .column_spacing(1);

    f.render_widget(table, area);
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let (text, style) = match app.mode {
        AppMode::Normal => match app.notification() {
            Some(message) => (message.text, severity_style(message.severity)),
            None => (
                "s/S: cycle status | d: delete | r: reload | Ctrl+E: export CSV | F1/?: help | q: quit".to_string(),
                Style::default(),
            ),
        },
        AppMode::Help => (
            "↑↓/jk: scroll | PgUp/PgDn: fast scroll | Home: top | Esc/q: close help".to_string(),
            Style::default().fg(Color::Cyan),
        ),
        AppMode::ConfirmDelete => (
            "Delete the selected task? y: confirm | any other key: cancel".to_string(),
            Style::default().fg(Color::Red),
        ),
        AppMode::ExportCsv => (
            format!("Export CSV as: {} (Enter to export, Esc to cancel)", app.filename_input),
            Style::default().fg(Color::Magenta),
        ),
    };

    let status = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(style);
    f.render_widget(status, area);
}

fn popup_area(area: Rect, width_percent: u16, height_percent: u16) -> Rect {
    let width = area.width * width_percent / 100;
    let height = area.height * height_percent / 100;
    Rect {
        x: (area.width - width) / 2,
        y: (area.height - height) / 2,
        width,
        height,
    }
}

fn render_confirm_popup(f: &mut Frame, app: &App) {
    let area = popup_area(f.area(), 50, 20);
    let title = app
        .pending_delete
        .as_deref()
        .and_then(|task_id| app.board.task(task_id))
        .map(|task| task.title)
        .unwrap_or_default();

    f.render_widget(Clear, area);
    let prompt = Paragraph::new(format!("Delete task \"{title}\"?\n\ny: yes    any other key: no"))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Confirm")
                .style(Style::default().fg(Color::Red)),
        )
        .style(Style::default().fg(Color::White));
    f.render_widget(prompt, area);
}

fn render_help_popup(f: &mut Frame, scroll: usize) {
    let popup_area = popup_area(f.area(), 80, 80);

    f.render_widget(Clear, popup_area);

    let help_text = get_help_text();
    let help_lines: Vec<&str> = help_text.lines().collect();
    let visible_height = popup_area.height.saturating_sub(2) as usize;

    let start_line = scroll.min(help_lines.len().saturating_sub(visible_height));
    let end_line = (start_line + visible_height).min(help_lines.len());

    let visible_text = help_lines[start_line..end_line].join("\n");

    let help_widget = Paragraph::new(visible_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("bizdesk Help (Line {}/{})", start_line + 1, help_lines.len()))
                .style(Style::default().fg(Color::Cyan)),
        )
        .style(Style::default().fg(Color::White));

    f.render_widget(help_widget, popup_area);
}

fn get_help_text() -> &'static str {
    r#"BIZDESK TASK BOARD

=== THE BOARD ===
Tasks assigned to you, grouped by project. Projects are sorted by name and
tasks by due date; tasks without a due date come last. The number next to a
project is the total of hours worked on its tasks.

=== STATUSES ===
Not started, In progress, Under revision, Delayed, Postponed, Done, Cancelled
A status change shows immediately and is sent to the server. If the server
refuses it you get a red notification; pick the status again to retry.
A … next to a status means the change is still being sent.

=== NAVIGATION ===
Arrow keys      Move the selection (j/k also work)
PgUp/PgDn       Move a screen at a time
Home/End        First / last task

=== ACTIONS ===
s               Next status for the selected task
S               Previous status for the selected task
d / Delete      Delete the selected task (asks for confirmation)
r               Reload tasks and projects
x               Dismiss the current notification
Ctrl+E          Export the board to a CSV file
                Columns: project, task, status, hours, due_date
F1 or ?         Show this help
q / Ctrl+C      Quit

=== HELP NAVIGATION ===
↑↓ or j/k       Scroll help text up/down one line
Page Up/Down    Scroll help text up/down 5 lines
Home            Jump to top of help text
Esc/F1/?/q      Close this help window

Notifications disappear after a couple of seconds."#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::Session;
    use crate::infrastructure::{ScriptedTransport, TokenStore};
    use ratatui::{backend::TestBackend, Terminal};
    use std::rc::Rc;

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_renders_empty_board_with_key_hints() {
        let session = Session::new(Rc::new(ScriptedTransport::new()), TokenStore::in_memory());
        let app = App::new(session, Some("e1"));
        let mut terminal = Terminal::new(TestBackend::new(100, 12)).unwrap();

        terminal.draw(|f| render_ui(f, &app)).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("0 tasks"));
        assert!(text.contains("q: quit"));
    }

    #[test]
    fn test_status_bar_shows_live_notification() {
        let session = Session::new(Rc::new(ScriptedTransport::new()), TokenStore::in_memory());
        session.notify("Task status updated successfully.", crate::application::Severity::Success);
        let app = App::new(session, Some("e1"));
        let mut terminal = Terminal::new(TestBackend::new(100, 12)).unwrap();

        terminal.draw(|f| render_ui(f, &app)).unwrap();

        assert!(buffer_text(&terminal).contains("Task status updated successfully."));
    }

    #[test]
    fn test_viewport_rows_excludes_chrome() {
        assert_eq!(board_viewport_rows(Rect::new(0, 0, 80, 10)), 7);
        assert_eq!(board_viewport_rows(Rect::new(0, 0, 80, 2)), 1);
    }
}
