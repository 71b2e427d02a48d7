use crate::application::{Action, App, AppMode};
use crossterm::event::{KeyCode, KeyModifiers};

pub struct InputHandler;

impl InputHandler {
    /// Applies a key press to the view state. Returns the remote work or
    /// exit request the key asked for, if any.
    pub fn handle_key_event(app: &mut App, key: KeyCode, modifiers: KeyModifiers) -> Option<Action> {
        match app.mode {
            AppMode::Normal => Self::handle_normal_mode(app, key, modifiers),
            AppMode::Help => {
                Self::handle_help_mode(app, key);
                None
            }
            AppMode::ConfirmDelete => Self::handle_confirm_delete_mode(app, key),
            AppMode::ExportCsv => {
                Self::handle_filename_input_mode(app, key);
                None
            }
        }
    }

    fn handle_normal_mode(app: &mut App, key: KeyCode, modifiers: KeyModifiers) -> Option<Action> {
        if modifiers.contains(KeyModifiers::CONTROL) {
            match key {
                KeyCode::Char('e') => app.start_csv_export(),
                KeyCode::Char('c') => return Some(Action::Quit),
                _ => {}
            }
            return None;
        }

        match key {
            KeyCode::Up | KeyCode::Char('k') => app.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => app.move_selection(1),
            KeyCode::PageUp => app.move_selection(-(app.viewport_rows as isize)),
            KeyCode::PageDown => app.move_selection(app.viewport_rows as isize),
            KeyCode::Home => app.move_selection(isize::MIN),
            KeyCode::End => app.move_selection(isize::MAX),
            KeyCode::Char('s') => return app.cycle_status(true),
            KeyCode::Char('S') => return app.cycle_status(false),
            KeyCode::Char('d') | KeyCode::Delete => app.request_delete(),
            KeyCode::Char('r') => return Some(Action::Reload),
            KeyCode::Char('x') => app.session.notifications().dismiss(),
            KeyCode::F(1) | KeyCode::Char('?') => app.show_help(),
            KeyCode::Char('q') => return Some(Action::Quit),
            _ => {}
        }
        None
    }

    fn handle_confirm_delete_mode(app: &mut App, key: KeyCode) -> Option<Action> {
        match key {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_delete(),
            _ => {
                app.cancel_delete();
                None
            }
        }
    }

    fn handle_help_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('?') | KeyCode::Char('q') => {
                app.close_help();
                app.help_scroll = 0;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                app.help_scroll = app.help_scroll.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                app.help_scroll += 1;
            }
            KeyCode::PageUp => {
                app.help_scroll = app.help_scroll.saturating_sub(5);
            }
            KeyCode::PageDown => {
                app.help_scroll += 5;
            }
            KeyCode::Home => {
                app.help_scroll = 0;
            }
            _ => {}
        }
    }

    fn handle_filename_input_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Enter => app.export_csv(),
            KeyCode::Esc => app.cancel_filename_input(),
            KeyCode::Backspace => {
                if app.cursor_position > 0 {
                    app.filename_input.remove(app.cursor_position - 1);
                    app.cursor_position -= 1;
                }
            }
            KeyCode::Delete => {
                if app.cursor_position < app.filename_input.len() {
                    app.filename_input.remove(app.cursor_position);
                }
            }
            KeyCode::Left => {
                if app.cursor_position > 0 {
                    app.cursor_position -= 1;
                }
            }
            KeyCode::Right => {
                if app.cursor_position < app.filename_input.len() {
                    app.cursor_position += 1;
                }
            }
            KeyCode::Home => {
                app.cursor_position = 0;
            }
            KeyCode::End => {
                app.cursor_position = app.filename_input.len();
            }
            KeyCode::Char(c) if c.is_ascii() => {
                app.filename_input.insert(app.cursor_position, c);
                app.cursor_position += 1;
            }
            _ => {}
        }
    }
}
