//! Application state for the terminal task board.
//!
//! [`App`] holds the view state (selection, scrolling, dialogs) around a
//! shared [`TaskBoard`]. Key handling never awaits: operations that reach
//! the API come back as an [`Action`] for the event loop to spawn.

use super::board::TaskBoard;
use super::notifications::{NotificationMessage, Severity};
use super::session::Session;
use crate::domain::{StatusValue, Task, TaskStatus};
use crate::infrastructure::CsvExporter;

pub const DEFAULT_EXPORT_FILENAME: &str = "tasks.csv";

/// Represents the current mode of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// Arrow keys move the selection, shortcuts available
    Normal,
    Help,
    /// Waiting for the user to confirm deleting `App::pending_delete`
    ConfirmDelete,
    /// Filename prompt for the CSV export
    ExportCsv,
}

/// Work the event loop must start on the user's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Reload,
    ChangeStatus { task_id: String, status: TaskStatus },
    DeleteTask { task_id: String },
    Quit,
}

/// One line of the rendered board.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardRow {
    Project { name: String, total_hours: f64 },
    Task(Task),
}

/// Main application state.
pub struct App {
    pub session: Session,
    pub board: TaskBoard,
    pub mode: AppMode,
    /// Index of the selected task, counting tasks only
    pub selected: usize,
    /// First visible board row
    pub scroll: usize,
    pub help_scroll: usize,
    /// Task awaiting delete confirmation
    pub pending_delete: Option<String>,
    /// Input buffer for filename entry
    pub filename_input: String,
    /// Cursor position within the input buffer
    pub cursor_position: usize,
    /// Viewport height in rows (for scrolling calculations)
    pub viewport_rows: usize,
}

impl App {
    pub fn new(session: Session, employee_id: Option<&str>) -> Self {
        let board = TaskBoard::new(&session, employee_id);
        Self {
            session,
            board,
            mode: AppMode::Normal,
            selected: 0,
            scroll: 0,
            help_scroll: 0,
            pending_delete: None,
            filename_input: String::new(),
            cursor_position: 0,
            viewport_rows: 20,
        }
    }

    /// Board rows in display order: each project header followed by its tasks.
    pub fn rows(&self) -> Vec<BoardRow> {
        let mut rows = Vec::new();
        for group in self.board.groups() {
            rows.push(BoardRow::Project {
                name: group.project.name.clone(),
                total_hours: group.total_hours(),
            });
            rows.extend(group.tasks.into_iter().map(BoardRow::Task));
        }
        rows
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.board.groups().into_iter().flat_map(|group| group.tasks).collect()
    }

    pub fn selected_task(&self) -> Option<Task> {
        self.tasks().into_iter().nth(self.selected)
    }

    /// Position of the selected task among [`rows`](Self::rows).
    pub fn selected_row_index(&self) -> Option<usize> {
        let mut seen = 0;
        for (index, row) in self.rows().iter().enumerate() {
            if let BoardRow::Task(_) = row {
                if seen == self.selected {
                    return Some(index);
                }
                seen += 1;
            }
        }
        None
    }

    pub fn move_selection(&mut self, delta: isize) {
        let count = self.tasks().len();
        if count == 0 {
            self.selected = 0;
            return;
        }
        self.selected = self.selected.saturating_add_signed(delta).min(count - 1);
        self.ensure_cursor_visible();
    }

    /// Keeps the selection in range after the board changed size.
    pub fn clamp_selection(&mut self) {
        let count = self.tasks().len();
        self.selected = self.selected.min(count.saturating_sub(1));
        self.ensure_cursor_visible();
    }

    /// Picks the next (or previous) status for the selected task.
    pub fn cycle_status(&self, forward: bool) -> Option<Action> {
        let task = self.selected_task()?;
        let status = if forward { task.status.next() } else { task.status.previous() };
        Some(Action::ChangeStatus { task_id: task.id, status })
    }

    pub fn request_delete(&mut self) {
        if let Some(task) = self.selected_task() {
            self.pending_delete = Some(task.id);
            self.mode = AppMode::ConfirmDelete;
        }
    }

    pub fn confirm_delete(&mut self) -> Option<Action> {
        self.mode = AppMode::Normal;
        self.pending_delete.take().map(|task_id| Action::DeleteTask { task_id })
    }

    pub fn cancel_delete(&mut self) {
        self.mode = AppMode::Normal;
        self.pending_delete = None;
    }

    pub fn show_help(&mut self) {
        self.mode = AppMode::Help;
        self.help_scroll = 0;
    }

    pub fn close_help(&mut self) {
        self.mode = AppMode::Normal;
    }

    /// Switches to CSV export mode to prompt for a filename.
    pub fn start_csv_export(&mut self) {
        self.mode = AppMode::ExportCsv;
        self.filename_input = DEFAULT_EXPORT_FILENAME.to_string();
        self.cursor_position = self.filename_input.len();
    }

    /// Returns the filename input if not empty, otherwise the default.
    pub fn get_csv_export_filename(&self) -> String {
        if self.filename_input.trim().is_empty() {
            DEFAULT_EXPORT_FILENAME.to_string()
        } else {
            self.filename_input.trim().to_string()
        }
    }

    /// Writes the board as currently displayed and reports the outcome.
    pub fn export_csv(&mut self) {
        let filename = self.get_csv_export_filename();
        let result = CsvExporter::export_groups(&self.board.groups(), &filename).map_err(|e| e.to_string());
        self.set_csv_export_result(result);
    }

    pub fn set_csv_export_result(&mut self, result: Result<String, String>) {
        match result {
            Ok(filename) => {
                tracing::info!(%filename, "board exported");
                self.session.notify(format!("Exported to {filename}"), Severity::Success);
            }
            Err(error) => {
                tracing::warn!(%error, "board export failed");
                self.session.notify(format!("Export failed: {error}"), Severity::Danger);
            }
        }
        self.cancel_filename_input();
    }

    /// Cancels filename input and returns to normal mode.
    pub fn cancel_filename_input(&mut self) {
        self.mode = AppMode::Normal;
        self.filename_input.clear();
        self.cursor_position = 0;
    }

    pub fn notification(&self) -> Option<NotificationMessage> {
        self.session.notifications().current()
    }

    pub fn update_viewport_size(&mut self, rows: usize) {
        self.viewport_rows = rows.max(1);
    }

    /// Adjusts the scroll offset so the selected row is on screen.
    pub fn ensure_cursor_visible(&mut self) {
        let Some(row) = self.selected_row_index() else {
            self.scroll = 0;
            return;
        };
        // Keep the project header above the first task visible.
        let top = if self.selected == 0 { 0 } else { row };
        if top < self.scroll {
            self.scroll = top;
        } else if row >= self.scroll + self.viewport_rows {
            self.scroll = row + 1 - self.viewport_rows;
        }
    }
}
