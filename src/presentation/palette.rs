//! Colors for status chips and notifications.

use crate::application::Severity;
use crate::domain::{ExpenseReportStatus, ProjectStatus, StatusValue, TaskStatus};
use ratatui::style::{Color, Modifier, Style};

/// Background and foreground of a status chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPair {
    pub background: Color,
    pub foreground: Color,
}

impl ColorPair {
    const fn rgb(background: (u8, u8, u8), foreground: (u8, u8, u8)) -> Self {
        Self {
            background: Color::Rgb(background.0, background.1, background.2),
            foreground: Color::Rgb(foreground.0, foreground.1, foreground.2),
        }
    }

    pub fn style(self) -> Style {
        Style::default().bg(self.background).fg(self.foreground)
    }
}

pub const NOT_STARTED: ColorPair = ColorPair::rgb((0xE6, 0xE6, 0xE6), (0x4D, 0x4D, 0x4D));
pub const IN_PROGRESS: ColorPair = ColorPair::rgb((0xFF, 0xF1, 0xD6), (0x9A, 0x6B, 0x12));
pub const UNDER_REVISION: ColorPair = ColorPair::rgb((0xE3, 0xEE, 0xFB), (0x2F, 0x5F, 0x96));
pub const DELAYED: ColorPair = ColorPair::rgb((0xFD, 0xE2, 0xE1), (0xB4, 0x23, 0x18));
pub const POSTPONED: ColorPair = ColorPair::rgb((0xEF, 0xE6, 0xF7), (0x6B, 0x3F, 0xA0));
pub const DONE: ColorPair = ColorPair::rgb((0xE1, 0xF5, 0xE4), (0x1E, 0x7B, 0x34));
pub const CANCELLED: ColorPair = ColorPair::rgb((0xF2, 0xD7, 0xD5), (0x7A, 0x1F, 0x1A));
pub const ACCEPTED: ColorPair = ColorPair::rgb((0xDD, 0xF4, 0xF1), (0x11, 0x7A, 0x65));
pub const IN_QUOTATION: ColorPair = ColorPair::rgb((0xFF, 0xF4, 0xE5), (0xB3, 0x5C, 0x00));
pub const NO_STATUS: ColorPair = ColorPair::rgb((0xF5, 0xF5, 0xF5), (0x63, 0x6B, 0x74));

/// Chip colors for every value of a status kind.
pub trait StatusPalette: StatusValue {
    fn colors(self) -> ColorPair;
}

impl StatusPalette for TaskStatus {
    fn colors(self) -> ColorPair {
        match self {
            TaskStatus::NotStarted => NOT_STARTED,
            TaskStatus::InProgress => IN_PROGRESS,
            TaskStatus::UnderRevision => UNDER_REVISION,
            TaskStatus::Delayed => DELAYED,
            TaskStatus::Postponed => POSTPONED,
            TaskStatus::Done => DONE,
            TaskStatus::Cancelled => CANCELLED,
        }
    }
}

impl StatusPalette for ProjectStatus {
    fn colors(self) -> ColorPair {
        match self {
            ProjectStatus::Accepted => ACCEPTED,
            ProjectStatus::NotStarted => NOT_STARTED,
            ProjectStatus::InProgress => IN_PROGRESS,
            ProjectStatus::UnderRevision => UNDER_REVISION,
            ProjectStatus::Delayed => DELAYED,
            ProjectStatus::Postponed => POSTPONED,
            ProjectStatus::Done => DONE,
            ProjectStatus::Cancelled => CANCELLED,
            ProjectStatus::InQuotation => IN_QUOTATION,
            ProjectStatus::Default => NO_STATUS,
        }
    }
}

impl StatusPalette for ExpenseReportStatus {
    fn colors(self) -> ColorPair {
        match self {
            ExpenseReportStatus::Pending => IN_PROGRESS,
            ExpenseReportStatus::Accepted => ACCEPTED,
            ExpenseReportStatus::Rejected => CANCELLED,
            ExpenseReportStatus::Payed => DONE,
        }
    }
}

pub fn status_style<S: StatusPalette>(status: S) -> Style {
    status.colors().style()
}

pub fn severity_style(severity: Severity) -> Style {
    let base = Style::default();
    match severity {
        Severity::Neutral => base,
        Severity::Info => base.fg(Color::Cyan),
        Severity::Success => base.fg(Color::Green),
        Severity::Warning => base.fg(Color::Yellow),
        Severity::Danger => base.fg(Color::Red).add_modifier(Modifier::BOLD),
    }
}
