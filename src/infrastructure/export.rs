use crate::domain::{format_due_date, ProjectGroup, StatusValue};
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub struct CsvExporter;

impl CsvExporter {
    pub const HEADER: [&'static str; 5] = ["project", "task", "status", "hours", "due_date"];

    /// Writes one row per task, in board order. Returns the file name written.
    pub fn export_groups(groups: &[ProjectGroup], filename: &str) -> Result<String, ExportError> {
        let file = std::fs::File::create(Path::new(filename))?;
        Self::write_groups(groups, file)?;
        Ok(filename.to_string())
    }

    pub fn write_groups<W: io::Write>(groups: &[ProjectGroup], writer: W) -> Result<(), ExportError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(Self::HEADER)?;
        for group in groups {
            for task in &group.tasks {
                let hours = task.worked_hours.unwrap_or(0.0).to_string();
                let due = format_due_date(task.end_date.as_deref());
                csv_writer.write_record([
                    group.project.name.as_str(),
                    task.title.as_str(),
                    task.status.as_str(),
                    hours.as_str(),
                    due.as_str(),
                ])?;
            }
        }
        csv_writer.flush()?;
        Ok(())
    }
}
