//! Enumerated status values for the entities whose status is managed by a
//! [`StatusWorkflow`](crate::application::StatusWorkflow).
//!
//! Every kind serializes to the human-readable strings the API speaks
//! ("In progress", "Payed", ...). Parsing is lenient: the wire string, the
//! SCREAMING_CASE name and any casing of either are accepted.

use super::errors::ValidationError;
use std::fmt;
use std::hash::Hash;

/// The entity kinds that carry a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Task,
    Project,
    ExpenseReport,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Task => "task",
            EntityKind::Project => "project",
            EntityKind::ExpenseReport => "expense report",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A closed set of status values belonging to one entity kind.
pub trait StatusValue: Copy + Eq + Hash + fmt::Debug + 'static {
    const KIND: EntityKind;

    /// Every value of the set, in display order.
    const ALL: &'static [Self];

    /// Value as sent to and received from the API.
    fn as_str(self) -> &'static str;

    /// SCREAMING_CASE identifier.
    fn name(self) -> &'static str;

    fn parse(raw: &str) -> Result<Self, ValidationError> {
        let wanted = normalize(raw);
        Self::ALL
            .iter()
            .copied()
            .find(|value| normalize(value.as_str()) == wanted || normalize(value.name()) == wanted)
            .ok_or_else(|| ValidationError::UnknownStatus {
                kind: Self::KIND.as_str(),
                value: raw.to_string(),
            })
    }

    /// Title-cased label for display ("Under Revision").
    fn label(self) -> String {
        self.as_str()
            .split(' ')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ")
    }

    /// The value following this one in [`ALL`](Self::ALL), wrapping around.
    fn next(self) -> Self {
        let index = Self::ALL.iter().position(|value| *value == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    /// The value preceding this one in [`ALL`](Self::ALL), wrapping around.
    fn previous(self) -> Self {
        let index = Self::ALL.iter().position(|value| *value == self).unwrap_or(0);
        Self::ALL[(index + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

fn normalize(raw: &str) -> String {
    raw.trim().replace('_', " ").to_lowercase()
}

macro_rules! status_enum {
    (
        $(#[$meta:meta])*
        $name:ident: $kind:expr, default $default:ident {
            $($variant:ident => ($screaming:literal, $wire:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $($variant),+
        }

        impl StatusValue for $name {
            const KIND: EntityKind = $kind;
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $screaming),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(raw: String) -> Result<Self, Self::Error> {
                <$name as StatusValue>::parse(&raw)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

status_enum! {
    /// Status of a task.
    TaskStatus: EntityKind::Task, default NotStarted {
        NotStarted => ("NOT_STARTED", "Not started"),
        InProgress => ("IN_PROGRESS", "In progress"),
        UnderRevision => ("UNDER_REVISION", "Under revision"),
        Delayed => ("DELAYED", "Delayed"),
        Postponed => ("POSTPONED", "Postponed"),
        Done => ("DONE", "Done"),
        Cancelled => ("CANCELLED", "Cancelled"),
    }
}

status_enum! {
    /// Status of a project. `Default` is the "no status yet" marker, sent as `-`.
    ProjectStatus: EntityKind::Project, default Default {
        Accepted => ("ACCEPTED", "Accepted"),
        NotStarted => ("NOT_STARTED", "Not started"),
        InProgress => ("IN_PROGRESS", "In progress"),
        UnderRevision => ("UNDER_REVISION", "Under revision"),
        Delayed => ("DELAYED", "Delayed"),
        Postponed => ("POSTPONED", "Postponed"),
        Done => ("DONE", "Done"),
        Cancelled => ("CANCELLED", "Cancelled"),
        InQuotation => ("IN_QUOTATION", "In quotation"),
        Default => ("DEFAULT", "-"),
    }
}

status_enum! {
    /// Status of an expense report.
    ExpenseReportStatus: EntityKind::ExpenseReport, default Pending {
        Pending => ("PENDING", "Pending"),
        Accepted => ("ACCEPTED", "Accepted"),
        Rejected => ("REJECTED", "Rejected"),
        Payed => ("PAYED", "Payed"),
    }
}
