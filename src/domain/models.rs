use super::errors::ValidationError;
use super::services::parse_due_date;
use super::status::{ExpenseReportStatus, ProjectStatus, TaskStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(rename = "idProject")]
    pub project_id: String,
    #[serde(default, rename = "idEmployee")]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub worked_hours: Option<f64>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            status: TaskStatus::default(),
            project_id: project_id.into(),
            employee_id: None,
            start_date: None,
            end_date: None,
            worked_hours: None,
        }
    }

    pub fn with_due_date(mut self, end_date: impl Into<String>) -> Self {
        self.end_date = Some(end_date.into());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_worked_hours(mut self, hours: f64) -> Self {
        self.worked_hours = Some(hours);
        self
    }
}

/// Fields of a task as entered for creation or editing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub start_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    pub status: TaskStatus,
    pub worked_hours: f64,
    #[serde(rename = "idProject")]
    pub project_id: String,
    #[serde(rename = "idEmployee", skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
}

impl TaskDraft {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        project_id: impl Into<String>,
        start_date: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            start_date: start_date.into(),
            end_date: None,
            status: TaskStatus::default(),
            worked_hours: 0.0,
            project_id: project_id.into(),
            employee_id: None,
        }
    }

    /// Prefills the form from an existing task.
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            start_date: task.start_date.clone().unwrap_or_default(),
            end_date: task.end_date.clone(),
            status: task.status,
            worked_hours: task.worked_hours.unwrap_or(0.0),
            project_id: task.project_id.clone(),
            employee_id: task.employee_id.clone(),
        }
    }

    pub fn with_end_date(mut self, end_date: impl Into<String>) -> Self {
        self.end_date = Some(end_date.into());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_worked_hours(mut self, hours: f64) -> Self {
        self.worked_hours = hours;
        self
    }

    pub fn with_employee(mut self, employee_id: impl Into<String>) -> Self {
        self.employee_id = Some(employee_id.into());
        self
    }

    /// Checks the draft the way the task form does before sending it.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("Title", &self.title),
            ("Description", &self.description),
            ("Start date", &self.start_date),
            ("Project", &self.project_id),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField { field });
            }
        }

        let start = parse_due_date(&self.start_date).ok_or(ValidationError::InvalidField {
            field: "Start date",
            reason: "is not a valid date",
        })?;
        if let Some(end_date) = self.end_date.as_deref().filter(|date| !date.trim().is_empty()) {
            let end = parse_due_date(end_date).ok_or(ValidationError::InvalidField {
                field: "End date",
                reason: "is not a valid date",
            })?;
            if end < start {
                return Err(ValidationError::InvalidField {
                    field: "End date",
                    reason: "must not be before the start date",
                });
            }
        }
        if !self.worked_hours.is_finite() || self.worked_hours < 0.0 {
            return Err(ValidationError::InvalidField {
                field: "Worked hours",
                reason: "must not be negative",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
    #[serde(default, rename = "idCompany")]
    pub client_id: Option<String>,
    #[serde(default)]
    pub total_hours: Option<f64>,
    #[serde(default)]
    pub is_chargeable: Option<bool>,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: None,
            client_id: None,
            total_hours: None,
            is_chargeable: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseReport {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ExpenseReportStatus,
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub url_voucher: Option<String>,
    #[serde(default)]
    pub employee_first_name: Option<String>,
    #[serde(default)]
    pub employee_last_name: Option<String>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
}

impl ExpenseReport {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            status: ExpenseReportStatus::default(),
            total_amount: None,
            start_date: None,
            url_voucher: None,
            employee_first_name: None,
            employee_last_name: None,
            expenses: Vec::new(),
        }
    }

    pub fn has_voucher(&self) -> bool {
        self.url_voucher.as_deref().is_some_and(|url| !url.trim().is_empty())
    }
}

/// Role of the signed-in employee, as reported by the API. Unknown roles
/// collapse to `WithoutRole`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum EmployeeRole {
    Admin,
    Accounting,
    Legal,
    #[default]
    WithoutRole,
}

impl EmployeeRole {
    pub fn as_str(self) -> &'static str {
        match self {
            EmployeeRole::Admin => "Admin",
            EmployeeRole::Accounting => "Accounting",
            EmployeeRole::Legal => "Legal",
            EmployeeRole::WithoutRole => "No role",
        }
    }

    /// Whether the role may change an expense report's status.
    pub fn manages_expenses(self) -> bool {
        matches!(self, EmployeeRole::Admin | EmployeeRole::Accounting)
    }
}

impl From<String> for EmployeeRole {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "admin" => EmployeeRole::Admin,
            "accounting" => EmployeeRole::Accounting,
            "legal" => EmployeeRole::Legal,
            _ => EmployeeRole::WithoutRole,
        }
    }
}

impl From<EmployeeRole> for String {
    fn from(role: EmployeeRole) -> String {
        role.as_str().to_string()
    }
}

/// Tasks of one project, as shown on the task board.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectGroup {
    pub project: Project,
    pub tasks: Vec<Task>,
}

impl ProjectGroup {
    pub fn total_hours(&self) -> f64 {
        self.tasks.iter().map(|task| task.worked_hours.unwrap_or(0.0)).sum()
    }
}
