//! Pure helpers that derive view data from loaded entities: grouping tasks
//! by project, ordering by due date, filtering expense reports and
//! formatting names and dates.

use super::models::{ExpenseReport, Project, ProjectGroup, Task};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::cmp::Ordering;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Groups `tasks` under the project they reference.
///
/// Each group's tasks are ordered by ascending due date, with missing or
/// unparseable dates last and ties kept in input order. Groups are ordered
/// by project name and projects without tasks are dropped.
///
/// # Examples
///
/// ```
/// use bizdesk::domain::{group_tasks_by_project, Project, Task};
///
/// let tasks = vec![
///     Task::new("1", "Draft", "P1").with_due_date("2024-01-10"),
///     Task::new("2", "Review", "P1").with_due_date("2024-01-05"),
/// ];
/// let projects = vec![Project::new("P1", "Acme")];
///
/// let groups = group_tasks_by_project(&tasks, &projects);
/// assert_eq!(groups.len(), 1);
/// assert_eq!(groups[0].tasks[0].id, "2");
/// ```
pub fn group_tasks_by_project(tasks: &[Task], projects: &[Project]) -> Vec<ProjectGroup> {
    let mut ordered: Vec<&Project> = projects.iter().collect();
    ordered.sort_by(|a, b| compare_names(&a.name, &b.name));

    ordered
        .into_iter()
        .filter_map(|project| {
            let mut project_tasks: Vec<Task> = tasks
                .iter()
                .filter(|task| task.project_id == project.id)
                .cloned()
                .collect();
            if project_tasks.is_empty() {
                return None;
            }
            sort_by_due_date(&mut project_tasks);
            Some(ProjectGroup {
                project: project.clone(),
                tasks: project_tasks,
            })
        })
        .collect()
}

/// Stable ascending sort by due date; tasks without a valid date go last.
pub fn sort_by_due_date(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        let a = a.end_date.as_deref().and_then(parse_due_date);
        let b = b.end_date.as_deref().and_then(parse_due_date);
        match (a, b) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}

/// Name ordering in the manner of a locale collation, in three levels:
/// base letters ignoring accents and case, then accents (unaccented
/// first), then case (lowercase first).
///
/// ```
/// use bizdesk::domain::compare_names;
/// use std::cmp::Ordering;
///
/// assert_eq!(compare_names("Órbita", "Zeta"), Ordering::Less);
/// assert_eq!(compare_names("angel", "Ángel"), Ordering::Less);
/// ```
pub fn compare_names(a: &str, b: &str) -> Ordering {
    fold_name(a)
        .cmp(&fold_name(b))
        .then_with(|| lower_decomposed(a).cmp(&lower_decomposed(b)))
        .then_with(|| b.nfd().cmp(a.nfd()))
}

/// Lowercase base letters with accents removed: "Ángel" -> "angel".
fn fold_name(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn lower_decomposed(name: &str) -> String {
    name.nfd().flat_map(char::to_lowercase).collect()
}

/// Parses the date formats the API emits: RFC 3339 timestamps, naive
/// timestamps and plain `YYYY-MM-DD` dates.
pub fn parse_due_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.naive_utc());
    }
    if let Ok(timestamp) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(timestamp);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// `DD-MM-YYYY`, "No due date" when absent, or the raw text when it cannot
/// be parsed.
pub fn format_due_date(raw: Option<&str>) -> String {
    match raw {
        None => "No due date".to_string(),
        Some(text) if text.trim().is_empty() => "No due date".to_string(),
        Some(text) => match parse_due_date(text) {
            Some(timestamp) => timestamp.format("%d-%m-%Y").to_string(),
            None => text.to_string(),
        },
    }
}

/// Reports whose employee first or last name contains `term`, ignoring
/// case and accents.
pub fn filter_expenses_by_employee<'a>(reports: &'a [ExpenseReport], term: &str) -> Vec<&'a ExpenseReport> {
    let needle = fold_name(term.trim());
    reports
        .iter()
        .filter(|report| {
            if needle.is_empty() {
                return true;
            }
            [&report.employee_first_name, &report.employee_last_name]
                .into_iter()
                .flatten()
                .any(|name| fold_name(name).contains(&needle))
        })
        .collect()
}

/// First word of each name, e.g. "Ana Maria" + "Lopez Garcia" -> "Ana Lopez".
pub fn short_employee_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let first = first?.split_whitespace().next()?;
    let last = last?.split_whitespace().next()?;
    Some(format!("{first} {last}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(group: &ProjectGroup) -> Vec<&str> {
        group.tasks.iter().map(|task| task.id.as_str()).collect()
    }

    #[test]
    fn test_single_project_sorted_by_due_date() {
        let tasks = vec![
            Task::new("1", "a", "P1").with_due_date("2024-01-10"),
            Task::new("2", "b", "P1").with_due_date("2024-01-05"),
        ];
        let projects = vec![Project::new("P1", "Acme")];

        let groups = group_tasks_by_project(&tasks, &projects);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].project.name, "Acme");
        assert_eq!(ids(&groups[0]), vec!["2", "1"]);
    }

    #[test]
    fn test_groups_sorted_by_name_and_empty_groups_dropped() {
        let tasks = vec![
            Task::new("1", "a", "P2"),
            Task::new("2", "b", "P1"),
            Task::new("3", "c", "P9"),
        ];
        let projects = vec![
            Project::new("P1", "Zeta"),
            Project::new("P2", "alpha"),
            Project::new("P3", "Beta"),
        ];

        let groups = group_tasks_by_project(&tasks, &projects);
        let names: Vec<&str> = groups.iter().map(|group| group.project.name.as_str()).collect();

        assert_eq!(names, vec!["alpha", "Zeta"]);
    }

    #[test]
    fn test_missing_and_invalid_dates_sort_last_in_input_order() {
        let tasks = vec![
            Task::new("none", "a", "P1"),
            Task::new("bad", "b", "P1").with_due_date("next tuesday"),
            Task::new("late", "c", "P1").with_due_date("2024-03-01T10:00:00.000Z"),
            Task::new("early", "d", "P1").with_due_date("2024-02-01"),
        ];
        let projects = vec![Project::new("P1", "Acme")];

        let groups = group_tasks_by_project(&tasks, &projects);

        assert_eq!(ids(&groups[0]), vec!["early", "late", "none", "bad"]);
    }

    #[test]
    fn test_equal_dates_keep_input_order() {
        let tasks = vec![
            Task::new("x", "a", "P1").with_due_date("2024-01-05"),
            Task::new("y", "b", "P1").with_due_date("2024-01-05T00:00:00Z"),
        ];
        let groups = group_tasks_by_project(&tasks, &[Project::new("P1", "Acme")]);
        assert_eq!(ids(&groups[0]), vec!["x", "y"]);
    }

    #[test]
    fn test_grouping_is_idempotent() {
        let tasks = vec![
            Task::new("1", "a", "P1").with_due_date("2024-05-01"),
            Task::new("2", "b", "P2").with_due_date("2024-01-01"),
            Task::new("3", "c", "P1"),
            Task::new("4", "d", "P1").with_due_date("2023-12-31"),
        ];
        let projects = vec![Project::new("P2", "Beta"), Project::new("P1", "Acme")];

        let first = group_tasks_by_project(&tasks, &projects);
        let flattened: Vec<Task> = first.iter().flat_map(|group| group.tasks.clone()).collect();
        let second = group_tasks_by_project(&flattened, &projects);

        assert_eq!(first, second);
        assert_eq!(first, group_tasks_by_project(&tasks, &projects));
    }

    #[test]
    fn test_compare_names_is_case_insensitive_first() {
        assert_eq!(compare_names("acme", "Beta"), Ordering::Less);
        assert_eq!(compare_names("Zed", "alpha"), Ordering::Greater);
        assert_eq!(compare_names("acme", "Acme"), Ordering::Less);
        assert_eq!(compare_names("Acme", "Acme"), Ordering::Equal);
    }

    #[test]
    fn test_accented_names_sort_with_their_base_letter() {
        assert_eq!(compare_names("Ábaco", "Zeta"), Ordering::Less);
        assert_eq!(compare_names("Ñandú", "Oso"), Ordering::Less);
        assert_eq!(compare_names("Ñandú", "Mango"), Ordering::Greater);
        assert_eq!(compare_names("Ángel", "angel"), Ordering::Greater);
        assert_eq!(compare_names("Ángel", "ángel"), Ordering::Greater);
        assert_eq!(compare_names("Ángel", "Angela"), Ordering::Less);

        let tasks = vec![Task::new("1", "a", "z"), Task::new("2", "b", "o")];
        let projects = vec![Project::new("z", "Zeta"), Project::new("o", "Órbita")];
        let names: Vec<String> = group_tasks_by_project(&tasks, &projects)
            .into_iter()
            .map(|group| group.project.name)
            .collect();
        assert_eq!(names, ["Órbita", "Zeta"]);
    }

    #[test]
    fn test_parse_due_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(parse_due_date("2024-01-10"), Some(expected));
        assert_eq!(parse_due_date("2024-01-10T00:00:00.000Z"), Some(expected));
        assert_eq!(parse_due_date("2024-01-10T00:00:00"), Some(expected));
        assert_eq!(parse_due_date(""), None);
        assert_eq!(parse_due_date("2024-13-40"), None);
    }

    #[test]
    fn test_format_due_date() {
        assert_eq!(format_due_date(Some("2024-01-05")), "05-01-2024");
        assert_eq!(format_due_date(None), "No due date");
        assert_eq!(format_due_date(Some(" ")), "No due date");
        assert_eq!(format_due_date(Some("soon")), "soon");
    }

    #[test]
    fn test_filter_expenses_by_employee() {
        let mut ana = ExpenseReport::new("1", "Trip");
        ana.employee_first_name = Some("Ana".to_string());
        ana.employee_last_name = Some("López".to_string());
        let mut bruno = ExpenseReport::new("2", "Dinner");
        bruno.employee_first_name = Some("Bruno".to_string());
        let anonymous = ExpenseReport::new("3", "Taxi");
        let reports = vec![ana, bruno, anonymous];

        let found: Vec<&str> = filter_expenses_by_employee(&reports, "LOP")
            .into_iter()
            .map(|report| report.id.as_str())
            .collect();
        assert_eq!(found, vec!["1"]);
        assert_eq!(filter_expenses_by_employee(&reports, "lópez").len(), 1);
        assert_eq!(filter_expenses_by_employee(&reports, "").len(), 3);
        assert!(filter_expenses_by_employee(&reports, "zoe").is_empty());
    }

    #[test]
    fn test_short_employee_name() {
        assert_eq!(
            short_employee_name(Some("Ana Maria"), Some("Lopez Garcia")),
            Some("Ana Lopez".to_string())
        );
        assert_eq!(short_employee_name(Some("Ana"), None), None);
        assert_eq!(short_employee_name(Some("  "), Some("Lopez")), None);
    }
}
