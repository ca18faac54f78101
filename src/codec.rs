// JSON import/export codec
//
// The persisted slot and the default export share one layout: a pretty-printed
// envelope `{"version": N, "todos": [...]}`. A bare JSON array is the legacy
// (unversioned) layout; it is always accepted on read and can be requested
// for exports meant for older readers.

use crate::error::ImportError;
use crate::models::{self, Category, Priority, Task};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Schema version written by `serialize`
pub const SCHEMA_VERSION: u32 = 1;

/// Default file name for exports
pub const EXPORT_FILE_NAME: &str = "todos.json";

/// On-disk shape of a serialized collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Layout {
    /// `{"version": N, "todos": [...]}`
    #[default]
    Versioned,
    /// Bare JSON array of tasks
    Array,
}

impl std::fmt::Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Versioned => write!(f, "versioned"),
            Self::Array => write!(f, "array"),
        }
    }
}

impl std::str::FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "versioned" => Ok(Self::Versioned),
            "array" | "legacy" => Ok(Self::Array),
            _ => Err(format!("Unknown layout: {}", s)),
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    version: u32,
    todos: Vec<&'a Task>,
}

/// Lenient view of an imported task: only `text` is required
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    #[serde(default)]
    id: Option<String>,
    text: String,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    important: bool,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::models::due_date")]
    due_date: Option<NaiveDate>,
    #[serde(default)]
    priority: Option<Priority>,
    #[serde(default, with = "crate::models::blank_as_none")]
    category: Option<Category>,
    #[serde(default, with = "crate::models::blank_as_none")]
    description: Option<String>,
}

impl TaskRecord {
    fn into_task(self, at: DateTime<Utc>) -> Task {
        let mut task = Task {
            id: self
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(models::new_id),
            text: self.text,
            completed: self.completed,
            important: self.important,
            created_at: self.created_at.unwrap_or(at),
            completed_at: self.completed_at,
            due_date: self.due_date,
            priority: self.priority.unwrap_or_default(),
            category: self.category,
            description: self.description,
        };
        task.reconcile_completion(at);
        task
    }
}

/// Serialize tasks, in the given order, as pretty-printed JSON (2-space indent)
pub fn serialize<'a, I>(tasks: I) -> Result<String, serde_json::Error>
where
    I: IntoIterator<Item = &'a Task>,
{
    serialize_as(tasks, Layout::Versioned)
}

/// `serialize` with an explicit layout
pub fn serialize_as<'a, I>(tasks: I, layout: Layout) -> Result<String, serde_json::Error>
where
    I: IntoIterator<Item = &'a Task>,
{
    let todos: Vec<&Task> = tasks.into_iter().collect();
    match layout {
        Layout::Versioned => serde_json::to_string_pretty(&Envelope {
            version: SCHEMA_VERSION,
            todos,
        }),
        Layout::Array => serde_json::to_string_pretty(&todos),
    }
}

/// Parse a serialized collection
///
/// All-or-nothing: the first element that is not an object with a string
/// `text` field, or whose other fields have the wrong type, fails the whole
/// parse. Missing ids and creation times are filled in, and `completedAt` is
/// reconciled with `completed`.
pub fn parse(text: &str) -> Result<Vec<Task>, ImportError> {
    let value: Value = serde_json::from_str(text)?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let version = map
                .get("version")
                .and_then(Value::as_u64)
                .ok_or(ImportError::NotAnArray("an object without a schema version"))?;
            if version > u64::from(SCHEMA_VERSION) {
                return Err(ImportError::UnsupportedVersion {
                    found: version,
                    supported: SCHEMA_VERSION,
                });
            }
            match map.remove("todos") {
                Some(Value::Array(items)) => items,
                Some(other) => return Err(ImportError::NotAnArray(kind(&other))),
                None => return Err(ImportError::NotAnArray("an object without `todos`")),
            }
        }
        other => return Err(ImportError::NotAnArray(kind(&other))),
    };

    let at = models::now();
    let tasks = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| parse_task(index, item, at))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(count = tasks.len(), "Parsed tasks");
    Ok(tasks)
}

fn parse_task(index: usize, item: Value, at: DateTime<Utc>) -> Result<Task, ImportError> {
    if !item.get("text").is_some_and(Value::is_string) {
        return Err(ImportError::InvalidRecord {
            index,
            reason: "missing string field `text`".to_string(),
        });
    }

    let record: TaskRecord = serde_json::from_value(item).map_err(|e| ImportError::InvalidRecord {
        index,
        reason: e.to_string(),
    })?;

    Ok(record.into_task(at))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, text: &str) -> Task {
        Task {
            id: id.to_string(),
            text: text.to_string(),
            completed: false,
            important: false,
            created_at: "2024-03-01T09:30:00Z".parse().unwrap(),
            completed_at: None,
            due_date: None,
            priority: Priority::Medium,
            category: None,
            description: None,
        }
    }

    #[test]
    fn test_serialize_is_pretty_and_versioned() {
        let tasks = vec![task("t1", "Buy milk")];
        let json = serialize(&tasks).unwrap();

        assert!(json.starts_with("{\n  \"version\": 1,\n  \"todos\": [\n    {\n      \"id\": \"t1\""));
    }

    #[test]
    fn test_serialize_array_layout() {
        let tasks = vec![task("t1", "Buy milk"), task("t2", "Pay rent")];
        let json = serialize_as(&tasks, Layout::Array).unwrap();

        assert!(json.starts_with("[\n  {\n    \"id\": \"t1\""));
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));
        assert_eq!(parse(&json).unwrap(), tasks);
    }

    #[test]
    fn test_layout_parse() {
        assert_eq!("array".parse::<Layout>().unwrap(), Layout::Array);
        assert_eq!("Versioned".parse::<Layout>().unwrap(), Layout::Versioned);
        assert!("yaml".parse::<Layout>().is_err());
        assert_eq!(Layout::default(), Layout::Versioned);
    }

    #[test]
    fn test_serialize_then_parse_keeps_records() {
        let mut done = task("t2", "Pay rent");
        done.completed = true;
        done.completed_at = Some("2024-03-02T10:00:00Z".parse().unwrap());
        done.priority = Priority::High;
        done.important = true;
        done.category = Some(Category::Finance);
        done.due_date = NaiveDate::from_ymd_opt(2024, 3, 5);
        done.description = Some("before the 5th".to_string());

        let tasks = vec![task("t1", "Buy milk"), done];
        let parsed = parse(&serialize(&tasks).unwrap()).unwrap();
        assert_eq!(parsed, tasks);
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        let err = parse("not valid json").unwrap_err();
        assert!(matches!(err, ImportError::Json(_)));
    }

    #[test]
    fn test_parse_rejects_non_array() {
        let err = parse(r#""hello""#).unwrap_err();
        assert!(matches!(err, ImportError::NotAnArray("a string")));

        let err = parse(r#"{"todos": []}"#).unwrap_err();
        assert!(matches!(err, ImportError::NotAnArray(_)));

        let err = parse(r#"{"version": 1, "todos": {}}"#).unwrap_err();
        assert!(matches!(err, ImportError::NotAnArray("an object")));
    }

    #[test]
    fn test_parse_rejects_future_version() {
        let err = parse(r#"{"version": 7, "todos": []}"#).unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedVersion { found: 7, .. }));
    }

    #[test]
    fn test_parse_rejects_record_without_text() {
        let err = parse(r#"[{"text": "ok"}, {"id": "x"}, {"text": 5}]"#).unwrap_err();
        match err {
            ImportError::InvalidRecord { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_rejects_badly_typed_field() {
        let err = parse(r#"[{"text": "ok", "completed": "yes"}]"#).unwrap_err();
        assert!(matches!(err, ImportError::InvalidRecord { index: 0, .. }));
    }

    #[test]
    fn test_parse_legacy_array() {
        let json = r#"[
          {
            "id": "1709285400000",
            "text": "Call mom",
            "completed": true,
            "important": false,
            "createdAt": "2024-03-01T09:30:00.000Z",
            "completedAt": "2024-03-01T12:00:00.000Z",
            "dueDate": null,
            "category": "Personal",
            "description": ""
          },
          {
            "id": "1709285400001",
            "text": "Renew passport",
            "completed": false,
            "important": true,
            "createdAt": "2024-03-01T09:31:00.000Z",
            "dueDate": "2024-06-01T00:00:00.000Z",
            "category": "Paperwork",
            "description": "bring photos"
          }
        ]"#;

        let tasks = parse(json).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, "1709285400000");
        assert_eq!(tasks[0].category, Some(Category::Personal));
        assert_eq!(tasks[0].priority, Priority::Medium);
        assert!(tasks[0].completed_at.is_some());
        assert_eq!(tasks[1].category, Some(Category::Custom("Paperwork".to_string())));
        assert_eq!(
            tasks[1].due_date,
            models::parse_due_date_in("2024-06-01T00:00:00.000Z", &chrono::Local)
        );
        assert_eq!(tasks[1].description.as_deref(), Some("bring photos"));
    }

    #[test]
    fn test_parse_fills_missing_fields() {
        let tasks = parse(r#"[{"text": "Bare"}, {"text": "Done", "completed": true}, {"text": "Undone", "completedAt": "2024-03-01T12:00:00Z"}]"#).unwrap();

        assert_eq!(tasks.len(), 3);
        assert!(!tasks[0].id.is_empty());
        assert_ne!(tasks[0].id, tasks[1].id);
        assert!(tasks[1].completed_at.is_some());
        assert!(tasks[2].completed_at.is_none());
        assert!(tasks.iter().all(Task::is_consistent));
    }
}
