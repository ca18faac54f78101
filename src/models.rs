// Data models for TodoStore

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

/// A single to-do record
///
/// Field names follow the persisted JSON layout (camelCase). `completed_at` is
/// set if and only if `completed` is true; the store enforces this on every
/// mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub important: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, with = "due_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, with = "blank_as_none")]
    pub category: Option<Category>,
    #[serde(default, with = "blank_as_none")]
    pub description: Option<String>,
}

impl Task {
    /// True when `completed` and `completed_at` agree
    pub fn is_consistent(&self) -> bool {
        self.completed == self.completed_at.is_some()
    }

    /// Canonicalize optional fields: known category labels map to their
    /// variant, blank categories and descriptions become absent
    pub fn normalize(&mut self) {
        self.category = self.category.take().and_then(Category::normalized);
        self.description = self.description.take().filter(|d| !d.trim().is_empty());
    }

    /// Bring `completed_at` in line with `completed`, stamping `at` when missing
    pub fn reconcile_completion(&mut self, at: DateTime<Utc>) {
        if self.completed {
            self.completed_at.get_or_insert(at);
        } else {
            self.completed_at = None;
        }
    }
}

/// Everything the caller chooses when adding a task
///
/// Ids, timestamps and completion are assigned by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub text: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub category: Option<Category>,
    pub description: Option<String>,
}

impl TaskDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_category(mut self, category: impl Into<Category>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Priority level of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Sort weight used by priority ordering (higher sorts first)
    pub fn weight(self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}

/// Classification label
///
/// The eight named variants are the known label set. Anything else is kept
/// verbatim as `Custom` so free-form categories survive load and export.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Work,
    Personal,
    Shopping,
    Health,
    Education,
    Finance,
    Home,
    Other,
    Custom(String),
}

impl Category {
    pub const KNOWN: [Category; 8] = [
        Category::Work,
        Category::Personal,
        Category::Shopping,
        Category::Health,
        Category::Education,
        Category::Finance,
        Category::Home,
        Category::Other,
    ];

    pub fn label(&self) -> &str {
        match self {
            Self::Work => "Work",
            Self::Personal => "Personal",
            Self::Shopping => "Shopping",
            Self::Health => "Health",
            Self::Education => "Education",
            Self::Finance => "Finance",
            Self::Home => "Home",
            Self::Other => "Other",
            Self::Custom(label) => label,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }

    /// `Custom` labels that spell a known label become that variant; blank
    /// labels become `None`
    pub fn normalized(self) -> Option<Category> {
        match self {
            Self::Custom(label) if label.trim().is_empty() => None,
            Self::Custom(label) => Some(Self::from(label)),
            known => Some(known),
        }
    }
}

impl From<&str> for Category {
    fn from(label: &str) -> Self {
        let label = label.trim();
        Self::KNOWN
            .into_iter()
            .find(|known| known.label().eq_ignore_ascii_case(label))
            .unwrap_or_else(|| Self::Custom(label.to_string()))
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        Self::from(label.as_str())
    }
}

impl AsRef<str> for Category {
    fn as_ref(&self) -> &str {
        self.label()
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for Category {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

/// Current UTC time
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Fresh unique task id (UUID v7, time-ordered)
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Parse a due date given either as `YYYY-MM-DD` or as a full ISO-8601 timestamp
///
/// Timestamps are read as the calendar date in the local time zone: older
/// data stored local midnight of the picked day as a UTC instant.
pub fn parse_due_date(s: &str) -> Option<NaiveDate> {
    parse_due_date_in(s, &Local)
}

/// `parse_due_date` with timestamps taken as dates in `tz`
pub fn parse_due_date_in<Tz: TimeZone>(s: &str, tz: &Tz) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, due_date::FORMAT).ok().or_else(|| {
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(tz).date_naive())
    })
}

/// `Option<NaiveDate>` as `"YYYY-MM-DD"` or null
pub(crate) mod due_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub(crate) const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&date.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => super::parse_due_date(s)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid due date: {}", s))),
        }
    }
}

/// Optional strings stored as `""` when absent
pub(crate) mod blank_as_none {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: AsRef<str>,
        S: Serializer,
    {
        serializer.serialize_str(value.as_ref().map(|v| v.as_ref()).unwrap_or(""))
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: From<String>,
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.filter(|s| !s.trim().is_empty()).map(T::from))
    }
}
