// CLI argument parsing for the `todo` binary

use crate::codec::Layout;
use crate::filter::{SortKey, StatusFilter};
use crate::models::{Category, Priority};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "todo")]
#[command(author, version, about = "Personal task list with local persistence", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Store directory (overrides the config file)
    #[arg(short, long)]
    pub store_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a task
    Add {
        /// Task text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// high, medium or low (high also marks the task important)
        #[arg(short, long, default_value_t = Priority::Medium)]
        priority: Priority,

        /// Due date (YYYY-MM-DD)
        #[arg(short, long, value_parser = parse_date)]
        due: Option<NaiveDate>,

        /// Category label (Work, Personal, Shopping, Health, Education, Finance, Home, Other)
        #[arg(short = 'g', long)]
        category: Option<Category>,

        /// Longer description
        #[arg(short = 'm', long)]
        description: Option<String>,
    },

    /// List tasks
    List {
        /// all, active or completed
        #[arg(short, long)]
        filter: Option<StatusFilter>,

        /// date, priority or alphabetical
        #[arg(short = 'o', long)]
        sort: Option<SortKey>,

        /// Case-insensitive text search
        #[arg(short = 'q', long, default_value = "")]
        search: String,
    },

    /// Toggle a task between done and not done
    Done {
        /// Task id or unique id prefix
        id: String,
    },

    /// Toggle the important flag
    Important {
        /// Task id or unique id prefix
        id: String,
    },

    /// Edit fields of a task
    Edit {
        /// Task id or unique id prefix
        id: String,

        /// New text
        #[arg(short, long)]
        text: Option<String>,

        #[arg(short, long)]
        priority: Option<Priority>,

        /// New due date (YYYY-MM-DD)
        #[arg(short, long, value_parser = parse_date, conflicts_with = "clear_due")]
        due: Option<NaiveDate>,

        /// Remove the due date
        #[arg(long)]
        clear_due: bool,

        /// New category; pass an empty string to remove it
        #[arg(short = 'g', long)]
        category: Option<String>,

        /// New description; pass an empty string to remove it
        #[arg(short = 'm', long)]
        description: Option<String>,
    },

    /// Delete a task
    Delete {
        /// Task id or unique id prefix
        id: String,
    },

    /// Delete all tasks
    Clear {
        /// Skip the confirmation guard
        #[arg(long)]
        yes: bool,
    },

    /// Show statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export all tasks to a JSON file
    Export {
        /// Output file
        #[arg(short, long, default_value = crate::codec::EXPORT_FILE_NAME)]
        output: PathBuf,

        /// versioned, or array for readers of the bare-array layout
        #[arg(long, default_value_t = Layout::Versioned)]
        format: Layout,
    },

    /// Replace all tasks with the contents of a JSON file
    Import {
        /// Input file
        file: PathBuf,
    },

    /// Show the effective configuration
    Config {
        /// Write it to this file instead of printing it
        #[arg(long)]
        write: Option<PathBuf>,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    crate::models::parse_due_date(s).ok_or_else(|| format!("Invalid date: {} (expected YYYY-MM-DD)", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add() {
        let cli = Cli::try_parse_from([
            "todo", "add", "Pay", "rent", "-p", "high", "--due", "2024-04-01", "-g", "finance",
        ])
        .unwrap();

        match cli.command {
            Command::Add {
                text,
                priority,
                due,
                category,
                description,
            } => {
                assert_eq!(text.join(" "), "Pay rent");
                assert_eq!(priority, Priority::High);
                assert_eq!(due, NaiveDate::from_ymd_opt(2024, 4, 1));
                assert_eq!(category, Some(Category::Finance));
                assert_eq!(description, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_list_options() {
        let cli = Cli::try_parse_from(["todo", "list", "-f", "active", "-o", "priority", "-q", "milk"]).unwrap();

        match cli.command {
            Command::List { filter, sort, search } => {
                assert_eq!(filter, Some(StatusFilter::Active));
                assert_eq!(sort, Some(SortKey::Priority));
                assert_eq!(search, "milk");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_export_format() {
        let cli = Cli::try_parse_from(["todo", "export"]).unwrap();
        match cli.command {
            Command::Export { output, format } => {
                assert_eq!(output, PathBuf::from(crate::codec::EXPORT_FILE_NAME));
                assert_eq!(format, Layout::Versioned);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["todo", "export", "--format", "array", "-o", "out.json"]).unwrap();
        assert!(matches!(cli.command, Command::Export { format: Layout::Array, .. }));
        assert!(Cli::try_parse_from(["todo", "export", "--format", "csv"]).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert!(Cli::try_parse_from(["todo", "add", "x", "-p", "urgent"]).is_err());
        assert!(Cli::try_parse_from(["todo", "add", "x", "--due", "tomorrow"]).is_err());
        assert!(Cli::try_parse_from(["todo", "list", "-f", "done"]).is_err());
    }
}
