use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use tracing::info;
use tracing_subscriber::EnvFilter;

use todostore::cli::{Cli, Command};
use todostore::config::Config;
use todostore::{Category, Persistence, Priority, Stats, Task, TaskDraft, TodoStore, View};

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    setup_logging();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    if let Some(store_path) = cli.store_path {
        config.store_path = store_path;
    }

    let persistence = Persistence::open(config.backend, &config.store_path)
        .context(format!("Failed to open store at {}", config.store_path.display()))?;
    let mut store = TodoStore::open(persistence);
    info!(path = ?config.store_path, backend = %config.backend, count = store.len(), "todo starting");

    match cli.command {
        Command::Add {
            text,
            priority,
            due,
            category,
            description,
        } => {
            let draft = TaskDraft {
                text: text.join(" "),
                due_date: due,
                priority,
                category,
                description,
            };
            let id = store.add(draft)?;
            println!("{} Added task {}", "✓".green(), id.cyan());
        }
        Command::List { filter, sort, search } => {
            let view = View {
                filter: filter.unwrap_or(config.default_filter),
                search,
                sort: sort.unwrap_or(config.default_sort),
            };
            let tasks = store.project(&view);
            if tasks.is_empty() {
                println!("No tasks found");
            } else {
                for task in tasks {
                    print_task(task);
                }
            }
        }
        Command::Done { id } => {
            let id = store.find_by_prefix(&id)?.id.clone();
            if store.toggle_completed(&id)? {
                println!("{} Completed {}", "✓".green(), id.cyan());
            } else {
                println!("{} Reopened {}", "↺".yellow(), id.cyan());
            }
        }
        Command::Important { id } => {
            let id = store.find_by_prefix(&id)?.id.clone();
            if store.toggle_important(&id)? {
                println!("{} Marked {} important", "!".red().bold(), id.cyan());
            } else {
                println!("{} Unmarked {} important", "✓".green(), id.cyan());
            }
        }
        Command::Edit {
            id,
            text,
            priority,
            due,
            clear_due,
            category,
            description,
        } => {
            let mut task = store.find_by_prefix(&id)?.clone();
            if let Some(text) = text {
                task.text = text;
            }
            if let Some(priority) = priority {
                task.priority = priority;
                task.important = priority == Priority::High;
            }
            if clear_due {
                task.due_date = None;
            } else if due.is_some() {
                task.due_date = due;
            }
            if let Some(category) = category {
                task.category = (!category.trim().is_empty()).then(|| Category::from(category));
            }
            if let Some(description) = description {
                task.description = (!description.trim().is_empty()).then_some(description);
            }

            let id = task.id.clone();
            store.update(task)?;
            println!("{} Updated {}", "✓".green(), id.cyan());
        }
        Command::Delete { id } => {
            let id = store.find_by_prefix(&id)?.id.clone();
            store.delete(&id)?;
            println!("{} Deleted {}", "✓".green(), id.cyan());
        }
        Command::Clear { yes } => {
            if !yes {
                return Err(eyre!("Refusing to delete {} tasks without --yes", store.len()));
            }
            store.clear()?;
            println!("{} Deleted all tasks", "✓".green());
        }
        Command::Stats { json } => {
            let stats = store.stats();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats(&stats);
            }
        }
        Command::Export { output, format } => {
            store
                .export_file(&output, format)
                .context(format!("Failed to export to {}", output.display()))?;
            println!("{} Exported {} tasks to {}", "✓".green(), store.len(), output.display());
        }
        Command::Import { file } => {
            let count = store.import_file(&file)?;
            println!("{} Imported {} tasks from {}", "✓".green(), count, file.display());
        }
        Command::Config { write } => match write {
            Some(path) => {
                config.save(&path)?;
                println!("{} Wrote configuration to {}", "✓".green(), path.display());
            }
            None => print!("{}", serde_yaml::to_string(&config)?),
        },
    }

    Ok(())
}

fn print_task(task: &Task) {
    let check = if task.completed { "[x]".green() } else { "[ ]".normal() };
    let flag = if task.important { "!".red().bold() } else { " ".normal() };
    let text = if task.completed {
        task.text.dimmed().strikethrough()
    } else {
        task.text.bold()
    };
    let priority = match task.priority {
        Priority::High => "high".red(),
        Priority::Medium => "medium".yellow(),
        Priority::Low => "low".green(),
    };

    let mut details = vec![priority.to_string()];
    if let Some(category) = &task.category {
        details.push(category.to_string().magenta().to_string());
    }
    if let Some(due) = task.due_date {
        details.push(format!("due {}", due.format("%Y-%m-%d")));
    }

    println!("{} {} {}  ({})  {}", check, flag, text, details.join(", "), task.id.dimmed());
    if let Some(description) = &task.description {
        println!("      {}", description.italic());
    }
}

fn print_stats(stats: &Stats) {
    println!(
        "Total: {}  Active: {}  Completed: {}  Important: {}",
        stats.total.to_string().cyan(),
        stats.active.to_string().yellow(),
        stats.completed.to_string().green(),
        stats.important.to_string().red()
    );
    println!("Completion: {:.1}%", stats.completion_rate);
    println!(
        "By priority: high {}, medium {}, low {}",
        stats.by_priority.high, stats.by_priority.medium, stats.by_priority.low
    );
    println!("By category:");
    for entry in &stats.by_category {
        println!("  {:<12} {}", entry.category.label(), entry.count);
    }
}
