//! `lingo tasks` - 태스크 저장소 조회/삭제

use crate::cli::format_event;
use crate::TasksCommand;
use lingo_foundation::LingoConfig;
use lingo_task::{TaskId, TaskRecord, TaskStore, TaskSummary};

pub fn handle(config: &LingoConfig, action: TasksCommand) -> anyhow::Result<()> {
    let store = TaskStore::new(config.server.tasks_dir());
    match action {
        TasksCommand::List => {
            let tasks = store.list()?;
            if tasks.is_empty() {
                println!("No tasks in {}", store.dir().display());
            }
            for task in &tasks {
                println!("{}", summary_line(task));
            }
        }
        TasksCommand::Show { id } => {
            let id: TaskId = id.parse()?;
            print_record(&store.require(&id)?);
        }
        TasksCommand::Delete { id } => {
            let id: TaskId = id.parse()?;
            if store.delete(&id)? {
                println!("Deleted task {}", id);
            } else {
                anyhow::bail!("task {} not found", id);
            }
        }
    }
    Ok(())
}

fn summary_line(task: &TaskSummary) -> String {
    format!(
        "{} {}  {:<22}  {:>3} it  ${:.4}  {}  {}",
        task.status.symbol(),
        task.id.short(),
        task.status.as_str(),
        task.iterations,
        task.cost_usd,
        task.created_at.format("%Y-%m-%d %H:%M"),
        first_line(&task.prompt, 60)
    )
}

fn print_record(record: &TaskRecord) {
    println!("Task:      {}", record.id);
    println!("Status:    {} {}", record.status.symbol(), record.status);
    println!("Model:     {}", record.config.model);
    println!("Prompt:    {}", record.prompt);
    println!(
        "Usage:     {} iterations, {} in / {} out tokens, ${:.4}",
        record.iterations, record.input_tokens, record.output_tokens, record.cost_usd
    );
    if let Some(result) = &record.result {
        if let Some(summary) = &result.summary {
            println!("Summary:   {}", summary);
        }
        if let Some(error) = &result.error {
            println!("Error:     {}", error);
        }
    }

    println!("\nEvents ({}):", record.events.len());
    for event in &record.events {
        if let Some(line) = format_event(event) {
            println!("  {} {}", event.timestamp.format("%H:%M:%S"), line.trim_start());
        }
    }
}

fn first_line(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > max_chars {
        format!("{}...", line.chars().take(max_chars).collect::<String>())
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("Add words\nmore detail", 60), "Add words");
        assert_eq!(first_line("abcdef", 3), "abc...");
        assert_eq!(first_line("", 3), "");
    }
}
