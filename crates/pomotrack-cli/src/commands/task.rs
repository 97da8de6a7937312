use clap::Subcommand;
use pomotrack_core::Task;

use super::open_directory;

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Add {
        /// Task title
        title: String,
        /// Estimated number of pomodoros
        #[arg(long, default_value = "1")]
        estimate: u32,
        /// Optional description
        #[arg(long)]
        description: Option<String>,
    },
    /// List the owner's tasks as JSON
    List,
    /// Print one task as JSON
    Show {
        task_id: String,
    },
    /// Print the audit trail for a task
    Events {
        task_id: String,
    },
}

pub fn run(action: TaskAction, owner: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let (dir, owner) = open_directory(owner)?;

    match action {
        TaskAction::Add {
            title,
            estimate,
            description,
        } => {
            let mut task = Task::new(&owner, title, estimate);
            task.description = description;
            dir.save_task(&task)?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::List => {
            let tasks = dir.list_tasks(&owner)?;
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }
        TaskAction::Show { task_id } => {
            let task = dir.get_task(&owner, &task_id)?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::Events { task_id } => {
            let events = dir.task_events(&owner, &task_id)?;
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
    }
    Ok(())
}
