//! One-shot command line operations. Each goes through the same
//! [`TaskService`] the terminal UI uses.

use anyhow::{Context, Result, anyhow, bail};
use dialoguer::{Confirm, Input, Password, theme::ColorfulTheme};
use taskdeck_client::{DetailState, TaskService};
use taskdeck_core::{Credentials, StatusFilter, Task, TaskBoard, TaskDraft, TaskQuery};
use tracing::{debug, info};

use crate::ui::format_timestamp;

fn prompt_email(email: Option<String>) -> Result<String> {
    match email {
        Some(email) => Ok(email),
        None => Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Email")
            .interact_text()
            .context("Failed to read email"),
    }
}

async fn require_session(service: &TaskService) -> Result<()> {
    if !service.client().session().is_authenticated().await {
        bail!("Not logged in. Run `taskdeck login` first.");
    }
    Ok(())
}

pub async fn register(service: &TaskService, email: Option<String>) -> Result<()> {
    let email = prompt_email(email)?;
    let password = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Password")
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()
        .context("Failed to read password")?;

    info!("Starting registration for {}", email);
    let user = service
        .client()
        .register(&Credentials::new(email.trim(), password))
        .await?;

    println!("✓ Successfully registered {}", user.email);
    println!("You can now login with: taskdeck login -e {}", user.email);
    Ok(())
}

pub async fn login(service: &TaskService, email: Option<String>) -> Result<()> {
    let email = prompt_email(email)?;
    let password = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Password")
        .interact()
        .context("Failed to read password")?;

    let response = service
        .client()
        .login(&Credentials::new(email.trim(), password))
        .await?;

    if !service.client().session().is_authenticated().await {
        bail!("Login succeeded but the server returned no usable token");
    }

    println!("✓ Logged in as {}", response.user.email);
    Ok(())
}

pub async fn logout(service: &TaskService) -> Result<()> {
    service
        .client()
        .logout()
        .await
        .context("Failed to clear session")?;
    println!("✓ Logged out");
    Ok(())
}

pub async fn whoami(service: &TaskService) -> Result<()> {
    require_session(service).await?;
    let user = service.client().me().await?;
    println!("{} ({})", user.email, user.id);
    if let Some(created_at) = &user.created_at {
        println!("Member since {}", format_timestamp(created_at));
    }
    Ok(())
}

pub async fn list(service: &TaskService, status: StatusFilter, search: Option<String>) -> Result<()> {
    require_session(service).await?;

    let mut board = TaskBoard::new();
    board.finish_loading(service.list().await?);

    let query = TaskQuery::new(status, search.unwrap_or_default());
    let stats = board.stats();
    println!(
        "Total {} | Active {} | Completed {}",
        stats.total, stats.active, stats.completed
    );

    let mut shown = 0;
    for task in board.visible(&query) {
        println!("{}", summary_line(task));
        if let Some(description) = task.description_text() {
            println!("      {}", description);
        }
        shown += 1;
    }

    if shown == 0 {
        if board.is_empty() {
            println!("No tasks yet. Add one with: taskdeck add \"<title>\"");
        } else {
            println!("No {} tasks match.", status.label().to_lowercase());
        }
    }
    debug!(shown, "Listed tasks");
    Ok(())
}

fn summary_line(task: &Task) -> String {
    let marker = if task.is_completed { "[x]" } else { "[ ]" };
    format!("{} {}  {}", marker, task.id, task.title)
}

pub async fn add(service: &TaskService, title: String, description: Option<String>) -> Result<()> {
    require_session(service).await?;
    let draft = TaskDraft::new(title, description.unwrap_or_default());
    let mutation = service.create(&draft).await?;
    println!("✓ Created task {}", mutation.task_id());
    Ok(())
}

pub async fn set_completed(service: &TaskService, task_id: &str, is_completed: bool) -> Result<()> {
    require_session(service).await?;
    service.set_completed(task_id, is_completed).await?;
    let state = if is_completed { "completed" } else { "active" };
    println!("✓ Task {} marked {}", task_id, state);
    Ok(())
}

pub async fn remove(service: &TaskService, task_id: &str, assume_yes: bool) -> Result<()> {
    require_session(service).await?;

    if !assume_yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Are you sure you want to delete this task?")
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            println!("Cancelled");
            return Ok(());
        }
    }

    service.delete(task_id).await?;
    println!("✓ Deleted task {}", task_id);
    Ok(())
}

pub async fn show(service: &TaskService, task_id: &str) -> Result<()> {
    require_session(service).await?;

    match service.fetch_detail(task_id).await {
        DetailState::Ready(task) => {
            println!("{}", task.title);
            println!(
                "Status:  {}",
                if task.is_completed { "Completed" } else { "Active" }
            );
            println!("Created: {}", format_timestamp(&task.created_at));
            if task.was_edited() {
                println!("Updated: {}", format_timestamp(&task.updated_at));
            }
            println!();
            println!("{}", task.description_text().unwrap_or("No description"));
            Ok(())
        }
        DetailState::Redirect => Err(anyhow!(
            "Session expired. Run `taskdeck login` to sign in again."
        )),
        state => Err(anyhow!(
            state.message().unwrap_or("Failed to fetch task").to_string()
        )),
    }
}
