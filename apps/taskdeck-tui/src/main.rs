//! taskdeck: terminal client for a personal task service
//!
//! Runs the interactive terminal UI by default. The subcommands cover the
//! same operations for scripting.

mod app;
mod commands;
mod config;
mod ui;

use anyhow::{Context, Result};
use app::{Action, AppEvent, AppState};
use clap::{Parser, Subcommand};
use config::Config;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{
    fs::OpenOptions,
    future::Future,
    io::{self, Write},
    sync::{Arc, Mutex},
    time::Duration,
};
use taskdeck_client::{ApiClient, TaskService};
use taskdeck_core::{Control, StatusFilter};
use taskdeck_session::{FileSessionBackend, SessionContext};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// API base URL (overrides configuration)
    #[arg(short, long, global = true)]
    api_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive terminal UI (default)
    Ui,
    /// Create a new account
    Register {
        /// Email address
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Login with existing credentials
    Login {
        /// Email address
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the profile of the logged in user
    Whoami,
    /// List tasks
    List {
        /// Only show tasks with this status (all, active, completed)
        #[arg(short, long, default_value_t = StatusFilter::All)]
        status: StatusFilter,
        /// Case-insensitive match on title or description
        #[arg(short = 'q', long)]
        search: Option<String>,
    },
    /// Create a task
    Add {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Mark a task completed
    Done { id: String },
    /// Mark a task active again
    Undo { id: String },
    /// Delete a task
    Rm {
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show a single task
    Show { id: String },
}

/// The terminal UI owns stdout, so it logs to a file. Everything else logs
/// to stderr.
fn init_logging(config: &Config, interactive: bool) -> Result<()> {
    let filter = EnvFilter::try_new(config.log_filter()).context("Invalid log filter")?;
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(filter);

    if interactive {
        let path = config.log_file()?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).context("Failed to create log directory")?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    } else {
        builder.with_writer(io::stderr).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(api_url) = cli.api_url {
        config.override_base_url(api_url)?;
    }

    let command = cli.command.unwrap_or(Commands::Ui);
    init_logging(&config, matches!(command, Commands::Ui))?;
    config.log_sources();

    let session_file = config.session_file()?;
    debug!("Using session file {}", session_file.display());
    let session = SessionContext::init(Arc::new(FileSessionBackend::new(session_file)))
        .await
        .context("Failed to load session")?;

    let mut builder = ApiClient::builder(config.api.base_url.clone());
    if let Some(timeout) = config.timeout() {
        builder = builder.with_timeout(timeout);
    }
    let client = builder
        .build(Arc::new(session))
        .context("Failed to create API client")?;
    info!("Using API at {}", client.base_url());

    let service = TaskService::new(client);

    match command {
        Commands::Ui => run_tui(service).await,
        Commands::Register { email } => commands::register(&service, email).await,
        Commands::Login { email } => commands::login(&service, email).await,
        Commands::Logout => commands::logout(&service).await,
        Commands::Whoami => commands::whoami(&service).await,
        Commands::List { status, search } => commands::list(&service, status, search).await,
        Commands::Add { title, description } => commands::add(&service, title, description).await,
        Commands::Done { id } => commands::set_completed(&service, &id, true).await,
        Commands::Undo { id } => commands::set_completed(&service, &id, false).await,
        Commands::Rm { id, yes } => commands::remove(&service, &id, yes).await,
        Commands::Show { id } => commands::show(&service, &id).await,
    }
}

async fn run_tui(service: TaskService) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AppEvent>();
    forward_client_events(service.client().subscribe(), event_tx.clone());

    let mut app = AppState::default();
    if service.client().session().is_authenticated().await {
        for action in app.resume_session() {
            dispatch(&mut app, action, &service, &event_tx).await;
        }
    }

    let res = run_app(&mut terminal, &mut app, &service, &event_tx, &mut event_rx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        error!("Terminal UI stopped: {:?}", err);
    }
    res
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    service: &TaskService,
    event_tx: &mpsc::UnboundedSender<AppEvent>,
    event_rx: &mut mpsc::UnboundedReceiver<AppEvent>,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;
        terminal.backend_mut().flush()?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(action) = app.handle_key(key) {
                        dispatch(app, action, service, event_tx).await;
                    }
                }
            }
        }

        // Results of requests that finished since the last frame, in arrival order
        while let Ok(app_event) = event_rx.try_recv() {
            if let Some(action) = app.apply_event(app_event) {
                dispatch(app, action, service, event_tx).await;
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Relay interceptor notifications into the UI event stream.
fn forward_client_events(
    mut events: broadcast::Receiver<taskdeck_client::ClientEvent>,
    event_tx: mpsc::UnboundedSender<AppEvent>,
) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if event_tx.send(AppEvent::Client(event)).is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Dropped {} client events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

fn spawn_request<F>(event_tx: &mpsc::UnboundedSender<AppEvent>, request: F)
where
    F: Future<Output = AppEvent> + Send + 'static,
{
    let event_tx = event_tx.clone();
    tokio::spawn(async move {
        if event_tx.send(request.await).is_err() {
            debug!("UI loop gone, dropping request result");
        }
    });
}

async fn dispatch(
    app: &mut AppState,
    action: Action,
    service: &TaskService,
    event_tx: &mpsc::UnboundedSender<AppEvent>,
) {
    let service = service.clone();

    match action {
        Action::Login(credentials) => spawn_request(event_tx, async move {
            let result = service.client().login(&credentials).await;
            AppEvent::Authenticated(result.map(|response| response.user))
        }),
        Action::Register(credentials) => spawn_request(event_tx, async move {
            let client = service.client();
            let result = match client.register(&credentials).await {
                Ok(_) => client.login(&credentials).await.map(|response| response.user),
                Err(e) => Err(e),
            };
            AppEvent::Authenticated(result)
        }),
        Action::LoadProfile => spawn_request(event_tx, async move {
            AppEvent::Profile(service.client().me().await)
        }),
        Action::Reload => spawn_request(event_tx, async move {
            AppEvent::TasksLoaded(service.list().await)
        }),
        Action::OpenDetail(task_id) => spawn_request(event_tx, async move {
            let result = service.fetch(&task_id).await;
            AppEvent::DetailLoaded { task_id, result }
        }),
        Action::Create(draft) => spawn_request(event_tx, async move {
            AppEvent::Mutated {
                control: Control::CreateForm,
                result: service.create(&draft).await,
            }
        }),
        Action::Edit { task, draft } => spawn_request(event_tx, async move {
            AppEvent::Mutated {
                control: Control::Task(task.id.clone()),
                result: service.edit(&task, &draft).await,
            }
        }),
        Action::Toggle(task) => spawn_request(event_tx, async move {
            AppEvent::Mutated {
                control: Control::Task(task.id.clone()),
                result: service.toggle(&task).await,
            }
        }),
        Action::Delete(task_id) => spawn_request(event_tx, async move {
            AppEvent::Mutated {
                control: Control::Task(task_id.clone()),
                result: service.delete(&task_id).await,
            }
        }),
        Action::Logout => {
            if let Err(e) = service.client().logout().await {
                error!("Failed to clear session: {}", e);
            }
            info!("Logged out");
            app.go_to_login();
        }
    }
}
