use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use taskdeck_client::{ApiError, ClientEvent, DetailState, LoadTransition, settle_load};
use taskdeck_core::{
    Control, Credentials, PendingControls, StatusFilter, Task, TaskBoard, TaskDraft, TaskId,
    TaskMutation, TaskQuery, User,
};
use tracing::{debug, warn};

/// Results of background requests, fed back into the UI loop.
#[derive(Debug)]
pub enum AppEvent {
    Authenticated(Result<User, ApiError>),
    Profile(Result<User, ApiError>),
    TasksLoaded(Result<Vec<Task>, ApiError>),
    DetailLoaded {
        task_id: TaskId,
        result: Result<Task, ApiError>,
    },
    Mutated {
        control: Control,
        result: Result<TaskMutation, ApiError>,
    },
    Client(ClientEvent),
}

/// Work the UI loop has to carry out on behalf of the state.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Login(Credentials),
    Register(Credentials),
    LoadProfile,
    Reload,
    OpenDetail(TaskId),
    Create(TaskDraft),
    Edit { task: Task, draft: TaskDraft },
    Toggle(Task),
    Delete(TaskId),
    Logout,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppScreen {
    Login,
    Register,
    Tasks,
    Detail(TaskId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthField {
    Email,
    Password,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Description,
}

impl FormField {
    fn toggle(self) -> Self {
        match self {
            Self::Title => Self::Description,
            Self::Description => Self::Title,
        }
    }
}

/// Where keystrokes go on the task screens.
#[derive(Debug, Clone, PartialEq)]
pub enum InputMode {
    Browse,
    Search,
    Create(FormField),
    Edit { task_id: TaskId, field: FormField },
    ConfirmDelete(TaskId),
}

pub struct AppState {
    pub screen: AppScreen,
    pub mode: InputMode,
    pub user_email: Option<String>,
    pub auth_email_input: String,
    pub auth_password_input: String,
    pub auth_field_focus: AuthField,
    pub auth_error: Option<String>,
    pub board: TaskBoard,
    pub query: TaskQuery,
    pub selected: usize,
    pub create_draft: TaskDraft,
    pub create_error: Option<String>,
    pub edit_draft: TaskDraft,
    pub task_errors: HashMap<TaskId, String>,
    pub detail: DetailState,
    pub pending: PendingControls,
    pub notice: Option<String>,
    pub should_quit: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            screen: AppScreen::Login,
            mode: InputMode::Browse,
            user_email: None,
            auth_email_input: String::new(),
            auth_password_input: String::new(),
            auth_field_focus: AuthField::Email,
            auth_error: None,
            board: TaskBoard::new(),
            query: TaskQuery::default(),
            selected: 0,
            create_draft: TaskDraft::default(),
            create_error: None,
            edit_draft: TaskDraft::default(),
            task_errors: HashMap::new(),
            detail: DetailState::Loading,
            pending: PendingControls::new(),
            notice: None,
            should_quit: false,
        }
    }
}

impl AppState {
    /// Enter the task list with a session restored from disk.
    pub fn resume_session(&mut self) -> Vec<Action> {
        self.screen = AppScreen::Tasks;
        let mut actions = vec![Action::LoadProfile];
        actions.extend(self.request_reload());
        actions
    }

    pub fn is_auth_screen(&self) -> bool {
        matches!(self.screen, AppScreen::Login | AppScreen::Register)
    }

    /// Drop everything tied to the previous session and show the login form.
    pub fn go_to_login(&mut self) {
        debug!("Returning to login screen");
        let email = std::mem::take(&mut self.auth_email_input);
        *self = Self {
            auth_email_input: email,
            ..Self::default()
        };
    }

    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.board.visible(&self.query).collect()
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.board.visible(&self.query).nth(self.selected)
    }

    fn clamp_selection(&mut self) {
        let count = self.board.visible(&self.query).count();
        self.selected = self.selected.min(count.saturating_sub(1));
    }

    /// The task the detail screen shows, if it has loaded.
    pub fn detail_task(&self) -> Option<&Task> {
        self.detail.task()
    }

    fn request_reload(&mut self) -> Option<Action> {
        if !self.pending.try_begin(Control::Reload) {
            return None;
        }
        self.board.begin_loading();
        Some(Action::Reload)
    }

    fn begin_task_action(&mut self, task_id: &str, action: Action) -> Option<Action> {
        if !self.pending.try_begin(Control::Task(task_id.to_string())) {
            debug!(task_id, "Task control busy, ignoring");
            return None;
        }
        self.task_errors.remove(task_id);
        Some(action)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return None;
        }

        // Any key dismisses a notice
        if self.notice.take().is_some() {
            return None;
        }

        match self.screen.clone() {
            AppScreen::Login | AppScreen::Register => self.handle_auth_key(key),
            AppScreen::Tasks => match self.mode.clone() {
                InputMode::Browse => self.handle_browse_key(key),
                InputMode::Search => self.handle_search_key(key),
                InputMode::Create(field) => self.handle_create_key(key, field),
                InputMode::Edit { task_id, field } => self.handle_edit_key(key, task_id, field),
                InputMode::ConfirmDelete(task_id) => self.handle_confirm_key(key, task_id),
            },
            AppScreen::Detail(task_id) => match self.mode.clone() {
                InputMode::ConfirmDelete(task_id) => self.handle_confirm_key(key, task_id),
                InputMode::Edit { task_id, field } => self.handle_edit_key(key, task_id, field),
                _ => self.handle_detail_key(key, task_id),
            },
        }
    }

    fn handle_auth_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Tab | KeyCode::BackTab => {
                self.auth_field_focus = match self.auth_field_focus {
                    AuthField::Email => AuthField::Password,
                    AuthField::Password => AuthField::Email,
                };
            }
            KeyCode::Enter => {
                let credentials =
                    Credentials::new(self.auth_email_input.trim(), self.auth_password_input.clone());
                if let Err(e) = credentials.validate() {
                    self.auth_error = Some(e.to_string());
                    return None;
                }
                if !self.pending.try_begin(Control::AuthForm) {
                    return None;
                }
                self.auth_error = None;
                return Some(match self.screen {
                    AppScreen::Register => Action::Register(credentials),
                    _ => Action::Login(credentials),
                });
            }
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.screen = AppScreen::Register;
                self.auth_error = None;
            }
            KeyCode::Esc => {
                if self.screen == AppScreen::Register {
                    self.screen = AppScreen::Login;
                    self.auth_error = None;
                } else {
                    self.should_quit = true;
                }
            }
            KeyCode::Backspace => match self.auth_field_focus {
                AuthField::Email => {
                    self.auth_email_input.pop();
                }
                AuthField::Password => {
                    self.auth_password_input.pop();
                }
            },
            KeyCode::Char(c) => match self.auth_field_focus {
                AuthField::Email => self.auth_email_input.push(c),
                AuthField::Password => self.auth_password_input.push(c),
            },
            _ => {}
        }
        None
    }

    fn handle_browse_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('L') => return Some(Action::Logout),
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected += 1;
                self.clamp_selection();
            }
            KeyCode::Tab | KeyCode::Char('f') => {
                self.query.status = self.query.status.next();
                self.clamp_selection();
            }
            KeyCode::Char('1') => self.set_filter(StatusFilter::All),
            KeyCode::Char('2') => self.set_filter(StatusFilter::Active),
            KeyCode::Char('3') => self.set_filter(StatusFilter::Completed),
            KeyCode::Char('/') => self.mode = InputMode::Search,
            KeyCode::Esc if !self.query.search.is_empty() => {
                self.query.search.clear();
                self.clamp_selection();
            }
            KeyCode::Char('r') => return self.request_reload(),
            KeyCode::Char('n') | KeyCode::Char('a') => {
                self.create_error = None;
                self.mode = InputMode::Create(FormField::Title);
            }
            KeyCode::Enter => {
                let task_id = self.selected_task()?.id.clone();
                self.detail = DetailState::Loading;
                self.screen = AppScreen::Detail(task_id.clone());
                return Some(Action::OpenDetail(task_id));
            }
            KeyCode::Char(' ') => {
                let task = self.selected_task()?.clone();
                let task_id = task.id.clone();
                return self.begin_task_action(&task_id, Action::Toggle(task));
            }
            KeyCode::Char('e') => {
                let task = self.selected_task()?.clone();
                self.begin_edit(&task);
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                let task_id = self.selected_task()?.id.clone();
                self.mode = InputMode::ConfirmDelete(task_id);
            }
            _ => {}
        }
        None
    }

    /// Prefill the edit form from the task as currently shown.
    fn begin_edit(&mut self, task: &Task) {
        self.edit_draft =
            TaskDraft::new(task.title.clone(), task.description.clone().unwrap_or_default());
        self.task_errors.remove(&task.id);
        self.mode = InputMode::Edit {
            task_id: task.id.clone(),
            field: FormField::Title,
        };
    }

    /// The freshest copy of a task: the detail view's when it shows that
    /// task, otherwise the board's.
    fn current_task(&self, task_id: &str) -> Option<&Task> {
        self.detail_task()
            .filter(|task| task.id == task_id)
            .or_else(|| self.board.get(task_id))
    }

    fn set_filter(&mut self, status: StatusFilter) {
        self.query.status = status;
        self.clamp_selection();
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Enter => self.mode = InputMode::Browse,
            KeyCode::Esc => {
                self.query.search.clear();
                self.mode = InputMode::Browse;
            }
            KeyCode::Backspace => {
                self.query.search.pop();
            }
            KeyCode::Char(c) => self.query.search.push(c),
            _ => {}
        }
        self.clamp_selection();
        None
    }

    fn handle_create_key(&mut self, key: KeyEvent, field: FormField) -> Option<Action> {
        match key.code {
            KeyCode::Tab | KeyCode::BackTab => self.mode = InputMode::Create(field.toggle()),
            KeyCode::Esc => {
                self.create_error = None;
                self.mode = InputMode::Browse;
            }
            KeyCode::Enter => {
                if let Err(e) = self.create_draft.validate() {
                    self.create_error = Some(e.to_string());
                    return None;
                }
                if !self.pending.try_begin(Control::CreateForm) {
                    return None;
                }
                self.create_error = None;
                return Some(Action::Create(self.create_draft.clone()));
            }
            KeyCode::Backspace => {
                edit_field(&mut self.create_draft, field).pop();
            }
            KeyCode::Char(c) => edit_field(&mut self.create_draft, field).push(c),
            _ => {}
        }
        None
    }

    fn handle_edit_key(&mut self, key: KeyEvent, task_id: TaskId, field: FormField) -> Option<Action> {
        match key.code {
            KeyCode::Tab | KeyCode::BackTab => {
                self.mode = InputMode::Edit {
                    task_id,
                    field: field.toggle(),
                };
            }
            KeyCode::Esc => {
                self.task_errors.remove(&task_id);
                self.edit_draft.clear();
                self.mode = InputMode::Browse;
            }
            KeyCode::Enter => {
                if let Err(e) = self.edit_draft.validate() {
                    self.task_errors.insert(task_id, e.to_string());
                    return None;
                }
                let task = self.current_task(&task_id)?.clone();
                let draft = self.edit_draft.clone();
                return self.begin_task_action(&task_id, Action::Edit { task, draft });
            }
            KeyCode::Backspace => {
                edit_field(&mut self.edit_draft, field).pop();
            }
            KeyCode::Char(c) => edit_field(&mut self.edit_draft, field).push(c),
            _ => {}
        }
        None
    }

    fn handle_confirm_key(&mut self, key: KeyEvent, task_id: TaskId) -> Option<Action> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.mode = InputMode::Browse;
                self.begin_task_action(&task_id, Action::Delete(task_id.clone()))
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.mode = InputMode::Browse;
                None
            }
            _ => None,
        }
    }

    fn handle_detail_key(&mut self, key: KeyEvent, task_id: TaskId) -> Option<Action> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('b') | KeyCode::Backspace => {
                self.screen = AppScreen::Tasks;
                self.clamp_selection();
            }
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char(' ') => {
                let task = self.detail_task()?.clone();
                return self.begin_task_action(&task_id, Action::Toggle(task));
            }
            KeyCode::Char('e') => {
                let task = self.detail_task()?.clone();
                self.begin_edit(&task);
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                self.detail_task()?;
                self.mode = InputMode::ConfirmDelete(task_id);
            }
            KeyCode::Char('r') => {
                self.detail = DetailState::Loading;
                return Some(Action::OpenDetail(task_id));
            }
            _ => {}
        }
        None
    }

    /// Fold the result of a background request into the state. May return a
    /// follow-up action.
    pub fn apply_event(&mut self, event: AppEvent) -> Option<Action> {
        match event {
            AppEvent::Authenticated(result) => {
                self.pending.finish(&Control::AuthForm);
                if !self.is_auth_screen() {
                    return None;
                }
                match result {
                    Ok(user) => {
                        self.user_email = Some(user.email);
                        self.auth_password_input.clear();
                        self.auth_error = None;
                        self.board = TaskBoard::new();
                        self.screen = AppScreen::Tasks;
                        return self.request_reload();
                    }
                    Err(e) => self.auth_error = Some(e.message().to_string()),
                }
            }
            AppEvent::Profile(result) => match result {
                Ok(user) if !self.is_auth_screen() => self.user_email = Some(user.email),
                Ok(_) => {}
                Err(e) => warn!("Failed to load profile: {}", e),
            },
            AppEvent::TasksLoaded(result) => {
                self.pending.finish(&Control::Reload);
                if self.is_auth_screen() {
                    return None;
                }
                match settle_load(&mut self.board, result) {
                    LoadTransition::Ready(count) => {
                        debug!(count, "Task list ready");
                        self.clamp_selection();
                    }
                    LoadTransition::Redirect => self.go_to_login(),
                    LoadTransition::Failed(message) => warn!("Task list failed: {}", message),
                }
            }
            AppEvent::DetailLoaded { task_id, result } => {
                if self.screen != AppScreen::Detail(task_id) {
                    return None;
                }
                self.detail = DetailState::settle(result);
                if self.detail == DetailState::Redirect {
                    self.go_to_login();
                }
            }
            AppEvent::Mutated { control, result } => {
                self.pending.finish(&control);
                if self.is_auth_screen() {
                    return None;
                }
                match result {
                    Ok(mutation) => self.apply_mutation(&control, mutation),
                    Err(e) if e.is_unauthorized() => self.go_to_login(),
                    Err(e) => self.record_error(&control, e.message().to_string()),
                }
            }
            AppEvent::Client(ClientEvent::SessionExpired) => {
                if !self.is_auth_screen() {
                    self.go_to_login();
                }
            }
            AppEvent::Client(ClientEvent::AccessForbidden { detail }) => {
                self.notice = Some(match detail {
                    Some(detail) => format!("Access forbidden: {detail}"),
                    None => "Access forbidden".to_string(),
                });
            }
        }
        None
    }

    fn apply_mutation(&mut self, control: &Control, mutation: TaskMutation) {
        self.detail.apply(&mutation);

        let task_id = mutation.task_id().to_string();
        self.task_errors.remove(&task_id);

        match &mutation {
            TaskMutation::Created(_) => {
                self.create_draft.clear();
                self.create_error = None;
                if matches!(self.mode, InputMode::Create(_)) {
                    self.mode = InputMode::Browse;
                }
                self.selected = 0;
            }
            TaskMutation::Updated(_) => {
                if matches!(&self.mode, InputMode::Edit { task_id: editing, .. } if *editing == task_id)
                {
                    self.edit_draft.clear();
                    self.mode = InputMode::Browse;
                }
            }
            TaskMutation::Deleted(_) => {
                if self.screen == AppScreen::Detail(task_id.clone()) {
                    self.screen = AppScreen::Tasks;
                }
            }
        }

        if !self.board.apply(mutation) {
            debug!(?control, "Mutation target no longer on the board");
        }
        self.clamp_selection();
    }

    fn record_error(&mut self, control: &Control, message: String) {
        match control {
            Control::CreateForm => self.create_error = Some(message),
            Control::Task(task_id) => {
                self.task_errors.insert(task_id.clone(), message);
            }
            Control::AuthForm => self.auth_error = Some(message),
            Control::Reload => self.board.fail_loading(message),
        }
    }
}

fn edit_field(draft: &mut TaskDraft, field: FormField) -> &mut String {
    match field {
        FormField::Title => &mut draft.title,
        FormField::Description => &mut draft.description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use taskdeck_client::{ApiClient, DEFAULT_BASE_URL, TaskService};
    use taskdeck_session::SessionContext;
    use wiremock::matchers::any;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut AppState, text: &str) {
        for c in text.chars() {
            assert_eq!(app.handle_key(key(KeyCode::Char(c))), None);
        }
    }

    fn task(id: &str, title: &str, done: bool) -> Task {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        Task {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            is_completed: done,
            user_id: "u-1".to_string(),
            created_at: at,
            updated_at: at,
        }
    }

    fn ready_app(tasks: Vec<Task>) -> AppState {
        let mut app = AppState {
            screen: AppScreen::Tasks,
            ..AppState::default()
        };
        app.board.finish_loading(tasks);
        app
    }

    #[test]
    fn test_login_requires_both_fields() {
        let mut app = AppState::default();
        assert_eq!(app.handle_key(key(KeyCode::Enter)), None);
        assert_eq!(
            app.auth_error.as_deref(),
            Some("Email and password are required")
        );

        type_text(&mut app, "a@example.com");
        app.handle_key(key(KeyCode::Tab));
        type_text(&mut app, "secret");

        let action = app.handle_key(key(KeyCode::Enter));
        assert_eq!(
            action,
            Some(Action::Login(Credentials::new("a@example.com", "secret")))
        );
        assert!(app.auth_error.is_none());

        // Submitting again while the request runs does nothing
        assert_eq!(app.handle_key(key(KeyCode::Enter)), None);
    }

    #[test]
    fn test_register_screen_submits_register() {
        let mut app = AppState::default();
        app.handle_key(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL));
        assert_eq!(app.screen, AppScreen::Register);

        type_text(&mut app, "b@example.com");
        app.handle_key(key(KeyCode::Tab));
        type_text(&mut app, "pw");
        assert!(matches!(
            app.handle_key(key(KeyCode::Enter)),
            Some(Action::Register(_))
        ));

        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.screen, AppScreen::Login);
    }

    #[test]
    fn test_blank_title_shows_inline_error() {
        let mut app = ready_app(vec![]);
        app.handle_key(key(KeyCode::Char('n')));
        assert_eq!(app.mode, InputMode::Create(FormField::Title));

        type_text(&mut app, "   ");
        assert_eq!(app.handle_key(key(KeyCode::Enter)), None);
        assert_eq!(app.create_error.as_deref(), Some("Title is required"));
        assert!(!app.pending.is_pending(&Control::CreateForm));
    }

    #[test]
    fn test_create_flow() {
        let mut app = ready_app(vec![task("t-1", "Existing", false)]);
        app.handle_key(key(KeyCode::Char('n')));
        type_text(&mut app, "Buy milk");
        app.handle_key(key(KeyCode::Tab));
        type_text(&mut app, "2 litres");

        let action = app.handle_key(key(KeyCode::Enter));
        assert_eq!(
            action,
            Some(Action::Create(TaskDraft::new("Buy milk", "2 litres")))
        );
        assert!(app.pending.is_pending(&Control::CreateForm));
        assert_eq!(app.handle_key(key(KeyCode::Enter)), None);

        app.apply_event(AppEvent::Mutated {
            control: Control::CreateForm,
            result: Ok(TaskMutation::Created(task("t-2", "Buy milk", false))),
        });

        assert!(!app.pending.is_pending(&Control::CreateForm));
        assert_eq!(app.mode, InputMode::Browse);
        assert_eq!(app.create_draft, TaskDraft::default());
        assert_eq!(app.board.len(), 2);
        assert_eq!(app.board.tasks()[0].id, "t-2");
    }

    #[test]
    fn test_filter_and_search_keys() {
        let mut app = ready_app(vec![
            task("t-1", "Buy milk", false),
            task("t-2", "Call dentist", false),
            task("t-3", "Pay rent", true),
        ]);

        app.handle_key(key(KeyCode::Char('3')));
        assert_eq!(app.query.status, StatusFilter::Completed);
        assert_eq!(app.visible_tasks().len(), 1);

        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.query.status, StatusFilter::All);

        app.handle_key(key(KeyCode::Char('/')));
        type_text(&mut app, "MIL");
        app.handle_key(key(KeyCode::Enter));
        let visible: Vec<_> = app.visible_tasks().iter().map(|t| t.id.clone()).collect();
        assert_eq!(visible, vec!["t-1"]);

        app.handle_key(key(KeyCode::Esc));
        assert!(app.query.search.is_empty());
        assert_eq!(app.visible_tasks().len(), 3);
    }

    #[test]
    fn test_toggle_is_single_flight_per_task() {
        let mut app = ready_app(vec![task("t-1", "One", false), task("t-2", "Two", false)]);

        let action = app.handle_key(key(KeyCode::Char(' ')));
        assert!(matches!(action, Some(Action::Toggle(ref t)) if t.id == "t-1"));
        assert_eq!(app.handle_key(key(KeyCode::Char(' '))), None);

        // A different task is independent
        app.handle_key(key(KeyCode::Down));
        assert!(app.handle_key(key(KeyCode::Char(' '))).is_some());
    }

    #[tokio::test]
    async fn test_failed_toggle_keeps_task_and_shows_error() {
        let mut app = ready_app(vec![task("t-1", "One", false)]);
        app.handle_key(key(KeyCode::Char(' ')));

        app.apply_event(AppEvent::Mutated {
            control: Control::Task("t-1".to_string()),
            result: Err(not_authenticated_error().await),
        });

        assert!(!app.board.get("t-1").unwrap().is_completed);
        assert!(app.task_errors.contains_key("t-1"));
        assert!(!app.pending.is_task_pending("t-1"));
    }

    #[test]
    fn test_delete_asks_for_confirmation() {
        let mut app = ready_app(vec![task("t-1", "One", false)]);

        assert_eq!(app.handle_key(key(KeyCode::Char('d'))), None);
        assert_eq!(app.mode, InputMode::ConfirmDelete("t-1".to_string()));
        assert_eq!(app.handle_key(key(KeyCode::Char('n'))), None);
        assert_eq!(app.mode, InputMode::Browse);

        app.handle_key(key(KeyCode::Char('d')));
        assert_eq!(
            app.handle_key(key(KeyCode::Char('y'))),
            Some(Action::Delete("t-1".to_string()))
        );

        app.apply_event(AppEvent::Mutated {
            control: Control::Task("t-1".to_string()),
            result: Ok(TaskMutation::Deleted("t-1".to_string())),
        });
        assert!(app.board.is_empty());
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn test_edit_prefills_and_submits() {
        let mut one = task("t-1", "One", false);
        one.description = Some("first".to_string());
        let mut app = ready_app(vec![one.clone()]);

        app.handle_key(key(KeyCode::Char('e')));
        assert_eq!(app.edit_draft, TaskDraft::new("One", "first"));

        app.handle_key(key(KeyCode::Char('!')));
        let action = app.handle_key(key(KeyCode::Enter));
        assert_eq!(
            action,
            Some(Action::Edit {
                task: one,
                draft: TaskDraft::new("One!", "first"),
            })
        );

        let mut updated = task("t-1", "One!", false);
        updated.updated_at = Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap();
        app.apply_event(AppEvent::Mutated {
            control: Control::Task("t-1".to_string()),
            result: Ok(TaskMutation::Updated(updated)),
        });
        assert_eq!(app.mode, InputMode::Browse);
        assert_eq!(app.board.get("t-1").unwrap().title, "One!");
    }

    #[test]
    fn test_session_expired_returns_to_login() {
        let mut app = ready_app(vec![task("t-1", "One", false)]);
        app.auth_email_input = "a@example.com".to_string();

        app.apply_event(AppEvent::Client(ClientEvent::SessionExpired));

        assert_eq!(app.screen, AppScreen::Login);
        assert!(app.board.is_empty());
        assert_eq!(app.auth_email_input, "a@example.com");
    }

    #[test]
    fn test_session_expired_ignored_on_login_screen() {
        let mut app = AppState::default();
        app.auth_error = Some("Incorrect email or password".to_string());
        app.apply_event(AppEvent::Client(ClientEvent::SessionExpired));
        assert_eq!(
            app.auth_error.as_deref(),
            Some("Incorrect email or password")
        );
    }

    #[test]
    fn test_forbidden_shows_notice_and_keeps_screen() {
        let mut app = ready_app(vec![task("t-1", "One", false)]);
        app.apply_event(AppEvent::Client(ClientEvent::AccessForbidden {
            detail: Some("Not your task".to_string()),
        }));

        assert_eq!(app.screen, AppScreen::Tasks);
        assert_eq!(app.notice.as_deref(), Some("Access forbidden: Not your task"));

        // First key only dismisses the notice
        assert_eq!(app.handle_key(key(KeyCode::Char(' '))), None);
        assert!(app.notice.is_none());
        assert_eq!(app.board.len(), 1);
    }

    #[test]
    fn test_detail_delete_returns_to_list() {
        let mut app = ready_app(vec![task("t-1", "One", false)]);
        assert_eq!(
            app.handle_key(key(KeyCode::Enter)),
            Some(Action::OpenDetail("t-1".to_string()))
        );
        assert_eq!(app.screen, AppScreen::Detail("t-1".to_string()));

        app.apply_event(AppEvent::DetailLoaded {
            task_id: "t-1".to_string(),
            result: Ok(task("t-1", "One", false)),
        });
        assert!(app.detail_task().is_some());

        app.handle_key(key(KeyCode::Char('d')));
        assert_eq!(
            app.handle_key(key(KeyCode::Enter)),
            Some(Action::Delete("t-1".to_string()))
        );
        app.apply_event(AppEvent::Mutated {
            control: Control::Task("t-1".to_string()),
            result: Ok(TaskMutation::Deleted("t-1".to_string())),
        });

        assert_eq!(app.screen, AppScreen::Tasks);
        assert!(app.board.is_empty());
    }

    #[test]
    fn test_resume_session_requests_profile_and_list() {
        let mut app = AppState::default();
        let actions = app.resume_session();
        assert_eq!(actions, vec![Action::LoadProfile, Action::Reload]);
        assert_eq!(app.screen, AppScreen::Tasks);
        assert!(!app.board.is_ready());
    }

    #[test]
    fn test_edit_from_detail_view() {
        let mut app = ready_app(vec![task("t-1", "One", false), task("t-2", "Two", false)]);
        app.handle_key(key(KeyCode::Enter));
        app.apply_event(AppEvent::DetailLoaded {
            task_id: "t-1".to_string(),
            result: Ok(task("t-1", "One", false)),
        });

        app.handle_key(key(KeyCode::Char('e')));
        assert_eq!(
            app.mode,
            InputMode::Edit {
                task_id: "t-1".to_string(),
                field: FormField::Title,
            }
        );
        assert_eq!(app.edit_draft.title, "One");

        type_text(&mut app, "!");
        let action = app.handle_key(key(KeyCode::Enter));
        assert_eq!(
            action,
            Some(Action::Edit {
                task: task("t-1", "One", false),
                draft: TaskDraft::new("One!", ""),
            })
        );
        assert!(app.pending.is_task_pending("t-1"));

        let mut updated = task("t-1", "One!", false);
        updated.updated_at = Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap();
        app.apply_event(AppEvent::Mutated {
            control: Control::Task("t-1".to_string()),
            result: Ok(TaskMutation::Updated(updated)),
        });

        assert_eq!(app.screen, AppScreen::Detail("t-1".to_string()));
        assert_eq!(app.mode, InputMode::Browse);
        assert_eq!(app.detail_task().unwrap().title, "One!");
        assert!(app.detail_task().unwrap().was_edited());
        assert_eq!(app.board.get("t-1").unwrap().title, "One!");
        assert!(!app.pending.is_task_pending("t-1"));

        // Esc now leaves the detail view instead of an edit form
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.screen, AppScreen::Tasks);
    }

    #[tokio::test]
    async fn test_unauthorized_list_returns_to_login() {
        let mut app = ready_app(vec![task("t-1", "One", false)]);
        app.auth_email_input = "a@example.com".to_string();
        assert_eq!(app.handle_key(key(KeyCode::Char('r'))), Some(Action::Reload));

        app.apply_event(AppEvent::TasksLoaded(Err(unauthorized_error().await)));

        assert_eq!(app.screen, AppScreen::Login);
        assert!(app.board.is_empty());
        assert_eq!(app.auth_email_input, "a@example.com");
        assert!(app.pending.is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_detail_returns_to_login() {
        let mut app = ready_app(vec![task("t-1", "One", false)]);
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.screen, AppScreen::Detail("t-1".to_string()));

        app.apply_event(AppEvent::DetailLoaded {
            task_id: "t-1".to_string(),
            result: Err(unauthorized_error().await),
        });

        assert_eq!(app.screen, AppScreen::Login);
        assert_eq!(app.detail, DetailState::Loading);
    }

    async fn unauthorized_error() -> ApiError {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        let session = SessionContext::in_memory();
        session.login("u-1", "tok-1").await.unwrap();
        let client = ApiClient::builder(server.uri())
            .build(Arc::new(session))
            .unwrap();
        TaskService::new(client).list().await.unwrap_err()
    }

    async fn not_authenticated_error() -> ApiError {
        // No session, so this fails before anything is sent
        let client = ApiClient::builder(DEFAULT_BASE_URL)
            .build(Arc::new(SessionContext::in_memory()))
            .unwrap();
        TaskService::new(client)
            .set_completed("t-1", true)
            .await
            .unwrap_err()
    }
}
