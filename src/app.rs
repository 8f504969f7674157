use std::collections::HashSet;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::warn;
use thiserror::Error;

use crate::api::ApiClient;
use crate::config::Config;
use crate::models::{
    AiEmailRequest, AiEmailResponse, BulkCreateRequest, Contact, ContactDraft, ContactPatch,
    EmailLog, EmailSend, Group, GroupDraft, GroupPatch, ImportPreview, NewsletterAudience,
};
use crate::routes::{NavContext, NavOutcome, Route, Router};
use crate::session::SessionStore;
use crate::validators;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("API error: {0}")]
    Api(#[from] crate::api::ApiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session error: {0}")]
    Session(#[from] anyhow::Error),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

pub const AI_TONES: [&str; 4] = ["professional", "friendly", "witty", "persuasive"];

/// Modal state layered over the mounted route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    None,
    ContactForm,
    ConfirmDeleteContact,
    ImportPath,
    ImportPreview,
    GroupForm,
    ConfirmDeleteGroup,
    Help,
}

#[derive(Debug, Default, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub field: usize,
}

#[derive(Debug, Default, Clone)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub confirm: String,
    pub field: usize,
}

#[derive(Debug, Default, Clone)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub editing_id: Option<String>,
    pub field: usize,
}

#[derive(Debug, Default, Clone)]
pub struct GroupForm {
    pub name: String,
    /// Contact ids toggled into the group.
    pub members: HashSet<String>,
    /// Cursor over the contact list while picking members.
    pub cursor: usize,
    pub editing_id: Option<String>,
    pub field: usize,
}

#[derive(Debug, Default, Clone)]
pub struct ComposeForm {
    pub subject: String,
    pub body: String,
    /// Manual comma-separated recipients; used when `use_group` is off.
    pub to_text: String,
    pub use_group: bool,
    pub group_idx: usize,
    pub field: usize,
}

#[derive(Debug, Default, Clone)]
pub struct TransactionalForm {
    pub subject: String,
    pub body: String,
    pub send_to_all: bool,
    pub group_idx: usize,
    /// Attachment file paths, one per line.
    pub attachments_text: String,
    pub field: usize,
}

#[derive(Debug, Clone)]
pub struct AiForm {
    pub subject_hint: String,
    pub tone_idx: usize,
    pub audience: String,
    /// One key point per line.
    pub key_points_text: String,
    pub field: usize,
}

impl Default for AiForm {
    fn default() -> Self {
        Self {
            subject_hint: String::new(),
            tone_idx: 0,
            audience: String::new(),
            key_points_text: String::new(),
            field: 0,
        }
    }
}

pub struct App {
    pub config: Config,
    pub session: SessionStore,
    pub api: ApiClient,
    pub router: Router,
    pub should_quit: bool,
    pub overlay: Overlay,
    pub loading: bool,

    // Data loaded from the backend
    pub contacts: Vec<Contact>,
    pub groups: Vec<Group>,
    pub logs: Vec<EmailLog>,
    pub last_refresh: Option<DateTime<Local>>,

    // List selections
    pub selected_contact_idx: Option<usize>,
    pub selected_group_idx: Option<usize>,
    pub selected_log_idx: Option<usize>,

    // Status bar messages
    pub error_message: Option<String>,
    pub info_message: Option<String>,
    message_timeout: Option<Instant>,

    // Screen forms
    pub login_form: LoginForm,
    pub register_form: RegisterForm,
    pub contact_form: ContactForm,
    pub group_form: GroupForm,
    pub compose_form: ComposeForm,
    pub transactional_form: TransactionalForm,
    pub ai_form: AiForm,
    pub ai_draft: Option<AiEmailResponse>,

    // Bulk import flow
    pub import_path: String,
    pub import_preview: Option<ImportPreview>,
}

impl App {
    pub fn new(config: Config, session: SessionStore) -> Self {
        let api = ApiClient::new(&config.api_base_url, session.clone());

        Self {
            config,
            session,
            api,
            router: Router::with_default_guards(),
            should_quit: false,
            overlay: Overlay::None,
            loading: false,
            contacts: Vec::new(),
            groups: Vec::new(),
            logs: Vec::new(),
            last_refresh: None,
            selected_contact_idx: None,
            selected_group_idx: None,
            selected_log_idx: None,
            error_message: None,
            info_message: None,
            message_timeout: None,
            login_form: LoginForm::default(),
            register_form: RegisterForm::default(),
            contact_form: ContactForm::default(),
            group_form: GroupForm::default(),
            compose_form: ComposeForm::default(),
            transactional_form: TransactionalForm::default(),
            ai_form: AiForm::default(),
            ai_draft: None,
            import_path: String::new(),
            import_preview: None,
        }
    }

    /// Mount the entry route. The Home guard lands on Login or Dashboard
    /// depending on the stored session.
    pub async fn init(&mut self) -> AppResult<()> {
        self.goto_path("/").await;
        Ok(())
    }

    fn nav_context(&self) -> NavContext {
        NavContext {
            authenticated: self.session.is_authenticated(),
        }
    }

    pub async fn goto_path(&mut self, path: &str) {
        let ctx = self.nav_context();
        let outcome = self.router.navigate(path, &ctx);
        self.settle(outcome).await;
    }

    pub async fn goto(&mut self, route: Route) {
        let ctx = self.nav_context();
        let outcome = self.router.navigate_route(route, &ctx);
        self.settle(outcome).await;
    }

    /// Run the mounted screen's data load. A failure replaces the screen
    /// with the generic error view; navigation itself never fails.
    async fn settle(&mut self, outcome: NavOutcome) {
        let route = match outcome {
            NavOutcome::Mounted(route) => route,
            NavOutcome::Denied => return,
        };

        self.overlay = Overlay::None;

        if let Err(e) = self.after_mount(route).await {
            self.show_error(&format!("Failed to load {}: {}", route.title(), e));
            self.router.fail();
        }
    }

    async fn after_mount(&mut self, route: Route) -> AppResult<()> {
        match route {
            Route::Dashboard => {
                self.refresh_contacts().await?;
                self.refresh_groups().await?;
                self.refresh_logs().await?;
            }
            Route::Recipients => self.refresh_contacts().await?,
            Route::Campaigns => {
                self.refresh_contacts().await?;
                self.refresh_groups().await?;
            }
            Route::MarketingEmail | Route::TransactionalEmail => {
                self.refresh_groups().await?;
            }
            Route::EmailLogs => self.refresh_logs().await?,
            Route::Home
            | Route::Login
            | Route::Register
            | Route::AiGenerator
            | Route::Error => {}
        }
        Ok(())
    }

    async fn refresh_contacts(&mut self) -> AppResult<()> {
        self.contacts = self.api.contacts().await?;
        self.selected_contact_idx = if self.contacts.is_empty() {
            None
        } else {
            Some(
                self.selected_contact_idx
                    .unwrap_or(0)
                    .min(self.contacts.len() - 1),
            )
        };
        self.last_refresh = Some(Local::now());
        Ok(())
    }

    async fn refresh_groups(&mut self) -> AppResult<()> {
        self.groups = self.api.groups().await?;
        self.selected_group_idx = if self.groups.is_empty() {
            None
        } else {
            Some(
                self.selected_group_idx
                    .unwrap_or(0)
                    .min(self.groups.len() - 1),
            )
        };
        self.last_refresh = Some(Local::now());
        Ok(())
    }

    async fn refresh_logs(&mut self) -> AppResult<()> {
        self.logs = self.api.email_logs().await?;
        self.selected_log_idx = if self.logs.is_empty() { None } else { Some(0) };
        self.last_refresh = Some(Local::now());
        Ok(())
    }

    // -----------------------------------------------------------------
    // Status messages
    // -----------------------------------------------------------------

    pub fn show_error(&mut self, message: &str) {
        self.error_message = Some(message.to_string());
        self.info_message = None;
        self.message_timeout = Some(Instant::now());
    }

    pub fn show_info(&mut self, message: &str) {
        self.info_message = Some(message.to_string());
        self.error_message = None;
        self.message_timeout = Some(Instant::now());
    }

    /// Periodic update: expire stale status messages.
    pub fn tick(&mut self) {
        if let Some(since) = self.message_timeout {
            let limit = Duration::from_secs(self.config.ui.message_timeout_secs);
            if since.elapsed() >= limit {
                self.error_message = None;
                self.info_message = None;
                self.message_timeout = None;
            }
        }
    }

    // -----------------------------------------------------------------
    // Key handling
    // -----------------------------------------------------------------

    pub async fn handle_key_event(&mut self, key: KeyEvent) -> AppResult<()> {
        if self.handle_global_key(&key).await? {
            return Ok(());
        }

        match self.router.current() {
            Route::Login => self.handle_login_key(key).await?,
            Route::Register => self.handle_register_key(key).await?,
            Route::Dashboard => self.handle_dashboard_key(key).await?,
            Route::Recipients => self.handle_recipients_key(key).await?,
            Route::Campaigns => self.handle_campaigns_key(key).await?,
            Route::MarketingEmail => self.handle_marketing_key(key).await?,
            Route::TransactionalEmail => self.handle_transactional_key(key).await?,
            Route::AiGenerator => self.handle_ai_key(key).await?,
            Route::EmailLogs => self.handle_logs_key(key).await?,
            Route::Error => self.handle_error_key(key).await?,
            Route::Home => {}
        }
        Ok(())
    }

    /// Ctrl shortcuts work everywhere, even inside text fields. Returns
    /// true when the key was consumed.
    async fn handle_global_key(&mut self, key: &KeyEvent) -> AppResult<bool> {
        if !key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::F(1) {
                self.overlay = if self.overlay == Overlay::Help {
                    Overlay::None
                } else {
                    Overlay::Help
                };
                return Ok(true);
            }
            return Ok(false);
        }

        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
            }
            KeyCode::Char('d') => self.goto(Route::Dashboard).await,
            KeyCode::Char('r') => self.goto(Route::Recipients).await,
            KeyCode::Char('g') => self.goto(Route::Campaigns).await,
            KeyCode::Char('m') => self.goto(Route::MarketingEmail).await,
            KeyCode::Char('t') => self.goto(Route::TransactionalEmail).await,
            KeyCode::Char('a') => self.goto(Route::AiGenerator).await,
            KeyCode::Char('l') => self.goto(Route::EmailLogs).await,
            KeyCode::Char('o') => self.logout().await?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    async fn handle_login_key(&mut self, key: KeyEvent) -> AppResult<()> {
        let form = &mut self.login_form;
        match key.code {
            KeyCode::Tab | KeyCode::Down => form.field = (form.field + 1) % 2,
            KeyCode::BackTab | KeyCode::Up => form.field = (form.field + 1) % 2,
            KeyCode::Char(c) => match form.field {
                0 => form.email.push(c),
                _ => form.password.push(c),
            },
            KeyCode::Backspace => {
                match form.field {
                    0 => form.email.pop(),
                    _ => form.password.pop(),
                };
            }
            KeyCode::Enter => self.submit_login().await?,
            KeyCode::F(2) => self.goto(Route::Register).await,
            _ => {}
        }
        Ok(())
    }

    async fn handle_register_key(&mut self, key: KeyEvent) -> AppResult<()> {
        let form = &mut self.register_form;
        match key.code {
            KeyCode::Tab | KeyCode::Down => form.field = (form.field + 1) % 3,
            KeyCode::BackTab | KeyCode::Up => form.field = (form.field + 2) % 3,
            KeyCode::Char(c) => match form.field {
                0 => form.email.push(c),
                1 => form.password.push(c),
                _ => form.confirm.push(c),
            },
            KeyCode::Backspace => {
                match form.field {
                    0 => form.email.pop(),
                    1 => form.password.pop(),
                    _ => form.confirm.pop(),
                };
            }
            KeyCode::Enter => self.submit_register().await?,
            KeyCode::Esc | KeyCode::F(2) => self.goto(Route::Login).await,
            _ => {}
        }
        Ok(())
    }

    async fn handle_dashboard_key(&mut self, key: KeyEvent) -> AppResult<()> {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('r') => self.goto(Route::Recipients).await,
            KeyCode::Char('g') => self.goto(Route::Campaigns).await,
            KeyCode::Char('m') => self.goto(Route::MarketingEmail).await,
            KeyCode::Char('t') => self.goto(Route::TransactionalEmail).await,
            KeyCode::Char('a') => self.goto(Route::AiGenerator).await,
            KeyCode::Char('l') => self.goto(Route::EmailLogs).await,
            KeyCode::Char('o') => self.logout().await?,
            _ => {}
        }
        Ok(())
    }

    async fn handle_recipients_key(&mut self, key: KeyEvent) -> AppResult<()> {
        match self.overlay {
            Overlay::ContactForm => return self.handle_contact_form_key(key).await,
            Overlay::ConfirmDeleteContact => {
                match key.code {
                    KeyCode::Char('y') | KeyCode::Enter => self.delete_selected_contact().await?,
                    KeyCode::Char('n') | KeyCode::Esc => self.overlay = Overlay::None,
                    _ => {}
                }
                return Ok(());
            }
            Overlay::ImportPath => return self.handle_import_path_key(key).await,
            Overlay::ImportPreview => {
                match key.code {
                    KeyCode::Char('y') | KeyCode::Enter => self.confirm_import().await?,
                    KeyCode::Char('n') | KeyCode::Esc => {
                        self.import_preview = None;
                        self.overlay = Overlay::None;
                    }
                    _ => {}
                }
                return Ok(());
            }
            _ => {}
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => move_up(&mut self.selected_contact_idx),
            KeyCode::Down | KeyCode::Char('j') => {
                let len = self.contacts.len();
                move_down(&mut self.selected_contact_idx, len);
            }
            KeyCode::Char('n') => {
                self.contact_form = ContactForm::default();
                self.overlay = Overlay::ContactForm;
            }
            KeyCode::Char('e') => {
                if let Some(idx) = self.selected_contact_idx {
                    let contact = &self.contacts[idx];
                    self.contact_form = ContactForm {
                        name: contact.name.clone(),
                        email: contact.email.clone(),
                        editing_id: Some(contact.id.clone()),
                        field: 0,
                    };
                    self.overlay = Overlay::ContactForm;
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if self.selected_contact_idx.is_some() {
                    self.overlay = Overlay::ConfirmDeleteContact;
                }
            }
            KeyCode::Char('i') => {
                self.import_path.clear();
                self.overlay = Overlay::ImportPath;
            }
            KeyCode::Char('r') => {
                self.refresh_contacts().await?;
                self.show_info("Recipients refreshed");
            }
            KeyCode::Esc => self.go_back().await,
            _ => {}
        }
        Ok(())
    }

    async fn handle_contact_form_key(&mut self, key: KeyEvent) -> AppResult<()> {
        let form = &mut self.contact_form;
        match key.code {
            KeyCode::Tab | KeyCode::Down => form.field = (form.field + 1) % 2,
            KeyCode::BackTab | KeyCode::Up => form.field = (form.field + 1) % 2,
            KeyCode::Char(c) => match form.field {
                0 => form.name.push(c),
                _ => form.email.push(c),
            },
            KeyCode::Backspace => {
                match form.field {
                    0 => form.name.pop(),
                    _ => form.email.pop(),
                };
            }
            KeyCode::Enter => self.submit_contact_form().await?,
            KeyCode::Esc => self.overlay = Overlay::None,
            _ => {}
        }
        Ok(())
    }

    async fn handle_import_path_key(&mut self, key: KeyEvent) -> AppResult<()> {
        match key.code {
            KeyCode::Char(c) => self.import_path.push(c),
            KeyCode::Backspace => {
                self.import_path.pop();
            }
            KeyCode::Enter => self.upload_import_file().await?,
            KeyCode::Esc => self.overlay = Overlay::None,
            _ => {}
        }
        Ok(())
    }

    async fn handle_campaigns_key(&mut self, key: KeyEvent) -> AppResult<()> {
        match self.overlay {
            Overlay::GroupForm => return self.handle_group_form_key(key).await,
            Overlay::ConfirmDeleteGroup => {
                match key.code {
                    KeyCode::Char('y') | KeyCode::Enter => self.delete_selected_group().await?,
                    KeyCode::Char('n') | KeyCode::Esc => self.overlay = Overlay::None,
                    _ => {}
                }
                return Ok(());
            }
            _ => {}
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => move_up(&mut self.selected_group_idx),
            KeyCode::Down | KeyCode::Char('j') => {
                let len = self.groups.len();
                move_down(&mut self.selected_group_idx, len);
            }
            KeyCode::Char('n') => {
                self.group_form = GroupForm::default();
                self.overlay = Overlay::GroupForm;
            }
            KeyCode::Char('e') => {
                if let Some(idx) = self.selected_group_idx {
                    let group = &self.groups[idx];
                    self.group_form = GroupForm {
                        name: group.group_name.clone(),
                        members: group.contact_ids.iter().cloned().collect(),
                        cursor: 0,
                        editing_id: Some(group.id.clone()),
                        field: 0,
                    };
                    self.overlay = Overlay::GroupForm;
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if self.selected_group_idx.is_some() {
                    self.overlay = Overlay::ConfirmDeleteGroup;
                }
            }
            KeyCode::Char('r') => {
                self.refresh_groups().await?;
                self.show_info("Campaigns refreshed");
            }
            KeyCode::Esc => self.go_back().await,
            _ => {}
        }
        Ok(())
    }

    async fn handle_group_form_key(&mut self, key: KeyEvent) -> AppResult<()> {
        let form = &mut self.group_form;
        match key.code {
            // Field 0 is the name, field 1 the member picker.
            KeyCode::Tab => form.field = (form.field + 1) % 2,
            KeyCode::BackTab => form.field = (form.field + 1) % 2,
            KeyCode::Char(c) if form.field == 0 => form.name.push(c),
            KeyCode::Backspace if form.field == 0 => {
                form.name.pop();
            }
            KeyCode::Up => form.cursor = form.cursor.saturating_sub(1),
            KeyCode::Down => {
                if !self.contacts.is_empty() {
                    form.cursor = (form.cursor + 1).min(self.contacts.len() - 1);
                }
            }
            KeyCode::Char(' ') if form.field == 1 => {
                if let Some(contact) = self.contacts.get(form.cursor) {
                    if !form.members.remove(&contact.id) {
                        form.members.insert(contact.id.clone());
                    }
                }
            }
            KeyCode::Enter => self.submit_group_form().await?,
            KeyCode::Esc => self.overlay = Overlay::None,
            _ => {}
        }
        Ok(())
    }

    async fn handle_marketing_key(&mut self, key: KeyEvent) -> AppResult<()> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
            return self.submit_marketing_send().await;
        }

        let form = &mut self.compose_form;
        match key.code {
            // Fields: 0 subject, 1 recipients, 2 body.
            KeyCode::Tab => form.field = (form.field + 1) % 3,
            KeyCode::BackTab => form.field = (form.field + 2) % 3,
            KeyCode::Char('g') if form.field == 1 => form.use_group = !form.use_group,
            KeyCode::Left if form.field == 1 && form.use_group => {
                form.group_idx = form.group_idx.saturating_sub(1);
            }
            KeyCode::Right if form.field == 1 && form.use_group => {
                if !self.groups.is_empty() {
                    form.group_idx = (form.group_idx + 1).min(self.groups.len() - 1);
                }
            }
            KeyCode::Char(c) => match form.field {
                0 => form.subject.push(c),
                1 if !form.use_group => form.to_text.push(c),
                2 => form.body.push(c),
                _ => {}
            },
            KeyCode::Backspace => {
                match form.field {
                    0 => form.subject.pop(),
                    1 if !form.use_group => form.to_text.pop(),
                    2 => form.body.pop(),
                    _ => None,
                };
            }
            KeyCode::Enter if form.field == 2 => form.body.push('\n'),
            KeyCode::Esc => self.go_back().await,
            _ => {}
        }
        Ok(())
    }

    async fn handle_transactional_key(&mut self, key: KeyEvent) -> AppResult<()> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
            return self.submit_transactional_send().await;
        }

        let form = &mut self.transactional_form;
        match key.code {
            // Fields: 0 subject, 1 audience, 2 attachments, 3 body.
            KeyCode::Tab => form.field = (form.field + 1) % 4,
            KeyCode::BackTab => form.field = (form.field + 3) % 4,
            KeyCode::Char('g') if form.field == 1 => form.send_to_all = !form.send_to_all,
            KeyCode::Left if form.field == 1 && !form.send_to_all => {
                form.group_idx = form.group_idx.saturating_sub(1);
            }
            KeyCode::Right if form.field == 1 && !form.send_to_all => {
                if !self.groups.is_empty() {
                    form.group_idx = (form.group_idx + 1).min(self.groups.len() - 1);
                }
            }
            KeyCode::Char(c) => match form.field {
                0 => form.subject.push(c),
                2 => form.attachments_text.push(c),
                3 => form.body.push(c),
                _ => {}
            },
            KeyCode::Backspace => {
                match form.field {
                    0 => form.subject.pop(),
                    2 => form.attachments_text.pop(),
                    3 => form.body.pop(),
                    _ => None,
                };
            }
            KeyCode::Enter if form.field == 2 => form.attachments_text.push('\n'),
            KeyCode::Enter if form.field == 3 => form.body.push('\n'),
            KeyCode::Esc => self.go_back().await,
            _ => {}
        }
        Ok(())
    }

    async fn handle_ai_key(&mut self, key: KeyEvent) -> AppResult<()> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
            return self.submit_ai_generate().await;
        }

        let form = &mut self.ai_form;
        match key.code {
            // Fields: 0 subject hint, 1 tone, 2 audience, 3 key points.
            KeyCode::Tab => form.field = (form.field + 1) % 4,
            KeyCode::BackTab => form.field = (form.field + 3) % 4,
            KeyCode::Left if form.field == 1 => {
                form.tone_idx = form.tone_idx.checked_sub(1).unwrap_or(AI_TONES.len() - 1);
            }
            KeyCode::Right if form.field == 1 => {
                form.tone_idx = (form.tone_idx + 1) % AI_TONES.len();
            }
            KeyCode::Char(c) => match form.field {
                0 => form.subject_hint.push(c),
                2 => form.audience.push(c),
                3 => form.key_points_text.push(c),
                _ => {}
            },
            KeyCode::Backspace => {
                match form.field {
                    0 => form.subject_hint.pop(),
                    2 => form.audience.pop(),
                    3 => form.key_points_text.pop(),
                    _ => None,
                };
            }
            KeyCode::Enter if form.field == 3 => form.key_points_text.push('\n'),
            KeyCode::Enter => {
                if self.ai_draft.is_some() {
                    self.use_ai_draft().await;
                }
            }
            KeyCode::Esc => self.go_back().await,
            _ => {}
        }
        Ok(())
    }

    async fn handle_logs_key(&mut self, key: KeyEvent) -> AppResult<()> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => move_up(&mut self.selected_log_idx),
            KeyCode::Down | KeyCode::Char('j') => {
                let len = self.logs.len();
                move_down(&mut self.selected_log_idx, len);
            }
            KeyCode::Char('r') => {
                self.refresh_logs().await?;
                self.show_info("Logs refreshed");
            }
            KeyCode::Esc => self.go_back().await,
            _ => {}
        }
        Ok(())
    }

    async fn handle_error_key(&mut self, key: KeyEvent) -> AppResult<()> {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => self.goto(Route::Home).await,
            KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
        Ok(())
    }

    async fn go_back(&mut self) {
        let ctx = self.nav_context();
        if let Some(route) = self.router.back(&ctx) {
            if let Err(e) = self.after_mount(route).await {
                self.show_error(&format!("Failed to load {}: {}", route.title(), e));
                self.router.fail();
            }
        }
    }

    // -----------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------

    async fn submit_login(&mut self) -> AppResult<()> {
        let email = self.login_form.email.trim().to_string();
        let password = self.login_form.password.clone();

        if let Err(msg) = validators::validate_email(&email) {
            self.show_error(&msg);
            return Ok(());
        }
        if password.is_empty() {
            self.show_error("Password is required");
            return Ok(());
        }

        match self.api.login(&email, &password).await {
            Ok(user) => {
                self.session.set_token(&user.token)?;
                self.session.set_user_email(&user.email)?;
                if let Some(refresh) = &user.refresh_token {
                    self.session.set_refresh_token(refresh)?;
                }
                self.login_form = LoginForm::default();
                self.goto(Route::Dashboard).await;
                self.show_info(&format!("Signed in as {}", user.email));
            }
            Err(e) => self.show_error(&e.to_string()),
        }
        Ok(())
    }

    async fn submit_register(&mut self) -> AppResult<()> {
        let email = self.register_form.email.trim().to_string();
        let password = self.register_form.password.clone();
        let confirm = self.register_form.confirm.clone();

        let checks = validators::validate_email(&email)
            .and_then(|_| validators::validate_password(&password))
            .and_then(|_| validators::validate_password_match(&password, &confirm));
        if let Err(msg) = checks {
            self.show_error(&msg);
            return Ok(());
        }

        match self.api.register(&email, &password).await {
            Ok(_) => {
                self.register_form = RegisterForm::default();
                self.goto(Route::Login).await;
                self.show_info("Account created, please sign in");
            }
            Err(e) => self.show_error(&e.to_string()),
        }
        Ok(())
    }

    pub async fn logout(&mut self) -> AppResult<()> {
        // Best effort; the local session is cleared regardless.
        if self.session.is_authenticated() {
            if let Err(e) = self.api.logout().await {
                warn!("Server-side logout failed: {}", e);
            }
        }
        self.session.clear()?;

        self.contacts.clear();
        self.groups.clear();
        self.logs.clear();
        self.goto(Route::Login).await;
        self.show_info("Signed out");
        Ok(())
    }

    async fn submit_contact_form(&mut self) -> AppResult<()> {
        let name = self.contact_form.name.trim().to_string();
        let email = self.contact_form.email.trim().to_string();

        let checks = validators::validate_required("Name", &name)
            .and_then(|_| validators::validate_email(&email));
        if let Err(msg) = checks {
            self.show_error(&msg);
            return Ok(());
        }

        let result = match self.contact_form.editing_id.clone() {
            Some(id) => {
                let patch = ContactPatch {
                    name: Some(name),
                    email: Some(email),
                };
                self.api.update_contact(&id, &patch).await.map(|_| ())
            }
            None => {
                let draft = ContactDraft { name, email };
                self.api.create_contact(&draft).await.map(|_| ())
            }
        };

        match result {
            Ok(()) => {
                self.overlay = Overlay::None;
                self.refresh_contacts().await?;
                self.show_info("Recipient saved");
            }
            Err(e) => self.show_error(&e.to_string()),
        }
        Ok(())
    }

    async fn delete_selected_contact(&mut self) -> AppResult<()> {
        let id = match self.selected_contact_idx {
            Some(idx) => self.contacts[idx].id.clone(),
            None => return Ok(()),
        };

        match self.api.delete_contact(&id).await {
            Ok(_) => {
                self.overlay = Overlay::None;
                self.refresh_contacts().await?;
                self.show_info("Recipient deleted");
            }
            Err(e) => {
                self.overlay = Overlay::None;
                self.show_error(&e.to_string());
            }
        }
        Ok(())
    }

    async fn upload_import_file(&mut self) -> AppResult<()> {
        let path = shellexpand::tilde(self.import_path.trim()).into_owned();
        if path.is_empty() {
            self.show_error("File path is required");
            return Ok(());
        }

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.show_error(&format!("Cannot read {}: {}", path, e));
                return Ok(());
            }
        };

        let filename = std::path::Path::new(&path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "contacts.csv".to_string());

        match self.api.parse_import(&filename, bytes).await {
            Ok(preview) => {
                if preview.count == 0 {
                    self.overlay = Overlay::None;
                    self.show_error("No recipients found in file");
                } else {
                    self.import_preview = Some(preview);
                    self.overlay = Overlay::ImportPreview;
                }
            }
            Err(e) => {
                self.overlay = Overlay::None;
                self.show_error(&e.to_string());
            }
        }
        Ok(())
    }

    async fn confirm_import(&mut self) -> AppResult<()> {
        let preview = match self.import_preview.take() {
            Some(preview) => preview,
            None => return Ok(()),
        };

        let request = BulkCreateRequest {
            contacts: preview.contacts,
            group_id: None,
        };

        match self.api.bulk_create_contacts(&request).await {
            Ok(report) => {
                self.overlay = Overlay::None;
                self.refresh_contacts().await?;
                self.show_info(&format!(
                    "Imported {} of {} recipients",
                    report.added_count, report.total_processed
                ));
            }
            Err(e) => {
                self.overlay = Overlay::None;
                self.show_error(&e.to_string());
            }
        }
        Ok(())
    }

    async fn submit_group_form(&mut self) -> AppResult<()> {
        let name = self.group_form.name.trim().to_string();
        if let Err(msg) = validators::validate_required("Campaign name", &name) {
            self.show_error(&msg);
            return Ok(());
        }

        let member_ids: Vec<String> = self
            .contacts
            .iter()
            .filter(|c| self.group_form.members.contains(&c.id))
            .map(|c| c.id.clone())
            .collect();

        let result = match self.group_form.editing_id.clone() {
            Some(id) => {
                let patch = GroupPatch {
                    group_name: Some(name),
                    contact_ids: Some(member_ids),
                };
                self.api.update_group(&id, &patch).await.map(|_| ())
            }
            None => {
                let draft = GroupDraft {
                    group_name: name,
                    contact_ids: member_ids,
                };
                self.api.create_group(&draft).await.map(|_| ())
            }
        };

        match result {
            Ok(()) => {
                self.overlay = Overlay::None;
                self.refresh_groups().await?;
                self.show_info("Campaign saved");
            }
            Err(e) => self.show_error(&e.to_string()),
        }
        Ok(())
    }

    async fn delete_selected_group(&mut self) -> AppResult<()> {
        let id = match self.selected_group_idx {
            Some(idx) => self.groups[idx].id.clone(),
            None => return Ok(()),
        };

        match self.api.delete_group(&id).await {
            Ok(_) => {
                self.overlay = Overlay::None;
                self.refresh_groups().await?;
                self.show_info("Campaign deleted");
            }
            Err(e) => {
                self.overlay = Overlay::None;
                self.show_error(&e.to_string());
            }
        }
        Ok(())
    }

    async fn submit_marketing_send(&mut self) -> AppResult<()> {
        let subject = self.compose_form.subject.trim().to_string();
        let body = self.compose_form.body.clone();

        let checks = validators::validate_required("Subject", &subject)
            .and_then(|_| validators::validate_required("Body", &body));
        if let Err(msg) = checks {
            self.show_error(&msg);
            return Ok(());
        }

        let send = if self.compose_form.use_group {
            let group = match self.groups.get(self.compose_form.group_idx) {
                Some(group) => group,
                None => {
                    self.show_error("Please select a campaign");
                    return Ok(());
                }
            };
            EmailSend {
                subject,
                body,
                to_emails: None,
                group_id: Some(group.id.clone()),
            }
        } else {
            let recipients = match parse_recipients(&self.compose_form.to_text) {
                Ok(list) => list,
                Err(msg) => {
                    self.show_error(&msg);
                    return Ok(());
                }
            };
            EmailSend {
                subject,
                body,
                to_emails: Some(recipients),
                group_id: None,
            }
        };

        self.loading = true;
        let result = self.api.send_email(&send).await;
        self.loading = false;

        match result {
            Ok(report) => {
                self.compose_form = ComposeForm::default();
                self.show_info(&format!("Email sent to {} recipients", report.recipients.len()));
            }
            Err(e) => self.show_error(&e.to_string()),
        }
        Ok(())
    }

    async fn submit_transactional_send(&mut self) -> AppResult<()> {
        let subject = self.transactional_form.subject.trim().to_string();
        let body = self.transactional_form.body.clone();

        let checks = validators::validate_required("Subject", &subject)
            .and_then(|_| validators::validate_required("Body", &body));
        if let Err(msg) = checks {
            self.show_error(&msg);
            return Ok(());
        }

        let audience = if self.transactional_form.send_to_all {
            NewsletterAudience::AllSubscribers
        } else {
            match self.groups.get(self.transactional_form.group_idx) {
                Some(group) => NewsletterAudience::Groups(vec![group.id.clone()]),
                None => {
                    self.show_error("Please select a campaign");
                    return Ok(());
                }
            }
        };

        let mut attachments = Vec::new();
        for line in self.transactional_form.attachments_text.lines() {
            let path = shellexpand::tilde(line.trim()).into_owned();
            if path.is_empty() {
                continue;
            }
            match std::fs::read(&path) {
                Ok(bytes) => {
                    let name = std::path::Path::new(&path)
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "attachment".to_string());
                    attachments.push((name, bytes));
                }
                Err(e) => {
                    self.show_error(&format!("Cannot read {}: {}", path, e));
                    return Ok(());
                }
            }
        }

        self.loading = true;
        let result = self
            .api
            .send_transactional(&subject, &body, &audience, attachments)
            .await;
        self.loading = false;

        match result {
            Ok(report) => {
                self.transactional_form = TransactionalForm::default();
                self.show_info(&format!("Email sent to {} recipients", report.recipients.len()));
            }
            Err(e) => self.show_error(&e.to_string()),
        }
        Ok(())
    }

    async fn submit_ai_generate(&mut self) -> AppResult<()> {
        let request = AiEmailRequest {
            subject_hint: non_empty(self.ai_form.subject_hint.trim()),
            tone: Some(AI_TONES[self.ai_form.tone_idx].to_string()),
            audience: non_empty(self.ai_form.audience.trim()),
            key_points: self
                .ai_form
                .key_points_text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
        };

        self.loading = true;
        let result = self.api.generate_email(&request).await;
        self.loading = false;

        match result {
            Ok(draft) => {
                self.ai_draft = Some(draft);
                self.show_info("Draft generated; press Enter to use it");
            }
            Err(e) => self.show_error(&e.to_string()),
        }
        Ok(())
    }

    /// Copy the AI draft into the marketing compose form and switch there.
    async fn use_ai_draft(&mut self) {
        if let Some(draft) = self.ai_draft.take() {
            self.compose_form.subject = draft.subject;
            self.compose_form.body = draft.body;
            self.goto(Route::MarketingEmail).await;
            self.show_info("Draft loaded into compose form");
        }
    }
}

fn move_up(selection: &mut Option<usize>) {
    if let Some(idx) = selection {
        *idx = idx.saturating_sub(1);
    }
}

fn move_down(selection: &mut Option<usize>, len: usize) {
    if len == 0 {
        *selection = None;
        return;
    }
    match selection {
        Some(idx) => *idx = (*idx + 1).min(len - 1),
        None => *selection = Some(0),
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Comma-separated addresses, each validated before anything hits the wire.
fn parse_recipients(text: &str) -> Result<Vec<String>, String> {
    let recipients: Vec<String> = text
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if recipients.is_empty() {
        return Err("Please enter at least one recipient".to_string());
    }
    for address in &recipients {
        validators::validate_email(address)?;
    }
    Ok(recipients)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app(base_url: &str, dir: &tempfile::TempDir, token: Option<&str>) -> App {
        let mut config = Config::default();
        config.api_base_url = base_url.to_string();

        let session = SessionStore::file_at(dir.path().join("session.json"));
        if let Some(token) = token {
            session.set_token(token).unwrap();
            session.set_user_email("user@example.com").unwrap();
        }
        App::new(config, session)
    }

    #[test]
    fn recipient_parsing() {
        assert_eq!(
            parse_recipients("a@x.com, b@y.org").unwrap(),
            vec!["a@x.com".to_string(), "b@y.org".to_string()]
        );
        assert!(parse_recipients("").is_err());
        assert!(parse_recipients("a@x.com, nope").is_err());
    }

    #[tokio::test]
    async fn unauthenticated_start_lands_on_login() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app("http://127.0.0.1:1", &dir, None);

        app.init().await.unwrap();

        assert_eq!(app.router.current(), Route::Login);
        assert_eq!(app.router.history(), &[Route::Login]);
    }

    #[tokio::test]
    async fn unauthenticated_dashboard_redirects_to_login() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app("http://127.0.0.1:1", &dir, None);

        app.goto_path("/dashboard").await;

        assert_eq!(app.router.current(), Route::Login);
    }

    #[tokio::test]
    async fn authenticated_start_loads_dashboard_data() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();

        server
            .mock("GET", "/contacts")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id": "c1", "name": "Ada", "email": "ada@example.com"}]"#)
            .create_async()
            .await;
        server
            .mock("GET", "/groups")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id": "g1", "group_name": "VIP", "contact_ids": ["c1"]}]"#)
            .create_async()
            .await;
        server
            .mock("GET", "/email/logs")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"subject": "Hi", "sent_to": ["ada@example.com"], "status": "success"}]"#)
            .create_async()
            .await;

        let mut app = test_app(&server.url(), &dir, Some("tok"));
        app.init().await.unwrap();

        assert_eq!(app.router.current(), Route::Dashboard);
        assert_eq!(app.contacts.len(), 1);
        assert_eq!(app.groups.len(), 1);
        assert_eq!(app.logs.len(), 1);
    }

    #[tokio::test]
    async fn failed_screen_load_mounts_error_view() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();

        server
            .mock("GET", "/contacts")
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail": "database down"}"#)
            .create_async()
            .await;

        let mut app = test_app(&server.url(), &dir, Some("tok"));
        app.goto(Route::Recipients).await;

        assert_eq!(app.router.current(), Route::Error);
        assert!(app.error_message.as_deref().unwrap().contains("database down"));
    }

    #[tokio::test]
    async fn logout_clears_session_and_returns_to_login() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();

        server
            .mock("POST", "/auth/logout")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": "ok"}"#)
            .create_async()
            .await;

        let mut app = test_app(&server.url(), &dir, Some("tok"));
        app.logout().await.unwrap();

        assert!(!app.session.is_authenticated());
        assert_eq!(app.router.current(), Route::Login);
    }

    #[tokio::test]
    async fn message_expires_after_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app("http://127.0.0.1:1", &dir, None);
        app.config.ui.message_timeout_secs = 0;

        app.show_error("boom");
        assert!(app.error_message.is_some());

        app.tick();
        assert!(app.error_message.is_none());
    }
}
