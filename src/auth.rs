//! Login flow against the provider portal
//!
//! The portal has no API. Getting the usage export takes three dependent
//! round-trips, modelled as a state machine that only moves forward:
//!
//! ```text
//! Unauthenticated --login form--> LoginSubmitted --secondary form--> SecondaryAuthenticated --export--> DataRetrieved
//! ```
//!
//! Each [`LoginFlow::step`] performs one transition and consumes the flow, so
//! a flow that failed half-way (holding only the primary cookies) cannot be
//! resumed. A new attempt starts from a new session.

use crate::config::ProviderConfig;
use crate::error::{HydroError, Result};
use crate::form::{
    FieldPredicate, FormDescriptor, extract_form, extract_form_with_fields, is_password_input,
    is_text_input,
};
use crate::http::{HttpSession, Page, ReqwestSession};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::submit::submit_redirect_form;
use crate::trust::TrustBundle;
use reqwest::Url;
use std::fmt;

/// Account credentials for the self-serve portal
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Parsed provider endpoints and form selectors
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub login: Url,
    pub usage: Url,
    pub export: Url,
    pub login_form_selector: String,
    pub secondary_form_selector: String,
}

impl Endpoints {
    pub fn from_config(provider: &ProviderConfig) -> Result<Self> {
        let parse = |field: &str, raw: &str| {
            Url::parse(raw).map_err(|e| {
                HydroError::validation(field, &format!("Invalid URL '{}': {}", raw, e))
            })
        };
        Ok(Self {
            login: parse("provider.login_url", &provider.login_url)?,
            usage: parse("provider.usage_url", &provider.usage_url)?,
            export: parse("provider.export_url", &provider.export_url)?,
            login_form_selector: provider.login_form_selector.clone(),
            secondary_form_selector: provider.secondary_form_selector.clone(),
        })
    }
}

/// Where a login flow currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    /// Nothing sent yet
    Unauthenticated,
    /// Credentials accepted; session holds the primary cookies
    LoginSubmitted,
    /// Secondary token form accepted; session may download the export
    SecondaryAuthenticated,
    /// Terminal: raw CSV export
    DataRetrieved(String),
}

impl LoginState {
    pub fn name(&self) -> &'static str {
        match self {
            LoginState::Unauthenticated => "unauthenticated",
            LoginState::LoginSubmitted => "login_submitted",
            LoginState::SecondaryAuthenticated => "secondary_authenticated",
            LoginState::DataRetrieved(_) => "data_retrieved",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LoginState::DataRetrieved(_))
    }
}

impl fmt::Display for LoginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Build the filled-in login form from the static login page
///
/// The page has to contain exactly one text input and one password input
/// and the form more than two fields; anything else means the page was
/// redesigned or hollowed out.
pub fn prepare_login_form(
    page: &Page,
    selector: &str,
    credentials: &Credentials,
) -> Result<FormDescriptor> {
    let username: FieldPredicate<'_> = &is_text_input;
    let password: FieldPredicate<'_> = &is_password_input;
    let (form, fields) = extract_form_with_fields(
        page,
        selector,
        &[("username", username), ("password", password)],
    )?;

    let username_field = fields.require_single_name("username")?.to_string();
    let password_field = fields.require_single_name("password")?.to_string();
    if form.fields().len() <= 2 {
        return Err(HydroError::structural(format!(
            "Login form on {} has only {} field(s)",
            page.url,
            form.fields().len()
        )));
    }

    Ok(form
        .with_field(&username_field, &credentials.username)
        .with_field(&password_field, &credentials.password))
}

/// One authentication sequence, exclusively owning its session
pub struct LoginFlow<S: HttpSession> {
    session: S,
    endpoints: Endpoints,
    credentials: Credentials,
    state: LoginState,
    login_page: Option<Page>,
    logger: StructuredLogger,
}

impl<S: HttpSession> LoginFlow<S> {
    pub fn new(session: S, endpoints: Endpoints, credentials: Credentials) -> Self {
        let flow_id = uuid::Uuid::new_v4().to_string();
        let logger = get_logger_with_context(LogContext::new("auth").with_flow_id(flow_id));
        Self {
            session,
            endpoints,
            credentials,
            state: LoginState::Unauthenticated,
            login_page: None,
            logger,
        }
    }

    /// Use an already fetched login page instead of requesting it again
    ///
    /// The login page carries no per-user state, so callers may cache it.
    pub fn with_login_page(mut self, page: Page) -> Self {
        self.login_page = Some(page);
        self
    }

    pub fn state(&self) -> &LoginState {
        &self.state
    }

    /// The export body once the flow reached its terminal state
    pub fn into_export(self) -> Option<String> {
        match self.state {
            LoginState::DataRetrieved(csv) => Some(csv),
            _ => None,
        }
    }

    /// Perform exactly one transition
    ///
    /// Stepping a finished flow returns it unchanged.
    pub async fn step(mut self) -> Result<Self> {
        let from = self.state.name();
        let next = match self.state {
            LoginState::Unauthenticated => self.submit_login().await,
            LoginState::LoginSubmitted => self.submit_secondary().await,
            LoginState::SecondaryAuthenticated => self.download_export().await,
            LoginState::DataRetrieved(_) => return Ok(self),
        };
        match next {
            Ok(state) => {
                self.logger
                    .info(&format!("Transition {} -> {}", from, state.name()));
                self.state = state;
                Ok(self)
            }
            Err(e) => {
                self.logger.error(&format!("Login failed in {}: {}", from, e));
                Err(e)
            }
        }
    }

    /// Drive the flow to completion and return the raw CSV export
    pub async fn run(self) -> Result<String> {
        let mut flow = self;
        while !flow.state.is_terminal() {
            flow = flow.step().await?;
        }
        flow.into_export()
            .ok_or_else(|| HydroError::invariant("Login flow ended without export data"))
    }

    async fn submit_login(&mut self) -> Result<LoginState> {
        let page = match self.login_page.take() {
            Some(page) => page,
            None => self.session.get(&self.endpoints.login).await?,
        };
        let form = prepare_login_form(
            &page,
            &self.endpoints.login_form_selector,
            &self.credentials,
        )?;
        self.logger.debug(&format!(
            "Submitting login form for '{}' to {}",
            self.credentials.username(),
            form.action()
        ));
        submit_redirect_form(&mut self.session, form).await?;
        Ok(LoginState::LoginSubmitted)
    }

    async fn submit_secondary(&mut self) -> Result<LoginState> {
        let page = self.session.get(&self.endpoints.usage).await?;
        // Opaque per-request tokens, resubmitted untouched
        let form = extract_form(&page, &self.endpoints.secondary_form_selector)?;
        self.logger.debug(&format!(
            "Resubmitting secondary form ({} token field(s)) to {}",
            form.fields().len(),
            form.action()
        ));
        submit_redirect_form(&mut self.session, form).await?;
        Ok(LoginState::SecondaryAuthenticated)
    }

    async fn download_export(&mut self) -> Result<LoginState> {
        let page = self.session.get(&self.endpoints.export).await?;
        if !(200..300).contains(&page.status) {
            return Err(HydroError::network(format!(
                "Export endpoint {} answered {}",
                page.url, page.status
            )));
        }
        self.logger
            .info(&format!("Downloaded export ({} bytes)", page.body.len()));
        Ok(LoginState::DataRetrieved(page.body))
    }
}

/// Log in with a fresh reqwest session and download the usage export
pub async fn fetch_usage_export(
    provider: &ProviderConfig,
    trust: &TrustBundle,
    credentials: Credentials,
) -> Result<String> {
    let endpoints = Endpoints::from_config(provider)?;
    let session = ReqwestSession::new(provider, trust)?;
    LoginFlow::new(session, endpoints, credentials).run().await
}
