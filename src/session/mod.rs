pub mod cookies;
pub mod snapshot;

use std::fmt;

use async_trait::async_trait;
use secrecy::SecretString;
use tracing::{info, warn};

use crate::article::ArticleId;
use crate::download::PostbackLink;
use crate::error::SessionError;
use crate::store::Section;
use cookies::{Cookie, CookieCache};

/// Portal tabs in the order they are visited for each article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    ArticleInfo,
    Attachments,
    Guidelines,
    Authors,
    ProblemNotes,
    Comments,
}

impl Tab {
    pub const VISIT_ORDER: [Tab; 6] = [
        Tab::ArticleInfo,
        Tab::Attachments,
        Tab::Guidelines,
        Tab::Authors,
        Tab::ProblemNotes,
        Tab::Comments,
    ];

    /// Text of the tab control in the portal.
    pub fn label(self) -> &'static str {
        match self {
            Tab::ArticleInfo => "Article Info",
            Tab::Attachments => "Attachments",
            Tab::Guidelines => "Guidelines",
            Tab::Authors => "Authors",
            Tab::ProblemNotes => "Problems/Notes",
            Tab::Comments => "Comments",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Tab::ArticleInfo => "article_info",
            Tab::Attachments => "attachments",
            Tab::Guidelines => "guidelines",
            Tab::Authors => "authors",
            Tab::ProblemNotes => "problem_notes",
            Tab::Comments => "comments",
        }
    }

    /// The one section this tab is the source of.
    pub fn section(self) -> Section {
        match self {
            Tab::ArticleInfo => Section::ArticleInfo,
            Tab::Attachments => Section::Attachments,
            Tab::Guidelines => Section::Guidelines,
            Tab::Authors => Section::AuthorInfo,
            Tab::ProblemNotes => Section::ProblemNotes,
            Tab::Comments => Section::Comments,
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Portal login. Both halves stay wrapped so neither reaches a log line.
#[derive(Debug)]
pub struct Credentials {
    pub login_id: SecretString,
    pub password: SecretString,
}

impl Credentials {
    /// `login_id` / `login_pwd` from the process environment; missing values
    /// become empty and are rejected at login time.
    pub fn from_env() -> Self {
        Self {
            login_id: SecretString::from(std::env::var("login_id").unwrap_or_default()),
            password: SecretString::from(std::env::var("login_pwd").unwrap_or_default()),
        }
    }
}

/// Browser-side collaborator: owns navigation, waits and downloads.
/// Implementations decide how long to wait for pages and controls.
#[async_trait]
pub trait PortalSession: Send {
    /// Inject cached cookies; `true` when the portal accepts them.
    async fn restore(&mut self, cookies: &[Cookie]) -> Result<bool, SessionError>;

    /// Fresh login; returns the session cookies to cache.
    async fn login(&mut self, credentials: &Credentials) -> Result<Vec<Cookie>, SessionError>;

    /// Navigate to the article's landing page (the Article Info tab).
    async fn open_article(&mut self, article: &ArticleId) -> Result<(), SessionError>;

    async fn switch_tab(&mut self, tab: Tab) -> Result<(), SessionError>;

    /// Markup of the tab currently shown.
    async fn page_source(&mut self) -> Result<String, SessionError>;

    /// Fire a postback link. The file lands in the shared download directory.
    async fn trigger_download(&mut self, link: &PostbackLink) -> Result<(), SessionError>;

    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Reuse a fresh cookie cache when the portal still accepts it, otherwise
/// log in and cache the new cookies.
pub async fn authenticate<S: PortalSession + ?Sized>(
    session: &mut S,
    cache: &CookieCache,
    credentials: &Credentials,
) -> Result<(), SessionError> {
    if let Some(cookies) = cache.load_fresh() {
        match session.restore(&cookies).await {
            Ok(true) => {
                info!("Session is active, cached cookies are valid");
                return Ok(());
            }
            Ok(false) => info!("Session expired, cached cookies rejected"),
            Err(e) => warn!("Error loading cookies: {}", e),
        }
    }

    info!("Performing login");
    let cookies = session.login(credentials).await?;
    info!("Login successful, saving {} cookies", cookies.len());
    if let Err(e) = cache.save(&cookies) {
        warn!("Could not write cookie cache {}: {}", cache.path().display(), e);
    }
    Ok(())
}

// ── Tests ──
