use std::path::PathBuf;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::{debug, info};

use super::cookies::Cookie;
use super::{Credentials, PortalSession, Tab};
use crate::article::ArticleId;
use crate::download::PostbackLink;
use crate::error::SessionError;

const SESSION_COOKIE: &str = "snapshot_session";

/// Replays captured portal pages from disk:
///
/// ```text
/// <root>/<JID><AID>/<tab slug>.html
/// <root>/<JID><AID>/files/<attachment name>
/// ```
///
/// Download triggers copy the named attachment into the shared download
/// directory, the way the portal would deliver it.
pub struct SnapshotSession {
    root: PathBuf,
    download_dir: PathBuf,
    current: Option<(ArticleId, Tab)>,
}

impl SnapshotSession {
    pub fn open(root: impl Into<PathBuf>, download_dir: impl Into<PathBuf>) -> Self {
        let root = root.into();
        info!("Opening snapshot session at {}", root.display());
        Self {
            root,
            download_dir: download_dir.into(),
            current: None,
        }
    }

    fn article_dir(&self, article: &ArticleId) -> PathBuf {
        self.root.join(article.key())
    }

    fn tab_file(&self, article: &ArticleId, tab: Tab) -> PathBuf {
        self.article_dir(article).join(format!("{}.html", tab.slug()))
    }

    fn current_article(&self) -> Result<&ArticleId, SessionError> {
        self.current
            .as_ref()
            .map(|(a, _)| a)
            .ok_or_else(|| SessionError::PageMissing("no article open".into()))
    }
}

#[async_trait]
impl PortalSession for SnapshotSession {
    async fn restore(&mut self, cookies: &[Cookie]) -> Result<bool, SessionError> {
        Ok(cookies.iter().any(|c| c.name == SESSION_COOKIE))
    }

    async fn login(&mut self, credentials: &Credentials) -> Result<Vec<Cookie>, SessionError> {
        let login_id = credentials.login_id.expose_secret();
        if login_id.is_empty() || credentials.password.expose_secret().is_empty() {
            return Err(SessionError::Auth("login_id / login_pwd are not set".into()));
        }
        if !self.root.is_dir() {
            return Err(SessionError::Auth(format!(
                "snapshot root {} does not exist",
                self.root.display()
            )));
        }
        Ok(vec![Cookie::new(SESSION_COOKIE, login_id)])
    }

    async fn open_article(&mut self, article: &ArticleId) -> Result<(), SessionError> {
        self.current = None;
        if !self.tab_file(article, Tab::ArticleInfo).is_file() {
            return Err(SessionError::PageMissing(article.key()));
        }
        self.current = Some((article.clone(), Tab::ArticleInfo));
        Ok(())
    }

    async fn switch_tab(&mut self, tab: Tab) -> Result<(), SessionError> {
        let article = self.current_article()?.clone();
        if !self.tab_file(&article, tab).is_file() {
            return Err(SessionError::TabNotFound(tab));
        }
        debug!(article = %article, tab = %tab, "Switched tab");
        self.current = Some((article, tab));
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String, SessionError> {
        let (article, tab) = self
            .current
            .as_ref()
            .ok_or_else(|| SessionError::PageMissing("no article open".into()))?;
        Ok(std::fs::read_to_string(self.tab_file(article, *tab))?)
    }

    async fn trigger_download(&mut self, link: &PostbackLink) -> Result<(), SessionError> {
        let article = self.current_article()?;
        let source = self.article_dir(article).join("files").join(&link.text);
        if !source.is_file() {
            return Err(SessionError::Trigger(format!(
                "postback for '{}' produced no file",
                link.text
            )));
        }
        std::fs::create_dir_all(&self.download_dir)?;
        std::fs::copy(&source, self.download_dir.join(&link.text))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.current = None;
        info!("Snapshot session closed");
        Ok(())
    }
}

// ── Tests ──
