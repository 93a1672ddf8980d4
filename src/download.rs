use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use scraper::{Html, Selector};
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::article::{normalize, ArticleId};
use crate::error::DownloadError;
use crate::parser::sanitize::text_of;
use crate::retry::RetryPolicy;
use crate::session::PortalSession;

static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

const POSTBACK_MARKER: &str = "javascript:__doPostBack";

/// Anchor that fires a server-side action instead of navigating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostbackLink {
    /// Visible text; the portal names the downloaded file after it.
    pub text: String,
    pub href: String,
}

#[derive(Debug, Clone, Copy)]
pub struct DownloadSettings {
    pub timeout: Duration,
    pub poll: Duration,
    pub retry: RetryPolicy,
}

/// The postback link for the article's unedited `.docx`, if the page has one.
pub fn find_unedited_link(markup: &str, article: &ArticleId) -> Option<PostbackLink> {
    let doc = Html::parse_document(markup);
    let key = article.normalized_key();

    doc.select(&LINK).find_map(|a| {
        let text = text_of(a).trim().to_string();
        let href = a.value().attr("href")?;
        if text.is_empty() || text.contains(['/', '\\']) {
            return None;
        }
        let cleaned = normalize(&text);
        let matches = cleaned.contains(&key)
            && cleaned.contains("unedited")
            && cleaned.contains("docx")
            && href.contains(POSTBACK_MARKER);
        matches.then(|| PostbackLink {
            text,
            href: href.to_string(),
        })
    })
}

/// Poll until `path` exists or `timeout` elapses.
pub async fn wait_for_file(path: &Path, timeout: Duration, poll: Duration) -> Result<(), DownloadError> {
    let start = Instant::now();
    loop {
        if path.is_file() {
            return Ok(());
        }
        if start.elapsed() >= timeout {
            return Err(DownloadError::Timeout {
                name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                waited: timeout,
            });
        }
        tokio::time::sleep(poll).await;
    }
}

/// Move a finished download into `dir`, keeping its name. Falls back to
/// copy + delete when a rename crosses filesystems.
pub fn move_into(file: &Path, dir: &Path) -> Result<PathBuf, DownloadError> {
    let move_err = |source| DownloadError::Move {
        from: file.to_path_buf(),
        source,
    };
    let name = file
        .file_name()
        .ok_or_else(|| move_err(std::io::Error::other("path has no file name")))?;
    std::fs::create_dir_all(dir).map_err(move_err)?;
    let dest = dir.join(name);

    if std::fs::rename(file, &dest).is_err() {
        std::fs::copy(file, &dest).map_err(move_err)?;
        std::fs::remove_file(file).map_err(move_err)?;
    }
    Ok(dest)
}

/// Find the unedited manuscript on the current (attachments) page, trigger
/// it, wait for the file and move it into `article_dir`. Retried per the
/// settings; each attempt rescans the live page.
pub async fn fetch_attachment<S: PortalSession + ?Sized>(
    session: &mut S,
    article: &ArticleId,
    download_dir: &Path,
    article_dir: &Path,
    settings: &DownloadSettings,
) -> Result<PathBuf, DownloadError> {
    let result = settings
        .retry
        .run("Unedited download", session, move |session, _| async move {
            let result = try_fetch(&mut *session, article, download_dir, article_dir, settings).await;
            (session, result)
        })
        .await;

    match &result {
        Ok(path) => info!(article = %article, "File downloaded and moved to {}", path.display()),
        Err(e) => error!(article = %article, "Failed to download unedited file: {}", e),
    }
    result
}

async fn try_fetch<S: PortalSession + ?Sized>(
    session: &mut S,
    article: &ArticleId,
    download_dir: &Path,
    article_dir: &Path,
    settings: &DownloadSettings,
) -> Result<PathBuf, DownloadError> {
    let markup = session.page_source().await?;
    let link = find_unedited_link(&markup, article).ok_or(DownloadError::LinkNotFound)?;
    info!(article = %article, file = %link.text, "Found match, triggering download");
    debug!(href = %link.href, "Postback target");

    let downloaded = download_dir.join(&link.text);
    clear_stale(&downloaded)?;
    session.trigger_download(&link).await?;
    wait_for_file(&downloaded, settings.timeout, settings.poll).await?;
    move_into(&downloaded, article_dir)
}

/// A same-named file left over from an earlier attempt would satisfy the
/// wait before the new download lands.
fn clear_stale(path: &Path) -> Result<(), DownloadError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed stale download {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(DownloadError::Stale {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::error::SessionError;
    use crate::session::cookies::Cookie;
    use crate::session::{Credentials, Tab};

    /// Serves the attachments fixture; the postback only delivers a file
    /// from trigger number `deliver_on` onwards.
    struct ScriptedPortal {
        download_dir: PathBuf,
        deliver_on: Option<usize>,
        triggers: usize,
    }

    impl ScriptedPortal {
        fn new(download_dir: &Path, deliver_on: Option<usize>) -> Self {
            Self {
                download_dir: download_dir.to_path_buf(),
                deliver_on,
                triggers: 0,
            }
        }
    }

    #[async_trait]
    impl PortalSession for ScriptedPortal {
        async fn restore(&mut self, _c: &[Cookie]) -> Result<bool, SessionError> {
            Ok(true)
        }
        async fn login(&mut self, _c: &Credentials) -> Result<Vec<Cookie>, SessionError> {
            Ok(Vec::new())
        }
        async fn open_article(&mut self, _a: &ArticleId) -> Result<(), SessionError> {
            Ok(())
        }
        async fn switch_tab(&mut self, _t: Tab) -> Result<(), SessionError> {
            Ok(())
        }
        async fn page_source(&mut self) -> Result<String, SessionError> {
            Ok(std::fs::read_to_string("tests/fixtures/attachments.html")?)
        }
        async fn trigger_download(&mut self, link: &PostbackLink) -> Result<(), SessionError> {
            self.triggers += 1;
            match self.deliver_on {
                Some(n) if self.triggers >= n => {
                    std::fs::write(self.download_dir.join(&link.text), b"fresh")?;
                    Ok(())
                }
                _ => Err(SessionError::Trigger("postback ignored".into())),
            }
        }
        async fn close(&mut self) -> Result<(), SessionError> {
            Ok(())
        }
    }

    fn quick_settings() -> DownloadSettings {
        DownloadSettings {
            timeout: Duration::from_millis(30),
            poll: Duration::from_millis(5),
            retry: RetryPolicy::fixed(3, Duration::ZERO),
        }
    }

    #[test]
    fn finds_unedited_postback_link() {
        let html = std::fs::read_to_string("tests/fixtures/attachments.html").unwrap();
        let link = find_unedited_link(&html, &ArticleId::new("ABC", 123)).unwrap();
        assert_eq!(link.text, "ABC123_Unedited.docx");
        assert!(link.href.starts_with(POSTBACK_MARKER));
    }

    #[test]
    fn ignores_other_articles_and_plain_links() {
        let html = r#"
            <a href="javascript:__doPostBack('a','')">XYZ9_Unedited.docx</a>
            <a href="/files/ABC123_Unedited.docx">ABC123_Unedited.docx</a>
            <a href="javascript:__doPostBack('b','')">ABC123_Edited.docx</a>
            <a href="javascript:__doPostBack('c','')">../ABC123_Unedited.docx</a>"#;
        assert!(find_unedited_link(html, &ArticleId::new("ABC", 123)).is_none());
    }

    #[test]
    fn matching_tolerates_case_and_separators() {
        let html = r#"<a href="javascript:__doPostBack('a','')"> abc 123 UNEDITED.docx </a>"#;
        let link = find_unedited_link(html, &ArticleId::new("ABC", 123)).unwrap();
        assert_eq!(link.text, "abc 123 UNEDITED.docx");
    }

    #[tokio::test]
    async fn wait_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let err = wait_for_file(
            &dir.path().join("never.docx"),
            Duration::from_millis(30),
            Duration::from_millis(10),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DownloadError::Timeout { ref name, .. } if name == "never.docx"));
    }

    #[tokio::test]
    async fn wait_sees_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("here.docx");
        std::fs::write(&path, b"x").unwrap();
        wait_for_file(&path, Duration::ZERO, Duration::from_millis(10))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn download_succeeds_on_last_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let article_dir = dir.path().join("ABC123");
        let mut portal = ScriptedPortal::new(dir.path(), Some(3));
        let path = fetch_attachment(
            &mut portal,
            &ArticleId::new("ABC", 123),
            dir.path(),
            &article_dir,
            &quick_settings(),
        )
        .await
        .unwrap();
        assert_eq!(portal.triggers, 3);
        assert_eq!(path, article_dir.join("ABC123_Unedited.docx"));
    }

    #[tokio::test]
    async fn download_gives_up_after_configured_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let mut portal = ScriptedPortal::new(dir.path(), None);
        let err = fetch_attachment(
            &mut portal,
            &ArticleId::new("ABC", 123),
            dir.path(),
            &dir.path().join("ABC123"),
            &quick_settings(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DownloadError::Session(SessionError::Trigger(_))));
        assert_eq!(portal.triggers, 3);
    }

    #[tokio::test]
    async fn leftover_file_is_not_taken_for_a_new_download() {
        let dir = tempfile::tempdir().unwrap();
        let leftover = dir.path().join("ABC123_Unedited.docx");
        std::fs::write(&leftover, b"stale").unwrap();

        let mut portal = ScriptedPortal::new(dir.path(), None);
        let result = fetch_attachment(
            &mut portal,
            &ArticleId::new("ABC", 123),
            dir.path(),
            &dir.path().join("ABC123"),
            &quick_settings(),
        )
        .await;
        assert!(result.is_err());
        assert!(!leftover.exists());
        assert!(!dir.path().join("ABC123").join("ABC123_Unedited.docx").exists());
    }

    #[tokio::test]
    async fn fresh_download_replaces_leftover() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ABC123_Unedited.docx"), b"stale").unwrap();

        let mut portal = ScriptedPortal::new(dir.path(), Some(1));
        let path = fetch_attachment(
            &mut portal,
            &ArticleId::new("ABC", 123),
            dir.path(),
            &dir.path().join("ABC123"),
            &quick_settings(),
        )
        .await
        .unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"fresh");
    }

    #[test]
    fn move_keeps_name() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("ABC123_Unedited.docx");
        std::fs::write(&src, b"doc").unwrap();
        let dest = move_into(&src, &dir.path().join("ABC123")).unwrap();
        assert_eq!(dest, dir.path().join("ABC123").join("ABC123_Unedited.docx"));
        assert!(!src.exists());
        assert_eq!(std::fs::read(dest).unwrap(), b"doc");
    }
}
