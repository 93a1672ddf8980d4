use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};

use crate::article::ArticleId;
use crate::assemble;
use crate::download::{self, DownloadSettings};
use crate::error::{DownloadError, SessionError};
use crate::parser;
use crate::session::cookies::CookieCache;
use crate::session::{authenticate, Credentials, PortalSession, Tab};
use crate::store::{merge, FragmentCollection};

/// Where output goes and how downloads behave.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub download_root: PathBuf,
    pub instructions_base: String,
    pub download: DownloadSettings,
}

#[derive(Debug, Default)]
pub struct ArticleOutcome {
    pub sections: usize,
    pub attachment: Option<PathBuf>,
    pub merged: Option<PathBuf>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub articles: usize,
    pub merged: usize,
    pub attachments: usize,
    pub sections: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &ArticleOutcome) {
        self.articles += 1;
        self.sections += outcome.sections;
        self.merged += usize::from(outcome.merged.is_some());
        self.attachments += usize::from(outcome.attachment.is_some());
    }

    pub fn print(&self) {
        println!(
            "Processed {} articles: {} merged, {} attachments, {} sections.",
            self.articles, self.merged, self.attachments, self.sections,
        );
    }
}

impl Pipeline {
    /// Visit every tab of one article, accumulate fragments, then write the
    /// merged page. Only a fatal session error is returned; anything else is
    /// logged and leaves a section (or the attachment) missing.
    pub async fn process_article<S: PortalSession + ?Sized>(
        &self,
        session: &mut S,
        article: &ArticleId,
    ) -> Result<ArticleOutcome, SessionError> {
        if let Err(e) = assemble::clean_previous(&self.download_root, article) {
            warn!(article = %article, "Could not clean previous output: {}", e);
        }
        let article_dir = assemble::article_dir(&self.download_root, article);

        let mut outcome = ArticleOutcome::default();
        let mut fragments = FragmentCollection::default();

        for tab in Tab::VISIT_ORDER {
            let shown = match tab {
                Tab::ArticleInfo => session.open_article(article).await,
                _ => session.switch_tab(tab).await,
            };
            if let Err(e) = shown {
                if e.is_fatal() {
                    return Err(e);
                }
                warn!(article = %article, tab = %tab, "Skipping tab: {}", e);
                continue;
            }

            match session.page_source().await {
                Ok(markup) => {
                    let label = format!("{}_{}", article, tab.slug());
                    let extraction = parser::extract_page(&markup, article, &label);
                    let mut update = FragmentCollection::default();
                    update.set(tab.section(), extraction.section(tab.section()));
                    fragments = merge(fragments, update);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(article = %article, tab = %tab, "No page source: {}", e),
            }

            if tab == Tab::Attachments {
                match download::fetch_attachment(
                    session,
                    article,
                    &self.download_root,
                    &article_dir,
                    &self.download,
                )
                .await
                {
                    Ok(path) => outcome.attachment = Some(path),
                    Err(DownloadError::Session(e)) if e.is_fatal() => return Err(e),
                    Err(_) => {}
                }
            }
        }

        outcome.sections = fragments.present().count();
        let written = assemble::assemble(article, &fragments, &self.instructions_base)
            .and_then(|doc| assemble::persist(&doc, &self.download_root, article));
        match written {
            Ok(path) => outcome.merged = Some(path),
            Err(e) => error!(article = %article, "Could not write merged page: {}", e),
        }
        Ok(outcome)
    }

    /// Process articles one at a time, in order.
    pub async fn run<S: PortalSession + ?Sized>(
        &self,
        session: &mut S,
        articles: &[ArticleId],
    ) -> Result<RunSummary, SessionError> {
        let pb = ProgressBar::new(articles.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );

        let mut summary = RunSummary::default();
        for article in articles {
            pb.set_message(article.key());
            info!(article = %article, "Processing article");
            let outcome = self.process_article(session, article).await?;
            info!(
                article = %article,
                sections = outcome.sections,
                attachment = outcome.attachment.is_some(),
                "Finished article"
            );
            summary.record(&outcome);
            pb.inc(1);
        }
        pb.finish_and_clear();
        Ok(summary)
    }

    /// Full session scope: authenticate, run, and always close the session,
    /// whether or not the run succeeded.
    pub async fn run_session<S: PortalSession>(
        &self,
        mut session: S,
        cache: &CookieCache,
        credentials: &Credentials,
        articles: &[ArticleId],
    ) -> Result<RunSummary, SessionError> {
        let result = async {
            authenticate(&mut session, cache, credentials).await?;
            self.run(&mut session, articles).await
        }
        .await;

        if let Err(e) = session.close().await {
            warn!("Error closing session: {}", e);
        }
        result
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    use secrecy::SecretString;

    use crate::retry::RetryPolicy;
    use crate::session::snapshot::SnapshotSession;

    const PORTAL: &str = "tests/fixtures/portal";

    fn pipeline(root: &Path) -> Pipeline {
        Pipeline {
            download_root: root.to_path_buf(),
            instructions_base: "https://journals.sagepub.com/author-instructions".into(),
            download: DownloadSettings {
                timeout: Duration::from_millis(50),
                poll: Duration::from_millis(10),
                retry: RetryPolicy::fixed(3, Duration::ZERO),
            },
        }
    }

    fn creds() -> Credentials {
        Credentials {
            login_id: SecretString::from("editor".to_string()),
            password: SecretString::from("secret".to_string()),
        }
    }

    async fn run(root: &Path, articles: &[ArticleId]) -> RunSummary {
        let session = SnapshotSession::open(PORTAL, root);
        let cache = CookieCache::new(root.join("cookies.json"), Duration::from_secs(1800));
        pipeline(root)
            .run_session(session, &cache, &creds(), articles)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn full_article_produces_ordered_page() {
        let root = tempfile::tempdir().unwrap();
        let summary = run(root.path(), &[ArticleId::new("ABC", 123)]).await;
        assert_eq!(
            summary,
            RunSummary {
                articles: 1,
                merged: 1,
                attachments: 1,
                sections: 6
            }
        );

        let dir = root.path().join("ABC123");
        let html = std::fs::read_to_string(dir.join("ABC123_merged.html")).unwrap();
        let order = [
            "Article Information_ABC123",
            "Article Guidelines",
            "Author Information",
            "Problem Notes – ABC123",
            "Comments – ABC123",
            "Attachments – ABC123",
        ];
        let positions: Vec<_> = order.iter().map(|h| html.find(h).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(html.contains("author-instructions/ABC"));
        assert!(html.find("author-instructions/ABC").unwrap() > positions[5]);

        assert!(dir.join("ABC123_Unedited.docx").is_file());
        assert!(!root.path().join("ABC123_Unedited.docx").exists());
    }

    #[tokio::test]
    async fn rerun_replaces_stale_output() {
        let root = tempfile::tempdir().unwrap();
        let stale = root.path().join("abc123");
        std::fs::create_dir_all(&stale).unwrap();
        std::fs::write(stale.join("abc123_merged.html"), "STALE").unwrap();
        std::fs::write(stale.join("leftover.txt"), "STALE").unwrap();

        run(root.path(), &[ArticleId::new("ABC", 123)]).await;
        let html =
            std::fs::read_to_string(root.path().join("ABC123").join("ABC123_merged.html")).unwrap();
        assert!(!html.contains("STALE"));
        assert!(!stale.join("leftover.txt").exists());
    }

    #[tokio::test]
    async fn reprocessing_is_byte_identical() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("ABC123").join("ABC123_merged.html");
        run(root.path(), &[ArticleId::new("ABC", 123)]).await;
        let first = std::fs::read(&path).unwrap();
        run(root.path(), &[ArticleId::new("ABC", 123)]).await;
        assert_eq!(first, std::fs::read(&path).unwrap());
    }

    #[tokio::test]
    async fn missing_tabs_and_download_are_not_fatal() {
        let root = tempfile::tempdir().unwrap();
        let summary = run(
            root.path(),
            &[ArticleId::new("XYZ", 9), ArticleId::new("NOPE", 1)],
        )
        .await;
        assert_eq!(summary.articles, 2);
        assert_eq!(summary.merged, 2);
        assert_eq!(summary.attachments, 0);

        let html =
            std::fs::read_to_string(root.path().join("XYZ9").join("XYZ9_merged.html")).unwrap();
        assert!(html.contains("Article Information_XYZ9"));
        assert!(html.contains("Attachments – XYZ9"));
        assert!(!html.contains("Author Information"));

        let empty =
            std::fs::read_to_string(root.path().join("NOPE1").join("NOPE1_merged.html")).unwrap();
        assert!(empty.contains("author-instructions/NOPE"));
    }

    #[tokio::test]
    async fn login_failure_aborts_the_run() {
        let root = tempfile::tempdir().unwrap();
        let session = SnapshotSession::open(PORTAL, root.path());
        let cache = CookieCache::new(root.path().join("cookies.json"), Duration::from_secs(1800));
        let no_creds = Credentials {
            login_id: SecretString::from(String::new()),
            password: SecretString::from(String::new()),
        };
        let err = pipeline(root.path())
            .run_session(session, &cache, &no_creds, &[ArticleId::new("ABC", 123)])
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(!root.path().join("ABC123").exists());
    }
}
