use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::session::Tab;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("tab '{0}' not found or not clickable")]
    TabNotFound(Tab),
    #[error("no page loaded for {0}")]
    PageMissing(String),
    #[error("download trigger failed: {0}")]
    Trigger(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Only a broken login ends the run; everything else is local to one
    /// tab or one article.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Auth(_))
    }
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("no unedited manuscript link on the attachments page")]
    LinkNotFound,
    #[error("'{name}' did not appear within {waited:?}")]
    Timeout { name: String, waited: Duration },
    #[error("could not move {from} into article directory: {source}")]
    Move {
        from: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not clear leftover download {path}: {source}")]
    Stale {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("template rendering failed: {0}")]
    Render(#[from] minijinja::Error),
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
