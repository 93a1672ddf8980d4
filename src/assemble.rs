use std::path::{Path, PathBuf};

use tracing::info;

use crate::article::ArticleId;
use crate::error::AssembleError;
use crate::render;
use crate::store::FragmentCollection;

pub fn article_dir(root: &Path, article: &ArticleId) -> PathBuf {
    root.join(article.key())
}

pub fn merged_name(key: &str) -> String {
    format!("{}_merged.html", key)
}

/// Render the review page. Deterministic: same fragments, same bytes.
pub fn assemble(
    article: &ArticleId,
    fragments: &FragmentCollection,
    instructions_base: &str,
) -> Result<String, AssembleError> {
    Ok(render::merged_page(article, fragments, instructions_base)?)
}

/// Write the page to `<root>/<key>/<key>_merged.html`, replacing any
/// previous file. The page is written to a sibling temp file first and
/// renamed into place.
pub fn persist(document: &str, root: &Path, article: &ArticleId) -> Result<PathBuf, AssembleError> {
    let dir = article_dir(root, article);
    let path = dir.join(merged_name(&article.key()));
    let write_err = |source| AssembleError::Write {
        path: path.clone(),
        source,
    };

    std::fs::create_dir_all(&dir).map_err(write_err)?;
    let tmp = dir.join(format!(".{}.tmp", merged_name(&article.key())));
    std::fs::write(&tmp, document.as_bytes()).map_err(write_err)?;
    std::fs::rename(&tmp, &path).map_err(write_err)?;

    info!(article = %article, "Merged file saved at: {}", path.display());
    Ok(path)
}

/// Remove the article directory when a merged page from an earlier run is
/// found in it. Both the exact-case and lower-cased names are checked.
pub fn clean_previous(root: &Path, article: &ArticleId) -> std::io::Result<bool> {
    let key = article.key();
    let mut candidates = vec![key.clone()];
    let lower = key.to_lowercase();
    if lower != key {
        candidates.push(lower);
    }

    let mut removed = false;
    for name in candidates {
        let dir = root.join(&name);
        if dir.join(merged_name(&name)).is_file() {
            info!(article = %article, "Removing previous output in {}", dir.display());
            std::fs::remove_dir_all(&dir)?;
            removed = true;
        }
    }
    Ok(removed)
}

// ── Tests ──
