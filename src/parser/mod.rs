pub mod extract;
pub mod sanitize;

use scraper::Html;
use tracing::{debug, error};

use crate::article::ArticleId;
use extract::Extraction;

/// Two-step pipeline: raw tab markup → located containers → sanitized,
/// wrapped fragments. Only sections whose container is present come back
/// non-empty.
pub fn extract_page(markup: &str, article: &ArticleId, label: &str) -> Extraction {
    let doc = Html::parse_document(markup);
    match extract::extract_all(&doc, article) {
        Ok(fragments) => {
            if fragments.is_empty() {
                debug!(article = %article, page = label, "No known section found");
            }
            Extraction::Sections(fragments)
        }
        Err(e) => {
            error!(article = %article, page = label, "Error processing HTML content: {}", e);
            Extraction::Failed(extract::error_marker(&e.to_string()))
        }
    }
}
