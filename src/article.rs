use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

/// One row of the input list: journal code plus numeric article id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArticleId {
    pub journal: String,
    pub number: u64,
}

impl ArticleId {
    pub fn new(journal: impl Into<String>, number: u64) -> Self {
        Self {
            journal: journal.into(),
            number,
        }
    }

    /// Directory and file stem, e.g. `ABC123`.
    pub fn key(&self) -> String {
        format!("{}{}", self.journal, self.number)
    }

    /// Key with underscores and spaces dropped, lower-cased. Used to match
    /// attachment names, which the portal renders inconsistently.
    pub fn normalized_key(&self) -> String {
        normalize(&self.key())
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.journal, self.number)
    }
}

pub fn normalize(s: &str) -> String {
    s.to_lowercase().replace([' ', '_'], "")
}

#[derive(Debug, Deserialize)]
struct InputRow {
    #[serde(rename = "JID")]
    jid: String,
    #[serde(rename = "AID")]
    aid: String,
}

/// Read the input list in file order. Malformed rows are skipped.
pub fn read_articles(path: &Path) -> Result<Vec<ArticleId>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open input list {}", path.display()))?;
    parse_articles(file)
}

fn parse_articles<R: std::io::Read>(reader: R) -> Result<Vec<ArticleId>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut articles = Vec::new();
    for (i, row) in rdr.deserialize::<InputRow>().enumerate() {
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                warn!(line = i + 2, "Skipping unreadable input row: {}", e);
                continue;
            }
        };
        let Ok(number) = row.aid.parse::<u64>() else {
            warn!(line = i + 2, aid = %row.aid, "Skipping row with non-numeric AID");
            continue;
        };
        if row.jid.is_empty() {
            warn!(line = i + 2, "Skipping row with empty JID");
            continue;
        }
        articles.push(ArticleId::new(row.jid, number));
    }
    Ok(articles)
}

// ── Tests ──
