pub mod article_info;
pub mod authors;
pub mod grids;
pub mod guidelines;

use scraper::Html;

use super::sanitize::escape_text;
use crate::article::ArticleId;
use crate::store::{FragmentCollection, Section};

/// Result of running the extractor over one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Sections(FragmentCollection),
    /// Extraction broke; the marker body stands in for every section.
    Failed(String),
}

impl Extraction {
    /// Fragment for one section; the error marker when extraction failed.
    pub fn section(&self, section: Section) -> String {
        match self {
            Extraction::Sections(f) => f.get(section).to_string(),
            Extraction::Failed(marker) => marker.clone(),
        }
    }
}

pub fn extract_all(doc: &Html, article: &ArticleId) -> Result<FragmentCollection, minijinja::Error> {
    let mut fragments = FragmentCollection::default();
    let found = [
        (Section::Guidelines, guidelines::extract(doc)?),
        (Section::ArticleInfo, article_info::extract(doc, article)?),
        (Section::AuthorInfo, authors::extract(doc)?),
        (Section::ProblemNotes, grids::problem_notes(doc, article)?),
        (Section::Comments, grids::comments(doc, article)?),
        (Section::Attachments, grids::attachments(doc, article)?),
    ];
    for (section, fragment) in found {
        if let Some(f) = fragment {
            fragments.set(section, f);
        }
    }
    Ok(fragments)
}

pub fn error_marker(message: &str) -> String {
    format!(
        "<html><body><h3>Error processing HTML: {}</h3></body></html>",
        escape_text(message)
    )
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::extract_page;

    fn page(fixture: &str) -> Extraction {
        let html = std::fs::read_to_string(format!("tests/fixtures/{}.html", fixture)).unwrap();
        extract_page(&html, &ArticleId::new("ABC", 123), fixture)
    }

    fn sections(fixture: &str) -> FragmentCollection {
        match page(fixture) {
            Extraction::Sections(f) => f,
            Extraction::Failed(m) => panic!("extraction failed: {}", m),
        }
    }

    #[test]
    fn each_tab_yields_its_own_section() {
        let cases = [
            ("article_info", Section::ArticleInfo),
            ("attachments", Section::Attachments),
            ("guidelines", Section::Guidelines),
            ("authors", Section::AuthorInfo),
            ("problem_notes", Section::ProblemNotes),
            ("comments", Section::Comments),
        ];
        for (fixture, expected) in cases {
            let f = sections(fixture);
            let present: Vec<_> = f.present().map(|(s, _)| s).collect();
            assert_eq!(present, vec![expected], "fixture {}", fixture);
        }
    }

    #[test]
    fn extraction_is_deterministic() {
        for fixture in ["article_info", "authors", "guidelines", "comments"] {
            assert_eq!(page(fixture), page(fixture));
        }
    }

    #[test]
    fn page_without_containers_is_all_empty() {
        let e = extract_page(
            "<html><body><div id=\"Other\">nothing</div></body></html>",
            &ArticleId::new("ABC", 123),
            "blank",
        );
        for s in Section::ALL {
            assert_eq!(e.section(s), "");
        }
    }

    #[test]
    fn failed_extraction_marks_every_section() {
        let e = Extraction::Failed(error_marker("bad <tag>"));
        assert_eq!(
            e.section(Section::Comments),
            "<html><body><h3>Error processing HTML: bad &lt;tag&gt;</h3></body></html>"
        );
    }

    #[test]
    fn article_info_has_no_links_or_selects() {
        let f = sections("article_info").article_info;
        assert!(f.contains("Article Information_ABC123"));
        assert!(!f.contains("<a "));
        assert!(!f.contains("<select"));
        assert!(f.contains(r#"<input type="date" value="2024-03-14" class="date-input">"#));
        assert!(f.contains(r#"class="readonly""#));
    }

    #[test]
    fn authors_are_tabular_and_static() {
        let f = sections("authors").author_info;
        assert!(f.contains(r#"id="AuthorInfo""#));
        assert!(f.contains(r#"<table class="structured-table">"#));
        assert!(f.contains("<span>Jane Doe</span>"));
        assert!(f.contains("<span>Submit</span>"));
        assert!(!f.contains("<img"));
        assert!(!f.contains("<a "));
        assert!(!f.contains("<select"));
    }

    #[test]
    fn guidelines_textarea_is_fitted() {
        let f = sections("guidelines").guidelines;
        assert!(f.contains("Article Guidelines"));
        // three lines of content plus five
        assert!(f.contains(r#"rows="8""#));
        assert!(f.contains("overflow: hidden; resize: none;"));
        // the unrelated textarea keeps its rows
        assert!(f.contains(r#"rows="2""#));
    }

    #[test]
    fn grids_keep_link_text() {
        let notes = sections("problem_notes").problem_notes;
        assert!(notes.contains("Problem Notes – ABC123"));
        assert!(notes.contains("<span>Query resolved</span>"));

        let comments = sections("comments").comments;
        assert!(comments.contains(r#"id="CommentsInfo""#));
        assert!(!comments.contains("<img"));

        let att = sections("attachments").attachments;
        assert!(att.contains(r#"id="AttachmentsInfo""#));
        assert!(att.contains("<span>ABC123_Unedited.docx</span>"));
    }
}
