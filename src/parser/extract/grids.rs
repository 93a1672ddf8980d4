//! Problem notes, comments and attachments: three grids that differ only in
//! container id, heading and how aggressively they are flattened.

use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::article::ArticleId;
use crate::parser::sanitize::{LinkPolicy, Sanitizer};
use crate::render::{section_block, SectionBlock};

const NOTES_RULES: Sanitizer = Sanitizer {
    drop_selects: true,
    links: LinkPolicy::Text,
    readonly_checkboxes: false,
    drop_images: false,
    image_inputs_as_text: false,
    static_date_pickers: false,
    fit_textareas: None,
};

const GRID_RULES: Sanitizer = Sanitizer {
    readonly_checkboxes: true,
    drop_images: true,
    image_inputs_as_text: true,
    ..NOTES_RULES
};

static NOTES_CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div#ArticleProbNotes").unwrap());
static COMMENTS_CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div#ArticleComments").unwrap());
static ATTACHMENTS_CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div#ArticleAttachmentGrid").unwrap());

struct Grid {
    container: &'static LazyLock<Selector>,
    id: &'static str,
    heading: &'static str,
    rules: Sanitizer,
}

static PROBLEM_NOTES: Grid = Grid {
    container: &NOTES_CONTAINER,
    id: "ProblemNotes",
    heading: "Problem Notes",
    rules: NOTES_RULES,
};

static COMMENTS: Grid = Grid {
    container: &COMMENTS_CONTAINER,
    id: "CommentsInfo",
    heading: "Comments",
    rules: GRID_RULES,
};

static ATTACHMENTS: Grid = Grid {
    container: &ATTACHMENTS_CONTAINER,
    id: "AttachmentsInfo",
    heading: "Attachments",
    rules: GRID_RULES,
};

pub fn problem_notes(doc: &Html, article: &ArticleId) -> Result<Option<String>, minijinja::Error> {
    extract(&PROBLEM_NOTES, doc, article)
}

pub fn comments(doc: &Html, article: &ArticleId) -> Result<Option<String>, minijinja::Error> {
    extract(&COMMENTS, doc, article)
}

pub fn attachments(doc: &Html, article: &ArticleId) -> Result<Option<String>, minijinja::Error> {
    extract(&ATTACHMENTS, doc, article)
}

fn extract(grid: &Grid, doc: &Html, article: &ArticleId) -> Result<Option<String>, minijinja::Error> {
    let Some(container) = doc.select(grid.container).next() else {
        return Ok(None);
    };
    let body = grid.rules.render(container);

    section_block(&SectionBlock {
        class: "articlebox",
        id: grid.id,
        title: format!("{} – {}", grid.heading, article),
        style: None,
        tabular: false,
        body: &body,
    })
    .map(Some)
}
