use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::parser::sanitize::{LinkPolicy, Sanitizer};
use crate::render::{section_block, SectionBlock};

static CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div#ctl00_ArticleAuthors_uc_ArticleAuthorsGrid").unwrap());

const RULES: Sanitizer = Sanitizer {
    drop_selects: true,
    links: LinkPolicy::Text,
    readonly_checkboxes: true,
    drop_images: true,
    image_inputs_as_text: true,
    static_date_pickers: false,
    fit_textareas: None,
};

pub fn extract(doc: &Html) -> Result<Option<String>, minijinja::Error> {
    let Some(container) = doc.select(&CONTAINER).next() else {
        return Ok(None);
    };
    let body = RULES.render(container);

    section_block(&SectionBlock {
        class: "box",
        id: "AuthorInfo",
        title: "Author Information".to_string(),
        style: None,
        tabular: true,
        body: &body,
    })
    .map(Some)
}
