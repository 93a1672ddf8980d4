use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::article::ArticleId;
use crate::parser::sanitize::{LinkPolicy, Sanitizer};
use crate::render::{section_block, SectionBlock};

static CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div#ArticleInfo").unwrap());

const RULES: Sanitizer = Sanitizer {
    drop_selects: true,
    links: LinkPolicy::Drop,
    readonly_checkboxes: true,
    drop_images: false,
    image_inputs_as_text: false,
    static_date_pickers: true,
    fit_textareas: None,
};

pub fn extract(doc: &Html, article: &ArticleId) -> Result<Option<String>, minijinja::Error> {
    let Some(container) = doc.select(&CONTAINER).next() else {
        return Ok(None);
    };
    let body = RULES.render(container);

    section_block(&SectionBlock {
        class: "articlebox",
        id: "ArticleInformation",
        title: format!("Article Information_{}", article),
        style: None,
        tabular: false,
        body: &body,
    })
    .map(Some)
}
