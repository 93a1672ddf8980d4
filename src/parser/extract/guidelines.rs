use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::parser::sanitize::{text_of, Sanitizer};
use crate::render::{section_block, SectionBlock};

static LEGEND: LazyLock<Selector> = LazyLock::new(|| Selector::parse("legend").unwrap());

const STYLE_LABEL: &str = "Style";
const BOX_STYLE: &str =
    "display: block; width: auto; min-width: 100%; max-width: 100%; white-space: pre-wrap;";

/// The "Style" fieldset of the Guidelines tab, with its style textarea sized
/// to show all of its text.
pub fn extract(doc: &Html) -> Result<Option<String>, minijinja::Error> {
    let Some(fieldset) = find_style_fieldset(doc) else {
        return Ok(None);
    };

    let rules = Sanitizer {
        fit_textareas: Some(STYLE_LABEL),
        ..Default::default()
    };
    let body = rules.render(fieldset);

    section_block(&SectionBlock {
        class: "box",
        id: "Guidelines",
        title: "Article Guidelines".to_string(),
        style: Some(BOX_STYLE),
        tabular: false,
        body: &body,
    })
    .map(Some)
}

/// First legend reading exactly "Style", then its closest enclosing
/// `fieldset.FormFieldset`.
fn find_style_fieldset(doc: &Html) -> Option<ElementRef<'_>> {
    let legend = doc
        .select(&LEGEND)
        .find(|l| text_of(*l).trim() == STYLE_LABEL)?;
    legend.ancestors().filter_map(ElementRef::wrap).find(|a| {
        a.value().name() == "fieldset" && a.value().classes().any(|c| c == "FormFieldset")
    })
}
