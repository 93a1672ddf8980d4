use std::sync::LazyLock;

use minijinja::{context, Environment, Value};

use crate::article::ArticleId;
use crate::parser::sanitize::escape_text;
use crate::store::FragmentCollection;

static TEMPLATES: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.add_template("section.html", include_str!("../templates/section.html"))
        .unwrap();
    env.add_template("merged.html", include_str!("../templates/merged.html"))
        .unwrap();
    env
});

/// Wrapper around one sanitized container: heading plus body.
#[derive(Debug)]
pub struct SectionBlock<'a> {
    pub class: &'static str,
    pub id: &'static str,
    pub title: String,
    pub style: Option<&'static str>,
    /// Nest the body in a single-cell structured table.
    pub tabular: bool,
    pub body: &'a str,
}

pub fn section_block(block: &SectionBlock<'_>) -> Result<String, minijinja::Error> {
    TEMPLATES.get_template("section.html")?.render(context! {
        class => block.class,
        id => block.id,
        title => block.title,
        style => block.style,
        tabular => block.tabular,
        body => block.body,
    })
}

/// Full review page: shared styles, present fragments in page order, footer.
pub fn merged_page(
    article: &ArticleId,
    fragments: &FragmentCollection,
    instructions_base: &str,
) -> Result<String, minijinja::Error> {
    let blocks: Vec<&str> = fragments.present().map(|(_, f)| f).collect();

    // Built here and passed as safe: the template escaper would entity-encode
    // every '/' in the URL.
    let url = format!(
        "{}/{}",
        instructions_base.trim_end_matches('/'),
        article.journal
    );
    let label = url
        .trim_start_matches("https://")
        .trim_start_matches("http://");

    TEMPLATES.get_template("merged.html")?.render(context! {
        article => article.key(),
        journal => article.journal,
        blocks => blocks,
        instructions_url => Value::from_safe_string(escape_markup(&url)),
        instructions_label => Value::from_safe_string(escape_markup(label)),
    })
}

fn escape_markup(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

// ── Tests ──
