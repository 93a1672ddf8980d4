use std::sync::LazyLock;

use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Selector};

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static TEXT_INPUT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"input[type="text"]"#).unwrap());
static TD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static TEXTAREA: LazyLock<Selector> = LazyLock::new(|| Selector::parse("textarea").unwrap());
static US_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})(?:\s|$)").unwrap());

const CALENDAR_POPUP_TEXT: &str = "Open the calendar popup.";
const FITTED_TEXTAREA_STYLE: &str = "overflow: hidden; resize: none; width: 100%; \
    min-height: auto; max-width: 100%; box-sizing: border-box; \
    white-space: pre-wrap; word-wrap: break-word; height: auto;";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkPolicy {
    #[default]
    Keep,
    /// Remove the anchor and everything inside it.
    Drop,
    /// Replace the anchor with a `<span>` holding its text.
    Text,
}

/// Which rewrites to apply while serializing a container.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sanitizer {
    pub drop_selects: bool,
    pub links: LinkPolicy,
    pub readonly_checkboxes: bool,
    pub drop_images: bool,
    pub image_inputs_as_text: bool,
    pub static_date_pickers: bool,
    /// Row label whose textarea gets resized to fit its content.
    pub fit_textareas: Option<&'static str>,
}

enum Action {
    Keep,
    Drop,
    Replace(String),
    Attrs(Vec<(&'static str, String)>),
    Children(String),
}

impl Sanitizer {
    /// Serialize `root` and its subtree with the enabled rewrites applied.
    /// Scripts and comments are never emitted.
    pub fn render(&self, root: ElementRef<'_>) -> String {
        let mut out = String::new();
        Render { rules: self, root }.element(root, &mut out);
        out
    }
}

struct Render<'a, 'r> {
    rules: &'r Sanitizer,
    root: ElementRef<'a>,
}

impl<'a> Render<'a, '_> {
    fn element(&self, el: ElementRef<'a>, out: &mut String) {
        match self.action(el) {
            Action::Drop => {}
            Action::Replace(markup) => out.push_str(&markup),
            Action::Keep => self.emit(el, &[], None, out),
            Action::Attrs(attrs) => self.emit(el, &attrs, None, out),
            Action::Children(markup) => self.emit(el, &[], Some(&markup), out),
        }
    }

    fn action(&self, el: ElementRef<'a>) -> Action {
        let rules = self.rules;
        let e = el.value();
        match e.name() {
            "script" => Action::Drop,
            "select" if rules.drop_selects => Action::Drop,
            "td" if rules.static_date_pickers => match date_picker_value(el) {
                Some(value) => Action::Children(format!(
                    r#"<input type="date" value="{}" class="date-input">"#,
                    escape_attr(&normalize_date(&value))
                )),
                None => Action::Keep,
            },
            "a" => match rules.links {
                LinkPolicy::Keep => Action::Keep,
                LinkPolicy::Drop => Action::Drop,
                LinkPolicy::Text => Action::Replace(span(&text_of(el))),
            },
            "img" if rules.drop_images => Action::Drop,
            "input" => match e.attr("type") {
                Some("checkbox") if rules.readonly_checkboxes => {
                    Action::Attrs(vec![("class", "readonly".to_string())])
                }
                Some("image") if rules.image_inputs_as_text => Action::Replace(span("Submit")),
                _ => Action::Keep,
            },
            "textarea" => match rules.fit_textareas {
                Some(label) if self.in_labelled_row(el, label) => {
                    let lines = text_of(el).trim().split('\n').count();
                    Action::Attrs(vec![
                        ("rows", (lines + 5).to_string()),
                        ("style", FITTED_TEXTAREA_STYLE.to_string()),
                    ])
                }
                _ => Action::Keep,
            },
            _ => Action::Keep,
        }
    }

    /// True when `el` is the first textarea of the second cell of a row
    /// (inside the root) whose first cell mentions `label`.
    fn in_labelled_row(&self, el: ElementRef<'a>, label: &str) -> bool {
        el.ancestors()
            .take_while(|n| n.id() != self.root.id())
            .filter_map(ElementRef::wrap)
            .filter(|a| a.value().name() == "tr")
            .any(|row| {
                let cells: Vec<_> = row.select(&TD).collect();
                cells.len() >= 2
                    && text_of(cells[0]).trim().contains(label)
                    && cells[1]
                        .select(&TEXTAREA)
                        .next()
                        .is_some_and(|t| t.id() == el.id())
            })
    }

    fn emit(
        &self,
        el: ElementRef<'a>,
        overrides: &[(&'static str, String)],
        children: Option<&str>,
        out: &mut String,
    ) {
        let e = el.value();
        let name = e.name();
        // Attributes sorted by name so output does not depend on parser map order.
        let mut attrs: Vec<(&str, &str)> = e
            .attrs()
            .filter(|(key, _)| !overrides.iter().any(|(k, _)| k == key))
            .chain(overrides.iter().map(|(k, v)| (*k, v.as_str())))
            .collect();
        attrs.sort_by(|a, b| a.0.cmp(b.0));

        out.push('<');
        out.push_str(name);
        for (key, value) in attrs {
            push_attr(out, key, value);
        }
        out.push('>');

        if VOID_ELEMENTS.contains(&name) {
            return;
        }

        match children {
            Some(markup) => out.push_str(markup),
            None => {
                let raw = name == "style";
                for child in el.children() {
                    match child.value() {
                        Node::Text(t) if raw => out.push_str(t),
                        Node::Text(t) => out.push_str(&escape_text(t)),
                        Node::Element(_) => {
                            if let Some(c) = ElementRef::wrap(child) {
                                self.element(c, out);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        out.push_str("</");
        out.push_str(name);
        out.push('>');
    }
}

/// Value of the text input in a calendar-popup cell, if `td` is one.
fn date_picker_value(td: ElementRef<'_>) -> Option<String> {
    let owns_popup = td.select(&ANCHOR).any(|a| {
        text_of(a).trim() == CALENDAR_POPUP_TEXT && nearest_td(a).is_some_and(|c| c.id() == td.id())
    });
    if !owns_popup {
        return None;
    }
    let input = td.select(&TEXT_INPUT).next()?;
    Some(input.value().attr("value").unwrap_or("").to_string())
}

fn nearest_td(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "td")
}

/// `M/D/YYYY` becomes `YYYY-MM-DD` so a date input can display it;
/// anything else, including an impossible month or day, passes through
/// unchanged.
pub fn normalize_date(value: &str) -> String {
    let value = value.trim();
    let Some(caps) = US_DATE_RE.captures(value) else {
        return value.to_string();
    };
    let month: u32 = caps[1].parse().unwrap_or(0);
    let day: u32 = caps[2].parse().unwrap_or(0);
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return value.to_string();
    }
    format!("{}-{:02}-{:02}", &caps[3], month, day)
}

pub fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect()
}

fn span(text: &str) -> String {
    format!("<span>{}</span>", escape_text(text))
}

fn push_attr(out: &mut String, key: &str, value: &str) {
    out.push(' ');
    out.push_str(key);
    out.push_str("=\"");
    out.push_str(&escape_attr(value));
    out.push('"');
}

pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

// ── Tests ──
