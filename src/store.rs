use serde::Serialize;

/// The six fixed parts of an article's review page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    ArticleInfo,
    Guidelines,
    AuthorInfo,
    ProblemNotes,
    Comments,
    Attachments,
}

impl Section {
    /// Output order of the assembled page.
    pub const ALL: [Section; 6] = [
        Section::ArticleInfo,
        Section::Guidelines,
        Section::AuthorInfo,
        Section::ProblemNotes,
        Section::Comments,
        Section::Attachments,
    ];
}

/// Sanitized fragments for one article. An empty string means the section
/// was not found (yet); empty sections are left out when serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FragmentCollection {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub article_info: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub guidelines: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub author_info: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub problem_notes: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comments: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub attachments: String,
}

impl FragmentCollection {
    pub fn get(&self, section: Section) -> &str {
        match section {
            Section::ArticleInfo => &self.article_info,
            Section::Guidelines => &self.guidelines,
            Section::AuthorInfo => &self.author_info,
            Section::ProblemNotes => &self.problem_notes,
            Section::Comments => &self.comments,
            Section::Attachments => &self.attachments,
        }
    }

    pub fn set(&mut self, section: Section, fragment: String) {
        *self.slot(section) = fragment;
    }

    fn slot(&mut self, section: Section) -> &mut String {
        match section {
            Section::ArticleInfo => &mut self.article_info,
            Section::Guidelines => &mut self.guidelines,
            Section::AuthorInfo => &mut self.author_info,
            Section::ProblemNotes => &mut self.problem_notes,
            Section::Comments => &mut self.comments,
            Section::Attachments => &mut self.attachments,
        }
    }

    /// Non-empty fragments in page order.
    pub fn present(&self) -> impl Iterator<Item = (Section, &str)> {
        Section::ALL
            .into_iter()
            .map(|s| (s, self.get(s)))
            .filter(|(_, f)| !f.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }
}

/// Fold `update` into `current`: a non-empty update replaces the stored
/// fragment, an empty one never clears it.
pub fn merge(mut current: FragmentCollection, update: FragmentCollection) -> FragmentCollection {
    for section in Section::ALL {
        let value = update.get(section);
        if !value.is_empty() {
            current.set(section, value.to_string());
        }
    }
    current
}

// ── Tests ──
