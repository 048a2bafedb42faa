//! General document metadata such as title, author, etc

use crate::writer::literal_string;

/// General document metadata such as title, author, etc
#[derive(Default, Debug, Clone)]
pub struct Info {
    /// The title of the document.
    pub title: Option<String>,
    /// The author(s) of the document. No prescribed format.
    pub author: Option<String>,
    /// The subject of the document.
    pub subject: Option<String>,
    /// Keywords for the document. No prescribed format, though Adobe Acrobat suggests
    /// using a comma separated list of keywords
    pub keywords: Option<String>,
}

impl Info {
    /// Create a new info block, with all metadata set to [None]
    pub fn new() -> Info {
        Info::default()
    }

    /// Set the title of the info block, modifying `self`
    pub fn title<S: ToString>(&mut self, title: S) -> &mut Self {
        self.title = Some(title.to_string());
        self
    }

    /// Set the author of the info block, modifying `self`
    pub fn author<S: ToString>(&mut self, author: S) -> &mut Self {
        self.author = Some(author.to_string());
        self
    }

    /// Set the subject of the info block, modifying `self`
    pub fn subject<S: ToString>(&mut self, subject: S) -> &mut Self {
        self.subject = Some(subject.to_string());
        self
    }

    /// Set the keywords of the info block, modifying `self`
    pub fn keywords<S: ToString>(&mut self, keywords: S) -> &mut Self {
        self.keywords = Some(keywords.to_string());
        self
    }

    /// Whether any metadata has been set; an empty info dictionary is
    /// omitted from the document entirely.
    pub(crate) fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.subject.is_none()
            && self.keywords.is_none()
    }

    pub(crate) fn dict_body(&self) -> String {
        let mut body = String::new();
        if let Some(title) = &self.title {
            body.push_str(&format!("/Title {}\n", literal_string(title)));
        }
        if let Some(author) = &self.author {
            body.push_str(&format!("/Author {}\n", literal_string(author)));
        }
        if let Some(subject) = &self.subject {
            body.push_str(&format!("/Subject {}\n", literal_string(subject)));
        }
        if let Some(keywords) = &self.keywords {
            body.push_str(&format!("/Keywords {}\n", literal_string(keywords)));
        }
        body.push_str(&format!(
            "/Creator {}\n",
            literal_string(concat!(
                env!("CARGO_PKG_NAME"),
                " v",
                env!("CARGO_PKG_VERSION")
            ))
        ));

        use chrono::prelude::*;
        let now = Local::now();
        let offset = now.offset().fix();
        let offset_hours = offset.local_minus_utc() / (60 * 60);
        let offset_minutes = ((offset.local_minus_utc() - (offset_hours * (60 * 60))) / 60).abs();
        body.push_str(&format!(
            "/CreationDate (D:{:04}{:02}{:02}{:02}{:02}{:02}{:+03}'{:02}')\n",
            now.year(),
            now.month(),
            now.day(),
            now.hour(),
            now.minute(),
            now.second(),
            offset_hours,
            offset_minutes
        ));
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_info_is_detected() {
        assert!(Info::new().is_empty());
        let mut info = Info::new();
        info.author("somebody");
        assert!(!info.is_empty());
    }

    #[test]
    fn dict_body_contains_set_fields() {
        let mut info = Info::new();
        info.title("A (Test) Document").author("Jane Doe");
        let body = info.dict_body();
        assert!(body.contains(r"/Title (A \(Test\) Document)"));
        assert!(body.contains("/Author (Jane Doe)"));
        assert!(!body.contains("/Subject"));
        assert!(body.contains("/CreationDate (D:"));
    }
}
