//! Article model representing a parsed full-text document.
//!
//! All types here are plain immutable values: the parser builds them once
//! per document and the caller owns the result. Missing optional metadata
//! degrades to empty strings or empty lists, never to an error.

use serde::{Deserialize, Serialize};

/// A contributing author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Family name (the only required part of a name)
    pub surname: String,

    /// Given names, if the document supplies them
    pub given_names: Option<String>,

    /// Affiliation strings in document order
    pub affiliations: Vec<String>,
}

impl Author {
    /// Display name: given names followed by surname, or surname alone.
    pub fn full_name(&self) -> String {
        match self.given_names.as_deref() {
            Some(given) if !given.is_empty() => format!("{} {}", given, self.surname),
            _ => self.surname.clone(),
        }
    }
}

/// One titled block of the abstract. Content is marked-up text, not a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbstractSection {
    pub title: String,
    pub content: String,
}

/// A body section: title, paragraphs, and arbitrarily nested subsections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodySection {
    pub title: String,
    pub paragraphs: Vec<String>,
    pub children: Vec<BodySection>,
}

/// A figure with its caption and, when resolvable, an image URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FigureInfo {
    pub id: String,
    pub label: String,
    pub caption: String,

    /// Resolved image URL, present only when a PMC identifier was known
    /// at parse time and the figure referenced a graphic file.
    pub image_url: Option<String>,
}

/// A table, kept as a pre-rendered HTML fragment.
///
/// JATS table layouts vary too much to model structurally on the cheap, so
/// only the id/label/caption are lifted out and the `<table>` markup is
/// rendered directly, preserving `colspan`/`rowspan`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub id: String,
    pub label: String,
    pub caption: String,
    pub html: String,
}

/// A bibliographic reference.
///
/// Either `raw_citation` holds the citation verbatim, or the structured
/// fields are populated; `formatted_citation` prefers the structured form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceInfo {
    pub id: String,
    pub label: String,
    pub raw_citation: String,

    pub authors: Vec<String>,
    pub title: String,
    pub source: String,
    pub year: String,
    pub volume: String,
    pub issue: String,
    pub fpage: String,
    pub lpage: String,
    pub doi: String,
    pub pmid: String,
}

impl ReferenceInfo {
    fn has_structured_fields(&self) -> bool {
        !self.authors.is_empty()
            || !self.title.is_empty()
            || !self.source.is_empty()
            || !self.year.is_empty()
            || !self.volume.is_empty()
            || !self.doi.is_empty()
    }

    /// Citation line assembled from structured fields, joined with ". ".
    ///
    /// Author lists longer than three abbreviate to "First, Second, et al.".
    /// Falls back to the raw citation text verbatim when no structured
    /// fields were populated.
    pub fn formatted_citation(&self) -> String {
        if !self.has_structured_fields() {
            return self.raw_citation.clone();
        }

        let mut parts: Vec<String> = Vec::new();

        if !self.authors.is_empty() {
            let authors = if self.authors.len() > 3 {
                format!("{}, {}, et al.", self.authors[0], self.authors[1])
            } else {
                self.authors.join(", ")
            };
            parts.push(authors);
        }

        if !self.title.is_empty() {
            parts.push(self.title.clone());
        }

        if !self.source.is_empty() {
            parts.push(self.source.clone());
        }

        if !self.year.is_empty() {
            parts.push(format!("({})", self.year));
        }

        if !self.volume.is_empty() {
            let mut loc = self.volume.clone();
            if !self.issue.is_empty() {
                loc.push_str(&format!("({})", self.issue));
            }
            if !self.fpage.is_empty() {
                loc.push(':');
                loc.push_str(&self.fpage);
                if !self.lpage.is_empty() {
                    loc.push('-');
                    loc.push_str(&self.lpage);
                }
            }
            parts.push(loc);
        }

        if !self.doi.is_empty() {
            parts.push(format!("doi:{}", self.doi));
        }

        parts.join(". ")
    }
}

/// A fully parsed article: metadata, abstract, body tree, floats, references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub authors: Vec<Author>,

    pub journal: String,
    pub volume: String,
    pub issue: String,
    pub fpage: String,
    pub lpage: String,
    pub year: String,

    pub doi: String,
    pub pmcid: String,
    pub pmid: String,

    pub abstract_sections: Vec<AbstractSection>,
    pub body_sections: Vec<BodySection>,
    pub figures: Vec<FigureInfo>,
    pub tables: Vec<TableInfo>,
    pub references: Vec<ReferenceInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_with_given_names() {
        let author = Author {
            surname: "Curie".to_string(),
            given_names: Some("Marie".to_string()),
            affiliations: vec![],
        };
        assert_eq!(author.full_name(), "Marie Curie");
    }

    #[test]
    fn test_full_name_surname_only() {
        let author = Author {
            surname: "Curie".to_string(),
            given_names: None,
            affiliations: vec![],
        };
        assert_eq!(author.full_name(), "Curie");
    }

    #[test]
    fn test_formatted_citation_all_fields() {
        let reference = ReferenceInfo {
            id: "ref1".to_string(),
            authors: vec!["Smith J".to_string(), "Doe A".to_string()],
            title: "A study of things".to_string(),
            source: "J Things".to_string(),
            year: "2021".to_string(),
            volume: "12".to_string(),
            issue: "3".to_string(),
            fpage: "45".to_string(),
            lpage: "67".to_string(),
            doi: "10.1000/xyz".to_string(),
            ..Default::default()
        };

        assert_eq!(
            reference.formatted_citation(),
            "Smith J, Doe A. A study of things. J Things. (2021). 12(3):45-67. doi:10.1000/xyz"
        );
    }

    #[test]
    fn test_formatted_citation_abbreviates_long_author_lists() {
        let reference = ReferenceInfo {
            authors: vec![
                "Smith J".to_string(),
                "Doe A".to_string(),
                "Brown B".to_string(),
                "Jones C".to_string(),
            ],
            title: "Many hands".to_string(),
            ..Default::default()
        };

        let citation = reference.formatted_citation();
        assert!(citation.contains("et al."));
        assert!(citation.starts_with("Smith J, Doe A, et al."));
        assert!(!citation.contains("Brown B"));
        assert!(!citation.contains("Jones C"));
    }

    #[test]
    fn test_formatted_citation_three_authors_not_abbreviated() {
        let reference = ReferenceInfo {
            authors: vec![
                "Smith J".to_string(),
                "Doe A".to_string(),
                "Brown B".to_string(),
            ],
            ..Default::default()
        };

        let citation = reference.formatted_citation();
        assert!(!citation.contains("et al."));
        assert!(citation.contains("Brown B"));
    }

    #[test]
    fn test_formatted_citation_falls_back_to_raw() {
        let reference = ReferenceInfo {
            id: "ref2".to_string(),
            raw_citation: "Smith J. Some raw citation. 2020.".to_string(),
            ..Default::default()
        };

        assert_eq!(
            reference.formatted_citation(),
            "Smith J. Some raw citation. 2020."
        );
    }

    #[test]
    fn test_formatted_citation_partial_fields() {
        let reference = ReferenceInfo {
            title: "Untitled works".to_string(),
            year: "1999".to_string(),
            ..Default::default()
        };

        assert_eq!(reference.formatted_citation(), "Untitled works. (1999)");
    }
}
