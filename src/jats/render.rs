//! Flat HTML rendering of a parsed [`Article`].
//!
//! The output is a display fragment, not a full page: headings, paragraphs,
//! figures, tables and a reference list, in that order. Text content was
//! already escaped during parsing; only attribute values are escaped here.

use quick_xml::escape::escape;

use crate::models::{Article, BodySection};

/// Render an article to a single HTML string.
pub fn render_article(article: &Article) -> String {
    let mut html = String::new();

    if !article.title.is_empty() {
        html.push_str(&format!("<h1>{}</h1>\n", article.title));
    }

    if !article.authors.is_empty() {
        let names = article
            .authors
            .iter()
            .map(|a| a.full_name())
            .collect::<Vec<_>>()
            .join(", ");
        html.push_str(&format!("<p class=\"authors\">{}</p>\n", names));
    }

    let citation_line = citation_line(article);
    if !citation_line.is_empty() {
        html.push_str(&format!("<p class=\"journal\">{}</p>\n", citation_line));
    }

    if !article.abstract_sections.is_empty() {
        html.push_str("<section class=\"abstract\">\n<h2>Abstract</h2>\n");
        for section in &article.abstract_sections {
            if !section.title.is_empty() {
                html.push_str(&format!("<h3>{}</h3>\n", section.title));
            }
            for paragraph in section.content.split('\n') {
                if !paragraph.is_empty() {
                    html.push_str(&format!("<p>{}</p>\n", paragraph));
                }
            }
        }
        html.push_str("</section>\n");
    }

    for section in &article.body_sections {
        render_section(&mut html, section, 0);
    }

    for figure in &article.figures {
        html.push_str(&format!("<figure id=\"{}\">\n", escape(&figure.id)));
        if let Some(url) = &figure.image_url {
            html.push_str(&format!(
                "<img src=\"{}\" alt=\"{}\"/>\n",
                escape(url),
                escape(&figure.label)
            ));
        }
        if !figure.label.is_empty() || !figure.caption.is_empty() {
            html.push_str("<figcaption>");
            if !figure.label.is_empty() {
                html.push_str(&format!("<strong>{}</strong> ", figure.label));
            }
            html.push_str(&figure.caption);
            html.push_str("</figcaption>\n");
        }
        html.push_str("</figure>\n");
    }

    for table in &article.tables {
        html.push_str(&format!("<div class=\"table-wrap\" id=\"{}\">\n", escape(&table.id)));
        if !table.label.is_empty() || !table.caption.is_empty() {
            html.push_str("<p class=\"caption\">");
            if !table.label.is_empty() {
                html.push_str(&format!("<strong>{}</strong> ", table.label));
            }
            html.push_str(&table.caption);
            html.push_str("</p>\n");
        }
        html.push_str(&table.html);
        html.push_str("\n</div>\n");
    }

    if !article.references.is_empty() {
        html.push_str("<h2>References</h2>\n<ol class=\"references\">\n");
        for reference in &article.references {
            html.push_str(&format!(
                "<li id=\"{}\">{}</li>\n",
                escape(&reference.id),
                reference.formatted_citation()
            ));
        }
        html.push_str("</ol>\n");
    }

    html
}

/// Headings scale with nesting depth, h2 at the top level, capped at h6.
fn render_section(html: &mut String, section: &BodySection, depth: usize) {
    let level = (2 + depth).min(6);

    if !section.title.is_empty() {
        html.push_str(&format!("<h{}>{}</h{}>\n", level, section.title, level));
    }
    for paragraph in &section.paragraphs {
        html.push_str(&format!("<p>{}</p>\n", paragraph));
    }
    for child in &section.children {
        render_section(html, child, depth + 1);
    }
}

/// "Journal. 2021;12(3):45-67. doi:10.x/y" from whatever metadata exists.
fn citation_line(article: &Article) -> String {
    let mut line = String::new();

    if !article.journal.is_empty() {
        line.push_str(&article.journal);
    }

    let mut issue_part = String::new();
    if !article.year.is_empty() {
        issue_part.push_str(&article.year);
    }
    if !article.volume.is_empty() {
        if !issue_part.is_empty() {
            issue_part.push(';');
        }
        issue_part.push_str(&article.volume);
        if !article.issue.is_empty() {
            issue_part.push_str(&format!("({})", article.issue));
        }
    }
    if !article.fpage.is_empty() {
        issue_part.push(':');
        issue_part.push_str(&article.fpage);
        if !article.lpage.is_empty() {
            issue_part.push('-');
            issue_part.push_str(&article.lpage);
        }
    }

    if !issue_part.is_empty() {
        if !line.is_empty() {
            line.push_str(". ");
        }
        line.push_str(&issue_part);
    }

    if !article.doi.is_empty() {
        if !line.is_empty() {
            line.push_str(". ");
        }
        line.push_str(&format!("doi:{}", article.doi));
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AbstractSection, Author, FigureInfo, ReferenceInfo, TableInfo};

    fn sample_article() -> Article {
        Article {
            title: "Sample".to_string(),
            authors: vec![Author {
                surname: "Smith".to_string(),
                given_names: Some("Jane".to_string()),
                affiliations: vec![],
            }],
            journal: "J Test".to_string(),
            year: "2021".to_string(),
            volume: "12".to_string(),
            issue: "3".to_string(),
            fpage: "45".to_string(),
            lpage: "67".to_string(),
            doi: "10.1000/x".to_string(),
            abstract_sections: vec![AbstractSection {
                title: "Background".to_string(),
                content: "Context.".to_string(),
            }],
            body_sections: vec![BodySection {
                title: "Intro".to_string(),
                paragraphs: vec!["First.".to_string()],
                children: vec![BodySection {
                    title: "Sub".to_string(),
                    paragraphs: vec!["Nested.".to_string()],
                    children: vec![],
                }],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_render_basic_structure() {
        let html = render_article(&sample_article());

        assert!(html.contains("<h1>Sample</h1>"));
        assert!(html.contains("<p class=\"authors\">Jane Smith</p>"));
        assert!(html.contains("J Test. 2021;12(3):45-67. doi:10.1000/x"));
        assert!(html.contains("<h2>Abstract</h2>"));
        assert!(html.contains("<h3>Background</h3>"));
        assert!(html.contains("<h2>Intro</h2>"));
        assert!(html.contains("<h3>Sub</h3>"));
        assert!(html.contains("<p>Nested.</p>"));
    }

    #[test]
    fn test_render_heading_depth_caps_at_h6() {
        let mut section = BodySection {
            title: "L0".to_string(),
            ..Default::default()
        };
        // Wrap six levels deep; the innermost title still renders at h6.
        for i in (1..=6).rev() {
            section = BodySection {
                title: format!("L{}", 6 - i + 1),
                children: vec![section],
                ..Default::default()
            };
        }
        let article = Article {
            body_sections: vec![section],
            ..Default::default()
        };

        let html = render_article(&article);
        assert!(html.contains("<h6>L0</h6>"));
        assert!(!html.contains("<h7>"));
    }

    #[test]
    fn test_render_figure_and_table() {
        let article = Article {
            figures: vec![FigureInfo {
                id: "fig1".to_string(),
                label: "Figure 1".to_string(),
                caption: "Design.".to_string(),
                image_url: Some("https://example.com/f.jpg".to_string()),
            }],
            tables: vec![TableInfo {
                id: "tbl1".to_string(),
                label: "Table 1".to_string(),
                caption: "Counts.".to_string(),
                html: "<table><tr><td>1</td></tr></table>".to_string(),
            }],
            ..Default::default()
        };

        let html = render_article(&article);
        assert!(html.contains("<figure id=\"fig1\">"));
        assert!(html.contains("src=\"https://example.com/f.jpg\""));
        assert!(html.contains("<figcaption><strong>Figure 1</strong> Design.</figcaption>"));
        assert!(html.contains("<div class=\"table-wrap\" id=\"tbl1\">"));
        assert!(html.contains("<table><tr><td>1</td></tr></table>"));
    }

    #[test]
    fn test_render_references() {
        let article = Article {
            references: vec![ReferenceInfo {
                id: "r1".to_string(),
                raw_citation: "Smith J. Raw. 2020.".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };

        let html = render_article(&article);
        assert!(html.contains("<h2>References</h2>"));
        assert!(html.contains("<li id=\"r1\">Smith J. Raw. 2020.</li>"));
    }

    #[test]
    fn test_render_empty_article_is_empty() {
        assert!(render_article(&Article::default()).is_empty());
    }
}
