//! Plain-text export of rendered documents

use shared_types::{RenderedDocument, SectionLevel};

/// Width of the title rule
const TITLE_RULE: usize = 60;

/// Render a document as plain text
///
/// Primary headings are underlined; nested sections are indented under the
/// preceding primary section.
pub fn render_text(document: &RenderedDocument) -> String {
    let mut output = String::new();

    output.push_str(&document.title);
    output.push('\n');
    output.push_str(&"=".repeat(TITLE_RULE));
    output.push_str("\n\n");

    if let Some(notice) = &document.notice {
        output.push_str(&format!("NOTE: {}\n\n", notice));
    }

    for section in &document.sections {
        match section.level {
            SectionLevel::Primary => {
                output.push_str(&section.heading);
                output.push('\n');
                output.push_str(&"-".repeat(section.heading.chars().count()));
                output.push('\n');
                for paragraph in &section.body_paragraphs {
                    output.push_str(paragraph);
                    output.push_str("\n\n");
                }
                if section.body_paragraphs.is_empty() {
                    output.push('\n');
                }
            }
            SectionLevel::Nested => {
                output.push_str(&format!("  {}\n", section.heading));
                for paragraph in &section.body_paragraphs {
                    output.push_str(&format!("    {}\n", paragraph));
                }
                output.push('\n');
            }
        }
    }

    let trimmed = output.trim_end().len();
    output.truncate(trimmed);
    output.push('\n');
    output
}
