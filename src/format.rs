//! format.rs: renders aggregated items as one text block for the prompt.

use crate::ingest::truncate_chars;
use crate::ingest::types::{ContentCategory, ContentItem};

pub const NO_CONTENT: &str = "No content available.";
pub const SUMMARY_MAX_CHARS: usize = 150;

/// Section title for a category: label with underscores as spaces, upper-cased.
pub fn section_title(category: ContentCategory) -> String {
    category.label().replace('_', " ").to_uppercase()
}

/// One line per item: `- [source] title` plus `: summary` when present.
pub fn format_line(item: &ContentItem) -> String {
    let mut line = format!("- [{}] {}", item.source, item.title);
    if let Some(summary) = item.summary.as_deref().filter(|s| !s.is_empty()) {
        line.push_str(": ");
        line.push_str(&truncate_chars(summary, SUMMARY_MAX_CHARS));
    }
    line
}

/// Group items by category in first-seen order; sections are separated by a
/// blank line.
pub fn format_content(items: &[ContentItem]) -> String {
    if items.is_empty() {
        return NO_CONTENT.to_string();
    }

    let mut groups: Vec<(ContentCategory, Vec<&ContentItem>)> = Vec::new();
    for item in items {
        match groups.iter_mut().find(|(c, _)| *c == item.category) {
            Some((_, v)) => v.push(item),
            None => groups.push((item.category, vec![item])),
        }
    }

    groups
        .into_iter()
        .map(|(category, group)| {
            let lines: Vec<String> = group.into_iter().map(format_line).collect();
            format!("=== {} ===\n{}", section_title(category), lines.join("\n"))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles() {
        assert_eq!(section_title(ContentCategory::LocalNews), "LOCAL NEWS");
        assert_eq!(section_title(ContentCategory::Weather), "WEATHER");
    }

    #[test]
    fn summary_is_capped_at_150_chars() {
        let item = ContentItem::new("T", ContentCategory::Tech, "HN").with_summary("x".repeat(400));
        let line = format_line(&item);
        assert_eq!(line, format!("- [HN] T: {}", "x".repeat(150)));
    }

    #[test]
    fn no_summary_no_colon() {
        let item = ContentItem::new("Title", ContentCategory::History, "Wikipedia");
        assert_eq!(format_line(&item), "- [Wikipedia] Title");
    }
}
