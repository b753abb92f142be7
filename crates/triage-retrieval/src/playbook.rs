//! Playbook markdown parsing
//!
//! Uses pulldown-cmark offsets to locate headings so sections can be sliced
//! straight out of the source text without re-rendering.

use pulldown_cmark::{Event, Parser as MdParser, Tag, TagEnd};

/// A heading and the raw markdown beneath it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybookSection {
    /// Heading level (1-6)
    pub level: u8,
    /// Heading text
    pub title: String,
    /// Raw markdown up to the next heading of the same or higher level
    pub body: String,
}

struct Heading {
    level: u8,
    title: String,
    start: usize,
    body_start: usize,
}

fn headings(content: &str) -> Vec<Heading> {
    let mut out = Vec::new();
    let mut current: Option<Heading> = None;

    for (event, range) in MdParser::new(content).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                current = Some(Heading {
                    level: level as u8,
                    title: String::new(),
                    start: range.start,
                    body_start: range.end,
                });
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(h) = current.as_mut() {
                    h.title.push_str(&text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(mut h) = current.take() {
                    h.title = h.title.trim().to_string();
                    out.push(h);
                }
            }
            _ => {}
        }
    }
    out
}

/// Every section in document order
#[must_use]
pub fn sections(content: &str) -> Vec<PlaybookSection> {
    let heads = headings(content);
    heads
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let end = heads[i + 1..]
                .iter()
                .find(|next| next.level <= h.level)
                .map_or(content.len(), |next| next.start);
            let body = content
                .get(h.body_start..end)
                .unwrap_or_default()
                .trim()
                .to_string();
            PlaybookSection {
                level: h.level,
                title: h.title.clone(),
                body,
            }
        })
        .collect()
}

/// Title from the first heading, or `fallback` when there is none
#[must_use]
pub fn title(content: &str, fallback: &str) -> String {
    headings(content)
        .into_iter()
        .map(|h| h.title)
        .find(|t| !t.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Body of the first section whose heading contains `needle` (case-insensitive)
#[must_use]
pub fn find_section(content: &str, needle: &str) -> Option<String> {
    let needle = needle.to_lowercase();
    sections(content)
        .into_iter()
        .find(|s| s.title.to_lowercase().contains(&needle))
        .map(|s| s.body)
        .filter(|b| !b.is_empty())
}

/// Known-causes section of a playbook
#[must_use]
pub fn root_cause_excerpt(content: &str) -> Option<String> {
    find_section(content, "root cause")
}

/// Mitigation section, preferring an "immediate mitigation" heading
#[must_use]
pub fn mitigation_excerpt(content: &str) -> Option<String> {
    find_section(content, "immediate mitigation").or_else(|| find_section(content, "mitigation"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PLAYBOOK: &str = "# Database Connection Pool Exhaustion

Applies to postgres-backed services.

## Symptoms
- connection timeouts

## Root Causes
1. Connection leak in application code
2. Traffic spike

### Leak detection
Check `pg_stat_activity`.

## Immediate Mitigation
1. Restart the leaking pods
```bash
kubectl rollout restart deploy/api
```

## Prevention
Add pool metrics.
";

    #[test]
    fn title_is_first_heading() {
        assert_eq!(title(PLAYBOOK, "fallback"), "Database Connection Pool Exhaustion");
        assert_eq!(title("no headings here", "db_pool"), "db_pool");
    }

    #[test]
    fn root_causes_include_subsections() {
        let body = root_cause_excerpt(PLAYBOOK).unwrap();
        assert!(body.starts_with("1. Connection leak"));
        assert!(body.contains("Leak detection"));
        assert!(!body.contains("Immediate Mitigation"));
    }

    #[test]
    fn mitigation_stops_at_next_section() {
        let body = mitigation_excerpt(PLAYBOOK).unwrap();
        assert_eq!(
            body,
            "1. Restart the leaking pods\n```bash\nkubectl rollout restart deploy/api\n```"
        );
    }

    #[test]
    fn missing_section_is_none() {
        assert!(root_cause_excerpt("# Title\n\n## Symptoms\nslow").is_none());
        assert!(mitigation_excerpt("").is_none());
    }

    #[test]
    fn sections_in_document_order() {
        let titles: Vec<_> = sections(PLAYBOOK).into_iter().map(|s| s.title).collect();
        assert_eq!(
            titles,
            [
                "Database Connection Pool Exhaustion",
                "Symptoms",
                "Root Causes",
                "Leak detection",
                "Immediate Mitigation",
                "Prevention"
            ]
        );
    }
}
