//! Identifier extraction from free text
//!
//! Grammar: a configured project prefix (any case), then either a dash with
//! optional surrounding whitespace or a run of whitespace, then digits.
//! When a text holds several matches, the first one sitting in a
//! commit-style context wins; otherwise the first match does.

use super::identifier::Identifier;
use regex_lite::Regex;
use thiserror::Error;

/// Characters inspected on each side of a match for context markers
pub const CONTEXT_WINDOW: usize = 20;

/// Markers that flag a match as the subject of a commit-style line
pub const CONTEXT_MARKERS: [&str; 3] = ["feat:", "fix:", "•"];

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("at least one project prefix is required")]
    NoPrefixes,

    #[error("invalid project prefix {0:?}: expected ASCII letters only")]
    InvalidPrefix(String),

    #[error("pattern error: {0}")]
    Pattern(#[from] regex_lite::Error),
}

/// Compiled identifier grammar for a fixed set of project prefixes
#[derive(Debug, Clone)]
pub struct TicketExtractor {
    ticket: Regex,
    artifact: Regex,
}

impl TicketExtractor {
    pub fn new<I, S>(prefixes: I) -> Result<Self, ExtractorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut alternatives = Vec::new();
        for prefix in prefixes {
            let prefix = prefix.as_ref();
            if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(ExtractorError::InvalidPrefix(prefix.to_string()));
            }
            alternatives.push(regex_lite::escape(prefix));
        }
        if alternatives.is_empty() {
            return Err(ExtractorError::NoPrefixes);
        }
        let ticket = format!(r"(?:{})(?:\s*-\s*|\s+)\d+", alternatives.join("|"));

        Ok(Self {
            ticket: Regex::new(&format!("(?i){}", ticket))?,
            // Build or run number, bullet, then free text holding the identifier
            artifact: Regex::new(&format!(r"(?i)#\d+\.\d+\s*[•·]\s*.*{}", ticket))?,
        })
    }

    /// The single most relevant identifier in `text`, if any
    pub fn extract(&self, text: &str) -> Option<Identifier> {
        let mut first = None;
        for m in self.ticket.find_iter(text) {
            if first.is_none() {
                first = Some(m.as_str());
            }
            if has_context_marker(text, m.start(), m.end()) {
                return Identifier::normalize(m.as_str());
            }
        }
        first.and_then(Identifier::normalize)
    }

    /// Every identifier occurrence in `text`, in order, duplicates kept
    pub fn find_all(&self, text: &str) -> Vec<Identifier> {
        self.ticket
            .find_iter(text)
            .filter_map(|m| Identifier::normalize(m.as_str()))
            .collect()
    }

    /// Whether `text` looks like an artifact listing line
    /// (`#20260116.2 • feat: ECP-4849 ...`)
    pub fn is_artifact_listing(&self, text: &str) -> bool {
        self.artifact.is_match(text)
    }
}

fn has_context_marker(text: &str, start: usize, end: usize) -> bool {
    let window_start = text[..start]
        .char_indices()
        .rev()
        .take(CONTEXT_WINDOW)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(start);
    let window_end = text[end..]
        .char_indices()
        .nth(CONTEXT_WINDOW)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());

    let window = text[window_start..window_end].to_lowercase();
    CONTEXT_MARKERS.iter().any(|marker| window.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> TicketExtractor {
        TicketExtractor::new(["ECP", "IP"]).unwrap()
    }

    fn extract(text: &str) -> Option<String> {
        extractor().extract(text).map(|id| id.to_string())
    }

    #[test]
    fn extracts_artifact_listing_lines() {
        assert_eq!(
            extract("#20260116.2 • feat: ECP-4849 [BFF] Return isBillable flag field").as_deref(),
            Some("ECP-4849")
        );
        assert_eq!(extract("Pavel.malai/ecp 4805 (#637)").as_deref(), Some("ECP-4805"));
        assert_eq!(extract("#20260113.3 • Pavel.malai/IP 4805 (#637)").as_deref(), Some("IP-4805"));
        assert_eq!(extract("#20260113.3 • Pavel.malai/IP-4805 (#637)").as_deref(), Some("IP-4805"));
    }

    #[test]
    fn separator_variants_normalize_identically() {
        assert_eq!(extract("see ECP - 4805").as_deref(), Some("ECP-4805"));
        assert_eq!(extract("see ecp 4805").as_deref(), Some("ECP-4805"));
        assert_eq!(extract("see ECP-4805").as_deref(), Some("ECP-4805"));
    }

    #[test]
    fn no_match_is_none() {
        assert_eq!(extract("nothing to see here"), None);
        assert_eq!(extract("ECP-"), None);
        assert_eq!(extract("ABC-123"), None);
    }

    #[test]
    fn prefers_match_in_commit_context() {
        let text = "See ECP-100 for background context on this change. feat: ECP-200 add flag";
        assert_eq!(extract(text).as_deref(), Some("ECP-200"));
    }

    #[test]
    fn falls_back_to_first_match() {
        let text = "Merged ECP-100 and later also ECP-200 into main";
        assert_eq!(extract(text).as_deref(), Some("ECP-100"));
    }

    #[test]
    fn extraction_is_deterministic() {
        let ex = extractor();
        let text = "#1.1 • IP 9 and ECP-3 fix: ECP-4";
        let first = ex.extract(text);
        for _ in 0..10 {
            assert_eq!(ex.extract(text), first);
        }
    }

    #[test]
    fn context_window_handles_multibyte_text() {
        let text = "ééééééééééééééééééééééé ECP-1 ééééééééééééééééééééééé";
        assert_eq!(extract(text).as_deref(), Some("ECP-1"));
    }

    #[test]
    fn finds_all_occurrences() {
        let ids = extractor().find_all("ECP-1, ecp 2 and IP-3, again ECP-1");
        let ids: Vec<_> = ids.iter().map(|i| i.as_str()).collect();
        assert_eq!(ids, ["ECP-1", "ECP-2", "IP-3", "ECP-1"]);
    }

    #[test]
    fn recognizes_artifact_listing() {
        let ex = extractor();
        assert!(ex.is_artifact_listing("#20260116.2 • feat: ECP-4849 [BFF]"));
        assert!(ex.is_artifact_listing("#20260113.3 · Pavel.malai/ecp 4805"));
        assert!(!ex.is_artifact_listing("feat: ECP-4849"));
        assert!(!ex.is_artifact_listing("#20260116 • feat: ECP-4849"));
    }

    #[test]
    fn rejects_bad_prefixes() {
        assert!(matches!(
            TicketExtractor::new(Vec::<String>::new()),
            Err(ExtractorError::NoPrefixes)
        ));
        assert!(matches!(
            TicketExtractor::new(["EC P"]),
            Err(ExtractorError::InvalidPrefix(_))
        ));
    }
}
