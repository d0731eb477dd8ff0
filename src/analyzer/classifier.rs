/// Completion keywords, English and Chinese, matched by substring.
pub const DEFAULT_DONE_KEYWORDS: &[&str] = &[
    "done",
    "closed",
    "resolve",
    "resolved",
    "finish",
    "finished",
    "complete",
    "completed",
    "完成",
    "已完成",
    "結案",
    "已結案",
    "關閉",
    "已關閉",
    "已處理",
    "已解決",
];

/// Decides whether a free-text ticket status means "done".
///
/// Status vocabularies in the ticket store are inconsistent, so the match is a
/// case-folded containment test against a keyword list rather than an enum.
#[derive(Debug, Clone)]
pub struct CompletionClassifier {
    keywords: Vec<String>,
}

impl CompletionClassifier {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        CompletionClassifier { keywords }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Null and empty statuses are never done.
    pub fn is_done(&self, status: Option<&str>) -> bool {
        let s = match status {
            Some(s) if !s.trim().is_empty() => s.to_lowercase(),
            _ => return false,
        };
        self.keywords.iter().any(|k| s.contains(k.as_str()))
    }
}

impl Default for CompletionClassifier {
    fn default() -> Self {
        CompletionClassifier::new(DEFAULT_DONE_KEYWORDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_keywords() {
        let c = CompletionClassifier::default();
        assert!(c.is_done(Some("done")));
        assert!(c.is_done(Some("已結案")));
    }

    #[test]
    fn test_containment_and_case() {
        let c = CompletionClassifier::default();
        assert!(c.is_done(Some("Closed - duplicate")));
        assert!(c.is_done(Some("RESOLVED")));
        assert!(c.is_done(Some("客戶確認已完成")));
        // "resolve" is a substring of "unresolved"
        assert!(c.is_done(Some("unresolved")));
    }

    #[test]
    fn test_open_statuses() {
        let c = CompletionClassifier::default();
        assert!(!c.is_done(Some("open")));
        assert!(!c.is_done(Some("處理中")));
        assert!(!c.is_done(Some("pending")));
    }

    #[test]
    fn test_null_and_empty_never_done() {
        let c = CompletionClassifier::default();
        assert!(!c.is_done(None));
        assert!(!c.is_done(Some("")));
        assert!(!c.is_done(Some("   ")));
    }

    #[test]
    fn test_custom_keywords_replace_defaults() {
        let c = CompletionClassifier::new(["Archived", "  ", ""]);
        assert_eq!(c.keywords(), &["archived".to_string()]);
        assert!(c.is_done(Some("archived by admin")));
        assert!(!c.is_done(Some("closed")));
    }
}
