//! The fixed question/answer table used in demo mode.

use crate::payload::{row, CannedPayload, DualTableMarkers};

/// Answer for any input that is not a known question.
pub const NOT_FOUND_TEXT: &str =
    "Sorry, I don't have an answer for that yet. Try one of the sample questions.";

#[derive(Debug, Clone, PartialEq)]
pub struct CannedEntry {
    pub question: String,
    pub payload: CannedPayload,
}

/// Ordered list of canned entries. Lookup is exact and the first match wins.
#[derive(Debug, Clone, Default)]
pub struct CannedCatalog {
    entries: Vec<CannedEntry>,
}

impl CannedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, question: impl Into<String>, payload: CannedPayload) {
        self.entries.push(CannedEntry {
            question: question.into(),
            payload,
        });
    }

    /// Exact string match against the questions, in order.
    pub fn find(&self, input: &str) -> Option<&CannedEntry> {
        self.entries.iter().find(|e| e.question == input)
    }

    pub fn questions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.question.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The sample questions shipped with the demo.
    pub fn builtin() -> Self {
        let markers = DualTableMarkers::default();
        let mut catalog = Self::new();

        catalog.push(
            "What can you do?",
            CannedPayload::text(
                "I am a data agent. I can:\n\
                 - query sales, production and quality tables\n\
                 - run <b>Python</b> analysis on the results\n\
                 - compare <b>Product A</b> and <b>Product B</b> side by side",
            ),
        );

        catalog.push(
            "Compare quarterly revenue for Product A and Product B",
            CannedPayload::from_rows(
                "Revenue in $K per quarter. Product A grew faster in the second half.",
                vec![
                    row(&["Product A", "Q1", "Q2", "Q3", "Q4", "Product B", "Q1", "Q2", "Q3", "Q4"]),
                    row(&["Revenue", "120", "135", "162", "190", "Revenue", "98", "110", "118", "121"]),
                    row(&["Growth", "-", "12.5%", "20.0%", "17.3%", "Growth", "-", "12.2%", "7.3%", "2.5%"]),
                ],
                &markers,
            ),
        );

        catalog.push(
            "Compare defect rates for Product A and Product B",
            CannedPayload::from_rows(
                "Defects per thousand units by line. Line 2 drives most Product B defects.",
                vec![
                    row(&["Product A", "Line 1", "Line 2", "Product B", "Line 1", "Line 2"]),
                    row(&["Defects/1k", "1.8", "2.1", "Defects/1k", "2.0", "4.7"]),
                ],
                &markers,
            ),
        );

        catalog.push(
            "What were the top 5 regions by revenue last quarter?",
            CannedPayload::from_rows(
                "Top regions by Q4 revenue.",
                vec![
                    row(&["Rank", "Region", "Revenue ($K)", "QoQ"]),
                    row(&["1", "Seoul", "412", "+8.1%"]),
                    row(&["2", "Busan", "233", "+3.4%"]),
                    row(&["3", "Incheon", "198", "+5.0%"]),
                    row(&["4", "Daegu", "151", "-1.2%"]),
                    row(&["5", "Daejeon", "137", "+2.7%"]),
                ],
                &markers,
            ),
        );

        catalog.push(
            "Summarize yesterday's pipeline run",
            CannedPayload::text(
                "The nightly pipeline finished in <b>42 minutes</b>.\n\
                 3 tables refreshed, 0 failures.\n\
                 The <i>quality_daily</i> job was skipped because its source was unchanged.",
            ),
        );

        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_only() {
        let catalog = CannedCatalog::builtin();
        assert!(catalog.find("What can you do?").is_some());
        assert!(catalog.find("what can you do?").is_none());
        assert!(catalog.find("What can you do? ").is_none());
        assert!(catalog.find("What can you").is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let mut catalog = CannedCatalog::new();
        catalog.push("q", CannedPayload::text("first"));
        catalog.push("q", CannedPayload::text("second"));
        assert_eq!(catalog.find("q").unwrap().payload, CannedPayload::text("first"));
    }

    #[test]
    fn test_builtin_shapes() {
        let catalog = CannedCatalog::builtin();
        assert!(!catalog.is_empty());
        assert!(matches!(
            catalog
                .find("Compare quarterly revenue for Product A and Product B")
                .unwrap()
                .payload,
            CannedPayload::DualTable { .. }
        ));
        assert!(matches!(
            catalog
                .find("What were the top 5 regions by revenue last quarter?")
                .unwrap()
                .payload,
            CannedPayload::Table { .. }
        ));
    }

    #[test]
    fn test_questions_in_order() {
        let catalog = CannedCatalog::builtin();
        let questions: Vec<&str> = catalog.questions().collect();
        assert_eq!(questions.len(), catalog.len());
        assert_eq!(questions[0], "What can you do?");
    }
}
