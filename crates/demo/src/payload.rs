use serde::{Deserialize, Serialize};

pub type Row = Vec<String>;

/// The two header labels that mark a side-by-side product comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DualTableMarkers {
    pub first: String,
    pub second: String,
}

impl DualTableMarkers {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }
}

impl Default for DualTableMarkers {
    fn default() -> Self {
        Self::new("Product A", "Product B")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitledTable {
    pub title: String,
    pub rows: Vec<Row>,
}

/// A canned answer. The shape is fixed when the payload is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CannedPayload {
    /// Free text; may contain inline HTML.
    Text { html: String },
    Table {
        explanation: String,
        rows: Vec<Row>,
    },
    DualTable {
        explanation: String,
        left: TitledTable,
        right: TitledTable,
    },
}

impl CannedPayload {
    pub fn text(html: impl Into<String>) -> Self {
        CannedPayload::Text { html: html.into() }
    }

    /// Build a tabular payload, splitting it in two when the header row
    /// holds both markers. The split happens at the second marker's column:
    /// columns before it form the left table, the rest the right one.
    pub fn from_rows(explanation: impl Into<String>, rows: Vec<Row>, markers: &DualTableMarkers) -> Self {
        let explanation = explanation.into();
        let split = rows.first().and_then(|header| {
            marker_column(header, &markers.first)?;
            marker_column(header, &markers.second)
        });

        let Some(split) = split else {
            return CannedPayload::Table { explanation, rows };
        };

        let (left_rows, right_rows): (Vec<Row>, Vec<Row>) = rows
            .into_iter()
            .map(|row| {
                let at = split.min(row.len());
                let (left, right) = row.split_at(at);
                (left.to_vec(), right.to_vec())
            })
            .unzip();

        CannedPayload::DualTable {
            explanation,
            left: TitledTable {
                title: markers.first.clone(),
                rows: left_rows,
            },
            right: TitledTable {
                title: markers.second.clone(),
                rows: right_rows,
            },
        }
    }

    pub fn explanation(&self) -> Option<&str> {
        match self {
            CannedPayload::Text { .. } => None,
            CannedPayload::Table { explanation, .. } | CannedPayload::DualTable { explanation, .. } => {
                Some(explanation.as_str()).filter(|e| !e.is_empty())
            }
        }
    }
}

fn marker_column(header: &[String], marker: &str) -> Option<usize> {
    header.iter().position(|cell| cell.contains(marker))
}

/// Convenience for building rows from string literals.
pub fn row(cells: &[&str]) -> Row {
    cells.iter().map(|c| c.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> DualTableMarkers {
        DualTableMarkers::default()
    }

    #[test]
    fn test_split_at_second_marker() {
        let rows = vec![
            row(&["Product A", "Q1", "Q2", "Product B", "Q1", "Q2"]),
            row(&["Revenue", "120", "135", "Revenue", "98", "110"]),
        ];
        match CannedPayload::from_rows("Quarterly revenue", rows, &markers()) {
            CannedPayload::DualTable { explanation, left, right } => {
                assert_eq!(explanation, "Quarterly revenue");
                assert_eq!(left.title, "Product A");
                assert_eq!(right.title, "Product B");
                assert_eq!(left.rows[0], row(&["Product A", "Q1", "Q2"]));
                assert_eq!(right.rows[0], row(&["Product B", "Q1", "Q2"]));
                assert_eq!(left.rows[1], row(&["Revenue", "120", "135"]));
                assert_eq!(right.rows[1], row(&["Revenue", "98", "110"]));
            }
            other => panic!("expected DualTable, got {:?}", other),
        }
    }

    #[test]
    fn test_single_marker_is_plain_table() {
        let rows = vec![row(&["Product A", "Q1"]), row(&["Revenue", "120"])];
        assert!(matches!(
            CannedPayload::from_rows("", rows, &markers()),
            CannedPayload::Table { .. }
        ));
    }

    #[test]
    fn test_markers_out_of_order_still_split_at_second_marker() {
        let rows = vec![row(&["Product B", "Q1", "Product A", "Q1"])];
        match CannedPayload::from_rows("", rows, &markers()) {
            CannedPayload::DualTable { left, right, .. } => {
                assert!(left.rows[0].is_empty());
                assert_eq!(right.rows[0], row(&["Product B", "Q1", "Product A", "Q1"]));
            }
            other => panic!("expected DualTable, got {:?}", other),
        }
    }

    #[test]
    fn test_short_rows_split_safely() {
        let rows = vec![
            row(&["Region", "Product A", "Product B", "Delta"]),
            row(&["North"]),
        ];
        match CannedPayload::from_rows("", rows, &markers()) {
            CannedPayload::DualTable { left, right, .. } => {
                assert_eq!(left.rows[1], row(&["North"]));
                assert!(right.rows[1].is_empty());
            }
            other => panic!("expected DualTable, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_rows_is_plain_table() {
        assert!(matches!(
            CannedPayload::from_rows("none", Vec::new(), &markers()),
            CannedPayload::Table { .. }
        ));
    }

    #[test]
    fn test_explanation_accessor() {
        assert_eq!(CannedPayload::text("hi").explanation(), None);
        let table = CannedPayload::from_rows("", vec![row(&["a"])], &markers());
        assert_eq!(table.explanation(), None);
        let table = CannedPayload::from_rows("why", vec![row(&["a"])], &markers());
        assert_eq!(table.explanation(), Some("why"));
    }
}
