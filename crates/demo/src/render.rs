//! HTML rendering of canned payloads, matching the chat bubble markup.

use crate::payload::{CannedPayload, Row, TitledTable};

pub fn render_html(payload: &CannedPayload) -> String {
    let mut out = String::new();
    match payload {
        CannedPayload::Text { html } => {
            out.push_str("<p>");
            out.push_str(&html.replace('\n', "<br />"));
            out.push_str("</p>");
        }
        CannedPayload::Table { rows, .. } => {
            push_explanation(&mut out, payload);
            push_table(&mut out, rows);
        }
        CannedPayload::DualTable { left, right, .. } => {
            push_explanation(&mut out, payload);
            push_titled(&mut out, left);
            out.push_str("<br />");
            push_titled(&mut out, right);
        }
    }
    out
}

fn push_explanation(out: &mut String, payload: &CannedPayload) {
    if let Some(explanation) = payload.explanation() {
        out.push_str("<p>");
        out.push_str(&escape(explanation));
        out.push_str("</p>");
    }
}

fn push_titled(out: &mut String, table: &TitledTable) {
    if !table.title.is_empty() {
        out.push_str("<h4>");
        out.push_str(&escape(&table.title));
        out.push_str("</h4>");
    }
    push_table(out, &table.rows);
}

fn push_table(out: &mut String, rows: &[Row]) {
    out.push_str("<table><tbody>");
    for row in rows {
        out.push_str("<tr>");
        for cell in row {
            out.push_str("<td>");
            out.push_str(&escape(cell));
            out.push_str("</td>");
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
}

/// Escape text for an HTML body context.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
