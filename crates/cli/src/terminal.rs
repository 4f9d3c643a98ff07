use anyhow::Result;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use datachat_core::{ChatMessage, HistoryEntry};
use datachat_demo::{CannedPayload, TitledTable};
use std::collections::BTreeMap;
use std::io::{self, Write};

/// Color scheme for terminal output.
struct Colors;

impl Colors {
    const USER_PROMPT: Color = Color::Green;
    const BOT_TEXT: Color = Color::Cyan;
    const LOG: Color = Color::Yellow;
    const ARTIFACT: Color = Color::DarkGreen;
    const ERROR: Color = Color::Red;
    const DIM: Color = Color::DarkGrey;
    const HEADER: Color = Color::Magenta;
}

pub const DISCLAIMER: &str = "This is Demo UI, and the Agent AI can make mistakes.";

/// Manages terminal I/O for the interactive REPL.
pub struct Terminal;

impl Terminal {
    pub fn new() -> Self {
        Self
    }

    pub fn print_banner(&self, mode: &str, backend: &str, greeting: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print("datachat"),
            ResetColor,
            Print(format!(" - {}\n", mode)),
            SetForegroundColor(Colors::DIM),
            Print(format!("Backend: {}\n", backend)),
            Print("Type 'exit' or 'quit' to end, '/help' for commands.\n"),
            Print(format!("{}\n", DISCLAIMER)),
            Print("---\n"),
            ResetColor,
        )?;
        self.print_bot_line(greeting)
    }

    pub fn print_help(&self) -> Result<()> {
        self.print_info(concat!(
            "/new            start a new chat (current one goes to history)\n",
            "/clear          clear history and start over\n",
            "/history        list past conversations\n",
            "/attach <path>  send a file with the next message\n",
            "/logs           show tool and code logs of the last answer\n",
            "exit, quit      leave"
        ))
    }

    pub fn print_samples<'a>(&self, questions: impl Iterator<Item = &'a str>) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::DIM),
            Print("Try one of these:\n"),
            ResetColor,
        )?;
        for q in questions {
            execute!(stdout, Print(format!("  - {}\n", q)))?;
        }
        stdout.flush()?;
        Ok(())
    }

    /// Read a line of user input with prompt.
    /// Returns None at end of input.
    pub fn read_input(&self) -> Result<Option<String>> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            Print("\n"),
            SetForegroundColor(Colors::USER_PROMPT),
            Print("you> "),
            ResetColor,
        )?;
        stdout.flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        Ok(Some(input))
    }

    pub fn print_bot_line(&self, text: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::BOT_TEXT),
            Print(format!("bot> {}\n", text)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_typing(&self) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::BOT_TEXT),
            Print("bot> "),
            SetForegroundColor(Colors::DIM),
            Print(TYPING),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Write `delta` to the bot line, clearing the typing marker first.
    pub fn print_delta(&self, delta: &TextDelta<'_>, typing_shown: bool) -> Result<()> {
        let mut stdout = io::stdout();
        if typing_shown {
            let erase = "\u{8}".repeat(TYPING.len());
            execute!(stdout, Print(format!("{}{}{}", erase, " ".repeat(TYPING.len()), erase)))?;
        }
        match delta {
            TextDelta::Append(s) => {
                execute!(stdout, SetForegroundColor(Colors::BOT_TEXT), Print(s), ResetColor)?
            }
            TextDelta::Replace(s) => execute!(
                stdout,
                Print("\n"),
                SetForegroundColor(Colors::BOT_TEXT),
                Print(format!("bot> {}", s)),
                ResetColor,
            )?,
            TextDelta::None => {}
        }
        stdout.flush()?;
        Ok(())
    }

    pub fn end_line(&self) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(stdout, Print("\n"))?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_logs(&self, logs: &[String]) -> Result<()> {
        let mut stdout = io::stdout();
        if logs.is_empty() {
            return self.print_info("(no logs)");
        }
        for line in logs {
            execute!(
                stdout,
                SetForegroundColor(Colors::LOG),
                Print(format!("{}\n", indent(line))),
                ResetColor,
            )?;
        }
        stdout.flush()?;
        Ok(())
    }

    pub fn print_artifacts(&self, artifacts: &BTreeMap<String, String>) -> Result<()> {
        let mut stdout = io::stdout();
        for (name, version) in artifacts {
            execute!(
                stdout,
                SetForegroundColor(Colors::ARTIFACT),
                Print(format!("  [artifact] {} (v{})\n", name, version)),
                ResetColor,
            )?;
        }
        stdout.flush()?;
        Ok(())
    }

    /// Render a canned answer with real tables instead of its HTML form.
    /// Continues the current `bot> ` line.
    pub fn print_payload(&self, payload: &CannedPayload) -> Result<()> {
        let mut stdout = io::stdout();
        let lines = match payload {
            CannedPayload::Text { html } => vec![strip_tags(html)],
            CannedPayload::Table { rows, .. } => {
                let mut lines = explanation_lines(payload);
                lines.extend(format_table(rows));
                lines
            }
            CannedPayload::DualTable { left, right, .. } => {
                let mut lines = explanation_lines(payload);
                lines.extend(format_titled(left));
                lines.push(String::new());
                lines.extend(format_titled(right));
                lines
            }
        };
        execute!(
            stdout,
            SetForegroundColor(Colors::BOT_TEXT),
            Print(lines.join("\n")),
            Print("\n"),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_history(&self, history: &[HistoryEntry]) -> Result<()> {
        let mut stdout = io::stdout();
        if history.is_empty() {
            return self.print_info("No past conversations.");
        }
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print("History:\n"),
            ResetColor,
        )?;
        for (i, entry) in history.iter().enumerate() {
            execute!(
                stdout,
                SetForegroundColor(Colors::DIM),
                Print(format!("{:>3}. {} ", i + 1, entry.archived_at.format("%H:%M"))),
                ResetColor,
                Print(format!("{}\n", entry.title)),
            )?;
        }
        stdout.flush()?;
        Ok(())
    }

    /// Print the message a failed response ended with, either on the open
    /// `bot> ` line or on a fresh one.
    pub fn print_failed(&self, message: &ChatMessage, mid_line: bool) -> Result<()> {
        let mut stdout = io::stdout();
        let prefix = if mid_line { "" } else { "bot> " };
        execute!(
            stdout,
            SetForegroundColor(Colors::ERROR),
            Print(format!("{}{}\n", prefix, message.text)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_error(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::ERROR),
            Print(format!("Error: {}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_info(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::DIM),
            Print(format!("{}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }
}

const TYPING: &str = "typing...";

/// What to print to bring the screen in line with the latest bot text.
#[derive(Debug, PartialEq, Eq)]
pub enum TextDelta<'a> {
    None,
    Append(&'a str),
    /// The text changed in place (e.g. replaced by an error); print it whole.
    Replace(&'a str),
}

pub fn text_delta<'a>(printed: &str, current: &'a str) -> TextDelta<'a> {
    if current == printed {
        TextDelta::None
    } else if let Some(rest) = current.strip_prefix(printed) {
        TextDelta::Append(rest)
    } else {
        TextDelta::Replace(current)
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|l| format!("  {}", l))
        .collect::<Vec<_>>()
        .join("\n")
}

fn explanation_lines(payload: &CannedPayload) -> Vec<String> {
    payload
        .explanation()
        .map(|e| vec![e.to_string(), String::new()])
        .unwrap_or_default()
}

fn format_titled(table: &TitledTable) -> Vec<String> {
    let mut lines = vec![format!("[{}]", table.title)];
    lines.extend(format_table(&table.rows));
    lines
}

/// Lay out rows as aligned columns, the first row treated as the header.
pub fn format_table(rows: &[Vec<String>]) -> Vec<String> {
    let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; cols];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let fmt_row = |row: &Vec<String>| {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let pad = widths[i] - cell.chars().count();
                format!("{}{}", cell, " ".repeat(pad))
            })
            .collect();
        cells.join(" | ").trim_end().to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (i, row) in rows.iter().enumerate() {
        lines.push(fmt_row(row));
        if i == 0 {
            let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
            lines.push(rule.join("-+-"));
        }
    }
    lines
}

/// Drop inline markup from canned text, keeping line breaks.
pub fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}
