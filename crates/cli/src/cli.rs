use clap::Parser;

use datachat_core::Config;

/// Terminal chat client for a streaming data agent.
///
/// Sends each message to the agent's `/api/run_sse` endpoint and prints the
/// reply as it streams in. With `--demo`, answers come from a built-in set
/// of canned responses instead.
#[derive(Parser, Debug, Default)]
#[command(name = "datachat", about = "Chat with a streaming data agent")]
pub struct CliArgs {
    /// Agent server base URL (e.g. http://localhost:8000)
    #[arg(long)]
    pub server: Option<String>,

    /// App name sent with every request
    #[arg(long)]
    pub app_name: Option<String>,

    /// User id sent with every request
    #[arg(long)]
    pub user_id: Option<String>,

    /// Resume an existing backend session by id
    #[arg(long)]
    pub session: Option<String>,

    /// Answer from canned responses; no server needed
    #[arg(long)]
    pub demo: bool,

    /// Path to config file (default: ~/.config/datachat/config.toml)
    #[arg(long)]
    pub config: Option<String>,

    /// Print tool and code logs after each response
    #[arg(long)]
    pub show_logs: bool,
}

impl CliArgs {
    /// Flags win over everything else.
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref url) = self.server {
            config.agent.base_url = url.clone();
        }
        if let Some(ref app) = self.app_name {
            config.agent.app_name = app.clone();
        }
        if let Some(ref user) = self.user_id {
            config.agent.user_id = user.clone();
        }
    }
}

/// One line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    NewChat,
    ClearHistory,
    History,
    Attach(String),
    Logs,
    Help,
    Exit,
    Unknown(String),
    Blank,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Command::Blank;
        }
        if matches!(trimmed, "exit" | "quit" | "/exit" | "/quit") {
            return Command::Exit;
        }
        if !trimmed.starts_with('/') {
            // Only the line terminator goes; the text is sent as typed.
            return Command::Send(line.trim_end_matches(['\n', '\r']).to_string());
        }

        let (name, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (trimmed, ""),
        };
        match name {
            "/new" => Command::NewChat,
            "/clear" => Command::ClearHistory,
            "/history" => Command::History,
            "/logs" => Command::Logs,
            "/help" => Command::Help,
            "/attach" if !rest.is_empty() => Command::Attach(rest.to_string()),
            _ => Command::Unknown(trimmed.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("   "), Command::Blank);
        assert_eq!(Command::parse("quit"), Command::Exit);
        assert_eq!(Command::parse(" /new "), Command::NewChat);
        assert_eq!(Command::parse("/clear"), Command::ClearHistory);
        assert_eq!(Command::parse("/history"), Command::History);
        assert_eq!(Command::parse("/logs"), Command::Logs);
        assert_eq!(
            Command::parse("/attach  ./data/sales.xlsx"),
            Command::Attach("./data/sales.xlsx".into())
        );
        assert_eq!(Command::parse("/attach"), Command::Unknown("/attach".into()));
        assert_eq!(Command::parse("/bogus x"), Command::Unknown("/bogus x".into()));
    }

    #[test]
    fn test_plain_text_is_sent_as_typed() {
        assert_eq!(
            Command::parse("What can you do?\r\n"),
            Command::Send("What can you do?".into())
        );
        assert_eq!(
            Command::parse("  What can you do? \n"),
            Command::Send("  What can you do? ".into())
        );
        // Only a leading slash makes a command.
        assert_eq!(Command::parse("a/new"), Command::Send("a/new".into()));
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::for_profile("CLITESTFLAGS");
        let args = CliArgs {
            server: Some("http://agent:9000".into()),
            user_id: Some("alice".into()),
            ..CliArgs::default()
        };
        let app_before = config.agent.app_name.clone();
        args.apply(&mut config);
        assert_eq!(config.agent.base_url, "http://agent:9000");
        assert_eq!(config.agent.user_id, "alice");
        assert_eq!(config.agent.app_name, app_before);
    }

    #[test]
    fn test_clap_parses_flags() {
        let args = CliArgs::parse_from([
            "datachat",
            "--demo",
            "--show-logs",
            "--session",
            "s-1",
            "--app-name",
            "my_app",
        ]);
        assert!(args.demo);
        assert!(args.show_logs);
        assert_eq!(args.session.as_deref(), Some("s-1"));
        assert_eq!(args.app_name.as_deref(), Some("my_app"));
        assert!(args.server.is_none());
    }
}
