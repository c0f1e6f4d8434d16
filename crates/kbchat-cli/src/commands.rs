use kbchat_core::ThreadId;

pub const HELP: &str = "\
Type a message to send it to the assistant.

  /new                  start a new chat
  /open <id>            switch to a thread
  /list                 list threads, most recent first
  /rename <id> <title>  rename a thread
  /delete <id>          delete a thread
  /starters             show suggested opening questions
  /starter <n>          send suggested question <n>
  /health               check the service
  /stats                knowledge base statistics
  /theme                toggle light/dark
  /help                 this text
  /quit                 exit";

/// Parsed command variants handled by the REPL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    New,
    Open(ThreadId),
    List,
    Rename { id: ThreadId, title: String },
    Delete(ThreadId),
    Starters,
    Starter(usize),
    Health,
    Stats,
    Theme,
    Help,
    Quit,
    /// Anything that is not a command is a chat message.
    Chat(String),
    /// A command that could not be parsed; carries the usage hint.
    Invalid(String),
}

/// Parse one input line. Blank lines become an empty `Chat`, which the engine ignores.
pub fn parse(line: &str) -> Command {
    let Some(rest) = line.trim().strip_prefix('/') else {
        return Command::Chat(line.to_string());
    };
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    match name {
        "new" => Command::New,
        "list" | "ls" => Command::List,
        "open" => thread_arg(args, "/open <id>").map_or_else(|e| e, Command::Open),
        "delete" | "rm" => thread_arg(args, "/delete <id>").map_or_else(|e| e, Command::Delete),
        "rename" => {
            let (id, title) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
            match thread_arg(id, "/rename <id> <title>") {
                Ok(id) => Command::Rename {
                    id,
                    title: title.trim().to_string(),
                },
                Err(e) => e,
            }
        }
        "starters" => Command::Starters,
        "starter" => match args.parse::<usize>() {
            Ok(n) if n > 0 => Command::Starter(n),
            _ => Command::Invalid("usage: /starter <n>".into()),
        },
        "health" => Command::Health,
        "stats" => Command::Stats,
        "theme" => Command::Theme,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => Command::Invalid(format!("unknown command /{other}; try /help")),
    }
}

fn thread_arg(raw: &str, usage: &str) -> Result<ThreadId, Command> {
    ThreadId::new(raw.trim()).map_err(|_| Command::Invalid(format!("usage: {usage}")))
}
