/// Result of processing a slash command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// Display a message to the user.
    Message(String),
    /// Start a fresh conversation.
    Clear,
    /// Quit the application.
    Quit,
    /// Attach an image file to the next message.
    AttachImage(String),
    /// Attach a workspace file to the next message.
    AttachFile(String),
    /// Drop one pending file, or all attachments when no path is given.
    Detach(Option<String>),
    /// Toggle a workspace file in the selection, or show the selection.
    Select(Option<String>),
    /// Attach every selected workspace file and clear the selection.
    AttachSelected,
    /// List workspace files, optionally filtered by a substring.
    ListFiles(Option<String>),
    /// Show pending attachments.
    ShowAttachments,
    /// Ask for code reproducing the UI in an image.
    GenerateCode(String),
    /// Write the conversation as HTML.
    SaveTranscript(String),
    /// Show status (model, tokens, directory).
    ShowStatus,
    /// Not a command - treat as regular input.
    NotACommand,
}

pub fn handle_command(input: &str) -> CommandResult {
    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    let cmd = parts[0];
    let arg = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match cmd {
        "/help" | "/h" => show_help(),
        "/exit" | "/quit" | "/q" => CommandResult::Quit,
        "/clear" | "/new" => CommandResult::Clear,

        // Attachments
        "/image" | "/img" => {
            if arg.is_empty() {
                CommandResult::Message("Usage: /image <path>".into())
            } else {
                CommandResult::AttachImage(arg.to_string())
            }
        }
        "/file" | "/add" => {
            if arg.is_empty() {
                CommandResult::Message("Usage: /file <workspace-relative path>".into())
            } else {
                CommandResult::AttachFile(arg.to_string())
            }
        }
        "/detach" => CommandResult::Detach(optional(arg)),
        "/select" | "/sel" => CommandResult::Select(optional(arg)),
        "/attach-selected" => CommandResult::AttachSelected,
        "/attachments" => CommandResult::ShowAttachments,
        "/files" | "/tree" => CommandResult::ListFiles(optional(arg)),
        "/generate" => {
            if arg.is_empty() {
                CommandResult::Message("Usage: /generate <image path>".into())
            } else {
                CommandResult::GenerateCode(arg.to_string())
            }
        }

        // Conversation
        "/save" => {
            if arg.is_empty() {
                CommandResult::Message("Usage: /save <output.html>".into())
            } else {
                CommandResult::SaveTranscript(arg.to_string())
            }
        }
        "/status" => CommandResult::ShowStatus,
        "/version" => CommandResult::Message(format!("Sidechat v{}", env!("CARGO_PKG_VERSION"))),

        // Unknown command
        _ => {
            if input.starts_with('/') {
                CommandResult::Message(format!("Unknown command: {cmd}. Type /help for commands."))
            } else {
                CommandResult::NotACommand
            }
        }
    }
}

fn optional(arg: &str) -> Option<String> {
    (!arg.is_empty()).then(|| arg.to_string())
}

fn show_help() -> CommandResult {
    let help_text = "\
Sidechat Commands

  CONTEXT
    /image <path>             Attach an image to the next message
    /file <path>              Attach a workspace file to the next message
    /files [filter]           List workspace files, selected first
    /select [path]            Toggle a file in the selection, or show it
    /attach-selected          Attach all selected files
    /attachments              Show pending attachments
    /detach [path]            Drop one attached file, or everything
    /generate <image path>    Generate code for the UI in an image

  CONVERSATION
    /clear, /new              Start a fresh conversation
    /save <file.html>         Save the conversation as HTML
    /status                   Show model, token estimate and workspace

  OTHER
    /help, /h                 Show this help message
    /version                  Show version information
    /exit, /quit, /q          Quit";

    CommandResult::Message(help_text.into())
}
