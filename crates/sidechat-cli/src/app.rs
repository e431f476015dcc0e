use anyhow::{Context, Result};
use crossterm::style::Stylize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

use sidechat_core::llm::Role;
use sidechat_core::project::{find_workspace_root, list_workspace_files, FileSelection};
use sidechat_core::render::render_transcript;
use sidechat_core::{
    ChatSession, FileAttachment, ImageAttachment, MarkdownRenderer, Settings, TurnObserver,
    TurnOutcome,
};

use crate::commands::{handle_command, CommandResult};

/// Directory that workspace-relative attachments are resolved against.
pub struct Workspace {
    pub root: PathBuf,
    pub max_file_bytes: u64,
}

impl Workspace {
    pub fn detect(max_file_bytes: u64) -> Result<Self> {
        let cwd = std::env::current_dir().context("cannot read current directory")?;
        let root = find_workspace_root(&cwd).unwrap_or(cwd);
        tracing::debug!(root = %root.display(), "using workspace");
        Ok(Self {
            root,
            max_file_bytes,
        })
    }

    fn read_file(&self, relative: &str) -> Result<FileAttachment> {
        Ok(FileAttachment::read(&self.root, relative, self.max_file_bytes)?)
    }

    fn read_image(&self, path: &str) -> Result<ImageAttachment> {
        Ok(ImageAttachment::from_path(Path::new(path), self.max_file_bytes)?)
    }
}

pub struct PromptRequest {
    pub prompt: String,
    pub images: Vec<PathBuf>,
    pub files: Vec<String>,
    pub html: Option<PathBuf>,
}

/// Prints the reply as it streams in.
struct TerminalPrinter<W: Write> {
    out: W,
    streamed: String,
}

impl TerminalPrinter<std::io::Stdout> {
    fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> TerminalPrinter<W> {
    fn new(out: W) -> Self {
        Self {
            out,
            streamed: String::new(),
        }
    }
}

impl<W: Write> TurnObserver for TerminalPrinter<W> {
    fn on_loading(&mut self, loading: bool) {
        if loading {
            self.streamed.clear();
            let _ = write!(self.out, "{} ", "assistant>".green().bold());
            let _ = self.out.flush();
        }
    }

    fn on_delta(&mut self, delta: &str, _assembled: &str) {
        let _ = write!(self.out, "{delta}");
        let _ = self.out.flush();
        self.streamed.push_str(delta);
    }

    fn on_complete(&mut self, final_text: &str) {
        // A failed stream leaves partial text on screen; the recorded
        // fallback goes on its own line after it.
        if self.streamed.is_empty() {
            let _ = write!(self.out, "{final_text}");
        } else if self.streamed != final_text {
            let _ = write!(self.out, "\n{final_text}");
        }
        let _ = writeln!(self.out);
        let _ = self.out.flush();
        self.streamed.clear();
    }
}

fn build_session(settings: &Settings) -> Result<ChatSession> {
    let client = settings.build_llm_client()?;
    Ok(settings.build_session(Box::new(client)))
}

fn report(outcome: &TurnOutcome) {
    if let TurnOutcome::Failed { error, .. } = outcome {
        eprintln!("{} {error}", "error:".red().bold());
    }
}

pub async fn run_single_prompt(
    settings: &Settings,
    workspace: &Workspace,
    request: PromptRequest,
) -> Result<()> {
    let mut session = build_session(settings)?;

    for path in &request.images {
        session.attach_image(ImageAttachment::from_path(path, workspace.max_file_bytes)?);
    }
    for relative in &request.files {
        session.attach_file(workspace.read_file(relative)?);
    }

    let mut printer = TerminalPrinter::stdout();
    let outcome = session.send(&request.prompt, &mut printer).await;
    report(&outcome);

    if let Some(path) = request.html {
        save_transcript(settings, &session, &path)?;
    }
    Ok(())
}

// ── Interactive loop ────────────────────────────────────────────────────

pub async fn run_repl(settings: &Settings, workspace: &Workspace, html: Option<PathBuf>) -> Result<()> {
    let mut session = build_session(settings)?;
    let mut printer = TerminalPrinter::stdout();
    let mut selection = FileSelection::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!(
        "{} model {} in {} (type /help for commands)",
        "sidechat".cyan().bold(),
        session.model(),
        workspace.root.display()
    );

    loop {
        print!("{} ", "you>".cyan().bold());
        let _ = std::io::stdout().flush();

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match handle_command(line.trim()) {
            CommandResult::NotACommand => {
                let outcome = session.send(&line, &mut printer).await;
                report(&outcome);
            }
            CommandResult::Message(text) => println!("{text}"),
            CommandResult::Quit => break,
            CommandResult::Clear => {
                session.clear();
                println!("Started a new conversation.");
            }
            CommandResult::AttachImage(path) => match workspace.read_image(&path) {
                Ok(image) => {
                    session.attach_image(image);
                    println!("Attached image {path}");
                }
                Err(e) => eprintln!("{} {e}", "error:".red().bold()),
            },
            CommandResult::AttachFile(relative) => match workspace.read_file(&relative) {
                Ok(file) => {
                    session.attach_file(file);
                    println!("Attached {relative}");
                }
                Err(e) => eprintln!("{} {e}", "error:".red().bold()),
            },
            CommandResult::Detach(None) => {
                session.clear_attachments();
                println!("Attachments cleared.");
            }
            CommandResult::Detach(Some(path)) => {
                if session.detach_file(&path) {
                    println!("Detached {path}");
                } else {
                    println!("{path} is not attached.");
                }
            }
            CommandResult::Select(None) => {
                if selection.is_empty() {
                    println!("No files selected.");
                } else {
                    println!("Selected: {}", selection.labels());
                }
            }
            CommandResult::Select(Some(path)) => {
                let verb = if selection.toggle(&path) { "Selected" } else { "Deselected" };
                println!("{verb} {path} ({} selected)", selection.len());
            }
            CommandResult::AttachSelected => {
                let paths: Vec<String> = selection.selected().map(str::to_string).collect();
                if paths.is_empty() {
                    println!("No files selected.");
                }
                for relative in paths {
                    match workspace.read_file(&relative) {
                        Ok(file) => {
                            session.attach_file(file);
                            println!("Attached {relative}");
                        }
                        Err(e) => eprintln!("{} {e}", "error:".red().bold()),
                    }
                }
                selection.clear();
            }
            CommandResult::ShowAttachments => {
                let pending = session.attachments();
                if pending.is_empty() {
                    println!("No attachments.");
                }
                for file in &pending.files {
                    println!("  file  {}", file.path);
                }
                for image in &pending.images {
                    println!("  image {} ({} bytes encoded)", image.mime(), image.data_url().len());
                }
            }
            CommandResult::ListFiles(filter) => print_files(workspace, filter.as_deref(), &selection),
            CommandResult::GenerateCode(path) => match workspace.read_image(&path) {
                Ok(image) => {
                    let outcome = session.generate_code_from_image(image, &mut printer).await;
                    report(&outcome);
                }
                Err(e) => eprintln!("{} {e}", "error:".red().bold()),
            },
            CommandResult::SaveTranscript(path) => {
                match save_transcript(settings, &session, Path::new(&path)) {
                    Ok(()) => println!("Saved conversation to {path}"),
                    Err(e) => eprintln!("{} {e:#}", "error:".red().bold()),
                }
            }
            CommandResult::ShowStatus => {
                println!("Session:   {}", session.id());
                println!("Model:     {}", session.model());
                let history = session.history();
                println!(
                    "Messages:  {} ({} from you, {} replies)",
                    history.len(),
                    history.count_role(Role::User),
                    history.count_role(Role::Assistant)
                );
                println!("Tokens:    ~{}", session.history().estimate_tokens());
                if let Some(usage) = session.last_usage() {
                    println!(
                        "Last turn: {} prompt + {} completion tokens",
                        usage.prompt_tokens, usage.completion_tokens
                    );
                }
                println!("Workspace: {}", workspace.root.display());
            }
        }
    }

    if let Some(path) = html {
        save_transcript(settings, &session, &path)?;
    }
    Ok(())
}

/// List workspace files, selected ones first and marked with `*`.
pub fn print_files(workspace: &Workspace, filter: Option<&str>, selection: &FileSelection) {
    let filter = filter.map(str::to_lowercase);
    let entries: Vec<_> = list_workspace_files(&workspace.root)
        .into_iter()
        .filter(|e| filter.as_deref().map_or(true, |f| e.path.to_lowercase().contains(f)))
        .collect();
    let (picked, rest) = selection.partition(&entries);
    for entry in picked {
        println!("{} {}  {}", "*".green().bold(), entry.path, entry.type_label().dark_grey());
    }
    for entry in rest {
        if entry.is_dir() {
            println!("  {}/", entry.path.as_str().blue());
        } else {
            println!("  {}  {}", entry.path, entry.type_label().dark_grey());
        }
    }
}

fn save_transcript(settings: &Settings, session: &ChatSession, path: &Path) -> Result<()> {
    let renderer = MarkdownRenderer::with_theme(&settings.chat.theme);
    let body = render_transcript(&renderer, session.history().messages());
    let page = format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"UTF-8\"><title>Sidechat</title></head>\n<body>\n{body}</body>\n</html>\n"
    );
    std::fs::write(path, page).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}
