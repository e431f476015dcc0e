//! Markdown to HTML with highlighted, copyable code blocks.

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::{SyntaxReference, SyntaxSet};

use crate::llm::{Message, Role};
use crate::session::TurnObserver;

pub const DEFAULT_THEME: &str = "base16-ocean.dark";

pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme: Theme,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self::with_theme(DEFAULT_THEME)
    }

    /// Use a named syntect theme, falling back to the default one.
    pub fn with_theme(name: &str) -> Self {
        let mut themes = ThemeSet::load_defaults().themes;
        let theme = themes
            .remove(name)
            .or_else(|| themes.remove(DEFAULT_THEME))
            .unwrap_or_default();
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme,
        }
    }

    /// Render Markdown to HTML. Raw HTML in the input is escaped, and every
    /// code block is highlighted and given a copy button.
    pub fn render(&self, markdown: &str) -> String {
        let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
        let parser = Parser::new_ext(markdown, options);

        let mut events: Vec<Event> = Vec::new();
        let mut code: Option<(String, String)> = None;

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .unwrap_or_default()
                            .to_string(),
                        CodeBlockKind::Indented => String::new(),
                    };
                    code = Some((lang, String::new()));
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some((lang, source)) = code.take() {
                        events.push(Event::Html(CowStr::from(self.code_block(&lang, &source))));
                    }
                }
                Event::Text(text) if code.is_some() => {
                    if let Some((_, source)) = code.as_mut() {
                        source.push_str(&text);
                    }
                }
                Event::Html(raw) | Event::InlineHtml(raw) => events.push(Event::Text(raw)),
                other => events.push(other),
            }
        }

        let mut out = String::with_capacity(markdown.len() * 2);
        html::push_html(&mut out, events.into_iter());
        out
    }

    fn syntax_for(&self, lang: &str, source: &str) -> &SyntaxReference {
        (!lang.is_empty())
            .then(|| self.syntax_set.find_syntax_by_token(lang))
            .flatten()
            .or_else(|| self.syntax_set.find_syntax_by_first_line(source))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text())
    }

    fn code_block(&self, lang: &str, source: &str) -> String {
        let syntax = self.syntax_for(lang, source);
        let highlighted = highlighted_html_for_string(source, &self.syntax_set, syntax, &self.theme)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, lang, "highlighting failed, rendering plain code");
                format!("<pre><code>{}</code></pre>\n", escape_html(source))
            });
        format!(
            "<div class=\"code-block\" data-lang=\"{}\"><button class=\"copy-btn\" data-code=\"{}\">Copy</button>{}</div>\n",
            escape_html(lang),
            escape_html(source),
            highlighted
        )
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

/// Live view of the assistant reply for one panel.
///
/// Each delta re-renders the whole assembled text, since a delta can close
/// a construct (a code fence, a table) that the previous render left open.
/// The copy buttons and highlighting are rebuilt on every pass.
pub struct MarkdownView {
    renderer: MarkdownRenderer,
    html: String,
    loading: bool,
    renders: usize,
    completed: Option<String>,
}

impl MarkdownView {
    pub fn new(renderer: MarkdownRenderer) -> Self {
        Self {
            renderer,
            html: String::new(),
            loading: false,
            renders: 0,
            completed: None,
        }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Number of full Markdown renders performed.
    pub fn render_count(&self) -> usize {
        self.renders
    }

    pub fn completed_text(&self) -> Option<&str> {
        self.completed.as_deref()
    }

    fn rerender(&mut self, text: &str) {
        self.html = self.renderer.render(text);
        self.renders += 1;
    }
}

impl TurnObserver for MarkdownView {
    fn on_loading(&mut self, loading: bool) {
        self.loading = loading;
        if loading {
            self.completed = None;
            self.html.clear();
        }
    }

    fn on_delta(&mut self, _delta: &str, assembled: &str) {
        self.rerender(assembled);
    }

    fn on_complete(&mut self, final_text: &str) {
        self.rerender(final_text);
        self.completed = Some(final_text.to_string());
    }
}

/// Render a whole conversation as HTML: user text escaped, assistant text
/// as Markdown, attached images as thumbnails. System messages are skipped.
pub fn render_transcript(renderer: &MarkdownRenderer, messages: &[Message]) -> String {
    let mut out = String::from("<div class=\"messages\">\n");
    for message in messages {
        let class = match message.role {
            Role::User => "user-message",
            Role::Assistant => "ai-message",
            Role::System => continue,
        };
        out.push_str(&format!("<div class=\"message {class}\">\n"));
        for url in message.images() {
            out.push_str(&format!(
                "<div class=\"image-container\"><img class=\"thumbnail\" src=\"{}\"></div>\n",
                escape_html(url)
            ));
        }
        let text = message.text();
        if !text.is_empty() {
            match message.role {
                Role::Assistant => out.push_str(&renderer.render(&text)),
                _ => out.push_str(&format!("<div class=\"text\">{}</div>\n", escape_html(&text))),
            }
        }
        out.push_str("</div>\n");
    }
    out.push_str("</div>\n");
    out
}
