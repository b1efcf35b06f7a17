use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use comrak::nodes::NodeValue;
use comrak::plugins::syntect::SyntectAdapter;
use comrak::{Arena, ComrakOptions, ComrakPlugins, markdown_to_html_with_plugins, parse_document};
use once_cell::sync::Lazy;

/// How long a region reads as "copied" before the indicator reverts.
pub const COPY_FEEDBACK: Duration = Duration::from_secs(2);

static MARKDOWN_OPTIONS: Lazy<ComrakOptions> = Lazy::new(|| {
    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.footnotes = true;
    options.extension.strikethrough = true;
    options.extension.tasklist = true;
    options
});

pub fn markdown_to_html(md: &str) -> String {
    let adapter = SyntectAdapter::new(Some("base16-ocean.dark"));
    let mut plugins = ComrakPlugins::default();
    plugins.render.codefence_syntax_highlighter = Some(&adapter);
    markdown_to_html_with_plugins(md, &MARKDOWN_OPTIONS, &plugins)
}

/// A fenced code block found in assistant output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeRegion {
    pub language: Option<String>,
    pub code: String,
}

/// Walk the markdown AST and collect fenced code blocks, in document order.
/// Inline code and indented blocks are not actionable regions.
pub fn extract_code_regions(markdown: &str) -> Vec<CodeRegion> {
    let arena = Arena::new();
    let root = parse_document(&arena, markdown, &MARKDOWN_OPTIONS);

    let mut regions = Vec::new();
    for node in root.descendants() {
        let data = node.data.borrow();
        if let NodeValue::CodeBlock(ref block) = data.value {
            if !block.fenced {
                continue;
            }
            let language = block
                .info
                .split_whitespace()
                .next()
                .map(|tag| tag.to_string());
            regions.push(CodeRegion {
                language,
                code: block.literal.trim_end_matches('\n').to_string(),
            });
        }
    }
    regions
}

/// File extension for a fence's language tag. Common tags map to their
/// conventional extension, unknown tags pass through verbatim, and an
/// untagged fence falls back to `txt`.
pub fn extension_for(language: Option<&str>) -> String {
    let Some(tag) = language else {
        return "txt".to_string();
    };
    match tag.to_ascii_lowercase().as_str() {
        "python" => "py",
        "rust" => "rs",
        "javascript" => "js",
        "typescript" => "ts",
        "ruby" => "rb",
        "golang" => "go",
        "c++" | "cpp" => "cpp",
        "csharp" => "cs",
        "kotlin" => "kt",
        "bash" | "shell" | "zsh" => "sh",
        "yaml" => "yml",
        "markdown" => "md",
        "text" | "plaintext" => "txt",
        other => other,
    }
    .to_string()
}

pub fn download_filename(language: Option<&str>) -> String {
    format!("code-snippet.{}", extension_for(language))
}

/// Writes text to the system clipboard. Behind a trait so the renderer is
/// testable without a display surface.
pub trait ClipboardWriter: Send {
    fn write_text(&mut self, text: &str) -> Result<()>;
}

/// Saves a code region as a file the user can pick up.
pub trait FileDownloader: Send {
    fn save(&self, filename: &str, contents: &str) -> Result<PathBuf>;
}

pub struct SystemClipboard;

impl ClipboardWriter for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<()> {
        let mut clipboard = arboard::Clipboard::new().context("open system clipboard")?;
        clipboard
            .set_text(text.to_string())
            .context("write to clipboard")?;
        Ok(())
    }
}

/// Saves into the user's downloads directory, falling back to the current
/// directory when the platform has none.
pub struct DownloadsDir;

impl FileDownloader for DownloadsDir {
    fn save(&self, filename: &str, contents: &str) -> Result<PathBuf> {
        let dir = dirs::download_dir().unwrap_or_else(|| PathBuf::from("."));
        let path = dir.join(filename);
        std::fs::write(&path, contents)
            .with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}

/// Copy/download actions over the fenced regions of one assistant message.
/// Pure presentation: never touches the session.
pub struct CodeActions {
    regions: Vec<CodeRegion>,
    copied_at: Vec<Option<Instant>>,
    clipboard: Box<dyn ClipboardWriter>,
    downloader: Box<dyn FileDownloader>,
}

impl CodeActions {
    pub fn new(
        markdown: &str,
        clipboard: Box<dyn ClipboardWriter>,
        downloader: Box<dyn FileDownloader>,
    ) -> Self {
        let regions = extract_code_regions(markdown);
        let copied_at = vec![None; regions.len()];
        Self {
            regions,
            copied_at,
            clipboard,
            downloader,
        }
    }

    pub fn regions(&self) -> &[CodeRegion] {
        &self.regions
    }

    pub fn copy(&mut self, index: usize) -> Result<()> {
        let region = self
            .regions
            .get(index)
            .with_context(|| format!("no code region at index {index}"))?;
        self.clipboard.write_text(&region.code)?;
        self.copied_at[index] = Some(Instant::now());
        Ok(())
    }

    pub fn copied(&self, index: usize) -> bool {
        self.copied_as_of(index, Instant::now())
    }

    /// The copied indicator holds for `COPY_FEEDBACK`, then reverts on its
    /// own; no timer fires, the state is derived from the recorded instant.
    pub fn copied_as_of(&self, index: usize, now: Instant) -> bool {
        matches!(
            self.copied_at.get(index),
            Some(Some(at)) if now.duration_since(*at) < COPY_FEEDBACK
        )
    }

    pub fn download(&self, index: usize) -> Result<PathBuf> {
        let region = self
            .regions
            .get(index)
            .with_context(|| format!("no code region at index {index}"))?;
        self.downloader
            .save(&download_filename(region.language.as_deref()), &region.code)
    }
}
