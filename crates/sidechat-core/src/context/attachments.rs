use base64::Engine;
use std::path::Path;

use crate::error::{Result, SidechatError};
use crate::llm::ContentPart;

/// An image carried inline as a `data:image/...;base64,...` URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAttachment {
    data_url: String,
}

impl ImageAttachment {
    pub fn from_bytes(mime: &str, bytes: &[u8]) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self {
            data_url: format!("data:{mime};base64,{encoded}"),
        }
    }

    /// Accept an existing data URL, e.g. one pasted from a clipboard.
    pub fn from_data_url(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| SidechatError::attachment("<data url>", "missing data: prefix"))?;
        let (mime, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| SidechatError::attachment("<data url>", "missing ;base64, delimiter"))?;
        if !mime.starts_with("image/") {
            return Err(SidechatError::attachment(
                "<data url>",
                format!("MIME type is not an image: {mime}"),
            ));
        }
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| SidechatError::attachment("<data url>", format!("invalid base64: {e}")))?;
        Ok(Self { data_url: url })
    }

    /// Read an image file no larger than `max_bytes`.
    pub fn from_path(path: &Path, max_bytes: u64) -> Result<Self> {
        let display = path.display().to_string();
        let mime = image_mime_for(path).ok_or_else(|| {
            SidechatError::attachment(&display, "unsupported image type")
        })?;
        let meta = std::fs::metadata(path)
            .map_err(|e| SidechatError::attachment(&display, e.to_string()))?;
        check_size(&display, meta.len(), max_bytes)?;
        let bytes = std::fs::read(path)
            .map_err(|e| SidechatError::attachment(&display, e.to_string()))?;
        Ok(Self::from_bytes(mime, &bytes))
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    pub fn mime(&self) -> &str {
        self.data_url
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(';'))
            .map(|(mime, _)| mime)
            .unwrap_or("image/png")
    }

    pub fn to_part(&self) -> ContentPart {
        ContentPart::image(self.data_url.clone())
    }
}

fn check_size(path: &str, len: u64, max_bytes: u64) -> Result<()> {
    if len > max_bytes {
        return Err(SidechatError::attachment(
            path,
            format!("file is {len} bytes, limit is {max_bytes}"),
        ));
    }
    Ok(())
}

fn image_mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

/// A workspace file whose contents are sent along with the next turn.
#[derive(Debug, Clone, PartialEq)]
pub struct FileAttachment {
    pub path: String,
    pub contents: String,
}

impl FileAttachment {
    pub fn new(path: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }

    /// Read `relative` under `root`, refusing paths that resolve outside
    /// `root`, files larger than `max_bytes` and files that are not UTF-8 text.
    pub fn read(root: &Path, relative: &str, max_bytes: u64) -> Result<Self> {
        let root = root
            .canonicalize()
            .map_err(|e| SidechatError::attachment(relative, e.to_string()))?;
        let full = root
            .join(relative)
            .canonicalize()
            .map_err(|e| SidechatError::attachment(relative, e.to_string()))?;
        if !full.starts_with(&root) {
            return Err(SidechatError::attachment(relative, "outside workspace"));
        }
        let meta = std::fs::metadata(&full)
            .map_err(|e| SidechatError::attachment(relative, e.to_string()))?;
        if !meta.is_file() {
            return Err(SidechatError::attachment(relative, "not a regular file"));
        }
        check_size(relative, meta.len(), max_bytes)?;
        let contents = std::fs::read_to_string(&full)
            .map_err(|e| SidechatError::attachment(relative, e.to_string()))?;
        Ok(Self::new(relative, contents))
    }

    fn language(&self) -> &str {
        Path::new(&self.path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
    }

    pub fn to_part(&self) -> ContentPart {
        let fence = if self.contents.contains("```") { "````" } else { "```" };
        let mut body = self.contents.clone();
        if !body.ends_with('\n') {
            body.push('\n');
        }
        ContentPart::text(format!(
            "File: {}\n{fence}{}\n{body}{fence}",
            self.path,
            self.language()
        ))
    }
}

/// Attachments collected for the next turn.
#[derive(Debug, Clone, Default)]
pub struct PendingAttachments {
    pub images: Vec<ImageAttachment>,
    pub files: Vec<FileAttachment>,
}

impl PendingAttachments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_image(&mut self, image: ImageAttachment) {
        self.images.push(image);
    }

    /// Add a file, replacing an earlier attachment of the same path.
    pub fn add_file(&mut self, file: FileAttachment) {
        self.files.retain(|f| f.path != file.path);
        self.files.push(file);
    }

    pub fn remove_file(&mut self, path: &str) -> bool {
        let before = self.files.len();
        self.files.retain(|f| f.path != path);
        self.files.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.images.len() + self.files.len()
    }

    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    pub fn clear(&mut self) {
        self.images.clear();
        self.files.clear();
    }
}
