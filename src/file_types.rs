//! Text sniffing and MIME type resolution.

use infer::MatcherType;
use log::debug;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Bytes peeked at the start of a file to decide whether it is text.
pub const SNIFF_LEN: u64 = 1024;

pub const TEXT_PLAIN: &str = "text/plain";
pub const OCTET_STREAM: &str = "application/octet-stream";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Returns true when `sample` looks like human readable text.
///
/// Empty samples, known binary signatures, invalid UTF-8 and control characters
/// other than `\n`, `\r` and `\t` all count as binary. A multi-byte sequence cut
/// off by the end of the sample is tolerated.
pub fn looks_like_text(sample: &[u8]) -> bool {
    if sample.is_empty() {
        return false;
    }

    if let Some(kind) = infer::get(sample) {
        if kind.matcher_type() != MatcherType::Text {
            return false;
        }
    }

    let sample = sample.strip_prefix(UTF8_BOM).unwrap_or(sample);
    let text = match std::str::from_utf8(sample) {
        Ok(text) => text,
        Err(e) if e.error_len().is_none() => {
            // Truncated at the sniff boundary; the valid prefix decides.
            match std::str::from_utf8(&sample[..e.valid_up_to()]) {
                Ok(text) => text,
                Err(_) => return false,
            }
        }
        Err(_) => return false,
    };

    !text
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
}

/// Peeks the first [`SNIFF_LEN`] bytes of an open file and rewinds it.
pub fn is_text_file<R: Read + Seek>(file: &mut R) -> io::Result<bool> {
    let mut sample = Vec::with_capacity(SNIFF_LEN as usize);
    file.seek(SeekFrom::Start(0))?;
    file.by_ref().take(SNIFF_LEN).read_to_end(&mut sample)?;
    file.seek(SeekFrom::Start(0))?;
    Ok(looks_like_text(&sample))
}

/// Maps a file to a MIME type name.
pub trait MimeResolver: Send + Sync {
    fn resolve(&self, path: &Path) -> String;
}

/// Resolves by magic bytes first, then by extension, then by a text sniff.
pub struct InferMimeResolver {
    by_extension: HashMap<&'static str, &'static str>,
}

impl InferMimeResolver {
    pub fn new() -> Self {
        let by_extension = [
            ("txt", TEXT_PLAIN),
            ("log", TEXT_PLAIN),
            ("md", "text/markdown"),
            ("csv", "text/csv"),
            ("tsv", "text/tab-separated-values"),
            ("html", "text/html"),
            ("htm", "text/html"),
            ("css", "text/css"),
            ("js", "text/javascript"),
            ("json", "application/json"),
            ("xml", "application/xml"),
            ("yaml", "application/yaml"),
            ("yml", "application/yaml"),
            ("toml", "application/toml"),
            ("ini", TEXT_PLAIN),
            ("conf", TEXT_PLAIN),
            ("rs", "text/x-rust"),
            ("py", "text/x-python"),
            ("c", "text/x-csrc"),
            ("h", "text/x-chdr"),
            ("cpp", "text/x-c++src"),
            ("hpp", "text/x-c++hdr"),
            ("java", "text/x-java"),
            ("go", "text/x-go"),
            ("sh", "application/x-shellscript"),
            ("sql", "application/sql"),
        ]
        .into_iter()
        .collect();

        Self { by_extension }
    }

    fn from_extension(&self, path: &Path) -> Option<&'static str> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.by_extension.get(ext.as_str()).copied()
    }
}

impl Default for InferMimeResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MimeResolver for InferMimeResolver {
    fn resolve(&self, path: &Path) -> String {
        match infer::get_from_path(path) {
            Ok(Some(kind)) => return kind.mime_type().to_string(),
            Ok(None) => {}
            Err(e) => {
                debug!("Cannot sniff {}: {}", path.display(), e);
                return OCTET_STREAM.to_string();
            }
        }

        if let Some(mime) = self.from_extension(path) {
            return mime.to_string();
        }

        let text = File::open(path)
            .and_then(|mut file| is_text_file(&mut file))
            .unwrap_or(false);
        let mime = if text { TEXT_PLAIN } else { OCTET_STREAM };
        mime.to_string()
    }
}
