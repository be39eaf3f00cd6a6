use std::fmt;
use std::path::Path;

/// Maximum length of the filename stem in characters (extension excluded)
pub const MAX_STEM_CHARS: usize = 100;

/// Filename used when sanitization leaves nothing usable
const FALLBACK_NAME: &str = "file";

/// A client-supplied filename made safe for URL path segments and HTTP headers.
///
/// Path components are stripped, control characters and shell/header
/// metacharacters are mapped to `_`, the stem is capped at [`MAX_STEM_CHARS`]
/// characters and the original extension is preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedName(String);

impl SanitizedName {
    pub fn new(filename: &str) -> Self {
        // Keep only the filename component, drop any path
        let name = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("");

        if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
            tracing::warn!("Path components in client filename: {}", filename);
        }

        let cleaned: String = name
            .chars()
            .map(|c| {
                if c.is_control()
                    || c == '/'
                    || c == '\\'
                    || c == ':'
                    || c == '*'
                    || c == '?'
                    || c == '"'
                    || c == '\''
                    || c == '`'
                    || c == '<'
                    || c == '>'
                    || c == '|'
                    || c == ';'
                {
                    '_'
                } else {
                    c
                }
            })
            .collect();
        let cleaned = cleaned.trim();

        let (stem, extension) = match Path::new(cleaned).extension().and_then(|e| e.to_str()) {
            Some(ext) if !ext.is_empty() => {
                let stem_len = cleaned.len() - ext.len() - 1;
                (&cleaned[..stem_len], Some(ext))
            }
            _ => (cleaned, None),
        };

        let mut capped: String = stem.trim().chars().take(MAX_STEM_CHARS).collect();
        if capped.is_empty() {
            capped = FALLBACK_NAME.to_string();
        }

        match extension {
            Some(ext) => Self(format!("{}.{}", capped, ext)),
            None => Self(capped),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SanitizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SanitizedName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
