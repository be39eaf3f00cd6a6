/// Video extensions served with a `video/<ext>` content type
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v", "3gp", "ts", "m2ts",
];

/// Audio extensions served with an `audio/<ext>` content type
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "aac", "ogg", "m4a", "wma"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
    Other,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Other => "other",
        }
    }

    /// Whether stream/player surfaces apply to this kind
    pub fn is_streamable(&self) -> bool {
        !matches!(self, MediaKind::Other)
    }
}

/// Classify a filename by its lowercased extension
pub fn classify(filename: &str) -> MediaKind {
    let Some(extension) = extension_of(filename) else {
        return MediaKind::Other;
    };

    if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        MediaKind::Video
    } else if AUDIO_EXTENSIONS.contains(&extension.as_str()) {
        MediaKind::Audio
    } else {
        MediaKind::Other
    }
}

/// Content type used by the streaming surface for this filename
pub fn stream_content_type(filename: &str) -> String {
    let extension = extension_of(filename).unwrap_or_default();
    match classify(filename) {
        MediaKind::Video => format!("video/{}", extension),
        MediaKind::Audio => format!("audio/{}", extension),
        MediaKind::Other => mime::APPLICATION_OCTET_STREAM.to_string(),
    }
}

fn extension_of(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_extensions() {
        assert_eq!(classify("movie.mp4"), MediaKind::Video);
        assert_eq!(classify("movie.MKV"), MediaKind::Video);
        assert_eq!(classify(".mp4"), MediaKind::Video);
        assert_eq!(classify("clip.m2ts"), MediaKind::Video);
    }

    #[test]
    fn test_audio_extensions() {
        assert_eq!(classify("song.flac"), MediaKind::Audio);
        assert_eq!(classify("song.Mp3"), MediaKind::Audio);
    }

    #[test]
    fn test_everything_else_is_other() {
        assert_eq!(classify("report.pdf"), MediaKind::Other);
        assert_eq!(classify("archive.zip"), MediaKind::Other);
        assert_eq!(classify("no_extension"), MediaKind::Other);
        assert_eq!(classify("trailing."), MediaKind::Other);
    }

    #[test]
    fn test_stream_content_type() {
        assert_eq!(stream_content_type("movie.mp4"), "video/mp4");
        assert_eq!(stream_content_type("song.FLAC"), "audio/flac");
        assert_eq!(stream_content_type("report.pdf"), "application/octet-stream");
    }

    #[test]
    fn test_streamable_flag() {
        assert!(MediaKind::Video.is_streamable());
        assert!(MediaKind::Audio.is_streamable());
        assert!(!MediaKind::Other.is_streamable());
    }
}
