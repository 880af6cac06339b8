//! Filename generation.

use crate::config::VideoQuality;
use crate::download::Format;

/// Longest file stem kept, in characters.
const MAX_STEM_CHARS: usize = 120;

/// Extension of downloaded videos.
pub const VIDEO_EXTENSION: &str = ".ts";

/// Turn a catalog title into a safe file or folder name.
///
/// Reserved and control characters become `_`, surrounding whitespace and
/// trailing dots are trimmed, and overly long names are shortened. Never fails:
/// an unusable title becomes `untitled`.
pub fn filenamify(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim().trim_end_matches('.').trim_end();
    let shortened: String = trimmed.chars().take(MAX_STEM_CHARS).collect();
    let shortened = shortened.trim_end().to_string();

    if shortened.is_empty() || shortened.chars().all(|c| c == '.' || c == '_') {
        return "untitled".to_string();
    }

    shortened
}

/// File name of a column item in the given format.
pub fn column_file_name(title: &str, format: Format) -> String {
    format!("{}{}", filenamify(title), format.extension())
}

/// File name of a video item at the given quality.
pub fn video_file_name(title: &str, quality: VideoQuality) -> String {
    format!("{}_{}{}", filenamify(title), quality.as_str(), VIDEO_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filenamify_replaces_reserved() {
        assert_eq!(filenamify("01 | What is Rust?"), "01 _ What is Rust_");
        assert_eq!(filenamify("a/b\\c"), "a_b_c");
        assert_eq!(filenamify("tab\there"), "tab_here");
    }

    #[test]
    fn test_filenamify_trims() {
        assert_eq!(filenamify("  spaced  "), "spaced");
        assert_eq!(filenamify("ends with dots..."), "ends with dots");
        assert_eq!(filenamify("开篇词 | 为什么学习"), "开篇词 _ 为什么学习");
    }

    #[test]
    fn test_filenamify_never_empty() {
        assert_eq!(filenamify(""), "untitled");
        assert_eq!(filenamify(".."), "untitled");
        assert_eq!(filenamify("///"), "untitled");
    }

    #[test]
    fn test_filenamify_truncates_on_char_boundary() {
        let long = "课".repeat(300);
        assert_eq!(filenamify(&long).chars().count(), MAX_STEM_CHARS);
    }

    #[test]
    fn test_output_file_names() {
        assert_eq!(column_file_name("Intro", Format::Document), "Intro.pdf");
        assert_eq!(column_file_name("Intro", Format::Text), "Intro.md");
        assert_eq!(column_file_name("Intro", Format::Audio), "Intro.mp3");
        assert_eq!(video_file_name("Lesson 1", VideoQuality::Hd), "Lesson 1_hd.ts");
    }
}
