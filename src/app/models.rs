//! Data models for Manga Fetcher
//!
//! This module defines the core data structures used throughout the application:
//! the series being downloaded, one job per requested chapter, and the pages a
//! chapter job writes. It also hosts the name and chapter-number normalization
//! that every URL template depends on.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::files;
use crate::errors::{FormatError, FormatResult};

/// Switches controlling how a raw series name becomes a title
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameOptions {
    /// Upper-case the whole name instead of title-casing it
    pub uppercase: bool,
    /// Use the name exactly as typed
    pub edit_mode: bool,
}

/// Normalize a raw series name into its display title
///
/// In edit mode the name is returned unmodified. Otherwise it is upper-cased when
/// `uppercase` is set, and title-cased in every other case.
pub fn normalize_title(raw: &str, options: &NameOptions) -> String {
    if options.edit_mode {
        raw.to_string()
    } else if options.uppercase {
        raw.to_uppercase()
    } else {
        title_case(raw)
    }
}

/// Title-case a string: the first letter of every alphabetic run is upper-cased,
/// the rest of the run lower-cased. Any non-letter starts a new run.
pub fn title_case(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut previous_is_letter = false;

    for c in input.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                output.extend(c.to_lowercase());
            } else {
                output.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            output.push(c);
            previous_is_letter = false;
        }
    }

    output
}

/// Collapse every run of whitespace into a single hyphen
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut in_whitespace = false;

    for c in title.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                slug.push('-');
            }
            in_whitespace = true;
        } else {
            slug.push(c);
            in_whitespace = false;
        }
    }

    slug
}

/// Format a chapter number into its zero-padded code
///
/// The integer part is padded to four digits; a decimal part, if present, is
/// re-appended after the dot exactly as given. `"7"` becomes `"0007"`, `"7.5"`
/// becomes `"0007.5"`, and already formatted codes are returned unchanged.
///
/// # Errors
///
/// Returns `FormatError::InvalidChapterNumber` if the integer part is not a
/// non-negative integer literal, or if the input has more than one dot.
pub fn format_chapter_number(chapter_number: &str) -> FormatResult<String> {
    let input = chapter_number.trim();
    let invalid = || FormatError::InvalidChapterNumber {
        input: chapter_number.to_string(),
    };

    let (integer_part, decimal_part) = match input.split_once('.') {
        Some((integer, decimal)) => {
            if decimal.contains('.') {
                return Err(invalid());
            }
            (integer, Some(decimal))
        }
        None => (input, None),
    };

    if integer_part.is_empty() || !integer_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let integer: u64 = integer_part.parse().map_err(|_| invalid())?;

    let width = files::CHAPTER_CODE_WIDTH;
    Ok(match decimal_part {
        Some(decimal) => format!("{integer:0width$}.{decimal}"),
        None => format!("{integer:0width$}"),
    })
}

/// Expand a chapter list such as `"3-5,7,10.5"` into individual chapter numbers
///
/// Parts are comma-separated and trimmed; empty parts are ignored. `a-b` expands
/// an inclusive integer range. Single entries may carry a decimal sub-chapter.
///
/// # Errors
///
/// Returns `FormatError::InvalidChapterRange` for any part that is neither a
/// chapter number nor a well-formed ascending integer range.
pub fn parse_chapter_list(input: &str) -> FormatResult<Vec<String>> {
    let mut chapters = Vec::new();

    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let invalid = |reason: &str| FormatError::InvalidChapterRange {
            input: part.to_string(),
            reason: reason.to_string(),
        };

        if let Some((start, end)) = part.split_once('-') {
            let start: u32 = start
                .trim()
                .parse()
                .map_err(|_| invalid("range start is not an integer"))?;
            let end: u32 = end
                .trim()
                .parse()
                .map_err(|_| invalid("range end is not an integer"))?;
            if start > end {
                return Err(invalid("range start is greater than range end"));
            }
            chapters.extend((start..=end).map(|n| n.to_string()));
        } else {
            format_chapter_number(part).map_err(|_| invalid("not a chapter number"))?;
            chapters.push(part.to_string());
        }
    }

    Ok(chapters)
}

/// A manga series selected for one run
///
/// Created once from user input and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MangaSeries {
    /// Name as entered by the user (trimmed)
    pub raw_name: String,
    /// Normalized display title, also the history record
    pub title: String,
    /// URL-safe slug used in every endpoint
    pub slug: String,
    /// Library root the series folder lives under
    pub root: PathBuf,
}

impl MangaSeries {
    /// Create a series from a raw name
    ///
    /// # Errors
    ///
    /// Returns `FormatError::EmptySeriesName` if the name is blank
    pub fn new(raw_name: &str, options: &NameOptions, root: impl Into<PathBuf>) -> FormatResult<Self> {
        let raw_name = raw_name.trim();
        if raw_name.is_empty() {
            return Err(FormatError::EmptySeriesName);
        }

        let title = normalize_title(raw_name, options);
        let slug = slugify(&title);

        Ok(Self {
            raw_name: raw_name.to_string(),
            title,
            slug,
            root: root.into(),
        })
    }

    /// Folder holding every chapter of this series: `<root>/<slug>`
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.slug)
    }

    /// Folder of one chapter: `<root>/<slug>/Chapter-<code>`
    pub fn chapter_dir(&self, chapter_code: &str) -> PathBuf {
        self.output_dir()
            .join(format!("{}{}", files::CHAPTER_FOLDER_PREFIX, chapter_code))
    }
}

impl fmt::Display for MangaSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.slug)
    }
}

/// Lifecycle of a chapter job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Created, not yet started
    Pending,
    /// Looking up the chapter's resource path
    Resolving,
    /// Walking the chapter's pages
    Downloading,
    /// At least one page was saved
    Succeeded,
    /// Nothing was saved
    Failed,
    /// Not run: repeats an earlier chapter of the same request
    Skipped,
}

impl JobStatus {
    /// Whether the job has finished
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Skipped
        )
    }

    /// Whether moving from this status to `next` follows the job lifecycle
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Resolving)
                | (Pending, Failed)
                | (Pending, Skipped)
                | (Resolving, Downloading)
                | (Resolving, Failed)
                | (Downloading, Succeeded)
                | (Downloading, Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::Pending => "pending",
            JobStatus::Resolving => "resolving",
            JobStatus::Downloading => "downloading",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Skipped => "skipped",
        };
        f.write_str(name)
    }
}

/// One requested chapter within a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterJob {
    /// Chapter number as requested
    pub number: String,
    /// Zero-padded chapter code
    pub code: String,
    status: JobStatus,
}

impl ChapterJob {
    /// Create a pending job for a chapter number
    ///
    /// # Errors
    ///
    /// Returns `FormatError` if the chapter number is malformed
    pub fn new(number: &str) -> FormatResult<Self> {
        Ok(Self {
            number: number.to_string(),
            code: format_chapter_number(number)?,
            status: JobStatus::Pending,
        })
    }

    /// Current status
    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Move the job to `next`, ignoring transitions the lifecycle does not allow
    pub fn advance(&mut self, next: JobStatus) -> bool {
        if self.status.can_transition_to(next) {
            self.status = next;
            true
        } else {
            tracing::warn!(
                "Ignoring invalid status transition for chapter {}: {} -> {}",
                self.code,
                self.status,
                next
            );
            false
        }
    }
}

/// A single page of a chapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageAsset {
    /// 1-based page index
    pub index: u32,
    /// Target file: `<chapter-folder>/<index:03>.png`
    pub path: PathBuf,
    /// Whether the page ended up on disk
    pub saved: bool,
}

impl PageAsset {
    /// Describe page `index` of the chapter stored in `chapter_dir`
    pub fn new(chapter_dir: &Path, index: u32) -> Self {
        Self {
            index,
            path: chapter_dir.join(page_file_name(index)),
            saved: false,
        }
    }
}

/// File name of a page: zero-padded index plus extension
pub fn page_file_name(index: u32) -> String {
    format!(
        "{:0width$}.{}",
        index,
        files::PAGE_EXTENSION,
        width = files::PAGE_INDEX_WIDTH
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chapter_number_formatting() {
        assert_eq!(format_chapter_number("7").unwrap(), "0007");
        assert_eq!(format_chapter_number("7.5").unwrap(), "0007.5");
        assert_eq!(format_chapter_number("0012").unwrap(), "0012");
        assert_eq!(format_chapter_number("1084").unwrap(), "1084");
        assert_eq!(format_chapter_number("12345").unwrap(), "12345");
        assert_eq!(format_chapter_number("3.05").unwrap(), "0003.05");
    }

    #[test]
    fn test_chapter_number_formatting_is_idempotent() {
        for input in ["7", "7.5", "0012", "100.1"] {
            let once = format_chapter_number(input).unwrap();
            assert_eq!(format_chapter_number(&once).unwrap(), once);
        }
    }

    #[test]
    fn test_invalid_chapter_numbers() {
        for input in ["", "abc", "-3", "x7", ".5", "1.2.3", "+4", "7a"] {
            let result = format_chapter_number(input);
            assert!(
                matches!(result, Err(FormatError::InvalidChapterNumber { .. })),
                "expected failure for {input:?}"
            );
        }
    }

    #[test]
    fn test_title_normalization() {
        let default = NameOptions::default();
        assert_eq!(normalize_title("one piece", &default), "One Piece");
        assert_eq!(normalize_title("ONE PIECE", &default), "One Piece");
        assert_eq!(normalize_title("kaguya-sama", &default), "Kaguya-Sama");

        let upper = NameOptions {
            uppercase: true,
            edit_mode: false,
        };
        assert_eq!(normalize_title("one piece", &upper), "ONE PIECE");

        let edit = NameOptions {
            uppercase: true,
            edit_mode: true,
        };
        assert_eq!(normalize_title("Boku no Hero", &edit), "Boku no Hero");
    }

    #[test]
    fn test_slugify_collapses_whitespace() {
        assert_eq!(slugify("One Piece"), "One-Piece");
        assert_eq!(slugify("One   Piece\tFilm"), "One-Piece-Film");
        assert_eq!(slugify("Berserk"), "Berserk");
    }

    #[test]
    fn test_series_layout() {
        let series = MangaSeries::new("  one piece ", &NameOptions::default(), "/library").unwrap();
        assert_eq!(series.raw_name, "one piece");
        assert_eq!(series.title, "One Piece");
        assert_eq!(series.slug, "One-Piece");
        assert_eq!(series.output_dir(), PathBuf::from("/library/One-Piece"));
        assert_eq!(
            series.chapter_dir("0007.5"),
            PathBuf::from("/library/One-Piece/Chapter-0007.5")
        );
    }

    #[test]
    fn test_empty_series_name_rejected() {
        let result = MangaSeries::new("   ", &NameOptions::default(), "/library");
        assert_eq!(result.unwrap_err(), FormatError::EmptySeriesName);
    }

    #[test]
    fn test_chapter_list_parsing() {
        assert_eq!(
            parse_chapter_list("3-5,7").unwrap(),
            vec!["3", "4", "5", "7"]
        );
        assert_eq!(
            parse_chapter_list(" 1 , 10.5,, 2-2 ").unwrap(),
            vec!["1", "10.5", "2"]
        );
        assert!(parse_chapter_list("").unwrap().is_empty());
    }

    #[test]
    fn test_chapter_list_rejects_malformed_parts() {
        for input in ["5-3", "a-b", "1-", "seven", "1,2,x"] {
            assert!(
                matches!(
                    parse_chapter_list(input),
                    Err(FormatError::InvalidChapterRange { .. })
                ),
                "expected failure for {input:?}"
            );
        }
    }

    #[test]
    fn test_job_lifecycle() {
        let mut job = ChapterJob::new("7").unwrap();
        assert_eq!(job.code, "0007");
        assert_eq!(job.status(), JobStatus::Pending);

        assert!(job.advance(JobStatus::Resolving));
        assert!(!job.advance(JobStatus::Succeeded));
        assert_eq!(job.status(), JobStatus::Resolving);
        assert!(job.advance(JobStatus::Downloading));
        assert!(job.advance(JobStatus::Succeeded));
        assert!(job.status().is_terminal());
        assert!(!job.advance(JobStatus::Failed));
    }

    #[test]
    fn test_page_asset_path() {
        let page = PageAsset::new(Path::new("/lib/One-Piece/Chapter-0001"), 7);
        assert_eq!(page.path, PathBuf::from("/lib/One-Piece/Chapter-0001/007.png"));
        assert!(!page.saved);
        assert_eq!(page_file_name(120), "120.png");
    }
}
