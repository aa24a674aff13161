//! Lesson Entity

use kernel::id::{CourseId, LessonFileId, LessonId};

use crate::domain::value_object::localized_text::LocalizedText;

/// Where a lesson's video lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonVideo {
    /// Video hosted on the media CDN; playback needs a signed token
    Cdn { video_id: String },
    /// Older lessons embed a plain URL
    Legacy { url: String },
    None,
}

impl LessonVideo {
    /// Build from the two nullable columns; the CDN id wins when both are set
    pub fn from_columns(video_id: Option<String>, video_url: Option<String>) -> Self {
        let non_empty = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
        match (non_empty(video_id), non_empty(video_url)) {
            (Some(video_id), _) => LessonVideo::Cdn { video_id },
            (None, Some(url)) => LessonVideo::Legacy { url },
            (None, None) => LessonVideo::None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LessonVideo::Cdn { .. } => "cdn",
            LessonVideo::Legacy { .. } => "legacy",
            LessonVideo::None => "none",
        }
    }
}

/// Downloadable attachment of a lesson
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonFile {
    pub file_id: LessonFileId,
    pub lesson_id: LessonId,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    /// Key inside the blob store
    pub storage_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lesson {
    pub lesson_id: LessonId,
    pub course_id: CourseId,
    pub title: LocalizedText,
    pub description: LocalizedText,
    pub video: LessonVideo,
    pub duration_secs: Option<i32>,
    /// Navigation order inside the course; gaps are allowed
    pub order: i32,
    pub files: Vec<LessonFile>,
}

impl Lesson {
    pub fn find_file(&self, file_id: &LessonFileId) -> Option<&LessonFile> {
        self.files.iter().find(|f| &f.file_id == file_id)
    }
}
