//! crates/courseware_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs carry serde derives so the persistence adapters can store the
//! whole project list as one JSON document.

use chrono::{DateTime, Utc};
use serde::{de, ser::SerializeMap, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The storage key under which the full project list is persisted.
pub const PROJECTS_KEY: &str = "courseware_projects";

const DEFAULT_AUDIENCE: &str = "University Students";

//=========================================================================================
// Course Context
//=========================================================================================

/// Free-form course material accumulated per category.
///
/// Every field is always present; an empty string means "no material yet".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CourseContext {
    pub syllabus: String,
    pub ppt_materials: String,
    pub exam_history: String,
    pub course_name: String,
    pub target_audience: String,
}

impl Default for CourseContext {
    fn default() -> Self {
        Self {
            syllabus: String::new(),
            ppt_materials: String::new(),
            exam_history: String::new(),
            course_name: String::new(),
            target_audience: DEFAULT_AUDIENCE.to_string(),
        }
    }
}

impl CourseContext {
    /// True when there is enough source material to propose a course structure.
    pub fn has_materials(&self) -> bool {
        !self.syllabus.trim().is_empty() || !self.ppt_materials.trim().is_empty()
    }

    pub fn field(&self, field: ContextField) -> &str {
        match field {
            ContextField::Syllabus => &self.syllabus,
            ContextField::PptMaterials => &self.ppt_materials,
            ContextField::ExamHistory => &self.exam_history,
        }
    }

    pub fn field_mut(&mut self, field: ContextField) -> &mut String {
        match field {
            ContextField::Syllabus => &mut self.syllabus,
            ContextField::PptMaterials => &mut self.ppt_materials,
            ContextField::ExamHistory => &mut self.exam_history,
        }
    }
}

/// The context fields that accept uploaded files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextField {
    Syllabus,
    PptMaterials,
    ExamHistory,
}

impl FromStr for ContextField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "syllabus" => Ok(Self::Syllabus),
            "ppt_materials" | "ppt" => Ok(Self::PptMaterials),
            "exam_history" | "exam" => Ok(Self::ExamHistory),
            other => Err(format!("unknown context field '{}'", other)),
        }
    }
}

//=========================================================================================
// Content Types
//=========================================================================================

/// The closed set of courseware artifacts generated for every module.
///
/// Declaration order is the batch fill order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    LessonPlan,
    SlideOutline,
    Assessment,
    VisualAids,
    StudyGuide,
    DiscussionBoard,
}

impl ContentType {
    pub const ALL: [ContentType; 6] = [
        ContentType::LessonPlan,
        ContentType::SlideOutline,
        ContentType::Assessment,
        ContentType::VisualAids,
        ContentType::StudyGuide,
        ContentType::DiscussionBoard,
    ];

    pub const COUNT: usize = Self::ALL.len();

    fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::LessonPlan => "LESSON_PLAN",
            ContentType::SlideOutline => "SLIDE_OUTLINE",
            ContentType::Assessment => "ASSESSMENT",
            ContentType::VisualAids => "VISUAL_AIDS",
            ContentType::StudyGuide => "STUDY_GUIDE",
            ContentType::DiscussionBoard => "DISCUSSION_BOARD",
        }
    }

    /// The assessment slot holds a JSON quiz; every other slot holds markdown.
    pub fn is_structured(self) -> bool {
        matches!(self, ContentType::Assessment)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown content type '{}'", s))
    }
}

//=========================================================================================
// Module Content Table
//=========================================================================================

/// Generated text per content type, indexed by the closed `ContentType` set.
///
/// A slot holding an empty string is treated the same as an absent one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleContent {
    slots: [Option<String>; ContentType::COUNT],
}

impl ModuleContent {
    pub fn get(&self, content_type: ContentType) -> Option<&str> {
        self.slots[content_type.index()]
            .as_deref()
            .filter(|text| !text.is_empty())
    }

    pub fn set(&mut self, content_type: ContentType, text: impl Into<String>) {
        self.slots[content_type.index()] = Some(text.into());
    }

    pub fn clear(&mut self, content_type: ContentType) {
        self.slots[content_type.index()] = None;
    }

    pub fn is_filled(&self, content_type: ContentType) -> bool {
        self.get(content_type).is_some()
    }

    /// Content types without content, in fill order.
    pub fn missing(&self) -> impl Iterator<Item = ContentType> + '_ {
        ContentType::ALL
            .into_iter()
            .filter(move |t| !self.is_filled(*t))
    }

    pub fn filled_count(&self) -> usize {
        ContentType::COUNT - self.missing().count()
    }
}

impl Serialize for ModuleContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.filled_count()))?;
        for content_type in ContentType::ALL {
            if let Some(text) = self.get(content_type) {
                map.serialize_entry(content_type.as_str(), text)?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ModuleContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ContentVisitor;

        impl<'de> de::Visitor<'de> for ContentVisitor {
            type Value = ModuleContent;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from content type to text")
            }

            fn visit_map<A: de::MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut content = ModuleContent::default();
                while let Some((key, value)) = access.next_entry::<String, Option<String>>()? {
                    let content_type = key.parse::<ContentType>().map_err(de::Error::custom)?;
                    if let Some(text) = value {
                        content.set(content_type, text);
                    }
                }
                Ok(content)
            }
        }

        deserializer.deserialize_map(ContentVisitor)
    }
}

//=========================================================================================
// Modules and Projects
//=========================================================================================

/// One week's unit of courseware.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: Uuid,
    pub title: String,
    pub week: u32,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub content: ModuleContent,
}

impl Module {
    /// Builds an empty module from a proposed outline entry.
    pub fn from_outline(outline: ModuleOutline) -> Self {
        Self {
            id: Uuid::now_v7(),
            title: outline.title,
            week: outline.week,
            topics: outline.topics,
            content: ModuleContent::default(),
        }
    }
}

/// A proposed module returned by structure generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleOutline {
    pub title: String,
    pub week: u32,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// A named, persisted bundle of course context plus its modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub context: CourseContext,
    #[serde(default)]
    pub modules: Vec<Module>,
}

//=========================================================================================
// Assessment and Media
//=========================================================================================

/// A single multiple-choice question stored in the assessment slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: i64,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub topic: String,
}

/// An uploaded file handed to ingestion.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Counters published after every batch task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}
