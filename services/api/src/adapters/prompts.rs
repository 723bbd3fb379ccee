//! services/api/src/adapters/prompts.rs
//!
//! Prompt text for the generation adapter.

use courseware_core::{ContentType, CourseContext, Module};

const SYLLABUS_EXCERPT_CHARS: usize = 8000;
const MATERIALS_EXCERPT_CHARS: usize = 4000;
const EXAM_EXCERPT_CHARS: usize = 2000;
const ASSISTANT_SYLLABUS_CHARS: usize = 1000;

pub const SYSTEM_INSTRUCTION: &str = "\
You are a senior tenured professor at a leading university. You turn complex academic \
concepts into courseware that is easy to follow, rigorous and thought-provoking.

Teaching rules:
1. Adapt tone, terminology and worked examples to the course name and syllabus you are given.
2. Strict content separation. The ASSESSMENT section is the only place where questions, \
quizzes or exercises may appear. Every other section (lesson plan, slides, study guide and \
so on) is pure explanation, case analysis and derivation. Never write prompts such as \
\"answer the following\", \"think about\" or \"exercise\" outside the assessment.
3. Visual learning. Insert 3-5 image placeholders into every explanation, formatted exactly \
as ![short visual caption](ai-generated:detailed English visual prompt). The prompt \
describes the scene, materials, lighting and a professional photographic style.
4. Key academic terms carry their English name in parentheses when you write in another \
language.";

/// Section-specific guidance appended to the generation prompt.
fn section_brief(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::LessonPlan => {
            "A complete lesson plan: learning objectives, a timed agenda for a two-hour session, \
             the core explanations in teaching order and the worked examples to use."
        }
        ContentType::SlideOutline => {
            "A slide-by-slide outline. Each slide has a title, its key points and speaker notes."
        }
        ContentType::VisualAids => {
            "A set of visual aids: diagrams, process charts and illustrations, each with a caption \
             and an explanation of what it shows and why it matters."
        }
        ContentType::StudyGuide => {
            "A study guide for students: a concept map of the week, definitions of the key terms, \
             summaries of each topic and the common misconceptions."
        }
        ContentType::DiscussionBoard => {
            "Discussion board material: background readings summarised, contrasting viewpoints \
             and the real-world cases that frame the week's debate, written as exposition."
        }
        // Assessment is requested as JSON; see `quiz_prompt`.
        ContentType::Assessment => "",
    }
}

fn course_name(context: &CourseContext) -> &str {
    if context.course_name.trim().is_empty() {
        "Untitled Course"
    } else {
        &context.course_name
    }
}

/// Truncates on a char boundary.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn material_block(context: &CourseContext) -> String {
    let mut block = String::new();
    if !context.syllabus.trim().is_empty() {
        block.push_str("\n\nSyllabus:\n");
        block.push_str(excerpt(&context.syllabus, MATERIALS_EXCERPT_CHARS));
    }
    if !context.ppt_materials.trim().is_empty() {
        block.push_str("\n\nSlide materials:\n");
        block.push_str(excerpt(&context.ppt_materials, MATERIALS_EXCERPT_CHARS));
    }
    block
}

pub fn section_prompt(content_type: ContentType, module: &Module, context: &CourseContext) -> String {
    format!(
        "Write the {section} section for week {week} of the course \"{course}\", titled \"{title}\" \
         (topics: {topics}). The audience is {audience}.\n\n{brief}\n\n\
         Constraints:\n\
         1. No questions of any kind. This is pure explanation.\n\
         2. Insert 4-5 compact image tags of the form ![visual caption](ai-generated:English prompt).\n\
         3. Be thorough and substantial, enough to support a two-hour lecture.{materials}",
        section = content_type,
        week = module.week,
        course = course_name(context),
        title = module.title,
        topics = module.topics.join(", "),
        audience = context.target_audience,
        brief = section_brief(content_type),
        materials = material_block(context),
    )
}

pub fn quiz_prompt(module: &Module, context: &CourseContext) -> String {
    let mut prompt = format!(
        "For week {week} of the course \"{course}\", topic \"{title}\", write 10 demanding \
         single-choice questions that test understanding and application.\n\n\
         Respond with only a JSON array. Each element has the fields \"question\" (string), \
         \"options\" (array of strings), \"correctAnswer\" (zero-based index into options), \
         \"explanation\" (a detailed explanation that names the concept being tested) and \
         \"topic\" (the specific concept tested).",
        week = module.week,
        course = course_name(context),
        title = module.title,
    );
    if !context.exam_history.trim().is_empty() {
        prompt.push_str("\n\nMatch the style of these past exam questions:\n");
        prompt.push_str(excerpt(&context.exam_history, EXAM_EXCERPT_CHARS));
    }
    prompt
}

pub fn structure_prompt(context: &CourseContext) -> String {
    let source = if context.syllabus.trim().is_empty() {
        format!("Slide materials: {}", excerpt(&context.ppt_materials, SYLLABUS_EXCERPT_CHARS))
    } else {
        format!("Syllabus: {}", excerpt(&context.syllabus, SYLLABUS_EXCERPT_CHARS))
    };
    format!(
        "Divide the following course material into a weekly structure of 11-12 weeks (one quarter). \
         If the material is short, expand it according to the breadth of the subject.\n\n\
         Respond with only a JSON array. Each element has the fields \"title\" (string), \
         \"week\" (integer, starting at 1) and \"topics\" (array of strings).\n\n{}",
        source
    )
}

pub fn refine_prompt(existing: &str, feedback: &str) -> String {
    format!(
        "Revision request: {}.\n\nKeep key terms bilingual, never add questions to a section that \
         is not the assessment, and keep every ![caption](ai-generated:prompt) tag. \
         The current content is:\n\n{}",
        feedback, existing
    )
}

pub fn image_prompt(subject: &str) -> String {
    format!(
        "A professional, high-definition educational illustration. Subject: {}. \
         Style: documentary photography or professional 3D scientific visualisation, cinematic \
         lighting, realistic textures. Do not include any text, letters, captions or labels.",
        subject
    )
}

pub fn media_prompt(file_name: &str) -> String {
    format!(
        "You are a professor preparing a course. Analyse this material ({}) in depth.\n\
         1. Extract every academic point, formula, theorem and fact.\n\
         2. Turn it into a detailed written transcript rather than a short summary.\n\
         3. Explain the scientific or logical principles behind it.\n\
         4. Give key terms their English name in parentheses.\n\
         The result is the source corpus for generating courseware, so prefer detail over brevity.",
        file_name
    )
}

/// System instruction for the course assistant chat.
pub fn assistant_instruction(context: &CourseContext) -> String {
    format!(
        "{}\n\nYou are now chatting with the instructor of this course. Answer conversationally; \
         the teaching rules about sections and image tags apply only to courseware you are \
         asked to draft.\nCurrent course: {}. Known syllabus: {}",
        SYSTEM_INSTRUCTION,
        course_name(context),
        excerpt(&context.syllabus, ASSISTANT_SYLLABUS_CHARS),
    )
}
