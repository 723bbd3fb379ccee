//! crates/courseware_core/src/context_files.rs
//!
//! Uploaded files live inside the context text fields as marked blocks:
//! `\n\n--- FILE: <name> ---\n<text>`. These helpers append, list and remove them.

use regex::Regex;
use std::sync::OnceLock;

const FILE_MARKER_PREFIX: &str = "\n\n--- FILE: ";
const ERROR_MARKER_PREFIX: &str = "\n\n--- FILE ERROR: ";
const MARKER_SUFFIX: &str = " ---\n";
// Start of any following block, successful or failed.
const NEXT_MARKER: &str = "\n\n--- FILE";

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"--- FILE: (.*?) ---").expect("static marker pattern"))
}

/// Appends an extracted file under its marker.
pub fn append_file(field: &mut String, name: &str, text: &str) {
    field.push_str(FILE_MARKER_PREFIX);
    field.push_str(name);
    field.push_str(MARKER_SUFFIX);
    field.push_str(text);
}

/// Records a file that could not be extracted, in place of its content.
pub fn append_file_error(field: &mut String, name: &str, note: &str) {
    field.push_str(ERROR_MARKER_PREFIX);
    field.push_str(name);
    field.push_str(MARKER_SUFFIX);
    field.push_str(note);
}

/// Names of the successfully ingested files, in upload order.
pub fn list_files(field: &str) -> Vec<String> {
    marker_regex()
        .captures_iter(field)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Removes every block marked with `name`, each running up to the next file
/// marker or the end of the text, and trims the remainder.
pub fn remove_file(field: &str, name: &str) -> String {
    let pattern = format!(
        r"(?:^|\n\n)--- FILE: {} ---[\s\S]*?(?:\n\n--- FILE|$)",
        regex::escape(name)
    );
    let Ok(block) = Regex::new(&pattern) else {
        return field.trim().to_string();
    };

    let mut current = field.to_string();
    loop {
        let next = remove_blocks(&block, &current);
        if next == current {
            return next.trim().to_string();
        }
        current = next;
    }
}

// The regex crate has no lookahead, so a consumed trailing marker is put back.
// Adjacent blocks for the same name need another pass for the same reason.
fn remove_blocks(block: &Regex, field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut last = 0;
    for m in block.find_iter(field) {
        out.push_str(&field[last..m.start()]);
        if m.as_str().ends_with(NEXT_MARKER) {
            out.push_str(NEXT_MARKER);
        }
        last = m.end();
    }
    out.push_str(&field[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_files_in_upload_order() {
        let mut field = String::new();
        append_file(&mut field, "syllabus.docx", "Week 1: kinematics");
        append_file_error(&mut field, "locked.pdf", "could not be parsed");
        append_file(&mut field, "notes.txt", "Newton's laws");

        assert_eq!(list_files(&field), vec!["syllabus.docx", "notes.txt"]);
    }

    #[test]
    fn removing_the_only_block_leaves_an_empty_field() {
        let mut field = String::new();
        append_file(&mut field, "report.pdf", "quarterly numbers");

        assert_eq!(remove_file(&field, "report.pdf"), "");
    }

    #[test]
    fn removing_a_block_keeps_the_others_trimmed() {
        let mut field = String::new();
        append_file(&mut field, "intro.txt", "welcome");
        append_file(&mut field, "report.pdf", "quarterly numbers");
        append_file(&mut field, "outro.txt", "goodbye");

        let remaining = remove_file(&field, "report.pdf");

        assert_eq!(
            remaining,
            "--- FILE: intro.txt ---\nwelcome\n\n--- FILE: outro.txt ---\ngoodbye"
        );
        assert_eq!(list_files(&remaining), vec!["intro.txt", "outro.txt"]);
    }

    #[test]
    fn removing_the_last_block_leaves_no_separator() {
        let mut field = String::new();
        append_file(&mut field, "intro.txt", "welcome");
        append_file(&mut field, "report.pdf", "quarterly\n\nnumbers");

        assert_eq!(remove_file(&field, "report.pdf"), "--- FILE: intro.txt ---\nwelcome");
    }

    #[test]
    fn removes_a_leading_block_after_an_earlier_trim() {
        let field = "--- FILE: first.txt ---\none\n\n--- FILE: second.txt ---\ntwo";

        assert_eq!(remove_file(field, "first.txt"), "--- FILE: second.txt ---\ntwo");
    }

    #[test]
    fn removes_repeated_uploads_of_the_same_name() {
        let mut field = String::new();
        append_file(&mut field, "dup.txt", "v1");
        append_file(&mut field, "dup.txt", "v2");
        append_file(&mut field, "keep.txt", "stay");

        assert_eq!(remove_file(&field, "dup.txt"), "--- FILE: keep.txt ---\nstay");
    }

    #[test]
    fn keeps_a_following_error_block() {
        let mut field = String::new();
        append_file(&mut field, "report.pdf", "numbers");
        append_file_error(&mut field, "locked.pdf", "could not be parsed");

        assert_eq!(
            remove_file(&field, "report.pdf"),
            "--- FILE ERROR: locked.pdf ---\ncould not be parsed"
        );
    }

    #[test]
    fn file_names_are_matched_literally() {
        let mut field = String::new();
        append_file(&mut field, "a+b (v2).txt", "one");
        append_file(&mut field, "aab (v2).txt", "two");

        assert_eq!(remove_file(&field, "a+b (v2).txt"), "--- FILE: aab (v2).txt ---\ntwo");
    }
}
