//! Code fences and code-cell language detection.

use nbjekyll_notebook::NotebookMetadata;
use regex::Regex;
use std::sync::LazyLock;

/// Info string of fenced blocks holding plain-text output
pub const OUTPUT_INFO: &str = "output";

/// Info string of fenced blocks holding execution errors
pub const ERROR_INFO: &str = "error";

// Cell magic on the first line, e.g. `%%bash` or `%%sql --connection x`
static RE_CELL_MAGIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^%%([A-Za-z][\w+-]*)").expect("valid cell magic regex"));

/// Cell magics that switch a cell to another language, with the highlighter
/// name used for the fence
const MAGIC_LANGUAGES: &[(&str, &str)] = &[
    ("R", "r"),
    ("bash", "bash"),
    ("cython", "cython"),
    ("html", "html"),
    ("javascript", "javascript"),
    ("js", "javascript"),
    ("julia", "julia"),
    ("latex", "latex"),
    ("octave", "octave"),
    ("perl", "perl"),
    ("python", "python"),
    ("python3", "python"),
    ("ruby", "ruby"),
    ("sh", "sh"),
    ("shell", "sh"),
    ("sql", "sql"),
];

/// Language of the notebook's code cells
///
/// Taken from the notebook metadata (lower-cased, so `Java` becomes `java`),
/// else from the configured default. `None` yields untagged fences.
#[must_use]
pub fn notebook_language(
    metadata: &NotebookMetadata,
    default_language: Option<&str>,
) -> Option<String> {
    metadata
        .language_name
        .as_deref()
        .or(default_language)
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_lowercase)
}

/// Language of one code cell: a known cell magic wins over the notebook
/// language. Unknown magics such as `%%time` do not change the language.
#[must_use]
pub fn cell_language<'a>(source: &str, notebook_language: Option<&'a str>) -> Option<&'a str> {
    let magic_language: Option<&'a str> = RE_CELL_MAGIC
        .captures(source.trim_start())
        .and_then(|caps| caps.get(1))
        .and_then(|name| {
            MAGIC_LANGUAGES
                .iter()
                .find(|(magic, _)| *magic == name.as_str())
                .map(|(_, language)| *language)
        });

    magic_language.or(notebook_language)
}

/// Wrap `content` in a fenced code block with the given info string
///
/// The fence is made longer than any backtick run inside the content, so
/// output that itself contains fences cannot close the block early.
#[must_use]
pub fn fenced(info: &str, content: &str) -> String {
    let longest_run = content
        .split(|c: char| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_run.max(2) + 1);
    let body = content.strip_suffix('\n').unwrap_or(content);
    format!("{fence}{info}\n{body}\n{fence}")
}
