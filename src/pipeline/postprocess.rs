//! Post-processing: deterministic cleanup of engine output.
//!
//! Both engines return text that needs the same tidying before it is written:
//! vision models wrap pages in ```` ```markdown ```` fences, invent
//! placeholder image links or emit broken tables, and the pdfium text layer
//! carries CRLF line endings, soft hyphens and words split across lines.
//!
//! Each rule is a pure `&str → String` function. [`MARKDOWN_RULES`] lists them
//! in application order; fences go before heading spacing so headings are
//! detected on clean input, and image links go before the final newline pass.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

type Rule = (&'static str, fn(&str) -> String);

/// Rules applied to every page, in order.
pub const MARKDOWN_RULES: &[Rule] = &[
    ("strip_outer_fences", strip_outer_fences),
    ("normalise_line_endings", normalise_line_endings),
    ("trim_trailing_whitespace", trim_trailing_whitespace),
    ("collapse_blank_lines", collapse_blank_lines),
    ("blank_line_before_headings", blank_line_before_headings),
    ("insert_table_separator", insert_table_separator),
    ("drop_body_separators", drop_body_separators),
    ("replace_placeholder_images", replace_placeholder_images),
    ("remove_invisible_chars", remove_invisible_chars),
    ("single_final_newline", single_final_newline),
];

/// Clean one page of VLM Markdown.
pub fn clean_markdown(input: &str) -> String {
    apply_rules(input, MARKDOWN_RULES)
}

/// Clean one page of text-layer output.
///
/// Line endings are normalised first so the hyphen join sees `\n` only.
pub fn clean_text_layer(input: &str) -> String {
    let joined = join_hyphenated_words(&normalise_line_endings(input));
    clean_markdown(&joined)
}

fn apply_rules(input: &str, rules: &[Rule]) -> String {
    rules.iter().fold(input.to_string(), |text, (name, rule)| {
        let next = rule(&text);
        if next != text {
            trace!("postprocess rule '{}' changed {} → {} bytes", name, text.len(), next.len());
        }
        next
    })
}

// ── Fences and whitespace ───────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\n(.*)\n```\s*$").unwrap());

fn strip_outer_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn trim_trailing_whitespace(input: &str) -> String {
    input.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_RUN.replace_all(input, "\n\n\n").into_owned()
}

fn single_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}

// ── Headings ────────────────────────────────────────────────────────────────

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,6} ").unwrap());

fn blank_line_before_headings(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 32);
    for (i, line) in input.lines().enumerate() {
        if i > 0 && RE_HEADING.is_match(line) {
            let kept = out.trim_end_matches('\n').len();
            out.truncate(kept);
            out.push_str("\n\n");
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

// ── Tables ──────────────────────────────────────────────────────────────────

fn is_table_row(line: &str) -> bool {
    let t = line.trim();
    t.len() > 2 && t.starts_with('|') && t.ends_with('|')
}

fn is_separator_row(line: &str) -> bool {
    let t = line.trim();
    t.starts_with('|') && t.contains('-') && t.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

/// A header row followed directly by a data row gets a `| --- |` row between them.
fn insert_table_separator(input: &str) -> String {
    let lines: Vec<&str> = input.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len() + 4);
    let mut previous_was_row = false;

    for (i, line) in lines.iter().enumerate() {
        out.push(line.to_string());
        let is_row = is_table_row(line);
        let starts_table = is_row && !previous_was_row && !is_separator_row(line);
        previous_was_row = is_row;
        if !starts_table {
            continue;
        }
        let next = lines.get(i + 1).copied().unwrap_or("");
        if is_table_row(next) && !is_separator_row(next) {
            let columns = line.trim().matches('|').count().saturating_sub(1).max(1);
            out.push(format!("|{}", " --- |".repeat(columns)));
        }
    }
    out.join("\n")
}

/// Separator rows are only valid as the second row of a table.
fn drop_body_separators(input: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut row_in_table = 0usize;
    for line in input.lines() {
        if is_table_row(line) {
            row_in_table += 1;
            if row_in_table != 2 && is_separator_row(line) {
                continue;
            }
        } else {
            row_in_table = 0;
        }
        out.push(line);
    }
    out.join("\n")
}

// ── Images and invisible characters ─────────────────────────────────────────

static RE_IMAGE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]*)\)").unwrap());

const PLACEHOLDER_HOSTS: &[&str] = &[
    "example.com",
    "placeholder.com",
    "dummyimage.com",
    "lorempixel.com",
    "picsum.photos",
    "placehold.it",
];

fn is_placeholder_url(url: &str) -> bool {
    let u = url.trim();
    let absolute = u.starts_with("http://") || u.starts_with("https://");
    !absolute || PLACEHOLDER_HOSTS.iter().any(|host| u.contains(host))
}

/// Models cannot see our extracted files, so any relative or made-up image
/// link they produce is replaced by its alt text in italics. Real
/// references are appended after conversion and never pass through here.
fn replace_placeholder_images(input: &str) -> String {
    RE_IMAGE_LINK
        .replace_all(input, |caps: &regex::Captures<'_>| {
            if !is_placeholder_url(&caps[2]) {
                return caps[0].to_string();
            }
            match caps[1].trim() {
                "" => String::new(),
                alt => format!("*{alt}*"),
            }
        })
        .into_owned()
}

const INVISIBLE: [char; 6] = ['\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}'];

fn remove_invisible_chars(input: &str) -> String {
    input.replace(INVISIBLE, "")
}

// ── Text layer ──────────────────────────────────────────────────────────────

static RE_LINE_BREAK_HYPHEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\p{Ll})-\n(\p{Ll})").unwrap());

/// `exam-\nple` → `example`. Only joins lowercase on both sides, so
/// compound names such as `Jean-\nPierre` stay split.
fn join_hyphenated_words(input: &str) -> String {
    RE_LINE_BREAK_HYPHEN.replace_all(input, "$1$2").into_owned()
}
