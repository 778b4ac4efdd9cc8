//! Text normalization for scraped listing pages.
//!
//! Raw pages are shrunk by two ordered rule chains (filters, then rewrites),
//! optionally restructured into a `;`-delimited table, and cut to a
//! character budget on a line boundary.

use once_cell::sync::Lazy;
use regex_lite::{Captures, Regex};
use std::collections::BTreeSet;

use super::sources::ParsingMode;

/// Columns of the table produced for structured-markup sources.
pub const TABLE_COLUMNS: [&str; 8] = [
    "category",
    "filename",
    "date",
    "size",
    "magnet_link",
    "seeders",
    "leechers",
    "uploader",
];

/// Header line of the table produced for structured-markup sources.
pub const TABLE_HEADER: &str = "category;filename;date;size;magnet_link;seeders;leechers;uploader";

/// Name of the entity-decoding rewrite.
///
/// It runs ahead of the filters and again ahead of the other rewrites.
pub const HTML_ENTITIES: &str = "html_entities";

/// Name of the table restructuring stage, skippable like any rule.
pub const TABULATE: &str = "tabulate";

/// A named pattern/replacement pair.
#[derive(Debug)]
pub struct NormalizationRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub replacement: &'static str,
}

impl NormalizationRule {
    fn new(name: &'static str, pattern: &str, replacement: &'static str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap(),
            replacement,
        }
    }

    fn apply(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, self.replacement)
            .into_owned()
    }
}

/// Filters remove matched text entirely.
static FILTERS: Lazy<Vec<NormalizationRule>> = Lazy::new(|| {
    [
        ("list_preamble", r"(?s)\A.*?<li(?:\s[^>]*)?>"),
        ("list_items", r"<li(?:\s[^>]*)?>"),
        (
            "full_links",
            r"(http|https|ftp):/{1,2}[a-zA-Z0-9.]+[a-zA-Z0-9./?=+~_\-@:%#&]*",
        ),
        ("backslashes", r"\\"),
        (
            "local_links",
            r#"(a href=)*(<|")/[a-zA-Z0-9./?=+~()_\-@:%#&]*(>|")* *"#,
        ),
        ("some_texts", r#" *"[a-zA-Z ]+" *"#),
        ("empty_angle_brackets", r" *< *> *"),
        ("empty_curly_brackets", r" *\{ *\} *"),
        ("empty_parenthesis", r" *\( *\) *"),
        ("empty_brackets", r" *\[ *\] *"),
        ("tags", r"(>?<(img|a) ((alt|src)=)+)|(<a href=)"),
        ("date", r#"<label title=("[a-zA-Z0-9()+: ]+"|>)"#),
        (
            "markup_tags",
            r"</?(?:a|abbr|b|br|button|div|em|font|h[1-6]|i|img|input|label|ol|p|small|strong|table|tbody|td|th|thead|time|tr|ul)(?:\s[^<>:]*)?/?>",
        ),
        ("horizontal_rules", r"(?m)^[ \t]*[-=_*]{3,}[ \t]*$"),
    ]
    .into_iter()
    .map(|(name, pattern)| NormalizationRule::new(name, pattern, ""))
    .collect()
});

/// Rewrites substitute matched text.
static REWRITES: Lazy<Vec<NormalizationRule>> = Lazy::new(|| {
    [
        ("binary_units", r"(\d)\s*([KMGTP])iB", "$1 ${2}B"),
        ("spans", r"</?span(?:\s[^>]*)?>", " | "),
        ("weird_spaced_bars", r" *\|[ |]+", " | "),
        ("double_quotes", r#""[" ]+"#, ""),
        ("single_angle_bracket", r"<|>", ""),
        ("trailing_spaces", r"(?m)[ \t]+$", ""),
    ]
    .into_iter()
    .map(|(name, pattern, replacement)| NormalizationRule::new(name, pattern, replacement))
    .collect()
});

static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(nbsp|quot|#0?39|lt|gt|amp);").unwrap());
static MAGNET: Lazy<Regex> = Lazy::new(|| Regex::new(r#"magnet:\?[^\s"'<>|;]+"#).unwrap());
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").unwrap());

/// Filter rule names in application order.
pub fn filter_names() -> Vec<&'static str> {
    FILTERS.iter().map(|r| r.name).collect()
}

/// Rewrite rule names in application order, ending with the table stage.
pub fn rewrite_names() -> Vec<&'static str> {
    let mut names = vec![HTML_ENTITIES];
    names.extend(REWRITES.iter().map(|r| r.name));
    names.push(TABULATE);
    names
}

/// Decode entities until none are left, so `&amp;amp;` ends as `&`.
fn decode_entities(text: &str) -> String {
    let mut text = text.to_string();
    while ENTITY.is_match(&text) {
        text = ENTITY
            .replace_all(&text, |caps: &Captures| match &caps[1] {
                "nbsp" => " ",
                "quot" => "\"",
                "lt" => "<",
                "gt" => ">",
                "amp" => "&",
                _ => "'",
            })
            .into_owned();
    }
    text
}

/// Shrinks raw page text to a bounded, extraction-friendly form.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    max_chars: usize,
}

impl Normalizer {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn normalize(&self, raw: &str, excluded: &BTreeSet<String>, mode: ParsingMode) -> String {
        let decode = !excluded.contains(HTML_ENTITIES);
        let mut text = raw.replace("\r\n", "\n");

        if decode {
            text = decode_entities(&text);
        }
        for rule in FILTERS.iter() {
            if !excluded.contains(rule.name) {
                text = rule.apply(&text);
            }
        }
        if decode {
            text = decode_entities(&text);
        }
        for rule in REWRITES.iter() {
            if !excluded.contains(rule.name) {
                text = rule.apply(&text);
            }
        }

        if mode == ParsingMode::StructuredMarkup && !excluded.contains(TABULATE) {
            text = tabulate(&text);
        }

        let text = truncate_at_line(&text, self.max_chars);
        BLANK_LINES.replace_all(text, "\n").trim().to_string()
    }
}

/// Cut to at most `max_chars` characters, preferring the last line break.
fn truncate_at_line(text: &str, max_chars: usize) -> &str {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text;
    };
    let head = &text[..cut];
    if text[cut..].starts_with('\n') {
        return head;
    }
    match head.rfind('\n') {
        Some(idx) => &head[..idx],
        None => head,
    }
}

/// Restructure bar-separated listing lines into `;` rows under one header.
///
/// Only lines carrying a magnet link become rows. Lines that are already
/// table rows are kept unchanged so the stage can be re-applied.
fn tabulate(text: &str) -> String {
    let rows: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| *line != TABLE_HEADER && line.contains("magnet:?"))
        .map(|line| {
            if line.contains(';') && !line.contains('|') {
                line.to_string()
            } else {
                tabulate_line(line)
            }
        })
        .collect();

    if rows.is_empty() {
        return String::new();
    }

    let mut table = String::with_capacity(TABLE_HEADER.len() + rows.len() * 128);
    table.push_str(TABLE_HEADER);
    for row in rows {
        table.push('\n');
        table.push_str(&row);
    }
    table
}

fn tabulate_line(line: &str) -> String {
    let mut magnet = None;
    let mut cells = Vec::new();

    for cell in line.split('|') {
        if let Some(m) = MAGNET.find(cell) {
            magnet.get_or_insert_with(|| m.as_str().to_string());
            continue;
        }
        let cell = cell.trim().trim_matches(|c: char| c == '"' || c == '\'').trim();
        if !cell.is_empty() {
            cells.push(cell.replace(';', ","));
        }
    }

    if let Some(magnet) = magnet {
        if cells.len() == TABLE_COLUMNS.len() - 1 {
            cells.insert(4, magnet);
        } else {
            cells.push(magnet);
        }
    }
    cells.join(";")
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "c9e15763f722f23e98a29decdfae341b98d53056";

    fn listing_row(name: &str, seeders: &str, leechers: &str) -> String {
        format!(
            concat!(
                r#"<li><span class="list-item item-type">Video</span>"#,
                r#"<span class="list-item item-name">{}</span>"#,
                r#"<span class="list-item item-uploaded"><label title="2025-01-17">2025-01-17</label></span>"#,
                r#"<span class="item-icons"><a href="magnet:?xt=urn:btih:{}&amp;dn=release&amp;tr=udp%3A%2F%2Ftracker.opentrackr.org%3A1337">Magnet</a></span>"#,
                r#"<span class="list-item item-size">2.34&nbsp;GiB</span>"#,
                r#"<span class="list-item item-seed">{}</span>"#,
                r#"<span class="list-item item-leech">{}</span>"#,
                r#"<span class="list-item item-user">eztv</span></li>"#,
            ),
            name, HASH, seeders, leechers
        )
    }

    fn listing_page(rows: &[String]) -> String {
        format!(
            "<html><body><h1>Search results</h1>\n<ol id=\"torrents\">\n{}\n</ol>\n</body></html>",
            rows.join("\n")
        )
    }

    fn none() -> BTreeSet<String> {
        BTreeSet::new()
    }

    #[test]
    fn test_structured_page_becomes_table() {
        let page = listing_page(&[
            listing_row("Severance S02E01 1080p", "1,200", "300"),
            listing_row("Severance S02E02 720p", "80", "4"),
        ]);
        let out = Normalizer::new(5000).normalize(&page, &none(), ParsingMode::StructuredMarkup);

        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], TABLE_HEADER);
        let magnet = format!(
            "magnet:?xt=urn:btih:{}&dn=release&tr=udp%3A%2F%2Ftracker.opentrackr.org%3A1337",
            HASH
        );
        assert_eq!(
            lines[1],
            format!(
                "Video;Severance S02E01 1080p;2025-01-17;2.34 GB;{};1,200;300;eztv",
                magnet
            )
        );
        assert!(lines[2].starts_with("Video;Severance S02E02 720p;"));
    }

    #[test]
    fn test_row_with_missing_cell_keeps_its_shape() {
        let page = listing_page(&[listing_row("Broken", "", "3")]);
        let out = Normalizer::new(5000).normalize(&page, &none(), ParsingMode::StructuredMarkup);
        let row = out.lines().nth(1).unwrap();
        assert_eq!(row.split(';').count(), TABLE_COLUMNS.len() - 1);
    }

    #[test]
    fn test_rows_without_magnet_are_not_tabulated() {
        let bare = listing_row("Severance S02E03 480p", "9", "1").replace(
            &format!(
                r#"<span class="item-icons"><a href="magnet:?xt=urn:btih:{}&amp;dn=release&amp;tr=udp%3A%2F%2Ftracker.opentrackr.org%3A1337">Magnet</a></span>"#,
                HASH
            ),
            "",
        );
        assert!(!bare.contains("magnet:?"));

        let page = listing_page(&[listing_row("Severance S02E01 1080p", "1,200", "300"), bare]);
        let out = Normalizer::new(5000).normalize(&page, &none(), ParsingMode::StructuredMarkup);

        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("Video;Severance S02E01 1080p;"));
        assert!(!out.contains("S02E03"));
        assert!(!out.contains("Search results"));

        // A page with no magnet rows at all yields no table.
        let listing = listing_page(&[listing_row("Only", "1", "1")]);
        let only_bare = listing.replace("magnet:?", "https://example.org/?");
        let out = Normalizer::new(5000).normalize(&only_bare, &none(), ParsingMode::StructuredMarkup);
        assert!(out.is_empty());
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let normalizer = Normalizer::new(5000);
        let page = listing_page(&[
            listing_row("Severance S02E01 1080p", "1,200", "300"),
            listing_row("Severance S02E03", "10", "1"),
        ]);
        for mode in [ParsingMode::StructuredMarkup, ParsingMode::FreeformText] {
            let once = normalizer.normalize(&page, &none(), mode);
            let twice = normalizer.normalize(&once, &none(), mode);
            assert_eq!(once, twice, "mode {:?}", mode);
        }

        for text in [
            "Tom &amp;amp; Jerry",
            "Say &quot;Hello World&quot; twice",
            "&amp;lt;b&amp;gt;bold&amp;lt;/b&amp;gt;",
        ] {
            let once = normalizer.normalize(text, &none(), ParsingMode::FreeformText);
            let twice = normalizer.normalize(&once, &none(), ParsingMode::FreeformText);
            assert_eq!(once, twice, "input {:?}", text);
        }
    }

    #[test]
    fn test_nested_entities_decode_in_one_pass() {
        let out = Normalizer::new(5000).normalize(
            "Tom &amp;amp; Jerry",
            &none(),
            ParsingMode::FreeformText,
        );
        assert_eq!(out, "Tom & Jerry");
    }

    #[test]
    fn test_freeform_is_cleaned_not_tabulated() {
        let text = "| Category | Name | Link |\n\
                    |---|---|---|\n\
                    | [Anime](https://nyaa.si/?c=1_2) | [Frieren 01](/view/1) | [](magnet:?xt=urn:btih:abc) |\n\n\n";
        let mut excluded = none();
        excluded.insert("local_links".to_string());
        let out = Normalizer::new(5000).normalize(text, &excluded, ParsingMode::FreeformText);

        assert!(!out.contains(TABLE_HEADER));
        assert!(!out.contains("https://"));
        assert!(out.contains("(/view/1)"));
        assert!(out.contains("Frieren 01"));
        assert!(!out.contains("\n\n"));
    }

    #[test]
    fn test_excluded_rule_is_skipped() {
        let text = "see <a href=\"/view/42\">details</a>";
        let with = Normalizer::new(5000).normalize(text, &none(), ParsingMode::FreeformText);
        assert!(!with.contains("/view/42"));

        let mut excluded = none();
        excluded.insert("local_links".to_string());
        let without = Normalizer::new(5000).normalize(text, &excluded, ParsingMode::FreeformText);
        assert!(without.contains("/view/42"));
    }

    #[test]
    fn test_truncation_cuts_on_line_boundary() {
        let text = (0..50)
            .map(|i| format!("line number {:02} with some padding", i))
            .collect::<Vec<_>>()
            .join("\n");
        let out = Normalizer::new(100).normalize(&text, &none(), ParsingMode::FreeformText);

        assert!(out.chars().count() <= 100);
        for line in out.lines() {
            assert!(text.lines().any(|l| l == line), "partial line {:?}", line);
        }
    }

    #[test]
    fn test_truncation_never_splits_a_magnet() {
        let rows: Vec<_> = (0..40)
            .map(|i| listing_row(&format!("Release {}", i), "10", "1"))
            .collect();
        let out = Normalizer::new(700).normalize(
            &listing_page(&rows),
            &none(),
            ParsingMode::StructuredMarkup,
        );

        assert!(out.chars().count() <= 700);
        for line in out.lines().skip(1) {
            assert!(line.contains(HASH), "truncated row {:?}", line);
        }
    }

    #[test]
    fn test_hard_truncation_without_newline_respects_char_boundary() {
        let text = "ééééééééééééééééééééééééééééééééééééééé".repeat(5);
        let out = Normalizer::new(101).normalize(&text, &none(), ParsingMode::FreeformText);
        assert_eq!(out.chars().count(), 101);
    }

    #[test]
    fn test_binary_units_and_entities() {
        let out = Normalizer::new(5000).normalize(
            "Size 1.4&nbsp;GiB &amp; 700MiB",
            &none(),
            ParsingMode::FreeformText,
        );
        assert_eq!(out, "Size 1.4 GB & 700 MB");
    }

    #[test]
    fn test_horizontal_rules_removed() {
        let out = Normalizer::new(5000).normalize(
            "first\n----------\nsecond",
            &none(),
            ParsingMode::FreeformText,
        );
        assert_eq!(out, "first\nsecond");
    }

    #[test]
    fn test_rule_names_in_order() {
        let filters = filter_names();
        assert_eq!(filters.first(), Some(&"list_preamble"));
        assert!(filters.contains(&"local_links"));
        let rewrites = rewrite_names();
        assert_eq!(rewrites.first(), Some(&HTML_ENTITIES));
        assert_eq!(rewrites.last(), Some(&TABULATE));
        assert_eq!(rewrites.iter().filter(|n| **n == HTML_ENTITIES).count(), 1);
    }
}
