use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

/// A line-number prefix and the station word the remaining name must end with
struct LinePrefix {
    prefix: Regex,
    terminal: &'static str,
}

static LINE_PREFIXES: Lazy<Vec<LinePrefix>> = Lazy::new(|| {
    vec![
        // "地铁10号线三里屯站", "北京地铁机场线三元桥站", "10号线 三里屯站"
        LinePrefix {
            prefix: Regex::new(r"^(?:[^站\s]*地铁[^站\s]*?线|[0-9A-Za-z一二三四五六七八九十]+号线)[\s·\-]*")
                .expect("valid regex"),
            terminal: "站",
        },
        // "Line 10 Sanlitun Station", "Metro Line 2 - Qianmen Station"
        LinePrefix {
            prefix: Regex::new(r"(?i)^(?:(?:subway|metro)\s+)?line(?:\s+[0-9a-z]+|\d+)[\s,:·\-]*")
                .expect("valid regex"),
            terminal: "station",
        },
    ]
});

/// Levenshtein distance over Unicode scalar values (Wagner–Fischer, two rows)
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1) // deletion
                .min(curr[j] + 1) // insertion
                .min(prev[j] + cost); // substitution
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Edit-distance similarity in `[0, 1]`:
/// `(max_len - distance) / max_len`, with two empty strings counting as identical.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    (max_len - edit_distance(a, b)) as f64 / max_len as f64
}

/// Remove a transit line prefix ("Line 10", "10号线", "地铁…线") from a
/// station name. Names that don't end in a station word are returned as-is,
/// as is anything that would be left empty.
pub fn strip_line_prefix(name: &str) -> Cow<'_, str> {
    let trimmed = name.trim();

    for rule in LINE_PREFIXES.iter() {
        let Some(found) = rule.prefix.find(trimmed) else {
            continue;
        };
        let rest = trimmed[found.end()..].trim();
        if !rest.is_empty() && rest.to_lowercase().ends_with(rule.terminal) {
            return Cow::Owned(rest.to_string());
        }
    }

    Cow::Borrowed(name)
}

/// Similarity of two place names in `[0, 1]`.
///
/// The higher of the raw ratio and the ratio after stripping line-number
/// prefixes, so "Line 10 Sanlitun Station" and "Sanlitun Station" score 1.0.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let raw = similarity_ratio(a, b);
    if raw >= 1.0 {
        return raw;
    }

    let stripped = similarity_ratio(&strip_line_prefix(a), &strip_line_prefix(b));
    raw.max(stripped)
}
