use std::collections::BTreeSet;

/// Collects every anchor a topic file defines.
///
/// Markdown headings contribute their slug, `{#anchor}` markers and `id="..."`/`name="..."`
/// attributes contribute their literal value. Fenced code blocks are skipped so sample code
/// full of `#` comments does not produce phantom headings.
pub fn collect_anchors(text: &str) -> BTreeSet<String> {
    let mut anchors = BTreeSet::new();
    let mut fence: Option<&str> = None;
    for line in text.lines() {
        let trimmed = line.trim_start();
        if let Some(marker) = fence {
            if trimmed.starts_with(marker) {
                fence = None;
            }
            continue;
        }
        if trimmed.starts_with("```") {
            fence = Some("```");
            continue;
        }
        if trimmed.starts_with("~~~") {
            fence = Some("~~~");
            continue;
        }

        let markers = explicit_markers(line);
        if let Some(heading) = heading_text(trimmed) {
            let slug = heading_slug(&strip_markers(heading));
            if !slug.is_empty() {
                anchors.insert(slug);
            }
        }
        anchors.extend(markers);
        anchors.extend(attribute_values(line, "id"));
        anchors.extend(attribute_values(line, "name"));
    }
    anchors
}

/// GitHub-style slug: lowercase, whitespace to `-`, punctuation other than `-`/`_` dropped.
pub fn heading_slug(heading: &str) -> String {
    let mut slug = String::with_capacity(heading.len());
    for ch in heading.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() || ch == '-' || ch == '_' {
            slug.push(ch);
        } else if ch.is_whitespace() {
            slug.push('-');
        }
    }
    slug
}

fn heading_text(line: &str) -> Option<&str> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim().trim_end_matches('#').trim_end())
}

fn explicit_markers(line: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = line;
    while let Some(start) = rest.find("{#") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        let anchor = after[..end].trim();
        if !anchor.is_empty() && !anchor.contains(char::is_whitespace) {
            found.push(anchor.to_string());
        }
        rest = &after[end + 1..];
    }
    found
}

fn strip_markers(heading: &str) -> String {
    let mut out = String::with_capacity(heading.len());
    let mut rest = heading;
    while let Some(start) = rest.find("{#") {
        out.push_str(&rest[..start]);
        match rest[start..].find('}') {
            Some(end) => rest = &rest[start + end + 1..],
            None => {
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn attribute_values(line: &str, attribute: &str) -> Vec<String> {
    let mut found = Vec::new();
    let needle = format!("{attribute}=");
    let mut search_from = 0;
    while let Some(pos) = line[search_from..].find(&needle) {
        let start = search_from + pos;
        search_from = start + needle.len();
        let preceded_by_space = line[..start]
            .chars()
            .next_back()
            .map_or(true, char::is_whitespace);
        if !preceded_by_space {
            continue;
        }
        let value = &line[search_from..];
        let Some(quote) = value.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            continue;
        };
        if let Some(end) = value[1..].find(quote) {
            let anchor = &value[1..1 + end];
            if !anchor.is_empty() {
                found.push(anchor.to_string());
            }
        }
    }
    found
}
