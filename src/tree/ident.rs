/// Fallback when a reference normalizes to nothing.
pub const FALLBACK_IDENTIFIER: &str = "topic";

/// Derives a stable identifier from a content reference.
///
/// A leading `./` and the final extension are dropped, the rest is lowercased and every run
/// of non-alphanumeric characters collapses to a single `-`. The result depends on nothing
/// but the input string, so re-parsing unchanged input yields the same identifiers.
pub fn derive_identifier(reference: &str) -> String {
    let trimmed = reference.trim();
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    let stem = strip_extension(trimmed);

    let mut out = String::with_capacity(stem.len());
    let mut pending_dash = false;
    for ch in stem.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch);
        } else {
            pending_dash = true;
        }
    }
    if out.is_empty() {
        FALLBACK_IDENTIFIER.to_string()
    } else {
        out
    }
}

fn strip_extension(path: &str) -> &str {
    let file_start = path.rfind('/').map_or(0, |idx| idx + 1);
    match path[file_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..file_start + dot],
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_paths() {
        assert_eq!(derive_identifier("overview.md"), "overview");
        assert_eq!(derive_identifier("./guides/Naming Rules.md"), "guides-naming-rules");
        assert_eq!(derive_identifier("errors/result_types.topic"), "errors-result-types");
        assert_eq!(derive_identifier("v1.2/notes.md"), "v1-2-notes");
    }

    #[test]
    fn keeps_dotfiles_and_extensionless_names() {
        assert_eq!(derive_identifier(".hidden"), "hidden");
        assert_eq!(derive_identifier("README"), "readme");
    }

    #[test]
    fn falls_back_for_symbol_only_references() {
        assert_eq!(derive_identifier("---.md"), FALLBACK_IDENTIFIER);
    }

    #[test]
    fn is_deterministic() {
        let reference = "Idioms/Ownership & Borrowing.md";
        assert_eq!(derive_identifier(reference), derive_identifier(reference));
        assert_ne!(derive_identifier("a.md"), derive_identifier("b.md"));
    }
}
