//! Series membership. Rows written by one expansion share a `series_id`;
//! rows written before that column existed are grouped the old way, by the
//! cleaned description and the exact amount, but only when they look like
//! series members themselves.

use uuid::Uuid;

use crate::ledger::expansion::PIX_GLYPH;

/// Postgres regex for the `" - NN/NN"` numbering that expansion appends.
pub const NUMBERED_SUFFIX_PATTERN: &str = " - [0-9]+/[0-9]+$";

/// Which rows a series delete touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesScope {
    /// Every row carrying this series id.
    Tagged(Uuid),
    /// Untagged series-shaped rows with the same amount whose description
    /// matches, case-insensitively, one of these `LIKE` patterns.
    Legacy { patterns: Vec<String> },
    /// Only the row itself.
    Single,
}

impl SeriesScope {
    pub fn of(series_id: Option<Uuid>, description: &str, is_recurring: bool) -> Self {
        if let Some(id) = series_id {
            return SeriesScope::Tagged(id);
        }
        if !is_recurring && !has_numbered_suffix(description) {
            return SeriesScope::Single;
        }
        let prefix = escape_like(series_prefix(description));
        let patterns = ["", PIX_GLYPH]
            .iter()
            .flat_map(|glyph| {
                let base = format!("{}{prefix}", escape_like(glyph));
                [base.clone(), format!("{base} (%"), format!("{base} - %")]
            })
            .collect();
        SeriesScope::Legacy { patterns }
    }
}

/// Ends in `" - <digits>/<digits>"`.
pub fn has_numbered_suffix(description: &str) -> bool {
    let Some((_, numbering)) = description.rsplit_once(" - ") else {
        return false;
    };
    match numbering.split_once('/') {
        Some((index, total)) => [index, total]
            .iter()
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())),
        None => false,
    }
}

/// Escapes `LIKE` wildcards with the default backslash escape.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Text before the first `" ("` or `" - "`, with the Pix glyph removed.
pub fn series_prefix(description: &str) -> &str {
    let description = description.strip_prefix(PIX_GLYPH).unwrap_or(description);
    let cut = [" (", " - "]
        .iter()
        .filter_map(|separator| description.find(separator))
        .min()
        .unwrap_or(description.len());
    description[..cut].trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected_patterns(prefixes: &[&str]) -> Vec<String> {
        prefixes
            .iter()
            .flat_map(|prefix| {
                ["", PIX_GLYPH].into_iter().flat_map(move |glyph| {
                    let base = format!("{glyph}{prefix}");
                    [base.clone(), format!("{base} (%"), format!("{base} - %")]
                })
            })
            .collect()
    }

    #[test]
    fn strips_installment_suffix() {
        assert_eq!(series_prefix("Netflix - 03/12"), "Netflix");
        assert_eq!(series_prefix("💠 Rent - 01/12"), "Rent");
    }

    #[test]
    fn strips_parenthesised_note() {
        assert_eq!(series_prefix("Gym (family plan) - 02/12"), "Gym");
    }

    #[test]
    fn leaves_plain_descriptions_alone() {
        assert_eq!(series_prefix("Coffee"), "Coffee");
    }

    #[test]
    fn tagged_rows_use_their_series_id() {
        let id = Uuid::new_v4();
        assert_eq!(SeriesScope::of(Some(id), "💠 Coffee", false), SeriesScope::Tagged(id));
    }

    #[test]
    fn untagged_one_off_deletes_only_itself() {
        // A single Pix "Coffee" must not take "Coffee beans" or a second coffee with it.
        assert_eq!(SeriesScope::of(None, "💠 Coffee", false), SeriesScope::Single);
        assert_eq!(SeriesScope::of(None, "Coffee beans", false), SeriesScope::Single);
        assert_eq!(SeriesScope::of(None, "Uber - airport", false), SeriesScope::Single);
    }

    #[test]
    fn untagged_series_members_fall_back_to_prefix() {
        assert_eq!(
            SeriesScope::of(None, "Netflix - 03/12", false),
            SeriesScope::Legacy { patterns: expected_patterns(&["Netflix"]) }
        );
        assert_eq!(
            SeriesScope::of(None, "💠 Rent", true),
            SeriesScope::Legacy { patterns: expected_patterns(&["Rent"]) }
        );
    }

    #[test]
    fn legacy_prefix_stops_at_a_separator() {
        // "Coffee - 01/03" must not reach "Coffee beans - 01/05".
        let SeriesScope::Legacy { patterns } = SeriesScope::of(None, "Coffee - 01/03", false) else {
            panic!("expected a legacy scope");
        };
        assert!(!patterns.iter().any(|pattern| pattern.starts_with("Coffee%")));
        assert!(patterns.contains(&"Coffee - %".to_string()));
        assert!(patterns.contains(&"💠 Coffee (%".to_string()));
    }

    #[test]
    fn like_wildcards_in_descriptions_are_literal() {
        assert_eq!(
            SeriesScope::of(None, "50%_off - 01/03", false),
            SeriesScope::Legacy { patterns: expected_patterns(&["50\\%\\_off"]) }
        );
    }

    #[test]
    fn numbered_suffix_detection() {
        assert!(has_numbered_suffix("Netflix - 03/12"));
        assert!(has_numbered_suffix("💠 Gym (family) - 12/12"));
        assert!(!has_numbered_suffix("Netflix"));
        assert!(!has_numbered_suffix("Uber - airport"));
        assert!(!has_numbered_suffix("Split - 1/"));
        assert!(!has_numbered_suffix("Ratio - a/b"));
    }
}
