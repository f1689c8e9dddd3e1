//! Name similarity scoring on a 0-100 scale.
//!
//! Three complementary comparisons are combined by taking the best score:
//! raw character similarity, similarity of the sorted tokens, and similarity
//! of the token sets (shared tokens plus each side's remainder).

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Anything that is not a letter, combining mark or digit separates tokens.
/// Marks are kept so Thai and other abugida names are not split mid-word.
fn separators() -> &'static Regex {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    SEPARATORS
        .get_or_init(|| Regex::new(r"[^\p{L}\p{M}\p{N}]+").expect("valid separator pattern"))
}

fn to_score(similarity: f64) -> u8 {
    (similarity * 100.0).round().clamp(0.0, 100.0) as u8
}

fn tokens(text: &str) -> Vec<String> {
    separators()
        .split(&text.to_lowercase())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Case-insensitive character similarity. Adjacent transpositions count as
/// a single edit, so "Starbucks"/"Strabucks" scores 89.
pub fn ratio(a: &str, b: &str) -> u8 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    to_score(strsim::normalized_damerau_levenshtein(&a, &b))
}

/// Ratio of the names after sorting their tokens.
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    let mut ta = tokens(a);
    let mut tb = tokens(b);
    ta.sort();
    tb.sort();
    ratio(&ta.join(" "), &tb.join(" "))
}

/// Token-set comparison: the shared tokens against each side's full token
/// set. Word order and repeated words do not matter, and a name whose tokens
/// are a subset of the other's scores 100.
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    let sa: BTreeSet<String> = tokens(a).into_iter().collect();
    let sb: BTreeSet<String> = tokens(b).into_iter().collect();
    if sa.is_empty() || sb.is_empty() {
        return 0;
    }

    let join = |set: Vec<&String>| {
        set.into_iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    };
    let common = join(sa.intersection(&sb).collect());
    let only_a = join(sa.difference(&sb).collect());
    let only_b = join(sb.difference(&sa).collect());

    let combined_a = format!("{} {}", common, only_a).trim().to_string();
    let combined_b = format!("{} {}", common, only_b).trim().to_string();

    ratio(&common, &combined_a)
        .max(ratio(&common, &combined_b))
        .max(ratio(&combined_a, &combined_b))
}

/// Best score across all strategies.
pub fn similarity(a: &str, b: &str) -> u8 {
    ratio(a, b)
        .max(token_sort_ratio(a, b))
        .max(token_set_ratio(a, b))
}

/// A name judged close to a search term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimilarName {
    pub name: String,
    pub score: u8,
}

/// Names scoring at least `threshold` against `target`, best first and
/// alphabetical among equal scores.
///
/// Very short names, and names whose length differs from the target's by more
/// than the target's own length, are skipped before scoring.
pub fn find_similar_names<'a>(
    target: &str,
    names: impl IntoIterator<Item = &'a str>,
    threshold: u8,
) -> Vec<SimilarName> {
    let target_len = target.chars().count();
    let min_len = (target_len / 3).max(3);

    let candidates: BTreeSet<&str> = names.into_iter().collect();
    let mut similar: Vec<SimilarName> = candidates
        .into_iter()
        .filter(|name| {
            let len = name.chars().count();
            len >= min_len && len.abs_diff(target_len) <= target_len
        })
        .filter_map(|name| {
            let score = similarity(target, name);
            (score >= threshold).then(|| SimilarName {
                name: name.to_string(),
                score,
            })
        })
        .collect();

    similar.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    similar
}
