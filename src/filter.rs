use crate::models::RawListing;

/// Minimum partial-ratio scores a title must clear. Widened variants are
/// noisier than the phrase the user typed, so they get the stricter bar.
#[derive(Debug, Clone, Copy)]
pub struct FilterThresholds {
    pub expanded: f64,
    pub original: f64,
}

impl Default for FilterThresholds {
    fn default() -> Self {
        Self {
            expanded: 80.0,
            original: 70.0,
        }
    }
}

/// Best-aligned substring similarity on a 0-100 scale: slide the shorter
/// string across same-length windows of the longer one and keep the
/// highest normalized Levenshtein score.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (short, long) = if a_chars.len() <= b_chars.len() {
        (a_chars, b_chars)
    } else {
        (b_chars, a_chars)
    };

    if short.is_empty() {
        return if long.is_empty() { 100.0 } else { 0.0 };
    }

    let needle: String = short.iter().collect();
    let mut best = 0.0_f64;
    for window in long.windows(short.len()) {
        let candidate: String = window.iter().collect();
        let score = strsim::normalized_levenshtein(&needle, &candidate) * 100.0;
        if score > best {
            best = score;
        }
        if best >= 100.0 {
            break;
        }
    }
    best
}

/// Keep a listing when its title resembles any widened phrase closely, or
/// the original phrase somewhat. Comparison is case-insensitive.
pub fn filter_listings(
    listings: Vec<RawListing>,
    widened: &[String],
    original: &str,
    thresholds: &FilterThresholds,
) -> Vec<RawListing> {
    let widened_lower: Vec<String> = widened.iter().map(|p| p.to_lowercase()).collect();
    let original_lower = original.to_lowercase();

    listings
        .into_iter()
        .filter(|job| {
            let title = job.title.to_lowercase();
            let expanded_match = widened_lower
                .iter()
                .any(|phrase| partial_ratio(phrase, &title) > thresholds.expanded);
            let original_match = partial_ratio(&original_lower, &title) > thresholds.original;
            expanded_match || original_match
        })
        .collect()
}
