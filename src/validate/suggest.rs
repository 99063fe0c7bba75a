/* src/validate/suggest.rs */

/// Maximum edit distance for a candidate to count as a likely typo.
pub const MAX_DISTANCE: usize = 2;

/// Maximum number of suggestions attached to one diagnostic.
pub const MAX_SUGGESTIONS: usize = 3;

/// Levenshtein distance with unit cost for insertion, deletion and substitution.
pub fn levenshtein(a: &str, b: &str) -> usize {
	let a: Vec<char> = a.chars().collect();
	let b: Vec<char> = b.chars().collect();

	if a.is_empty() {
		return b.len();
	}
	if b.is_empty() {
		return a.len();
	}

	let mut matrix = vec![vec![0usize; b.len() + 1]; a.len() + 1];
	for (i, row) in matrix.iter_mut().enumerate() {
		row[0] = i;
	}
	for (j, cell) in matrix[0].iter_mut().enumerate() {
		*cell = j;
	}

	for i in 1..=a.len() {
		for j in 1..=b.len() {
			let cost = usize::from(a[i - 1] != b[j - 1]);
			matrix[i][j] = (matrix[i - 1][j] + 1)
				.min(matrix[i][j - 1] + 1)
				.min(matrix[i - 1][j - 1] + cost);
		}
	}

	matrix[a.len()][b.len()]
}

/// Ranks `candidates` by similarity to `typo` and returns at most [`MAX_SUGGESTIONS`].
///
/// Comparison is case-insensitive. Candidates within `max_distance` qualify, as do
/// candidates where one string contains the other; the latter rank at `max_distance`.
/// Ties keep candidate order.
pub fn find_similar<'a, I>(typo: &str, candidates: I, max_distance: usize) -> Vec<String>
where
	I: IntoIterator<Item = &'a str>,
{
	let typo = typo.to_lowercase();
	if typo.is_empty() {
		return Vec::new();
	}

	let mut scored: Vec<(&str, usize)> = Vec::new();
	for candidate in candidates {
		if scored.iter().any(|(seen, _)| *seen == candidate) {
			continue;
		}
		let lower = candidate.to_lowercase();
		let distance = levenshtein(&typo, &lower);

		if distance <= max_distance {
			scored.push((candidate, distance));
		} else if lower.contains(&typo) || typo.contains(&lower) {
			scored.push((candidate, max_distance));
		}
	}

	scored.sort_by_key(|(_, distance)| *distance);
	scored
		.into_iter()
		.take(MAX_SUGGESTIONS)
		.map(|(candidate, _)| candidate.to_string())
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn known_distances() {
		let cases = [
			("", "", 0),
			("", "abc", 3),
			("abc", "", 3),
			("abc", "abc", 0),
			("abc", "abd", 1),
			("abc", "adc", 1),
			("abc", "dbc", 1),
			("kitten", "sitting", 3),
			("saturday", "sunday", 3),
			("ageents", "agents", 1),
			("llmms", "llms", 1),
		];
		for (a, b, expected) in cases {
			assert_eq!(levenshtein(a, b), expected, "distance({a:?}, {b:?})");
		}
	}

	#[test]
	fn suggests_closest_top_level_fields() {
		let fields = ["agents", "llms", "tools", "databases", "embedders", "plugins"];
		assert_eq!(find_similar("ageents", fields, MAX_DISTANCE)[0], "agents");
		assert_eq!(find_similar("llmms", fields, MAX_DISTANCE)[0], "llms");
		assert_eq!(find_similar("toools", fields, MAX_DISTANCE)[0], "tools");
		assert!(find_similar("completely_wrong", fields, MAX_DISTANCE).is_empty());
	}

	#[test]
	fn top_suggestion_from_small_set() {
		let fields = ["agents", "llms", "tools"];
		assert_eq!(find_similar("ageents", fields, MAX_DISTANCE), ["agents"]);
	}

	#[test]
	fn case_insensitive() {
		assert_eq!(find_similar("AGENTS", ["agents"], MAX_DISTANCE), ["agents"]);
	}

	#[test]
	fn substring_matches_rank_at_threshold() {
		let fields = ["search_mode", "mode", "node"];
		// "mode" (0) and "node" (1) beat the substring-only "search_mode" (capped at 2).
		assert_eq!(
			find_similar("mode", fields, MAX_DISTANCE),
			["mode", "node", "search_mode"]
		);
	}

	#[test]
	fn caps_at_three_and_keeps_order_on_ties() {
		let fields = ["aa", "ab", "ac", "ad"];
		assert_eq!(find_similar("ax", fields, MAX_DISTANCE), ["aa", "ab", "ac"]);
	}

	#[test]
	fn duplicate_candidates_suggested_once() {
		assert_eq!(find_similar("tols", ["tools", "tools"], MAX_DISTANCE), ["tools"]);
	}

	proptest! {
		#[test]
		fn symmetric(a in "[a-z_]{0,10}", b in "[a-z_]{0,10}") {
			prop_assert_eq!(levenshtein(&a, &b), levenshtein(&b, &a));
		}

		#[test]
		fn identity_is_zero(a in ".{0,16}") {
			prop_assert_eq!(levenshtein(&a, &a), 0);
		}

		#[test]
		fn empty_is_length(s in "[a-z]{0,16}") {
			prop_assert_eq!(levenshtein("", &s), s.chars().count());
		}
	}
}
