//! Cluster → prompt and prompt → insight resolution.
//!
//! Two small closed tables with explicit default sentinels. Pure lookups,
//! no state, no failure modes.

/// Sentinel prompt for cluster ids outside the table.
pub const DEFAULT_PROMPT: &str = "A mysterious dream with undefined features.";

/// Sentinel insight for prompts outside the table.
pub const DEFAULT_INSIGHT: &str =
    "Your subconscious contains intriguing mysteries waiting to be explored.";

/// Map a cluster id to its archetype prompt.
///
/// Exactly four archetypes exist; any other id resolves to
/// [`DEFAULT_PROMPT`]. Deterministic and stable for the lifetime of a run.
#[must_use]
pub fn assign_prompt(cluster_id: usize) -> &'static str {
    match cluster_id {
        0 => "A surreal calm dreamscape with soft pastel colors.",
        1 => "A vibrant, energetic dream filled with dynamic patterns.",
        2 => "A dark, mysterious dream with deep, shadowy tones.",
        3 => "A whimsical dream with playful, abstract imagery.",
        _ => DEFAULT_PROMPT,
    }
}

/// Map an archetype prompt to its interpretive insight.
///
/// Unknown prompts (including [`DEFAULT_PROMPT`]) resolve to
/// [`DEFAULT_INSIGHT`].
#[must_use]
pub fn resolve_insight(prompt: &str) -> &'static str {
    match prompt {
        "A surreal calm dreamscape with soft pastel colors." => {
            "Your mind appears to be seeking tranquility and balance, \
             indicating a desire for calm and serenity."
        }
        "A vibrant, energetic dream filled with dynamic patterns." => {
            "Your subconscious seems charged with creative energy and passion, \
             possibly signaling bursts of inspiration."
        }
        "A dark, mysterious dream with deep, shadowy tones." => {
            "There may be hidden, unresolved emotions at play, suggesting a \
             period of introspection or mystery."
        }
        "A whimsical dream with playful, abstract imagery." => {
            "Your inner thoughts might be exploring a playful and imaginative \
             realm, filled with light-hearted creativity."
        }
        _ => DEFAULT_INSIGHT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_clusters_have_distinct_prompts() {
        let prompts: std::collections::BTreeSet<_> = (0..4).map(assign_prompt).collect();
        assert_eq!(prompts.len(), 4);
        assert!(!prompts.contains(DEFAULT_PROMPT));
    }

    #[test]
    fn out_of_range_id_gets_sentinel() {
        assert_eq!(assign_prompt(4), DEFAULT_PROMPT);
        assert_eq!(assign_prompt(99), DEFAULT_PROMPT);
    }

    #[test]
    fn assignment_is_pure() {
        assert_eq!(assign_prompt(2), assign_prompt(2));
    }

    #[test]
    fn every_table_prompt_has_a_specific_insight() {
        for id in 0..4 {
            let insight = resolve_insight(assign_prompt(id));
            assert_ne!(insight, DEFAULT_INSIGHT);
        }
    }

    #[test]
    fn unknown_prompt_gets_default_insight() {
        assert_eq!(resolve_insight("not a prompt"), DEFAULT_INSIGHT);
        assert_eq!(resolve_insight(DEFAULT_PROMPT), DEFAULT_INSIGHT);
    }
}
