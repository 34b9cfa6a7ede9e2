//! Word lists and tokenization shared by the local text heuristics
//!
//! Lexicons are plain values handed to the analyzers that use them, so tests
//! and callers can substitute their own lists.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const DEFAULT_FILLERS: &[&str] = &[
    "um",
    "uh",
    "like",
    "you know",
    "basically",
    "kind of",
    "sort of",
    "actually",
    "literally",
    "honestly",
    "i mean",
    "you see",
    "right",
    "okay",
    "so",
    "well",
    "yeah",
];

const DEFAULT_CLAIMS: &[&str] = &[
    "faster",
    "better",
    "improved",
    "reduced",
    "increased",
    "scalable",
    "secure",
    "efficient",
    "optimized",
    "enhanced",
    "superior",
    "best",
    "revolutionary",
    "innovative",
    "cutting-edge",
    "powerful",
    "robust",
    "reliable",
    "seamless",
];

const DEFAULT_EVIDENCE: &[&str] = &[
    "graph",
    "chart",
    "demo",
    "show",
    "see",
    "benchmark",
    "result",
    "data",
    "measured",
    "tested",
    "proof",
    "evidence",
    "screenshot",
    "here",
    "this",
    "as you can see",
    "look at",
];

/// Split text into lowercase word tokens
///
/// Word boundaries follow `\b\w+\b`, so punctuation never survives into a token.
pub fn tokenize(text: &str) -> Vec<String> {
    static WORD_RE: OnceLock<Regex> = OnceLock::new();
    let word_re = WORD_RE.get_or_init(|| Regex::new(r"\b\w+\b").expect("static word pattern"));
    let lowered = text.to_lowercase();
    word_re
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// One match of a lexicon entry inside a token stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseMatch {
    pub start: usize,
    pub len: usize,
    pub phrase: String,
}

/// A set of single- and multi-word entries matched against whole tokens
///
/// Entries are tokenized the same way as the text they are matched against,
/// so "cutting-edge" matches the token pair `cutting edge`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct PhraseSet {
    entries: Vec<String>,
    // longest first
    token_entries: Vec<Vec<String>>,
}

impl PhraseSet {
    pub fn new<S: AsRef<str>>(entries: &[S]) -> Self {
        let entries: Vec<String> = entries.iter().map(|e| e.as_ref().to_string()).collect();
        let mut token_entries: Vec<Vec<String>> = entries
            .iter()
            .map(|e| tokenize(e))
            .filter(|tokens| !tokens.is_empty())
            .collect();
        token_entries.sort();
        token_entries.dedup();
        token_entries.sort_by(|a, b| b.len().cmp(&a.len()));
        PhraseSet {
            entries,
            token_entries,
        }
    }

    /// Scan left to right, taking the longest entry at each position
    ///
    /// Matches never overlap: after a match the scan resumes past its last token.
    pub fn find_matches(&self, tokens: &[String]) -> Vec<PhraseMatch> {
        let mut matches = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            let hit = self
                .token_entries
                .iter()
                .find(|entry| tokens[i..].starts_with(entry.as_slice()));
            match hit {
                Some(entry) => {
                    matches.push(PhraseMatch {
                        start: i,
                        len: entry.len(),
                        phrase: entry.join(" "),
                    });
                    i += entry.len();
                }
                None => i += 1,
            }
        }
        matches
    }

    /// Number of tokens consumed by matches
    pub fn matched_token_count(&self, tokens: &[String]) -> usize {
        self.find_matches(tokens).iter().map(|m| m.len).sum()
    }
}

impl From<Vec<String>> for PhraseSet {
    fn from(entries: Vec<String>) -> Self {
        PhraseSet::new(&entries)
    }
}

impl From<PhraseSet> for Vec<String> {
    fn from(set: PhraseSet) -> Self {
        set.entries
    }
}

/// Filler words and phrases counted by the ramble analyzer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillerLexicon {
    pub fillers: PhraseSet,
}

impl Default for FillerLexicon {
    fn default() -> Self {
        FillerLexicon {
            fillers: PhraseSet::new(DEFAULT_FILLERS),
        }
    }
}

impl FillerLexicon {
    pub fn new<S: AsRef<str>>(fillers: &[S]) -> Self {
        FillerLexicon {
            fillers: PhraseSet::new(fillers),
        }
    }
}

/// Claims and evidence cues found in a window's text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimEvidence {
    pub claims: Vec<String>,
    pub evidence: Vec<String>,
}

/// Keyword fallback for claim/evidence classification
///
/// Used when no external claim judgment was supplied for a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimLexicon {
    pub claims: PhraseSet,
    pub evidence: PhraseSet,
}

impl Default for ClaimLexicon {
    fn default() -> Self {
        ClaimLexicon {
            claims: PhraseSet::new(DEFAULT_CLAIMS),
            evidence: PhraseSet::new(DEFAULT_EVIDENCE),
        }
    }
}

impl ClaimLexicon {
    pub fn detect(&self, text: &str) -> ClaimEvidence {
        let tokens = tokenize(text);
        ClaimEvidence {
            claims: self
                .claims
                .find_matches(&tokens)
                .into_iter()
                .map(|m| m.phrase)
                .collect(),
            evidence: self
                .evidence
                .find_matches(&tokens)
                .into_iter()
                .map(|m| m.phrase)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<String> {
        tokenize(text)
    }

    #[test]
    fn test_tokenize_lowercases_and_drops_punctuation() {
        assert_eq!(
            tokenize("Um, so... we BUILT it!"),
            vec!["um", "so", "we", "built", "it"]
        );
        assert!(tokenize("  ?!  ").is_empty());
    }

    #[test]
    fn test_multi_word_entries_match_whole_token_sequences() {
        let set = PhraseSet::new(&["you know", "so"]);
        let text = tokens("you know, so you knowledge");
        let matches = set.find_matches(&text);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].phrase, "you know");
        assert_eq!(matches[0].len, 2);
        assert_eq!(matches[1].phrase, "so");
        assert_eq!(set.matched_token_count(&text), 3);
    }

    #[test]
    fn test_longest_entry_wins() {
        let set = PhraseSet::new(&["look", "look at"]);
        let matches = set.find_matches(&tokens("look at this"));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].phrase, "look at");
    }

    #[test]
    fn test_substrings_do_not_match() {
        let lexicon = FillerLexicon::default();
        let text = tokens("unlike umbrellas, sorting is well known");
        // only "well" is a whole-token filler here
        assert_eq!(lexicon.fillers.matched_token_count(&text), 1);
    }

    #[test]
    fn test_claim_fallback_finds_claims_and_evidence() {
        let lexicon = ClaimLexicon::default();
        let found = lexicon.detect("Our cutting-edge engine is faster. As you can see on the chart");
        assert_eq!(found.claims, vec!["cutting edge", "faster"]);
        assert_eq!(found.evidence, vec!["as you can see", "chart"]);
    }

    #[test]
    fn test_phrase_set_deserializes_from_list() {
        let set: PhraseSet = serde_json::from_str(r#"["erm", "you know"]"#).unwrap();
        assert_eq!(set.matched_token_count(&tokens("erm you know")), 3);
        assert_eq!(Vec::<String>::from(set), vec!["erm", "you know"]);
    }
}
