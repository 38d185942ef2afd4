use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Synonym table driving query widening. Keys are lowercase tokens or
/// whole phrases; values are the substitutions tried for them.
#[derive(Debug, Clone)]
pub struct SynonymTable {
    map: HashMap<String, Vec<String>>,
}

impl Default for SynonymTable {
    fn default() -> Self {
        let entries: &[(&str, &[&str])] = &[
            (
                "software engineer",
                &["developer", "programmer", "programmatore", "sviluppatore"],
            ),
            ("teacher", &["docente", "insegnante", "tutor"]),
            ("inglese", &["english", "madrelingua inglese"]),
            ("madrelingua", &["english", "mothertongue", "native speaker"]),
            ("insegnante", &["teacher", "docente", "tutor"]),
        ];

        let map = entries
            .iter()
            .map(|(key, synonyms)| {
                (
                    key.to_string(),
                    synonyms.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect();
        Self { map }
    }
}

impl SynonymTable {
    /// Load a replacement table from a JSON object of
    /// `{"token": ["synonym", ...]}`. Keys are lowercased on the way in.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read synonym file: {}", path.display()))?;
        let raw: HashMap<String, Vec<String>> = serde_json::from_str(&data)
            .with_context(|| format!("Malformed synonym file: {}", path.display()))?;
        let map = raw
            .into_iter()
            .map(|(key, synonyms)| (key.to_lowercase(), synonyms))
            .collect();
        Ok(Self { map })
    }

    /// Expand one search phrase into variants. The unmodified original is
    /// always first. A multi-word phrase that is itself a table key is
    /// replaced wholesale; otherwise each token occurrence with synonyms
    /// produces one variant per synonym, substituted at that occurrence
    /// only. Variants never combine substitutions.
    pub fn widen(&self, phrase: &str) -> Vec<String> {
        let mut variants = vec![phrase.to_string()];
        let lowered = phrase.to_lowercase();
        let tokens: Vec<&str> = lowered.split_whitespace().collect();

        if tokens.len() > 1 {
            if let Some(synonyms) = self.map.get(lowered.trim()) {
                variants.extend(synonyms.iter().cloned());
            }
        }

        for (position, token) in tokens.iter().enumerate() {
            let Some(synonyms) = self.map.get(*token) else {
                continue;
            };
            for synonym in synonyms {
                let variant = tokens
                    .iter()
                    .enumerate()
                    .map(|(i, word)| if i == position { synonym.as_str() } else { *word })
                    .collect::<Vec<_>>()
                    .join(" ");
                variants.push(variant);
            }
        }

        variants
    }
}
