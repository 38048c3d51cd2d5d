use std::collections::HashSet;

/// Bounds applied to a batch of engaged-couple names submitted at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeRules {
    pub min_couples: usize,
    pub max_couples: usize,
}

impl Default for IntakeRules {
    fn default() -> Self {
        Self {
            min_couples: 2,
            max_couples: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    #[error("at least {minimum} engaged couple names are required, got {provided}")]
    TooFew { minimum: usize, provided: usize },
    #[error("at most {maximum} engaged couple names can be registered at once, got {provided}")]
    TooMany { maximum: usize, provided: usize },
    #[error("engaged couple '{0}' appears more than once")]
    Duplicate(String),
}

impl IntakeRules {
    /// Trim names, drop blank entries, and enforce the batch bounds and uniqueness.
    pub fn normalize_names<I, S>(&self, names: I) -> Result<Vec<String>, IntakeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let filled: Vec<String> = names
            .into_iter()
            .map(|name| name.as_ref().trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        if filled.len() < self.min_couples {
            return Err(IntakeError::TooFew {
                minimum: self.min_couples,
                provided: filled.len(),
            });
        }
        if filled.len() > self.max_couples {
            return Err(IntakeError::TooMany {
                maximum: self.max_couples,
                provided: filled.len(),
            });
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = filled.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(IntakeError::Duplicate(duplicate.clone()));
        }

        Ok(filled)
    }
}
