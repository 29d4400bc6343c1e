//! Entity ID generation and partial-ID resolution

use tracing::debug;

/// Generate a fresh entity id (UUID v7, time ordered)
pub fn generate_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Resolves a user-typed reference to one full id
///
/// A reference matches an id exactly or as a prefix.
pub struct IdResolver<'a> {
    ids: Vec<&'a str>,
}

impl<'a> IdResolver<'a> {
    pub fn new(ids: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Resolve a partial reference to a full ID
    ///
    /// Returns:
    /// - Ok(Some(id)) if exactly one match
    /// - Ok(None) if no matches
    /// - Err with candidates if ambiguous
    pub fn resolve(&self, reference: &str) -> Result<Option<&'a str>, Vec<&'a str>> {
        debug!(%reference, candidates = self.ids.len(), "IdResolver::resolve: called");
        if let Some(exact) = self.ids.iter().copied().find(|id| *id == reference) {
            return Ok(Some(exact));
        }

        let matches: Vec<&'a str> = self
            .ids
            .iter()
            .copied()
            .filter(|id| id.starts_with(reference))
            .collect();

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.first().copied()),
            _ => Err(matches),
        }
    }
}
