use crate::resorts::Resort;

/// Typeahead index over the titles of plottable resorts.
/// Matching is case-insensitive and not anchored to the start of the title.
pub struct ResortIndex {
    /// (resort index, lowercased title)
    entries: Vec<(usize, String)>,
}

impl ResortIndex {
    pub fn new(resorts: &[Resort]) -> Self {
        let entries = resorts
            .iter()
            .enumerate()
            .filter(|(_, r)| r.coords().is_some())
            .map(|(i, r)| (i, r.title().to_lowercase()))
            .collect();
        Self { entries }
    }

    /// Resorts whose title contains `query`, in file order, at most `limit`
    pub fn matches(&self, query: &str, limit: usize) -> Vec<usize> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|(_, title)| title.contains(&needle))
            .map(|&(i, _)| i)
            .take(limit)
            .collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
