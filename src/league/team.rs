/// One team entry as it appears in an athlete's record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRecord {
    pub id: Option<i64>,
    pub tag: String,
}

impl TeamRecord {
    pub fn new(id: Option<i64>, tag: impl Into<String>) -> Self {
        Self {
            id,
            tag: tag.into(),
        }
    }
}

/// Picks the "current team" out of an athlete's team records.
///
/// Upstream records for traded players end in a placeholder (an aggregate
/// `TOT` row, team id 0, or an empty tag). With `fallback_to_previous` the
/// resolver skips placeholders and returns the newest real team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamResolver {
    pub placeholder_tags: Vec<String>,
    pub placeholder_ids: Vec<i64>,
    pub fallback_to_previous: bool,
    pub default_tag: Option<String>,
}

impl Default for TeamResolver {
    fn default() -> Self {
        Self {
            placeholder_tags: vec!["TOT".to_string(), "N/A".to_string()],
            placeholder_ids: vec![0],
            fallback_to_previous: true,
            default_tag: None,
        }
    }
}

impl TeamResolver {
    pub fn is_placeholder(&self, rec: &TeamRecord) -> bool {
        let tag = rec.tag.trim();
        tag.is_empty()
            || self.placeholder_tags.iter().any(|p| p.eq_ignore_ascii_case(tag))
            || rec.id.is_some_and(|id| self.placeholder_ids.contains(&id))
    }

    /// `records` are ordered oldest → newest.
    pub fn resolve(&self, records: &[TeamRecord]) -> Option<String> {
        let resolved = if self.fallback_to_previous {
            records.iter().rev().find(|r| !self.is_placeholder(r))
        } else {
            records.last().filter(|r| !self.is_placeholder(r))
        };
        resolved
            .map(|r| r.tag.trim().to_string())
            .or_else(|| self.default_tag.clone())
    }
}
