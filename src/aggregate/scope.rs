use crate::event::parser::agent_extension;
use chrono::NaiveDate;

/// Normalized (agent filter, date range) parameters of an aggregation
/// request. Scopes key the cache, so two requests meaning the same thing
/// must construct equal scopes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryScope {
    /// Normalized agent extension; None means all agents.
    pub agent: Option<String>,
    /// Inclusive calendar-date bounds on session enter time.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl QueryScope {
    /// The default scope: all agents, all dates. This is what the refresh
    /// scheduler keeps warm and what a parameterless summary query resolves
    /// to.
    pub const fn all() -> Self {
        Self {
            agent: None,
            start_date: None,
            end_date: None,
        }
    }

    pub fn new(
        agent: Option<&str>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            agent: agent.and_then(agent_extension),
            start_date,
            end_date,
        }
    }

    pub fn date_in_range(&self, date: NaiveDate) -> bool {
        if let Some(start) = self.start_date {
            if date < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if date > end {
                return false;
            }
        }
        true
    }

    pub fn matches_agent(&self, agent: Option<&str>) -> bool {
        match &self.agent {
            None => true,
            Some(filter) => agent == Some(filter.as_str()),
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_agent_filter_normalized() {
        let scope = QueryScope::new(Some("PJSIP/102"), None, None);
        assert_eq!(scope.agent, Some("102".to_string()));
        assert!(scope.matches_agent(Some("102")));
        assert!(!scope.matches_agent(Some("103")));
        assert!(!scope.matches_agent(None));
    }

    #[test]
    fn test_equal_scopes_from_different_spellings() {
        let a = QueryScope::new(Some("102"), None, None);
        let b = QueryScope::new(Some("PJSIP/102"), None, None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_date_range_inclusive() {
        let scope = QueryScope::new(None, Some(date("2025-12-01")), Some(date("2025-12-03")));

        assert!(!scope.date_in_range(date("2025-11-30")));
        assert!(scope.date_in_range(date("2025-12-01")));
        assert!(scope.date_in_range(date("2025-12-03")));
        assert!(!scope.date_in_range(date("2025-12-04")));
    }

    #[test]
    fn test_open_ended_ranges() {
        let from = QueryScope::new(None, Some(date("2025-12-01")), None);
        assert!(from.date_in_range(date("2099-01-01")));
        assert!(!from.date_in_range(date("2025-11-30")));

        assert!(QueryScope::all().date_in_range(date("1999-01-01")));
    }

    #[test]
    fn test_default_scope() {
        assert!(QueryScope::all().is_default());
        assert!(!QueryScope::new(Some("102"), None, None).is_default());
    }
}
