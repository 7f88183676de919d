use std::collections::BTreeSet;

/// Fixed set of user ids whose channel presence defines registry scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedPersons {
    ids: BTreeSet<String>,
}

impl TrackedPersons {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids = ids
            .into_iter()
            .map(|id| id.as_ref().trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        Self { ids }
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.ids.contains(user_id)
    }

    pub fn any_present(&self, members: &[String]) -> bool {
        members.iter().any(|member| self.contains(member))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
