/// Column filter with an inclusion or exclusion polarity.
///
/// An empty filter lets every column through regardless of polarity.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct Fields {
    names: Vec<String>,
    excluded: bool,
}

impl Fields {
    pub fn create() -> Self {
        Default::default()
    }

    /// Only the listed columns.
    pub fn of<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        let mut result = Self::create();
        result.add_all(names);
        result
    }

    /// Every column except the listed ones.
    pub fn excluding<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self::of(names).excluded(true)
    }

    pub fn excluded(mut self, excluded: bool) -> Self {
        self.excluded = excluded;
        self
    }

    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    pub fn add(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        if !self.names.contains(&name) {
            self.names.push(name);
        }
        self
    }

    pub fn add_all<S: Into<String>>(&mut self, names: impl IntoIterator<Item = S>) -> &mut Self {
        for name in names {
            self.add(name);
        }
        self
    }

    /// Merge another filter, adopting its polarity.
    pub fn add_fields(&mut self, other: &Fields) -> &mut Self {
        self.excluded = other.excluded;
        self.add_all(other.names.iter().cloned())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|v| v == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Whether `name` passes the filter.
    pub fn check(&self, name: &str) -> bool {
        if self.names.is_empty() {
            return true;
        }
        if self.excluded {
            !self.contains(name)
        } else {
            self.contains(name)
        }
    }
}

/// [`Fields::check`] on an optional filter, a missing filter lets everything through.
pub fn check_field(filter: Option<&Fields>, name: &str) -> bool {
    filter.is_none_or(|v| v.check(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polarity_partitions_the_columns() {
        let columns = ["id", "name", "email", "age"];
        let selected = ["email", "id"];
        let included = Fields::of(selected);
        let excluded = Fields::excluding(selected);
        for column in columns {
            assert_ne!(included.check(column), excluded.check(column), "{column}");
        }
        let kept = columns
            .iter()
            .filter(|c| included.check(c))
            .chain(columns.iter().filter(|c| excluded.check(c)))
            .count();
        assert_eq!(kept, columns.len());
    }

    #[test]
    fn empty_filter() {
        assert!(Fields::create().check("anything"));
        assert!(Fields::create().excluded(true).check("anything"));
        assert!(check_field(None, "anything"));
    }

    #[test]
    fn no_duplicates_and_polarity_copied() {
        let mut fields = Fields::of(["a", "b", "a"]);
        assert_eq!(fields.names(), ["a", "b"]);
        fields.add_fields(&Fields::excluding(["c", "b"]));
        assert_eq!(fields.names(), ["a", "b", "c"]);
        assert!(fields.is_excluded());
    }
}
