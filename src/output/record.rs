use std::collections::HashMap;

/// Column name → value for one result row. Column order comes from the
/// writer's header, not from the record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputRecord {
    fields: HashMap<String, String>,
}

impl OutputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, returning the value it replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Values in `header` order. Columns the record lacks come back as empty
    /// strings and are listed in the second element.
    pub fn ordered<'h>(&self, header: &'h [String]) -> (Vec<String>, Vec<&'h str>) {
        let mut missing = Vec::new();
        let values = header
            .iter()
            .map(|column| match self.fields.get(column) {
                Some(value) => value.clone(),
                None => {
                    missing.push(column.as_str());
                    String::new()
                }
            })
            .collect();
        (values, missing)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for OutputRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for OutputRecord {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_follows_header_and_reports_gaps() {
        let header: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        let record: OutputRecord = [("C", "3"), ("A", "1"), ("Extra", "x")].into_iter().collect();

        let (values, missing) = record.ordered(&header);
        assert_eq!(values, vec!["1", "", "3"]);
        assert_eq!(missing, vec!["B"]);
    }

    #[test]
    fn insert_replaces() {
        let mut record = OutputRecord::new().with("RT", "512");
        assert_eq!(record.insert("RT", "498"), Some("512".to_string()));
        assert_eq!(record.get("RT"), Some("498"));
        assert_eq!(record.len(), 1);
    }
}
