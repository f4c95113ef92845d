use indexmap::IndexMap;
use serde::Serialize;

/// The named numeric counters a case publishes.
///
/// Keys are written once per case; writing the same key twice is a
/// programming error and panics. Insertion order is preserved only so that
/// reports read in the order counters were produced; consumers must not rely
/// on it.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct MetricSet {
    values: IndexMap<&'static str, f64>,
}

impl MetricSet {
    pub fn new() -> Self {
        MetricSet::default()
    }

    pub fn insert(&mut self, name: &'static str, value: f64) {
        let prev = self.values.insert(name, value);
        assert!(prev.is_none(), "metric {:?} written twice", name);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.values.iter().map(|(&name, &value)| (name, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_once() {
        let mut metrics = MetricSet::new();
        metrics.insert("input_size", 192.0);
        assert_eq!(metrics.get("input_size"), Some(192.0));
        assert_eq!(metrics.get("output_size"), None);
    }

    #[test]
    #[should_panic(expected = "written twice")]
    fn double_write_panics() {
        let mut metrics = MetricSet::new();
        metrics.insert("input_size", 1.0);
        metrics.insert("input_size", 2.0);
    }
}
