//! Ordered key/value option lists.
//!
//! Connection options travel across the driver boundary as a flat string
//! map. Keys are unique; insertion order is preserved so a driver can
//! re-emit options in the order it defined them.

/// An ordered string map with unique keys.
///
/// This is deliberately a plain `Vec` of pairs: option lists are tiny
/// (a handful of entries) and ordering matters more than lookup speed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionList {
    entries: Vec<(String, String)>,
}

impl OptionList {
    /// Create an empty option list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value for `key`.
    ///
    /// Replacing keeps the key's original position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Remove `key`, returning its value if it was present.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    /// Drop all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no options are set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for OptionList {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut list = Self::new();
        for (k, v) in iter {
            list.set(k, v);
        }
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_keeps_insertion_order() {
        let mut opts = OptionList::new();
        opts.set("Port", "7");
        opts.set("Address", "localhost");
        opts.set("Baud", "115200");

        let keys: Vec<&str> = opts.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Port", "Address", "Baud"]);
    }

    #[test]
    fn set_replaces_in_place() {
        let mut opts = OptionList::new();
        opts.set("Port", "7");
        opts.set("Address", "localhost");
        opts.set("Port", "8");

        assert_eq!(opts.get("Port"), Some("8"));
        assert_eq!(opts.len(), 2);
        let keys: Vec<&str> = opts.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Port", "Address"]);
    }

    #[test]
    fn remove_returns_value() {
        let mut opts = OptionList::new();
        opts.set("Port", "7");
        assert_eq!(opts.remove("Port"), Some("7".to_string()));
        assert_eq!(opts.remove("Port"), None);
        assert!(opts.is_empty());
    }
}
