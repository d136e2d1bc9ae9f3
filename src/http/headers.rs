/// Unique-key header map borrowing names and values from the request buffer.
///
/// Names compare ASCII case-insensitively. A name that is already present is
/// not replaced: the first occurrence wins.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap<'buf> {
    entries: Vec<(&'buf str, &'buf str)>,
}

impl<'buf> HeaderMap<'buf> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts `name: value` unless `name` is already present.
    ///
    /// Returns `false` when the name was a duplicate.
    pub fn insert_unique(&mut self, name: &'buf str, value: &'buf str) -> bool {
        if self.lookup(name).is_some() {
            return false;
        }
        self.entries.push((name, value));
        true
    }

    pub fn lookup(&self, name: &str) -> Option<&'buf str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| *value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
