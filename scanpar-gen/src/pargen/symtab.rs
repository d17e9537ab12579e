use indexmap::IndexSet;
use smartstring::alias::String;

/// Interned symbol names, indexed in insertion order.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Symtab {
    set: IndexSet<String>,
}

impl Symtab {
    pub fn new() -> Self {
        Self {
            set: IndexSet::new(),
        }
    }

    /// Index of `sym`, adding it first if needed.
    pub fn add(&mut self, sym: &str) -> usize {
        match self.set.get_index_of(sym) {
            Some(idx) => idx,
            None => self.set.insert_full(String::from(sym)).0,
        }
    }

    pub fn iter(&self) -> indexmap::set::Iter<'_, String> {
        self.set.iter()
    }

    pub fn idx(&self, sym: &str) -> Option<usize> {
        self.set.get_index_of(sym)
    }

    pub fn sym(&self, idx: usize) -> Option<&str> {
        self.set.get_index(idx).map(|x| x.as_str())
    }

    pub fn contains(&self, sym: &str) -> bool {
        self.set.contains(sym)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::Symtab;

    #[test]
    fn test_new_is_empty() {
        let st = Symtab::new();
        assert!(st.is_empty());
        assert_eq!(st.idx("anything"), None);
        assert_eq!(st.sym(0), None);
    }

    #[test]
    fn test_add_and_retrieve() {
        let mut st = Symtab::new();
        assert_eq!(st.add("expr"), 0);
        assert_eq!(st.add("term"), 1);
        assert_eq!(st.idx("term"), Some(1));
        assert_eq!(st.sym(0), Some("expr"));
        assert!(st.contains("expr"));
    }

    #[test]
    fn test_duplicate_add_returns_same_index() {
        let mut st = Symtab::new();
        let first = st.add("ID");
        let second = st.add("ID");
        assert_eq!(first, second);
        assert_eq!(st.len(), 1);
        assert_eq!(st.sym(1), None);
    }
}
