use std::{collections::HashMap, rc::Rc};

/// A string keyed map that can be shared with copies of the state taken for
/// a background save. While patching, writes go to an overlay and the
/// shared base is left as the copy saw it.
#[derive(Clone, Debug)]
pub(crate) struct PatchedMap<V> {
    base: Rc<HashMap<String, V>>,
    patch: Option<HashMap<String, V>>,
}

impl<V> Default for PatchedMap<V> {
    fn default() -> Self {
        PatchedMap {
            base: Rc::new(HashMap::new()),
            patch: None,
        }
    }
}

impl<V> From<HashMap<String, V>> for PatchedMap<V> {
    fn from(map: HashMap<String, V>) -> Self {
        PatchedMap {
            base: Rc::new(map),
            patch: None,
        }
    }
}

impl<V: Clone> PatchedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.patch
            .as_ref()
            .and_then(|patch| patch.get(key))
            .or_else(|| self.base.get(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn insert(&mut self, key: String, value: V) {
        match &mut self.patch {
            Some(patch) => {
                patch.insert(key, value);
            }
            None => {
                Rc::make_mut(&mut self.base).insert(key, value);
            }
        }
    }

    pub fn start_patching(&mut self) {
        self.patch.get_or_insert_with(HashMap::new);
    }

    /// Folds the overlay into the base. The base is copied first if a saved
    /// copy still holds it.
    pub fn apply_patch(&mut self) {
        if let Some(patch) = self.patch.take() {
            if !patch.is_empty() {
                Rc::make_mut(&mut self.base).extend(patch);
            }
        }
    }

    /// Every entry, with patched values hiding the ones they replace.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &V)> {
        let patch = self.patch.as_ref();

        patch.into_iter().flatten().chain(
            self.base
                .iter()
                .filter(move |(k, _)| !patch.is_some_and(|p| p.contains_key(k.as_str()))),
        )
    }

    pub fn to_map(&self) -> HashMap<String, V> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patched_writes_leave_the_shared_base_alone() {
        let mut live: PatchedMap<i32> = PatchedMap::new();
        live.insert("a".to_owned(), 1);

        let saved = live.clone();
        live.start_patching();
        live.insert("a".to_owned(), 2);
        live.insert("b".to_owned(), 3);

        assert_eq!(Some(&1), saved.get("a"));
        assert!(!saved.contains_key("b"));
        assert_eq!(Some(&2), live.get("a"));
        assert_eq!(2, live.iter().count());

        live.apply_patch();

        assert_eq!(Some(&2), live.get("a"));
        assert_eq!(Some(&3), live.get("b"));
        assert_eq!(Some(&1), saved.get("a"));
    }

    #[test]
    fn writes_without_patch_do_not_reach_clones() {
        let mut live: PatchedMap<i32> = PatchedMap::new();
        live.insert("a".to_owned(), 1);

        let snapshot = live.clone();
        live.insert("a".to_owned(), 5);

        assert_eq!(Some(&1), snapshot.get("a"));
        assert_eq!(Some(&5), live.get("a"));
    }
}
