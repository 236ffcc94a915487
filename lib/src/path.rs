use std::{
    fmt,
    hash::{Hash, Hasher},
};

const PARENT_ID: &str = "^";

/// Dot separated address into the content tree, like `knot.stitch.3`.
///
/// Relative paths start with a `.` and may climb with `^` components, as in
/// `.^.^.hello.5`, the file system equivalent of `../../hello/5`.
#[derive(Eq, Clone, Default, Debug)]
pub struct Path {
    components: Vec<Component>,
    is_relative: bool,
}

impl Path {
    pub fn new(components: &[Component], relative: bool) -> Path {
        Path {
            components: components.to_vec(),
            is_relative: relative,
        }
    }

    pub fn new_with_components_string(components_string: &str) -> Path {
        // Empty path, empty components (path to root, like "/")
        if components_string.is_empty() {
            return Path::default();
        }

        let (is_relative, cs) = match components_string.strip_prefix('.') {
            Some(rest) => (true, rest),
            None => (false, components_string),
        };

        let components = cs
            .split('.')
            .filter(|s| !s.is_empty())
            .map(|s| match s.parse::<usize>() {
                Ok(index) => Component::new_i(index),
                Err(_) => Component::new(s),
            })
            .collect();

        Path {
            components,
            is_relative,
        }
    }

    pub fn get_self() -> Path {
        Path {
            components: Vec::new(),
            is_relative: true,
        }
    }

    pub fn get_component(&self, index: usize) -> Option<&Component> {
        self.components.get(index)
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn is_relative(&self) -> bool {
        self.is_relative
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn get_head(&self) -> Option<&Component> {
        self.components.first()
    }

    pub fn get_tail(&self) -> Path {
        if self.components.len() >= 2 {
            Path::new(&self.components[1..], false)
        } else {
            Path::get_self()
        }
    }

    pub fn get_last_component(&self) -> Option<&Component> {
        self.components.last()
    }

    pub fn contains_named_component(&self) -> bool {
        self.components.iter().any(|c| !c.is_index())
    }

    /// Resolves `path_to_append` against this path. Leading `^` components in
    /// the appended path climb one level each.
    pub fn path_by_appending_path(&self, path_to_append: &Path) -> Path {
        let upward_moves = path_to_append
            .components
            .iter()
            .take_while(|c| c.is_parent())
            .count();

        let keep = self.components.len().saturating_sub(upward_moves);

        let mut components = Vec::with_capacity(keep + path_to_append.len() - upward_moves);
        components.extend_from_slice(&self.components[..keep]);
        components.extend_from_slice(&path_to_append.components[upward_moves..]);

        Path {
            components,
            is_relative: false,
        }
    }

    pub fn path_by_appending_component(&self, c: Component) -> Path {
        let mut p = Path::new(&self.components, false);
        p.components.push(c);
        p
    }

    pub fn get_components_string(&self) -> String {
        let joined = self
            .components
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<String>>()
            .join(".");

        if self.is_relative {
            format!(".{joined}")
        } else {
            joined
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get_components_string())
    }
}

impl Hash for Path {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.is_relative.hash(state);
        self.components.hash(state);
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.is_relative == other.is_relative && self.components == other.components
    }
}

#[derive(Eq, PartialEq, Hash, Clone, Debug)]
pub enum Component {
    Index(usize),
    Name(String),
}

impl Component {
    pub fn new(name: &str) -> Component {
        Component::Name(name.to_owned())
    }

    pub fn new_i(index: usize) -> Component {
        Component::Index(index)
    }

    pub fn to_parent() -> Component {
        Component::new(PARENT_ID)
    }

    pub fn is_index(&self) -> bool {
        matches!(self, Component::Index(_))
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            Component::Index(i) => Some(*i),
            Component::Name(_) => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Component::Index(_) => None,
            Component::Name(n) => Some(n),
        }
    }

    pub fn is_parent(&self) -> bool {
        matches!(self, Component::Name(n) if n == PARENT_ID)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Index(i) => write!(f, "{i}"),
            Component::Name(n) => write!(f, "{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_relative_paths() {
        let p = Path::new_with_components_string(".^.^.hello.5");
        assert!(p.is_relative());
        assert_eq!(4, p.len());
        assert!(p.get_component(0).unwrap().is_parent());
        assert_eq!(Some(5), p.get_last_component().unwrap().index());
        assert_eq!(".^.^.hello.5", p.to_string());
    }

    #[test]
    fn appending_climbs_parents() {
        let base = Path::new_with_components_string("knot.stitch.0");
        let rel = Path::new_with_components_string(".^.^.other.2");
        let abs = base.path_by_appending_path(&rel);
        assert_eq!("knot.other.2", abs.to_string());
    }

    #[test]
    fn equal_strings_give_equal_paths() {
        let a = Path::new_with_components_string("a.b.3");
        let b = Path::new_with_components_string("a.b.3");
        assert_eq!(a, b);
        assert_ne!(a, Path::new_with_components_string(".a.b.3"));
    }
}
