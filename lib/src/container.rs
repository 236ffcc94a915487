//! The compiled story content, stored as an arena of containers.
use std::{collections::HashMap, fmt};

use crate::{
    object::RTObject,
    path::{Component, Path},
    pointer::Pointer,
    story_error::StoryError,
    value_type::ValueType,
};

const COUNTFLAGS_VISITS: i32 = 1;
const COUNTFLAGS_TURNS: i32 = 2;
const COUNTFLAGS_COUNTSTARTONLY: i32 = 4;

/// Index of a [`Container`] in its [`ContainerArena`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ContainerId(pub(crate) usize);

/// A knot, stitch, gather, choice body or any other block of content.
#[derive(Debug)]
pub struct Container {
    pub name: Option<String>,
    pub content: Vec<RTObject>,
    pub named_content: HashMap<String, ContainerId>,
    pub parent: Option<ContainerId>,
    pub visits_should_be_counted: bool,
    pub turn_index_should_be_counted: bool,
    pub counting_at_start_only: bool,
    path: Path,
}

impl Container {
    pub fn new(name: Option<String>, count_flags: i32) -> Container {
        Container {
            name,
            content: Vec::new(),
            named_content: HashMap::new(),
            parent: None,
            visits_should_be_counted: (count_flags & COUNTFLAGS_VISITS) > 0,
            turn_index_should_be_counted: (count_flags & COUNTFLAGS_TURNS) > 0,
            counting_at_start_only: (count_flags & COUNTFLAGS_COUNTSTARTONLY) > 0,
            path: Path::default(),
        }
    }

    pub fn has_valid_name(&self) -> bool {
        self.name.as_ref().is_some_and(|n| !n.is_empty())
    }

    pub fn get_path(&self) -> &Path {
        &self.path
    }
}

/// Owns every container of a compiled story. Containers refer to each other
/// by [`ContainerId`]; the root is always the first one.
#[derive(Debug, Default)]
pub struct ContainerArena {
    containers: Vec<Container>,
}

impl ContainerArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, container: Container) -> ContainerId {
        self.containers.push(container);
        ContainerId(self.containers.len() - 1)
    }

    pub fn root(&self) -> ContainerId {
        ContainerId(0)
    }

    pub fn get(&self, id: ContainerId) -> &Container {
        &self.containers[id.0]
    }

    /// Every container of the story, in load order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Container> {
        self.containers.iter()
    }

    pub(crate) fn get_mut(&mut self, id: ContainerId) -> &mut Container {
        &mut self.containers[id.0]
    }

    /// Appends `obj` to the content of `parent`. Named child containers are
    /// also reachable by name.
    pub(crate) fn add_content(&mut self, parent: ContainerId, obj: RTObject) {
        if let RTObject::Container(child) = &obj {
            let child = *child;
            self.get_mut(child).parent = Some(parent);
            if let Some(name) = self.get(child).name.clone().filter(|n| !n.is_empty()) {
                self.get_mut(parent).named_content.insert(name, child);
            }
        }

        self.get_mut(parent).content.push(obj);
    }

    pub(crate) fn add_named_only(&mut self, parent: ContainerId, name: String, child: ContainerId) {
        self.get_mut(child).parent = Some(parent);
        self.get_mut(child).name = Some(name.clone());
        self.get_mut(parent).named_content.insert(name, child);
    }

    /// Computes container paths and rewrites every relative path found in
    /// the content to its absolute form. Called once after loading.
    pub(crate) fn finalize(&mut self) {
        let root = self.root();
        self.get_mut(root).path = Path::default();
        self.assign_paths(root);

        for id in 0..self.containers.len() {
            let container_path = self.containers[id].path.clone();

            for (i, obj) in self.containers[id].content.iter_mut().enumerate() {
                let own_path = container_path.path_by_appending_component(Component::new_i(i));
                let absolute = |p: &mut Path| {
                    if p.is_relative() {
                        *p = own_path.path_by_appending_path(p);
                    }
                };

                match obj {
                    RTObject::Divert(d) if !d.is_external => {
                        if let Some(p) = d.target_path.as_mut() {
                            absolute(p);
                        }
                    }
                    RTObject::ChoicePoint(cp) => absolute(&mut cp.path_on_choice),
                    RTObject::VariableReference(vr) => {
                        if let Some(p) = vr.path_for_count.as_mut() {
                            absolute(p);
                        }
                    }
                    RTObject::Value(ValueType::DivertTarget(p)) => absolute(p),
                    _ => {}
                }
            }
        }
    }

    fn assign_paths(&mut self, id: ContainerId) {
        let parent_path = self.get(id).path.clone();

        let mut children: Vec<(ContainerId, Component)> = Vec::new();
        for (i, obj) in self.get(id).content.iter().enumerate() {
            if let RTObject::Container(child) = obj {
                let c = self.get(*child);
                let comp = match &c.name {
                    Some(name) if c.has_valid_name() => Component::new(name),
                    _ => Component::new_i(i),
                };
                children.push((*child, comp));
            }
        }
        for (name, child) in self.get(id).named_content.iter() {
            if !children.iter().any(|(c, _)| c == child) {
                children.push((*child, Component::new(name)));
            }
        }

        for (child, comp) in children {
            self.get_mut(child).path = parent_path.path_by_appending_component(comp);
            self.assign_paths(child);
        }
    }

    fn content_with_path_component(
        &self,
        container: ContainerId,
        component: &Component,
    ) -> Option<RTObject> {
        let c = self.get(container);
        match component {
            Component::Index(i) => c.content.get(*i).cloned(),
            _ if component.is_parent() => c.parent.map(RTObject::Container),
            Component::Name(name) => c.named_content.get(name).map(|id| RTObject::Container(*id)),
        }
    }

    /// Walks the first `len` components of `path` from the root. Only
    /// succeeds if every component exists.
    fn container_at_path(&self, path: &Path, len: usize) -> Option<ContainerId> {
        let mut current = self.root();
        for comp in &path.components()[..len] {
            match self.content_with_path_component(current, comp)? {
                RTObject::Container(id) => current = id,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Resolves a path whose every component names a container.
    pub(crate) fn container_with_path(&self, path: &Path) -> Option<ContainerId> {
        self.container_at_path(path, path.len())
    }

    /// Resolves an absolute path to the content object it names.
    pub fn content_at_path(&self, path: &Path) -> Option<RTObject> {
        if path.is_empty() {
            return Some(RTObject::Container(self.root()));
        }

        let parent = self.container_at_path(path, path.len() - 1)?;
        let last = path.get_last_component()?;
        self.content_with_path_component(parent, last)
    }

    /// Resolves a path to a pointer. A path ending in an index points at that
    /// slot of its container; otherwise it points at the container itself.
    pub fn pointer_at_path(&self, path: &Path) -> Result<Pointer, StoryError> {
        if path.is_empty() {
            return Ok(Pointer::NULL);
        }

        let not_found = || {
            StoryError::PathNotFound(format!(
                "Failed to find content at path '{}', and no approximation of it was possible.",
                path
            ))
        };

        match path.get_last_component() {
            Some(Component::Index(index)) => {
                let container = self
                    .container_at_path(path, path.len() - 1)
                    .ok_or_else(not_found)?;
                Ok(Pointer::new(Some(container), *index as i32))
            }
            _ => {
                let container = self
                    .container_at_path(path, path.len())
                    .ok_or_else(not_found)?;
                Ok(Pointer::new(Some(container), -1))
            }
        }
    }

    pub fn knot_container_with_name(&self, name: &str) -> Option<ContainerId> {
        self.get(self.root()).named_content.get(name).copied()
    }

    /// Debug view of the content tree, marking the object at `pointer`.
    pub fn build_string_of_hierarchy(
        &self,
        sb: &mut String,
        id: ContainerId,
        indentation: usize,
        pointed: Option<&Pointer>,
    ) {
        let container = self.get(id);
        append_indentation(sb, indentation);

        sb.push('[');

        if let Some(name) = container.name.as_ref().filter(|_| container.has_valid_name()) {
            sb.push_str(" ({");
            sb.push_str(name);
            sb.push_str("})");
        }

        if pointed.is_some_and(|p| p.container == Some(id) && p.index < 0) {
            sb.push_str("  <---");
        }

        sb.push('\n');
        let inner = indentation + 1;

        for (i, obj) in container.content.iter().enumerate() {
            match obj {
                RTObject::Container(c) => self.build_string_of_hierarchy(sb, *c, inner, pointed),
                RTObject::Value(ValueType::String(s)) => {
                    append_indentation(sb, inner);
                    sb.push('"');
                    sb.push_str(&s.string.replace('\n', "\\n"));
                    sb.push('"');
                }
                other => {
                    append_indentation(sb, inner);
                    sb.push_str(&other.to_string());
                }
            }

            if i != container.content.len() - 1 {
                sb.push(',');
            }

            if pointed.is_some_and(|p| p.container == Some(id) && p.index == i as i32) {
                sb.push_str("  <---");
            }

            sb.push('\n');
        }

        let only_named: Vec<(&String, &ContainerId)> = container
            .named_content
            .iter()
            .filter(|(_, child)| {
                !container
                    .content
                    .iter()
                    .any(|o| matches!(o, RTObject::Container(c) if c == *child))
            })
            .collect();

        if !only_named.is_empty() {
            append_indentation(sb, inner);
            sb.push_str("-- named: --\n");

            for (_, child) in only_named {
                self.build_string_of_hierarchy(sb, *child, inner, pointed);
                sb.push('\n');
            }
        }

        append_indentation(sb, indentation);
        sb.push(']');
    }
}

fn append_indentation(sb: &mut String, indentation: usize) {
    const SPACES_PER_INDENT: usize = 4;
    sb.push_str(&" ".repeat(SPACES_PER_INDENT * indentation));
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Container({})", self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{divert::Divert, push_pop::PushPopType};

    fn sample() -> ContainerArena {
        // root: [ "a", knot{ [ "b", -> .^.^.other ] }, (named) other ]
        let mut arena = ContainerArena::new();
        let root = arena.add(Container::new(None, 0));
        arena.add_content(root, RTObject::Value(ValueType::new("a")));

        let knot = arena.add(Container::new(Some("knot".to_owned()), 1));
        arena.add_content(knot, RTObject::Value(ValueType::new("b")));
        arena.add_content(
            knot,
            RTObject::Divert(Divert::new(
                false,
                PushPopType::Function,
                false,
                0,
                false,
                None,
                Some(".^.^.other"),
            )),
        );
        arena.add_content(root, RTObject::Container(knot));

        let other = arena.add(Container::new(None, 0));
        arena.add_named_only(root, "other".to_owned(), other);

        arena.finalize();
        arena
    }

    #[test]
    fn container_paths_use_names() {
        let arena = sample();
        let knot = arena.knot_container_with_name("knot").unwrap();
        assert_eq!("knot", arena.get(knot).get_path().to_string());
    }

    #[test]
    fn relative_diverts_become_absolute() {
        let arena = sample();
        let knot = arena.knot_container_with_name("knot").unwrap();
        match &arena.get(knot).content[1] {
            RTObject::Divert(d) => {
                assert_eq!("other", d.target_path.as_ref().unwrap().to_string())
            }
            _ => panic!("expected divert"),
        }
    }

    #[test]
    fn resolving_the_same_path_twice_gives_equal_pointers() {
        let arena = sample();
        let p = Path::new_with_components_string("knot.1");
        assert_eq!(arena.pointer_at_path(&p).unwrap(), arena.pointer_at_path(&p).unwrap());
    }

    #[test]
    fn unknown_path_is_an_error() {
        let arena = sample();
        let p = Path::new_with_components_string("nope.0");
        assert!(matches!(
            arena.pointer_at_path(&p),
            Err(StoryError::PathNotFound(_))
        ));
    }
}
