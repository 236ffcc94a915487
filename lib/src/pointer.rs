use std::fmt;

use crate::{
    container::{ContainerArena, ContainerId},
    object::RTObject,
    path::{Component, Path},
};

/// The instruction pointer: a container and an index into its content.
/// An index of -1 points at the container itself.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Pointer {
    pub container: Option<ContainerId>,
    pub index: i32,
}

impl Default for Pointer {
    fn default() -> Self {
        Pointer::NULL
    }
}

impl Pointer {
    pub const NULL: Pointer = Pointer::new(None, -1);

    pub const fn new(container: Option<ContainerId>, index: i32) -> Pointer {
        Pointer { container, index }
    }

    pub fn start_of(container: ContainerId) -> Pointer {
        Pointer {
            container: Some(container),
            index: 0,
        }
    }

    pub fn is_null(&self) -> bool {
        self.container.is_none()
    }

    pub fn resolve(&self, content: &ContainerArena) -> Option<RTObject> {
        let id = self.container?;

        if self.index < 0 {
            return Some(RTObject::Container(id));
        }

        let container = content.get(id);
        if container.content.is_empty() {
            return Some(RTObject::Container(id));
        }

        container.content.get(self.index as usize).cloned()
    }

    pub fn get_path(&self, content: &ContainerArena) -> Option<Path> {
        let id = self.container?;
        let container_path = content.get(id).get_path();

        if self.index >= 0 {
            Some(container_path.path_by_appending_component(Component::new_i(self.index as usize)))
        } else {
            Some(container_path.clone())
        }
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.container {
            Some(container) => write!(f, "Ink Pointer -> {} -- index {}", container.0, self.index),
            None => write!(f, "Ink Pointer (null)"),
        }
    }
}
