use core::fmt;

use crate::path::Path;

/// Generates a [`Choice`](crate::choice::Choice) when reached, unless its
/// condition fails or it is once-only and already visited.
#[derive(Clone, Debug)]
pub struct ChoicePoint {
    pub has_condition: bool,
    pub has_start_content: bool,
    pub has_choice_only_content: bool,
    pub is_invisible_default: bool,
    pub once_only: bool,
    pub path_on_choice: Path,
}

impl ChoicePoint {
    pub fn new(flags: i32, path_string_on_choice: &str) -> Self {
        Self {
            has_condition: (flags & 1) > 0,
            has_start_content: (flags & 2) > 0,
            has_choice_only_content: (flags & 4) > 0,
            is_invisible_default: (flags & 8) > 0,
            once_only: (flags & 16) > 0,
            path_on_choice: Path::new_with_components_string(path_string_on_choice),
        }
    }

    pub fn get_flags(&self) -> i32 {
        let mut flags = 0;
        if self.has_condition {
            flags |= 1;
        }
        if self.has_start_content {
            flags |= 2;
        }
        if self.has_choice_only_content {
            flags |= 4;
        }
        if self.is_invisible_default {
            flags |= 8;
        }
        if self.once_only {
            flags |= 16;
        }
        flags
    }
}

impl fmt::Display for ChoicePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Choice: -> {}", self.path_on_choice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_round_trip() {
        for flags in [0, 1, 2, 5, 8, 16, 31] {
            assert_eq!(flags, ChoicePoint::new(flags, "a.b").get_flags());
        }
    }
}
