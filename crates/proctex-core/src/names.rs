//! Identifier generation for MaterialX elements
//!
//! MaterialX names are restricted to ASCII letters, digits and underscores,
//! and must be unique among siblings. Names arriving from glTF may be
//! missing, invalid or colliding; everything here turns them into names the
//! native document accepts without ever reusing one.

use std::collections::HashSet;

/// Replace every character that is not allowed in a MaterialX name with `_`
pub fn create_valid_name(name: &str) -> String {
    if name.is_empty() {
        return "_".to_string();
    }
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Bump the numeric suffix of a name: `node` -> `node2`, `node9` -> `node10`
pub fn increment_name(name: &str) -> String {
    let prefix = name.trim_end_matches(|c: char| c.is_ascii_digit());
    let suffix = &name[prefix.len()..];
    match suffix.parse::<u64>() {
        Ok(number) => match number.checked_add(1) {
            Some(next) => format!("{prefix}{next}"),
            None => format!("{name}_2"),
        },
        Err(_) => format!("{name}2"),
    }
}

/// Name MaterialX gives an unnamed element of a category
pub fn default_name(category: &str) -> String {
    format!("{category}1")
}

/// Hands out unique valid names within one scope
#[derive(Debug, Default, Clone)]
pub struct NameAllocator {
    used: HashSet<String>,
}

impl NameAllocator {
    /// Create an allocator with no names taken
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a name as taken without allocating it
    pub fn reserve(&mut self, name: impl Into<String>) {
        self.used.insert(name.into());
    }

    /// Whether a name is already taken
    pub fn contains(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    /// Allocate the first free valid name derived from `base`
    pub fn allocate(&mut self, base: &str) -> String {
        let mut name = create_valid_name(base);
        while self.used.contains(&name) {
            name = increment_name(&name);
        }
        self.used.insert(name.clone());
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_valid_name() {
        assert_eq!(create_valid_name("base color"), "base_color");
        assert_eq!(create_valid_name("N_mix-1"), "N_mix_1");
        assert_eq!(create_valid_name("ok_name2"), "ok_name2");
        assert_eq!(create_valid_name(""), "_");
    }

    #[test]
    fn test_increment_name() {
        assert_eq!(increment_name("node"), "node2");
        assert_eq!(increment_name("node1"), "node2");
        assert_eq!(increment_name("node9"), "node10");
        assert_eq!(increment_name("42"), "43");
    }

    #[test]
    fn test_increment_huge_suffix() {
        let max = format!("n{}", u64::MAX);
        assert_eq!(increment_name(&max), format!("{max}_2"));

        let mut names = NameAllocator::new();
        assert_eq!(names.allocate(&max), max);
        assert_ne!(names.allocate(&max), max);
    }

    #[test]
    fn test_allocator_never_repeats() {
        let mut names = NameAllocator::new();
        assert_eq!(names.allocate("multiply1"), "multiply1");
        assert_eq!(names.allocate("multiply1"), "multiply2");
        assert_eq!(names.allocate("multiply2"), "multiply3");
        names.reserve("out");
        assert_eq!(names.allocate("out"), "out2");
        assert!(names.contains("out2"));
    }
}
