//! # Birth Places Shared With Instrumented Code
//!
//! Instrumented code only needs to name where a unit of work was created.
//! This crate holds that leaf type so call sites can depend on it without
//! pulling in the tracking service.
//!
//! ## Key Types
//!
//! - [`Location`] - `(file, function, line)` triple identifying a call site
//! - [`here!`] - builds the [`Location`] of the line it is expanded on
//!
//! The strings inside a [`Location`] are `&'static str` produced by `file!()`
//! and the function-name trick in [`function_name!`], so they live for the
//! whole process and can be compared by address before falling back to a
//! content comparison.

#![cfg_attr(not(test), no_std)]

use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};

// ============================================================================
// Location
// ============================================================================

/// Call site where a tracked unit of work was born.
///
/// Two locations are equal iff file, function and line are all equal.
/// Interned strings make the address check succeed almost always; content
/// comparison keeps equality correct when the same text lives at two
/// addresses (e.g. the same file name emitted by two crates).
#[derive(Clone, Copy, Debug)]
pub struct Location {
    file: &'static str,
    function: &'static str,
    line: u32,
}

impl Location {
    /// Create a location from its parts.
    #[must_use]
    pub const fn new(file: &'static str, function: &'static str, line: u32) -> Self {
        Self { file, function, line }
    }

    /// Source file of the call site, as reported by `file!()`.
    #[must_use]
    pub const fn file(&self) -> &'static str {
        self.file
    }

    /// Fully qualified function containing the call site.
    #[must_use]
    pub const fn function(&self) -> &'static str {
        self.function
    }

    /// Line number of the call site.
    #[must_use]
    pub const fn line(&self) -> u32 {
        self.line
    }
}

/// Compare two interned strings, trying the cheap address check first.
fn same_str(a: &'static str, b: &'static str) -> bool {
    core::ptr::eq(a, b) || a == b
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.line == other.line
            && same_str(self.file, other.file)
            && same_str(self.function, other.function)
    }
}

impl Eq for Location {}

// Hashes content, never addresses, so it agrees with the content fallback in `eq`.
impl Hash for Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.file.hash(state);
        self.function.hash(state);
        self.line.hash(state);
    }
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> Ordering {
        self.file
            .cmp(other.file)
            .then_with(|| self.function.cmp(other.function))
            .then_with(|| self.line.cmp(&other.line))
    }
}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}] {}", self.file, self.line, self.function)
    }
}

// ============================================================================
// Call-site macros
// ============================================================================

/// Strip the helper suffix left by [`function_name!`].
///
/// `core::any::type_name` of a nested `fn f` reads `path::to::caller::f`, and
/// inside closures `path::to::caller::{{closure}}::f`. Both reduce to
/// `path::to::caller`.
#[must_use]
pub fn trim_function_path(raw: &'static str) -> &'static str {
    let mut name = raw.strip_suffix("::f").unwrap_or(raw);
    while let Some(outer) = name.strip_suffix("::{{closure}}") {
        name = outer;
    }
    name
}

/// Expand to the fully qualified name of the enclosing function.
#[macro_export]
macro_rules! function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::core::any::type_name::<T>()
        }
        $crate::trim_function_path(type_name_of(f))
    }};
}

/// Expand to the [`Location`] of the line the macro is written on.
///
/// ```
/// use tasktrack_common::here;
///
/// # fn main() {
/// let loc = here!();
/// assert!(loc.file().ends_with(".rs"));
/// assert!(loc.function().ends_with("main"));
/// # }
/// ```
#[macro_export]
macro_rules! here {
    () => {
        $crate::Location::new(::core::file!(), $crate::function_name!(), ::core::line!())
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(loc: &Location) -> u64 {
        let mut hasher = DefaultHasher::new();
        loc.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_equal_by_content_when_not_interned() {
        // Leak two distinct allocations holding the same text
        let file_a: &'static str = Box::leak(String::from("src/a.rs").into_boxed_str());
        let file_b: &'static str = Box::leak(String::from("src/a.rs").into_boxed_str());
        assert!(!core::ptr::eq(file_a, file_b));

        let a = Location::new(file_a, "run", 10);
        let b = Location::new(file_b, "run", 10);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_line_distinguishes_locations() {
        let a = Location::new("src/a.rs", "run", 10);
        let b = Location::new("src/a.rs", "run", 11);
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn test_here_names_enclosing_function() {
        let loc = here!();
        assert!(loc.file().ends_with("lib.rs"));
        assert!(loc.function().ends_with("test_here_names_enclosing_function"));
    }

    #[test]
    fn test_here_inside_closure_names_outer_function() {
        let make = || here!();
        let loc = make();
        assert!(loc.function().ends_with("test_here_inside_closure_names_outer_function"));
    }

    #[test]
    fn test_display() {
        let loc = Location::new("src/a.rs", "app::run", 7);
        assert_eq!(loc.to_string(), "src/a.rs[7] app::run");
    }
}
