//! Qualified test names
//!
//! Test names are dotted identifiers such as `aws.imds.test.parseJsonField`.
//! The `.test.` separator splits them into a module and a display name, and
//! four reserved suffixes mark lifecycle hooks.

use std::fmt;

/// Separator between the module path and the test's own name
pub const SEPARATOR: &str = ".test.";

/// A name split into its module and display parts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualifiedName<'a> {
    /// Everything before the rightmost separator (empty if none)
    pub module: &'a str,
    /// Everything after the rightmost separator (whole name if none)
    pub display: &'a str,
}

/// Split `name` at the rightmost `.test.`.
///
/// A display portion that itself contains the separator is split at its
/// last occurrence: `foo.test.test.my test` is module `foo.test`, test
/// `my test`.
pub fn decompose(name: &str) -> QualifiedName<'_> {
    match name.rfind(SEPARATOR) {
        Some(idx) => QualifiedName {
            module: &name[..idx],
            display: &name[idx + SEPARATOR.len()..],
        },
        None => QualifiedName {
            module: "",
            display: name,
        },
    }
}

/// Grouping key for hook association: the text before the *first* `.test.`.
///
/// Hooks and the tests they guard must resolve to the same key, so this is
/// deliberately independent of [`decompose`].
pub fn module_prefix(name: &str) -> &str {
    name.find(SEPARATOR).map_or("", |idx| &name[..idx])
}

/// Lifecycle hook kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    BeforeAll,
    AfterAll,
    BeforeEach,
    AfterEach,
}

impl HookKind {
    pub const ALL: [HookKind; 4] = [
        HookKind::BeforeAll,
        HookKind::AfterAll,
        HookKind::BeforeEach,
        HookKind::AfterEach,
    ];

    /// Reserved name suffix, including the leading dot
    pub fn suffix(self) -> &'static str {
        match self {
            HookKind::BeforeAll => ".zest.beforeAll",
            HookKind::AfterAll => ".zest.afterAll",
            HookKind::BeforeEach => ".zest.beforeEach",
            HookKind::AfterEach => ".zest.afterEach",
        }
    }

    /// Label used in `HOOK FAIL` lines
    pub fn label(self) -> &'static str {
        match self {
            HookKind::BeforeAll => "beforeAll",
            HookKind::AfterAll => "afterAll",
            HookKind::BeforeEach => "beforeEach",
            HookKind::AfterEach => "afterEach",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a name as a hook, or `None` for a regular test
pub fn hook_kind(name: &str) -> Option<HookKind> {
    HookKind::ALL
        .into_iter()
        .find(|kind| name.ends_with(kind.suffix()))
}
