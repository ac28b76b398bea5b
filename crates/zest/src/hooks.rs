//! Module registry - hook grouping index plus per-module lifecycle flags
//!
//! Built once per run from the full test list. Each module gets a single
//! record holding its four hook lists (indices into the test list, in
//! discovery order) and the coordinator's lifecycle flags.

use crate::case::TestCase;
use crate::error::RunResult;
use crate::name::{hook_kind, module_prefix, HookKind};
use std::collections::HashMap;

/// Index of a module in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(usize);

/// Hooks and lifecycle state for one module
#[derive(Debug, Default)]
pub struct ModuleEntry {
    key: String,
    before_all: Vec<usize>,
    after_all: Vec<usize>,
    before_each: Vec<usize>,
    after_each: Vec<usize>,
    /// beforeAll hooks have run (or been tried); they never run twice
    pub before_all_attempted: bool,
    /// A beforeAll hook failed; remaining tests are skipped
    pub skipped: bool,
    touched: bool,
}

impl ModuleEntry {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ..Default::default()
        }
    }

    /// Grouping key (text before the first `.test.`)
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Hook indices of the given kind, in discovery order
    pub fn hooks(&self, kind: HookKind) -> &[usize] {
        match kind {
            HookKind::BeforeAll => &self.before_all,
            HookKind::AfterAll => &self.after_all,
            HookKind::BeforeEach => &self.before_each,
            HookKind::AfterEach => &self.after_each,
        }
    }

    fn hooks_mut(&mut self, kind: HookKind) -> &mut Vec<usize> {
        match kind {
            HookKind::BeforeAll => &mut self.before_all,
            HookKind::AfterAll => &mut self.after_all,
            HookKind::BeforeEach => &mut self.before_each,
            HookKind::AfterEach => &mut self.after_each,
        }
    }

    /// At least one regular test of this module was encountered
    pub fn is_touched(&self) -> bool {
        self.touched
    }
}

/// Registry of every module seen in a run
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    entries: Vec<ModuleEntry>,
    index: HashMap<String, ModuleId>,
    touch_order: Vec<ModuleId>,
}

impl ModuleRegistry {
    /// Group every hook in `tests` under its module
    pub fn build(tests: &[TestCase]) -> RunResult<Self> {
        let mut registry = Self::default();

        for (position, test) in tests.iter().enumerate() {
            let Some(kind) = hook_kind(test.name()) else {
                continue;
            };
            let id = registry.get_or_insert(module_prefix(test.name()))?;
            let list = registry.entries[id.0].hooks_mut(kind);
            list.try_reserve(1)?;
            list.push(position);
        }

        tracing::debug!(modules = registry.entries.len(), "hook index built");
        Ok(registry)
    }

    /// Look up a module without creating it
    pub fn lookup(&self, key: &str) -> Option<ModuleId> {
        self.index.get(key).copied()
    }

    /// Record that a regular test of `key` was encountered, creating the
    /// module on first sight
    pub fn touch(&mut self, key: &str) -> RunResult<ModuleId> {
        let id = self.get_or_insert(key)?;
        let entry = &mut self.entries[id.0];
        if !entry.touched {
            self.touch_order.try_reserve(1)?;
            entry.touched = true;
            self.touch_order.push(id);
        }
        Ok(id)
    }

    pub fn entry(&self, id: ModuleId) -> &ModuleEntry {
        &self.entries[id.0]
    }

    pub fn entry_mut(&mut self, id: ModuleId) -> &mut ModuleEntry {
        &mut self.entries[id.0]
    }

    /// Touched modules in the order their first test ran
    pub fn touched(&self) -> &[ModuleId] {
        &self.touch_order
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get_or_insert(&mut self, key: &str) -> RunResult<ModuleId> {
        if let Some(id) = self.lookup(key) {
            return Ok(id);
        }

        self.entries.try_reserve(1)?;
        self.index.try_reserve(1)?;

        let id = ModuleId(self.entries.len());
        self.entries.push(ModuleEntry::new(key));
        self.index.insert(key.to_string(), id);
        Ok(id)
    }
}
