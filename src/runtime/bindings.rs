use crate::lang::value::{NameId, StackValue};
use crate::runtime::materialize::materialize;
use std::collections::HashMap;
use std::rc::Rc;

// =============================================================================
// BINDING - One named program variable
// =============================================================================

/// Content of one program variable.
///
/// Numbers collapse to 64 bits regardless of the width they were pushed
/// with. String content is always a fully materialized, binding-owned
/// buffer; a binding can never hold a reference into the stack.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Number(f64),
    Str(Rc<str>),
}

impl Default for Binding {
    /// An unwritten variable reads as zero.
    fn default() -> Self {
        Binding::Number(0.0)
    }
}

/// Stable reference to a resolved binding slot.
///
/// Handles stay valid until [`BindingTable::teardown_all`]; using one after
/// teardown is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingHandle(Slot);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Index into the direct store (a static name id).
    Direct(u32),
    /// Index into the fallback slab (a run-time name).
    Named(u32),
}

// =============================================================================
// BINDING TABLE - Dual-strategy variable storage
// =============================================================================

/// Variable storage for one execution instance.
///
/// Names the translator numbered at compile time resolve in O(1) through
/// the direct store; names only known at run time fall back to a hashed
/// lookup. The two stores are independent namespaces: a run-time name is
/// never checked against the direct store, even when its text matches a
/// statically numbered literal.
#[derive(Debug)]
pub struct BindingTable {
    /// Slot per name id, `0..=max_name_id`. Slot 0 is permanently empty;
    /// id 0 routes to the fallback store.
    direct: Vec<Option<Binding>>,

    /// Fallback bindings, slab-indexed so handles stay cheap.
    named: Vec<Binding>,

    /// Lookup key -> slab index. The table owns its copy of each name; the
    /// stack value that supplied the name may die immediately after.
    named_index: HashMap<String, u32>,
}

impl BindingTable {
    /// Build the table for a program whose translator allocated ids up to
    /// `max_name_id`. A table that exists is ready to resolve; there is no
    /// separate initialization step to forget.
    pub fn new(max_name_id: u32) -> Self {
        Self {
            direct: vec![None; max_name_id as usize + 1],
            named: Vec::new(),
            named_index: HashMap::new(),
        }
    }

    /// Resolve a statically numbered name. ( O(1) )
    ///
    /// First reference creates the zero binding. Id 0 is not a static name
    /// and must go through [`BindingTable::resolve_dynamic`]; an id past the
    /// table size means the program and this runtime disagree about the
    /// translator's output, and neither case is recoverable.
    pub fn resolve_static(&mut self, id: NameId) -> BindingHandle {
        if id.is_dynamic() {
            panic!("name id 0 is reserved for run-time resolution and has no direct slot");
        }
        let index = id.index();
        if index >= self.direct.len() {
            panic!(
                "name id {} out of range: the translator declared a maximum of {}",
                id.0,
                self.direct.len().saturating_sub(1)
            );
        }
        self.direct[index].get_or_insert_with(Binding::default);
        BindingHandle(Slot::Direct(id.0))
    }

    /// Resolve a name only known at run time. ( O(name length) hash )
    ///
    /// First reference creates the zero binding and an owned copy of the
    /// name for the key.
    pub fn resolve_dynamic(&mut self, name: &str) -> BindingHandle {
        if let Some(&index) = self.named_index.get(name) {
            return BindingHandle(Slot::Named(index));
        }
        let index = u32::try_from(self.named.len())
            .unwrap_or_else(|_| panic!("fallback store exhausted"));
        self.named.push(Binding::default());
        self.named_index.insert(name.to_owned(), index);
        BindingHandle(Slot::Named(index))
    }

    /// Store a stack value into a binding.
    ///
    /// Numbers copy their payload; string kinds materialize into an owned
    /// buffer. The new content is built before the old one is dropped, so a
    /// self-referential store (the run on the stack still holding the
    /// binding's current buffer) reads intact bytes.
    pub fn store(&mut self, handle: BindingHandle, value: &StackValue) {
        let content = match value {
            StackValue::F32(n) => Binding::Number(f64::from(*n)),
            StackValue::F64(n) => Binding::Number(*n),
            other => Binding::Str(materialize(other)),
        };
        *self.slot_mut(handle) = content;
    }

    /// Read a binding back onto the stack.
    ///
    /// Strings share the binding's buffer rather than copying it, and come
    /// back tagged [`NameId::DYNAMIC`]: a loaded value is plain data, not a
    /// name literal, so it never re-enters the direct-resolution path.
    pub fn load(&self, handle: BindingHandle) -> StackValue {
        match self.slot(handle) {
            Binding::Number(n) => StackValue::F64(*n),
            Binding::Str(text) => StackValue::Str {
                text: Rc::clone(text),
                name: NameId::DYNAMIC,
            },
        }
    }

    /// Borrow a binding's content directly.
    pub fn get(&self, handle: BindingHandle) -> &Binding {
        self.slot(handle)
    }

    /// Drop every binding and name key in both stores.
    ///
    /// Idempotent; outstanding handles become invalid.
    pub fn teardown_all(&mut self) {
        self.direct.clear();
        self.named.clear();
        self.named_index.clear();
    }

    fn slot(&self, handle: BindingHandle) -> &Binding {
        match handle.0 {
            Slot::Direct(id) => self
                .direct
                .get(id as usize)
                .and_then(Option::as_ref)
                .unwrap_or_else(|| panic!("binding handle used after teardown")),
            Slot::Named(index) => self
                .named
                .get(index as usize)
                .unwrap_or_else(|| panic!("binding handle used after teardown")),
        }
    }

    fn slot_mut(&mut self, handle: BindingHandle) -> &mut Binding {
        match handle.0 {
            Slot::Direct(id) => self
                .direct
                .get_mut(id as usize)
                .and_then(Option::as_mut)
                .unwrap_or_else(|| panic!("binding handle used after teardown")),
            Slot::Named(index) => self
                .named
                .get_mut(index as usize)
                .unwrap_or_else(|| panic!("binding handle used after teardown")),
        }
    }
}
