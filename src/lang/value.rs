use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Compile-time identity of a variable name.
///
/// The translator numbers every distinct name literal it discovers, starting
/// at 1, and stamps each string push with the literal's id. Id 0 is reserved:
/// the name is only known at run time and must be resolved through the
/// name-keyed fallback store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameId(pub u32);

impl NameId {
    /// The reserved "resolve by name at run time" id.
    pub const DYNAMIC: NameId = NameId(0);

    pub fn is_dynamic(self) -> bool {
        self.0 == 0
    }

    /// Direct-store slot this id addresses. Valid only for static ids.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Runtime value in a translated program.
///
/// Values are the only data that can exist on the data stack. Every slot has
/// the same shape; the tag decides which payload is live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StackValue {
    /// 32-bit floating-point number.
    F32(f32),

    /// 64-bit floating-point number.
    F64(f64),

    /// A single string fragment.
    ///
    /// `text` is a shared immutable buffer: pushing a literal clones the
    /// program's handle and loading a variable clones the binding's handle,
    /// so a stack slot can never outlive the bytes it points at. `name`
    /// carries the binding identity of the literal occurrence
    /// ([`NameId::DYNAMIC`] when the text is not a statically numbered name).
    Str { text: Rc<str>, name: NameId },

    /// A pending concatenation of string fragments.
    ///
    /// Fragments accumulate without copying; the single buffer only comes
    /// into existence when the run is materialized (stored into a variable)
    /// or flattened into a lookup key.
    Run(StrRun),
}

/// Ordered fragments of a deferred string concatenation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrRun {
    parts: Vec<Rc<str>>,
    total_len: usize,
}

impl StrRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Byte length the concatenated buffer would have.
    pub fn total_len(&self) -> usize {
        self.total_len
    }

    pub fn parts(&self) -> &[Rc<str>] {
        &self.parts
    }

    pub fn push_fragment(&mut self, text: Rc<str>) {
        self.total_len += text.len();
        self.parts.push(text);
    }

    /// Append a string-kind stack value to the run.
    ///
    /// Appending a run splices its fragments in order. Numbers cannot take
    /// part in a run; a numeric operand means the translator emitted a
    /// concat over a non-string and execution cannot continue.
    pub fn append(&mut self, value: StackValue) {
        match value {
            StackValue::Str { text, .. } => self.push_fragment(text),
            StackValue::Run(run) => {
                self.total_len += run.total_len;
                self.parts.extend(run.parts);
            }
            other => panic!(
                "type contract violation: cannot concatenate a {}",
                other.type_name()
            ),
        }
    }
}

/// Discriminant of a [`StackValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    F32,
    F64,
    Str,
    Run,
}

impl StackValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            StackValue::F32(_) => ValueKind::F32,
            StackValue::F64(_) => ValueKind::F64,
            StackValue::Str { .. } => ValueKind::Str,
            StackValue::Run(_) => ValueKind::Run,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            StackValue::F32(_) => "float32",
            StackValue::F64(_) => "float64",
            StackValue::Str { .. } => "string",
            StackValue::Run(_) => "string run",
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, StackValue::F32(_) | StackValue::F64(_))
    }

    /// Numeric payload, widened to 64 bits.
    ///
    /// Reading a string-kind value as a number is a translator bug, not a
    /// recoverable condition.
    pub fn as_number(&self) -> f64 {
        match self {
            StackValue::F32(n) => f64::from(*n),
            StackValue::F64(n) => *n,
            other => panic!(
                "type contract violation: expected a number, found {}",
                other.type_name()
            ),
        }
    }

    /// Borrowed view of the fragments of a string-kind value, in order.
    ///
    /// The fragments are ephemeral borrows; consumers that need the bytes to
    /// outlive the slot must materialize instead.
    pub fn str_parts(&self) -> StrParts<'_> {
        match self {
            StackValue::Str { text, .. } => StrParts::One(Some(&**text)),
            StackValue::Run(run) => StrParts::Many(run.parts.iter()),
            other => panic!(
                "type contract violation: expected a string, found {}",
                other.type_name()
            ),
        }
    }
}

/// Iterator over the fragments of a string-kind value.
pub enum StrParts<'a> {
    One(Option<&'a str>),
    Many(std::slice::Iter<'a, Rc<str>>),
}

impl<'a> Iterator for StrParts<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        match self {
            StrParts::One(part) => part.take(),
            StrParts::Many(parts) => parts.next().map(|p| &**p),
        }
    }
}

impl std::fmt::Display for StackValue {
    /// Format a value for trace output.
    ///
    /// Runs are written fragment by fragment; printing never concatenates.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackValue::F32(n) => write!(f, "{}", n),
            StackValue::F64(n) => write!(f, "{}", n),
            _ => {
                for part in self.str_parts() {
                    f.write_str(part)?;
                }
                Ok(())
            }
        }
    }
}
