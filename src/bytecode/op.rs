use crate::lang::value::NameId;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

// =============================================================================
// OP - Translated instruction stream
// =============================================================================

/// One instruction of a translated program.
///
/// The translator lowers the source bytecode to this stream; the set covers
/// value traffic, variable access and trace output, nothing more. Arithmetic
/// always widens to 64-bit floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Op {
    // literals
    /// ( -- n ) Push a 32-bit float.
    PushF32(f32),

    /// ( -- n ) Push a 64-bit float.
    PushF64(f64),

    /// ( -- s ) Push a string literal.
    ///
    /// `name` is the literal's compile-time binding identity, or
    /// [`NameId::DYNAMIC`] when the literal is not a statically numbered
    /// variable name.
    PushStr { text: Rc<str>, name: NameId },

    // stack ops
    /// ( a -- ) Discard the top value.
    Drop,

    // strings
    /// ( a b -- ab ) Concatenate two strings into a run, copying nothing.
    Concat,

    // arithmetic
    Add,
    Sub,
    Mul,
    Div,

    // variables
    /// ( name -- value ) Resolve a variable and push its content.
    GetVariable,

    /// ( name value -- ) Resolve a variable and store the value into it.
    SetVariable,

    // I/O
    /// ( a -- ) Print the top value to stdout.
    Trace,
}
