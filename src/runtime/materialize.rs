use crate::lang::value::StackValue;
use std::rc::Rc;

/// Flatten a string-kind stack value into one owned buffer.
///
/// This is the only path by which stack content becomes binding content, and
/// the single point where a concatenation run pays for its deferred copies.
///
/// - A single string shares its buffer: the bytes are immutable and
///   co-owned, so the handle itself is the durable copy.
/// - A run allocates exactly `total_len` bytes once and writes the fragments
///   in recorded order.
/// - Numbers never materialize; the store path copies their payload
///   directly, and reaching here with one is a translator bug.
pub fn materialize(value: &StackValue) -> Rc<str> {
    match value {
        StackValue::Str { text, .. } => Rc::clone(text),
        StackValue::Run(run) => {
            let mut buf = String::with_capacity(run.total_len());
            for part in run.parts() {
                buf.push_str(part);
            }
            debug_assert_eq!(buf.len(), run.total_len());
            Rc::from(buf)
        }
        other => panic!(
            "type contract violation: cannot materialize a {}",
            other.type_name()
        ),
    }
}
