use crate::bytecode::ir::Program;
use crate::bytecode::op::Op;
use crate::bytecode::program_error::ProgramError;
use crate::lang::value::{StackValue, StrRun};
use crate::runtime::bindings::{BindingHandle, BindingTable};
use crate::runtime::materialize::materialize;
use crate::runtime::stack::Stack;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct VmConfig {
    pub max_stack_depth: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_stack_depth: 10_000,
        }
    }
}

/// One execution instance: a data stack plus a binding table.
///
/// Instances are independent; running several programs side by side means
/// one `Vm` each, never shared state. Execution is synchronous and follows
/// emitted order exactly.
#[derive(Debug)]
pub struct Vm {
    stack: Stack,
    bindings: BindingTable,
}

impl Vm {
    pub fn new(program: &Program) -> Self {
        Self::with_config(program, VmConfig::default())
    }

    pub fn with_config(program: &Program, config: VmConfig) -> Self {
        Self {
            stack: Stack::new(config.max_stack_depth),
            bindings: BindingTable::new(program.max_name_id),
        }
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut BindingTable {
        &mut self.bindings
    }

    /// Drop all variable content. Idempotent; the instance is spent after.
    pub fn teardown(&mut self) {
        self.bindings.teardown_all();
    }

    /// Execute a program's instruction stream.
    ///
    /// The stream is verified first; a stream that passes cannot underflow
    /// the stack. Faults past this point (a name id the table was not sized
    /// for, a number used as a name) are translator/runtime mismatches and
    /// abort execution.
    pub fn run(&mut self, program: &Program) -> Result<(), ProgramError> {
        program.check()?;

        for op in &program.ops {
            self.exec_op(op);
        }

        Ok(())
    }

    fn exec_op(&mut self, op: &Op) {
        match op {
            // Literals
            Op::PushF32(n) => self.stack.push_f32(*n),
            Op::PushF64(n) => self.stack.push_f64(*n),
            Op::PushStr { text, name } => self.stack.push_str(Rc::clone(text), *name),

            // Stack operations
            Op::Drop => {
                self.stack.pop();
            }

            // Strings
            Op::Concat => {
                let b = self.stack.pop();
                let a = self.stack.pop();
                let mut run = match a {
                    StackValue::Run(run) => run,
                    other => {
                        let mut run = StrRun::new();
                        run.append(other);
                        run
                    }
                };
                run.append(b);
                self.stack.push_run(run);
            }

            // Arithmetic
            Op::Add => self.binary_number(|a, b| a + b),
            Op::Sub => self.binary_number(|a, b| a - b),
            Op::Mul => self.binary_number(|a, b| a * b),
            Op::Div => self.binary_number(|a, b| a / b),

            // Variables
            Op::GetVariable => {
                let name = self.stack.pop();
                let handle = self.resolve(&name);
                let value = self.bindings.load(handle);
                self.stack.push(value);
            }
            Op::SetVariable => {
                let value = self.stack.pop();
                let name = self.stack.pop();
                let handle = self.resolve(&name);
                self.bindings.store(handle, &value);
            }

            // I/O
            Op::Trace => {
                let value = self.stack.pop();
                println!("{}", value);
            }
        }
    }

    fn binary_number(&mut self, op: impl Fn(f64, f64) -> f64) {
        let b = self.stack.pop().as_number();
        let a = self.stack.pop().as_number();
        self.stack.push_f64(op(a, b));
    }

    /// Route a name value to the store that owns it.
    ///
    /// A literal with a static id resolves directly; everything else,
    /// including computed names (runs get flattened into the lookup key),
    /// resolves through the fallback store.
    fn resolve(&mut self, name: &StackValue) -> BindingHandle {
        match name {
            StackValue::Str { name, .. } if !name.is_dynamic() => {
                self.bindings.resolve_static(*name)
            }
            StackValue::Str { text, .. } => self.bindings.resolve_dynamic(text),
            run @ StackValue::Run(_) => {
                let key = materialize(run);
                self.bindings.resolve_dynamic(&key)
            }
            other => panic!(
                "type contract violation: a variable name must be a string, found {}",
                other.type_name()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::value::{NameId, ValueKind};

    // ============================================================
    // Test Helpers
    // ============================================================

    fn push_str(text: &str, id: u32) -> Op {
        Op::PushStr {
            text: Rc::from(text),
            name: NameId(id),
        }
    }

    fn str_value(text: &str) -> StackValue {
        StackValue::Str {
            text: Rc::from(text),
            name: NameId::DYNAMIC,
        }
    }

    /// Run ops against a fresh instance and return it for inspection.
    fn run_ops(max_name_id: u32, ops: Vec<Op>) -> Vm {
        let program = Program::new(max_name_id, ops);
        let mut vm = Vm::new(&program);
        vm.run(&program).expect("execution should succeed");
        vm
    }

    /// Assert the final stack contents of a program.
    fn assert_stack(max_name_id: u32, ops: Vec<Op>, expected: Vec<StackValue>) {
        let vm = run_ops(max_name_id, ops);
        assert_eq!(vm.stack().slots(), &expected[..], "stack mismatch");
    }

    #[test]
    fn test_push_literals() {
        assert_stack(
            0,
            vec![Op::PushF32(1.5), Op::PushF64(2.5), push_str("hi", 0)],
            vec![StackValue::F32(1.5), StackValue::F64(2.5), str_value("hi")],
        );
    }

    #[test]
    fn test_arithmetic_widens_to_f64() {
        assert_stack(
            0,
            vec![Op::PushF32(1.0), Op::PushF64(2.0), Op::Add, Op::PushF64(3.0), Op::Mul],
            vec![StackValue::F64(9.0)],
        );
        assert_stack(
            0,
            vec![Op::PushF64(7.0), Op::PushF64(2.0), Op::Sub],
            vec![StackValue::F64(5.0)],
        );
        assert_stack(
            0,
            vec![Op::PushF64(1.0), Op::PushF64(4.0), Op::Div],
            vec![StackValue::F64(0.25)],
        );
    }

    #[test]
    fn test_drop_discards_the_top() {
        assert_stack(
            0,
            vec![Op::PushF64(1.0), Op::PushF64(2.0), Op::Drop],
            vec![StackValue::F64(1.0)],
        );
    }

    #[test]
    fn test_concat_builds_a_run_without_flattening() {
        let vm = run_ops(
            0,
            vec![push_str("a", 0), push_str("b", 0), Op::Concat, push_str("c", 0), Op::Concat],
        );
        assert_eq!(vm.stack().top_kind(), ValueKind::Run);
        match &vm.stack().slots()[0] {
            StackValue::Run(run) => {
                assert_eq!(run.total_len(), 3);
                assert_eq!(run.parts().len(), 3);
            }
            other => panic!("expected a run, got {:?}", other),
        }
    }

    #[test]
    fn test_store_and_load_by_static_id() {
        // x = "hello"; x = "second"; push x
        let vm = run_ops(
            5,
            vec![
                push_str("x", 5),
                push_str("hello", 0),
                Op::SetVariable,
                push_str("x", 5),
                push_str("second", 0),
                Op::SetVariable,
                push_str("x", 5),
                Op::GetVariable,
            ],
        );
        assert_eq!(vm.stack().slots(), &[str_value("second")]);
    }

    #[test]
    fn test_store_and_load_by_dynamic_name() {
        let vm = run_ops(
            0,
            vec![
                push_str("greeting", 0),
                push_str("hello", 0),
                Op::SetVariable,
                push_str("greeting", 0),
                Op::GetVariable,
            ],
        );
        assert_eq!(vm.stack().slots(), &[str_value("hello")]);
    }

    #[test]
    fn test_stored_run_survives_stack_reuse() {
        // x = "ab" + "cd", then churn the stack with unrelated values.
        let vm = run_ops(
            1,
            vec![
                push_str("x", 1),
                push_str("ab", 0),
                push_str("cd", 0),
                Op::Concat,
                Op::SetVariable,
                push_str("scratch", 0),
                Op::Drop,
                Op::PushF64(0.0),
                Op::Drop,
                push_str("x", 1),
                Op::GetVariable,
            ],
        );
        assert_eq!(vm.stack().slots(), &[str_value("abcd")]);
    }

    #[test]
    fn test_self_append() {
        // x = "x"; x = x + "y"
        let vm = run_ops(
            1,
            vec![
                push_str("x", 1),
                push_str("x", 0),
                Op::SetVariable,
                push_str("x", 1),
                push_str("x", 1),
                Op::GetVariable,
                push_str("y", 0),
                Op::Concat,
                Op::SetVariable,
                push_str("x", 1),
                Op::GetVariable,
            ],
        );
        assert_eq!(vm.stack().slots(), &[str_value("xy")]);
    }

    #[test]
    fn test_computed_name_resolves_dynamically() {
        // ("pre" + "fix") = 5; push ("pre" + "fix")
        let vm = run_ops(
            0,
            vec![
                push_str("pre", 0),
                push_str("fix", 0),
                Op::Concat,
                Op::PushF64(5.0),
                Op::SetVariable,
                push_str("pre", 0),
                push_str("fix", 0),
                Op::Concat,
                Op::GetVariable,
            ],
        );
        assert_eq!(vm.stack().slots(), &[StackValue::F64(5.0)]);
    }

    #[test]
    fn test_loaded_value_is_plain_data() {
        // v = "x"; then use the loaded value as a name. The loaded string
        // carries no id, so the store lands in the fallback namespace, not
        // in any direct slot.
        let mut vm = run_ops(
            1,
            vec![
                push_str("v", 1),
                push_str("x", 0),
                Op::SetVariable,
                push_str("v", 1),
                Op::GetVariable,
                Op::PushF64(99.0),
                Op::SetVariable,
            ],
        );

        let by_name = vm.bindings_mut().resolve_dynamic("x");
        assert_eq!(vm.bindings().load(by_name), StackValue::F64(99.0));

        let v = vm.bindings_mut().resolve_static(NameId(1));
        assert_eq!(vm.bindings().load(v), str_value("x"));
    }

    #[test]
    fn test_unwritten_variable_reads_as_zero() {
        let vm = run_ops(2, vec![push_str("never", 2), Op::GetVariable]);
        assert_eq!(vm.stack().slots(), &[StackValue::F64(0.0)]);
    }

    #[test]
    fn test_trace_consumes_the_top() {
        let vm = run_ops(
            0,
            vec![push_str("a", 0), push_str("b", 0), Op::Concat, Op::Trace],
        );
        assert!(vm.stack().is_empty());
    }

    #[test]
    fn test_run_rejects_unbalanced_streams() {
        let program = Program::new(0, vec![Op::Add]);
        let mut vm = Vm::new(&program);
        let err = vm.run(&program).unwrap_err();
        assert!(matches!(err, ProgramError::StackUnderflow { .. }), "got {}", err);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_mismatched_program_fails_loudly() {
        // The instance was sized for one program, then fed another that
        // assumes a bigger direct store.
        let small = Program::new(1, vec![]);
        let big = Program::new(9, vec![push_str("x", 9), Op::GetVariable, Op::Drop]);
        let mut vm = Vm::new(&small);
        let _ = vm.run(&big);
    }

    #[test]
    #[should_panic(expected = "a variable name must be a string")]
    fn test_numeric_name_is_fatal() {
        let _ = run_ops(0, vec![Op::PushF64(1.0), Op::PushF64(2.0), Op::SetVariable]);
    }

    #[test]
    #[should_panic(expected = "depth limit exceeded (2)")]
    fn test_configured_stack_limit_is_fatal() {
        let program = Program::new(
            0,
            vec![Op::PushF64(1.0), Op::PushF64(2.0), Op::PushF64(3.0)],
        );
        let mut vm = Vm::with_config(&program, VmConfig { max_stack_depth: 2 });
        let _ = vm.run(&program);
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let mut vm = run_ops(
            1,
            vec![push_str("x", 1), push_str("gone", 0), Op::SetVariable],
        );
        vm.teardown();
        vm.teardown();
    }

    #[test]
    fn test_instances_are_independent() {
        let program = Program::new(
            1,
            vec![push_str("x", 1), push_str("mine", 0), Op::SetVariable],
        );
        let mut first = Vm::new(&program);
        let mut second = Vm::new(&program);
        first.run(&program).expect("execution should succeed");

        let handle = second.bindings_mut().resolve_static(NameId(1));
        assert_eq!(second.bindings().load(handle), StackValue::F64(0.0));
    }
}
