use crate::bytecode::ir::Program;
use crate::bytecode::op::Op;
use std::fmt::Write;

/// Render a program's instruction stream, one op per line.
pub fn disassemble(program: &Program) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "program: {} instruction(s), max name id {}",
        program.ops.len(),
        program.max_name_id
    );

    for (ip, op) in program.ops.iter().enumerate() {
        let _ = writeln!(out, "{:04}   {}", ip, fmt_op(op));
    }

    out
}

fn fmt_op(op: &Op) -> String {
    match op {
        Op::PushF32(n) => format!("push.f32    {}", n),
        Op::PushF64(n) => format!("push.f64    {}", n),
        Op::PushStr { text, name } if name.is_dynamic() => {
            format!("push.str    {:?}", text)
        }
        Op::PushStr { text, name } => format!("push.str    {:?}  name#{}", text, name.0),
        Op::Drop => "drop".to_string(),
        Op::Concat => "concat".to_string(),
        Op::Add => "add".to_string(),
        Op::Sub => "sub".to_string(),
        Op::Mul => "mul".to_string(),
        Op::Div => "div".to_string(),
        Op::GetVariable => "getvar".to_string(),
        Op::SetVariable => "setvar".to_string(),
        Op::Trace => "trace".to_string(),
    }
}
