use crate::bytecode::op::Op;
use crate::bytecode::program_error::ProgramError;

/// Returns (pops, pushes) for an op.
///
/// Every op in this stream has a static effect; there are no calls or jumps
/// to make the height dynamic.
fn effect(op: &Op) -> (u32, u32) {
    use Op::*;
    match op {
        PushF32(_) | PushF64(_) | PushStr { .. } => (0, 1),

        Drop => (1, 0),

        Concat => (2, 1),

        Add | Sub | Mul | Div => (2, 1),

        GetVariable => (1, 1),
        SetVariable => (2, 0),

        Trace => (1, 0),
    }
}

/// Verify an instruction stream before execution.
///
/// A linear scan tracks the stack height and rejects any op that would pop
/// below empty, and any string push whose name id lies outside the direct
/// store the declared `max_name_id` will size. Execution trusts the stream
/// after this pass.
pub fn check_ops(ops: &[Op], max_name_id: u32) -> Result<(), ProgramError> {
    let mut height: u32 = 0;

    for (ip, op) in ops.iter().enumerate() {
        if let Op::PushStr { name, .. } = op {
            if name.0 > max_name_id {
                return Err(ProgramError::name_id_out_of_range(ip, name.0, max_name_id));
            }
        }

        let (pops, pushes) = effect(op);
        if height < pops {
            return Err(ProgramError::stack_underflow(
                ip,
                format!("{:?}", op),
                pops,
                height,
            ));
        }
        height = height - pops + pushes;
    }

    Ok(())
}
