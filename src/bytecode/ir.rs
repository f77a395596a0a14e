use crate::bytecode::check::check_ops;
use crate::bytecode::op::Op;
use crate::bytecode::program_error::ProgramError;
use serde::{Deserialize, Serialize};

/// A translated program as handed over by the translator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Highest name id the translator allocated. The direct binding store is
    /// sized to `max_name_id + 1` slots before execution begins.
    pub max_name_id: u32,

    /// The instruction stream, executed in emitted order.
    pub ops: Vec<Op>,
}

impl Program {
    pub fn new(max_name_id: u32, ops: Vec<Op>) -> Self {
        Self { max_name_id, ops }
    }

    /// Verify the instruction stream against the declared name-id bound.
    pub fn check(&self) -> Result<(), ProgramError> {
        check_ops(&self.ops, self.max_name_id)
    }

    /// Serialize to the compact handoff encoding.
    pub fn encode(&self) -> Result<Vec<u8>, ProgramError> {
        postcard::to_allocvec(self).map_err(ProgramError::codec)
    }

    /// Decode and verify a program from its handoff encoding.
    ///
    /// Decoded programs are untrusted until [`Program::check`] accepts them,
    /// so decode runs the verifier before returning.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProgramError> {
        let program: Program = postcard::from_bytes(bytes).map_err(ProgramError::codec)?;
        program.check()?;
        Ok(program)
    }
}
