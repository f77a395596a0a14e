/// Load-time rejection of a translated program.
///
/// Everything here is detected before the first instruction executes; a
/// program that decodes and verifies cleanly cannot underflow the stack or
/// address a name id the binding table was not sized for.
#[derive(Debug, Clone)]
pub enum ProgramError {
    /// The byte stream was not a valid encoded program.
    Codec(String),

    /// An instruction would pop more values than the stack holds.
    StackUnderflow {
        ip: usize,
        op: String,
        needed: u32,
        have: u32,
    },

    /// A string push carries a name id above the declared maximum.
    NameIdOutOfRange { ip: usize, id: u32, max: u32 },
}

impl ProgramError {
    pub fn codec(err: postcard::Error) -> Self {
        ProgramError::Codec(err.to_string())
    }

    pub fn stack_underflow(ip: usize, op: String, needed: u32, have: u32) -> Self {
        ProgramError::StackUnderflow {
            ip,
            op,
            needed,
            have,
        }
    }

    pub fn name_id_out_of_range(ip: usize, id: u32, max: u32) -> Self {
        ProgramError::NameIdOutOfRange { ip, id, max }
    }
}

impl std::fmt::Display for ProgramError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgramError::Codec(msg) => write!(f, "program decode error: {}", msg),
            ProgramError::StackUnderflow {
                ip,
                op,
                needed,
                have,
            } => write!(
                f,
                "stack underflow at ip={}, op={}: needs {} value(s), stack holds {}",
                ip, op, needed, have
            ),
            ProgramError::NameIdOutOfRange { ip, id, max } => write!(
                f,
                "name id {} at ip={} exceeds the declared maximum {} - \
                 the program was produced by a mismatched translator",
                id, ip, max
            ),
        }
    }
}

impl std::error::Error for ProgramError {}
