//! Runtime error taxonomy.
//!
//! The VM has no source positions to attach to a failure (positions live
//! on the AST, which bytecode has already discarded), so these messages
//! describe the faulting instruction and operands only, with a
//! `"VM Error: ..."` prefix and no line/column.

use ember_core::OpCode;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum VmError {
    /// A numeric-only operator (`-`, `*`, `/`, `%`, unary `-`, or a
    /// relational comparison) was applied to at least one non-number
    /// operand.
    TypeMismatch { op: &'static str, got: &'static str },
    /// `ADD` was applied to an operand combination that is neither
    /// string-involving nor two numbers.
    UnsupportedAdd { left: &'static str, right: &'static str },
    DivisionByZero,
    ModuloByZero,
    StackOverflow,
    StackUnderflow,
    ConstantIndexOutOfBounds { index: u8, len: usize },
    VariableIndexOutOfBounds { index: u8, len: usize },
    IndexOutOfBounds { index: i64, len: usize },
    IndexNotNumeric { got: &'static str },
    IndexOnNonArray { got: &'static str },
    /// A byte in the code buffer does not decode to any known opcode -
    /// only possible with hand-crafted or corrupted bytecode.
    UnknownOpcode(u8),
    /// A recognized but never-emitted opcode (upvalues, coroutines,
    /// exceptions, object properties) with no supported runtime
    /// behavior in this revision.
    UnsupportedOpcode(OpCode),
    Io(io::Error),
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::TypeMismatch { op, got } => {
                write!(f, "VM Error: '{op}' is a numeric-only operator, got a {got}")
            }
            VmError::UnsupportedAdd { left, right } => {
                write!(f, "VM Error: ADD cannot handle operand types {left} and {right}")
            }
            VmError::DivisionByZero => write!(f, "VM Error: division by zero"),
            VmError::ModuloByZero => write!(f, "VM Error: modulo by zero"),
            VmError::StackOverflow => write!(f, "VM Error: stack overflow"),
            VmError::StackUnderflow => write!(f, "VM Error: stack underflow"),
            VmError::ConstantIndexOutOfBounds { index, len } => write!(
                f,
                "VM Error: LOAD_CONST index {index} out of bounds (constants pool has {len})"
            ),
            VmError::VariableIndexOutOfBounds { index, len } => write!(
                f,
                "VM Error: variable slot {index} out of bounds (globals array has {len})"
            ),
            VmError::IndexOutOfBounds { index, len } => {
                write!(f, "VM Error: array index {index} out of bounds (length {len})")
            }
            VmError::IndexNotNumeric { got } => {
                write!(f, "VM Error: GET_INDEX requires a numeric index, got a {got}")
            }
            VmError::IndexOnNonArray { got } => {
                write!(f, "VM Error: cannot index into a {got}")
            }
            VmError::UnknownOpcode(byte) => write!(f, "VM Error: unknown opcode {byte}"),
            VmError::UnsupportedOpcode(op) => {
                write!(f, "VM Error: opcode {op} has no supported runtime behavior")
            }
            VmError::Io(e) => write!(f, "VM Error: I/O error: {e}"),
        }
    }
}

impl std::error::Error for VmError {}

impl From<io::Error> for VmError {
    fn from(e: io::Error) -> Self {
        VmError::Io(e)
    }
}
