//! The EmberScript instruction set, shared between the compiler (which
//! emits it) and the VM (which dispatches it).
//!
//! Discriminants are fixed and contiguous so that `OpCode::try_from(u8)`
//! is a simple range check; the byte values themselves are not part of
//! the persisted file format (only `Chunk::code`'s raw bytes are), so
//! reordering this list only matters within one compile/run of the same
//! binary.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Noop = 0,
    Eof,
    Pop,
    Dup,
    Swap,

    LoadConst,
    LoadVar,
    StoreVar,
    LoadGlobal,
    StoreGlobal,
    LoadUpvalue,
    StoreUpvalue,

    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,

    Not,
    And,
    Or,
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,

    Jump,
    JumpIfFalse,
    JumpIfTrue,
    Loop,

    Call,
    Return,

    NewArray,
    ArrayPush,
    GetIndex,
    SetIndex,
    NewObject,
    SetProperty,
    GetProperty,

    Print,
    ToString,

    Yield,
    Resume,

    Throw,
    TryCatch,
}

impl OpCode {
    /// Highest valid discriminant; kept in sync by the round-trip test
    /// below.
    const LAST: u8 = OpCode::TryCatch as u8;

    pub fn from_byte(byte: u8) -> Option<OpCode> {
        use OpCode::*;
        Some(match byte {
            0 => Noop,
            1 => Eof,
            2 => Pop,
            3 => Dup,
            4 => Swap,
            5 => LoadConst,
            6 => LoadVar,
            7 => StoreVar,
            8 => LoadGlobal,
            9 => StoreGlobal,
            10 => LoadUpvalue,
            11 => StoreUpvalue,
            12 => Add,
            13 => Sub,
            14 => Mul,
            15 => Div,
            16 => Mod,
            17 => Neg,
            18 => Not,
            19 => And,
            20 => Or,
            21 => Eq,
            22 => Neq,
            23 => Lt,
            24 => Gt,
            25 => Lte,
            26 => Gte,
            27 => Jump,
            28 => JumpIfFalse,
            29 => JumpIfTrue,
            30 => Loop,
            31 => Call,
            32 => Return,
            33 => NewArray,
            34 => ArrayPush,
            35 => GetIndex,
            36 => SetIndex,
            37 => NewObject,
            38 => SetProperty,
            39 => GetProperty,
            40 => Print,
            41 => ToString,
            42 => Yield,
            43 => Resume,
            44 => Throw,
            45 => TryCatch,
            _ => return None,
        })
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_known_opcode() {
        for byte in 0..=OpCode::LAST {
            assert!(OpCode::from_byte(byte).is_some(), "byte {byte} should decode");
        }
    }

    #[test]
    fn rejects_unknown_opcode() {
        assert!(OpCode::from_byte(255).is_none());
    }
}
