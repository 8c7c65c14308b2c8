//! The bytecode container: a code buffer, a constants pool, and the
//! binary file format used to persist both.
//!
//! A `Chunk` is two parallel growable buffers - a code byte stream and a
//! constants pool - plus the persisted file format that lets `compile`
//! and `run` be decoupled into separate tools.
//!
//! The persisted layout is bit-exact: `i32` counts in host byte order,
//! then raw code bytes, then each constant as a 4-byte tag followed by a
//! tag-specific payload. Portability across hosts is explicitly out of
//! scope.

use crate::value::Value;
use std::fmt;
use std::io::{self, Read, Write};

/// Maximum number of constants a chunk may hold: indices are encoded as a
/// single byte in the instruction stream.
pub const MAX_CONSTANTS: usize = 256;

const TAG_NUMBER: i32 = 0;
const TAG_STRING: i32 = 1;
const TAG_BOOLEAN: i32 = 2;
const TAG_NULL: i32 = 3;

#[derive(Debug)]
pub enum ChunkError {
    /// The constants pool is already at `MAX_CONSTANTS`.
    ConstantPoolFull,
    /// A constant of this type cannot be persisted: arrays, functions,
    /// and objects have no serialization format.
    UnsupportedConstantType(&'static str),
    /// The serialized file is truncated or otherwise not well-formed.
    Corrupt(String),
    Io(io::Error),
}

impl fmt::Display for ChunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkError::ConstantPoolFull => {
                write!(f, "constant pool is full (max {MAX_CONSTANTS} constants)")
            }
            ChunkError::UnsupportedConstantType(name) => {
                write!(f, "cannot serialize a constant of type '{name}'")
            }
            ChunkError::Corrupt(msg) => write!(f, "corrupt bytecode file: {msg}"),
            ChunkError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for ChunkError {}

impl From<io::Error> for ChunkError {
    fn from(e: io::Error) -> Self {
        ChunkError::Io(e)
    }
}

/// A compiled unit: a code byte buffer and its parallel constants pool.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub code: Vec<u8>,
    pub constants: Vec<Value>,
    max_constants: usize,
}

impl Default for Chunk {
    fn default() -> Self {
        Chunk {
            code: Vec::new(),
            constants: Vec::new(),
            max_constants: MAX_CONSTANTS,
        }
    }
}

impl Chunk {
    pub fn new() -> Self {
        Chunk::default()
    }

    /// Builds an empty chunk whose constants pool is capped at
    /// `max_constants` instead of the built-in [`MAX_CONSTANTS`] - the
    /// seam `emberc` uses to honor a `.emberc.toml`-configured limit.
    pub fn with_max_constants(max_constants: usize) -> Self {
        Chunk {
            code: Vec::new(),
            constants: Vec::new(),
            max_constants,
        }
    }

    /// Appends one byte to the code buffer. Monotonic/append-only; `Vec`
    /// already doubles its capacity on growth.
    pub fn write_byte(&mut self, byte: u8) {
        self.code.push(byte);
    }

    /// Current length of the code buffer, i.e. the offset the next
    /// `write_byte` will land at.
    pub fn code_len(&self) -> usize {
        self.code.len()
    }

    /// Appends a constant to the pool and returns its index.
    pub fn add_constant(&mut self, value: Value) -> Result<u8, ChunkError> {
        if self.constants.len() >= self.max_constants {
            return Err(ChunkError::ConstantPoolFull);
        }
        self.constants.push(value);
        Ok((self.constants.len() - 1) as u8)
    }

    /// Writes this chunk to `w` in the persisted file format above.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), ChunkError> {
        let code_count = self.code.len() as i32;
        let constants_count = self.constants.len() as i32;
        w.write_all(&code_count.to_ne_bytes())?;
        w.write_all(&constants_count.to_ne_bytes())?;
        w.write_all(&self.code)?;
        for constant in &self.constants {
            write_constant(w, constant)?;
        }
        Ok(())
    }

    /// Reads a chunk from `r` in the persisted file format above,
    /// rejecting constant tags outside the supported set.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Chunk, ChunkError> {
        let code_count = read_i32(r)?;
        let constants_count = read_i32(r)?;
        if code_count < 0 || constants_count < 0 {
            return Err(ChunkError::Corrupt("negative count".to_string()));
        }

        let mut code = vec![0u8; code_count as usize];
        r.read_exact(&mut code)?;

        let mut constants = Vec::with_capacity(constants_count as usize);
        for _ in 0..constants_count {
            constants.push(read_constant(r)?);
        }

        Ok(Chunk { code, constants, max_constants: MAX_CONSTANTS })
    }
}

fn write_constant<W: Write>(w: &mut W, value: &Value) -> Result<(), ChunkError> {
    match value {
        Value::Number(n) => {
            w.write_all(&TAG_NUMBER.to_ne_bytes())?;
            w.write_all(&n.to_ne_bytes())?;
        }
        Value::Boolean(b) => {
            w.write_all(&TAG_BOOLEAN.to_ne_bytes())?;
            w.write_all(&[*b as u8])?;
        }
        Value::Null => {
            w.write_all(&TAG_NULL.to_ne_bytes())?;
        }
        Value::String(s) => {
            w.write_all(&TAG_STRING.to_ne_bytes())?;
            let bytes = s.as_bytes();
            let len = bytes.len() as i32;
            w.write_all(&len.to_ne_bytes())?;
            w.write_all(bytes)?;
        }
        Value::Array(_) => return Err(ChunkError::UnsupportedConstantType("array")),
        Value::Function(_) => return Err(ChunkError::UnsupportedConstantType("function")),
    }
    Ok(())
}

fn read_constant<R: Read>(r: &mut R) -> Result<Value, ChunkError> {
    let tag = read_i32(r)?;
    match tag {
        TAG_NUMBER => {
            let mut buf = [0u8; 8];
            r.read_exact(&mut buf)?;
            Ok(Value::Number(f64::from_ne_bytes(buf)))
        }
        TAG_BOOLEAN => {
            let mut buf = [0u8; 1];
            r.read_exact(&mut buf)?;
            Ok(Value::Boolean(buf[0] != 0))
        }
        TAG_NULL => Ok(Value::Null),
        TAG_STRING => {
            let len = read_i32(r)?;
            if len < 0 {
                return Err(ChunkError::Corrupt("negative string length".to_string()));
            }
            let mut bytes = vec![0u8; len as usize];
            r.read_exact(&mut bytes)?;
            String::from_utf8(bytes)
                .map(Value::String)
                .map_err(|e| ChunkError::Corrupt(format!("invalid UTF-8 in string constant: {e}")))
        }
        other => Err(ChunkError::Corrupt(format!(
            "unsupported constant tag {other}"
        ))),
    }
}

fn read_i32<R: Read>(r: &mut R) -> Result<i32, ChunkError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_ne_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_constant_returns_dense_indices() {
        let mut chunk = Chunk::new();
        assert_eq!(chunk.add_constant(Value::Number(1.0)).unwrap(), 0);
        assert_eq!(chunk.add_constant(Value::Number(2.0)).unwrap(), 1);
    }

    #[test]
    fn constant_pool_rejects_past_capacity() {
        let mut chunk = Chunk::new();
        for _ in 0..MAX_CONSTANTS {
            chunk.add_constant(Value::Null).unwrap();
        }
        assert!(matches!(
            chunk.add_constant(Value::Null),
            Err(ChunkError::ConstantPoolFull)
        ));
    }

    #[test]
    fn array_and_function_constants_fail_serialization() {
        let mut chunk = Chunk::new();
        chunk.constants.push(Value::Array(vec![]));
        let mut buf = Vec::new();
        assert!(chunk.write_to(&mut buf).is_err());
    }

    #[test]
    fn round_trips_number_boolean_null_string() {
        let mut chunk = Chunk::new();
        chunk.write_byte(0x01);
        chunk.write_byte(0x02);
        chunk.add_constant(Value::Number(3.25)).unwrap();
        chunk.add_constant(Value::Boolean(true)).unwrap();
        chunk.add_constant(Value::Null).unwrap();
        chunk.add_constant(Value::String("hi".to_string())).unwrap();

        let mut buf = Vec::new();
        chunk.write_to(&mut buf).unwrap();
        let mut cursor = io::Cursor::new(buf);
        let restored = Chunk::read_from(&mut cursor).unwrap();

        assert_eq!(restored.code, chunk.code);
        assert_eq!(restored.constants.len(), chunk.constants.len());
        for (a, b) in chunk.constants.iter().zip(restored.constants.iter()) {
            assert!(a.value_eq(b));
        }
    }

    #[test]
    fn rejects_unsupported_constant_tag() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0i32.to_ne_bytes()); // code_count
        buf.extend_from_slice(&1i32.to_ne_bytes()); // constants_count
        buf.extend_from_slice(&99i32.to_ne_bytes()); // bogus tag
        let mut cursor = io::Cursor::new(buf);
        assert!(Chunk::read_from(&mut cursor).is_err());
    }

    use proptest::prelude::*;

    fn arb_persistable_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<f64>().prop_map(Value::Number),
            any::<bool>().prop_map(Value::Boolean),
            Just(Value::Null),
            ".{0,32}".prop_map(Value::String),
        ]
    }

    proptest! {
        /// Property: round-tripping a chunk whose constants are
        /// restricted to number/boolean/null/string yields a byte-identical
        /// `code` buffer and an equal constants pool.
        #[test]
        fn round_trip_preserves_code_and_constants(
            code in proptest::collection::vec(any::<u8>(), 0..64),
            values in proptest::collection::vec(arb_persistable_value(), 0..16),
        ) {
            let mut chunk = Chunk::new();
            for byte in &code {
                chunk.write_byte(*byte);
            }
            for value in &values {
                chunk.add_constant(value.clone()).unwrap();
            }

            let mut buf = Vec::new();
            chunk.write_to(&mut buf).unwrap();
            let restored = Chunk::read_from(&mut io::Cursor::new(buf)).unwrap();

            prop_assert_eq!(restored.code, chunk.code);
            prop_assert_eq!(restored.constants.len(), chunk.constants.len());
            for (a, b) in chunk.constants.iter().zip(restored.constants.iter()) {
                prop_assert!(a.value_eq(b));
            }
        }

        /// Property: every constant `add_constant` hands back is
        /// a valid index into the pool it was just added to.
        #[test]
        fn add_constant_index_is_always_in_bounds(
            values in proptest::collection::vec(arb_persistable_value(), 1..MAX_CONSTANTS),
        ) {
            let mut chunk = Chunk::new();
            for value in values {
                let idx = chunk.add_constant(value).unwrap();
                prop_assert!((idx as usize) < chunk.constants.len());
            }
        }
    }
}
