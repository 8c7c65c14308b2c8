//! Single-pass AST-to-bytecode compiler for EmberScript.
//!
//! [`compile_source`] is the entry point: lex + parse the given source,
//! then emit bytecode into one [`ember_core::Chunk`], splicing in any
//! `import`ed units via a host-supplied [`SourceLoader`].

mod compiler;
mod error;
mod loader;

pub use compiler::{compile_source, compile_source_with_limits};
pub use error::{CompileError, ImportFailure};
pub use loader::{FsSourceLoader, SourceLoader};
