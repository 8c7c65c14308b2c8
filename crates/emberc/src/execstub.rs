//! Native executable output: embeds a compiled [`Chunk`] as data in a
//! generated Rust source file, then invokes the host Rust toolchain to
//! link it against the `ember-core`/`ember-vm` runtime crates into a
//! self-contained binary.
//!
//! Grounded on `original_source/main.c`'s `embed_chunk_in_exe`: write a
//! temporary stub source file embedding the chunk, shell out to the host
//! compiler (`cc ... -lEmber`), and copy the result to the requested
//! output path. `cc`/`-lEmber` becomes `cargo build` against path
//! dependencies here, since Rust's toolchain entry point is `cargo`
//! rather than a compiler plus a prebuilt static archive. Best-effort and
//! host-dependent, as spec.md itself frames this interface: it requires
//! a working `cargo` on PATH and this crate's own build tree still being
//! present on disk at build time.

use ember_core::Chunk;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::process::Command;

#[derive(Debug)]
pub enum ExecStubError {
    Io(io::Error),
    Chunk(ember_core::ChunkError),
    ToolchainUnavailable(io::Error),
    ToolchainFailed(String),
}

impl fmt::Display for ExecStubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecStubError::Io(e) => write!(f, "I/O error while staging the executable build: {e}"),
            ExecStubError::Chunk(e) => write!(f, "could not embed bytecode in executable stub: {e}"),
            ExecStubError::ToolchainUnavailable(e) => {
                write!(f, "could not invoke the host Rust toolchain ('cargo'): {e}")
            }
            ExecStubError::ToolchainFailed(status) => {
                write!(f, "host toolchain build of the executable stub failed: {status}")
            }
        }
    }
}

impl std::error::Error for ExecStubError {}

impl From<io::Error> for ExecStubError {
    fn from(e: io::Error) -> Self {
        ExecStubError::Io(e)
    }
}

impl From<ember_core::ChunkError> for ExecStubError {
    fn from(e: ember_core::ChunkError) -> Self {
        ExecStubError::Chunk(e)
    }
}

const EMBER_CORE_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../ember-core");
const EMBER_VM_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../ember-vm");

/// Builds a native executable at `output_path` that runs `chunk` when
/// invoked with no arguments.
pub fn build_executable(chunk: &Chunk, output_path: &Path) -> Result<(), ExecStubError> {
    let build_dir = stage_build_dir(chunk, output_path)?;
    let manifest_path = build_dir.path().join("Cargo.toml");
    let target_dir = build_dir.path().join("target");

    let status = Command::new("cargo")
        .args(["build", "--release", "--manifest-path"])
        .arg(&manifest_path)
        .arg("--target-dir")
        .arg(&target_dir)
        .status()
        .map_err(ExecStubError::ToolchainUnavailable)?;
    if !status.success() {
        return Err(ExecStubError::ToolchainFailed(status.to_string()));
    }

    let binary_name = stub_crate_name(output_path);
    let built_binary = target_dir.join("release").join(&binary_name);
    fs::copy(&built_binary, output_path)?;
    Ok(())
}

/// Derives a valid crate/binary name from the requested output path's
/// file stem, falling back to a fixed name when the stem is empty or not
/// a legal crate-name start.
fn stub_crate_name(output_path: &Path) -> String {
    output_path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(sanitize_crate_name)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "ember_program".to_string())
}

fn sanitize_crate_name(raw: &str) -> String {
    let mut name: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

fn stage_build_dir(chunk: &Chunk, output_path: &Path) -> Result<tempfile::TempDir, ExecStubError> {
    let dir = tempfile::tempdir()?;
    let crate_name = stub_crate_name(output_path);

    let embc_path = dir.path().join("program.embc");
    let file = fs::File::create(&embc_path)?;
    let mut writer = io::BufWriter::new(file);
    chunk.write_to(&mut writer)?;
    drop(writer);

    let main_rs = r#"fn main() {
    static CHUNK_BYTES: &[u8] = include_bytes!("program.embc");
    let chunk = ember_core::Chunk::read_from(&mut std::io::Cursor::new(CHUNK_BYTES))
        .expect("embedded chunk is well-formed");
    if let Err(e) = ember_vm::execute(&chunk) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
"#;
    fs::write(dir.path().join("main.rs"), main_rs)?;

    let cargo_toml = format!(
        "[package]\n\
         name = \"{crate_name}\"\n\
         version = \"0.0.0\"\n\
         edition = \"2021\"\n\
         publish = false\n\
         \n\
         [[bin]]\n\
         name = \"{crate_name}\"\n\
         path = \"main.rs\"\n\
         \n\
         [dependencies]\n\
         ember-core = {{ path = {ember_core_dir:?} }}\n\
         ember-vm = {{ path = {ember_vm_dir:?} }}\n",
        ember_core_dir = EMBER_CORE_DIR,
        ember_vm_dir = EMBER_VM_DIR,
    );
    fs::write(dir.path().join("Cargo.toml"), cargo_toml)?;

    Ok(dir)
}

/// True for an output path that names no extension, or names `.exe`
/// (case-insensitively) - both read as "build me a native binary" per
/// `original_source/main.c`'s own extension check.
pub fn is_executable_target(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        None => true,
        Some(ext) => ext.eq_ignore_ascii_case("exe"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensionless_path_is_an_executable_target() {
        assert!(is_executable_target(Path::new("a")));
    }

    #[test]
    fn exe_extension_is_an_executable_target_case_insensitively() {
        assert!(is_executable_target(Path::new("a.exe")));
        assert!(is_executable_target(Path::new("a.EXE")));
    }

    #[test]
    fn embc_extension_is_not_an_executable_target() {
        assert!(!is_executable_target(Path::new("a.embc")));
    }

    #[test]
    fn crate_name_sanitizes_non_identifier_characters() {
        assert_eq!(sanitize_crate_name("my-program v2"), "my_program_v2");
    }

    #[test]
    fn crate_name_prefixes_a_leading_digit() {
        assert_eq!(sanitize_crate_name("3dgame"), "_3dgame");
    }

    #[test]
    fn stub_crate_name_falls_back_on_an_empty_stem() {
        assert_eq!(stub_crate_name(Path::new("/")), "ember_program");
    }
}
