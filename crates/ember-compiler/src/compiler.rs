//! The single-pass AST-to-bytecode compiler.
//!
//! One traversal of the AST, emitting into one [`Chunk`] and resolving
//! names through one shared [`SymbolTable`]. Expression compilation
//! leaves exactly one `Value` on the stack; statement compilation
//! leaves the stack balanced.

use crate::error::{CompileError, ImportFailure};
use crate::loader::SourceLoader;
use ember_core::{Chunk, OpCode, SymbolTable, Value, MAX_CONSTANTS};
use ember_parser::ast::{BinOp, Block, Expr, Literal, Pos, Stmt, UnOp};
use ember_parser::parser::Parser;
use std::path::Path;

struct Compiler<'a> {
    chunk: Chunk,
    symbols: SymbolTable,
    loader: &'a dyn SourceLoader,
    errors: Vec<CompileError>,
}

/// Compiles `source` (the entry unit) into a single [`Chunk`], splicing
/// in any `import`ed units along the way. Equivalent to
/// [`compile_source_with_limits`] with the built-in constant-pool cap.
pub fn compile_source(source: &str, loader: &dyn SourceLoader) -> Result<Chunk, Vec<CompileError>> {
    compile_source_with_limits(source, loader, MAX_CONSTANTS)
}

/// Compiles `source` the same way [`compile_source`] does, but caps the
/// constants pool at `max_constants` instead of the built-in default -
/// the seam `emberc` uses to honor a `.emberc.toml`-configured limit.
pub fn compile_source_with_limits(
    source: &str,
    loader: &dyn SourceLoader,
    max_constants: usize,
) -> Result<Chunk, Vec<CompileError>> {
    let program = Parser::new(source)
        .parse()
        .map_err(|errs| errs.into_iter().map(CompileError::Parse).collect::<Vec<_>>())?;

    tracing::debug!(statements = program.statements.len(), "compiling top-level program");

    let mut compiler = Compiler {
        chunk: Chunk::with_max_constants(max_constants),
        symbols: SymbolTable::new(),
        loader,
        errors: Vec::new(),
    };
    for stmt in &program.statements {
        compiler.compile_stmt(stmt);
    }
    compiler.chunk.write_byte(OpCode::Eof as u8);

    if compiler.errors.is_empty() {
        Ok(compiler.chunk)
    } else {
        Err(compiler.errors)
    }
}

impl<'a> Compiler<'a> {
    fn emit_constant(&mut self, value: Value, pos: Pos) {
        match self.chunk.add_constant(value) {
            Ok(idx) => {
                self.chunk.write_byte(OpCode::LoadConst as u8);
                self.chunk.write_byte(idx);
            }
            Err(_) => self.errors.push(CompileError::ConstantPoolFull(pos)),
        }
    }

    fn symbol_index(&mut self, name: &str, is_function: bool, pos: Pos) -> Option<u8> {
        match self.symbols.get_or_insert(name, is_function) {
            Ok(symbol) => Some(symbol.index),
            Err(_) => {
                self.errors.push(CompileError::SymbolTableFull(pos));
                None
            }
        }
    }

    // ---- jump back-patching ---------------------------------------------

    /// Emits `op` followed by a `0xFF 0xFF` placeholder and returns the
    /// offset just past it (where `patch_jump` computes the forward
    /// distance from).
    fn emit_jump(&mut self, op: OpCode) -> usize {
        self.chunk.write_byte(op as u8);
        self.chunk.write_byte(0xFF);
        self.chunk.write_byte(0xFF);
        self.chunk.code_len()
    }

    /// Patches the placeholder ending at `operand_end` with the distance
    /// from there to the current end of code, big-endian.
    fn patch_jump(&mut self, operand_end: usize, pos: Pos) {
        let distance = self.chunk.code_len() - operand_end;
        if distance > u16::MAX as usize {
            self.errors.push(CompileError::JumpTooLarge(pos));
            return;
        }
        self.chunk.code[operand_end - 2] = ((distance >> 8) & 0xFF) as u8;
        self.chunk.code[operand_end - 1] = (distance & 0xFF) as u8;
    }

    /// Emits `LOOP` with the backward distance back to `loop_start`.
    fn emit_loop(&mut self, loop_start: usize, pos: Pos) {
        self.chunk.write_byte(OpCode::Loop as u8);
        let operand_start = self.chunk.code_len();
        let distance = (operand_start - loop_start) + 2;
        if distance > u16::MAX as usize {
            self.errors.push(CompileError::JumpTooLarge(pos));
            self.chunk.write_byte(0);
            self.chunk.write_byte(0);
            return;
        }
        self.chunk.write_byte(((distance >> 8) & 0xFF) as u8);
        self.chunk.write_byte((distance & 0xFF) as u8);
    }

    // ---- expressions ---------------------------------------------------

    fn compile_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal { value, pos } => {
                let value = literal_to_value(value);
                self.emit_constant(value, *pos);
            }
            Expr::Variable { name, pos } => {
                if let Some(idx) = self.symbol_index(name, false, *pos) {
                    self.chunk.write_byte(OpCode::LoadVar as u8);
                    self.chunk.write_byte(idx);
                }
            }
            Expr::Assign { name, value, pos } => {
                // Reached only when `=` is nested inside another
                // expression (chained assignment, a call argument, an
                // array element, ...) - the statement-level form goes
                // through `Stmt::Assign` instead and never calls back
                // into `compile_expr`. Expression compilation must leave
                // exactly one value on the stack, so unlike
                // the statement form this re-pushes the stored value via
                // `DUP` before `STORE_VAR` (see DESIGN.md open question
                // resolution for the "assignment as expression" case).
                self.compile_expr(value);
                self.chunk.write_byte(OpCode::Dup as u8);
                if let Some(idx) = self.symbol_index(name, false, *pos) {
                    self.chunk.write_byte(OpCode::StoreVar as u8);
                    self.chunk.write_byte(idx);
                }
            }
            Expr::Unary { op, operand, .. } => {
                self.compile_expr(operand);
                let opcode = match op {
                    UnOp::Neg => OpCode::Neg,
                    UnOp::Not => OpCode::Not,
                };
                self.chunk.write_byte(opcode as u8);
            }
            Expr::Binary { op, left, right, .. } => {
                self.compile_expr(left);
                self.compile_expr(right);
                self.chunk.write_byte(binop_opcode(*op) as u8);
            }
            Expr::ArrayLiteral { elements, .. } => {
                self.chunk.write_byte(OpCode::NewArray as u8);
                for element in elements {
                    self.chunk.write_byte(OpCode::Dup as u8);
                    self.compile_expr(element);
                    self.chunk.write_byte(OpCode::ArrayPush as u8);
                }
            }
            Expr::Index { target, index, .. } => {
                self.compile_expr(target);
                self.compile_expr(index);
                self.chunk.write_byte(OpCode::GetIndex as u8);
            }
            Expr::Call { callee, args, pos } => {
                if callee == "print" {
                    // `print` is special-cased: every argument is compiled
                    // (pushed), but only a single PRINT is emitted
                    // regardless of argument count.
                    for arg in args {
                        self.compile_expr(arg);
                    }
                    self.chunk.write_byte(OpCode::Print as u8);
                } else {
                    for arg in args {
                        self.compile_expr(arg);
                    }
                    if args.len() > u8::MAX as usize {
                        self.errors.push(CompileError::TooManyArguments(*pos));
                        return;
                    }
                    if let Some(idx) = self.symbol_index(callee, true, *pos) {
                        self.chunk.write_byte(OpCode::Call as u8);
                        self.chunk.write_byte(idx);
                        self.chunk.write_byte(args.len() as u8);
                    }
                }
            }
        }
    }

    // ---- statements ----------------------------------------------------

    fn compile_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl { name, init, pos, .. } => {
                match init {
                    Some(expr) => self.compile_expr(expr),
                    None => self.emit_constant(Value::Null, *pos),
                }
                if let Some(idx) = self.symbol_index(name, false, *pos) {
                    self.chunk.write_byte(OpCode::StoreVar as u8);
                    self.chunk.write_byte(idx);
                }
            }
            Stmt::Assign { name, value, pos } => {
                self.compile_expr(value);
                if let Some(idx) = self.symbol_index(name, false, *pos) {
                    self.chunk.write_byte(OpCode::StoreVar as u8);
                    self.chunk.write_byte(idx);
                }
            }
            Stmt::ExprStmt { expr, .. } => {
                self.compile_expr(expr);
                // PRINT already consumes its operand and leaves nothing
                // behind, so a bare `print(...);` statement must not be
                // followed by a POP - statement compilation's invariant
                // is a balanced stack, not "always emit POP" (see
                // DESIGN.md).
                if !is_print_call(expr) {
                    self.chunk.write_byte(OpCode::Pop as u8);
                }
            }
            Stmt::If { cond, then_branch, else_branch, .. } => {
                let pos = cond.pos();
                self.compile_expr(cond);
                let false_jump = self.emit_jump(OpCode::JumpIfFalse);
                self.compile_block(then_branch);
                let end_jump = self.emit_jump(OpCode::Jump);
                self.patch_jump(false_jump, pos);
                if let Some(else_stmt) = else_branch {
                    self.compile_stmt(else_stmt);
                }
                self.patch_jump(end_jump, pos);
            }
            Stmt::While { cond, body, pos } => {
                let loop_start = self.chunk.code_len();
                self.compile_expr(cond);
                let false_jump = self.emit_jump(OpCode::JumpIfFalse);
                self.compile_block(body);
                self.emit_loop(loop_start, *pos);
                self.patch_jump(false_jump, *pos);
            }
            Stmt::For { init, cond, increment, body, pos } => {
                if let Some(init_stmt) = init {
                    self.compile_stmt(init_stmt);
                }
                let loop_start = self.chunk.code_len();
                match cond {
                    Some(expr) => self.compile_expr(expr),
                    None => self.emit_constant(Value::Boolean(true), *pos),
                }
                let false_jump = self.emit_jump(OpCode::JumpIfFalse);
                self.compile_block(body);
                if let Some(increment) = increment {
                    self.compile_expr(increment);
                    self.chunk.write_byte(OpCode::Pop as u8);
                }
                self.emit_loop(loop_start, *pos);
                self.patch_jump(false_jump, *pos);
            }
            Stmt::FunctionDef { name, pos, .. } => {
                // Reserve a symbol index; no body code is emitted in
                // this revision (function calls are partially stubbed,
                // see DESIGN.md).
                self.symbol_index(name, true, *pos);
            }
            Stmt::Switch { pos, .. } => {
                self.errors.push(CompileError::UnimplementedSwitch(*pos));
            }
            Stmt::Block { body, .. } => self.compile_block(body),
            Stmt::Import { path, pos } => self.compile_import(path, *pos),
            Stmt::Error { .. } => {
                // A successful parse never contains these; defensive only.
            }
        }
    }

    fn compile_block(&mut self, block: &Block) {
        for stmt in block {
            self.compile_stmt(stmt);
        }
    }

    fn compile_import(&mut self, path: &str, pos: Pos) {
        let source = match self.loader.load(Path::new(path)) {
            Ok(source) => source,
            Err(e) => {
                self.errors.push(CompileError::Import {
                    path: path.to_string(),
                    pos,
                    source: ImportFailure::Io(e),
                });
                return;
            }
        };
        let program = match Parser::new(&source).parse() {
            Ok(program) => program,
            Err(errs) => {
                self.errors.push(CompileError::Import {
                    path: path.to_string(),
                    pos,
                    source: ImportFailure::Parse(errs),
                });
                return;
            }
        };
        tracing::debug!(path, "splicing imported unit into the shared chunk");
        // Recursive compile into the same chunk/symbol table. Splicing
        // in-place this way never appends the sub-unit's own EOF
        // sentinel, so an imported file's statements land inline as if
        // they had been textually pasted in.
        self.compile_block(&program.statements);
    }
}

fn is_print_call(expr: &Expr) -> bool {
    matches!(expr, Expr::Call { callee, .. } if callee == "print")
}

fn literal_to_value(literal: &Literal) -> Value {
    match literal {
        Literal::Number(n) => Value::Number(*n),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Boolean(b) => Value::Boolean(*b),
        Literal::Null => Value::Null,
    }
}

fn binop_opcode(op: BinOp) -> OpCode {
    match op {
        BinOp::Add => OpCode::Add,
        BinOp::Sub => OpCode::Sub,
        BinOp::Mul => OpCode::Mul,
        BinOp::Div => OpCode::Div,
        BinOp::Mod => OpCode::Mod,
        BinOp::Eq => OpCode::Eq,
        BinOp::Neq => OpCode::Neq,
        BinOp::Lt => OpCode::Lt,
        BinOp::Gt => OpCode::Gt,
        BinOp::Lte => OpCode::Lte,
        BinOp::Gte => OpCode::Gte,
        BinOp::And => OpCode::And,
        BinOp::Or => OpCode::Or,
    }
}
