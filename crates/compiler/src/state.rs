//! The compiler/executor: walks the AST and either emits a persistent
//! [`Module`] or drives an [`Hvm`] one statement at a time.
//!
//! A single [`State`] owns both paths and the scope chain they share, so a
//! REPL-style caller can interleave `exec` calls while a later `compile`
//! call (building a separate, persistent module from the same source) still
//! sees the same variable bindings.

use crate::ast::{Block, ElifBlock, Expr, Statement};
use crate::token::BinOp;
use hotaru_core::StringView;
use hotaru_vm::{Hvm, Instruction, Module, Opcode, Trap, Word};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticError {
    InvalidVariable(String),
}

impl std::fmt::Display for SemanticError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SemanticError::InvalidVariable(name) => write!(f, "undefined variable `{name}`"),
        }
    }
}

impl std::error::Error for SemanticError {}

/// An error surfaced by the exec path: either a semantic error while
/// walking the AST, or a VM trap while running an emitted instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    Semantic(SemanticError),
    Trap(Trap),
}

impl std::fmt::Display for ExecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecError::Semantic(e) => write!(f, "{e}"),
            ExecError::Trap(t) => write!(f, "trap: {t}"),
        }
    }
}

impl std::error::Error for ExecError {}

impl From<SemanticError> for ExecError {
    fn from(e: SemanticError) -> Self {
        ExecError::Semantic(e)
    }
}

impl From<Trap> for ExecError {
    fn from(e: Trap) -> Self {
        ExecError::Trap(e)
    }
}

/// A chain of scope frames, innermost last. Each binding records the
/// frame-relative stack position it was pushed at — global bindings (frame
/// 0, whose base never moves) end up addressable as true absolute indices,
/// but a binding made inside a nested `if`/`while` body only ever holds a
/// position relative to *that* body's own frame. Reading such a variable
/// still goes through `Copyabs`/`Swapabs`, which address the whole stack
/// ignoring the frame base — so a variable declared inside a block is only
/// correctly addressable when that block's frame base happens to be zero.
/// This mirrors the distilled source's own `var.pos = vsp` binding scheme
/// and is not something this rewrite attempts to fix; see DESIGN.md.
#[derive(Debug, Default)]
struct Scope<'a> {
    frames: Vec<Vec<(StringView<'a>, usize)>>,
}

impl<'a> Scope<'a> {
    fn new() -> Self {
        Scope { frames: vec![Vec::new()] }
    }

    fn push_frame(&mut self) {
        self.frames.push(Vec::new());
    }

    fn pop_frame(&mut self) {
        self.frames.pop();
    }

    fn bind(&mut self, name: StringView<'a>, pos: usize) {
        self.frames.last_mut().expect("global frame is never popped").push((name, pos));
    }

    /// Resolve `name` scanning innermost-to-outermost, nearest binding wins.
    fn find(&self, name: &str) -> Option<usize> {
        for frame in self.frames.iter().rev() {
            for (bound_name, pos) in frame.iter().rev() {
                if bound_name.as_str() == name {
                    return Some(*pos);
                }
            }
        }
        None
    }
}

fn binop_opcode(op: BinOp) -> Opcode {
    match op {
        BinOp::Add => Opcode::Add,
        BinOp::Sub => Opcode::Sub,
        BinOp::Mul => Opcode::Mul,
        BinOp::Eq => Opcode::Eq,
        BinOp::Ne => Opcode::Ne,
        BinOp::Lt => Opcode::Lt,
        BinOp::Le => Opcode::Le,
        BinOp::Gt => Opcode::Gt,
        BinOp::Ge => Opcode::Ge,
    }
}

/// Owns the VM, the scope chain, and (while compiling) the shadow stack
/// pointer `vsp` that tracks where a value would land at runtime without
/// actually running anything.
pub struct State<'a> {
    vm: Hvm,
    scope: Scope<'a>,
    vsp: usize,
}

impl<'a> State<'a> {
    pub fn new(vm: Hvm) -> Self {
        State { vm, scope: Scope::new(), vsp: 0 }
    }

    pub fn vm(&self) -> &Hvm {
        &self.vm
    }

    pub fn vm_mut(&mut self) -> &mut Hvm {
        &mut self.vm
    }

    // ---- compile path ---------------------------------------------------

    /// Compile a whole program into a fresh, `Halt`-terminated module ready
    /// to hand to `Hvm::exec_module` or serialize to disk.
    pub fn compile_module(&mut self, program: &Block<'a>) -> Result<Module, SemanticError> {
        let mut module = Module::new();
        for stmt in program {
            self.compile_stmt(stmt, &mut module)?;
        }
        module.push(Instruction::new(Opcode::Halt));
        Ok(module)
    }

    fn compile_expr(&mut self, expr: &Expr<'a>, module: &mut Module) -> Result<(), SemanticError> {
        match expr {
            Expr::IntLiteral(n) => {
                module.push(Instruction::with_operand(Opcode::Push, Word::from_i64(*n)));
                self.vsp += 1;
            }
            Expr::FloatLiteral(f) => {
                module.push(Instruction::with_operand(Opcode::Push, Word::from_f64(*f)));
                self.vsp += 1;
            }
            Expr::VarRead(name) => {
                let pos = self.resolve(name)?;
                module.push(Instruction::with_operand(Opcode::Copyabs, Word::from_i64(pos as i64)));
                self.vsp += 1;
            }
            Expr::BinOp { op, left, right } => {
                self.compile_expr(left, module)?;
                self.compile_expr(right, module)?;
                module.push(Instruction::new(binop_opcode(*op)));
                self.vsp -= 1;
            }
        }
        Ok(())
    }

    pub fn compile_stmt(&mut self, stmt: &Statement<'a>, module: &mut Module) -> Result<(), SemanticError> {
        match stmt {
            Statement::VarInit { name, value } => {
                let pos = self.vsp;
                self.compile_expr(value, module)?;
                self.scope.bind(*name, pos);
            }
            Statement::VarAssign { name, value } => {
                let pos = self.resolve(name)?;
                self.compile_expr(value, module)?;
                module.push(Instruction::with_operand(Opcode::Swapabs, Word::from_i64(pos as i64)));
                module.push(Instruction::new(Opcode::Pop));
                self.vsp -= 1;
            }
            Statement::Dump(expr) => {
                self.compile_expr(expr, module)?;
                module.push(Instruction::new(Opcode::Dump));
            }
            Statement::If { condition, body, elifs, else_body } => {
                self.compile_if(condition, body, elifs, else_body, module)?;
            }
            Statement::While { condition, body } => {
                self.compile_while(condition, body, module)?;
            }
        }
        Ok(())
    }

    /// Compile a `{ ... }` block: a fresh scope frame bracketed by
    /// `BeginScope`/`EndScope`. `vsp` is saved and restored around it, since
    /// a block-local binding must not shift the positions of anything
    /// declared after the block returns.
    fn compile_block(&mut self, block: &Block<'a>, module: &mut Module) -> Result<(), SemanticError> {
        module.push(Instruction::new(Opcode::BeginScope));
        let saved_vsp = self.vsp;
        self.vsp = 0;
        self.scope.push_frame();

        for stmt in block {
            self.compile_stmt(stmt, module)?;
        }

        self.scope.pop_frame();
        self.vsp = saved_vsp;
        module.push(Instruction::new(Opcode::EndScope));
        Ok(())
    }

    fn compile_if(
        &mut self,
        condition: &Expr<'a>,
        body: &Block<'a>,
        elifs: &[ElifBlock<'a>],
        else_body: &Block<'a>,
        module: &mut Module,
    ) -> Result<(), SemanticError> {
        let mut completion_jumps = Vec::new();

        self.compile_expr(condition, module)?;
        self.vsp -= 1; // Jz pops the condition.
        let mut jz_idx = module.push(Instruction::with_operand(Opcode::Jz, Word::ZERO));
        self.compile_block(body, module)?;
        completion_jumps.push(module.push(Instruction::with_operand(Opcode::Jmp, Word::ZERO)));
        module.patch_operand(jz_idx, Word::from_i64(module.len() as i64));

        for elif in elifs {
            self.compile_expr(&elif.condition, module)?;
            self.vsp -= 1;
            jz_idx = module.push(Instruction::with_operand(Opcode::Jz, Word::ZERO));
            self.compile_block(&elif.body, module)?;
            completion_jumps.push(module.push(Instruction::with_operand(Opcode::Jmp, Word::ZERO)));
            module.patch_operand(jz_idx, Word::from_i64(module.len() as i64));
        }

        self.compile_block(else_body, module)?;

        let completion = module.len() as i64;
        for idx in completion_jumps {
            module.patch_operand(idx, Word::from_i64(completion));
        }
        Ok(())
    }

    fn compile_while(&mut self, condition: &Expr<'a>, body: &Block<'a>, module: &mut Module) -> Result<(), SemanticError> {
        module.push(Instruction::new(Opcode::BeginScope));
        let saved_vsp = self.vsp;
        self.vsp = 0;
        self.scope.push_frame();

        let loop_start = module.len() as i64;
        self.compile_expr(condition, module)?;
        self.vsp -= 1;
        let jz_idx = module.push(Instruction::with_operand(Opcode::Jz, Word::ZERO));

        for stmt in body {
            self.compile_stmt(stmt, module)?;
        }

        module.push(Instruction::with_operand(Opcode::Jmp, Word::from_i64(loop_start)));
        module.patch_operand(jz_idx, Word::from_i64(module.len() as i64));

        self.scope.pop_frame();
        self.vsp = saved_vsp;
        module.push(Instruction::new(Opcode::EndScope));
        Ok(())
    }

    fn resolve(&self, name: &StringView<'a>) -> Result<usize, SemanticError> {
        self.scope
            .find(name.as_str())
            .ok_or_else(|| SemanticError::InvalidVariable(name.as_str().to_string()))
    }

    // ---- exec path --------------------------------------------------------

    /// Run a whole program one statement at a time, REPL-style.
    pub fn exec_program(&mut self, program: &Block<'a>) -> Result<(), ExecError> {
        for stmt in program {
            self.exec_stmt(stmt)?;
        }
        Ok(())
    }

    fn exec_expr(&mut self, expr: &Expr<'a>) -> Result<(), ExecError> {
        match expr {
            Expr::IntLiteral(n) => {
                self.vm.exec(Instruction::with_operand(Opcode::Push, Word::from_i64(*n)), 0)?;
            }
            Expr::FloatLiteral(f) => {
                self.vm.exec(Instruction::with_operand(Opcode::Push, Word::from_f64(*f)), 0)?;
            }
            Expr::VarRead(name) => {
                let pos = self.resolve(name)?;
                self.vm.exec(Instruction::with_operand(Opcode::Copyabs, Word::from_i64(pos as i64)), 0)?;
            }
            Expr::BinOp { op, left, right } => {
                self.exec_expr(left)?;
                self.exec_expr(right)?;
                self.vm.exec(Instruction::new(binop_opcode(*op)), 0)?;
            }
        }
        Ok(())
    }

    pub fn exec_stmt(&mut self, stmt: &Statement<'a>) -> Result<(), ExecError> {
        match stmt {
            Statement::VarInit { name, value } => {
                let pos = self.vm.sp();
                self.exec_expr(value)?;
                self.scope.bind(*name, pos);
            }
            Statement::VarAssign { name, value } => {
                let pos = self.resolve(name)?;
                self.exec_expr(value)?;
                self.vm.exec(Instruction::with_operand(Opcode::Swapabs, Word::from_i64(pos as i64)), 0)?;
                self.vm.exec(Instruction::new(Opcode::Pop), 0)?;
            }
            Statement::Dump(expr) => {
                self.exec_expr(expr)?;
                self.vm.exec(Instruction::new(Opcode::Dump), 0)?;
            }
            Statement::If { .. } | Statement::While { .. } => {
                self.exec_control_flow(stmt)?;
            }
        }
        Ok(())
    }

    /// Compile an `if`/`while` into a throwaway module and run it to
    /// completion, then restore the REPL's program counter. `vsp` is
    /// synced to the VM's real `sp` first so the shadow tracking used by
    /// the (reused) compile helpers lines up with what will actually
    /// happen when the module executes.
    fn exec_control_flow(&mut self, stmt: &Statement<'a>) -> Result<(), ExecError> {
        self.vsp = self.vm.sp();
        let mut module = Module::new();
        match stmt {
            Statement::While { condition, body } => self.compile_while(condition, body, &mut module)?,
            Statement::If { condition, body, elifs, else_body } => {
                self.compile_if(condition, body, elifs, else_body, &mut module)?
            }
            _ => unreachable!("only if/while reach exec_control_flow"),
        }
        module.push(Instruction::new(Opcode::Halt));
        self.vm.exec_nested_module(&module)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use hotaru_core::Arena;

    fn parse<'a>(arena: &'a Arena, src: &'a str) -> Block<'a> {
        Parser::new(src, arena).parse_program().unwrap()
    }

    #[test]
    fn compiles_var_init_and_assign_to_the_documented_instruction_sequence() {
        let arena = Arena::new();
        let program = parse(&arena, "var x = 1; x = x + 2;");
        let mut state = State::new(Hvm::new());
        let module = state.compile_module(&program).unwrap();

        let ops: Vec<Opcode> = module.instructions().iter().map(|i| i.opcode).collect();
        assert_eq!(
            ops,
            vec![
                Opcode::Push,
                Opcode::Copyabs,
                Opcode::Push,
                Opcode::Add,
                Opcode::Swapabs,
                Opcode::Pop,
                Opcode::Halt,
            ]
        );
    }

    #[test]
    fn compile_then_run_leaves_the_right_hand_operand_asymmetry_visible() {
        // `var x = 1 + 2 * 3;` is right-associative: `1 + (2 * 3)` = 7.
        let arena = Arena::new();
        let program = parse(&arena, "var x = 1 + 2 * 3; dd x;");
        let mut state = State::new(Hvm::new());
        let module = state.compile_module(&program).unwrap();
        let mut vm = Hvm::new();
        vm.exec_module(&module).unwrap();
        assert_eq!(vm.sp(), 1);
    }

    #[test]
    fn compile_rejects_reads_of_undefined_variables() {
        let arena = Arena::new();
        let program = parse(&arena, "dd missing;");
        let mut state = State::new(Hvm::new());
        let err = state.compile_module(&program).unwrap_err();
        assert_eq!(err, SemanticError::InvalidVariable("missing".to_string()));
    }

    #[test]
    fn compiled_if_skips_the_body_when_condition_is_zero() {
        let arena = Arena::new();
        let program = parse(&arena, "var x = 0; if (x) { x = 99; } dd x;");
        let mut state = State::new(Hvm::new());
        let module = state.compile_module(&program).unwrap();
        let mut vm = Hvm::new();
        vm.exec_module(&module).unwrap();
        assert_eq!(vm.top().unwrap().as_i64(), 0);
    }

    #[test]
    fn compiled_if_elif_else_takes_the_elif_branch() {
        let arena = Arena::new();
        let program = parse(
            &arena,
            "var x = 0; if (x) { x = 1; } elif (1) { x = 2; } else { x = 3; } dd x;",
        );
        let mut state = State::new(Hvm::new());
        let module = state.compile_module(&program).unwrap();
        let mut vm = Hvm::new();
        vm.exec_module(&module).unwrap();
        assert_eq!(vm.top().unwrap().as_i64(), 2);
    }

    #[test]
    fn compiled_while_counts_down_to_zero() {
        let arena = Arena::new();
        let program = parse(&arena, "var i = 3; while (i) { i = i - 1; } dd i;");
        let mut state = State::new(Hvm::new());
        let module = state.compile_module(&program).unwrap();
        let mut vm = Hvm::new();
        vm.exec_module(&module).unwrap();
        assert_eq!(vm.top().unwrap().as_i64(), 0);
    }

    #[test]
    fn compiled_nested_if_inside_while_body_addresses_correctly() {
        // A regression check for the rebasing bug this rewrite avoids:
        // nested control flow inside a loop body must still jump to the
        // right place once everything lands in one flat module.
        let arena = Arena::new();
        let program = parse(
            &arena,
            "var i = 3; var hits = 0; while (i) { if (i) { hits = hits + 1; } i = i - 1; } dd hits;",
        );
        let mut state = State::new(Hvm::new());
        let module = state.compile_module(&program).unwrap();
        let mut vm = Hvm::new();
        vm.exec_module(&module).unwrap();
        assert_eq!(vm.top().unwrap().as_i64(), 3);
    }

    #[test]
    fn exec_path_runs_statements_one_at_a_time() {
        let arena = Arena::new();
        let program = parse(&arena, "var x = 10; x = x + 5;");
        let mut state = State::new(Hvm::new());
        state.exec_program(&program).unwrap();
        assert_eq!(state.vm().sp(), 1);
        assert_eq!(state.vm().top().unwrap().as_i64(), 15);
    }

    #[test]
    fn right_associative_assign_leaves_documented_stack_shape() {
        // `489 - hello + world` parses flat-right-associative as
        // `489 - (hello + world)` = `489 - (35 + 34)` = 420. `hello` sits
        // below `world` on the stack, and the assignment rewrites hello's
        // slot in place via Swapabs+Pop, so the top two words end up
        // `[420, 34]`.
        let arena = Arena::new();
        let program = parse(&arena, "var hello = 35; var world = 34; hello = 489 - hello + world;");
        let mut state = State::new(Hvm::new());
        state.exec_program(&program).unwrap();
        assert_eq!(state.vm().sp(), 2);
        let hello = state.vm().stack_word_at(0).as_i64();
        let world = state.vm().stack_word_at(1).as_i64();
        assert_eq!((hello, world), (420, 34));
    }

    #[test]
    fn exec_path_while_loop_counts_down() {
        let arena = Arena::new();
        let program = parse(&arena, "var i = 3; while (i) { i = i - 1; }");
        let mut state = State::new(Hvm::new());
        state.exec_program(&program).unwrap();
        assert_eq!(state.vm().top().unwrap().as_i64(), 0);
    }

    #[test]
    fn exec_path_reports_undefined_variable_as_a_semantic_error() {
        let arena = Arena::new();
        let program = parse(&arena, "x = 1;");
        let mut state = State::new(Hvm::new());
        let err = state.exec_program(&program).unwrap_err();
        assert_eq!(err, ExecError::Semantic(SemanticError::InvalidVariable("x".to_string())));
    }
}
