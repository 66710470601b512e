//! Opcodes and instructions executed by the [`crate::vm::Hvm`].

use crate::word::Word;

/// One HVM opcode.
///
/// Numeric values are stable: they are written verbatim into `.hbc` module
/// files, so reordering or renumbering this enum breaks the on-disk format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Opcode {
    Halt = 0,
    BeginScope = 1,
    EndScope = 2,
    Pop = 3,
    Push = 4,
    Copy = 5,
    Bcopy = 6,
    Copyabs = 7,
    Swap = 8,
    Bswap = 9,
    Swapabs = 10,
    Add = 11,
    Sub = 12,
    Mul = 13,
    Eq = 14,
    Ne = 15,
    Lt = 16,
    Le = 17,
    Gt = 18,
    Ge = 19,
    Cmp = 20,
    Fadd = 21,
    Fsub = 22,
    Fmul = 23,
    Fcmp = 24,
    Jmp = 25,
    Jz = 26,
    Jn = 27,
    Dump = 28,
}

impl Opcode {
    /// Decode a raw `u32` as read from a module file.
    pub fn from_u32(v: u32) -> Option<Opcode> {
        use Opcode::*;
        let op = match v {
            0 => Halt,
            1 => BeginScope,
            2 => EndScope,
            3 => Pop,
            4 => Push,
            5 => Copy,
            6 => Bcopy,
            7 => Copyabs,
            8 => Swap,
            9 => Bswap,
            10 => Swapabs,
            11 => Add,
            12 => Sub,
            13 => Mul,
            14 => Eq,
            15 => Ne,
            16 => Lt,
            17 => Le,
            18 => Gt,
            19 => Ge,
            20 => Cmp,
            21 => Fadd,
            22 => Fsub,
            23 => Fmul,
            24 => Fcmp,
            25 => Jmp,
            26 => Jz,
            27 => Jn,
            28 => Dump,
            _ => return None,
        };
        Some(op)
    }

    pub fn info(self) -> OpcodeInfo {
        opcode_info(self)
    }
}

/// Static metadata about an opcode: its mnemonic, whether it carries an
/// operand word, and the minimum stack-pointer depth (relative to the
/// current scope base) it needs to execute without underflowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    pub name: &'static str,
    pub has_operand: bool,
    pub min_sp: u32,
}

fn opcode_info(op: Opcode) -> OpcodeInfo {
    use Opcode::*;
    match op {
        Halt => OpcodeInfo { name: "halt", has_operand: false, min_sp: 0 },
        BeginScope => OpcodeInfo { name: "begin_scope", has_operand: false, min_sp: 0 },
        EndScope => OpcodeInfo { name: "end_scope", has_operand: false, min_sp: 0 },
        Pop => OpcodeInfo { name: "pop", has_operand: false, min_sp: 1 },
        Push => OpcodeInfo { name: "push", has_operand: true, min_sp: 0 },
        Copy => OpcodeInfo { name: "copy", has_operand: true, min_sp: 0 },
        Bcopy => OpcodeInfo { name: "bcopy", has_operand: true, min_sp: 0 },
        Copyabs => OpcodeInfo { name: "copyabs", has_operand: true, min_sp: 0 },
        Swap => OpcodeInfo { name: "swap", has_operand: true, min_sp: 0 },
        Bswap => OpcodeInfo { name: "bswap", has_operand: true, min_sp: 0 },
        Swapabs => OpcodeInfo { name: "swapabs", has_operand: true, min_sp: 0 },
        Add => OpcodeInfo { name: "add", has_operand: false, min_sp: 2 },
        Sub => OpcodeInfo { name: "sub", has_operand: false, min_sp: 2 },
        Mul => OpcodeInfo { name: "mul", has_operand: false, min_sp: 2 },
        Eq => OpcodeInfo { name: "eq", has_operand: false, min_sp: 2 },
        Ne => OpcodeInfo { name: "ne", has_operand: false, min_sp: 2 },
        Lt => OpcodeInfo { name: "lt", has_operand: false, min_sp: 2 },
        Le => OpcodeInfo { name: "le", has_operand: false, min_sp: 2 },
        Gt => OpcodeInfo { name: "gt", has_operand: false, min_sp: 2 },
        Ge => OpcodeInfo { name: "ge", has_operand: false, min_sp: 2 },
        Cmp => OpcodeInfo { name: "cmp", has_operand: false, min_sp: 2 },
        Fadd => OpcodeInfo { name: "fadd", has_operand: false, min_sp: 2 },
        Fsub => OpcodeInfo { name: "fsub", has_operand: false, min_sp: 2 },
        Fmul => OpcodeInfo { name: "fmul", has_operand: false, min_sp: 2 },
        Fcmp => OpcodeInfo { name: "fcmp", has_operand: false, min_sp: 2 },
        // `has_operand` is display metadata only (it governs whether a
        // disassembly prints an instruction's operand) — the jump opcodes
        // are marked `false` in the distilled source despite carrying a
        // real jump-target operand, and `dump` is absent from its table
        // entirely (so it zero-initializes to `false`/`min_sp: 0`). Both
        // are preserved here for fidelity with `bcdump` output.
        Jmp => OpcodeInfo { name: "jmp", has_operand: false, min_sp: 0 },
        Jz => OpcodeInfo { name: "jz", has_operand: false, min_sp: 1 },
        Jn => OpcodeInfo { name: "jn", has_operand: false, min_sp: 1 },
        Dump => OpcodeInfo { name: "dump", has_operand: false, min_sp: 0 },
    }
}

/// A single decoded instruction: an opcode plus its (possibly unused)
/// operand word.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operand: Word,
}

impl Instruction {
    pub fn new(opcode: Opcode) -> Self {
        Instruction { opcode, operand: Word::ZERO }
    }

    pub fn with_operand(opcode: Opcode, operand: Word) -> Self {
        Instruction { opcode, operand }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_every_encoded_opcode() {
        for raw in 0..=28u32 {
            let op = Opcode::from_u32(raw).expect("opcode in range must decode");
            assert_eq!(op as u32, raw);
        }
        assert_eq!(Opcode::from_u32(29), None);
    }

    #[test]
    fn absolute_variants_never_require_local_stack_depth() {
        // Copyabs/Swapabs address the whole stack, so unlike Jz/Jn they
        // don't require anything to already be on the current frame.
        assert_eq!(Opcode::Copy.info().min_sp, 0);
        assert_eq!(Opcode::Copyabs.info().min_sp, 0);
        assert_eq!(Opcode::Swap.info().min_sp, 0);
        assert_eq!(Opcode::Swapabs.info().min_sp, 0);
    }

    #[test]
    fn binary_ops_require_two_operands_on_stack() {
        for op in [Opcode::Add, Opcode::Sub, Opcode::Mul, Opcode::Cmp, Opcode::Fcmp] {
            assert_eq!(op.info().min_sp, 2);
        }
    }
}
