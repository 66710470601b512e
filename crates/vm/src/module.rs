//! The `.hbc` module file format: a compiled program's instructions plus
//! its static data section, in a form that round-trips to and from disk.

use crate::instruction::{Instruction, Opcode};
use crate::word::Word;
use hotaru_core::{Arena, Buffer};
use std::io;
use std::path::Path;

/// Magic number stamped at the start of every module file.
pub const MAGIC_NUMBER: u32 = 0xFBADF00D;

/// `(major << 22) | (minor << 12) | revision`, currently 0.1.0.
pub const VERSION: u32 = make_version(0, 1, 0);

const fn make_version(major: u32, minor: u32, revision: u32) -> u32 {
    (major << 22) | (minor << 12) | revision
}

/// Size in bytes of the fixed file header: magic, version, instruction
/// count, a padding word, then four `u64` section offsets/sizes
/// (program start/size, static data start/size), relative to the end of
/// the header.
const HEADER_SIZE: usize = 48;

/// On-disk (and in-memory) size of one encoded instruction: a 4-byte opcode
/// tag, 4 bytes of padding to align the operand, and an 8-byte operand.
const INSTRUCTION_SIZE: usize = 16;

/// An error encountered while loading a module file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleLoadError {
    Truncated,
    BadMagic(u32),
    UnsupportedVersion(u32),
    UnknownOpcode(u32, usize),
}

impl std::fmt::Display for ModuleLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleLoadError::Truncated => write!(f, "file too short to contain a module header"),
            ModuleLoadError::BadMagic(got) => {
                write!(f, "bad magic number: expected {MAGIC_NUMBER:#x}, found {got:#x}")
            }
            ModuleLoadError::UnsupportedVersion(v) => {
                write!(f, "unsupported module version {v:#x}")
            }
            ModuleLoadError::UnknownOpcode(op, index) => {
                write!(f, "unknown opcode {op} at instruction {index}")
            }
        }
    }
}

impl std::error::Error for ModuleLoadError {}

/// A compiled program: a flat instruction sequence plus a static data
/// segment referenced by byte offset (used for string and float literals
/// at present).
#[derive(Debug, Clone, Default)]
pub struct Module {
    instructions: Vec<Instruction>,
    static_data: Vec<u8>,
}

impl Module {
    pub fn new() -> Self {
        Module { instructions: Vec::new(), static_data: Vec::new() }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn static_data(&self) -> &[u8] {
        &self.static_data
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn push(&mut self, inst: Instruction) -> usize {
        let index = self.instructions.len();
        self.instructions.push(inst);
        index
    }

    /// Overwrite a previously pushed instruction's operand — used to
    /// back-patch forward jump targets once the target address is known.
    pub fn patch_operand(&mut self, index: usize, operand: Word) {
        self.instructions[index].operand = operand;
    }

    /// Append raw bytes to the static data segment and return their offset.
    pub fn push_static_data(&mut self, bytes: &[u8]) -> usize {
        let offset = self.static_data.len();
        self.static_data.extend_from_slice(bytes);
        offset
    }

    pub fn encode(&self) -> Vec<u8> {
        let program_size = (self.instructions.len() * INSTRUCTION_SIZE) as u64;
        let static_data_size = self.static_data.len() as u64;
        let mut out = Vec::with_capacity(HEADER_SIZE + program_size as usize + static_data_size as usize);
        out.extend_from_slice(&MAGIC_NUMBER.to_le_bytes());
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&(self.instructions.len() as u32).to_le_bytes());
        out.extend_from_slice(&[0u8; 4]);
        out.extend_from_slice(&0u64.to_le_bytes()); // program_start
        out.extend_from_slice(&program_size.to_le_bytes());
        out.extend_from_slice(&program_size.to_le_bytes()); // static_data_start
        out.extend_from_slice(&static_data_size.to_le_bytes());
        for inst in &self.instructions {
            out.extend_from_slice(&(inst.opcode as u32).to_le_bytes());
            out.extend_from_slice(&[0u8; 4]);
            out.extend_from_slice(&inst.operand.as_u64().to_le_bytes());
        }
        out.extend_from_slice(&self.static_data);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Module, ModuleLoadError> {
        if bytes.len() < HEADER_SIZE {
            return Err(ModuleLoadError::Truncated);
        }
        let magic = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        if magic != MAGIC_NUMBER {
            return Err(ModuleLoadError::BadMagic(magic));
        }
        let version = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        if version != VERSION {
            return Err(ModuleLoadError::UnsupportedVersion(version));
        }
        let inst_count = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;
        let program_start = u64::from_le_bytes(bytes[16..24].try_into().unwrap()) as usize;
        let program_size = u64::from_le_bytes(bytes[24..32].try_into().unwrap()) as usize;
        let static_data_start = u64::from_le_bytes(bytes[32..40].try_into().unwrap()) as usize;
        let static_data_size = u64::from_le_bytes(bytes[40..48].try_into().unwrap()) as usize;

        if bytes.len() < HEADER_SIZE + static_data_start + static_data_size
            || bytes.len() < HEADER_SIZE + program_start + program_size
        {
            return Err(ModuleLoadError::Truncated);
        }

        let mut instructions = Vec::with_capacity(inst_count);
        let mut cursor = HEADER_SIZE + program_start;
        for i in 0..inst_count {
            let raw_op = u32::from_le_bytes(bytes[cursor..cursor + 4].try_into().unwrap());
            let opcode = Opcode::from_u32(raw_op).ok_or(ModuleLoadError::UnknownOpcode(raw_op, i))?;
            let operand_bytes = bytes[cursor + 8..cursor + 16].try_into().unwrap();
            let operand = Word::from_u64(u64::from_le_bytes(operand_bytes));
            instructions.push(Instruction { opcode, operand });
            cursor += INSTRUCTION_SIZE;
        }

        // Copied via an arena-backed buffer rather than a direct `to_vec`,
        // matching how the rest of the toolchain moves bytes it doesn't own
        // the lifetime of.
        let data_cursor = HEADER_SIZE + static_data_start;
        let arena = Arena::new();
        let mut static_buf = Buffer::new(&arena);
        static_buf.push_bytes(&bytes[data_cursor..data_cursor + static_data_size]);
        let static_data = static_buf.as_slice().to_vec();
        Ok(Module { instructions, static_data })
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> io::Result<()> {
        std::fs::write(path, self.encode())
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> io::Result<Module> {
        let bytes = std::fs::read(path)?;
        Module::decode(&bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_preserves_instructions_and_static_data() {
        let mut m = Module::new();
        let offset = m.push_static_data(b"hello");
        m.push(Instruction::with_operand(Opcode::Push, Word::from_i64(offset as i64)));
        m.push(Instruction::new(Opcode::Halt));

        let bytes = m.encode();
        let decoded = Module::decode(&bytes).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded.static_data(), b"hello");
        assert_eq!(decoded.instructions()[0].opcode, Opcode::Push);
        assert_eq!(decoded.instructions()[1].opcode, Opcode::Halt);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = Module::new().encode();
        bytes[0] = 0;
        assert_eq!(Module::decode(&bytes), Err(ModuleLoadError::BadMagic(0xFBADF000)));
    }

    #[test]
    fn rejects_truncated_header() {
        assert_eq!(Module::decode(&[0u8; 4]), Err(ModuleLoadError::Truncated));
    }

    #[test]
    fn patch_operand_rewrites_a_jump_target() {
        let mut m = Module::new();
        let jmp_idx = m.push(Instruction::with_operand(Opcode::Jmp, Word::ZERO));
        m.push(Instruction::new(Opcode::Halt));
        m.patch_operand(jmp_idx, Word::from_i64(1));
        assert_eq!(m.instructions()[jmp_idx].operand.as_i64(), 1);
    }

    #[test]
    fn save_then_load_round_trips_through_disk() {
        let mut m = Module::new();
        m.push(Instruction::with_operand(Opcode::Push, Word::from_i64(42)));
        m.push(Instruction::new(Opcode::Dump));
        m.push(Instruction::new(Opcode::Halt));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.hbc");
        m.save_to_path(&path).unwrap();
        let loaded = Module::load_from_path(&path).unwrap();
        assert_eq!(loaded.len(), 3);
    }
}
