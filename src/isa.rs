#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Nop = 0x00,
    LdxImm = 0x01,
    LdxReg = 0x02,
    SetImm = 0x03,
    SetReg = 0x04,
    Get = 0x05,
    ExcImm = 0x06,
    ExcReg = 0x07,
    JitImm = 0x08,
    JitImmReg = 0x09,
    JitRegImm = 0x0A,
    JitReg = 0x0B,
    JifImm = 0x0C,
    JifImmReg = 0x0D,
    JifRegImm = 0x0E,
    JifReg = 0x0F,
    AddImm = 0x10,
    AddReg = 0x11,
    SubImm = 0x12,
    SubReg = 0x13,
    MulImm = 0x14,
    MulReg = 0x15,
    DivImm = 0x16,
    DivReg = 0x17,
    AndImm = 0x18,
    AndReg = 0x19,
    OrImm = 0x1A,
    OrReg = 0x1B,
    XorImm = 0x1C,
    XorReg = 0x1D,
    ShlImm = 0x1E,
    ShlReg = 0x1F,
    ShrImm = 0x20,
    ShrReg = 0x21,
    Not = 0x22,
    CmpImm = 0x23,
    CmpReg = 0x24,
}

impl OpCode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Nop => "nop",
            OpCode::LdxImm => "ldx x,v",
            OpCode::LdxReg => "ldx x,x",
            OpCode::SetImm => "set v",
            OpCode::SetReg => "set x",
            OpCode::Get => "get x",
            OpCode::ExcImm => "exc v",
            OpCode::ExcReg => "exc x",
            OpCode::JitImm => "jit v,v",
            OpCode::JitImmReg => "jit v,x",
            OpCode::JitRegImm => "jit x,v",
            OpCode::JitReg => "jit x,x",
            OpCode::JifImm => "jif v,v",
            OpCode::JifImmReg => "jif v,x",
            OpCode::JifRegImm => "jif x,v",
            OpCode::JifReg => "jif x,x",
            OpCode::AddImm => "add x,v",
            OpCode::AddReg => "add x,x",
            OpCode::SubImm => "sub x,v",
            OpCode::SubReg => "sub x,x",
            OpCode::MulImm => "mul x,v",
            OpCode::MulReg => "mul x,x",
            OpCode::DivImm => "div x,v",
            OpCode::DivReg => "div x,x",
            OpCode::AndImm => "and x,v",
            OpCode::AndReg => "and x,x",
            OpCode::OrImm => "or x,v",
            OpCode::OrReg => "or x,x",
            OpCode::XorImm => "xor x,v",
            OpCode::XorReg => "xor x,x",
            OpCode::ShlImm => "shl x,v",
            OpCode::ShlReg => "shl x,x",
            OpCode::ShrImm => "shr x,v",
            OpCode::ShrReg => "shr x,x",
            OpCode::Not => "not x",
            OpCode::CmpImm => "cmp x,v",
            OpCode::CmpReg => "cmp x,x",
        }
    }
}

pub fn imm16(c: u8, d: u8) -> u32 {
    (u32::from(c) << 8) | u32::from(d)
}

pub fn imm24(b: u8, c: u8, d: u8) -> u32 {
    (u32::from(b) << 16) | (u32::from(c) << 8) | u32::from(d)
}

/// Jump target offset of the `v,v` branch forms: operand bytes `b` and
/// `c`, with `d` left for the flag literal.
pub fn jump_offset(b: u8, c: u8) -> u32 {
    (u32::from(b) << 8) | u32::from(c)
}

/// Emits fixed 4-byte instructions. One method per instruction form.
pub struct BytecodeBuilder {
    code: Vec<u8>,
}

impl Default for BytecodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BytecodeBuilder {
    pub fn new() -> Self {
        Self { code: Vec::new() }
    }

    pub fn position(&self) -> u32 {
        self.code.len() as u32
    }

    pub fn finish(self) -> Vec<u8> {
        self.code
    }

    fn emit(&mut self, op: OpCode, b: u8, c: u8, d: u8) {
        self.code.extend_from_slice(&[op as u8, b, c, d]);
    }

    /// Escape hatch for encodings no opcode produces.
    pub fn raw(&mut self, a: u8, b: u8, c: u8, d: u8) {
        self.code.extend_from_slice(&[a, b, c, d]);
    }

    pub fn nop(&mut self) {
        self.emit(OpCode::Nop, 0, 0, 0);
    }

    pub fn ldx_imm(&mut self, reg: u8, value: u16) {
        self.emit(OpCode::LdxImm, reg, hi(value), lo(value));
    }

    pub fn ldx_reg(&mut self, dst: u8, src: u8) {
        self.emit(OpCode::LdxReg, dst, src, 0);
    }

    pub fn set_imm(&mut self, value: u8) {
        self.emit(OpCode::SetImm, value, 0, 0);
    }

    pub fn set_reg(&mut self, reg: u8) {
        self.emit(OpCode::SetReg, reg, 0, 0);
    }

    pub fn get(&mut self, reg: u8) {
        self.emit(OpCode::Get, reg, 0, 0);
    }

    pub fn exc_imm(&mut self, service: u32) {
        self.emit(
            OpCode::ExcImm,
            (service >> 16) as u8,
            (service >> 8) as u8,
            service as u8,
        );
    }

    pub fn exc_reg(&mut self, reg: u8) {
        self.emit(OpCode::ExcReg, reg, 0, 0);
    }

    pub fn jit_imm(&mut self, offset: u16, flag: u8) {
        self.emit(OpCode::JitImm, hi(offset), lo(offset), flag);
    }

    pub fn jit_imm_reg(&mut self, offset: u16, flag_reg: u8) {
        self.emit(OpCode::JitImmReg, hi(offset), lo(offset), flag_reg);
    }

    pub fn jit_reg_imm(&mut self, offset_reg: u8, flag: u16) {
        self.emit(OpCode::JitRegImm, offset_reg, hi(flag), lo(flag));
    }

    pub fn jit_reg(&mut self, offset_reg: u8, flag_reg: u8) {
        self.emit(OpCode::JitReg, offset_reg, flag_reg, 0);
    }

    pub fn jif_imm(&mut self, offset: u16, flag: u8) {
        self.emit(OpCode::JifImm, hi(offset), lo(offset), flag);
    }

    pub fn jif_imm_reg(&mut self, offset: u16, flag_reg: u8) {
        self.emit(OpCode::JifImmReg, hi(offset), lo(offset), flag_reg);
    }

    pub fn jif_reg_imm(&mut self, offset_reg: u8, flag: u16) {
        self.emit(OpCode::JifRegImm, offset_reg, hi(flag), lo(flag));
    }

    pub fn jif_reg(&mut self, offset_reg: u8, flag_reg: u8) {
        self.emit(OpCode::JifReg, offset_reg, flag_reg, 0);
    }

    pub fn add_imm(&mut self, reg: u8, value: u16) {
        self.emit(OpCode::AddImm, reg, hi(value), lo(value));
    }

    pub fn add_reg(&mut self, dst: u8, src: u8) {
        self.emit(OpCode::AddReg, dst, src, 0);
    }

    pub fn sub_imm(&mut self, reg: u8, value: u16) {
        self.emit(OpCode::SubImm, reg, hi(value), lo(value));
    }

    pub fn sub_reg(&mut self, dst: u8, src: u8) {
        self.emit(OpCode::SubReg, dst, src, 0);
    }

    pub fn mul_imm(&mut self, reg: u8, value: u16) {
        self.emit(OpCode::MulImm, reg, hi(value), lo(value));
    }

    pub fn mul_reg(&mut self, dst: u8, src: u8) {
        self.emit(OpCode::MulReg, dst, src, 0);
    }

    pub fn div_imm(&mut self, reg: u8, value: u16) {
        self.emit(OpCode::DivImm, reg, hi(value), lo(value));
    }

    pub fn div_reg(&mut self, dst: u8, src: u8) {
        self.emit(OpCode::DivReg, dst, src, 0);
    }

    pub fn and_imm(&mut self, reg: u8, value: u16) {
        self.emit(OpCode::AndImm, reg, hi(value), lo(value));
    }

    pub fn and_reg(&mut self, dst: u8, src: u8) {
        self.emit(OpCode::AndReg, dst, src, 0);
    }

    pub fn or_imm(&mut self, reg: u8, value: u16) {
        self.emit(OpCode::OrImm, reg, hi(value), lo(value));
    }

    pub fn or_reg(&mut self, dst: u8, src: u8) {
        self.emit(OpCode::OrReg, dst, src, 0);
    }

    pub fn xor_imm(&mut self, reg: u8, value: u16) {
        self.emit(OpCode::XorImm, reg, hi(value), lo(value));
    }

    pub fn xor_reg(&mut self, dst: u8, src: u8) {
        self.emit(OpCode::XorReg, dst, src, 0);
    }

    pub fn shl_imm(&mut self, reg: u8, count: u16) {
        self.emit(OpCode::ShlImm, reg, hi(count), lo(count));
    }

    pub fn shl_reg(&mut self, dst: u8, src: u8) {
        self.emit(OpCode::ShlReg, dst, src, 0);
    }

    pub fn shr_imm(&mut self, reg: u8, count: u16) {
        self.emit(OpCode::ShrImm, reg, hi(count), lo(count));
    }

    pub fn shr_reg(&mut self, dst: u8, src: u8) {
        self.emit(OpCode::ShrReg, dst, src, 0);
    }

    pub fn not(&mut self, reg: u8) {
        self.emit(OpCode::Not, reg, 0, 0);
    }

    pub fn cmp_imm(&mut self, reg: u8, value: u16) {
        self.emit(OpCode::CmpImm, reg, hi(value), lo(value));
    }

    pub fn cmp_reg(&mut self, lhs: u8, rhs: u8) {
        self.emit(OpCode::CmpReg, lhs, rhs, 0);
    }
}

fn hi(value: u16) -> u8 {
    (value >> 8) as u8
}

fn lo(value: u16) -> u8 {
    value as u8
}
