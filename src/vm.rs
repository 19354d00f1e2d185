use std::fmt;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{error, info};

use crate::isa::{OpCode, imm16, imm24, jump_offset};
use crate::memory::Memory;
use crate::process::{INFO_ABORTED, INFO_STARTED, Process};
use crate::registers::{CoreState, REG_SLX};

const TRAP_CONTROL: u32 = 0x0000_0001;
const TRAP_CONSOLE: u32 = 0x0000_0002;
const TRAP_FILE: u32 = 0x0000_0003;

/// Backend for the console traps. Formats are best effort.
pub trait Console {
    fn write_char(&mut self, value: char);
    fn write_u32(&mut self, value: u32);
    fn write_i32(&mut self, value: i32);
    fn write_f32(&mut self, value: f32);
    fn write_bytes(&mut self, bytes: &[u8]);
    fn read_line(&mut self) -> String;
    fn clear_screen(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebugMode {
    Regs,
    Stack,
    Both,
    Step,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewAction {
    Continue,
    Break,
}

/// Invoked after every executed instruction while a debug mode is
/// selected. Step views may answer `Break` to stop the process early.
pub trait DebugView {
    fn on_instruction(
        &mut self,
        mode: DebugMode,
        state: &CoreState,
        memory: &Memory,
    ) -> ViewAction;
}

#[derive(Debug)]
pub enum MenuAction {
    Load(Process, Vec<u8>),
    Run,
    Debug(Option<DebugMode>),
    SetDir(String),
    Quit,
    Invalid,
}

/// The driver's only way in from the outside while idle.
pub trait Menu {
    fn next_action(&mut self) -> MenuAction;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Halt,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fault {
    DivisionByZero,
    InvalidInstruction([u8; 4]),
    Aborted,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::DivisionByZero => write!(f, "math [0 as divisor]"),
            Fault::InvalidInstruction([a, b, c, d]) => {
                write!(f, "invalid instruction [{a:02X} {b:02X} {c:02X} {d:02X}]")
            }
            Fault::Aborted => write!(f, "aborted"),
        }
    }
}

impl std::error::Error for Fault {}

pub struct Vm {
    state: CoreState,
    memory: Memory,
    process: Option<Process>,
    code: Vec<u8>,
    rng: StdRng,
    started_at: Instant,
    end_ip: u32,
    debug_mode: Option<DebugMode>,
    ec: i32,
}

impl Vm {
    /// `mem_len` of 0 selects the default memory length. The RNG is
    /// seeded from wall-clock time.
    pub fn new(mem_len: u32) -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or_default();
        Self::with_seed(mem_len, seed)
    }

    pub fn with_seed(mem_len: u32, seed: u64) -> Self {
        Self {
            state: CoreState::new(),
            memory: Memory::new(mem_len),
            process: None,
            code: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            started_at: Instant::now(),
            end_ip: 0,
            debug_mode: None,
            ec: 1,
        }
    }

    pub fn state(&self) -> &CoreState {
        &self.state
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn process(&self) -> Option<&Process> {
        self.process.as_ref()
    }

    pub fn exit_code(&self) -> i32 {
        self.ec
    }

    /// The driver loop: steps the current process while one is running,
    /// otherwise yields to the menu. Returns the last exit code on quit.
    pub fn run(
        &mut self,
        menu: &mut dyn Menu,
        console: &mut dyn Console,
        view: &mut dyn DebugView,
    ) -> i32 {
        loop {
            if self.process.as_ref().is_some_and(Process::is_started) {
                if self.step(console, view) == StepOutcome::Halt {
                    self.close_process();
                }
            } else {
                match menu.next_action() {
                    MenuAction::Load(process, code) => {
                        self.process = Some(process);
                        self.code = code;
                    }
                    MenuAction::Run => self.launch(),
                    MenuAction::Debug(mode) => self.debug_mode = mode,
                    MenuAction::SetDir(dir) => info!("program directory set to {dir}"),
                    MenuAction::Quit => return self.ec,
                    MenuAction::Invalid => {}
                }
            }
        }
    }

    /// One running-mode iteration: fetch, execute, post-increment `ipx`
    /// by 4 (also after taken branches), then the debug hook.
    fn step(&mut self, console: &mut dyn Console, view: &mut dyn DebugView) -> StepOutcome {
        if self.state.ipx >= self.end_ip {
            return StepOutcome::Halt;
        }

        let a = self.memory.read(self.state.ipx);
        let b = self.memory.read(self.state.ipx.wrapping_add(1));
        let c = self.memory.read(self.state.ipx.wrapping_add(2));
        let d = self.memory.read(self.state.ipx.wrapping_add(3));

        let mut outcome = match self.execute(a, b, c, d, console) {
            Ok(outcome) => outcome,
            Err(fault) => {
                self.report_fault(&fault);
                StepOutcome::Halt
            }
        };
        self.state.ipx = self.state.ipx.wrapping_add(4);

        if let Some(mode) = self.debug_mode
            && view.on_instruction(mode, &self.state, &self.memory) == ViewAction::Break
        {
            outcome = StepOutcome::Halt;
        }
        outcome
    }

    fn execute(
        &mut self,
        a: u8,
        b: u8,
        c: u8,
        d: u8,
        console: &mut dyn Console,
    ) -> Result<StepOutcome, Fault> {
        match a {
            x if x == OpCode::Nop as u8 => {}
            x if x == OpCode::LdxImm as u8 => {
                self.state.write(b, imm16(c, d));
                if b == REG_SLX {
                    self.reroll_stack_base();
                }
            }
            x if x == OpCode::LdxReg as u8 => {
                let value = self.state.read(c);
                self.state.write(b, value);
                if b == REG_SLX {
                    self.reroll_stack_base();
                }
            }
            x if x == OpCode::SetImm as u8 => {
                self.memory.write(self.state.ax, b);
            }
            x if x == OpCode::SetReg as u8 => {
                let value = self.state.read(b);
                self.memory.write(self.state.ax, value as u8);
            }
            x if x == OpCode::Get as u8 => {
                let value = u32::from(self.memory.read(self.state.ax));
                self.state.write(b, value);
            }
            x if x == OpCode::ExcImm as u8 => return self.trap(imm24(b, c, d), console),
            x if x == OpCode::ExcReg as u8 => return self.trap(self.state.read(b), console),
            x if x == OpCode::JitImm as u8 => {
                if self.state.fx == u32::from(d) {
                    self.state.ipx = self.state.csx.wrapping_add(jump_offset(b, c));
                }
            }
            x if x == OpCode::JitImmReg as u8 => {
                if self.state.fx == self.state.read(d) {
                    self.state.ipx = self.state.csx.wrapping_add(jump_offset(b, c));
                }
            }
            x if x == OpCode::JitRegImm as u8 => {
                if self.state.fx == imm16(c, d) {
                    self.state.ipx = self.state.csx.wrapping_add(self.state.read(b));
                }
            }
            x if x == OpCode::JitReg as u8 => {
                if self.state.fx == self.state.read(c) {
                    self.state.ipx = self.state.csx.wrapping_add(self.state.read(b));
                }
            }
            x if x == OpCode::JifImm as u8 => {
                if self.state.fx != u32::from(d) {
                    self.state.ipx = self.state.csx.wrapping_add(jump_offset(b, c));
                }
            }
            x if x == OpCode::JifImmReg as u8 => {
                if self.state.fx != self.state.read(d) {
                    self.state.ipx = self.state.csx.wrapping_add(jump_offset(b, c));
                }
            }
            // 0x0E and 0x0F both test against R[c]; the register form of
            // the target is shared as well.
            x if x == OpCode::JifRegImm as u8 || x == OpCode::JifReg as u8 => {
                if self.state.fx != self.state.read(c) {
                    self.state.ipx = self.state.csx.wrapping_add(self.state.read(b));
                }
            }
            x if x == OpCode::AddImm as u8 => {
                self.apply(b, |lhs| lhs.wrapping_add(imm16(c, d)));
            }
            x if x == OpCode::AddReg as u8 => {
                let rhs = self.state.read(c);
                self.apply(b, |lhs| lhs.wrapping_add(rhs));
            }
            // sub compares against R[c] in both forms before subtracting.
            x if x == OpCode::SubImm as u8 => {
                let lhs = self.state.read(b);
                let rhs = self.state.read(c);
                self.state.compare(lhs, rhs);
                self.state.write(b, lhs.wrapping_sub(imm16(c, d)));
            }
            x if x == OpCode::SubReg as u8 => {
                let lhs = self.state.read(b);
                let rhs = self.state.read(c);
                self.state.compare(lhs, rhs);
                self.state.write(b, lhs.wrapping_sub(rhs));
            }
            x if x == OpCode::MulImm as u8 => {
                self.apply(b, |lhs| lhs.wrapping_mul(imm16(c, d)));
            }
            x if x == OpCode::MulReg as u8 => {
                let rhs = self.state.read(c);
                self.apply(b, |lhs| lhs.wrapping_mul(rhs));
            }
            x if x == OpCode::DivImm as u8 => {
                let rhs = imm16(c, d);
                if rhs == 0 {
                    return Err(Fault::DivisionByZero);
                }
                self.apply(b, |lhs| lhs / rhs);
            }
            x if x == OpCode::DivReg as u8 => {
                let rhs = self.state.read(c);
                if rhs == 0 {
                    return Err(Fault::DivisionByZero);
                }
                self.apply(b, |lhs| lhs / rhs);
            }
            x if x == OpCode::AndImm as u8 => {
                self.apply(b, |lhs| lhs & imm16(c, d));
            }
            x if x == OpCode::AndReg as u8 => {
                let rhs = self.state.read(c);
                self.apply(b, |lhs| lhs & rhs);
            }
            x if x == OpCode::OrImm as u8 => {
                self.apply(b, |lhs| lhs | imm16(c, d));
            }
            x if x == OpCode::OrReg as u8 => {
                let rhs = self.state.read(c);
                self.apply(b, |lhs| lhs | rhs);
            }
            x if x == OpCode::XorImm as u8 => {
                self.apply(b, |lhs| lhs ^ imm16(c, d));
            }
            x if x == OpCode::XorReg as u8 => {
                let rhs = self.state.read(c);
                self.apply(b, |lhs| lhs ^ rhs);
            }
            x if x == OpCode::ShlImm as u8 => {
                self.apply(b, |lhs| lhs.wrapping_shl(imm16(c, d)));
            }
            x if x == OpCode::ShlReg as u8 => {
                let rhs = self.state.read(c);
                self.apply(b, |lhs| lhs.wrapping_shl(rhs));
            }
            x if x == OpCode::ShrImm as u8 => {
                self.apply(b, |lhs| lhs.wrapping_shr(imm16(c, d)));
            }
            x if x == OpCode::ShrReg as u8 => {
                let rhs = self.state.read(c);
                self.apply(b, |lhs| lhs.wrapping_shr(rhs));
            }
            x if x == OpCode::Not as u8 => {
                self.apply(b, |lhs| !lhs);
            }
            x if x == OpCode::CmpImm as u8 => {
                let lhs = self.state.read(b);
                self.state.compare(lhs, imm16(c, d));
            }
            x if x == OpCode::CmpReg as u8 => {
                let lhs = self.state.read(b);
                let rhs = self.state.read(c);
                self.state.compare(lhs, rhs);
            }
            _ => return Err(Fault::InvalidInstruction([a, b, c, d])),
        }
        Ok(StepOutcome::Continue)
    }

    fn apply(&mut self, reg: u8, op: impl FnOnce(u32) -> u32) {
        let value = self.state.read(reg);
        self.state.write(reg, op(value));
    }

    /// Re-draws `ssx` until `[ssx, ssx+slx)` misses the code segment.
    fn reroll_stack_base(&mut self) {
        loop {
            self.state.ssx = self.rng.next_u32();
            let stack_end = self.state.ssx.wrapping_add(self.state.slx);
            let code_end = self.state.csx.wrapping_add(self.state.clx);
            if stack_end < self.state.csx || self.state.ssx > code_end {
                break;
            }
        }
    }

    fn trap(&mut self, service: u32, console: &mut dyn Console) -> Result<StepOutcome, Fault> {
        match service {
            TRAP_CONTROL => match self.state.sx {
                0x01 => {
                    self.ec = self.state.x[0] as i32;
                    return Ok(StepOutcome::Halt);
                }
                0x02 => return Err(Fault::Aborted),
                _ => {}
            },
            TRAP_CONSOLE => match self.state.sx {
                0x01 => console.write_char(char::from(self.state.x[0] as u8)),
                0x02 => console.write_u32(self.state.x[0]),
                0x03 => console.write_i32(self.state.x[0] as i32),
                0x04 => console.write_f32(f32::from_bits(self.state.x[0])),
                0x05 => {
                    let base = self.state.x[0];
                    let len = self.state.x[1];
                    let mut bytes = Vec::with_capacity(len as usize);
                    for offset in 0..len {
                        bytes.push(self.memory.read(base.wrapping_add(offset)));
                    }
                    console.write_bytes(&bytes);
                }
                0x06 => {
                    let line = console.read_line();
                    self.state.x[0] = line.chars().next().map_or(0, u32::from);
                }
                0x07 => {
                    self.state.x[0] = console.read_line().trim().parse().unwrap_or(0);
                }
                0x08 => {
                    let value: i32 = console.read_line().trim().parse().unwrap_or(0);
                    self.state.x[0] = value as u32;
                }
                0x09 => {
                    let value: f32 = console.read_line().trim().parse().unwrap_or(0.0);
                    self.state.x[0] = value.to_bits();
                }
                0x0A => {
                    let line = console.read_line();
                    self.state.x[0] = line.len() as u32;
                    for byte in line.bytes() {
                        self.state.spx = self.state.spx.wrapping_add(1);
                        self.memory.write(self.state.spx, byte);
                    }
                }
                0x0B => console.clear_screen(),
                _ => {}
            },
            TRAP_FILE => {
                // reserved; every subfunction is a no-op
            }
            _ => {}
        }
        Ok(StepOutcome::Continue)
    }

    fn report_fault(&mut self, fault: &Fault) {
        let id = self.process.as_ref().map_or(0, |process| process.id);
        error!("process ({id}) {fault}");
        if let Some(process) = self.process.as_mut() {
            process.info |= INFO_ABORTED;
        }
        if *fault == Fault::Aborted {
            self.ec = -1;
        }
    }

    /// Starts the staged process: random placement, bytecode copied into
    /// the code segment, snapshot loaded into the live registers.
    fn launch(&mut self) {
        if self.process.is_none() || self.code.is_empty() {
            error!("no program loaded");
            return;
        }
        let Some(process) = self.process.as_mut() else {
            return;
        };

        let max_base = self.memory.len().saturating_sub(self.code.len() as u32);
        process.start(&mut self.rng, max_base);
        for (offset, byte) in self.code.iter().enumerate() {
            self.memory
                .write(process.state.csx.wrapping_add(offset as u32), *byte);
        }
        self.code.clear();

        self.state = process.state.clone();
        self.state.ipx = self.state.csx;
        self.end_ip = self.state.csx.wrapping_add(self.state.clx);
        self.started_at = Instant::now();
    }

    fn close_process(&mut self) {
        let elapsed = self.started_at.elapsed();
        if let Some(mut process) = self.process.take() {
            process.info &= !INFO_STARTED;
            info!(
                "process ({}) ended with {} in {:.3}s",
                process.id,
                self.ec,
                elapsed.as_secs_f64()
            );
        }
        self.state.flush();
    }
}
