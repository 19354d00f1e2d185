pub mod isa;
pub mod loader;
pub mod logging;
pub mod memory;
pub mod process;
pub mod registers;
pub mod view;
pub mod vm;

pub use isa::{BytecodeBuilder, OpCode, imm16, imm24, jump_offset};
pub use loader::{LoadError, decode_source, encode_source};
pub use memory::{DEFAULT_LEN, Memory};
pub use process::{INFO_ABORTED, INFO_STARTED, Process};
pub use registers::{
    CoreState, FLAG_EQUAL, FLAG_GREATER, FLAG_LESS, REG_AX, REG_CLX, REG_CSX, REG_FX, REG_IPX,
    REG_SLX, REG_SPX, REG_SSX, REG_SX, XREG_COUNT,
};
pub use view::{StdioView, render_registers, render_stack};
pub use vm::{Console, DebugMode, DebugView, Fault, Menu, MenuAction, StepOutcome, ViewAction, Vm};
