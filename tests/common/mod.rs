#![allow(dead_code, unused_imports)]

use std::collections::VecDeque;

pub use hexvm::{
    BytecodeBuilder, Console, CoreState, DebugMode, DebugView, FLAG_EQUAL, FLAG_GREATER, FLAG_LESS,
    Memory, Menu, MenuAction, Process, REG_AX, REG_CLX, REG_CSX, REG_FX, REG_SLX, REG_SPX,
    REG_SSX, REG_SX, ViewAction, Vm, encode_source,
};

pub const TEST_MEM_LEN: u32 = 0x1_0000;
pub const TEST_SEED: u64 = 7;

pub struct ScriptedMenu {
    actions: VecDeque<MenuAction>,
}

impl ScriptedMenu {
    pub fn new(actions: Vec<MenuAction>) -> Self {
        Self {
            actions: actions.into(),
        }
    }
}

impl Menu for ScriptedMenu {
    fn next_action(&mut self) -> MenuAction {
        self.actions.pop_front().unwrap_or(MenuAction::Quit)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleEvent {
    Char(char),
    U32(u32),
    I32(i32),
    F32(f32),
    Bytes(Vec<u8>),
    Cleared,
}

#[derive(Default)]
pub struct ScriptedConsole {
    input: VecDeque<String>,
    pub events: Vec<ConsoleEvent>,
}

impl ScriptedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(lines: &[&str]) -> Self {
        Self {
            input: lines.iter().map(|line| line.to_string()).collect(),
            events: Vec::new(),
        }
    }
}

impl Console for ScriptedConsole {
    fn write_char(&mut self, value: char) {
        self.events.push(ConsoleEvent::Char(value));
    }

    fn write_u32(&mut self, value: u32) {
        self.events.push(ConsoleEvent::U32(value));
    }

    fn write_i32(&mut self, value: i32) {
        self.events.push(ConsoleEvent::I32(value));
    }

    fn write_f32(&mut self, value: f32) {
        self.events.push(ConsoleEvent::F32(value));
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.events.push(ConsoleEvent::Bytes(bytes.to_vec()));
    }

    fn read_line(&mut self) -> String {
        self.input.pop_front().unwrap_or_default()
    }

    fn clear_screen(&mut self) {
        self.events.push(ConsoleEvent::Cleared);
    }
}

pub struct NullView;

impl DebugView for NullView {
    fn on_instruction(&mut self, _: DebugMode, _: &CoreState, _: &Memory) -> ViewAction {
        ViewAction::Continue
    }
}

/// Captures a register snapshot after every executed instruction; can
/// answer `Break` after a fixed number of instructions.
pub struct RecordingView {
    pub states: Vec<CoreState>,
    pub break_after: Option<usize>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            break_after: None,
        }
    }

    pub fn breaking_after(count: usize) -> Self {
        Self {
            states: Vec::new(),
            break_after: Some(count),
        }
    }
}

impl DebugView for RecordingView {
    fn on_instruction(&mut self, _: DebugMode, state: &CoreState, _: &Memory) -> ViewAction {
        self.states.push(state.clone());
        if self.break_after.is_some_and(|count| self.states.len() >= count) {
            return ViewAction::Break;
        }
        ViewAction::Continue
    }
}

/// Round-trips `code` through the hex loader into a staged process.
pub fn staged(code: Vec<u8>) -> (Process, Vec<u8>) {
    let mut process = Process::new();
    let text = encode_source(&code);
    let bytes = process
        .load_source(&text)
        .expect("test program should decode");
    assert_eq!(bytes, code);
    (process, bytes)
}

/// Loads and runs `code` on a fresh deterministic VM, then quits.
pub fn run_program(code: Vec<u8>, console: &mut ScriptedConsole) -> i32 {
    let mut vm = Vm::with_seed(TEST_MEM_LEN, TEST_SEED);
    let (process, bytes) = staged(code);
    let mut menu = ScriptedMenu::new(vec![MenuAction::Load(process, bytes), MenuAction::Run]);
    vm.run(&mut menu, console, &mut NullView)
}
