use std::fmt::Write as _;
use std::io::{self, Write as _};

use crate::memory::Memory;
use crate::registers::CoreState;
use crate::vm::{DebugMode, DebugView, ViewAction};

const RULE_WIDTH: usize = 47;

pub fn render_registers(state: &CoreState) -> String {
    let rule = "-".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "registers");
    let _ = writeln!(out, "{rule}");
    for (index, value) in state.x.iter().enumerate() {
        let _ = write!(out, "[x{index:<2}][{value:08X}]\t");
        if index % 3 == 2 {
            out.push('\n');
        }
    }
    out.push('\n');
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "[csx][{:08X}]\t[ipx][{:08X}]\t[clx][{:08X}]",
        state.csx, state.ipx, state.clx
    );
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "[ssx][{:08X}]\t[spx][{:08X}]\t[slx][{:08X}]",
        state.ssx, state.spx, state.slx
    );
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "[ax][{:08X}]\t[sx][{:08X}]\t[fx][{:08X}]",
        state.ax, state.sx, state.fx
    );
    let _ = writeln!(out, "{rule}");
    out
}

pub fn render_stack(state: &CoreState, memory: &Memory) -> String {
    let rule = "-".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "stack");
    let _ = writeln!(out, "{rule}");

    if state.ssx == state.spx || state.slx == 0 || state.ssx == 0 || state.spx == 0 {
        let _ = writeln!(out, "empty stack...");
        let _ = writeln!(out, "{rule}");
        return out;
    }

    let mut column = 0;
    for index in state.ssx..state.spx {
        let _ = write!(out, "[{index:08X}][{:02X}]\t", memory.read(index));
        column += 1;
        if column == 3 {
            out.push('\n');
            column = 0;
        }
    }
    if column != 0 {
        out.push('\n');
    }
    let _ = writeln!(out, "{rule}");
    out
}

/// Debug view on standard output; step mode blocks on a prompt.
pub struct StdioView;

impl DebugView for StdioView {
    fn on_instruction(
        &mut self,
        mode: DebugMode,
        state: &CoreState,
        memory: &Memory,
    ) -> ViewAction {
        match mode {
            DebugMode::Regs => print!("{}", render_registers(state)),
            DebugMode::Stack => print!("{}", render_stack(state, memory)),
            DebugMode::Both => {
                print!("{}", render_registers(state));
                print!("{}", render_stack(state, memory));
            }
            DebugMode::Step => {
                print!("{}", render_registers(state));
                print!("{}", render_stack(state, memory));
                print!("press 'b' to break or any other key to continue: ");
                let _ = io::stdout().flush();
                let mut line = String::new();
                if io::stdin().read_line(&mut line).is_err() {
                    return ViewAction::Break;
                }
                if line.trim().eq_ignore_ascii_case("b") {
                    return ViewAction::Break;
                }
            }
        }
        ViewAction::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_view_shows_every_slot() {
        let mut state = CoreState::new();
        state.x[0] = 0xDEADBEEF;
        state.ipx = 0x44;
        let rendered = render_registers(&state);
        assert!(rendered.contains("[x0 ][DEADBEEF]"));
        assert!(rendered.contains("[x15][00000000]"));
        assert!(rendered.contains("[ipx][00000044]"));
        assert!(rendered.contains("[fx][00000000]"));
    }

    #[test]
    fn stack_view_walks_the_live_window() {
        let mut memory = Memory::new(64);
        memory.write(16, 0xAA);
        memory.write(17, 0xBB);
        let mut state = CoreState::new();
        state.ssx = 16;
        state.spx = 18;
        state.slx = 8;
        let rendered = render_stack(&state, &memory);
        assert!(rendered.contains("[00000010][AA]"));
        assert!(rendered.contains("[00000011][BB]"));
        assert!(!rendered.contains("empty stack"));
    }

    #[test]
    fn unplaced_stack_renders_as_empty() {
        let memory = Memory::new(64);
        let state = CoreState::new();
        let rendered = render_stack(&state, &memory);
        assert!(rendered.contains("empty stack..."));
    }
}
