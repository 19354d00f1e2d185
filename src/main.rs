use std::io::{self, Write as _};
use std::path::PathBuf;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{error, info};

use hexvm::logging::{self, category_debug, category_menu, category_process};
use hexvm::{Console, DebugMode, Menu, MenuAction, Process, StdioView, Vm};

const VERSION: u32 = 1;
const RULE_WIDTH: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliConfig {
    source: Option<String>,
    dir: Option<String>,
    mem_len: u32,
    help: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            source: None,
            dir: None,
            mem_len: 0,
            help: false,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_cli_args(&args).map_err(io::Error::other)?;
    if cli.help {
        print_usage();
        return Ok(());
    }

    let mut vm = Vm::new(cli.mem_len);
    let mut console = StdioConsole;
    let mut view = StdioView;

    let ec = if let Some(source) = cli.source.as_deref() {
        let dir = cli.dir.clone().unwrap_or_else(|| ".".to_string());
        let mut menu = OneShotMenu::new(PathBuf::from(dir).join(source));
        vm.run(&mut menu, &mut console, &mut view)
    } else {
        let mut menu = InteractiveMenu::new(cli.dir)?;
        vm.run(&mut menu, &mut console, &mut view)
    };

    info!("{} exited with {ec}", category_process());
    std::process::exit(ec);
}

fn parse_cli_args(args: &[String]) -> Result<CliConfig, String> {
    let mut cfg = CliConfig::default();
    let mut index = 0usize;

    while index < args.len() {
        match args[index].as_str() {
            "-h" | "--help" => {
                cfg.help = true;
                index += 1;
            }
            "--mem-len" => {
                let raw = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --mem-len".to_string())?;
                let value = raw
                    .parse::<u32>()
                    .map_err(|_| format!("invalid --mem-len value '{raw}'"))?;
                cfg.mem_len = value;
                index += 2;
            }
            "--dir" => {
                let dir = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --dir".to_string())?
                    .clone();
                cfg.dir = Some(dir);
                index += 2;
            }
            value if value.starts_with('-') => {
                return Err(format!("unknown flag '{value}'"));
            }
            path => {
                if cfg.source.is_some() {
                    return Err("multiple source paths provided".to_string());
                }
                cfg.source = Some(path.to_string());
                index += 1;
            }
        }
    }

    Ok(cfg)
}

fn print_usage() {
    println!("Usage:");
    println!("  hexvm [--mem-len <bytes>] [--dir <path>]");
    println!("  hexvm [--mem-len <bytes>] [--dir <path>] <source_path>");
    println!();
    println!("Without a source path an interactive menu starts; with one the");
    println!("program is loaded, run once and the VM exits with its exit code.");
}

fn banner() -> String {
    let title = format!("-----[ HEXVM {VERSION} ]-----");
    let pad = RULE_WIDTH.saturating_sub(title.len());
    format!("{title}{}", "-".repeat(pad))
}

fn rule() -> String {
    "-".repeat(RULE_WIDTH)
}

/// Loads one program, runs it, quits.
struct OneShotMenu {
    path: PathBuf,
    stage: u8,
}

impl OneShotMenu {
    fn new(path: PathBuf) -> Self {
        Self { path, stage: 0 }
    }
}

impl Menu for OneShotMenu {
    fn next_action(&mut self) -> MenuAction {
        self.stage += 1;
        match self.stage {
            1 => {
                let mut process = Process::new();
                match process.load(&self.path) {
                    Ok(code) => MenuAction::Load(process, code),
                    Err(err) => {
                        error!("{} {err} [{}]", category_menu(), self.path.display());
                        MenuAction::Quit
                    }
                }
            }
            2 => MenuAction::Run,
            _ => MenuAction::Quit,
        }
    }
}

struct InteractiveMenu {
    editor: DefaultEditor,
    dir: PathBuf,
}

impl InteractiveMenu {
    fn new(dir: Option<String>) -> rustyline::Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
            dir: dir.map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
        })
    }

    fn prompt(&mut self, text: &str) -> Option<String> {
        match self.editor.readline(text) {
            Ok(line) => Some(line.trim().to_string()),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => None,
            Err(err) => {
                error!("{} readline failed: {err}", category_menu());
                None
            }
        }
    }

    fn load_program(&mut self) -> MenuAction {
        let Some(name) = self.prompt("program file: ") else {
            return MenuAction::Invalid;
        };
        if name.is_empty() {
            error!("{} invalid source path", category_menu());
            return MenuAction::Invalid;
        }

        let path = self.dir.join(name);
        let mut process = Process::new();
        match process.load(&path) {
            Ok(code) => {
                info!(
                    "{} loaded {} bytes from {}",
                    category_menu(),
                    code.len(),
                    path.display()
                );
                MenuAction::Load(process, code)
            }
            Err(err) => {
                error!("{} {err} [{}]", category_menu(), path.display());
                MenuAction::Invalid
            }
        }
    }

    fn debug_menu(&mut self) -> MenuAction {
        println!("[1] show registers");
        println!("[2] show stack");
        println!("[3] show both");
        println!("[4] stop after each instruction and show both");
        println!("[0] off");
        println!("{}", rule());
        let Some(choice) = self.prompt("choice: ") else {
            return MenuAction::Invalid;
        };
        let mode = match choice.as_str() {
            "0" => None,
            "1" => Some(DebugMode::Regs),
            "2" => Some(DebugMode::Stack),
            "3" => Some(DebugMode::Both),
            "4" => Some(DebugMode::Step),
            _ => {
                error!("{} invalid choice", category_debug());
                return MenuAction::Invalid;
            }
        };
        MenuAction::Debug(mode)
    }

    fn set_dir(&mut self) -> MenuAction {
        let Some(dir) = self.prompt("directory: ") else {
            return MenuAction::Invalid;
        };
        if dir.is_empty() {
            error!("{} invalid directory", category_menu());
            return MenuAction::Invalid;
        }
        self.dir = PathBuf::from(&dir);
        MenuAction::SetDir(dir)
    }
}

impl Menu for InteractiveMenu {
    fn next_action(&mut self) -> MenuAction {
        println!();
        println!("{}", banner());
        println!("[1] load program");
        println!("[2] run program");
        println!("[3] debug");
        println!("[4] directory");
        println!("[0] exit");
        println!("{}", rule());

        let Some(choice) = self.prompt("choice: ") else {
            return MenuAction::Quit;
        };
        match choice.as_str() {
            "0" => MenuAction::Quit,
            "1" => self.load_program(),
            "2" => MenuAction::Run,
            "3" => self.debug_menu(),
            "4" => self.set_dir(),
            _ => {
                error!("{} invalid choice", category_menu());
                MenuAction::Invalid
            }
        }
    }
}

struct StdioConsole;

impl Console for StdioConsole {
    fn write_char(&mut self, value: char) {
        print!("{value}");
        let _ = io::stdout().flush();
    }

    fn write_u32(&mut self, value: u32) {
        print!("{value}");
        let _ = io::stdout().flush();
    }

    fn write_i32(&mut self, value: i32) {
        print!("{value}");
        let _ = io::stdout().flush();
    }

    fn write_f32(&mut self, value: f32) {
        print!("{value}");
        let _ = io::stdout().flush();
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        let mut stdout = io::stdout();
        let _ = stdout.write_all(bytes);
        let _ = stdout.flush();
    }

    fn read_line(&mut self) -> String {
        let mut line = String::new();
        if io::stdin().read_line(&mut line).is_err() {
            return String::new();
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        line
    }

    fn clear_screen(&mut self) {
        print!("\x1b[2J\x1b[H");
        let _ = io::stdout().flush();
    }
}
