mod common;
use common::*;

use std::time::{SystemTime, UNIX_EPOCH};

use hexvm::{LoadError, decode_source};

fn temp_source_path(tag: &str) -> std::path::PathBuf {
    let unique = format!(
        "hexvm-{tag}-{}",
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be past the epoch")
            .as_nanos()
    );
    std::env::temp_dir().join(unique).with_extension("hex")
}

#[test]
fn loader_round_trips_builder_output() {
    let mut bc = BytecodeBuilder::new();
    bc.ldx_imm(0, 7);
    bc.ldx_imm(REG_SX, 1);
    bc.exc_imm(1);
    let code = bc.finish();

    let text = encode_source(&code);
    let decoded = decode_source(&text).expect("encoded program should decode");
    assert_eq!(decoded, code);
}

#[test]
fn loader_accepts_dense_uppercase_digits() {
    // 17 bytes: one byte short of a full instruction row.
    let err = decode_source("0100000701170001060000000000000001").expect_err("decode should fail");
    assert!(matches!(err, LoadError::UnalignedBytecode(17)));

    let decoded =
        decode_source("01000007011700010600000100000000").expect("aligned source should decode");
    assert_eq!(decoded.len(), 16);
    assert_eq!(decoded[0], 0x01);
    assert_eq!(decoded[15], 0x00);
}

#[test]
fn load_from_file_sets_the_code_length() {
    let path = temp_source_path("ok");
    let mut bc = BytecodeBuilder::new();
    bc.ldx_imm(0, 0);
    bc.ldx_imm(REG_SX, 1);
    bc.exc_imm(1);
    let code = bc.finish();
    std::fs::write(&path, encode_source(&code)).expect("temp source should write");

    let mut process = Process::new();
    let loaded = process.load(&path).expect("load should succeed");
    assert_eq!(loaded, code);
    assert_eq!(process.state.clx as usize, code.len());
    assert_eq!(process.state.clx % 4, 0);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn load_from_file_ignores_separator_punctuation() {
    let path = temp_source_path("separators");
    std::fs::write(&path, "01,00,00,07;\n01-17-00-01;\n06_00_00_01;\n")
        .expect("temp source should write");

    let mut process = Process::new();
    let loaded = process.load(&path).expect("load should succeed");
    assert_eq!(loaded.len(), 12);
    assert_eq!(loaded[0], 0x01);
    assert_eq!(loaded[3], 0x07);
    assert_eq!(loaded[11], 0x01);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn load_from_missing_file_reports_a_read_error() {
    let path = temp_source_path("missing");
    let mut process = Process::new();
    let err = process.load(&path).expect_err("load should fail");
    assert!(matches!(err, LoadError::Read(_)));
    assert_eq!(process.state.clx, 0);
}

#[test]
fn empty_file_is_rejected() {
    let path = temp_source_path("empty");
    std::fs::write(&path, "").expect("temp source should write");

    let mut process = Process::new();
    let err = process.load(&path).expect_err("load should fail");
    assert!(matches!(err, LoadError::EmptySource));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn file_without_hex_content_is_rejected() {
    let path = temp_source_path("nohex");
    std::fs::write(&path, "!!! ??? ***\n").expect("temp source should write");

    let mut process = Process::new();
    let err = process.load(&path).expect_err("load should fail");
    assert!(matches!(err, LoadError::EmptyBytecode));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn driver_refuses_to_run_an_unstaged_load_failure() {
    // A failed load stages nothing, so a later run request is a no-op
    // and quit reports the untouched exit code.
    let mut vm = Vm::with_seed(TEST_MEM_LEN, TEST_SEED);
    let mut menu = ScriptedMenu::new(vec![MenuAction::Run]);
    let mut console = ScriptedConsole::new();
    assert_eq!(vm.run(&mut menu, &mut console, &mut NullView), 1);
}
