use std::fs;
use std::path::Path;

use rand::Rng;

use crate::loader::{self, LoadError};
use crate::registers::CoreState;

pub const INFO_STARTED: u16 = 0x0001;
pub const INFO_ABORTED: u16 = 0x0002;

#[derive(Debug)]
pub struct Process {
    pub id: u32,
    pub info: u16,
    pub state: CoreState,
}

impl Default for Process {
    fn default() -> Self {
        Self::new()
    }
}

impl Process {
    pub fn new() -> Self {
        Self {
            id: 0,
            info: 0,
            state: CoreState::new(),
        }
    }

    /// Reads a hex program file and decodes it; on success `state.clx`
    /// holds the bytecode length.
    pub fn load(&mut self, path: &Path) -> Result<Vec<u8>, LoadError> {
        let text = fs::read_to_string(path).map_err(LoadError::Read)?;
        self.load_source(&text)
    }

    pub fn load_source(&mut self, text: &str) -> Result<Vec<u8>, LoadError> {
        let code = loader::decode_source(text)?;
        self.state.clx = code.len() as u32;
        Ok(code)
    }

    /// Assigns a random id, places the code segment below `max_base` and
    /// marks the process started. `state.clx` was set by `load`.
    pub fn start<R: Rng>(&mut self, rng: &mut R, max_base: u32) {
        self.id = rng.next_u32();
        self.state.csx = if max_base == 0 {
            0
        } else {
            rng.gen_range(0..max_base)
        };
        self.state.ipx = self.state.csx;
        self.info |= INFO_STARTED;
    }

    pub fn is_started(&self) -> bool {
        self.info & INFO_STARTED != 0
    }

    pub fn is_aborted(&self) -> bool {
        self.info & INFO_ABORTED != 0
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn load_source_sets_code_length() {
        let mut process = Process::new();
        let code = process
            .load_source("00 00 00 00\n01 02 03 04\n")
            .expect("source should decode");
        assert_eq!(code.len(), 8);
        assert_eq!(process.state.clx, 8);
        assert_eq!(process.state.clx % 4, 0);
    }

    #[test]
    fn load_source_failure_leaves_state_untouched() {
        let mut process = Process::new();
        assert!(process.load_source("AA BB").is_err());
        assert_eq!(process.state.clx, 0);
    }

    #[test]
    fn start_places_code_segment_below_bound() {
        let mut rng = StdRng::seed_from_u64(11);
        for max_base in [1u32, 2, 0x1000, 0x0100_0000] {
            let mut process = Process::new();
            process.state.clx = 16;
            process.start(&mut rng, max_base);
            assert!(process.state.csx < max_base);
            assert_eq!(process.state.ipx, process.state.csx);
            assert!(process.is_started());
            assert!(!process.is_aborted());
        }
    }

    #[test]
    fn start_with_zero_bound_places_at_origin() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut process = Process::new();
        process.start(&mut rng, 0);
        assert_eq!(process.state.csx, 0);
        assert_eq!(process.state.ipx, 0);
        assert!(process.is_started());
    }
}
