use tracing::error;

/// Default memory length: 128 MiB.
pub const DEFAULT_LEN: u32 = 0x0800_0000;

pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Allocates `len` zeroed cells; 0 selects the default length. On
    /// allocation failure the memory stays empty and every later access
    /// takes the out-of-range branch.
    pub fn new(len: u32) -> Self {
        let len = if len == 0 { DEFAULT_LEN } else { len };
        let mut data = Vec::new();
        if data.try_reserve_exact(len as usize).is_err() {
            error!("bad alloc [memory@length: {len}]");
            return Self { data };
        }
        data.resize(len as usize, 0);
        Self { data }
    }

    pub fn len(&self) -> u32 {
        self.data.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn read(&self, index: u32) -> u8 {
        match self.data.get(index as usize) {
            Some(&cell) => cell,
            None => {
                error!("bad index [{index:#010X}]");
                0
            }
        }
    }

    pub fn write(&mut self, index: u32, value: u8) {
        match self.data.get_mut(index as usize) {
            Some(cell) => *cell = value,
            None => error!("bad index [{index:#010X}]"),
        }
    }
}
