/// Size of the CPU address space.
pub const MEMORY_SIZE: usize = 0x10000;

/// Internal RAM occupies `0x0000..=0x1FFF`, repeating every 2 KiB.
pub const RAM_MIRROR_END: u16 = 0x1FFF;
pub const RAM_SIZE: u16 = 0x0800;

/// PPU/IO registers occupy `0x2000..0x4000`, repeating every 8 bytes.
pub const IO_START: u16 = 0x2000;
pub const IO_END: u16 = 0x4000;
pub const IO_REGISTERS: u16 = 8;

/// Flat 64 KiB memory with the NES mirroring rules applied on every access.
pub struct Memory {
    data: Box<[u8; MEMORY_SIZE]>,
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            data: Box::new([0; MEMORY_SIZE]),
        }
    }

    /// Maps any alias onto the cell that backs it. Reads and writes share this.
    pub fn canonical(address: u16) -> u16 {
        if address <= RAM_MIRROR_END {
            address % RAM_SIZE
        } else if (IO_START..IO_END).contains(&address) {
            IO_START + (address % IO_REGISTERS)
        } else {
            address
        }
    }

    pub fn read(&self, address: u16) -> u8 {
        self.data[Self::canonical(address) as usize]
    }

    pub fn write(&mut self, address: u16, value: u8) {
        self.data[Self::canonical(address) as usize] = value;
    }

    // Load ROM data into memory, byte by byte so mirrored targets fold correctly
    pub fn load_rom(&mut self, data: &[u8], start_address: u16) {
        let len = data.len().min(MEMORY_SIZE - start_address as usize);
        for (offset, &byte) in data[..len].iter().enumerate() {
            self.write(start_address.wrapping_add(offset as u16), byte);
        }
    }

    // Read a 16-bit value in little-endian format
    pub fn read_u16(&self, address: u16) -> u16 {
        let low = self.read(address) as u16;
        let high = self.read(address.wrapping_add(1)) as u16;
        (high << 8) | low
    }

    // Write a 16-bit value in little-endian format
    pub fn write_u16(&mut self, address: u16, value: u16) {
        self.write(address, (value & 0xFF) as u8);
        self.write(address.wrapping_add(1), (value >> 8) as u8);
    }

    /// Raw view of the backing store, canonical cells only.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..]
    }

    /// Replaces the backing store wholesale. Returns `false` if the image is
    /// not exactly 64 KiB.
    pub fn restore_bytes(&mut self, image: &[u8]) -> bool {
        if image.len() != MEMORY_SIZE {
            return false;
        }
        self.data.copy_from_slice(image);
        true
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
