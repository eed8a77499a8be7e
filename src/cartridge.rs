//! iNES cartridge images.
//!
//! Only the NROM layout is mapped: PRG ROM at `0x8000`, with a lone 16 KiB
//! bank repeated at `0xC000`. Other mappers load, but bank switching is not
//! emulated.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

use crate::memory::Memory;

pub const HEADER_SIZE: usize = 16;
pub const TRAINER_SIZE: usize = 512;
pub const PRG_BANK_SIZE: usize = 16 * 1024;
pub const CHR_BANK_SIZE: usize = 8 * 1024;
pub const PRG_RAM_BANK_SIZE: usize = 8 * 1024;
pub const PRG_ROM_START: u16 = 0x8000;
pub const PRG_MIRROR_START: u16 = 0xC000;

const MAGIC: [u8; 4] = [b'N', b'E', b'S', 0x1A];

#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("cannot read cartridge: {0}")]
    Io(#[from] std::io::Error),

    #[error("cartridge image is {actual} bytes, header declares {expected}")]
    TooShort { expected: usize, actual: usize },

    #[error("missing iNES magic")]
    BadMagic,

    #[error("cartridge has no PRG ROM")]
    EmptyPrgRom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    FourScreen,
}

/// Header fields, for display and logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartridgeInfo {
    pub mapper: u8,
    pub prg_banks: usize,
    pub chr_banks: usize,
    pub prg_ram_size: usize,
    pub mirroring: Mirroring,
    pub battery: bool,
    pub trainer: bool,
    pub digest: String,
}

#[derive(Debug, Clone)]
pub struct Cartridge {
    pub prg_rom: Vec<u8>,
    pub chr_rom: Vec<u8>,
    pub trainer: Option<Vec<u8>>,
    pub mapper: u8,
    pub mirroring: Mirroring,
    pub battery: bool,
    pub prg_ram_size: usize,
}

impl Cartridge {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CartridgeError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CartridgeError> {
        if bytes.len() < HEADER_SIZE {
            return Err(CartridgeError::TooShort {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }
        if bytes[..4] != MAGIC {
            return Err(CartridgeError::BadMagic);
        }

        let prg_banks = bytes[4] as usize;
        let chr_banks = bytes[5] as usize;
        let flags6 = bytes[6];
        let flags7 = bytes[7];
        if prg_banks == 0 {
            return Err(CartridgeError::EmptyPrgRom);
        }

        let mirroring = if flags6 & 0x08 != 0 {
            Mirroring::FourScreen
        } else if flags6 & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };
        let battery = flags6 & 0x02 != 0;
        let has_trainer = flags6 & 0x04 != 0;
        let mapper = (flags6 >> 4) | (flags7 & 0xF0);
        let prg_ram_size = bytes[8].max(1) as usize * PRG_RAM_BANK_SIZE;

        let prg_start = HEADER_SIZE + if has_trainer { TRAINER_SIZE } else { 0 };
        let chr_start = prg_start + prg_banks * PRG_BANK_SIZE;
        let end = chr_start + chr_banks * CHR_BANK_SIZE;
        if bytes.len() < end {
            return Err(CartridgeError::TooShort {
                expected: end,
                actual: bytes.len(),
            });
        }

        if mapper != 0 {
            warn!("mapper {} is not emulated, mapping PRG as NROM", mapper);
        }

        Ok(Cartridge {
            prg_rom: bytes[prg_start..chr_start].to_vec(),
            chr_rom: bytes[chr_start..end].to_vec(),
            trainer: has_trainer.then(|| bytes[HEADER_SIZE..prg_start].to_vec()),
            mapper,
            mirroring,
            battery,
            prg_ram_size,
        })
    }

    /// Copies PRG ROM into the CPU address space.
    pub fn map_into(&self, memory: &mut Memory) {
        memory.load_rom(&self.prg_rom, PRG_ROM_START);
        if self.prg_rom.len() == PRG_BANK_SIZE {
            memory.load_rom(&self.prg_rom, PRG_MIRROR_START);
        }
    }

    /// SHA-256 of PRG followed by CHR, lowercase hex.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.prg_rom);
        hasher.update(&self.chr_rom);
        format!("{:x}", hasher.finalize())
    }

    pub fn summary(&self) -> CartridgeInfo {
        CartridgeInfo {
            mapper: self.mapper,
            prg_banks: self.prg_rom.len() / PRG_BANK_SIZE,
            chr_banks: self.chr_rom.len() / CHR_BANK_SIZE,
            prg_ram_size: self.prg_ram_size,
            mirroring: self.mirroring,
            battery: self.battery,
            trainer: self.trainer.is_some(),
            digest: self.digest(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(prg_banks: u8, chr_banks: u8, flags6: u8, flags7: u8) -> Vec<u8> {
        let mut bytes = vec![b'N', b'E', b'S', 0x1A, prg_banks, chr_banks, flags6, flags7];
        bytes.resize(HEADER_SIZE, 0);
        if flags6 & 0x04 != 0 {
            bytes.extend(std::iter::repeat(0x77).take(TRAINER_SIZE));
        }
        for bank in 0..prg_banks {
            bytes.extend(std::iter::repeat(0x10 + bank).take(PRG_BANK_SIZE));
        }
        bytes.extend(std::iter::repeat(0xC0).take(chr_banks as usize * CHR_BANK_SIZE));
        bytes
    }

    #[test]
    fn test_parse_header() {
        let cart = Cartridge::from_bytes(&image(2, 1, 0x13, 0x40)).unwrap();
        let info = cart.summary();

        assert_eq!(info.prg_banks, 2);
        assert_eq!(info.chr_banks, 1);
        assert_eq!(info.mapper, 0x41);
        assert_eq!(info.mirroring, Mirroring::Vertical);
        assert!(info.battery);
        assert!(!info.trainer);
        assert_eq!(info.prg_ram_size, PRG_RAM_BANK_SIZE);
        assert_eq!(cart.chr_rom.len(), CHR_BANK_SIZE);
    }

    #[test]
    fn test_trainer_is_skipped() {
        let cart = Cartridge::from_bytes(&image(1, 0, 0x04, 0)).unwrap();
        assert_eq!(cart.trainer.as_ref().map(Vec::len), Some(TRAINER_SIZE));
        assert!(cart.prg_rom.iter().all(|&b| b == 0x10));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            Cartridge::from_bytes(b"NES"),
            Err(CartridgeError::TooShort { expected: HEADER_SIZE, actual: 3 })
        ));

        let mut bad = image(1, 0, 0, 0);
        bad[3] = 0x00;
        assert!(matches!(Cartridge::from_bytes(&bad), Err(CartridgeError::BadMagic)));

        assert!(matches!(
            Cartridge::from_bytes(&image(0, 0, 0, 0)),
            Err(CartridgeError::EmptyPrgRom)
        ));

        let mut short = image(1, 1, 0, 0);
        short.truncate(HEADER_SIZE + 100);
        assert!(matches!(
            Cartridge::from_bytes(&short),
            Err(CartridgeError::TooShort { .. })
        ));
    }

    #[test]
    fn test_single_bank_is_mirrored() {
        let mut bytes = image(1, 0, 0, 0);
        bytes[HEADER_SIZE + PRG_BANK_SIZE - 4] = 0x00; // reset vector low
        bytes[HEADER_SIZE + PRG_BANK_SIZE - 3] = 0x80;
        let cart = Cartridge::from_bytes(&bytes).unwrap();

        let mut memory = Memory::new();
        cart.map_into(&mut memory);
        assert_eq!(memory.read(0x8000), 0x10);
        assert_eq!(memory.read(0xC000), 0x10);
        assert_eq!(memory.read_u16(0xFFFC), 0x8000);
    }

    #[test]
    fn test_two_banks_fill_upper_half() {
        let cart = Cartridge::from_bytes(&image(2, 0, 0, 0)).unwrap();
        let mut memory = Memory::new();
        cart.map_into(&mut memory);
        assert_eq!(memory.read(0xBFFF), 0x10);
        assert_eq!(memory.read(0xC000), 0x11);
        assert_eq!(memory.read(0xFFFF), 0x11);
    }

    #[test]
    fn test_digest_is_stable_hex() {
        let a = Cartridge::from_bytes(&image(1, 0, 0, 0)).unwrap();
        let b = Cartridge::from_bytes(&image(1, 0, 0x01, 0)).unwrap();
        let c = Cartridge::from_bytes(&image(1, 1, 0, 0)).unwrap();

        assert_eq!(a.digest().len(), 64);
        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), c.digest());
    }
}
