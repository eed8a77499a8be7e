use base64::prelude::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::cpu::Cpu;
use crate::memory::MEMORY_SIZE;
use crate::metrics::record_snapshot;

const RLE_MARKER: u8 = 0xFF;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("truncated RLE data at offset {0}")]
    Truncated(usize),

    #[error("memory image is {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("memory image is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot was taken with ROM {expected}, loaded ROM is {actual}")]
    RomMismatch { expected: String, actual: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuSnapshot {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub pc: u16,
    pub sp: u8,
    pub status: u8,
    pub halted: bool,
    pub instruction_count: u64,
}

/// Point-in-time copy of a CPU and its whole address space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
    /// SHA-256 of the cartridge the program came from, if any.
    pub rom_digest: Option<String>,
    pub cpu_state: CpuSnapshot,
    /// RLE-compressed memory image, base64 in the JSON form.
    #[serde(with = "base64_bytes")]
    pub memory_dump: Vec<u8>,
}

impl Snapshot {
    pub fn capture(cpu: &Cpu, label: impl Into<String>) -> Self {
        let cpu_state = CpuSnapshot {
            a: cpu.get_register_a(),
            x: cpu.get_register_x(),
            y: cpu.get_register_y(),
            pc: cpu.get_pc(),
            sp: cpu.get_sp(),
            status: cpu.get_status(),
            halted: cpu.is_halted(),
            instruction_count: cpu.instruction_count(),
        };

        let memory_dump = compress_memory(cpu.memory().as_bytes());
        let snapshot = Self {
            id: Uuid::new_v4().to_string(),
            label: label.into(),
            created_at: Utc::now(),
            rom_digest: None,
            cpu_state,
            memory_dump,
        };

        record_snapshot("capture");
        debug!(
            "captured snapshot {} ({} bytes compressed) at ${:04X}",
            snapshot.id,
            snapshot.memory_dump.len(),
            snapshot.cpu_state.pc
        );
        snapshot
    }

    pub fn with_rom_digest(mut self, digest: impl Into<String>) -> Self {
        self.rom_digest = Some(digest.into());
        self
    }

    /// Overwrites every register and the whole memory image. The CPU is left
    /// untouched if the memory image does not decode.
    pub fn restore(&self, cpu: &mut Cpu) -> Result<(), SnapshotError> {
        let image = decompress_memory(&self.memory_dump)?;
        if image.len() != MEMORY_SIZE {
            return Err(SnapshotError::SizeMismatch {
                expected: MEMORY_SIZE,
                actual: image.len(),
            });
        }
        cpu.memory_mut().restore_bytes(&image);

        let state = &self.cpu_state;
        cpu.set_register_a(state.a);
        cpu.set_register_x(state.x);
        cpu.set_register_y(state.y);
        cpu.set_pc(state.pc);
        cpu.set_sp(state.sp);
        cpu.set_status(state.status);
        cpu.set_halted(state.halted);
        cpu.set_instruction_count(state.instruction_count);

        record_snapshot("restore");
        debug!("restored snapshot {} at ${:04X}", self.id, state.pc);
        Ok(())
    }

    /// Like [`Snapshot::restore`], but refuses a snapshot taken with a
    /// different cartridge.
    pub fn restore_for_rom(&self, cpu: &mut Cpu, rom_digest: &str) -> Result<(), SnapshotError> {
        if let Some(expected) = &self.rom_digest {
            if expected != rom_digest {
                return Err(SnapshotError::RomMismatch {
                    expected: expected.clone(),
                    actual: rom_digest.to_string(),
                });
            }
        }
        self.restore(cpu)
    }

    /// Compressed size over the raw 64 KiB image.
    pub fn compression_ratio(&self) -> f32 {
        self.memory_dump.len() as f32 / MEMORY_SIZE as f32
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

mod base64_bytes {
    use base64::prelude::*;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        BASE64_STANDARD
            .decode(text.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// Encodes a memory image for storage outside JSON.
pub fn encode_memory(image: &[u8]) -> String {
    BASE64_STANDARD.encode(compress_memory(image))
}

pub fn decode_memory(text: &str) -> Result<Vec<u8>, SnapshotError> {
    let compressed = BASE64_STANDARD.decode(text)?;
    decompress_memory(&compressed)
}

// Simple run-length encoding for memory compression
fn compress_memory(memory: &[u8]) -> Vec<u8> {
    let mut compressed = Vec::new();
    let mut i = 0;

    while i < memory.len() {
        let current_byte = memory[i];
        let mut count = 1;

        // Count consecutive identical bytes (max 255)
        while i + count < memory.len() && memory[i + count] == current_byte && count < 255 {
            count += 1;
        }

        if count > 3 || current_byte == 0 {
            compressed.push(RLE_MARKER);
            compressed.push(count as u8);
            compressed.push(current_byte);
        } else {
            for &byte in &memory[i..i + count] {
                if byte == RLE_MARKER {
                    // Escaped literal; a run count is never zero
                    compressed.push(RLE_MARKER);
                    compressed.push(0x00);
                } else {
                    compressed.push(byte);
                }
            }
        }

        i += count;
    }

    compressed
}

fn decompress_memory(compressed: &[u8]) -> Result<Vec<u8>, SnapshotError> {
    let mut decompressed = Vec::with_capacity(MEMORY_SIZE);
    let mut i = 0;

    while i < compressed.len() {
        if compressed[i] != RLE_MARKER {
            decompressed.push(compressed[i]);
            i += 1;
            continue;
        }

        match compressed.get(i + 1) {
            None => return Err(SnapshotError::Truncated(i)),
            Some(0x00) => {
                decompressed.push(RLE_MARKER);
                i += 2;
            }
            Some(&count) => {
                let value = *compressed.get(i + 2).ok_or(SnapshotError::Truncated(i))?;
                decompressed.extend(std::iter::repeat(value).take(count as usize));
                i += 3;
            }
        }
    }

    Ok(decompressed)
}
