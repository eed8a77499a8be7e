use anyhow::{bail, Context, Result};
use std::env;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use nes6502::{Cartridge, Cpu, EmulatorConfig, Flag};

const DEFAULT_STEPS: u64 = 1000;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nes6502=info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let Some(rom_path) = args.get(1) else {
        let program = args.first().map(String::as_str).unwrap_or("nes6502");
        bail!("usage: {} <rom.nes> [steps] [config.json]", program);
    };
    let steps = match args.get(2) {
        Some(text) => text
            .parse::<u64>()
            .with_context(|| format!("invalid step count {:?}", text))?,
        None => DEFAULT_STEPS,
    };
    let config = match args.get(3) {
        Some(path) => EmulatorConfig::load(path)
            .with_context(|| format!("failed to load config {}", path))?,
        None => EmulatorConfig::default(),
    };

    let cartridge = Cartridge::load(rom_path)
        .with_context(|| format!("failed to load cartridge {}", rom_path))?;
    let info = cartridge.summary();
    info!(
        "cartridge: mapper {}, {} PRG x 16K, {} CHR x 8K, {:?} mirroring, sha256 {}",
        info.mapper, info.prg_banks, info.chr_banks, info.mirroring, info.digest
    );

    let mut cpu = Cpu::with_config(config);
    cartridge.map_into(cpu.memory_mut());
    cpu.reset();

    let outcome = cpu.run(steps);

    info!(
        "A:{:02X} X:{:02X} Y:{:02X} PC:{:04X} SP:{:02X} P:{} after {} instructions",
        cpu.get_register_a(),
        cpu.get_register_x(),
        cpu.get_register_y(),
        cpu.get_pc(),
        cpu.get_sp(),
        cpu.status(),
        cpu.instruction_count()
    );
    for flag in Flag::ALL {
        info!("  {:<18} {}", flag.name(), cpu.get_flag(flag) as u8);
    }

    if let Err(err) = outcome {
        error!("{}", err);
        return Err(err).context("emulation stopped");
    }
    Ok(())
}
