use std::env;
use std::fs;
use std::process;

use famicore::cartridge::Cartridge;
use famicore::nes::Nes;

fn main() {
    env_logger::init();

    let mut args: Vec<String> = env::args().collect();
    let trace = if let Some(pos) = args.iter().position(|a| a == "--trace") {
        args.remove(pos);
        true
    } else {
        false
    };
    if args.len() < 2 {
        eprintln!("Usage: {} <rom.nes> [frames] [--trace]", args[0]);
        process::exit(1);
    }

    let rom_path = &args[1];
    let frames: u32 = args
        .get(2)
        .map(|s| s.parse())
        .transpose()
        .unwrap_or_else(|e| {
            eprintln!("Invalid frame count: {}", e);
            process::exit(1);
        })
        .unwrap_or(60);

    let rom_data = fs::read(rom_path).unwrap_or_else(|e| {
        eprintln!("Failed to read ROM file '{}': {}", rom_path, e);
        process::exit(1);
    });

    let cartridge = Cartridge::from_ines(&rom_data).unwrap_or_else(|e| {
        eprintln!("Failed to parse ROM: {}", e);
        process::exit(1);
    });

    let mut nes = Nes::new(cartridge).unwrap_or_else(|e| {
        eprintln!("Failed to start emulation: {}", e);
        process::exit(1);
    });

    if trace {
        // nestest-style log, one line per instruction
        for _ in 0..frames {
            loop {
                if nes.cpu.stall == 0 {
                    println!("{}", nes.cpu.trace(&nes.bus));
                }
                if nes.step_instruction() {
                    break;
                }
            }
        }
    } else {
        for _ in 0..frames {
            nes.step(&[0, 0]);
        }
    }

    // Cheap digests of the last frame and of work RAM, so headless runs
    // have something to compare against
    let frame_digest = digest(nes.frame().as_bytes());
    let ram_digest = digest(&nes.bus.ram);
    println!(
        "{} frames, cpu cycles {}, frame digest {:016x}, ram digest {:016x}",
        frames, nes.cpu.cycles, frame_digest, ram_digest
    );
}

fn digest(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, &b| acc.wrapping_mul(31).wrapping_add(b as u64))
}
