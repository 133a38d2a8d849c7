use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::LevelFilter;

use rust_gb_cycle::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};
use rust_gb_cycle::{Console, Error, GameBoy, MachineConfig, logger};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// 依卡帶標頭 0x0143 決定
    Auto,
    Dmg,
    Cgb,
}

/// Game Boy 週期精確模擬器 (無視窗)
#[derive(Parser, Debug)]
#[command(name = "rust_gb_cycle", version, about, long_about = None)]
struct Args {
    /// ROM 檔案路徑
    rom: PathBuf,

    /// 存檔路徑，預設為 ROM 同名的 .sav
    #[arg(long)]
    save: Option<PathBuf>,

    /// 開機 ROM；沒有時直接進入開機後狀態
    #[arg(long)]
    bootrom: Option<PathBuf>,

    /// 每執行一條指令記錄一行反組譯
    #[arg(long)]
    disassemble: bool,

    #[arg(long, value_enum, default_value_t = Mode::Auto)]
    mode: Mode,

    /// 執行指定的畫面數後結束，否則一直執行
    #[arg(long)]
    frames: Option<u64>,

    /// 不依實際時間節流
    #[arg(long)]
    unthrottled: bool,

    /// 結束時把最後一個畫面寫成 PPM
    #[arg(long)]
    screenshot: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// 預設 logs/emulator.log
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    logger::init(args.log_level, args.log_file.clone());

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("錯誤: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Error> {
    let rom = fs::read(&args.rom).map_err(|e| Error::io(&args.rom, e))?;

    let mut config = MachineConfig::new();
    config.console = match args.mode {
        Mode::Auto => None,
        Mode::Dmg => Some(Console::Dmg),
        Mode::Cgb => Some(Console::Cgb),
    };
    config.disassemble = args.disassemble;
    config.pacing = !args.unthrottled;
    if let Some(path) = &args.bootrom {
        config = config.with_bootrom_file(path);
    }

    let save = args
        .save
        .clone()
        .unwrap_or_else(|| args.rom.with_extension("sav"));
    let mut gb = GameBoy::new(rom, Some(save), config)?;
    println!("=== 啟動 Game Boy 模擬器 ({:?}) ===", gb.console());

    loop {
        if args.frames.is_some_and(|limit| gb.frames() >= limit) {
            break;
        }
        gb.run_frame()?;
        let serial = gb.take_serial_output();
        if !serial.is_empty() {
            print!("{serial}");
            let _ = std::io::stdout().flush();
        }
    }

    gb.save()?;
    log::info!(
        "執行 {} 個畫面，{} 條指令",
        gb.frames(),
        gb.cpu.instruction_count()
    );
    if let Some(path) = &args.screenshot {
        write_ppm(path, gb.pixels())?;
        log::info!("畫面已寫入 {}", path.display());
    }
    Ok(())
}

/// RGB555 轉成 8 位元 RGB 的二進位 PPM
fn write_ppm(path: &Path, pixels: &[u16]) -> Result<(), Error> {
    let mut data = Vec::with_capacity(32 + pixels.len() * 3);
    let _ = write!(data, "P6\n{SCREEN_WIDTH} {SCREEN_HEIGHT}\n255\n");
    for &pixel in pixels {
        for shift in [0, 5, 10] {
            let channel = ((pixel >> shift) & 0x1F) as u8;
            data.push((channel << 3) | (channel >> 2));
        }
    }
    fs::write(path, data).map_err(|e| Error::io(path, e))
}
