use std::error::Error;
use std::fs::File;
use std::io::Read;

use chip8vm::config::{Args, Config};
use chip8vm::display::{Display, HeadlessDisplay, MonoTermDisplay};
use chip8vm::input::{Input, ScriptedInput, TermInput};
use chip8vm::instruction::disassemble;
use chip8vm::memory::PROGRAM_ADDR;
use chip8vm::sound::{Mute, SimpleBeep, Sound};
use chip8vm::{runner, CancelToken, Chip8Interpreter, RunSummary, VmError};
use clap::Parser;
use log::error;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();
    let config = args.to_config();

    // load a program
    let mut rom = Vec::new();
    File::open(&args.rom)?.read_to_end(&mut rom)?;

    if args.disassemble {
        for line in disassemble(&rom, PROGRAM_ADDR) {
            println!("{}", line);
        }
        return Ok(());
    }

    let mut beep = SimpleBeep::new();
    let mut mute = Mute::new();
    let sound: &mut dyn Sound = if args.mute { &mut mute } else { &mut beep };
    let cancel = CancelToken::new();

    let result = if args.headless {
        let mut display = HeadlessDisplay::new();
        let mut input = ScriptedInput::new(&[]).with_seed(config.seed);
        let result = run_rom(&mut display, &mut input, sound, &rom, &config, &cancel);
        print!("{}", display.render());
        result
    } else {
        let mut display = MonoTermDisplay::new()?;
        let result = {
            let mut input = TermInput::new(cancel.clone(), config.seed)?;
            run_rom(&mut display, &mut input, sound, &rom, &config, &cancel)
        };
        // shove some junk on stdout to stop the cli messing up the last frame
        for _ in 0..12 {
            println!();
        }
        result
    };

    let summary = result?;
    println!(
        "{:?} after {} instructions",
        summary.outcome, summary.instructions
    );
    Ok(())
}

fn run_rom(
    display: &mut dyn Display,
    input: &mut dyn Input,
    sound: &mut dyn Sound,
    rom: &[u8],
    config: &Config,
    cancel: &CancelToken,
) -> Result<RunSummary, VmError> {
    let mut interpreter = Chip8Interpreter::new(display, input, sound);
    let mut image = rom;
    interpreter.load_program(&mut image)?;
    let result = runner::run(&mut interpreter, config, cancel);
    match &result {
        Err(e) if e.is_program_fault() => {
            error!("program halted: {} [{:?}]", e, interpreter.state().registers)
        }
        Err(e) => error!("{}", e),
        Ok(_) => {}
    }
    result
}
