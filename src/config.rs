use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// roughly what a COSMAC VIP managed
pub const DEFAULT_INSTRUCTIONS_PER_SECOND: u32 = 700;

pub const DEFAULT_TIMER_HZ: u32 = 60;

/// how a program gets run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// instruction throttle; `None` runs flat out
    pub instructions_per_second: Option<u32>,
    /// how often dt and st count down; 0 stops them
    pub timer_hz: u32,
    /// stop after this many steps
    pub max_instructions: Option<u64>,
    /// stop when the program jumps to itself
    pub exit_on_idle: bool,
    /// seed for RND; `None` seeds from the OS
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            instructions_per_second: Some(DEFAULT_INSTRUCTIONS_PER_SECOND),
            timer_hz: DEFAULT_TIMER_HZ,
            max_instructions: None,
            exit_on_idle: false,
            seed: None,
        }
    }
}

impl Config {
    /// time between instructions, if throttled
    pub fn instruction_period(&self) -> Option<Duration> {
        period_of(self.instructions_per_second.unwrap_or(0))
    }

    /// time between timer ticks, if the timers run
    pub fn timer_period(&self) -> Option<Duration> {
        period_of(self.timer_hz)
    }
}

fn period_of(hz: u32) -> Option<Duration> {
    match hz {
        0 => None,
        hz => Some(Duration::from_secs(1) / hz),
    }
}

#[derive(Parser, Debug)]
#[command(name = "chip8vm", about = "Runs a CHIP-8 program in the terminal.")]
pub struct Args {
    /// program image, loaded at 0x200
    #[arg(value_name = "ROM")]
    pub rom: PathBuf,

    /// instructions per second
    #[arg(long, default_value_t = DEFAULT_INSTRUCTIONS_PER_SECOND)]
    pub ips: u32,

    /// run instructions as fast as possible
    #[arg(long)]
    pub unthrottled: bool,

    /// delay/sound timer rate
    #[arg(long, default_value_t = DEFAULT_TIMER_HZ)]
    pub timer_hz: u32,

    /// stop after this many instructions
    #[arg(long)]
    pub max_instructions: Option<u64>,

    /// stop once the program jumps to itself
    #[arg(long)]
    pub exit_on_idle: bool,

    /// no terminal UI; print the final screen as text
    #[arg(long)]
    pub headless: bool,

    /// no beeping
    #[arg(long)]
    pub mute: bool,

    /// seed for the random number instruction
    #[arg(long)]
    pub seed: Option<u64>,

    /// print a listing of the program instead of running it
    #[arg(long)]
    pub disassemble: bool,
}

impl Args {
    pub fn to_config(&self) -> Config {
        Config {
            instructions_per_second: if self.unthrottled {
                None
            } else {
                Some(self.ips)
            },
            timer_hz: self.timer_hz,
            max_instructions: self.max_instructions,
            exit_on_idle: self.exit_on_idle,
            seed: self.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!(c.instruction_period(), Some(Duration::from_secs(1) / 700));
        assert_eq!(c.timer_period(), Some(Duration::from_secs(1) / 60));
    }

    #[test]
    fn test_zero_rates_disable() {
        let c = Config {
            instructions_per_second: Some(0),
            timer_hz: 0,
            ..Config::default()
        };
        assert_eq!(c.instruction_period(), None);
        assert_eq!(c.timer_period(), None);
    }

    #[test]
    fn test_args_to_config() {
        let args = Args::try_parse_from([
            "chip8vm",
            "roms/maze.ch8",
            "--unthrottled",
            "--max-instructions",
            "500",
            "--exit-on-idle",
            "--seed",
            "9",
        ])
        .unwrap();
        assert_eq!(args.rom, PathBuf::from("roms/maze.ch8"));
        let c = args.to_config();
        assert_eq!(c.instructions_per_second, None);
        assert_eq!(c.max_instructions, Some(500));
        assert!(c.exit_on_idle);
        assert_eq!(c.seed, Some(9));
        assert_eq!(c.timer_hz, 60);
    }

    #[test]
    fn test_args_need_a_rom() {
        assert!(Args::try_parse_from(["chip8vm"]).is_err());
    }
}
