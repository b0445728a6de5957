/// # runner
///
/// Drives an interpreter against the wall clock. Two things are scheduled:
///
///  * instructions -- paced at `instructions_per_second`, or flat out
///  * timer ticks  -- `tick_timers` at `timer_hz`, whatever the instruction
///    rate; ticks that fell due while an instruction ran fire before the next
///
/// between instructions the loop checks the cancel token and the instruction
/// limit, and sleeps (spin_sleep, for accuracy) until the next thing is due.
use crate::config::Config;
use crate::error::VmError;
use crate::interpreter::{Chip8Interpreter, StepOutcome};
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// if we fall further behind than this, stop trying to catch up
const MAX_LAG: Duration = Duration::from_millis(100);

/// nap length when there's nothing to do and no timer to wait for
const IDLE_NAP: Duration = Duration::from_millis(1);

/// shared stop flag, checked between instructions
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// why a run stopped, short of a fault
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Cancelled,
    InstructionLimit,
    /// the program jumped to itself and `exit_on_idle` was set
    Idle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    /// steps taken, counting each poll of a key wait
    pub instructions: u64,
    pub timer_ticks: u64,
}

/// run until cancelled, out of instructions, idle, or faulted
pub fn run(
    interpreter: &mut Chip8Interpreter,
    config: &Config,
    cancel: &CancelToken,
) -> Result<RunSummary, VmError> {
    let instruction_period = config.instruction_period();
    let timer_period = config.timer_period();
    let start = Instant::now();
    let mut next_instruction = start;
    let mut next_tick = timer_period.map(|p| start + p);
    let mut instructions = 0;
    let mut timer_ticks = 0;

    let outcome = loop {
        if cancel.is_cancelled() {
            break RunOutcome::Cancelled;
        }
        if config.max_instructions.map_or(false, |max| instructions >= max) {
            break RunOutcome::InstructionLimit;
        }

        let now = Instant::now();
        if let (Some(period), Some(due)) = (timer_period, next_tick.as_mut()) {
            while now >= *due {
                interpreter.tick_timers();
                timer_ticks += 1;
                *due += period;
            }
        }

        if let Some(period) = instruction_period {
            if now < next_instruction {
                let wake = next_tick.map_or(next_instruction, |t| t.min(next_instruction));
                spin_sleep::sleep(wake.saturating_duration_since(now));
                continue;
            }
            next_instruction += period;
            if now.saturating_duration_since(next_instruction) > MAX_LAG {
                debug!("running behind, resetting the instruction clock");
                next_instruction = now;
            }
        }

        let step = interpreter.step()?;
        instructions += 1;
        match step {
            StepOutcome::Executed => {}
            StepOutcome::Idle if config.exit_on_idle => break RunOutcome::Idle,
            StepOutcome::Idle | StepOutcome::WaitingForKey => {
                // nothing changes until a key or a tick arrives; don't spin
                // when unthrottled
                if instruction_period.is_none() {
                    let now = Instant::now();
                    let wake = next_tick.unwrap_or(now + IDLE_NAP);
                    spin_sleep::sleep(wake.saturating_duration_since(now).min(IDLE_NAP * 16));
                }
            }
        }
    };

    let summary = RunSummary {
        outcome,
        instructions,
        timer_ticks,
    };
    info!(
        "stopped: {:?} after {} instructions, {} timer ticks, {:?}",
        summary.outcome,
        summary.instructions,
        summary.timer_ticks,
        start.elapsed()
    );
    Ok(summary)
}
