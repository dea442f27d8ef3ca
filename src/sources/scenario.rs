/// Deterministic temperature script driven by a 1-based tick counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Script {
    /// `before` for the first `ticks` ticks, then `after` forever.
    Step { ticks: u64, before: f64, after: f64 },
    Constant(f64),
}

impl Script {
    pub fn temperature_at(&self, tick: u64) -> f64 {
        match *self {
            Script::Step {
                ticks,
                before,
                after,
            } => {
                if tick <= ticks {
                    before
                } else {
                    after
                }
            }
            Script::Constant(value) => value,
        }
    }
}

#[derive(Debug)]
pub struct ScriptedSensor {
    script: Script,
    tick: u64,
}

impl ScriptedSensor {
    pub fn new(script: Script) -> Self {
        Self { script, tick: 0 }
    }

    pub fn step(&mut self) -> f64 {
        self.tick += 1;
        self.script.temperature_at(self.tick)
    }
}

/// Freezer starts hot (door left open) and recovers after five ticks.
pub const RECOVERY: Script = Script::Step {
    ticks: 5,
    before: -16.0,
    after: -21.0,
};

/// Cooler holds temperature for seven ticks, then fails.
pub const DEGRADATION: Script = Script::Step {
    ticks: 7,
    before: 4.0,
    after: 10.0,
};

pub const CONTROL: Script = Script::Constant(2.0);
