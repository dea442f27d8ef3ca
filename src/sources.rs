mod random_walk;
mod scenario;

use crate::clock::Clock;
use crate::config::SimulationMode;
use crate::pipeline::QueueHandle;
use crate::reading::Reading;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;

pub use random_walk::RandomWalk;
pub use scenario::{Script, ScriptedSensor, CONTROL, DEGRADATION, RECOVERY};

/// Sensors of the random-walk simulation and their starting temperatures.
const RANDOM_SENSORS: &[(&str, f64)] = &[("CF-1", -20.0), ("CF-2", 4.0), ("REF-3", 2.0)];

const SCENARIO_SENSORS: &[(&str, Script)] = &[
    ("CF-1", RECOVERY),
    ("CF-2", DEGRADATION),
    ("REF-3", CONTROL),
];

#[derive(Debug)]
pub enum Generator {
    RandomWalk(RandomWalk),
    Scripted(ScriptedSensor),
}

impl Generator {
    fn next_temperature(&mut self) -> f64 {
        match self {
            Generator::RandomWalk(walk) => walk.step(),
            Generator::Scripted(script) => script.step(),
        }
    }
}

/// One physical sensor: emits a reading every `period`, forever.
#[derive(Debug)]
pub struct SensorSource {
    sensor_id: String,
    period: Duration,
    generator: Generator,
}

impl SensorSource {
    pub fn new(sensor_id: impl Into<String>, period: Duration, generator: Generator) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            period,
            generator,
        }
    }

    pub fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn next_reading(&mut self, clock: &dyn Clock) -> Reading {
        let temperature = self.generator.next_temperature();
        Reading::new(self.sensor_id.clone(), temperature, clock.now())
    }

    /// Unbounded stream of readings; the first arrives one period after the call.
    pub fn readings(mut self, clock: Arc<dyn Clock>) -> impl Stream<Item = Reading> {
        let period = self.period.max(Duration::from_millis(1));
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        IntervalStream::new(interval).map(move |_| self.next_reading(clock.as_ref()))
    }

    pub fn spawn(self, queue: QueueHandle, clock: Arc<dyn Clock>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let sensor_id = self.sensor_id.clone();
            tracing::info!(sensor = %sensor_id, period_ms = self.period.as_millis() as u64, "sensor source started");
            let readings = self.readings(clock);
            tokio::pin!(readings);
            while let Some(reading) = readings.next().await {
                if let Err(err) = queue.enqueue(reading).await {
                    tracing::error!(sensor = %sensor_id, error = %err, "ingestion queue closed; stopping source");
                    break;
                }
            }
        })
    }
}

pub fn sources_for(
    mode: SimulationMode,
    random_period: Duration,
    scenario_period: Duration,
) -> Vec<SensorSource> {
    match mode {
        SimulationMode::Random => RANDOM_SENSORS
            .iter()
            .map(|(id, base)| {
                SensorSource::new(
                    *id,
                    random_period,
                    Generator::RandomWalk(RandomWalk::new(*base)),
                )
            })
            .collect(),
        SimulationMode::Scenario => SCENARIO_SENSORS
            .iter()
            .map(|(id, script)| {
                SensorSource::new(
                    *id,
                    scenario_period,
                    Generator::Scripted(ScriptedSensor::new(*script)),
                )
            })
            .collect(),
    }
}

pub fn spawn_sources(
    sources: Vec<SensorSource>,
    queue: &QueueHandle,
    clock: Arc<dyn Clock>,
) -> Vec<JoinHandle<()>> {
    sources
        .into_iter()
        .map(|source| source.spawn(queue.clone(), clock.clone()))
        .collect()
}
