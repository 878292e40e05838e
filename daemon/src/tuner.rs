//! Tuner loop
//!
//! One tick: drain queued hotkey events, read the game, apply the events,
//! decide, and run the resulting command against the sink. While the game
//! is not running the loop only retries attaching, every two seconds.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::audio::{MediaSink, SinkError, TransitionEffect, VolumeFader};
use crate::config::Config;
use crate::events::TunerEvent;
use crate::probe::{MemoryReader, ProcessProbe};
use crate::state::{TunerCommand, TunerState};

/// Delay between two ticks
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Delay between attach attempts while the game is not running
pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(2);

/// Failures that end the tuner loop
#[derive(Debug, thiserror::Error)]
pub enum TunerError {
    #[error("media sink failed: {0}")]
    Sink(#[from] SinkError),
}

/// Connection status after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Read the game and ran a decision
    Connected,
    /// The game could not be attached; wait before retrying
    Disconnected,
    /// A read failed mid-session; reattach on the next tick
    ConnectionLost,
}

/// Owns the tuner state, the probe and the sink
pub struct Tuner<R: MemoryReader, S: MediaSink> {
    config: Config,
    state: TunerState,
    probe: ProcessProbe<R>,
    sink: S,
    fader: VolumeFader,
    transition: TransitionEffect,
}

impl<R: MemoryReader, S: MediaSink> Tuner<R, S> {
    pub fn new(config: Config, probe: ProcessProbe<R>, sink: S) -> Self {
        let fader = VolumeFader::new(config.fade_step_delay());
        let transition = TransitionEffect::new(
            config.audio.static_sound_file.clone(),
            config.static_volume(),
            config.static_duration(),
        );

        Self {
            state: TunerState::new(config.stations.clone()),
            config,
            probe,
            sink,
            fader,
            transition,
        }
    }

    pub fn state(&self) -> &TunerState {
        &self.state
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Load the first station, silent and not playing
    pub async fn prepare(&mut self) -> Result<(), TunerError> {
        if let Some(station) = self.state.catalog().current() {
            debug!(station = %station.name, "loading first station");
            self.sink.load_media(&station.url).await?;
            self.sink.set_volume(0).await?;
        } else {
            warn!("no stations configured");
        }
        Ok(())
    }

    /// Run until `shutdown` resolves or the sink fails
    ///
    /// Shutdown is only observed between ticks; a fade or transition in
    /// progress always completes first.
    pub async fn run<F>(
        &mut self,
        mut events: mpsc::Receiver<TunerEvent>,
        shutdown: F,
    ) -> Result<(), TunerError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut ticker = interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("tuner started, waiting for game");

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            if self.tick(&mut events).await? == TickOutcome::Disconnected {
                tokio::select! {
                    biased;
                    _ = &mut shutdown => break,
                    _ = sleep(RECONNECT_INTERVAL) => {}
                }
            }
        }

        info!("tuner stopped");
        Ok(())
    }

    /// Run a single tick
    pub async fn tick(
        &mut self,
        events: &mut mpsc::Receiver<TunerEvent>,
    ) -> Result<TickOutcome, TunerError> {
        let mut pending = Vec::new();
        while let Ok(event) = events.try_recv() {
            pending.push(event);
        }

        let (reading, outcome) = if self.probe.ensure_connected() {
            match self.probe.read_value() {
                Ok(value) => (Some(value), TickOutcome::Connected),
                Err(_) => (None, TickOutcome::ConnectionLost),
            }
        } else {
            (None, TickOutcome::Disconnected)
        };

        for event in pending {
            self.state.apply(event, reading);
        }

        let Some(value) = reading else {
            return Ok(outcome);
        };

        let command = self.state.decide(value, &self.config);
        if command != TunerCommand::NoOp {
            debug!(
                %command,
                value,
                paired = ?self.state.paired_id(),
                station_changed = self.state.station_changed(),
                "tuner decision"
            );
        }
        self.execute(command, value).await?;

        Ok(outcome)
    }

    async fn execute(&mut self, command: TunerCommand, value: i32) -> Result<(), TunerError> {
        match command {
            TunerCommand::NoOp => {}
            TunerCommand::HardSwitch { station, volume } => {
                let Some(station) = self.state.catalog().get(station).cloned() else {
                    return Ok(());
                };
                info!(
                    index = self.state.station_index(),
                    station = %station.name,
                    volume_percent = station.volume_percent,
                    "tuning"
                );

                self.transition.play(&mut self.sink).await?;
                self.sink.load_media(&station.url).await?;
                self.sink.play().await?;
                self.sink.set_volume(volume).await?;
                self.state.complete_switch(volume);
            }
            TunerCommand::FadeTo(target) => {
                if target == 0 {
                    if self.state.in_context(value) && !self.state.is_radio_on() {
                        info!("power off, fading out");
                    } else {
                        info!("leaving ship, fading out");
                    }
                } else {
                    info!("radio on, fading in");
                }

                let start = i32::from(self.state.current_volume());
                let reached = self
                    .fader
                    .fade_to(&mut self.sink, start, i32::from(target))
                    .await?;
                self.state.set_current_volume(i32::from(reached));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use crate::audio::testing::{RecordingSink, SinkCall};
    use crate::config::Station;
    use crate::probe::{AttachError, ReadError};

    const SHIP: i32 = 31337;

    /// Game stand-in. `None` entries in `reads` fail the read.
    #[derive(Default)]
    struct Game {
        running: bool,
        attempts: usize,
        attaches: usize,
        reads: VecDeque<Option<i32>>,
        current: i32,
    }

    #[derive(Clone, Default)]
    struct FakeReader(Arc<Mutex<Game>>);

    impl FakeReader {
        fn running(value: i32) -> Self {
            let reader = Self::default();
            {
                let mut game = reader.0.lock().unwrap();
                game.running = true;
                game.current = value;
            }
            reader
        }

        fn set(&self, value: i32) {
            self.0.lock().unwrap().current = value;
        }

        fn fail_next_read(&self) {
            self.0.lock().unwrap().reads.push_back(None);
        }

        fn attaches(&self) -> usize {
            self.0.lock().unwrap().attaches
        }

        fn attempts(&self) -> usize {
            self.0.lock().unwrap().attempts
        }
    }

    impl MemoryReader for FakeReader {
        type Handle = ();

        fn attach(&mut self, process_name: &str) -> Result<(), AttachError> {
            let mut game = self.0.lock().unwrap();
            game.attempts += 1;
            if !game.running {
                return Err(AttachError::ProcessNotFound(process_name.to_string()));
            }
            game.attaches += 1;
            Ok(())
        }

        fn image_base(&self, _handle: &()) -> u64 {
            0x1_4000_0000
        }

        fn read_i32(&mut self, _handle: &(), _address: u64) -> Result<i32, ReadError> {
            let mut game = self.0.lock().unwrap();
            match game.reads.pop_front() {
                Some(None) => Err(ReadError::Io(std::io::Error::from_raw_os_error(5))),
                Some(Some(value)) => Ok(value),
                None => Ok(game.current),
            }
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.audio.max_volume = 90;
        config.audio.static_sound_file = None;
        config.stations = vec![
            Station {
                url: "http://radio.example/alpha".into(),
                name: "Alpha".into(),
                volume_percent: 100,
            },
            Station {
                url: "http://radio.example/beta".into(),
                name: "Beta".into(),
                volume_percent: 50,
            },
        ];
        config
    }

    fn tuner(
        reader: FakeReader,
    ) -> (
        Tuner<FakeReader, RecordingSink>,
        mpsc::Sender<TunerEvent>,
        mpsc::Receiver<TunerEvent>,
    ) {
        let probe = ProcessProbe::new(reader, "NMS.exe", 0x596F740);
        let (tx, rx) = mpsc::channel(32);
        (Tuner::new(config(), probe, RecordingSink::default()), tx, rx)
    }

    /// Tuner sitting in the paired ship at full station volume
    async fn playing_tuner(
        reader: &FakeReader,
    ) -> (
        Tuner<FakeReader, RecordingSink>,
        mpsc::Sender<TunerEvent>,
        mpsc::Receiver<TunerEvent>,
    ) {
        let (mut tuner, tx, mut rx) = tuner(reader.clone());
        tuner.prepare().await.unwrap();
        tx.send(TunerEvent::PairShip).await.unwrap();
        tuner.tick(&mut rx).await.unwrap();
        assert_eq!(tuner.state().current_volume(), 90);
        tuner.sink.calls.clear();
        (tuner, tx, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_prepare_loads_first_station_silently() {
        let (mut tuner, _tx, _rx) = tuner(FakeReader::running(SHIP));
        tuner.prepare().await.unwrap();
        assert_eq!(
            tuner.sink.calls,
            vec![
                SinkCall::Load("http://radio.example/alpha".into()),
                SinkCall::Volume(0),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnected_tick_makes_no_decision() {
        let (mut tuner, tx, mut rx) = tuner(FakeReader::default());
        tx.send(TunerEvent::PairShip).await.unwrap();

        let outcome = tuner.tick(&mut rx).await.unwrap();
        assert_eq!(outcome, TickOutcome::Disconnected);
        assert!(tuner.sink.calls.is_empty());
        assert_eq!(tuner.state().paired_id(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pairing_fades_in() {
        let reader = FakeReader::running(SHIP);
        let (mut tuner, tx, mut rx) = tuner(reader);
        tuner.prepare().await.unwrap();
        tuner.sink.calls.clear();

        tx.send(TunerEvent::PairShip).await.unwrap();
        assert_eq!(tuner.tick(&mut rx).await.unwrap(), TickOutcome::Connected);

        assert_eq!(tuner.state().paired_id(), Some(SHIP));
        assert_eq!(tuner.sink.calls.first(), Some(&SinkCall::Play));
        let volumes = tuner.sink.volumes();
        assert_eq!(volumes.first(), Some(&0));
        assert_eq!(volumes.last(), Some(&90));
        assert!(volumes.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(tuner.state().current_volume(), 90);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pairing_on_foot_is_rejected() {
        let (mut tuner, tx, mut rx) = tuner(FakeReader::running(0));
        tx.send(TunerEvent::PairShip).await.unwrap();
        tuner.tick(&mut rx).await.unwrap();
        assert_eq!(tuner.state().paired_id(), None);
        assert!(tuner.sink.calls.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_leaving_ship_fades_out_and_pauses() {
        let reader = FakeReader::running(SHIP);
        let (mut tuner, _tx, mut rx) = playing_tuner(&reader).await;

        reader.set(0);
        tuner.tick(&mut rx).await.unwrap();

        let volumes = tuner.sink.volumes();
        assert_eq!(volumes.first(), Some(&90));
        assert_eq!(volumes.last(), Some(&0));
        assert_eq!(tuner.sink.calls.last(), Some(&SinkCall::Pause));
        assert_eq!(tuner.state().current_volume(), 0);

        // Nothing more to do while outside
        tuner.sink.calls.clear();
        tuner.tick(&mut rx).await.unwrap();
        assert!(tuner.sink.calls.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_ship_counts_as_leaving() {
        let reader = FakeReader::running(SHIP);
        let (mut tuner, _tx, mut rx) = playing_tuner(&reader).await;

        reader.set(SHIP + 1);
        tuner.tick(&mut rx).await.unwrap();
        assert_eq!(tuner.state().current_volume(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_power_toggle_fades_out_and_back_in() {
        let reader = FakeReader::running(SHIP);
        let (mut tuner, tx, mut rx) = playing_tuner(&reader).await;

        tx.send(TunerEvent::TogglePower).await.unwrap();
        tuner.tick(&mut rx).await.unwrap();
        assert!(!tuner.state().is_radio_on());
        assert_eq!(tuner.state().current_volume(), 0);

        tx.send(TunerEvent::TogglePower).await.unwrap();
        tuner.tick(&mut rx).await.unwrap();
        assert_eq!(tuner.state().current_volume(), 90);
    }

    #[tokio::test(start_paused = true)]
    async fn test_station_change_uses_one_hard_switch() {
        let reader = FakeReader::running(SHIP);
        let (mut tuner, tx, mut rx) = playing_tuner(&reader).await;

        tx.send(TunerEvent::NextStation).await.unwrap();
        tuner.tick(&mut rx).await.unwrap();

        assert_eq!(
            tuner.sink.calls,
            vec![
                SinkCall::Stop,
                SinkCall::Load("http://radio.example/beta".into()),
                SinkCall::Play,
                SinkCall::Volume(45),
            ]
        );
        assert!(!tuner.state().station_changed());
        assert_eq!(tuner.state().current_volume(), 45);

        tuner.sink.calls.clear();
        tuner.tick(&mut rx).await.unwrap();
        tuner.tick(&mut rx).await.unwrap();
        assert!(tuner.sink.calls.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_before_pairing_is_ignored() {
        let (mut tuner, tx, mut rx) = tuner(FakeReader::running(SHIP));
        for _ in 0..3 {
            tx.send(TunerEvent::NextStation).await.unwrap();
            tx.send(TunerEvent::PrevStation).await.unwrap();
            tx.send(TunerEvent::NextStation).await.unwrap();
        }
        tuner.tick(&mut rx).await.unwrap();
        assert_eq!(tuner.state().station_index(), 0);
        assert!(!tuner.state().station_changed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_apply_in_queue_order() {
        let (mut tuner, tx, mut rx) = tuner(FakeReader::running(SHIP));
        tuner.prepare().await.unwrap();

        // Next before Pair is dropped; Next after Pair counts
        tx.send(TunerEvent::NextStation).await.unwrap();
        tx.send(TunerEvent::PairShip).await.unwrap();
        tx.send(TunerEvent::NextStation).await.unwrap();
        tx.send(TunerEvent::NextStation).await.unwrap();
        tuner.tick(&mut rx).await.unwrap();

        assert_eq!(tuner.state().station_index(), 0);
        assert!(!tuner.state().station_changed());
        assert_eq!(tuner.sink.count(&SinkCall::Stop), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_station_change_outside_ship_waits() {
        let reader = FakeReader::running(SHIP);
        let (mut tuner, tx, mut rx) = playing_tuner(&reader).await;

        reader.set(0);
        tx.send(TunerEvent::NextStation).await.unwrap();
        tuner.tick(&mut rx).await.unwrap();
        assert_eq!(tuner.sink.count(&SinkCall::Stop), 0);
        assert!(tuner.state().station_changed());

        reader.set(SHIP);
        tuner.sink.calls.clear();
        tuner.tick(&mut rx).await.unwrap();
        assert_eq!(tuner.sink.count(&SinkCall::Stop), 1);
        assert_eq!(tuner.sink.volumes(), vec![45]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_failure_reattaches_next_tick() {
        let reader = FakeReader::running(SHIP);
        let (mut tuner, _tx, mut rx) = playing_tuner(&reader).await;
        assert_eq!(reader.attaches(), 1);

        reader.fail_next_read();
        let outcome = tuner.tick(&mut rx).await.unwrap();
        assert_eq!(outcome, TickOutcome::ConnectionLost);
        assert!(tuner.sink.calls.is_empty());

        let outcome = tuner.tick(&mut rx).await.unwrap();
        assert_eq!(outcome, TickOutcome::Connected);
        assert_eq!(reader.attaches(), 2);
        assert_eq!(tuner.state().paired_id(), Some(SHIP));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let reader = FakeReader::running(SHIP);
        let (mut tuner, tx, rx) = tuner(reader);
        tuner.prepare().await.unwrap();
        tx.send(TunerEvent::PairShip).await.unwrap();

        let shutdown = sleep(Duration::from_secs(10));
        tuner.run(rx, shutdown).await.unwrap();

        assert_eq!(tuner.state().current_volume(), 90);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_retries_attach_while_game_missing() {
        let reader = FakeReader::default();
        let (mut tuner, _tx, rx) = tuner(reader.clone());

        let shutdown = sleep(Duration::from_secs(5));
        tuner.run(rx, shutdown).await.unwrap();

        // Attempts at 0s, 2s and 4s, not one per tick
        assert_eq!(reader.attaches(), 0);
        assert!((2..=3).contains(&reader.attempts()));
        assert!(tuner.sink.calls.is_empty());
    }
}
