// Copyright (C) 2024 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, info, span, Level, Span};

use crate::chart::Chart;
use crate::config::{self, ConfigError};
use crate::events::{EventMaterializer, MaterializedEvents};
use crate::playsync::CancelHandle;
use crate::scheduler::Scheduler;
use crate::sounds::SoundBank;
use crate::transport::Transport;

mod priority;

/// The player's playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No chart is prepared.
    Stopped,
    Playing,
    /// A chart is prepared but sounds are held.
    Paused,
}

#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("No chart has been prepared")]
    NotPrepared,

    #[error("The scheduler thread is no longer running")]
    Disconnected,

    #[error("Unable to start the scheduler thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Requests sent from the player to its polling loop.
enum Command {
    Play,
    Pause,
    Seek(Duration),
    Install(Box<MaterializedEvents>),
}

/// How the polling loop paces itself.
#[derive(Debug, Clone)]
struct PollSettings {
    /// Sleep between polls while playing. None busy-polls.
    poll_interval: Option<Duration>,
    /// How long to block for commands while not playing.
    idle_interval: Duration,
    thread_priority: Option<u8>,
    realtime: bool,
}

impl PollSettings {
    fn from_config(config: &config::Scheduler) -> Result<PollSettings, ConfigError> {
        Ok(PollSettings {
            poll_interval: config.poll_interval()?,
            idle_interval: config.idle_interval()?,
            thread_priority: config.thread_priority(),
            realtime: config.realtime(),
        })
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        PollSettings {
            poll_interval: None,
            idle_interval: config::DEFAULT_IDLE_INTERVAL,
            thread_priority: None,
            realtime: false,
        }
    }
}

/// One prepared chart and the thread scheduling it.
struct Session {
    commands: Sender<Command>,
    /// Event storage handed back by the polling loop for reuse.
    recycled: Receiver<MaterializedEvents>,
    cancel_handle: CancelHandle,
    join: JoinHandle<()>,
    /// Owns the loop id sequence for this session.
    materializer: EventMaterializer,
}

/// Plays a chart's sound effects in step with a transport.
pub struct FumenSoundPlayer {
    bank: Arc<SoundBank>,
    settings: PollSettings,
    session: Option<Session>,
    state: PlaybackState,
    span: Span,
}

impl FumenSoundPlayer {
    /// Creates a new player with the given scheduler configuration.
    pub fn new(
        bank: Arc<SoundBank>,
        config: &config::Scheduler,
    ) -> Result<FumenSoundPlayer, ConfigError> {
        Ok(FumenSoundPlayer::with_settings(
            bank,
            PollSettings::from_config(config)?,
        ))
    }

    fn with_settings(bank: Arc<SoundBank>, settings: PollSettings) -> FumenSoundPlayer {
        FumenSoundPlayer {
            bank,
            settings,
            session: None,
            state: PlaybackState::Stopped,
            span: span!(Level::INFO, "fumen sound player"),
        }
    }

    pub fn bank(&self) -> &Arc<SoundBank> {
        &self.bank
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Materializes `chart` and starts a new scheduling session following `transport`. Any
    /// previous session is stopped first, and loop ids start over. The new session is paused.
    pub fn prepare(
        &mut self,
        chart: &Chart,
        transport: Arc<dyn Transport>,
    ) -> Result<(), PlayerError> {
        self.stop();
        let _enter = self.span.enter();

        let mut materializer = EventMaterializer::new();
        let events = materializer.materialize(chart);
        info!(
            instants = events.instants().len(),
            durations = events.durations().len(),
            "Prepared chart"
        );

        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (recycle_tx, recycle_rx) = crossbeam_channel::unbounded();
        let cancel_handle = CancelHandle::new();
        let polling_loop = PollingLoop {
            scheduler: Scheduler::new(events),
            bank: self.bank.clone(),
            transport,
            commands: command_rx,
            recycle: recycle_tx,
            cancel_handle: cancel_handle.clone(),
            settings: self.settings.clone(),
            playing: false,
        };

        let join = thread::Builder::new()
            .name("fumen-sound-scheduler".to_string())
            .spawn(move || polling_loop.run())?;

        self.session = Some(Session {
            commands: command_tx,
            recycled: recycle_rx,
            cancel_handle,
            join,
            materializer,
        });
        self.state = PlaybackState::Paused;
        Ok(())
    }

    /// Re-materializes an edited chart into the running session. Active loops are stopped and
    /// restarted from the new events; events already passed do not fire again.
    pub fn rebuild(&mut self, chart: &Chart) -> Result<(), PlayerError> {
        let _enter = self.span.enter();
        let session = self.session.as_mut().ok_or(PlayerError::NotPrepared)?;

        let mut events = session.recycled.try_recv().unwrap_or_default();
        session.materializer.rebuild(chart, &mut events);
        debug!(
            instants = events.instants().len(),
            durations = events.durations().len(),
            "Rebuilt chart"
        );
        session
            .commands
            .send(Command::Install(Box::new(events)))
            .map_err(|_| PlayerError::Disconnected)
    }

    pub fn play(&mut self) -> Result<(), PlayerError> {
        let _enter = self.span.enter();
        self.send(Command::Play)?;
        info!("Playing");
        self.state = PlaybackState::Playing;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), PlayerError> {
        let _enter = self.span.enter();
        self.send(Command::Pause)?;
        info!("Paused");
        self.state = PlaybackState::Paused;
        Ok(())
    }

    /// Pauses, moves to `time` and resumes unless `pause` is set.
    pub fn seek(&mut self, time: Duration, pause: bool) -> Result<(), PlayerError> {
        let _enter = self.span.enter();
        self.send(Command::Pause)?;
        self.send(Command::Seek(time))?;
        self.state = PlaybackState::Paused;
        info!(?time, pause, "Seeking");

        if !pause {
            self.send(Command::Play)?;
            self.state = PlaybackState::Playing;
        }
        Ok(())
    }

    /// Stops the session, waiting for its thread to exit. Every loop is stopped by the time this
    /// returns.
    pub fn stop(&mut self) {
        let _enter = self.span.enter();
        let Some(session) = self.session.take() else {
            return;
        };

        session.cancel_handle.cancel();
        if let Err(e) = session.join.join() {
            error!("Error waiting for the scheduler thread to stop: {:?}", e);
        }
        self.state = PlaybackState::Stopped;
        info!("Stopped");
    }

    fn send(&self, command: Command) -> Result<(), PlayerError> {
        self.session
            .as_ref()
            .ok_or(PlayerError::NotPrepared)?
            .commands
            .send(command)
            .map_err(|_| PlayerError::Disconnected)
    }
}

impl Drop for FumenSoundPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The scheduler thread's state.
struct PollingLoop {
    scheduler: Scheduler,
    bank: Arc<SoundBank>,
    transport: Arc<dyn Transport>,
    commands: Receiver<Command>,
    recycle: Sender<MaterializedEvents>,
    cancel_handle: CancelHandle,
    settings: PollSettings,
    /// Whether the player wants sound. The transport must be playing too.
    playing: bool,
}

impl PollingLoop {
    fn run(mut self) {
        let span = span!(Level::INFO, "fumen sound scheduler");
        let _enter = span.enter();

        priority::configure_scheduler_thread_priority(
            self.settings.thread_priority,
            self.settings.realtime,
        );
        info!(
            poll_interval = ?self.settings.poll_interval,
            idle_interval = ?self.settings.idle_interval,
            "Scheduler started"
        );

        while !self.cancel_handle.is_cancelled() {
            while let Ok(command) = self.commands.try_recv() {
                self.handle(command);
            }

            if !self.playing || !self.transport.is_playing() {
                self.scheduler.stop_all_loops(&self.bank);
                match self.commands.recv_timeout(self.settings.idle_interval) {
                    Ok(command) => self.handle(command),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
                continue;
            }

            let now = self.transport.current_time();
            self.scheduler.update(now, &self.bank);

            if let Some(poll_interval) = self.settings.poll_interval {
                spin_sleep::sleep(poll_interval);
            }
        }

        self.scheduler.stop_all_loops(&self.bank);
        info!("Scheduler stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Play => self.playing = true,
            Command::Pause => self.playing = false,
            Command::Seek(time) => self.scheduler.seek(time, &self.bank),
            Command::Install(events) => {
                let previous = self.scheduler.install(*events, &self.bank);
                // The player may already be gone.
                let _ = self.recycle.send(previous);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::chart::{GridTime, ObjectKind, TempoMap, TimeSignature};
    use crate::events::{LoopId, SoundCategory};
    use crate::sounds::mock::{Call, RecordingPlayer};
    use crate::testutil::{eventually, ManualTransport};

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    struct Fixture {
        player: FumenSoundPlayer,
        transport: Arc<ManualTransport>,
        tap: Arc<RecordingPlayer>,
        beam: Arc<RecordingPlayer>,
    }

    fn fixture() -> Fixture {
        let tap = Arc::new(RecordingPlayer::new());
        let beam = Arc::new(RecordingPlayer::new());
        let mut bank = SoundBank::new();
        bank.insert(SoundCategory::Tap, tap.clone());
        bank.insert(SoundCategory::BeamLoop, beam.clone());

        let settings = PollSettings {
            poll_interval: Some(Duration::from_micros(200)),
            idle_interval: Duration::from_millis(1),
            ..Default::default()
        };
        Fixture {
            player: FumenSoundPlayer::with_settings(Arc::new(bank), settings),
            transport: Arc::new(ManualTransport::new()),
            tap,
            beam,
        }
    }

    /// 120 BPM without default clicks: a tap at 1s and a beam over [4s, 6s).
    fn chart() -> Chart {
        let mut chart = Chart::new(TempoMap::new(120.0, TimeSignature::new(0, 4)));
        chart
            .add(GridTime::new(0, 960), ObjectKind::Tap { critical: false })
            .add(
                GridTime::new(2, 0),
                ObjectKind::BeamStart {
                    max: GridTime::new(3, 0),
                },
            );
        chart
    }

    #[test]
    fn test_requires_prepare() {
        let mut f = fixture();
        assert!(matches!(f.player.play(), Err(PlayerError::NotPrepared)));
        assert!(matches!(
            f.player.rebuild(&chart()),
            Err(PlayerError::NotPrepared)
        ));
        assert_eq!(f.player.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_dispatches_in_step_with_transport() {
        let mut f = fixture();
        f.player
            .prepare(&chart(), f.transport.clone())
            .expect("prepare");
        assert_eq!(f.player.state(), PlaybackState::Paused);

        f.transport.set_playing(true);
        f.player.play().expect("play");
        assert!(f.player.is_playing());

        f.transport.set_time(ms(500));
        thread::sleep(ms(30));
        assert!(f.tap.calls().is_empty());

        f.transport.set_time(ms(1500));
        let tap = f.tap.clone();
        eventually(|| tap.count(Call::Once) == 1, "Tap never played");
        thread::sleep(ms(30));
        assert_eq!(f.tap.count(Call::Once), 1);
    }

    #[test]
    fn test_paused_player_is_silent() {
        let mut f = fixture();
        f.player
            .prepare(&chart(), f.transport.clone())
            .expect("prepare");

        f.transport.set_playing(true);
        f.transport.set_time(ms(1500));
        thread::sleep(ms(50));
        assert!(f.tap.calls().is_empty());
    }

    #[test]
    fn test_transport_pause_stops_loops() {
        let mut f = fixture();
        f.player
            .prepare(&chart(), f.transport.clone())
            .expect("prepare");
        f.transport.set_time(ms(4500));
        f.transport.set_playing(true);
        f.player.play().expect("play");

        let beam = f.beam.clone();
        eventually(
            || beam.count(Call::Loop(LoopId::new(1), ms(500))) == 1,
            "Beam loop never started",
        );

        f.transport.set_playing(false);
        let beam = f.beam.clone();
        eventually(
            || beam.count(Call::Stop(LoopId::new(1))) == 1,
            "Beam loop never stopped",
        );
    }

    #[test]
    fn test_stop_stops_loops_and_joins() {
        let mut f = fixture();
        f.player
            .prepare(&chart(), f.transport.clone())
            .expect("prepare");
        f.transport.set_time(ms(5000));
        f.transport.set_playing(true);
        f.player.play().expect("play");

        let beam = f.beam.clone();
        eventually(|| !beam.calls().is_empty(), "Beam loop never started");

        f.player.stop();
        assert_eq!(f.player.state(), PlaybackState::Stopped);
        assert_eq!(f.beam.count(Call::Stop(LoopId::new(1))), 1);
        assert!(matches!(f.player.pause(), Err(PlayerError::NotPrepared)));
    }

    #[test]
    fn test_seek_replays_from_target() {
        let mut f = fixture();
        f.player
            .prepare(&chart(), f.transport.clone())
            .expect("prepare");
        f.transport.set_time(ms(3000));
        f.transport.set_playing(true);
        f.player.play().expect("play");

        let tap = f.tap.clone();
        eventually(|| tap.count(Call::Once) == 1, "Tap never played");

        f.transport.set_time(ms(500));
        f.player.seek(ms(500), false).expect("seek");
        assert!(f.player.is_playing());
        thread::sleep(ms(30));

        f.transport.set_time(ms(1500));
        let tap = f.tap.clone();
        eventually(|| tap.count(Call::Once) == 2, "Tap never replayed");
    }

    #[test]
    fn test_seek_within_active_loop_restarts_it() {
        let mut f = fixture();
        f.player
            .prepare(&chart(), f.transport.clone())
            .expect("prepare");
        f.transport.set_time(ms(5500));
        f.transport.set_playing(true);
        f.player.play().expect("play");

        let loop_id = LoopId::new(1);
        let beam = f.beam.clone();
        eventually(
            || beam.count(Call::Loop(loop_id, ms(1500))) == 1,
            "Beam loop never started",
        );

        f.transport.set_time(ms(4200));
        f.player.seek(ms(4200), false).expect("seek");
        let beam = f.beam.clone();
        eventually(
            || {
                beam.calls()
                    == vec![
                        Call::Loop(loop_id, ms(1500)),
                        Call::Stop(loop_id),
                        Call::Loop(loop_id, ms(200)),
                    ]
            },
            "Beam loop was not restarted at the seek target",
        );
    }

    #[test]
    fn test_default_idle_interval_matches_config() {
        assert_eq!(
            PollSettings::default().idle_interval,
            config::Scheduler::default()
                .idle_interval()
                .expect("idle interval")
        );
    }

    #[test]
    fn test_seek_and_stay_paused() {
        let mut f = fixture();
        f.player
            .prepare(&chart(), f.transport.clone())
            .expect("prepare");
        f.transport.set_playing(true);
        f.player.play().expect("play");

        f.player.seek(ms(0), true).expect("seek");
        assert_eq!(f.player.state(), PlaybackState::Paused);
        f.transport.set_time(ms(1500));
        thread::sleep(ms(50));
        assert!(f.tap.calls().is_empty());
    }

    #[test]
    fn test_rebuild_installs_new_events() {
        let mut f = fixture();
        let empty = Chart::new(TempoMap::new(120.0, TimeSignature::new(0, 4)));
        f.player
            .prepare(&empty, f.transport.clone())
            .expect("prepare");
        f.transport.set_playing(true);
        f.player.play().expect("play");
        f.transport.set_time(ms(500));
        thread::sleep(ms(30));

        f.player.rebuild(&chart()).expect("rebuild");
        thread::sleep(ms(50));
        f.transport.set_time(ms(1500));

        let tap = f.tap.clone();
        eventually(|| tap.count(Call::Once) == 1, "Tap from rebuilt chart never played");
    }

    #[test]
    fn test_prepare_restarts_loop_ids() {
        let mut f = fixture();
        for _ in 0..2 {
            f.player
                .prepare(&chart(), f.transport.clone())
                .expect("prepare");
            f.transport.set_time(ms(4200));
            f.transport.set_playing(true);
            f.player.play().expect("play");

            let beam = f.beam.clone();
            eventually(
                || beam.calls().iter().any(|call| matches!(call, Call::Loop(id, _) if *id == LoopId::new(1))),
                "Beam loop never started",
            );
            f.player.stop();
            f.beam.clear();
        }
    }

    #[test]
    fn test_drop_stops_loops() {
        let f = fixture();
        let Fixture {
            mut player,
            transport,
            beam,
            ..
        } = f;
        player.prepare(&chart(), transport.clone()).expect("prepare");
        transport.set_time(ms(4200));
        transport.set_playing(true);
        player.play().expect("play");

        let watched = beam.clone();
        eventually(|| !watched.calls().is_empty(), "Beam loop never started");

        drop(player);
        assert_eq!(beam.count(Call::Stop(LoopId::new(1))), 1);
    }
}
