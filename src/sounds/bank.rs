// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
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
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::clip::MixerSound;
use super::{SoundError, SoundLoader};
use crate::audio::Mixer;
use crate::config::Settings;
use crate::events::{LoopId, SoundCategory, SoundSet};

/// Plays a single sound. Implementations must be cheap to call from the scheduler thread.
pub trait SoundPlayer: Send + Sync {
    /// Plays the sound once from the beginning.
    fn play_once(&self);

    /// Starts a looping instance identified by `loop_id`, `offset` into the sound. Returns
    /// false if the loop could not be started.
    fn play_loop(&self, loop_id: LoopId, offset: Duration) -> bool;

    /// Stops the looping instance identified by `loop_id`, if it is playing.
    fn stop_loop(&self, loop_id: LoopId);

    fn volume(&self) -> f32;

    fn set_volume(&self, volume: f32);
}

/// The set of sounds available to the scheduler, one per category, plus the mask of
/// categories allowed to sound.
pub struct SoundBank {
    players: HashMap<SoundCategory, Arc<dyn SoundPlayer>>,
    enabled: AtomicU16,
}

impl Default for SoundBank {
    fn default() -> Self {
        SoundBank::new()
    }
}

impl SoundBank {
    /// Creates an empty bank with every category enabled.
    pub fn new() -> SoundBank {
        SoundBank {
            players: HashMap::new(),
            enabled: AtomicU16::new(SoundSet::ALL.bits()),
        }
    }

    /// Assigns a player to a category, replacing any previous one.
    pub fn insert(&mut self, category: SoundCategory, player: Arc<dyn SoundPlayer>) {
        self.players.insert(category, player);
    }

    /// Loads a sound file for a category. On failure the category is left without a sound.
    pub fn load(
        &mut self,
        category: SoundCategory,
        path: &Path,
        loader: &mut SoundLoader,
        mixer: &Arc<Mixer>,
    ) -> Result<(), SoundError> {
        match loader.load(path) {
            Ok(sound) => {
                self.insert(category, Arc::new(MixerSound::new(sound, mixer.clone())));
                Ok(())
            }
            Err(e) => {
                self.players.remove(&category);
                error!(%category, err = %e, "Unable to load sound");
                Err(e)
            }
        }
    }

    /// Loads every category's default file from `folder`. Categories whose file is missing or
    /// fails to load stay silent.
    pub fn load_folder(
        folder: &Path,
        loader: &mut SoundLoader,
        mixer: &Arc<Mixer>,
    ) -> (SoundBank, LoadReport) {
        let mut bank = SoundBank::new();
        let mut report = LoadReport::default();

        if !folder.is_dir() {
            warn!(folder = ?folder, "Sound folder does not exist, all sounds will be silent");
            report.missing.extend(SoundCategory::ALL);
            return (bank, report);
        }

        for category in SoundCategory::ALL {
            let path = folder.join(category.file_name());
            if !path.is_file() {
                debug!(%category, path = ?path, "No sound file for category");
                report.missing.push(category);
                continue;
            }

            match bank.load(category, &path, loader, mixer) {
                Ok(()) => report.loaded.push(category),
                Err(e) => report.failed.push((category, e)),
            }
        }

        info!(
            folder = ?folder,
            loaded = report.loaded.len(),
            missing = report.missing.len(),
            failed = report.failed.len(),
            "Sound bank loaded"
        );
        (bank, report)
    }

    /// Whether a category has a sound assigned.
    pub fn contains(&self, category: SoundCategory) -> bool {
        self.players.contains_key(&category)
    }

    fn player(&self, category: SoundCategory) -> Option<&Arc<dyn SoundPlayer>> {
        if !self.is_enabled(category) {
            return None;
        }
        self.players.get(&category)
    }

    /// Plays every member of `sounds` once, in dispatch order.
    pub fn dispatch(&self, sounds: SoundSet) {
        for category in sounds.iter() {
            self.play_once(category);
        }
    }

    /// Plays a category once if it is enabled and has a sound.
    pub fn play_once(&self, category: SoundCategory) {
        if let Some(player) = self.player(category) {
            player.play_once();
        }
    }

    /// Starts a looping instance. Returns whether the loop actually started, which it does not
    /// when the category is muted or has no sound.
    pub fn play_loop(&self, category: SoundCategory, loop_id: LoopId, offset: Duration) -> bool {
        self.player(category)
            .is_some_and(|player| player.play_loop(loop_id, offset))
    }

    /// Stops a looping instance. This ignores the mute mask so a loop never outlives its event.
    pub fn stop_loop(&self, category: SoundCategory, loop_id: LoopId) {
        if let Some(player) = self.players.get(&category) {
            player.stop_loop(loop_id);
        }
    }

    /// The categories currently allowed to sound.
    pub fn enabled(&self) -> SoundSet {
        SoundSet::from_bits(self.enabled.load(Ordering::Relaxed))
    }

    pub fn set_enabled(&self, enabled: SoundSet) {
        self.enabled.store(enabled.bits(), Ordering::Relaxed);
    }

    pub fn is_enabled(&self, category: SoundCategory) -> bool {
        self.enabled().contains(category)
    }

    /// Mutes or unmutes a single category.
    pub fn set_muted(&self, category: SoundCategory, muted: bool) {
        let bit = SoundSet::only(category).bits();
        if muted {
            self.enabled.fetch_and(!bit, Ordering::Relaxed);
        } else {
            self.enabled.fetch_or(bit, Ordering::Relaxed);
        }
    }

    /// The volume of a category, or zero if it has no sound.
    pub fn volume(&self, category: SoundCategory) -> f32 {
        self.players
            .get(&category)
            .map_or(0.0, |player| player.volume())
    }

    /// Sets the volume of a category. Does nothing if it has no sound.
    pub fn set_volume(&self, category: SoundCategory, volume: f32) {
        if let Some(player) = self.players.get(&category) {
            player.set_volume(volume);
        }
    }

    /// Named volume controls for every category, for volume panels.
    pub fn volume_controls(&self) -> impl Iterator<Item = VolumeControl<'_>> {
        SoundCategory::ALL
            .into_iter()
            .map(move |category| VolumeControl {
                bank: self,
                category,
            })
    }

    /// Applies configured mutes and volumes.
    pub fn apply_settings(&self, settings: &Settings) {
        let mut enabled = SoundSet::ALL;
        for category in settings.muted() {
            enabled.remove(*category);
        }
        self.set_enabled(enabled);

        for (category, volume) in settings.volumes() {
            if self.contains(*category) {
                self.set_volume(*category, *volume);
            } else {
                debug!(%category, volume, "Ignoring volume for category without a sound");
            }
        }
    }
}

impl fmt::Debug for SoundBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut loaded: Vec<SoundCategory> = self.players.keys().copied().collect();
        loaded.sort();
        f.debug_struct("SoundBank")
            .field("loaded", &loaded)
            .field("enabled", &self.enabled())
            .finish()
    }
}

/// A named handle to one category's volume.
pub struct VolumeControl<'a> {
    bank: &'a SoundBank,
    category: SoundCategory,
}

impl VolumeControl<'_> {
    pub fn category(&self) -> SoundCategory {
        self.category
    }

    pub fn name(&self) -> &'static str {
        self.category.name()
    }

    pub fn volume(&self) -> f32 {
        self.bank.volume(self.category)
    }

    pub fn set_volume(&self, volume: f32) {
        self.bank.set_volume(self.category, volume)
    }
}

/// What happened while loading a sound folder.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<SoundCategory>,
    pub missing: Vec<SoundCategory>,
    pub failed: Vec<(SoundCategory, SoundError)>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.failed.is_empty()
    }
}

/// Loads the configured sound folder off the async runtime and applies the configured mutes
/// and volumes. A missing folder yields an empty bank.
pub async fn load_bank(
    settings: Settings,
    mixer: Arc<Mixer>,
) -> Result<(SoundBank, LoadReport), SoundError> {
    let (bank, report) = tokio::task::spawn_blocking(move || {
        let mut loader = SoundLoader::new(mixer.sample_rate());
        let (bank, report) = match settings.sound_folder() {
            Some(folder) => SoundBank::load_folder(folder, &mut loader, &mixer),
            None => {
                warn!("No sound folder configured, all sounds will be silent");
                (SoundBank::new(), LoadReport::default())
            }
        };
        bank.apply_settings(&settings);
        (bank, report)
    })
    .await?;

    Ok((bank, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sounds::mock::{Call, RecordingPlayer};
    use crate::testutil::write_wav;

    fn bank_with(categories: &[SoundCategory]) -> (SoundBank, Vec<Arc<RecordingPlayer>>) {
        let mut bank = SoundBank::new();
        let players = categories
            .iter()
            .map(|category| {
                let player = Arc::new(RecordingPlayer::new());
                bank.insert(*category, player.clone());
                player
            })
            .collect();
        (bank, players)
    }

    #[test]
    fn test_dispatch_respects_mute_mask() {
        let (bank, players) = bank_with(&[SoundCategory::Tap, SoundCategory::Bell]);
        bank.set_muted(SoundCategory::Bell, true);

        bank.dispatch(SoundSet::only(SoundCategory::Tap) | SoundSet::only(SoundCategory::Bell));
        assert_eq!(players[0].calls(), vec![Call::Once]);
        assert!(players[1].calls().is_empty());

        bank.set_muted(SoundCategory::Bell, false);
        bank.play_once(SoundCategory::Bell);
        assert_eq!(players[1].calls(), vec![Call::Once]);
    }

    #[test]
    fn test_missing_category_is_silent() {
        let (bank, _) = bank_with(&[]);
        bank.play_once(SoundCategory::Tap);
        assert!(!bank.play_loop(SoundCategory::BeamLoop, LoopId::new(1), Duration::ZERO));
        assert_eq!(bank.volume(SoundCategory::Tap), 0.0);
    }

    #[test]
    fn test_loops_start_filtered_but_always_stop() {
        let (bank, players) = bank_with(&[SoundCategory::BeamLoop]);
        let id = LoopId::new(3);

        assert!(bank.play_loop(SoundCategory::BeamLoop, id, Duration::from_millis(5)));
        bank.set_muted(SoundCategory::BeamLoop, true);
        assert!(!bank.play_loop(SoundCategory::BeamLoop, LoopId::new(4), Duration::ZERO));
        bank.stop_loop(SoundCategory::BeamLoop, id);

        assert_eq!(
            players[0].calls(),
            vec![Call::Loop(id, Duration::from_millis(5)), Call::Stop(id)]
        );
    }

    #[test]
    fn test_volume_controls() {
        let (bank, _) = bank_with(&[SoundCategory::Tap]);
        let control = bank
            .volume_controls()
            .find(|control| control.name() == "tap")
            .expect("tap control");

        control.set_volume(0.3);
        assert_eq!(bank.volume(SoundCategory::Tap), 0.3);
        assert_eq!(bank.volume_controls().count(), SoundCategory::ALL.len());
    }

    #[test]
    fn test_apply_settings() {
        let settings = Settings::from_yaml_str(
            r#"
            muted: [bell, hold_tick]
            volumes:
              tap: 0.5
              flick: 0.2
            "#,
        )
        .expect("settings");

        let (bank, _) = bank_with(&[SoundCategory::Tap, SoundCategory::Bell]);
        bank.apply_settings(&settings);

        assert!(!bank.is_enabled(SoundCategory::Bell));
        assert!(!bank.is_enabled(SoundCategory::HoldTick));
        assert!(bank.is_enabled(SoundCategory::Tap));
        assert_eq!(bank.volume(SoundCategory::Tap), 0.5);
        assert_eq!(bank.volume(SoundCategory::Flick), 0.0);
    }

    #[test]
    fn test_load_folder() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_wav(&dir.path().join("tap.wav"), 1, 44100, &[0, 1000, 0]).expect("write");
        write_wav(&dir.path().join("beamlooping.wav"), 2, 22050, &[5; 16]).expect("write");
        std::fs::write(dir.path().join("bell.wav"), b"nope").expect("write");

        let mixer = Arc::new(Mixer::new(2, 44100));
        let mut loader = SoundLoader::new(44100);
        let (bank, report) = SoundBank::load_folder(dir.path(), &mut loader, &mixer);

        assert_eq!(
            report.loaded,
            vec![SoundCategory::Tap, SoundCategory::BeamLoop]
        );
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, SoundCategory::Bell);
        assert_eq!(report.missing.len(), SoundCategory::ALL.len() - 3);
        assert!(!report.is_complete());

        assert!(bank.contains(SoundCategory::Tap));
        assert!(!bank.contains(SoundCategory::Bell));

        bank.play_once(SoundCategory::Tap);
        assert!(bank.play_loop(SoundCategory::BeamLoop, LoopId::new(1), Duration::ZERO));
        assert_eq!(mixer.active_voices(), 2);
        bank.stop_loop(SoundCategory::BeamLoop, LoopId::new(1));
    }

    #[test]
    fn test_load_folder_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mixer = Arc::new(Mixer::new(2, 44100));
        let (bank, report) =
            SoundBank::load_folder(&dir.path().join("nowhere"), &mut SoundLoader::new(44100), &mixer);

        assert!(report.loaded.is_empty());
        assert_eq!(report.missing.len(), SoundCategory::ALL.len());
        assert!(!bank.contains(SoundCategory::Tap));
    }

    #[tokio::test]
    async fn test_load_bank() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_wav(&dir.path().join("clickse.wav"), 1, 44100, &[0, 1000, 0]).expect("write");

        let settings = Settings::from_yaml_str(&format!(
            "sound_folder: {}\nmuted: [click_se]\nvolumes:\n  click_se: 0.75\n",
            dir.path().display()
        ))
        .expect("settings");

        let mixer = Arc::new(Mixer::new(2, 44100));
        let (bank, report) = load_bank(settings, mixer).await.expect("load bank");
        assert_eq!(report.loaded, vec![SoundCategory::ClickSe]);
        assert!(!bank.is_enabled(SoundCategory::ClickSe));
        assert_eq!(bank.volume(SoundCategory::ClickSe), 0.75);
    }
}
