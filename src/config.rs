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
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use tracing::debug;

use crate::events::SoundCategory;

mod audio;
mod error;
mod scheduler;

pub use self::audio::Audio;
pub use self::error::ConfigError;
pub use self::scheduler::{Scheduler, DEFAULT_IDLE_INTERVAL};

/// Prefix of environment variables overriding file settings, e.g.
/// `FUMEN_SOUND__SCHEDULER__IDLE_INTERVAL=10ms`.
const ENV_PREFIX: &str = "FUMEN_SOUND";
const ENV_SEPARATOR: &str = "__";

/// The sound core's settings.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Settings {
    /// Folder holding one file per sound category.
    sound_folder: Option<PathBuf>,

    /// Categories that start muted.
    #[serde(default)]
    muted: Vec<SoundCategory>,

    /// Initial per-category volumes.
    #[serde(default)]
    volumes: HashMap<SoundCategory, f32>,

    #[serde(default)]
    audio: Audio,

    #[serde(default)]
    scheduler: Scheduler,
}

impl Settings {
    /// Loads settings from a YAML file, with environment overrides. A relative sound folder is
    /// resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Settings, ConfigError> {
        let mut settings = Settings::build(File::from(path).format(FileFormat::Yaml))?;
        if let (Some(folder), Some(base)) = (settings.sound_folder.as_mut(), path.parent()) {
            if folder.is_relative() {
                *folder = base.join(&*folder);
            }
        }

        debug!(path = ?path, settings = ?settings, "Loaded settings");
        Ok(settings)
    }

    /// Parses settings from a YAML string, with environment overrides.
    pub fn from_yaml_str(yaml: &str) -> Result<Settings, ConfigError> {
        Settings::build(File::from_str(yaml, FileFormat::Yaml))
    }

    fn build<S>(source: S) -> Result<Settings, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        Ok(Config::builder()
            .add_source(source)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?)
    }

    pub fn sound_folder(&self) -> Option<&Path> {
        self.sound_folder.as_deref()
    }

    /// Returns the sound folder if it is configured and exists.
    pub fn existing_sound_folder(&self) -> Result<&Path, ConfigError> {
        let folder = self.sound_folder().ok_or(ConfigError::NoSoundFolder)?;
        if !folder.is_dir() {
            return Err(ConfigError::MissingSoundFolder(folder.to_path_buf()));
        }
        Ok(folder)
    }

    pub fn muted(&self) -> &[SoundCategory] {
        &self.muted
    }

    pub fn volumes(&self) -> &HashMap<SoundCategory, f32> {
        &self.volumes
    }

    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}
