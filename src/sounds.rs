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

//! Sound effects.
//!
//! This module provides:
//! - Decoding and caching of sound files
//! - A bank mapping each sound category to a player, with a mute mask and volumes
//! - A mixer-backed player supporting overlapping one-shots and loops keyed by loop id

mod bank;
mod clip;
mod error;
mod loader;
#[cfg(test)]
pub(crate) mod mock;

pub use bank::{load_bank, LoadReport, SoundBank, SoundPlayer, VolumeControl};
pub use clip::MixerSound;
pub use error::SoundError;
pub use loader::{LoadedSound, SoundLoader};
