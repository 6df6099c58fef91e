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

//! The sound effect core of a rhythm game chart editor.
//!
//! A [`chart::Chart`] is materialized into sound events, which a [`FumenSoundPlayer`] fires
//! from a dedicated thread in step with an external [`transport::Transport`], through a
//! [`sounds::SoundBank`] of decoded sound effects.

pub mod audio;
pub mod chart;
pub mod config;
pub mod events;
pub mod player;
pub mod playsync;
pub mod scheduler;
pub mod sounds;
pub mod transport;

#[cfg(test)]
mod testutil;

pub use player::{FumenSoundPlayer, PlaybackState, PlayerError};
