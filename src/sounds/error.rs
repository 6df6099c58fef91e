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
use std::path::PathBuf;

/// Error types for loading sound resources
#[derive(Debug, thiserror::Error)]
pub enum SoundError {
    #[error("Unable to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unable to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        source: symphonia::core::errors::Error,
    },

    #[error("No audio track found in {}", .0.display())]
    NoAudioTrack(PathBuf),

    #[error("Sample rate not specified in {}", .0.display())]
    UnknownSampleRate(PathBuf),

    #[error("Sound loading task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
