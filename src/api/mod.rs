//! # Status-code API for the video engine
//!
//! Thin wrappers that turn the engine's `Result`s into the classic integer
//! status codes, for callers that want those.

// -----------------------------------------------------------------------------
// Licence Statement
// -----------------------------------------------------------------------------
// Copyright (c) Jonathan 'theJPster' Pallant and the Neotron Developers, 2021
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.
// -----------------------------------------------------------------------------

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

use crate::video::{Engine, Error, Hardware, Mode, VideoStandard};

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// The version string
pub static VERSION: &str = concat!(
	"Neotron Pico Video, version ",
	env!("CARGO_PKG_VERSION"),
	"\0"
);

/// The mode is running.
pub const STATUS_OK: i32 = 0;
/// No modeline fits the monitor's frequency range.
pub const STATUS_NO_TIMING: i32 = -1;
/// The frame buffer didn't fit in video memory.
pub const STATUS_NO_MEMORY: i32 = -2;
/// Colour modes can't be that tall.
pub const STATUS_TOO_TALL: i32 = -3;
/// That mode (or geometry, or clock) isn't supported.
pub const STATUS_UNSUPPORTED: i32 = -4;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Convert a result into a status code.
pub fn status_of(result: Result<(), Error>) -> i32 {
	match result {
		Ok(()) => STATUS_OK,
		Err(e) => e.status(),
	}
}

/// Start a VGA mode. See [`Engine::begin`].
pub fn begin<H: Hardware>(engine: &Engine<H>, width: u16, height: u16, mode: Mode) -> i32 {
	status_of(engine.begin(width, height, mode))
}

/// Start a composite mode. See [`Engine::begin_composite`].
pub fn begin_composite<H: Hardware>(engine: &Engine<H>, standard: VideoStandard) -> i32 {
	status_of(engine.begin_composite(standard))
}

/// Start NTSC: 320 x 200 at 60 Hz.
pub fn begin_ntsc<H: Hardware>(engine: &Engine<H>) -> i32 {
	begin_composite(engine, VideoStandard::Ntsc)
}

/// Start PAL: 320 x 240 at 50 Hz.
pub fn begin_pal<H: Hardware>(engine: &Engine<H>) -> i32 {
	begin_composite(engine, VideoStandard::Pal)
}

/// Stop video output.
pub fn end<H: Hardware>(engine: &Engine<H>) {
	engine.end()
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
