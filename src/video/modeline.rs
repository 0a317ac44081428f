//! # Modeline solver
//!
//! Works out a complete set of horizontal and vertical timings for an
//! arbitrary resolution, given nothing but the system clock and the range of
//! line and frame rates the monitor will tolerate.
//!
//! The pixel clock is always an integer division of the system clock, so we
//! search the divider (the horizontal scale) from large to small. For each
//! one we try adding a few extra blank lines (the vertical slack) and
//! repeating each line a few times (the vertical scale), and take the first
//! combination that lands strictly inside the monitor's window.

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

use fugit::HertzU32;

use super::{Error, Unsupported};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// The line and frame rates a monitor will lock to. Both limits are
/// exclusive.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MonitorRange {
	pub line_min: HertzU32,
	pub line_max: HertzU32,
	pub frame_min: HertzU32,
	pub frame_max: HertzU32,
}

/// A complete modeline.
///
/// Horizontal values are in pixels, vertical values in (unscaled) lines, and
/// the `line_*` and `sync_width` values are in system clock ticks.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimingParameters {
	/// Visible pixels per line
	pub width: u16,
	/// Visible lines per frame, before vertical scaling
	pub height: u16,
	/// System clock divided by `h_scale`
	pub pixel_clock: HertzU32,
	/// System clock ticks per pixel
	pub h_scale: u16,
	/// Number of times each line is sent
	pub v_scale: u16,
	pub h_total: u32,
	pub h_sync_start: u32,
	pub h_sync_end: u32,
	pub v_total: u16,
	pub v_sync_start: u16,
	pub v_sync_end: u16,
	/// Length of one scan-line, always even
	pub line_clocks: u32,
	/// Where the line timer sits relative to the horizontal timer wrap
	pub line_start: u32,
	/// Width of the H-Sync pulse
	pub sync_width: u32,
	pub line_frequency: HertzU32,
	pub frame_frequency: HertzU32,
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// The largest system-clock divider we will try for the pixel clock.
pub const MAX_H_SCALE: u16 = 16;

/// Colour pixels go out through the parallel port, which needs at least this
/// many system clocks per pixel.
pub const MIN_COLOUR_H_SCALE: u16 = 6;

/// Largest supported width or height.
pub const MAX_DIMENSION: u16 = 2048;

/// Extra blank lines we are prepared to add to hit the frame rate.
const MAX_V_SLACK: u16 = 50;

const MAX_V_SCALE: u16 = 8;

/// Ticks between the line timer firing and the first pixel leaving, taken up
/// by interrupt entry and reloading the DMA.
const LINE_TIMER_LEAD: u32 = 78;

/// The line timer can never be closer than this to the horizontal wrap.
const MIN_LINE_START: u32 = 132;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Find a modeline for `width` x `height` that `monitor` will accept.
///
/// Larger horizontal scales are preferred, then less vertical slack, then
/// smaller vertical scales. Colour modes need a horizontal scale of at least
/// [`MIN_COLOUR_H_SCALE`]; if the best modeline found is finer than that, the
/// request fails rather than falling back to a coarser one that the monitor
/// wouldn't accept.
pub fn solve(
	width: u16,
	height: u16,
	colour: bool,
	monitor: &MonitorRange,
	system_clock: HertzU32,
) -> Result<TimingParameters, Error> {
	if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
		return Err(Error::UnsupportedConfiguration(Unsupported::Geometry));
	}

	let timing = (2..=MAX_H_SCALE)
		.rev()
		.find_map(|h_scale| {
			(0..MAX_V_SLACK).find_map(|slack| {
				(1..=MAX_V_SCALE).find_map(|v_scale| {
					candidate(width, height, h_scale, slack, v_scale, system_clock)
						.filter(|t| monitor.accepts(t.line_frequency, t.frame_frequency))
				})
			})
		})
		.ok_or(Error::TimingUnsatisfiable)?;

	if timing.h_scale == 1 || (colour && timing.h_scale < MIN_COLOUR_H_SCALE) {
		return Err(Error::TimingUnsatisfiable);
	}

	Ok(timing)
}

/// Builds one point in the search space.
///
/// Returns `None` if the sync positions don't fit inside the totals.
fn candidate(
	width: u16,
	height: u16,
	h_scale: u16,
	slack: u16,
	v_scale: u16,
	system_clock: HertzU32,
) -> Option<TimingParameters> {
	let w = u32::from(width);
	let h = u32::from(height);
	let scale = u32::from(h_scale);

	// Horizontal total is 5/4 of the width, rounded down to even
	let h_total = (w * 5 / 4) & !1;
	let h_sync_start = (10 * w + 2 * h_total) / 12;
	let h_sync_end = (5 * w + 7 * h_total) / 12;

	let v_total = h * 25 / 24 + u32::from(slack);
	let mut v_sync_start = (10 * h + 2 * v_total) / 12 + 1;
	let mut v_sync_end = (8 * h + 4 * v_total) / 12 + 1;
	if v_sync_start <= h {
		v_sync_start = h + 1;
	}
	if v_sync_end <= v_sync_start {
		v_sync_end = v_sync_start + 1;
	}

	if !(h_sync_start < h_sync_end && h_sync_end < h_total) {
		return None;
	}
	if !(v_sync_start < v_sync_end && v_sync_end < v_total) {
		return None;
	}

	let pixel_clock = system_clock.to_Hz() / scale;
	let line_frequency = pixel_clock / h_total;
	let frame_frequency = line_frequency / (v_total * u32::from(v_scale));

	let line_clocks = (h_total * scale) & !1;
	let line_start = ((h_total - h_sync_end) * scale)
		.saturating_sub(LINE_TIMER_LEAD)
		.max(MIN_LINE_START);

	Some(TimingParameters {
		width,
		height,
		pixel_clock: HertzU32::from_raw(pixel_clock),
		h_scale,
		v_scale,
		h_total,
		h_sync_start,
		h_sync_end,
		// All three are bounded by 25/24 * MAX_DIMENSION + MAX_V_SLACK + 2
		v_total: v_total as u16,
		v_sync_start: v_sync_start as u16,
		v_sync_end: v_sync_end as u16,
		line_clocks,
		line_start,
		sync_width: (h_sync_end - h_sync_start) * scale,
		line_frequency: HertzU32::from_raw(line_frequency),
		frame_frequency: HertzU32::from_raw(frame_frequency),
	})
}

impl MonitorRange {
	/// 27 - 83 kHz and 57 - 70 Hz, which suits most multi-sync monitors.
	pub const DEFAULT: MonitorRange = MonitorRange::new(
		HertzU32::kHz(27),
		HertzU32::kHz(83),
		HertzU32::Hz(57),
		HertzU32::Hz(70),
	);

	pub const fn new(
		line_min: HertzU32,
		line_max: HertzU32,
		frame_min: HertzU32,
		frame_max: HertzU32,
	) -> MonitorRange {
		MonitorRange {
			line_min,
			line_max,
			frame_min,
			frame_max,
		}
	}

	/// Will the monitor lock to these rates?
	pub fn accepts(&self, line: HertzU32, frame: HertzU32) -> bool {
		line > self.line_min && line < self.line_max && frame > self.frame_min && frame < self.frame_max
	}
}

impl Default for MonitorRange {
	fn default() -> MonitorRange {
		MonitorRange::DEFAULT
	}
}

impl TimingParameters {
	/// Physical scan-lines of active picture.
	pub fn visible_scanlines(&self) -> u32 {
		u32::from(self.height) * u32::from(self.v_scale)
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
