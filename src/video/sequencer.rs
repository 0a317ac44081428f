//! # Peripheral set-up and tear-down
//!
//! Everything here runs with interrupts disabled, before the scan-line
//! handlers start or after they have stopped.

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

use super::composite::{BLANK_PAIR, CLOCKS_PER_SAMPLE};
use super::hw::{Irq, PinRoute, PixelSink, Priority, TransferWidth};
use super::{Hardware, Mode, Playout};

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Program every peripheral for `playout`, leaving the video interrupts
/// masked. The DMA will read from `source` first.
pub(super) fn arm<H: Hardware>(hw: &H, playout: &Playout, source: usize) {
	let timing = &playout.timing;

	// Everything else waits for the line timer
	hw.set_background_priority(Priority::Lowest);
	hw.set_priority(Irq::LineTimer, Priority::Highest);
	hw.set_priority(Irq::HorizontalCompare, Priority::High);
	hw.set_priority(Irq::DmaComplete, Priority::Medium);
	hw.set_bus_priority(true);

	hw.configure_sync_pins(playout.v_polarity.disabled());
	// One tick long, so it can slide into phase with the line timer
	hw.start_horizontal(timing.line_clocks + 1, timing.sync_width, playout.h_polarity);
	hw.start_line_timer(timing.line_clocks);

	match playout.mode {
		Mode::Mono => {
			hw.configure_transfer(TransferWidth::HalfWord, PixelSink::Serial, true);
			hw.set_source(source);
			hw.route_pixel_pins(PixelSink::Serial, PinRoute::Gpio);
			hw.start_serial_port(u32::from(timing.h_scale));
		}
		Mode::Colour => {
			hw.configure_transfer(TransferWidth::Byte, PixelSink::Parallel, false);
			hw.set_source(source);
			hw.route_pixel_pins(PixelSink::Parallel, PinRoute::Port);
			hw.start_parallel_port(u32::from(timing.h_scale), TransferWidth::Byte, 0);
		}
		Mode::Ntsc | Mode::Pal => {
			hw.configure_transfer(TransferWidth::HalfWord, PixelSink::Parallel, false);
			hw.set_source(source);
			hw.route_pixel_pins(PixelSink::Parallel, PinRoute::Port);
			// Run dry at blanking level, not at the sync tip
			hw.start_parallel_port(CLOCKS_PER_SAMPLE, TransferWidth::HalfWord, BLANK_PAIR as u8);
		}
		Mode::Off => {}
	}
	debug!(
		"Armed: line {} clocks, start {}, sync {}",
		timing.line_clocks,
		timing.line_start,
		timing.sync_width
	);
}

/// Unmask the interrupts `mode` runs on.
pub(super) fn enable_interrupts<H: Hardware>(hw: &H, mode: Mode) {
	if mode == Mode::Mono {
		hw.enable_irq(Irq::DmaComplete);
	}
	hw.enable_irq(Irq::HorizontalCompare);
	hw.enable_irq(Irq::LineTimer);
}

/// Stop everything and put the pins back to inputs.
pub(super) fn disarm<H: Hardware>(hw: &H) {
	hw.disable_irq(Irq::LineTimer);
	hw.disable_irq(Irq::HorizontalCompare);
	hw.disable_irq(Irq::DmaComplete);
	hw.stop_transfers();
	hw.stop_port();
	hw.stop_timers();
	hw.release_pins();
	hw.set_bus_priority(false);
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
