//! # Scan-line interrupt handlers
//!
//! The three handlers that run the picture once a mode is armed. The board
//! support code calls them from its interrupt vectors; nothing here blocks,
//! allocates or logs.

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

use core::sync::atomic::Ordering;

use super::composite::Standard;
use super::hw::{PinRoute, PixelSink};
use super::{Engine, FrameBuffer, Hardware, Mode, Playout};

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl<'a, H: Hardware> Engine<'a, H> {
	/// Call this from the line timer interrupt.
	///
	/// Starts the DMA for the line that is about to be drawn, drives V-Sync,
	/// and gets the next line ready.
	#[inline(always)]
	pub fn on_line_timer(&self) {
		self.hw.acknowledge_line_timer();
		let Some(playout) = self.playout() else {
			return;
		};

		if !self.raster.synced.load(Ordering::Relaxed) {
			self.lock_horizontal(playout);
		}

		match playout.standard {
			Some(standard) => self.composite_line(playout, standard),
			None => self.raster_line(playout),
		}
	}

	/// Call this from the horizontal timer interrupt.
	///
	/// Rewinds the DMA if the line just sent has to be sent again, then sleeps
	/// until the next interrupt so the line timer always wakes the core from
	/// the same state.
	#[inline(always)]
	pub fn on_horizontal_compare(&self) {
		self.hw.acknowledge_horizontal();
		if let Some(playout) = self.playout() {
			if self.raster.display_armed.load(Ordering::Relaxed)
				&& self.raster.line_double.load(Ordering::Relaxed) != 0
			{
				let line_bytes = playout.frame.line_bytes();
				self.hw.set_source(self.hw.source().wrapping_sub(line_bytes));
			}
		}
		self.hw.wait_for_event();
	}

	/// Call this from the DMA complete interrupt (mono only).
	///
	/// Takes the pixel pin back from the serialiser, so it sits at black
	/// until the next line. The DMA finishes while the last few words are
	/// still queued in the serialiser, so wait for those to go out first.
	#[inline(always)]
	pub fn on_dma_complete(&self) {
		self.hw.acknowledge_transfer();
		while !self.hw.serial_drained() {
			core::hint::spin_loop();
		}
		self.hw.route_pixel_pins(PixelSink::Serial, PinRoute::Gpio);
	}

	/// The horizontal timer starts one tick slower than the line timer, so
	/// it slides backwards one tick per line. When it reaches the place the
	/// line timer should fire at, give it the right period.
	#[inline(always)]
	fn lock_horizontal(&self, playout: &Playout) {
		let count = self.hw.horizontal_count();
		let target = playout.timing.line_start;
		if count == target || count == target + 1 {
			self.hw.set_horizontal_period(playout.timing.line_clocks);
			self.raster.synced.store(true, Ordering::Relaxed);
		}
	}

	/// One line of VGA.
	#[inline(always)]
	fn raster_line(&self, playout: &Playout) {
		let raster = &self.raster;
		let timing = &playout.timing;

		if raster.display_armed.load(Ordering::Relaxed) {
			self.hw.start_transfer(playout.transfers_per_line);
			if playout.mode == Mode::Mono {
				self.hw.route_pixel_pins(PixelSink::Serial, PinRoute::Port);
			}
		}

		let line = raster.line.load(Ordering::Relaxed);
		if line == timing.v_sync_start {
			self.hw.set_vsync(playout.v_polarity.enabled());
		} else if line == timing.v_sync_end {
			self.hw.set_vsync(playout.v_polarity.disabled());
		}

		// Every logical line goes out `v_scale` times
		let double = raster.line_double.load(Ordering::Relaxed) + 1;
		if double < timing.v_scale {
			raster.line_double.store(double, Ordering::Relaxed);
			return;
		}
		raster.line_double.store(0, Ordering::Relaxed);

		let next = line + 1;
		if next == timing.height {
			raster.display_armed.store(false, Ordering::Relaxed);
			raster.line.store(next, Ordering::Relaxed);
		} else if next >= timing.v_total {
			self.hw.set_source(playout.frame.base_address());
			raster.line.store(0, Ordering::Relaxed);
			raster.display_armed.store(true, Ordering::Relaxed);
			let frames = raster.frame_count.load(Ordering::Relaxed);
			raster.frame_count.store(frames.wrapping_add(1), Ordering::Relaxed);
		} else {
			raster.line.store(next, Ordering::Relaxed);
		}
	}

	/// One line of composite video.
	///
	/// Sends the slot filled last time, then fills the other slot with the
	/// line after it.
	#[inline(always)]
	fn composite_line(&self, playout: &Playout, standard: &Standard) {
		let raster = &self.raster;
		let timing = &playout.timing;

		let ready = raster.ready_slot.load(Ordering::Relaxed);
		self.hw.set_source(self.slot_address(ready));
		self.hw.start_transfer(playout.transfers_per_line);

		let slot_index = ready ^ 1;
		// Note (unsafe): only this handler touches the line buffer while a
		// mode runs, and the DMA is reading the other slot.
		let slot = unsafe { &mut (*self.line_buffer.get()).slots[usize::from(slot_index)] };

		let line = raster.line.load(Ordering::Relaxed);
		let phase = raster.phase.load(Ordering::Relaxed);
		let parity = usize::from(line & 1);
		let in_vsync = line >= timing.v_sync_start && line < timing.v_sync_end;

		// The band edges are two lines deep so both slots get rewritten
		if line < timing.height {
			if let FrameBuffer::Colour(ref pixels) = playout.frame {
				standard.write_picture(slot, parity, phase, pixels.line(line));
			}
		} else if line - timing.height < 2 {
			standard.write_blank_picture(slot);
		} else if line == timing.v_sync_start || line == timing.v_sync_start + 1 {
			standard.write_vsync_line(slot);
		} else if line == timing.v_sync_end || line == timing.v_sync_end + 1 {
			standard.write_blank_line(slot);
		}
		if !in_vsync {
			standard.write_burst(slot, parity, phase);
		}

		raster.phase.store(standard.next_phase(phase), Ordering::Relaxed);
		let next = line + 1;
		if next >= timing.v_total {
			raster.line.store(0, Ordering::Relaxed);
			let frames = raster.frame_count.load(Ordering::Relaxed);
			raster.frame_count.store(frames.wrapping_add(1), Ordering::Relaxed);
		} else {
			raster.line.store(next, Ordering::Relaxed);
		}
		raster.ready_slot.store(slot_index, Ordering::Relaxed);
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
