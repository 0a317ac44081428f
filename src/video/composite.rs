//! # Composite colour encoding
//!
//! NTSC and PAL are produced by streaming pairs of 8-bit DAC samples at
//! 14 MS/s (six system clocks each). Each visible pixel is one pair, so a
//! pixel's colour depends on where in the subcarrier cycle it lands. The
//! build script pre-computes, for every position in the cycle (a "row") and
//! every colour, the pair of samples to send, so encoding a line is nothing
//! more than a table lookup per pixel.
//!
//! The subcarrier does not divide the line evenly, so every line starts a
//! fixed number of rows further round the cycle than the one before. PAL
//! additionally flips the V axis on alternate lines, so it has a second set
//! of tables for odd lines.

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
// Sub-modules
// -----------------------------------------------------------------------------

#[allow(clippy::unreadable_literal)]
mod tables {
	include!(concat!(env!("OUT_DIR"), "/phase_tables.rs"));
}

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

use core::sync::atomic::{AtomicU8, Ordering};

use fugit::HertzU32;

use super::{modeline::TimingParameters, Mode};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// The composite standards we can generate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VideoStandard {
	/// 320 x 200, 262 lines at 60 Hz
	Ntsc,
	/// 320 x 240, 312 lines at 50 Hz
	Pal,
}

/// Everything fixed about one composite standard.
pub struct Standard {
	pub width: u16,
	pub height: u16,
	pub h_total: u32,
	pub h_sync_start: u32,
	pub h_sync_end: u32,
	pub v_total: u16,
	pub v_sync_start: u16,
	pub v_sync_end: u16,
	pub line_frequency: HertzU32,
	/// System clocks per line
	pub line_clocks: u32,
	/// Line timer position relative to the horizontal timer wrap
	pub line_start: u32,
	pub sync_width: u32,
	/// Rows in one repeat of the subcarrier pattern
	pub cycle: u8,
	/// Rows the pattern advances from one line to the next. A line's burst
	/// and picture are read at the same phase, so this only moves the dot
	/// pattern between lines and never shifts hue.
	pub phase_step: u8,
	/// Where in the burst template a line's burst starts, at phase zero
	pub burst_offset: usize,
	/// First active sample pair in a line
	pub active_start: usize,
	/// Row of the first active pixel, at phase zero
	pub active_offset: usize,
	/// Sample pairs sent by the DMA for each line
	pub samples_per_line: u32,
	chroma: [&'static [[u16; 256]]; 2],
	burst: [&'static [u16]; 2],
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// The encoder processes pixels in batches of this many, and only checks for
/// the end of the subcarrier cycle between batches.
pub const BATCH: usize = 8;

/// Sample pairs in each half of the line buffer.
pub const SLOT_LEN: usize = 512;

/// First sample pair of the colour burst.
pub const BURST_START: usize = 41;

/// Sample pairs in the colour burst.
pub const BURST_LEN: usize = 18;

/// Sample pairs at the start of a line that carry horizontal sync.
pub const LINE_SYNC_LEN: usize = 32;

/// Two samples of blanking level.
pub const BLANK_PAIR: u16 = 0x3C3C;

/// Two samples of sync tip.
pub const SYNC_PAIR: u16 = 0x0000;

/// All the composite timings assume this system clock.
pub const SYSTEM_CLOCK: HertzU32 = HertzU32::MHz(84);

/// System clocks per pixel (seven megapixels per second).
pub const CLOCKS_PER_PIXEL: u16 = 12;

/// System clocks per DAC sample.
pub const CLOCKS_PER_SAMPLE: u32 = 6;

pub static NTSC: Standard = Standard {
	width: 320,
	height: 200,
	h_total: 444,
	h_sync_start: 335,
	h_sync_end: 368,
	v_total: 262,
	v_sync_start: 230,
	v_sync_end: 236,
	line_frequency: HertzU32::Hz(15_778),
	line_clocks: 5328,
	line_start: 130,
	sync_width: 394,
	cycle: 88,
	phase_step: 8,
	burst_offset: 41,
	active_start: 88,
	active_offset: 0,
	samples_per_line: 442,
	chroma: [&tables::NTSC_CHROMA, &tables::NTSC_CHROMA],
	burst: [&tables::NTSC_BURST, &tables::NTSC_BURST],
};

pub static PAL: Standard = Standard {
	width: 320,
	height: 240,
	h_total: 448,
	h_sync_start: 335,
	h_sync_end: 368,
	v_total: 312,
	v_sync_start: 270,
	v_sync_end: 272,
	line_frequency: HertzU32::Hz(15_625),
	line_clocks: 5376,
	line_start: 126,
	sync_width: 394,
	cycle: 30,
	phase_step: 28,
	burst_offset: 11,
	active_start: 96,
	active_offset: 6,
	samples_per_line: 446,
	chroma: [&tables::PAL_CHROMA_EVEN, &tables::PAL_CHROMA_ODD],
	burst: [&tables::PAL_BURST_EVEN, &tables::PAL_BURST_ODD],
};

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Encode a line of `RRRGGGBB` pixels into composite sample pairs.
///
/// `table` must have at least `cycle + BATCH` rows, and `start_row` must be
/// less than `cycle`. Pixels go in fixed batches of [`BATCH`] and the row
/// only wraps between batches; any pixels beyond the last whole batch are
/// ignored.
#[inline(always)]
pub fn encode_line(
	pixels: &[AtomicU8],
	out: &mut [u16],
	table: &[[u16; 256]],
	cycle: usize,
	start_row: usize,
) {
	let mut row = start_row;
	for (batch, samples) in pixels.chunks_exact(BATCH).zip(out.chunks_exact_mut(BATCH)) {
		for (pixel, sample) in batch.iter().zip(samples.iter_mut()) {
			*sample = table[row][usize::from(pixel.load(Ordering::Relaxed))];
			row += 1;
		}
		if row >= cycle {
			row -= cycle;
		}
	}
}

impl VideoStandard {
	pub fn parameters(self) -> &'static Standard {
		match self {
			VideoStandard::Ntsc => &NTSC,
			VideoStandard::Pal => &PAL,
		}
	}

	pub fn mode(self) -> Mode {
		match self {
			VideoStandard::Ntsc => Mode::Ntsc,
			VideoStandard::Pal => Mode::Pal,
		}
	}
}

impl Standard {
	/// The fixed modeline for this standard.
	pub fn timing(&self) -> TimingParameters {
		let pixel_clock = SYSTEM_CLOCK.to_Hz() / u32::from(CLOCKS_PER_PIXEL);
		TimingParameters {
			width: self.width,
			height: self.height,
			pixel_clock: HertzU32::from_raw(pixel_clock),
			h_scale: CLOCKS_PER_PIXEL,
			v_scale: 1,
			h_total: self.h_total,
			h_sync_start: self.h_sync_start,
			h_sync_end: self.h_sync_end,
			v_total: self.v_total,
			v_sync_start: self.v_sync_start,
			v_sync_end: self.v_sync_end,
			line_clocks: self.line_clocks,
			line_start: self.line_start,
			sync_width: self.sync_width,
			line_frequency: self.line_frequency,
			frame_frequency: HertzU32::from_raw(self.line_frequency.to_Hz() / u32::from(self.v_total)),
		}
	}

	/// The chroma table for a line of the given parity.
	#[inline(always)]
	pub fn chroma(&self, parity: usize) -> &'static [[u16; 256]] {
		self.chroma[parity & 1]
	}

	/// The burst template for a line of the given parity.
	#[inline(always)]
	pub fn burst(&self, parity: usize) -> &'static [u16] {
		self.burst[parity & 1]
	}

	/// The phase of the line after one at `phase`.
	#[inline(always)]
	pub fn next_phase(&self, phase: u8) -> u8 {
		let next = phase + self.phase_step;
		if next >= self.cycle {
			next - self.cycle
		} else {
			next
		}
	}

	/// Number of lines before the phase pattern repeats.
	pub fn phase_period(&self) -> usize {
		let (mut a, mut b) = (usize::from(self.cycle), usize::from(self.phase_step));
		while b != 0 {
			(a, b) = (b, a % b);
		}
		usize::from(self.cycle) / a
	}

	/// Copy the colour burst for this line into `slot`.
	#[inline(always)]
	pub fn write_burst(&self, slot: &mut [u16; SLOT_LEN], parity: usize, phase: u8) {
		let start = usize::from(phase) + self.burst_offset;
		slot[BURST_START..BURST_START + BURST_LEN]
			.copy_from_slice(&self.burst(parity)[start..start + BURST_LEN]);
	}

	/// Encode a line of picture into `slot`.
	#[inline(always)]
	pub fn write_picture(&self, slot: &mut [u16; SLOT_LEN], parity: usize, phase: u8, pixels: &[AtomicU8]) {
		let cycle = usize::from(self.cycle);
		let mut row = usize::from(phase) + self.active_offset;
		if row >= cycle {
			row -= cycle;
		}
		let width = usize::from(self.width);
		encode_line(
			pixels,
			&mut slot[self.active_start..self.active_start + width],
			self.chroma(parity),
			cycle,
			row,
		);
	}

	/// Blank the picture area of `slot`, leaving sync and burst alone.
	pub fn write_blank_picture(&self, slot: &mut [u16; SLOT_LEN]) {
		slot[self.active_start..self.active_start + usize::from(self.width)].fill(BLANK_PAIR);
	}

	/// Turn `slot` into a vertical sync line: a short blank then a sync tip
	/// for the rest of the line.
	pub fn write_vsync_line(&self, slot: &mut [u16; SLOT_LEN]) {
		let end = self.samples_per_line as usize;
		slot[..LINE_SYNC_LEN].fill(BLANK_PAIR);
		slot[LINE_SYNC_LEN..end].fill(SYNC_PAIR);
	}

	/// Turn `slot` back into an ordinary blank line: a horizontal sync tip
	/// then blanking level.
	pub fn write_blank_line(&self, slot: &mut [u16; SLOT_LEN]) {
		let end = self.samples_per_line as usize;
		slot[..LINE_SYNC_LEN].fill(SYNC_PAIR);
		slot[LINE_SYNC_LEN..end].fill(BLANK_PAIR);
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	use crate::video::modeline::MonitorRange;

	fn standards() -> [&'static Standard; 2] {
		[&NTSC, &PAL]
	}

	#[test]
	fn tables_have_batch_padding() {
		for standard in standards() {
			let cycle = usize::from(standard.cycle);
			for parity in 0..2 {
				let table = standard.chroma(parity);
				assert_eq!(table.len(), cycle + BATCH);
				for row in 0..BATCH {
					assert_eq!(table[cycle + row], table[row]);
				}
			}
		}
	}

	#[test]
	fn black_and_white_have_no_chroma() {
		for standard in standards() {
			for parity in 0..2 {
				for row in standard.chroma(parity) {
					assert_eq!(row[0x00], BLANK_PAIR);
					assert_eq!(row[0xFF], 0xD2D2);
				}
			}
		}
	}

	#[test]
	fn burst_templates_cover_every_phase() {
		for standard in standards() {
			let needed = usize::from(standard.cycle) - 1 + standard.burst_offset + BURST_LEN;
			for parity in 0..2 {
				assert!(standard.burst(parity).len() >= needed);
			}
		}
	}

	#[test]
	fn pal_alternates_v() {
		// Pure red has a large V component, so odd and even lines differ
		let red = 0xE0;
		assert_ne!(PAL.chroma(0)[0][red], PAL.chroma(1)[0][red]);
		assert_eq!(NTSC.chroma(0)[0][red], NTSC.chroma(1)[0][red]);
	}

	#[test]
	fn encoder_matches_modular_lookup() {
		let pixels: Vec<AtomicU8> = (0..320u32).map(|i| AtomicU8::new((i * 37 % 256) as u8)).collect();
		for standard in standards() {
			let cycle = usize::from(standard.cycle);
			let table = standard.chroma(0);
			for start_row in 0..cycle {
				let mut out = [0u16; 320];
				encode_line(&pixels, &mut out, table, cycle, start_row);
				for (i, sample) in out.iter().enumerate() {
					let colour = usize::from(pixels[i].load(Ordering::Relaxed));
					assert_eq!(*sample, table[(start_row + i) % cycle][colour]);
				}
			}
		}
	}

	#[test]
	fn phase_is_periodic() {
		assert_eq!(NTSC.phase_period(), 11);
		assert_eq!(PAL.phase_period(), 15);
		for standard in standards() {
			let mut phase = 0;
			for line in 1..=standard.phase_period() {
				phase = standard.next_phase(phase);
				assert!(phase < standard.cycle);
				if line < standard.phase_period() {
					assert_ne!(phase, 0, "returned early at line {}", line);
				}
			}
			assert_eq!(phase, 0);
		}
	}

	#[test]
	fn fixed_timings() {
		let ntsc = VideoStandard::Ntsc.parameters().timing();
		assert_eq!((ntsc.width, ntsc.height), (320, 200));
		assert_eq!(ntsc.line_frequency, HertzU32::Hz(15_778));
		assert_eq!(ntsc.frame_frequency, HertzU32::Hz(60));
		assert!(MonitorRange::DEFAULT.frame_min < ntsc.frame_frequency);
		assert!(ntsc.frame_frequency < MonitorRange::DEFAULT.frame_max);
		assert_eq!(usize::from(NTSC.cycle), 88);

		let pal = VideoStandard::Pal.parameters().timing();
		assert_eq!((pal.width, pal.height), (320, 240));
		assert_eq!(pal.frame_frequency, HertzU32::Hz(50));
		assert_eq!(pal.pixel_clock, HertzU32::MHz(7));
		assert_eq!(usize::from(PAL.cycle), 30);
	}

	#[test]
	fn burst_and_picture_share_a_phase_reference() {
		// The burst and the first pixel must be the same number of rows
		// apart as they are sample pairs apart, or hue would shift.
		for standard in standards() {
			let cycle = standard.cycle as usize;
			let burst_row = (BURST_START + cycle - standard.burst_offset % cycle) % cycle;
			let picture_row = (standard.active_start + cycle - standard.active_offset) % cycle;
			assert_eq!(burst_row, picture_row);
		}
	}

	#[test]
	fn every_line_phase_keeps_burst_and_picture_aligned() {
		let colour = 0xE3;
		for standard in standards() {
			let cycle = usize::from(standard.cycle);
			let width = usize::from(standard.width);
			let pixels: Vec<AtomicU8> = (0..width).map(|_| AtomicU8::new(colour)).collect();
			for parity in 0..2 {
				let mut phase = 0;
				for _ in 0..standard.phase_period() {
					let mut slot = [BLANK_PAIR; SLOT_LEN];
					standard.write_burst(&mut slot, parity, phase);
					standard.write_picture(&mut slot, parity, phase, &pixels);
					let burst_row = usize::from(phase) + standard.burst_offset;
					let picture_row = (usize::from(phase) + standard.active_offset) % cycle;
					assert_eq!(slot[BURST_START], standard.burst(parity)[burst_row]);
					assert_eq!(
						slot[standard.active_start],
						standard.chroma(parity)[picture_row][usize::from(colour)]
					);
					// Both move with the line phase, so their distance is fixed
					assert_eq!(
						(burst_row + cycle - picture_row) % cycle,
						(standard.burst_offset + cycle - standard.active_offset % cycle) % cycle
					);
					phase = standard.next_phase(phase);
				}
			}
		}
	}

	#[test]
	fn sync_lines() {
		let mut slot = [0xFFFF; SLOT_LEN];
		PAL.write_vsync_line(&mut slot);
		assert!(slot[..LINE_SYNC_LEN].iter().all(|s| *s == BLANK_PAIR));
		assert!(slot[LINE_SYNC_LEN..446].iter().all(|s| *s == SYNC_PAIR));
		assert_eq!(slot[446], 0xFFFF);
		PAL.write_blank_line(&mut slot);
		assert!(slot[..LINE_SYNC_LEN].iter().all(|s| *s == SYNC_PAIR));
		assert!(slot[LINE_SYNC_LEN..446].iter().all(|s| *s == BLANK_PAIR));
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
