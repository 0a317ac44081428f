//! # PIO programs for the pixel port
//!
//! The pixel state machine always runs at the full system clock, so each
//! program stretches its `out` instructions with delay cycles to make a
//! pixel last the right number of clocks.

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

use pio::{Assembler, OutDestination, Program, RP2040_MAX_PROGRAM_SIZE};

use crate::video::hw::TransferWidth;

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// The most delay cycles an instruction can carry, with no side-set.
const MAX_DELAY: u32 = 31;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Delay cycles needed to make an instruction (plus `others` cycles spent
/// elsewhere) last `clocks`.
fn delay_for(clocks: u32, others: u32) -> u8 {
	clocks.saturating_sub(others + 1).min(MAX_DELAY) as u8
}

/// A single-instruction loop: `out pins, 1`, stretched to one pixel.
pub fn serial(clocks_per_bit: u32) -> Program<RP2040_MAX_PROGRAM_SIZE> {
	let mut a = Assembler::<RP2040_MAX_PROGRAM_SIZE>::new();
	let mut wrap_target = a.label();
	let mut wrap_source = a.label();
	a.bind(&mut wrap_target);
	a.out_with_delay(OutDestination::PINS, 1, delay_for(clocks_per_bit, 0));
	a.bind(&mut wrap_source);
	a.assemble_with_wrap(wrap_source, wrap_target)
}

/// `pull noblock` then one `out pins, 8` per byte of each DMA element. An
/// empty FIFO gives us X, which holds the idle level.
pub fn parallel(clocks_per_sample: u32, width: TransferWidth) -> Program<RP2040_MAX_PROGRAM_SIZE> {
	let mut a = Assembler::<RP2040_MAX_PROGRAM_SIZE>::new();
	let mut wrap_target = a.label();
	let mut wrap_source = a.label();
	a.bind(&mut wrap_target);
	a.pull(false, false);
	let last = width.bytes() - 1;
	for byte in 0..=last {
		// The last byte also pays for the pull
		let others = if byte == last { 1 } else { 0 };
		a.out_with_delay(OutDestination::PINS, 8, delay_for(clocks_per_sample, others));
	}
	a.bind(&mut wrap_source);
	a.assemble_with_wrap(wrap_source, wrap_target)
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::video::composite::CLOCKS_PER_SAMPLE;

	const OUT_PINS: u16 = 0x6000;
	const PULL_NOBLOCK: u16 = 0x8080;

	/// Clocks for one pass of a program with no jumps.
	fn clocks(program: &Program<RP2040_MAX_PROGRAM_SIZE>) -> u32 {
		program
			.code
			.iter()
			.map(|word| 1 + u32::from((word >> 8) & 0x1F))
			.sum()
	}

	#[test]
	fn serial_runs_at_full_clock() {
		for h_scale in 1..=8 {
			let program = serial(h_scale);
			assert_eq!(program.code.len(), 1);
			assert_eq!(program.code[0], OUT_PINS | ((h_scale as u16 - 1) << 8) | 1);
			assert_eq!((program.wrap.source, program.wrap.target), (0, 0));
			assert_eq!(clocks(&program), h_scale);
		}
	}

	#[test]
	fn parallel_spends_the_same_clocks_on_every_sample() {
		let byte = parallel(3, TransferWidth::Byte);
		assert_eq!(byte.code.as_slice(), &[PULL_NOBLOCK, OUT_PINS | (1 << 8) | 8]);
		assert_eq!(clocks(&byte), 3);

		let pair = parallel(CLOCKS_PER_SAMPLE, TransferWidth::HalfWord);
		assert_eq!(pair.code.len(), 3);
		assert_eq!(pair.code[0], PULL_NOBLOCK);
		assert_eq!(pair.code[1] & 0xE0FF, OUT_PINS | 8);
		assert_eq!(clocks(&pair), 2 * CLOCKS_PER_SAMPLE);
		assert_eq!((pair.wrap.source, pair.wrap.target), (2, 0));
	}

	#[test]
	fn delay_is_clamped() {
		assert_eq!(clocks(&serial(100)), MAX_DELAY + 1);
		assert_eq!(clocks(&serial(0)), 1);
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
