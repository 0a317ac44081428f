//! Build script for the Neotron Pico video driver.
//!
//! * Puts `memory.x` somewhere the linker can find it, for the firmware image.
//! * Generates the composite colour lookup tables, so the scan-line interrupt
//!   never has to do any trigonometry.

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

use std::{env, f64::consts::PI, fmt::Write as _, fs, path::PathBuf};

/// Extra rows on the end of every chroma table, so the encoder can run a whole
/// batch of pixels past the end of the subcarrier cycle before it wraps.
const BATCH: usize = 8;

/// Number of burst entries copied into every composite line.
const BURST_LEN: usize = 18;

/// DAC code for the blanking level. Sync tip is zero.
const BLANK_LEVEL: f64 = 60.0;

/// DAC codes between blanking level and peak white.
const WHITE_SPAN: f64 = 150.0;

/// Peak amplitude of the colour burst, in DAC codes.
const BURST_AMPLITUDE: f64 = 30.0;

/// Describes how one colour standard relates pixels to its subcarrier.
struct Standard {
	prefix: &'static str,
	/// Pixels (sample pairs) in one repeat of the phase pattern
	cycle: usize,
	/// Subcarrier periods in one repeat of the phase pattern
	subcarrier_periods: usize,
	/// Offset into the burst template the line encoder starts from
	burst_offset: usize,
	/// Does the V component flip sign on alternate lines?
	alternate: bool,
}

/// 3.579545 MHz against 14 MS/s: 45 periods every 88 pixels.
/// The 444-pixel line leaves the pattern 4 rows on, but a line's burst is read
/// from the same row as its picture, so the runtime line step is free to differ.
const NTSC: Standard = Standard {
	prefix: "NTSC",
	cycle: 88,
	subcarrier_periods: 45,
	burst_offset: 41,
	alternate: false,
};

/// 4.43361875 MHz against 14 MS/s: 19 periods every 30 pixels.
const PAL: Standard = Standard {
	prefix: "PAL",
	cycle: 30,
	subcarrier_periods: 19,
	burst_offset: 11,
	alternate: true,
};

fn main() {
	let out = PathBuf::from(env::var_os("OUT_DIR").expect("OUT_DIR not set"));

	// Put the linker script somewhere the linker can find it
	fs::write(out.join("memory.x"), include_bytes!("memory.x")).expect("writing memory.x");
	println!("cargo:rustc-link-search={}", out.display());
	println!("cargo:rerun-if-changed=memory.x");

	let mut tables = String::new();
	writeln!(tables, "// Generated by build.rs - do not edit.").unwrap();
	emit_standard(&mut tables, &NTSC);
	emit_standard(&mut tables, &PAL);
	fs::write(out.join("phase_tables.rs"), tables).expect("writing phase_tables.rs");

	println!("cargo:rerun-if-changed=build.rs");
}

/// Writes the chroma and burst tables for one standard.
///
/// Alternating standards get an `_EVEN` and an `_ODD` pair, with the V axis
/// flipped on the odd one.
fn emit_standard(out: &mut String, standard: &Standard) {
	let parities: &[(&str, f64)] = if standard.alternate {
		&[("_EVEN", 1.0), ("_ODD", -1.0)]
	} else {
		&[("", 1.0)]
	};
	for (suffix, v_sign) in parities {
		emit_chroma(out, standard, suffix, *v_sign);
		emit_burst(out, standard, suffix, *v_sign);
	}
}

fn emit_chroma(out: &mut String, standard: &Standard, suffix: &str, v_sign: f64) {
	let rows = standard.cycle + BATCH;
	writeln!(
		out,
		"pub static {}_CHROMA{}: [[u16; 256]; {}] = [",
		standard.prefix, suffix, rows
	)
	.unwrap();
	for row in 0..rows {
		let row = row % standard.cycle;
		out.push_str("\t[");
		for colour in 0..=255u8 {
			let (y, u, v) = yuv(colour);
			let sample = |n: usize| {
				let angle = subcarrier_angle(standard, n);
				level(y + u * angle.sin() + v_sign * v * angle.cos())
			};
			let pair = u16::from(sample(2 * row)) | u16::from(sample(2 * row + 1)) << 8;
			write!(out, "0x{:04x},", pair).unwrap();
		}
		out.push_str("],\n");
	}
	out.push_str("];\n");
}

fn emit_burst(out: &mut String, standard: &Standard, suffix: &str, v_sign: f64) {
	let len = standard.cycle + standard.burst_offset + BURST_LEN;
	writeln!(
		out,
		"pub static {}_BURST{}: [u16; {}] = [",
		standard.prefix, suffix, len
	)
	.unwrap();
	out.push('\t');
	for index in 0..len {
		let row = index % standard.cycle;
		let sample = |n: usize| {
			let angle = subcarrier_angle(standard, n);
			// NTSC bursts along -U. PAL swings between -U+V and -U-V.
			let swing = if standard.alternate {
				(-angle.sin() + v_sign * angle.cos()) / 2f64.sqrt()
			} else {
				-angle.sin()
			};
			clamp(BLANK_LEVEL + BURST_AMPLITUDE * swing)
		};
		let pair = u16::from(sample(2 * row)) | u16::from(sample(2 * row + 1)) << 8;
		write!(out, "0x{:04x},", pair).unwrap();
	}
	out.push_str("\n];\n");
}

/// Subcarrier phase at output sample `n` (two samples per pixel).
fn subcarrier_angle(standard: &Standard, n: usize) -> f64 {
	2.0 * PI * (standard.subcarrier_periods * n) as f64 / (2 * standard.cycle) as f64
}

/// Splits an `RRRGGGBB` colour into luma and the two colour difference signals.
fn yuv(colour: u8) -> (f64, f64, f64) {
	let r = f64::from((colour >> 5) & 0x07) / 7.0;
	let g = f64::from((colour >> 2) & 0x07) / 7.0;
	let b = f64::from(colour & 0x03) / 3.0;
	let y = 0.299 * r + 0.587 * g + 0.114 * b;
	(y, 0.492 * (b - y), 0.877 * (r - y))
}

/// Converts a signal (0.0 = black, 1.0 = white) into a DAC code.
fn level(signal: f64) -> u8 {
	clamp(BLANK_LEVEL + WHITE_SPAN * signal)
}

fn clamp(code: f64) -> u8 {
	code.round().clamp(0.0, 255.0) as u8
}
