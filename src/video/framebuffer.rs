//! # Frame buffers
//!
//! There is no heap, so video memory is a fixed pool of words handed to the
//! engine at construction. Starting a mode carves one frame buffer out of the
//! pool; stopping the mode gives it back.
//!
//! Every element is an atomic. The foreground writes pixels whenever it
//! likes and the scan-line interrupts (and the DMA engine) read them. A draw
//! that straddles a frame boundary may tear, but nothing can be torn at the
//! element level.
//!
//! ## Mono layout
//!
//! Each line is `ceil(width / 32) * 2 + 2` 16-bit words. The serialiser
//! shifts each word out most-significant-bit first, so pixel `x` lives at bit
//! index `row * stride + (x ^ 15)` where `stride` is sixteen times the words
//! per line. The two words at the end of each line are always zero - the DMA
//! sends them after the picture, so the pin is left black.
//!
//! ## Colour layout
//!
//! One `RRRGGGBB` byte per pixel, `width` bytes per line.

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

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU8, Ordering};

use super::Error;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// The pool all frame buffers come from.
pub struct VideoMemory<'a> {
	words: &'a [AtomicU32],
	in_use: AtomicBool,
}

/// Which kind of buffer to allocate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PixelFormat {
	/// One bit per pixel
	Mono,
	/// One byte per pixel
	Colour,
}

/// A one-bit-per-pixel frame buffer.
#[derive(Debug, Copy, Clone)]
pub struct MonoBuffer<'a> {
	words: &'a [AtomicU16],
	width: u16,
	height: u16,
	words_per_line: usize,
}

/// An eight-bit-per-pixel frame buffer.
#[derive(Debug, Copy, Clone)]
pub struct ColourBuffer<'a> {
	bytes: &'a [AtomicU8],
	width: u16,
	height: u16,
}

/// Whichever frame buffer the current mode is using.
#[derive(Debug, Copy, Clone)]
pub enum FrameBuffer<'a> {
	Mono(MonoBuffer<'a>),
	Colour(ColourBuffer<'a>),
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Number of 16-bit words in one mono line, including the two guard words.
pub const fn mono_words_per_line(width: u16) -> usize {
	(width as usize + 31) / 32 * 2 + 2
}

/// Packs 3-bit red, 3-bit green and 2-bit blue into a colour byte.
pub const fn rgb(red: u8, green: u8, blue: u8) -> u8 {
	(red & 0x07) << 5 | (green & 0x07) << 2 | (blue & 0x03)
}

impl<'a> VideoMemory<'a> {
	/// Wrap a pool of words. The pool is not touched until the first
	/// allocation.
	pub const fn new(words: &'a [AtomicU32]) -> VideoMemory<'a> {
		VideoMemory {
			words,
			in_use: AtomicBool::new(false),
		}
	}

	/// Size of the pool in bytes.
	pub fn capacity(&self) -> usize {
		self.words.len() * 4
	}

	/// Is a frame buffer currently handed out?
	pub fn is_allocated(&self) -> bool {
		self.in_use.load(Ordering::Relaxed)
	}

	/// Carve a zeroed frame buffer out of the pool.
	///
	/// Only one buffer can exist at a time.
	pub fn allocate(
		&self,
		format: PixelFormat,
		width: u16,
		height: u16,
	) -> Result<FrameBuffer<'a>, Error> {
		let bytes = match format {
			PixelFormat::Mono => mono_words_per_line(width) * 2 * usize::from(height),
			PixelFormat::Colour => usize::from(width) * usize::from(height),
		};
		if bytes > self.capacity() || self.in_use.load(Ordering::Relaxed) {
			return Err(Error::AllocationFailure);
		}
		self.in_use.store(true, Ordering::Relaxed);

		let words = &self.words[..(bytes + 3) / 4];
		for word in words {
			word.store(0, Ordering::Relaxed);
		}

		let buffer = match format {
			PixelFormat::Mono => {
				// Note (unsafe): AtomicU16 has the same layout as u16, the pool is
				// word aligned, and nobody else looks at these words until the
				// buffer is released.
				let halves = unsafe {
					core::slice::from_raw_parts(words.as_ptr().cast::<AtomicU16>(), bytes / 2)
				};
				FrameBuffer::Mono(MonoBuffer {
					words: halves,
					width,
					height,
					words_per_line: mono_words_per_line(width),
				})
			}
			PixelFormat::Colour => {
				// Note (unsafe): as above, for AtomicU8.
				let bytes =
					unsafe { core::slice::from_raw_parts(words.as_ptr().cast::<AtomicU8>(), bytes) };
				FrameBuffer::Colour(ColourBuffer {
					bytes,
					width,
					height,
				})
			}
		};
		debug!("Frame buffer: {} bytes", bytes);
		Ok(buffer)
	}

	/// Hand a frame buffer back to the pool.
	pub fn release(&self, _buffer: FrameBuffer<'a>) {
		self.in_use.store(false, Ordering::Relaxed);
	}
}

impl<'a> MonoBuffer<'a> {
	/// Bit index of pixel (`x`, `y`).
	#[inline]
	fn bit_index(&self, x: usize, y: usize) -> usize {
		y * self.stride() + (x ^ 15)
	}

	/// Number of bits from one line to the next.
	pub fn stride(&self) -> usize {
		self.words_per_line * 16
	}

	pub fn words_per_line(&self) -> usize {
		self.words_per_line
	}

	/// The whole buffer, guard words included.
	pub fn words(&self) -> &'a [AtomicU16] {
		self.words
	}

	#[inline]
	pub fn set_pixel(&self, x: u16, y: u16, on: bool) {
		let bit = self.bit_index(usize::from(x), usize::from(y));
		let word = &self.words[bit / 16];
		let mask = 1u16 << (bit % 16);
		// Only the foreground writes, so a load/store pair is enough
		let value = word.load(Ordering::Relaxed);
		word.store(if on { value | mask } else { value & !mask }, Ordering::Relaxed);
	}

	#[inline]
	pub fn get_pixel(&self, x: u16, y: u16) -> bool {
		let bit = self.bit_index(usize::from(x), usize::from(y));
		self.words[bit / 16].load(Ordering::Relaxed) & (1 << (bit % 16)) != 0
	}

	/// Sets every visible pixel on or off. The guard words stay zero.
	pub fn clear(&self, on: bool) {
		let fill = if on { 0xFFFF } else { 0x0000 };
		let visible = self.words_per_line - 2;
		for line in self.words.chunks_exact(self.words_per_line) {
			for word in &line[..visible] {
				word.store(fill, Ordering::Relaxed);
			}
		}
		if on {
			// Knock out the bits past the right-hand edge of each line
			for x in self.width..(visible * 16) as u16 {
				for y in 0..self.height {
					self.set_pixel(x, y, false);
				}
			}
		}
	}
}

impl<'a> ColourBuffer<'a> {
	pub fn bytes(&self) -> &'a [AtomicU8] {
		self.bytes
	}

	/// One line of pixels.
	#[inline]
	pub fn line(&self, y: u16) -> &'a [AtomicU8] {
		let width = usize::from(self.width);
		&self.bytes[usize::from(y) * width..][..width]
	}

	#[inline]
	pub fn set_pixel(&self, x: u16, y: u16, colour: u8) {
		self.bytes[usize::from(y) * usize::from(self.width) + usize::from(x)]
			.store(colour, Ordering::Relaxed);
	}

	#[inline]
	pub fn get_pixel(&self, x: u16, y: u16) -> u8 {
		self.bytes[usize::from(y) * usize::from(self.width) + usize::from(x)].load(Ordering::Relaxed)
	}

	pub fn clear(&self, colour: u8) {
		for byte in self.bytes {
			byte.store(colour, Ordering::Relaxed);
		}
	}
}

impl<'a> FrameBuffer<'a> {
	pub fn format(&self) -> PixelFormat {
		match self {
			FrameBuffer::Mono(_) => PixelFormat::Mono,
			FrameBuffer::Colour(_) => PixelFormat::Colour,
		}
	}

	pub fn width(&self) -> u16 {
		match self {
			FrameBuffer::Mono(b) => b.width,
			FrameBuffer::Colour(b) => b.width,
		}
	}

	pub fn height(&self) -> u16 {
		match self {
			FrameBuffer::Mono(b) => b.height,
			FrameBuffer::Colour(b) => b.height,
		}
	}

	/// Bytes from the start of one line to the next, which is also what the
	/// DMA sends for each line.
	pub fn line_bytes(&self) -> usize {
		match self {
			FrameBuffer::Mono(b) => b.words_per_line * 2,
			FrameBuffer::Colour(b) => usize::from(b.width),
		}
	}

	pub fn len_bytes(&self) -> usize {
		match self {
			FrameBuffer::Mono(b) => b.words.len() * 2,
			FrameBuffer::Colour(b) => b.bytes.len(),
		}
	}

	/// Address of the first byte, for the DMA engine.
	pub fn base_address(&self) -> usize {
		match self {
			FrameBuffer::Mono(b) => b.words.as_ptr() as usize,
			FrameBuffer::Colour(b) => b.bytes.as_ptr() as usize,
		}
	}

	/// Set a pixel. Mono buffers treat any non-zero value as "on".
	///
	/// Coordinates are not range checked beyond what slice indexing does.
	#[inline]
	pub fn set_pixel(&self, x: u16, y: u16, value: u8) {
		match self {
			FrameBuffer::Mono(b) => b.set_pixel(x, y, value != 0),
			FrameBuffer::Colour(b) => b.set_pixel(x, y, value),
		}
	}

	#[inline]
	pub fn get_pixel(&self, x: u16, y: u16) -> u8 {
		match self {
			FrameBuffer::Mono(b) => u8::from(b.get_pixel(x, y)),
			FrameBuffer::Colour(b) => b.get_pixel(x, y),
		}
	}

	/// Fill the whole picture with one value.
	pub fn clear(&self, value: u8) {
		match self {
			FrameBuffer::Mono(b) => b.clear(value != 0),
			FrameBuffer::Colour(b) => b.clear(value),
		}
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	fn pool(words: usize) -> Vec<AtomicU32> {
		(0..words).map(|_| AtomicU32::new(0xDEAD_BEEF)).collect()
	}

	fn guard_words_clear(buffer: &MonoBuffer) -> bool {
		buffer
			.words()
			.chunks_exact(buffer.words_per_line())
			.all(|line| line[line.len() - 2..].iter().all(|w| w.load(Ordering::Relaxed) == 0))
	}

	#[test]
	fn words_per_line() {
		assert_eq!(mono_words_per_line(8), 4);
		assert_eq!(mono_words_per_line(32), 4);
		assert_eq!(mono_words_per_line(33), 6);
		assert_eq!(mono_words_per_line(640), 42);
		assert_eq!(mono_words_per_line(800), 52);
		for width in 8..=800u16 {
			let expected = (usize::from(width) + 31) / 32 * 2 + 2;
			assert_eq!(mono_words_per_line(width), expected);
		}
	}

	#[test]
	fn allocation_is_zeroed() {
		let words = pool(1024);
		let memory = VideoMemory::new(&words);
		let fb = memory.allocate(PixelFormat::Colour, 64, 32).unwrap();
		assert_eq!(fb.len_bytes(), 64 * 32);
		assert!(words[..512].iter().all(|w| w.load(Ordering::Relaxed) == 0));
		// Beyond the buffer is left alone
		assert_eq!(words[512].load(Ordering::Relaxed), 0xDEAD_BEEF);
	}

	#[test]
	fn out_of_memory() {
		let words = pool(100);
		let memory = VideoMemory::new(&words);
		assert_eq!(
			memory.allocate(PixelFormat::Colour, 320, 240).unwrap_err(),
			Error::AllocationFailure
		);
		assert!(!memory.is_allocated());
	}

	#[test]
	fn one_buffer_at_a_time() {
		let words = pool(1024);
		let memory = VideoMemory::new(&words);
		let fb = memory.allocate(PixelFormat::Mono, 64, 16).unwrap();
		assert_eq!(
			memory.allocate(PixelFormat::Mono, 64, 16).unwrap_err(),
			Error::AllocationFailure
		);
		memory.release(fb);
		assert!(memory.allocate(PixelFormat::Mono, 64, 16).is_ok());
	}

	#[test]
	fn mono_bit_addressing() {
		let words = pool(1024);
		let memory = VideoMemory::new(&words);
		let FrameBuffer::Mono(fb) = memory.allocate(PixelFormat::Mono, 40, 4).unwrap() else {
			panic!("wrong format");
		};
		assert_eq!(fb.words_per_line(), 6);
		assert_eq!(fb.stride(), 96);
		// Pixel 0 is the MSB of the first word
		fb.set_pixel(0, 0, true);
		assert_eq!(fb.words()[0].load(Ordering::Relaxed), 0x8000);
		// Pixel 17 is the second-from-top bit of the second word
		fb.set_pixel(17, 0, true);
		assert_eq!(fb.words()[1].load(Ordering::Relaxed), 0x4000);
		// Line 1 starts a stride later
		fb.set_pixel(15, 1, true);
		assert_eq!(fb.words()[6].load(Ordering::Relaxed), 0x0001);
	}

	#[test]
	fn mono_round_trip() {
		let words = pool(4096);
		let memory = VideoMemory::new(&words);
		let fb = memory.allocate(PixelFormat::Mono, 100, 20).unwrap();
		for y in 0..20 {
			for x in 0..100 {
				fb.set_pixel(x, y, 1);
				assert_eq!(fb.get_pixel(x, y), 1);
			}
		}
		for y in 0..20 {
			for x in (0..99).step_by(3) {
				fb.set_pixel(x, y, 0);
				assert_eq!(fb.get_pixel(x, y), 0);
				assert_eq!(fb.get_pixel(x + 1, y), 1);
			}
		}
		let FrameBuffer::Mono(mono) = fb else {
			panic!("wrong format");
		};
		assert!(guard_words_clear(&mono));
	}

	#[test]
	fn guard_words_survive_every_width() {
		let words = pool(2048);
		let memory = VideoMemory::new(&words);
		for width in (8..=800u16).step_by(7) {
			let fb = memory.allocate(PixelFormat::Mono, width, 2).unwrap();
			for y in 0..2 {
				for x in 0..width {
					fb.set_pixel(x, y, 1);
				}
			}
			let FrameBuffer::Mono(mono) = fb else {
				panic!("wrong format");
			};
			assert!(guard_words_clear(&mono), "width {}", width);
			fb.clear(1);
			assert!(guard_words_clear(&mono), "width {} after clear", width);
			assert_eq!(fb.get_pixel(width - 1, 1), 1);
			memory.release(fb);
		}
	}

	#[test]
	fn colour_round_trip() {
		let words = pool(2048);
		let memory = VideoMemory::new(&words);
		let fb = memory.allocate(PixelFormat::Colour, 64, 32).unwrap();
		assert_eq!(fb.line_bytes(), 64);
		for y in 0..32 {
			for x in 0..64 {
				let colour = (x as u8).wrapping_mul(3) ^ (y as u8);
				fb.set_pixel(x, y, colour);
				assert_eq!(fb.get_pixel(x, y), colour);
			}
		}
		let FrameBuffer::Colour(colour) = fb else {
			panic!("wrong format");
		};
		assert_eq!(colour.line(1)[2].load(Ordering::Relaxed), 6 ^ 1);
	}

	#[test]
	fn colour_packing() {
		assert_eq!(rgb(7, 7, 3), 0xFF);
		assert_eq!(rgb(7, 0, 0), 0xE0);
		assert_eq!(rgb(0, 7, 0), 0x1C);
		assert_eq!(rgb(0, 0, 3), 0x03);
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
