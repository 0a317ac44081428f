//! # Video Engine
//!
//! Generates VGA (one-bit mono or 8-bit colour, at almost any resolution) or
//! NTSC/PAL composite colour from a frame buffer in RAM, using one DMA
//! channel, two timers and three interrupts.
//!
//! * The horizontal timer runs H-Sync and interrupts at the end of each line.
//!   It is only used to repeat lines for vertical scaling, and to put the CPU
//!   to sleep so it wakes with a fixed latency.
//! * The line timer fires a little later in every line. Its handler starts
//!   the DMA for the line, drives V-Sync, and (for composite) encodes the
//!   next line.
//! * The DMA-complete interrupt (mono only) takes the pixel pin back from the
//!   serialiser at the end of each line.
//!
//! The two timers are started separately, so at first they are not in phase.
//! The horizontal timer starts one tick longer than the line timer and
//! drifts backwards against it, until the line timer handler sees the
//! horizontal counter at the right place and trims the horizontal period to
//! match.
//!
//! There is one `Engine`, normally in a `static`, and the interrupt handlers
//! call straight into it. The interrupt priorities are the only locking:
//! mode changes happen inside a critical section, and otherwise the
//! handlers own the raster state.

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

pub mod composite;
pub mod framebuffer;
pub mod hw;
pub mod modeline;
mod scanline;
mod sequencer;
#[cfg(test)]
pub(crate) mod sim;

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

use core::cell::{Cell, UnsafeCell};
use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU8, Ordering};

use critical_section::Mutex;
use fugit::HertzU32;

pub use composite::VideoStandard;
pub use framebuffer::{rgb, FrameBuffer, PixelFormat};
pub use hw::{Hardware, SyncPolarity};
pub use modeline::{MonitorRange, TimingParameters};

use composite::{Standard, SLOT_LEN};
use framebuffer::VideoMemory;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// The output modes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
	Off,
	/// VGA, one bit per pixel
	Mono,
	/// VGA, one `RRRGGGBB` byte per pixel
	Colour,
	/// NTSC composite, 320 x 200 colour
	Ntsc,
	/// PAL composite, 320 x 240 colour
	Pal,
}

/// Where the engine is in its lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
	Off,
	/// A `begin` call is working out timings and claiming memory
	Configuring,
	Running(Mode),
}

/// Where the beam is, vertically.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VerticalState {
	ActivePicture,
	FrontPorch,
	SyncPulse,
	BackPorch,
}

/// Why a configuration was refused.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Unsupported {
	/// Colour modes are limited to [`MAX_COLOUR_LINES`] lines
	ColourHeight,
	/// The mode can't be started that way (e.g. composite through `begin`)
	Mode,
	/// Zero or absurdly large width or height
	Geometry,
	/// Composite needs the system clock at exactly 84 MHz
	SystemClock,
}

/// Things that stop a mode starting.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
	/// No modeline fits inside the monitor's frequency range
	TimingUnsatisfiable,
	/// The frame buffer doesn't fit in video memory
	AllocationFailure,
	UnsupportedConfiguration(Unsupported),
}

/// Foreground-only configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Settings {
	/// `None` until someone calibrates the monitor
	monitor: Option<MonitorRange>,
	h_polarity: SyncPolarity,
	v_polarity: SyncPolarity,
	system_clock: HertzU32,
}

/// Everything the interrupt handlers need to know about the running mode.
///
/// Written when the mode starts and cleared when it stops, both with
/// interrupts off. In between it never changes.
#[derive(Copy, Clone)]
struct Playout<'a> {
	mode: Mode,
	timing: TimingParameters,
	frame: FrameBuffer<'a>,
	/// Only set for composite modes
	standard: Option<&'static Standard>,
	/// DMA elements per line
	transfers_per_line: u32,
	v_polarity: SyncPolarity,
	h_polarity: SyncPolarity,
}

/// Where the beam is. Only the line timer handler writes to this.
struct RasterState {
	line: AtomicU16,
	line_double: AtomicU16,
	phase: AtomicU8,
	synced: AtomicBool,
	frame_count: AtomicU32,
	/// Should the next line timer interrupt start the pixel DMA?
	display_armed: AtomicBool,
	/// The composite line buffer slot holding the next line to send
	ready_slot: AtomicU8,
}

/// Two fully-encoded composite lines. The DMA sends one while the line timer
/// handler fills the other.
#[repr(C, align(4))]
struct CompositeLineBuffer {
	slots: [[u16; SLOT_LEN]; 2],
}

/// The video engine.
///
/// `H` is the peripheral binding. Video memory is borrowed for `'a`, which
/// is `'static` on real hardware.
pub struct Engine<'a, H> {
	hw: H,
	memory: VideoMemory<'a>,
	settings: Mutex<Cell<Settings>>,
	state: AtomicU8,
	playout: UnsafeCell<Option<Playout<'a>>>,
	raster: RasterState,
	line_buffer: UnsafeCell<CompositeLineBuffer>,
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// The tallest colour picture we allow.
pub const MAX_COLOUR_LINES: u16 = 380;

const STATE_OFF: u8 = 0;
const STATE_CONFIGURING: u8 = 1;
const STATE_RUNNING: u8 = 2;

/// The composite slot the DMA starts from; `begin_composite` fills it with a
/// blank line.
const FIRST_SLOT: u8 = 1;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

// Note (unsafe): `playout` and `line_buffer` are only written with interrupts
// disabled (`start` and `end`) or by the line timer handler, which nothing
// else that touches them can pre-empt.
unsafe impl<'a, H: Sync> Sync for Engine<'a, H> {}

impl<'a, H: Hardware> Engine<'a, H> {
	/// Make a stopped engine. `memory` is the pool every frame buffer comes
	/// from; a 320 x 240 colour picture needs 19,200 words.
	pub const fn new(hw: H, memory: &'a [AtomicU32]) -> Engine<'a, H> {
		Engine {
			hw,
			memory: VideoMemory::new(memory),
			settings: Mutex::new(Cell::new(Settings::DEFAULT)),
			state: AtomicU8::new(STATE_OFF),
			playout: UnsafeCell::new(None),
			raster: RasterState::new(),
			line_buffer: UnsafeCell::new(CompositeLineBuffer {
				slots: [[0; SLOT_LEN]; 2],
			}),
		}
	}

	/// The peripheral binding.
	pub fn hardware(&self) -> &H {
		&self.hw
	}

	/// Set the line (`h_*`) and frame (`v_*`) rates the monitor accepts.
	/// Both ranges are exclusive. Takes effect at the next `begin`.
	pub fn set_monitor_frequency_range(
		&self,
		h_min: HertzU32,
		h_max: HertzU32,
		v_min: HertzU32,
		v_max: HertzU32,
	) {
		self.update_settings(|s| s.monitor = Some(MonitorRange::new(h_min, h_max, v_min, v_max)));
	}

	/// Set the sync pulse polarities. Takes effect at the next `begin`.
	pub fn set_sync_polarity(&self, h: SyncPolarity, v: SyncPolarity) {
		self.update_settings(|s| {
			s.h_polarity = h;
			s.v_polarity = v;
		});
	}

	/// Tell the engine what the system clock is. Defaults to 84 MHz, which
	/// is the only clock composite modes work at.
	pub fn set_system_clock(&self, clock: HertzU32) {
		self.update_settings(|s| s.system_clock = clock);
	}

	/// Start a VGA mode, stopping any mode already running.
	///
	/// `mode` must be [`Mode::Mono`] or [`Mode::Colour`]. The frame buffer
	/// starts out black.
	pub fn begin(&self, width: u16, height: u16, mode: Mode) -> Result<(), Error> {
		self.end();
		match self.prepare_raster(width, height, mode) {
			Ok(playout) => {
				self.start(playout);
				let timing = playout.timing;
				info!(
					"VGA {}x{} x{}/x{}: {} Hz line, {} Hz frame",
					width,
					height,
					timing.h_scale,
					timing.v_scale,
					timing.line_frequency.to_Hz(),
					timing.frame_frequency.to_Hz()
				);
				Ok(())
			}
			Err(e) => {
				self.state.store(STATE_OFF, Ordering::Relaxed);
				warn!("Can't start {}x{}: {}", width, height, e);
				Err(e)
			}
		}
	}

	/// Start a composite mode, stopping any mode already running.
	///
	/// The geometry is fixed by the standard: see [`VideoStandard`].
	pub fn begin_composite(&self, standard: VideoStandard) -> Result<(), Error> {
		self.end();
		match self.prepare_composite(standard) {
			Ok(playout) => {
				self.start(playout);
				info!("Composite {} running", standard);
				Ok(())
			}
			Err(e) => {
				self.state.store(STATE_OFF, Ordering::Relaxed);
				warn!("Can't start {}: {}", standard, e);
				Err(e)
			}
		}
	}

	/// Stop video output and release the frame buffer. Does nothing if we're
	/// already stopped.
	pub fn end(&self) {
		if self.state.load(Ordering::Relaxed) == STATE_OFF {
			return;
		}
		let released = critical_section::with(|_cs| {
			sequencer::disarm(&self.hw);
			self.raster.reset();
			self.state.store(STATE_OFF, Ordering::Relaxed);
			// Note (unsafe): interrupts are off and the video interrupts are
			// masked, so nobody else is looking.
			unsafe { (*self.playout.get()).take() }
		});
		if let Some(playout) = released {
			self.memory.release(playout.frame);
		}
		debug!("Video stopped");
	}

	pub fn state(&self) -> State {
		match self.state.load(Ordering::Relaxed) {
			STATE_RUNNING => State::Running(self.mode()),
			STATE_CONFIGURING => State::Configuring,
			_ => State::Off,
		}
	}

	pub fn mode(&self) -> Mode {
		self.playout().map_or(Mode::Off, |p| p.mode)
	}

	/// The timings of the running mode.
	pub fn timing(&self) -> Option<TimingParameters> {
		self.playout().map(|p| p.timing)
	}

	/// The frame buffer of the running mode. Composite modes use a colour
	/// buffer.
	pub fn frame_buffer(&self) -> Option<FrameBuffer<'a>> {
		self.playout().map(|p| p.frame)
	}

	/// Set a pixel in the running mode's frame buffer. Does nothing if no
	/// mode is running.
	#[inline]
	pub fn set_pixel(&self, x: u16, y: u16, value: u8) {
		if let Some(frame) = self.frame_buffer() {
			frame.set_pixel(x, y, value);
		}
	}

	/// Fill the whole picture with one value.
	pub fn clear(&self, value: u8) {
		if let Some(frame) = self.frame_buffer() {
			frame.clear(value);
		}
	}

	/// Read a pixel back. Zero if no mode is running.
	#[inline]
	pub fn get_pixel(&self, x: u16, y: u16) -> u8 {
		self.frame_buffer().map_or(0, |frame| frame.get_pixel(x, y))
	}

	/// Frames sent since the mode started.
	pub fn frame_count(&self) -> u32 {
		self.raster.frame_count.load(Ordering::Relaxed)
	}

	/// The line the line timer handler will deal with next.
	pub fn current_line(&self) -> u16 {
		self.raster.line.load(Ordering::Relaxed)
	}

	/// Has the horizontal timer been brought into phase with the line timer?
	pub fn is_locked(&self) -> bool {
		self.raster.synced.load(Ordering::Relaxed)
	}

	/// Which part of the frame the beam is in, if a mode is running.
	pub fn vertical_state(&self) -> Option<VerticalState> {
		let timing = self.timing()?;
		let line = self.current_line();
		Some(if line < timing.height {
			VerticalState::ActivePicture
		} else if line < timing.v_sync_start {
			VerticalState::FrontPorch
		} else if line < timing.v_sync_end {
			VerticalState::SyncPulse
		} else {
			VerticalState::BackPorch
		})
	}

	/// Spin until the beam leaves the active picture. Returns straight away
	/// if no mode is running.
	pub fn wait_for_vertical_blank(&self) {
		self.wait_while(|line, height| line < height);
	}

	/// Spin until the beam is back in the active picture.
	pub fn wait_for_active_picture(&self) {
		self.wait_while(|line, height| line >= height);
	}

	/// Spin until the start of the next vertical blank, even if we're
	/// already in one.
	pub fn wait_for_next_frame(&self) {
		self.wait_for_active_picture();
		self.wait_for_vertical_blank();
	}

	fn wait_while(&self, condition: impl Fn(u16, u16) -> bool) {
		while let Some(timing) = self.timing() {
			if !condition(self.current_line(), timing.height) {
				break;
			}
			core::hint::spin_loop();
		}
	}

	fn settings(&self) -> Settings {
		critical_section::with(|cs| self.settings.borrow(cs).get())
	}

	fn update_settings(&self, f: impl FnOnce(&mut Settings)) {
		critical_section::with(|cs| {
			let cell = self.settings.borrow(cs);
			let mut settings = cell.get();
			f(&mut settings);
			cell.set(settings);
		});
	}

	/// The running mode, if any.
	#[inline(always)]
	fn playout(&self) -> Option<&Playout<'a>> {
		// Note (unsafe): see the `Sync` impl.
		unsafe { (*self.playout.get()).as_ref() }
	}

	/// Validate a VGA request, find its timings and claim its frame buffer.
	fn prepare_raster(&self, width: u16, height: u16, mode: Mode) -> Result<Playout<'a>, Error> {
		let format = match mode {
			Mode::Mono => PixelFormat::Mono,
			Mode::Colour => PixelFormat::Colour,
			_ => return Err(Error::UnsupportedConfiguration(Unsupported::Mode)),
		};
		if mode == Mode::Colour && height > MAX_COLOUR_LINES {
			return Err(Error::UnsupportedConfiguration(Unsupported::ColourHeight));
		}

		self.state.store(STATE_CONFIGURING, Ordering::Relaxed);
		let settings = self.settings();
		let monitor = settings.monitor.unwrap_or_default();
		let timing = modeline::solve(
			width,
			height,
			mode == Mode::Colour,
			&monitor,
			settings.system_clock,
		)?;
		let frame = self.memory.allocate(format, width, height)?;
		let transfers_per_line = match frame {
			FrameBuffer::Mono(ref mono) => mono.words_per_line() as u32,
			FrameBuffer::Colour(_) => u32::from(width),
		};

		Ok(Playout {
			mode,
			timing,
			frame,
			standard: None,
			transfers_per_line,
			h_polarity: settings.h_polarity,
			v_polarity: settings.v_polarity,
		})
	}

	/// Check the clock and claim the chroma buffer for a composite mode.
	fn prepare_composite(&self, standard: VideoStandard) -> Result<Playout<'a>, Error> {
		let settings = self.settings();
		if settings.system_clock != composite::SYSTEM_CLOCK {
			return Err(Error::UnsupportedConfiguration(Unsupported::SystemClock));
		}

		self.state.store(STATE_CONFIGURING, Ordering::Relaxed);
		let parameters = standard.parameters();
		let frame = self
			.memory
			.allocate(PixelFormat::Colour, parameters.width, parameters.height)?;

		Ok(Playout {
			mode: standard.mode(),
			timing: parameters.timing(),
			frame,
			standard: Some(parameters),
			transfers_per_line: parameters.samples_per_line,
			h_polarity: settings.h_polarity,
			v_polarity: settings.v_polarity,
		})
	}

	/// Arm the hardware for a prepared mode.
	fn start(&self, playout: Playout<'a>) {
		critical_section::with(|_cs| {
			self.raster.reset();
			let source = match playout.standard {
				Some(standard) => {
					// Note (unsafe): the video interrupts are masked.
					let buffer = unsafe { &mut *self.line_buffer.get() };
					for slot in buffer.slots.iter_mut() {
						standard.write_blank_line(slot);
					}
					self.slot_address(FIRST_SLOT)
				}
				None => playout.frame.base_address(),
			};
			// Note (unsafe): interrupts are off and the video interrupts are
			// masked.
			unsafe {
				*self.playout.get() = Some(playout);
			}
			sequencer::arm(&self.hw, &playout, source);
			sequencer::enable_interrupts(&self.hw, playout.mode);
			self.state.store(STATE_RUNNING, Ordering::Relaxed);
		});
	}

	/// The bus address of one half of the composite line buffer.
	#[inline(always)]
	fn slot_address(&self, slot: u8) -> usize {
		self.line_buffer.get() as usize + usize::from(slot & 1) * SLOT_LEN * 2
	}
}

impl Settings {
	const DEFAULT: Settings = Settings {
		monitor: None,
		h_polarity: SyncPolarity::Negative,
		v_polarity: SyncPolarity::Negative,
		system_clock: HertzU32::MHz(84),
	};
}

impl RasterState {
	const fn new() -> RasterState {
		RasterState {
			line: AtomicU16::new(0),
			line_double: AtomicU16::new(0),
			phase: AtomicU8::new(0),
			synced: AtomicBool::new(false),
			frame_count: AtomicU32::new(0),
			display_armed: AtomicBool::new(false),
			ready_slot: AtomicU8::new(FIRST_SLOT),
		}
	}

	fn reset(&self) {
		self.line.store(0, Ordering::Relaxed);
		self.line_double.store(0, Ordering::Relaxed);
		self.phase.store(0, Ordering::Relaxed);
		self.synced.store(false, Ordering::Relaxed);
		self.frame_count.store(0, Ordering::Relaxed);
		self.display_armed.store(false, Ordering::Relaxed);
		self.ready_slot.store(FIRST_SLOT, Ordering::Relaxed);
	}
}

impl Error {
	/// The classic integer status code for this error.
	pub fn status(&self) -> i32 {
		match self {
			Error::TimingUnsatisfiable => -1,
			Error::AllocationFailure => -2,
			Error::UnsupportedConfiguration(Unsupported::ColourHeight) => -3,
			Error::UnsupportedConfiguration(_) => -4,
		}
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::sim::{pool, Event, SimHardware};
	use super::*;

	use hw::Irq;

	#[test]
	fn starts_off() {
		let words = pool(16);
		let engine = Engine::new(SimHardware::new(), &words);
		assert_eq!(engine.state(), State::Off);
		assert_eq!(engine.mode(), Mode::Off);
		assert!(engine.frame_buffer().is_none());
		assert_eq!(engine.get_pixel(0, 0), 0);
		// Waiting with nothing running must not hang
		engine.wait_for_vertical_blank();
		engine.wait_for_active_picture();
		engine.wait_for_next_frame();
	}

	#[test]
	fn begin_colour() {
		let words = pool(20_000);
		let engine = Engine::new(SimHardware::new(), &words);
		engine.begin(320, 240, Mode::Colour).unwrap();
		assert_eq!(engine.state(), State::Running(Mode::Colour));
		let frame = engine.frame_buffer().unwrap();
		assert_eq!(frame.len_bytes(), 320 * 240);
		assert!(engine.timing().unwrap().h_scale >= 6);
		engine.set_pixel(10, 20, 0x1C);
		assert_eq!(engine.get_pixel(10, 20), 0x1C);
	}

	#[test]
	fn colour_height_limit() {
		let words = pool(40_000);
		let engine = Engine::new(SimHardware::new(), &words);
		assert_eq!(
			engine.begin(320, 400, Mode::Colour),
			Err(Error::UnsupportedConfiguration(Unsupported::ColourHeight))
		);
		assert_eq!(engine.state(), State::Off);
		// Nothing was touched
		assert!(engine.hw.events().is_empty());
		// Mono has no such limit
		assert!(engine.begin(320, 400, Mode::Mono).is_ok());
	}

	#[test]
	fn composite_through_begin_is_refused() {
		let words = pool(20_000);
		let engine = Engine::new(SimHardware::new(), &words);
		for mode in [Mode::Off, Mode::Ntsc, Mode::Pal] {
			let e = engine.begin(320, 200, mode).unwrap_err();
			assert_eq!(e, Error::UnsupportedConfiguration(Unsupported::Mode));
			assert_eq!(e.status(), -4);
		}
	}

	#[test]
	fn out_of_video_memory() {
		let words = pool(1000);
		let engine = Engine::new(SimHardware::new(), &words);
		assert_eq!(engine.begin(320, 240, Mode::Colour), Err(Error::AllocationFailure));
		assert_eq!(engine.state(), State::Off);
		assert!(!engine.memory.is_allocated());
		assert_eq!(
			engine.begin_composite(VideoStandard::Pal),
			Err(Error::AllocationFailure)
		);
		assert_eq!(engine.state(), State::Off);
	}

	#[test]
	fn unsatisfiable_timing() {
		let words = pool(20_000);
		let engine = Engine::new(SimHardware::new(), &words);
		engine.set_monitor_frequency_range(
			HertzU32::kHz(27),
			HertzU32::kHz(83),
			HertzU32::Hz(100),
			HertzU32::Hz(101),
		);
		assert_eq!(
			engine.begin(320, 240, Mode::Colour),
			Err(Error::TimingUnsatisfiable)
		);
		assert_eq!(engine.state(), State::Off);
		assert!(!engine.memory.is_allocated());
	}

	#[test]
	fn end_twice_is_harmless() {
		let words = pool(20_000);
		let engine = Engine::new(SimHardware::new(), &words);
		engine.begin(320, 240, Mode::Mono).unwrap();
		engine.end();
		assert_eq!(engine.state(), State::Off);
		assert!(engine.frame_buffer().is_none());
		let events = engine.hw.events().len();
		engine.end();
		assert_eq!(engine.hw.events().len(), events);
		assert_eq!(engine.state(), State::Off);
	}

	#[test]
	fn begin_while_running_tears_down_first() {
		let words = pool(20_000);
		let engine = Engine::new(SimHardware::new(), &words);
		engine.begin(320, 240, Mode::Mono).unwrap();
		let old_frame = engine.frame_buffer().unwrap();
		assert_eq!(old_frame.format(), PixelFormat::Mono);
		engine.hw.clear_events();

		engine.begin(320, 240, Mode::Colour).unwrap();
		let events = engine.hw.events();
		let disabled = events
			.iter()
			.position(|e| *e == Event::DisableIrq(Irq::LineTimer))
			.unwrap();
		let enabled = events
			.iter()
			.position(|e| *e == Event::EnableIrq(Irq::LineTimer))
			.unwrap();
		assert!(disabled < enabled);
		assert!(events.contains(&Event::StopTransfers));

		// The old mono buffer is gone, and the new one is colour
		let frame = engine.frame_buffer().unwrap();
		assert_eq!(frame.format(), PixelFormat::Colour);
		assert_eq!(engine.state(), State::Running(Mode::Colour));
	}

	#[test]
	fn failed_begin_still_stops_the_old_mode() {
		let words = pool(20_000);
		let engine = Engine::new(SimHardware::new(), &words);
		engine.begin(320, 240, Mode::Colour).unwrap();
		assert!(engine.begin(320, 400, Mode::Colour).is_err());
		assert_eq!(engine.state(), State::Off);
		assert!(engine.frame_buffer().is_none());
		assert!(!engine.memory.is_allocated());
	}

	#[test]
	fn begin_ntsc() {
		let words = pool(20_000);
		let engine = Engine::new(SimHardware::new(), &words);
		engine.begin_composite(VideoStandard::Ntsc).unwrap();
		assert_eq!(engine.state(), State::Running(Mode::Ntsc));
		let timing = engine.timing().unwrap();
		assert_eq!((timing.width, timing.height), (320, 200));
		assert_eq!(timing.line_frequency, HertzU32::Hz(15_778));
		assert!(MonitorRange::DEFAULT.accepts(HertzU32::kHz(28), timing.frame_frequency));
		assert_eq!(engine.frame_buffer().unwrap().len_bytes(), 320 * 200);
	}

	#[test]
	fn composite_needs_84_mhz() {
		let words = pool(20_000);
		let engine = Engine::new(SimHardware::new(), &words);
		engine.set_system_clock(HertzU32::MHz(125));
		assert_eq!(
			engine.begin_composite(VideoStandard::Pal),
			Err(Error::UnsupportedConfiguration(Unsupported::SystemClock))
		);
		engine.set_system_clock(HertzU32::MHz(84));
		assert!(engine.begin_composite(VideoStandard::Pal).is_ok());
	}

	#[test]
	fn composite_slots_start_blank() {
		let words = pool(20_000);
		let engine = Engine::new(SimHardware::new(), &words);
		engine.begin_composite(VideoStandard::Pal).unwrap();
		// Note (unsafe): no interrupts in the test.
		let buffer = unsafe { &*engine.line_buffer.get() };
		for slot in &buffer.slots {
			assert_eq!(slot[0], composite::SYNC_PAIR);
			assert_eq!(slot[100], composite::BLANK_PAIR);
		}
	}

	#[test]
	fn settings_apply_at_next_begin() {
		let words = pool(20_000);
		let engine = Engine::new(SimHardware::new(), &words);
		engine.set_sync_polarity(SyncPolarity::Positive, SyncPolarity::Positive);
		engine.begin(320, 240, Mode::Colour).unwrap();
		let events = engine.hw.events();
		assert!(events.contains(&Event::SyncPins(false)));
		assert!(events.iter().any(|e| matches!(
			e,
			Event::StartHorizontal {
				polarity: SyncPolarity::Positive,
				..
			}
		)));
	}

	#[test]
	fn status_codes() {
		assert_eq!(Error::TimingUnsatisfiable.status(), -1);
		assert_eq!(Error::AllocationFailure.status(), -2);
		assert_eq!(
			Error::UnsupportedConfiguration(Unsupported::ColourHeight).status(),
			-3
		);
		assert_eq!(Error::UnsupportedConfiguration(Unsupported::Mode).status(), -4);
		assert_eq!(
			Error::UnsupportedConfiguration(Unsupported::Geometry).status(),
			-4
		);
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
