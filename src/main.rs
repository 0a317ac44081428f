//! # Neotron Pico Video demo
//!
//! Firmware for a Raspberry Pi Pico that:
//!
//! * brings the system clock up to 84 MHz,
//! * starts a 320 x 240 colour VGA mode (falling back to 640 x 480 mono if
//!   the monitor range won't allow it), and
//! * draws colour bars, then scrolls a marker down the screen once a frame.
//!
//! The picture is produced entirely by the three interrupt handlers at the
//! bottom of this file.

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

#![no_std]
#![no_main]

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

use core::sync::atomic::AtomicU32;

use cortex_m_rt::entry;
use defmt::*;
use defmt_rtt as _;
use embedded_hal::digital::v2::OutputPin;
use fugit::{HertzU32, RateExtU32};
use panic_probe as _;
use pico_video::{
	api,
	rp2040::Rp2040Video,
	video::{rgb, Engine, Mode},
};
use rp_pico::{
	self as pico,
	hal::{
		self,
		pac::{self, interrupt},
	},
};

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// This is the standard RP2040 bootloader. It must be stored in the first 256
/// bytes of the external SPI Flash chip. It will map the external SPI flash
/// chip to address `0x1000_0000` and jump to an Interrupt Vector Table at
/// address `0x1000_0100` (i.e. immediately after the bootloader).
///
/// See `memory.x` for a definition of the `.boot2` section.
#[link_section = ".boot2"]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_W25Q080;

/// Enough for 320 x 240 colour, or 640 x 480 mono.
const VIDEO_RAM_WORDS: usize = 320 * 240 / 4;

/// Frame buffers come from here.
static VIDEO_RAM: [AtomicU32; VIDEO_RAM_WORDS] = [const { AtomicU32::new(0) }; VIDEO_RAM_WORDS];

/// The one and only video engine. The interrupt handlers below use it.
static ENGINE: Engine<'static, Rp2040Video> = Engine::new(Rp2040Video::new(), &VIDEO_RAM);

/// Eight bars: white, yellow, cyan, green, magenta, red, blue, black
const BARS: [u8; 8] = [
	rgb(7, 7, 3),
	rgb(7, 7, 0),
	rgb(0, 7, 3),
	rgb(0, 7, 0),
	rgb(7, 0, 3),
	rgb(7, 0, 0),
	rgb(0, 0, 3),
	rgb(0, 0, 0),
];

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// This is the entry-point to the firmware. It is called by cortex-m-rt once
/// the `.bss` and `.data` sections have been initialised.
#[entry]
fn main() -> ! {
	cortex_m::interrupt::disable();

	info!("{} starting...", &api::VERSION[..api::VERSION.len() - 1]);

	// Grab the singleton containing all the RP2040 peripherals
	let Some(mut pac) = pac::Peripherals::take() else {
		panic!("Peripherals already taken");
	};

	// Needed by the clock setup
	let mut watchdog = hal::watchdog::Watchdog::new(pac.WATCHDOG);

	// Run at 84 MHz SYS_PLL, 48 MHz USB_PLL. Composite video only works at
	// exactly this speed.
	let Ok(xosc) = hal::xosc::setup_xosc_blocking(pac.XOSC, pico::XOSC_CRYSTAL_FREQ.Hz()) else {
		panic!("XOSC failed");
	};

	// Configure watchdog tick generation to tick over every microsecond
	watchdog.enable_tick_generation((pico::XOSC_CRYSTAL_FREQ / 1_000_000) as u8);

	let mut clocks = hal::clocks::ClocksManager::new(pac.CLOCKS);

	let Ok(pll_sys) = hal::pll::setup_pll_blocking(
		pac.PLL_SYS,
		xosc.operating_frequency(),
		hal::pll::PLLConfig {
			vco_freq: HertzU32::MHz(1512),
			refdiv: 1,
			post_div1: 6,
			post_div2: 3,
		},
		&mut clocks,
		&mut pac.RESETS,
	) else {
		panic!("SYS PLL failed");
	};

	let Ok(pll_usb) = hal::pll::setup_pll_blocking(
		pac.PLL_USB,
		xosc.operating_frequency(),
		hal::pll::common_configs::PLL_USB_48MHZ,
		&mut clocks,
		&mut pac.RESETS,
	) else {
		panic!("USB PLL failed");
	};

	if clocks.init_default(&xosc, &pll_sys, &pll_usb).is_err() {
		panic!("Clocks failed");
	}

	info!("Clocks OK");

	// sio is the *Single-cycle Input/Output* peripheral. It has all our GPIO
	// pins, as well as some mailboxes and other useful things for inter-core
	// communications.
	let sio = hal::sio::Sio::new(pac.SIO);

	// Configure and grab all the RP2040 pins the Pico exposes.
	let pins = pico::Pins::new(
		pac.IO_BANK0,
		pac.PADS_BANK0,
		sio.gpio_bank0,
		&mut pac.RESETS,
	);

	// Disable power save mode to force SMPS into low-efficiency, low-noise mode.
	let mut b_power_save = pins.b_power_save.into_push_pull_output();
	b_power_save.set_high().unwrap();

	info!("Pins OK");

	ENGINE.hardware().init(pac.PIO0, &mut pac.RESETS);
	ENGINE.set_system_clock(HertzU32::MHz(84));

	// Note (unsafe): the video interrupts stay masked until a mode starts.
	unsafe {
		cortex_m::interrupt::enable();
	}

	let status = api::begin(&ENGINE, 320, 240, Mode::Colour);
	if status != api::STATUS_OK {
		warn!("Colour mode failed ({}), trying mono", status);
		let status = api::begin(&ENGINE, 640, 480, Mode::Mono);
		if status != api::STATUS_OK {
			error!("Mono mode failed ({})", status);
			loop {
				cortex_m::asm::wfi();
			}
		}
	}

	let Some(frame) = ENGINE.frame_buffer() else {
		panic!("No frame buffer");
	};
	if let Some(timing) = ENGINE.timing() {
		info!(
			"Running {}x{}, {} Hz",
			timing.width,
			timing.height,
			timing.frame_frequency.to_Hz()
		);
	}

	let width = frame.width();
	let height = frame.height();
	let bar_width = width / BARS.len() as u16;
	for y in 0..height {
		for x in 0..width {
			let bar = usize::from(x / bar_width.max(1)).min(BARS.len() - 1);
			frame.set_pixel(x, y, BARS[bar]);
		}
	}

	let mut marker = 0;
	loop {
		ENGINE.wait_for_next_frame();
		for x in 0..width {
			let bar = usize::from(x / bar_width.max(1)).min(BARS.len() - 1);
			frame.set_pixel(x, marker, BARS[bar]);
		}
		marker = (marker + 1) % height;
		for x in 0..width {
			frame.set_pixel(x, marker, BARS[BARS.len() - 1] ^ 0xFF);
		}
		if ENGINE.frame_count() % 600 == 0 {
			debug!("{} frames", ENGINE.frame_count());
		}
	}
}

/// PIO0 raises IRQ0 when the line timer fires.
#[interrupt]
fn PIO0_IRQ_0() {
	ENGINE.on_line_timer();
}

/// The H-Sync PWM slice raises this when it wraps.
#[interrupt]
fn PWM_IRQ_WRAP() {
	ENGINE.on_horizontal_compare();
}

/// Called when DMA raises IRQ0; i.e. when a mono line has been handed to the
/// serialiser.
#[interrupt]
fn DMA_IRQ_0() {
	ENGINE.on_dma_complete();
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
