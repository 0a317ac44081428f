//! A pretend set of peripherals for the unit tests.
//!
//! Every call is logged as an [`Event`]. The DMA source address, the
//! horizontal counter and the serialiser's FIFO are modelled, so the
//! scan-line handlers can be run line by line and checked.

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

use core::cell::{Cell, RefCell};
use core::sync::atomic::AtomicU32;

use super::hw::{
	DmaControl, GpioControl, InterruptControl, Irq, PinRoute, PixelPortControl, PixelSink,
	Priority, SyncPolarity, TimerControl, TransferWidth,
};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
	Priority(Irq, Priority),
	BackgroundPriority(Priority),
	EnableIrq(Irq),
	DisableIrq(Irq),
	WaitForEvent,
	StartHorizontal {
		period: u32,
		pulse: u32,
		polarity: SyncPolarity,
	},
	HorizontalPeriod(u32),
	AcknowledgeHorizontal,
	StartLineTimer(u32),
	AcknowledgeLineTimer,
	StopTimers,
	ConfigureTransfer(TransferWidth, PixelSink, bool),
	SetSource(usize),
	Transfer {
		source: usize,
		count: u32,
	},
	AcknowledgeTransfer,
	StopTransfers,
	BusPriority(bool),
	SyncPins(bool),
	Vsync(bool),
	Route(PixelSink, PinRoute),
	ReleasePins,
	StartSerial(u32),
	StartParallel(u32, TransferWidth, u8),
	/// The serialiser was polled while it still had words queued
	SerialBusy(u32),
	/// The mono pin was taken back with this many words not yet shifted out
	PixelsCut(u32),
	StopPort,
}

/// The peripherals. Single threaded, like the real thing.
#[derive(Default)]
pub struct SimHardware {
	events: RefCell<Vec<Event>>,
	source: Cell<usize>,
	width: Cell<usize>,
	h_period: Cell<u32>,
	h_count: Cell<u32>,
	line_period: Cell<u32>,
	serial: Cell<bool>,
	/// Words waiting in the serialiser's FIFO
	queued: Cell<u32>,
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// An unjoined PIO TX FIFO.
pub const SERIAL_FIFO_DEPTH: u32 = 4;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// A zeroed video memory pool of `words` words.
pub fn pool(words: usize) -> Vec<AtomicU32> {
	(0..words).map(|_| AtomicU32::new(0)).collect()
}

impl SimHardware {
	pub fn new() -> SimHardware {
		SimHardware::default()
	}

	pub fn events(&self) -> Vec<Event> {
		self.events.borrow().clone()
	}

	pub fn clear_events(&self) {
		self.events.borrow_mut().clear();
	}

	/// Every DMA transfer started, as (source, count).
	pub fn transfers(&self) -> Vec<(usize, u32)> {
		self.events
			.borrow()
			.iter()
			.filter_map(|e| match e {
				Event::Transfer { source, count } => Some((*source, *count)),
				_ => None,
			})
			.collect()
	}

	/// Move the horizontal counter, e.g. to land on a particular part of the
	/// lock window.
	pub fn set_horizontal_count(&self, count: u32) {
		self.h_count.set(count);
	}

	fn log(&self, event: Event) {
		self.events.borrow_mut().push(event);
	}
}

impl InterruptControl for SimHardware {
	fn set_priority(&self, irq: Irq, priority: Priority) {
		self.log(Event::Priority(irq, priority));
	}

	fn set_background_priority(&self, priority: Priority) {
		self.log(Event::BackgroundPriority(priority));
	}

	fn enable_irq(&self, irq: Irq) {
		self.log(Event::EnableIrq(irq));
	}

	fn disable_irq(&self, irq: Irq) {
		self.log(Event::DisableIrq(irq));
	}

	fn wait_for_event(&self) {
		self.log(Event::WaitForEvent);
	}
}

impl TimerControl for SimHardware {
	fn start_horizontal(&self, period: u32, pulse: u32, polarity: SyncPolarity) {
		self.h_period.set(period);
		self.h_count.set(0);
		self.log(Event::StartHorizontal {
			period,
			pulse,
			polarity,
		});
	}

	fn set_horizontal_period(&self, period: u32) {
		self.h_period.set(period);
		self.log(Event::HorizontalPeriod(period));
	}

	fn horizontal_count(&self) -> u32 {
		self.h_count.get()
	}

	fn acknowledge_horizontal(&self) {
		self.log(Event::AcknowledgeHorizontal);
	}

	fn start_line_timer(&self, period: u32) {
		self.line_period.set(period);
		self.log(Event::StartLineTimer(period));
	}

	/// Each line timer interrupt is one line timer period after the last, so
	/// this is where the horizontal counter moves on.
	fn acknowledge_line_timer(&self) {
		let period = self.h_period.get();
		if period != 0 {
			self.h_count
				.set((self.h_count.get() + self.line_period.get()) % period);
		}
		self.log(Event::AcknowledgeLineTimer);
	}

	fn stop_timers(&self) {
		self.h_period.set(0);
		self.log(Event::StopTimers);
	}
}

impl DmaControl for SimHardware {
	fn configure_transfer(&self, width: TransferWidth, sink: PixelSink, complete_irq: bool) {
		self.width.set(width.bytes());
		self.serial.set(sink == PixelSink::Serial);
		self.log(Event::ConfigureTransfer(width, sink, complete_irq));
	}

	fn set_source(&self, address: usize) {
		self.source.set(address);
		self.log(Event::SetSource(address));
	}

	fn source(&self) -> usize {
		self.source.get()
	}

	fn start_transfer(&self, count: u32) {
		let source = self.source.get();
		self.log(Event::Transfer { source, count });
		self.source
			.set(source + count as usize * self.width.get());
		// The channel finishes as soon as the last word is in the FIFO
		if self.serial.get() {
			self.queued.set(count.min(SERIAL_FIFO_DEPTH));
		}
	}

	fn acknowledge_transfer(&self) {
		self.log(Event::AcknowledgeTransfer);
	}

	fn stop_transfers(&self) {
		self.log(Event::StopTransfers);
	}

	fn set_bus_priority(&self, dma_first: bool) {
		self.log(Event::BusPriority(dma_first));
	}
}

impl GpioControl for SimHardware {
	fn configure_sync_pins(&self, vsync_idle: bool) {
		self.log(Event::SyncPins(vsync_idle));
	}

	fn set_vsync(&self, level: bool) {
		self.log(Event::Vsync(level));
	}

	fn route_pixel_pins(&self, sink: PixelSink, route: PinRoute) {
		let queued = self.queued.get();
		if sink == PixelSink::Serial && route == PinRoute::Gpio && queued != 0 {
			self.log(Event::PixelsCut(queued));
		}
		self.log(Event::Route(sink, route));
	}

	fn release_pins(&self) {
		self.log(Event::ReleasePins);
	}
}

impl PixelPortControl for SimHardware {
	fn start_serial_port(&self, clocks_per_bit: u32) {
		self.log(Event::StartSerial(clocks_per_bit));
	}

	fn start_parallel_port(&self, clocks_per_sample: u32, width: TransferWidth, idle: u8) {
		self.log(Event::StartParallel(clocks_per_sample, width, idle));
	}

	/// Each poll takes as long as shifting out one word.
	fn serial_drained(&self) -> bool {
		let queued = self.queued.get();
		if queued == 0 {
			return true;
		}
		self.log(Event::SerialBusy(queued));
		self.queued.set(queued - 1);
		false
	}

	fn stop_port(&self) {
		self.queued.set(0);
		self.log(Event::StopPort);
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
