//! # Peripheral capabilities
//!
//! The video engine never touches a register directly. Everything it needs
//! from the chip is expressed by the traits in this module, and a concrete
//! binding (see the `rp2040` module) maps them onto real hardware.
//!
//! All methods take `&self`, because they are called from interrupt context
//! as well as from the foreground. Implementations are expected to be thin
//! register writes with no locking.

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
// Types
// -----------------------------------------------------------------------------

/// The three interrupt sources the video engine runs on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Irq {
	/// Fires once per scan-line, at the start of the line's playout window.
	LineTimer,
	/// Fires once per scan-line, when the horizontal sync timer wraps.
	HorizontalCompare,
	/// Fires when a mono pixel burst has been fully handed to the serialiser.
	DmaComplete,
}

/// Interrupt priority levels, most urgent first.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Priority {
	Highest,
	High,
	Medium,
	Lowest,
}

/// Size of one DMA transfer element.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferWidth {
	Byte,
	HalfWord,
	Word,
}

/// Where the pixel DMA delivers its data.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PixelSink {
	/// A one-bit serialiser (mono VGA).
	Serial,
	/// An eight-bit parallel port (colour VGA and composite).
	Parallel,
}

/// Who is driving the mono pixel pin.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinRoute {
	/// The serialiser is clocking bits out.
	Port,
	/// Plain GPIO, held at the black level.
	Gpio,
}

/// Describes the polarity of a sync pulse.
///
/// Some pulses are positive (active-high), some are negative (active-low).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncPolarity {
	/// An active-high pulse
	Positive,
	/// An active-low pulse
	Negative,
}

// -----------------------------------------------------------------------------
// Traits
// -----------------------------------------------------------------------------

/// Interrupt controller access.
pub trait InterruptControl {
	/// Sets the priority of one of the video interrupts.
	fn set_priority(&self, irq: Irq, priority: Priority);
	/// Sets the priority of every interrupt in the system. Called before the
	/// video interrupts are given their own levels.
	fn set_background_priority(&self, priority: Priority);
	/// Clears any pending request and unmasks the interrupt.
	fn enable_irq(&self, irq: Irq);
	/// Masks the interrupt.
	fn disable_irq(&self, irq: Irq);
	/// Sleeps the core until the next event or interrupt.
	fn wait_for_event(&self);
}

/// The two timers that define a scan-line.
///
/// Periods and pulse widths are in system clock ticks.
pub trait TimerControl {
	/// Starts the horizontal timer. It wraps every `period` ticks, drives the
	/// H-Sync pin for the last `pulse` ticks of each period, and raises
	/// [`Irq::HorizontalCompare`] on every wrap.
	fn start_horizontal(&self, period: u32, pulse: u32, polarity: SyncPolarity);
	/// Changes the horizontal period. Takes effect at the next wrap.
	fn set_horizontal_period(&self, period: u32);
	/// Reads the live horizontal counter.
	fn horizontal_count(&self) -> u32;
	/// Clears the horizontal wrap interrupt.
	fn acknowledge_horizontal(&self);
	/// Starts the line timer, which raises [`Irq::LineTimer`] every `period`
	/// ticks.
	fn start_line_timer(&self, period: u32);
	/// Clears the line timer interrupt.
	fn acknowledge_line_timer(&self);
	/// Stops both timers.
	fn stop_timers(&self);
}

/// The pixel DMA channel.
pub trait DmaControl {
	/// Sets up the channel to copy from memory into `sink`, `width` at a
	/// time. If `complete_irq` is set, [`Irq::DmaComplete`] fires at the end
	/// of every transfer.
	fn configure_transfer(&self, width: TransferWidth, sink: PixelSink, complete_irq: bool);
	/// Sets the address the next transfer reads from.
	fn set_source(&self, address: usize);
	/// Reads back the source address. After a transfer it points just past
	/// the last element read.
	fn source(&self) -> usize;
	/// Starts a transfer of `count` elements from the current source address.
	fn start_transfer(&self, count: u32);
	/// Clears the transfer-complete interrupt.
	fn acknowledge_transfer(&self);
	/// Aborts any transfer and disables the channel.
	fn stop_transfers(&self);
	/// Lets the DMA win bus arbitration against the CPU (or not).
	fn set_bus_priority(&self, dma_first: bool);
}

/// Pin routing.
pub trait GpioControl {
	/// Hands the H-Sync pin to the horizontal timer and drives V-Sync as a
	/// plain output, starting at `vsync_idle`.
	fn configure_sync_pins(&self, vsync_idle: bool);
	/// Drives the V-Sync pin.
	fn set_vsync(&self, level: bool);
	/// Routes the pixel pins for `sink`. Only the serial (mono) pin ever moves
	/// between [`PinRoute::Port`] and [`PinRoute::Gpio`].
	fn route_pixel_pins(&self, sink: PixelSink, route: PinRoute);
	/// Puts every video pin back to high-impedance.
	fn release_pins(&self);
}

/// The block that turns DMA data into pixels on the pins.
pub trait PixelPortControl {
	/// Starts shifting 16-bit words out MSB first, one bit every
	/// `clocks_per_bit` ticks.
	fn start_serial_port(&self, clocks_per_bit: u32);
	/// Starts writing bytes to the eight colour pins, one every
	/// `clocks_per_sample` ticks. `width` is the size of each DMA element,
	/// which the port unpacks least significant byte first. When the DMA
	/// runs dry the pins sit at `idle`.
	fn start_parallel_port(&self, clocks_per_sample: u32, width: TransferWidth, idle: u8);
	/// Has the serialiser taken every queued word? Once it has, only the
	/// last word (a zero guard word) is still being shifted.
	fn serial_drained(&self) -> bool;
	/// Stops the port.
	fn stop_port(&self);
}

/// Everything the video engine needs.
pub trait Hardware:
	InterruptControl + TimerControl + DmaControl + GpioControl + PixelPortControl
{
}

impl<T> Hardware for T where
	T: InterruptControl + TimerControl + DmaControl + GpioControl + PixelPortControl
{
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl TransferWidth {
	/// Size of one element in bytes.
	pub const fn bytes(self) -> usize {
		match self {
			TransferWidth::Byte => 1,
			TransferWidth::HalfWord => 2,
			TransferWidth::Word => 4,
		}
	}
}

impl SyncPolarity {
	/// The pin level during the pulse.
	pub const fn enabled(&self) -> bool {
		match self {
			SyncPolarity::Positive => true,
			SyncPolarity::Negative => false,
		}
	}

	/// The pin level outside the pulse.
	pub const fn disabled(&self) -> bool {
		match self {
			SyncPolarity::Positive => false,
			SyncPolarity::Negative => true,
		}
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
