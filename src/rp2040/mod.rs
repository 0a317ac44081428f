//! # RP2040 binding for the video engine
//!
//! Maps the engine's peripheral traits onto a Raspberry Pi Pico:
//!
//! | Job                | Peripheral                     | Pins           |
//! |:-------------------|:-------------------------------|:---------------|
//! | Horizontal timer   | PWM slice 0, channel A         | GPIO16 (H-Sync)|
//! | V-Sync             | SIO                            | GPIO17         |
//! | Line timer         | PIO0 SM0, raising PIO0 IRQ 0   | -              |
//! | Pixel port         | PIO0 SM1                       | GPIO0..=7      |
//! | Pixel DMA          | DMA channel 0, IRQ 0           | -              |
//!
//! Mono video uses GPIO0 only. Colour and composite use GPIO0 (LSB) to GPIO7
//! (MSB), which for colour is `B0 B1 G0 G1 G2 R0 R1 R2`.
//!
//! The two state machines are set up through the HAL whenever a mode starts,
//! with their programs assembled to suit the mode. Everything an interrupt
//! handler calls goes straight to the registers.

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

use core::cell::RefCell;

use cortex_m::peripheral::NVIC;
use critical_section::Mutex;
use pio::{
	Instruction, InstructionOperands, MovDestination, MovOperation, MovSource, Program,
	SetDestination, RP2040_MAX_PROGRAM_SIZE,
};
use rp2040_hal::{
	pac::{self, Interrupt},
	pio::{
		Buffers, PIOBuilder, PIOExt, PinDir, Running, Rx, ShiftDirection, StateMachine,
		StateMachineIndex, Stopped, Tx, UninitStateMachine, PIO, SM0, SM1,
	},
};

use crate::pixel_programs;
use crate::video::hw::{
	DmaControl, GpioControl, InterruptControl, Irq, PinRoute, PixelPortControl, PixelSink,
	Priority, SyncPolarity, TimerControl, TransferWidth,
};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// The video peripherals on an RP2040.
pub struct Rp2040Video {
	pio: Mutex<RefCell<Option<VideoPio>>>,
}

/// PIO0, split into the two state machines we use.
struct VideoPio {
	block: PIO<pac::PIO0>,
	line_timer: Option<Machine<SM0>>,
	pixels: Option<Machine<SM1>>,
}

/// A PIO0 state machine, either parked or running a program.
enum Machine<SM: StateMachineIndex> {
	Idle(UninitStateMachine<(pac::PIO0, SM)>),
	Running(
		StateMachine<(pac::PIO0, SM), Running>,
		Rx<(pac::PIO0, SM)>,
		Tx<(pac::PIO0, SM)>,
	),
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

const PIXEL_SM: usize = 1;
const PIXEL_DMA_CHAN: usize = 0;
/// The PWM slice on GPIO16. The interrupt bits below are for this slice.
const HSYNC_PWM_SLICE: usize = 0;

const HSYNC_PIN: usize = 16;
const VSYNC_PIN: usize = 17;
const PIXEL_PIN_BASE: u8 = 0;
const PIXEL_PIN_COUNT: u8 = 8;

/// The line timer loop takes this many clocks more than its count.
const LINE_TIMER_OVERHEAD: u32 = 3;

/// GPIO function numbers
const FUNCSEL_PWM: u8 = 4;
const FUNCSEL_SIO: u8 = 5;
const FUNCSEL_PIO0: u8 = 6;
const FUNCSEL_NULL: u8 = 31;

/// The DREQ for PIO0 TX FIFO 1
const DREQ_PIO0_TX1: u8 = 1;

/// CTRL.EN, for the alias register that has no fields
const DMA_CTRL_EN: u32 = 1 << 0;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl Rp2040Video {
	/// Make the binding. Call [`Rp2040Video::init`] before starting a mode.
	pub const fn new() -> Rp2040Video {
		Rp2040Video {
			pio: Mutex::new(RefCell::new(None)),
		}
	}

	/// Take PIO0, PWM and DMA out of reset and claim PIO0's state machines.
	///
	/// If we don't reset the DMA engine first, starting from a debugger (as
	/// opposed to a cold-start) is unreliable.
	pub fn init(&self, pio: pac::PIO0, resets: &mut pac::RESETS) {
		resets
			.reset()
			.modify(|_r, w| w.dma().set_bit().pwm().set_bit());
		cortex_m::asm::nop();
		resets
			.reset()
			.modify(|_r, w| w.dma().clear_bit().pwm().clear_bit());
		loop {
			let done = resets.reset_done().read();
			if done.dma().bit_is_set() && done.pwm().bit_is_set() {
				break;
			}
		}

		// Grab PIO0 and the state machines it contains
		let (block, sm0, sm1, _sm2, _sm3) = pio.split(resets);
		// The line timer raises flag 0, which we route to PIO0_IRQ_0
		block.irq0().enable_sm_interrupt(0);

		critical_section::with(|cs| {
			self.pio.borrow_ref_mut(cs).replace(VideoPio {
				block,
				line_timer: Some(Machine::Idle(sm0)),
				pixels: Some(Machine::Idle(sm1)),
			});
		});

		debug!("Video peripherals ready");
	}

	/// Run `f` on PIO0. Does nothing before [`Rp2040Video::init`].
	fn with_pio(&self, f: impl FnOnce(&mut VideoPio)) {
		critical_section::with(|cs| {
			if let Some(pio) = self.pio.borrow_ref_mut(cs).as_mut() {
				f(pio);
			}
		});
	}

	fn set_funcsel(&self, pin: usize, funcsel: u8) {
		io_bank0()
			.gpio(pin)
			.gpio_ctrl()
			.write(|w| unsafe { w.funcsel().bits(funcsel) });
	}

	fn drive_low(&self, pin: usize) {
		let sio = sio();
		sio.gpio_out_clr().write(|w| unsafe { w.bits(1 << pin) });
		sio.gpio_oe_set().write(|w| unsafe { w.bits(1 << pin) });
		self.set_funcsel(pin, FUNCSEL_SIO);
	}
}

impl Default for Rp2040Video {
	fn default() -> Self {
		Rp2040Video::new()
	}
}

/// Stop a state machine and take its program out of instruction memory.
fn halt<SM: StateMachineIndex>(block: &mut PIO<pac::PIO0>, machine: &mut Option<Machine<SM>>) {
	*machine = match machine.take() {
		Some(Machine::Running(sm, rx, tx)) => {
			let (sm, program) = sm.stop().uninit(rx, tx);
			block.uninstall(program);
			Some(Machine::Idle(sm))
		}
		other => other,
	};
}

/// Load `program` and start it on a state machine, stopping whatever it was
/// running first. `configure` sets up the pins and shifter, and `prepare`
/// runs before the state machine is started.
fn launch<SM: StateMachineIndex>(
	block: &mut PIO<pac::PIO0>,
	machine: &mut Option<Machine<SM>>,
	program: &Program<RP2040_MAX_PROGRAM_SIZE>,
	configure: impl FnOnce(PIOBuilder<pac::PIO0>) -> PIOBuilder<pac::PIO0>,
	prepare: impl FnOnce(&mut StateMachine<(pac::PIO0, SM), Stopped>, &mut Tx<(pac::PIO0, SM)>),
) {
	halt(block, machine);
	let Some(Machine::Idle(uninit)) = machine.take() else {
		return;
	};
	let installed = match block.install(program) {
		Ok(installed) => installed,
		Err(_) => {
			warn!("No room for PIO program");
			*machine = Some(Machine::Idle(uninit));
			return;
		}
	};
	let (mut sm, rx, mut tx) =
		configure(PIOBuilder::from_installed_program(installed)).build(uninit);
	prepare(&mut sm, &mut tx);
	*machine = Some(Machine::Running(sm.start(), rx, tx));
}

/// An instruction to run through `exec_instruction`.
const fn exec(operands: InstructionOperands) -> Instruction {
	Instruction {
		operands,
		delay: 0,
		side_set: None,
	}
}

impl InterruptControl for Rp2040Video {
	fn set_priority(&self, irq: Irq, priority: Priority) {
		// Note (unsafe): we only use the NVIC, and only with interrupts off.
		let mut core = unsafe { cortex_m::Peripherals::steal() };
		unsafe { core.NVIC.set_priority(interrupt(irq), priority_bits(priority)) };
	}

	fn set_background_priority(&self, priority: Priority) {
		let level = u32::from(priority_bits(priority));
		let word = level | level << 8 | level << 16 | level << 24;
		// Note (unsafe): as above.
		let core = unsafe { cortex_m::Peripherals::steal() };
		for ipr in core.NVIC.ipr.iter() {
			unsafe { ipr.write(word) };
		}
	}

	fn enable_irq(&self, irq: Irq) {
		let irq = interrupt(irq);
		NVIC::unpend(irq);
		// Note (unsafe): the handlers only run once a mode is in place.
		unsafe { NVIC::unmask(irq) };
	}

	fn disable_irq(&self, irq: Irq) {
		NVIC::mask(interrupt(irq));
	}

	#[inline(always)]
	fn wait_for_event(&self) {
		cortex_m::asm::wfe();
	}
}

impl TimerControl for Rp2040Video {
	fn start_horizontal(&self, period: u32, pulse: u32, polarity: SyncPolarity) {
		let pwm = pwm();
		let ch = pwm.ch(HSYNC_PWM_SLICE);
		ch.csr().write(|w| w.en().clear_bit());
		ch.div().write(|w| unsafe { w.int().bits(1).frac().bits(0) });
		ch.top().write(|w| unsafe { w.top().bits((period - 1) as u16) });
		// High until the compare, then low for the pulse
		ch.cc().write(|w| unsafe { w.a().bits((period - pulse) as u16) });
		ch.ctr().write(|w| unsafe { w.ctr().bits(0) });
		pwm.intr().write(|w| w.ch0().set_bit());
		pwm.inte().modify(|_r, w| w.ch0().set_bit());
		ch.csr().write(|w| {
			w.a_inv().bit(polarity == SyncPolarity::Positive);
			w.en().set_bit()
		});
	}

	#[inline(always)]
	fn set_horizontal_period(&self, period: u32) {
		pwm()
			.ch(HSYNC_PWM_SLICE)
			.top()
			.write(|w| unsafe { w.top().bits((period - 1) as u16) });
	}

	#[inline(always)]
	fn horizontal_count(&self) -> u32 {
		u32::from(pwm().ch(HSYNC_PWM_SLICE).ctr().read().ctr().bits())
	}

	#[inline(always)]
	fn acknowledge_horizontal(&self) {
		pwm().intr().write(|w| w.ch0().set_bit());
	}

	fn start_line_timer(&self, period: u32) {
		// Fires PIO IRQ 0 every `y + 3` clocks. Post `y` to the FIFO to
		// start it.
		let program = pio_proc::pio_asm!(
			"pull block"
			"out y, 32"
			".wrap_target"
			"irq 0"
			"mov x, y"
			"loop:"
			"jmp x-- loop"
			".wrap"
		);
		self.with_pio(|pio| {
			pio.block.clear_irq(1 << 0);
			launch(
				&mut pio.block,
				&mut pio.line_timer,
				&program.program,
				|builder| builder.buffers(Buffers::OnlyTx).clock_divisor_fixed_point(1, 0),
				|_sm, tx| {
					tx.write(period - LINE_TIMER_OVERHEAD);
				},
			);
		});
	}

	#[inline(always)]
	fn acknowledge_line_timer(&self) {
		pio0().irq().write(|w| unsafe { w.irq().bits(1 << 0) });
	}

	fn stop_timers(&self) {
		self.with_pio(|pio| {
			halt(&mut pio.block, &mut pio.line_timer);
			pio.block.clear_irq(1 << 0);
		});

		let pwm = pwm();
		pwm.ch(HSYNC_PWM_SLICE).csr().write(|w| w.en().clear_bit());
		pwm.inte().modify(|_r, w| w.ch0().clear_bit());
		pwm.intr().write(|w| w.ch0().set_bit());
	}
}

impl DmaControl for Rp2040Video {
	fn configure_transfer(&self, width: TransferWidth, _sink: PixelSink, complete_irq: bool) {
		let dma = dma();
		let ch = dma.ch(PIXEL_DMA_CHAN);
		ch.ch_write_addr()
			.write(|w| unsafe { w.bits(pio0().txf(PIXEL_SM).as_ptr() as u32) });
		// Written with the channel disabled, so this doesn't trigger it
		ch.ch_ctrl_trig().write(|w| {
			match width {
				TransferWidth::Byte => w.data_size().size_byte(),
				TransferWidth::HalfWord => w.data_size().size_halfword(),
				TransferWidth::Word => w.data_size().size_word(),
			};
			w.incr_read().set_bit();
			w.incr_write().clear_bit();
			unsafe { w.treq_sel().bits(DREQ_PIO0_TX1) };
			unsafe { w.chain_to().bits(PIXEL_DMA_CHAN as u8) };
			unsafe { w.ring_size().bits(0) };
			w.ring_sel().clear_bit();
			w.bswap().clear_bit();
			w.irq_quiet().bit(!complete_irq);
			w.high_priority().set_bit();
			w.sniff_en().clear_bit();
			w.en().clear_bit();
			w
		});
		ch.ch_al1_ctrl()
			.modify(|r, w| unsafe { w.bits(r.bits() | DMA_CTRL_EN) });
		dma.ints0()
			.write(|w| unsafe { w.ints0().bits(1 << PIXEL_DMA_CHAN) });
		dma.inte0().modify(|r, w| unsafe {
			let others = r.inte0().bits() & !(1 << PIXEL_DMA_CHAN);
			let ours = if complete_irq { 1 << PIXEL_DMA_CHAN } else { 0 };
			w.inte0().bits(others | ours)
		});
	}

	#[inline(always)]
	fn set_source(&self, address: usize) {
		dma()
			.ch(PIXEL_DMA_CHAN)
			.ch_read_addr()
			.write(|w| unsafe { w.bits(address as u32) });
	}

	#[inline(always)]
	fn source(&self) -> usize {
		dma().ch(PIXEL_DMA_CHAN).ch_read_addr().read().bits() as usize
	}

	#[inline(always)]
	fn start_transfer(&self, count: u32) {
		dma()
			.ch(PIXEL_DMA_CHAN)
			.ch_al1_trans_count_trig()
			.write(|w| unsafe { w.bits(count) });
	}

	#[inline(always)]
	fn acknowledge_transfer(&self) {
		dma()
			.ints0()
			.write(|w| unsafe { w.ints0().bits(1 << PIXEL_DMA_CHAN) });
	}

	fn stop_transfers(&self) {
		let dma = dma();
		dma.inte0().modify(|r, w| unsafe {
			w.inte0().bits(r.inte0().bits() & !(1 << PIXEL_DMA_CHAN))
		});
		dma.chan_abort()
			.write(|w| unsafe { w.chan_abort().bits(1 << PIXEL_DMA_CHAN) });
		while dma.chan_abort().read().chan_abort().bits() & (1 << PIXEL_DMA_CHAN) != 0 {
			cortex_m::asm::nop();
		}
		dma.ch(PIXEL_DMA_CHAN)
			.ch_ctrl_trig()
			.write(|w| w.en().clear_bit());
		dma.ints0()
			.write(|w| unsafe { w.ints0().bits(1 << PIXEL_DMA_CHAN) });
	}

	fn set_bus_priority(&self, dma_first: bool) {
		busctrl()
			.bus_priority()
			.write(|w| w.dma_r().bit(dma_first).dma_w().bit(dma_first));
	}
}

impl GpioControl for Rp2040Video {
	fn configure_sync_pins(&self, vsync_idle: bool) {
		self.set_funcsel(HSYNC_PIN, FUNCSEL_PWM);
		self.set_vsync(vsync_idle);
		sio().gpio_oe_set().write(|w| unsafe { w.bits(1 << VSYNC_PIN) });
		self.set_funcsel(VSYNC_PIN, FUNCSEL_SIO);
	}

	#[inline(always)]
	fn set_vsync(&self, level: bool) {
		let sio = sio();
		if level {
			sio.gpio_out_set().write(|w| unsafe { w.bits(1 << VSYNC_PIN) });
		} else {
			sio.gpio_out_clr().write(|w| unsafe { w.bits(1 << VSYNC_PIN) });
		}
	}

	#[inline(always)]
	fn route_pixel_pins(&self, sink: PixelSink, route: PinRoute) {
		let pins = match sink {
			PixelSink::Serial => 1,
			PixelSink::Parallel => PIXEL_PIN_COUNT,
		};
		for pin in PIXEL_PIN_BASE..PIXEL_PIN_BASE + pins {
			match route {
				PinRoute::Port => self.set_funcsel(usize::from(pin), FUNCSEL_PIO0),
				PinRoute::Gpio => self.drive_low(usize::from(pin)),
			}
		}
	}

	fn release_pins(&self) {
		let mut mask = 1 << HSYNC_PIN | 1 << VSYNC_PIN;
		for pin in PIXEL_PIN_BASE..PIXEL_PIN_BASE + PIXEL_PIN_COUNT {
			mask |= 1 << pin;
		}
		sio().gpio_oe_clr().write(|w| unsafe { w.bits(mask) });
		for pin in (0..32).filter(|pin| mask & (1 << pin) != 0) {
			self.set_funcsel(pin, FUNCSEL_NULL);
		}
	}
}

impl PixelPortControl for Rp2040Video {
	fn start_serial_port(&self, clocks_per_bit: u32) {
		// You must not set a clock divider on a pixel state machine: it
		// makes the start of each line jitter. Stretch the `out` instead.
		let program = pixel_programs::serial(clocks_per_bit);
		self.with_pio(|pio| {
			launch(
				&mut pio.block,
				&mut pio.pixels,
				&program,
				|builder| {
					// Unjoined, so at most four words are queued behind the
					// DMA when it finishes
					builder
						.buffers(Buffers::RxTx)
						.out_pins(PIXEL_PIN_BASE, 1)
						.autopull(true)
						.pull_threshold(16)
						.out_shift_direction(ShiftDirection::Left)
						.clock_divisor_fixed_point(1, 0)
				},
				|sm, _tx| {
					sm.set_pindirs([(PIXEL_PIN_BASE, PinDir::Output)]);
				},
			);
		});
	}

	fn start_parallel_port(&self, clocks_per_sample: u32, width: TransferWidth, idle: u8) {
		let idle = u32::from(idle) * 0x0101_0101;
		let program = pixel_programs::parallel(clocks_per_sample, width);
		self.with_pio(|pio| {
			launch(
				&mut pio.block,
				&mut pio.pixels,
				&program,
				|builder| {
					builder
						.buffers(Buffers::OnlyTx)
						.out_pins(PIXEL_PIN_BASE, PIXEL_PIN_COUNT)
						.out_shift_direction(ShiftDirection::Right)
						.clock_divisor_fixed_point(1, 0)
				},
				|sm, tx| {
					sm.set_pindirs(
						(PIXEL_PIN_BASE..PIXEL_PIN_BASE + PIXEL_PIN_COUNT)
							.map(|pin| (pin, PinDir::Output)),
					);
					// Park the idle level in X
					if idle == 0 {
						sm.exec_instruction(exec(InstructionOperands::SET {
							destination: SetDestination::X,
							data: 0,
						}));
					} else {
						tx.write(idle);
						sm.exec_instruction(exec(InstructionOperands::PULL {
							if_empty: false,
							block: true,
						}));
						sm.exec_instruction(exec(InstructionOperands::MOV {
							destination: MovDestination::X,
							op: MovOperation::None,
							source: MovSource::OSR,
						}));
					}
				},
			);
		});
	}

	#[inline(always)]
	fn serial_drained(&self) -> bool {
		pio0().fstat().read().txempty().bits() & (1 << PIXEL_SM) != 0
	}

	fn stop_port(&self) {
		self.with_pio(|pio| halt(&mut pio.block, &mut pio.pixels));
	}
}

fn interrupt(irq: Irq) -> Interrupt {
	match irq {
		Irq::LineTimer => Interrupt::PIO0_IRQ_0,
		Irq::HorizontalCompare => Interrupt::PWM_IRQ_WRAP,
		Irq::DmaComplete => Interrupt::DMA_IRQ_0,
	}
}

/// The M0+ only has the top two priority bits.
fn priority_bits(priority: Priority) -> u8 {
	match priority {
		Priority::Highest => 0x00,
		Priority::High => 0x40,
		Priority::Medium => 0x80,
		Priority::Lowest => 0xC0,
	}
}

// Note (unsafe): these peripherals belong to the video engine. PIO0 itself is
// owned through `Rp2040Video::pio`; the interrupt handlers only touch its
// IRQ and FIFO status registers.

#[inline(always)]
fn pio0() -> &'static pac::pio0::RegisterBlock {
	unsafe { &*pac::PIO0::ptr() }
}

#[inline(always)]
fn dma() -> &'static pac::dma::RegisterBlock {
	unsafe { &*pac::DMA::ptr() }
}

#[inline(always)]
fn pwm() -> &'static pac::pwm::RegisterBlock {
	unsafe { &*pac::PWM::ptr() }
}

#[inline(always)]
fn sio() -> &'static pac::sio::RegisterBlock {
	unsafe { &*pac::SIO::ptr() }
}

#[inline(always)]
fn io_bank0() -> &'static pac::io_bank0::RegisterBlock {
	unsafe { &*pac::IO_BANK0::ptr() }
}

#[inline(always)]
fn busctrl() -> &'static pac::busctrl::RegisterBlock {
	unsafe { &*pac::BUSCTRL::ptr() }
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
