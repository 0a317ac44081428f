//! # Neotron Pico Video
//!
//! Real-time VGA (mono and 8-bit colour) and NTSC/PAL composite video,
//! generated entirely by one DMA channel, two timers and three interrupt
//! handlers.
//!
//! The [`video::Engine`] is hardware agnostic - it drives the peripherals
//! through the traits in [`video::hw`]. With the `rp2040` feature enabled, the
//! [`rp2040`] module provides the register-level binding for a Raspberry Pi
//! Pico clocked at 84 MHz.

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

#![cfg_attr(not(test), no_std)]

// -----------------------------------------------------------------------------
// Sub-modules
// -----------------------------------------------------------------------------

#[macro_use]
mod fmt;

pub mod api;
#[cfg(any(test, feature = "rp2040"))]
mod pixel_programs;
#[cfg(feature = "rp2040")]
pub mod rp2040;
pub mod video;

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
