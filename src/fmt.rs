//! Logging macros.
//!
//! These forward to `defmt` when the `defmt` feature is on. Otherwise they
//! evaluate nothing, but still borrow their arguments so a disabled log line
//! doesn't leave unused variables behind.

#![allow(unused_macros)]

macro_rules! debug {
	($s:literal $(, $x:expr)* $(,)?) => {
		{
			#[cfg(feature = "defmt")]
			::defmt::debug!($s $(, $x)*);
			#[cfg(not(feature = "defmt"))]
			let _ = ($( & $x ),*);
		}
	};
}

macro_rules! info {
	($s:literal $(, $x:expr)* $(,)?) => {
		{
			#[cfg(feature = "defmt")]
			::defmt::info!($s $(, $x)*);
			#[cfg(not(feature = "defmt"))]
			let _ = ($( & $x ),*);
		}
	};
}

macro_rules! warn {
	($s:literal $(, $x:expr)* $(,)?) => {
		{
			#[cfg(feature = "defmt")]
			::defmt::warn!($s $(, $x)*);
			#[cfg(not(feature = "defmt"))]
			let _ = ($( & $x ),*);
		}
	};
}

// End of file
