//! Log macros routed to `defmt`, `log`, or nowhere depending on features.
#![allow(unused_imports)]

#[cfg(feature = "defmt")]
pub(crate) use defmt::{debug, error, info, trace, warn};

#[cfg(all(feature = "log", not(feature = "defmt")))]
pub(crate) use log::{debug, error, info, trace, warn};

#[cfg(not(any(feature = "log", feature = "defmt")))]
mod silent {
    // Arguments are still evaluated so disabled logging doesn't leave unused bindings behind.
    macro_rules! trace {
        ($fmt:literal $(, $x:expr )* $(,)?) => {{ $( let _ = &$x; )* }};
    }
    macro_rules! debug {
        ($fmt:literal $(, $x:expr )* $(,)?) => {{ $( let _ = &$x; )* }};
    }
    macro_rules! info {
        ($fmt:literal $(, $x:expr )* $(,)?) => {{ $( let _ = &$x; )* }};
    }
    macro_rules! warner {
        ($fmt:literal $(, $x:expr )* $(,)?) => {{ $( let _ = &$x; )* }};
    }
    macro_rules! error {
        ($fmt:literal $(, $x:expr )* $(,)?) => {{ $( let _ = &$x; )* }};
    }

    pub(crate) use warner as warn;
    pub(crate) use {debug, error, info, trace};
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
pub(crate) use silent::{debug, error, info, trace, warn};
