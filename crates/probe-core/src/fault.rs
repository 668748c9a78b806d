//! Located failures and the fatal diagnostic
//!
//! [`Checked::check`] turns an engine error into a [`Fault`] tagged with the
//! source location of the call that failed, so the printed diagnostic points
//! at the sensor step rather than at the engine internals.

use core::panic::Location;

use embedded_io::Write;

use crate::error::{Error, Result};
use crate::printer::DiagnosticPrinter;

/// Result of a harness step
pub type ProbeResult<T = ()> = core::result::Result<T, Fault>;

/// An engine error and the place it was checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault {
    /// The underlying error
    pub error: Error,
    /// Source file of the failing step
    pub file: &'static str,
    /// Source line of the failing step
    pub line: u32,
}

impl Fault {
    /// Fault for `error` located at the caller.
    #[track_caller]
    pub fn capture(error: Error) -> Self {
        let location = Location::caller();
        Self {
            error,
            file: location.file(),
            line: location.line(),
        }
    }

    /// Code printed in the diagnostic
    #[inline]
    pub const fn code(&self) -> u32 {
        self.error.code()
    }

    /// Print the fatal diagnostic line:
    ///
    /// ```text
    /// \nerr_code: 0x00008001 file: src/sensors/mcp9808.rs line: 0x0000004A\r\n
    /// ```
    pub fn print<W: Write>(&self, out: &mut DiagnosticPrinter<W>) -> Result<()> {
        out.put_str("\nerr_code: 0x")?;
        out.put_hex_32(self.code())?;
        out.put_str(" file: ")?;
        out.put_str(self.file)?;
        out.put_str(" line: 0x")?;
        out.put_hex_32(self.line)?;
        out.put_str("\r\n")?;
        out.flush()
    }
}

/// Attach the caller's location to a failed engine result.
pub trait Checked<T> {
    /// Pass `Ok` through; turn `Err` into a [`Fault`] at the call site.
    #[track_caller]
    fn check(self) -> ProbeResult<T>;
}

impl<T> Checked<T> for Result<T> {
    #[track_caller]
    #[inline]
    fn check(self) -> ProbeResult<T> {
        match self {
            Ok(value) => Ok(value),
            Err(error) => Err(Fault::capture(error)),
        }
    }
}

/// Idle forever.
pub fn halt() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BusPhase;
    use crate::sim::CaptureSink;

    #[test]
    fn test_check_records_call_site() {
        let failed: Result<()> = Err(Error::Output);
        let expected_line = line!() + 1;
        let fault = failed.check().unwrap_err();

        assert_eq!(fault.line, expected_line);
        assert!(fault.file.ends_with("fault.rs"));
    }

    #[test]
    fn test_check_passes_value_through() {
        let ok: Result<u8> = Ok(0x33);
        assert_eq!(ok.check(), Ok(0x33));
    }

    #[test]
    fn test_fatal_diagnostic_format() {
        let fault = Fault {
            error: Error::Bus {
                code: 0x8001,
                phase: BusPhase::Write,
            },
            file: "src/main.rs",
            line: 0x4A,
        };
        let mut out = DiagnosticPrinter::new(CaptureSink::<128>::new());

        fault.print(&mut out).unwrap();

        assert_eq!(
            out.sink().as_str(),
            "\nerr_code: 0x00008001 file: src/main.rs line: 0x0000004A\r\n"
        );
    }
}
