//! Line-oriented text console on USART6.
//!
//! Pins:
//! - PC6: TX
//!
//! Output only. Reports are formatted into a fixed buffer and sent in one
//! DMA transfer so a tick never blocks on a half-written line.

use core::fmt::Write;

use embassy_stm32::mode::Async;
use embassy_stm32::usart::{self, UartTx};
use heapless::String;

use linetrack_core::diagnostics::Report;

/// Largest message the console will format.
const BUFFER_SIZE: usize = 2048;

/// Console write failure.
#[derive(Debug)]
pub enum ConsoleError {
    /// The UART transfer failed.
    Uart(usart::Error),
    /// The message did not fit in the format buffer.
    Overflow,
}

impl From<usart::Error> for ConsoleError {
    fn from(err: usart::Error) -> Self {
        ConsoleError::Uart(err)
    }
}

/// Text console over the UART transmitter.
pub struct Console<'d> {
    tx: UartTx<'d, Async>,
    buf: String<BUFFER_SIZE>,
}

impl<'d> Console<'d> {
    /// Create a new console instance
    pub fn new(tx: UartTx<'d, Async>) -> Self {
        Self {
            tx,
            buf: String::new(),
        }
    }

    /// Write raw bytes
    pub async fn write(&mut self, data: &[u8]) -> Result<(), ConsoleError> {
        self.tx.write(data).await?;
        Ok(())
    }

    /// Write one line, CRLF terminated
    pub async fn write_line(&mut self, line: &str) -> Result<(), ConsoleError> {
        self.write(line.as_bytes()).await?;
        self.write(b"\r\n").await
    }

    /// Format and send a full frame report
    pub async fn write_report(&mut self, report: &Report<'_>) -> Result<(), ConsoleError> {
        self.buf.clear();
        write!(self.buf, "{}", report).map_err(|_| ConsoleError::Overflow)?;
        self.tx.write(self.buf.as_bytes()).await?;
        Ok(())
    }
}
