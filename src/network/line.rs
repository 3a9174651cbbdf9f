/// Line-oriented input from a telnet client
///
/// Bytes are passed through a small telnet filter that removes IAC command
/// and negotiation sequences (which may be split across reads), then framed
/// into lines or single keystrokes. A line ends at CR LF, CR NUL, a bare CR
/// or a bare LF.

use crate::error::{MudError, Result};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

const IAC: u8 = 255; // Interpret As Command
const DONT: u8 = 254;
const WILL: u8 = 251;
const SB: u8 = 250; // Subnegotiation Begin
const SE: u8 = 240; // Subnegotiation End

const READ_CHUNK: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TelnetState {
    Data,
    Iac,
    /// Waiting for the option byte of WILL/WONT/DO/DONT
    Negotiate,
    Subnegotiation,
    SubnegotiationIac,
}

/// Strips telnet commands out of a byte stream
#[derive(Debug)]
struct TelnetFilter {
    state: TelnetState,
}

impl TelnetFilter {
    fn new() -> Self {
        Self {
            state: TelnetState::Data,
        }
    }

    /// Append the data bytes of `input` to `out`
    fn filter(&mut self, input: &[u8], out: &mut Vec<u8>) {
        for &byte in input {
            self.state = match (self.state, byte) {
                (TelnetState::Data, IAC) => TelnetState::Iac,
                // NUL follows a bare CR from some clients
                (TelnetState::Data, 0) => TelnetState::Data,
                (TelnetState::Data, b) => {
                    out.push(b);
                    TelnetState::Data
                }
                // Escaped 0xFF data byte
                (TelnetState::Iac, IAC) => {
                    out.push(IAC);
                    TelnetState::Data
                }
                (TelnetState::Iac, WILL..=DONT) => TelnetState::Negotiate,
                (TelnetState::Iac, SB) => TelnetState::Subnegotiation,
                (TelnetState::Iac, command) => {
                    trace!(command, "Ignoring telnet command");
                    TelnetState::Data
                }
                (TelnetState::Negotiate, option) => {
                    trace!(option, "Ignoring telnet negotiation");
                    TelnetState::Data
                }
                (TelnetState::Subnegotiation, IAC) => TelnetState::SubnegotiationIac,
                (TelnetState::Subnegotiation, _) => TelnetState::Subnegotiation,
                (TelnetState::SubnegotiationIac, SE) => TelnetState::Data,
                (TelnetState::SubnegotiationIac, _) => TelnetState::Subnegotiation,
            };
        }
    }
}

/// Buffered reader producing lines or keystrokes
pub struct LineReader<R> {
    inner: R,
    telnet: TelnetFilter,
    buffer: Vec<u8>,
    max_line_len: usize,
    /// The last terminator was a CR, so a leading LF belongs to it
    after_cr: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R, max_line_len: usize) -> Self {
        Self {
            inner,
            telnet: TelnetFilter::new(),
            buffer: Vec::new(),
            max_line_len,
            after_cr: false,
        }
    }

    /// Read the next line without its CR/LF terminator
    ///
    /// End of stream is `ConnectionClosed`; a line over the length limit is
    /// `LineTooLong`.
    pub async fn read_line(&mut self) -> Result<String> {
        loop {
            self.skip_lf_after_cr();

            if let Some(end) = self.buffer.iter().position(|&b| b == b'\r' || b == b'\n') {
                let line: Vec<u8> = self.buffer.drain(..end).collect();
                self.after_cr = self.buffer.remove(0) == b'\r';
                self.skip_lf_after_cr();
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }

            if self.buffer.len() > self.max_line_len {
                return Err(MudError::LineTooLong {
                    max: self.max_line_len,
                });
            }

            self.fill().await?;
        }
    }

    /// Read one keystroke
    ///
    /// Line-buffered clients send the key followed by CR/LF; the terminator
    /// is discarded, here or when it shows up at the start of the next read.
    pub async fn read_key(&mut self) -> Result<String> {
        loop {
            self.skip_terminators();

            if !self.buffer.is_empty() {
                let key = self.buffer.remove(0);
                self.skip_terminators();

                return Ok(String::from_utf8_lossy(&[key]).into_owned());
            }

            self.fill().await?;
        }
    }

    /// Drop leading CR/LF bytes, remembering whether a CR was the last one
    fn skip_terminators(&mut self) {
        let skip = self.buffer.iter().take_while(|&&b| b == b'\r' || b == b'\n').count();
        if skip > 0 {
            self.after_cr = self.buffer[skip - 1] == b'\r';
            self.buffer.drain(..skip);
        }
    }

    /// Drop the LF of a CR LF pair whose CR ended the previous read
    fn skip_lf_after_cr(&mut self) {
        if !self.after_cr || self.buffer.is_empty() {
            return;
        }
        if self.buffer[0] == b'\n' {
            self.buffer.remove(0);
        }
        self.after_cr = false;
    }

    async fn fill(&mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.inner.read(&mut chunk).await?;

        if n == 0 {
            return Err(MudError::ConnectionClosed);
        }

        self.telnet.filter(&chunk[..n], &mut self.buffer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_reads_crlf_lines() {
        let mock = Builder::new().read(b"look\r\nsay hi\r\n").build();
        let mut reader = LineReader::new(mock, 4096);

        assert_eq!(reader.read_line().await.unwrap(), "look");
        assert_eq!(reader.read_line().await.unwrap(), "say hi");
    }

    #[tokio::test]
    async fn test_line_split_across_reads() {
        let mock = Builder::new().read(b"hel").read(b"lo\r").read(b"\n").build();
        let mut reader = LineReader::new(mock, 4096);

        assert_eq!(reader.read_line().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_cr_nul_ends_line() {
        let mock = Builder::new().read(b"look\r\0").read(b"north\r\0").build();
        let mut reader = LineReader::new(mock, 4096);

        assert_eq!(reader.read_line().await.unwrap(), "look");
        assert_eq!(reader.read_line().await.unwrap(), "north");
    }

    #[tokio::test]
    async fn test_lf_after_split_cr_is_not_an_empty_line() {
        let mock = Builder::new().read(b"a\r").read(b"\nb\n").read(b"\r\n").build();
        let mut reader = LineReader::new(mock, 4096);

        assert_eq!(reader.read_line().await.unwrap(), "a");
        assert_eq!(reader.read_line().await.unwrap(), "b");
        assert_eq!(reader.read_line().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_strips_telnet_negotiation() {
        let mock = Builder::new()
            .read(&[IAC, WILL, 31, b'n', IAC, SB, 24, 0, b'x', IAC])
            .read(&[SE, b'\r', b'\n'])
            .build();
        let mut reader = LineReader::new(mock, 4096);

        assert_eq!(reader.read_line().await.unwrap(), "n");
    }

    #[tokio::test]
    async fn test_escaped_iac_is_data() {
        let mock = Builder::new().read(&[b'a', IAC, IAC, b'\n']).build();
        let mut reader = LineReader::new(mock, 4096);

        let line = reader.read_line().await.unwrap();
        assert_eq!(line.chars().count(), 2);
        assert!(line.starts_with('a'));
    }

    #[tokio::test]
    async fn test_eof_is_connection_closed() {
        let mock = Builder::new().read(b"partial").build();
        let mut reader = LineReader::new(mock, 4096);

        assert!(matches!(reader.read_line().await, Err(MudError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_line_too_long() {
        let mock = Builder::new().read(&[b'a'; 64]).build();
        let mut reader = LineReader::new(mock, 16);

        assert!(matches!(
            reader.read_line().await,
            Err(MudError::LineTooLong { max: 16 })
        ));
    }

    #[tokio::test]
    async fn test_key_discards_line_terminator() {
        let mock = Builder::new().read(b"y\r\n").read(b"\r\nn").build();
        let mut reader = LineReader::new(mock, 4096);

        assert_eq!(reader.read_key().await.unwrap(), "y");
        assert_eq!(reader.read_key().await.unwrap(), "n");
    }

    #[tokio::test]
    async fn test_key_then_line_share_buffer() {
        let mock = Builder::new().read(b"q\r\nnorth\r\n").build();
        let mut reader = LineReader::new(mock, 4096);

        assert_eq!(reader.read_key().await.unwrap(), "q");
        assert_eq!(reader.read_line().await.unwrap(), "north");
    }
}
