/// Line-oriented output to a telnet client

use crate::error::Result;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Carriage return plus "erase entire line"
const CLEAR_LINE: &str = "\r\x1b[2K";

pub struct LineWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write text as-is; used for prompts
    pub async fn write_str(&mut self, text: &str) -> Result<()> {
        self.inner.write_all(text.as_bytes()).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Write text followed by CR/LF, normalising embedded newlines
    pub async fn write_line(&mut self, text: &str) -> Result<()> {
        let mut out = String::with_capacity(text.len() + 2);
        for line in text.split('\n') {
            out.push_str(line.trim_end_matches('\r'));
            out.push_str("\r\n");
        }
        self.write_str(&out).await
    }

    /// Erase whatever is on the current line, typically a half-typed prompt
    pub async fn clear_line(&mut self) -> Result<()> {
        self.write_str(CLEAR_LINE).await
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await?;
        Ok(())
    }
}
