//! Line-oriented source over any async reader.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tracing::{debug, warn};

use super::{SourceError, UrlSource, STDIN_NAME};
use crate::loader::BoxFuture;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Reads lines from a file, standard input or any other reader.
///
/// Line terminators (`\n` and `\r\n`) are stripped. Leading lines requested
/// through [`with_skip`](Self::with_skip) are discarded on the first pull.
pub struct LineSource {
    name: String,
    lines: Lines<BufReader<BoxedReader>>,
    pending_skip: u64,
}

impl std::fmt::Debug for LineSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineSource")
            .field("name", &self.name)
            .field("pending_skip", &self.pending_skip)
            .finish()
    }
}

impl LineSource {
    /// Wrap a reader.
    pub fn from_reader<R>(name: impl Into<String>, reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let reader: BoxedReader = Box::new(reader);
        Self {
            name: name.into(),
            lines: BufReader::new(reader).lines(),
            pending_skip: 0,
        }
    }

    /// Open a named input; `-` is standard input.
    pub async fn open(input: &str, skip: u64) -> Result<Self, SourceError> {
        if input == STDIN_NAME {
            return Ok(Self::from_reader("stdin", tokio::io::stdin()).with_skip(skip));
        }

        let file = tokio::fs::File::open(input)
            .await
            .map_err(|source| SourceError::Open {
                name: input.to_string(),
                source,
            })?;
        debug!(input, skip, "Opened input");
        Ok(Self::from_reader(input, file).with_skip(skip))
    }

    /// Discard `skip` leading lines before the first line is returned.
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.pending_skip = skip;
        self
    }

    /// Read the next line.
    pub async fn read_line(&mut self) -> Result<Option<String>, SourceError> {
        if self.pending_skip > 0 && !self.skip_leading().await? {
            return Ok(None);
        }

        self.lines
            .next_line()
            .await
            .map_err(|source| SourceError::Read {
                name: self.name.clone(),
                source,
            })
    }

    // Returns false when the input ended while skipping.
    async fn skip_leading(&mut self) -> Result<bool, SourceError> {
        let wanted = std::mem::take(&mut self.pending_skip);
        for skipped in 0..wanted {
            let line = self
                .lines
                .next_line()
                .await
                .map_err(|source| SourceError::Skip {
                    name: self.name.clone(),
                    source,
                })?;
            if line.is_none() {
                warn!(
                    input = %self.name,
                    skipped,
                    wanted,
                    "Input ended before the requested lines were skipped"
                );
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl UrlSource for LineSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_line(&mut self) -> BoxFuture<'_, Result<Option<String>, SourceError>> {
        Box::pin(self.read_line())
    }
}
