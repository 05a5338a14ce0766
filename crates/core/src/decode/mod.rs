//! Incremental xz stream decoding.
//!
//! The catalog arrives over the network in arbitrarily sized chunks. Each
//! chunk is pushed through the decoder as soon as it is received, so the
//! compressed body never has to be buffered as a whole.

use thiserror::Error;
use tracing::debug;
use xz2::stream::{Action, Status, Stream};

/// Size of the scratch buffer the decoder writes into.
pub const SCRATCH_SIZE: usize = 64 * 1024;

/// Errors from the stream decoder.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Corrupt xz stream: {0}")]
    Corrupt(String),

    #[error("xz stream ended before its end marker")]
    Truncated,

    #[error("Decoder unusable after an earlier error")]
    Poisoned,
}

/// Streaming xz decoder with an output accumulator.
pub struct StreamDecoder {
    stream: Stream,
    scratch: Box<[u8]>,
    output: Vec<u8>,
    finished: bool,
    poisoned: bool,
}

impl StreamDecoder {
    /// Create a decoder without a memory limit.
    ///
    /// Streams whose integrity check is absent or unsupported are accepted.
    pub fn new() -> Result<Self, DecodeError> {
        let stream = Stream::new_stream_decoder(
            u64::MAX,
            xz2::stream::TELL_NO_CHECK | xz2::stream::TELL_UNSUPPORTED_CHECK,
        )
        .map_err(|e| DecodeError::Corrupt(e.to_string()))?;

        Ok(Self {
            stream,
            scratch: vec![0u8; SCRATCH_SIZE].into_boxed_slice(),
            output: Vec::new(),
            finished: false,
            poisoned: false,
        })
    }

    /// Decode one chunk of compressed input.
    pub fn feed(&mut self, mut chunk: &[u8]) -> Result<(), DecodeError> {
        if self.poisoned {
            return Err(DecodeError::Poisoned);
        }

        loop {
            if self.finished {
                if !chunk.is_empty() {
                    debug!(bytes = chunk.len(), "Ignoring data after end of xz stream");
                }
                return Ok(());
            }

            let (consumed, produced, result) = self.step(chunk, Action::Run);
            chunk = &chunk[consumed..];

            match result {
                Ok(Status::StreamEnd) => self.finished = true,
                Ok(_) | Err(xz2::stream::Error::NoCheck)
                | Err(xz2::stream::Error::UnsupportedCheck) => {}
                Err(e) => return Err(self.poison(DecodeError::Corrupt(e.to_string()))),
            }

            // A full scratch buffer may leave decoded bytes pending inside the
            // decoder even when the input is exhausted.
            let drained = chunk.is_empty() && produced < self.scratch.len();
            let stalled = consumed == 0 && produced == 0;
            if !self.finished && (drained || stalled) {
                return Ok(());
            }
        }
    }

    /// Signal the end of input.
    ///
    /// Fails with [`DecodeError::Truncated`] when the stream has not reached
    /// its end marker.
    pub fn finish(&mut self) -> Result<(), DecodeError> {
        if self.poisoned {
            return Err(DecodeError::Poisoned);
        }

        while !self.finished {
            let (consumed, produced, result) = self.step(&[], Action::Finish);

            match result {
                Ok(Status::StreamEnd) => self.finished = true,
                Ok(Status::MemNeeded) => return Err(self.poison(DecodeError::Truncated)),
                Ok(_) | Err(xz2::stream::Error::NoCheck)
                | Err(xz2::stream::Error::UnsupportedCheck) => {
                    if consumed == 0 && produced == 0 {
                        return Err(self.poison(DecodeError::Truncated));
                    }
                }
                Err(e) => return Err(self.poison(DecodeError::Corrupt(e.to_string()))),
            }
        }

        Ok(())
    }

    /// All bytes decoded so far.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn into_output(self) -> Vec<u8> {
        self.output
    }

    /// Whether the end of the xz stream has been reached.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn step(
        &mut self,
        input: &[u8],
        action: Action,
    ) -> (usize, usize, Result<Status, xz2::stream::Error>) {
        let in_before = self.stream.total_in();
        let out_before = self.stream.total_out();

        let result = self.stream.process(input, &mut self.scratch, action);

        let consumed = (self.stream.total_in() - in_before) as usize;
        let produced = (self.stream.total_out() - out_before) as usize;
        self.output.extend_from_slice(&self.scratch[..produced]);

        (consumed, produced, result)
    }

    fn poison(&mut self, error: DecodeError) -> DecodeError {
        self.poisoned = true;
        error
    }
}
