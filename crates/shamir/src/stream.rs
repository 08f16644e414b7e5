//! Chunked encoding of a secret stream into N piece streams, and back.
//!
//! Each piece stream starts with a two-line header, `"<index>\n<prime>\n"`,
//! followed by one big-endian `u16` per secret byte. The encoder reads the
//! secret in fixed windows and appends each window's values to every sink;
//! the decoder reads the matching windows from all sources in lockstep.
use std::io::{self, BufRead, Read, Write};

use log::{debug, info, warn};

use crate::field::Prime;
use crate::poly;
use crate::progress::{NoProgress, Progress};
use crate::share::{Piece, VALUE_WIDTH};
use crate::validate::{self, MIN_POINTS};
use crate::{Result, Shamir, ShamirError};

/// Secret bytes processed per window.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Largest window a run will allocate; larger chunk sizes are clamped to it.
pub const MAX_CHUNK_SIZE: usize = 1 << 20;

/// Longest accepted header line, newline included.
const MAX_HEADER_LINE: u64 = 16;

/// Lifecycle of an encode or decode run. `Failed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Header,
    Data,
    Complete,
    Failed,
}

/// The index and prime stored at the top of every piece stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceHeader {
    pub index: u32,
    pub prime: u32,
}

impl PieceHeader {
    pub fn new(index: u32, prime: Prime) -> Self {
        Self {
            index,
            prime: prime.value(),
        }
    }

    /// Writes `"<index>\n<prime>\n"`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write!(writer, "{}\n{}\n", self.index, self.prime)
    }

    /// Reads a header, returning it with the number of bytes it occupied.
    ///
    /// # Errors
    /// Returns `ShamirError::MalformedShare` if either line is missing, is
    /// not newline-terminated, or does not hold a decimal integer.
    pub fn read_from<R: BufRead>(reader: &mut R) -> Result<(Self, usize)> {
        let (index, index_len) = read_number(reader, "index")?;
        let (prime, prime_len) = read_number(reader, "prime")?;
        Ok((Self { index, prime }, index_len + prime_len))
    }
}

fn read_number<R: BufRead>(reader: &mut R, field: &str) -> Result<(u32, usize)> {
    let mut line = Vec::new();
    let len = reader
        .by_ref()
        .take(MAX_HEADER_LINE)
        .read_until(b'\n', &mut line)?;

    if line.last() != Some(&b'\n') {
        return Err(ShamirError::MalformedShare(format!(
            "header {} line is missing or unterminated",
            field
        )));
    }

    let number = std::str::from_utf8(&line)
        .ok()
        .and_then(|text| text.trim().parse().ok())
        .ok_or_else(|| {
            ShamirError::MalformedShare(format!(
                "header {} line {:?} is not a number",
                field,
                String::from_utf8_lossy(&line).trim_end()
            ))
        })?;

    Ok((number, len))
}

/// Tuning for stream runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    /// Secret bytes per window. Zero is treated as one and anything above
    /// [`MAX_CHUNK_SIZE`] as `MAX_CHUNK_SIZE`.
    pub chunk_size: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl StreamOptions {
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    fn window(&self) -> usize {
        self.chunk_size.clamp(1, MAX_CHUNK_SIZE)
    }
}

/// Splits a secret stream into one piece stream per sink.
///
/// Sink `i` receives the piece with index `i + 1`.
///
/// # Examples
/// ```
/// use shardline_shamir::{Decoder, Encoder, NoProgress, Shamir};
/// use rand_chacha::rand_core::SeedableRng;
///
/// let scheme = Shamir::new(4, 3).unwrap();
/// let mut rng = rand_chacha::ChaCha8Rng::from_seed([0; 32]);
/// let mut outputs = vec![Vec::new(); 4];
///
/// let encoder = Encoder::new(scheme, outputs.iter_mut().collect()).unwrap();
/// encoder
///     .encode(&mut &b"streamed secret"[..], &mut rng, &mut NoProgress)
///     .unwrap();
///
/// let sources = outputs[1..].iter().map(|bytes| &bytes[..]).collect();
/// let mut recovered = Vec::new();
/// Decoder::open(sources)
///     .unwrap()
///     .decode(&mut recovered, &mut NoProgress)
///     .unwrap();
/// assert_eq!(recovered, b"streamed secret");
/// ```
pub struct Encoder<W: Write> {
    scheme: Shamir,
    sinks: Vec<W>,
    options: StreamOptions,
    phase: Phase,
}

impl<W: Write> Encoder<W> {
    /// # Errors
    /// Returns `ShamirError::SinkCountMismatch` unless there is exactly one
    /// sink per piece.
    pub fn new(scheme: Shamir, sinks: Vec<W>) -> Result<Self> {
        if sinks.len() != scheme.pieces() as usize {
            return Err(ShamirError::SinkCountMismatch {
                expected: scheme.pieces(),
                found: sinks.len(),
            });
        }

        Ok(Self {
            scheme,
            sinks,
            options: StreamOptions::default(),
            phase: Phase::Idle,
        })
    }

    pub fn with_options(mut self, options: StreamOptions) -> Self {
        self.options = options;
        self
    }

    /// Encodes all of `input`, returning the number of secret bytes read.
    ///
    /// Headers are written even when `input` is empty. `progress` advances
    /// by the size of each window once its values reach every sink.
    pub fn encode<R, G, P>(mut self, input: &mut R, rng: &mut G, progress: &mut P) -> Result<u64>
    where
        R: Read + ?Sized,
        G: rand::Rng + ?Sized,
        P: Progress + ?Sized,
    {
        let result = self.run(input, rng, progress);
        if let Err(err) = &result {
            warn!("encode failed: {}", err);
            self.enter(Phase::Failed);
        }
        result
    }

    fn run<R, G, P>(&mut self, input: &mut R, rng: &mut G, progress: &mut P) -> Result<u64>
    where
        R: Read + ?Sized,
        G: rand::Rng + ?Sized,
        P: Progress + ?Sized,
    {
        let prime = self.scheme.prime();

        self.enter(Phase::Header);
        for (index, sink) in (1..).zip(self.sinks.iter_mut()) {
            PieceHeader::new(index, prime).write_to(sink)?;
        }

        self.enter(Phase::Data);
        let mut chunk = vec![0u8; self.options.window()];
        let mut packed = Vec::with_capacity(chunk.len() * VALUE_WIDTH);
        let mut total = 0u64;

        loop {
            let read = read_full(input, &mut chunk)?;
            if read == 0 {
                break;
            }

            let pieces = self
                .scheme
                .generate_buffer(&chunk[..read], rng, &mut NoProgress)?;
            for (piece, sink) in pieces.iter().zip(self.sinks.iter_mut()) {
                packed.clear();
                crate::share::encode_values(piece.values(), &mut packed);
                sink.write_all(&packed)?;
            }

            total += read as u64;
            debug!("encoded {} bytes ({} total)", read, total);
            progress.advance(read as u64)?;
        }

        for sink in &mut self.sinks {
            sink.flush()?;
        }

        self.enter(Phase::Complete);
        info!(
            "split {} bytes into {} pieces (threshold {}, prime {})",
            total,
            self.scheme.pieces(),
            self.scheme.threshold(),
            prime
        );
        Ok(total)
    }

    fn enter(&mut self, phase: Phase) {
        debug!("encoder: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }
}

/// Rebuilds a secret stream from piece streams.
///
/// Headers are read and checked by [`Decoder::open`], before anything is
/// written anywhere.
pub struct Decoder<R: BufRead> {
    sources: Vec<R>,
    headers: Vec<PieceHeader>,
    prime: Prime,
    options: StreamOptions,
    phase: Phase,
}

impl<R: BufRead> Decoder<R> {
    /// Reads and validates the header of every source.
    ///
    /// # Errors
    /// * `ShamirError::InsufficientPoints` - fewer than three sources
    /// * `ShamirError::MalformedShare` - an unreadable header or an index
    ///   outside `1..prime`
    /// * `ShamirError::DuplicateIndex` / `ShamirError::PrimeMismatch`
    /// * `ShamirError::InvalidPrime` - the shared prime is unusable
    pub fn open(mut sources: Vec<R>) -> Result<Self> {
        if sources.len() < MIN_POINTS {
            return Err(ShamirError::InsufficientPoints {
                required: MIN_POINTS,
                provided: sources.len(),
            });
        }

        let headers = sources
            .iter_mut()
            .map(|source| PieceHeader::read_from(source).map(|(header, _)| header))
            .collect::<Result<Vec<_>>>()?;

        validate::validate_headers(&headers)?;
        let prime = Prime::new(headers[0].prime)?;

        if let Some(header) = headers
            .iter()
            .find(|header| header.index == 0 || header.index >= prime.value())
        {
            return Err(ShamirError::MalformedShare(format!(
                "index {} is outside 1..{}",
                header.index, prime
            )));
        }

        debug!(
            "decoder opened {} pieces with prime {}",
            headers.len(),
            prime
        );

        Ok(Self {
            sources,
            headers,
            prime,
            options: StreamOptions::default(),
            phase: Phase::Header,
        })
    }

    pub fn with_options(mut self, options: StreamOptions) -> Self {
        self.options = options;
        self
    }

    pub fn headers(&self) -> &[PieceHeader] {
        &self.headers
    }

    pub fn prime(&self) -> Prime {
        self.prime
    }

    /// Decodes every window into `sink`, returning the number of secret
    /// bytes written.
    ///
    /// # Errors
    /// * `ShamirError::MismatchedShareLengths` - a source ends before the others
    /// * `ShamirError::MalformedShare` - the sources end partway through a value
    /// * Any interpolation error for the window being decoded
    pub fn decode<W, P>(mut self, sink: &mut W, progress: &mut P) -> Result<u64>
    where
        W: Write + ?Sized,
        P: Progress + ?Sized,
    {
        let result = self.run(sink, progress);
        if let Err(err) = &result {
            warn!("decode failed: {}", err);
            self.enter(Phase::Failed);
        }
        result
    }

    fn run<W, P>(&mut self, sink: &mut W, progress: &mut P) -> Result<u64>
    where
        W: Write + ?Sized,
        P: Progress + ?Sized,
    {
        self.enter(Phase::Data);

        let window = self.options.window() * VALUE_WIDTH;
        let mut buffers = vec![vec![0u8; window]; self.sources.len()];
        let mut total = 0u64;

        loop {
            let mut lengths = Vec::with_capacity(buffers.len());
            for (source, buffer) in self.sources.iter_mut().zip(buffers.iter_mut()) {
                lengths.push(read_full(source, buffer)?);
            }

            let expected = lengths[0];
            if let Some(&found) = lengths.iter().find(|&&len| len != expected) {
                return Err(ShamirError::MismatchedShareLengths { expected, found });
            }
            if expected == 0 {
                break;
            }

            let pieces = self
                .headers
                .iter()
                .zip(&buffers)
                .map(|(header, buffer)| Piece::from_bytes(header.index, &buffer[..expected]))
                .collect::<Result<Vec<_>>>()?;

            let secret = poly::interpolate_buffer(&pieces, self.prime, &mut NoProgress)?;
            sink.write_all(&secret)?;

            total += secret.len() as u64;
            debug!("decoded {} bytes ({} total)", secret.len(), total);
            progress.advance(secret.len() as u64)?;
        }

        sink.flush()?;

        self.enter(Phase::Complete);
        info!(
            "recovered {} bytes from {} pieces",
            total,
            self.sources.len()
        );
        Ok(total)
    }

    fn enter(&mut self, phase: Phase) {
        debug!("decoder: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }
}

/// Fills `buf` unless the reader runs dry first; returns the bytes read.
fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}
