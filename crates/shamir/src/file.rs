//! Path-based splitting and recovery of files.
//!
//! Pieces of `dir/name.ext` are written beside it as `dir/name-<index>.shard`.
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use log::info;

use crate::field::Prime;
use crate::progress::Progress;
use crate::stream::{Decoder, Encoder, StreamOptions};
use crate::validate;
use crate::{Result, Shamir};

/// Extension of every piece file.
pub const PIECE_EXTENSION: &str = "shard";

/// Path of piece `index` for `input`.
///
/// Only the last extension is dropped, so `archive.tar.gz` yields
/// `archive.tar-1.shard`.
///
/// # Examples
/// ```
/// use shardline_shamir::file::piece_path;
/// use std::path::Path;
///
/// let path = piece_path(Path::new("backup/archive.tar.gz"), 2).unwrap();
/// assert_eq!(path, Path::new("backup/archive.tar-2.shard"));
/// ```
pub fn piece_path(input: &Path, index: u32) -> Result<PathBuf> {
    let stem = input.file_stem().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", input.display()),
        )
    })?;

    let mut name = stem.to_os_string();
    name.push(format!("-{}.{}", index, PIECE_EXTENSION));
    Ok(input.with_file_name(name))
}

/// Splits the file at `path` into `pieces` piece files, any `threshold` of
/// which recover it. Returns the piece paths in index order.
#[cfg(feature = "std")]
pub fn generate_file<P: AsRef<Path>>(
    path: P,
    pieces: u32,
    threshold: u32,
    prime: Prime,
) -> Result<Vec<PathBuf>> {
    let scheme = Shamir::with_prime(pieces, threshold, prime)?;
    generate_file_with(
        path,
        &scheme,
        &StreamOptions::default(),
        &mut rand::thread_rng(),
        &mut crate::NoProgress,
    )
}

/// [`generate_file`] with an explicit scheme, window size, generator and
/// progress receiver.
///
/// The input is opened before any piece file is created.
pub fn generate_file_with<P, R, G>(
    path: P,
    scheme: &Shamir,
    options: &StreamOptions,
    rng: &mut R,
    progress: &mut G,
) -> Result<Vec<PathBuf>>
where
    P: AsRef<Path>,
    R: rand::Rng + ?Sized,
    G: Progress + ?Sized,
{
    let path = path.as_ref();
    let mut input = BufReader::new(File::open(path)?);

    let paths = (1..=scheme.pieces())
        .map(|index| piece_path(path, index))
        .collect::<Result<Vec<_>>>()?;
    let sinks = paths
        .iter()
        .map(|piece| File::create(piece).map(BufWriter::new))
        .collect::<io::Result<Vec<_>>>()?;

    Encoder::new(*scheme, sinks)?
        .with_options(*options)
        .encode(&mut input, rng, progress)?;

    info!("wrote {} piece files for {}", paths.len(), path.display());
    Ok(paths)
}

/// Recovers a file from piece files into `destination`.
///
/// Every header and payload size is checked before `destination` is
/// created, so an inconsistent piece set leaves no output behind.
pub fn interpolate_file<P, D>(pieces: &[P], destination: D) -> Result<PathBuf>
where
    P: AsRef<Path>,
    D: AsRef<Path>,
{
    interpolate_file_with(
        pieces,
        destination,
        &StreamOptions::default(),
        &mut crate::NoProgress,
    )
}

/// [`interpolate_file`] with an explicit window size and progress receiver.
pub fn interpolate_file_with<P, D, G>(
    pieces: &[P],
    destination: D,
    options: &StreamOptions,
    progress: &mut G,
) -> Result<PathBuf>
where
    P: AsRef<Path>,
    D: AsRef<Path>,
    G: Progress + ?Sized,
{
    let destination = destination.as_ref();

    validate::validate_piece_files(pieces)?;
    let sources = pieces
        .iter()
        .map(|piece| File::open(piece).map(BufReader::new))
        .collect::<io::Result<Vec<_>>>()?;
    let decoder = Decoder::open(sources)?.with_options(*options);
    check_destination(pieces, destination)?;

    let indices: Vec<u32> = decoder.headers().iter().map(|header| header.index).collect();
    let prime = decoder.prime();

    let mut output = BufWriter::new(File::create(destination)?);
    decoder.decode(&mut output, progress)?;

    info!(
        "recovered {} from pieces {:?} (prime {})",
        destination.display(),
        indices,
        prime
    );
    Ok(destination.to_path_buf())
}

/// Fails if `destination` already exists as one of `pieces`; creating it
/// would truncate a piece that is still being read.
fn check_destination<P: AsRef<Path>>(pieces: &[P], destination: &Path) -> Result<()> {
    let target = match fs::canonicalize(destination) {
        Ok(target) => target,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err.into()),
    };

    for piece in pieces {
        if fs::canonicalize(piece)? == target {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "destination {} is one of the piece files",
                    destination.display()
                ),
            )
            .into());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NoProgress, ShamirError};
    use rand_chacha::rand_core::SeedableRng;

    fn split(
        dir: &Path,
        name: &str,
        content: &[u8],
        pieces: u32,
        threshold: u32,
    ) -> Vec<PathBuf> {
        let input = dir.join(name);
        fs::write(&input, content).unwrap();

        let scheme = Shamir::new(pieces, threshold).unwrap();
        let mut rng = rand_chacha::ChaCha8Rng::from_seed([0x11; 32]);
        generate_file_with(
            &input,
            &scheme,
            &StreamOptions::default(),
            &mut rng,
            &mut NoProgress,
        )
        .unwrap()
    }

    #[test]
    fn test_piece_naming() {
        let dir = tempfile::tempdir().unwrap();
        let paths = split(dir.path(), "archive.tar.gz", b"data", 3, 3);

        let names: Vec<_> = paths
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["archive.tar-1.shard", "archive.tar-2.shard", "archive.tar-3.shard"]
        );
        assert!(paths.iter().all(|path| path.parent() == Some(dir.path())));

        assert_eq!(
            piece_path(Path::new("noext"), 4).unwrap(),
            Path::new("noext-4.shard")
        );
        assert!(piece_path(Path::new("/"), 1).is_err());
    }

    #[test]
    fn test_multi_chunk_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let content: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        let paths = split(dir.path(), "secret.bin", &content, 5, 3);

        for (index, path) in (1..).zip(&paths) {
            let header = format!("{}\n7919\n", index).len();
            let size = fs::metadata(path).unwrap().len();
            assert_eq!(size, (header + content.len() * 2) as u64);
        }

        let destination = dir.path().join("restored.bin");
        let chosen = [&paths[3], &paths[1], &paths[4]];
        interpolate_file(&chosen, &destination).unwrap();
        assert_eq!(fs::read(&destination).unwrap(), content);
    }

    #[test]
    fn test_empty_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let paths = split(dir.path(), "empty.txt", b"", 4, 3);
        assert_eq!(fs::read(&paths[0]).unwrap(), b"1\n7919\n");

        let destination = dir.path().join("out.txt");
        interpolate_file(&paths[..3], &destination).unwrap();
        assert!(fs::read(&destination).unwrap().is_empty());
    }

    #[test]
    fn test_progress_totals_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.txt");
        let content = vec![b'x'; 10_000];
        fs::write(&input, &content).unwrap();

        let scheme = Shamir::new(3, 3).unwrap();
        let mut rng = rand_chacha::ChaCha8Rng::from_seed([2; 32]);
        let mut total = 0u64;
        let mut progress = |bytes: u64| -> Result<()> {
            total += bytes;
            Ok(())
        };

        let paths = generate_file_with(
            &input,
            &scheme,
            &StreamOptions::default(),
            &mut rng,
            &mut progress,
        )
        .unwrap();
        interpolate_file_with(
            &paths,
            dir.path().join("out.txt"),
            &StreamOptions::with_chunk_size(3000),
            &mut progress,
        )
        .unwrap();

        assert_eq!(total, 2 * content.len() as u64);
    }

    #[test]
    fn test_inconsistent_pieces_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = split(dir.path(), "a.txt", b"hello", 3, 3);
        let destination = dir.path().join("never.txt");

        let other = dir.path().join("other-3.shard");
        fs::write(&other, b"3\n1613\n\x00\x01\x00\x02\x00\x03\x00\x04\x00\x05").unwrap();
        let result = interpolate_file(&[&paths[0], &paths[1], &other], &destination);
        assert!(matches!(result, Err(ShamirError::PrimeMismatch { .. })));
        assert!(!destination.exists());

        let result = interpolate_file(&[&paths[0], &paths[1], &paths[0]], &destination);
        assert!(matches!(result, Err(ShamirError::DuplicateIndex(1))));
        assert!(!destination.exists());

        let short = dir.path().join("short-3.shard");
        fs::write(&short, b"3\n7919\n\x00\x01").unwrap();
        let result = interpolate_file(&[&paths[0], &paths[1], &short], &destination);
        assert!(matches!(result, Err(ShamirError::MismatchedFileSize { .. })));
        assert!(!destination.exists());
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let scheme = Shamir::new(3, 3).unwrap();
        let mut rng = rand_chacha::ChaCha8Rng::from_seed([0; 32]);

        let result = generate_file_with(
            dir.path().join("absent"),
            &scheme,
            &StreamOptions::default(),
            &mut rng,
            &mut NoProgress,
        );
        assert!(matches!(result, Err(ShamirError::Io(_))));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_destination_cannot_be_a_piece() {
        let dir = tempfile::tempdir().unwrap();
        let content = vec![0x42u8; 100];
        let paths = split(dir.path(), "keep.bin", &content, 4, 3);
        let before = fs::read(&paths[0]).unwrap();

        let result = interpolate_file(&paths[..3], &paths[0]);
        assert!(matches!(
            result,
            Err(ShamirError::Io(ref err)) if err.kind() == io::ErrorKind::InvalidInput
        ));
        assert_eq!(fs::read(&paths[0]).unwrap(), before);

        // The same file reached through another path is still caught.
        let aliased = dir.path().join(".").join("keep-2.shard");
        let result = interpolate_file(&paths[..3], &aliased);
        assert!(matches!(result, Err(ShamirError::Io(_))));
        assert_eq!(fs::metadata(&paths[1]).unwrap().len(), before.len() as u64);

        // An unrelated existing file is overwritten as usual.
        let destination = dir.path().join("keep.bin");
        interpolate_file(&paths[1..], &destination).unwrap();
        assert_eq!(fs::read(&destination).unwrap(), content);
    }
}
