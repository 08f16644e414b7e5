//! Split command implementation

use anyhow::{bail, Context, Result};
use clap::Args;
use log::info;
use rand::RngCore;
use rand_chacha::rand_core::SeedableRng;
use shardline_shamir::{file, Shamir, StreamOptions};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use crate::config::Config;
use crate::formats::{OutputFormat, PieceSet};
use crate::utils::{self, ProgressLog};

#[derive(Args)]
pub struct SplitCommand {
    /// Number of pieces to generate
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub pieces: Option<u32>,

    /// Minimum number of pieces required for recovery (at least 3)
    #[arg(short = 'k', long, value_name = "THRESHOLD")]
    pub threshold: Option<u32>,

    /// Prime modulus shared by all pieces
    #[arg(long, value_name = "PRIME")]
    pub prime: Option<u32>,

    /// Split a file into `<name>-<index>.shard` files beside it
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Read the secret from an environment variable
    #[arg(long, value_name = "VAR")]
    pub env_var: Option<String>,

    /// Prompt for the secret interactively (hidden input)
    #[arg(long)]
    pub interactive: bool,

    /// Seed for deterministic coefficients (64 hex characters)
    #[arg(long, value_name = "HEX")]
    pub seed: Option<String>,

    /// Output format for text-mode pieces
    #[arg(short = 'f', long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write text-mode pieces to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Secret bytes processed per window in file mode
    #[arg(long, value_name = "BYTES")]
    pub chunk_size: Option<usize>,
}

impl SplitCommand {
    pub fn execute(&self, config: &Config) -> Result<()> {
        self.validate()?;

        let prime = config.prime(self.prime)?;
        let pieces = self.pieces.unwrap_or(config.defaults.pieces);
        let threshold = self.threshold.unwrap_or(config.defaults.threshold);
        let shamir = Shamir::with_prime(pieces, threshold, prime)
            .context("Invalid sharing parameters")?;

        let mut rng = self.rng()?;

        match &self.file {
            Some(path) => self.split_file(path, &shamir, config, rng.as_mut()),
            None => self.split_text(&shamir, config, rng.as_mut()),
        }
    }

    fn validate(&self) -> Result<()> {
        let input_methods = [self.env_var.is_some(), self.interactive, self.file.is_some()];
        if input_methods.iter().filter(|&&x| x).count() > 1 {
            bail!("Only one of --file, --env-var and --interactive can be specified");
        }

        if self.file.is_some() && (self.format.is_some() || self.output.is_some()) {
            bail!("--format and --output apply to text mode only");
        }

        Ok(())
    }

    fn rng(&self) -> Result<Box<dyn RngCore>> {
        let rng: Box<dyn RngCore> = match &self.seed {
            Some(seed) => {
                let seed = utils::parse_seed(seed)?;
                Box::new(rand_chacha::ChaCha8Rng::from_seed(seed))
            }
            None => Box::new(rand::thread_rng()),
        };
        Ok(rng)
    }

    fn split_file(
        &self,
        path: &Path,
        shamir: &Shamir,
        config: &Config,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        let size = fs::metadata(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?
            .len();
        let options = StreamOptions::with_chunk_size(config.chunk_size(self.chunk_size)?);
        let mut progress = ProgressLog::new("split", size);

        let paths = file::generate_file_with(path, shamir, &options, rng, &mut progress)
            .with_context(|| format!("Failed to split {}", path.display()))?;

        for piece in &paths {
            println!("{}", piece.display());
        }
        info!(
            "Split {} ({}) into {} pieces; any {} recover it",
            path.display(),
            utils::format_bytes(size),
            shamir.pieces(),
            shamir.threshold()
        );

        Ok(())
    }

    fn split_text(&self, shamir: &Shamir, config: &Config, rng: &mut dyn RngCore) -> Result<()> {
        let secret = self.read_secret()?;
        let mut progress = ProgressLog::new("split", secret.len() as u64);

        let pieces = shamir
            .generate_buffer(&secret, rng, &mut progress)
            .context("Failed to split secret")?;

        let format = self.format.unwrap_or(config.defaults.format);
        let rendered = PieceSet::new(&pieces, shamir.prime(), shamir.threshold()).render(format)?;

        match &self.output {
            Some(path) => fs::write(path, format!("{}\n", rendered))
                .with_context(|| format!("Failed to write pieces to {}", path.display()))?,
            None => {
                let mut stdout = io::stdout().lock();
                writeln!(stdout, "{}", rendered).context("Failed to write to stdout")?;
            }
        }

        info!(
            "Generated {} pieces with threshold {} over prime {}",
            shamir.pieces(),
            shamir.threshold(),
            shamir.prime()
        );

        Ok(())
    }

    fn read_secret(&self) -> Result<Zeroizing<Vec<u8>>> {
        let secret = if let Some(env_var) = &self.env_var {
            std::env::var(env_var)
                .with_context(|| format!("Environment variable '{}' not found", env_var))?
                .into_bytes()
        } else if self.interactive {
            rpassword::prompt_password("Enter secret: ")
                .context("Failed to read secret from terminal")?
                .into_bytes()
        } else {
            let mut buffer = Vec::new();
            io::stdin()
                .read_to_end(&mut buffer)
                .context("Failed to read from stdin")?;
            buffer
        };

        if secret.is_empty() {
            bail!("Secret cannot be empty");
        }

        Ok(Zeroizing::new(secret))
    }
}
