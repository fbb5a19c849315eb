//! Signing utility for MediPredict model artifacts.
//!
//! Writes `manifest.json` (SHA-256 of every disease artifact present) and its
//! Ed25519 signature `manifest.sig` into the model directory. Also generates
//! signing keypairs.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin sign_artifacts -- <model_dir> [--serial <n>]
//! cargo run --bin sign_artifacts -- --keygen --out-seed <path> [--out-pub <path>] [--force]
//! ```
//!
//! The signing seed (base64, 32 bytes) is read from the file named by
//! `MEDIPREDICT_ARTIFACT_SIGNING_KEY_B64_FILE`; debug builds also accept it
//! directly in `MEDIPREDICT_ARTIFACT_SIGNING_KEY_B64`.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use medipredict::adapters::artifact_fs::{
    sha256_hex, ArtifactManifest, MANIFEST_FILE, MANIFEST_VERSION, SIGNATURE_FILE,
};
use medipredict::Disease;

const USAGE: &str = "Usage: sign_artifacts <model_dir> [--serial <u64>]\n       \
sign_artifacts --keygen --out-seed <path> [--out-pub <path>] [--force]";

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

enum Command {
    Sign {
        model_dir: PathBuf,
        serial: Option<u64>,
    },
    Keygen {
        out_seed: PathBuf,
        out_pub: Option<PathBuf>,
        force: bool,
    },
}

fn parse_args() -> Result<Command> {
    let mut args = env::args().skip(1);
    let mut keygen = false;
    let mut force = false;
    let mut model_dir = None;
    let mut serial = None;
    let mut out_seed = None;
    let mut out_pub = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--keygen" => keygen = true,
            "--force" => force = true,
            "--serial" => {
                let v = args.next().ok_or_else(|| anyhow!(USAGE))?;
                serial = Some(v.trim().parse::<u64>().context("--serial must be a u64")?);
            }
            "--out-seed" => out_seed = Some(PathBuf::from(args.next().ok_or_else(|| anyhow!(USAGE))?)),
            "--out-pub" => out_pub = Some(PathBuf::from(args.next().ok_or_else(|| anyhow!(USAGE))?)),
            "-h" | "--help" => bail!(USAGE),
            _ if model_dir.is_none() && !arg.starts_with("--") => model_dir = Some(PathBuf::from(arg)),
            _ => bail!("Unknown argument: {arg}\n{USAGE}"),
        }
    }

    if keygen {
        return Ok(Command::Keygen {
            out_seed: out_seed.ok_or_else(|| anyhow!(USAGE))?,
            out_pub,
            force,
        });
    }
    Ok(Command::Sign {
        model_dir: model_dir.ok_or_else(|| anyhow!(USAGE))?,
        serial,
    })
}

fn read_signing_seed() -> Result<Seed> {
    const KEY_FILE_ENV: &str = "MEDIPREDICT_ARTIFACT_SIGNING_KEY_B64_FILE";
    const KEY_ENV: &str = "MEDIPREDICT_ARTIFACT_SIGNING_KEY_B64";

    let b64 = if let Ok(path) = env::var(KEY_FILE_ENV) {
        Zeroizing::new(
            fs::read_to_string(path.trim()).context("Failed reading signing key file")?,
        )
    } else if cfg!(debug_assertions) && env::var(KEY_ENV).is_ok() {
        // Dev-only fallback for convenience.
        Zeroizing::new(env::var(KEY_ENV).unwrap_or_default())
    } else {
        bail!("Missing signing key. Set {KEY_FILE_ENV} (env var {KEY_ENV} only in debug builds).");
    };

    let mut raw = general_purpose::STANDARD
        .decode(b64.trim())
        .context("Invalid base64 in signing key")?;
    if raw.len() != 32 {
        let len = raw.len();
        raw.zeroize();
        bail!("Signing key seed must be 32 bytes after base64 decode (got {len})");
    }

    let mut seed = Seed([0u8; 32]);
    seed.0.copy_from_slice(&raw);
    raw.zeroize();
    Ok(seed)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn sign(model_dir: &Path, serial: Option<u64>) -> Result<()> {
    let seed = read_signing_seed()?;
    let signing_key = SigningKey::from_bytes(&seed.0);

    let mut files = BTreeMap::new();
    for disease in Disease::ALL {
        let name = disease.artifact_file();
        let path = model_dir.join(&name);
        if path.exists() {
            let bytes = fs::read(&path).with_context(|| format!("Failed to read {path:?}"))?;
            files.insert(name, sha256_hex(&bytes));
        }
    }
    if files.is_empty() {
        bail!("No disease artifacts found in {model_dir:?}");
    }

    let created_at = unix_now();
    let manifest = ArtifactManifest {
        version: MANIFEST_VERSION,
        serial: serial.unwrap_or_else(|| if created_at > 0 { created_at as u64 } else { 1 }),
        created_at,
        files,
    };
    let manifest_bytes = serde_json::to_vec_pretty(&manifest)?;

    let manifest_path = model_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, &manifest_bytes)
        .with_context(|| format!("Failed to write {manifest_path:?}"))?;

    let sig: Signature = signing_key.sign(&manifest_bytes);
    let sig_path = model_dir.join(SIGNATURE_FILE);
    fs::write(&sig_path, sig.to_bytes()).with_context(|| format!("Failed to write {sig_path:?}"))?;

    println!("Signed manifest: {manifest_path:?} ({} files)", manifest.files.len());
    println!("Wrote signature: {sig_path:?}");
    println!(
        "Public key (base64)={}",
        general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes())
    );
    Ok(())
}

fn write_file(path: &Path, contents: &[u8], mode: u32, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("Refusing to overwrite existing file {path:?}. Use --force.");
    }
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let mut opts = fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        opts.mode(mode);
    }
    #[cfg(not(unix))]
    {
        let _ = mode;
    }

    let mut file = opts.open(path).with_context(|| format!("Failed to open {path:?}"))?;
    file.write_all(contents)?;
    file.write_all(b"\n")?;
    Ok(())
}

fn keygen(out_seed: &Path, out_pub: Option<&Path>, force: bool) -> Result<()> {
    let mut seed = Seed([0u8; 32]);
    OsRng.fill_bytes(&mut seed.0);

    let verifying_key = SigningKey::from_bytes(&seed.0).verifying_key();
    let seed_b64 = Zeroizing::new(general_purpose::STANDARD.encode(seed.0));
    let pub_b64 = general_purpose::STANDARD.encode(verifying_key.as_bytes());

    write_file(out_seed, seed_b64.as_bytes(), 0o600, force)?;
    println!("Wrote signing seed (base64) to {out_seed:?}");

    if let Some(path) = out_pub {
        write_file(path, pub_b64.as_bytes(), 0o644, force)?;
        println!("Wrote public key (base64) to {path:?}");
    }
    // Print only non-secret material.
    println!("Public key (base64)={pub_b64}");
    Ok(())
}

fn main() -> Result<()> {
    match parse_args()? {
        Command::Sign { model_dir, serial } => sign(&model_dir, serial),
        Command::Keygen {
            out_seed,
            out_pub,
            force,
        } => keygen(&out_seed, out_pub.as_deref(), force),
    }
}
