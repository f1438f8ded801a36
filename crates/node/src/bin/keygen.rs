// Path: crates/node/src/bin/keygen.rs

//! One-shot DKG ceremony: produces the three key shares (signer, server,
//! user) and prints the wallet address. The server's share lands in the
//! shares directory in the JSON wrapper the node reads at signing time;
//! distribution and encryption of the other two shares is the operator's
//! onboarding flow.

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::OsRng;
use rand::RngCore;
use std::path::PathBuf;

use warden_crypto::material::encode_share_file;
use warden_scheme::dkg;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct KeygenOpts {
    /// Signer id the shares are generated for.
    #[arg(long)]
    signer_id: String,

    /// Directory the three share files are written into.
    #[arg(long, default_value = "shares")]
    out_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let opts = KeygenOpts::parse();
    std::fs::create_dir_all(&opts.out_dir)
        .with_context(|| format!("create {}", opts.out_dir.display()))?;

    let mut eid = [0u8; 32];
    OsRng.fill_bytes(&mut eid);

    tracing::info!(
        signer_id = %opts.signer_id,
        "running 2-of-3 DKG ceremony (Paillier prime generation takes a while)"
    );
    let output = dkg::run(&eid, 3, 2).context("dkg ceremony")?;

    let roles = ["signer", "server", "user"];
    for (i, role) in roles.iter().enumerate() {
        let share = &output.shares[i];
        let wrapped = encode_share_file(&share.core_share, &share.aux_info);
        let path = opts
            .out_dir
            .join(format!("{}.{role}.share.json", opts.signer_id));
        std::fs::write(&path, wrapped).with_context(|| format!("write {}", path.display()))?;
        tracing::info!(role, path = %path.display(), "share written");
    }

    tracing::info!(
        address = %output.address,
        public_key = %hex::encode(output.public_key),
        "ceremony complete"
    );
    println!("{}", output.address);

    Ok(())
}
