// policy.rs — Policy bundle subcommands: bundle, verify.

use std::process::ExitCode;

use clap::Subcommand;

use agentsafe_policy::{verify_bundle_hash, verify_bundle_signature, write_bundle};

#[derive(Subcommand)]
pub enum PolicyCommands {
    /// Write a hash (and optional signature) bundle for a policy file.
    Bundle {
        #[arg(long)]
        policy: String,
        #[arg(long, default_value = "policies/bundle.json")]
        out: String,
        /// Detached Ed25519 signature over the policy bytes, base64.
        #[arg(long, default_value = "")]
        signature_b64: String,
    },
    /// Verify a bundle's hash, and its signature when a key is given.
    Verify {
        #[arg(long)]
        policy: String,
        #[arg(long)]
        bundle: String,
        /// PEM ed25519 public key.
        #[arg(long, default_value = "")]
        pubkey: String,
    },
}

pub fn execute(cmd: &PolicyCommands) -> anyhow::Result<ExitCode> {
    match cmd {
        PolicyCommands::Bundle {
            policy,
            out,
            signature_b64,
        } => {
            let out_path = write_bundle(policy, out, signature_b64)?;
            println!("wrote {}", out_path.display());
            Ok(ExitCode::from(0))
        }
        PolicyCommands::Verify {
            policy,
            bundle,
            pubkey,
        } => {
            if !verify_bundle_hash(policy, bundle)? {
                eprintln!("FAIL bundle hash mismatch");
                return Ok(ExitCode::from(2));
            }
            if !pubkey.is_empty() {
                match verify_bundle_signature(policy, bundle, pubkey) {
                    Ok(true) => {}
                    Ok(false) => {
                        eprintln!("FAIL signature verification failed");
                        return Ok(ExitCode::from(2));
                    }
                    Err(e) => {
                        eprintln!("FAIL {e}");
                        return Ok(ExitCode::from(2));
                    }
                }
            }
            println!("OK policy bundle verified");
            Ok(ExitCode::from(0))
        }
    }
}
