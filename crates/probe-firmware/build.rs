//! Bakes the probe configuration from `.env` into the firmware.

fn main() {
    // A missing .env is fine; plain environment variables still apply.
    let _ = dotenvy::dotenv();

    let policy = std::env::var("PROBE_FAILURE_POLICY").unwrap_or_else(|_| "halt".into());
    println!("cargo:rustc-env=PROBE_FAILURE_POLICY={policy}");
    println!("cargo:rerun-if-env-changed=PROBE_FAILURE_POLICY");
    println!("cargo:rerun-if-changed=.env");
}
