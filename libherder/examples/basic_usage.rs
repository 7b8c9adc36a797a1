//! Basic usage example for the libherder library.
//!
//! Checks the images given on the command line and prints one status line
//! for each.
//!
//! Run with: cargo run --example basic_usage -- quay.io/openshiftio/rhel-foo:v1

use libherder::{Verifier, VerifierConfig, status_lines};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let images: Vec<String> = std::env::args().skip(1).collect();
    if images.is_empty() {
        eprintln!("usage: basic_usage IMAGE...");
        return Ok(());
    }

    let verifier = Verifier::new(VerifierConfig::default())?;
    let report = verifier.verify_batch(images, std::future::pending()).await;

    for (image, outcome) in &report.results {
        for line in status_lines(image, outcome) {
            println!("{}", line);
        }
    }

    if report.is_success() {
        println!("\n✓ All images found");
    } else {
        println!("\n✗ {} image(s) failed", report.failures().count());
    }
    Ok(())
}
