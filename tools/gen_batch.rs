//! Test Batch Generator
//!
//! Writes a random CSV upload in the credit-card layout
//! (`Time, V1..V28, Amount, Class`) for manual end-to-end runs.

use rand::Rng;
use std::io::Write;
use tracing::info;

const FEATURE_COUNT: usize = 28;

/// Row generator for testing
struct BatchGenerator {
    rng: rand::rngs::ThreadRng,
    elapsed_secs: f64,
}

impl BatchGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            elapsed_secs: 0.0,
        }
    }

    fn header() -> Vec<String> {
        let mut header = vec!["Time".to_string()];
        header.extend((1..=FEATURE_COUNT).map(|i| format!("V{}", i)));
        header.push("Amount".to_string());
        header.push("Class".to_string());
        header
    }

    /// Generate a legitimate-looking row: features near zero, small amount
    fn generate_legitimate(&mut self) -> Vec<String> {
        self.elapsed_secs += self.rng.gen_range(0.5..30.0);

        let mut row = vec![format!("{:.0}", self.elapsed_secs)];
        for _ in 0..FEATURE_COUNT {
            row.push(format!("{:.6}", self.rng.gen_range(-1.0..1.0)));
        }
        row.push(format!("{:.2}", self.rng.gen_range(1.0..250.0)));
        row.push("0".to_string());
        row
    }

    /// Generate a suspicious row: features shifted away from zero, larger amount
    fn generate_suspicious(&mut self) -> Vec<String> {
        self.elapsed_secs += self.rng.gen_range(0.1..5.0);

        let mut row = vec![format!("{:.0}", self.elapsed_secs)];
        for _ in 0..FEATURE_COUNT {
            let magnitude = self.rng.gen_range(1.0..5.0);
            let sign = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            row.push(format!("{:.6}", sign * magnitude));
        }
        row.push(format!("{:.2}", self.rng.gen_range(500.0..5000.0)));
        row.push("1".to_string());
        row
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gen_batch=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse arguments: [output|-] [count] [fraud_rate]
    let args: Vec<String> = std::env::args().collect();
    let output = args.get(1).map(|s| s.as_str()).unwrap_or("-");
    let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(100);
    let fraud_rate: f64 = args
        .get(3)
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.1)
        .clamp(0.0, 1.0);

    info!(output = %output, count = count, fraud_rate = fraud_rate, "Configuration loaded");

    let sink: Box<dyn Write> = if output == "-" {
        Box::new(std::io::stdout())
    } else {
        Box::new(std::fs::File::create(output)?)
    };
    let mut wtr = csv::Writer::from_writer(sink);
    wtr.write_record(BatchGenerator::header())?;

    let mut generator = BatchGenerator::new();
    let mut rng = rand::thread_rng();
    let mut legitimate_count = 0;
    let mut suspicious_count = 0;

    for _ in 0..count {
        let row = if rng.gen_bool(fraud_rate) {
            suspicious_count += 1;
            generator.generate_suspicious()
        } else {
            legitimate_count += 1;
            generator.generate_legitimate()
        };
        wtr.write_record(&row)?;
    }
    wtr.flush()?;

    info!(
        "Completed! Wrote {} rows ({} legitimate, {} suspicious)",
        count, legitimate_count, suspicious_count
    );

    Ok(())
}
