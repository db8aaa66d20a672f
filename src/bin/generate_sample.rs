use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use cinefilter::Record;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u64() % items.len() as u64) as usize]
    }

    /// True with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

const MOVIES: usize = 600;

fn generate(rng: &mut SimpleRng) -> Vec<Record> {
    let ratings = ["G", "PG", "PG-13", "R", "NC-17"];

    (0..MOVIES)
        .map(|_| {
            // Skewed towards recent releases.
            let age = (rng.next_f64().powi(2) * 40.0) as i64;
            let release_year = 2022 - age;
            let rating = rng.pick(&ratings);
            let bias = match *rating {
                "G" | "PG" => -0.3,
                "R" | "NC-17" => 0.2,
                _ => 0.0,
            };
            let score = (rng.gauss(6.4 + bias, 1.1).clamp(1.0, 9.8) * 10.0).round() / 10.0;

            // A realistic export has holes in it.
            Record {
                release_year: (!rng.chance(0.02)).then_some(release_year),
                age_certification: (!rng.chance(0.25)).then(|| rating.to_string()),
                imdb_score: (!rng.chance(0.05)).then_some(score),
            }
        })
        .collect()
}

fn write_parquet(records: &[Record], path: &str) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("release_year", DataType::Int64, true),
        Field::new("age_certification", DataType::Utf8, true),
        Field::new("imdb_score", DataType::Float64, true),
    ]));

    let years: Int64Array = records.iter().map(|r| r.release_year).collect();
    let ages: StringArray = records
        .iter()
        .map(|r| r.age_certification.as_deref())
        .collect();
    let scores: Float64Array = records.iter().map(|r| r.imdb_score).collect();

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![Arc::new(years), Arc::new(ages), Arc::new(scores)],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn write_json(records: &[Record], path: &str) -> Result<()> {
    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), records)
        .context("writing JSON")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let records = generate(&mut rng);

    write_parquet(&records, "sample_movies.parquet")?;
    write_json(&records, "sample_movies.json")?;

    println!(
        "Wrote {} movies to sample_movies.parquet and sample_movies.json",
        records.len()
    );
    Ok(())
}
