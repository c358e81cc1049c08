use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use qoadec::StreamDecoder;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() != 3 {
        eprintln!("Usage: decode <input.qoa> <output.pcm>");
        eprintln!();
        eprintln!("Decodes a QOA file to raw interleaved 16-bit little-endian PCM.");
        return Ok(());
    }

    let input_path = &args[1];
    let output_path = &args[2];

    if !Path::new(input_path).exists() {
        eprintln!("Error: Input file '{}' does not exist", input_path);
        return Ok(());
    }

    println!("Decoding QOA file: {}", input_path);

    let mut decoder = StreamDecoder::open(input_path)?;
    println!("Audio info:");
    println!("  Channels: {}", decoder.channels());
    println!("  Sample rate: {} Hz", decoder.sample_rate());
    match decoder.total_duration() {
        Some(duration) => println!("  Duration: {:.2} seconds", duration.as_secs_f64()),
        None => println!("  Duration: unknown (streaming file)"),
    }

    let mut writer = BufWriter::new(File::create(output_path)?);
    let mut buf = [0_i16; 1024];
    loop {
        let n = decoder.decode(&mut buf);
        if n == 0 {
            break;
        }
        for sample in &buf[..n] {
            writer.write_all(&sample.to_le_bytes())?;
        }
    }
    writer.flush()?;

    if let Some(e) = decoder.error() {
        eprintln!("Decoding stopped early: {}", e);
    } else if !decoder.is_streaming()
        && decoder.samples_decoded() < decoder.stream_header().total_samples_per_channel as u64
    {
        eprintln!("Decode ended before the length specified by file header");
    }

    println!(
        "\nDecoded {} samples per channel to: {} ({} bytes)",
        decoder.samples_decoded(),
        output_path,
        std::fs::metadata(output_path)?.len()
    );

    Ok(())
}
