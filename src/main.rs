use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;

use woffcheck::{WoffError, WoffReader};

fn main() -> ExitCode {
    env_logger::init();

    let Some(infile) = std::env::args().nth(1) else {
        eprintln!("usage: woffcheck <font.woff>");
        return ExitCode::FAILURE;
    };

    match check(&infile) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{infile}: {err}");
            for violation in err.violations() {
                eprintln!("  {violation}");
            }
            ExitCode::FAILURE
        }
    }
}

fn check(infile: &str) -> Result<(), WoffError> {
    let file = File::open(infile)?;
    let mut reader = WoffReader::new(BufReader::new(file));
    reader.process()?;

    if let Some(header) = reader.header() {
        println!(
            "{infile}: flavor {}, version {}.{}, {} bytes",
            header.flavor, header.major_version, header.minor_version, header.length
        );
    }
    for table in reader.font_tables() {
        let entry = &table.entry;
        println!(
            "  {} offset {:>8} stored {:>8} length {:>8} checksum {:#010x}",
            entry.tag, entry.offset, entry.comp_length, entry.orig_length, entry.orig_checksum
        );
    }

    if let Some(document) = reader.metadata() {
        let sections: Vec<&str> = document.root().elements().map(|e| e.name.as_str()).collect();
        println!("  metadata: {}", sections.join(", "));
    }
    if let Some(violations) = reader.metadata_violations() {
        println!("  metadata rejected:");
        for violation in violations {
            println!("    {violation}");
        }
    }
    if let Some(data) = reader.private_data() {
        println!("  private data: {} bytes", data.len());
    }
    Ok(())
}
