use std::env;
use std::error::Error;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const INPUT_FB2_FILE: &str = "tests/ebooks/dune_messiah.fb2";
const OUTPUT_FBZ_FILE: &str = "dune_messiah.fbz";

/// Convenient script to package the example fb2 file as a `.fbz` archive.
fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo::rerun-if-changed={INPUT_FB2_FILE}");

    let out_path = PathBuf::from(env::var("OUT_DIR")?);
    let mut zip = ZipWriter::new(File::create(out_path.join(OUTPUT_FBZ_FILE))?);

    zip.start_file("dune_messiah.fb2", SimpleFileOptions::default())?;
    zip.write_all(&fs::read(INPUT_FB2_FILE)?)?;
    zip.finish()?;

    Ok(())
}
