/// Line-oriented input decoding and output feature assembly
pub mod output;
pub mod record;
pub mod topology;

pub use output::{render_record, version_features, RenderedRecord};
pub use record::{decode_record, DecodedLine, FeatureRecord};
pub use topology::encode_topology;

use crate::Result;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Open an input path for line reading. `-` reads stdin; `.gz` files are decompressed.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }

    let file = File::open(path)?;
    let reader: Box<dyn Read + Send> = if path.extension().map_or(false, |ext| ext == "gz") {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(Box::new(BufReader::with_capacity(1 << 20, reader)))
}

/// Open an output path for writing. `None` or `-` writes to stdout.
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) if path.as_os_str() != "-" => {
            Ok(Box::new(BufWriter::new(File::create(path)?)))
        }
        _ => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}
