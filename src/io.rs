//! Read and write logic networks and patterns to files

mod aag;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub use aag::{read_aag, write_aag, ParseError, ParseErrorKind};

use crate::sim::{read_patterns, PatternError};
use crate::Network;

fn check_extension(path: &Path) -> Result<(), ParseError> {
    match path.extension() {
        Some(s) if s == "aag" => Ok(()),
        Some(s) => Err(ParseError::Extension(s.to_string_lossy().into_owned())),
        None => Err(ParseError::Extension(String::new())),
    }
}

/// Read a logic network from a file
///
/// Following extensions are supported: .aag
pub fn read_network_file(path: &Path) -> Result<Network, ParseError> {
    check_extension(path)?;
    let f = File::open(path)?;
    read_aag(f)
}

/// Write a logic network to a file
///
/// Following extensions are supported: .aag
pub fn write_network_file(path: &Path, aig: &Network) -> Result<(), ParseError> {
    check_extension(path)?;
    let mut f = BufWriter::new(File::create(path)?);
    write_aag(&mut f, aig)?;
    f.flush()?;
    Ok(())
}

/// Read simulation patterns from a file
pub fn read_pattern_file(path: &Path, nb_inputs: usize) -> Result<Vec<Vec<bool>>, PatternError> {
    let f = File::open(path)?;
    read_patterns(f, nb_inputs)
}
