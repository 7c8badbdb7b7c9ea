//! Utility functions used in all other ti_analyzer modules.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use byteordered::byteorder::ReadBytesExt;
use flate2::bufread::GzDecoder;

use crate::error::Result;

/// Check whether the file extension ends with ".gz".
pub fn is_gz_file<P>(path: P) -> bool
where
    P: AsRef<Path>,
{
    path.as_ref()
        .file_name()
        .map(|a| a.to_string_lossy().ends_with(".gz"))
        .unwrap_or(false)
}

/// Open a file for buffered reading. If the file's name ends with ".gz", the content is GZip decoded on the fly.
pub fn open_maybe_gz<P>(path: P) -> Result<Box<dyn BufRead>>
where
    P: AsRef<Path>,
{
    let gz = is_gz_file(&path);
    let file = BufReader::new(File::open(path)?);
    if gz {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(file))
    }
}

/// Read a fixed length zero-terminated byte string of the given length from the input. Embedded '\0' chars are allowed, but not added to the returned String.
pub fn read_fixed_length_string<S>(input: &mut S, len: usize) -> Result<String>
where
    S: Read,
{
    let mut info_line = String::with_capacity(len);
    for _ in 0..len {
        let cur_char = input.read_u8()? as char;
        if cur_char != '\0' {
            info_line.push(cur_char);
        }
    }
    Ok(info_line)
}

/// File stem without any ".gz" and mesh extension, e.g. `ernie_TI` for `/data/ernie_TI.msh.gz`.
pub fn mesh_stem<P>(path: P) -> String
where
    P: AsRef<Path>,
{
    let name = path
        .as_ref()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    match name.rfind('.') {
        Some(idx) if idx > 0 => name[..idx].to_string(),
        _ => name.to_string(),
    }
}
