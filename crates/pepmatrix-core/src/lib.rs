pub mod aggregate;
pub mod coordinator;
pub mod error;
pub mod fasta;
pub mod matcher;
pub mod membership;
pub mod peptide;
pub mod projector;
pub mod record;

pub use error::Error;

use flate2::read::MultiGzDecoder;
use std::io::Read;
use std::path::Path;

/// Read a FASTA database into a [`fasta::ProteinCollection`], decompressing
/// files ending in `gz`/`gzip`. Accessions containing `exclude_tag` are left out.
pub fn read_fasta<P: AsRef<Path>>(
    path: P,
    exclude_tag: Option<&str>,
) -> Result<fasta::ProteinCollection, Error> {
    let path = path.as_ref();
    let contents = read_to_string(path).map_err(|source| Error::InputUnavailable {
        path: path.to_path_buf(),
        source,
    })?;

    let fasta = fasta::Fasta::parse(&contents, exclude_tag);
    if fasta.excluded() > 0 {
        log::trace!(
            "- {}: excluded {} accessions",
            path.display(),
            fasta.excluded()
        );
    }
    Ok(fasta.into())
}

fn gzip_heuristic(path: &Path) -> bool {
    match path.extension() {
        Some(ext) => ext.eq_ignore_ascii_case("gz") || ext.eq_ignore_ascii_case("gzip"),
        None => false,
    }
}

fn read_to_string(path: &Path) -> std::io::Result<String> {
    let file = std::fs::File::open(path)?;
    let mut contents = String::new();
    if gzip_heuristic(path) {
        MultiGzDecoder::new(file).read_to_string(&mut contents)?;
    } else {
        std::io::BufReader::new(file).read_to_string(&mut contents)?;
    }
    Ok(contents)
}
