use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::abundance::{checked_read_count, AbundanceTable};
use crate::error::{AnalysisError, AnalysisResult};
use crate::types::{TaxonObservation, Taxonomy};

/// Reads a per-sample abundance table, transparently handling `.gz`.
///
/// Format, one taxon per line:
/// ```text
/// <id>\t<name>\t<reads>[\t<kingdom>\t<phylum>\t<class>\t<family>\t<genus>]
/// ```
/// Lines starting with `#` and blank lines are skipped. The first remaining line
/// is a header only when its third column is a column name such as `reads` or
/// `count`; any other count that is not a whole number is a parse error.
pub fn read_abundance_table<P: AsRef<Path>>(path: P, sample_id: &str) -> AnalysisResult<AbundanceTable> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|e| AnalysisError::io(path, e))?;

    let is_gz = path
        .extension()
        .map(|ext| ext == "gz")
        .unwrap_or(false);

    let reader: Box<dyn Read> = if is_gz {
        Box::new(MultiGzDecoder::new(f))
    } else {
        Box::new(f)
    };

    let table = parse_abundance_table(BufReader::new(reader), path, sample_id)?;
    log::info!(
        "Read {} taxa ({} reads) for sample {} from {}",
        table.len(),
        table.total_reads(),
        sample_id,
        path.display()
    );
    Ok(table)
}

/// Parse table text from any reader; `path` is only used in error messages.
pub fn parse_abundance_table<R: BufRead>(
    reader: R,
    path: &Path,
    sample_id: &str,
) -> AnalysisResult<AbundanceTable> {
    let mut table = AbundanceTable::new(sample_id);
    let mut first_row = true;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| AnalysisError::io(path, e))?;
        let line = line.trim_end();
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let parse_err = |reason: String| AnalysisError::Parse {
            path: path.to_path_buf(),
            line: line_no + 1,
            reason,
        };

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 3 {
            return Err(parse_err(format!(
                "expected at least 3 tab-separated fields, found {}",
                fields.len()
            )));
        }

        let id = fields[0].trim();
        let name = fields[1].trim();
        let raw_count = fields[2].trim();
        if std::mem::take(&mut first_row) && is_count_header(raw_count) {
            continue;
        }
        let count: i64 = raw_count
            .parse()
            .map_err(|_| parse_err(format!("read count '{raw_count}' is not an integer")))?;

        if id.is_empty() {
            return Err(parse_err("empty taxon id".to_string()));
        }

        let read_count = checked_read_count(sample_id, id, count)?;
        let mut observation = TaxonObservation::new(id, name, read_count);
        observation.taxonomy = Taxonomy::from_ranks(fields[3..].iter().copied());
        table.insert(observation)?;
    }

    Ok(table)
}

fn is_count_header(field: &str) -> bool {
    ["reads", "read_count", "readcount", "count", "counts", "abundance"]
        .iter()
        .any(|h| field.eq_ignore_ascii_case(h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const TABLE: &str = "\
id\tname\treads\tkingdom\tphylum\tclass\tfamily\tgenus
# deep-sea vent sample
SP001\tBathymodiolus thermophilus\t235\tAnimalia\tMollusca\tBivalvia\tMytilidae\tBathymodiolus
SP002\tNovel Species\t182

SP004\tAlvinella pompejana\t123\tAnimalia\tAnnelida\t-\tAlvinellidae\tAlvinella
";

    fn parse(text: &str) -> AnalysisResult<AbundanceTable> {
        parse_abundance_table(text.as_bytes(), Path::new("mem.tsv"), "S1")
    }

    #[test]
    fn parses_header_comments_and_taxonomy() {
        let table = parse(TABLE).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.total_reads(), 540);
        let first = &table.observations()[0];
        assert_eq!(first.name, "Bathymodiolus thermophilus");
        assert_eq!(
            first.taxonomy.as_ref().and_then(|t| t.family.as_deref()),
            Some("Mytilidae")
        );
        assert!(table.observations()[1].taxonomy.is_none());
        assert_eq!(
            table.observations()[2].taxonomy.as_ref().and_then(|t| t.class.clone()),
            None
        );
    }

    #[test]
    fn negative_count_is_invalid_input() {
        let err = parse("A\talpha\t4\nB\tbeta\t-2\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("'B'"));
    }

    #[test]
    fn non_numeric_count_after_data_is_parse_error() {
        match parse("A\talpha\t4\nB\tbeta\tmany\n").unwrap_err() {
            AnalysisError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn fractional_first_count_is_not_a_header() {
        for text in [
            "A\talpha\t4.5\nB\tbeta\t3\n",
            "A\talpha\t1e3\nB\tbeta\t3\n",
            "A\talpha\t99999999999999999999\nB\tbeta\t3\n",
        ] {
            match parse(text).unwrap_err() {
                AnalysisError::Parse { line, .. } => assert_eq!(line, 1),
                other => panic!("unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn header_is_recognised_by_column_name() {
        let table = parse("# counts from run 7\nTaxon\tName\tREADS\nA\talpha\t4\n").unwrap();
        assert_eq!(table.len(), 1);

        // a header-like row after data is just bad data
        assert_eq!(
            parse("A\talpha\t4\nid\tname\treads\n").unwrap_err().kind(),
            ErrorKind::Parse
        );
    }

    #[test]
    fn short_row_is_parse_error() {
        assert_eq!(parse("A\t4\n").unwrap_err().kind(), ErrorKind::Parse);
    }

    #[test]
    fn reads_plain_and_gzipped_files() {
        let dir = tempfile::tempdir().unwrap();

        let plain = dir.path().join("sample.tsv");
        std::fs::write(&plain, TABLE).unwrap();
        assert_eq!(read_abundance_table(&plain, "S1").unwrap().len(), 3);

        let gz = dir.path().join("sample.tsv.gz");
        let mut enc = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
        enc.write_all(TABLE.as_bytes()).unwrap();
        enc.finish().unwrap();
        let table = read_abundance_table(&gz, "S1").unwrap();
        assert_eq!(table.total_reads(), 540);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_abundance_table("/nonexistent/table.tsv", "S1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
