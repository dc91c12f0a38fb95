//! Plaintext database codec
//!
//! The decrypted database is one record per line. Blank lines are skipped on
//! read and never written.

use super::record::Record;
use super::result::Result;

/// Parse the decrypted database into records, in file order
///
/// Any malformed line aborts the whole parse.
pub fn parse_plaintext(blob: &str) -> Result<Vec<Record>> {
    blob.split('\n')
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| Record::decode(line, index + 1))
        .collect()
}

/// Render records as the plaintext database (no trailing newline)
pub fn render_plaintext(records: &[Record]) -> String {
    records
        .iter()
        .map(Record::encode)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::result::Error;

    #[test]
    fn test_round_trip_preserves_order() {
        let records = vec![
            Record::new("zeta.org", "z", "pw1"),
            Record::new("alpha.com", "", "pw with spaces"),
            Record::new("alpha.com", "second", "p@ss"),
        ];
        let blob = render_plaintext(&records);
        assert_eq!(parse_plaintext(&blob).unwrap(), records);
    }

    #[test]
    fn test_render_has_no_trailing_newline() {
        let blob = render_plaintext(&[Record::new("a", "b", "c"), Record::new("d", "e", "f")]);
        assert_eq!(blob, "a\tb\tc\nd\te\tf");
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_plaintext(&[]), "");
        assert!(parse_plaintext("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let blob = "\n  \na\tb\tc\n\t\n\nd e f\n";
        let records = parse_plaintext(blob).unwrap();
        assert_eq!(
            records,
            vec![Record::new("a", "b", "c"), Record::new("d", "e", "f")]
        );
    }

    #[test]
    fn test_parse_reports_malformed_line_number() {
        let blob = "a\tb\tc\n\nbroken line\n";
        let err = parse_plaintext(blob).unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { line: 3 }));
    }
}
