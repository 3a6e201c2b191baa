//! Parser for the pipe-delimited text form of routing-table entries, as
//! produced by `bgpdump -m`.
//!
//! ```text
//! TABLE_DUMP2|1606780800|B|192.0.2.1|64496|10.0.0.0/24|64496 64500 65001|IGP|192.0.2.1|0|0||NAG||
//! ```
use crate::error::RecordError;

/// Number of fields in a routing-table record. Other lengths are dropped.
pub const RIB_FIELD_COUNT: usize = 15;

const PREFIX_FIELD: usize = 5;
const AS_PATH_FIELD: usize = 6;

/// Announced prefix and the AS path that announced it. The path is never
/// empty; its last element is the origin AS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRecord {
    prefix: String,
    as_path: Vec<String>,
}

impl PathRecord {
    pub fn new(prefix: &str, as_path: Vec<String>) -> Result<Self, RecordError> {
        if prefix.is_empty() {
            return Err(RecordError::MissingPrefix);
        }
        if as_path.is_empty() {
            return Err(RecordError::EmptyPath);
        }

        Ok(PathRecord {
            prefix: prefix.to_owned(),
            as_path,
        })
    }

    pub fn parse(line: &str) -> Result<Self, RecordError> {
        let line = line.trim_end_matches(|c| c == '\r' || c == '\n');
        let fields = line.split('|').collect::<Vec<&str>>();
        if fields.len() != RIB_FIELD_COUNT {
            return Err(RecordError::FieldCount {
                expected: RIB_FIELD_COUNT,
                found: fields.len(),
            });
        }

        // An AS_SET segment ("{...}") ends the usable part of the path.
        let as_path = fields[AS_PATH_FIELD]
            .split('{')
            .next()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_owned)
            .collect();

        PathRecord::new(fields[PREFIX_FIELD].trim(), as_path)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn as_path(&self) -> &[String] {
        &self.as_path
    }

    pub fn origin(&self) -> &str {
        // never empty, checked in new()
        &self.as_path[self.as_path.len() - 1]
    }

    /// The nearest AS before the origin that is not the origin itself,
    /// skipping prepending. `Ok(None)` for a single-hop path.
    pub fn upstream(&self) -> Result<Option<&str>, RecordError> {
        if self.as_path.len() < 2 {
            return Ok(None);
        }

        let origin = self.origin();
        self.as_path[..self.as_path.len() - 1]
            .iter()
            .rev()
            .find(|asn| asn.as_str() != origin)
            .map(|asn| Some(asn.as_str()))
            .ok_or_else(|| RecordError::DegeneratePath {
                origin: origin.to_owned(),
            })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn rib_line(prefix: &str, path: &str) -> String {
        format!(
            "TABLE_DUMP2|1606780800|B|192.0.2.1|64496|{}|{}|IGP|192.0.2.1|0|0||NAG||",
            prefix, path
        )
    }

    #[test]
    fn test_parse() {
        let record = PathRecord::parse(&rib_line("10.0.0.0/24", "64496 64500 65001")).unwrap();

        assert_eq!(record.prefix(), "10.0.0.0/24");
        assert_eq!(record.as_path(), ["64496", "64500", "65001"]);
        assert_eq!(record.origin(), "65001");
        assert_eq!(record.upstream(), Ok(Some("64500")));
    }

    #[test]
    fn test_trailing_newline() {
        let line = format!("{}\r\n", rib_line("10.0.0.0/24", "1 2"));
        let record = PathRecord::parse(&line).unwrap();

        assert_eq!(record.origin(), "2");
    }

    #[test]
    fn test_wrong_field_count() {
        assert_eq!(
            PathRecord::parse("a|b|c"),
            Err(RecordError::FieldCount {
                expected: RIB_FIELD_COUNT,
                found: 3
            })
        );

        let long = format!("{}|extra", rib_line("10.0.0.0/24", "1 2"));
        assert!(matches!(
            PathRecord::parse(&long),
            Err(RecordError::FieldCount { found: 16, .. })
        ));
    }

    #[test]
    fn test_as_set_is_discarded() {
        let record = PathRecord::parse(&rib_line("10.0.0.0/8", "1 2 3 {4,5}")).unwrap();

        assert_eq!(record.as_path(), ["1", "2", "3"]);
        assert_eq!(record.origin(), "3");
    }

    #[test]
    fn test_as_set_only_path() {
        assert_eq!(
            PathRecord::parse(&rib_line("10.0.0.0/8", "{4,5}")),
            Err(RecordError::EmptyPath)
        );
    }

    #[test]
    fn test_missing_prefix() {
        assert_eq!(
            PathRecord::parse(&rib_line("", "1 2")),
            Err(RecordError::MissingPrefix)
        );
    }

    #[test]
    fn test_prepending_is_skipped() {
        let record =
            PathRecord::parse(&rib_line("10.0.0.0/24", "65003 65002 65001 65001 65001")).unwrap();

        assert_eq!(record.upstream(), Ok(Some("65002")));
    }

    #[test]
    fn test_single_hop() {
        let record = PathRecord::parse(&rib_line("10.0.0.0/24", "65001")).unwrap();

        assert_eq!(record.upstream(), Ok(None));
    }

    #[test]
    fn test_degenerate_path() {
        let record = PathRecord::parse(&rib_line("10.0.0.0/24", "65001 65001 65001")).unwrap();

        assert_eq!(
            record.upstream(),
            Err(RecordError::DegeneratePath {
                origin: "65001".to_owned()
            })
        );
    }
}
