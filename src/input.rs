use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use bzip2::read::MultiBzDecoder;

/// Opens a text input, decompressing it on the fly when the file name ends
/// with `.bz2`.
pub fn open_text(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;

    if path.extension().map_or(false, |ext| ext == "bz2") {
        Ok(Box::new(BufReader::new(MultiBzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Calls `f` for every line of `reader`. Invalid UTF-8 is replaced rather
/// than treated as an error, a single bad byte must not end a table scan.
pub fn for_each_line(mut reader: impl BufRead, mut f: impl FnMut(&str)) -> io::Result<()> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        f(&String::from_utf8_lossy(&buf));
    }
}

/// Reads a newline-delimited list of AS labels, ignoring blank lines and
/// `#` comments.
pub fn read_label_list(reader: impl BufRead) -> io::Result<Vec<String>> {
    let mut labels = Vec::new();
    for_each_line(reader, |line| {
        let line = line.trim();
        if !line.is_empty() && !line.starts_with('#') {
            labels.push(line.to_owned());
        }
    })?;
    Ok(labels)
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use bzip2::{write::BzEncoder, Compression};

    use super::*;

    #[test]
    fn test_lossy_lines() {
        let data: &[u8] = b"one\ntw\xffo\nthree";
        let mut lines = Vec::new();
        for_each_line(data, |line| lines.push(line.trim_end().to_owned())).unwrap();

        assert_eq!(lines, ["one", "tw\u{fffd}o", "three"]);
    }

    #[test]
    fn test_label_list() {
        let data = "# seeds\n65001\n\n 65002 \r\n";

        assert_eq!(read_label_list(data.as_bytes()).unwrap(), ["65001", "65002"]);
    }

    #[test]
    fn test_open_bz2() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seeds.txt.bz2");

        let mut encoder = BzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(b"65001\n65002\n").unwrap();
        encoder.finish().unwrap();

        let labels = read_label_list(open_text(&path).unwrap()).unwrap();
        assert_eq!(labels, ["65001", "65002"]);
    }
}
