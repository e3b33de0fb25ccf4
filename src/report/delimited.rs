//! CSV sink (excel dialect: minimal quoting, CRLF line endings)

use super::ReportError;

/// Write rows to CSV in memory
pub fn render(lines: &[Vec<String>]) -> Result<Vec<u8>, ReportError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    for line in lines {
        writer.write_record(line)?;
    }

    writer
        .into_inner()
        .map_err(|e| ReportError::Csv(csv::Error::from(e.into_error())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plain_values_unquoted() {
        let output = render(&[line(&["a", "b"]), line(&["1", "2"])]).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "a,b\r\n1,2\r\n");
    }

    #[test]
    fn test_embedded_separator_is_quoted() {
        let output = render(&[line(&["2.0.1, 2.0.2", "say \"hi\""])]).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "\"2.0.1, 2.0.2\",\"say \"\"hi\"\"\"\r\n"
        );
    }

    #[test]
    fn test_round_trip_through_reader() {
        let rows = vec![line(&["Acme", "A|1", "x,y"])];
        let output = render(&rows).unwrap();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(output.as_slice());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(record.iter().collect::<Vec<_>>(), vec!["Acme", "A|1", "x,y"]);
    }
}
