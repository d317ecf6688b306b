use std::io::{self, BufRead, Write};

/// Helper function to read a line from stdin
pub fn read_line() -> io::Result<String> {
    read_line_from(&mut io::stdin().lock())
}

/// Print a label and read the answer from stdin
pub fn prompt(label: &str) -> io::Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    read_line()
}

fn read_line_from(reader: &mut impl BufRead) -> io::Result<String> {
    let mut input = String::new();
    reader.read_line(&mut input)?;
    // Only the line terminator is stripped; names are case- and space-sensitive
    Ok(input.trim_end_matches(&['\r', '\n'][..]).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_line_strips_terminator_only() {
        let mut input = Cursor::new(" alice \r\nbob\n");
        assert_eq!(read_line_from(&mut input).unwrap(), " alice ");
        assert_eq!(read_line_from(&mut input).unwrap(), "bob");
        assert_eq!(read_line_from(&mut input).unwrap(), "");
    }
}
