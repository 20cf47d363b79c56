/// Splits one CSV line into trimmed fields.
///
/// Quoted fields may contain commas, and a doubled quote inside a quoted
/// field yields a literal `"`. Malformed quoting is never an error: a stray
/// quote simply toggles the quoting state.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(char) = chars.next() {
        match char {
            '"' if !in_quotes => in_quotes = true,
            '"' if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = false,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(char),
        }
    }
    fields.push(current.trim().to_string());
    fields
}
