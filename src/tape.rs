use crate::error::{Fault, ParseError};

/// Decode a program from its text form: a single line of comma-separated
/// decimal integers, e.g. `1,9,10,3,2,3,11,0,99,30,40,50`.
///
/// Surrounding whitespace (including the trailing newline of an input file)
/// is ignored, as is whitespace around each field.
pub fn parse_program(text: &str) -> Result<Vec<i64>, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }
    text.split(',')
        .enumerate()
        .map(|(index, field)| {
            let field = field.trim();
            field.parse::<i64>().map_err(|source| ParseError::InvalidInteger {
                index,
                field: field.to_string(),
                source,
            })
        })
        .collect()
}

/// Render a tape back into the comma-separated text form.
pub fn format_program(tape: &[i64]) -> String {
    tape.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Interpret `value` as an index into a tape of length `len`.
pub fn address(value: i64, len: usize) -> Result<usize, Fault> {
    match usize::try_from(value) {
        Ok(idx) if idx < len => Ok(idx),
        _ => Err(Fault::OutOfBounds { index: value, len }),
    }
}

/// Read the cell at a pointer position (instruction pointer or operand slot).
pub fn cell(tape: &[i64], pos: usize) -> Result<i64, Fault> {
    tape.get(pos).copied().ok_or(Fault::OutOfBounds {
        index: i64::try_from(pos).unwrap_or(i64::MAX),
        len: tape.len(),
    })
}

/// Read the cell addressed by `index`.
pub fn read(tape: &[i64], index: i64) -> Result<i64, Fault> {
    let idx = address(index, tape.len())?;
    Ok(tape[idx])
}

/// Write `value` into the cell addressed by `index`.
pub fn write(tape: &mut [i64], index: i64, value: i64) -> Result<(), Fault> {
    let idx = address(index, tape.len())?;
    tape[idx] = value;
    Ok(())
}
