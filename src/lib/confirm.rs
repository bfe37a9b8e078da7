use std::io::{BufRead, Write};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Decision {
    Commit,
    Rollback,
}

/// Only `y` or `yes` (any case, surrounding whitespace ignored) commits.
pub fn parse_answer(answer: &str) -> Decision {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => Decision::Commit,
        _ => Decision::Rollback,
    }
}

/// Asks the operator whether `rows` pending changes should be committed.
/// End of input counts as an empty answer.
pub fn ask_for_confirmation<R, W>(
    rows: u64,
    mut input: R,
    output: &mut W,
) -> std::io::Result<Decision>
where
    R: BufRead,
    W: Write,
{
    write!(
        output,
        "This will affect {} rows. Commit changes? (y/n): ",
        rows
    )?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(parse_answer(&answer))
}
