use nom::IResult;
use nom::Parser;
use nom::branch::alt;
use nom::character::complete::{char, digit0, digit1, one_of};
use nom::combinator::{opt, recognize};

/// Recognize one decimal literal: optional sign, digits with an optional
/// fractional part (or a bare fraction like `.5`), optional exponent.
///
/// A dangling `.` or `e` is left in the input, so `12.` yields `12` and
/// `3e` yields `3`.
fn number(input: &str) -> IResult<&str, &str> {
    recognize((
        opt(one_of("+-")),
        alt((recognize((digit0, char('.'), digit1)), digit1)),
        opt((one_of("eE"), opt(one_of("+-")), digit1)),
    ))
    .parse(input)
}

/// Extract every number found anywhere in `lines`, in line order and
/// left-to-right within each line.
///
/// Anything that doesn't start a number is skipped one character at a time,
/// so values may be packed several per line, wrapped across lines, or
/// surrounded by arbitrary text.
pub fn tokenize_numbers(lines: &[&str]) -> Vec<f64> {
    let mut tokens = Vec::new();

    for line in lines {
        let mut rest = *line;
        while let Some(c) = rest.chars().next() {
            match number(rest) {
                Ok((tail, text)) => {
                    if let Ok(value) = text.parse::<f64>() {
                        tokens.push(value);
                    }
                    rest = tail;
                }
                Err(_) => rest = &rest[c.len_utf8()..],
            }
        }
    }

    tokens
}
