// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Implementation of parser for atom, residue and index numbers.

use crate::errors::SelectError;

#[derive(Debug, Clone, Copy, PartialEq)]
enum NumberToken {
    Number(usize),
    Range,
    Lower,
    LowerOrEqual,
    Greater,
    GreaterOrEqual,
}

impl NumberToken {
    fn str2number(string: &str) -> Result<Self, SelectError> {
        string
            .parse::<usize>()
            .map(NumberToken::Number)
            .map_err(|_| SelectError::InvalidNumber(String::new()))
    }

    fn extract_number(self) -> Result<usize, SelectError> {
        match self {
            NumberToken::Number(n) => Ok(n),
            _ => Err(SelectError::InvalidNumber(String::new())),
        }
    }
}

fn flush(current: &mut String, tokens: &mut Vec<NumberToken>) -> Result<(), SelectError> {
    if !current.is_empty() {
        match current.as_str() {
            ">" => tokens.push(NumberToken::Greater),
            "<" => tokens.push(NumberToken::Lower),
            anything => tokens.push(NumberToken::str2number(anything)?),
        }
        current.clear();
    }

    Ok(())
}

fn tokenize_numbers(token: &[String]) -> Result<Vec<NumberToken>, SelectError> {
    let mut tokens: Vec<NumberToken> = Vec::new();
    let mut current = String::new();

    for char in token.join(" ").chars() {
        match char {
            '-' => {
                flush(&mut current, &mut tokens)?;
                tokens.push(NumberToken::Range);
            }
            '<' | '>' => {
                flush(&mut current, &mut tokens)?;
                current.push(char);
            }
            // '=' can only follow '<' or '>'
            '=' => {
                current.push(char);
                match current.as_str() {
                    ">=" => tokens.push(NumberToken::GreaterOrEqual),
                    "<=" => tokens.push(NumberToken::LowerOrEqual),
                    _ => return Err(SelectError::InvalidNumber(String::new())),
                }
                current.clear();
            }
            c if c.is_whitespace() => flush(&mut current, &mut tokens)?,
            c if c.is_ascii_digit() => {
                if current == ">" || current == "<" {
                    flush(&mut current, &mut tokens)?;
                }
                current.push(c);
            }
            _ => return Err(SelectError::InvalidNumber(String::new())),
        }
    }

    flush(&mut current, &mut tokens)?;
    Ok(tokens)
}

/// Parse numbers and ranges of numbers into a list of closed intervals.
/// `min` is the lowest number that can be selected by the `<` and `<=` operators.
pub(super) fn parse_numbers(token: &[String], min: usize) -> Result<Vec<(usize, usize)>, SelectError> {
    let tokens = tokenize_numbers(token)?;

    let mut numbers: Vec<(usize, usize)> = Vec::new();
    let mut t = 0;
    while t < tokens.len() {
        let token = tokens[t];

        match token {
            NumberToken::Number(n) => {
                // number is the start of a range
                if t + 1 < tokens.len() && tokens[t + 1] == NumberToken::Range {
                    t += 1;
                    continue;
                }

                numbers.push((n, n));
                t += 1;
            }

            NumberToken::Range => {
                if t == 0 || t + 1 == tokens.len() {
                    return Err(SelectError::InvalidNumber(String::new()));
                }

                let previous = tokens[t - 1].extract_number()?;
                let next = tokens[t + 1].extract_number()?;

                if previous > next {
                    return Err(SelectError::InvalidNumber(String::new()));
                }

                numbers.push((previous, next));
                t += 2;
            }

            _ => {
                if t + 1 == tokens.len() {
                    return Err(SelectError::InvalidNumber(String::new()));
                }

                let next = tokens[t + 1].extract_number()?;

                match token {
                    NumberToken::Greater => numbers.push((next.saturating_add(1), usize::MAX)),
                    NumberToken::GreaterOrEqual => numbers.push((next, usize::MAX)),
                    NumberToken::Lower if next > min => numbers.push((min, next - 1)),
                    NumberToken::Lower => (),
                    NumberToken::LowerOrEqual if next >= min => numbers.push((min, next)),
                    NumberToken::LowerOrEqual => (),
                    _ => panic!("FATAL VTRAJ ERROR | numbers::parse_numbers | Impossible match condition reached."),
                }

                t += 2;
            }
        }
    }

    Ok(numbers)
}

/// Sort the intervals and merge the overlapping or adjacent ones.
pub(super) fn merge_ranges(mut ranges: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    ranges.retain(|(start, end)| start <= end);
    ranges.sort_unstable();

    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        match merged.last_mut() {
            Some(last) if start <= last.1.saturating_add(1) => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }

    merged
}

/******************************/
/*         UNIT TESTS         */
/******************************/
