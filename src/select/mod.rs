// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Implementation of a compact VMD-like selection language for selecting subsets of atoms.
//!
//! ## Supported keywords
//! - `all`: every atom.
//! - `resname`: residue names.
//! - `name` or `atomname`: atom names.
//! - `resid` or `resnum`: residue numbers.
//! - `serial`: atom positions in the structure, starting from 1.
//! - `atomid` or `atomnum`: atom numbers as written in the structure file.
//! - `index`: atom positions in the structure, starting from 0.
//!
//! Names can be provided as words, quoted words or regular expressions (`r'^C[AB]$'`).
//! Numbers can be provided as single numbers, ranges (`1-5`, `1 to 5`) or open ranges (`< 5`, `>= 10`).
//! Conditions can be combined using `and` (`&&`), `or` (`||`), `not` (`!`) and parentheses.
//! Operations are evaluated from left to right.
//!
//! Macros `@protein`, `@backbone` and `@calpha` are expanded before parsing.

use crate::errors::SelectError;
use crate::structures::atom::Atom;

use self::name::Name;

mod name;
mod numbers;

/// Parsed selection tree.
#[derive(Debug, PartialEq, Clone)]
pub enum Select {
    All,
    ResidueName(Vec<Name>),
    AtomName(Vec<Name>),
    ResidueNumber(Vec<(usize, usize)>),
    Serial(Vec<(usize, usize)>),
    AtomNumber(Vec<(usize, usize)>),
    Index(Vec<(usize, usize)>),
    And(Box<Select>, Box<Select>),
    Or(Box<Select>, Box<Select>),
    Not(Box<Select>),
}

#[derive(Debug, PartialEq)]
enum Operator {
    And,
    Or,
}

/// Macros expanded before the query is parsed.
/// Residue names of `@protein` partly based on https://github.com/gromacs/gromacs/blob/main/share/top/residuetypes.dat
const MACROS: [(&str, &str); 3] = [
    (
        "@protein",
        "(resname ABU ACE AIB ALA ARG ARGN ASN ASN1 ASP ASP1 ASPH ASPP ASH CT3 CYS CYS1 CYS2 CYSH DALA GLN GLU GLUH GLUP GLH GLY HIS HIS1 HISA HISB HISH HISD HISE HISP HSD HSE HSP HYP ILE LEU LSN LYS LYSN LYSH MELEU MET MEVAL NAC NME NHE NH2 PHE PHEH PHEU PHL PRO SER THR TRP TRPH TRPU TYR TYRH TYRU VAL PGLU HID HIE HIP LYP LYN CYN CYM CYX DAB ORN NALA NGLY NSER NTHR NLEU NILE NVAL NASN NGLN NARG NHID NHIE NHIP NTRP NPHE NTYR NGLU NASP NLYS NPRO NCYS NMET CALA CGLY CSER CTHR CLEU CILE CVAL CASN CGLN CARG CHID CHIE CHIP CTRP CPHE CTYR CGLU CASP CLYS CPRO CCYS CMET)",
    ),
    ("@backbone", "(name N CA C O)"),
    ("@calpha", "(name CA)"),
];

impl Select {
    /// Construct a selection tree from the given query.
    ///
    /// ## Example
    /// ```
    /// # use vtraj_rs::select::Select;
    /// #
    /// let select = Select::parse_query("resname LYS and not name CA").unwrap();
    /// assert!(matches!(select, Select::And(_, _)));
    /// ```
    pub fn parse_query(query: &str) -> Result<Select, SelectError> {
        if query.trim().is_empty() {
            return Err(SelectError::EmptyQuery);
        }

        if !par_balanced(query) {
            return Err(SelectError::InvalidParentheses(query.to_string()));
        }

        if !quotes_balanced(query) {
            return Err(SelectError::InvalidQuotes(query.to_string()));
        }

        let mut expression = query.to_string();
        for (m, expanded) in MACROS {
            expression = expression.replace(m, expanded);
        }

        let expression: Vec<char> = replace_keywords(&expression).chars().collect();

        parse_subquery(&expression, 0, expression.len())
            .map(|tree| *tree)
            .map_err(|e| with_query(e, query))
    }

    /// Check whether the atom with the given index matches the selection.
    pub fn matches(&self, index: usize, atom: &Atom) -> bool {
        let within = |ranges: &[(usize, usize)], number: usize| {
            ranges
                .iter()
                .any(|&(start, end)| number >= start && number <= end)
        };

        match self {
            Select::All => true,
            Select::ResidueName(names) => names.iter().any(|n| n == atom.get_residue_name()),
            Select::AtomName(names) => names.iter().any(|n| n == atom.get_atom_name()),
            Select::ResidueNumber(ranges) => within(ranges, atom.get_residue_number()),
            Select::Serial(ranges) => within(ranges, index + 1),
            Select::AtomNumber(ranges) => within(ranges, atom.get_atom_number()),
            Select::Index(ranges) => within(ranges, index),
            Select::And(left, right) => left.matches(index, atom) && right.matches(index, atom),
            Select::Or(left, right) => left.matches(index, atom) || right.matches(index, atom),
            Select::Not(operand) => !operand.matches(index, atom),
        }
    }

    /// Get indices of all atoms matching the selection, in ascending order.
    pub fn select_indices(&self, atoms: &[Atom]) -> Vec<usize> {
        atoms
            .iter()
            .enumerate()
            .filter(|(i, atom)| self.matches(*i, atom))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Parse the query and get indices of all matching atoms.
pub fn select_atoms(query: &str, atoms: &[Atom]) -> Result<Vec<usize>, SelectError> {
    Ok(Select::parse_query(query)?.select_indices(atoms))
}

/// Replace the empty placeholder in an error raised during parsing with the full query.
fn with_query(error: SelectError, query: &str) -> SelectError {
    let query = query.to_string();
    match error {
        SelectError::InvalidOperator(_) => SelectError::InvalidOperator(query),
        SelectError::MissingArgument(_) => SelectError::MissingArgument(query),
        SelectError::EmptyArgument(_) => SelectError::EmptyArgument(query),
        SelectError::InvalidParentheses(_) => SelectError::InvalidParentheses(query),
        SelectError::InvalidNumber(_) => SelectError::InvalidNumber(query),
        SelectError::InvalidTokenParentheses(_) => SelectError::InvalidTokenParentheses(query),
        SelectError::UnknownKeyword(keyword, _) => SelectError::UnknownKeyword(keyword, query),
        other => other,
    }
}

fn parse_subquery(expression: &[char], start: usize, end: usize) -> Result<Box<Select>, SelectError> {
    let mut tree: Option<Box<Select>> = None;

    let mut i = start;

    let mut token = String::new();
    let mut negations = 0usize;
    let mut binary_operator: Option<Operator> = None;

    let mut inside_regex = false;

    while i < end {
        let c = expression[i];

        // operators inside regular expressions are ignored
        if inside_regex {
            if c == '\'' {
                inside_regex = false;
            }

            token.push(c);
            i += 1;
            continue;
        }

        match c {
            '(' => {
                if !token.trim().is_empty() {
                    return Err(SelectError::InvalidTokenParentheses(String::new()));
                }

                let new_end = find_parenthesis(expression, i, end)
                    .ok_or_else(|| SelectError::InvalidParentheses(String::new()))?;

                let parsed = parse_subquery(expression, i + 1, new_end)?;
                tree = process_operation(tree, parsed, &mut negations, &binary_operator)?;
                binary_operator = None;

                i = new_end + 1;
            }

            ')' => return Err(SelectError::InvalidParentheses(String::new())),

            '&' | '|' => {
                let operator = find_operator(expression, c, i)
                    .ok_or_else(|| SelectError::InvalidOperator(String::new()))?;

                if !token.trim().is_empty() {
                    let parsed = Box::from(parse_token(&token)?);
                    tree = process_operation(tree, parsed, &mut negations, &binary_operator)?;
                    token.clear();
                } else if binary_operator.is_some() || tree.is_none() {
                    return Err(SelectError::MissingArgument(String::new()));
                }

                binary_operator = Some(operator);
                i += 2;
            }

            '!' => {
                if !token.trim().is_empty() {
                    return Err(SelectError::InvalidOperator(String::new()));
                }

                negations += 1;
                i += 1;
            }

            'r' if expression.get(i + 1) == Some(&'\'') => {
                token.push('r');
                token.push('\'');
                i += 2;
                inside_regex = true;
            }

            _ => {
                token.push(c);
                i += 1;
            }
        }
    }

    if !token.trim().is_empty() {
        let parsed = Box::from(parse_token(&token)?);
        tree = process_operation(tree, parsed, &mut negations, &binary_operator)?;
    } else if binary_operator.is_some() || negations > 0 {
        return Err(SelectError::MissingArgument(String::new()));
    }

    tree.ok_or_else(|| SelectError::MissingArgument(String::new()))
}

fn process_operation(
    tree: Option<Box<Select>>,
    mut parsed: Box<Select>,
    negations: &mut usize,
    binary: &Option<Operator>,
) -> Result<Option<Box<Select>>, SelectError> {
    for _ in 0..*negations {
        parsed = Box::from(Select::Not(parsed));
    }
    *negations = 0;

    match (tree, binary) {
        (Some(t), Some(Operator::And)) => Ok(Some(Box::from(Select::And(t, parsed)))),
        (Some(t), Some(Operator::Or)) => Ok(Some(Box::from(Select::Or(t, parsed)))),
        (None, Some(_)) => Err(SelectError::MissingArgument(String::new())),
        // two operands without an operator between them
        (Some(_), None) => Err(SelectError::InvalidTokenParentheses(String::new())),
        (None, None) => Ok(Some(parsed)),
    }
}

fn find_operator(expression: &[char], op_symbol: char, start: usize) -> Option<Operator> {
    if expression.get(start + 1) == Some(&op_symbol) {
        match op_symbol {
            '&' => Some(Operator::And),
            '|' => Some(Operator::Or),
            _ => None,
        }
    } else {
        None
    }
}

/// Check whether the parentheses are balanced and never closed before being opened.
fn par_balanced(string: &str) -> bool {
    let mut depth = 0i64;
    for c in string.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => (),
        }
    }

    depth == 0
}

/// Check whether the number of ' and " is even.
fn quotes_balanced(string: &str) -> bool {
    let single = string.chars().filter(|&c| c == '\'').count();
    let double = string.chars().filter(|&c| c == '"').count();

    single % 2 == 0 && double % 2 == 0
}

fn find_parenthesis(expression: &[char], start: usize, end: usize) -> Option<usize> {
    let mut depth = 0usize;

    for (index, &c) in expression.iter().enumerate().take(end).skip(start) {
        if c == '(' {
            depth += 1;
        } else if c == ')' {
            depth -= 1;
            if depth == 0 {
                return Some(index);
            }
        }
    }

    None
}

/// Replace alphabetical keywords with their symbolic representations.
/// Ignores quote blocks.
fn replace_keywords(input: &str) -> String {
    let mut result = String::new();
    let mut input_chars = input.chars().peekable();
    let mut inside_quotes = false;

    while let Some(c) = input_chars.next() {
        if c == '\'' || c == '"' {
            inside_quotes = !inside_quotes;
            result.push(c);
            continue;
        }

        if inside_quotes {
            result.push(c);
            continue;
        }

        if c.is_alphanumeric() || c == '_' {
            let keyword = get_keyword(&mut input_chars, c);
            let replaced = match keyword.as_str() {
                "and" => "&&",
                "or" => "||",
                "not" => "!",
                "to" => "-",
                _ => keyword.as_str(),
            };
            result.push_str(replaced);
        } else {
            result.push(c);
        }
    }

    result
}

fn get_keyword<I: Iterator<Item = char>>(
    iter: &mut std::iter::Peekable<I>,
    first_char: char,
) -> String {
    let mut keyword = String::new();
    keyword.push(first_char);

    while let Some(&c) = iter.peek() {
        // a regular expression block starts right after `r`
        if keyword == "r" && c == '\'' {
            break;
        }

        if c.is_alphanumeric() || c == '_' {
            keyword.push(c);
            iter.next();
        } else {
            break;
        }
    }

    keyword
}

/// Split a string by whitespace while keeping the items enclosed in ' or " together.
fn split_with_quotes(string: &str) -> Vec<String> {
    let mut result = vec![String::new()];
    let mut inside = false;
    let mut regex = false;

    let mut iterator = string.chars().peekable();

    while let Some(c) = iterator.next() {
        if c == 'r' && !inside && result.last().is_some_and(|s| s.is_empty()) {
            if let Some('\'') = iterator.peek() {
                regex = true;
                inside = true;
                if let Some(last) = result.last_mut() {
                    last.push_str("r'");
                }
                iterator.next();
                continue;
            }
        }

        if c == '\'' || c == '"' {
            inside = !inside;
            if regex {
                if let Some(last) = result.last_mut() {
                    last.push(c);
                }
                regex = false;
            }
            continue;
        }

        if c.is_whitespace() && !inside {
            result.push(String::new());
            continue;
        }

        if let Some(last) = result.last_mut() {
            last.push(c);
        }
    }

    result
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect()
}

fn collect_words(token: &[String]) -> Result<Vec<Name>, SelectError> {
    token.iter().map(|s| Name::new(s)).collect()
}

fn parse_token(string: &str) -> Result<Select, SelectError> {
    let token = split_with_quotes(string);
    let Some(keyword) = token.first() else {
        return Err(SelectError::MissingArgument(String::new()));
    };

    let arguments = &token[1..];
    if keyword != "all" && arguments.is_empty() {
        return Err(SelectError::EmptyArgument(String::new()));
    }

    match keyword.as_str() {
        "all" if arguments.is_empty() => Ok(Select::All),
        "all" => Err(SelectError::InvalidTokenParentheses(String::new())),
        "resname" => Ok(Select::ResidueName(collect_words(arguments)?)),
        "name" | "atomname" => Ok(Select::AtomName(collect_words(arguments)?)),
        "resid" | "resnum" => Ok(Select::ResidueNumber(numbers::merge_ranges(
            numbers::parse_numbers(arguments, 1)?,
        ))),
        "serial" => Ok(Select::Serial(numbers::merge_ranges(
            numbers::parse_numbers(arguments, 1)?,
        ))),
        "atomid" | "atomnum" => Ok(Select::AtomNumber(numbers::merge_ranges(
            numbers::parse_numbers(arguments, 1)?,
        ))),
        "index" => Ok(Select::Index(numbers::merge_ranges(
            numbers::parse_numbers(arguments, 0)?,
        ))),
        unknown => Err(SelectError::UnknownKeyword(unknown.to_string(), String::new())),
    }
}

/******************************/
/*         UNIT TESTS         */
/******************************/

#[cfg(test)]
mod tests {
    use super::*;

    fn names(names: &[&str]) -> Vec<Name> {
        names.iter().map(|n| Name::new(n).unwrap()).collect()
    }

    fn small_protein() -> Vec<Atom> {
        vec![
            Atom::new(1, "ALA", 1, "N"),
            Atom::new(1, "ALA", 2, "CA"),
            Atom::new(1, "ALA", 3, "C"),
            Atom::new(1, "ALA", 4, "O"),
            Atom::new(2, "GLY", 5, "N"),
            Atom::new(2, "GLY", 6, "CA"),
            Atom::new(2, "GLY", 7, "C"),
            Atom::new(2, "GLY", 8, "O"),
            Atom::new(3, "SOL", 9, "OW"),
            Atom::new(3, "SOL", 10, "HW1"),
            Atom::new(3, "SOL", 11, "HW2"),
        ]
    }

    macro_rules! parsing_success {
        ($name:ident, $expression:expr, $expected:expr) => {
            #[test]
            fn $name() {
                match Select::parse_query($expression) {
                    Ok(x) => assert_eq!(x, $expected),
                    Err(e) => panic!("Parsing failed, returning {:?}", e),
                }
            }
        };
    }

    macro_rules! selection_indices {
        ($name:ident, $expression:expr, $expected:expr) => {
            #[test]
            fn $name() {
                let atoms = small_protein();
                let indices = select_atoms($expression, &atoms).unwrap();
                assert_eq!(indices, $expected);
            }
        };
    }

    parsing_success!(parse_all, "all", Select::All);

    parsing_success!(
        parse_resname,
        "resname ALA GLY",
        Select::ResidueName(names(&["ALA", "GLY"]))
    );

    parsing_success!(
        parse_name_alias,
        "atomname CA",
        Select::AtomName(names(&["CA"]))
    );

    parsing_success!(
        parse_quoted_name,
        "name 'C A' \"O W\"",
        Select::AtomName(names(&["C A", "O W"]))
    );

    parsing_success!(
        parse_regex,
        "name r'^C[A ]$'",
        Select::AtomName(vec![Name::new("r'^C[A ]$'").unwrap()])
    );

    parsing_success!(
        parse_resid_ranges,
        "resid 1 to 3 7-8 5",
        Select::ResidueNumber(vec![(1, 3), (5, 5), (7, 8)])
    );

    parsing_success!(
        parse_index_open,
        "index < 3",
        Select::Index(vec![(0, 2)])
    );

    parsing_success!(
        parse_and_not,
        "resname ALA and not name CA",
        Select::And(
            Box::from(Select::ResidueName(names(&["ALA"]))),
            Box::from(Select::Not(Box::from(Select::AtomName(names(&["CA"]))))),
        )
    );

    parsing_success!(
        parse_left_to_right,
        "name CA || name N && resid 1",
        Select::And(
            Box::from(Select::Or(
                Box::from(Select::AtomName(names(&["CA"]))),
                Box::from(Select::AtomName(names(&["N"]))),
            )),
            Box::from(Select::ResidueNumber(vec![(1, 1)])),
        )
    );

    parsing_success!(
        parse_parentheses,
        "name CA or (name N and resid 1)",
        Select::Or(
            Box::from(Select::AtomName(names(&["CA"]))),
            Box::from(Select::And(
                Box::from(Select::AtomName(names(&["N"]))),
                Box::from(Select::ResidueNumber(vec![(1, 1)])),
            )),
        )
    );

    parsing_success!(
        parse_double_negation,
        "not !(resname SOL)",
        Select::Not(Box::from(Select::Not(Box::from(Select::ResidueName(
            names(&["SOL"])
        )))))
    );

    parsing_success!(
        parse_calpha_macro,
        "@calpha",
        Select::AtomName(names(&["CA"]))
    );

    selection_indices!(select_all, "all", (0..11).collect::<Vec<usize>>());
    selection_indices!(select_calpha, "name CA", vec![1, 5]);
    selection_indices!(select_backbone, "@backbone", (0..8).collect::<Vec<usize>>());
    selection_indices!(select_protein, "@protein", (0..8).collect::<Vec<usize>>());
    selection_indices!(
        select_protein_calpha,
        "@protein and @calpha",
        vec![1, 5]
    );
    selection_indices!(select_not_protein, "not @protein", vec![8, 9, 10]);
    selection_indices!(select_serial, "serial 1 3-4", vec![0, 2, 3]);
    selection_indices!(select_index, "index 1 3-4", vec![1, 3, 4]);
    selection_indices!(select_atomid, "atomid >= 10", vec![9, 10]);
    selection_indices!(select_resid, "resid <= 1", vec![0, 1, 2, 3]);
    selection_indices!(select_regex, "name r'^HW'", vec![9, 10]);
    selection_indices!(select_nothing, "resname LYS", Vec::<usize>::new());
    selection_indices!(
        select_complex,
        "(resname GLY or resname SOL) and not name r'^H' and not name N C O",
        vec![5, 8]
    );

    #[test]
    fn empty_query() {
        assert_eq!(Select::parse_query("   "), Err(SelectError::EmptyQuery));
    }

    macro_rules! parsing_fails {
        ($name:ident, $expression:expr, $variant:pat) => {
            #[test]
            fn $name() {
                match Select::parse_query($expression) {
                    Err($variant) => (),
                    other => panic!("Unexpected result {:?}", other),
                }
            }
        };
    }

    parsing_fails!(fail_parentheses, "(name CA", SelectError::InvalidParentheses(_));
    parsing_fails!(fail_parentheses_order, ")name CA(", SelectError::InvalidParentheses(_));
    parsing_fails!(fail_quotes, "name 'CA", SelectError::InvalidQuotes(_));
    parsing_fails!(fail_operator, "name CA & name N", SelectError::InvalidOperator(_));
    parsing_fails!(fail_missing_right, "name CA and", SelectError::MissingArgument(_));
    parsing_fails!(fail_missing_left, "or name CA", SelectError::MissingArgument(_));
    parsing_fails!(fail_empty_argument, "resname", SelectError::EmptyArgument(_));
    parsing_fails!(fail_number, "resid 1-x", SelectError::InvalidNumber(_));
    parsing_fails!(fail_regex, "name r'C[A'", SelectError::InvalidRegex(_));
    parsing_fails!(
        fail_token_parentheses,
        "(name CA) (name N)",
        SelectError::InvalidTokenParentheses(_)
    );
    parsing_fails!(fail_unknown, "group Protein", SelectError::UnknownKeyword(_, _));

    #[test]
    fn error_carries_query() {
        match Select::parse_query("resname ALA and") {
            Err(SelectError::MissingArgument(q)) => assert_eq!(q, "resname ALA and"),
            other => panic!("Unexpected result {:?}", other),
        }

        match Select::parse_query("chain A") {
            Err(SelectError::UnknownKeyword(k, q)) => {
                assert_eq!(k, "chain");
                assert_eq!(q, "chain A");
            }
            other => panic!("Unexpected result {:?}", other),
        }
    }
}
