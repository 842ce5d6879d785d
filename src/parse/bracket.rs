//! Decoder for the inside of a bracketed SMILES atom, e.g. `13C@@H`, `NH4+`, `nH`, `Fe+2`.

use crate::element;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1, one_of, satisfy},
    combinator::{map, map_opt, opt, recognize, value},
    sequence::{pair, preceded, tuple},
    IResult,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketAtom {
    pub symbol: String,
    pub aromatic: bool,
    pub chirality: Option<char>,
    pub hydrogens: u32,
    pub charge: i32,
}

fn is_upper(c: char) -> bool {
    c.is_ascii_uppercase()
}

fn is_lower(c: char) -> bool {
    c.is_ascii_lowercase()
}

fn element_symbol(input: &str) -> IResult<&str, (String, bool)> {
    alt((
        map(recognize(pair(satisfy(is_upper), opt(satisfy(is_lower)))), |s: &str| {
            (s.to_string(), false)
        }),
        // Lowercase spellings denote aromatic atoms: `c`, `n`, `se`, ...
        map_opt(recognize(pair(satisfy(is_lower), opt(satisfy(is_lower)))), |s: &str| {
            element::from_aromatic_spelling(s).map(|symbol| (symbol, true))
        }),
    ))(input)
}

/// `@@` is read as configuration R, a single `@` as S.
fn chirality(input: &str) -> IResult<&str, Option<char>> {
    opt(alt((value('R', tag("@@")), value('S', tag("@")))))(input)
}

/// Hydrogen counts and charge magnitudes are a single digit; longer runs are left undecoded.
fn single_digit(input: &str) -> IResult<&str, u32> {
    map_opt(satisfy(|c| c.is_ascii_digit()), |c| c.to_digit(10))(input)
}

fn hydrogens(input: &str) -> IResult<&str, u32> {
    map(opt(preceded(char('H'), opt(single_digit))), |h| match h {
        None => 0,
        Some(count) => count.unwrap_or(1),
    })(input)
}

fn charge(input: &str) -> IResult<&str, i32> {
    let doubled = alt((value(2, tag("++")), value(-2, tag("--"))));
    let signed = map(pair(one_of("+-"), opt(single_digit)), |(sign, magnitude)| {
        let magnitude = magnitude.unwrap_or(1) as i32;
        if sign == '-' {
            -magnitude
        } else {
            magnitude
        }
    });
    map(opt(alt((doubled, signed))), |c| c.unwrap_or(0))(input)
}

/// Parse a bracket atom body: isotope, symbol, chirality, hydrogens, charge, atom class.
///
/// The isotope and the `:n` atom class are accepted and dropped.
pub fn bracket_atom(input: &str) -> IResult<&str, BracketAtom> {
    map(
        tuple((
            opt(digit1),
            element_symbol,
            chirality,
            hydrogens,
            charge,
            opt(preceded(char(':'), digit1)),
        )),
        |(_, (symbol, aromatic), chirality, hydrogens, charge, _)| BracketAtom {
            symbol,
            aromatic,
            chirality,
            hydrogens,
            charge,
        },
    )(input)
}

/// Decode a bracket body, returning the atom and any text left undecoded.
pub fn decode_bracket_atom(content: &str) -> Option<(BracketAtom, &str)> {
    bracket_atom(content).ok().map(|(rest, atom)| (atom, rest))
}
