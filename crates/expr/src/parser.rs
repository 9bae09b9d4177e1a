//! A `nom`-based parser for configuration keys.
//!
//! The symbols of the syntax are configurable, so the combinators take the
//! active [`ExpressionSymbols`] instead of matching fixed characters.

use crate::ast::{KeySegment, ParsedKey};
use crate::error::ExpressionError;
use crate::symbols::ExpressionSymbols;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_until},
    character::complete::{anychar, digit1},
    combinator::{map, map_res, not, opt, recognize, value, verify},
    multi::{fold_many1, many0, many1},
    sequence::{delimited, preceded},
};

// --- Main Public Parser ---

/// Parses `key` into its segments. The empty key is the root key.
pub fn parse_key(key: &str, symbols: &ExpressionSymbols) -> Result<ParsedKey, ExpressionError> {
    if key.is_empty() {
        return Ok(ParsedKey::default());
    }
    match key_segments(key, symbols) {
        Ok(("", segments)) => Ok(ParsedKey { segments }),
        Ok((rem, _)) => Err(ExpressionError::invalid(
            key,
            format!("Parser did not consume all input. Remainder: '{}'", rem),
        )),
        Err(e) => Err(ExpressionError::invalid(key, e.to_string())),
    }
}

// --- Combinators ---

fn key_segments<'i>(input: &'i str, sym: &ExpressionSymbols) -> IResult<&'i str, Vec<KeySegment>> {
    let (input, mut segments) = part(input, sym)?;
    let (input, rest) = many0(alt((
        // An attribute marker may follow a name without a delimiter.
        |i: &'i str| attributes(i, sym),
        preceded(tag(sym.property_delimiter.as_str()), |i: &'i str| part(i, sym)),
    )))
    .parse(input)?;
    segments.extend(rest.into_iter().flatten());
    Ok((input, segments))
}

/// `name [index] attribute*` or `attribute+`.
fn part<'i>(input: &'i str, sym: &ExpressionSymbols) -> IResult<&'i str, Vec<KeySegment>> {
    alt((
        |i: &'i str| attributes(i, sym),
        |i: &'i str| named_part(i, sym),
    ))
    .parse(input)
}

fn named_part<'i>(input: &'i str, sym: &ExpressionSymbols) -> IResult<&'i str, Vec<KeySegment>> {
    let (input, child) = name(input, sym)?;
    let (input, position) = opt(|i: &'i str| index(i, sym)).parse(input)?;
    let (input, attrs) = many0(|i: &'i str| attribute(i, sym)).parse(input)?;
    let mut segments = Vec::with_capacity(1 + attrs.len());
    segments.push(KeySegment::Child {
        name: child,
        index: position,
    });
    segments.extend(attrs);
    Ok((input, segments))
}

// --- Name Parsers ---

fn reserved<'i>(input: &'i str, sym: &ExpressionSymbols) -> IResult<&'i str, &'i str> {
    alt((
        tag(sym.property_delimiter.as_str()),
        tag(sym.index_start.as_str()),
        tag(sym.attribute_start.as_str()),
    ))
    .parse(input)
}

/// A node name. The escaped delimiter stands for a literal delimiter.
fn name<'i>(input: &'i str, sym: &ExpressionSymbols) -> IResult<&'i str, String> {
    fold_many1(
        alt((
            value(
                sym.property_delimiter.clone(),
                tag(sym.escaped_delimiter.as_str()),
            ),
            map(
                recognize(preceded(not(|i: &'i str| reserved(i, sym)), anychar)),
                str::to_string,
            ),
        )),
        String::new,
        |mut acc, piece| {
            acc.push_str(&piece);
            acc
        },
    )
    .parse(input)
}

fn index<'i>(input: &'i str, sym: &ExpressionSymbols) -> IResult<&'i str, usize> {
    delimited(
        tag(sym.index_start.as_str()),
        map_res(digit1, str::parse::<usize>),
        tag(sym.index_end.as_str()),
    )
    .parse(input)
}

// --- Attribute Parsers ---

fn attribute<'i>(input: &'i str, sym: &ExpressionSymbols) -> IResult<&'i str, KeySegment> {
    map(
        delimited(
            tag(sym.attribute_start.as_str()),
            verify(take_until(sym.attribute_end.as_str()), |s: &str| !s.is_empty()),
            tag(sym.attribute_end.as_str()),
        ),
        KeySegment::attribute,
    )
    .parse(input)
}

fn attributes<'i>(input: &'i str, sym: &ExpressionSymbols) -> IResult<&'i str, Vec<KeySegment>> {
    many1(|i: &'i str| attribute(i, sym)).parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(key: &str) -> Vec<KeySegment> {
        parse_key(key, &ExpressionSymbols::default()).unwrap().segments
    }

    #[test]
    fn test_empty_key_is_root() {
        assert!(parse_key("", &ExpressionSymbols::default()).unwrap().is_root());
    }

    #[test]
    fn test_dotted_path_with_indices() {
        assert_eq!(
            parse("tables.table(1).fields.field(0).name"),
            vec![
                KeySegment::child("tables"),
                KeySegment::indexed("table", 1),
                KeySegment::child("fields"),
                KeySegment::indexed("field", 0),
                KeySegment::child("name"),
            ]
        );
    }

    #[test]
    fn test_attribute_markers() {
        assert_eq!(
            parse("a.b(2)[@type]"),
            vec![
                KeySegment::child("a"),
                KeySegment::indexed("b", 2),
                KeySegment::attribute("type"),
            ]
        );
        assert_eq!(parse("a.[@x]"), vec![KeySegment::child("a"), KeySegment::attribute("x")]);
        assert_eq!(parse("[@version]"), vec![KeySegment::attribute("version")]);
    }

    #[test]
    fn test_escaped_delimiter_is_part_of_name() {
        assert_eq!(parse("server..name.port"), vec![KeySegment::child("server.name"), KeySegment::child("port")]);
        assert_eq!(parse("a...b"), vec![KeySegment::child("a."), KeySegment::child("b")]);
    }

    #[test]
    fn test_malformed_keys() {
        let sym = ExpressionSymbols::default();
        for key in ["a.", ".a", "a(x)", "a(1", "a[@]", "a[@b", "a(1)b", "a..b(", "[@a]b"] {
            let err = parse_key(key, &sym).unwrap_err();
            assert!(
                matches!(err, ExpressionError::InvalidArgument { .. }),
                "expected '{key}' to be rejected"
            );
        }
    }

    #[test]
    fn test_custom_symbols() {
        let sym = ExpressionSymbols::default()
            .with_property_delimiter("/")
            .with_escaped_delimiter("//")
            .with_index_brackets("[", "]")
            .with_attribute_brackets("{", "}");
        let parsed = parse_key("a/b[3]{id}", &sym).unwrap();
        assert_eq!(
            parsed.segments,
            vec![KeySegment::child("a"), KeySegment::indexed("b", 3), KeySegment::attribute("id")]
        );
    }
}
