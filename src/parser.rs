//! This module provides the parser for machine configurations, utilizing the `pest` crate.
//! It defines the grammar for `.utm` files and functions to turn the input into a `MachineConfig`.

use crate::{
    analyzer::analyze,
    tape::Tape,
    types::{MachineConfig, MachineError, Program, Symbol, DEFAULT_PACE_MS},
};
use pest::{
    error::{Error, ErrorVariant},
    iterators::Pair,
    Parser as PestParser, Span,
};
use pest_derive::Parser as PestParser;
use std::collections::HashSet;

/// Derives a `PestParser` for the configuration grammar defined in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct ConfigParser;

/// How the initial tape was written down.
enum TapeSource {
    Symbols(Vec<Symbol>),
    Operands(usize, usize),
}

/// Parses the given input string into a `MachineConfig`.
///
/// The input is trimmed, parsed with `ConfigParser` and the resulting tree is turned into a
/// configuration. The configuration is validated before being returned.
///
/// # Arguments
///
/// * `input` - A string slice containing the configuration.
///
/// # Returns
///
/// * `Ok(MachineConfig)` if the input is successfully parsed and validated.
/// * `Err(MachineError::ParseError)` if there are any syntax errors.
/// * `Err(MachineError::ValidationError)` if the configuration fails validation.
pub fn parse(input: &str) -> Result<MachineConfig, MachineError> {
    let root = ConfigParser::parse(Rule::config, input.trim())
        .map_err(|e| MachineError::ParseError(e.into()))?
        .next()
        .ok_or_else(|| MachineError::ValidationError("Empty configuration".to_string()))?;

    let config = parse_config(root)?;

    analyze(&config)?;

    Ok(config)
}

/// Parses the top-level sections of a configuration from a `Pair<Rule::config>`.
fn parse_config(pair: Pair<Rule>) -> Result<MachineConfig, MachineError> {
    let mut name: Option<String> = None;
    let mut program: Option<Program> = None;
    let mut source: Option<TapeSource> = None;
    let mut length: Option<(usize, Span)> = None;
    let mut pace_ms: Option<u64> = None;
    let mut seen = HashSet::new();

    for p in pair.into_inner() {
        let span = p.as_span();
        let rule = p.as_rule();

        check_unique_rule(rule, span, &mut seen)?;

        match rule {
            Rule::name => name = Some(parse_inner_string(p)?.trim().to_string()),
            Rule::program => program = Some(parse_program(p)?),
            Rule::tape | Rule::operands => {
                check_exclusive_rule(&source, vec!["tape", "operands"], span)?;
                source = Some(if rule == Rule::tape {
                    parse_symbols(p)?
                } else {
                    parse_operands(p)?
                });
            }
            Rule::length => length = Some((parse_index(p)?, span)),
            Rule::pace => pace_ms = Some(parse_index(p)? as u64),
            _ => {} // EOI
        }
    }

    let name = check_required_rule(name, vec!["name"])?;
    let source = check_required_rule(source, vec!["tape", "operands"])?;
    let tape = build_tape(source, length)?;

    Ok(MachineConfig {
        name,
        program,
        tape,
        pace_ms: pace_ms.unwrap_or(DEFAULT_PACE_MS),
    })
}

/// Builds the initial tape, padding it with blanks up to the requested length.
fn build_tape(source: TapeSource, length: Option<(usize, Span)>) -> Result<Tape, MachineError> {
    if let Some((len, span)) = length {
        Tape::check_len(len).map_err(|e| parse_error(&e.to_string(), span))?;
    }

    match source {
        TapeSource::Operands(a, b) => {
            let len = match length {
                Some((len, _)) => len,
                None => Tape::required_len(a, b)?,
            };
            Tape::from_operands(a, b, len)
        }
        TapeSource::Symbols(mut symbols) => {
            if let Some((len, span)) = length {
                if len < symbols.len() {
                    return Err(parse_error(
                        &format!(
                            "Tape length {len} is shorter than the {} given symbols",
                            symbols.len()
                        ),
                        span,
                    ));
                }
                symbols.resize(len, Symbol::Blank);
            }
            Ok(Tape::from_symbols(symbols))
        }
    }
}

/// Parses the tape symbols from a `Pair<Rule::tape>`.
fn parse_symbols(pair: Pair<Rule>) -> Result<TapeSource, MachineError> {
    let mut symbols = Vec::new();

    // Rule: tape > symbols > [symbol]
    for inner in pair.into_inner().flat_map(|p| p.into_inner()) {
        let span = inner.as_span();
        let symbol = inner
            .as_str()
            .chars()
            .next()
            .ok_or_else(|| parse_error("Empty tape symbol", span))
            .and_then(|c| Symbol::try_from(c).map_err(|e| parse_error(&e.to_string(), span)))?;
        symbols.push(symbol);
    }

    Ok(TapeSource::Symbols(symbols))
}

/// Parses the two operands from a `Pair<Rule::operands>`.
fn parse_operands(pair: Pair<Rule>) -> Result<TapeSource, MachineError> {
    let span = pair.as_span();
    let values = pair
        .into_inner()
        .map(parse_number)
        .collect::<Result<Vec<_>, _>>()?;

    match values.as_slice() {
        [a, b] => Ok(TapeSource::Operands(*a, *b)),
        _ => Err(parse_error("Expected exactly two operands", span)),
    }
}

/// Parses the program name from a `Pair<Rule::program>`.
fn parse_program(pair: Pair<Rule>) -> Result<Program, MachineError> {
    let span = pair.as_span();
    parse_inner_string(pair)?
        .parse()
        .map_err(|e: MachineError| parse_error(&e.to_string(), span))
}

/// Parses the single number inside a `length` or `pace` section.
fn parse_index(pair: Pair<Rule>) -> Result<usize, MachineError> {
    let span = pair.as_span();
    pair.into_inner()
        .next()
        .ok_or_else(|| parse_error("Missing number", span))
        .and_then(parse_number)
}

/// Parses a `Pair<Rule::index>` into a number.
fn parse_number(pair: Pair<Rule>) -> Result<usize, MachineError> {
    let span = pair.as_span();
    pair.as_str()
        .parse::<usize>()
        .map_err(|e| parse_error(&format!("Invalid number {}: {e}", pair.as_str()), span))
}

/// Creates a `MachineError::ParseError` from a message and a `Span`.
fn parse_error(msg: &str, span: Span) -> MachineError {
    MachineError::ParseError(Box::new(Error::new_from_span(
        ErrorVariant::CustomError {
            message: msg.to_string(),
        },
        span,
    )))
}

/// Extracts the inner string content from a `Pair`.
fn parse_inner_string(pair: Pair<Rule>) -> Result<String, MachineError> {
    let span = pair.as_span();
    pair.into_inner()
        .next()
        .map(|p| p.as_str().to_string())
        .ok_or_else(|| parse_error("Missing value", span))
}

/// Checks if a given section has already been declared.
fn check_unique_rule(
    rule: Rule,
    span: Span,
    seen: &mut HashSet<Rule>,
) -> Result<(), MachineError> {
    if !matches!(
        rule,
        Rule::name | Rule::program | Rule::tape | Rule::operands | Rule::length | Rule::pace
    ) {
        return Ok(());
    };

    if !seen.insert(rule) {
        return Err(parse_error(
            &format!("Duplicate \"{rule:?}:\" declaration"),
            span,
        ));
    }

    Ok(())
}

/// Checks if an exclusive section (`tape` vs. `operands`) has been violated.
fn check_exclusive_rule<T>(
    value: &Option<T>,
    names: Vec<&str>,
    span: Span,
) -> Result<(), MachineError> {
    if value.is_some() {
        return Err(parse_error(
            &format!("Only one of {} is allowed", format_rules(names)),
            span,
        ));
    }

    Ok(())
}

/// Checks if a required section is present, returning an `Err` if it's missing.
fn check_required_rule<T>(value: Option<T>, names: Vec<&str>) -> Result<T, MachineError> {
    value.ok_or_else(|| {
        MachineError::ValidationError(format!("Missing {} section", format_rules(names)))
    })
}

/// Formats a list of section names into a human-readable string for error messages.
fn format_rules(names: Vec<&str>) -> String {
    names
        .iter()
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(" or ")
}
