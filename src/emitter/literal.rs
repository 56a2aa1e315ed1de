//! Literal Rendering
//!
//! Turns model values into Groovy/Nextflow source literals.

use crate::workflow::ParamValue;

/// Renders a single-quoted string literal.
///
/// Single quotes keep `$` from being interpolated; backslashes, quotes and
/// control characters are escaped.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Renders a float so that it always reads back as a decimal.
pub fn float(value: f64) -> String {
    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{}.0", text)
    }
}

/// Renders a typed value as a literal.
pub fn value(value: &ParamValue) -> String {
    match value {
        ParamValue::String(s) | ParamValue::Path(s) => quote(s),
        ParamValue::Integer(i) => i.to_string(),
        ParamValue::Float(f) => float(*f),
        ParamValue::Boolean(b) => b.to_string(),
    }
}

/// Renders a typed value as a workflow argument.
///
/// Paths are wrapped in `file()` so they are staged as files.
pub fn argument(value: &ParamValue) -> String {
    match value {
        ParamValue::Path(p) => format!("file({})", quote(p)),
        other => self::value(other),
    }
}

/// Renders an opaque directive value.
///
/// Booleans and plain decimal numbers are emitted bare, everything else
/// (`'4 GB'`, `'2h'`, image names, queue names) as a quoted string.
pub fn directive(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "true" || trimmed == "false" || is_plain_number(trimmed) {
        trimmed.to_string()
    } else {
        quote(trimmed)
    }
}

fn is_plain_number(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let mut parts = digits.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next();

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    match fraction {
        None => all_digits(whole),
        Some(fraction) => all_digits(whole) && all_digits(fraction),
    }
}

/// Flattens text onto one line for use in a `//` comment.
pub fn comment(text: &str) -> String {
    text.split(['\n', '\r'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("plain"), "'plain'");
        assert_eq!(quote("it's"), r"'it\'s'");
        assert_eq!(quote(r"C:\data"), r"'C:\\data'");
        assert_eq!(quote("a\nb"), r"'a\nb'");
        assert_eq!(quote("${HOME}"), "'${HOME}'");
    }

    #[test]
    fn test_float_keeps_decimal_point() {
        assert_eq!(float(1.0), "1.0");
        assert_eq!(float(0.25), "0.25");
        assert_eq!(float(-3.0), "-3.0");
    }

    #[test]
    fn test_value_literals() {
        assert_eq!(value(&ParamValue::Integer(4)), "4");
        assert_eq!(value(&ParamValue::Boolean(true)), "true");
        assert_eq!(value(&ParamValue::String("hg38".into())), "'hg38'");
        assert_eq!(value(&ParamValue::Path("ref/genome.fa".into())), "'ref/genome.fa'");
    }

    #[test]
    fn test_argument_wraps_paths() {
        assert_eq!(
            argument(&ParamValue::Path("ref.fa".into())),
            "file('ref.fa')"
        );
        assert_eq!(argument(&ParamValue::Integer(150)), "150");
    }

    #[test]
    fn test_directive_values() {
        assert_eq!(directive("4"), "4");
        assert_eq!(directive(" 0.5 "), "0.5");
        assert_eq!(directive("true"), "true");
        assert_eq!(directive("4 GB"), "'4 GB'");
        assert_eq!(directive("2h"), "'2h'");
        assert_eq!(directive("1."), "'1.'");
        assert_eq!(directive("biocontainers/samtools:v1.9.0_cv4"), "'biocontainers/samtools:v1.9.0_cv4'");
    }

    #[test]
    fn test_comment_flattening() {
        assert_eq!(comment("first line\n  second\r\n"), "first line second");
    }
}
