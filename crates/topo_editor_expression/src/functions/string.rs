// SPDX-License-Identifier: MIT OR Apache-2.0
//! String utilities.

use super::{arg, has_arg, int_arg, number_arg, string_arg, LibraryFunction, Usage};
use crate::error::{ExpressionError, ExpressionResult};
use crate::value::{number, to_display};
use serde_json::Value;

/// String entries of the library
pub const FUNCTIONS: &[LibraryFunction] = &[
    LibraryFunction { name: "camelCase", usage: Usage::Both, call: camel_case },
    LibraryFunction { name: "capitalize", usage: Usage::Both, call: capitalize },
    LibraryFunction { name: "endsWith", usage: Usage::Both, call: ends_with },
    LibraryFunction { name: "kebabCase", usage: Usage::Both, call: kebab_case },
    LibraryFunction { name: "lowerCase", usage: Usage::Both, call: lower_case },
    LibraryFunction { name: "lowerFirst", usage: Usage::Both, call: lower_first },
    LibraryFunction { name: "pad", usage: Usage::Both, call: pad },
    LibraryFunction { name: "padEnd", usage: Usage::Both, call: pad_end },
    LibraryFunction { name: "padStart", usage: Usage::Both, call: pad_start },
    LibraryFunction { name: "parseInt", usage: Usage::Both, call: parse_int },
    LibraryFunction { name: "repeat", usage: Usage::Both, call: repeat },
    LibraryFunction { name: "replace", usage: Usage::Both, call: replace },
    LibraryFunction { name: "snakeCase", usage: Usage::Both, call: snake_case },
    LibraryFunction { name: "split", usage: Usage::Both, call: split },
    LibraryFunction { name: "startCase", usage: Usage::Both, call: start_case },
    LibraryFunction { name: "startsWith", usage: Usage::Both, call: starts_with },
    LibraryFunction { name: "toLower", usage: Usage::Both, call: to_lower },
    LibraryFunction { name: "toUpper", usage: Usage::Both, call: to_upper },
    LibraryFunction { name: "trim", usage: Usage::Both, call: trim },
    LibraryFunction { name: "trimEnd", usage: Usage::Both, call: trim_end },
    LibraryFunction { name: "trimStart", usage: Usage::Both, call: trim_start },
    LibraryFunction { name: "truncate", usage: Usage::Both, call: truncate },
    LibraryFunction { name: "upperCase", usage: Usage::Both, call: upper_case },
    LibraryFunction { name: "upperFirst", usage: Usage::Both, call: upper_first },
    LibraryFunction { name: "words", usage: Usage::Both, call: words },
];

/// Split text into words at separators, case changes and digit runs
/// (`"fooBar_baz2"` → `foo`, `Bar`, `baz`, `2`).
pub fn split_words(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            continue;
        }
        if let Some(prev) = current.chars().last() {
            let next = chars.get(i + 1).copied();
            let boundary = (prev.is_lowercase() && c.is_uppercase())
                || (prev.is_alphabetic() != c.is_alphabetic())
                || (prev.is_uppercase()
                    && c.is_uppercase()
                    && next.is_some_and(char::is_lowercase));
            if boundary {
                out.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn upper_first_str(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn lower_first_str(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn joined(args: &[Value], separator: &str, map: fn(&str) -> String) -> Value {
    let parts: Vec<String> = split_words(&string_arg(args, 0)).iter().map(|w| map(w)).collect();
    Value::String(parts.join(separator))
}

/// `camelCase(str)`
pub fn camel_case(args: &[Value]) -> ExpressionResult<Value> {
    let words = split_words(&string_arg(args, 0));
    let out: String = words
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let lower = w.to_lowercase();
            if i == 0 {
                lower
            } else {
                upper_first_str(&lower)
            }
        })
        .collect();
    Ok(Value::String(out))
}

/// `capitalize(str)`: first character upper, rest lower
pub fn capitalize(args: &[Value]) -> ExpressionResult<Value> {
    Ok(Value::String(upper_first_str(&string_arg(args, 0).to_lowercase())))
}

fn position_arg(args: &[Value], index: usize, len: usize) -> usize {
    int_arg(args, index, len as i64).clamp(0, len as i64) as usize
}

/// `endsWith(str, target, position = length)`
pub fn ends_with(args: &[Value]) -> ExpressionResult<Value> {
    let text: Vec<char> = string_arg(args, 0).chars().collect();
    let end = position_arg(args, 2, text.len());
    let head: String = text[..end].iter().collect();
    Ok(Value::Bool(head.ends_with(&string_arg(args, 1))))
}

/// `startsWith(str, target, position = 0)`
pub fn starts_with(args: &[Value]) -> ExpressionResult<Value> {
    let text: Vec<char> = string_arg(args, 0).chars().collect();
    let start = if has_arg(args, 2) {
        position_arg(args, 2, text.len())
    } else {
        0
    };
    let tail: String = text[start..].iter().collect();
    Ok(Value::Bool(tail.starts_with(&string_arg(args, 1))))
}

/// `kebabCase(str)`
pub fn kebab_case(args: &[Value]) -> ExpressionResult<Value> {
    Ok(joined(args, "-", str::to_lowercase))
}

/// `snakeCase(str)`
pub fn snake_case(args: &[Value]) -> ExpressionResult<Value> {
    Ok(joined(args, "_", str::to_lowercase))
}

/// `lowerCase(str)`: space separated lower-case words
pub fn lower_case(args: &[Value]) -> ExpressionResult<Value> {
    Ok(joined(args, " ", str::to_lowercase))
}

/// `upperCase(str)`: space separated upper-case words
pub fn upper_case(args: &[Value]) -> ExpressionResult<Value> {
    Ok(joined(args, " ", str::to_uppercase))
}

/// `startCase(str)`
pub fn start_case(args: &[Value]) -> ExpressionResult<Value> {
    Ok(joined(args, " ", upper_first_str))
}

/// `lowerFirst(str)`
pub fn lower_first(args: &[Value]) -> ExpressionResult<Value> {
    Ok(Value::String(lower_first_str(&string_arg(args, 0))))
}

/// `upperFirst(str)`
pub fn upper_first(args: &[Value]) -> ExpressionResult<Value> {
    Ok(Value::String(upper_first_str(&string_arg(args, 0))))
}

/// Longest string `pad` and `repeat` will build, in characters
const MAX_STRING_LENGTH: usize = 1 << 24;

fn check_length(function: &str, length: usize) -> ExpressionResult<()> {
    if length > MAX_STRING_LENGTH {
        return Err(ExpressionError::Eval(format!(
            "{function}: string length {length} exceeds {MAX_STRING_LENGTH}"
        )));
    }
    Ok(())
}

/// Repeat `chars` until exactly `width` characters
fn filler(chars: &str, width: usize) -> String {
    if chars.is_empty() {
        return String::new();
    }
    chars.chars().cycle().take(width).collect()
}

fn pad_parts(function: &str, args: &[Value]) -> ExpressionResult<(String, usize, String)> {
    let text = string_arg(args, 0);
    let target = usize::try_from(int_arg(args, 1, 0).max(0)).unwrap_or(usize::MAX);
    let chars = if has_arg(args, 2) {
        string_arg(args, 2)
    } else {
        " ".to_string()
    };
    let missing = target.saturating_sub(text.chars().count());
    if !chars.is_empty() {
        check_length(function, target)?;
    }
    Ok((text, missing, chars))
}

/// `pad(str, length, chars = " ")`: pad both sides, extra on the right
pub fn pad(args: &[Value]) -> ExpressionResult<Value> {
    let (text, missing, chars) = pad_parts("pad", args)?;
    let left = missing / 2;
    Ok(Value::String(format!(
        "{}{text}{}",
        filler(&chars, left),
        filler(&chars, missing - left)
    )))
}

/// `padEnd(str, length, chars = " ")`
pub fn pad_end(args: &[Value]) -> ExpressionResult<Value> {
    let (text, missing, chars) = pad_parts("padEnd", args)?;
    Ok(Value::String(format!("{text}{}", filler(&chars, missing))))
}

/// `padStart(str, length, chars = " ")`
pub fn pad_start(args: &[Value]) -> ExpressionResult<Value> {
    let (text, missing, chars) = pad_parts("padStart", args)?;
    Ok(Value::String(format!("{}{text}", filler(&chars, missing))))
}

/// `parseInt(str, radix = 10)`: leading integer, `null` when none
pub fn parse_int(args: &[Value]) -> ExpressionResult<Value> {
    let text = string_arg(args, 0);
    let radix = int_arg(args, 1, 10);
    let radix = if radix == 0 { 10 } else { radix };
    if !(2..=36).contains(&radix) {
        return Ok(Value::Null);
    }
    let radix = radix as u32;

    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits = if radix == 16 {
        digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
            .unwrap_or(digits)
    } else {
        digits
    };

    let mut result: Option<f64> = None;
    for c in digits.chars() {
        let Some(d) = c.to_digit(radix) else {
            break;
        };
        result = Some(result.unwrap_or(0.0) * f64::from(radix) + f64::from(d));
    }
    Ok(result.map_or(Value::Null, |n| number(if negative { -n } else { n })))
}

/// `repeat(str, n = 1)`
pub fn repeat(args: &[Value]) -> ExpressionResult<Value> {
    let text = string_arg(args, 0);
    let n = usize::try_from(int_arg(args, 1, 1).max(0)).unwrap_or(usize::MAX);
    if text.is_empty() {
        return Ok(Value::String(text));
    }
    check_length("repeat", text.chars().count().saturating_mul(n))?;
    Ok(Value::String(text.repeat(n)))
}

/// `replace(str, target, replacement)`: first occurrence
pub fn replace(args: &[Value]) -> ExpressionResult<Value> {
    let text = string_arg(args, 0);
    let target = string_arg(args, 1);
    Ok(Value::String(text.replacen(&target, &string_arg(args, 2), 1)))
}

/// `split(str, separator)`
pub fn split(args: &[Value]) -> ExpressionResult<Value> {
    let text = string_arg(args, 0);
    if !has_arg(args, 1) {
        return Ok(Value::Array(vec![Value::String(text)]));
    }
    let separator = string_arg(args, 1);
    let parts: Vec<Value> = if separator.is_empty() {
        text.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        text.split(separator.as_str())
            .map(|s| Value::String(s.to_string()))
            .collect()
    };
    Ok(Value::Array(parts))
}

/// `toLower(str)`
pub fn to_lower(args: &[Value]) -> ExpressionResult<Value> {
    Ok(Value::String(string_arg(args, 0).to_lowercase()))
}

/// `toUpper(str)`
pub fn to_upper(args: &[Value]) -> ExpressionResult<Value> {
    Ok(Value::String(string_arg(args, 0).to_uppercase()))
}

/// `trim(str)`
pub fn trim(args: &[Value]) -> ExpressionResult<Value> {
    Ok(Value::String(string_arg(args, 0).trim().to_string()))
}

/// `trimEnd(str)`
pub fn trim_end(args: &[Value]) -> ExpressionResult<Value> {
    Ok(Value::String(string_arg(args, 0).trim_end().to_string()))
}

/// `trimStart(str)`
pub fn trim_start(args: &[Value]) -> ExpressionResult<Value> {
    Ok(Value::String(string_arg(args, 0).trim_start().to_string()))
}

/// `truncate(str, {length = 30, omission = "..."})`. A bare number is
/// accepted as the length.
pub fn truncate(args: &[Value]) -> ExpressionResult<Value> {
    let text = string_arg(args, 0);
    let options = arg(args, 1);
    let (length, omission) = match options {
        Value::Object(map) => (
            map.get("length").map_or(30.0, crate::value::to_number),
            map.get("omission").map_or_else(|| "...".to_string(), to_display),
        ),
        Value::Null => (30.0, "...".to_string()),
        _ => (number_arg(args, 1), "...".to_string()),
    };
    let length = if length.is_nan() { 30 } else { length.max(0.0) as usize };

    if text.chars().count() <= length {
        return Ok(Value::String(text));
    }
    let keep = length.saturating_sub(omission.chars().count());
    let head: String = text.chars().take(keep).collect();
    Ok(Value::String(format!("{head}{omission}")))
}

/// `words(str)`
pub fn words(args: &[Value]) -> ExpressionResult<Value> {
    Ok(Value::Array(
        split_words(&string_arg(args, 0)).into_iter().map(Value::String).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_case_conversions() {
        assert_eq!(camel_case(&[json!("Foo Bar")]).unwrap(), json!("fooBar"));
        assert_eq!(camel_case(&[json!("__FOO_BAR__")]).unwrap(), json!("fooBar"));
        assert_eq!(kebab_case(&[json!("fooBar")]).unwrap(), json!("foo-bar"));
        assert_eq!(snake_case(&[json!("Foo Bar")]).unwrap(), json!("foo_bar"));
        assert_eq!(start_case(&[json!("--foo-bar--")]).unwrap(), json!("Foo Bar"));
        assert_eq!(upper_case(&[json!("fooBar")]).unwrap(), json!("FOO BAR"));
        assert_eq!(capitalize(&[json!("FRED")]).unwrap(), json!("Fred"));
        assert_eq!(split_words("XMLHttpRequest"), vec!["XML", "Http", "Request"]);
    }

    #[test]
    fn test_padding() {
        assert_eq!(pad(&[json!("abc"), json!(8), json!("_-")]).unwrap(), json!("_-abc_-_"));
        assert_eq!(pad_start(&[json!("abc"), json!(6)]).unwrap(), json!("   abc"));
        assert_eq!(pad_end(&[json!("abc"), json!(2)]).unwrap(), json!("abc"));
    }

    #[test]
    fn test_oversized_strings_are_errors() {
        assert_eq!(repeat(&[json!("ab"), json!(3)]).unwrap(), json!("ababab"));
        assert_eq!(repeat(&[json!(""), json!(9e18)]).unwrap(), json!(""));
        assert!(matches!(repeat(&[json!("x"), json!(9e18)]), Err(ExpressionError::Eval(_))));
        assert!(matches!(pad_start(&[json!("x"), json!(9e18)]), Err(ExpressionError::Eval(_))));
        assert!(matches!(pad(&[json!("x"), json!(1e12), json!("-")]), Err(ExpressionError::Eval(_))));
        assert_eq!(pad_end(&[json!("x"), json!(9e18), json!("")]).unwrap(), json!("x"));
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int(&[json!("08")]).unwrap(), json!(8));
        assert_eq!(parse_int(&[json!(" -42px")]).unwrap(), json!(-42));
        assert_eq!(parse_int(&[json!("ff"), json!(16)]).unwrap(), json!(255));
        assert_eq!(parse_int(&[json!("x1")]).unwrap(), Value::Null);
    }

    #[test]
    fn test_truncate_and_replace() {
        let long = json!("hi-diddly-ho there, neighborino");
        assert_eq!(
            truncate(&[long.clone(), json!({ "length": 24 })]).unwrap(),
            json!("hi-diddly-ho there, n...")
        );
        assert_eq!(truncate(&[json!("short")]).unwrap(), json!("short"));
        assert_eq!(replace(&[json!("Hi Fred Fred"), json!("Fred"), json!("Barney")]).unwrap(), json!("Hi Barney Fred"));
        assert_eq!(split(&[json!("a-b-c"), json!("-")]).unwrap(), json!(["a", "b", "c"]));
        assert_eq!(starts_with(&[json!("abc"), json!("b"), json!(1)]).unwrap(), json!(true));
        assert_eq!(ends_with(&[json!("abc"), json!("b"), json!(2)]).unwrap(), json!(true));
    }
}
