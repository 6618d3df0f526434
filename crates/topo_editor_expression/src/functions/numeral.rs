// SPDX-License-Identifier: MIT OR Apache-2.0
//! Number formatting.

use super::{has_arg, int_arg, number_arg, string_arg, LibraryFunction, Usage};
use crate::error::ExpressionResult;
use serde_json::Value;

/// Formatting entries of the library
pub const FUNCTIONS: &[LibraryFunction] = &[
    LibraryFunction { name: "formatThousand", usage: Usage::Both, call: format_thousand },
    LibraryFunction { name: "formatPercentage", usage: Usage::Both, call: format_percentage },
    LibraryFunction { name: "formatCurrency", usage: Usage::Both, call: format_currency },
    LibraryFunction { name: "formatCustomCurrency", usage: Usage::Both, call: format_custom_currency },
    LibraryFunction { name: "formatAuto", usage: Usage::Both, call: format_auto },
];

/// Thousands-grouped rendering with a fixed number of decimals.
/// Returns the sign separately so prefixes can go between.
fn grouped(value: f64, decimals: usize) -> (&'static str, String) {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (formatted.as_str(), None),
    };

    let mut out = String::with_capacity(formatted.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if let Some(frac_part) = frac_part {
        out.push('.');
        out.push_str(frac_part);
    }

    let is_zero = formatted.chars().all(|c| c == '0' || c == '.');
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };
    (sign, out)
}

fn finite_arg(args: &[Value]) -> Option<f64> {
    let value = number_arg(args, 0);
    value.is_finite().then_some(value)
}

fn currency(args: &[Value], decimals: usize) -> Value {
    let Some(value) = finite_arg(args) else {
        return Value::Null;
    };
    let symbol = if has_arg(args, 1) {
        string_arg(args, 1)
    } else {
        "$".to_string()
    };
    let (sign, digits) = grouped(value, decimals);
    Value::String(format!("{sign}{symbol}{digits}"))
}

/// `formatThousand(1234567.8)` → `"1,234,568"`
pub fn format_thousand(args: &[Value]) -> ExpressionResult<Value> {
    Ok(finite_arg(args).map_or(Value::Null, |value| {
        let (sign, digits) = grouped(value, 0);
        Value::String(format!("{sign}{digits}"))
    }))
}

/// `formatPercentage(0.25)` → `"25.00%"`
pub fn format_percentage(args: &[Value]) -> ExpressionResult<Value> {
    Ok(finite_arg(args).map_or(Value::Null, |value| {
        let (sign, digits) = grouped(value * 100.0, 2);
        Value::String(format!("{sign}{digits}%"))
    }))
}

/// `formatCurrency(12345.678, symbol = "$")` → `"$12,345.68"`
pub fn format_currency(args: &[Value]) -> ExpressionResult<Value> {
    Ok(currency(args, 2))
}

/// `formatCustomCurrency(value, symbol = "$", decimals = 2)`
pub fn format_custom_currency(args: &[Value]) -> ExpressionResult<Value> {
    let decimals = int_arg(args, 2, 2).clamp(0, 20) as usize;
    Ok(currency(args, decimals))
}

/// `formatAuto(value)`: integers grouped, fractions with two decimals
pub fn format_auto(args: &[Value]) -> ExpressionResult<Value> {
    Ok(finite_arg(args).map_or(Value::Null, |value| {
        let decimals = if value.fract() == 0.0 { 0 } else { 2 };
        let (sign, digits) = grouped(value, decimals);
        Value::String(format!("{sign}{digits}"))
    }))
}
