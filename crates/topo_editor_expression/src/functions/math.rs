// SPDX-License-Identifier: MIT OR Apache-2.0
//! Math utilities.

use super::{int_arg, number_arg, numbers, LibraryFunction, Usage};
use crate::error::ExpressionResult;
use crate::value::number;
use serde_json::Value;

/// Math entries of the library
pub const FUNCTIONS: &[LibraryFunction] = &[
    LibraryFunction { name: "add", usage: Usage::Both, call: add },
    LibraryFunction { name: "abs", usage: Usage::Both, call: abs },
    LibraryFunction { name: "subtract", usage: Usage::Both, call: subtract },
    LibraryFunction { name: "multiply", usage: Usage::Both, call: multiply },
    LibraryFunction { name: "divide", usage: Usage::Both, call: divide },
    LibraryFunction { name: "mod", usage: Usage::Both, call: modulo },
    LibraryFunction { name: "pow", usage: Usage::Both, call: pow },
    LibraryFunction { name: "sqrt", usage: Usage::Both, call: sqrt },
    LibraryFunction { name: "round", usage: Usage::Both, call: round },
    LibraryFunction { name: "ceil", usage: Usage::Both, call: ceil },
    LibraryFunction { name: "floor", usage: Usage::Both, call: floor },
    LibraryFunction { name: "sum", usage: Usage::Both, call: sum },
    LibraryFunction { name: "mean", usage: Usage::Both, call: mean },
    LibraryFunction { name: "median", usage: Usage::Both, call: median },
    LibraryFunction { name: "min", usage: Usage::Both, call: min },
    LibraryFunction { name: "max", usage: Usage::Both, call: max },
    LibraryFunction { name: "std", usage: Usage::Both, call: std_dev },
    LibraryFunction { name: "variance", usage: Usage::Both, call: variance },
    LibraryFunction { name: "gcd", usage: Usage::Both, call: gcd },
    LibraryFunction { name: "lcm", usage: Usage::Both, call: lcm },
    LibraryFunction { name: "prime", usage: Usage::Both, call: prime },
];

/// `add(...values)`
pub fn add(args: &[Value]) -> ExpressionResult<Value> {
    Ok(number(numbers(args).iter().sum()))
}

/// `abs(value)`
pub fn abs(args: &[Value]) -> ExpressionResult<Value> {
    Ok(number(number_arg(args, 0).abs()))
}

/// `subtract(x, y)`
pub fn subtract(args: &[Value]) -> ExpressionResult<Value> {
    Ok(number(number_arg(args, 0) - number_arg(args, 1)))
}

/// `multiply(...values)`
pub fn multiply(args: &[Value]) -> ExpressionResult<Value> {
    Ok(number(numbers(args).iter().product()))
}

/// `divide(x, y)`; division by zero yields `null`
pub fn divide(args: &[Value]) -> ExpressionResult<Value> {
    Ok(number(number_arg(args, 0) / number_arg(args, 1)))
}

/// `mod(a, b)`: remainder with the sign of `a`
pub fn modulo(args: &[Value]) -> ExpressionResult<Value> {
    Ok(number(number_arg(args, 0) % number_arg(args, 1)))
}

/// `pow(x, y)`
pub fn pow(args: &[Value]) -> ExpressionResult<Value> {
    Ok(number(number_arg(args, 0).powf(number_arg(args, 1))))
}

/// `sqrt(value)`
pub fn sqrt(args: &[Value]) -> ExpressionResult<Value> {
    Ok(number(number_arg(args, 0).sqrt()))
}

fn scaled(args: &[Value], op: fn(f64) -> f64) -> Value {
    let precision = int_arg(args, 1, 0).clamp(-292, 292) as i32;
    let factor = 10f64.powi(precision);
    number(op(number_arg(args, 0) * factor) / factor)
}

/// `round(value, precision = 0)`
pub fn round(args: &[Value]) -> ExpressionResult<Value> {
    Ok(scaled(args, f64::round))
}

/// `ceil(value, precision = 0)`
pub fn ceil(args: &[Value]) -> ExpressionResult<Value> {
    Ok(scaled(args, f64::ceil))
}

/// `floor(value, precision = 0)`
pub fn floor(args: &[Value]) -> ExpressionResult<Value> {
    Ok(scaled(args, f64::floor))
}

/// `sum(array)`
pub fn sum(args: &[Value]) -> ExpressionResult<Value> {
    add(args)
}

fn mean_of(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// `mean(array)`
pub fn mean(args: &[Value]) -> ExpressionResult<Value> {
    Ok(mean_of(&numbers(args)).map_or(Value::Null, number))
}

/// `median(array)`
pub fn median(args: &[Value]) -> ExpressionResult<Value> {
    let mut values = numbers(args);
    if values.is_empty() {
        return Ok(Value::Null);
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    let result = if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    };
    Ok(number(result))
}

/// `min(array)` or `min(a, b, ...)`
pub fn min(args: &[Value]) -> ExpressionResult<Value> {
    Ok(numbers(args).into_iter().reduce(f64::min).map_or(Value::Null, number))
}

/// `max(array)` or `max(a, b, ...)`
pub fn max(args: &[Value]) -> ExpressionResult<Value> {
    Ok(numbers(args).into_iter().reduce(f64::max).map_or(Value::Null, number))
}

/// Unbiased sample variance
fn variance_of(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean_of(values)?;
    let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some(squares / (values.len() - 1) as f64)
}

/// `std(array)`: sample standard deviation
pub fn std_dev(args: &[Value]) -> ExpressionResult<Value> {
    Ok(variance_of(&numbers(args)).map_or(Value::Null, |v| number(v.sqrt())))
}

/// `variance(array)`: sample variance
pub fn variance(args: &[Value]) -> ExpressionResult<Value> {
    Ok(variance_of(&numbers(args)).map_or(Value::Null, number))
}

fn gcd_pair(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn as_integer(value: f64) -> u64 {
    if value.is_finite() {
        value.abs().trunc() as u64
    } else {
        0
    }
}

/// `gcd(...values)`
pub fn gcd(args: &[Value]) -> ExpressionResult<Value> {
    let result = numbers(args)
        .into_iter()
        .map(as_integer)
        .fold(0, gcd_pair);
    Ok(number(result as f64))
}

/// `lcm(x, y)`
pub fn lcm(args: &[Value]) -> ExpressionResult<Value> {
    let a = as_integer(number_arg(args, 0));
    let b = as_integer(number_arg(args, 1));
    if a == 0 || b == 0 {
        return Ok(Value::from(0));
    }
    let reduced = a / gcd_pair(a, b);
    let result = match reduced.checked_mul(b) {
        Some(n) => n as f64,
        None => reduced as f64 * b as f64,
    };
    Ok(number(result))
}

/// `prime(value)`: primality test
pub fn prime(args: &[Value]) -> ExpressionResult<Value> {
    let n = number_arg(args, 0);
    if n.fract() != 0.0 || n < 2.0 || !n.is_finite() {
        return Ok(Value::Bool(false));
    }
    let n = n as u64;
    let is_prime = (2..).take_while(|d| *d <= n / d).all(|d| n % d != 0);
    Ok(Value::Bool(is_prime))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_arithmetic() {
        assert_eq!(add(&[json!(1), json!(2), json!(3)]).unwrap(), json!(6));
        assert_eq!(divide(&[json!(1), json!(4)]).unwrap(), json!(0.25));
        assert_eq!(divide(&[json!(1), json!(0)]).unwrap(), Value::Null);
        assert_eq!(round(&[json!(4.006), json!(2)]).unwrap(), json!(4.01));
        assert_eq!(modulo(&[json!(-7), json!(3)]).unwrap(), json!(-1));
    }

    #[test]
    fn test_statistics() {
        let values = json!([2, 4, 4, 4, 5, 5, 7, 9]);
        assert_eq!(sum(&[values.clone()]).unwrap(), json!(40));
        assert_eq!(mean(&[values.clone()]).unwrap(), json!(5));
        assert_eq!(median(&[values.clone()]).unwrap(), json!(4.5));
        assert_eq!(min(&[values.clone()]).unwrap(), json!(2));
        assert_eq!(max(&[json!(3), json!(8)]).unwrap(), json!(8));
        let var = variance(&[values]).unwrap().as_f64().unwrap();
        assert!((var - 32.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_number_theory() {
        assert_eq!(gcd(&[json!(12), json!(18), json!(30)]).unwrap(), json!(6));
        assert_eq!(lcm(&[json!(4), json!(6)]).unwrap(), json!(12));
        assert_eq!(prime(&[json!(13)]).unwrap(), json!(true));
        assert_eq!(prime(&[json!(15)]).unwrap(), json!(false));
    }

    #[test]
    fn test_lcm_beyond_integer_range() {
        let result = lcm(&[json!(4294967311u64), json!(4294967357u64)]).unwrap();
        let expected = 4294967311.0 * 4294967357.0;
        assert!((result.as_f64().unwrap() - expected).abs() / expected < 1e-12);
    }
}
