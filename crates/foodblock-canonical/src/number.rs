//! ECMAScript-compatible number formatting.
//!
//! Produces the same text as JavaScript's `Number.prototype.toString()` for
//! every finite `f64`: the shortest digit string that round-trips, laid out
//! in plain decimal for exponents in `[-7, 21)` and in `d.ddde±x` form
//! otherwise.

/// Format a finite number for canonical output.
///
/// Returns `None` for `NaN` and the infinities.
pub fn format_number(n: f64) -> Option<String> {
    if !n.is_finite() {
        return None;
    }
    if n == 0.0 {
        // Covers -0 as well.
        return Some("0".to_string());
    }

    // `{:e}` renders the shortest round-trip digits as `d[.ddd]e<exp>`.
    let sci = format!("{:e}", n.abs());
    let (mantissa, exp) = sci.split_once('e')?;
    let exp: i32 = exp.parse().ok()?;
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    let k = digits.len() as i32;
    // Position of the decimal point relative to the digit string.
    let point = exp + 1;

    let body = if k <= point && point <= 21 {
        let mut s = digits;
        s.extend(std::iter::repeat('0').take((point - k) as usize));
        s
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{int}.{frac}")
    } else if -6 < point && point <= 0 {
        format!("0.{}{}", "0".repeat((-point) as usize), digits)
    } else {
        let e = point - 1;
        let sign = if e >= 0 { '+' } else { '-' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{first}e{sign}{}", e.abs())
        } else {
            format!("{first}.{rest}e{sign}{}", e.abs())
        }
    };

    if n.is_sign_negative() {
        Some(format!("-{body}"))
    } else {
        Some(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Expected strings are the output of `String(x)` in a JavaScript engine.
    const VECTORS: &[(f64, &str)] = &[
        (0.0, "0"),
        (-0.0, "0"),
        (1.0, "1"),
        (-1.0, "-1"),
        (4.5, "4.5"),
        (5.0, "5"),
        (100.0, "100"),
        (123.456, "123.456"),
        (-123.456, "-123.456"),
        (0.1, "0.1"),
        (0.30000000000000004, "0.30000000000000004"),
        (0.000001, "0.000001"),
        (0.0000001, "1e-7"),
        (1.5e-7, "1.5e-7"),
        (1.23e-18, "1.23e-18"),
        (1e20, "100000000000000000000"),
        (1e21, "1e+21"),
        (1.5e21, "1.5e+21"),
        (123456789012345680000.0, "123456789012345680000"),
        (9007199254740992.0, "9007199254740992"),
        (1.7976931348623157e308, "1.7976931348623157e+308"),
        (5e-324, "5e-324"),
        (-2.5e-8, "-2.5e-8"),
        (0.5, "0.5"),
        (1234.5678, "1234.5678"),
    ];

    #[test]
    fn conformance_vectors() {
        for (input, expected) in VECTORS {
            assert_eq!(
                format_number(*input).as_deref(),
                Some(*expected),
                "formatting {input:e}"
            );
        }
    }

    #[test]
    fn non_finite_has_no_format() {
        assert_eq!(format_number(f64::NAN), None);
        assert_eq!(format_number(f64::INFINITY), None);
        assert_eq!(format_number(f64::NEG_INFINITY), None);
    }

    #[test]
    fn output_round_trips() {
        for x in [0.1, 1.0 / 3.0, 2.0f64.powi(60), 6.02214076e23, 1e-300] {
            let text = format_number(x).unwrap();
            assert_eq!(text.parse::<f64>().unwrap(), x, "{text}");
        }
    }
}
