//! Float formatting, ported from the teacher's `rustpython-common::float_ops`
//! down to the one rule the CORE actually needs: `repr(float)`/`str(float)`
//! must round-trip and must always show a fractional part.

/// Render `v` the way CPython's `repr(float)` does: shortest round-trip
/// decimal, but never bare (an integral value like `3.0` keeps its `.0`).
pub fn to_repr(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_owned();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf".to_owned() } else { "-inf".to_owned() };
    }
    let mut s = format!("{v}");
    if !s.contains(['.', 'e', 'E']) {
        s.push_str(".0");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_float_keeps_fraction() {
        assert_eq!(to_repr(3.0), "3.0");
        assert_eq!(to_repr(-0.0), "-0.0");
    }

    #[test]
    fn special_values() {
        assert_eq!(to_repr(f64::NAN), "nan");
        assert_eq!(to_repr(f64::INFINITY), "inf");
        assert_eq!(to_repr(f64::NEG_INFINITY), "-inf");
    }
}
