//! The exposition formatter: renders a registry snapshot into the
//! Prometheus text format (spec §4.4, §6).

/// Formats a sample value using Rust's shortest round-tripping `Display`
/// representation for `f64`, which yields at most 17 significant
/// digits and never pads with trailing zeros (`1.0` renders as `1`,
/// matching the library's end-to-end scenarios). `NaN` is rendered as
/// the lowercase `nan` token the exposition format expects, rather than
/// Rust's own `Display` spelling (`NaN`).
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_values_render_without_a_decimal_point() {
        assert_eq!(format_value(1.0), "1");
        assert_eq!(format_value(2.0), "2");
        assert_eq!(format_value(10.0), "10");
    }

    #[test]
    fn nan_renders_lowercase() {
        assert_eq!(format_value(f64::NAN), "nan");
    }

    #[test]
    fn fractional_values_render_their_digits() {
        assert_eq!(format_value(0.005), "0.005");
    }
}
