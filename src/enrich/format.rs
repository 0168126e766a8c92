//! Number and coordinate formatting

use super::units::Unit;

/// Format with a fixed number of decimals, never printing a negative zero.
pub(crate) fn fixed(value: f64, decimals: usize) -> String {
    let text = format!("{:.*}", decimals, value);
    match text.strip_prefix('-') {
        Some(magnitude) if magnitude.chars().all(|c| c == '0' || c == '.') => {
            magnitude.to_string()
        }
        _ => text,
    }
}

/// Hemisphere letter for a signed coordinate.
fn hemisphere(value: f64, latitude: bool) -> char {
    match (latitude, value < 0.0) {
        (true, false) => 'N',
        (true, true) => 'S',
        (false, false) => 'E',
        (false, true) => 'W',
    }
}

/// Format a signed decimal-degree coordinate in the requested style.
pub(crate) fn coordinate(value: f64, latitude: bool, unit: Unit, decimals: usize) -> String {
    let hemi = hemisphere(value, latitude);
    let magnitude = value.abs();

    match unit {
        Unit::DegreesMinutes => {
            let scale = 10f64.powi(decimals as i32);
            // Round once on the whole value so 59.9996' carries into the degrees.
            let total = (magnitude * 60.0 * scale).round();
            let per_degree = 60.0 * scale;
            let degrees = (total / per_degree).floor();
            let minutes = (total - degrees * per_degree) / scale;
            let width = if decimals == 0 { 2 } else { decimals + 3 };
            format!("{}° {:0width$.prec$}′ {}", degrees, minutes, hemi, width = width, prec = decimals)
        }
        Unit::DegreesMinutesSeconds => {
            let scale = 10f64.powi(decimals as i32);
            let total = (magnitude * 3600.0 * scale).round();
            let per_degree = 3600.0 * scale;
            let degrees = (total / per_degree).floor();
            let remainder = total - degrees * per_degree;
            let minutes = (remainder / (60.0 * scale)).floor();
            let seconds = (remainder - minutes * 60.0 * scale) / scale;
            let width = if decimals == 0 { 2 } else { decimals + 3 };
            format!(
                "{}° {:02}′ {:0width$.prec$}″ {}",
                degrees,
                minutes,
                seconds,
                hemi,
                width = width,
                prec = decimals
            )
        }
        _ => format!("{}° {}", fixed(magnitude, decimals), hemi),
    }
}

/// Join a formatted value and a unit symbol.
pub(crate) fn with_symbol(formatted: &str, unit: Unit) -> String {
    match unit.symbol() {
        "" => formatted.to_string(),
        "°" => format!("{formatted}°"),
        symbol => format!("{formatted} {symbol}"),
    }
}
