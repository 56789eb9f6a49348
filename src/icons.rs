//! Display tables for OpenWeatherMap condition ids: emoji, card gradients
//! and compass directions. Pure data, kept apart from the API logic.

/// Emoji for a condition id, day/night aware.
///
/// Condition groups: 2xx thunderstorm, 3xx drizzle, 5xx rain, 6xx snow,
/// 7xx atmosphere, 800 clear, 80x clouds.
pub fn emoji(id: u16, is_day: bool) -> &'static str {
    match id {
        200..=232 => "⛈️",
        300..=321 => "🌦️",
        500..=504 => "🌧️",
        511 => "🌧️",
        520..=531 => "🌦️",
        600..=622 => "❄️",
        711 | 731 | 751 | 761 | 771 => "💨",
        781 => "🌪️",
        701..=780 => "🌫️",
        800 => {
            if is_day {
                "☀️"
            } else {
                "🌙"
            }
        }
        801 => {
            if is_day {
                "🌤️"
            } else {
                "🌙"
            }
        }
        802 => "⛅",
        803 | 804 => "☁️",
        _ => "🌤️",
    }
}

/// CSS gradient for the dashboard card background.
pub fn gradient(id: u16, is_day: bool) -> &'static str {
    match id {
        200..=232 => "linear-gradient(135deg, #2c3e50, #3498db)",
        300..=531 => "linear-gradient(135deg, #3498db, #2980b9)",
        600..=622 => "linear-gradient(135deg, #ecf0f1, #bdc3c7)",
        701..=781 => "linear-gradient(135deg, #95a5a6, #7f8c8d)",
        800 => {
            if is_day {
                "linear-gradient(135deg, #f39c12, #e67e22)"
            } else {
                "linear-gradient(135deg, #2c3e50, #34495e)"
            }
        }
        801..=804 => "linear-gradient(135deg, #bdc3c7, #95a5a6)",
        _ => "linear-gradient(135deg, #1e90ff, #4dabf7)",
    }
}

const COMPASS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// 16-point compass direction for a wind bearing in degrees.
pub fn compass(degrees: u16) -> &'static str {
    let index = ((f64::from(degrees) / 22.5).round() as usize) % 16;
    COMPASS[index]
}
