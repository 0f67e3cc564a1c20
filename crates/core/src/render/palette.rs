use super::scene::Color;

/// Categorical palette, highly distinct neighbouring hues.
pub const CHART_COLORS: [Color; 10] = [
    Color::rgb(54, 162, 235),  // blue
    Color::rgb(255, 99, 132),  // red
    Color::rgb(75, 192, 192),  // teal
    Color::rgb(255, 159, 64),  // orange
    Color::rgb(153, 102, 255), // violet
    Color::rgb(255, 205, 86),  // yellow
    Color::rgb(46, 204, 113),  // green
    Color::rgb(231, 76, 60),   // brick
    Color::rgb(52, 73, 94),    // slate
    Color::rgb(201, 203, 207), // grey
];

/// Palette color for the `i`-th series or slice (wraps around).
#[must_use]
pub fn color_at(i: usize) -> Color {
    CHART_COLORS[i % CHART_COLORS.len()]
}

/// Darker shade of a palette color for nested treemap cells.
#[must_use]
pub fn shade(color: Color, depth: usize) -> Color {
    let tint = 1.0 - (depth as f64 * 0.12).clamp(0.0, 0.4);
    let scale = |c: u8| (f64::from(c) * tint).round().clamp(0.0, 255.0) as u8;
    Color::rgba(scale(color.r), scale(color.g), scale(color.b), color.a)
}
