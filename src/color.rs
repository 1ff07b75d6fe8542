use palette::{Hsl, IntoColor, Srgb};
use ratatui::style::Color;

/// Color of a pixel the current frame carries no data for.
pub fn unlit() -> Srgb<u8> {
    Srgb::new(0, 0, 0)
}

/// Fully saturated color for a hue in degrees, as sent by the test pattern.
pub fn hue_color(hue: f32, lightness: f32) -> Srgb<u8> {
    let hsl = Hsl::new(hue.rem_euclid(360.0), 1.0, lightness.clamp(0.0, 1.0));
    let rgb: Srgb = hsl.into_color();

    Srgb::new(
        (rgb.red * 255.0).round() as u8,
        (rgb.green * 255.0).round() as u8,
        (rgb.blue * 255.0).round() as u8,
    )
}

/// Interpolate between two colors
pub fn lerp_color(a: Srgb<u8>, b: Srgb<u8>, t: f32) -> Srgb<u8> {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    Srgb::new(mix(a.red, b.red), mix(a.green, b.green), mix(a.blue, b.blue))
}

/// Brightened variant used for the selected fixture.
pub fn highlight(color: Srgb<u8>) -> Srgb<u8> {
    lerp_color(color, Srgb::new(255, 255, 255), 0.5)
}

pub fn is_dark(color: Srgb<u8>) -> bool {
    color.red.max(color.green).max(color.blue) < 8
}

pub fn to_terminal(color: Srgb<u8>) -> Color {
    Color::Rgb(color.red, color.green, color.blue)
}
