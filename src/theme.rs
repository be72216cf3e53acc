use eframe::egui;
use egui::{Color32, CornerRadius, Stroke};

pub struct AppTheme {
    pub background: Color32,
    pub card_background: Color32,
    pub header_background: Color32,
    pub header_text: Color32,
    pub text: Color32,
    pub secondary_text: Color32,
    pub highlight: Color32,
    pub separator: Color32,
    pub failed: Color32,
    pub link_color: Color32,
    pub button_background: Color32,
    pub button_foreground: Color32,
    pub button_hover_background: Color32,
    pub shadow: Color32,
}

impl AppTheme {
    pub fn dark() -> Self {
        Self {
            background: Color32::from_rgb(18, 18, 18),
            card_background: Color32::from_rgb(30, 30, 30),
            header_background: Color32::from_rgb(255, 102, 0), // HN orange
            header_text: Color32::from_rgb(255, 255, 255),
            text: Color32::from_rgb(240, 240, 240),
            secondary_text: Color32::from_rgb(180, 180, 180),
            highlight: Color32::from_rgb(255, 102, 0),
            separator: Color32::from_rgb(60, 60, 60),
            failed: Color32::from_rgb(229, 115, 115),
            link_color: Color32::from_rgb(100, 181, 246),
            button_background: Color32::from_rgb(66, 66, 66),
            button_foreground: Color32::from_rgb(240, 240, 240),
            button_hover_background: Color32::from_rgb(80, 80, 80),
            shadow: Color32::from_rgba_premultiplied(0, 0, 0, 60),
        }
    }

    pub fn light() -> Self {
        Self {
            background: Color32::from_rgb(245, 245, 245),
            card_background: Color32::from_rgb(255, 255, 255),
            header_background: Color32::from_rgb(235, 92, 0),
            header_text: Color32::from_rgb(255, 255, 255),
            text: Color32::from_rgb(20, 20, 20),
            secondary_text: Color32::from_rgb(90, 90, 90),
            highlight: Color32::from_rgb(235, 92, 0),
            separator: Color32::from_rgb(200, 200, 200),
            failed: Color32::from_rgb(198, 40, 40),
            link_color: Color32::from_rgb(20, 100, 200),
            button_background: Color32::from_rgb(235, 235, 235),
            button_foreground: Color32::from_rgb(20, 20, 20),
            button_hover_background: Color32::from_rgb(210, 210, 210),
            shadow: Color32::from_rgba_premultiplied(0, 0, 0, 30),
        }
    }

    pub fn apply_to_ctx(&self, ctx: &egui::Context) {
        let mut style = (*ctx.style()).clone();

        style.visuals.panel_fill = self.background;
        style.visuals.window_fill = self.card_background;
        style.visuals.window_stroke = Stroke::new(1.0, self.separator);
        style.visuals.widgets.noninteractive.bg_fill = self.card_background;
        style.visuals.widgets.noninteractive.fg_stroke = Stroke::new(1.0, self.text);

        style.visuals.widgets.inactive.bg_fill = self.button_background;
        style.visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, self.button_foreground);
        style.visuals.widgets.hovered.bg_fill = self.button_hover_background;
        style.visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, self.button_foreground);

        style.visuals.selection.bg_fill = self.highlight;
        style.visuals.selection.stroke = Stroke::new(1.0, self.highlight);
        style.visuals.hyperlink_color = self.link_color;

        style.visuals.window_corner_radius = CornerRadius::same(8);
        style.visuals.widgets.inactive.corner_radius = CornerRadius::same(4);
        style.visuals.widgets.hovered.corner_radius = CornerRadius::same(4);
        style.visuals.widgets.active.corner_radius = CornerRadius::same(4);

        ctx.set_style(style);
    }

    /// Score badge fill, `hsl(42, saturation%, 50%)`.
    pub fn badge_color(&self, saturation: f32) -> Color32 {
        hsl(42.0, saturation / 100.0, 0.5)
    }
}

/// `h` in degrees, `s` and `l` in 0..=1.
pub fn hsl(h: f32, s: f32, l: f32) -> Color32 {
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let h = h.rem_euclid(360.0) / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());

    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let channel = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;

    Color32::from_rgb(channel(r), channel(g), channel(b))
}
