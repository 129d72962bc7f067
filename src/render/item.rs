use svg::node::element::{Group, Rectangle, Text};

use super::style::*;
use crate::ir::{CanvasItem, ItemKind, LabelPosition, DEFAULT_ITEM_SIZE};

/// Placeholder for one canvas item: its box plus label. Images are not
/// embedded, so image items show their image name instead.
pub fn render_item(item: &CanvasItem) -> Group {
    let size = item.effective_size();
    let (w, h) = (size.width as f64, size.height as f64);
    let mut group = Group::new()
        .set("id", item.id.to_string())
        .set("class", item.kind.as_str())
        .set("transform", format!("translate({}, {})", item.position.x, item.position.y));

    let attrs = &item.attrs;
    let (fill, stroke) = match item.kind {
        ItemKind::Box => (
            attrs.fill_color.as_deref().unwrap_or("none"),
            attrs.border_color.as_deref().unwrap_or(ITEM_BORDER),
        ),
        ItemKind::Label => ("none", "none"),
        _ => (ITEM_BG, ITEM_BORDER),
    };
    let body = Rectangle::new()
        .set("width", w)
        .set("height", h)
        .set("fill", fill)
        .set("stroke", stroke)
        .set("stroke-width", attrs.border_width.unwrap_or(1));
    group = group.add(body);

    if item.kind == ItemKind::Percentile {
        let bar_h = (h / 2.0).min(DEFAULT_ITEM_SIZE as f64 / 4.0);
        let bar = Rectangle::new()
            .set("y", (h - bar_h) / 2.0)
            .set("width", w)
            .set("height", bar_h)
            .set("fill", PERCENTILE_FILL);
        group = group.add(bar);
    }

    if let Some(image) = attrs.image.as_deref().filter(|i| !i.is_empty()) {
        let text = Text::new(image)
            .set("x", w / 2.0)
            .set("y", h / 2.0 + FONT_SIZE / 3.0)
            .set("font-family", FONT_FAMILY)
            .set("font-size", FONT_SIZE)
            .set("fill", ITEM_BORDER)
            .set("text-anchor", "middle");
        group = group.add(text);
    }

    if let Some(label) = attrs.label.as_deref().filter(|l| !l.is_empty()) {
        group = group.add(render_label(label, w, h, attrs.label_position));
    }

    group
}

fn render_label(label: &str, w: f64, h: f64, position: Option<LabelPosition>) -> Text {
    let (x, y, anchor) = match position {
        Some(LabelPosition::Up) => (w / 2.0, -LABEL_GAP, "middle"),
        Some(LabelPosition::Left) => (-LABEL_GAP, h / 2.0 + FONT_SIZE / 3.0, "end"),
        Some(LabelPosition::Right) => (w + LABEL_GAP, h / 2.0 + FONT_SIZE / 3.0, "start"),
        Some(LabelPosition::Down) | None => (w / 2.0, h + FONT_SIZE + LABEL_GAP, "middle"),
    };
    Text::new(label)
        .set("x", x)
        .set("y", y)
        .set("font-family", FONT_FAMILY)
        .set("font-size", FONT_SIZE)
        .set("fill", LABEL_TEXT)
        .set("text-anchor", anchor)
}
