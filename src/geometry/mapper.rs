use super::fit::{FitMode, FitTransform};
use super::types::{Offset, Rect, Size};
use crate::error::ScannerError;
use tracing::trace;

/// Map a widget-space scan window into fractions of the texture size.
///
/// The result is not clamped: parts of `widget_rect` that fall outside the
/// visible texture map to values below 0 or above 1.
pub fn compute_texture_relative_window(
    fit: FitMode,
    widget_rect: Rect,
    texture_size: Size,
    widget_size: Size,
) -> Result<Rect, ScannerError> {
    if !texture_size.is_positive() || !widget_size.is_positive() {
        return Err(ScannerError::DegenerateGeometry {
            texture: texture_size,
            widget: widget_size,
        });
    }

    let transform = FitTransform::new(fit, texture_size, widget_size);

    let top_left = transform.widget_to_texture(Offset::new(widget_rect.left, widget_rect.top));
    let bottom_right =
        transform.widget_to_texture(Offset::new(widget_rect.right, widget_rect.bottom));

    let window = Rect::from_ltrb(
        top_left.dx / texture_size.width,
        top_left.dy / texture_size.height,
        bottom_right.dx / texture_size.width,
        bottom_right.dy / texture_size.height,
    );

    trace!(
        "Mapped scan window {} ({:?}, texture {}, widget {}) to {}",
        widget_rect,
        fit,
        texture_size,
        widget_size,
        window
    );

    Ok(window)
}
