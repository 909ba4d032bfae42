use super::types::{Offset, Size};
use serde::{Deserialize, Serialize};

/// How a camera texture is placed inside the preview box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// As large as possible while still fully visible
    Contain,
    /// As small as possible while still covering the whole box
    #[default]
    Cover,
    /// Stretch each axis independently
    Fill,
    /// Match widths, overflow or letterbox vertically
    FitWidth,
    /// Match heights, overflow or letterbox horizontally
    FitHeight,
    /// Unscaled, centered and cropped to the box
    None,
    /// Like `Contain`, but never enlarges the texture
    ScaleDown,
}

/// The part of the texture that is shown and the size it is drawn at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedSizes {
    /// Region of the texture that ends up visible, centered within the texture
    pub source: Size,
    /// Size that region occupies in the box, centered within the box
    pub destination: Size,
}

/// Compute the visible texture region and its on-screen size.
///
/// Both sizes are expected to be strictly positive.
pub fn apply_fit(fit: FitMode, texture: Size, widget: Size) -> FittedSizes {
    let widget_wider = widget.aspect_ratio() > texture.aspect_ratio();

    let (source, destination) = match fit {
        FitMode::Fill => (texture, widget),
        FitMode::Contain => {
            let destination = if widget_wider {
                Size::new(texture.width * widget.height / texture.height, widget.height)
            } else {
                Size::new(widget.width, texture.height * widget.width / texture.width)
            };
            (texture, destination)
        }
        FitMode::Cover => {
            let source = if widget_wider {
                Size::new(texture.width, texture.width * widget.height / widget.width)
            } else {
                Size::new(texture.height * widget.width / widget.height, texture.height)
            };
            (source, widget)
        }
        FitMode::FitWidth => {
            if widget_wider {
                (
                    Size::new(texture.width, texture.width * widget.height / widget.width),
                    widget,
                )
            } else {
                (
                    texture,
                    Size::new(widget.width, texture.height * widget.width / texture.width),
                )
            }
        }
        FitMode::FitHeight => {
            if widget_wider {
                (
                    texture,
                    Size::new(texture.width * widget.height / texture.height, widget.height),
                )
            } else {
                (
                    Size::new(texture.height * widget.width / widget.height, texture.height),
                    widget,
                )
            }
        }
        FitMode::None => {
            let visible = Size::new(
                texture.width.min(widget.width),
                texture.height.min(widget.height),
            );
            (visible, visible)
        }
        FitMode::ScaleDown => {
            let contained = apply_fit(FitMode::Contain, texture, widget).destination;
            let destination = if contained.height > texture.height {
                texture
            } else {
                contained
            };
            (texture, destination)
        }
    };

    FittedSizes {
        source,
        destination,
    }
}

/// Affine placement of texture coordinates inside the widget box.
///
/// `widget = texture * scale + offset`, per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitTransform {
    pub scale_x: f64,
    pub scale_y: f64,
    pub offset: Offset,
}

impl FitTransform {
    /// Build the placement a fit mode applies; both regions are centered
    pub fn new(fit: FitMode, texture: Size, widget: Size) -> Self {
        let sizes = apply_fit(fit, texture, widget);

        let scale_x = sizes.destination.width / sizes.source.width;
        let scale_y = sizes.destination.height / sizes.source.height;

        let source_origin = Offset::new(
            (texture.width - sizes.source.width) / 2.0,
            (texture.height - sizes.source.height) / 2.0,
        );
        let destination_origin = Offset::new(
            (widget.width - sizes.destination.width) / 2.0,
            (widget.height - sizes.destination.height) / 2.0,
        );

        Self {
            scale_x,
            scale_y,
            offset: Offset::new(
                destination_origin.dx - source_origin.dx * scale_x,
                destination_origin.dy - source_origin.dy * scale_y,
            ),
        }
    }

    pub fn texture_to_widget(&self, point: Offset) -> Offset {
        Offset::new(
            point.dx * self.scale_x + self.offset.dx,
            point.dy * self.scale_y + self.offset.dy,
        )
    }

    pub fn widget_to_texture(&self, point: Offset) -> Offset {
        Offset::new(
            (point.dx - self.offset.dx) / self.scale_x,
            (point.dy - self.offset.dy) / self.scale_y,
        )
    }
}
