// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Connector styling and its override chain.
//!
//! Every field resolves through the same precedence:
//!
//! **Connector → Layer defaults → Engine default**
//!
//! [`ConnectorStyle`] carries the per-connector overrides, [`LayerDefaults`] the
//! surface-wide ones, and [`ResolvedStyle`] the effective values the primitives
//! are built from. Resolved styles are compared with [`ResolvedStyle::diff`] so a
//! reconfiguration only touches what actually changed.

use alloc::rc::Rc;
use alloc::string::String;
use core::fmt;

use kurbo::{Point, Vec2};

use crate::geometry::PathParams;
use crate::layer::ConnectorId;

/// Stroke color used when neither the connector nor the layer sets one.
pub const DEFAULT_COLOR: &str = "black";
/// Stroke width used when neither the connector nor the layer sets one.
pub const DEFAULT_STROKE_WIDTH: f64 = 1.0;
/// Curviness used when neither the connector nor the layer sets one.
pub const DEFAULT_CURVINESS: f64 = 0.5;
/// Scale used when neither the connector nor the layer sets one.
pub const DEFAULT_SCALE: f64 = 1.0;
/// Arrowhead size used when neither the connector nor the layer sets one.
pub const DEFAULT_HEAD_SIZE: f64 = 6.0;

/// A pointer interaction on a connector's path.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointerEvent {
    /// The connector whose path was hit.
    pub connector: ConnectorId,
    /// Pointer position in surface coordinates.
    pub position: Point,
}

/// Click or hover handler bound to a connector's path.
pub type PointerHandler = Rc<dyn Fn(&PointerEvent)>;

/// Receives the position of externally rendered label content.
///
/// Called with the path midpoint every time the connector is laid out.
pub type LabelPlacement = Rc<dyn Fn(Point)>;

/// Which kind of label a connector carries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LabelKind {
    /// Engine-rendered text.
    Text,
    /// Content rendered by the embedder; the engine only positions it.
    Custom,
}

/// Label content of a connector.
///
/// Text and custom content are mutually exclusive by construction.
#[derive(Clone)]
pub enum LabelContent {
    /// Text rendered by the drawing backend.
    Text(String),
    /// Externally rendered content, positioned through the placement callback.
    Custom(LabelPlacement),
}

impl LabelContent {
    /// Text label.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Custom label positioned through `placement`.
    pub fn custom(placement: impl Fn(Point) + 'static) -> Self {
        Self::Custom(Rc::new(placement))
    }

    /// Returns the label kind.
    #[must_use]
    pub fn kind(&self) -> LabelKind {
        match self {
            Self::Text(_) => LabelKind::Text,
            Self::Custom(_) => LabelKind::Custom,
        }
    }

    fn same_content(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for LabelContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Custom(_) => f.debug_tuple("Custom").finish_non_exhaustive(),
        }
    }
}

/// Per-connector overrides. Unset fields fall back to [`LayerDefaults`].
#[derive(Clone, Default)]
pub struct ConnectorStyle {
    /// Stroke color.
    pub color: Option<String>,
    /// Stroke width in surface units.
    pub stroke_width: Option<f64>,
    /// Bend of the curve; `0.0` draws a straight line.
    pub curviness: Option<f64>,
    /// Scale of the container relative to its layout size (for zoomed containers).
    pub scale: Option<f64>,
    /// Round every emitted coordinate to an integer.
    pub only_integer_coords: Option<bool>,
    /// Class name passed through to the path element.
    pub class_name: Option<String>,
    /// Horizontal offset of the start anchor.
    pub offset_start_x: Option<f64>,
    /// Vertical offset of the start anchor.
    pub offset_start_y: Option<f64>,
    /// Horizontal offset of the end anchor.
    pub offset_end_x: Option<f64>,
    /// Vertical offset of the end anchor.
    pub offset_end_y: Option<f64>,
    /// Draw an arrowhead at the end anchor.
    ///
    /// When unset on both the connector and the layer, a head is drawn if any
    /// head color or size is configured.
    pub with_head: Option<bool>,
    /// Arrowhead size.
    pub head_size: Option<f64>,
    /// Arrowhead fill. Falls back to the stroke color.
    pub head_color: Option<String>,
    /// Share one arrowhead definition with every connector using the same key.
    pub shared_marker: Option<String>,
    /// Label content.
    pub label: Option<LabelContent>,
    /// Class name of a text label.
    pub label_class_name: Option<String>,
    /// Subscribe to anchor notifications. When `false`, the connector only
    /// follows forced refreshes.
    pub use_register: Option<bool>,
    /// Called when the path is clicked.
    pub on_click: Option<PointerHandler>,
    /// Called when the pointer hovers the path.
    pub on_hover: Option<PointerHandler>,
}

impl fmt::Debug for ConnectorStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorStyle")
            .field("color", &self.color)
            .field("stroke_width", &self.stroke_width)
            .field("curviness", &self.curviness)
            .field("scale", &self.scale)
            .field("only_integer_coords", &self.only_integer_coords)
            .field("class_name", &self.class_name)
            .field("offset_start_x", &self.offset_start_x)
            .field("offset_start_y", &self.offset_start_y)
            .field("offset_end_x", &self.offset_end_x)
            .field("offset_end_y", &self.offset_end_y)
            .field("with_head", &self.with_head)
            .field("head_size", &self.head_size)
            .field("head_color", &self.head_color)
            .field("shared_marker", &self.shared_marker)
            .field("label", &self.label)
            .field("label_class_name", &self.label_class_name)
            .field("use_register", &self.use_register)
            .field("on_click", &self.on_click.is_some())
            .field("on_hover", &self.on_hover.is_some())
            .finish()
    }
}

/// Surface-wide defaults shared by every connector of a layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerDefaults {
    /// Stroke color.
    pub color: Option<String>,
    /// Stroke width.
    pub stroke_width: Option<f64>,
    /// Curviness.
    pub curviness: Option<f64>,
    /// Scale.
    pub scale: Option<f64>,
    /// Integer coordinate rounding.
    pub only_integer_coords: Option<bool>,
    /// Path class name.
    pub class_name: Option<String>,
    /// Horizontal offset of start anchors.
    pub offset_start_x: Option<f64>,
    /// Vertical offset of start anchors.
    pub offset_start_y: Option<f64>,
    /// Horizontal offset of end anchors.
    pub offset_end_x: Option<f64>,
    /// Vertical offset of end anchors.
    pub offset_end_y: Option<f64>,
    /// Arrowhead presence.
    pub with_head: Option<bool>,
    /// Arrowhead size.
    pub head_size: Option<f64>,
    /// Arrowhead fill.
    pub head_color: Option<String>,
    /// Class name of text labels.
    pub label_class_name: Option<String>,
    /// Anchor notification subscription.
    pub use_register: Option<bool>,
}

bitflags::bitflags! {
    /// Fields that differ between two resolved styles.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct StyleChanges: u16 {
        /// Stroke color.
        const STROKE = 1 << 0;
        /// Stroke width.
        const STROKE_WIDTH = 1 << 1;
        /// Path class name.
        const CLASS_NAME = 1 << 2;
        /// Curviness, scale, offsets or rounding.
        const GEOMETRY = 1 << 3;
        /// Click or hover handlers.
        const HANDLERS = 1 << 4;
        /// Arrowhead presence.
        const HEAD_PRESENCE = 1 << 5;
        /// Arrowhead size or fill.
        const HEAD_STYLE = 1 << 6;
        /// Arrowhead share key.
        const SHARED_MARKER = 1 << 7;
        /// Label presence.
        const LABEL_PRESENCE = 1 << 8;
        /// Label kind (text or custom).
        const LABEL_KIND = 1 << 9;
        /// Label text or placement callback.
        const LABEL_CONTENT = 1 << 10;
        /// Label class name.
        const LABEL_CLASS = 1 << 11;
        /// Anchor subscription.
        const REGISTRATION = 1 << 12;

        /// Everything applied to the path element itself.
        const PATH = Self::STROKE.bits()
            | Self::STROKE_WIDTH.bits()
            | Self::CLASS_NAME.bits()
            | Self::HANDLERS.bits();
    }
}

/// Effective style of one connector.
#[derive(Clone)]
pub struct ResolvedStyle {
    /// Stroke color.
    pub color: String,
    /// Stroke width.
    pub stroke_width: f64,
    /// Curviness.
    pub curviness: f64,
    /// Scale.
    pub scale: f64,
    /// Integer coordinate rounding.
    pub only_integer_coords: bool,
    /// Path class name.
    pub class_name: Option<String>,
    /// Offset applied to the start anchor rectangle.
    pub offset_start: Vec2,
    /// Offset applied to the end anchor rectangle.
    pub offset_end: Vec2,
    /// Arrowhead presence.
    pub with_head: bool,
    /// Arrowhead size.
    pub head_size: f64,
    /// Arrowhead fill.
    pub head_fill: String,
    /// Arrowhead share key.
    pub shared_marker: Option<String>,
    /// Label content.
    pub label: Option<LabelContent>,
    /// Class name of a text label.
    pub label_class_name: Option<String>,
    /// Anchor notification subscription.
    pub use_register: bool,
    /// Click handler.
    pub on_click: Option<PointerHandler>,
    /// Hover handler.
    pub on_hover: Option<PointerHandler>,
}

impl ResolvedStyle {
    /// Resolves `style` against the layer `defaults` and the engine defaults.
    #[must_use]
    pub fn resolve(style: &ConnectorStyle, defaults: &LayerDefaults) -> Self {
        let color = pick(&style.color, &defaults.color).unwrap_or_else(|| DEFAULT_COLOR.into());
        let head_fill = pick(&style.head_color, &defaults.head_color).unwrap_or_else(|| color.clone());
        let with_head = style.with_head.or(defaults.with_head).unwrap_or(
            style.head_color.is_some()
                || style.head_size.is_some()
                || defaults.head_color.is_some()
                || defaults.head_size.is_some(),
        );
        Self {
            stroke_width: style
                .stroke_width
                .or(defaults.stroke_width)
                .unwrap_or(DEFAULT_STROKE_WIDTH),
            curviness: style
                .curviness
                .or(defaults.curviness)
                .unwrap_or(DEFAULT_CURVINESS),
            scale: style.scale.or(defaults.scale).unwrap_or(DEFAULT_SCALE),
            only_integer_coords: style
                .only_integer_coords
                .or(defaults.only_integer_coords)
                .unwrap_or(false),
            class_name: pick(&style.class_name, &defaults.class_name),
            offset_start: Vec2::new(
                style.offset_start_x.or(defaults.offset_start_x).unwrap_or(0.0),
                style.offset_start_y.or(defaults.offset_start_y).unwrap_or(0.0),
            ),
            offset_end: Vec2::new(
                style.offset_end_x.or(defaults.offset_end_x).unwrap_or(0.0),
                style.offset_end_y.or(defaults.offset_end_y).unwrap_or(0.0),
            ),
            with_head,
            head_size: style
                .head_size
                .or(defaults.head_size)
                .unwrap_or(DEFAULT_HEAD_SIZE),
            head_fill,
            shared_marker: style.shared_marker.clone(),
            label: style.label.clone(),
            label_class_name: pick(&style.label_class_name, &defaults.label_class_name),
            use_register: style.use_register.or(defaults.use_register).unwrap_or(true),
            on_click: style.on_click.clone(),
            on_hover: style.on_hover.clone(),
            color,
        }
    }

    /// Returns the fields that differ between `self` and `next`.
    #[must_use]
    pub fn diff(&self, next: &Self) -> StyleChanges {
        let mut changes = StyleChanges::empty();
        changes.set(StyleChanges::STROKE, self.color != next.color);
        changes.set(
            StyleChanges::STROKE_WIDTH,
            self.stroke_width != next.stroke_width,
        );
        changes.set(StyleChanges::CLASS_NAME, self.class_name != next.class_name);
        changes.set(
            StyleChanges::GEOMETRY,
            self.curviness != next.curviness
                || self.scale != next.scale
                || self.only_integer_coords != next.only_integer_coords
                || self.offset_start != next.offset_start
                || self.offset_end != next.offset_end,
        );
        changes.set(
            StyleChanges::HANDLERS,
            !same_handler(&self.on_click, &next.on_click)
                || !same_handler(&self.on_hover, &next.on_hover),
        );
        changes.set(StyleChanges::HEAD_PRESENCE, self.with_head != next.with_head);
        changes.set(
            StyleChanges::HEAD_STYLE,
            self.head_size != next.head_size || self.head_fill != next.head_fill,
        );
        changes.set(
            StyleChanges::SHARED_MARKER,
            self.shared_marker != next.shared_marker,
        );
        match (&self.label, &next.label) {
            (None, None) => {}
            (Some(a), Some(b)) => {
                if a.kind() != b.kind() {
                    changes |= StyleChanges::LABEL_KIND;
                } else if !a.same_content(b) {
                    changes |= StyleChanges::LABEL_CONTENT;
                }
            }
            _ => changes |= StyleChanges::LABEL_PRESENCE,
        }
        changes.set(
            StyleChanges::LABEL_CLASS,
            self.label_class_name != next.label_class_name,
        );
        changes.set(
            StyleChanges::REGISTRATION,
            self.use_register != next.use_register,
        );
        changes
    }

    /// Parameters handed to the path renderer.
    #[must_use]
    pub fn path_params(&self) -> PathParams {
        PathParams {
            curviness: self.curviness,
            only_integer_coords: self.only_integer_coords,
        }
    }

    /// Kind of the configured label, if any.
    #[must_use]
    pub fn label_kind(&self) -> Option<LabelKind> {
        self.label.as_ref().map(LabelContent::kind)
    }
}

impl fmt::Debug for ResolvedStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedStyle")
            .field("color", &self.color)
            .field("stroke_width", &self.stroke_width)
            .field("curviness", &self.curviness)
            .field("scale", &self.scale)
            .field("only_integer_coords", &self.only_integer_coords)
            .field("class_name", &self.class_name)
            .field("offset_start", &self.offset_start)
            .field("offset_end", &self.offset_end)
            .field("with_head", &self.with_head)
            .field("head_size", &self.head_size)
            .field("head_fill", &self.head_fill)
            .field("shared_marker", &self.shared_marker)
            .field("label", &self.label)
            .field("label_class_name", &self.label_class_name)
            .field("use_register", &self.use_register)
            .field("on_click", &self.on_click.is_some())
            .field("on_hover", &self.on_hover.is_some())
            .finish()
    }
}

fn pick(explicit: &Option<String>, fallback: &Option<String>) -> Option<String> {
    explicit.as_ref().or(fallback.as_ref()).cloned()
}

fn same_handler(a: &Option<PointerHandler>, b: &Option<PointerHandler>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}
