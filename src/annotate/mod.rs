//! Words and their interaction with an external drawing surface.
//!
//! The drawing surface itself (canvas, stage, whatever renders the shapes) is
//! an external collaborator behind the [`DrawSurface`] trait; this module only
//! decides *what* happens on hover and click so that a shape and its word
//! stay in sync.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A transcribed word joined to an [`AnnotationShape`] by id.
///
/// [`AnnotationShape`]: crate::geometry::AnnotationShape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    /// Join key matching the shape this word was read from.
    pub id: u32,
    /// The transcribed text; empty when the recognizer read nothing.
    pub text: String,
    /// Display color as `#rrggbb`, used to correlate list entry and shape.
    pub color: String,
    /// Whether the paired shape is currently hovered.
    pub is_active: bool,
}

impl Word {
    /// Creates a word with a freshly picked display color.
    pub fn new(id: u32, text: String) -> Self {
        Self {
            id,
            text,
            color: random_display_color(&mut rand::thread_rng()),
            is_active: false,
        }
    }

    /// Creates a word with a fixed color.
    pub fn with_color(id: u32, text: String, color: String) -> Self {
        Self {
            id,
            text,
            color,
            is_active: false,
        }
    }

    /// The translucent fill used when the word's shape is at rest.
    pub fn resting_fill(&self) -> String {
        format!("{}33", self.color)
    }
}

/// Picks a saturated, readable display color.
pub fn random_display_color<R: Rng>(rng: &mut R) -> String {
    let hue: f32 = rng.gen_range(0.0..360.0);
    let saturation: f32 = rng.gen_range(0.55..0.95);
    let lightness: f32 = rng.gen_range(0.45..0.70);
    let (r, g, b) = hsl_to_rgb(hue, saturation, lightness);
    format!("#{r:02x}{g:02x}{b:02x}")
}

fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> (u8, u8, u8) {
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = lightness - c / 2.0;
    let (r, g, b) = match hue {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    (
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    )
}

/// The rendering boundary: a surface that can restyle shapes, redraw its
/// shape layer, and scroll a word's list entry into view.
pub trait DrawSurface {
    /// Restyles one shape's fill.
    fn restyle_shape(&mut self, shape_id: u32, fill: &str);
    /// Redraws the shape layer after restyling.
    fn redraw_layer(&mut self);
    /// Scrolls the list entry for a word into view.
    fn scroll_word_into_view(&mut self, word_id: u32);
}

/// Binds hover/click events to a drawing surface and a word list.
#[derive(Debug)]
pub struct InteractionHub<S> {
    surface: S,
}

impl<S: DrawSurface> InteractionHub<S> {
    /// Wraps a drawing surface.
    pub fn new(surface: S) -> Self {
        Self { surface }
    }

    /// The wrapped surface.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Hovering a list entry clears the paired shape's fill so the region
    /// underneath shows through.
    pub fn word_hover_started(&mut self, word: &Word) {
        self.surface.restyle_shape(word.id, "transparent");
        self.surface.redraw_layer();
    }

    /// Leaving a list entry restores the shape's translucent fill.
    pub fn word_hover_ended(&mut self, word: &Word) {
        self.surface.restyle_shape(word.id, &word.resting_fill());
        self.surface.redraw_layer();
    }

    /// Hovering a shape activates the paired word; returns false when no
    /// word carries the shape's id.
    pub fn shape_hover_started(&mut self, words: &mut [Word], shape_id: u32) -> bool {
        set_active(words, shape_id, true)
    }

    /// Leaving a shape deactivates the paired word.
    pub fn shape_hover_ended(&mut self, words: &mut [Word], shape_id: u32) -> bool {
        set_active(words, shape_id, false)
    }

    /// Clicking a shape scrolls the paired word's list entry into view.
    pub fn shape_clicked(&mut self, words: &[Word], shape_id: u32) {
        if words.iter().any(|word| word.id == shape_id) {
            self.surface.scroll_word_into_view(shape_id);
        }
    }
}

fn set_active(words: &mut [Word], shape_id: u32, active: bool) -> bool {
    match words.iter_mut().find(|word| word.id == shape_id) {
        Some(word) => {
            word.is_active = active;
            true
        }
        None => false,
    }
}
