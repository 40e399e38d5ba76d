//! Pointer state for picking operations
//!
//! Tracks the pointer position and button state the gizmo picking math reads
//! each frame, with conversion from screen pixels to Normalized Device
//! Coordinates.

/// Pointer state for picking operations
#[derive(Debug, Clone)]
pub struct PointerState {
    /// Current screen-space X position (pixels)
    pub screen_x: f64,
    /// Current screen-space Y position (pixels)
    pub screen_y: f64,
    /// Window width in pixels
    pub window_width: u32,
    /// Window height in pixels
    pub window_height: u32,
    /// Whether the primary button is currently held down
    pub button_down: bool,
}

impl PointerState {
    /// Create a new pointer state for a window of the given size
    pub fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            screen_x: 0.0,
            screen_y: 0.0,
            window_width,
            window_height,
            button_down: false,
        }
    }

    /// Update the pointer position from window events
    pub fn update_position(&mut self, x: f64, y: f64) {
        self.screen_x = x;
        self.screen_y = y;
    }

    /// Update the window size (for NDC conversion); call on resize
    pub fn update_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }

    /// Record a primary-button press
    pub fn press(&mut self) {
        self.button_down = true;
    }

    /// Record a primary-button release
    pub fn release(&mut self) {
        self.button_down = false;
    }

    /// Convert the current position to Normalized Device Coordinates
    ///
    /// Returns (x, y) in [-1, 1] with -1 at the left/top edge.
    pub fn screen_to_ndc(&self) -> (f32, f32) {
        let ndc_x = (self.screen_x / f64::from(self.window_width)) as f32 * 2.0 - 1.0;
        let ndc_y = (self.screen_y / f64::from(self.window_height)) as f32 * 2.0 - 1.0;
        (ndc_x, ndc_y)
    }
}

impl Default for PointerState {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}
