//! Device placement on a drawing canvas.
//!
//! Renderers need a starting position for every device after a snapshot is
//! loaded. Devices are laid out on a near-square grid in store order, so the
//! same snapshot always produces the same picture.

use log::debug;
use serde::Serialize;

use crate::topology::types::Device;

/// Default canvas size used when the caller has no window to measure
pub const DEFAULT_CANVAS: (i32, i32) = (800, 600);

/// Offset from the cell anchor to the top-left corner of a device icon
const ICON_OFFSET: (i32, i32) = (30, 20);

/// Canvas coordinates for one device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Places `count` items on a grid filling a `width` x `height` canvas.
///
/// # Arguments
///
/// * `count` - Number of devices to place
/// * `width` - Canvas width in pixels
/// * `height` - Canvas height in pixels
///
/// # Returns
///
/// * One point per device, row by row
pub fn grid_positions(count: usize, width: i32, height: i32) -> Vec<Point> {
    if count == 0 {
        return Vec::new();
    }

    let cols = (count as f64).sqrt().ceil() as usize;
    let rows = count.div_ceil(cols);
    let cell_width = width / (cols as i32 + 1);
    let cell_height = height / (rows as i32 + 1);
    debug!("Laying out {} devices on a {}x{} grid", count, cols, rows);

    (0..count)
        .map(|i| {
            let col = (i % cols) as i32;
            let row = (i / cols) as i32;
            Point {
                x: cell_width * (col + 1) - ICON_OFFSET.0,
                y: cell_height * (row + 1) - ICON_OFFSET.1,
            }
        })
        .collect()
}

/// Pairs each device with its grid position
pub fn layout_devices(devices: &[Device], width: i32, height: i32) -> Vec<(&Device, Point)> {
    devices
        .iter()
        .zip(grid_positions(devices.len(), width, height))
        .collect()
}
