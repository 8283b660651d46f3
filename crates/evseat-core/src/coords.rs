// Evseat Coordinate Mapper
// Maps absolute device positions (touch, tablet) into stage space

use serde::{Deserialize, Serialize};

/// Size of the stage (the compositor's logical output area) in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageSize {
    pub width: f32,
    pub height: f32,
}

impl StageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Clamp a position into `[0, width - 1] x [0, height - 1]`
    pub fn clamp(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x.clamp(0.0, (self.width - 1.0).max(0.0)),
            y.clamp(0.0, (self.height - 1.0).max(0.0)),
        )
    }
}

/// Row-major 2x3 affine transform: `[xx, xy, x0, yx, yy, y0]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformMatrix(pub [f64; 6]);

impl TransformMatrix {
    pub const IDENTITY: TransformMatrix = TransformMatrix([1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);

    /// Apply the transform to a point
    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        let [xx, xy, x0, yx, yy, y0] = self.0;
        (xx * x + xy * y + x0, yx * x + yy * y + y0)
    }
}

impl Default for TransformMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Per-device mapping parameters
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CoordinateMapping {
    /// Device-to-output affine transform in normalized space
    pub matrix: TransformMatrix,
    /// Physical width / height of the device, 0 when unknown
    pub device_aspect_ratio: f64,
    /// Width / height of the mapped output, 0 when unset
    pub output_aspect_ratio: f64,
}

impl CoordinateMapping {
    /// Translate a device position, already scaled to stage size, into
    /// clamped stage coordinates.
    ///
    /// The position is normalized, corrected for the aspect ratio
    /// mismatch between device and output, pushed through the matrix and
    /// clamped to the box the matrix maps the unit square onto.
    pub fn translate(&self, stage: StageSize, x: f32, y: f32) -> (f32, f32) {
        let stage_width = f64::from(stage.width);
        let stage_height = f64::from(stage.height);
        let mut x_d = f64::from(x) / stage_width;
        let mut y_d = f64::from(y) / stage_height;

        if self.output_aspect_ratio > 0.0 && self.device_aspect_ratio > 0.0 {
            let ratio = self.device_aspect_ratio / self.output_aspect_ratio;
            if ratio > 1.0 {
                x_d *= ratio;
            } else if ratio < 1.0 {
                y_d *= 1.0 / ratio;
            }
        }

        let (min_x, min_y) = self.matrix.transform_point(0.0, 0.0);
        let (max_x, max_y) = self.matrix.transform_point(1.0, 1.0);
        let (x_d, y_d) = self.matrix.transform_point(x_d, y_d);

        let x_out = x_d.clamp(min_x.min(max_x), min_x.max(max_x)) * stage_width;
        let y_out = y_d.clamp(min_y.min(max_y), min_y.max(max_y)) * stage_height;
        (x_out as f32, y_out as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAGE: StageSize = StageSize {
        width: 1000.0,
        height: 500.0,
    };

    #[test]
    fn test_identity_passes_through() {
        let mapping = CoordinateMapping::default();
        assert_eq!(mapping.translate(STAGE, 250.0, 100.0), (250.0, 100.0));
    }

    #[test]
    fn test_identity_clamps_to_stage() {
        let mapping = CoordinateMapping::default();
        assert_eq!(mapping.translate(STAGE, 1200.0, -20.0), (1000.0, 0.0));
    }

    #[test]
    fn test_matrix_maps_to_left_half() {
        // Map the device onto the left half of the stage
        let mapping = CoordinateMapping {
            matrix: TransformMatrix([0.5, 0.0, 0.0, 0.0, 1.0, 0.0]),
            ..Default::default()
        };
        assert_eq!(mapping.translate(STAGE, 1000.0, 500.0), (500.0, 500.0));
        assert_eq!(mapping.translate(STAGE, 500.0, 250.0), (250.0, 250.0));
    }

    #[test]
    fn test_flipped_matrix_clamps_to_mapped_box() {
        // 180 degree rotation
        let mapping = CoordinateMapping {
            matrix: TransformMatrix([-1.0, 0.0, 1.0, 0.0, -1.0, 1.0]),
            ..Default::default()
        };
        assert_eq!(mapping.translate(STAGE, 0.0, 0.0), (1000.0, 500.0));
        assert_eq!(mapping.translate(STAGE, 2000.0, 0.0), (0.0, 500.0));
    }

    #[test]
    fn test_wider_device_scales_x() {
        // Device is 2:1, output is 1:1 -> x stretched by 2
        let mapping = CoordinateMapping {
            device_aspect_ratio: 2.0,
            output_aspect_ratio: 1.0,
            ..Default::default()
        };
        assert_eq!(mapping.translate(STAGE, 250.0, 250.0), (500.0, 250.0));
    }

    #[test]
    fn test_taller_device_scales_y() {
        let mapping = CoordinateMapping {
            device_aspect_ratio: 0.5,
            output_aspect_ratio: 1.0,
            ..Default::default()
        };
        assert_eq!(mapping.translate(STAGE, 100.0, 100.0), (100.0, 200.0));
    }

    #[test]
    fn test_unset_ratio_skips_correction() {
        let mapping = CoordinateMapping {
            device_aspect_ratio: 2.0,
            output_aspect_ratio: 0.0,
            ..Default::default()
        };
        assert_eq!(mapping.translate(STAGE, 250.0, 250.0), (250.0, 250.0));
    }

    #[test]
    fn test_stage_clamp() {
        assert_eq!(STAGE.clamp(-5.0, 900.0), (0.0, 499.0));
        assert_eq!(STAGE.clamp(10.5, 20.0), (10.5, 20.0));
    }
}
