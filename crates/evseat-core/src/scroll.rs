// Evseat Scroll Accumulator
// Smooth scroll deltas and the discrete wheel steps synthesized from them

use smallvec::SmallVec;
use strum_macros::{Display, EnumString};

/// Library scroll units per discrete wheel step
pub const DISCRETE_SCROLL_STEP: f64 = 10.0;

/// Most discrete steps one smooth event emits per axis; the rest of a
/// larger delta is dropped
pub const MAX_EMULATED_STEPS: usize = 32;

/// Where a scroll event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ScrollSource {
    Unknown,
    Wheel,
    Finger,
    Continuous,
}

/// Direction of a discrete scroll step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Axes whose scroll sequence ended with this event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollFinish {
    pub horizontal: bool,
    pub vertical: bool,
}

impl ScrollFinish {
    pub const NONE: ScrollFinish = ScrollFinish {
        horizontal: false,
        vertical: false,
    };

    pub fn is_none(&self) -> bool {
        !self.horizontal && !self.vertical
    }
}

/// A scroll event to be emitted, in emission order
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollStep {
    /// Smooth scroll in discrete step units
    Smooth {
        dx: f64,
        dy: f64,
        finish: ScrollFinish,
        emulated: bool,
    },
    /// One wheel click
    Discrete {
        direction: ScrollDirection,
        emulated: bool,
    },
}

pub type ScrollSteps = SmallVec<[ScrollStep; 4]>;

/// Seat-wide running scroll totals
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollAccumulator {
    dx: f64,
    dy: f64,
}

impl ScrollAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current accumulated (dx, dy)
    pub fn accumulated(&self) -> (f64, f64) {
        (self.dx, self.dy)
    }

    /// Feed a continuous scroll delta.
    ///
    /// A finished axis is reset to zero instead of accumulating. The
    /// smooth event always comes first, followed by one emulated
    /// discrete step per whole [`DISCRETE_SCROLL_STEP`] held on each axis
    /// (horizontal steps before vertical ones), at most
    /// [`MAX_EMULATED_STEPS`] per axis. Non-finite deltas count as zero.
    pub fn accumulate(&mut self, dx: f64, dy: f64, finish: ScrollFinish) -> ScrollSteps {
        let dx = finite_or_zero(dx);
        let dy = finite_or_zero(dy);
        if finish.horizontal {
            self.dx = 0.0;
        } else {
            self.dx += dx;
        }
        if finish.vertical {
            self.dy = 0.0;
        } else {
            self.dy += dy;
        }

        let mut steps = ScrollSteps::new();
        steps.push(ScrollStep::Smooth {
            dx: dx / DISCRETE_SCROLL_STEP,
            dy: dy / DISCRETE_SCROLL_STEP,
            finish,
            emulated: false,
        });

        let n_x = step_count(self.dx);
        let n_y = step_count(self.dy);

        let x_direction = if self.dx > 0.0 {
            ScrollDirection::Right
        } else {
            ScrollDirection::Left
        };
        let y_direction = if self.dy > 0.0 {
            ScrollDirection::Down
        } else {
            ScrollDirection::Up
        };

        steps.extend((0..n_x).map(|_| ScrollStep::Discrete {
            direction: x_direction,
            emulated: true,
        }));
        steps.extend((0..n_y).map(|_| ScrollStep::Discrete {
            direction: y_direction,
            emulated: true,
        }));

        self.dx %= DISCRETE_SCROLL_STEP;
        self.dy %= DISCRETE_SCROLL_STEP;

        steps
    }

    /// Wheel clicks bypass accumulation: an emulated smooth event plus
    /// exactly one discrete step. A zero delta on both axes produces only
    /// the smooth event.
    pub fn discrete(discrete_dx: f64, discrete_dy: f64) -> ScrollSteps {
        let mut steps = ScrollSteps::new();
        steps.push(ScrollStep::Smooth {
            dx: discrete_dx,
            dy: discrete_dy,
            finish: ScrollFinish::NONE,
            emulated: true,
        });
        match discrete_direction(discrete_dx, discrete_dy) {
            Some(direction) => steps.push(ScrollStep::Discrete {
                direction,
                emulated: false,
            }),
            None => log::warn!("discrete scroll without a direction"),
        }
        steps
    }

    pub fn reset(&mut self) {
        self.dx = 0.0;
        self.dy = 0.0;
    }
}

/// Horizontal wins over vertical, matching wheel tilt reporting
fn discrete_direction(dx: f64, dy: f64) -> Option<ScrollDirection> {
    if dx > 0.0 {
        Some(ScrollDirection::Right)
    } else if dx < 0.0 {
        Some(ScrollDirection::Left)
    } else if dy > 0.0 {
        Some(ScrollDirection::Down)
    } else if dy < 0.0 {
        Some(ScrollDirection::Up)
    } else {
        None
    }
}

fn finite_or_zero(delta: f64) -> f64 {
    if delta.is_finite() {
        delta
    } else {
        log::debug!("ignoring non-finite scroll delta {}", delta);
        0.0
    }
}

fn step_count(accumulated: f64) -> usize {
    let steps = (accumulated.abs() / DISCRETE_SCROLL_STEP).floor() as usize;
    if steps > MAX_EMULATED_STEPS {
        log::debug!("clamping {} emulated scroll steps to {}", steps, MAX_EMULATED_STEPS);
    }
    steps.min(MAX_EMULATED_STEPS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discrete_count(steps: &ScrollSteps, want: ScrollDirection) -> usize {
        steps
            .iter()
            .filter(|s| matches!(s, ScrollStep::Discrete { direction, .. } if *direction == want))
            .count()
    }

    #[test]
    fn test_small_delta_only_smooth() {
        let mut acc = ScrollAccumulator::new();
        let steps = acc.accumulate(0.0, 4.0, ScrollFinish::NONE);
        assert_eq!(steps.len(), 1);
        assert_eq!(
            steps[0],
            ScrollStep::Smooth {
                dx: 0.0,
                dy: 0.4,
                finish: ScrollFinish::NONE,
                emulated: false
            }
        );
        assert_eq!(acc.accumulated(), (0.0, 4.0));
    }

    #[test]
    fn test_accumulates_into_steps() {
        let mut acc = ScrollAccumulator::new();
        acc.accumulate(0.0, 6.0, ScrollFinish::NONE);
        let steps = acc.accumulate(0.0, 6.0, ScrollFinish::NONE);
        assert_eq!(discrete_count(&steps, ScrollDirection::Down), 1);
        assert_eq!(acc.accumulated(), (0.0, 2.0));

        let steps = acc.accumulate(0.0, -25.0, ScrollFinish::NONE);
        // 2 - 25 = -23 -> two steps up, remainder -3
        assert_eq!(discrete_count(&steps, ScrollDirection::Up), 2);
        assert_eq!(acc.accumulated(), (0.0, -3.0));
    }

    #[test]
    fn test_huge_delta_clamps_steps() {
        let mut acc = ScrollAccumulator::new();
        let steps = acc.accumulate(0.0, 1_000_000_003.0, ScrollFinish::NONE);
        assert_eq!(steps.len(), 1 + MAX_EMULATED_STEPS);
        assert_eq!(discrete_count(&steps, ScrollDirection::Down), MAX_EMULATED_STEPS);
        assert_eq!(acc.accumulated(), (0.0, 3.0));

        // Non-finite deltas leave the totals alone
        let steps = acc.accumulate(f64::INFINITY, f64::NAN, ScrollFinish::NONE);
        assert_eq!(steps.len(), 1);
        assert!(matches!(steps[0], ScrollStep::Smooth { dx, dy, .. } if dx == 0.0 && dy == 0.0));
        assert_eq!(acc.accumulated(), (0.0, 3.0));
    }

    #[test]
    fn test_horizontal_steps_before_vertical() {
        let mut acc = ScrollAccumulator::new();
        let steps = acc.accumulate(-10.0, 20.0, ScrollFinish::NONE);
        assert_eq!(steps.len(), 4);
        assert!(matches!(
            steps[1],
            ScrollStep::Discrete {
                direction: ScrollDirection::Left,
                emulated: true
            }
        ));
        assert!(matches!(
            steps[3],
            ScrollStep::Discrete {
                direction: ScrollDirection::Down,
                ..
            }
        ));
    }

    #[test]
    fn test_finish_zeroes_axis() {
        let mut acc = ScrollAccumulator::new();
        acc.accumulate(7.0, 7.0, ScrollFinish::NONE);
        let finish = ScrollFinish {
            horizontal: true,
            vertical: false,
        };
        let steps = acc.accumulate(5.0, 0.0, finish);
        assert_eq!(acc.accumulated().0, 0.0);
        assert_eq!(acc.accumulated().1, 7.0);
        // The smooth event still carries the raw delta
        assert!(matches!(steps[0], ScrollStep::Smooth { dx, .. } if dx == 0.5));
    }

    #[test]
    fn test_discrete_wheel() {
        let steps = ScrollAccumulator::discrete(0.0, -1.0);
        assert_eq!(steps.len(), 2);
        assert!(matches!(
            steps[0],
            ScrollStep::Smooth { dy, emulated: true, .. } if dy == -1.0
        ));
        assert_eq!(
            steps[1],
            ScrollStep::Discrete {
                direction: ScrollDirection::Up,
                emulated: false
            }
        );
    }

    #[test]
    fn test_discrete_prefers_horizontal() {
        assert_eq!(discrete_direction(1.0, 1.0), Some(ScrollDirection::Right));
        assert_eq!(discrete_direction(0.0, 2.0), Some(ScrollDirection::Down));
        assert_eq!(discrete_direction(0.0, 0.0), None);
    }

    #[test]
    fn test_source_names() {
        assert_eq!(ScrollSource::Finger.to_string(), "finger");
        assert_eq!("wheel".parse::<ScrollSource>(), Ok(ScrollSource::Wheel));
    }
}
