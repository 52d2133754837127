//! Per-tile floor shapes and their merge algebra.
//!
//! A floor tile is rendered with one, two or four proxy cubes depending on
//! how uneven the surface is across the block. When multiple surfaces
//! overlap one column, shapes merge to the point-wise maximum elevation and
//! then collapse back to the cheapest representation that still fits, which
//! keeps proxy counts (and therefore network traffic) minimal.
//!
//! Elevations are proxy cube centers: the walkable plane minus half a
//! block.

use glam::DVec3;

/// Corner elevations closer than this merge into the simpler shape.
pub const DIFF_THRESHOLD: f64 = 0.05;

/// Horizontal axis a two-sample slope is aligned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlopeAxis {
    X,
    Z,
}

impl SlopeAxis {
    /// X offset of the positive sample from the tile center
    #[inline]
    pub fn dx(self) -> f64 {
        match self {
            SlopeAxis::X => 0.25,
            SlopeAxis::Z => 0.0,
        }
    }

    /// Z offset of the positive sample from the tile center
    #[inline]
    pub fn dz(self) -> f64 {
        match self {
            SlopeAxis::X => 0.0,
            SlopeAxis::Z => 0.25,
        }
    }
}

/// Shape of the floor within a single block column.
///
/// Ordered by maximum elevation when sorting columns: see
/// [`FloorTileShape::max_y`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FloorTileShape {
    /// A level floor with a single elevation; one proxy.
    Level(f64),
    /// An axis-aligned slope with two elevations; two proxies. `y_pos` is
    /// the sample offset toward the positive axis direction, `y_neg`
    /// toward the negative.
    Slope {
        axis: SlopeAxis,
        y_pos: f64,
        y_neg: f64,
    },
    /// A diagonal slope or otherwise irregular tile with four corner
    /// elevations; four proxies. Field order is (x-,z-), (x-,z+),
    /// (x+,z-), (x+,z+).
    Complex {
        y_nn: f64,
        y_np: f64,
        y_pn: f64,
        y_pp: f64,
    },
}

impl FloorTileShape {
    /// Minimum elevation across the tile
    pub fn min_y(&self) -> f64 {
        match *self {
            FloorTileShape::Level(y) => y,
            FloorTileShape::Slope { y_pos, y_neg, .. } => y_pos.min(y_neg),
            FloorTileShape::Complex {
                y_nn,
                y_np,
                y_pn,
                y_pp,
            } => y_nn.min(y_np).min(y_pn).min(y_pp),
        }
    }

    /// Maximum elevation across the tile
    pub fn max_y(&self) -> f64 {
        match *self {
            FloorTileShape::Level(y) => y,
            FloorTileShape::Slope { y_pos, y_neg, .. } => y_pos.max(y_neg),
            FloorTileShape::Complex {
                y_nn,
                y_np,
                y_pn,
                y_pp,
            } => y_nn.max(y_np).max(y_pn).max(y_pp),
        }
    }

    /// How many proxy cubes this shape needs
    pub fn proxy_count(&self) -> usize {
        match self {
            FloorTileShape::Level(_) => 1,
            FloorTileShape::Slope { .. } => 2,
            FloorTileShape::Complex { .. } => 4,
        }
    }

    /// Upgrade to the four-corner representation
    pub fn to_complex(self) -> FloorTileShape {
        match self {
            FloorTileShape::Level(y) => FloorTileShape::Complex {
                y_nn: y,
                y_np: y,
                y_pn: y,
                y_pp: y,
            },
            FloorTileShape::Slope {
                axis: SlopeAxis::X,
                y_pos,
                y_neg,
            } => FloorTileShape::Complex {
                y_nn: y_neg,
                y_np: y_neg,
                y_pn: y_pos,
                y_pp: y_pos,
            },
            FloorTileShape::Slope {
                axis: SlopeAxis::Z,
                y_pos,
                y_neg,
            } => FloorTileShape::Complex {
                y_nn: y_neg,
                y_np: y_pos,
                y_pn: y_neg,
                y_pp: y_pos,
            },
            complex @ FloorTileShape::Complex { .. } => complex,
        }
    }

    /// Iterates the proxy cube-center positions for this shape at block
    /// column `(x, z)`.
    pub fn for_each_sample(&self, x: i32, z: i32, mut consumer: impl FnMut(DVec3)) {
        let cx = x as f64 + 0.5;
        let cz = z as f64 + 0.5;
        match *self {
            FloorTileShape::Level(y) => consumer(DVec3::new(cx, y, cz)),
            FloorTileShape::Slope { axis, y_pos, y_neg } => {
                consumer(DVec3::new(cx - axis.dx(), y_neg, cz - axis.dz()));
                consumer(DVec3::new(cx + axis.dx(), y_pos, cz + axis.dz()));
            }
            FloorTileShape::Complex {
                y_nn,
                y_np,
                y_pn,
                y_pp,
            } => {
                consumer(DVec3::new(cx - 0.25, y_nn, cz - 0.25));
                consumer(DVec3::new(cx - 0.25, y_np, cz + 0.25));
                consumer(DVec3::new(cx + 0.25, y_pn, cz - 0.25));
                consumer(DVec3::new(cx + 0.25, y_pp, cz + 0.25));
            }
        }
    }

    /// Merges this tile with another, returning the point-wise maximum of
    /// the two floors, reduced to the least complex shape that still
    /// represents it.
    pub fn merge(self, other: FloorTileShape) -> FloorTileShape {
        use FloorTileShape::*;
        match (self, other) {
            (Level(a), Level(b)) => Level(a.max(b)),
            (
                Slope {
                    axis,
                    y_pos,
                    y_neg,
                },
                Level(y),
            )
            | (
                Level(y),
                Slope {
                    axis,
                    y_pos,
                    y_neg,
                },
            ) => reduce_slope(axis, y_pos.max(y), y_neg.max(y)),
            (
                Slope {
                    axis: axis_a,
                    y_pos: ap,
                    y_neg: an,
                },
                Slope {
                    axis: axis_b,
                    y_pos: bp,
                    y_neg: bn,
                },
            ) if axis_a == axis_b => reduce_slope(axis_a, ap.max(bp), an.max(bn)),
            // Final fallback: merge in the four-corner representation
            (a, b) => merge_complex(a.to_complex(), b.to_complex()),
        }
    }
}

/// A slope whose two elevations came out nearly equal is just a level tile.
fn reduce_slope(axis: SlopeAxis, y_pos: f64, y_neg: f64) -> FloorTileShape {
    if (y_pos - y_neg).abs() < DIFF_THRESHOLD {
        FloorTileShape::Level(y_pos.max(y_neg))
    } else {
        FloorTileShape::Slope { axis, y_pos, y_neg }
    }
}

fn merge_complex(a: FloorTileShape, b: FloorTileShape) -> FloorTileShape {
    let (FloorTileShape::Complex {
        y_nn: a_nn,
        y_np: a_np,
        y_pn: a_pn,
        y_pp: a_pp,
    }, FloorTileShape::Complex {
        y_nn: b_nn,
        y_np: b_np,
        y_pn: b_pn,
        y_pp: b_pp,
    }) = (a, b)
    else {
        unreachable!("merge_complex called with non-complex shapes");
    };

    let y_nn = a_nn.max(b_nn);
    let y_np = a_np.max(b_np);
    let y_pn = a_pn.max(b_pn);
    let y_pp = a_pp.max(b_pp);

    // The merged result may not be diagonal at all. Compare the corner
    // pairs along each edge and collapse to a level tile or an aligned
    // slope where the heights allow it.
    let xn_same = (y_nn - y_np).abs() < DIFF_THRESHOLD;
    let xp_same = (y_pn - y_pp).abs() < DIFF_THRESHOLD;
    let zn_same = (y_nn - y_pn).abs() < DIFF_THRESHOLD;
    let zp_same = (y_np - y_pp).abs() < DIFF_THRESHOLD;

    if xn_same && xp_same {
        let y_neg = y_nn.max(y_np);
        let y_pos = y_pn.max(y_pp);
        if zn_same && zp_same {
            FloorTileShape::Level(y_neg.max(y_pos))
        } else {
            // Heights only vary along X
            FloorTileShape::Slope {
                axis: SlopeAxis::X,
                y_pos,
                y_neg,
            }
        }
    } else if zn_same && zp_same {
        // Heights only vary along Z
        FloorTileShape::Slope {
            axis: SlopeAxis::Z,
            y_pos: y_np.max(y_pp),
            y_neg: y_nn.max(y_pn),
        }
    } else {
        FloorTileShape::Complex {
            y_nn,
            y_np,
            y_pn,
            y_pp,
        }
    }
}
