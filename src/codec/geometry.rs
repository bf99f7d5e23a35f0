//! Precomputed ray/radius -> pixel-coordinate lookup tables.
//!
//! Built once per [`crate::codec::PolarEncoder`] instance and shared
//! read-only across encode calls.

use std::f64::consts::PI;

/// One `(x, y)` pixel-space sample coordinate per `(ray, radial index)`.
#[derive(Clone, Copy, Debug)]
pub struct Sample {
    /// Horizontal pixel coordinate.
    pub x: f64,
    /// Vertical pixel coordinate.
    pub y: f64,
}

/// The `n_rays x (n_leds/2)` table of sample coordinates for a given
/// `(n_rays, n_leds, side)` triple.
///
/// Coordinates are deterministic functions of `(ray, led, side)`, independent
/// of pixel content.
#[derive(Debug)]
pub struct LookupTable {
    n_rays: u32,
    n_leds: u32,
    samples: Vec<Sample>,
}

impl LookupTable {
    /// Build the table. `side` is the raster's width/height in pixels.
    pub fn build(n_rays: u32, n_leds: u32, side: u32) -> Self {
        let half_leds = n_leds / 2;
        let mut samples = Vec::with_capacity((n_rays * half_leds) as usize);
        let w = f64::from(side.max(1) - 1).max(0.0);
        let h = w;
        for ray in 0..n_rays {
            // Angular direction is reversed relative to the ray index: a
            // naive forward iteration mirrors the image.
            let phi = 2.0 * PI * f64::from(n_rays - ray) / f64::from(n_rays);
            let (sin_phi, cos_phi) = phi.sin_cos();
            for led in 0..half_leds {
                // Division by the *full* LED count is intentional: only the
                // half-strip is emitted, so rho sweeps 0..0.5.
                let rho = (f64::from(led) + 0.5) / f64::from(n_leds);
                let u = 0.5 + rho * cos_phi;
                let v = 0.5 + rho * sin_phi;
                samples.push(Sample {
                    x: u * w,
                    y: v * h,
                });
            }
        }
        Self {
            n_rays,
            n_leds,
            samples,
        }
    }

    /// Number of radial samples encoded per ray (`n_leds / 2`).
    pub fn half_leds(&self) -> u32 {
        self.n_leds / 2
    }

    /// Number of angular rays this table covers.
    pub fn n_rays(&self) -> u32 {
        self.n_rays
    }

    /// Number of physical LEDs this table was built for.
    pub fn n_leds(&self) -> u32 {
        self.n_leds
    }

    /// Samples for one ray, in radial order.
    pub fn ray(&self, ray: u32) -> &[Sample] {
        let half_leds = self.half_leds() as usize;
        let start = ray as usize * half_leds;
        &self.samples[start..start + half_leds]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_stays_inside_unit_square() {
        let table = LookupTable::build(16, 8, 64);
        for ray in 0..16 {
            for s in table.ray(ray) {
                assert!((0.0..64.0).contains(&s.x), "x={}", s.x);
                assert!((0.0..64.0).contains(&s.y), "y={}", s.y);
            }
        }
    }

    #[test]
    fn angle_direction_is_reversed() {
        // ray 0 -> phi = 2pi (== 0), ray n/4 -> phi = 2pi*3/4
        let table = LookupTable::build(4, 8, 100);
        let centre = 49.5; // (side-1)/2
        let s0 = table.ray(0)[3]; // largest radius sample
        // phi(0) = 2*pi*4/4 = 2*pi == 0 -> pointing along +x from centre
        assert!(s0.x > centre);
        assert!((s0.y - centre).abs() < 1e-6);
    }
}
