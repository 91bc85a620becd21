//! Window functions for block-based analysis.

use std::f32::consts::PI;

/// Window function types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Window {
    /// Rectangular (no windowing).
    Rectangular,
    /// Hann window (raised cosine).
    #[default]
    Hann,
    /// Hamming window.
    Hamming,
}

impl Window {
    /// Apply the window to a buffer in place.
    pub fn apply(self, buffer: &mut [f32]) {
        let n = buffer.len();
        match self {
            Window::Rectangular => {}
            Window::Hann => {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    let w = 0.5 * (1.0 - (2.0 * PI * i as f32 / n as f32).cos());
                    *sample *= w;
                }
            }
            Window::Hamming => {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    let w = 0.54 - 0.46 * (2.0 * PI * i as f32 / n as f32).cos();
                    *sample *= w;
                }
            }
        }
    }

    /// The window coefficients at a given size.
    pub fn coefficients(self, size: usize) -> Vec<f32> {
        let mut coeffs = vec![1.0; size];
        self.apply(&mut coeffs);
        coeffs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hann_is_zero_at_edges_and_unity_at_center() {
        let coeffs = Window::Hann.coefficients(100);
        assert!(coeffs[0] < 0.01);
        assert!(coeffs[99] < 0.01);
        assert!((coeffs[50] - 1.0).abs() < 0.01);
    }

    #[test]
    fn rectangular_leaves_the_buffer_alone() {
        let mut buffer = vec![0.25; 16];
        Window::Rectangular.apply(&mut buffer);
        assert_eq!(buffer, vec![0.25; 16]);
    }

    #[test]
    fn hamming_keeps_a_raised_floor() {
        let coeffs = Window::Hamming.coefficients(64);
        assert!((coeffs[0] - 0.08).abs() < 0.01);
        assert!(coeffs.iter().all(|&c| c > 0.0));
    }
}
