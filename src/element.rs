//! Point-in-element solves for donor interpolation.
//!
//! Given a donor element's nodal coordinates (packed component-major:
//! `coords[j * num_nodes + ni]` for component `j`, node `ni`) and a receptor
//! point, [`is_in_element`] computes the natural (isoparametric) coordinates
//! of the point inside the element plus a distance diagnostic.
//!
//! Natural coordinates live in `[0, 1]` per axis. The diagnostic is
//! `max_d |2 xi_d - 1|`: zero at the centroid, one on the element boundary,
//! and greater than one outside — a value beyond `1 + tol` marks a degraded
//! donor match, which callers report as a warning rather than a failure.
//!
//! Supported topologies: hex8 (trilinear) and quad4 (bilinear), solved with a
//! Newton iteration on the forward map using the analytic Jacobian.

use crate::error::OversetError;

/// Result of a point-in-element solve.
#[derive(Clone, Debug, PartialEq)]
pub struct IsoResult {
    /// Natural coordinates, one per spatial dimension.
    pub coords: Vec<f64>,
    /// Nearest-point distance diagnostic (see module docs).
    pub distance: f64,
}

const MAX_NEWTON_ITERS: usize = 32;
const NEWTON_TOL: f64 = 1.0e-13;

/// Reference node positions for hex8, matching the usual exodus ordering.
const HEX8: [[f64; 3]; 8] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 0.0, 1.0],
    [1.0, 1.0, 1.0],
    [0.0, 1.0, 1.0],
];

const QUAD4: [[f64; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 1.0, 0.0],
];

fn reference_nodes(dim: usize, num_nodes: usize) -> Result<&'static [[f64; 3]], OversetError> {
    match (dim, num_nodes) {
        (3, 8) => Ok(&HEX8),
        (2, 4) => Ok(&QUAD4),
        _ => Err(OversetError::InvalidGeometry(format!(
            "unsupported donor topology: dim {dim}, {num_nodes} nodes"
        ))),
    }
}

/// Multilinear shape functions at `xi`.
fn shape_values(refs: &[[f64; 3]], dim: usize, xi: &[f64; 3], out: &mut [f64]) {
    for (i, r) in refs.iter().enumerate() {
        let mut v = 1.0;
        for d in 0..dim {
            v *= if r[d] > 0.5 { xi[d] } else { 1.0 - xi[d] };
        }
        out[i] = v;
    }
}

/// Shape-function gradients at `xi`: `out[i][d] = dN_i/dxi_d`.
fn shape_gradients(refs: &[[f64; 3]], dim: usize, xi: &[f64; 3], out: &mut [[f64; 3]]) {
    for (i, r) in refs.iter().enumerate() {
        for d in 0..dim {
            let mut g = if r[d] > 0.5 { 1.0 } else { -1.0 };
            for e in 0..dim {
                if e != d {
                    g *= if r[e] > 0.5 { xi[e] } else { 1.0 - xi[e] };
                }
            }
            out[i][d] = g;
        }
    }
}

/// Solve `a * x = b` for dim 2 or 3 by Cramer's rule.
fn solve_linear(dim: usize, a: &[[f64; 3]; 3], b: &[f64; 3]) -> Result<[f64; 3], OversetError> {
    let singular = || OversetError::InvalidGeometry("singular element Jacobian".into());
    let mut x = [0.0; 3];
    if dim == 2 {
        let det = a[0][0] * a[1][1] - a[0][1] * a[1][0];
        if det.abs() < f64::MIN_POSITIVE * 1.0e4 {
            return Err(singular());
        }
        x[0] = (b[0] * a[1][1] - b[1] * a[0][1]) / det;
        x[1] = (a[0][0] * b[1] - a[1][0] * b[0]) / det;
    } else {
        let det = a[0][0] * (a[1][1] * a[2][2] - a[1][2] * a[2][1])
            - a[0][1] * (a[1][0] * a[2][2] - a[1][2] * a[2][0])
            + a[0][2] * (a[1][0] * a[2][1] - a[1][1] * a[2][0]);
        if det.abs() < f64::MIN_POSITIVE * 1.0e4 {
            return Err(singular());
        }
        for k in 0..3 {
            let mut m = *a;
            for row in 0..3 {
                m[row][k] = b[row];
            }
            let dk = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
                - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
                + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
            x[k] = dk / det;
        }
    }
    Ok(x)
}

/// Invert the element map for `point`, returning natural coordinates and the
/// distance diagnostic.
///
/// `elem_coords` must hold `dim * num_nodes` values packed component-major.
pub fn is_in_element(
    dim: usize,
    elem_coords: &[f64],
    num_nodes: usize,
    point: &[f64],
) -> Result<IsoResult, OversetError> {
    let refs = reference_nodes(dim, num_nodes)?;
    if elem_coords.len() != dim * num_nodes || point.len() != dim {
        return Err(OversetError::InvalidGeometry(format!(
            "coordinate packing mismatch: {} element values, {} point values for dim {dim}, {num_nodes} nodes",
            elem_coords.len(),
            point.len()
        )));
    }

    let coord = |d: usize, ni: usize| elem_coords[d * num_nodes + ni];

    let mut xi = [0.5; 3];
    let mut shape = vec![0.0; num_nodes];
    let mut grads = vec![[0.0; 3]; num_nodes];

    for _ in 0..MAX_NEWTON_ITERS {
        shape_values(refs, dim, &xi, &mut shape);
        shape_gradients(refs, dim, &xi, &mut grads);

        let mut residual = [0.0; 3];
        for d in 0..dim {
            let mut x = 0.0;
            for ni in 0..num_nodes {
                x += shape[ni] * coord(d, ni);
            }
            residual[d] = x - point[d];
        }

        let mut jac = [[0.0; 3]; 3];
        for d1 in 0..dim {
            for d2 in 0..dim {
                let mut j = 0.0;
                for ni in 0..num_nodes {
                    j += grads[ni][d2] * coord(d1, ni);
                }
                jac[d1][d2] = j;
            }
        }

        let delta = solve_linear(dim, &jac, &residual)?;
        let mut step = 0.0f64;
        for d in 0..dim {
            xi[d] -= delta[d];
            step = step.max(delta[d].abs());
        }
        if step < NEWTON_TOL {
            break;
        }
    }

    let mut distance = 0.0f64;
    for d in 0..dim {
        distance = distance.max((2.0 * xi[d] - 1.0).abs());
    }

    Ok(IsoResult {
        coords: xi[..dim].to_vec(),
        distance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unit hex coords packed component-major in HEX8 ordering.
    fn unit_hex() -> Vec<f64> {
        let mut out = vec![0.0; 24];
        for (ni, r) in HEX8.iter().enumerate() {
            for d in 0..3 {
                out[d * 8 + ni] = r[d];
            }
        }
        out
    }

    #[test]
    fn centroid_resolves_to_half() {
        let coords = unit_hex();
        let result = is_in_element(3, &coords, 8, &[0.5, 0.5, 0.5]).unwrap();
        for xi in &result.coords {
            assert!((xi - 0.5).abs() < 1.0e-8);
        }
        assert!(result.distance < 1.0e-8);
    }

    #[test]
    fn vertex_resolves_to_corner() {
        let coords = unit_hex();
        let result = is_in_element(3, &coords, 8, &[1.0, 1.0, 1.0]).unwrap();
        for xi in &result.coords {
            assert!((xi - 1.0).abs() < 1.0e-10);
        }
        assert!((result.distance - 1.0).abs() < 1.0e-10);
    }

    #[test]
    fn outside_point_has_distance_beyond_one() {
        let coords = unit_hex();
        let result = is_in_element(3, &coords, 8, &[1.5, 0.5, 0.5]).unwrap();
        assert!(result.distance > 1.0);
        assert!((result.coords[0] - 1.5).abs() < 1.0e-10);
    }

    #[test]
    fn stretched_hex_interior_point() {
        // Hex spanning [0,2]x[0,1]x[0,4].
        let mut coords = vec![0.0; 24];
        for (ni, r) in HEX8.iter().enumerate() {
            coords[ni] = r[0] * 2.0;
            coords[8 + ni] = r[1];
            coords[16 + ni] = r[2] * 4.0;
        }
        let result = is_in_element(3, &coords, 8, &[0.5, 0.25, 3.0]).unwrap();
        assert!((result.coords[0] - 0.25).abs() < 1.0e-10);
        assert!((result.coords[1] - 0.25).abs() < 1.0e-10);
        assert!((result.coords[2] - 0.75).abs() < 1.0e-10);
        assert!(result.distance <= 1.0);
    }

    #[test]
    fn quad4_center() {
        let mut coords = vec![0.0; 8];
        for (ni, r) in QUAD4.iter().enumerate() {
            coords[ni] = r[0];
            coords[4 + ni] = r[1];
        }
        let result = is_in_element(2, &coords, 4, &[0.5, 0.5]).unwrap();
        assert!((result.coords[0] - 0.5).abs() < 1.0e-10);
        assert!((result.coords[1] - 0.5).abs() < 1.0e-10);
    }

    #[test]
    fn unsupported_topology_is_rejected() {
        assert!(is_in_element(3, &[0.0; 12], 4, &[0.0; 3]).is_err());
    }
}
