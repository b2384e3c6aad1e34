use nalgebra::{DMatrix, DVector};

use crate::model::boundary::EdgeConstraint;
use crate::model::PanelSpecification;

use super::mesh::AerodynamicPanelMesh;

/// Lumped mass and five-point stencil bending stiffness on the corner nodes of a mesh
#[derive(Debug, Clone)]
pub struct StructuralModel {
    /// Diagonal of the lumped mass matrix \[kg\]
    pub mass: DVector<f64>,
    /// Symmetric stiffness matrix \[N/m\]
    pub stiffness: DMatrix<f64>,
}

impl StructuralModel {
    /// Assemble the plate on the corner nodes of `mesh`. Boundary nodes carry the diagonal
    /// penalty of their edge constraint; corner nodes carry the product of both edges.
    pub fn new(panel: &PanelSpecification, mesh: &AerodynamicPanelMesh) -> Self {
        let tributary = mesh.dx() * mesh.dy() / 4.0;
        let mass = DVector::from_element(mesh.node_count(), panel.areal_density() * tributary);

        let mut stiffness = plate_stiffness(panel, mesh);
        apply_edge_penalties(&mut stiffness, panel, mesh);

        Self { mass, stiffness }
    }
}

/// Chordwise and spanwise second differences of the nodal deflection. Together they form the
/// five-point Laplacian; nodes beyond the mesh are taken as undeflected.
fn second_differences(mesh: &AerodynamicPanelMesh) -> (DMatrix<f64>, DMatrix<f64>) {
    let n = mesh.node_count();
    let (cx, cy) = (mesh.dx().powi(-2), mesh.dy().powi(-2));
    let mut dxx = DMatrix::zeros(n, n);
    let mut dyy = DMatrix::zeros(n, n);

    for j in 0..=mesh.ny {
        for i in 0..=mesh.nx {
            let node = mesh.node(i, j);
            dxx[(node, node)] = -2.0 * cx;
            dyy[(node, node)] = -2.0 * cy;

            if i > 0 {
                dxx[(node, mesh.node(i - 1, j))] = cx;
            }
            if i < mesh.nx {
                dxx[(node, mesh.node(i + 1, j))] = cx;
            }
            if j > 0 {
                dyy[(node, mesh.node(i, j - 1))] = cy;
            }
            if j < mesh.ny {
                dyy[(node, mesh.node(i, j + 1))] = cy;
            }
        }
    }

    (dxx, dyy)
}

/// Bending energy `D (w_xx + w_yy)^2` integrated box by box, with each curvature term scaled by
/// its boundary-condition factor
fn plate_stiffness(panel: &PanelSpecification, mesh: &AerodynamicPanelMesh) -> DMatrix<f64> {
    let (dxx, dyy) = second_differences(mesh);
    let factors = panel.boundary.stiffness_factors();
    let scale = panel.flexural_rigidity() * mesh.dx() * mesh.dy();

    let cross = dxx.transpose() * &dyy;
    let stiffness = dxx.transpose() * &dxx * factors.kxx
        + dyy.transpose() * &dyy * factors.kyy
        + (&cross + cross.transpose()) * factors.kxy;

    stiffness * scale
}

fn apply_edge_penalties(
    stiffness: &mut DMatrix<f64>,
    panel: &PanelSpecification,
    mesh: &AerodynamicPanelMesh,
) {
    let [leading, trailing, left, right] = panel.boundary.edges();
    let mut penalize = |node: usize, constraint: EdgeConstraint| {
        stiffness[(node, node)] *= constraint.penalty();
    };

    for j in 0..=mesh.ny {
        penalize(mesh.node(0, j), leading);
        penalize(mesh.node(mesh.nx, j), trailing);
    }
    for i in 0..=mesh.nx {
        penalize(mesh.node(i, 0), left);
        penalize(mesh.node(i, mesh.ny), right);
    }
}
