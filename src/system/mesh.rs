use nalgebra::DMatrix;

/// A single aerodynamic box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AerodynamicBox {
    /// Chordwise coordinate of the box center \[m\]
    pub x: f64,
    /// Spanwise coordinate of the box center \[m\]
    pub y: f64,
    /// Box area \[m^2\]
    pub area: f64,
}

/// Uniform `nx` by `ny` subdivision of a rectangular panel. Boxes are ordered chordwise first.
#[derive(Debug, Clone)]
pub struct AerodynamicPanelMesh {
    /// Panel chord \[m\]
    pub length: f64,
    /// Panel span \[m\]
    pub width: f64,
    /// Boxes along the chord
    pub nx: usize,
    /// Boxes along the span
    pub ny: usize,
    /// Boxes, chordwise index fastest
    pub boxes: Vec<AerodynamicBox>,
}

impl AerodynamicPanelMesh {
    /// Subdivide a `length` by `width` panel. Zero counts are raised to one box.
    pub fn new(length: f64, width: f64, nx: usize, ny: usize) -> Self {
        let nx = nx.max(1);
        let ny = ny.max(1);
        let dx = length / nx as f64;
        let dy = width / ny as f64;

        let boxes = (0..ny)
            .flat_map(|j| {
                (0..nx).map(move |i| AerodynamicBox {
                    x: (i as f64 + 0.5) * dx,
                    y: (j as f64 + 0.5) * dy,
                    area: dx * dy,
                })
            })
            .collect();

        Self {
            length,
            width,
            nx,
            ny,
            boxes,
        }
    }

    /// Chordwise box size
    pub fn dx(&self) -> f64 {
        self.length / self.nx as f64
    }

    /// Spanwise box size
    pub fn dy(&self) -> f64 {
        self.width / self.ny as f64
    }

    /// Number of box corner nodes, `(nx + 1) (ny + 1)`
    pub fn node_count(&self) -> usize {
        (self.nx + 1) * (self.ny + 1)
    }

    /// Index of the corner node at chordwise position `i` and spanwise position `j`
    pub fn node(&self, i: usize, j: usize) -> usize {
        j * (self.nx + 1) + i
    }

    /// Matrix mapping nodal displacements to box displacements by averaging the four corners
    pub(crate) fn corner_transfer(&self) -> DMatrix<f64> {
        let mut transfer = DMatrix::zeros(self.boxes.len(), self.node_count());

        for j in 0..self.ny {
            for i in 0..self.nx {
                let row = j * self.nx + i;
                for (ci, cj) in [(i, j), (i + 1, j), (i, j + 1), (i + 1, j + 1)] {
                    transfer[(row, self.node(ci, cj))] = 0.25;
                }
            }
        }

        transfer
    }

    /// Matrix mapping nodal displacements to the chordwise slope at each box center
    pub(crate) fn chordwise_slope(&self) -> DMatrix<f64> {
        let mut slope = DMatrix::zeros(self.boxes.len(), self.node_count());
        let half = 0.5 / self.dx();

        for j in 0..self.ny {
            for i in 0..self.nx {
                let row = j * self.nx + i;
                for cj in [j, j + 1] {
                    slope[(row, self.node(i, cj))] = -half;
                    slope[(row, self.node(i + 1, cj))] = half;
                }
            }
        }

        slope
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    use super::AerodynamicPanelMesh;

    #[test]
    fn boxes_tile_the_panel() {
        let mesh = AerodynamicPanelMesh::new(0.5, 0.3, 8, 6);

        assert_eq!(mesh.boxes.len(), 48);
        assert_relative_eq!(
            mesh.boxes.iter().map(|b| b.area).sum::<f64>(),
            0.15,
            epsilon = 1e-12
        );
        assert_relative_eq!(mesh.boxes[0].x, 0.03125);
        assert_relative_eq!(mesh.boxes[8].y, 0.075);
    }

    #[test]
    fn transfer_rows_average_corners() {
        let mesh = AerodynamicPanelMesh::new(1.0, 1.0, 3, 2);
        let transfer = mesh.corner_transfer();

        assert_eq!(transfer.shape(), (6, 12));
        for row in transfer.row_iter() {
            assert_relative_eq!(row.sum(), 1.0);
        }
    }

    #[test]
    fn slope_of_a_ramp() {
        let mesh = AerodynamicPanelMesh::new(2.0, 1.0, 4, 2);
        let ramp = DVector::from_fn(mesh.node_count(), |node, _| {
            0.3 * (node % (mesh.nx + 1)) as f64 * mesh.dx()
        });

        let slope = mesh.chordwise_slope() * ramp;

        for value in slope.iter() {
            assert_relative_eq!(*value, 0.3, epsilon = 1e-12);
        }
    }

    #[test]
    fn degenerate_resolution() {
        let mesh = AerodynamicPanelMesh::new(1.0, 1.0, 0, 0);

        assert_eq!(mesh.boxes.len(), 1);
        assert_eq!(mesh.node_count(), 4);
    }
}
