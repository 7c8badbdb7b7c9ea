//! Field meshes: nodes, triangle/tetrahedron elements and named per-node or per-element fields.
//!
//! A [`FieldMesh`] is what the SimNIBS simulations write: the head mesh (tetrahedra plus surface
//! triangles) or the derived central cortical surface (triangles only), carrying fields like `TI_max`.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use std::fmt;

use crate::error::{AnalysisError, Result};

/// Where the values of a field live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldLocation {
    Node,
    Element,
}

/// A named field with one row per node or element and one column per component.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub location: FieldLocation,
    pub data: Array2<f64>,
}

impl Field {
    pub fn scalar<S: Into<String>>(name: S, location: FieldLocation, values: Array1<f64>) -> Field {
        Field {
            name: name.into(),
            location,
            data: values.insert_axis(Axis(1)),
        }
    }

    pub fn vector<S: Into<String>>(name: S, location: FieldLocation, vectors: Array2<f64>) -> Field {
        Field {
            name: name.into(),
            location,
            data: vectors,
        }
    }

    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    pub fn components(&self) -> usize {
        self.data.ncols()
    }

    /// The values of a single-component field.
    pub fn scalar_values(&self) -> Result<ArrayView1<f64>> {
        if self.components() != 1 {
            return Err(AnalysisError::FieldNotScalar {
                name: self.name.clone(),
                components: self.components(),
            });
        }
        Ok(self.data.column(0))
    }

    /// The `[N, 3]` vectors of a three-component field.
    pub fn vectors(&self) -> Result<ArrayView2<f64>> {
        if self.components() != 3 {
            return Err(AnalysisError::InvalidShape(format!(
                "field '{}' has {} components, expected 3",
                self.name,
                self.components()
            )));
        }
        Ok(self.data.view())
    }
}

/// Mesh element with 0-based node indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    Triangle([usize; 3]),
    Tetrahedron([usize; 4]),
}

impl Element {
    pub fn nodes(&self) -> &[usize] {
        match self {
            Element::Triangle(n) => &n[..],
            Element::Tetrahedron(n) => &n[..],
        }
    }

    pub fn is_tetrahedron(&self) -> bool {
        matches!(self, Element::Tetrahedron(_))
    }
}

/// Physical unit of a weight array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightUnit {
    AreaMm2,
    VolumeMm3,
}

/// Per-node or per-element weights with their unit attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Weights {
    pub values: Array1<f64>,
    pub unit: WeightUnit,
}

impl Weights {
    pub fn area_mm2(values: Array1<f64>) -> Weights {
        Weights { values, unit: WeightUnit::AreaMm2 }
    }

    pub fn volume_mm3(values: Array1<f64>) -> Weights {
        Weights { values, unit: WeightUnit::VolumeMm3 }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldMesh {
    /// Node coordinates in mm, shape `[N, 3]`.
    pub nodes: Array2<f64>,
    pub elements: Vec<Element>,
    /// Physical (tissue) tag per element.
    pub element_tags: Vec<i32>,
    fields: Vec<Field>,
}

impl FieldMesh {
    /// Build a mesh, checking that all element node indices are valid.
    pub fn new(nodes: Array2<f64>, elements: Vec<Element>, element_tags: Vec<i32>) -> Result<FieldMesh> {
        if nodes.ncols() != 3 {
            return Err(AnalysisError::InvalidShape(format!(
                "node array must have 3 columns, got {}",
                nodes.ncols()
            )));
        }
        if element_tags.len() != elements.len() {
            return Err(AnalysisError::LengthMismatch {
                what: String::from("element tags"),
                expected: elements.len(),
                actual: element_tags.len(),
            });
        }
        let num_nodes = nodes.nrows();
        if let Some(bad) = elements.iter().flat_map(|e| e.nodes().iter()).find(|n| **n >= num_nodes) {
            return Err(AnalysisError::InvalidMshFormat(format!(
                "element references node {} but mesh has {} nodes",
                bad, num_nodes
            )));
        }
        Ok(FieldMesh {
            nodes,
            elements,
            element_tags,
            fields: Vec::new(),
        })
    }

    /// Build a triangle surface from point and face lists.
    pub fn surface(points: &[[f64; 3]], triangles: &[[usize; 3]]) -> Result<FieldMesh> {
        let flat: Vec<f64> = points.iter().flat_map(|p| p.iter().copied()).collect();
        let nodes = Array2::from_shape_vec((points.len(), 3), flat)?;
        let elements = triangles.iter().map(|t| Element::Triangle(*t)).collect();
        FieldMesh::new(nodes, elements, vec![0; triangles.len()])
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.nrows()
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    pub fn num_tetrahedra(&self) -> usize {
        self.elements.iter().filter(|e| e.is_tetrahedron()).count()
    }

    /// A mesh made of triangles only.
    pub fn is_surface(&self) -> bool {
        !self.elements.is_empty() && self.num_tetrahedra() == 0
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Look up a field by name. The error lists all fields the mesh does have.
    pub fn field(&self, name: &str) -> Result<&Field> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| AnalysisError::FieldNotFound {
                name: name.to_string(),
                available: self.field_names(),
            })
    }

    /// Add a field, replacing any field of the same name.
    pub fn insert_field(&mut self, field: Field) -> Result<()> {
        let expected = match field.location {
            FieldLocation::Node => self.num_nodes(),
            FieldLocation::Element => self.num_elements(),
        };
        if field.len() != expected {
            return Err(AnalysisError::LengthMismatch {
                what: format!("field '{}'", field.name),
                expected,
                actual: field.len(),
            });
        }
        self.fields.retain(|f| f.name != field.name);
        self.fields.push(field);
        Ok(())
    }

    fn node(&self, idx: usize) -> [f64; 3] {
        let row = self.nodes.row(idx);
        [row[0], row[1], row[2]]
    }

    /// Per-node area in mm²: one third of the area of every adjacent triangle.
    pub fn node_areas(&self) -> Array1<f64> {
        let mut areas = Array1::<f64>::zeros(self.num_nodes());
        for element in &self.elements {
            if let Element::Triangle(t) = element {
                let third = triangle_area(self.node(t[0]), self.node(t[1]), self.node(t[2])) / 3.0;
                for n in t {
                    areas[*n] += third;
                }
            }
        }
        areas
    }

    /// Triangle area (mm²) or tetrahedron volume (mm³) per element.
    pub fn element_sizes(&self) -> Array1<f64> {
        self.elements
            .iter()
            .map(|e| match e {
                Element::Triangle(t) => triangle_area(self.node(t[0]), self.node(t[1]), self.node(t[2])),
                Element::Tetrahedron(t) => {
                    tetrahedron_volume(self.node(t[0]), self.node(t[1]), self.node(t[2]), self.node(t[3]))
                }
            })
            .collect()
    }

    /// Element centers, shape `[M, 3]`.
    pub fn element_barycenters(&self) -> Array2<f64> {
        let mut centers = Array2::<f64>::zeros((self.num_elements(), 3));
        for (mut row, element) in centers.outer_iter_mut().zip(self.elements.iter()) {
            let nodes = element.nodes();
            for n in nodes {
                row += &self.nodes.row(*n);
            }
            row /= nodes.len() as f64;
        }
        centers
    }

    /// Unit normals per node, from the area-weighted normals of adjacent triangles.
    /// Nodes without adjacent triangles get the zero vector.
    pub fn node_normals(&self) -> Array2<f64> {
        let mut normals = Array2::<f64>::zeros((self.num_nodes(), 3));
        for element in &self.elements {
            if let Element::Triangle(t) = element {
                // The cross product length is twice the area, which gives the area weighting.
                let n = cross(sub(self.node(t[1]), self.node(t[0])), sub(self.node(t[2]), self.node(t[0])));
                for idx in t {
                    let mut row = normals.row_mut(*idx);
                    row[0] += n[0];
                    row[1] += n[1];
                    row[2] += n[2];
                }
            }
        }
        for mut row in normals.outer_iter_mut() {
            let len = row.dot(&row).sqrt();
            if len > 0.0 {
                row /= len;
            }
        }
        normals
    }

    /// Weights for a field location: node areas, or element sizes.
    ///
    /// On meshes with tetrahedra the element weights are volumes and surface triangles get zero weight.
    pub fn weights(&self, location: FieldLocation) -> Weights {
        match location {
            FieldLocation::Node => Weights::area_mm2(self.node_areas()),
            FieldLocation::Element => {
                let sizes = self.element_sizes();
                if self.num_tetrahedra() > 0 {
                    let volumes = sizes
                        .iter()
                        .zip(self.elements.iter())
                        .map(|(s, e)| if e.is_tetrahedron() { *s } else { 0.0 })
                        .collect();
                    Weights::volume_mm3(volumes)
                } else {
                    Weights::area_mm2(sizes)
                }
            }
        }
    }

    /// Positions the values of a field location refer to: node coordinates or element barycenters.
    pub fn positions(&self, location: FieldLocation) -> Array2<f64> {
        match location {
            FieldLocation::Node => self.nodes.clone(),
            FieldLocation::Element => self.element_barycenters(),
        }
    }

    /// Axis-aligned bounding box as `(min, max)`, or `None` for a mesh without nodes.
    pub fn bounds(&self) -> Option<([f64; 3], [f64; 3])> {
        if self.num_nodes() == 0 {
            return None;
        }
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for row in self.nodes.axis_iter(Axis(0)) {
            for d in 0..3 {
                min[d] = min[d].min(row[d]);
                max[d] = max[d].max(row[d]);
            }
        }
        Some((min, max))
    }
}

impl fmt::Display for FieldMesh {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Mesh with {} nodes, {} elements ({} tetrahedra) and fields {:?}.",
            self.num_nodes(),
            self.num_elements(),
            self.num_tetrahedra(),
            self.field_names()
        )
    }
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn triangle_area(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> f64 {
    let n = cross(sub(b, a), sub(c, a));
    0.5 * dot(n, n).sqrt()
}

pub fn tetrahedron_volume(a: [f64; 3], b: [f64; 3], c: [f64; 3], d: [f64; 3]) -> f64 {
    dot(sub(b, a), cross(sub(c, a), sub(d, a))).abs() / 6.0
}
