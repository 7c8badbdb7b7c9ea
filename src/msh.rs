//! Reading and writing Gmsh MSH 2.2 files, the mesh format of SimNIBS.
//!
//! Both the ASCII and the binary (little endian) flavor are read. Only triangles and tetrahedra are
//! kept; points, lines and the other first and higher order Gmsh element types are skipped together
//! with their element data. Binary element blocks of a type outside the Gmsh 2.2 type list cannot be
//! skipped since their record length is unknown, and are rejected.
//! Node and element data sections become [`Field`]s of the mesh.
//!
//! Malformed counts (negative, overflowing or larger than the file) are reported as
//! [`AnalysisError::InvalidMshFormat`].

use byteordered::ByteOrdered;
use log::debug;
use ndarray::Array2;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use crate::error::{AnalysisError, Result};
use crate::mesh::{Element, Field, FieldLocation, FieldMesh};
use crate::util::open_maybe_gz;

pub const MSH_TRIANGLE: i32 = 2;
pub const MSH_TETRAHEDRON: i32 = 4;

/// Upper bound for preallocations driven by counts read from the file.
const MAX_PREALLOC: usize = 1 << 20;

/// Gmsh allows scalar, vector and tensor data.
const MAX_DATA_COMPONENTS: usize = 9;

/// Number of nodes per Gmsh 2.2 element type.
fn nodes_per_element_type(elm_type: i32) -> Option<usize> {
    let n = match elm_type {
        1 => 2,   // line
        2 => 3,   // triangle
        3 => 4,   // quadrangle
        4 => 4,   // tetrahedron
        5 => 8,   // hexahedron
        6 => 6,   // prism
        7 => 5,   // pyramid
        8 => 3,   // second order line
        9 => 6,   // second order triangle
        10 => 9,  // second order quadrangle
        11 => 10, // second order tetrahedron
        12 => 27, // second order hexahedron
        13 => 18, // second order prism
        14 => 14, // second order pyramid
        15 => 1,  // point
        16 => 8,
        17 => 20,
        18 => 15,
        19 => 13,
        20 => 9,
        21 => 10,
        22 => 12,
        23 => 15,
        24 => 15,
        25 => 21,
        26 => 4,
        27 => 5,
        28 => 6,
        29 => 20,
        30 => 35,
        31 => 56,
        92 => 64,
        93 => 125,
        _ => return None,
    };
    Some(n)
}

fn invalid<S: Into<String>>(reason: S) -> AnalysisError {
    AnalysisError::InvalidMshFormat(reason.into())
}

fn parse_num<T: std::str::FromStr>(token: Option<&str>, what: &str) -> Result<T> {
    token
        .and_then(|t| t.parse::<T>().ok())
        .ok_or_else(|| invalid(format!("cannot parse {} from '{}'", what, token.unwrap_or(""))))
}

/// A count stored as a signed integer, rejected if negative.
fn to_count<T>(value: T, what: &str) -> Result<usize>
where
    T: Copy + std::fmt::Display + std::convert::TryInto<usize>,
{
    value
        .try_into()
        .map_err(|_| invalid(format!("invalid {} {}", what, value)))
}

/// Sum of record lengths, failing instead of overflowing.
fn record_len(parts: &[usize]) -> Result<usize> {
    parts
        .iter()
        .try_fold(0usize, |acc, n| acc.checked_add(*n))
        .ok_or_else(|| invalid("element record length overflows"))
}

struct MshParser<R: BufRead> {
    input: R,
    binary: bool,
    node_coords: Vec<f64>,
    node_map: HashMap<i64, usize>,
    elements: Vec<Element>,
    element_tags: Vec<i32>,
    element_map: HashMap<i64, usize>,
    fields: Vec<Field>,
}

impl<R: BufRead> MshParser<R> {
    fn new(input: R) -> Self {
        MshParser {
            input,
            binary: false,
            node_coords: Vec::new(),
            node_map: HashMap::new(),
            elements: Vec::new(),
            element_tags: Vec::new(),
            element_map: HashMap::new(),
            fields: Vec::new(),
        }
    }

    /// Next non-empty line, trimmed. `None` at the end of the input.
    fn next_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_string()));
            }
        }
    }

    fn require_line(&mut self, context: &str) -> Result<String> {
        self.next_line()?
            .ok_or_else(|| invalid(format!("unexpected end of file in {}", context)))
    }

    fn expect_end(&mut self, section: &str) -> Result<()> {
        let end = format!("$End{}", section);
        let line = self.require_line(section)?;
        if line != end {
            return Err(invalid(format!("expected '{}', found '{}'", end, line)));
        }
        Ok(())
    }

    fn skip_section(&mut self, section: &str) -> Result<()> {
        let end = format!("$End{}", section);
        debug!("Skipping mesh section '{}'.", section);
        while let Some(line) = self.next_line()? {
            if line == end {
                return Ok(());
            }
        }
        Err(invalid(format!("section '{}' is not terminated", section)))
    }

    fn parse(mut self) -> Result<FieldMesh> {
        while let Some(line) = self.next_line()? {
            match line.as_str() {
                "$MeshFormat" => self.parse_format()?,
                "$Nodes" => self.parse_nodes()?,
                "$Elements" => self.parse_elements()?,
                "$NodeData" => self.parse_data(FieldLocation::Node)?,
                "$ElementData" => self.parse_data(FieldLocation::Element)?,
                other if other.starts_with('$') => self.skip_section(&other[1..])?,
                other => return Err(invalid(format!("unexpected content '{}'", other))),
            }
        }

        let num_nodes = self.node_map.len();
        let nodes = Array2::from_shape_vec((num_nodes, 3), self.node_coords)?;
        let mut mesh = FieldMesh::new(nodes, self.elements, self.element_tags)?;
        for field in self.fields {
            mesh.insert_field(field)?;
        }
        Ok(mesh)
    }

    fn parse_format(&mut self) -> Result<()> {
        let line = self.require_line("MeshFormat")?;
        let mut tokens = line.split_whitespace();
        let version: String = parse_num(tokens.next(), "format version")?;
        if !version.starts_with("2.") {
            return Err(invalid(format!("unsupported MSH version {}, expected 2.x", version)));
        }
        let file_type: i32 = parse_num(tokens.next(), "file type")?;
        let data_size: usize = parse_num(tokens.next(), "data size")?;
        if data_size != 8 {
            return Err(invalid(format!("unsupported data size {}", data_size)));
        }
        self.binary = file_type == 1;
        if self.binary {
            let one = ByteOrdered::le(&mut self.input).read_i32()?;
            if one != 1 {
                return Err(invalid("only little endian binary meshes are supported"));
            }
        }
        self.expect_end("MeshFormat")
    }

    fn parse_nodes(&mut self) -> Result<()> {
        let count: usize = parse_num(Some(self.require_line("Nodes")?.as_str()), "node count")?;
        self.node_coords = Vec::with_capacity(count.min(MAX_PREALLOC) * 3);
        self.node_map = HashMap::with_capacity(count.min(MAX_PREALLOC));
        for idx in 0..count {
            let tag = if self.binary {
                let mut input = ByteOrdered::le(&mut self.input);
                let tag = input.read_i32()? as i64;
                for _ in 0..3 {
                    self.node_coords.push(input.read_f64()?);
                }
                tag
            } else {
                let line = self.require_line("Nodes")?;
                let mut tokens = line.split_whitespace();
                let tag: i64 = parse_num(tokens.next(), "node tag")?;
                for _ in 0..3 {
                    self.node_coords.push(parse_num(tokens.next(), "node coordinate")?);
                }
                tag
            };
            self.node_map.insert(tag, idx);
        }
        self.expect_end("Nodes")
    }

    fn node_index(&self, tag: i64) -> Result<usize> {
        self.node_map
            .get(&tag)
            .copied()
            .ok_or_else(|| invalid(format!("element references unknown node {}", tag)))
    }

    fn push_element(&mut self, elm_tag: i64, elm_type: i32, tags: &[i64], node_tags: &[i64]) -> Result<()> {
        let element = match elm_type {
            MSH_TRIANGLE => Element::Triangle([
                self.node_index(node_tags[0])?,
                self.node_index(node_tags[1])?,
                self.node_index(node_tags[2])?,
            ]),
            MSH_TETRAHEDRON => Element::Tetrahedron([
                self.node_index(node_tags[0])?,
                self.node_index(node_tags[1])?,
                self.node_index(node_tags[2])?,
                self.node_index(node_tags[3])?,
            ]),
            _ => return Ok(()),
        };
        self.element_map.insert(elm_tag, self.elements.len());
        self.elements.push(element);
        self.element_tags.push(tags.first().copied().unwrap_or(0) as i32);
        Ok(())
    }

    fn parse_elements(&mut self) -> Result<()> {
        let count: usize = parse_num(Some(self.require_line("Elements")?.as_str()), "element count")?;
        if self.binary {
            let mut read = 0;
            while read < count {
                let (elm_type, in_block, num_tags) = {
                    let mut input = ByteOrdered::le(&mut self.input);
                    (input.read_i32()?, input.read_i32()?, input.read_i32()?)
                };
                let in_block = to_count(in_block, "element block size")?;
                let num_tags = to_count(num_tags, "element tag count")?;
                let num_nodes = nodes_per_element_type(elm_type).ok_or_else(|| {
                    invalid(format!("element type {} has no known record length", elm_type))
                })?;
                if in_block > count - read {
                    return Err(invalid(format!(
                        "element block of {} exceeds the {} remaining elements",
                        in_block,
                        count - read
                    )));
                }
                let len = record_len(&[1, num_tags, num_nodes])?;
                for _ in 0..in_block {
                    let mut values = Vec::with_capacity(len.min(MAX_PREALLOC));
                    {
                        let mut input = ByteOrdered::le(&mut self.input);
                        for _ in 0..len {
                            values.push(input.read_i32()? as i64);
                        }
                    }
                    self.push_element(values[0], elm_type, &values[1..1 + num_tags], &values[1 + num_tags..])?;
                }
                read += in_block;
            }
        } else {
            for _ in 0..count {
                let line = self.require_line("Elements")?;
                let values = line
                    .split_whitespace()
                    .map(|t| parse_num::<i64>(Some(t), "element entry"))
                    .collect::<Result<Vec<i64>>>()?;
                if values.len() < 3 {
                    return Err(invalid(format!("truncated element line '{}'", line)));
                }
                let elm_type = values[1] as i32;
                let num_tags = to_count(values[2], "element tag count")?;
                let expected = nodes_per_element_type(elm_type).unwrap_or(0);
                if values.len() < record_len(&[3, num_tags, expected])? {
                    return Err(invalid(format!("truncated element line '{}'", line)));
                }
                self.push_element(values[0], elm_type, &values[3..3 + num_tags], &values[3 + num_tags..])?;
            }
        }
        self.expect_end("Elements")
    }

    fn parse_data(&mut self, location: FieldLocation) -> Result<()> {
        let section = match location {
            FieldLocation::Node => "NodeData",
            FieldLocation::Element => "ElementData",
        };

        let num_string_tags: usize = parse_num(Some(self.require_line(section)?.as_str()), "string tag count")?;
        let mut name = String::new();
        for i in 0..num_string_tags {
            let tag = self.require_line(section)?;
            if i == 0 {
                name = tag.trim_matches('"').to_string();
            }
        }
        let num_real_tags: usize = parse_num(Some(self.require_line(section)?.as_str()), "real tag count")?;
        for _ in 0..num_real_tags {
            self.require_line(section)?;
        }
        let num_int_tags: usize = parse_num(Some(self.require_line(section)?.as_str()), "integer tag count")?;
        let mut int_tags: Vec<usize> = Vec::with_capacity(num_int_tags.min(MAX_PREALLOC));
        for _ in 0..num_int_tags {
            int_tags.push(parse_num(Some(self.require_line(section)?.as_str()), "integer tag")?);
        }
        if int_tags.len() < 3 {
            return Err(invalid(format!("{} '{}' needs at least 3 integer tags", section, name)));
        }
        let components = int_tags[1];
        let count = int_tags[2];
        if components == 0 || components > MAX_DATA_COMPONENTS {
            return Err(invalid(format!("{} '{}' has {} components", section, name, components)));
        }

        let rows = match location {
            FieldLocation::Node => self.node_map.len(),
            FieldLocation::Element => self.elements.len(),
        };
        // Entries for skipped elements are dropped; rows without an entry stay NaN.
        let mut data = Array2::<f64>::from_elem((rows, components), f64::NAN);
        for _ in 0..count {
            let (tag, values) = if self.binary {
                let mut input = ByteOrdered::le(&mut self.input);
                let tag = input.read_i32()? as i64;
                let mut values = Vec::with_capacity(components);
                for _ in 0..components {
                    values.push(input.read_f64()?);
                }
                (tag, values)
            } else {
                let line = self.require_line(section)?;
                let mut tokens = line.split_whitespace();
                let tag: i64 = parse_num(tokens.next(), "data tag")?;
                let values = (0..components)
                    .map(|_| parse_num::<f64>(tokens.next(), "data value"))
                    .collect::<Result<Vec<f64>>>()?;
                (tag, values)
            };
            let row = match location {
                FieldLocation::Node => self.node_map.get(&tag),
                FieldLocation::Element => self.element_map.get(&tag),
            };
            if let Some(row) = row {
                for (c, v) in values.into_iter().enumerate() {
                    data[[*row, c]] = v;
                }
            }
        }
        self.expect_end(section)?;

        debug!("Read {} '{}' with {} components.", section, name, components);
        self.fields.push(Field::vector(name, location, data));
        Ok(())
    }
}

/// Read a mesh from a Gmsh MSH 2.2 stream.
pub fn read_msh_from<R: BufRead>(input: R) -> Result<FieldMesh> {
    MshParser::new(input).parse()
}

/// Read a mesh from a Gmsh MSH 2.2 file. Files ending in ".gz" are decompressed on the fly.
pub fn read_msh<P: AsRef<Path>>(path: P) -> Result<FieldMesh> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(AnalysisError::MeshNotFound(path.to_path_buf()));
    }
    read_msh_from(open_maybe_gz(path)?)
}

/// Write a mesh with all its fields as ASCII Gmsh MSH 2.2.
pub fn write_msh_to<W: Write>(output: W, mesh: &FieldMesh) -> Result<()> {
    let mut out = output;
    writeln!(out, "$MeshFormat\n2.2 0 8\n$EndMeshFormat")?;

    writeln!(out, "$Nodes\n{}", mesh.num_nodes())?;
    for (idx, row) in mesh.nodes.outer_iter().enumerate() {
        writeln!(out, "{} {} {} {}", idx + 1, row[0], row[1], row[2])?;
    }
    writeln!(out, "$EndNodes")?;

    writeln!(out, "$Elements\n{}", mesh.num_elements())?;
    for (idx, (element, tag)) in mesh.elements.iter().zip(mesh.element_tags.iter()).enumerate() {
        let elm_type = if element.is_tetrahedron() { MSH_TETRAHEDRON } else { MSH_TRIANGLE };
        let nodes: Vec<String> = element.nodes().iter().map(|n| (n + 1).to_string()).collect();
        writeln!(out, "{} {} 2 {} {} {}", idx + 1, elm_type, tag, tag, nodes.join(" "))?;
    }
    writeln!(out, "$EndElements")?;

    for field in mesh.fields() {
        let section = match field.location {
            FieldLocation::Node => "NodeData",
            FieldLocation::Element => "ElementData",
        };
        writeln!(out, "${}\n1\n\"{}\"\n1\n0.0\n3\n0\n{}\n{}", section, field.name, field.components(), field.len())?;
        for (idx, row) in field.data.outer_iter().enumerate() {
            let values: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            writeln!(out, "{} {}", idx + 1, values.join(" "))?;
        }
        writeln!(out, "$End{}", section)?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_msh<P: AsRef<Path>>(path: P, mesh: &FieldMesh) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    write_msh_to(file, mesh)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;
    use std::io::Cursor;

    const ASCII_MESH: &str = "$MeshFormat
2.2 0 8
$EndMeshFormat
$PhysicalNames
1
2 1002 \"gm\"
$EndPhysicalNames
$Nodes
4
1 0 0 0
2 1 0 0
3 0 1 0
4 1 1 0
$EndNodes
$Elements
3
1 15 2 0 1 1
2 2 2 1002 1002 1 2 3
3 2 2 1002 1002 2 4 3
$EndElements
$NodeData
1
\"TI_max\"
1
0.0
3
0
1
4
1 1.0
2 2.0
3 3.0
4 4.0
$EndNodeData
$ElementData
1
\"E\"
1
0.0
3
0
3
3
1 9 9 9
2 1 0 0
3 0 1 0
$EndElementData
";

    #[test]
    fn an_ascii_mesh_can_be_read() {
        let mesh = read_msh_from(Cursor::new(ASCII_MESH)).unwrap();
        assert_eq!(4, mesh.num_nodes());
        assert_eq!(2, mesh.num_elements()); // The point element is skipped.
        assert_eq!(vec![1002, 1002], mesh.element_tags);
        assert_eq!(Element::Triangle([1, 3, 2]), mesh.elements[1]);
        assert!(mesh.is_surface());

        let ti = mesh.field("TI_max").unwrap();
        assert_eq!(FieldLocation::Node, ti.location);
        assert_abs_diff_eq!(ti.scalar_values().unwrap(), arr1(&[1.0, 2.0, 3.0, 4.0]));

        let e = mesh.field("E").unwrap();
        assert_eq!(3, e.components());
        assert_eq!(2, e.len());
        assert_abs_diff_eq!(e.data.row(0), arr1(&[1.0, 0.0, 0.0]));
    }

    #[test]
    fn written_meshes_can_be_read_back() {
        let original = read_msh_from(Cursor::new(ASCII_MESH)).unwrap();
        let mut buffer: Vec<u8> = Vec::new();
        write_msh_to(&mut buffer, &original).unwrap();
        let reread = read_msh_from(Cursor::new(buffer)).unwrap();
        assert_eq!(original, reread);
    }

    #[test]
    fn a_binary_mesh_can_be_read() {
        let mut buffer: Vec<u8> = Vec::new();
        buffer.extend_from_slice(b"$MeshFormat\n2.2 1 8\n");
        {
            let mut out = ByteOrdered::le(&mut buffer);
            out.write_i32(1).unwrap();
        }
        buffer.extend_from_slice(b"\n$EndMeshFormat\n$Nodes\n4\n");
        {
            let mut out = ByteOrdered::le(&mut buffer);
            let coords = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
            for (i, c) in coords.iter().enumerate() {
                out.write_i32(i as i32 + 1).unwrap();
                for v in c {
                    out.write_f64(*v).unwrap();
                }
            }
        }
        buffer.extend_from_slice(b"\n$EndNodes\n$Elements\n2\n");
        {
            let mut out = ByteOrdered::le(&mut buffer);
            for header in &[MSH_TRIANGLE, 1, 2] {
                out.write_i32(*header).unwrap();
            }
            for v in &[1, 5, 5, 1, 2, 3] {
                out.write_i32(*v).unwrap();
            }
            for header in &[MSH_TETRAHEDRON, 1, 2] {
                out.write_i32(*header).unwrap();
            }
            for v in &[2, 2, 2, 1, 2, 3, 4] {
                out.write_i32(*v).unwrap();
            }
        }
        buffer.extend_from_slice(b"\n$EndElements\n$ElementData\n1\n\"magnE\"\n1\n0.0\n3\n0\n1\n2\n");
        {
            let mut out = ByteOrdered::le(&mut buffer);
            out.write_i32(1).unwrap();
            out.write_f64(0.25).unwrap();
            out.write_i32(2).unwrap();
            out.write_f64(0.5).unwrap();
        }
        buffer.extend_from_slice(b"\n$EndElementData\n");

        let mesh = read_msh_from(Cursor::new(buffer)).unwrap();
        assert_eq!(4, mesh.num_nodes());
        assert_eq!(1, mesh.num_tetrahedra());
        assert_eq!(vec![5, 2], mesh.element_tags);
        assert_abs_diff_eq!(
            mesh.field("magnE").unwrap().scalar_values().unwrap(),
            arr1(&[0.25, 0.5])
        );
    }

    #[test]
    fn missing_mesh_files_are_reported() {
        let res = read_msh("/no/such/dir/ernie_TI.msh");
        assert!(matches!(res, Err(AnalysisError::MeshNotFound(_))));
    }

    fn binary_header() -> Vec<u8> {
        let mut buffer: Vec<u8> = Vec::new();
        buffer.extend_from_slice(b"$MeshFormat\n2.2 1 8\n");
        ByteOrdered::le(&mut buffer).write_i32(1).unwrap();
        buffer.extend_from_slice(b"\n$EndMeshFormat\n$Nodes\n3\n");
        {
            let mut out = ByteOrdered::le(&mut buffer);
            let coords = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
            for (i, c) in coords.iter().enumerate() {
                out.write_i32(i as i32 + 1).unwrap();
                for v in c {
                    out.write_f64(*v).unwrap();
                }
            }
        }
        buffer.extend_from_slice(b"\n$EndNodes\n");
        buffer
    }

    #[test]
    fn binary_blocks_of_higher_order_elements_are_skipped() {
        let mut buffer = binary_header();
        buffer.extend_from_slice(b"$Elements\n2\n");
        {
            let mut out = ByteOrdered::le(&mut buffer);
            // A second order triangle has 6 nodes.
            for v in &[9, 1, 2, 1, 7, 7, 1, 2, 3, 1, 2, 3] {
                out.write_i32(*v).unwrap();
            }
            for v in &[MSH_TRIANGLE, 1, 2, 2, 1002, 1002, 1, 2, 3] {
                out.write_i32(*v).unwrap();
            }
        }
        buffer.extend_from_slice(b"\n$EndElements\n");

        let mesh = read_msh_from(Cursor::new(buffer)).unwrap();
        assert_eq!(1, mesh.num_elements());
        assert_eq!(vec![1002], mesh.element_tags);
    }

    #[test]
    fn binary_blocks_of_unknown_element_types_are_rejected() {
        let mut buffer = binary_header();
        buffer.extend_from_slice(b"$Elements\n1\n");
        {
            let mut out = ByteOrdered::le(&mut buffer);
            for v in &[77, 1, 0, 1, 1, 2, 3] {
                out.write_i32(*v).unwrap();
            }
        }
        buffer.extend_from_slice(b"\n$EndElements\n");
        let res = read_msh_from(Cursor::new(buffer));
        assert!(matches!(res, Err(AnalysisError::InvalidMshFormat(_))));
    }

    #[test]
    fn negative_binary_counts_are_rejected() {
        let mut buffer = binary_header();
        buffer.extend_from_slice(b"$Elements\n1\n");
        {
            let mut out = ByteOrdered::le(&mut buffer);
            for v in &[MSH_TRIANGLE, 1, -1, 1, 1, 2, 3] {
                out.write_i32(*v).unwrap();
            }
        }
        buffer.extend_from_slice(b"\n$EndElements\n");
        let res = read_msh_from(Cursor::new(buffer));
        assert!(matches!(res, Err(AnalysisError::InvalidMshFormat(_))));
    }

    #[test]
    fn binary_blocks_larger_than_the_element_count_are_rejected() {
        let mut buffer = binary_header();
        buffer.extend_from_slice(b"$Elements\n1\n");
        {
            let mut out = ByteOrdered::le(&mut buffer);
            for v in &[MSH_TRIANGLE, i32::MAX, 0, 1, 1, 2, 3] {
                out.write_i32(*v).unwrap();
            }
        }
        buffer.extend_from_slice(b"\n$EndElements\n");
        let res = read_msh_from(Cursor::new(buffer));
        assert!(matches!(res, Err(AnalysisError::InvalidMshFormat(_))));
    }

    #[test]
    fn huge_node_counts_fail_without_allocating() {
        let res = read_msh_from(Cursor::new("$MeshFormat\n2.2 0 8\n$EndMeshFormat\n$Nodes\n9223372036854775807\n1 0 0 0\n"));
        assert!(matches!(res, Err(AnalysisError::InvalidMshFormat(_))));
    }

    #[test]
    fn negative_ascii_tag_counts_are_rejected() {
        let res = read_msh_from(Cursor::new(
            "$MeshFormat\n2.2 0 8\n$EndMeshFormat\n$Nodes\n3\n1 0 0 0\n2 1 0 0\n3 0 1 0\n$EndNodes\n\
             $Elements\n1\n1 2 -1 1 2 3\n$EndElements\n",
        ));
        assert!(matches!(res, Err(AnalysisError::InvalidMshFormat(_))));

        let res = read_msh_from(Cursor::new(
            "$MeshFormat\n2.2 0 8\n$EndMeshFormat\n$Nodes\n3\n1 0 0 0\n2 1 0 0\n3 0 1 0\n$EndNodes\n\
             $Elements\n1\n1 2 9223372036854775807 1 2 3\n$EndElements\n",
        ));
        assert!(matches!(res, Err(AnalysisError::InvalidMshFormat(_))));
    }

    #[test]
    fn data_sections_with_absurd_component_counts_are_rejected() {
        let text = format!(
            "{}$NodeData\n1\n\"TI_max\"\n1\n0.0\n3\n0\n{}\n4\n$EndNodeData\n",
            ASCII_MESH,
            usize::MAX
        );
        let res = read_msh_from(Cursor::new(text));
        assert!(matches!(res, Err(AnalysisError::InvalidMshFormat(_))));
    }

    #[test]
    fn unsupported_versions_are_rejected() {
        let res = read_msh_from(Cursor::new("$MeshFormat\n4.1 0 8\n$EndMeshFormat\n"));
        assert!(matches!(res, Err(AnalysisError::InvalidMshFormat(_))));
    }
}
