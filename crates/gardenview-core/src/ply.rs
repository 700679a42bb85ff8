//! PLY (Polygon File Format) decoding
//!
//! Supports the `ascii`, `binary_little_endian` and `binary_big_endian`
//! encodings. Vertex positions are required; normals (`nx ny nz`) and colors
//! (`red green blue [alpha]`) are picked up when present. Faces are read from
//! a `vertex_indices` (or `vertex_index`) list and fan-triangulated. Files
//! without faces decode as point clouds. Any other element is parsed and
//! skipped.

use thiserror::Error;

use crate::geometry::MeshData;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlyError {
    #[error("Not a PLY file (missing 'ply' magic)")]
    MissingMagic,
    #[error("PLY header has no end_header line")]
    MissingEndHeader,
    #[error("Invalid PLY header: {0}")]
    InvalidHeader(String),
    #[error("Unsupported PLY format: {0}")]
    UnsupportedFormat(String),
    #[error("Unexpected end of PLY data while reading element '{0}'")]
    UnexpectedEof(String),
    #[error("Invalid value '{value}' in element '{element}'")]
    InvalidValue { element: String, value: String },
    #[error("Face references vertex {index} but only {count} vertices exist")]
    IndexOutOfRange { index: u64, count: usize },
    #[error("PLY vertex element lacks '{0}' property")]
    MissingProperty(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl ScalarType {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "char" | "int8" => Self::I8,
            "uchar" | "uint8" => Self::U8,
            "short" | "int16" => Self::I16,
            "ushort" | "uint16" => Self::U16,
            "int" | "int32" => Self::I32,
            "uint" | "uint32" => Self::U32,
            "float" | "float32" => Self::F32,
            "double" | "float64" => Self::F64,
            _ => return None,
        })
    }

    /// Divisor mapping integer color channels into 0.0-1.0
    fn color_scale(self) -> f64 {
        match self {
            Self::U8 => 255.0,
            Self::U16 => 65535.0,
            _ => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PropertyKind {
    Scalar(ScalarType),
    List { count: ScalarType, item: ScalarType },
}

#[derive(Debug, Clone, PartialEq)]
struct Property {
    name: String,
    kind: PropertyKind,
}

#[derive(Debug, Clone, PartialEq)]
struct Element {
    name: String,
    count: usize,
    properties: Vec<Property>,
}

impl Element {
    fn scalar_index(&self, name: &str) -> Option<usize> {
        self.properties
            .iter()
            .position(|p| p.name == name && matches!(p.kind, PropertyKind::Scalar(_)))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Header {
    encoding: Encoding,
    elements: Vec<Element>,
}

/// Split raw bytes into the header text and the body that follows it
fn split_header(bytes: &[u8]) -> Result<(&str, &[u8]), PlyError> {
    let mut offset = 0;
    while offset < bytes.len() {
        let line_end = bytes[offset..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(bytes.len(), |p| offset + p);
        let line = &bytes[offset..line_end];
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line == b"end_header" {
            let header = std::str::from_utf8(&bytes[..offset])
                .map_err(|_| PlyError::InvalidHeader("header is not valid UTF-8".to_string()))?;
            let body_start = (line_end + 1).min(bytes.len());
            return Ok((header, &bytes[body_start..]));
        }
        offset = line_end + 1;
    }
    Err(PlyError::MissingEndHeader)
}

fn parse_header(text: &str) -> Result<Header, PlyError> {
    let mut lines = text.lines().map(str::trim);
    if lines.next() != Some("ply") {
        return Err(PlyError::MissingMagic);
    }

    let mut encoding = None;
    let mut elements: Vec<Element> = Vec::new();

    for line in lines {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            None | Some("comment") | Some("obj_info") => {}
            Some("format") => {
                let name = tokens.next().unwrap_or_default();
                encoding = Some(match name {
                    "ascii" => Encoding::Ascii,
                    "binary_little_endian" => Encoding::BinaryLittleEndian,
                    "binary_big_endian" => Encoding::BinaryBigEndian,
                    other => return Err(PlyError::UnsupportedFormat(other.to_string())),
                });
            }
            Some("element") => {
                let (Some(name), Some(count)) = (tokens.next(), tokens.next()) else {
                    return Err(PlyError::InvalidHeader(format!("malformed line '{}'", line)));
                };
                let count = count.parse().map_err(|_| {
                    PlyError::InvalidHeader(format!("invalid element count '{}'", count))
                })?;
                elements.push(Element {
                    name: name.to_string(),
                    count,
                    properties: Vec::new(),
                });
            }
            Some("property") => {
                let element = elements.last_mut().ok_or_else(|| {
                    PlyError::InvalidHeader("property declared before any element".to_string())
                })?;
                element.properties.push(parse_property(line, tokens)?);
            }
            Some(other) => {
                return Err(PlyError::InvalidHeader(format!("unknown keyword '{}'", other)));
            }
        }
    }

    let encoding =
        encoding.ok_or_else(|| PlyError::InvalidHeader("missing format line".to_string()))?;
    Ok(Header { encoding, elements })
}

fn parse_property<'a>(
    line: &str,
    mut tokens: impl Iterator<Item = &'a str>,
) -> Result<Property, PlyError> {
    let malformed = || PlyError::InvalidHeader(format!("malformed line '{}'", line));
    let scalar = |name: &str| {
        ScalarType::parse(name)
            .ok_or_else(|| PlyError::InvalidHeader(format!("unknown property type '{}'", name)))
    };

    let first = tokens.next().ok_or_else(malformed)?;
    if first == "list" {
        let count = scalar(tokens.next().ok_or_else(malformed)?)?;
        let item = scalar(tokens.next().ok_or_else(malformed)?)?;
        let name = tokens.next().ok_or_else(malformed)?;
        Ok(Property {
            name: name.to_string(),
            kind: PropertyKind::List { count, item },
        })
    } else {
        let ty = scalar(first)?;
        let name = tokens.next().ok_or_else(malformed)?;
        Ok(Property {
            name: name.to_string(),
            kind: PropertyKind::Scalar(ty),
        })
    }
}

/// Sequential reader over the body, one scalar at a time
trait ValueReader {
    fn read(&mut self, ty: ScalarType, element: &str) -> Result<f64, PlyError>;
    /// Upper bound on the bytes left to read
    fn remaining(&self) -> usize;
}

struct AsciiReader<'a> {
    tokens: std::str::SplitAsciiWhitespace<'a>,
    len: usize,
}

impl ValueReader for AsciiReader<'_> {
    fn read(&mut self, _ty: ScalarType, element: &str) -> Result<f64, PlyError> {
        let token = self
            .tokens
            .next()
            .ok_or_else(|| PlyError::UnexpectedEof(element.to_string()))?;
        token.parse::<f64>().map_err(|_| PlyError::InvalidValue {
            element: element.to_string(),
            value: token.to_string(),
        })
    }

    fn remaining(&self) -> usize {
        self.len
    }
}

struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
    big_endian: bool,
}

impl BinaryReader<'_> {
    fn take<const N: usize>(&mut self, element: &str) -> Result<[u8; N], PlyError> {
        let end = self.pos + N;
        let slice = self
            .data
            .get(self.pos..end)
            .ok_or_else(|| PlyError::UnexpectedEof(element.to_string()))?;
        let mut buf = [0u8; N];
        buf.copy_from_slice(slice);
        if self.big_endian {
            buf.reverse();
        }
        self.pos = end;
        Ok(buf)
    }
}

impl ValueReader for BinaryReader<'_> {
    fn read(&mut self, ty: ScalarType, element: &str) -> Result<f64, PlyError> {
        // Bytes are normalized to little-endian by `take`
        Ok(match ty {
            ScalarType::I8 => i8::from_le_bytes(self.take::<1>(element)?) as f64,
            ScalarType::U8 => u8::from_le_bytes(self.take::<1>(element)?) as f64,
            ScalarType::I16 => i16::from_le_bytes(self.take::<2>(element)?) as f64,
            ScalarType::U16 => u16::from_le_bytes(self.take::<2>(element)?) as f64,
            ScalarType::I32 => i32::from_le_bytes(self.take::<4>(element)?) as f64,
            ScalarType::U32 => u32::from_le_bytes(self.take::<4>(element)?) as f64,
            ScalarType::F32 => f32::from_le_bytes(self.take::<4>(element)?) as f64,
            ScalarType::F64 => f64::from_le_bytes(self.take::<8>(element)?),
        })
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }
}

/// Decode a PLY file into mesh geometry
pub fn decode(bytes: &[u8]) -> Result<MeshData, PlyError> {
    let (header_text, body) = split_header(bytes)?;
    let header = parse_header(header_text)?;

    match header.encoding {
        Encoding::Ascii => {
            let text = std::str::from_utf8(body).map_err(|_| PlyError::InvalidValue {
                element: "body".to_string(),
                value: "non-UTF-8 data".to_string(),
            })?;
            let mut reader = AsciiReader {
                tokens: text.split_ascii_whitespace(),
                len: text.len(),
            };
            read_body(&header, &mut reader)
        }
        Encoding::BinaryLittleEndian | Encoding::BinaryBigEndian => {
            let mut reader = BinaryReader {
                data: body,
                pos: 0,
                big_endian: header.encoding == Encoding::BinaryBigEndian,
            };
            read_body(&header, &mut reader)
        }
    }
}

fn read_body(header: &Header, reader: &mut impl ValueReader) -> Result<MeshData, PlyError> {
    let mut mesh = MeshData::default();
    let mut vertex_seen = false;

    for element in &header.elements {
        match element.name.as_str() {
            "vertex" => {
                read_vertices(element, reader, &mut mesh)?;
                vertex_seen = true;
            }
            "face" => read_faces(element, reader, &mut mesh)?,
            _ => skip_element(element, reader)?,
        }
    }

    if !vertex_seen {
        return Err(PlyError::MissingProperty("vertex"));
    }

    // Faces may precede vertices in the header, so validate at the end
    let count = mesh.positions.len();
    if let Some(&index) = mesh.indices.iter().find(|&&i| i as usize >= count) {
        return Err(PlyError::IndexOutOfRange {
            index: index as u64,
            count,
        });
    }

    Ok(mesh)
}

fn read_vertices(
    element: &Element,
    reader: &mut impl ValueReader,
    mesh: &mut MeshData,
) -> Result<(), PlyError> {
    let position = [
        element.scalar_index("x").ok_or(PlyError::MissingProperty("x"))?,
        element.scalar_index("y").ok_or(PlyError::MissingProperty("y"))?,
        element.scalar_index("z").ok_or(PlyError::MissingProperty("z"))?,
    ];
    let normal = match (
        element.scalar_index("nx"),
        element.scalar_index("ny"),
        element.scalar_index("nz"),
    ) {
        (Some(x), Some(y), Some(z)) => Some([x, y, z]),
        _ => None,
    };
    let color = match (
        element.scalar_index("red"),
        element.scalar_index("green"),
        element.scalar_index("blue"),
    ) {
        (Some(r), Some(g), Some(b)) => Some([r, g, b]),
        _ => None,
    };
    let alpha = element.scalar_index("alpha");

    // The header count is untrusted; every vertex takes at least three bytes
    let capacity = element.count.min(reader.remaining() / 3);
    let mut positions = Vec::with_capacity(capacity);
    let mut normals = normal.map(|_| Vec::with_capacity(capacity));
    let mut colors = color.map(|_| Vec::with_capacity(capacity));
    let mut row = vec![0.0f64; element.properties.len()];

    for _ in 0..element.count {
        for (slot, property) in row.iter_mut().zip(&element.properties) {
            *slot = match property.kind {
                PropertyKind::Scalar(ty) => {
                    reader.read(ty, &element.name)? / color_divisor(property, ty)
                }
                PropertyKind::List { count, item } => {
                    skip_list(reader, count, item, &element.name)?;
                    0.0
                }
            };
        }

        positions.push(finite(position.map(|i| row[i] as f32), &element.name)?);
        if let (Some(idx), Some(out)) = (normal, normals.as_mut()) {
            out.push(finite(idx.map(|i| row[i] as f32), &element.name)?);
        }
        if let (Some(idx), Some(out)) = (color, colors.as_mut()) {
            let a = alpha.map_or(1.0, |i| row[i] as f32);
            out.push([row[idx[0]] as f32, row[idx[1]] as f32, row[idx[2]] as f32, a]);
        }
    }

    mesh.positions = positions;
    mesh.normals = normals;
    mesh.colors = colors;
    Ok(())
}

fn finite(v: [f32; 3], element: &str) -> Result<[f32; 3], PlyError> {
    if v.iter().all(|c| c.is_finite()) {
        Ok(v)
    } else {
        Err(PlyError::InvalidValue {
            element: element.to_string(),
            value: format!("{} {} {}", v[0], v[1], v[2]),
        })
    }
}

/// Integer color channels are stored 0-255 (or 0-65535)
fn color_divisor(property: &Property, ty: ScalarType) -> f64 {
    match property.name.as_str() {
        "red" | "green" | "blue" | "alpha" => ty.color_scale(),
        _ => 1.0,
    }
}

fn read_faces(
    element: &Element,
    reader: &mut impl ValueReader,
    mesh: &mut MeshData,
) -> Result<(), PlyError> {
    let list_index = element.properties.iter().position(|p| {
        matches!(p.kind, PropertyKind::List { .. })
            && (p.name == "vertex_indices" || p.name == "vertex_index")
    });

    let mut polygon: Vec<u32> = Vec::new();
    for _ in 0..element.count {
        for (i, property) in element.properties.iter().enumerate() {
            match property.kind {
                PropertyKind::Scalar(ty) => {
                    reader.read(ty, &element.name)?;
                }
                PropertyKind::List { count, item } if Some(i) == list_index => {
                    let n = reader.read(count, &element.name)? as usize;
                    polygon.clear();
                    for _ in 0..n {
                        let index = reader.read(item, &element.name)?;
                        if index < 0.0 {
                            return Err(PlyError::InvalidValue {
                                element: element.name.clone(),
                                value: index.to_string(),
                            });
                        }
                        polygon.push(index as u32);
                    }
                    // Fan triangulation; degenerate polygons are dropped
                    for k in 1..polygon.len().saturating_sub(1) {
                        mesh.indices
                            .extend_from_slice(&[polygon[0], polygon[k], polygon[k + 1]]);
                    }
                }
                PropertyKind::List { count, item } => {
                    skip_list(reader, count, item, &element.name)?;
                }
            }
        }
    }
    Ok(())
}

fn skip_list(
    reader: &mut impl ValueReader,
    count: ScalarType,
    item: ScalarType,
    element: &str,
) -> Result<(), PlyError> {
    let n = reader.read(count, element)? as usize;
    for _ in 0..n {
        reader.read(item, element)?;
    }
    Ok(())
}

fn skip_element(element: &Element, reader: &mut impl ValueReader) -> Result<(), PlyError> {
    // Nothing to consume, however many rows are declared
    if element.properties.is_empty() {
        return Ok(());
    }
    for _ in 0..element.count {
        for property in &element.properties {
            match property.kind {
                PropertyKind::Scalar(ty) => {
                    reader.read(ty, &element.name)?;
                }
                PropertyKind::List { count, item } => {
                    skip_list(reader, count, item, &element.name)?;
                }
            }
        }
    }
    Ok(())
}
