use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian, NativeEndian, WriteBytesExt};
use memmap2::Mmap;
use ndarray::{ArrayD, IxDyn, ShapeBuilder};
use num_traits::AsPrimitive;

use crate::error::{Result, RoiscopeError};
use crate::frame::Frame;

pub const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Magic, two version bytes and the v1 header-length field.
const NPY_V1_PREAMBLE: usize = 10;

/// Header alignment used by NumPy >= 1.14.
const NPY_HEADER_ALIGN: usize = 64;

/// Parsed `.npy` header dictionary.
#[derive(Clone, Debug, PartialEq)]
pub struct NpyHeader {
    pub descr: String,
    pub fortran_order: bool,
    pub shape: Vec<usize>,
}

impl NpyHeader {
    /// Total number of elements, `None` if the shape overflows `usize`.
    pub fn element_count(&self) -> Option<usize> {
        self.shape
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
    }
}

/// Memory-map and decode a `.npy` file.
pub fn read_npy(path: &Path) -> Result<Frame> {
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };
    parse_npy(&mmap)
}

/// Decode an in-memory `.npy` image (also used for `.npz` members).
pub fn parse_npy(bytes: &[u8]) -> Result<Frame> {
    if bytes.len() < NPY_V1_PREAMBLE || &bytes[0..6] != NPY_MAGIC {
        return Err(RoiscopeError::InvalidNpy("missing NUMPY magic".into()));
    }

    let major = bytes[6];
    let (header_len, header_start): (usize, usize) = match major {
        1 => (LittleEndian::read_u16(&bytes[8..10]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err(RoiscopeError::InvalidNpy("truncated header".into()));
            }
            (LittleEndian::read_u32(&bytes[8..12]) as usize, 12)
        }
        v => {
            return Err(RoiscopeError::InvalidNpy(format!(
                "unsupported format version {v}"
            )))
        }
    };

    let data_start = header_start
        .checked_add(header_len)
        .ok_or_else(|| RoiscopeError::InvalidNpy("truncated header".into()))?;
    if bytes.len() < data_start {
        return Err(RoiscopeError::InvalidNpy("truncated header".into()));
    }
    let header_text = std::str::from_utf8(&bytes[header_start..data_start])
        .map_err(|_| RoiscopeError::InvalidNpy("header is not valid text".into()))?;
    let header = parse_header(header_text)?;

    let (order, kind, size) = parse_descr(&header.descr)?;
    let overflow = || RoiscopeError::InvalidNpy("array size overflow".into());
    let count = header.element_count().ok_or_else(overflow)?;
    let data_len = count.checked_mul(size).ok_or_else(overflow)?;
    let data_end = data_start.checked_add(data_len).ok_or_else(overflow)?;
    if bytes.len() < data_end {
        return Err(RoiscopeError::InvalidNpy(format!(
            "data truncated: expected {} bytes, got {}",
            data_len,
            bytes.len() - data_start
        )));
    }
    let raw = &bytes[data_start..data_end];

    let values = match order {
        '>' => decode_elements::<BigEndian>(kind, size, raw, count)?,
        '=' => decode_elements::<NativeEndian>(kind, size, raw, count)?,
        _ => decode_elements::<LittleEndian>(kind, size, raw, count)?,
    };

    let shape = IxDyn(&header.shape);
    let data = if header.fortran_order {
        ArrayD::from_shape_vec(shape.f(), values)
            .map_err(|e| RoiscopeError::InvalidNpy(e.to_string()))?
            .as_standard_layout()
            .into_owned()
    } else {
        ArrayD::from_shape_vec(shape, values)
            .map_err(|e| RoiscopeError::InvalidNpy(e.to_string()))?
    };

    Ok(Frame::new(data, header.descr, size))
}

/// Parse the Python dict literal stored in a `.npy` header.
pub fn parse_header(text: &str) -> Result<NpyHeader> {
    let descr = dict_value(text, "descr")?;
    let descr = descr
        .strip_prefix('\'')
        .and_then(|d| d.split('\'').next())
        .ok_or_else(|| {
            RoiscopeError::InvalidNpy("structured dtypes are not supported".into())
        })?
        .to_string();

    let fortran_order = match dict_value(text, "fortran_order")? {
        v if v.starts_with("True") => true,
        v if v.starts_with("False") => false,
        v => {
            return Err(RoiscopeError::InvalidNpy(format!(
                "bad fortran_order value: {v}"
            )))
        }
    };

    let shape_text = dict_value(text, "shape")?;
    let inner = shape_text
        .strip_prefix('(')
        .and_then(|s| s.split(')').next())
        .ok_or_else(|| RoiscopeError::InvalidNpy("bad shape tuple".into()))?;
    let shape = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim_end_matches('L')
                .parse::<usize>()
                .map_err(|_| RoiscopeError::InvalidNpy(format!("bad shape entry: {s}")))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(NpyHeader {
        descr,
        fortran_order,
        shape,
    })
}

/// Text following `'key':` in the header dict, left-trimmed.
fn dict_value<'a>(text: &'a str, key: &str) -> Result<&'a str> {
    let quoted = format!("'{key}'");
    let start = text
        .find(&quoted)
        .ok_or_else(|| RoiscopeError::InvalidNpy(format!("header has no {key}")))?;
    let rest = &text[start + quoted.len()..];
    let rest = rest
        .trim_start()
        .strip_prefix(':')
        .ok_or_else(|| RoiscopeError::InvalidNpy(format!("malformed {key} entry")))?;
    Ok(rest.trim_start())
}

/// Split a descr like `<f8` into (byte order, kind, item size).
fn parse_descr(descr: &str) -> Result<(char, char, usize)> {
    let mut chars = descr.chars();
    let (order, kind) = match (chars.next(), chars.next()) {
        (Some(o @ ('<' | '>' | '|' | '=')), Some(k)) => (o, k),
        _ => {
            return Err(RoiscopeError::InvalidNpy(format!(
                "unsupported dtype {descr}"
            )))
        }
    };
    let size = chars
        .as_str()
        .parse::<usize>()
        .map_err(|_| RoiscopeError::InvalidNpy(format!("unsupported dtype {descr}")))?;
    Ok((order, kind, size))
}

fn decode_elements<B: ByteOrder>(
    kind: char,
    size: usize,
    raw: &[u8],
    count: usize,
) -> Result<Vec<f64>> {
    let values = match (kind, size) {
        ('b', 1) => raw.iter().map(|&v| if v != 0 { 1.0 } else { 0.0 }).collect(),
        ('u', 1) => raw.iter().map(|&v| v as f64).collect(),
        ('i', 1) => raw.iter().map(|&v| v as i8 as f64).collect(),
        ('u', 2) => widen(raw, count, B::read_u16_into),
        ('i', 2) => widen(raw, count, B::read_i16_into),
        ('u', 4) => widen(raw, count, B::read_u32_into),
        ('i', 4) => widen(raw, count, B::read_i32_into),
        ('u', 8) => widen(raw, count, B::read_u64_into),
        ('i', 8) => widen(raw, count, B::read_i64_into),
        ('f', 4) => widen(raw, count, B::read_f32_into),
        ('f', 8) => widen(raw, count, B::read_f64_into),
        _ => {
            return Err(RoiscopeError::InvalidNpy(format!(
                "unsupported element type {kind}{size}"
            )))
        }
    };
    Ok(values)
}

fn widen<T>(raw: &[u8], count: usize, read_into: fn(&[u8], &mut [T])) -> Vec<f64>
where
    T: Copy + Default + AsPrimitive<f64>,
{
    let mut buf = vec![T::default(); count];
    read_into(raw, &mut buf);
    buf.into_iter().map(|v| v.as_()).collect()
}

/// Write an array as a version 1.0 `.npy` file of little-endian `f64`.
pub fn write_npy(path: &Path, data: &ArrayD<f64>) -> Result<()> {
    let shape = match data.shape() {
        [] => "()".to_string(),
        [n] => format!("({n},)"),
        dims => format!(
            "({})",
            dims.iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };
    let mut header = format!("{{'descr': '<f8', 'fortran_order': False, 'shape': {shape}, }}");
    let unpadded = NPY_V1_PREAMBLE + header.len() + 1;
    let padding = (NPY_HEADER_ALIGN - unpadded % NPY_HEADER_ALIGN) % NPY_HEADER_ALIGN;
    header.push_str(&" ".repeat(padding));
    header.push('\n');

    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(NPY_MAGIC)?;
    out.write_all(&[1, 0])?;
    out.write_u16::<LittleEndian>(header.len() as u16)?;
    out.write_all(header.as_bytes())?;
    for &v in data.iter() {
        out.write_f64::<LittleEndian>(v)?;
    }
    out.flush()?;
    Ok(())
}
