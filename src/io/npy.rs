//! NumPy `.npy` reader and writer for floating-point arrays.
//!
//! Supports format versions 1.0, 2.0 and 3.0 with `f4`/`f8` element types in
//! either byte order. Fortran-ordered arrays are transposed to row-major on
//! read, so callers always see C order. Object (pickled) arrays are rejected.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::LoadError;

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const HEADER_ALIGN: usize = 64;

/// A dense floating-point array in row-major (C) order.
#[derive(Debug, Clone, PartialEq)]
pub struct NpyArray {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

impl NpyArray {
    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Little,
    Big,
}

#[derive(Debug, Clone, Copy)]
struct Dtype {
    order: ByteOrder,
    size: usize,
}

#[derive(Debug)]
struct Header {
    dtype: Dtype,
    fortran_order: bool,
    shape: Vec<usize>,
}

/// Reads a `.npy` file into a row-major `f64` array.
pub fn read_npy(path: &Path) -> Result<NpyArray, LoadError> {
    let bytes = std::fs::read(path).map_err(|e| LoadError::io(path, e))?;
    parse_npy(&bytes, path)
}

/// Parses an in-memory `.npy` image. `path` is only used for error messages.
pub fn parse_npy(bytes: &[u8], path: &Path) -> Result<NpyArray, LoadError> {
    if bytes.len() < 10 || &bytes[..6] != MAGIC {
        return Err(LoadError::npy(path, "missing NUMPY magic"));
    }

    let major = bytes[6];
    let (header_len, header_start) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err(LoadError::npy(path, "truncated header length"));
            }
            let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
            (len as usize, 12)
        }
        v => return Err(LoadError::npy(path, format!("unsupported format version {}", v))),
    };

    let data_start = header_start + header_len;
    if bytes.len() < data_start {
        return Err(LoadError::npy(path, "truncated header"));
    }
    let header_text = std::str::from_utf8(&bytes[header_start..data_start])
        .map_err(|_| LoadError::npy(path, "header is not valid UTF-8"))?;
    let header = parse_header(header_text).map_err(|reason| LoadError::npy(path, reason))?;

    let expected = checked_element_count(&header.shape)
        .and_then(|count| count.checked_mul(header.dtype.size))
        .ok_or_else(|| LoadError::npy(path, format!("shape {:?} is too large", header.shape)))?;
    let payload = &bytes[data_start..];
    if payload.len() != expected {
        return Err(LoadError::npy(
            path,
            format!("expected {} data bytes for shape {:?}, found {}", expected, header.shape, payload.len()),
        ));
    }

    let data = decode_elements(payload, header.dtype);
    let data = if header.fortran_order && header.shape.len() > 1 {
        fortran_to_c_order(&data, &header.shape)
    } else {
        data
    };

    Ok(NpyArray {
        shape: header.shape,
        data,
    })
}

/// Writes a row-major `f64` array as a little-endian version 1.0 `.npy` file.
pub fn write_npy(path: &Path, shape: &[usize], data: &[f64]) -> std::io::Result<()> {
    if checked_element_count(shape) != Some(data.len()) {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("shape {:?} does not hold {} elements", shape, data.len()),
        ));
    }

    let shape_text = match shape {
        [n] => format!("({},)", n),
        dims => format!(
            "({})",
            dims.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
        ),
    };
    let mut header = format!(
        "{{'descr': '<f8', 'fortran_order': False, 'shape': {}, }}",
        shape_text
    );
    // Magic + version + u16 length + header + newline, padded to the alignment.
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    header.extend(std::iter::repeat(' ').take(padding));
    header.push('\n');

    let header_len = u16::try_from(header.len()).map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "npy header too long")
    })?;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(MAGIC)?;
    writer.write_all(&[1, 0])?;
    writer.write_all(&header_len.to_le_bytes())?;
    writer.write_all(header.as_bytes())?;
    for &value in data {
        writer.write_all(&value.to_le_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

/// Product of the dimensions, or `None` if it overflows `usize`.
fn checked_element_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

fn parse_header(text: &str) -> Result<Header, String> {
    let descr = dict_value(text, "descr").ok_or("header has no 'descr'")?;
    let descr = quoted(descr).ok_or("'descr' is not a string")?;
    let dtype = parse_dtype(descr)?;

    let fortran = dict_value(text, "fortran_order").ok_or("header has no 'fortran_order'")?;
    let fortran_order = if fortran.starts_with("True") {
        true
    } else if fortran.starts_with("False") {
        false
    } else {
        return Err("'fortran_order' is not a boolean".into());
    };

    let shape = dict_value(text, "shape").ok_or("header has no 'shape'")?;
    let shape = parse_shape(shape)?;

    Ok(Header {
        dtype,
        fortran_order,
        shape,
    })
}

/// Returns the text following `'key':` in the header dictionary.
fn dict_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let single = format!("'{}'", key);
    let double = format!("\"{}\"", key);
    let (pos, len) = text
        .find(&single)
        .map(|p| (p, single.len()))
        .or_else(|| text.find(&double).map(|p| (p, double.len())))?;
    let rest = text[pos + len..].trim_start();
    let rest = rest.strip_prefix(':')?;
    Some(rest.trim_start())
}

fn quoted(text: &str) -> Option<&str> {
    let quote = text.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let body = &text[1..];
    let end = body.find(quote)?;
    Some(&body[..end])
}

fn parse_dtype(descr: &str) -> Result<Dtype, String> {
    let mut chars = descr.chars();
    let order = match chars.next() {
        Some('<') | Some('|') | Some('=') => ByteOrder::Little,
        Some('>') => ByteOrder::Big,
        _ => return Err(format!("unsupported dtype '{}'", descr)),
    };
    match &descr[1..] {
        "f8" => Ok(Dtype { order, size: 8 }),
        "f4" => Ok(Dtype { order, size: 4 }),
        "O" => Err("object arrays (pickled data) are not supported".into()),
        _ => Err(format!("unsupported dtype '{}', expected f4 or f8", descr)),
    }
}

fn parse_shape(text: &str) -> Result<Vec<usize>, String> {
    let inner = text
        .strip_prefix('(')
        .and_then(|t| t.find(')').map(|end| &t[..end]))
        .ok_or("'shape' is not a tuple")?;
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().map_err(|_| format!("bad dimension '{}'", s)))
        .collect()
}

fn decode_elements(payload: &[u8], dtype: Dtype) -> Vec<f64> {
    match (dtype.size, dtype.order) {
        (8, ByteOrder::Little) => payload
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect(),
        (8, ByteOrder::Big) => payload
            .chunks_exact(8)
            .map(|c| f64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect(),
        (_, ByteOrder::Little) => payload
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
            .collect(),
        (_, ByteOrder::Big) => payload
            .chunks_exact(4)
            .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64)
            .collect(),
    }
}

fn fortran_to_c_order(data: &[f64], shape: &[usize]) -> Vec<f64> {
    let ndim = shape.len();
    let mut f_strides = vec![1usize; ndim];
    for k in 1..ndim {
        f_strides[k] = f_strides[k - 1] * shape[k - 1];
    }

    let mut out = Vec::with_capacity(data.len());
    let mut index = vec![0usize; ndim];
    for _ in 0..data.len() {
        let offset: usize = index.iter().zip(&f_strides).map(|(i, s)| i * s).sum();
        out.push(data[offset]);
        // Advance the C-order multi-index (last axis fastest).
        for axis in (0..ndim).rev() {
            index[axis] += 1;
            if index[axis] < shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn npy_image(descr: &str, fortran: bool, shape: &str, payload: &[u8]) -> Vec<u8> {
        let header = format!(
            "{{'descr': '{}', 'fortran_order': {}, 'shape': {}, }}\n",
            descr,
            if fortran { "True" } else { "False" },
            shape
        );
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn test_write_then_read_matrix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("basis.npy");
        let data = vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        write_npy(&path, &[3, 2], &data).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % HEADER_ALIGN, 0);

        let array = read_npy(&path).unwrap();
        assert_eq!(array.shape, vec![3, 2]);
        assert_eq!(array.data, data);
    }

    #[test]
    fn test_one_dimensional_shape_has_trailing_comma() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mean.npy");
        write_npy(&path, &[4], &[300.0, 301.0, 302.0, 303.0]).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let text = String::from_utf8_lossy(&bytes[10..]);
        assert!(text.contains("'shape': (4,)"));
        assert_eq!(read_npy(&path).unwrap().shape, vec![4]);
    }

    #[test]
    fn test_fortran_order_is_transposed() {
        // 2x3 matrix [[1,2,3],[4,5,6]] stored column-major.
        let column_major = [1.0f64, 4.0, 2.0, 5.0, 3.0, 6.0];
        let payload: Vec<u8> = column_major.iter().flat_map(|v| v.to_le_bytes()).collect();
        let bytes = npy_image("<f8", true, "(2, 3)", &payload);

        let array = parse_npy(&bytes, Path::new("mem.npy")).unwrap();
        assert_eq!(array.shape, vec![2, 3]);
        assert_eq!(array.data, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_single_precision_and_big_endian() {
        let payload: Vec<u8> = [0.5f32, 2.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        let array = parse_npy(&npy_image("<f4", false, "(2,)", &payload), Path::new("a")).unwrap();
        assert_eq!(array.data, vec![0.5, 2.0]);

        let payload: Vec<u8> = [310.25f64].iter().flat_map(|v| v.to_be_bytes()).collect();
        let array = parse_npy(&npy_image(">f8", false, "(1, 1)", &payload), Path::new("b")).unwrap();
        assert_eq!(array.data, vec![310.25]);
    }

    #[test]
    fn test_rejects_object_arrays() {
        let bytes = npy_image("|O", false, "(3,)", &[0u8; 24]);
        let err = parse_npy(&bytes, Path::new("interp.npy")).unwrap_err();
        assert!(err.to_string().contains("object arrays"));
    }

    #[test]
    fn test_rejects_truncated_payload() {
        let bytes = npy_image("<f8", false, "(3,)", &[0u8; 16]);
        assert!(matches!(
            parse_npy(&bytes, Path::new("short.npy")),
            Err(LoadError::Npy { .. })
        ));
    }

    #[test]
    fn test_rejects_overflowing_shape() {
        for shape in ["(4294967296, 4294967296)", "(4, 4611686018427387904)"] {
            let bytes = npy_image("<f8", false, shape, &[]);
            let err = parse_npy(&bytes, Path::new("huge.npy")).unwrap_err();
            assert!(matches!(err, LoadError::Npy { .. }), "{}: {}", shape, err);
        }
        // Element count fits, byte count does not.
        let bytes = npy_image("<f8", false, "(2305843009213693952,)", &[]);
        assert!(parse_npy(&bytes, Path::new("huge.npy")).is_err());
    }

    #[test]
    fn test_write_rejects_mismatched_shape() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.npy");
        assert!(write_npy(&path, &[2, 2], &[1.0; 3]).is_err());
        assert!(write_npy(&path, &[usize::MAX, 2], &[]).is_err());
    }

    #[test]
    fn test_rejects_missing_magic() {
        let result = parse_npy(b"not a numpy file", Path::new("x.npy"));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let result = read_npy(&dir.path().join("absent.npy"));
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }
}
