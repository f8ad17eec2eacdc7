//! VTK XML ImageData (`.vti`) reader and writer
//!
//! Supports `ascii`, inline `binary` (base64) and `appended` arrays (raw or
//! base64 encoded), `UInt32`/`UInt64` block headers, both byte orders and
//! `vtkZLibDataCompressor` block compression. Only point data is read; the
//! active scalars are the array named by `PointData Scalars=`, or the first
//! point data array when no name is given.

use crate::{IoError, VolumeReader, VolumeWriter};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use flate2::read::ZlibDecoder;
use isoviz_core::{ImageVolume, Point3f, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

type IoResult<T> = std::result::Result<T, IoError>;

/// Byte order of binary payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// Width of the integers in binary block headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderType {
    UInt32,
    UInt64,
}

impl HeaderType {
    fn size(self) -> usize {
        match self {
            HeaderType::UInt32 => 4,
            HeaderType::UInt64 => 8,
        }
    }
}

/// Element type of a `DataArray`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
}

impl DataType {
    fn parse(name: &str) -> IoResult<Self> {
        Ok(match name {
            "Int8" | "Char" => DataType::Int8,
            "UInt8" | "UnsignedChar" => DataType::UInt8,
            "Int16" | "Short" => DataType::Int16,
            "UInt16" | "UnsignedShort" => DataType::UInt16,
            "Int32" | "Int" => DataType::Int32,
            "UInt32" | "UnsignedInt" => DataType::UInt32,
            "Int64" | "Long" => DataType::Int64,
            "UInt64" | "UnsignedLong" => DataType::UInt64,
            "Float32" | "Float" => DataType::Float32,
            "Float64" | "Double" => DataType::Float64,
            other => {
                return Err(IoError::Unsupported {
                    what: "data type",
                    value: other.to_string(),
                })
            }
        })
    }

    fn size(self) -> usize {
        match self {
            DataType::Int8 | DataType::UInt8 => 1,
            DataType::Int16 | DataType::UInt16 => 2,
            DataType::Int32 | DataType::UInt32 | DataType::Float32 => 4,
            DataType::Int64 | DataType::UInt64 | DataType::Float64 => 8,
        }
    }
}

/// How a volume is laid out in a written file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VtiEncoding {
    /// Values as whitespace separated text inside the `DataArray`
    Ascii,
    /// Little-endian `Float32` values in a raw `AppendedData` section
    #[default]
    AppendedRaw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArrayFormat {
    Ascii,
    Binary,
    Appended,
}

#[derive(Debug, Clone, Copy)]
struct FileInfo {
    endian: Endian,
    header: HeaderType,
    compressed: bool,
}

#[derive(Debug)]
struct ArrayDesc {
    name: Option<String>,
    data_type: DataType,
    components: usize,
    format: ArrayFormat,
    offset: usize,
    text: String,
}

#[derive(Debug)]
struct PieceDesc {
    extent: [i64; 6],
    active: Option<String>,
    arrays: Vec<ArrayDesc>,
}

#[derive(Debug)]
struct Document {
    info: FileInfo,
    whole_extent: [i64; 6],
    origin: [f32; 3],
    spacing: [f32; 3],
    pieces: Vec<PieceDesc>,
}

/// Payload of the `AppendedData` element
enum Appended<'a> {
    Raw(&'a [u8]),
    Base64(&'a str),
}

/// VTK XML ImageData reader
pub struct VtiReader;

impl VolumeReader for VtiReader {
    fn read_volume<P: AsRef<Path>>(path: P) -> Result<ImageVolume> {
        read_vti(path)
    }
}

/// VTK XML ImageData writer using [`VtiEncoding::AppendedRaw`]
pub struct VtiWriter;

impl VolumeWriter for VtiWriter {
    fn write_volume<P: AsRef<Path>>(volume: &ImageVolume, path: P) -> Result<()> {
        write_vti(volume, path, VtiEncoding::default())
    }
}

/// Read a `.vti` file into a volume
pub fn read_vti<P: AsRef<Path>>(path: P) -> Result<ImageVolume> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => IoError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => IoError::Io(e),
    })?;
    let volume = parse_vti(&bytes)?;
    log::debug!(
        "Read {} with dimensions {:?}",
        path.display(),
        volume.dimensions
    );
    Ok(volume)
}

/// Parse the contents of a `.vti` file
pub fn parse_vti(bytes: &[u8]) -> Result<ImageVolume> {
    Ok(decode_document(bytes)?)
}

fn decode_document(bytes: &[u8]) -> IoResult<ImageVolume> {
    let (xml, appended) = split_appended(bytes)?;
    let doc = parse_structure(&xml)?;

    let dims = extent_dims(&doc.whole_extent)?;
    let total = point_count(dims)?;
    let mut values = Vec::new();
    values
        .try_reserve_exact(total)
        .map_err(|_| IoError::invalid(format!("WholeExtent {:?} is too large", doc.whole_extent)))?;
    values.resize(total, 0.0f32);
    let mut covered = 0usize;

    if doc.pieces.is_empty() {
        return Err(IoError::invalid("ImageData has no Piece"));
    }

    for piece in &doc.pieces {
        let piece_dims = extent_dims(&piece.extent)?;
        let outside = || {
            IoError::invalid(format!(
                "Piece extent {:?} outside WholeExtent {:?}",
                piece.extent, doc.whole_extent
            ))
        };
        let mut start = [0usize; 3];
        for axis in 0..3 {
            start[axis] = piece.extent[2 * axis]
                .checked_sub(doc.whole_extent[2 * axis])
                .and_then(|offset| usize::try_from(offset).ok())
                .ok_or_else(outside)?;
            if start[axis] >= dims[axis] || piece_dims[axis] > dims[axis] - start[axis] {
                return Err(outside());
            }
        }
        let count = point_count(piece_dims)?;
        let array = select_array(piece)?;
        let samples = decode_array(array, count, doc.info, appended.as_ref())?;

        for k in 0..piece_dims[2] {
            for j in 0..piece_dims[1] {
                for i in 0..piece_dims[0] {
                    let (gi, gj, gk) = (start[0] + i, start[1] + j, start[2] + k);
                    values[gi + dims[0] * (gj + dims[1] * gk)] =
                        samples[i + piece_dims[0] * (j + piece_dims[1] * k)];
                }
            }
        }
        covered = covered.saturating_add(count);
    }

    if covered < total {
        log::warn!(
            "Pieces cover {} of {} samples; missing samples are zero",
            covered,
            total
        );
    }

    let origin = Point3f::new(
        doc.origin[0] + doc.whole_extent[0] as f32 * doc.spacing[0],
        doc.origin[1] + doc.whole_extent[2] as f32 * doc.spacing[1],
        doc.origin[2] + doc.whole_extent[4] as f32 * doc.spacing[2],
    );

    ImageVolume::new(dims, origin, doc.spacing, values)
        .map_err(|e| IoError::invalid(e.to_string()))
}

/// Cut the file into the XML structure (with the `AppendedData` element
/// removed and the root closed) and the appended payload, if any.
fn split_appended(bytes: &[u8]) -> IoResult<(String, Option<Appended<'_>>)> {
    let Some(start) = find(bytes, b"<AppendedData") else {
        let xml = std::str::from_utf8(bytes)
            .map_err(|_| IoError::invalid("XML section is not valid UTF-8"))?;
        return Ok((xml.to_string(), None));
    };

    let head = std::str::from_utf8(&bytes[..start])
        .map_err(|_| IoError::invalid("XML section is not valid UTF-8"))?;
    let xml = format!("{}</VTKFile>", head);

    let tag_end = find(&bytes[start..], b">")
        .map(|p| start + p)
        .ok_or_else(|| IoError::invalid("unterminated AppendedData tag"))?;
    let tag = std::str::from_utf8(&bytes[start..tag_end])
        .map_err(|_| IoError::invalid("AppendedData tag is not valid UTF-8"))?;
    let encoding = appended_encoding(tag.trim_end_matches('/'))?;

    let marker = find(&bytes[tag_end..], b"_")
        .map(|p| tag_end + p + 1)
        .ok_or_else(|| IoError::invalid("AppendedData is missing the '_' marker"))?;
    let payload = &bytes[marker..];

    let appended = match encoding.as_str() {
        "raw" => Appended::Raw(payload),
        "base64" => {
            let end = payload
                .iter()
                .position(|&b| b == b'<')
                .unwrap_or(payload.len());
            let text = std::str::from_utf8(&payload[..end])
                .map_err(|_| IoError::invalid("base64 AppendedData is not ASCII"))?;
            Appended::Base64(text)
        }
        other => {
            return Err(IoError::Unsupported {
                what: "AppendedData encoding",
                value: other.to_string(),
            })
        }
    };

    Ok((xml, Some(appended)))
}

fn appended_encoding(tag: &str) -> IoResult<String> {
    let element = format!("{}/>", tag);
    let mut reader = Reader::from_str(&element);
    loop {
        match reader.read_event()? {
            Event::Empty(e) => {
                let attrs = attributes(&e)?;
                return Ok(attrs
                    .get("encoding")
                    .cloned()
                    .unwrap_or_else(|| "raw".to_string()));
            }
            Event::Eof => return Err(IoError::invalid("malformed AppendedData tag")),
            _ => {}
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn attributes(e: &BytesStart<'_>) -> IoResult<HashMap<String, String>> {
    let mut map = HashMap::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        map.insert(key, value);
    }
    Ok(map)
}

fn parse_numbers<T: std::str::FromStr, const N: usize>(text: &str, what: &str) -> IoResult<[T; N]>
where
    T: Copy + Default,
{
    let mut out = [T::default(); N];
    let mut fields = text.split_whitespace();
    for slot in out.iter_mut() {
        let field = fields
            .next()
            .ok_or_else(|| IoError::parse(format!("{} needs {} numbers: {:?}", what, N, text)))?;
        *slot = field
            .parse()
            .map_err(|_| IoError::parse(format!("invalid number {:?} in {}", field, what)))?;
    }
    Ok(out)
}

fn extent_dims(extent: &[i64; 6]) -> IoResult<[usize; 3]> {
    let mut dims = [0usize; 3];
    for axis in 0..3 {
        let (lo, hi) = (extent[2 * axis], extent[2 * axis + 1]);
        if hi < lo {
            return Err(IoError::invalid(format!("empty extent {:?}", extent)));
        }
        dims[axis] = hi
            .checked_sub(lo)
            .and_then(|span| usize::try_from(span).ok())
            .and_then(|span| span.checked_add(1))
            .ok_or_else(|| IoError::invalid(format!("extent {:?} is too large", extent)))?;
    }
    Ok(dims)
}

fn point_count(dims: [usize; 3]) -> IoResult<usize> {
    size_mul(size_mul(dims[0], dims[1])?, dims[2])
}

fn parse_structure(xml: &str) -> IoResult<Document> {
    let mut reader = Reader::from_str(xml);

    let mut info = FileInfo {
        endian: Endian::Little,
        header: HeaderType::UInt32,
        compressed: false,
    };
    let mut whole_extent: Option<[i64; 6]> = None;
    let mut origin = [0.0f32; 3];
    let mut spacing = [1.0f32; 3];
    let mut pieces: Vec<PieceDesc> = Vec::new();
    let mut seen_root = false;
    let mut in_point_data = false;
    let mut current: Option<ArrayDesc> = None;

    loop {
        let event = reader.read_event()?;
        let (e, is_empty) = match &event {
            Event::Start(e) => (Some(e), false),
            Event::Empty(e) => (Some(e), true),
            _ => (None, false),
        };

        if let Some(e) = e {
            match e.name().as_ref() {
                b"VTKFile" => {
                    seen_root = true;
                    let attrs = attributes(e)?;
                    match attrs.get("type").map(String::as_str) {
                        Some("ImageData") => {}
                        other => {
                            return Err(IoError::Unsupported {
                                what: "VTK dataset type",
                                value: format!("{:?}", other),
                            })
                        }
                    }
                    info.endian = match attrs.get("byte_order").map(String::as_str) {
                        None | Some("LittleEndian") => Endian::Little,
                        Some("BigEndian") => Endian::Big,
                        Some(other) => {
                            return Err(IoError::Unsupported {
                                what: "byte order",
                                value: other.to_string(),
                            })
                        }
                    };
                    info.header = match attrs.get("header_type").map(String::as_str) {
                        None | Some("UInt32") => HeaderType::UInt32,
                        Some("UInt64") => HeaderType::UInt64,
                        Some(other) => {
                            return Err(IoError::Unsupported {
                                what: "header type",
                                value: other.to_string(),
                            })
                        }
                    };
                    info.compressed = match attrs.get("compressor").map(String::as_str) {
                        None | Some("") => false,
                        Some("vtkZLibDataCompressor") => true,
                        Some(other) => {
                            return Err(IoError::Unsupported {
                                what: "compressor",
                                value: other.to_string(),
                            })
                        }
                    };
                }
                b"ImageData" => {
                    let attrs = attributes(e)?;
                    let extent = attrs
                        .get("WholeExtent")
                        .ok_or_else(|| IoError::invalid("ImageData is missing WholeExtent"))?;
                    whole_extent = Some(parse_numbers(extent, "WholeExtent")?);
                    if let Some(text) = attrs.get("Origin") {
                        origin = parse_numbers(text, "Origin")?;
                    }
                    if let Some(text) = attrs.get("Spacing") {
                        spacing = parse_numbers(text, "Spacing")?;
                    }
                }
                b"Piece" => {
                    let attrs = attributes(e)?;
                    let extent = match attrs.get("Extent") {
                        Some(text) => parse_numbers(text, "Extent")?,
                        None => whole_extent
                            .ok_or_else(|| IoError::invalid("Piece without Extent"))?,
                    };
                    pieces.push(PieceDesc {
                        extent,
                        active: None,
                        arrays: Vec::new(),
                    });
                }
                b"PointData" => {
                    let attrs = attributes(e)?;
                    if let Some(piece) = pieces.last_mut() {
                        piece.active = attrs.get("Scalars").cloned();
                    }
                    in_point_data = !is_empty;
                }
                b"DataArray" if in_point_data => {
                    let attrs = attributes(e)?;
                    let data_type = DataType::parse(
                        attrs
                            .get("type")
                            .ok_or_else(|| IoError::invalid("DataArray without type"))?,
                    )?;
                    let components = match attrs.get("NumberOfComponents") {
                        Some(n) => n
                            .trim()
                            .parse()
                            .map_err(|_| IoError::parse(format!("bad NumberOfComponents {:?}", n)))?,
                        None => 1,
                    };
                    let format = match attrs.get("format").map(String::as_str) {
                        Some("ascii") => ArrayFormat::Ascii,
                        Some("binary") => ArrayFormat::Binary,
                        Some("appended") => ArrayFormat::Appended,
                        other => {
                            return Err(IoError::Unsupported {
                                what: "DataArray format",
                                value: format!("{:?}", other),
                            })
                        }
                    };
                    let offset = match attrs.get("offset") {
                        Some(o) => o
                            .trim()
                            .parse()
                            .map_err(|_| IoError::parse(format!("bad offset {:?}", o)))?,
                        None => 0,
                    };
                    let array = ArrayDesc {
                        name: attrs.get("Name").cloned(),
                        data_type,
                        components,
                        format,
                        offset,
                        text: String::new(),
                    };
                    if is_empty {
                        push_array(&mut pieces, array)?;
                    } else {
                        current = Some(array);
                    }
                }
                _ => {}
            }
            continue;
        }

        match event {
            Event::Text(text) => {
                if let Some(array) = current.as_mut() {
                    array.text.push_str(&text.unescape()?);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"DataArray" => {
                    if let Some(array) = current.take() {
                        push_array(&mut pieces, array)?;
                    }
                }
                b"PointData" => in_point_data = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(IoError::invalid("missing VTKFile root element"));
    }

    Ok(Document {
        info,
        whole_extent: whole_extent.ok_or_else(|| IoError::invalid("missing ImageData element"))?,
        origin,
        spacing,
        pieces,
    })
}

fn push_array(pieces: &mut [PieceDesc], array: ArrayDesc) -> IoResult<()> {
    pieces
        .last_mut()
        .ok_or_else(|| IoError::invalid("DataArray outside a Piece"))?
        .arrays
        .push(array);
    Ok(())
}

fn select_array(piece: &PieceDesc) -> IoResult<&ArrayDesc> {
    if let Some(name) = &piece.active {
        if let Some(array) = piece
            .arrays
            .iter()
            .find(|a| a.name.as_deref() == Some(name.as_str()))
        {
            return Ok(array);
        }
        log::warn!("Active scalars {:?} not found, using first point data array", name);
    }
    piece
        .arrays
        .first()
        .ok_or_else(|| IoError::invalid("Piece has no point data arrays"))
}

fn decode_array(
    array: &ArrayDesc,
    points: usize,
    info: FileInfo,
    appended: Option<&Appended<'_>>,
) -> IoResult<Vec<f32>> {
    if array.components == 0 {
        return Err(IoError::invalid("DataArray with zero components"));
    }
    if array.components > 1 {
        log::warn!(
            "Array {:?} has {} components, using the first",
            array.name,
            array.components
        );
    }
    let count = size_mul(points, array.components)?;
    let limit = size_mul(count, array.data_type.size())?;

    let all = match array.format {
        ArrayFormat::Ascii => {
            let mut values = Vec::with_capacity(count.min(array.text.len()));
            for field in array.text.split_whitespace().take(count) {
                let value = match array.data_type {
                    DataType::Float64 => field.parse::<f64>().map(|v| v as f32),
                    _ => field.parse::<f32>(),
                };
                values.push(
                    value.map_err(|_| IoError::parse(format!("invalid ascii value {:?}", field)))?,
                );
            }
            values
        }
        ArrayFormat::Binary => {
            let text: String = array.text.split_whitespace().collect();
            let bytes = decode_base64_block(&text, info, limit)?;
            convert(&bytes, array.data_type, count, info.endian)?
        }
        ArrayFormat::Appended => {
            let bytes = match appended {
                Some(Appended::Raw(data)) => {
                    let block = data.get(array.offset..).ok_or_else(|| {
                        IoError::invalid(format!("appended offset {} out of range", array.offset))
                    })?;
                    decode_raw_block(block, info, limit)?
                }
                Some(Appended::Base64(text)) => {
                    let block = text.get(array.offset..).ok_or_else(|| {
                        IoError::invalid(format!("appended offset {} out of range", array.offset))
                    })?;
                    let block: String = block.split_whitespace().collect();
                    decode_base64_block(&block, info, limit)?
                }
                None => return Err(IoError::invalid("appended array without AppendedData")),
            };
            convert(&bytes, array.data_type, count, info.endian)?
        }
    };

    if all.len() < count {
        return Err(IoError::invalid(format!(
            "array {:?} has {} values, expected {}",
            array.name,
            all.len(),
            count
        )));
    }

    Ok(all.into_iter().step_by(array.components).take(points).collect())
}

fn read_word(bytes: &[u8], info: FileInfo) -> u64 {
    match (info.header, info.endian) {
        (HeaderType::UInt32, Endian::Little) => LittleEndian::read_u32(bytes) as u64,
        (HeaderType::UInt32, Endian::Big) => BigEndian::read_u32(bytes) as u64,
        (HeaderType::UInt64, Endian::Little) => LittleEndian::read_u64(bytes),
        (HeaderType::UInt64, Endian::Big) => BigEndian::read_u64(bytes),
    }
}

fn size_add(a: usize, b: usize) -> IoResult<usize> {
    a.checked_add(b)
        .ok_or_else(|| IoError::invalid("binary block size overflows"))
}

fn size_mul(a: usize, b: usize) -> IoResult<usize> {
    a.checked_mul(b)
        .ok_or_else(|| IoError::invalid("binary block size overflows"))
}

fn size_sum(sizes: &[usize]) -> IoResult<usize> {
    sizes.iter().try_fold(0, |total, &n| size_add(total, n))
}

fn read_words(bytes: &[u8], count: usize, info: FileInfo) -> IoResult<Vec<usize>> {
    let size = info.header.size();
    if bytes.len() < size_mul(count, size)? {
        return Err(IoError::invalid("truncated binary block header"));
    }
    Ok(bytes
        .chunks_exact(size)
        .take(count)
        .map(|chunk| read_word(chunk, info) as usize)
        .collect())
}

/// Uncompressed blocks are `[nbytes][data]`; compressed blocks are
/// `[nblocks][block size][last block size][compressed sizes...][data]`.
///
/// `limit` is the most bytes the array can hold; larger declared sizes are
/// rejected before anything is allocated.
fn decode_raw_block(block: &[u8], info: FileInfo, limit: usize) -> IoResult<Vec<u8>> {
    let size = info.header.size();
    if !info.compressed {
        let nbytes = read_words(block, 1, info)?[0];
        return block
            .get(size..size_add(size, nbytes)?)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| IoError::invalid("truncated appended data"));
    }

    let fixed = read_words(block, 3, info)?;
    let header_words = size_add(3, fixed[0])?;
    let header = read_words(block, header_words, info)?;
    let data_start = size_mul(header_words, size)?;
    let data_len = size_sum(&header[3..])?;
    let data = block
        .get(data_start..size_add(data_start, data_len)?)
        .ok_or_else(|| IoError::invalid("truncated compressed data"))?;
    inflate_blocks(&header, data, limit)
}

fn encoded_len(bytes: usize) -> IoResult<usize> {
    size_mul(size_add(bytes, 2)? / 3, 4)
}

fn base64_prefix<'a>(text: &'a str, chars: usize) -> IoResult<&'a str> {
    text.get(..chars)
        .ok_or_else(|| IoError::invalid("truncated base64 data"))
}

/// Decode a base64 block. The uncompressed form may be encoded as one stream
/// or with the header encoded separately; compressed headers are always
/// encoded separately from the data.
fn decode_base64_block(text: &str, info: FileInfo, limit: usize) -> IoResult<Vec<u8>> {
    let size = info.header.size();

    if !info.compressed {
        let head_chars = encoded_len(size)?;
        let head = base64_prefix(text, head_chars)?;
        if head.ends_with('=') {
            let nbytes = read_words(&STANDARD.decode(head)?, 1, info)?[0];
            let body = text
                .get(head_chars..size_add(head_chars, encoded_len(nbytes)?)?)
                .ok_or_else(|| IoError::invalid("truncated base64 data"))?;
            let mut data = STANDARD.decode(body)?;
            data.truncate(nbytes);
            return Ok(data);
        }
        let nbytes = read_words(&STANDARD.decode(head)?, 1, info)?[0];
        let end = size_add(size, nbytes)?;
        let decoded = STANDARD.decode(base64_prefix(text, encoded_len(end)?)?)?;
        return decoded
            .get(size..end)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| IoError::invalid("truncated base64 data"));
    }

    let fixed = read_words(&STANDARD.decode(base64_prefix(text, 4 * size)?)?, 3, info)?;
    let header_words = size_add(3, fixed[0])?;
    let head_chars = encoded_len(size_mul(header_words, size)?)?;
    let header = read_words(
        &STANDARD.decode(base64_prefix(text, head_chars)?)?,
        header_words,
        info,
    )?;
    let data_len = size_sum(&header[3..])?;
    let body = text
        .get(head_chars..size_add(head_chars, encoded_len(data_len)?)?)
        .ok_or_else(|| IoError::invalid("truncated base64 data"))?;
    let data = STANDARD.decode(body)?;
    inflate_blocks(&header, &data, limit)
}

fn inflate_blocks(header: &[usize], data: &[u8], limit: usize) -> IoResult<Vec<u8>> {
    let (nblocks, block_size, last_size) = (header[0], header[1], header[2]);
    let expected = match nblocks {
        0 => 0,
        n if last_size == 0 => size_mul(n, block_size)?,
        n => size_add(size_mul(n - 1, block_size)?, last_size)?,
    };
    if expected > limit {
        return Err(IoError::invalid(format!(
            "compressed header promises {} bytes, array holds {}",
            expected, limit
        )));
    }

    let mut out = Vec::with_capacity(expected);
    let mut offset = 0;
    for &compressed in &header[3..] {
        let end = size_add(offset, compressed)?;
        let chunk = data
            .get(offset..end)
            .ok_or_else(|| IoError::invalid("truncated compressed block"))?;
        // One byte past `expected` is enough to detect an oversized stream
        let room = (expected - out.len().min(expected)) as u64 + 1;
        ZlibDecoder::new(chunk).take(room).read_to_end(&mut out)?;
        offset = end;
    }

    if out.len() != expected {
        return Err(IoError::invalid(format!(
            "decompressed {} bytes, header promised {}",
            out.len(),
            expected
        )));
    }
    Ok(out)
}

fn convert(bytes: &[u8], data_type: DataType, count: usize, endian: Endian) -> IoResult<Vec<f32>> {
    match endian {
        Endian::Little => convert_with::<LittleEndian>(bytes, data_type, count),
        Endian::Big => convert_with::<BigEndian>(bytes, data_type, count),
    }
}

fn convert_with<B: ByteOrder>(bytes: &[u8], data_type: DataType, count: usize) -> IoResult<Vec<f32>> {
    let size = data_type.size();
    let needed = size_mul(count, size)?;
    if bytes.len() < needed {
        return Err(IoError::invalid(format!(
            "binary array holds {} bytes, expected {}",
            bytes.len(),
            needed
        )));
    }

    let chunks = bytes.chunks_exact(size).take(count);
    Ok(match data_type {
        DataType::Int8 => chunks.map(|c| c[0] as i8 as f32).collect(),
        DataType::UInt8 => chunks.map(|c| c[0] as f32).collect(),
        DataType::Int16 => chunks.map(|c| B::read_i16(c) as f32).collect(),
        DataType::UInt16 => chunks.map(|c| B::read_u16(c) as f32).collect(),
        DataType::Int32 => chunks.map(|c| B::read_i32(c) as f32).collect(),
        DataType::UInt32 => chunks.map(|c| B::read_u32(c) as f32).collect(),
        DataType::Int64 => chunks.map(|c| B::read_i64(c) as f32).collect(),
        DataType::UInt64 => chunks.map(|c| B::read_u64(c) as f32).collect(),
        DataType::Float32 => chunks.map(B::read_f32).collect(),
        DataType::Float64 => chunks.map(|c| B::read_f64(c) as f32).collect(),
    })
}

/// Write a volume as a `.vti` file
pub fn write_vti<P: AsRef<Path>>(volume: &ImageVolume, path: P, encoding: VtiEncoding) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode_vti(volume, encoding)?;
    fs::write(path, bytes).map_err(IoError::from)?;
    log::debug!("Wrote {} ({:?})", path.display(), encoding);
    Ok(())
}

/// Serialize a volume into `.vti` bytes
pub fn encode_vti(volume: &ImageVolume, encoding: VtiEncoding) -> Result<Vec<u8>> {
    Ok(encode_document(volume, encoding)?)
}

fn encode_document(volume: &ImageVolume, encoding: VtiEncoding) -> IoResult<Vec<u8>> {
    let [nx, ny, nz] = volume.dimensions;
    if nx == 0 || ny == 0 || nz == 0 {
        return Err(IoError::WriteError {
            message: format!("cannot write empty volume {:?}", volume.dimensions),
        });
    }
    let extent = format!("0 {} 0 {} 0 {}", nx - 1, ny - 1, nz - 1);
    let (lo, hi) = volume.scalar_range();
    let o = volume.origin;
    let s = volume.spacing;

    let mut out = Vec::new();
    writeln!(out, "<?xml version=\"1.0\"?>")?;
    writeln!(
        out,
        "<VTKFile type=\"ImageData\" version=\"1.0\" byte_order=\"LittleEndian\" header_type=\"UInt64\">"
    )?;
    writeln!(
        out,
        "  <ImageData WholeExtent=\"{}\" Origin=\"{} {} {}\" Spacing=\"{} {} {}\">",
        extent, o.x, o.y, o.z, s[0], s[1], s[2]
    )?;
    writeln!(out, "    <Piece Extent=\"{}\">", extent)?;
    writeln!(out, "      <PointData Scalars=\"scalars\">")?;

    match encoding {
        VtiEncoding::Ascii => {
            writeln!(
                out,
                "        <DataArray type=\"Float32\" Name=\"scalars\" format=\"ascii\" RangeMin=\"{}\" RangeMax=\"{}\">",
                lo, hi
            )?;
            for row in volume.values.chunks(nx) {
                let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                writeln!(out, "          {}", line.join(" "))?;
            }
            writeln!(out, "        </DataArray>")?;
        }
        VtiEncoding::AppendedRaw => {
            writeln!(
                out,
                "        <DataArray type=\"Float32\" Name=\"scalars\" format=\"appended\" RangeMin=\"{}\" RangeMax=\"{}\" offset=\"0\"/>",
                lo, hi
            )?;
        }
    }

    writeln!(out, "      </PointData>")?;
    writeln!(out, "      <CellData>")?;
    writeln!(out, "      </CellData>")?;
    writeln!(out, "    </Piece>")?;
    writeln!(out, "  </ImageData>")?;

    if encoding == VtiEncoding::AppendedRaw {
        writeln!(out, "  <AppendedData encoding=\"raw\">")?;
        write!(out, "   _")?;
        out.write_u64::<LittleEndian>((volume.values.len() * 4) as u64)?;
        for &v in &volume.values {
            out.write_f32::<LittleEndian>(v)?;
        }
        writeln!(out)?;
        writeln!(out, "  </AppendedData>")?;
    }

    writeln!(out, "</VTKFile>")?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_volume() -> ImageVolume {
        ImageVolume::from_fn([4, 3, 2], Point3f::new(-1.0, 0.5, 2.0), [0.5, 1.0, 0.25], |p| {
            p.x * p.x + 3.0 * p.y - p.z
        })
    }

    #[test]
    fn test_ascii_roundtrip() {
        let volume = sample_volume();
        let bytes = encode_vti(&volume, VtiEncoding::Ascii).unwrap();
        assert_eq!(parse_vti(&bytes).unwrap(), volume);
    }

    #[test]
    fn test_appended_raw_roundtrip() {
        let volume = sample_volume();
        let bytes = encode_vti(&volume, VtiEncoding::AppendedRaw).unwrap();
        assert_eq!(parse_vti(&bytes).unwrap(), volume);
    }

    #[test]
    fn test_extent_start_shifts_origin() {
        let xml = r#"<?xml version="1.0"?>
<VTKFile type="ImageData" version="0.1">
  <ImageData WholeExtent="2 3 0 0 0 0" Origin="1 0 0" Spacing="0.5 1 1">
    <Piece Extent="2 3 0 0 0 0">
      <PointData Scalars="density">
        <DataArray type="Int16" Name="other" format="ascii">9 9</DataArray>
        <DataArray type="Int16" Name="density" format="ascii">-4 12</DataArray>
      </PointData>
    </Piece>
  </ImageData>
</VTKFile>
"#;
        let volume = parse_vti(xml.as_bytes()).unwrap();
        assert_eq!(volume.dimensions, [2, 1, 1]);
        assert_relative_eq!(volume.origin, Point3f::new(2.0, 0.0, 0.0));
        assert_eq!(volume.values, vec![-4.0, 12.0]);
    }

    #[test]
    fn test_rejects_other_dataset_types() {
        let xml = r#"<VTKFile type="PolyData"><PolyData/></VTKFile>"#;
        assert!(matches!(
            parse_vti(xml.as_bytes()),
            Err(isoviz_core::Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_truncated_ascii_array_is_error() {
        let xml = r#"<VTKFile type="ImageData">
  <ImageData WholeExtent="0 2 0 0 0 0">
    <Piece Extent="0 2 0 0 0 0">
      <PointData><DataArray type="Float32" format="ascii">1 2</DataArray></PointData>
    </Piece>
  </ImageData>
</VTKFile>"#;
        assert!(parse_vti(xml.as_bytes()).is_err());
    }
}
