//! Decoding of the binary `.vti` payload variants written by VTK

use base64::{engine::general_purpose::STANDARD, Engine as _};
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use isoviz_core::Point3f;
use isoviz_io::vti::{encode_vti, parse_vti};
use isoviz_io::{read_vti, write_vti, VtiEncoding};
use std::io::Write;

const VALUES: [f32; 8] = [0.0, 1.5, -2.0, 3.25, 4.0, 5.5, 6.0, 100.0];

fn document(root_attrs: &str, array_attrs: &str, inline: &str, appended: Option<&str>) -> Vec<u8> {
    let mut out = format!(
        r#"<?xml version="1.0"?>
<VTKFile type="ImageData" version="1.0" {root_attrs}>
  <ImageData WholeExtent="0 1 0 1 0 1" Origin="0 0 0" Spacing="1 1 1">
    <Piece Extent="0 1 0 1 0 1">
      <PointData Scalars="v">
        <DataArray type="Float32" Name="v" {array_attrs}>{inline}</DataArray>
      </PointData>
    </Piece>
  </ImageData>
"#
    )
    .into_bytes();
    if let Some(encoding) = appended {
        out.extend_from_slice(format!("  <AppendedData encoding=\"{}\">\n   _", encoding).as_bytes());
    }
    out
}

fn finish(mut doc: Vec<u8>, appended: bool) -> Vec<u8> {
    if appended {
        doc.extend_from_slice(b"\n  </AppendedData>\n");
    }
    doc.extend_from_slice(b"</VTKFile>\n");
    doc
}

fn le_floats() -> Vec<u8> {
    let mut data = Vec::new();
    for v in VALUES {
        data.write_f32::<LittleEndian>(v).unwrap();
    }
    data
}

fn compressed_header_and_blocks(data: &[u8], block_size: usize) -> (Vec<u8>, Vec<u8>) {
    let blocks: Vec<Vec<u8>> = data
        .chunks(block_size)
        .map(|chunk| {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(chunk).unwrap();
            encoder.finish().unwrap()
        })
        .collect();

    let last = data.len() % block_size;
    let mut header = Vec::new();
    header.write_u32::<LittleEndian>(blocks.len() as u32).unwrap();
    header.write_u32::<LittleEndian>(block_size as u32).unwrap();
    header.write_u32::<LittleEndian>(last as u32).unwrap();
    for block in &blocks {
        header.write_u32::<LittleEndian>(block.len() as u32).unwrap();
    }
    (header, blocks.concat())
}

#[test]
fn inline_base64_single_stream() {
    let mut payload = Vec::new();
    payload.write_u32::<LittleEndian>(32).unwrap();
    payload.extend(le_floats());

    let doc = document(
        r#"byte_order="LittleEndian" header_type="UInt32""#,
        r#"format="binary""#,
        &format!("\n          {}\n        ", STANDARD.encode(&payload)),
        None,
    );
    let volume = parse_vti(&finish(doc, false)).unwrap();
    assert_eq!(volume.values, VALUES.to_vec());
}

#[test]
fn inline_base64_separate_header() {
    let mut header = Vec::new();
    header.write_u64::<LittleEndian>(32).unwrap();
    let text = format!("{}{}", STANDARD.encode(&header), STANDARD.encode(le_floats()));

    let doc = document(
        r#"byte_order="LittleEndian" header_type="UInt64""#,
        r#"format="binary""#,
        &text,
        None,
    );
    let volume = parse_vti(&finish(doc, false)).unwrap();
    assert_eq!(volume.values, VALUES.to_vec());
}

#[test]
fn big_endian_appended_raw() {
    let mut doc = document(
        r#"byte_order="BigEndian" header_type="UInt32""#,
        r#"format="appended" offset="0""#,
        "",
        Some("raw"),
    );
    doc.write_u32::<BigEndian>(32).unwrap();
    for v in VALUES {
        doc.write_f32::<BigEndian>(v).unwrap();
    }

    let volume = parse_vti(&finish(doc, true)).unwrap();
    assert_eq!(volume.values, VALUES.to_vec());
}

#[test]
fn zlib_compressed_inline_base64() {
    let (header, blocks) = compressed_header_and_blocks(&le_floats(), 12);
    let text = format!("{}{}", STANDARD.encode(&header), STANDARD.encode(&blocks));

    let doc = document(
        r#"byte_order="LittleEndian" header_type="UInt32" compressor="vtkZLibDataCompressor""#,
        r#"format="binary""#,
        &text,
        None,
    );
    let volume = parse_vti(&finish(doc, false)).unwrap();
    assert_eq!(volume.values, VALUES.to_vec());
}

#[test]
fn zlib_compressed_appended_raw() {
    let (header, blocks) = compressed_header_and_blocks(&le_floats(), 16);
    let mut doc = document(
        r#"byte_order="LittleEndian" header_type="UInt32" compressor="vtkZLibDataCompressor""#,
        r#"format="appended" offset="0""#,
        "",
        Some("raw"),
    );
    doc.extend(header);
    doc.extend(blocks);

    let volume = parse_vti(&finish(doc, true)).unwrap();
    assert_eq!(volume.values, VALUES.to_vec());
}

#[test]
fn appended_base64() {
    let mut payload = Vec::new();
    payload.write_u32::<LittleEndian>(32).unwrap();
    payload.extend(le_floats());

    let mut doc = document(
        r#"byte_order="LittleEndian" header_type="UInt32""#,
        r#"format="appended" offset="0""#,
        "",
        Some("base64"),
    );
    doc.extend(STANDARD.encode(&payload).into_bytes());

    let volume = parse_vti(&finish(doc, true)).unwrap();
    assert_eq!(volume.values, VALUES.to_vec());
}

/// Raw appended block whose UInt64 header words are given verbatim
fn appended_u64_block(compressor: &str, words: &[u64], tail: &[u8]) -> Vec<u8> {
    let mut doc = document(
        &format!(r#"byte_order="LittleEndian" header_type="UInt64" {compressor}"#),
        r#"format="appended" offset="0""#,
        "",
        Some("raw"),
    );
    for &word in words {
        doc.write_u64::<LittleEndian>(word).unwrap();
    }
    doc.extend_from_slice(tail);
    finish(doc, true)
}

const ZLIB: &str = r#"compressor="vtkZLibDataCompressor""#;

#[test]
fn oversized_byte_count_is_rejected() {
    let bytes = appended_u64_block("", &[u64::MAX], &le_floats());
    assert!(parse_vti(&bytes).is_err());
}

#[test]
fn oversized_block_count_is_rejected() {
    let bytes = appended_u64_block(ZLIB, &[u64::MAX, 16, 0], &[]);
    assert!(parse_vti(&bytes).is_err());
}

#[test]
fn oversized_block_size_is_rejected() {
    let bytes = appended_u64_block(ZLIB, &[1, u64::MAX, 0, 0], &[]);
    assert!(parse_vti(&bytes).is_err());

    let bytes = appended_u64_block(ZLIB, &[2, u64::MAX, 5, 0, 0], &[]);
    assert!(parse_vti(&bytes).is_err());
}

#[test]
fn oversized_compressed_sizes_are_rejected() {
    let bytes = appended_u64_block(ZLIB, &[2, 16, 0, u64::MAX, u64::MAX], &[0; 8]);
    assert!(parse_vti(&bytes).is_err());
}

#[test]
fn header_larger_than_array_is_rejected() {
    // 1 GiB promised for an eight value array
    let bytes = appended_u64_block(ZLIB, &[1, 1 << 30, 0, 8], &[0; 8]);
    assert!(parse_vti(&bytes).is_err());
}

#[test]
fn truncated_block_header_is_rejected() {
    let mut doc = document(
        r#"byte_order="LittleEndian" header_type="UInt64""#,
        r#"format="appended" offset="0""#,
        "",
        Some("raw"),
    );
    doc.extend_from_slice(&[0xff; 4]);
    assert!(parse_vti(&finish(doc, true)).is_err());
}

#[test]
fn oversized_base64_headers_are_rejected() {
    let encode = |words: &[u64]| {
        let mut header = Vec::new();
        for &word in words {
            header.write_u64::<LittleEndian>(word).unwrap();
        }
        STANDARD.encode(&header)
    };

    for (compressor, words) in [
        ("", vec![u64::MAX]),
        (ZLIB, vec![u64::MAX, 16, 0]),
        (ZLIB, vec![1, u64::MAX, 0, 0]),
        (ZLIB, vec![1, 16, 0, u64::MAX]),
    ] {
        let doc = document(
            &format!(r#"byte_order="LittleEndian" header_type="UInt64" {compressor}"#),
            r#"format="binary""#,
            &encode(&words),
            None,
        );
        assert!(parse_vti(&finish(doc, false)).is_err(), "{:?}", words);
    }
}

#[test]
fn decompressed_stream_longer_than_header_is_rejected() {
    // Header claims one 8-byte block but the stream inflates to 32 bytes
    let (_, blocks) = compressed_header_and_blocks(&le_floats(), 32);
    let mut header = Vec::new();
    for word in [1u32, 8, 0, blocks.len() as u32] {
        header.write_u32::<LittleEndian>(word).unwrap();
    }
    let mut doc = document(
        &format!(r#"byte_order="LittleEndian" header_type="UInt32" {ZLIB}"#),
        r#"format="appended" offset="0""#,
        "",
        Some("raw"),
    );
    doc.extend(header);
    doc.extend(blocks);
    assert!(parse_vti(&finish(doc, true)).is_err());
}

#[test]
fn oversized_extents_are_rejected() {
    let ascii = finish(
        document("", r#"format="ascii""#, "0 1 2 3 4 5 6 7", None),
        false,
    );
    let text = String::from_utf8(ascii).unwrap();
    for (whole, piece) in [
        ("0 2000000000 0 2000000000 0 2000000000", "0 1 0 1 0 1"),
        ("-9223372036854775808 9223372036854775807 0 1 0 1", "0 1 0 1 0 1"),
        ("0 1 0 1 0 1", "-9223372036854775808 1 0 1 0 1"),
        ("0 1 0 1 0 1", "1 2 0 1 0 1"),
    ] {
        let bytes = text
            .replace(r#"WholeExtent="0 1 0 1 0 1""#, &format!(r#"WholeExtent="{whole}""#))
            .replace(r#"Piece Extent="0 1 0 1 0 1""#, &format!(r#"Piece Extent="{piece}""#));
        assert!(parse_vti(bytes.as_bytes()).is_err(), "{} / {}", whole, piece);
    }
}

#[test]
fn unsupported_compressor_is_rejected() {
    let doc = document(
        r#"compressor="vtkLZ4DataCompressor""#,
        r#"format="ascii""#,
        "0 1 2 3 4 5 6 7",
        None,
    );
    assert!(parse_vti(&finish(doc, false)).is_err());
}

#[test]
fn pieces_are_assembled_into_whole_extent() {
    let xml = r#"<VTKFile type="ImageData">
  <ImageData WholeExtent="0 3 0 0 0 0" Origin="0 0 0" Spacing="1 1 1">
    <Piece Extent="2 3 0 0 0 0">
      <PointData><DataArray type="UInt8" format="ascii">30 40</DataArray></PointData>
    </Piece>
    <Piece Extent="0 1 0 0 0 0">
      <PointData><DataArray type="UInt8" format="ascii">10 20</DataArray></PointData>
    </Piece>
  </ImageData>
</VTKFile>"#;
    let volume = parse_vti(xml.as_bytes()).unwrap();
    assert_eq!(volume.values, vec![10.0, 20.0, 30.0, 40.0]);
}

#[test]
fn multi_component_uses_first() {
    let xml = r#"<VTKFile type="ImageData">
  <ImageData WholeExtent="0 1 0 0 0 0">
    <Piece Extent="0 1 0 0 0 0">
      <PointData><DataArray type="Float64" NumberOfComponents="2" format="ascii">1 9 2 9</DataArray></PointData>
    </Piece>
  </ImageData>
</VTKFile>"#;
    let volume = parse_vti(xml.as_bytes()).unwrap();
    assert_eq!(volume.values, vec![1.0, 2.0]);
}

#[test]
fn writer_output_reads_back_from_disk() {
    let volume = isoviz_core::ImageVolume::from_fn(
        [5, 4, 3],
        Point3f::new(-2.0, -1.5, 0.0),
        [0.5, 0.5, 2.0],
        |p| (p.x * p.y).sin() + p.z,
    );

    for encoding in [VtiEncoding::Ascii, VtiEncoding::AppendedRaw] {
        let path = std::env::temp_dir().join(format!("isoviz_vti_{:?}.vti", encoding));
        write_vti(&volume, &path, encoding).unwrap();
        assert_eq!(read_vti(&path).unwrap(), volume);
        let _ = std::fs::remove_file(&path);
    }

    let bytes = encode_vti(&volume, VtiEncoding::Ascii).unwrap();
    assert!(String::from_utf8(bytes).unwrap().contains("format=\"ascii\""));
}

#[test]
fn missing_file_is_an_error() {
    assert!(read_vti("/nonexistent/isoviz/volume.vti").is_err());
}
